//! Registration options.
//!
//! Options can be loaded from environment variables or built programmatically.

use dom::NodeKey;
use std::env;

/// How a watch treats elements that already exist and elements that come back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WatchOptions {
    /// Process elements that already match when the watch is registered.
    pub match_existing: bool,
    /// Process an element again every time it is reinserted.
    pub match_reappearance: bool,
    /// Subtree to watch. `None` means the document's content root.
    pub scope_root: Option<NodeKey>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchOptions {
    /// Existing matches on, reappearance off, default scope.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            match_existing: true,
            match_reappearance: false,
            scope_root: None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn match_existing(mut self, enabled: bool) -> Self {
        self.match_existing = enabled;
        self
    }

    #[inline]
    #[must_use]
    pub const fn match_reappearance(mut self, enabled: bool) -> Self {
        self.match_reappearance = enabled;
        self
    }

    #[inline]
    #[must_use]
    pub const fn scope_root(mut self, root: NodeKey) -> Self {
        self.scope_root = Some(root);
        self
    }

    /// Load options from environment variables, falling back to the defaults.
    ///
    /// Reads the following environment variables:
    /// - `PERPETUAL_MATCH_EXISTING`: "1" or "0" (default: 1)
    /// - `PERPETUAL_MATCH_REAPPEARANCE`: "1" or "0" (default: 0)
    #[inline]
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::new();
        let flag = |name: &str, default: bool| match env::var(name).ok().as_deref() {
            Some("1") => true,
            Some("0") => false,
            _ => default,
        };
        Self {
            match_existing: flag("PERPETUAL_MATCH_EXISTING", defaults.match_existing),
            match_reappearance: flag("PERPETUAL_MATCH_REAPPEARANCE", defaults.match_reappearance),
            scope_root: None,
        }
    }
}
