//! Configuration settings for a [`Document`](crate::Document).
//!
//! Configuration can be loaded from environment variables or constructed
//! programmatically.

use std::env;

/// Runtime configuration for a document and its update channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentConfig {
    /// Number of mutation batches the update channel buffers per stream
    /// before a slow stream starts lagging.
    pub update_capacity: usize,
}

impl DocumentConfig {
    /// Default channel capacity, in batches.
    pub const DEFAULT_UPDATE_CAPACITY: usize = 256;

    /// Construct a new `DocumentConfig` with explicit values.
    ///
    /// # Arguments
    ///
    /// * `update_capacity` - Buffered batches per update stream (minimum 1)
    #[inline]
    #[must_use]
    pub const fn new(update_capacity: usize) -> Self {
        let capacity = if update_capacity < 1 {
            1
        } else {
            update_capacity
        };
        Self {
            update_capacity: capacity,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `PERPETUAL_UPDATE_CAPACITY`: Buffered batches per update stream (default: 256)
    #[inline]
    #[must_use]
    pub fn from_env() -> Self {
        let update_capacity = env::var("PERPETUAL_UPDATE_CAPACITY")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(Self::DEFAULT_UPDATE_CAPACITY)
            .max(1);
        Self { update_capacity }
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_UPDATE_CAPACITY)
    }
}
