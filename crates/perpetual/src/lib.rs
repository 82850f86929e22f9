//! Perpetual selector watches.
//!
//! [`register`] a selector on a [`Document`](dom::Document) and chain
//! array-style operations onto the returned [`Handle`]. Every element that
//! matches, whether it existed at registration or is inserted later, is run
//! through the pipeline exactly once as a one-item sequence. With
//! [`WatchOptions::match_reappearance`] an element is run again each time it is
//! reinserted.
//!
//! Work happens at [`Document::checkpoint`](dom::Document::checkpoint): the
//! elements that matched at registration go first, then the insertions
//! reported since. Operations chained before that checkpoint therefore apply
//! to existing matches too.

mod handle;
mod options;
pub mod pipeline;
mod registration;
mod value;
mod watch;

pub use handle::Handle;
pub use options::WatchOptions;
pub use registration::register;
pub use value::Value;
pub use watch::{Scoped, Watch, text_of};
