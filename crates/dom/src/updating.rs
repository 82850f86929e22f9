use crate::{Document, NodeKey};
use anyhow::{Error, anyhow};
use log::warn;
use smallvec::SmallVec;
use std::sync::Arc;
use tokio::sync::broadcast;

/// One published checkpoint worth of records, shared by every update stream.
pub type MutationBatch = Arc<Vec<MutationRecord>>;

/// What changed in a single mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DOMUpdate {
    /// Children were inserted into and/or removed from the target.
    ChildList {
        added: Vec<NodeKey>,
        removed: Vec<NodeKey>,
    },
    /// An attribute of the target was set or removed.
    Attribute {
        name: String,
        old_value: Option<String>,
    },
    /// The data of a text or comment target changed.
    CharacterData { old_value: String },
    /// The target subtree was dropped from the arena; these keys are gone for good.
    Destroyed { nodes: Vec<NodeKey> },
}

/// A queued mutation, stamped with a document-wide sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub seq: u64,
    pub target: NodeKey,
    /// The target and its ancestors at the time the record was queued,
    /// innermost first.
    pub path: SmallVec<NodeKey, 8>,
    pub update: DOMUpdate,
}

impl MutationRecord {
    /// True if the target was `root` or inside `root` when the record was queued.
    #[inline]
    pub fn is_within(&self, root: NodeKey) -> bool {
        self.path.contains(&root)
    }
}

/// Receives control once per [`Document::checkpoint`].
///
/// Subscribers get a read-only view of the document; they pull the records
/// they care about from their own [`UpdateStream`].
pub trait DOMSubscriber {
    /// Handle everything published up to and including this checkpoint.
    ///
    /// # Errors
    /// Any error aborts the checkpoint for the remaining subscribers.
    fn on_checkpoint(&mut self, document: &Document) -> Result<(), Error>;
}

/// An independent subscription to a document's mutation batches.
///
/// Only records queued after the stream was created are yielded.
pub struct UpdateStream {
    in_updater: broadcast::Receiver<MutationBatch>,
    since: u64,
}

impl UpdateStream {
    pub(crate) const fn new(in_updater: broadcast::Receiver<MutationBatch>, since: u64) -> Self {
        Self { in_updater, since }
    }

    /// First sequence number this stream reports.
    pub const fn since(&self) -> u64 {
        self.since
    }

    /// Drain every pending batch without blocking.
    ///
    /// # Errors
    /// Returns an error if the document dropped its sender.
    pub fn try_update_sync(&mut self) -> Result<Vec<MutationBatch>, Error> {
        use tokio::sync::broadcast::error::TryRecvError;
        let mut batches = Vec::new();
        loop {
            match self.in_updater.try_recv() {
                Ok(batch) => batches.push(batch),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("Update stream lagged, {skipped} mutation batches were dropped");
                }
                Err(TryRecvError::Closed) => {
                    return Err(anyhow!("Update channel was closed while the stream was live"));
                }
            }
        }
        Ok(batches)
    }

    /// Drain pending batches and flatten them into records, in queue order,
    /// skipping anything queued before this stream existed.
    ///
    /// # Errors
    /// Returns an error if the document dropped its sender.
    pub fn drain_records(&mut self) -> Result<Vec<MutationRecord>, Error> {
        let since = self.since;
        Ok(self
            .try_update_sync()?
            .iter()
            .flat_map(|batch| batch.iter())
            .filter(|record| record.seq >= since)
            .cloned()
            .collect())
    }
}
