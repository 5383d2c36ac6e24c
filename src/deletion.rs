//! Confirm-then-delete flow for the selected chunks.
//!
//! Only one deletion may be in flight; while it is, [`DeletionWorkflow::confirm`]
//! refuses to build another request. The chunks shown in the confirmation are
//! frozen when it opens, and exactly those are sent on confirm.

use crate::error::ViewerError;
use crate::gateway::DeleteOutcome;
use crate::selection::Selection;
use crate::spatial::index::{ChunkIndex, FileRef};

/// Count and aggregate size shown in the confirmation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteSummary {
    /// Chunks that will be deleted
    pub count: usize,
    /// Their combined file size
    pub total_bytes: u64,
}

/// Where the delete flow is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionState {
    /// No dialog
    Idle,
    /// Dialog open, waiting for the operator
    Confirming {
        /// What confirming would delete
        summary: DeleteSummary,
        /// Copy the files away first
        backup: bool,
    },
    /// Request sent, waiting for the gateway
    Pending,
}

/// A confirmed deletion, ready to hand to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    /// Save the chunks belong to
    pub save: String,
    /// Files to remove, in (y, x) order
    pub refs: Vec<FileRef>,
    /// Back the files up before removing them
    pub create_backup: bool,
}

/// How the viewer should follow up on a finished deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionResult {
    /// Everything went; selection cleared, chunks must be reloaded
    Deleted {
        /// Files removed
        count: usize,
    },
    /// Some refs survived; reload and keep the survivors selected
    Partial {
        /// Files removed
        deleted: usize,
        /// Files left in place
        failed: usize,
    },
    /// Nothing deleted; selection left intact
    Failed(String),
}

/// Idle, confirming or pending; see the module docs.
#[derive(Debug)]
pub struct DeletionWorkflow {
    state: DeletionState,
    targets: Vec<FileRef>,
}

impl Default for DeletionWorkflow {
    fn default() -> Self {
        DeletionWorkflow {
            state: DeletionState::Idle,
            targets: Vec::new(),
        }
    }
}

impl DeletionWorkflow {
    /// Idle workflow
    pub fn new() -> Self {
        Self::default()
    }

    /// Current step
    pub fn state(&self) -> DeletionState {
        self.state
    }

    /// Files the open confirmation would delete
    pub fn targets(&self) -> &[FileRef] {
        &self.targets
    }

    /// A request is out and has not been settled
    pub fn is_pending(&self) -> bool {
        self.state == DeletionState::Pending
    }

    /// Dialog (confirming or pending) is on screen.
    pub fn is_open(&self) -> bool {
        self.state != DeletionState::Idle
    }

    /// Show the confirmation step for the loaded part of `selection` and
    /// freeze it as the set to delete. Backup defaults to on. Does nothing when
    /// the selection has no loaded chunks or another step is active.
    pub fn open(&mut self, selection: &Selection, index: &ChunkIndex) -> Option<DeleteSummary> {
        if self.state != DeletionState::Idle {
            return None;
        }
        let mut chunks: Vec<_> = selection.iter().filter_map(|c| index.get(c)).collect();
        if chunks.is_empty() {
            return None;
        }
        chunks.sort_by_key(|c| (c.y, c.x));

        let summary = DeleteSummary {
            count: chunks.len(),
            total_bytes: chunks.iter().map(|c| c.size_bytes).sum(),
        };
        self.targets = chunks.into_iter().map(|c| c.file_ref.clone()).collect();
        self.state = DeletionState::Confirming {
            summary,
            backup: true,
        };
        Some(summary)
    }

    /// Flip the backup flag of the open confirmation
    pub fn toggle_backup(&mut self) {
        if let DeletionState::Confirming { backup, .. } = &mut self.state {
            *backup = !*backup;
        }
    }

    /// Close the confirmation step. A pending deletion cannot be cancelled.
    pub fn cancel(&mut self) {
        if let DeletionState::Confirming { .. } = self.state {
            self.state = DeletionState::Idle;
            self.targets.clear();
        }
    }

    /// Turn the confirmation into a request for the chunks frozen by
    /// [`Self::open`] and mark it pending.
    pub fn confirm(&mut self, save: &str) -> Result<DeleteRequest, ViewerError> {
        let backup = match self.state {
            DeletionState::Confirming { backup, .. } => backup,
            DeletionState::Pending => return Err(ViewerError::DeleteInProgress),
            DeletionState::Idle => return Err(ViewerError::NotConfirming),
        };

        self.state = DeletionState::Pending;
        Ok(DeleteRequest {
            save: save.to_owned(),
            refs: std::mem::take(&mut self.targets),
            create_backup: backup,
        })
    }

    /// Settle the pending deletion. On success the selection is cleared; on a
    /// partial or failed deletion it is left for the caller to prune or retry.
    pub fn complete(
        &mut self,
        result: Result<DeleteOutcome, ViewerError>,
        selection: &mut Selection,
    ) -> DeletionResult {
        self.state = DeletionState::Idle;
        match result {
            Ok(outcome) if outcome.is_complete() => {
                selection.clear();
                DeletionResult::Deleted {
                    count: outcome.deleted_count,
                }
            }
            Ok(outcome) => DeletionResult::Partial {
                deleted: outcome.deleted_count,
                failed: outcome.failed.len(),
            },
            Err(e) => {
                log::error!("chunk deletion failed: {}", e);
                DeletionResult::Failed(e.to_string())
            }
        }
    }
}
