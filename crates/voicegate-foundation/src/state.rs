use crate::error::PipelineError;

/// Lifecycle of the real-time worker.
///
/// `Stopped` is terminal: once entered, the worker declines further frames
/// and can only be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Uninitialized,
    Ready,
    Running,
    Stopped,
}

impl WorkerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Stopped)
    }

    pub fn can_transition(&self, next: WorkerState) -> bool {
        matches!(
            (*self, next),
            (WorkerState::Uninitialized, WorkerState::Ready)
                | (WorkerState::Ready, WorkerState::Running)
                | (WorkerState::Running, WorkerState::Ready)
                | (WorkerState::Uninitialized, WorkerState::Stopped)
                | (WorkerState::Ready, WorkerState::Stopped)
                | (WorkerState::Running, WorkerState::Stopped)
        )
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    /// Stopping an already stopped worker is accepted; stop is idempotent.
    pub fn transition(&mut self, next: WorkerState) -> Result<(), PipelineError> {
        if *self == WorkerState::Stopped && next == WorkerState::Stopped {
            return Ok(());
        }
        if !self.can_transition(next) {
            return Err(PipelineError::InvalidTransition {
                from: *self,
                to: next,
            });
        }
        tracing::debug!("worker state: {:?} -> {:?}", self, next);
        *self = next;
        Ok(())
    }
}
