//! Lazily-Resolved Pipeline Handles
//!
//! A build request returns an [`AsyncPipelineHandle`] immediately. The worker
//! that compiles the pipeline owns the matching [`PendingBuild`] producer and
//! writes into it exactly once.
//!
//! ```text
//!   Pending(rx) ──is_valid()──▶ Ready { slot, pipeline }   (terminal)
//!                     │
//!                     └────────▶ Failed                     (terminal)
//! ```
//!
//! The first `is_valid()` call is the only blocking join in the subsystem.
//! Later calls only inspect the cached state.

use crate::errors::{Result, RuntimeError};

/// What a worker sends back: the slot that built the object, or the failure.
pub type BuildOutcome<P> = std::result::Result<(usize, P), String>;

/// Producer half of a build request. Dropping it without sending (e.g. when
/// the build job panics) resolves the handle to `Failed`.
pub struct PendingBuild<P> {
    sender: flume::Sender<BuildOutcome<P>>,
}

impl<P> PendingBuild<P> {
    /// Creates a connected producer / handle pair.
    #[must_use]
    pub fn channel() -> (Self, AsyncPipelineHandle<P>) {
        let (sender, receiver) = flume::bounded(1);
        (
            Self { sender },
            AsyncPipelineHandle {
                state: HandleState::Pending(receiver),
            },
        )
    }

    pub fn resolve(self, outcome: BuildOutcome<P>) {
        // The requester may have dropped its handle already; nothing to do then.
        let _ = self.sender.send(outcome);
    }
}

enum HandleState<P> {
    Pending(flume::Receiver<BuildOutcome<P>>),
    Ready { slot: Option<usize>, pipeline: P },
    Failed { message: String },
}

/// Renderer-side handle to a pipeline that may still be compiling.
pub struct AsyncPipelineHandle<P> {
    state: HandleState<P>,
}

impl<P> AsyncPipelineHandle<P> {
    /// Wraps an object that is already built (no background job).
    #[must_use]
    pub fn ready(pipeline: P) -> Self {
        Self {
            state: HandleState::Ready {
                slot: None,
                pipeline,
            },
        }
    }

    /// A handle whose build failed. `is_valid` always returns `false`.
    #[must_use]
    pub fn failed() -> Self {
        Self {
            state: HandleState::Failed {
                message: "pipeline was never built".to_string(),
            },
        }
    }

    /// Returns whether the pipeline is usable, blocking on the first call
    /// until the background build has finished.
    ///
    /// Callers that must not stall should check [`is_finished`](Self::is_finished) first.
    pub fn is_valid(&mut self) -> bool {
        self.resolve();
        matches!(self.state, HandleState::Ready { .. })
    }

    /// Non-blocking probe: `true` once `is_valid` would return without waiting.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        match &self.state {
            HandleState::Pending(receiver) => !receiver.is_empty() || receiver.is_disconnected(),
            HandleState::Ready { .. } | HandleState::Failed { .. } => true,
        }
    }

    /// `true` while the background result has not been observed yet.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self.state, HandleState::Pending(_))
    }

    /// The resolved pipeline, or `PreconditionViolation` if `is_valid` has not
    /// returned `true` yet.
    pub fn try_get(&self) -> Result<&P> {
        match &self.state {
            HandleState::Ready { pipeline, .. } => Ok(pipeline),
            HandleState::Pending(_) => Err(RuntimeError::PreconditionViolation(
                "pipeline handle read before is_valid() resolved it",
            )),
            HandleState::Failed { .. } => Err(RuntimeError::PreconditionViolation(
                "pipeline handle read after its build failed",
            )),
        }
    }

    /// The build failure, once `is_valid` has returned `false`.
    #[must_use]
    pub fn failure(&self) -> Option<RuntimeError> {
        match &self.state {
            HandleState::Failed { message } => Some(RuntimeError::CompileFailure(message.clone())),
            _ => None,
        }
    }

    /// The resolved pipeline.
    ///
    /// # Panics
    ///
    /// Panics unless `is_valid` already returned `true` for this handle.
    #[must_use]
    pub fn get(&self) -> &P {
        match self.try_get() {
            Ok(pipeline) => pipeline,
            Err(e) => panic!("{e}"),
        }
    }

    /// Slot that built the pipeline, if it came from a build cache.
    #[must_use]
    pub fn slot(&self) -> Option<usize> {
        match &self.state {
            HandleState::Ready { slot, .. } => *slot,
            _ => None,
        }
    }

    /// Consumes the handle, returning the pipeline and its slot if it was valid.
    pub(crate) fn into_resolved(mut self) -> Option<(Option<usize>, P)> {
        self.resolve();
        match self.state {
            HandleState::Ready { slot, pipeline } => Some((slot, pipeline)),
            _ => None,
        }
    }

    fn resolve(&mut self) {
        let HandleState::Pending(receiver) = &self.state else {
            return;
        };

        self.state = match receiver.recv() {
            Ok(Ok((slot, pipeline))) => HandleState::Ready {
                slot: Some(slot),
                pipeline,
            },
            // Already reported through the log sink by the worker.
            Ok(Err(message)) => HandleState::Failed { message },
            Err(flume::RecvError::Disconnected) => HandleState::Failed {
                message: "pipeline build job ended without a result".to_string(),
            },
        };
    }
}

impl<P> std::fmt::Debug for AsyncPipelineHandle<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            HandleState::Pending(_) => "Pending",
            HandleState::Ready { .. } => "Ready",
            HandleState::Failed { .. } => "Failed",
        };
        f.debug_struct("AsyncPipelineHandle")
            .field("state", &state)
            .field("slot", &self.slot())
            .finish()
    }
}
