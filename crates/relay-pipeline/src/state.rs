//! Explicit state machine for one source's pipeline run.
//!
//! ```text
//! IDLE → FETCHING → FILTERING → PROCESSING → DONE
//!                           ↘ (per item) ↗
//!                        PUBLISHING → (per item) RECORDED
//!                           ↘ on error → ERRORED
//! ```
//!
//! `apply` enforces legal transitions only; an illegal event returns
//! [`TransitionError`], which callers treat as a programming error (the
//! orchestrator never constructs an illegal sequence itself).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Idle,
    Fetching,
    Filtering,
    Processing,
    Publishing,
    Done,
    Errored,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Errored)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    BeginFetch,
    FetchSucceeded,
    FetchFailed,
    FilterCompleted,
    BeginPublish,
    ItemRecorded,
    AllItemsProcessed,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: PipelineState,
    pub event: PipelineEvent,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "illegal pipeline transition: {:?} + {:?}", self.from, self.event)
    }
}

impl std::error::Error for TransitionError {}

/// Pure transition function; callers own the `PipelineState` and apply
/// events as the run progresses.
pub fn apply(state: PipelineState, event: &PipelineEvent) -> Result<PipelineState, TransitionError> {
    use PipelineEvent::*;
    use PipelineState::*;

    let next = match (state, event) {
        (Idle, BeginFetch) => Fetching,
        (Fetching, FetchSucceeded) => Filtering,
        (Fetching, FetchFailed) => Errored,
        (Filtering, FilterCompleted) => Processing,
        (Processing, BeginPublish) => Publishing,
        (Publishing, ItemRecorded) => Processing,
        (Processing, AllItemsProcessed) => Done,
        // Fail is accepted from any non-terminal state.
        (Fetching | Filtering | Processing | Publishing, Fail) => Errored,
        (from, event) => {
            return Err(TransitionError { from, event: event.clone() });
        }
    };

    Ok(next)
}
