use thiserror::Error;

use crate::{StateId, Symbol, TransitionId};

/// Errors that are reported by the mutation primitives of an [`crate::Fsm`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsmError {
    #[error("state {0} does not exist or was merged away")]
    UnknownState(StateId),
    #[error("state {state} already has a transition on `{symbol}`")]
    Nondeterministic { state: StateId, symbol: Symbol },
    #[error("automaton is corrupted: {0}")]
    Invariant(#[from] InvariantViolation),
}

/// Describes which global invariant of an automaton does not hold. Any of these indicates a
/// programming error, they are never produced by well behaved use of the public API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("expected exactly one start state but found {0}")]
    StartCount(usize),
    #[error("start pointer {0:?} does not match the flagged start state")]
    StartMismatch(Option<StateId>),
    #[error("state {state} has more than one transition on `{symbol}`")]
    NonDeterministic { state: StateId, symbol: Symbol },
    #[error("transition {0} refers to a state that is not live")]
    DanglingTransition(TransitionId),
    #[error("lookup index is out of sync for transition {0}")]
    StaleIndex(TransitionId),
    #[error("neighbor maps of state {0} do not match its transitions")]
    StaleNeighbors(StateId),
}
