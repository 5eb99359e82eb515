//! The automaton data model used for protocol state machine inference.
//!
//! An [`Fsm`] is an arena of [`State`]s and [`Transition`]s. States are addressed by a
//! [`StateId`] that stays valid for the lifetime of the automaton; a state that is merged
//! away leaves a vacant slot behind which remembers the state that absorbed it. Building
//! an automaton from observed symbol sequences and compressing it happens elsewhere, this
//! crate only provides the structure and its mutation primitives.

pub mod math;

mod id;
pub use id::{StateId, TransitionId};

mod error;
pub use error::{FsmError, InvariantViolation};

mod state;
pub use state::State;

mod transition;
pub use transition::{Action, Guard, Payload, Transition, Variables};

mod fsm;
pub use fsm::{Fsm, MergeOutcome};

mod show;

/// Symbols are the alphabet of an inferred automaton. They are produced by abstracting
/// observed messages and only need to be comparable and orderable.
pub type Symbol = String;

/// Re-exports the types that are needed in almost every interaction with an [`Fsm`].
pub mod prelude {
    pub use super::{
        math, Fsm, FsmError, MergeOutcome, Payload, State, StateId, Symbol, Transition,
        TransitionId,
    };
}
