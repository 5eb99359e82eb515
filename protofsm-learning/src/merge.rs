use protofsm_core::Fsm;

/// Module containing the k-tails merging strategy.
pub mod ktails;

/// Compresses an automaton by merging some of its states.
pub trait StateMerger {
    fn merge(&self, fsm: Fsm) -> Fsm;
}
