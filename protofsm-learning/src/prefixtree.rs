use std::fmt::Debug;

use protofsm_core::{math, Fsm, StateId, Symbol};
use tracing::{debug, trace};

/// Symbol sequences keyed by the session they were observed in, in insertion order.
pub type Sequences<K> = math::Map<K, Vec<Symbol>>;

/// Infers an automaton from per-session symbol sequences.
pub trait FsmInfer {
    fn infer<K: Debug>(&self, sequences: &Sequences<K>) -> Fsm;
}

/// Builds the prefix tree acceptor of the given sequences, see [`prefix_tree`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PtaInfer;

impl FsmInfer for PtaInfer {
    fn infer<K: Debug>(&self, sequences: &Sequences<K>) -> Fsm {
        prefix_tree(sequences)
    }
}

/// Builds the deterministic prefix tree acceptor (PTA) of the given sequences. Every distinct
/// prefix of a sequence corresponds to exactly one state and the state reached by a whole
/// sequence is accepting. The visit count of a state is the number of sessions whose
/// sequence passes through it.
///
/// An empty sequence marks the start state as accepting, while an empty collection of
/// sequences gives a single non-accepting start state.
pub fn prefix_tree<K, W, S, I>(sequences: I) -> Fsm
where
    K: Debug,
    S: AsRef<str>,
    W: IntoIterator<Item = S>,
    I: IntoIterator<Item = (K, W)>,
{
    let mut fsm = Fsm::new();
    let start = fsm.new_state(true, false);

    let mut sessions = 0usize;
    for (session, word) in sequences {
        sessions += 1;
        let mut visited = math::Set::default();
        let mut current = start;
        visit(&mut fsm, current, &mut visited);

        for symbol in word {
            let symbol = symbol.as_ref();
            current = match fsm.successor(current, symbol) {
                Some(next) => next,
                None => {
                    let next = fsm.new_state(false, false);
                    fsm.add_transition(current, symbol, next)
                        .expect("a missing successor cannot collide with an existing transition");
                    next
                }
            };
            visit(&mut fsm, current, &mut visited);
        }

        fsm.set_accepting(current)
            .expect("the reached state was just visited and must be live");
        trace!("session {session:?} ends in {current}");
    }

    debug!(
        "built prefix tree from {sessions} sessions with {} states and {} transitions",
        fsm.size(),
        fsm.transition_count()
    );
    debug_assert_eq!(fsm.validate(), Ok(()));
    fsm
}

/// Counts the visit of the current session to `state`, at most once per session.
fn visit(fsm: &mut Fsm, state: StateId, visited: &mut math::Set<StateId>) {
    if visited.insert(state) {
        fsm.record_visit(state)
            .expect("states of the prefix tree are never removed during construction");
    }
}
