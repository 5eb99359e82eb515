use crate::{math, StateId, Symbol, TransitionId};

/// One configuration of the automaton, reached by some prefix of the observed sequences.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct State {
    pub(crate) id: StateId,
    pub(crate) is_start: bool,
    pub(crate) is_end: bool,
    pub(crate) visit_count: usize,
    pub(crate) next: math::Map<Symbol, StateId>,
    pub(crate) prev: math::Map<Symbol, StateId>,
    pub(crate) transitions: Vec<TransitionId>,
}

impl State {
    pub(crate) fn new(id: StateId, is_start: bool, is_end: bool) -> Self {
        Self {
            id,
            is_start,
            is_end,
            visit_count: 0,
            next: math::Map::default(),
            prev: math::Map::default(),
            transitions: vec![],
        }
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn is_start(&self) -> bool {
        self.is_start
    }

    /// Whether some observed sequence terminates in this state.
    pub fn is_end(&self) -> bool {
        self.is_end
    }

    /// The number of distinct sessions whose walk passed through this state.
    pub fn visit_count(&self) -> usize {
        self.visit_count
    }

    /// Maps each outgoing symbol to the state it leads to.
    pub fn next_states(&self) -> &math::Map<Symbol, StateId> {
        &self.next
    }

    /// Maps each incoming symbol to one state that has an edge on it into `self`. If several
    /// predecessors use the same symbol, only one of them is recorded.
    pub fn prev_states(&self) -> &math::Map<Symbol, StateId> {
        &self.prev
    }

    /// Ids of the live transitions leaving this state, in creation order.
    pub fn transition_ids(&self) -> &[TransitionId] {
        &self.transitions
    }

    pub fn successor(&self, symbol: &str) -> Option<StateId> {
        self.next.get(symbol).copied()
    }
}

/// A slot in the state arena. Merged states leave a vacant slot which points to the state
/// that absorbed them, so ids are never reused.
#[derive(Clone, Debug)]
pub(crate) enum StateSlot {
    Occupied(State),
    Vacant(StateId),
}
use StateSlot::*;

impl StateSlot {
    pub fn state(&self) -> Option<&State> {
        match self {
            Occupied(state) => Some(state),
            Vacant(_) => None,
        }
    }

    pub fn state_mut(&mut self) -> Option<&mut State> {
        match self {
            Occupied(state) => Some(state),
            Vacant(_) => None,
        }
    }

    pub fn is_occupied(&self) -> bool {
        matches!(self, Occupied(_))
    }

    pub fn merged_into(&self) -> Option<StateId> {
        match self {
            Vacant(into) => Some(*into),
            Occupied(_) => None,
        }
    }

    /// Turns the slot into a vacant one pointing at `into` and gives back the state that was
    /// stored, if any.
    pub fn vacate(&mut self, into: StateId) -> Option<State> {
        match std::mem::replace(self, Vacant(into)) {
            Occupied(state) => Some(state),
            Vacant(_) => None,
        }
    }
}
