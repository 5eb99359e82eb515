use itertools::Itertools;
use tracing::{debug, trace};

use crate::{
    math,
    state::{State, StateSlot},
    FsmError, InvariantViolation, Payload, StateId, Symbol, Transition, TransitionId,
};

/// Result of a call to [`Fsm::merge_two_states`] that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The absorbed state is gone and everything it had now belongs to the kept state.
    Merged,
    /// Both ids referred to the same state, nothing happened.
    SameState,
    /// At least one of the states is accepting, the automaton is left unchanged.
    RefusedAccepting,
}

impl MergeOutcome {
    pub fn is_merged(&self) -> bool {
        matches!(self, MergeOutcome::Merged)
    }
}

/// A finite state machine over [`Symbol`]s.
///
/// States live in an arena and are addressed by [`StateId`]. Merging removes a state by
/// vacating its slot, so an id never refers to a different state later on. Transitions are
/// never removed; a transition that becomes an exact duplicate of an older one through a
/// merge is fused into it (see [`Transition::fused_into`]).
///
/// Besides the transition list, the automaton maintains a lookup index from source state and
/// symbol to the matching transitions as well as the neighbor maps of each state. Both are
/// updated incrementally when transitions are added and rebuilt from the transition list
/// after each merge.
#[derive(Clone, Debug, Default)]
pub struct Fsm {
    states: Vec<StateSlot>,
    start: Option<StateId>,
    transitions: Vec<Transition>,
    by_state_symbol: math::Map<StateId, math::Map<Symbol, Vec<TransitionId>>>,
}

impl Fsm {
    /// Creates an automaton without any states.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh state and returns its id. Passing `is_start` makes the new state the
    /// start state; if there was one before, it loses its start flag.
    pub fn new_state(&mut self, is_start: bool, is_end: bool) -> StateId {
        let id = StateId::from_index(self.states.len());
        if is_start {
            if let Some(previous) = self.start.replace(id) {
                debug!("{id} replaces {previous} as start state");
                if let Some(state) = self.state_mut(previous) {
                    state.is_start = false;
                }
            }
        }
        trace!("adding state {id} (start: {is_start}, end: {is_end})");
        self.states
            .push(StateSlot::Occupied(State::new(id, is_start, is_end)));
        id
    }

    /// The id of the start state, `None` only before the first state was created.
    pub fn start(&self) -> Option<StateId> {
        self.start
    }

    /// Number of live states.
    pub fn size(&self) -> usize {
        self.states.iter().filter(|slot| slot.is_occupied()).count()
    }

    /// Number of live transitions. Records that a merge fused into a parallel transition are
    /// not counted, so this can shrink after [`Fsm::merge_two_states`] although no record is
    /// ever removed; see [`Fsm::transition_record_count`].
    pub fn transition_count(&self) -> usize {
        self.transitions.iter().filter(|t| t.is_live()).count()
    }

    /// Number of transition records ever created, fused ones included. Never decreases.
    pub fn transition_record_count(&self) -> usize {
        self.transitions.len()
    }

    /// The id that the next allocated state will get.
    pub fn next_state_id(&self) -> StateId {
        StateId::from_index(self.states.len())
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn contains(&self, id: StateId) -> bool {
        self.state(id).is_some()
    }

    /// Returns the state with the given id if it is live.
    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.get(id.index())?.state()
    }

    fn state_mut(&mut self, id: StateId) -> Option<&mut State> {
        self.states.get_mut(id.index())?.state_mut()
    }

    fn live(&self, id: StateId) -> Result<&State, FsmError> {
        self.state(id).ok_or(FsmError::UnknownState(id))
    }

    fn live_mut(&mut self, id: StateId) -> Result<&mut State, FsmError> {
        self.state_mut(id).ok_or(FsmError::UnknownState(id))
    }

    /// Follows the chain of merges starting at `id` and returns the live state that `id`
    /// ended up in. Gives back `None` for ids that were never allocated.
    pub fn resolve(&self, mut id: StateId) -> Option<StateId> {
        loop {
            match self.states.get(id.index())?.merged_into() {
                Some(into) => id = into,
                None => return Some(id),
            }
        }
    }

    /// Iterates over the ids of all live states in increasing order.
    pub fn state_ids(&self) -> impl Iterator<Item = StateId> + '_ {
        self.states().map(State::id)
    }

    /// Iterates over all live states in increasing order of their ids.
    pub fn states(&self) -> impl Iterator<Item = &State> + '_ {
        self.states.iter().filter_map(StateSlot::state)
    }

    /// Ids of all accepting states.
    pub fn accepting_states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.states().filter(|s| s.is_end()).map(State::id)
    }

    /// Iterates over the live transitions in creation order.
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> + '_ {
        self.transitions.iter().filter(|t| t.is_live())
    }

    /// Gives the record of any transition that was ever created, including fused ones.
    pub fn transition(&self, id: TransitionId) -> Option<&Transition> {
        self.transitions.get(id.index())
    }

    /// Follows fusions starting at `id` and returns the live transition it ended up in.
    pub fn resolve_transition(&self, mut id: TransitionId) -> Option<TransitionId> {
        loop {
            match self.transition(id)?.fused_into() {
                Some(into) => id = into,
                None => return Some(id),
            }
        }
    }

    /// Iterates over the live transitions leaving `source`.
    pub fn transitions_from(&self, source: StateId) -> impl Iterator<Item = &Transition> + '_ {
        self.state(source)
            .into_iter()
            .flat_map(|state| state.transitions.iter())
            .map(|id| &self.transitions[id.index()])
    }

    /// All live transitions on `symbol` leaving `source`. While the automaton is
    /// deterministic this has at most one element.
    pub fn matching(&self, source: StateId, symbol: &str) -> &[TransitionId] {
        self.by_state_symbol
            .get(&source)
            .and_then(|by_symbol| by_symbol.get(symbol))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The transition on `symbol` leaving `source`, if one exists.
    pub fn lookup(&self, source: StateId, symbol: &str) -> Option<&Transition> {
        self.matching(source, symbol)
            .first()
            .map(|id| &self.transitions[id.index()])
    }

    pub fn successor(&self, source: StateId, symbol: &str) -> Option<StateId> {
        self.lookup(source, symbol).map(Transition::target)
    }

    /// All symbols that occur on some live transition, in sorted order.
    pub fn alphabet(&self) -> math::OrderedSet<&str> {
        self.transitions().map(Transition::symbol).collect()
    }

    /// Runs `word` from the start state and returns the reached state. Gives back `None` if
    /// some symbol has no transition or the automaton has no start state.
    pub fn run<I, S>(&self, word: I) -> Option<StateId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        word.into_iter()
            .try_fold(self.start?, |state, symbol| self.successor(state, symbol.as_ref()))
    }

    /// Whether the run on `word` exists and ends in an accepting state.
    pub fn accepts<I, S>(&self, word: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.run(word)
            .and_then(|reached| self.state(reached))
            .is_some_and(State::is_end)
    }

    /// Counts one more session passing through the given state.
    pub fn record_visit(&mut self, id: StateId) -> Result<(), FsmError> {
        self.live_mut(id)?.visit_count += 1;
        Ok(())
    }

    /// Marks the given state as accepting.
    pub fn set_accepting(&mut self, id: StateId) -> Result<(), FsmError> {
        self.live_mut(id)?.is_end = true;
        Ok(())
    }

    /// Adds a transition without payload, see [`Fsm::add_transition_with`].
    pub fn add_transition<S: Into<Symbol>>(
        &mut self,
        source: StateId,
        symbol: S,
        target: StateId,
    ) -> Result<TransitionId, FsmError> {
        self.add_transition_with(source, symbol, target, Payload::default())
    }

    /// Adds a transition from `source` to `target` on `symbol` and registers it in the lookup
    /// index and the neighbor maps. Fails if one of the states is not live or if `source`
    /// already has a transition on `symbol`.
    pub fn add_transition_with<S: Into<Symbol>>(
        &mut self,
        source: StateId,
        symbol: S,
        target: StateId,
        payload: Payload,
    ) -> Result<TransitionId, FsmError> {
        let symbol = symbol.into();
        self.live(source)?;
        self.live(target)?;
        if !self.matching(source, &symbol).is_empty() {
            return Err(FsmError::Nondeterministic {
                state: source,
                symbol,
            });
        }

        let id = TransitionId::from_index(self.transitions.len());
        trace!("adding transition {id}: {source} --[{symbol}]--> {target}");
        self.by_state_symbol
            .entry(source)
            .or_default()
            .entry(symbol.clone())
            .or_default()
            .push(id);
        let source_state = self.live_mut(source)?;
        source_state.next.insert(symbol.clone(), target);
        source_state.transitions.push(id);
        self.live_mut(target)?.prev.insert(symbol.clone(), source);
        self.transitions
            .push(Transition::new(id, source, symbol, target, payload));
        Ok(id)
    }

    /// Merges `absorb` into `keep`.
    ///
    /// Unknown ids are reported as an error. Merging a state with itself does nothing, and so
    /// does merging when either state is accepting: an accepting state is never absorbed,
    /// which is reported as [`MergeOutcome::RefusedAccepting`].
    ///
    /// Otherwise `keep` gets the sum of both visit counts, becomes the start state if `absorb`
    /// was it, and takes over every transition leaving `absorb`. Every transition into
    /// `absorb` is redirected to `keep`. The slot of `absorb` is vacated and remembers `keep`,
    /// then the lookup index and neighbor maps are rebuilt from the transition list.
    ///
    /// If both states have a transition on the same symbol, the result has two transitions on
    /// that symbol until the caller also merges their targets. Once the targets coincide the
    /// duplicate is fused into the older transition.
    pub fn merge_two_states(
        &mut self,
        keep: StateId,
        absorb: StateId,
    ) -> Result<MergeOutcome, FsmError> {
        let kept = self.live(keep)?;
        let absorbed = self.live(absorb)?;
        if keep == absorb {
            return Ok(MergeOutcome::SameState);
        }
        if kept.is_end || absorbed.is_end {
            trace!("refusing to merge {absorb} into {keep}, accepting state involved");
            return Ok(MergeOutcome::RefusedAccepting);
        }

        let Some(absorbed) = self.states[absorb.index()].vacate(keep) else {
            return Err(FsmError::UnknownState(absorb));
        };
        let was_start = absorbed.is_start || self.start == Some(absorb);
        let kept = self.live_mut(keep)?;
        kept.visit_count += absorbed.visit_count;
        kept.is_end |= absorbed.is_end;
        if was_start {
            kept.is_start = true;
            self.start = Some(keep);
        }

        for transition in self.transitions.iter_mut() {
            if transition.source == absorb {
                transition.source = keep;
            }
            if transition.target == absorb {
                transition.target = keep;
            }
        }
        trace!("merged {absorb} into {keep}");

        self.rebuild_index();
        debug_assert_eq!(self.validate_structure(), Ok(()));
        Ok(MergeOutcome::Merged)
    }

    /// Recomputes the lookup index, the per state transition lists and the neighbor maps from
    /// the transition list. A live transition whose source, symbol and target equal those of
    /// an older live transition is fused into that one.
    fn rebuild_index(&mut self) {
        let Self {
            states,
            transitions,
            by_state_symbol,
            ..
        } = self;

        by_state_symbol.clear();
        for state in states.iter_mut().filter_map(StateSlot::state_mut) {
            state.transitions.clear();
            state.next.clear();
            state.prev.clear();
        }

        for position in 0..transitions.len() {
            if !transitions[position].is_live() {
                continue;
            }
            let Transition {
                id,
                source,
                target,
                ref symbol,
                ..
            } = transitions[position];
            let symbol = symbol.clone();

            let matching = by_state_symbol
                .entry(source)
                .or_default()
                .entry(symbol.clone())
                .or_default();
            if let Some(&older) = matching
                .iter()
                .find(|other| transitions[other.index()].target == target)
            {
                trace!("fusing {id} into parallel transition {older}");
                transitions[position].fused_into = Some(older);
                continue;
            }
            matching.push(id);

            if let Some(state) = states[source.index()].state_mut() {
                state.transitions.push(id);
                state.next.insert(symbol.clone(), target);
            }
            if let Some(state) = states[target.index()].state_mut() {
                state.prev.insert(symbol, source);
            }
        }
    }

    /// Checks all global invariants: a unique start state, determinism, no transition touching
    /// a dead state and an index that agrees with the transition list.
    pub fn validate(&self) -> Result<(), FsmError> {
        self.validate_structure()?;
        for (state, by_symbol) in &self.by_state_symbol {
            if let Some((symbol, _)) = by_symbol.iter().find(|(_, ids)| ids.len() > 1) {
                return Err(InvariantViolation::NonDeterministic {
                    state: *state,
                    symbol: symbol.clone(),
                }
                .into());
            }
        }
        for state in self.states() {
            let expected = self
                .transitions_from(state.id)
                .map(|t| (t.symbol(), t.target()))
                .collect_vec();
            let recorded = state
                .next
                .iter()
                .map(|(symbol, target)| (symbol.as_str(), *target))
                .collect_vec();
            if expected != recorded {
                return Err(InvariantViolation::StaleNeighbors(state.id).into());
            }
        }
        Ok(())
    }

    /// Checks the invariants that must hold even while a caller is in the middle of a
    /// sequence of merges, i.e. everything except determinism.
    fn validate_structure(&self) -> Result<(), InvariantViolation> {
        if !self.states.is_empty() {
            let flagged = self.states().filter(|s| s.is_start).map(State::id).collect_vec();
            if flagged.len() != 1 {
                return Err(InvariantViolation::StartCount(flagged.len()));
            }
            if self.start != Some(flagged[0]) {
                return Err(InvariantViolation::StartMismatch(self.start));
            }
        }

        for transition in &self.transitions {
            if !self.contains(transition.source) || !self.contains(transition.target) {
                return Err(InvariantViolation::DanglingTransition(transition.id));
            }
            let indexed = self
                .matching(transition.source, &transition.symbol)
                .contains(&transition.id);
            if indexed != transition.is_live() {
                return Err(InvariantViolation::StaleIndex(transition.id));
            }
        }

        let indexed: usize = self
            .by_state_symbol
            .values()
            .flat_map(|by_symbol| by_symbol.values())
            .map(Vec::len)
            .sum();
        if indexed != self.transition_count() {
            let stray = self
                .by_state_symbol
                .values()
                .flat_map(|by_symbol| by_symbol.values())
                .flatten()
                .find(|id| !self.transitions[id.index()].is_live())
                .copied()
                .unwrap_or(TransitionId::new(0));
            return Err(InvariantViolation::StaleIndex(stray));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// s0 -a-> s1 -b-> s2 (end), s0 -c-> s3 -b-> s4
    fn chain() -> (Fsm, [StateId; 5]) {
        let mut fsm = Fsm::new();
        let s0 = fsm.new_state(true, false);
        let s1 = fsm.new_state(false, false);
        let s2 = fsm.new_state(false, true);
        let s3 = fsm.new_state(false, false);
        let s4 = fsm.new_state(false, false);
        fsm.add_transition(s0, "a", s1).unwrap();
        fsm.add_transition(s1, "b", s2).unwrap();
        fsm.add_transition(s0, "c", s3).unwrap();
        fsm.add_transition(s3, "b", s4).unwrap();
        (fsm, [s0, s1, s2, s3, s4])
    }

    #[test]
    fn new_state_allocates_increasing_ids() {
        let mut fsm = Fsm::new();
        assert_eq!(fsm.start(), None);
        let s0 = fsm.new_state(true, false);
        let s1 = fsm.new_state(false, true);
        assert_eq!((s0.raw(), s1.raw()), (0, 1));
        assert_eq!(fsm.start(), Some(s0));
        assert_eq!(fsm.accepting_states().collect_vec(), vec![s1]);
        assert_eq!(fsm.next_state_id(), StateId::new(2));
        assert!(fsm.validate().is_ok());
    }

    #[test]
    fn second_start_state_replaces_first() {
        let mut fsm = Fsm::new();
        let s0 = fsm.new_state(true, false);
        let s1 = fsm.new_state(true, false);
        assert_eq!(fsm.start(), Some(s1));
        assert!(!fsm.state(s0).unwrap().is_start());
        assert!(fsm.validate().is_ok());
    }

    #[test]
    fn adding_transitions_updates_index_and_neighbors() {
        let (fsm, [s0, s1, ..]) = chain();
        assert_eq!(fsm.transition_count(), 4);
        assert_eq!(fsm.successor(s0, "a"), Some(s1));
        assert_eq!(fsm.successor(s0, "b"), None);
        assert_eq!(fsm.state(s1).unwrap().prev_states().get("a"), Some(&s0));
        assert_eq!(fsm.matching(s0, "c").len(), 1);
        assert_eq!(
            fsm.alphabet().into_iter().collect_vec(),
            vec!["a", "b", "c"]
        );
        assert!(fsm.validate().is_ok());
    }

    #[test]
    fn duplicate_symbol_is_rejected() {
        let (mut fsm, [s0, s1, ..]) = chain();
        assert_eq!(
            fsm.add_transition(s0, "a", s1),
            Err(FsmError::Nondeterministic {
                state: s0,
                symbol: "a".into()
            })
        );
        assert_eq!(fsm.transition_count(), 4);
    }

    #[test]
    fn unknown_states_are_errors() {
        let (mut fsm, [s0, ..]) = chain();
        let ghost = StateId::new(42);
        assert_eq!(
            fsm.merge_two_states(s0, ghost),
            Err(FsmError::UnknownState(ghost))
        );
        assert_eq!(
            fsm.add_transition(ghost, "x", s0),
            Err(FsmError::UnknownState(ghost))
        );
        assert_eq!(fsm.record_visit(ghost), Err(FsmError::UnknownState(ghost)));
    }

    #[test]
    fn self_merge_is_noop() {
        let (mut fsm, [_, s1, ..]) = chain();
        assert_eq!(fsm.merge_two_states(s1, s1), Ok(MergeOutcome::SameState));
        assert_eq!(fsm.size(), 5);
    }

    #[test]
    fn accepting_merge_is_refused() {
        let (mut fsm, [_, s1, s2, s3, _]) = chain();
        let before = (fsm.size(), fsm.transition_count());
        assert_eq!(
            fsm.merge_two_states(s1, s2),
            Ok(MergeOutcome::RefusedAccepting)
        );
        assert_eq!(
            fsm.merge_two_states(s2, s3),
            Ok(MergeOutcome::RefusedAccepting)
        );
        assert_eq!((fsm.size(), fsm.transition_count()), before);
        assert!(fsm.contains(s2));
    }

    #[test_log::test]
    fn merge_reparents_and_redirects() {
        let (mut fsm, [s0, s1, s2, s3, s4]) = chain();
        fsm.record_visit(s1).unwrap();
        fsm.record_visit(s3).unwrap();
        fsm.record_visit(s3).unwrap();

        assert_eq!(fsm.merge_two_states(s1, s3), Ok(MergeOutcome::Merged));
        assert!(!fsm.contains(s3));
        assert_eq!(fsm.resolve(s3), Some(s1));
        assert_eq!(fsm.size(), 4);
        assert_eq!(fsm.state(s1).unwrap().visit_count(), 3);
        assert_eq!(fsm.successor(s0, "c"), Some(s1));
        // both b transitions now leave s1, the automaton is temporarily non-deterministic
        assert_eq!(fsm.matching(s1, "b").len(), 2);
        assert!(fsm.validate().is_err());

        assert_eq!(
            fsm.merge_two_states(s4, s2),
            Ok(MergeOutcome::RefusedAccepting)
        );
        assert!(fsm
            .transitions()
            .all(|t| fsm.contains(t.source()) && fsm.contains(t.target())));
    }

    #[test]
    fn parallel_transitions_are_fused() {
        let mut fsm = Fsm::new();
        let s0 = fsm.new_state(true, false);
        let s1 = fsm.new_state(false, false);
        let s2 = fsm.new_state(false, false);
        let s3 = fsm.new_state(false, true);
        let first = fsm.add_transition(s0, "a", s1).unwrap();
        fsm.add_transition(s0, "b", s2).unwrap();
        let second = fsm
            .add_transition_with(s1, "x", s3, Payload::default().with_output("late"))
            .unwrap();
        let third = fsm.add_transition(s2, "x", s3).unwrap();

        assert_eq!(fsm.transition_record_count(), 4);
        assert!(fsm.merge_two_states(s1, s2).unwrap().is_merged());
        assert_eq!(fsm.transition_count(), 3);
        assert_eq!(fsm.transition_record_count(), 4);
        assert_eq!(fsm.transitions().count(), 3);
        assert_eq!(fsm.matching(s1, "x"), &[second]);
        assert_eq!(fsm.transition(third).unwrap().fused_into(), Some(second));
        assert_eq!(fsm.resolve_transition(third), Some(second));
        assert_eq!(fsm.resolve_transition(first), Some(first));
        assert_eq!(fsm.transition(second).unwrap().output(), Some("late"));
        assert_eq!(fsm.successor(s0, "b"), Some(s1));
        assert!(fsm.validate().is_ok());
    }

    #[test]
    fn merging_start_moves_start() {
        let mut fsm = Fsm::new();
        let s0 = fsm.new_state(true, false);
        let s1 = fsm.new_state(false, false);
        fsm.add_transition(s0, "a", s1).unwrap();
        fsm.add_transition(s1, "b", s1).unwrap();

        assert!(fsm.merge_two_states(s1, s0).unwrap().is_merged());
        assert_eq!(fsm.start(), Some(s1));
        assert!(fsm.state(s1).unwrap().is_start());
        assert_eq!(fsm.successor(s1, "a"), Some(s1));
        assert_eq!(fsm.successor(s1, "b"), Some(s1));
        assert!(fsm.validate().is_ok());
    }

    #[test]
    fn payload_survives_reparenting() {
        let mut fsm = Fsm::new();
        let s0 = fsm.new_state(true, false);
        let s1 = fsm.new_state(false, false);
        let s2 = fsm.new_state(false, false);
        let s3 = fsm.new_state(false, true);
        let id = fsm
            .add_transition_with(
                s2,
                "z",
                s3,
                Payload::default().with_output("o").with_probability(0.5),
            )
            .unwrap();
        fsm.add_transition(s0, "a", s1).unwrap();

        fsm.merge_two_states(s1, s2).unwrap();
        let moved = fsm.transition(id).unwrap();
        assert_eq!(moved.source(), s1);
        assert_eq!(moved.output(), Some("o"));
        assert_eq!(moved.probability(), Some(0.5));
    }

    #[test]
    fn runs_words() {
        let (fsm, [_, _, s2, _, s4]) = chain();
        assert_eq!(fsm.run(["a", "b"]), Some(s2));
        assert_eq!(fsm.run(["c", "b"]), Some(s4));
        assert_eq!(fsm.run(["b"]), None);
        assert!(fsm.accepts(["a", "b"]));
        assert!(!fsm.accepts(["c", "b"]));
        assert!(!fsm.accepts(Vec::<String>::new()));
        assert_eq!(Fsm::new().run(["a"]), None);
    }
}
