use std::fmt::Display;

use itertools::Itertools;
use owo_colors::OwoColorize;
use protofsm_core::{math, Fsm, MergeOutcome, State, StateId, Symbol};
use rayon::prelude::*;
use tracing::{debug, trace};

use super::StateMerger;

/// Canonical description of what can be observed from a state within a bounded number of
/// steps. At depth zero only acceptance is visible; above that, the signature lists the
/// outgoing symbols in sorted order together with the signatures of their targets at one
/// level less.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Signature {
    End,
    NonEnd,
    Tail(Vec<(Symbol, Signature)>),
}

impl Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signature::End => write!(f, "END"),
            Signature::NonEnd => write!(f, "NONEND"),
            Signature::Tail(tail) => write!(
                f,
                "({})",
                tail.iter()
                    .map(|(symbol, next)| format!("{symbol}: {next}"))
                    .join(", ")
            ),
        }
    }
}

/// The k-tails state merging algorithm. Two states are considered equivalent if they have
/// the same [`Signature`] at depth `k`. The states of each equivalence class are merged into
/// the first one.
///
/// A pair is only merged if every symbol both states have leads to the same state, treating
/// the two states themselves as one. Otherwise the merge would leave two transitions on one
/// symbol, and the pair is skipped. Accepting states are never absorbed. Since every merge
/// can make further targets coincide, rounds are repeated until one performs no merge, so
/// running the merger on its own output does not change anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KTails {
    k: usize,
}

impl KTails {
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Computes the depth `k` signature of `state`, `None` if the state is not live.
    pub fn signature(&self, fsm: &Fsm, state: StateId) -> Option<Signature> {
        signature_at(fsm, state, self.k)
    }

    /// Computes the signature of every live state. The computation only reads the
    /// automaton, so the states are processed in parallel.
    pub fn signatures(&self, fsm: &Fsm) -> math::Map<StateId, Signature> {
        let ids = fsm.state_ids().collect_vec();
        ids.par_iter()
            .filter_map(|id| Some((*id, self.signature(fsm, *id)?)))
            .collect::<Vec<_>>()
            .into_iter()
            .collect()
    }

    /// Groups the live states by signature. Buckets appear in the order of their smallest
    /// member and list their members in increasing order.
    pub fn buckets(&self, fsm: &Fsm) -> math::Map<Signature, Vec<StateId>> {
        let mut buckets: math::Map<Signature, Vec<StateId>> = math::Map::default();
        for (state, signature) in self.signatures(fsm) {
            buckets.entry(signature).or_default().push(state);
        }
        buckets
    }

    /// Runs k-tails on `fsm` and additionally returns the number of performed merges.
    pub fn merge_counted(&self, mut fsm: Fsm) -> (Fsm, usize) {
        let before = fsm.size();
        let mut total = 0;
        for round in 1.. {
            let merged = self.merge_round(&mut fsm);
            trace!("round {round} performed {merged} merges");
            if merged == 0 {
                break;
            }
            total += merged;
        }
        debug!(
            "{} with k = {} merged {total} states, {before} -> {} states",
            "k-tails".bold(),
            self.k,
            fsm.size()
        );
        debug_assert_eq!(fsm.validate(), Ok(()));
        (fsm, total)
    }

    /// Computes all buckets on the current automaton and merges each of them into its first
    /// member. Members that were absorbed earlier in the same round are resolved to the state
    /// that absorbed them.
    fn merge_round(&self, fsm: &mut Fsm) -> usize {
        let buckets = self.buckets(fsm);
        trace!("{} buckets for {} states", buckets.len(), fsm.size());

        let mut merged = 0;
        for (signature, members) in buckets.iter().filter(|(_, members)| members.len() > 1) {
            trace!("bucket {signature} with members {members:?}");
            let representative = members[0];
            for &other in &members[1..] {
                let (Some(keep), Some(absorb)) = (fsm.resolve(representative), fsm.resolve(other))
                else {
                    continue;
                };
                let (Some(kept), Some(absorbed)) = (fsm.state(keep), fsm.state(absorb)) else {
                    continue;
                };
                if let Some(symbol) = conflicting_symbol(kept, absorbed) {
                    trace!("refusing to merge {absorb} into {keep}, `{symbol}` leads to different states");
                    continue;
                }
                match fsm
                    .merge_two_states(keep, absorb)
                    .expect("resolved bucket members are live")
                {
                    MergeOutcome::Merged => merged += 1,
                    outcome => trace!("merging {absorb} into {keep} gave {outcome:?}"),
                }
            }
        }
        merged
    }
}

impl StateMerger for KTails {
    fn merge(&self, fsm: Fsm) -> Fsm {
        self.merge_counted(fsm).0
    }
}

fn signature_at(fsm: &Fsm, id: StateId, depth: usize) -> Option<Signature> {
    let state = fsm.state(id)?;
    if depth == 0 {
        return Some(if state.is_end() {
            Signature::End
        } else {
            Signature::NonEnd
        });
    }
    state
        .next_states()
        .iter()
        .sorted_by(|a, b| a.0.cmp(b.0))
        .map(|(symbol, target)| Some((symbol.clone(), signature_at(fsm, *target, depth - 1)?)))
        .collect::<Option<Vec<_>>>()
        .map(Signature::Tail)
}

/// Finds a symbol on which `kept` and `absorbed` lead to different states, a transition into
/// `absorbed` counting as one into `kept`.
fn conflicting_symbol(kept: &State, absorbed: &State) -> Option<Symbol> {
    let redirect = |target: StateId| {
        if target == absorbed.id() {
            kept.id()
        } else {
            target
        }
    };
    absorbed
        .next_states()
        .iter()
        .find(|(symbol, target)| {
            kept.successor(symbol)
                .is_some_and(|existing| redirect(existing) != redirect(**target))
        })
        .map(|(symbol, _)| symbol.clone())
}
