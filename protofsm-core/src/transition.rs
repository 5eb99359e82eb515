use std::{fmt::Debug, sync::Arc};

use crate::{math, StateId, Symbol, TransitionId};

/// Variable valuation that guards and actions of an extended automaton operate on.
pub type Variables = math::OrderedMap<String, f64>;

/// A predicate over [`Variables`] that enables a transition. The core algorithms never
/// evaluate guards, they are carried along for consumers of the learned model.
#[derive(Clone)]
pub struct Guard(Arc<dyn Fn(&Variables) -> bool + Send + Sync>);

impl Guard {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Variables) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    pub fn evaluate(&self, variables: &Variables) -> bool {
        (self.0)(variables)
    }
}

impl Debug for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Guard(..)")
    }
}

/// Update of [`Variables`] that is performed when a transition is taken.
#[derive(Clone)]
pub struct Action(Arc<dyn Fn(&Variables) -> Variables + Send + Sync>);

impl Action {
    pub fn new<F>(update: F) -> Self
    where
        F: Fn(&Variables) -> Variables + Send + Sync + 'static,
    {
        Self(Arc::new(update))
    }

    pub fn apply(&self, variables: &Variables) -> Variables {
        (self.0)(variables)
    }
}

impl Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Action(..)")
    }
}

/// Passive annotations of a transition. None of them influence construction or merging,
/// but they are kept verbatim whenever the transition is re-parented.
#[derive(Clone, Debug, Default)]
pub struct Payload {
    pub guard: Option<Guard>,
    pub action: Option<Action>,
    pub output: Option<String>,
    pub probability: Option<f64>,
}

impl Payload {
    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_output<S: Into<String>>(mut self, output: S) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = Some(probability);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.guard.is_none()
            && self.action.is_none()
            && self.output.is_none()
            && self.probability.is_none()
    }
}

/// A labeled edge between two states.
#[derive(Clone, Debug)]
pub struct Transition {
    pub(crate) id: TransitionId,
    pub(crate) source: StateId,
    pub(crate) target: StateId,
    pub(crate) symbol: Symbol,
    pub(crate) payload: Payload,
    pub(crate) fused_into: Option<TransitionId>,
}

impl Transition {
    pub(crate) fn new(
        id: TransitionId,
        source: StateId,
        symbol: Symbol,
        target: StateId,
        payload: Payload,
    ) -> Self {
        Self {
            id,
            source,
            target,
            symbol,
            payload,
            fused_into: None,
        }
    }

    pub fn id(&self) -> TransitionId {
        self.id
    }

    pub fn source(&self) -> StateId {
        self.source
    }

    pub fn target(&self) -> StateId {
        self.target
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn guard(&self) -> Option<&Guard> {
        self.payload.guard.as_ref()
    }

    pub fn action(&self) -> Option<&Action> {
        self.payload.action.as_ref()
    }

    pub fn output(&self) -> Option<&str> {
        self.payload.output.as_deref()
    }

    pub fn probability(&self) -> Option<f64> {
        self.payload.probability
    }

    /// Merging states can turn two transitions into exact duplicates, i.e. same source,
    /// symbol and target. The younger one is then fused into the older one and stops being
    /// live. Fused transitions keep their record and payload, so their id stays resolvable.
    pub fn fused_into(&self) -> Option<TransitionId> {
        self.fused_into
    }

    pub fn is_live(&self) -> bool {
        self.fused_into.is_none()
    }
}
