use itertools::Itertools;
use owo_colors::OwoColorize;
use protofsm_core::{math, Fsm, Symbol};
use tracing::{debug, info, trace};

use crate::{
    ClusterAbstractor, ControlFeatureExtractor, FeatureExtractor, FsmInfer, KTails,
    MessageAbstractor, PipelineConfig, PipelineError, PtaInfer, Sequences, StateMerger, Trace,
};

/// Infers a control flow automaton from a trace of message events.
///
/// The events are grouped into sessions and turned into feature vectors by the extractor.
/// The abstractor is fitted on the vectors of all sessions together and then maps every
/// message to a symbol. The symbol sequences of the sessions make up a prefix tree
/// acceptor, which is compressed with k-tails if a lookahead is configured.
#[derive(Debug)]
pub struct ControlFlowPipeline<E = ControlFeatureExtractor> {
    extractor: E,
    abstractor: ClusterAbstractor,
    merger: Option<KTails>,
}

impl ControlFlowPipeline {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            ControlFeatureExtractor,
            ClusterAbstractor::new(config.clustering.build()),
            config.k.map(KTails::new),
        )
    }
}

impl Default for ControlFlowPipeline {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl<E: FeatureExtractor> ControlFlowPipeline<E> {
    pub fn new(extractor: E, abstractor: ClusterAbstractor, merger: Option<KTails>) -> Self {
        Self {
            extractor,
            abstractor,
            merger,
        }
    }

    pub fn abstractor(&self) -> &ClusterAbstractor {
        &self.abstractor
    }

    /// Fits the abstractor on `trace` and gives the symbol sequence of every session, keyed
    /// by the textual form of the session key.
    pub fn sequences(&mut self, trace: &Trace) -> Result<Sequences<String>, PipelineError> {
        let sessions = trace.sessions();
        let features: math::Map<String, Vec<_>> = sessions
            .iter()
            .map(|(key, events)| (key.to_string(), self.extractor.extract(events)))
            .collect();

        let all = features.values().flatten().cloned().collect_vec();
        if all.is_empty() {
            return Err(PipelineError::NoEvents);
        }
        self.abstractor.fit(&all)?;

        let sequences = features
            .into_iter()
            .map(|(key, vectors)| {
                let symbols: Vec<Symbol> = self.abstractor.abstract_all(&vectors)?;
                trace!("session {key}: {}", symbols.join(" "));
                Ok((key, symbols))
            })
            .collect::<Result<Sequences<String>, PipelineError>>()?;
        debug!(
            "abstracted {} messages of {} sessions",
            all.len(),
            sequences.len()
        );
        Ok(sequences)
    }

    /// Runs all stages on `trace`.
    pub fn run(&mut self, trace: &Trace) -> Result<Fsm, PipelineError> {
        let sequences = self.sequences(trace)?;
        let pta = PtaInfer.infer(&sequences);
        info!(
            "{} has {} states and {} transitions",
            "prefix tree".bold(),
            pta.size(),
            pta.transition_count()
        );
        let Some(merger) = self.merger else {
            return Ok(pta);
        };
        let fsm = merger.merge(pta);
        info!(
            "{} result has {} states and {} transitions",
            "k-tails".bold(),
            fsm.size(),
            fsm.transition_count()
        );
        Ok(fsm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClusteringConfig, Direction, MessageEvent, SessionKey};

    fn event(port: u16, timestamp: f64, payload: &str, direction: Direction) -> MessageEvent {
        MessageEvent::new(
            SessionKey::new("10.0.0.1", port, "10.0.0.2", 21, "tcp"),
            timestamp,
            payload.as_bytes(),
            direction,
        )
    }

    fn trace() -> Trace {
        use Direction::*;
        Trace::from_iter([
            event(4000, 0.0, "USER a", ClientToServer),
            event(4001, 0.5, "USER b", ClientToServer),
            event(4000, 1.0, "331 ok", ServerToClient),
            event(4001, 1.5, "331 ok", ServerToClient),
            event(4000, 2.0, "QUIT", ClientToServer),
        ])
    }

    #[test_log::test]
    fn rule_based_sequences() {
        let config = PipelineConfig::default().with_clustering(ClusteringConfig::RuleBased);
        let mut pipeline = ControlFlowPipeline::from_config(&config);
        let sequences = pipeline.sequences(&trace()).unwrap();
        assert_eq!(sequences.len(), 2);
        let first = &sequences["10.0.0.1:4000 <-> 10.0.0.2:21 (tcp)"];
        let second = &sequences["10.0.0.1:4001 <-> 10.0.0.2:21 (tcp)"];
        assert_eq!(first, &vec!["C0", "C1", "C2"]);
        assert_eq!(second, &vec!["C3", "C4"]);
        assert!(pipeline.abstractor().is_fitted());
    }

    #[test_log::test]
    fn run_builds_prefix_tree() {
        let config = PipelineConfig::default().with_clustering(ClusteringConfig::RuleBased);
        let fsm = ControlFlowPipeline::from_config(&config)
            .run(&trace())
            .unwrap();
        assert_eq!(fsm.size(), 6);
        assert!(fsm.accepts(["C0", "C1", "C2"]));
        assert!(fsm.accepts(["C3", "C4"]));
        assert!(fsm.validate().is_ok());
    }

    #[test]
    fn empty_trace_is_rejected() {
        let mut pipeline = ControlFlowPipeline::default();
        assert_eq!(
            pipeline.run(&Trace::default()).unwrap_err(),
            PipelineError::NoEvents
        );
    }
}
