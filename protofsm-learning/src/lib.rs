//! Learning protocol state machines from observed message sequences.
//!
//! The usual flow is to abstract each observed message into a symbol (see [`abstraction`]),
//! group the symbols per session, build a prefix tree acceptor from them with [`PtaInfer`]
//! and finally compress it with [`KTails`].

pub mod session;
pub use session::{Direction, MessageEvent, SessionKey, Trace};

pub mod features;
pub use features::{ControlFeatureExtractor, FeatureExtractor, FeatureVector};

pub mod clustering;
pub use clustering::ClusteringAlgorithm;

pub mod abstraction;
pub use abstraction::{ClusterAbstractor, MessageAbstractor};

mod error;
pub use error::{AbstractionError, PipelineError, SampleParseError};

pub mod config;
pub use config::{ClusteringConfig, PipelineConfig};

pub mod prefixtree;
pub use prefixtree::{FsmInfer, PtaInfer, Sequences};

pub mod merge;
pub use merge::{ktails::KTails, StateMerger};

pub mod sample;
pub use sample::SampleFormat;

pub mod pipeline;
pub use pipeline::ControlFlowPipeline;

pub mod prelude {
    pub use super::{
        ClusteringConfig, ControlFlowPipeline, FsmInfer, KTails, PipelineConfig, PtaInfer,
        Sequences, StateMerger,
    };
    pub use protofsm_core::prelude::*;
}
