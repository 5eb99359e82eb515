use protofsm_learning::{
    clustering::{Hierarchical, KMeans},
    prelude::*,
    sample, ClusterAbstractor, ControlFeatureExtractor, Direction, MessageAbstractor,
    MessageEvent, SessionKey, Trace,
};

const SMTP: &str = "
# observed mail sessions
s1: HELO MAIL RCPT DATA QUIT
s2: HELO MAIL RCPT RCPT DATA QUIT
s3: EHLO MAIL RCPT DATA QUIT
s4: HELO QUIT
";

#[test_log::test]
fn sample_to_compressed_automaton() {
    let sequences = sample::try_from_str(SMTP).unwrap();
    let pta = PtaInfer.infer(&sequences);
    assert!(pta.validate().is_ok());
    assert_eq!(pta.accepting_states().count(), 4);
    assert_eq!(pta.state(pta.start().unwrap()).unwrap().visit_count(), 4);

    let (fsm, merged) = KTails::new(2).merge_counted(pta.clone());
    assert!(fsm.validate().is_ok());
    assert!(fsm.size() + merged == pta.size());
    assert!(fsm.size() <= pta.size());
    for symbols in sequences.values() {
        assert!(fsm.accepts(symbols), "{symbols:?} rejected");
    }

    let (again, merged_again) = KTails::new(2).merge_counted(fsm.clone());
    assert_eq!(merged_again, 0);
    assert_eq!(again.size(), fsm.size());
}

#[test]
fn prefix_tree_branches_stay_apart_with_lookahead() {
    // both greetings continue with MAIL, but into different states of the prefix tree
    let sequences = sample::try_from_str(
        "
        a: HELO MAIL DATA
        b: EHLO MAIL RCPT
        ",
    )
    .unwrap();
    let pta = PtaInfer.infer(&sequences);
    let (fsm, merged) = KTails::new(1).merge_counted(pta.clone());
    assert_eq!(merged, 0);
    assert_eq!(fsm.size(), pta.size());
    assert_ne!(fsm.run(["HELO"]), fsm.run(["EHLO"]));
}

#[test]
fn zero_tails_joins_greetings() {
    let sequences = sample::try_from_str(
        "
        a: HELO MAIL DATA
        b: EHLO MAIL RCPT
        ",
    )
    .unwrap();
    let (fsm, _) = KTails::new(0).merge_counted(PtaInfer.infer(&sequences));
    assert!(fsm.validate().is_ok());
    // only the accepting states stay separate
    assert_eq!(fsm.size(), 3);
    assert_eq!(fsm.run(["HELO"]), fsm.run(["EHLO"]));
    assert!(fsm.accepts(["HELO", "MAIL", "RCPT"]));
    assert!(fsm.accepts(["EHLO", "MAIL", "DATA"]));
}

#[test]
fn csv_and_text_agree() {
    let csv = "s1,HELO\ns1,QUIT\ns2,HELO\ns2,MAIL\ns2,QUIT\n";
    let text = "s1: HELO QUIT\ns2: HELO MAIL QUIT\n";
    let from_csv = PtaInfer.infer(&sample::try_from_csv(csv.as_bytes()).unwrap());
    let from_text = PtaInfer.infer(&sample::try_from_str(text).unwrap());
    assert_eq!(from_csv.size(), from_text.size());
    assert_eq!(from_csv.to_string(), from_text.to_string());
}

fn ftp_trace() -> Trace {
    let client = |port| SessionKey::new("192.168.0.5", port, "192.168.0.1", 21, "tcp");
    let mut events = vec![];
    for (i, port) in [50000u16, 50001, 50002].into_iter().enumerate() {
        let t = i as f64 * 10.0;
        events.push(MessageEvent::new(
            client(port),
            t,
            "220 ready",
            Direction::ServerToClient,
        ));
        events.push(MessageEvent::new(
            client(port),
            t + 1.0,
            "USER anonymous",
            Direction::ClientToServer,
        ));
        events.push(MessageEvent::new(
            client(port),
            t + 2.0,
            "221",
            Direction::ServerToClient,
        ));
    }
    events.into_iter().collect()
}

#[test_log::test]
fn pipeline_with_each_clustering() {
    for clustering in [
        ClusteringConfig::RuleBased,
        ClusteringConfig::kmeans(3),
        ClusteringConfig::Hierarchical {
            distance_threshold: 1.5,
        },
    ] {
        let config = PipelineConfig::default()
            .with_clustering(clustering.clone())
            .with_ktails(1);
        let fsm = ControlFlowPipeline::from_config(&config)
            .run(&ftp_trace())
            .unwrap();
        assert!(fsm.validate().is_ok(), "{clustering:?}");
        assert!(fsm.accepting_states().count() >= 1);
        assert!(fsm.size() >= 2);
    }
}

#[test]
fn kmeans_and_hierarchical_group_close_vectors() {
    let points = vec![
        vec![1.0, 0.0],
        vec![1.2, 0.0],
        vec![50.0, 1.0],
        vec![51.0, 1.0],
    ];
    for algorithm in [
        Box::new(KMeans::new(2).with_seed(7)) as Box<dyn protofsm_learning::ClusteringAlgorithm>,
        Box::new(Hierarchical::new(5.0)),
    ] {
        let mut abstractor = ClusterAbstractor::new(algorithm);
        abstractor.fit(&points).unwrap();
        let symbols = abstractor.abstract_all(&points).unwrap();
        assert_eq!(symbols[0], symbols[1]);
        assert_eq!(symbols[2], symbols[3]);
        assert_ne!(symbols[0], symbols[2]);
    }
}

#[test]
fn extractor_dimension() {
    let trace = ftp_trace();
    let sessions = trace.sessions();
    let (_, events) = sessions.first().unwrap();
    let vectors = protofsm_learning::FeatureExtractor::extract(&ControlFeatureExtractor, events);
    assert_eq!(vectors.len(), 3);
    assert!(vectors
        .iter()
        .all(|v| v.len() == ControlFeatureExtractor::DIMENSION));
}
