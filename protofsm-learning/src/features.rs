use crate::session::MessageEvent;

/// One numeric vector describing a single message event.
pub type FeatureVector = Vec<f64>;

/// Turns the message events of a session into feature vectors, one per event.
pub trait FeatureExtractor {
    fn extract(&self, events: &[&MessageEvent]) -> Vec<FeatureVector>;
}

/// Describes the control flow relevant properties of a message: payload length, the two
/// ports of its session and its direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlFeatureExtractor;

impl ControlFeatureExtractor {
    pub const DIMENSION: usize = 4;
}

impl FeatureExtractor for ControlFeatureExtractor {
    fn extract(&self, events: &[&MessageEvent]) -> Vec<FeatureVector> {
        events
            .iter()
            .map(|event| {
                vec![
                    event.payload.len() as f64,
                    f64::from(event.session_key.port1),
                    f64::from(event.session_key.port2),
                    event.direction.to_feature(),
                ]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Direction, SessionKey};

    #[test]
    fn extracts_control_features() {
        let key = SessionKey::new("1.1.1.1", 1234, "2.2.2.2", 53, "udp");
        let query = MessageEvent::new(key.clone(), 0.0, vec![0; 12], Direction::ClientToServer);
        let empty = MessageEvent::new(key, 0.5, vec![], Direction::ServerToClient);

        let features = ControlFeatureExtractor.extract(&[&query, &empty]);
        assert_eq!(features[0], vec![12.0, 1234.0, 53.0, 0.0]);
        assert_eq!(features[1], vec![0.0, 1234.0, 53.0, 1.0]);
        assert!(features
            .iter()
            .all(|f| f.len() == ControlFeatureExtractor::DIMENSION));
    }
}
