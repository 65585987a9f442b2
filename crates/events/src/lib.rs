//! # Exchange Events
//!
//! Topic-tagged notifications (`orders`, `balances`, `trades`) published by the
//! exchange, a capture window that collects them around a scenario run, and the
//! per-topic count check applied afterwards.

pub mod capture;
pub mod error;
pub mod record;
pub mod source;

// --- Public API ---
pub use capture::{CapturedEvents, EventCapture};
pub use error::EventsError;
pub use record::{EventRecord, Topic};
pub use source::{ChannelEventSource, EventSource, WsEventSource};

/// Event totals a scenario run is expected to produce, per topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedCounts {
    pub orders: usize,
    pub balances: usize,
    pub trades: usize,
}

impl ExpectedCounts {
    /// Two plain user ids.
    pub const SINGLE_ACCOUNT: Self = Self {
        orders: 5,
        balances: 2,
        trades: 1,
    };

    /// Two broker/sub-account keys, where every balance change is published.
    pub const MULTI_ACCOUNT: Self = Self {
        orders: 5,
        balances: 8,
        trades: 1,
    };

    pub fn for_topic(&self, topic: Topic) -> usize {
        match topic {
            Topic::Orders => self.orders,
            Topic::Balances => self.balances,
            Topic::Trades => self.trades,
        }
    }
}

/// Checks captured counts topic by topic; payloads are not inspected.
pub fn check_counts(captured: &CapturedEvents, expected: &ExpectedCounts) -> Result<(), EventsError> {
    for topic in Topic::ALL {
        let actual = captured.count(topic);
        let want = expected.for_topic(topic);
        if actual != want {
            return Err(EventsError::CountMismatch {
                topic,
                expected: want,
                actual,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn events(orders: usize, balances: usize, trades: usize) -> CapturedEvents {
        let mut records = Vec::new();
        for (topic, n) in [(Topic::Orders, orders), (Topic::Balances, balances), (Topic::Trades, trades)] {
            records.extend((0..n).map(|_| EventRecord::new(topic, Value::Null)));
        }
        CapturedEvents { records }
    }

    #[test]
    fn matching_counts_pass() {
        assert!(check_counts(&events(5, 2, 1), &ExpectedCounts::SINGLE_ACCOUNT).is_ok());
        assert!(check_counts(&events(5, 8, 1), &ExpectedCounts::MULTI_ACCOUNT).is_ok());
    }

    #[test]
    fn first_mismatching_topic_is_reported() {
        let err = check_counts(&events(5, 3, 0), &ExpectedCounts::SINGLE_ACCOUNT).unwrap_err();
        match err {
            EventsError::CountMismatch {
                topic,
                expected,
                actual,
            } => {
                assert_eq!(topic, Topic::Balances);
                assert_eq!(expected, 2);
                assert_eq!(actual, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
