use crate::error::EventsError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The exchange's notification topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Orders,
    Balances,
    Trades,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::Orders, Topic::Balances, Topic::Trades];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Orders => "orders",
            Topic::Balances => "balances",
            Topic::Trades => "trades",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message as relayed: `{"topic": "orders", "payload": {...}}`.
/// The payload is kept opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub topic: Topic,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl EventRecord {
    pub fn new(topic: Topic, payload: serde_json::Value) -> Self {
        Self { topic, payload }
    }

    pub fn from_json(text: &str) -> Result<Self, EventsError> {
        serde_json::from_str(text).map_err(|e| EventsError::Decode(format!("{}: {}", e, text)))
    }
}
