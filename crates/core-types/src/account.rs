use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies the account an operation acts on.
///
/// The exchange supports two addressing schemes. Older deployments key
/// everything by a numeric user id; multi-tenant deployments add a broker id
/// and a sub-account id on top of it. Both are carried by the same enum so the
/// sequencer and the bot never care which one is configured.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccountRef {
    Composite {
        user_id: u32,
        broker_id: String,
        account_id: String,
    },
    Simple {
        user_id: u32,
    },
}

impl AccountRef {
    pub fn simple(user_id: u32) -> Self {
        AccountRef::Simple { user_id }
    }

    pub fn composite(user_id: u32, broker_id: impl Into<String>, account_id: impl Into<String>) -> Self {
        AccountRef::Composite {
            user_id,
            broker_id: broker_id.into(),
            account_id: account_id.into(),
        }
    }

    pub fn user_id(&self) -> u32 {
        match self {
            AccountRef::Simple { user_id } | AccountRef::Composite { user_id, .. } => *user_id,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, AccountRef::Composite { .. })
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountRef::Simple { user_id } => write!(f, "user:{}", user_id),
            AccountRef::Composite {
                user_id,
                broker_id,
                account_id,
            } => write!(f, "user:{}/{}/{}", user_id, broker_id, account_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_serializes_flat() {
        let acc = AccountRef::composite(7, "b1", "a1");
        let json = serde_json::to_value(&acc).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"user_id": 7, "broker_id": "b1", "account_id": "a1"})
        );
    }

    #[test]
    fn simple_deserializes_from_user_id_only() {
        let acc: AccountRef = serde_json::from_str(r#"{"user_id": 3}"#).unwrap();
        assert_eq!(acc, AccountRef::simple(3));
        assert!(!acc.is_composite());
        assert_eq!(acc.to_string(), "user:3");
    }
}
