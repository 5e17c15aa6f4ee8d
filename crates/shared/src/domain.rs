use std::fmt;

use serde::{Deserialize, Serialize};

pub const SESSION_STORAGE_KEY: &str = "chatbot_session_id";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn is_user(self) -> bool {
        self == Sender::User
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_serializes_as_bare_string() {
        let id = SessionId("1700000000000-abc".to_string());
        assert_eq!(
            serde_json::to_string(&id).expect("serialize"),
            "\"1700000000000-abc\""
        );
    }

    #[test]
    fn sender_uses_snake_case_names() {
        assert_eq!(
            serde_json::to_string(&Sender::Assistant).expect("serialize"),
            "\"assistant\""
        );
    }
}
