use serde::{Deserialize, Serialize};

use crate::domain::SessionId;

pub const CHAT_PATH: &str = "api/chat";
pub const CLASSIFY_PATH: &str = "api/classify";
pub const MODEL_STATUS_PATH: &str = "api/model-status";

pub const FALLBACK_METHOD: &str = "fallback";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    Reply(String),
    Rejected(Option<String>),
}

impl ChatResponse {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            success: true,
            response: Some(text.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            response: None,
            error: Some(error.into()),
        }
    }

    pub fn into_outcome(self) -> ChatOutcome {
        if self.success {
            ChatOutcome::Reply(self.response.unwrap_or_default())
        } else {
            ChatOutcome::Rejected(self.error.filter(|e| !e.is_empty()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyRequest {
    pub image: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub confidence: f64,
    pub method: String,
}

impl Classification {
    pub fn used_fallback(&self) -> bool {
        self.method == FALLBACK_METHOD
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassifyOutcome {
    Classified(Classification),
    Rejected(Option<String>),
}

impl ClassifyResponse {
    pub fn classified(label: impl Into<String>, confidence: f64, method: impl Into<String>) -> Self {
        Self {
            success: true,
            label: Some(label.into()),
            confidence: Some(confidence),
            method: Some(method.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn into_outcome(self) -> ClassifyOutcome {
        if !self.success {
            return ClassifyOutcome::Rejected(self.error.filter(|e| !e.is_empty()));
        }
        ClassifyOutcome::Classified(Classification {
            label: self
                .label
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| "unknown".to_string()),
            confidence: self.confidence.unwrap_or(0.0),
            method: self
                .method
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_matches_backend_field_names() {
        let request = ChatRequest {
            message: "hello".to_string(),
            session_id: SessionId("s-1".to_string()),
        };
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({ "message": "hello", "session_id": "s-1" })
        );
    }

    #[test]
    fn chat_failure_without_error_text_is_rejected_without_reason() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"success": false}"#).expect("decode");
        assert_eq!(response.into_outcome(), ChatOutcome::Rejected(None));
    }

    #[test]
    fn chat_success_keeps_reply_verbatim() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"success": true, "response": "<b>Puti</b>"}"#)
                .expect("decode");
        assert_eq!(
            response.into_outcome(),
            ChatOutcome::Reply("<b>Puti</b>".to_string())
        );
    }

    #[test]
    fn classify_success_fills_missing_fields_with_defaults() {
        let response: ClassifyResponse =
            serde_json::from_str(r#"{"success": true}"#).expect("decode");
        assert_eq!(
            response.into_outcome(),
            ClassifyOutcome::Classified(Classification {
                label: "unknown".to_string(),
                confidence: 0.0,
                method: "unknown".to_string(),
            })
        );
    }

    #[test]
    fn fallback_method_is_detected() {
        let ClassifyOutcome::Classified(classification) =
            ClassifyResponse::classified("Betta", 0.5, "fallback").into_outcome()
        else {
            panic!("expected classification");
        };
        assert!(classification.used_fallback());
    }
}
