//! Fixed widget copy and the prompt synthesized from a classification result.

use shared::protocol::Classification;

use crate::error::ApiError;

pub const NOT_AN_IMAGE: &str = "Please upload an image file (JPG, PNG, GIF, etc.)";
pub const UNKNOWN_ERROR: &str = "Unknown error";

const CHAT_ERROR_PREFIX: &str = "Sorry, I encountered an error: ";
const CHAT_TRANSPORT_PREFIX: &str = "Sorry, I could not connect to the server. Error: ";
const CLASSIFY_ERROR_PREFIX: &str = "Sorry, I could not classify the image: ";
const UPLOAD_TRANSPORT_PREFIX: &str = "Sorry, there was a problem uploading the image: ";

pub fn identify_caption(subject: &str) -> String {
    format!("Can you identify this {subject}?")
}

pub fn classification_prompt(classification: &Classification, subject: &str) -> String {
    let fallback_note = if classification.used_fallback() {
        " (using fallback classifier)"
    } else {
        ""
    };
    format!(
        "I uploaded an image of a {subject}. The AI model identified it as \"{label}\" \
         with {percent:.1}% confidence{fallback_note}. Can you tell me more about this {subject}?",
        label = classification.label,
        percent = classification.confidence * 100.0,
    )
}

pub fn chat_error_text(error: Option<&str>) -> String {
    format!("{CHAT_ERROR_PREFIX}{}", error.unwrap_or(UNKNOWN_ERROR))
}

pub fn chat_transport_text(err: &ApiError) -> String {
    format!("{CHAT_TRANSPORT_PREFIX}{err}")
}

pub fn classify_error_text(error: Option<&str>) -> String {
    format!("{CLASSIFY_ERROR_PREFIX}{}", error.unwrap_or(UNKNOWN_ERROR))
}

pub fn upload_transport_text(err: &ApiError) -> String {
    format!("{UPLOAD_TRANSPORT_PREFIX}{err}")
}
