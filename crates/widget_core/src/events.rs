//! UI surface of the widget: actions coming in from the view, events going out to it.

use crate::transcript::{EntryId, TranscriptEntry};

#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    EntryAppended(TranscriptEntry),
    EntryRemoved(EntryId),
    ScrollToLatest,
    VisibilityChanged {
        open: bool,
    },
    FocusInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

impl ImageUpload {
    pub fn normalized_mime_type(&self) -> String {
        self.mime_type.trim().to_ascii_lowercase()
    }

    // Declared type only; the bytes are not sniffed.
    pub fn is_image(&self) -> bool {
        self.normalized_mime_type().starts_with("image/")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    Submit(String),
    UploadImage(ImageUpload),
    Toggle,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Ignored,
    RejectedInput,
    Answered,
    ServerError,
    TransportError,
}

impl DispatchOutcome {
    pub fn reached_network(self) -> bool {
        matches!(
            self,
            DispatchOutcome::Answered
                | DispatchOutcome::ServerError
                | DispatchOutcome::TransportError
        )
    }
}
