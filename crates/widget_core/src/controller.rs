use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::{
    domain::{SessionId, Sender},
    protocol::{ChatOutcome, ChatRequest, ClassifyOutcome, ClassifyRequest},
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    api::WidgetApi,
    config::WidgetSettings,
    events::{DispatchOutcome, ImageUpload, UiAction, WidgetEvent},
    prompt,
    session::{SessionManager, SessionStorage},
    transcript::{EntryId, ImagePreview, PendingHandle, Transcript, TranscriptEntry},
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct WidgetState {
    open: bool,
    transcript: Transcript,
}

struct ControllerInner {
    api: Arc<dyn WidgetApi>,
    session: SessionManager,
    image_subject: String,
    welcome_message: Option<String>,
    state: Mutex<WidgetState>,
    events: broadcast::Sender<WidgetEvent>,
}

#[derive(Clone)]
pub struct WidgetController {
    inner: Arc<ControllerInner>,
}

impl WidgetController {
    pub fn new(
        api: Arc<dyn WidgetApi>,
        storage: Arc<dyn SessionStorage>,
        settings: &WidgetSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(ControllerInner {
                api,
                session: SessionManager::new(storage),
                image_subject: settings.image_subject.clone(),
                welcome_message: settings.welcome_message.clone(),
                state: Mutex::new(WidgetState::default()),
                events,
            }),
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<WidgetEvent> {
        self.inner.events.subscribe()
    }

    pub fn session_id(&self) -> SessionId {
        self.inner.session.session_id()
    }

    /// The model-status probe runs in the background; awaiting the returned
    /// handle is optional.
    pub async fn mount(&self) -> JoinHandle<()> {
        if let Some(welcome) = self.inner.welcome_message.clone() {
            self.append_message(welcome, Sender::Assistant).await;
        }
        info!(session_id = %self.session_id(), "widget: mounted");
        let controller = self.clone();
        tokio::spawn(async move { controller.log_model_status().await })
    }

    pub async fn log_model_status(&self) {
        match self.inner.api.model_status().await {
            Ok(status) => debug!(%status, "widget: model status"),
            Err(err) => warn!("widget: unable to fetch model status: {err}"),
        }
    }

    pub async fn transcript(&self) -> Vec<TranscriptEntry> {
        self.inner.state.lock().await.transcript.entries().to_vec()
    }

    pub async fn is_open(&self) -> bool {
        self.inner.state.lock().await.open
    }

    pub async fn append_message(&self, text: impl Into<String>, sender: Sender) -> EntryId {
        self.append_entry(text.into(), sender, None).await
    }

    async fn append_entry(
        &self,
        text: String,
        sender: Sender,
        image: Option<ImagePreview>,
    ) -> EntryId {
        let mut state = self.inner.state.lock().await;
        let entry = state.transcript.append_message(text, sender, image);
        let entry_id = entry.id;
        self.emit(WidgetEvent::EntryAppended(entry));
        self.emit(WidgetEvent::ScrollToLatest);
        entry_id
    }

    pub async fn show_pending(&self) -> PendingHandle {
        let mut state = self.inner.state.lock().await;
        let (handle, entry) = state.transcript.show_pending();
        self.emit(WidgetEvent::EntryAppended(entry));
        self.emit(WidgetEvent::ScrollToLatest);
        handle
    }

    pub async fn dispose_pending(&self, handle: &mut PendingHandle) {
        let mut state = self.inner.state.lock().await;
        if let Some(entry_id) = state.transcript.dispose_pending(handle) {
            self.emit(WidgetEvent::EntryRemoved(entry_id));
        }
    }

    // Placeholder removal and the final message go out under one lock.
    async fn finish_exchange(&self, mut pending: PendingHandle, text: String) {
        let mut state = self.inner.state.lock().await;
        if let Some(entry_id) = state.transcript.dispose_pending(&mut pending) {
            self.emit(WidgetEvent::EntryRemoved(entry_id));
        }
        let entry = state
            .transcript
            .append_message(text, Sender::Assistant, None);
        self.emit(WidgetEvent::EntryAppended(entry));
        self.emit(WidgetEvent::ScrollToLatest);
    }

    pub async fn send_user_message(&self, text: &str) -> DispatchOutcome {
        let message = text.trim();
        if message.is_empty() {
            debug!("chat: ignoring empty message");
            return DispatchOutcome::Ignored;
        }

        self.append_message(message, Sender::User).await;
        let pending = self.show_pending().await;
        self.request_reply(message.to_string(), pending).await
    }

    async fn request_reply(&self, message: String, pending: PendingHandle) -> DispatchOutcome {
        let request = ChatRequest {
            message,
            session_id: self.session_id(),
        };
        info!(
            session_id = %request.session_id,
            chars = request.message.chars().count(),
            "chat: sending message"
        );

        match self.inner.api.chat(&request).await {
            Ok(response) => match response.into_outcome() {
                ChatOutcome::Reply(reply) => {
                    self.finish_exchange(pending, reply).await;
                    DispatchOutcome::Answered
                }
                ChatOutcome::Rejected(error) => {
                    warn!(
                        session_id = %request.session_id,
                        error = error.as_deref().unwrap_or(prompt::UNKNOWN_ERROR),
                        "chat: backend reported failure"
                    );
                    self.finish_exchange(pending, prompt::chat_error_text(error.as_deref()))
                        .await;
                    DispatchOutcome::ServerError
                }
            },
            Err(err) => {
                warn!(session_id = %request.session_id, "chat: request failed: {err}");
                self.finish_exchange(pending, prompt::chat_transport_text(&err))
                    .await;
                DispatchOutcome::TransportError
            }
        }
    }

    pub async fn submit_image(&self, upload: ImageUpload) -> DispatchOutcome {
        if !upload.is_image() {
            info!(mime_type = %upload.mime_type, "image: rejected non-image upload");
            self.append_message(prompt::NOT_AN_IMAGE, Sender::Assistant)
                .await;
            return DispatchOutcome::RejectedInput;
        }

        let mime_type = upload.normalized_mime_type();
        let preview = ImagePreview {
            data_url: format!("data:{mime_type};base64,{}", STANDARD.encode(&upload.bytes)),
            mime_type: mime_type.clone(),
        };
        self.append_entry(
            prompt::identify_caption(&self.inner.image_subject),
            Sender::User,
            Some(preview),
        )
        .await;
        let pending = self.show_pending().await;

        let request = ClassifyRequest {
            image: upload.bytes,
            file_name: upload.file_name,
            mime_type,
            session_id: self.session_id(),
        };
        info!(
            session_id = %request.session_id,
            bytes = request.image.len(),
            "image: sending for classification"
        );

        let response = match self.inner.api.classify(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!("image: classification request failed: {err}");
                self.finish_exchange(pending, prompt::upload_transport_text(&err))
                    .await;
                return DispatchOutcome::TransportError;
            }
        };

        match response.into_outcome() {
            ClassifyOutcome::Classified(classification) => {
                info!(
                    label = %classification.label,
                    confidence = classification.confidence,
                    method = %classification.method,
                    "image: classified"
                );
                let message =
                    prompt::classification_prompt(&classification, &self.inner.image_subject);
                self.request_reply(message, pending).await
            }
            ClassifyOutcome::Rejected(error) => {
                warn!(
                    error = error.as_deref().unwrap_or(prompt::UNKNOWN_ERROR),
                    "image: backend could not classify"
                );
                self.finish_exchange(pending, prompt::classify_error_text(error.as_deref()))
                    .await;
                DispatchOutcome::ServerError
            }
        }
    }

    pub async fn toggle(&self) -> bool {
        let mut state = self.inner.state.lock().await;
        state.open = !state.open;
        debug!(open = state.open, "widget: toggled");
        self.emit(WidgetEvent::VisibilityChanged { open: state.open });
        if state.open {
            self.emit(WidgetEvent::FocusInput);
        }
        state.open
    }

    pub async fn close(&self) {
        let mut state = self.inner.state.lock().await;
        if state.open {
            state.open = false;
            self.emit(WidgetEvent::VisibilityChanged { open: false });
        }
    }

    pub async fn handle(&self, action: UiAction) -> Option<DispatchOutcome> {
        match action {
            UiAction::Submit(text) => Some(self.send_user_message(&text).await),
            UiAction::UploadImage(upload) => Some(self.submit_image(upload).await),
            UiAction::Toggle => {
                self.toggle().await;
                None
            }
            UiAction::Close => {
                self.close().await;
                None
            }
        }
    }

    /// Overlapping dispatches run independently and may finish in any order.
    pub fn dispatch(&self, action: UiAction) -> JoinHandle<Option<DispatchOutcome>> {
        let controller = self.clone();
        tokio::spawn(async move { controller.handle(action).await })
    }

    fn emit(&self, event: WidgetEvent) {
        // No subscribers is fine; the view may not be attached yet.
        let _ = self.inner.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
