use chrono::{DateTime, Utc};
use shared::domain::Sender;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePreview {
    pub data_url: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
    pub sequence_index: u64,
    pub image: Option<ImagePreview>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryKind {
    Message(Message),
    Pending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub id: EntryId,
    pub kind: EntryKind,
}

impl TranscriptEntry {
    pub fn message(&self) -> Option<&Message> {
        match &self.kind {
            EntryKind::Message(message) => Some(message),
            EntryKind::Pending => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.kind, EntryKind::Pending)
    }
}

/// Owner of one pending placeholder. Disposing removes exactly that entry;
/// disposing again does nothing.
#[must_use = "a pending placeholder stays visible until its handle is disposed"]
#[derive(Debug)]
pub struct PendingHandle {
    entry_id: Option<EntryId>,
}

impl PendingHandle {
    pub fn entry_id(&self) -> Option<EntryId> {
        self.entry_id
    }

    pub fn is_disposed(&self) -> bool {
        self.entry_id.is_none()
    }
}

#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    next_entry_id: u64,
    message_count: u64,
}

impl Transcript {
    pub fn append_message(
        &mut self,
        text: impl Into<String>,
        sender: Sender,
        image: Option<ImagePreview>,
    ) -> TranscriptEntry {
        let message = Message {
            text: text.into(),
            sender,
            sequence_index: self.message_count,
            image,
            created_at: Utc::now(),
        };
        self.message_count += 1;
        debug!(
            message_count = self.message_count,
            sender = ?sender,
            "transcript: message appended"
        );
        self.push(EntryKind::Message(message))
    }

    pub fn show_pending(&mut self) -> (PendingHandle, TranscriptEntry) {
        let entry = self.push(EntryKind::Pending);
        (
            PendingHandle {
                entry_id: Some(entry.id),
            },
            entry,
        )
    }

    pub fn dispose_pending(&mut self, handle: &mut PendingHandle) -> Option<EntryId> {
        let entry_id = handle.entry_id.take()?;
        let position = self
            .entries
            .iter()
            .position(|entry| entry.id == entry_id && entry.is_pending())?;
        self.entries.remove(position);
        Some(entry_id)
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter_map(TranscriptEntry::message)
    }

    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_pending()).count()
    }

    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    fn push(&mut self, kind: EntryKind) -> TranscriptEntry {
        let entry = TranscriptEntry {
            id: EntryId(self.next_entry_id),
            kind,
        };
        self.next_entry_id += 1;
        self.entries.push(entry.clone());
        entry
    }
}

#[cfg(test)]
#[path = "tests/transcript_tests.rs"]
mod tests;
