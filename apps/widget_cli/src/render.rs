//! Terminal rendering of widget events.

use std::io::{self, Write};

use shared::domain::Sender;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;
use widget_core::{
    transcript::{EntryKind, TranscriptEntry},
    WidgetEvent,
};

pub const HELP: &str = "\
commands:
  /image <path>   upload an image for identification
  /toggle         open or close the chat
  /close          close the chat
  /help           show this help
  /quit           exit
anything else is sent as a chat message";

/// Renders until every sender is gone; events still queued at that point are drained first.
pub async fn run<W: Write>(
    mut events: broadcast::Receiver<WidgetEvent>,
    assistant_name: String,
    mut out: W,
) -> io::Result<W> {
    loop {
        match events.recv().await {
            Ok(event) => render_event(&mut out, &event, &assistant_name)?,
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "render: dropped widget events"),
            Err(RecvError::Closed) => break,
        }
    }
    out.flush()?;
    Ok(out)
}

fn render_event(out: &mut impl Write, event: &WidgetEvent, assistant_name: &str) -> io::Result<()> {
    match event {
        WidgetEvent::EntryAppended(entry) => writeln!(out, "{}", format_entry(entry, assistant_name)),
        WidgetEvent::VisibilityChanged { open: true } => {
            writeln!(out, "--- chat opened (type /help for commands) ---")
        }
        WidgetEvent::VisibilityChanged { open: false } => writeln!(out, "--- chat closed ---"),
        WidgetEvent::FocusInput => {
            write!(out, "> ")?;
            out.flush()
        }
        // A terminal cannot take lines back or scroll; the next line replaces the indicator.
        WidgetEvent::EntryRemoved(_) | WidgetEvent::ScrollToLatest => Ok(()),
    }
}

pub fn format_entry(entry: &TranscriptEntry, assistant_name: &str) -> String {
    match &entry.kind {
        EntryKind::Pending => format!("{assistant_name} is typing..."),
        EntryKind::Message(message) => {
            let author = match message.sender {
                Sender::User => "You",
                Sender::Assistant => assistant_name,
            };
            match &message.image {
                Some(image) => format!("{author}: [{} image] {}", image.mime_type, message.text),
                None => format!("{author}: {}", message.text),
            }
        }
    }
}
