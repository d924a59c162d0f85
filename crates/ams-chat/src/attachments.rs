//! Attachments staged for the next turn, and their display annotation

use ams_stream::AttachmentRef;

/// Separator put between the typed text and the attachment annotation
pub const ANNOTATION_MARKER: &str = "\n\n📎 ";

/// Displayed content of a user turn: the typed text plus one
/// `\n\n📎 name (path)` line per attachment
pub fn annotate(text: &str, attachments: &[AttachmentRef]) -> String {
    let mut content = text.to_string();
    for attachment in attachments {
        content.push_str(ANNOTATION_MARKER);
        content.push_str(&format!("{} ({})", attachment.name, attachment.stored_path));
    }
    content
}

/// The typed text of a displayed user turn
pub fn strip_annotation(content: &str) -> &str {
    match content.find(ANNOTATION_MARKER) {
        Some(index) => &content[..index],
        None => content,
    }
}

/// Attachments uploaded but not yet sent
#[derive(Debug, Default, Clone)]
pub struct PendingAttachments {
    items: Vec<AttachmentRef>,
}

impl PendingAttachments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, attachment: AttachmentRef) {
        self.items.push(attachment);
    }

    /// Drop one attachment, releasing its preview
    pub fn remove(&mut self, index: usize) -> Option<AttachmentRef> {
        if index >= self.items.len() {
            return None;
        }
        let mut removed = self.items.remove(index);
        if let Some(preview) = removed.local_preview.take() {
            tracing::debug!(preview = %preview.display(), "Released attachment preview");
        }
        Some(removed)
    }

    /// Move everything into a turn, leaving the list empty
    pub fn take(&mut self) -> Vec<AttachmentRef> {
        std::mem::take(&mut self.items)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttachmentRef> {
        self.items.iter()
    }
}
