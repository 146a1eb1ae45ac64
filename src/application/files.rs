use crate::domain::attachment::{AttachmentView, FileAttachment, FileBlob};
use crate::domain::ports::AttachmentStoreRef;
use crate::error::Result;
use std::collections::BTreeMap;

/// Enforces at-most-one stored file per semantic type within a
/// registration's file collection.
pub struct FileAttachmentManager {
    attachments: AttachmentStoreRef,
}

impl FileAttachmentManager {
    pub fn new(attachments: AttachmentStoreRef) -> Self {
        Self { attachments }
    }

    /// Stores `blob` under `file_type`, deleting any previous attachment of
    /// that type first. A failed delete aborts before the new file is
    /// stored, so two files never share a type.
    pub async fn replace(&self, session_id: &str, file_type: &str, blob: FileBlob) -> Result<()> {
        if self
            .attachments
            .find_by_type(session_id, file_type)
            .await?
            .is_some()
        {
            self.attachments.delete(session_id, file_type).await?;
        }

        let attachment = FileAttachment::from_blob(file_type, &blob);
        self.attachments
            .store(session_id, attachment, blob.content)
            .await?;
        tracing::debug!(session_id, file_type, "attachment replaced");
        Ok(())
    }

    /// All attachments grouped by type, with content read fully and
    /// inlined. Any single read failure fails the whole listing.
    pub async fn list_by_type(
        &self,
        session_id: &str,
    ) -> Result<BTreeMap<String, Vec<AttachmentView>>> {
        let mut by_type: BTreeMap<String, Vec<AttachmentView>> = BTreeMap::new();
        for attachment in self.attachments.list(session_id).await? {
            let content = self
                .attachments
                .content(session_id, &attachment.file_type)
                .await?;
            by_type
                .entry(attachment.file_type.clone())
                .or_default()
                .push(AttachmentView::build(&attachment, &content));
        }
        Ok(by_type)
    }
}
