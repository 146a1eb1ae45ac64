use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// An uploaded file as handed over by the request layer.
#[derive(Debug, Clone, PartialEq)]
pub struct FileBlob {
    pub file_name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

/// Stored attachment metadata. At most one live attachment exists per
/// semantic `file_type` within a registration; the content bytes live
/// behind the `AttachmentStore` port.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct FileAttachment {
    pub file_type: String,
    pub file_name: String,
    pub size: u64,
    pub mime_type: String,
}

impl FileAttachment {
    pub fn from_blob(file_type: impl Into<String>, blob: &FileBlob) -> Self {
        Self {
            file_type: file_type.into(),
            file_name: blob.file_name.clone(),
            size: blob.content.len() as u64,
            mime_type: blob.mime_type.clone(),
        }
    }
}

/// Client-facing attachment summary with the content inlined as a data URI.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentView {
    /// Content-derived stable id: md5 hex of the file name.
    pub id: String,
    pub name: String,
    pub size: u64,
    pub inline_data: String,
    pub mime_type: String,
}

impl AttachmentView {
    pub fn build(attachment: &FileAttachment, content: &[u8]) -> Self {
        let id = format!("{:x}", md5::compute(attachment.file_name.as_bytes()));
        let inline_data = format!(
            "data:{};base64,{}",
            attachment.mime_type,
            STANDARD.encode(content)
        );
        Self {
            id,
            name: attachment.file_name.clone(),
            size: attachment.size,
            inline_data,
            mime_type: attachment.mime_type.clone(),
        }
    }
}
