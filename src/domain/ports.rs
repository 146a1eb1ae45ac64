use crate::domain::attachment::FileAttachment;
use crate::domain::registration::Registration;
use crate::domain::visitor::Visitor;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

// Shared trait-object handles; the registration repository in particular is
// held by both the store and the step controller.
pub type RegistrationRepositoryRef = Arc<dyn RegistrationRepository>;
pub type VisitorRepositoryRef = Arc<dyn VisitorRepository>;
pub type AttachmentStoreRef = Arc<dyn AttachmentStore>;
pub type SessionIdentityRef = Arc<dyn SessionIdentity>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
pub type LookupOptionsRef = Arc<dyn LookupOptions>;

/// Persistence for the session-scoped registration records.
#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    async fn find(&self, session_id: &str) -> Result<Option<Registration>>;
    async fn insert(&self, registration: Registration) -> Result<()>;
    async fn update(&self, registration: Registration) -> Result<()>;
    async fn delete(&self, session_id: &str) -> Result<()>;
}

/// Persistence for visitor profiling records. Visitors are immutable after
/// creation, so there is no update operation.
#[async_trait]
pub trait VisitorRepository: Send + Sync {
    async fn find(&self, session_id: &str) -> Result<Option<Visitor>>;
    async fn insert(&self, visitor: Visitor) -> Result<()>;
}

/// Blob store for registration file attachments, keyed by session id and
/// semantic file type.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn list(&self, session_id: &str) -> Result<Vec<FileAttachment>>;
    async fn find_by_type(
        &self,
        session_id: &str,
        file_type: &str,
    ) -> Result<Option<FileAttachment>>;
    async fn store(
        &self,
        session_id: &str,
        attachment: FileAttachment,
        content: Vec<u8>,
    ) -> Result<()>;
    /// Deleting a type with no stored attachment is a no-op, not an error.
    async fn delete(&self, session_id: &str, file_type: &str) -> Result<()>;
    /// Full content bytes of the attachment of `file_type`.
    async fn content(&self, session_id: &str, file_type: &str) -> Result<Vec<u8>>;
}

/// The session-store collaborator: the current opaque session token and the
/// rotation applied when a registration finalizes.
#[async_trait]
pub trait SessionIdentity: Send + Sync {
    async fn current_id(&self) -> Result<String>;
    /// Replaces the session identity, returning the new one.
    async fn regenerate(&self) -> Result<String>;
}

/// Payment-gateway trigger point. Only the status-check entry is in scope;
/// the gateway's own protocol is not.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn check_status(&self, order_id: &str) -> Result<()>;
}

/// Static lookup lists rendered into the initial view.
#[async_trait]
pub trait LookupOptions: Send + Sync {
    async fn lists(&self) -> Result<BTreeMap<String, Value>>;
}
