use crate::domain::attachment::FileAttachment;
use crate::domain::ports::{
    AttachmentStore, LookupOptions, PaymentGateway, RegistrationRepository, SessionIdentity,
    VisitorRepository,
};
use crate::domain::registration::Registration;
use crate::domain::visitor::Visitor;
use crate::error::{RegistrationError, Result};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory registration repository.
///
/// Uses `Arc<RwLock<HashMap>>` for shared concurrent access. Ideal for
/// tests and the CLI driver where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryRegistrationRepository {
    registrations: Arc<RwLock<HashMap<String, Registration>>>,
}

impl InMemoryRegistrationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistrationRepository for InMemoryRegistrationRepository {
    async fn find(&self, session_id: &str) -> Result<Option<Registration>> {
        let registrations = self.registrations.read().await;
        Ok(registrations.get(session_id).cloned())
    }

    async fn insert(&self, registration: Registration) -> Result<()> {
        let mut registrations = self.registrations.write().await;
        registrations.insert(registration.session_id.clone(), registration);
        Ok(())
    }

    async fn update(&self, registration: Registration) -> Result<()> {
        let mut registrations = self.registrations.write().await;
        registrations.insert(registration.session_id.clone(), registration);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let mut registrations = self.registrations.write().await;
        registrations.remove(session_id);
        Ok(())
    }
}

/// A thread-safe in-memory visitor repository.
#[derive(Default, Clone)]
pub struct InMemoryVisitorRepository {
    visitors: Arc<RwLock<HashMap<String, Visitor>>>,
}

impl InMemoryVisitorRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VisitorRepository for InMemoryVisitorRepository {
    async fn find(&self, session_id: &str) -> Result<Option<Visitor>> {
        let visitors = self.visitors.read().await;
        Ok(visitors.get(session_id).cloned())
    }

    async fn insert(&self, visitor: Visitor) -> Result<()> {
        let mut visitors = self.visitors.write().await;
        visitors.insert(visitor.session_id.clone(), visitor);
        Ok(())
    }
}

/// In-memory attachment store keeping metadata and content together,
/// keyed by session id.
#[derive(Default, Clone)]
pub struct InMemoryAttachmentStore {
    attachments: Arc<RwLock<HashMap<String, Vec<(FileAttachment, Vec<u8>)>>>>,
}

impl InMemoryAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttachmentStore for InMemoryAttachmentStore {
    async fn list(&self, session_id: &str) -> Result<Vec<FileAttachment>> {
        let attachments = self.attachments.read().await;
        Ok(attachments
            .get(session_id)
            .map(|entries| entries.iter().map(|(meta, _)| meta.clone()).collect())
            .unwrap_or_default())
    }

    async fn find_by_type(
        &self,
        session_id: &str,
        file_type: &str,
    ) -> Result<Option<FileAttachment>> {
        let attachments = self.attachments.read().await;
        Ok(attachments.get(session_id).and_then(|entries| {
            entries
                .iter()
                .find(|(meta, _)| meta.file_type == file_type)
                .map(|(meta, _)| meta.clone())
        }))
    }

    async fn store(
        &self,
        session_id: &str,
        attachment: FileAttachment,
        content: Vec<u8>,
    ) -> Result<()> {
        let mut attachments = self.attachments.write().await;
        attachments
            .entry(session_id.to_string())
            .or_default()
            .push((attachment, content));
        Ok(())
    }

    async fn delete(&self, session_id: &str, file_type: &str) -> Result<()> {
        let mut attachments = self.attachments.write().await;
        if let Some(entries) = attachments.get_mut(session_id) {
            entries.retain(|(meta, _)| meta.file_type != file_type);
        }
        Ok(())
    }

    async fn content(&self, session_id: &str, file_type: &str) -> Result<Vec<u8>> {
        let attachments = self.attachments.read().await;
        attachments
            .get(session_id)
            .and_then(|entries| {
                entries
                    .iter()
                    .find(|(meta, _)| meta.file_type == file_type)
                    .map(|(_, content)| content.clone())
            })
            .ok_or_else(|| {
                RegistrationError::StorageRead(format!(
                    "no attachment of type '{file_type}' for session '{session_id}'"
                ))
            })
    }
}

/// Session-store stand-in holding the current opaque token; `regenerate`
/// swaps it for a fresh uuid.
pub struct InMemorySessionIdentity {
    current: RwLock<String>,
}

impl InMemorySessionIdentity {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            current: RwLock::new(initial.into()),
        }
    }

    pub fn random() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl SessionIdentity for InMemorySessionIdentity {
    async fn current_id(&self) -> Result<String> {
        Ok(self.current.read().await.clone())
    }

    async fn regenerate(&self) -> Result<String> {
        let mut current = self.current.write().await;
        *current = uuid::Uuid::new_v4().to_string();
        Ok(current.clone())
    }
}

/// Gateway double that records every polled order id.
#[derive(Default)]
pub struct RecordingPaymentGateway {
    polled: RwLock<Vec<String>>,
}

impl RecordingPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn polled(&self) -> Vec<String> {
        self.polled.read().await.clone()
    }
}

#[async_trait]
impl PaymentGateway for RecordingPaymentGateway {
    async fn check_status(&self, order_id: &str) -> Result<()> {
        self.polled.write().await.push(order_id.to_string());
        Ok(())
    }
}

/// Fixed lookup lists for the initial view.
#[derive(Default)]
pub struct StaticLookupOptions;

#[async_trait]
impl LookupOptions for StaticLookupOptions {
    async fn lists(&self) -> Result<BTreeMap<String, Value>> {
        let mut lists = BTreeMap::new();
        lists.insert(
            "documentTypes".to_string(),
            json!(["passport_front", "passport_back", "selfie"]),
        );
        lists.insert(
            "employmentTypes".to_string(),
            json!(["employed", "self_employed", "retired", "other"]),
        );
        Ok(lists)
    }
}
