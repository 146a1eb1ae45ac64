use crate::domain::attachment::FileAttachment;
use crate::domain::ports::{AttachmentStore, RegistrationRepository, VisitorRepository};
use crate::domain::registration::Registration;
use crate::domain::visitor::Visitor;
use crate::error::{RegistrationError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Column Family for registration records.
pub const CF_REGISTRATIONS: &str = "registrations";
/// Column Family for visitor records.
pub const CF_VISITORS: &str = "visitors";
/// Column Family for attachment metadata + content.
pub const CF_ATTACHMENTS: &str = "attachments";

/// A persistent store implementation using RocksDB.
///
/// Handles storage for registrations, visitors, and attachments in
/// separate Column Families. Attachment keys are `<session_id>/<type>` so a
/// session's files form one contiguous key range.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
}

#[derive(Serialize, Deserialize)]
struct StoredAttachment {
    attachment: FileAttachment,
    content: Vec<u8>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = vec![
            ColumnFamilyDescriptor::new(CF_REGISTRATIONS, Options::default()),
            ColumnFamilyDescriptor::new(CF_VISITORS, Options::default()),
            ColumnFamilyDescriptor::new(CF_ATTACHMENTS, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, cfs)?;
        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            RegistrationError::StorageRead(format!("column family '{name}' not found"))
        })
    }

    fn attachment_key(session_id: &str, file_type: &str) -> Vec<u8> {
        format!("{session_id}/{file_type}").into_bytes()
    }

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value)
            .map_err(|e| RegistrationError::StorageWrite(format!("serialization error: {e}")))
    }

    fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes)
            .map_err(|e| RegistrationError::StorageRead(format!("deserialization error: {e}")))
    }
}

#[async_trait]
impl RegistrationRepository for RocksDbStore {
    async fn find(&self, session_id: &str) -> Result<Option<Registration>> {
        let cf = self.cf(CF_REGISTRATIONS)?;
        match self.db.get_cf(cf, session_id.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, registration: Registration) -> Result<()> {
        let cf = self.cf(CF_REGISTRATIONS)?;
        let value = Self::encode(&registration)?;
        self.db
            .put_cf(cf, registration.session_id.as_bytes(), value)?;
        Ok(())
    }

    async fn update(&self, registration: Registration) -> Result<()> {
        self.insert(registration).await
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let cf = self.cf(CF_REGISTRATIONS)?;
        self.db.delete_cf(cf, session_id.as_bytes())?;
        Ok(())
    }
}

#[async_trait]
impl VisitorRepository for RocksDbStore {
    async fn find(&self, session_id: &str) -> Result<Option<Visitor>> {
        let cf = self.cf(CF_VISITORS)?;
        match self.db.get_cf(cf, session_id.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, visitor: Visitor) -> Result<()> {
        let cf = self.cf(CF_VISITORS)?;
        let value = Self::encode(&visitor)?;
        self.db.put_cf(cf, visitor.session_id.as_bytes(), value)?;
        Ok(())
    }
}

#[async_trait]
impl AttachmentStore for RocksDbStore {
    async fn list(&self, session_id: &str) -> Result<Vec<FileAttachment>> {
        let cf = self.cf(CF_ATTACHMENTS)?;
        let prefix = format!("{session_id}/");

        let mut attachments = Vec::new();
        let iter = self.db.iterator_cf(
            cf,
            IteratorMode::From(prefix.as_bytes(), Direction::Forward),
        );
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            let stored: StoredAttachment = Self::decode(&value)?;
            attachments.push(stored.attachment);
        }
        Ok(attachments)
    }

    async fn find_by_type(
        &self,
        session_id: &str,
        file_type: &str,
    ) -> Result<Option<FileAttachment>> {
        let cf = self.cf(CF_ATTACHMENTS)?;
        let key = Self::attachment_key(session_id, file_type);
        match self.db.get_cf(cf, key)? {
            Some(bytes) => {
                let stored: StoredAttachment = Self::decode(&bytes)?;
                Ok(Some(stored.attachment))
            }
            None => Ok(None),
        }
    }

    async fn store(
        &self,
        session_id: &str,
        attachment: FileAttachment,
        content: Vec<u8>,
    ) -> Result<()> {
        let cf = self.cf(CF_ATTACHMENTS)?;
        let key = Self::attachment_key(session_id, &attachment.file_type);
        let value = Self::encode(&StoredAttachment {
            attachment,
            content,
        })?;
        self.db.put_cf(cf, key, value)?;
        Ok(())
    }

    async fn delete(&self, session_id: &str, file_type: &str) -> Result<()> {
        let cf = self.cf(CF_ATTACHMENTS)?;
        self.db
            .delete_cf(cf, Self::attachment_key(session_id, file_type))?;
        Ok(())
    }

    async fn content(&self, session_id: &str, file_type: &str) -> Result<Vec<u8>> {
        let cf = self.cf(CF_ATTACHMENTS)?;
        let key = Self::attachment_key(session_id, file_type);
        match self.db.get_cf(cf, key)? {
            Some(bytes) => {
                let stored: StoredAttachment = Self::decode(&bytes)?;
                Ok(stored.content)
            }
            None => Err(RegistrationError::StorageRead(format!(
                "no attachment of type '{file_type}' for session '{session_id}'"
            ))),
        }
    }
}
