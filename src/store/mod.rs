use async_trait::async_trait;
use serde_json::Value;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

/// Collection holding verified users, keyed by email.
pub const USERS: &str = "users";
/// Collection holding referrals awaiting verification, keyed by the invitee email.
pub const PENDING_REFERRALS: &str = "pending_referrals";
/// Collection holding one document per issued referral code, keyed by the code.
pub const REFERRAL_CODES: &str = "referral_codes";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("document encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    /// Returned by [`DocumentStore::atomic_increment`] for an absent document.
    #[allow(dead_code)]
    #[error("document {collection}/{key} does not exist")]
    Missing { collection: String, key: String },
}

/// Address of a single document.
#[derive(Debug, Clone, Copy)]
pub struct DocRef<'a> {
    pub collection: &'a str,
    pub key: &'a str,
}

impl<'a> DocRef<'a> {
    pub fn new(collection: &'a str, key: &'a str) -> Self {
        Self { collection, key }
    }
}

/// Result of [`DocumentStore::consume_and_increment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The consumed document did not exist; nothing was changed.
    NothingToConsume,
    /// The document was deleted. `new_value` is the counter after the
    /// increment, or `None` when the target document was missing.
    Consumed { new_value: Option<i64> },
}

/// Key-addressed, collection-organized JSON document storage.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_by_key(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError>;

    /// Documents whose top-level `field` equals `equals`, as `(key, body)` pairs.
    async fn query(
        &self,
        collection: &str,
        field: &str,
        equals: &Value,
        limit: usize,
    ) -> Result<Vec<(String, Value)>, StoreError>;

    /// Overwrites the document.
    async fn set_by_key(&self, collection: &str, key: &str, fields: Value) -> Result<(), StoreError>;

    /// Returns `true` when a document was removed.
    async fn delete_by_key(&self, collection: &str, key: &str) -> Result<bool, StoreError>;

    /// Adds `delta` to an integer field (absent counts as 0) and returns the new value.
    /// Fails with [`StoreError::Missing`] when the document does not exist.
    ///
    /// Part of the store contract for standalone counters. Referral credits go
    /// through [`DocumentStore::consume_and_increment`] instead, so nothing in
    /// the service calls this today.
    #[allow(dead_code)]
    async fn atomic_increment(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        delta: i64,
    ) -> Result<i64, StoreError>;

    /// Writes the document only if no document exists under `key`.
    /// Returns `true` when this call created it.
    async fn create_if_absent(
        &self,
        collection: &str,
        key: &str,
        fields: Value,
    ) -> Result<bool, StoreError>;

    /// Deletes `consume` and, only if that delete removed a document,
    /// increments `field` on `target`. Both happen as one unit.
    async fn consume_and_increment(
        &self,
        consume: DocRef<'_>,
        target: DocRef<'_>,
        field: &str,
        delta: i64,
    ) -> Result<ConsumeOutcome, StoreError>;

    /// Documents ordered by an integer field descending, ties broken by key.
    async fn top_by_field(
        &self,
        collection: &str,
        field: &str,
        limit: usize,
    ) -> Result<Vec<(String, Value)>, StoreError>;
}
