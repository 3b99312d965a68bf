use async_trait::async_trait;
use thiserror::Error;

use phonedesk_core::domain::business::BusinessContext;
use phonedesk_core::domain::record::{BookingRecord, CallLogRecord, OrderRecord, RecordId};

pub mod memory;
pub mod record;

pub use memory::InMemoryRecordStore;
pub use record::SqlRecordStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("record not found: {0}")]
    NotFound(String),
}

/// Back-office store that receives the outcome of each finished call.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create_call_log(&self, record: &CallLogRecord) -> Result<RecordId, RepositoryError>;
    async fn create_order(&self, record: &OrderRecord) -> Result<RecordId, RepositoryError>;
    async fn create_booking(&self, record: &BookingRecord) -> Result<RecordId, RepositoryError>;

    /// Resolves the business that owns the dialed number.
    async fn find_business_by_routing_key(
        &self,
        routing_key: &str,
    ) -> Result<Option<BusinessContext>, RepositoryError>;
}
