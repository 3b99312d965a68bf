use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use phonedesk_core::domain::business::BusinessContext;
use phonedesk_core::domain::record::{BookingRecord, CallLogRecord, OrderRecord, RecordId};

use super::{RecordStore, RepositoryError};

#[derive(Default)]
pub struct InMemoryRecordStore {
    businesses: RwLock<HashMap<String, BusinessContext>>,
    call_logs: RwLock<Vec<(RecordId, CallLogRecord)>>,
    orders: RwLock<Vec<(RecordId, OrderRecord)>>,
    bookings: RwLock<Vec<(RecordId, BookingRecord)>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a business under its routing key. Businesses without one are ignored.
    pub async fn register_business(&self, business: BusinessContext) {
        let routing_key = business.routing_key.trim().to_string();
        if routing_key.is_empty() {
            return;
        }
        self.businesses.write().await.insert(routing_key, business);
    }

    pub async fn call_logs(&self) -> Vec<CallLogRecord> {
        self.call_logs.read().await.iter().map(|(_, record)| record.clone()).collect()
    }

    pub async fn orders(&self) -> Vec<OrderRecord> {
        self.orders.read().await.iter().map(|(_, record)| record.clone()).collect()
    }

    pub async fn bookings(&self) -> Vec<BookingRecord> {
        self.bookings.read().await.iter().map(|(_, record)| record.clone()).collect()
    }
}

fn next_record_id() -> RecordId {
    RecordId(format!("rec-{}", Uuid::new_v4().simple()))
}

#[async_trait::async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn create_call_log(&self, record: &CallLogRecord) -> Result<RecordId, RepositoryError> {
        let id = next_record_id();
        self.call_logs.write().await.push((id.clone(), record.clone()));
        Ok(id)
    }

    async fn create_order(&self, record: &OrderRecord) -> Result<RecordId, RepositoryError> {
        let id = next_record_id();
        self.orders.write().await.push((id.clone(), record.clone()));
        Ok(id)
    }

    async fn create_booking(&self, record: &BookingRecord) -> Result<RecordId, RepositoryError> {
        let id = next_record_id();
        self.bookings.write().await.push((id.clone(), record.clone()));
        Ok(id)
    }

    async fn find_business_by_routing_key(
        &self,
        routing_key: &str,
    ) -> Result<Option<BusinessContext>, RepositoryError> {
        let businesses = self.businesses.read().await;
        Ok(businesses.get(routing_key.trim()).cloned())
    }
}
