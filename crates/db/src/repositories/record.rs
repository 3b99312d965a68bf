use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use phonedesk_core::domain::business::{BusinessContext, BusinessId};
use phonedesk_core::domain::record::{BookingRecord, CallLogRecord, OrderRecord, RecordId};

use super::{RecordStore, RepositoryError};
use crate::DbPool;

pub struct SqlRecordStore {
    pool: DbPool,
}

impl SqlRecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Inserts or replaces the business keyed by its id.
    pub async fn upsert_business(&self, business: &BusinessContext) -> Result<(), RepositoryError> {
        let routing_key = Some(business.routing_key.trim()).filter(|key| !key.is_empty());
        sqlx::query(
            "INSERT INTO businesses (id, name, business_type, hours, menu, services, routing_key, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 business_type = excluded.business_type,
                 hours = excluded.hours,
                 menu = excluded.menu,
                 services = excluded.services,
                 routing_key = excluded.routing_key",
        )
        .bind(&business.id.0)
        .bind(&business.name)
        .bind(&business.business_type)
        .bind(&business.hours)
        .bind(&business.menu)
        .bind(&business.services)
        .bind(routing_key)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn next_record_id() -> RecordId {
    RecordId(format!("rec-{}", Uuid::new_v4().simple()))
}

fn decode_err(error: sqlx::Error) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

fn row_to_business(row: &sqlx::sqlite::SqliteRow) -> Result<BusinessContext, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let name: String = row.try_get("name").map_err(decode_err)?;
    let business_type: String = row.try_get("business_type").map_err(decode_err)?;
    let hours: Option<String> = row.try_get("hours").map_err(decode_err)?;
    let menu: Option<String> = row.try_get("menu").map_err(decode_err)?;
    let services: Option<String> = row.try_get("services").map_err(decode_err)?;
    let routing_key: Option<String> = row.try_get("routing_key").map_err(decode_err)?;

    Ok(BusinessContext {
        id: BusinessId(id),
        name,
        business_type,
        hours,
        menu,
        services,
        routing_key: routing_key.unwrap_or_default(),
    })
}

#[async_trait::async_trait]
impl RecordStore for SqlRecordStore {
    async fn create_call_log(&self, record: &CallLogRecord) -> Result<RecordId, RepositoryError> {
        let id = next_record_id();
        sqlx::query(
            "INSERT INTO call_logs (id, call_id, business_id, caller_number, call_date,
                                    duration_secs, transcript, intent, status, end_reason, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id.0)
        .bind(&record.call_id.0)
        .bind(&record.business_id.0)
        .bind(&record.caller_number)
        .bind(record.call_date.to_rfc3339())
        .bind(record.duration_secs)
        .bind(&record.transcript)
        .bind(record.intent.as_str())
        .bind(record.status.as_str())
        .bind(record.end_reason.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn create_order(&self, record: &OrderRecord) -> Result<RecordId, RepositoryError> {
        let items_json = serde_json::to_string(&record.items)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        let id = next_record_id();
        sqlx::query(
            "INSERT INTO orders (id, call_id, business_id, customer_name, customer_phone,
                                 items_json, total, pickup_time, status, order_date)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id.0)
        .bind(&record.call_id.0)
        .bind(&record.business_id.0)
        .bind(&record.customer_name)
        .bind(&record.customer_phone)
        .bind(items_json)
        .bind(record.total.to_string())
        .bind(&record.pickup_time)
        .bind(record.status.as_str())
        .bind(record.order_date.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn create_booking(&self, record: &BookingRecord) -> Result<RecordId, RepositoryError> {
        let id = next_record_id();
        sqlx::query(
            "INSERT INTO bookings (id, call_id, business_id, customer_name, customer_phone,
                                   service, date_time, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id.0)
        .bind(&record.call_id.0)
        .bind(&record.business_id.0)
        .bind(&record.customer_name)
        .bind(&record.customer_phone)
        .bind(&record.service)
        .bind(&record.date_time)
        .bind(record.status.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn find_business_by_routing_key(
        &self,
        routing_key: &str,
    ) -> Result<Option<BusinessContext>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, business_type, hours, menu, services, routing_key
             FROM businesses WHERE routing_key = ?",
        )
        .bind(routing_key.trim())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_business(r)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use sqlx::Row;

    use phonedesk_core::domain::action::{Intent, LineItem};
    use phonedesk_core::domain::business::{BusinessContext, BusinessId};
    use phonedesk_core::domain::call::{CallId, TerminationReason};
    use phonedesk_core::domain::record::{
        BookingRecord, BookingStatus, CallLogRecord, CallStatus, OrderRecord, OrderStatus,
    };

    use super::SqlRecordStore;
    use crate::repositories::RecordStore;
    use crate::{connect_with_settings, migrations::run_pending, DbPool};

    async fn setup() -> (DbPool, SqlRecordStore) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrations");
        (pool.clone(), SqlRecordStore::new(pool))
    }

    #[tokio::test]
    async fn call_log_round_trips_through_sqlite() {
        let (pool, store) = setup().await;
        let record = CallLogRecord {
            call_id: CallId("CA-77".to_string()),
            business_id: BusinessId("biz-1".to_string()),
            caller_number: "+15550001111".to_string(),
            call_date: Utc::now(),
            duration_secs: 63,
            transcript: "Customer: bye\nAI: Thanks for calling!".to_string(),
            intent: Intent::General,
            status: CallStatus::Completed,
            end_reason: TerminationReason::CallerEnded,
        };

        let id = store.create_call_log(&record).await.expect("insert call log");

        let row = sqlx::query(
            "SELECT call_id, duration_secs, intent, status, end_reason FROM call_logs WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_one(&pool)
        .await
        .expect("fetch call log");

        assert_eq!(row.get::<String, _>("call_id"), "CA-77");
        assert_eq!(row.get::<i64, _>("duration_secs"), 63);
        assert_eq!(row.get::<String, _>("intent"), "general");
        assert_eq!(row.get::<String, _>("status"), "completed");
        assert_eq!(row.get::<String, _>("end_reason"), "caller_ended");
    }

    #[tokio::test]
    async fn order_items_are_stored_as_json() {
        let (pool, store) = setup().await;
        let record = OrderRecord {
            call_id: CallId("CA-78".to_string()),
            business_id: BusinessId("biz-1".to_string()),
            customer_name: "Phone Order".to_string(),
            customer_phone: "+15550001111".to_string(),
            items: vec![
                LineItem {
                    name: "chicken biryani".to_string(),
                    quantity: 2,
                    unit_price: Decimal::from(15),
                },
                LineItem {
                    name: "vegetable samosa".to_string(),
                    quantity: 1,
                    unit_price: Decimal::from(5),
                },
            ],
            total: Decimal::from(35),
            pickup_time: "30 minutes".to_string(),
            status: OrderStatus::Received,
            order_date: Utc::now(),
        };

        let id = store.create_order(&record).await.expect("insert order");

        let row = sqlx::query("SELECT items_json, total, status FROM orders WHERE id = ?")
            .bind(&id.0)
            .fetch_one(&pool)
            .await
            .expect("fetch order");

        let items: Vec<LineItem> =
            serde_json::from_str(&row.get::<String, _>("items_json")).expect("decode items");
        assert_eq!(items, record.items);
        assert_eq!(row.get::<String, _>("total"), "35");
        assert_eq!(row.get::<String, _>("status"), "received");
    }

    #[tokio::test]
    async fn booking_is_stored_with_confirmed_status() {
        let (pool, store) = setup().await;
        let record = BookingRecord {
            call_id: CallId("CA-79".to_string()),
            business_id: BusinessId("biz-1".to_string()),
            customer_name: "Priya".to_string(),
            customer_phone: "+15550001111".to_string(),
            service: "Table for 4".to_string(),
            date_time: "friday 7pm".to_string(),
            status: BookingStatus::Confirmed,
        };

        let id = store.create_booking(&record).await.expect("insert booking");

        let status = sqlx::query("SELECT status FROM bookings WHERE id = ?")
            .bind(&id.0)
            .fetch_one(&pool)
            .await
            .expect("fetch booking")
            .get::<String, _>("status");
        assert_eq!(status, "confirmed");
    }

    #[tokio::test]
    async fn business_resolves_by_routing_key_after_upsert() {
        let (_pool, store) = setup().await;
        let mut business = BusinessContext::new(BusinessId("biz-9".to_string()), "Spice Route");
        business.routing_key = "+15550009999".to_string();
        business.hours = Some("Tue-Sun 12PM-9PM".to_string());

        store.upsert_business(&business).await.expect("insert business");
        business.name = "Spice Route Kitchen".to_string();
        store.upsert_business(&business).await.expect("update business");

        let found = store
            .find_business_by_routing_key("+15550009999")
            .await
            .expect("lookup")
            .expect("business present");
        assert_eq!(found, business);

        let missing = store.find_business_by_routing_key("+15550000000").await.expect("lookup");
        assert!(missing.is_none());
    }
}
