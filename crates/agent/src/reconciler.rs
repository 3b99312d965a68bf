use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use phonedesk_core::domain::call::{Session, TerminationReason};
use phonedesk_core::domain::record::{
    BookingRecord, BookingStatus, CallLogRecord, CallStatus, OrderRecord, OrderStatus, RecordId,
};
use phonedesk_db::repositories::{RecordStore, RepositoryError};

pub const ORDER_CUSTOMER_NAME: &str = "Phone Order";

/// What happened to one record write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(RecordId),
    Failed(String),
    Skipped,
}

impl WriteOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written(_))
    }

    fn from_result(result: Result<RecordId, RepositoryError>) -> Self {
        match result {
            Ok(id) => Self::Written(id),
            Err(error) => Self::Failed(error.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileReport {
    pub call_log: WriteOutcome,
    pub order: WriteOutcome,
    pub booking: WriteOutcome,
}

/// Writes the outcome of a finished call to the back-office store.
pub struct PersistenceReconciler {
    store: Arc<dyn RecordStore>,
}

impl PersistenceReconciler {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn call_log_record(
        session: &Session,
        reason: TerminationReason,
        now: DateTime<Utc>,
    ) -> CallLogRecord {
        CallLogRecord {
            call_id: session.call_id.clone(),
            business_id: session.business.id.clone(),
            caller_number: session.caller_number.clone(),
            call_date: session.started_at(),
            duration_secs: session.duration_secs(now),
            transcript: session.transcript_text(),
            intent: session.outcome_intent(),
            status: CallStatus::Completed,
            end_reason: reason,
        }
    }

    pub fn order_record(session: &Session, now: DateTime<Utc>) -> Option<OrderRecord> {
        session.order().map(|order| OrderRecord {
            call_id: session.call_id.clone(),
            business_id: session.business.id.clone(),
            customer_name: ORDER_CUSTOMER_NAME.to_string(),
            customer_phone: session.caller_number.clone(),
            items: order.items.clone(),
            total: order.total,
            pickup_time: order.pickup_eta.clone(),
            status: OrderStatus::Received,
            order_date: now,
        })
    }

    pub fn booking_record(session: &Session) -> Option<BookingRecord> {
        session.booking().map(|booking| BookingRecord {
            call_id: session.call_id.clone(),
            business_id: session.business.id.clone(),
            customer_name: booking.customer_name.clone(),
            customer_phone: session.caller_number.clone(),
            service: booking.service.clone(),
            date_time: booking.date_time.clone(),
            status: BookingStatus::Confirmed,
        })
    }

    /// Each write is attempted on its own; failures are logged and reported,
    /// never returned.
    pub async fn reconcile(&self, session: &Session, reason: TerminationReason) -> ReconcileReport {
        let now = Utc::now();
        let call_id = session.call_id.to_string();

        let call_log = Self::call_log_record(session, reason, now);
        let call_log = WriteOutcome::from_result(self.store.create_call_log(&call_log).await);
        log_outcome("call_log", &call_id, &call_log);

        let order = match Self::order_record(session, now) {
            Some(record) => WriteOutcome::from_result(self.store.create_order(&record).await),
            None => WriteOutcome::Skipped,
        };
        log_outcome("order", &call_id, &order);

        let booking = match Self::booking_record(session) {
            Some(record) => WriteOutcome::from_result(self.store.create_booking(&record).await),
            None => WriteOutcome::Skipped,
        };
        log_outcome("booking", &call_id, &booking);

        ReconcileReport { call_log, order, booking }
    }
}

fn log_outcome(record: &'static str, call_id: &str, outcome: &WriteOutcome) {
    match outcome {
        WriteOutcome::Written(id) => info!(
            event_name = "persistence.record.written",
            correlation_id = %call_id,
            record,
            record_id = %id,
            "call record written"
        ),
        WriteOutcome::Failed(reason) => error!(
            event_name = "persistence.record.failed",
            correlation_id = %call_id,
            record,
            error = %reason,
            "call record write failed"
        ),
        WriteOutcome::Skipped => {}
    }
}
