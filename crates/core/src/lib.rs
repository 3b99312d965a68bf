pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;

pub use domain::action::{Action, Booking, Intent, LineItem, Order};
pub use domain::business::{BusinessContext, BusinessId};
pub use domain::call::{CallId, OrderMerge, Session, Speaker, TerminationReason, TranscriptEntry};
pub use domain::record::{
    BookingRecord, BookingStatus, CallLogRecord, CallStatus, OrderRecord, OrderStatus, RecordId,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{CallFlow, FlowEngine, Stage, StageEvent, StageSignals, TransitionOutcome};
