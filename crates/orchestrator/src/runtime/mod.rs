//! Runtime: queue, workers, turn engine, cancellation, idempotency,
//! attachment ingest, and event delivery.

pub mod attachments;
pub mod cancel;
pub mod events;
pub mod idempotency;
pub mod queue;
pub mod tools;
pub mod turn;
pub mod worker;
