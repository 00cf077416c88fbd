//! `codial-sessions` — session and turn state owned by the orchestrator.
//!
//! The [`SessionStore`] holds every session record behind a coarse map
//! lock plus a per-session mutex, enforcing the `active → ended` state
//! machine and config validation. The [`TurnStore`] tracks turn records
//! through their queued → running → terminal lifecycle, and the
//! [`RunLockMap`] guarantees a session never executes two turns at once.

pub mod run_lock;
pub mod store;
pub mod turns;

pub use run_lock::RunLockMap;
pub use store::{SessionStore, SubagentResolver};
pub use turns::TurnStore;
