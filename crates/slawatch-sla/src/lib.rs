//! SLA lifecycle engine: the priority policy table, the SLA state machine
//! (active/paused/breached/met with pause-aware effective deadlines), and
//! the incident status lifecycle that feeds it.
//!
//! Everything in this crate is pure state: persistence and scheduling live
//! in the storage and server crates, which apply these transitions under
//! row-level atomicity.

pub mod error;
pub mod incident;
pub mod policy;
pub mod sla;
