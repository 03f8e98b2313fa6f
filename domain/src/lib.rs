//! Job lifecycle rules shared by the web controllers.
//!
//! - `job`: pending job tracking and the deadline watchdog
//! - `webhook`: worker callback signature validation
//! - `error`: domain error tree consumed by `web`

pub mod error;
pub mod job;
pub mod webhook;

pub use events::Id;
