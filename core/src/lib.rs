//! grievance-core: complaint lifecycle, escalation and governance reporting
//! for a civic grievance portal.

pub mod clock;
pub mod complaint;
pub mod config;
pub mod engine;
pub mod error;
pub mod escalation;
pub mod lifecycle;
pub mod metrics;
pub mod reference;
pub mod rng;
pub mod rollup;
pub mod store;
pub mod ticket;
pub mod types;
