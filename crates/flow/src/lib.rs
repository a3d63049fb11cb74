//! Client-side controllers for the access gate.
//!
//! [`UserFlow`](user::UserFlow) drives a single user from token entry
//! through name submission to the final grant or denial.
//! [`OperatorSession`](operator::OperatorSession) drives the dashboard:
//! listing, watching, and processing requests.
//!
//! Both controllers receive their store and channel explicitly; nothing
//! here reaches for ambient singletons.

pub mod operator;
pub mod user;

pub use operator::OperatorSession;
pub use user::{UserFlow, UserFlowState};
