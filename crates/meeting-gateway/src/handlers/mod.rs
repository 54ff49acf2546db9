//! HTTP request handlers for the Meeting Gateway.

pub mod health;
pub mod meetings;
pub mod metrics;
pub mod token;

pub use health::{health_check, readiness_check};
pub use meetings::get_meeting_view;
pub use metrics::metrics_handler;
pub use token::issue_stream_token;
