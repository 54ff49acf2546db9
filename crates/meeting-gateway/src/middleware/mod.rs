//! HTTP middleware for the Meeting Gateway.

pub mod http_metrics;

pub use http_metrics::http_metrics_middleware;
