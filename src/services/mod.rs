//! Service layer
//!
//! Holds the reconciliation engine that ties the release fetcher, the watch
//! connection manager and the aggregate state together for presentation
//! code.

pub mod app_session;

pub use app_session::AppSession;
