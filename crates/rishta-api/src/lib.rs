//! HTTP surface of the platform: member routes under `/api`, admin routes
//! under `/admin`.

pub mod admin;
pub mod auth;
pub mod boost;
pub mod error;
pub mod extract;
pub mod members;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod reports;
pub mod requests;
pub mod response;
pub mod router;
pub mod state;
pub mod users;

pub use router::router;
pub use state::{AppState, AppStateInner};
