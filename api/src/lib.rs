//! HTTP layer of the ticket dashboard: routes, session auth, the JSON
//! envelope and the background job schedulers.

pub mod auth;
pub mod error;
pub mod response;
pub mod routes;
pub mod scheduler;
pub mod state;
