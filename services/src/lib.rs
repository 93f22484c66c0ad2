//! Discord-facing jobs and integrations: the REST/OAuth client, the ticket
//! reconciliation engine with its message importer, category repair and the
//! archival job.

pub mod archive;
pub mod categories;
pub mod discord;
pub mod error;
pub mod importer;
pub mod sync;
pub mod ticket_name;

#[cfg(test)]
mod fake;

pub use error::SyncError;
