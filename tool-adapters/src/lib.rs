//! Service adapters used by the remote tool loader.
//!
//! [`executor`] speaks to the sandbox service that imports, describes, and runs
//! packaged tools; [`health`] delivers outcome reports to the monitoring API.
//! Both share the trait-based interface defined in [`traits`].

#![warn(missing_docs, clippy::pedantic)]

pub mod executor;
pub mod health;
pub mod traits;

mod http_client;
