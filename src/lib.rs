pub mod aggregate;
pub mod calendar;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod ipc;
pub mod locale;
pub mod model;
pub mod profile;
pub mod query;
pub mod repo;
pub mod schedule;
pub mod scope;
pub mod store;

pub use error::{StoreError, TrackerError, TrackerResult};
pub use repo::{Record, Repository};
pub use scope::{IdentityProvider, SchoolYear, Scope, StaticIdentity};
pub use store::{DocumentStore, MemoryStore};
