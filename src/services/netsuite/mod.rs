// NetSuite integration: SuiteQL client, row→record mapper, and the upsert
// sync engine that mirrors transactions into Postgres.

pub mod mapper;
pub mod netsuite_client;
pub mod sync_service;

pub use netsuite_client::{NetSuiteClient, NetSuiteConfig, NetSuiteError, SuiteQlPage};
pub use sync_service::{NetSuiteSyncService, PurgeError, PurgeReport, SyncError, SyncReport};
