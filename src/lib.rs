pub mod api;
pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use datasource::{EventSource, EventSourceError, HttpEventSource, MockEventSource};
pub use db::{init_db, Repository};
pub use domain::{
    Address, Amount, Bytes32, CollectionId, ConditionId, Event, EventKey, IndexSet, PositionId,
    Provenance, UserPositionId,
};
pub use engine::{EventProcessor, Ledger, LedgerError};
pub use error::AppError;
pub use orchestration::Indexer;
