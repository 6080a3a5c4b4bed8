//! Reconciliation engine for jpd-sync
//!
//! Keeps an upstream product-discovery tracker and a downstream issue
//! tracker in agreement without a database: the state block inside each
//! destination issue body is the only durable sync state.
//!
//! # Architecture
//!
//! ```text
//!                    jpd-cli
//!                       |
//!                   jpd-core
//!                       |
//!     +-----------------+-----------------+
//!     |                 |                 |
//! jpd-transform     jpd-blocks       jpd-gateway
//! ```
//!
//! - [`config`]: typed configuration loaded from YAML, TOML or JSON
//! - [`hierarchy`]: parent task lists and depth limits
//! - [`sync`]: classification, change detection and the pass loop

pub mod config;
pub mod error;
pub mod hierarchy;
pub mod sync;

pub use config::{Direction, SyncConfig};
pub use error::{Error, ErrorKind, Result};
pub use hierarchy::{MAX_HIERARCHY_DEPTH, Projector};
pub use sync::{
    CorrespondenceMap, RecordOutcome, SyncAction, SyncEngine, SyncOptions, SyncReport, SyncState,
};
