//! `niwa-core` is the concurrency-and-versioning engine behind a
//! multi-agent hierarchical document store: a versioned tree, per-agent
//! read tracking, a stale-write conflict quarantine protocol, and a
//! markdown <-> tree codec that keeps the tree structurally sound across
//! round-trips.
//!
//! ## Getting started
//!
//! ```no_run
//! use std::path::PathBuf;
//! use niwa_core::error::CResult;
//! use niwa_core::storage::log_cask::LogCask;
//! use niwa_core::store::Store;
//! use niwa_core::command::{CommandSurface, Operation};
//!
//! fn run() -> CResult<()> {
//!     let engine = LogCask::open(PathBuf::from(".niwa/store.log"))?;
//!     let store = Store::new(engine)?;
//!     let mut surface = CommandSurface::new(store)?;
//!
//!     let result = surface.dispatch(Operation::Add {
//!         title: "Architecture".into(),
//!         parent_id: None,
//!         content: String::new(),
//!         author: "agent-1".into(),
//!     })?;
//!     println!("{:?}", result);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod command;
pub mod conflict;
pub mod diff;
pub mod error;
pub mod id;
pub mod markdown;
pub mod node;
pub mod read_tracker;
pub mod search;
pub mod storage;
pub mod store;
pub mod tree;
pub mod version;

pub use error::{CResult, Error};
