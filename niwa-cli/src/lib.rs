//! `niwa` CLI: a one-shot command surface over `niwa-core`'s versioned
//! document store.
//!
//! Each invocation opens the on-disk store, runs a single operation, and
//! exits; there is no REPL and no long-lived server process (see the store's
//! single-process, multi-invocation model).
//!
//! ```doc
//! ❯ niwa init
//! ❯ niwa add "Overview" --agent alice
//! ❯ niwa tree
//! ```

pub mod command;
pub mod config;
pub mod render;
pub mod trace;
