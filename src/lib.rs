//! Workspace facade crate.
//!
//! Host applications can depend on `hymnal-workspace` and get the assembled
//! hymnal core without wiring each crate individually. The `desktop-shims`
//! feature (on by default) pulls in the SQLite, reqwest and TCP-probe
//! bridges.

pub use core_service::*;
