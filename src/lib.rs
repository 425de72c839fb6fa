//! # monkey
//!
//! Swing through the branches of a nested bucket store:
//! - Render every top-level bucket as a tree or as colon paths, in parallel
//! - Collapse subtrees to leaf counts
//! - Grasp, deliver and hurl `key@value` bananas in a flat bucket
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         CLI (clap)                           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │ explore                 │ grasp / deliver / hurl
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────┐
//!   │  Scheduler  │          │  Tokenizer + │
//!   │ (N workers) │          │   Resolver   │
//!   └──────┬──────┘          └──────┬───────┘
//!          ▼                        ▼
//!   ┌─────────────┐          ┌──────────────┐
//!   │   Render    │          │     Ops      │
//!   └──────┬──────┘          └──────┬───────┘
//!          └────────────┬───────────┘
//!                       ▼
//!               ┌───────────────┐
//!               │     Store     │
//!               │ (bucket tree  │
//!               │  + log file)  │
//!               └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod args;
pub mod render;
pub mod explore;
pub mod ops;
pub mod command;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{MonkeyError, Result};
pub use config::{ExploreConfig, Layout, StoreConfig};
pub use store::{OpenMode, Store};
pub use command::Command;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of monkey
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
