//! Configuration for monkey
//!
//! Centralized configuration with sensible defaults. Values are built once
//! per invocation and passed down explicitly; nothing reads global state.

/// Where grasp/deliver/hurl look when no store path is given
pub const DEFAULT_STORE_LOCATION: &str = "~/.monkey.bbolt";

/// File extension that marks a trailing argument as a store path
pub const STORE_EXTENSION: &str = "bbolt";

/// Identifier of the single flat bucket used by the key@value subcommands
pub const FLAT_BUCKET: &[u8] = &[0x01];

/// How a bucket's subtree is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Indented `└──` tree
    #[default]
    Tree,

    /// One colon-joined path per leaf
    Path,
}

/// Settings for exploring a store
#[derive(Debug, Clone)]
pub struct ExploreConfig {
    // -------------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------------
    /// Rendering policy
    pub layout: Layout,

    /// Collapse sub-buckets to leaf counts and hide leaves
    pub count_only: bool,

    /// Bold leaf keys with terminal escapes
    pub highlight: bool,

    /// Deepest bucket nesting the renderer will descend into
    pub max_depth: usize,

    // -------------------------------------------------------------------------
    // Scheduling
    // -------------------------------------------------------------------------
    /// Number of rendering workers (at least 1)
    pub workers: usize,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            layout: Layout::Tree,
            count_only: false,
            highlight: false,
            max_depth: 256,
            workers: 2,
        }
    }
}

impl ExploreConfig {
    /// Create a new config builder
    pub fn builder() -> ExploreConfigBuilder {
        ExploreConfigBuilder::default()
    }
}

/// Builder for ExploreConfig
#[derive(Default)]
pub struct ExploreConfigBuilder {
    config: ExploreConfig,
}

impl ExploreConfigBuilder {
    /// Set the rendering policy
    pub fn layout(mut self, layout: Layout) -> Self {
        self.config.layout = layout;
        self
    }

    /// Switch to leaf-count-only rendering
    pub fn count_only(mut self, enabled: bool) -> Self {
        self.config.count_only = enabled;
        self
    }

    /// Bold leaf keys
    pub fn highlight(mut self, enabled: bool) -> Self {
        self.config.highlight = enabled;
        self
    }

    /// Set the maximum nesting depth
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Set the worker count (clamped to at least 1)
    pub fn workers(mut self, count: usize) -> Self {
        self.config.workers = count.max(1);
        self
    }

    pub fn build(self) -> ExploreConfig {
        self.config
    }
}

/// Log sync strategy: how often to fsync the store log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSyncStrategy {
    /// fsync after every commit (safest, slowest)
    EveryWrite,

    /// fsync batched commits after N unsynced entries
    EveryNEntries { count: usize },
}

/// Settings for opening a store
#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    /// Sync strategy for `Store::batch`; `Store::update` always syncs
    pub sync_strategy: LogSyncStrategy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sync_strategy: LogSyncStrategy::EveryNEntries { count: 100 },
        }
    }
}
