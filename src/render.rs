//! Render Engine
//!
//! Turns a bucket's subtree into text. Two layouts share one recursive shape
//! and both count every leaf reachable from the bucket:
//!
//! ```text
//! Tree                         Path
//! top:                         top:x
//! └── x                        top:y
//! └── y                        top:sub:z
//! └── sub
//!     └── z
//! ```
//!
//! In count-only mode leaves are hidden and each sub-bucket collapses to a
//! single `(n leaves)` line.

use console::style;

use crate::config::{ExploreConfig, Layout};
use crate::error::{MonkeyError, Result};
use crate::store::{Bucket, Entry};

/// Indentation added per nesting level in the tree layout
const INDENT: &str = "    ";

/// Text plus the number of leaves it covers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub leaves: usize,
}

/// Outcome of rendering one top-level bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentStatus {
    Rendered,
    NotFound,
    Failed,
}

/// Rendered output for one top-level bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Top-level bucket name
    pub bucket: String,

    /// Printable text, possibly multi-line
    pub text: String,

    /// Leaves reachable from the bucket
    pub leaves: usize,

    pub status: FragmentStatus,
}

impl Fragment {
    /// Fragment standing in for a bucket that was not there
    pub fn not_found(name: &str) -> Self {
        Self {
            bucket: name.to_string(),
            text: format!("Bucket {} not found", name),
            leaves: 0,
            status: FragmentStatus::NotFound,
        }
    }

    /// Fragment standing in for a bucket that could not be rendered
    pub fn failed(name: &str, error: &MonkeyError) -> Self {
        Self {
            bucket: name.to_string(),
            text: format!("Bucket {} could not be rendered: {}", name, error),
            leaves: 0,
            status: FragmentStatus::Failed,
        }
    }
}

/// Render a top-level bucket into a complete fragment using the configured layout
pub fn render_fragment(name: &str, bucket: Bucket<'_>, config: &ExploreConfig) -> Result<Fragment> {
    let text;
    let leaves;

    match config.layout {
        Layout::Tree => {
            let body = render_tree(bucket, "", config)?;
            text = format!("{}:\n{}", header(name, body.leaves, config), body.text);
            leaves = body.leaves;
        }
        Layout::Path => {
            let body = render_path(bucket, name, config)?;
            text = if config.count_only && body.leaves > 0 {
                let head = header(name, body.leaves, config);
                if body.text.is_empty() {
                    head
                } else {
                    format!("{}\n{}", head, body.text)
                }
            } else {
                body.text
            };
            leaves = body.leaves;
        }
    }

    Ok(Fragment {
        bucket: name.to_string(),
        text,
        leaves,
        status: FragmentStatus::Rendered,
    })
}

fn header(name: &str, leaves: usize, config: &ExploreConfig) -> String {
    if config.count_only && leaves > 0 {
        format!("{} ({} total leaves)", name, leaves)
    } else {
        name.to_string()
    }
}

// =============================================================================
// Tree Layout
// =============================================================================

/// Render `bucket` as an indented tree, each line starting with `prefix`
pub fn render_tree(bucket: Bucket<'_>, prefix: &str, config: &ExploreConfig) -> Result<Rendered> {
    tree(bucket, prefix, 0, config)
}

fn tree(bucket: Bucket<'_>, prefix: &str, depth: usize, config: &ExploreConfig) -> Result<Rendered> {
    if depth > config.max_depth {
        return Err(MonkeyError::DepthExceeded(config.max_depth));
    }

    let mut out = Rendered::default();
    for entry in bucket.entries() {
        match entry {
            Entry::Leaf { key, .. } => {
                out.leaves += 1;
                if !config.count_only {
                    out.text
                        .push_str(&format!("{}└── {}\n", prefix, leaf_key(key, config)));
                }
            }
            Entry::Bucket { key, bucket } => {
                let sub = tree(bucket, &format!("{}{}", prefix, INDENT), depth + 1, config)?;
                let key = String::from_utf8_lossy(key);
                if config.count_only {
                    out.text
                        .push_str(&format!("{}└── {} ({} leaves)\n", prefix, key, sub.leaves));
                } else {
                    out.text.push_str(&format!("{}└── {}\n", prefix, key));
                    out.text.push_str(&sub.text);
                }
                out.leaves += sub.leaves;
            }
        }
    }
    Ok(out)
}

// =============================================================================
// Path Layout
// =============================================================================

/// Render `bucket` as colon-joined paths starting at `path`.
///
/// Lines are separated by `\n` with no leading or trailing separator.
pub fn render_path(bucket: Bucket<'_>, path: &str, config: &ExploreConfig) -> Result<Rendered> {
    let mut lines = Vec::new();
    let leaves = trail(bucket, path, 0, config, &mut lines)?;
    Ok(Rendered {
        text: lines.join("\n"),
        leaves,
    })
}

fn trail(
    bucket: Bucket<'_>,
    path: &str,
    depth: usize,
    config: &ExploreConfig,
    lines: &mut Vec<String>,
) -> Result<usize> {
    if depth > config.max_depth {
        return Err(MonkeyError::DepthExceeded(config.max_depth));
    }

    let mut leaves = 0;
    for entry in bucket.entries() {
        match entry {
            Entry::Leaf { key, .. } => {
                leaves += 1;
                if !config.count_only {
                    lines.push(format!("{}:{}", path, leaf_key(key, config)));
                }
            }
            Entry::Bucket { key, bucket } => {
                let sub_path = format!("{}:{}", path, String::from_utf8_lossy(key));
                if config.count_only {
                    let sub = trail(bucket, &sub_path, depth + 1, config, &mut Vec::new())?;
                    lines.push(format!("{} ({} leaves)", sub_path, sub));
                    leaves += sub;
                } else {
                    leaves += trail(bucket, &sub_path, depth + 1, config, lines)?;
                }
            }
        }
    }
    Ok(leaves)
}

fn leaf_key(key: &[u8], config: &ExploreConfig) -> String {
    let key = String::from_utf8_lossy(key);
    if config.highlight {
        style(key).bold().force_styling(true).to_string()
    } else {
        key.into_owned()
    }
}
