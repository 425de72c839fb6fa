//! Command definitions
//!
//! One typed command per CLI entry point, and the router that runs it.
//! Output goes to the writer passed in; errors come back to the caller,
//! which owns the exit code.

use std::io::Write;
use std::path::PathBuf;

use crate::args::{tokenize, FileMode, KeyMode, Request, Resolved, Resolver};
use crate::config::ExploreConfig;
use crate::error::{MonkeyError, Result};
use crate::explore::explore;
use crate::ops;
use crate::store::{OpenMode, Store};

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Explore,
    Grasp,
    Deliver,
    Hurl,
}

impl CommandType {
    /// Shape of request the command takes
    pub fn key_mode(self) -> KeyMode {
        match self {
            CommandType::Grasp => KeyMode::Pairs,
            _ => KeyMode::KeysOnly,
        }
    }

    /// Whether a missing store file is created
    pub fn file_mode(self) -> FileMode {
        match self {
            CommandType::Grasp => FileMode::Create,
            _ => FileMode::MustExist,
        }
    }
}

/// A parsed command
#[derive(Debug, Clone)]
pub enum Command {
    /// Render each store file
    Explore {
        paths: Vec<PathBuf>,
        config: ExploreConfig,
    },

    /// Store `key@value` pairs
    Grasp { words: Vec<String> },

    /// Print values for keys
    Deliver { words: Vec<String> },

    /// Delete keys
    Hurl { words: Vec<String> },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Explore { .. } => CommandType::Explore,
            Command::Grasp { .. } => CommandType::Grasp,
            Command::Deliver { .. } => CommandType::Deliver,
            Command::Hurl { .. } => CommandType::Hurl,
        }
    }

    /// Execute the command, writing user output to `out`
    pub fn execute<W: Write>(self, resolver: &Resolver, out: &mut W) -> Result<()> {
        let kind = self.command_type();
        match self {
            Command::Explore { paths, config } => explore_files(&paths, &config, out),
            Command::Grasp { words } => {
                let resolved = resolve(resolver, kind, &words)?;
                let store = Store::open(&resolved.location, OpenMode::ReadWrite)?;
                if let Request::Pairs(pairs) = &resolved.request {
                    let report = ops::grasp(&store, pairs);
                    tracing::debug!(
                        "Grasped {} of {} pairs at {}",
                        report.stored,
                        pairs.len(),
                        resolved.location.display()
                    );
                }
                store.close()
            }
            Command::Deliver { words } => {
                let resolved = resolve(resolver, kind, &words)?;
                let store = Store::open(&resolved.location, OpenMode::ReadOnly)?;
                if let Request::Keys(keys) = &resolved.request {
                    let values = ops::deliver(&store, keys)?;
                    out.write_all(&values.join(&b'\n'))?;
                    out.flush()?;
                }
                Ok(())
            }
            Command::Hurl { words } => {
                let resolved = resolve(resolver, kind, &words)?;
                let store = Store::open(&resolved.location, OpenMode::ReadWrite)?;
                if let Request::Keys(keys) = &resolved.request {
                    let removed = ops::hurl(&store, keys)?;
                    tracing::debug!("Hurled {} of {} keys", removed, keys.len());
                }
                store.close()
            }
        }
    }
}

fn resolve(resolver: &Resolver, kind: CommandType, words: &[String]) -> Result<Resolved> {
    resolver.resolve(tokenize(words), kind.key_mode(), kind.file_mode())
}

/// Explore store files one after another, in argument order
fn explore_files<W: Write>(paths: &[PathBuf], config: &ExploreConfig, out: &mut W) -> Result<()> {
    if paths.is_empty() {
        return Err(MonkeyError::argument("Please enter a file name"));
    }

    for path in paths {
        let store = Store::open(path, OpenMode::ReadOnly)?;
        explore(&store, config, |fragment| {
            if !fragment.text.is_empty() {
                writeln!(out, "{}", fragment.text)?;
            }
            Ok(())
        })?;
        out.flush()?;
    }
    Ok(())
}
