//! Argument Resolver
//!
//! Decides which token is the store path, checks the request has the shape
//! the subcommand needs, and makes sure the store file is usable.
//!
//! All validation happens before the store is opened.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::config::{DEFAULT_STORE_LOCATION, STORE_EXTENSION};
use crate::error::{MonkeyError, Result};
use crate::store::create_store_file;
use super::{KeyValues, Tokens};

/// What the subcommand expects to receive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
    /// `key@value` pairs (grasp)
    Pairs,

    /// Bare keys (deliver, hurl)
    KeysOnly,
}

/// What to do when the store file does not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// Fail
    MustExist,

    /// Create an empty store file
    Create,
}

/// The validated request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Pairs to store
    Pairs(KeyValues),

    /// Keys to look up or delete, de-duplicated, in first-seen order
    Keys(Vec<String>),
}

/// Resolver output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub request: Request,

    /// Absolute path of the store file
    pub location: PathBuf,
}

/// Resolves tokens against a default store location
#[derive(Debug, Clone)]
pub struct Resolver {
    default_location: String,
    home: Option<PathBuf>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    /// Resolver using `~/.monkey.bbolt` and the current user's home
    pub fn new() -> Self {
        Self {
            default_location: DEFAULT_STORE_LOCATION.to_string(),
            home: BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf()),
        }
    }

    /// Override the location used when no path token is given
    pub fn with_default_location(mut self, location: impl Into<String>) -> Self {
        self.default_location = location.into();
        self
    }

    /// Override the directory `~` expands to
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Resolve tokens into a request and a ready store location
    pub fn resolve(&self, tokens: Tokens, keys: KeyMode, file: FileMode) -> Result<Resolved> {
        let Tokens { pairs, mut bare } = tokens;

        let mut location = None;
        if bare.last().is_some_and(|last| is_store_path(last)) {
            location = bare.pop();
        }

        let request = match keys {
            KeyMode::Pairs => {
                if let Some(offending) = bare.last() {
                    return Err(MonkeyError::argument(format!(
                        "Monkey can't hold unpaired items right now: Offending argument: {}",
                        offending
                    )));
                }
                if pairs.is_empty() {
                    return Err(MonkeyError::argument("An empty request confuses monkey"));
                }
                if pairs.keys().any(str::is_empty) {
                    return Err(MonkeyError::argument("Monkey can't hold a banana without a key"));
                }
                Request::Pairs(pairs)
            }
            KeyMode::KeysOnly => {
                if !pairs.is_empty() {
                    return Err(MonkeyError::argument(
                        "Providing values when you ask for keys is pointless",
                    ));
                }
                let mut keys: Vec<String> = Vec::with_capacity(bare.len());
                for key in bare {
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
                if keys.is_empty() {
                    return Err(MonkeyError::argument("An empty request confuses monkey"));
                }
                Request::Keys(keys)
            }
        };

        let location = location.unwrap_or_else(|| self.default_location.clone());
        let location = absolute(expand_home(&location, self.home.as_deref())?)?;
        prepare_store_file(&location, file)?;

        Ok(Resolved { request, location })
    }
}

/// True for a whitespace-free argument ending in `.bbolt` with a non-empty stem
pub fn is_store_path(arg: &str) -> bool {
    match arg.strip_suffix(STORE_EXTENSION) {
        Some(stem) => {
            stem.len() > 1 && stem.ends_with('.') && !arg.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Expand a leading `~` (alone or as `~/`) to `home`
pub fn expand_home(location: &str, home: Option<&Path>) -> Result<PathBuf> {
    if location == "~" {
        return home.map(Path::to_path_buf).ok_or(MonkeyError::NoHomeDir);
    }
    if let Some(rest) = location.strip_prefix("~/") {
        let home = home.ok_or(MonkeyError::NoHomeDir)?;
        return Ok(home.join(rest));
    }
    Ok(PathBuf::from(location))
}

fn absolute(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn prepare_store_file(location: &Path, file: FileMode) -> Result<()> {
    match fs::metadata(location) {
        Ok(metadata) if metadata.is_dir() => {
            Err(MonkeyError::StoreIsDirectory(location.to_path_buf()))
        }
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => match file {
            FileMode::MustExist => Err(MonkeyError::StoreMissing(location.to_path_buf())),
            FileMode::Create => {
                tracing::warn!("Creating {}", location.display());
                match create_store_file(location) {
                    Ok(_) => Ok(()),
                    Err(MonkeyError::Io(e)) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
                    Err(MonkeyError::Io(source)) => Err(MonkeyError::StoreOpen {
                        path: location.to_path_buf(),
                        source,
                    }),
                    Err(e) => Err(e),
                }
            }
        },
        Err(source) => Err(MonkeyError::StoreOpen {
            path: location.to_path_buf(),
            source,
        }),
    }
}
