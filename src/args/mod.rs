//! Argument Module
//!
//! Turns raw subcommand words into a request and a store location.
//!
//! ## Pipeline
//! ```text
//!   words ──► tokenizer ──► Tokens { pairs, bare } ──► resolver ──► Resolved
//!             (re-join quoted       (key@value split)     (path slot, mode
//!              groups)                                     checks, file setup)
//! ```

mod tokenizer;
mod resolver;

pub use tokenizer::{reassemble, tokenize, KeyValues, Tokens};
pub use resolver::{expand_home, is_store_path, FileMode, KeyMode, Request, Resolved, Resolver};
