//! Core of the mozu localization tools.
//!
//! Codecs for the engine's archive container, character table, text encoding
//! and scenario scripts, plus translation extraction and merge.

#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod error;
pub mod format;
pub mod script;
pub mod translate;
pub mod util;

pub use error::{Error, Result};
pub use mozu_nls as nls;
