//! Layered settings resolution.
//!
//! Responsibilities:
//! - Collect candidate sources for one settings type and merge them by priority.
//! - Enforce the `DOTENV_DISABLED` gate before loading the working directory's `.env`.
//!
//! Does NOT handle:
//! - Writing settings back (see `export.rs`).
//!
//! Invariants / Assumptions:
//! - Explicit values > local file > remote parameter > environment > secret files.
//! - `load_dotenv()` must be called explicitly to enable `.env` file loading.

mod builder;
mod env;
mod merge;
mod sources;

pub use builder::ConfigLoader;
pub use env::{dotenv_disabled, env_var_or_none, load_dotenv, read_env_file};
pub use merge::{deep_merge, merge_by_priority};
pub use sources::expand_home;
