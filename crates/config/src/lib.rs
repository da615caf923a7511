//! Typed configuration over a hierarchical parameter store.
//!
//! This crate resolves settings structs from explicit values, a local file,
//! a remote parameter, the environment and secret files. It also provides a
//! lazily listed tree mirroring the remote namespace and the value codec that
//! lets any text round-trip through the store.

pub mod codec;
pub mod constants;
mod document;
mod error;
mod export;
pub mod lazy_dict;
mod loader;
mod parameter;
mod path;
mod registry;
pub mod schema;
mod settings;
mod tree;

pub use codec::{ValueCodec, decode_from_wire, encode_for_wire};
pub use document::Document;
pub use error::{ConfigError, Result};
pub use export::{ExportFormat, ExportOptions, WriteTarget, shell_quote};
pub use loader::{
    ConfigLoader, deep_merge, dotenv_disabled, env_var_or_none, expand_home, load_dotenv,
    merge_by_priority, read_env_file,
};
pub use parameter::{PARAMETER_FIELDS, Parameter};
pub use path::ParameterPath;
pub use registry::SchemaRegistry;
pub use schema::{SettingsOptions, SettingsSchema};
pub use settings::{AnySettings, Settings};
pub use tree::{DIRECTORY_FIELDS, Entry, NodeKind, ParameterTree, TreeNode};
