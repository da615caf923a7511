//! Centralized constants for the configuration layer.
//!
//! Default values and reserved names used across modules live here to avoid
//! magic string duplication.

// =============================================================================
// Value Codec
// =============================================================================

/// Substitute for `{{`, which the store refuses inside values.
pub const OPEN_SUBSTITUTE: char = '\u{0283}';

/// Substitute for `}}`, which the store refuses inside values.
pub const CLOSE_SUBSTITUTE: char = '\u{0285}';

/// Largest escaped value (in characters) stored as-is; anything longer is sealed.
pub const MAX_PLAIN_VALUE_CHARS: usize = 4096;

/// Leading bytes of every sealed envelope.
pub const ENVELOPE_MAGIC: &[u8; 8] = b"SSMCFG1\0";

/// Length of the HMAC-SHA256 tag inside an envelope.
pub const ENVELOPE_MAC_LEN: usize = 32;

/// Signing key used when no explicit key is configured.
pub const DEFAULT_SIGNING_KEY: &[u8] = b"ssm-config/value-envelope/v1";

// =============================================================================
// Paths
// =============================================================================

/// URI scheme prefix for parameter paths.
pub const SSM_URI_PREFIX: &str = "ssm://";

// =============================================================================
// Settings Resolution
// =============================================================================

/// Env var overriding the local settings file path.
pub const LOCAL_SETTINGS_PATH_ENV: &str = "LOCAL_SSM_SETTINGS_PATH";

/// Env var overriding the remote settings parameter path.
pub const SSM_SETTINGS_PATH_ENV: &str = "AWS_SSM_SETTINGS_PATH";

/// Reserved key carrying the originating parameter; never a schema field.
pub const ORIGIN_KEY: &str = "ssm_parameter";

/// Env var that disables `.env` loading when set.
pub const DOTENV_DISABLED_ENV: &str = "DOTENV_DISABLED";
