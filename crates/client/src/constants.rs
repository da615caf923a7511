//! Centralized constants for the parameter store client.

/// Default number of items per listing page (the remote store's own maximum for path listings).
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Largest page size every listing operation accepts.
pub const MAX_PAGE_SIZE: usize = 10;
