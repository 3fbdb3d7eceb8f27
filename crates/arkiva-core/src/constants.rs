//! Shared constants: reserved key prefixes and config-parameter names.

/// Reserved prefix for garbage-collection candidate markers.
pub const CHECKLIST_PREFIX: &str = "checklist";

/// Reserved prefix for soft-deleted objects recoverable by the read path.
pub const TRASH_PREFIX: &str = "trash";

/// Config parameter holding the storage location descriptor.
pub const PARAM_STORAGE_LOCATION: &str = "attachment.storage_location";

/// Config parameter set once bulk migration to the remote store has finished.
pub const PARAM_MIGRATION_COMPLETE: &str = "attachment.migration_complete";

/// Number of leading hash characters used as the shard directory name.
pub const HASH_SHARD_LEN: usize = 2;
