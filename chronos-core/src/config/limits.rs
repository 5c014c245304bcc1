//! Build-time capacities
//!
//! These size every fixed buffer and table in the pipeline. Changing them
//! changes static RAM usage.

/// Maximum registered faces (built-in and custom)
pub const MAX_FACES: usize = 30;

/// Maximum custom faces registered per boot
///
/// Custom indexes are never reused within a boot, so this also bounds the
/// number of installs between restarts.
pub const MAX_CUSTOM: usize = 15;

/// Size of each of the two chunk buffers
pub const CHUNK_BUFFER_SIZE: usize = 1024;

/// Maximum tags kept per manifest element; extra tags are dropped
pub const MAX_GROUP_TAGS: usize = 20;

/// Maximum face name length
pub const MAX_NAME_LEN: usize = 32;

/// Maximum storage path length
pub const MAX_PATH_LEN: usize = 64;

/// Largest manifest the loader will read into memory
pub const MAX_MANIFEST_SIZE: usize = 16 * 1024;

/// Extension given to every received package
pub const PACKAGE_EXTENSION: &str = ".cbn";

/// Extension identifying manifest files in storage
pub const MANIFEST_EXTENSION: &str = ".jsn";
