//! Configuration types deserialized from `loom.toml`.

use serde::Deserialize;

/// The top-level configuration parsed from `loom.toml`.
///
/// Every section is optional; missing sections and fields take the defaults
/// documented on each field.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoomConfig {
    /// Arena allocation settings.
    #[serde(default)]
    pub arena: ArenaConfig,
    /// Reachability sweep settings.
    #[serde(default)]
    pub gc: GcConfig,
    /// Contract-violation trace settings.
    #[serde(default)]
    pub trace: TraceConfig,
    /// Unit codec settings.
    #[serde(default)]
    pub codec: CodecConfig,
    /// On-disk unit library settings.
    #[serde(default)]
    pub library: LibraryConfig,
}

/// Arena allocation settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArenaConfig {
    /// Number of object slots reserved when an arena is opened. Defaults to 256.
    #[serde(default = "default_capacity_hint")]
    pub capacity_hint: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            capacity_hint: default_capacity_hint(),
        }
    }
}

/// Reachability sweep settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GcConfig {
    /// Sweep unreachable objects when an arena is frozen. Defaults to `true`.
    #[serde(default = "default_true")]
    pub sweep_on_freeze: bool,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            sweep_on_freeze: true,
        }
    }
}

/// Settings for the recent-object trace attached to contract violations.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraceConfig {
    /// How many recently touched objects to remember. Defaults to 16; zero
    /// disables the trace.
    #[serde(default = "default_trace_depth")]
    pub depth: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            depth: default_trace_depth(),
        }
    }
}

/// Unit codec settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodecConfig {
    /// Verify the payload checksum when reading a unit. Defaults to `true`.
    #[serde(default = "default_true")]
    pub verify_checksums: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            verify_checksums: true,
        }
    }
}

/// On-disk unit library settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibraryConfig {
    /// Directory holding persisted units, relative to the project. Defaults to `"work"`.
    #[serde(default = "default_library_path")]
    pub path: String,
    /// File extension of persisted units. Defaults to `"unit"`.
    #[serde(default = "default_library_extension")]
    pub extension: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            path: default_library_path(),
            extension: default_library_extension(),
        }
    }
}

/// Upper bound accepted for `trace.depth`.
pub const MAX_TRACE_DEPTH: usize = 4096;

fn default_capacity_hint() -> usize {
    256
}

fn default_trace_depth() -> usize {
    16
}

fn default_true() -> bool {
    true
}

fn default_library_path() -> String {
    "work".to_string()
}

fn default_library_extension() -> String {
    "unit".to_string()
}
