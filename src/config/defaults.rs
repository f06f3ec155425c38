//! Default configuration constants.

/// Target used for the default `EnvFilter` directive.
pub const DEFAULT_LOG_FILTER_TARGET: &str = "stepvault";

/// Default SQLite busy timeout (5 seconds).
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Lowest PBKDF2 round count accepted by validation.
pub const MIN_KDF_ITERATIONS: u32 = 1_000;

/// Maximum size for a config file (1 MB).
pub const MAX_CONFIG_FILE_BYTES: u64 = 1024 * 1024;

/// Config file names probed in the working directory, in order.
pub const CONFIG_FILE_CANDIDATES: &[&str] = &[
    "stepvault.json",
    "stepvault.json5",
    "stepvault.yaml",
    "stepvault.yml",
    "stepvault.toml",
];
