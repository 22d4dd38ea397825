//! Shared constants for the synchronization protocol.

/// Protocol version announced during the handshake.
pub const PROTOCOL_VERSION: &str = "2.5";

/// Default host used when no target is configured.
pub const DEFAULT_HOST: &str = "localhost";

/// Default TCP port used when no target is configured.
pub const DEFAULT_PORT: u16 = 3219;

/// Default shared token used when no password is configured.
pub const DEFAULT_PASSWORD: &str = "changeme";

/// Environment variable naming a connection info file.
pub const ENV_CONNECTION_INFO: &str = "__NETBEANS_CONINFO";
/// Environment variable holding the target host.
pub const ENV_HOST: &str = "__NETBEANS_HOST";
/// Environment variable holding the target port.
pub const ENV_PORT: &str = "__NETBEANS_SOCKET";
/// Environment variable holding the shared token.
pub const ENV_PASSWORD: &str = "__NETBEANS_VIM_PASSWORD";

/// Default pause between refused connection attempts, in milliseconds.
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 5_000;

/// Default number of retries after a refused connection (about three minutes).
pub const DEFAULT_CONNECT_RETRIES: u32 = 36;

/// Largest single socket read handed to the inbound queue.
pub const MAX_READ_SIZE: usize = 4096;

/// Reserved marker type id used for guarded regions.
pub const GUARDED_TYPE: u32 = 10_000;

/// First placement id reserved for guarded-region markers.
pub const GUARD_BASE: u32 = 1_000_000;

/// Longest color name accepted by `defineAnnoType`.
pub const MAX_COLOR_LENGTH: usize = 32;

/// Highlight group used for guarded lines.
pub const GUARDED_HIGHLIGHT: &str = "NBGuarded";

/// Marker type name that identifies the debugger's current program counter.
pub const CURRENT_PC_TYPE_NAME: &str = "CurrentPC";
