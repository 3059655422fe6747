pub const DEFAULT_ENTRY_NAME: &str = "[DEFAULT]";

/// Library tag reported in the heartbeat user agent.
pub const PLATFORM_LOG_STRING: &str = "fire-core";
