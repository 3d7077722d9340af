//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - operation completed without errors
pub const SUCCESS: u8 = 0;

/// General error - unspecified failure, or a push the policy rejected
pub const ERROR: u8 = 1;

/// Configuration error - settings file missing, unreadable or invalid
pub const CONFIG_ERROR: u8 = 2;

/// Not found - no package with the requested id or version
pub const NOT_FOUND: u8 = 3;

/// Unauthorized - API key missing or not valid for the package
pub const UNAUTHORIZED: u8 = 4;

/// IO error - storage or file access failed
pub const IO_ERROR: u8 = 5;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: u8 = 64;
