//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - operation completed without errors
#[allow(dead_code)]
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure, or lint findings with errors
pub const ERROR: i32 = 1;

/// Validation error - the composed package breaks a structural rule
pub const VALIDATION_ERROR: i32 = 2;

/// Compose error - an import chain could not be resolved or flattened
pub const COMPOSE_ERROR: i32 = 3;

/// Package error - missing or unparseable zarf.yaml
pub const PACKAGE_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or options (sysexits.h EX_USAGE)
pub const USAGE_ERROR: i32 = 64;

/// Configuration error - unreadable config file (sysexits.h EX_CONFIG)
pub const CONFIG_ERROR: i32 = 78;
