//! Standard exit codes (BSD sysexits.h compatible)

/// Successful termination
pub const OK: i32 = 0;

/// Command line usage error (unknown command, missing argument, bad flag)
pub const USAGE: i32 = 64;

/// Internal software error (registry has nothing to invoke)
pub const SOFTWARE: i32 = 70;

/// Permission denied (command not allowed in the pre-run pass)
pub const NOPERM: i32 = 77;

/// Configuration error
pub const CONFIG: i32 = 78;
