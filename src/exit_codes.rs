//! Exit code constants for the keyconf CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, unreadable files)
//! - 2: Declaration failure (malformed schema, circular dependency)
//! - 3: Build failure (conversion, missing value, constraint, construction)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or unreadable input files.
pub const USER_ERROR: i32 = 1;

/// The schema is malformed or contains a dependency cycle.
pub const DECLARATION_FAILURE: i32 = 2;

/// A value could not be resolved, converted, validated or constructed.
pub const BUILD_FAILURE: i32 = 3;
