//! Process exit codes

pub const SUCCESS: i32 = 0;
pub const RUNTIME_FAILURE: i32 = 1; // I/O, CSV or serialization failure
pub const INVALID_INPUT: i32 = 2; // Missing columns, bad column map or configuration
