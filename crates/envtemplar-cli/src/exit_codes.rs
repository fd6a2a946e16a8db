//! Process exit statuses

/// Every template rendered and written
pub const SUCCESS: i32 = 0;

/// Unclassified failure, also used when a child reports no status
pub const ERROR: i32 = 1;

/// Bad flags, unknown engine, missing exec command
pub const CONFIG_ERROR: i32 = 2;

/// A template failed to parse or render
pub const TEMPLATE_ERROR: i32 = 3;

/// A source, destination or env file could not be read or written
pub const IO_ERROR: i32 = 5;

/// The exec command could not be resolved or started
pub const EXEC_ERROR: i32 = 6;
