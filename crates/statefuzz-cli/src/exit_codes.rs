//! Stable exit codes for the statefuzz CLI, so it composes as a CI gate.

/// Session completed with no violation found within budget.
pub const OK: i32 = 0;
/// An invariant violation was found, shrunk, and reported.
pub const VIOLATION: i32 = 1;
/// Invalid spec, seed file, or configuration.
pub const INVALID: i32 = 2;
