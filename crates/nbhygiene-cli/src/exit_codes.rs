//! CLI Exit Code Registry
//!
//! Exit codes are part of the shell contract: pre-commit hooks and CI jobs
//! rely on them.
//!
//! | Code | Meaning                                                         |
//! |------|-----------------------------------------------------------------|
//! | 0    | Success                                                         |
//! | 1    | Bad path, failed clean, config error, or findings with --strict |
//! | 2    | Invalid arguments (emitted by clap)                             |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: i32 = 0;

/// Path does not exist or is not a notebook, a notebook could not be
/// cleaned, or `validate --strict` found issues.
pub const EXIT_FAILURE: i32 = 1;

/// Usage error - bad arguments. Produced by clap itself.
pub const EXIT_USAGE: i32 = 2;
