//! Utility functions shared by the tool adapters.
//!
//! Provides output-pattern helpers, display formatting, the subprocess
//! runner used to drive the external key, quote and ledger tools, the
//! retrying HTTP client and cancellable backoff waits.

pub mod backoff;
pub mod command;
pub mod formatting;
pub mod http;

pub use backoff::{sleep_or_cancel, BackoffPolicy, BackoffSchedule};
pub use command::{run_tool, ToolCommand, ToolError, ToolOutput};
pub use formatting::{capture, truncate_id};
pub use http::{HttpClient, HttpError, HttpRetryPolicy};
