// src/engine/common.rs
//
// Shared engine utilities: the codec panic guard.

use crate::error::{ConvertError, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Run a codec operation, converting panics into errors.
///
/// Native codecs (mozjpeg, libwebp) and hostile inputs are a bad mix; a
/// panic here must fail one file, never the process. The `stage` label ends
/// up in the error message and the log.
pub fn run_guarded<T, F>(stage: &'static str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(panic) => {
            let message = panic_message(&panic);
            tracing::error!(stage, message = %message, "codec panicked");
            Err(ConvertError::internal(stage, message))
        }
    }
}

/// Extract a printable message from a panic payload.
pub fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
