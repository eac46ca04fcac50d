//! Custom functions registered on every CEL context

use cel_interpreter::{ExecutionError, FunctionContext};
use std::sync::Arc;

use crate::duration::parse_duration;

/// `seconds("1h30m") == 5400`
pub fn seconds(ftx: &FunctionContext, duration: Arc<String>) -> Result<i64, ExecutionError> {
    let parsed = parse_duration(&duration).map_err(|e| ftx.error(e))?;
    i64::try_from(parsed.as_secs()).map_err(|_| ftx.error(format!("duration {} overflows", duration)))
}
