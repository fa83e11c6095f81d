//! Output helpers. Results go to stdout as JSON; logs go to stderr.

use crate::error::CliResult;
use serde::Serialize;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
