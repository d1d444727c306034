//! Process exit boundary for small tools.

use std::fmt::Display;
use std::process;

/// Exit with status 1 after printing `Error: <err>` to stderr, or with
/// status 0 when `result` is `Ok`.
pub fn exit_on_error<E: Display>(result: Result<(), E>) -> ! {
    match result {
        Ok(()) => process::exit(0),
        Err(err) => {
            eprintln!("Error: {err}");
            process::exit(1)
        }
    }
}
