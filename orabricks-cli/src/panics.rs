// Panics inside a conversion are caught by the engine and recorded as fault
// entries; their hook reports go to the debug log, not raw stderr.

use std::panic;
use tracing::{debug, error};

/// Run `f` with panic reports sent to `tracing` at debug level, then put the
/// previous hook back. Panics outside `f` are reported as usual.
pub fn with_quiet_panics<T>(f: impl FnOnce() -> T) -> T {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(|info| debug!(%info, "recovered panic")));
    let value = panic::catch_unwind(panic::AssertUnwindSafe(f));
    panic::set_hook(previous);
    match value {
        Ok(value) => value,
        Err(payload) => {
            error!("panic escaped the conversion, see debug log for the report");
            panic::resume_unwind(payload)
        }
    }
}
