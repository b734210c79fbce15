//! Stop-between-batches support via an atomic flag set from signal handlers.
//!
//! First SIGINT/SIGTERM: the harvester finishes the batch in flight, skips
//! the remaining ones and still writes its outputs and summary.
//! Second signal: immediate exit with status 130.

use std::sync::atomic::{AtomicBool, Ordering};

fn flag() -> &'static AtomicBool {
    static FLAG: AtomicBool = AtomicBool::new(false);
    &FLAG
}

/// Whether a stop was requested; polled before each batch
pub fn is_shutdown_requested() -> bool {
    flag().load(Ordering::Relaxed)
}

pub fn request_shutdown() {
    flag().store(true, Ordering::Relaxed);
}

/// Clear a previous request (a new run in the same process starts clean)
pub fn reset_shutdown() {
    flag().store(false, Ordering::Relaxed);
}

/// Register SIGINT/SIGTERM handlers.
pub fn install_signal_handlers() -> std::io::Result<()> {
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        // SAFETY: the handler only touches an atomic and exits the process
        unsafe {
            signal_hook::low_level::register(signal, || {
                if flag().swap(true, Ordering::Relaxed) {
                    std::process::exit(130);
                }
            })?;
        }
    }
    Ok(())
}
