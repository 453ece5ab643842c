//! Operator console helpers

use tokio::runtime::{Handle, RuntimeFlavor};

/// Run a blocking console read without stalling other tasks.
///
/// On a multi-threaded runtime the worker hands its queued tasks off
/// before blocking. `block_in_place` panics on a current-thread runtime,
/// where the read simply runs inline.
pub(crate) fn blocking_read<T>(read: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(read)
        }
        _ => read(),
    }
}
