//! Structured logging for prodcon.
//!
//! Enable with `--features tracing`. Without the feature every macro below
//! expands to nothing, so the critical sections of the buffer pay no cost.
//!
//! Levels used across the crate:
//!
//! | Level   | Events                                                        |
//! |---------|---------------------------------------------------------------|
//! | `info`  | simulation start and shutdown, worker start/exit with counts, |
//! |         | the drain step with how many parked workers it released       |
//! | `debug` | thread spawns, drain counts seen by the driver, the `Closed`  |
//! |         | error that ends each worker loop                              |
//! | `trace` | every insert and remove, with the item and new occupancy      |
//! | `warn`  | a worker thread that failed to spawn                          |
//!
//! Per-item `trace` events fire while the buffer lock is held, so under
//! `prodcon=trace` they appear in the same order as the ring mutations.
//! `RUST_LOG=prodcon=info` keeps only the lifecycle of a run.
//!
//! Console output that belongs to the program itself (verbose ring
//! snapshots, the end-of-run summary) is written to stdout directly and is
//! not routed through here. Log lines go to stderr, so both can be captured
//! separately.

/// Installs a `tracing` subscriber writing to stderr, tagged with the
/// worker thread name (`producer-0`, `consumer-2`, ...) and uptime.
///
/// The filter is read from `RUST_LOG` and defaults to `prodcon=trace`.
/// Calling it more than once panics, so tests guard it with a `Once`.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("prodcon=trace"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_names(true)
                .with_file(false)
                .with_line_number(false)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .init();
}

#[cfg(not(feature = "tracing"))]
pub const fn init_tracing() {}

#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, info, trace, warn};

#[cfg(not(feature = "tracing"))]
macro_rules! trace_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! info_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! warn_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use debug_noop as debug;
#[cfg(not(feature = "tracing"))]
pub(crate) use info_noop as info;
#[cfg(not(feature = "tracing"))]
pub(crate) use trace_noop as trace;
#[cfg(not(feature = "tracing"))]
pub(crate) use warn_noop as warn;
