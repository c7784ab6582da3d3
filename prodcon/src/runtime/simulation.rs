//! Simulation driver: producer and consumer threads around one buffer.
//!
//! [`Simulation::spawn`] creates the [`BoundedBuffer`] and starts the worker
//! threads (`producer-{i}` and `consumer-{i}`). Each worker sleeps a random
//! time, performs one buffer operation, and checks the shared running flag.
//!
//! # Shutdown
//!
//! [`Simulation::shutdown`]:
//! 1. Clears the running flag (workers leave after their current cycle)
//! 2. Closes the buffer, releasing every worker parked in insert/remove
//! 3. Joins every worker and collects a [`RunReport`]
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use prodcon::runtime::{Simulation, SimulationConfig};
//!
//! let config = SimulationConfig {
//!     duration: Duration::from_millis(50),
//!     max_sleep: Duration::from_millis(2),
//!     producers: 2,
//!     consumers: 2,
//!     seed: Some(42),
//!     ..SimulationConfig::default()
//! };
//!
//! let report = Simulation::spawn(config)?.run_for();
//! assert!(report.is_conserved());
//! # Ok::<(), prodcon::runtime::SimulationError>(())
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use minstant::Instant;

use crate::buffer::{BoundedBuffer, BufferError, BufferItem, DEFAULT_CAPACITY, Parked, Stats};
use crate::trace::{debug, info, warn};

use super::worker::{Consumer, Pacer, Producer};

/// Largest item value a producer generates. Items are drawn from `[0, ITEM_MAX]`.
pub const ITEM_MAX: BufferItem = 99;

/// How often [`Simulation::run_for`] checks the running flag while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationConfig {
    /// How long the workers run before shutdown.
    pub duration: Duration,
    /// Upper bound of the random pause before each buffer operation.
    pub max_sleep: Duration,
    /// Number of producer threads.
    pub producers: usize,
    /// Number of consumer threads.
    pub consumers: usize,
    /// Buffer capacity.
    pub capacity: usize,
    /// Print every buffer event and a ring snapshot.
    pub verbose: bool,
    /// Seed for the worker RNGs. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(30),
            max_sleep: Duration::from_millis(1000),
            producers: 1,
            consumers: 1,
            capacity: DEFAULT_CAPACITY,
            verbose: false,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Rejects configurations that cannot run.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for zero producers, zero consumers, zero
    /// capacity, or a duration too long to place on the clock.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.producers == 0 {
            return Err(ConfigError::NoProducers);
        }
        if self.consumers == 0 {
            return Err(ConfigError::NoConsumers);
        }
        if self.capacity == 0 {
            return Err(ConfigError::InvalidCapacity);
        }
        if deadline_after(Instant::now(), self.duration).is_none() {
            return Err(ConfigError::InvalidDuration(self.duration));
        }
        Ok(())
    }

    /// Seed for the worker at `index`, if the run is seeded.
    fn worker_seed(&self, index: usize) -> Option<u64> {
        self.seed.map(|seed| seed.wrapping_add(index as u64))
    }
}

/// Invalid simulation configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one producer thread is required")]
    NoProducers,
    #[error("at least one consumer thread is required")]
    NoConsumers,
    #[error("buffer capacity must be greater than 0")]
    InvalidCapacity,
    #[error("run duration {0:?} is out of range")]
    InvalidDuration(Duration),
    /// A command line option was given without its value.
    #[error("missing value for {0}")]
    MissingArgument(String),
    /// A command line value could not be parsed.
    #[error("invalid value {value:?} for {name}")]
    InvalidArgument { name: String, value: String },
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
}

/// Error starting a simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("buffer error: {0}")]
    Buffer(#[from] BufferError),
    /// The OS refused to start a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(std::io::Error),
}

/// Handle to running producer and consumer threads.
///
/// Dropping the handle clears the running flag and closes the buffer but does
/// not wait for the threads. Use [`Simulation::shutdown`] to join them and
/// collect the report.
pub struct Simulation {
    config: SimulationConfig,
    buffer: Arc<BoundedBuffer>,
    running: Arc<AtomicBool>,
    producers: Vec<JoinHandle<u64>>,
    consumers: Vec<JoinHandle<u64>>,
    started: Instant,
}

impl Simulation {
    /// Validates `config`, creates the buffer and starts every worker.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a thread cannot be
    /// spawned. Workers started before a spawn failure are stopped and joined.
    pub fn spawn(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;

        info!(
            producers = config.producers,
            consumers = config.consumers,
            capacity = config.capacity,
            duration_ms = config.duration.as_millis() as u64,
            max_sleep_ms = config.max_sleep.as_millis() as u64,
            "simulation starting"
        );

        let buffer = Arc::new(BoundedBuffer::new(config.capacity, config.verbose)?);
        let running = Arc::new(AtomicBool::new(true));

        let mut simulation = Self {
            config,
            buffer,
            running,
            producers: Vec::new(),
            consumers: Vec::new(),
            started: Instant::now(),
        };

        if let Err(e) = simulation.spawn_workers() {
            warn!(error = %e, "worker spawn failed, stopping started workers");
            let _ = simulation.shutdown();
            return Err(SimulationError::Spawn(e));
        }

        info!("simulation started");
        Ok(simulation)
    }

    fn spawn_workers(&mut self) -> std::io::Result<()> {
        for id in 0..self.config.producers {
            debug!(id, "spawning producer thread");
            let mut producer = Producer::new(
                id,
                Arc::clone(&self.buffer),
                Arc::clone(&self.running),
                Pacer::new(self.config.max_sleep, self.config.worker_seed(id)),
            );
            let handle = thread::Builder::new()
                .name(format!("producer-{id}"))
                .spawn(move || producer.run())?;
            self.producers.push(handle);
        }

        for id in 0..self.config.consumers {
            debug!(id, "spawning consumer thread");
            let seed = self.config.worker_seed(self.config.producers + id);
            let mut consumer = Consumer::new(
                id,
                Arc::clone(&self.buffer),
                Arc::clone(&self.running),
                Pacer::new(self.config.max_sleep, seed),
            );
            let handle = thread::Builder::new()
                .name(format!("consumer-{id}"))
                .spawn(move || consumer.run())?;
            self.consumers.push(handle);
        }

        Ok(())
    }

    /// Lets the workers run for the configured duration, then shuts down.
    ///
    /// Returns early if the running flag is cleared from outside, e.g. by a
    /// signal handler holding [`Simulation::shutdown_flag`].
    ///
    /// A deadline past the clock's range never arrives; the run then lasts
    /// until the flag is cleared.
    #[must_use]
    pub fn run_for(self) -> RunReport {
        let deadline = deadline_after(self.started, self.config.duration);
        while self.running.load(Ordering::Acquire) {
            let nap = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    POLL_INTERVAL.min(deadline - now)
                }
                None => POLL_INTERVAL,
            };
            thread::sleep(nap);
        }
        self.shutdown()
    }

    /// Stops every worker, releases parked ones, joins them all and reports.
    ///
    /// # Panics
    ///
    /// Re-raises the panic of any worker thread that panicked.
    #[must_use]
    pub fn shutdown(mut self) -> RunReport {
        info!("simulation shutdown initiated");

        self.running.store(false, Ordering::Release);
        let drained = self.buffer.close();
        debug!(
            producers = drained.producers,
            consumers = drained.consumers,
            "drain released parked workers"
        );

        let per_producer = join_all(std::mem::take(&mut self.producers));
        let per_consumer = join_all(std::mem::take(&mut self.consumers));
        let elapsed = self.started.elapsed();

        let report = RunReport {
            config: self.config.clone(),
            elapsed,
            per_producer,
            per_consumer,
            stats: self.buffer.stats(),
            remaining: self.buffer.occupancy(),
            drained,
        };
        info!(
            produced = report.stats.total_produced,
            consumed = report.stats.total_consumed,
            remaining = report.remaining,
            "simulation shutdown complete"
        );
        report
    }

    /// The running flag, for external shutdown requests.
    #[must_use]
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// The shared buffer.
    #[must_use]
    pub fn buffer(&self) -> &Arc<BoundedBuffer> {
        &self.buffer
    }

    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        // No join here; shutdown() is the graceful path.
        self.running.store(false, Ordering::Release);
        self.buffer.close();
    }
}

/// `start + duration`, or `None` when the clock cannot represent it.
fn deadline_after(start: Instant, duration: Duration) -> Option<Instant> {
    // minstant truncates the nanosecond count to u64 before adding.
    u64::try_from(duration.as_nanos()).ok()?;
    start.checked_add(duration)
}

fn join_all(handles: Vec<JoinHandle<u64>>) -> Vec<u64> {
    handles
        .into_iter()
        .map(|handle| {
            handle
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
        })
        .collect()
}

/// Statistics of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub config: SimulationConfig,
    /// Wall time from spawn to the last join.
    pub elapsed: Duration,
    /// Items inserted by each producer, indexed by producer id.
    pub per_producer: Vec<u64>,
    /// Items removed by each consumer, indexed by consumer id.
    pub per_consumer: Vec<u64>,
    /// Buffer counters after every worker exited.
    pub stats: Stats,
    /// Items left in the buffer.
    pub remaining: usize,
    /// Workers released by the drain step.
    pub drained: Parked,
}

impl RunReport {
    /// Whether every produced item is accounted for, either consumed or still
    /// in the buffer, and per-thread counts add up to the buffer's totals.
    #[must_use]
    pub fn is_conserved(&self) -> bool {
        let produced: u64 = self.per_producer.iter().sum();
        let consumed: u64 = self.per_consumer.iter().sum();
        produced == self.stats.total_produced
            && consumed == self.stats.total_consumed
            && self.stats.total_produced == self.stats.total_consumed + self.remaining as u64
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PRODUCER / CONSUMER SIMULATION COMPLETE")?;
        writeln!(f, "=======================================")?;
        writeln!(
            f,
            "Simulation time:                      {:.2}s",
            self.config.duration.as_secs_f64()
        )?;
        writeln!(
            f,
            "Elapsed time:                         {:.2}s",
            self.elapsed.as_secs_f64()
        )?;
        writeln!(
            f,
            "Maximum thread sleep time:            {}ms",
            self.config.max_sleep.as_millis()
        )?;
        writeln!(
            f,
            "Number of producer threads:           {}",
            self.config.producers
        )?;
        writeln!(
            f,
            "Number of consumer threads:           {}",
            self.config.consumers
        )?;
        writeln!(
            f,
            "Size of buffer:                       {}",
            self.config.capacity
        )?;
        writeln!(f)?;
        writeln!(
            f,
            "Total number of items produced:       {}",
            self.stats.total_produced
        )?;
        for (id, count) in self.per_producer.iter().enumerate() {
            writeln!(f, "  producer-{id}: {count}")?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "Total number of items consumed:       {}",
            self.stats.total_consumed
        )?;
        for (id, count) in self.per_consumer.iter().enumerate() {
            writeln!(f, "  consumer-{id}: {count}")?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "Number of items remaining in buffer:  {}",
            self.remaining
        )?;
        writeln!(
            f,
            "Number of times buffer was full:      {}",
            self.stats.times_buffer_full
        )?;
        writeln!(
            f,
            "Number of times buffer was empty:     {}",
            self.stats.times_buffer_empty
        )?;
        write!(
            f,
            "Parked workers released at shutdown:  {}",
            self.drained.total()
        )
    }
}
