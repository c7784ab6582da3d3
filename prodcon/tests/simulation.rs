//! End-to-end tests for the simulation driver.
//!
//! These tests run real producer and consumer threads for a short time and
//! check that shutdown always completes and the report adds up.
//!
//! # Running with tracing
//!
//! ```bash
//! RUST_LOG=prodcon=debug cargo test --features tracing --test simulation -- --nocapture
//! ```

use std::sync::Once;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use prodcon::runtime::{ITEM_MAX, Simulation, SimulationConfig};

static INIT_TRACING: Once = Once::new();

/// Initialize tracing for tests (only once).
fn init_test_tracing() {
    INIT_TRACING.call_once(|| {
        prodcon::init_tracing();
    });
}

fn config(producers: usize, consumers: usize) -> SimulationConfig {
    SimulationConfig {
        duration: Duration::from_millis(200),
        max_sleep: Duration::from_millis(3),
        producers,
        consumers,
        seed: Some(0x5eed),
        ..SimulationConfig::default()
    }
}

#[test]
fn balanced_run_conserves_items() {
    init_test_tracing();
    let report = Simulation::spawn(config(3, 3)).unwrap().run_for();

    assert!(report.is_conserved());
    assert!(report.stats.total_produced > 0);
    assert!(report.remaining <= report.config.capacity);
}

#[test]
fn producer_heavy_run_fills_buffer_and_shuts_down() {
    init_test_tracing();
    let cfg = SimulationConfig {
        max_sleep: Duration::ZERO,
        ..config(4, 1)
    };
    let capacity = cfg.capacity;
    let simulation = Simulation::spawn(cfg).unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    while simulation.buffer().times_buffer_full() == 0 && Instant::now() < deadline {
        thread::yield_now();
    }
    let report = simulation.shutdown();

    assert!(report.is_conserved());
    assert!(report.stats.times_buffer_full > 0);
    assert!(report.remaining <= capacity);
}

#[test]
fn consumer_heavy_run_parks_consumers_and_shuts_down() {
    init_test_tracing();
    let cfg = SimulationConfig {
        max_sleep: Duration::from_millis(20),
        ..config(1, 4)
    };
    let simulation = Simulation::spawn(cfg).unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    while simulation.buffer().parked().consumers == 0 && Instant::now() < deadline {
        thread::yield_now();
    }
    let report = simulation.shutdown();

    assert!(report.is_conserved());
    assert!(report.drained.consumers <= 4);
    assert_eq!(report.per_consumer.len(), 4);
}

#[test]
fn external_shutdown_flag_ends_run() {
    init_test_tracing();
    let cfg = SimulationConfig {
        duration: Duration::from_secs(120),
        ..config(2, 2)
    };
    let simulation = Simulation::spawn(cfg).unwrap();
    let flag = simulation.shutdown_flag();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        flag.store(false, Ordering::Release);
    });

    let report = simulation.run_for();
    stopper.join().unwrap();

    assert!(report.elapsed < Duration::from_secs(120));
    assert!(report.is_conserved());
}

#[test]
fn verbose_run_completes() {
    init_test_tracing();
    let cfg = SimulationConfig {
        duration: Duration::from_millis(30),
        verbose: true,
        capacity: 2,
        ..config(1, 1)
    };
    let simulation = Simulation::spawn(cfg).unwrap();
    assert!(simulation.buffer().is_verbose());

    let report = simulation.run_for();
    assert!(report.is_conserved());
}

#[test]
fn produced_items_stay_in_range() {
    init_test_tracing();
    let cfg = SimulationConfig {
        max_sleep: Duration::ZERO,
        ..config(2, 1)
    };
    let simulation = Simulation::spawn(cfg).unwrap();

    for _ in 0..100 {
        let snapshot = simulation.buffer().snapshot();
        assert!(snapshot.items().iter().all(|item| (0..=ITEM_MAX).contains(item)));
        thread::yield_now();
    }

    assert!(simulation.shutdown().is_conserved());
}

/// Contention throughput across producer/consumer mixes.
///
/// Run with: cargo test --release -p prodcon --test simulation contention_bench -- --ignored --nocapture
#[test]
#[ignore]
fn contention_bench() {
    use std::sync::Arc;

    use prodcon::BoundedBuffer;

    const ITEMS_PER_PRODUCER: i32 = 200_000;

    println!("\n=== bounded buffer contention (capacity 5) ===");
    for (producers, consumers) in [(1, 1), (2, 2), (4, 4), (8, 1), (1, 8)] {
        let buffer = Arc::new(BoundedBuffer::new(5, false).unwrap());
        let start = Instant::now();

        let producer_handles: Vec<_> = (0..producers)
            .map(|_| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || {
                    for i in 0..ITEMS_PER_PRODUCER {
                        buffer.insert(i).unwrap();
                    }
                })
            })
            .collect();
        let consumer_handles: Vec<_> = (0..consumers)
            .map(|_| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || while buffer.remove().is_ok() {})
            })
            .collect();

        for handle in producer_handles {
            handle.join().unwrap();
        }
        buffer.close();
        for handle in consumer_handles {
            handle.join().unwrap();
        }

        let elapsed = start.elapsed();
        let total = u128::from(buffer.total_consumed());
        println!(
            "{producers}P/{consumers}C: {} ops/ms ({total} items in {elapsed:?})",
            total * 1_000_000 / elapsed.as_nanos().max(1)
        );
        assert_eq!(buffer.total_consumed(), buffer.total_produced());
    }
}
