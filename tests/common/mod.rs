#![allow(dead_code)]

use mlfq_sim::core::SchedEvent;
use mlfq_sim::{Mlfq, Sim, SimConfig};

/// Route `log` output through the test harness. Later calls are no-ops.
pub fn setup_test() {
    let _ = simplelog::TestLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
    );
}

/// One slot, tiny overheads, a single admission and no event file.
pub fn quiet_config() -> SimConfig {
    SimConfig {
        slots: 1,
        levels: 3,
        quantum_factor: 10,
        overhead_max: 1,
        idle_factor: 1,
        generation_max: 1_000_000_000_000_000,
        max_io_wait: 10,
        max_total_workers: 10_000,
        sim_seconds: 10_000,
        real_seconds: 600,
        log_path: None,
        seed: Some(7),
        ..Default::default()
    }
}

pub fn sim(config: SimConfig) -> Sim<Mlfq> {
    setup_test();
    Sim::<Mlfq>::new(config).expect("simulation setup")
}

pub fn count<F: Fn(&SchedEvent) -> bool>(events: &[SchedEvent], f: F) -> usize {
    events.iter().filter(|e| f(e)).count()
}
