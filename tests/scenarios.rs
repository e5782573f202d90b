use mlfq_sim::core::{SchedEvent, SimTime, WorkerId};
use mlfq_sim::{Outcome, SimConfig, WorkerBehavior};

mod common;

/// A worker that always terminates finishes on its first dispatch and frees
/// its slot in the same cycle.
#[test]
fn certain_termination_single_level() {
    let mut sim = common::sim(SimConfig {
        levels: 1,
        quantum_factor: 100,
        ..common::quiet_config()
    })
    .with_behavior(|_, _| WorkerBehavior::Random {
        interrupt_odds: 1,
        terminate_odds: 1,
    });

    let events = sim.step().unwrap();
    assert!(matches!(
        events[0],
        SchedEvent::Admitted {
            slot: 0,
            worker: WorkerId(1),
            level: 0
        }
    ));
    assert!(matches!(
        events[1],
        SchedEvent::Dispatched { quantum: 100, .. }
    ));
    let SchedEvent::Completed {
        burst, turnaround, ..
    } = events[2]
    else {
        panic!("expected completion, got {events:?}");
    };

    assert!(burst <= 100);
    // Admitted at time zero, so turnaround is the clock at completion
    assert_eq!(turnaround, sim.now().combined());
    assert_eq!(sim.table().free_slot(), Some(0));
    assert!(!sim.table().record(0).exists);
    assert_eq!(sim.live_workers(), 0);
    assert_eq!(sim.stats().finished, 1);
}

/// Quanta 10/20/40: two full quanta sink the worker to the floor, the third
/// keeps it there.
#[test]
fn full_quanta_demote_to_floor() {
    let mut sim = common::sim(common::quiet_config()).with_behavior(|_, _| {
        WorkerBehavior::script([Outcome::Full, Outcome::Full, Outcome::Full])
    });

    let mut quanta = Vec::new();
    let mut moves = Vec::new();
    for _ in 0..3 {
        for event in sim.step().unwrap() {
            match event {
                SchedEvent::Dispatched { quantum, .. } => quanta.push(quantum),
                SchedEvent::Demoted {
                    from, to, burst, ..
                } => {
                    assert_eq!(burst, quanta[quanta.len() - 1]);
                    moves.push((from, to));
                }
                other => assert!(matches!(other, SchedEvent::Admitted { .. }), "{other:?}"),
            }
        }
    }

    assert_eq!(quanta, vec![10, 20, 40]);
    assert_eq!(moves, vec![(0, 1), (1, 2), (2, 2)]);
    assert_eq!(sim.table().record(0).level, 2);
}

/// An interrupt resets the worker to level 0, parks it on I/O and brings it
/// back ahead of the queues once the wait is over.
#[test]
fn interrupt_resets_priority_and_waits_on_io() {
    let mut sim = common::sim(common::quiet_config()).with_behavior(|_, _| {
        WorkerBehavior::script([Outcome::Full, Outcome::Interrupt(4), Outcome::Full])
    });

    sim.step().unwrap();
    assert_eq!(sim.table().record(0).level, 1);

    let events = sim.step().unwrap();
    let record = sim.table().record(0);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SchedEvent::Interrupted { burst: 4, .. }))
    );
    assert_eq!(record.level, 0);
    assert!(record.waiting_on_io);
    assert!(record.io_completion > sim.now());

    // Wait is at most 10ns and every cycle costs at least 1ns
    let mut returned = false;
    for _ in 0..20 {
        let events = sim.step().unwrap();
        if let Some(pos) = events
            .iter()
            .position(|e| matches!(e, SchedEvent::IoReturned { slot: 0, .. }))
        {
            assert!(matches!(
                events[pos + 1],
                SchedEvent::Dispatched {
                    level: 0,
                    quantum: 10,
                    ..
                }
            ));
            returned = true;
            break;
        }
        assert!(
            events
                .iter()
                .all(|e| matches!(e, SchedEvent::CpuIdle { .. }))
        );
    }
    assert!(returned, "worker never came back from I/O");
    assert!(!sim.table().record(0).waiting_on_io);
}

/// With one slot, an admission due while the slot is busy is skipped and the
/// next one after the slot frees up succeeds.
#[test]
fn admission_waits_for_free_slot() {
    let mut sim = common::sim(SimConfig {
        generation_max: 1,
        ..common::quiet_config()
    })
    .with_behavior(|_, worker| {
        if worker == WorkerId(1) {
            WorkerBehavior::script([Outcome::Full, Outcome::Finish(3)])
        } else {
            WorkerBehavior::script([Outcome::Full])
        }
    });

    let first = sim.step().unwrap();
    assert_eq!(
        common::count(&first, |e| matches!(e, SchedEvent::Admitted { .. })),
        1
    );

    let second = sim.step().unwrap();
    assert_eq!(
        common::count(&second, |e| matches!(e, SchedEvent::Admitted { .. })),
        0
    );
    assert!(matches!(
        second.last(),
        Some(SchedEvent::Completed {
            worker: WorkerId(1),
            burst: 3,
            ..
        })
    ));

    let third = sim.step().unwrap();
    assert!(matches!(
        third[0],
        SchedEvent::Admitted {
            slot: 0,
            worker: WorkerId(2),
            level: 0
        }
    ));
    assert!(sim.table().record(0).start_time > SimTime::ZERO);
    assert_eq!(sim.stats().admitted, 2);
}

/// Nothing to run: the clock jumps by the idle skip and idle time adds up.
#[test]
fn idle_cpu_skips_ahead() {
    let mut sim = common::sim(SimConfig {
        overhead_max: 10,
        idle_factor: 100,
        ..common::quiet_config()
    })
    .with_behavior(|_, _| WorkerBehavior::script([Outcome::Finish(0)]));

    sim.step().unwrap();
    let before = sim.now();
    let events = sim.step().unwrap();
    let SchedEvent::CpuIdle { skipped } = events[0] else {
        panic!("expected idle cycle, got {events:?}");
    };
    assert!(skipped < 1_000);
    assert!(sim.now() > before);
    assert_eq!(sim.stats().idle, SimTime::from_units(skipped));
}
