use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::{debug, error, info, trace, warn};
use rand::prelude::*;
use rand::rngs::StdRng;
use rustc_hash::FxHashMap;

use super::config::SimConfig;
use super::event_log::EventLog;
use super::snapshot::StatusSnapshot;
use super::stats::{Report, Stats, StopReason};
use crate::core::{
    Charge, Observer, ProcessTable, QueueSet, SchedEvent, SimCtx, SimTime, SlotId, Units,
    WorkerId,
};
use crate::dispatch::{DispatchChannel, DispatchRequest};
use crate::error::{Result, SimError};
use crate::scheduler::{Policy, Transition};
use crate::worker::{self, WorkerBehavior};

pub type BehaviorFactory = Box<dyn FnMut(SlotId, WorkerId) -> WorkerBehavior>;

/// Owns the simulated machine: clock, table, queues, the dispatch channel and
/// every worker thread. Dropping it tears all of that down.
pub struct Sim<P: Policy> {
    pub ctx: SimCtx,
    policy: P,
    channel: DispatchChannel,
    workers: FxHashMap<WorkerId, JoinHandle<()>>,
    config: SimConfig,
    rng: StdRng,
    log: EventLog,
    stats: Stats,
    observer: Observer,
    behavior: Option<BehaviorFactory>,
    next_admission: SimTime,
    next_worker: u64,
    started: Instant,
    scheduled: Option<SlotId>,
    torn_down: bool,
}

impl<P: Policy> Sim<P> {
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;

        let queues = QueueSet::new(config.levels, config.quantum_factor)
            .ok_or_else(|| SimError::config("queue set cannot be built"))?;
        let mut ctx = SimCtx::new(config.slots, queues);
        let policy = P::init(&mut ctx);

        let log = match &config.log_path {
            Some(path) => EventLog::create(path, config.max_log_lines)?,
            None => EventLog::disabled(config.max_log_lines),
        };
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            ctx,
            policy,
            channel: DispatchChannel::new(),
            workers: FxHashMap::default(),
            config,
            rng,
            log,
            stats: Stats::default(),
            observer: Observer::new(),
            behavior: None,
            next_admission: SimTime::ZERO,
            next_worker: 1,
            started: Instant::now(),
            scheduled: None,
            torn_down: false,
        })
    }

    /// Decide each admitted worker's behaviour instead of drawing random odds.
    pub fn with_behavior(
        mut self,
        factory: impl FnMut(SlotId, WorkerId) -> WorkerBehavior + 'static,
    ) -> Self {
        self.behavior = Some(Box::new(factory));
        self
    }

    pub fn now(&self) -> SimTime {
        self.ctx.now
    }

    pub fn table(&self) -> &ProcessTable {
        &self.ctx.table
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn live_workers(&self) -> usize {
        self.workers.len()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot::capture(&self.ctx, self.scheduled)
    }

    /// Run one scheduler cycle and return what happened, in order.
    pub fn step(&mut self) -> Result<Vec<SchedEvent>> {
        debug_assert!(!self.torn_down, "Stepping a torn down simulation");
        let mut events = Vec::new();
        self.scheduled = None;

        if self.ctx.now.at_least(&self.next_admission) {
            if let Some(slot) = self.ctx.table.free_slot() {
                self.admit(slot, &mut events);
            }
            let gap = self.rng.random_range(1..=self.config.generation_max);
            self.next_admission = self.ctx.now.after(gap);
        }

        // A finished I/O wait goes ahead of anything in the ready queues
        let picked = match self.ctx.table.io_returned(self.ctx.now) {
            Some(slot) => {
                let record = self.ctx.table.record_mut(slot);
                record.waiting_on_io = false;
                if let Some(worker) = record.worker {
                    self.emit(&mut events, SchedEvent::IoReturned { slot, worker });
                }
                Some(slot)
            }
            None => self.policy.pick_next(&mut self.ctx),
        };

        let overhead = self.rng.random_range(1..=self.config.overhead_max);
        self.ctx
            .advance_time(overhead, picked.map(|slot| (slot, Charge::Overhead)));

        match picked {
            Some(slot) => self.dispatch(slot, overhead, &mut events)?,
            None => {
                let span = self.config.overhead_max * self.config.idle_factor;
                let skipped = self.rng.random_range(0..span);
                self.ctx.advance_time(skipped, None);
                self.stats.record_idle(skipped);
                self.emit(&mut events, SchedEvent::CpuIdle { skipped });
            }
        }

        self.observer.observe(&self.ctx.table, &self.ctx.queues);
        Ok(events)
    }

    fn emit(&mut self, events: &mut Vec<SchedEvent>, event: SchedEvent) {
        if let Err(e) = self.log.record(self.ctx.now, &event) {
            warn!("failed to write event log: {e}");
        }
        events.push(event);
    }

    fn draw_behavior(&mut self, slot: SlotId, worker: WorkerId) -> WorkerBehavior {
        if let Some(factory) = self.behavior.as_mut() {
            return factory(slot, worker);
        }
        let interrupt = self.config.interrupt_odds;
        let terminate = self.config.terminate_odds;
        WorkerBehavior::Random {
            interrupt_odds: self.rng.random_range(interrupt.min..=interrupt.max),
            terminate_odds: self.rng.random_range(terminate.min..=terminate.max),
        }
    }

    fn admit(&mut self, slot: SlotId, events: &mut Vec<SchedEvent>) {
        let worker = WorkerId(self.next_worker);
        self.next_worker += 1;

        self.ctx.table.occupy(slot, worker, self.ctx.now);
        let endpoint = self.channel.open(worker, slot);
        let behavior = self.draw_behavior(slot, worker);
        let seed = self.rng.random();

        match worker::spawn(endpoint, behavior, seed) {
            Ok(handle) => {
                self.workers.insert(worker, handle);
                self.policy.admit(&mut self.ctx, slot);
                self.stats.admitted += 1;
                let level = self.ctx.table.record(slot).level;
                self.emit(
                    events,
                    SchedEvent::Admitted {
                        slot,
                        worker,
                        level,
                    },
                );
            }
            Err(source) => {
                warn!("{}", SimError::WorkerSpawn { slot, source });
                self.channel.close(worker);
                self.ctx.table.release(slot);
                self.stats.spawn_failures += 1;
            }
        }
    }

    fn dispatch(
        &mut self,
        slot: SlotId,
        overhead: Units,
        events: &mut Vec<SchedEvent>,
    ) -> Result<()> {
        let record = self.ctx.table.record(slot);
        let level = record.level;
        let Some(worker) = record.worker else {
            return Err(SimError::channel(
                WorkerId(0),
                format!("slot {slot} picked without a worker"),
            ));
        };
        let quantum = self.policy.quantum(&self.ctx, slot);

        self.scheduled = Some(slot);
        self.emit(
            events,
            SchedEvent::Dispatched {
                slot,
                worker,
                level,
                quantum,
                overhead,
            },
        );

        self.ctx.table.set_running(slot);
        self.channel.dispatch(DispatchRequest {
            target: worker,
            quantum,
        })?;
        let reply = self.channel.await_reply(worker)?;
        self.ctx.table.clear_running();

        if reply.units_consumed > quantum {
            return Err(SimError::channel(
                worker,
                format!("burst {} exceeds quantum {quantum}", reply.units_consumed),
            ));
        }
        let burst = reply.units_consumed;
        self.ctx.table.record_mut(slot).last_burst = burst;
        self.ctx.advance_time(burst, Some((slot, Charge::Burst)));

        match self.policy.stopping(&mut self.ctx, slot, &reply) {
            Transition::Done => {
                let record = self.ctx.table.record(slot);
                let turnaround = self.ctx.now.since(&record.start_time);
                let wait = record.cumulative_wait.combined();
                self.stats.record_finished(wait, turnaround);
                self.ctx.table.release(slot);
                self.channel.close(worker);
                self.reap(worker);
                self.emit(
                    events,
                    SchedEvent::Completed {
                        slot,
                        worker,
                        burst,
                        turnaround,
                    },
                );
            }
            Transition::WaitIo { .. } => {
                let io_wait = self.rng.random_range(1..=self.config.max_io_wait);
                let io_completion = self.ctx.now.after(io_wait);
                let record = self.ctx.table.record_mut(slot);
                record.waiting_on_io = true;
                record.io_completion = io_completion;
                self.emit(
                    events,
                    SchedEvent::Interrupted {
                        slot,
                        worker,
                        burst,
                        io_completion,
                    },
                );
            }
            Transition::Requeued { from, to } => {
                self.emit(
                    events,
                    SchedEvent::Demoted {
                        slot,
                        worker,
                        burst,
                        from,
                        to,
                    },
                );
            }
        }
        Ok(())
    }

    fn reap(&mut self, worker: WorkerId) {
        if let Some(handle) = self.workers.remove(&worker) {
            if handle.join().is_err() {
                error!("worker {worker} panicked");
            }
        }
    }

    /// First termination condition that holds, if any.
    pub fn stop_reason(&self) -> Option<StopReason> {
        if self.stats.admitted >= self.config.max_total_workers {
            Some(StopReason::AdmissionCap)
        } else if self.ctx.now.secs() >= self.config.sim_seconds {
            Some(StopReason::SimTimeExhausted)
        } else if self.started.elapsed() >= self.config.real_budget() {
            Some(StopReason::RealTimeExhausted)
        } else {
            None
        }
    }

    fn drive(
        &mut self,
        shutdown: &AtomicBool,
        on_cycle: &mut dyn FnMut(&Self),
    ) -> Result<StopReason> {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                return Err(SimError::Interrupted);
            }

            self.step()?;
            on_cycle(self);

            if let Some(stop) = self.stop_reason() {
                info!("{stop} at {}", self.ctx.now);
                return Ok(stop);
            }
            if !self.config.cycle_delay.is_zero() {
                thread::sleep(self.config.cycle_delay);
            }
        }
    }

    /// Cycle until a termination condition or `shutdown` is hit, then tear
    /// down. `on_cycle` sees the simulation after every cycle.
    pub fn run(
        &mut self,
        shutdown: &AtomicBool,
        mut on_cycle: impl FnMut(&Self),
    ) -> Result<Report> {
        self.started = Instant::now();
        let outcome = self.drive(shutdown, &mut on_cycle);
        let teardown = self.teardown();

        match (outcome, teardown) {
            (Ok(stop), Ok(())) => {
                let cycles = self.observer.cycles();
                Ok(self.stats.report(stop, self.ctx.now, cycles))
            }
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(t)) => {
                error!("{t}");
                Err(e)
            }
        }
    }

    /// Abort every live worker, wait for all of them and close the event log.
    /// Only the first call does anything.
    pub fn teardown(&mut self) -> Result<()> {
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;
        self.ctx.table.clear_running();

        let occupied: Vec<SlotId> = self.ctx.table.occupied().collect();
        for slot in occupied {
            if let Some(worker) = self.ctx.table.record(slot).worker {
                if !self.channel.abort(worker) {
                    trace!("worker {worker} already gone");
                }
            }
            self.policy.evict(&mut self.ctx, slot);
            self.ctx.table.release(slot);
        }

        let leftover: Vec<WorkerId> = self.channel.workers().collect();
        for worker in leftover {
            self.channel.abort(worker);
        }

        let mut failures = Vec::new();
        for (worker, handle) in self.workers.drain() {
            if handle.join().is_err() {
                failures.push(format!("worker {worker} panicked"));
            }
        }
        match self.log.close() {
            Ok(()) => debug!("event log closed after {} lines", self.log.lines()),
            Err(e) => failures.push(format!("event log: {e}")),
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SimError::Teardown(failures))
        }
    }
}

impl<P: Policy> Drop for Sim<P> {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            error!("{e}");
        }
    }
}
