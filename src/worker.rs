use std::collections::VecDeque;
use std::io;
use std::thread::{self, JoinHandle};

use log::trace;
use rand::prelude::*;
use rand::rngs::StdRng;

use crate::core::Units;
use crate::dispatch::{Directive, DispatchReply, WorkerEndpoint};

/// What a scripted worker does with one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Full,
    Interrupt(Units),
    Finish(Units),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerBehavior {
    /// 1-in-N odds checked on every dispatch, termination first.
    Random {
        interrupt_odds: u32,
        terminate_odds: u32,
    },
    /// Fixed outcomes, one per dispatch. Finishes with no burst once drained.
    Script(VecDeque<Outcome>),
}

impl WorkerBehavior {
    pub fn script(outcomes: impl IntoIterator<Item = Outcome>) -> Self {
        Self::Script(outcomes.into_iter().collect())
    }
}

fn one_in(rng: &mut StdRng, odds: u32) -> bool {
    debug_assert!(odds > 0, "odds must be at least 1-in-1");
    rng.random_range(0..odds) == odds - 1
}

pub struct Worker {
    endpoint: WorkerEndpoint,
    behavior: WorkerBehavior,
    rng: StdRng,
}

impl Worker {
    pub fn new(endpoint: WorkerEndpoint, behavior: WorkerBehavior, seed: u64) -> Self {
        Self {
            endpoint,
            behavior,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Decide how much of `quantum` this dispatch consumes.
    pub fn decide(&mut self, quantum: Units) -> DispatchReply {
        let me = self.endpoint.worker();
        match &mut self.behavior {
            WorkerBehavior::Random {
                interrupt_odds,
                terminate_odds,
            } => {
                if one_in(&mut self.rng, *terminate_odds) {
                    let burst = self.rng.random_range(0..=quantum);
                    DispatchReply::finished(me, burst)
                } else if one_in(&mut self.rng, *interrupt_odds) {
                    let burst = self.rng.random_range(0..=quantum);
                    DispatchReply::interrupted(me, burst)
                } else {
                    DispatchReply::full(me, quantum)
                }
            }
            WorkerBehavior::Script(outcomes) => match outcomes.pop_front() {
                Some(Outcome::Full) => DispatchReply::full(me, quantum),
                Some(Outcome::Interrupt(units)) => {
                    DispatchReply::interrupted(me, units.min(quantum))
                }
                Some(Outcome::Finish(units)) => DispatchReply::finished(me, units.min(quantum)),
                None => DispatchReply::finished(me, 0),
            },
        }
    }

    /// Serve dispatches until told to abort or until reporting completion.
    pub fn run(mut self) {
        let me = self.endpoint.worker();
        trace!("worker {me} serving slot {}", self.endpoint.slot());
        loop {
            let request = match self.endpoint.next_directive() {
                Some(Directive::Run(request)) => request,
                Some(Directive::Abort) => {
                    trace!("worker {me} aborted");
                    return;
                }
                None => {
                    trace!("worker {me} lost its scheduler");
                    return;
                }
            };
            debug_assert_eq!(request.target, me, "Dispatch routed to wrong worker");

            let reply = self.decide(request.quantum);
            if !self.endpoint.reply(reply) || reply.finished {
                trace!("worker {me} exiting");
                return;
            }
        }
    }
}

pub fn spawn(
    endpoint: WorkerEndpoint,
    behavior: WorkerBehavior,
    seed: u64,
) -> io::Result<JoinHandle<()>> {
    let name = format!("worker-{}", endpoint.worker());
    let worker = Worker::new(endpoint, behavior, seed);
    thread::Builder::new().name(name).spawn(move || worker.run())
}
