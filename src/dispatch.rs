//! Request/reply handshake between the scheduler and its workers.
//!
//! Each worker gets its own pair of bounded channels keyed by its
//! [`WorkerId`]. The scheduler keeps at most one request in flight and only
//! reads the reply channel of the worker it dispatched, so a reply can never
//! be attributed to the wrong worker.

use crossbeam::channel::{self, Receiver, Sender};
use rustc_hash::FxHashMap;

use crate::core::{SlotId, Units, WorkerId};
use crate::error::{Result, SimError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchRequest {
    pub target: WorkerId,
    pub quantum: Units,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReply {
    pub from: WorkerId,
    pub finished: bool,
    pub interrupted: bool,
    pub units_consumed: Units,
}

impl DispatchReply {
    pub fn full(from: WorkerId, quantum: Units) -> Self {
        Self {
            from,
            finished: false,
            interrupted: false,
            units_consumed: quantum,
        }
    }

    pub fn interrupted(from: WorkerId, units: Units) -> Self {
        Self {
            interrupted: true,
            ..Self::full(from, units)
        }
    }

    pub fn finished(from: WorkerId, units: Units) -> Self {
        Self {
            finished: true,
            ..Self::full(from, units)
        }
    }
}

#[derive(Debug)]
pub enum Directive {
    Run(DispatchRequest),
    Abort,
}

/// Worker side of a route. Scoped to one slot; it carries no access to the
/// process table.
#[derive(Debug)]
pub struct WorkerEndpoint {
    worker: WorkerId,
    slot: SlotId,
    directives: Receiver<Directive>,
    replies: Sender<DispatchReply>,
}

impl WorkerEndpoint {
    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Block until the scheduler sends something. `None` once the scheduler
    /// side of the route is gone.
    pub fn next_directive(&self) -> Option<Directive> {
        self.directives.recv().ok()
    }

    /// Returns false if the scheduler is no longer listening.
    pub fn reply(&self, reply: DispatchReply) -> bool {
        self.replies.send(reply).is_ok()
    }
}

#[derive(Debug)]
struct Route {
    directives: Sender<Directive>,
    replies: Receiver<DispatchReply>,
}

#[derive(Debug, Default)]
pub struct DispatchChannel {
    routes: FxHashMap<WorkerId, Route>,
    outstanding: Option<WorkerId>,
}

impl DispatchChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the route for a newly admitted worker and hand back its end.
    pub fn open(&mut self, worker: WorkerId, slot: SlotId) -> WorkerEndpoint {
        let (directive_tx, directive_rx) = channel::bounded(1);
        let (reply_tx, reply_rx) = channel::bounded(1);

        let prev = self.routes.insert(
            worker,
            Route {
                directives: directive_tx,
                replies: reply_rx,
            },
        );
        debug_assert!(prev.is_none(), "Worker {worker} already has a route");

        WorkerEndpoint {
            worker,
            slot,
            directives: directive_rx,
            replies: reply_tx,
        }
    }

    /// Drop the route of a worker that will not be dispatched again.
    pub fn close(&mut self, worker: WorkerId) {
        self.routes.remove(&worker);
    }

    pub fn outstanding(&self) -> Option<WorkerId> {
        self.outstanding
    }

    pub fn workers(&self) -> impl Iterator<Item = WorkerId> + '_ {
        self.routes.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn dispatch(&mut self, request: DispatchRequest) -> Result<()> {
        let worker = request.target;
        if let Some(pending) = self.outstanding {
            return Err(SimError::channel(
                worker,
                format!("dispatch while worker {pending} still holds the CPU"),
            ));
        }

        let route = self
            .routes
            .get(&worker)
            .ok_or_else(|| SimError::channel(worker, "no route to worker"))?;
        route
            .directives
            .send(Directive::Run(request))
            .map_err(|_| SimError::channel(worker, "worker hung up before dispatch"))?;

        self.outstanding = Some(worker);
        Ok(())
    }

    /// Block for the reply to the outstanding dispatch of `worker`.
    pub fn await_reply(&mut self, worker: WorkerId) -> Result<DispatchReply> {
        if self.outstanding != Some(worker) {
            return Err(SimError::channel(worker, "no dispatch outstanding"));
        }

        let route = self
            .routes
            .get(&worker)
            .ok_or_else(|| SimError::channel(worker, "no route to worker"))?;
        let reply = route
            .replies
            .recv()
            .map_err(|_| SimError::channel(worker, "worker exited without replying"))?;
        self.outstanding = None;

        if reply.from != worker {
            return Err(SimError::channel(
                worker,
                format!("reply carries identity of worker {}", reply.from),
            ));
        }
        Ok(reply)
    }

    /// Tell `worker` to exit and forget its route. Returns false if the worker
    /// had already gone away.
    pub fn abort(&mut self, worker: WorkerId) -> bool {
        if self.outstanding == Some(worker) {
            self.outstanding = None;
        }
        match self.routes.remove(&worker) {
            Some(route) => route.directives.send(Directive::Abort).is_ok(),
            None => false,
        }
    }
}
