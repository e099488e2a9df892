//! Delayed "throws": set one puck's position and velocity once, some time
//! after the request.
//!
//! One timer thread per queue holds every scheduled write in a deadline
//! heap. It never touches the table: due writes are posted to a channel
//! and the table applies them at the start of its next tick, so a throw
//! whose puck was deleted in the meantime (or that was superseded by a
//! newer throw for the same puck) is silently dropped.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use glam::DVec2;

use super::puck::PuckId;

/// A delivered write, ready to be applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrowWrite {
    pub puck: PuckId,
    pub position: DVec2,
    pub velocity: DVec2,
    token: u64,
}

/// A write handed to the timer thread
struct Scheduled {
    due: Instant,
    write: ThrowWrite,
}

/// Timer thread body: sleep until the next deadline or request, post due
/// writes, and exit once the queue that feeds it is dropped.
fn run_timer(requests: Receiver<Scheduled>, delivered: Sender<ThrowWrite>) {
    let mut deadlines: BinaryHeap<Reverse<(Instant, u64)>> = BinaryHeap::new();
    let mut writes: HashMap<u64, ThrowWrite> = HashMap::new();

    loop {
        let now = Instant::now();
        while let Some(&Reverse((due, token))) = deadlines.peek() {
            if due > now {
                break;
            }
            deadlines.pop();
            if let Some(write) = writes.remove(&token) {
                if delivered.send(write).is_err() {
                    return;
                }
            }
        }

        let next = match deadlines.peek() {
            Some(&Reverse((due, _))) => requests.recv_deadline(due),
            None => requests.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match next {
            Ok(scheduled) => {
                let token = scheduled.write.token;
                deadlines.push(Reverse((scheduled.due, token)));
                writes.insert(token, scheduled.write);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                log::trace!("throw timer stopping with {} writes undelivered", writes.len());
                return;
            }
        }
    }
}

/// Pending delayed writes, at most one per puck
pub struct ThrowQueue {
    tx: Sender<ThrowWrite>,
    rx: Receiver<ThrowWrite>,
    /// Started on the first throw
    timer: Option<Sender<Scheduled>>,
    pending: HashMap<PuckId, u64>,
    next_token: u64,
}

impl Default for ThrowQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ThrowQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            timer: None,
            pending: HashMap::new(),
            next_token: 0,
        }
    }

    fn timer(&mut self) -> Option<&Sender<Scheduled>> {
        if self.timer.is_none() {
            let (requests, incoming) = unbounded();
            let delivered = self.tx.clone();
            let spawned = thread::Builder::new()
                .name("throw-timer".to_string())
                .spawn(move || run_timer(incoming, delivered));
            match spawned {
                Ok(_) => self.timer = Some(requests),
                Err(e) => log::warn!("could not start the throw timer: {}", e),
            }
        }
        self.timer.as_ref()
    }

    /// Schedule a write after `delay`; replaces any pending throw for the puck
    pub fn schedule(&mut self, puck: PuckId, delay: Duration, position: DVec2, velocity: DVec2) {
        self.next_token += 1;
        let token = self.next_token;
        if self.pending.insert(puck, token).is_some() {
            log::debug!("throw for puck {} superseded", puck);
        }

        let write = ThrowWrite {
            puck,
            position,
            velocity,
            token,
        };
        let accepted = match Instant::now().checked_add(delay) {
            Some(due) => self
                .timer()
                .is_some_and(|timer| timer.send(Scheduled { due, write }).is_ok()),
            None => {
                log::warn!("throw delay {:?} for puck {} is out of range", delay, puck);
                false
            }
        };
        if !accepted {
            self.pending.remove(&puck);
        }
    }

    /// Forget the pending throw for a puck (it was deleted)
    pub fn cancel(&mut self, puck: PuckId) {
        self.pending.remove(&puck);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn accept(&mut self, write: ThrowWrite) -> Option<ThrowWrite> {
        match self.pending.get(&write.puck) {
            Some(&token) if token == write.token => {
                self.pending.remove(&write.puck);
                Some(write)
            }
            _ => None,
        }
    }

    /// Writes delivered so far that are still current
    pub fn drain(&mut self) -> Vec<ThrowWrite> {
        let delivered: Vec<_> = self.rx.try_iter().collect();
        delivered.into_iter().filter_map(|w| self.accept(w)).collect()
    }

    /// Block until every pending throw is delivered or `timeout` passes
    pub fn wait(&mut self, timeout: Duration) -> Vec<ThrowWrite> {
        let deadline = Instant::now() + timeout;
        let mut out = Vec::new();
        while !self.pending.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match self.rx.recv_timeout(deadline - now) {
                Ok(write) => out.extend(self.accept(write)),
                Err(_) => break,
            }
        }
        out
    }
}
