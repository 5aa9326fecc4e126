//! Event queue and simulation clock for the process simulator.
//!
//! Events are ordered by `(timestamp, seq)`: earliest time first, and among
//! equal times, insertion order. `BinaryHeap` is a max-heap, so `Ord` on
//! `SimEvent` is reversed.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::{SimError, SimResult};
use crate::simulator::process::{ProcessId, ProcessSpec};
use crate::simulator::time::VirtualTime;

/// What to resume when an event fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// The generator's next arrival.
    GenerateArrival,
    /// A scripted arrival with fixed attributes.
    Inject(ProcessSpec),
    /// A queued memory request was satisfied by a release.
    MemoryGranted(ProcessId),
    /// The processor was handed to this process.
    ProcessorGranted(ProcessId),
    /// One execution quantum finished.
    QuantumElapsed(ProcessId),
    /// A waiting excursion is over.
    WaitElapsed(ProcessId),
}

impl Continuation {
    pub fn process(&self) -> Option<ProcessId> {
        match self {
            Continuation::GenerateArrival | Continuation::Inject(_) => None,
            Continuation::MemoryGranted(p)
            | Continuation::ProcessorGranted(p)
            | Continuation::QuantumElapsed(p)
            | Continuation::WaitElapsed(p) => Some(*p),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimEvent {
    pub timestamp: VirtualTime,
    pub seq: u64,
    pub continuation: Continuation,
}

impl PartialEq for SimEvent {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp && self.seq == other.seq
    }
}
impl Eq for SimEvent {}
impl PartialOrd for SimEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for SimEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Simulation clock. Only the event queue moves it.
#[derive(Debug, Clone)]
pub struct SimClock {
    current_time: VirtualTime,
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            current_time: VirtualTime::ZERO,
        }
    }

    pub fn now(&self) -> VirtualTime {
        self.current_time
    }

    fn advance_to(&mut self, to: VirtualTime) -> SimResult<()> {
        if to < self.current_time {
            return Err(SimError::ClockRegression {
                current: self.current_time.as_f64(),
                event: to.as_f64(),
            });
        }
        self.current_time = to;
        Ok(())
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Time-ordered queue of pending continuations plus the clock it drives.
#[derive(Debug, Clone)]
pub struct SimEventQueue {
    queue: BinaryHeap<SimEvent>,
    clock: SimClock,
    next_seq: u64,
}

impl SimEventQueue {
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            clock: SimClock::new(),
            next_seq: 0,
        }
    }

    pub fn now(&self) -> VirtualTime {
        self.clock.now()
    }

    /// Schedule `continuation` to run `delay` units from now.
    pub fn schedule(&mut self, delay: f64, continuation: Continuation) -> SimResult<u64> {
        if delay < 0.0 {
            let current = self.now().as_f64();
            return Err(SimError::NonCausalEvent {
                requested: current + delay,
                current,
            });
        }
        let at = self.now().after(delay)?;
        Ok(self.push(at, continuation))
    }

    /// Schedule `continuation` at an absolute time no earlier than now.
    pub fn schedule_at(&mut self, at: VirtualTime, continuation: Continuation) -> SimResult<u64> {
        if at < self.now() {
            return Err(SimError::NonCausalEvent {
                requested: at.as_f64(),
                current: self.now().as_f64(),
            });
        }
        Ok(self.push(at, continuation))
    }

    fn push(&mut self, timestamp: VirtualTime, continuation: Continuation) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(SimEvent {
            timestamp,
            seq,
            continuation,
        });
        seq
    }

    pub fn peek_time(&self) -> Option<VirtualTime> {
        self.queue.peek().map(|e| e.timestamp)
    }

    /// Pop the earliest event if it is due no later than `until`, moving the
    /// clock to its timestamp.
    pub fn pop_due(&mut self, until: VirtualTime) -> SimResult<Option<SimEvent>> {
        match self.queue.peek() {
            Some(event) if event.timestamp <= until => {}
            _ => return Ok(None),
        }
        self.pop()
    }

    /// Pop the earliest event regardless of time, moving the clock to it.
    pub fn pop(&mut self) -> SimResult<Option<SimEvent>> {
        let Some(event) = self.queue.pop() else {
            return Ok(None);
        };
        self.clock.advance_to(event.timestamp)?;
        Ok(Some(event))
    }

    /// Close the window: drop pending events and park the clock at `until`.
    pub fn discard_until(&mut self, until: VirtualTime) -> SimResult<usize> {
        let dropped = self.queue.len();
        self.queue.clear();
        if until > self.now() {
            self.clock.advance_to(until)?;
        }
        Ok(dropped)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for SimEventQueue {
    fn default() -> Self {
        Self::new()
    }
}
