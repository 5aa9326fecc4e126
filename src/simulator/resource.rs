//! Counting resource pools with FIFO wait queues.
//!
//! Both the memory pool and the processor are a `ResourcePool`; the
//! processor is simply a pool of capacity 1 where every request is for one
//! unit. A release hands freed units straight to the head of the wait queue,
//! so a granted waiter owns its units from the instant of the release even
//! though its continuation runs as a separate event at that same time.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::simulator::process::ProcessId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    Memory,
    Processor,
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolKind::Memory => write!(f, "memory"),
            PoolKind::Processor => write!(f, "processor"),
        }
    }
}

/// Outcome of an acquire call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// Units were taken; the caller continues at the current time.
    Granted,
    /// The request joined the wait queue; a later release grants it.
    Queued,
}

#[derive(Debug, Clone, Copy)]
struct Request {
    process: ProcessId,
    amount: u32,
}

#[derive(Debug, Clone)]
pub struct ResourcePool {
    kind: PoolKind,
    capacity: u32,
    available: u32,
    holders: BTreeMap<ProcessId, u32>,
    wait_queue: VecDeque<Request>,
}

impl ResourcePool {
    pub fn new(kind: PoolKind, capacity: u32) -> Self {
        Self {
            kind,
            capacity,
            available: capacity,
            holders: BTreeMap::new(),
            wait_queue: VecDeque::new(),
        }
    }

    /// Memory pool of `capacity` interchangeable units.
    pub fn memory(capacity: u32) -> Self {
        Self::new(PoolKind::Memory, capacity)
    }

    /// Exclusive processor: capacity 1.
    pub fn processor() -> Self {
        Self::new(PoolKind::Processor, 1)
    }

    /// Request `amount` units for `process`.
    ///
    /// Granted immediately only if nobody is queued ahead and enough units
    /// are free; otherwise the request waits its turn.
    pub fn acquire(&mut self, process: ProcessId, amount: u32) -> SimResult<Acquire> {
        if amount == 0 {
            return Err(SimError::InvalidAmount {
                pool: self.kind,
                amount,
            });
        }
        if amount > self.capacity {
            return Err(SimError::DemandExceedsCapacity {
                pool: self.kind,
                process,
                demand: amount,
                capacity: self.capacity,
            });
        }
        if self.holders.contains_key(&process) || self.is_queued(process) {
            return Err(SimError::AlreadyHolding {
                pool: self.kind,
                process,
            });
        }

        if self.wait_queue.is_empty() && self.available >= amount {
            self.available -= amount;
            self.holders.insert(process, amount);
            Ok(Acquire::Granted)
        } else {
            self.wait_queue.push_back(Request { process, amount });
            Ok(Acquire::Queued)
        }
    }

    /// Return the units held by `process` and grant queued requests, in
    /// order, until the head no longer fits.
    ///
    /// Returns the processes granted by this release.
    pub fn release(&mut self, process: ProcessId, amount: u32) -> SimResult<Vec<ProcessId>> {
        let held = match self.holders.get(&process) {
            Some(&held) => held,
            None => {
                return Err(SimError::NotHeld {
                    pool: self.kind,
                    process,
                });
            }
        };
        if held != amount {
            return Err(SimError::ReleaseMismatch {
                pool: self.kind,
                process,
                held,
                amount,
            });
        }
        let restored = self.available.checked_add(amount).filter(|&v| v <= self.capacity);
        let Some(restored) = restored else {
            return Err(SimError::ReleaseExceedsCapacity {
                pool: self.kind,
                available: self.available,
                amount,
                capacity: self.capacity,
            });
        };

        self.holders.remove(&process);
        self.available = restored;

        let mut granted = Vec::new();
        while let Some(head) = self.wait_queue.front().copied() {
            if head.amount > self.available {
                break;
            }
            self.wait_queue.pop_front();
            self.available -= head.amount;
            self.holders.insert(head.process, head.amount);
            granted.push(head.process);
        }
        Ok(granted)
    }

    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn available(&self) -> u32 {
        self.available
    }

    pub fn in_use(&self) -> u32 {
        self.capacity - self.available
    }

    pub fn queue_len(&self) -> usize {
        self.wait_queue.len()
    }

    /// Units currently held by `process`, if any.
    pub fn holds(&self, process: ProcessId) -> Option<u32> {
        self.holders.get(&process).copied()
    }

    pub fn is_queued(&self, process: ProcessId) -> bool {
        self.wait_queue.iter().any(|r| r.process == process)
    }

    /// Holders in ascending id order.
    pub fn holders(&self) -> impl Iterator<Item = (ProcessId, u32)> + '_ {
        self.holders.iter().map(|(&p, &n)| (p, n))
    }

    /// Check the pool's own accounting: held units plus free units equal
    /// the capacity.
    pub fn is_balanced(&self) -> bool {
        let held: u64 = self.holders.values().map(|&n| u64::from(n)).sum();
        held + u64::from(self.available) == u64::from(self.capacity)
    }
}
