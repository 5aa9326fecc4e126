//! Simulated processes and their lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::simulator::time::VirtualTime;

/// Unique, monotonically assigned process identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(u64);

impl ProcessId {
    #[inline]
    pub fn new(id: u64) -> Self {
        ProcessId(id)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    Arriving,
    AwaitingMemory,
    AwaitingProcessor,
    Running,
    Waiting,
    Terminated,
}

impl ProcessState {
    /// Edges of the lifecycle graph. `Running -> Running` is the
    /// continue-branch; nothing leaves `Terminated`.
    pub fn can_transition_to(self, to: ProcessState) -> bool {
        use ProcessState::*;
        matches!(
            (self, to),
            (Arriving, AwaitingMemory)
                | (Arriving, AwaitingProcessor)
                | (AwaitingMemory, AwaitingProcessor)
                | (AwaitingProcessor, Running)
                | (Running, Running)
                | (Running, Waiting)
                | (Running, Terminated)
                | (Waiting, AwaitingProcessor)
        )
    }

    /// States in which the process owns its memory units.
    pub fn holds_memory(self) -> bool {
        matches!(
            self,
            ProcessState::AwaitingProcessor | ProcessState::Running | ProcessState::Waiting
        )
    }
}

/// Attributes of a process before it enters the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub memory_demand: u32,
    pub instructions: u32,
}

#[derive(Debug, Clone)]
pub struct Process {
    pub id: ProcessId,
    pub memory_demand: u32,
    /// Signed so the last quantum may overshoot below zero.
    pub instructions_remaining: i64,
    pub arrival_time: VirtualTime,
    /// Set once the process has held memory and processor together.
    pub admitted: bool,
    state: ProcessState,
}

impl Process {
    pub fn new(id: ProcessId, spec: ProcessSpec, arrival_time: VirtualTime) -> Self {
        Self {
            id,
            memory_demand: spec.memory_demand,
            instructions_remaining: i64::from(spec.instructions),
            arrival_time,
            admitted: false,
            state: ProcessState::Arriving,
        }
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Move along a lifecycle edge, rejecting anything off the graph.
    pub fn transition(&mut self, to: ProcessState) -> SimResult<ProcessState> {
        let from = self.state;
        if !from.can_transition_to(to) {
            return Err(SimError::IllegalTransition {
                process: self.id,
                from,
                to,
            });
        }
        self.state = to;
        Ok(from)
    }
}
