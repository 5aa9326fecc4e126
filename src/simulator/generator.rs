//! Arrival generator: exponential inter-arrival gaps, uniform process
//! attributes, optional cap on the number of arrivals.

use crate::error::SimResult;
use crate::simulator::process::{Process, ProcessId, ProcessSpec};
use crate::simulator::sampler::Sampler;
use crate::simulator::time::VirtualTime;

#[derive(Debug, Clone)]
pub struct ProcessGenerator {
    mean_interval: f64,
    limit: Option<u64>,
    generated: u64,
}

impl ProcessGenerator {
    pub fn new(mean_interval: f64, limit: Option<u64>) -> Self {
        Self {
            mean_interval,
            limit,
            generated: 0,
        }
    }

    /// Delay until the next arrival, or `None` once the cap is reached.
    pub fn next_delay<S: Sampler>(&self, sampler: &mut S) -> SimResult<Option<f64>> {
        if self.is_exhausted() {
            return Ok(None);
        }
        sampler.interarrival(self.mean_interval).map(Some)
    }

    /// Draw the attributes of the next arrival and count it.
    pub fn draw_spec<S: Sampler>(&mut self, sampler: &mut S) -> ProcessSpec {
        self.generated += 1;
        ProcessSpec {
            memory_demand: sampler.memory_demand(),
            instructions: sampler.instructions(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.limit.is_some_and(|limit| self.generated >= limit)
    }

    pub fn generated(&self) -> u64 {
        self.generated
    }
}

/// Hands out process ids starting at 1, shared by generated and scripted
/// arrivals.
#[derive(Debug, Clone)]
pub struct ProcessIdGen {
    next: u64,
}

impl ProcessIdGen {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn spawn(&mut self, spec: ProcessSpec, now: VirtualTime) -> Process {
        let id = ProcessId::new(self.next);
        self.next += 1;
        Process::new(id, spec, now)
    }
}

impl Default for ProcessIdGen {
    fn default() -> Self {
        Self::new()
    }
}
