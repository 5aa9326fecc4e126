//! Quantum accounting and the post-quantum branch table.
//!
//! After each quantum that leaves work outstanding, one uniform draw
//! `r ∈ [1, total]` picks the branch: `r <= wait_weight` sends the process
//! to `Waiting`, anything above continues on the processor. With the default
//! weights `{wait: 1, continue: 20}` that is `r == 1` out of 21.

use crate::config::LifecycleConfig;
use crate::simulator::process::Process;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Wait,
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchTable {
    pub wait_weight: u32,
    pub continue_weight: u32,
}

impl BranchTable {
    pub const DEFAULT: BranchTable = BranchTable {
        wait_weight: 1,
        continue_weight: 20,
    };

    pub fn total(&self) -> u32 {
        self.wait_weight + self.continue_weight
    }

    /// Classify a draw in `1..=total`.
    pub fn classify(&self, draw: u32) -> Branch {
        if draw <= self.wait_weight {
            Branch::Wait
        } else {
            Branch::Continue
        }
    }

    pub fn wait_probability(&self) -> f64 {
        f64::from(self.wait_weight) / f64::from(self.total())
    }
}

impl Default for BranchTable {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<&LifecycleConfig> for BranchTable {
    fn from(config: &LifecycleConfig) -> Self {
        Self {
            wait_weight: config.wait_weight,
            continue_weight: config.continue_weight,
        }
    }
}

/// What a finished quantum leads to, before any branch draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantumOutcome {
    Finished,
    Remaining(i64),
}

/// Account one quantum of work: `min(per_cycle, remaining)` instructions.
pub fn complete_quantum(process: &mut Process, instructions_per_cycle: u32) -> QuantumOutcome {
    let executed = i64::from(instructions_per_cycle).min(process.instructions_remaining);
    process.instructions_remaining -= executed;
    if process.instructions_remaining <= 0 {
        QuantumOutcome::Finished
    } else {
        QuantumOutcome::Remaining(process.instructions_remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::process::{ProcessId, ProcessSpec};
    use crate::simulator::time::VirtualTime;

    fn process(instructions: u32) -> Process {
        Process::new(
            ProcessId::new(1),
            ProcessSpec { memory_demand: 1, instructions },
            VirtualTime::ZERO,
        )
    }

    #[test]
    fn test_default_table_thresholds() {
        let table = BranchTable::DEFAULT;
        assert_eq!(table.total(), 21);
        assert_eq!(table.classify(1), Branch::Wait);
        assert_eq!(table.classify(2), Branch::Continue);
        assert_eq!(table.classify(21), Branch::Continue);
        assert!((table.wait_probability() - 1.0 / 21.0).abs() < 1e-12);
    }

    #[test]
    fn test_custom_weights() {
        let table = BranchTable { wait_weight: 3, continue_weight: 1 };
        assert_eq!(table.classify(3), Branch::Wait);
        assert_eq!(table.classify(4), Branch::Continue);

        let never_wait = BranchTable { wait_weight: 0, continue_weight: 5 };
        assert!((1..=5).all(|r| never_wait.classify(r) == Branch::Continue));
    }

    #[test]
    fn test_quantum_consumes_per_cycle() {
        let mut p = process(7);
        assert_eq!(complete_quantum(&mut p, 3), QuantumOutcome::Remaining(4));
        assert_eq!(complete_quantum(&mut p, 3), QuantumOutcome::Remaining(1));
        assert_eq!(complete_quantum(&mut p, 3), QuantumOutcome::Finished);
        assert_eq!(p.instructions_remaining, 0);
    }

    #[test]
    fn test_exact_fit_finishes_in_one_quantum() {
        let mut p = process(3);
        assert_eq!(complete_quantum(&mut p, 3), QuantumOutcome::Finished);
        assert_eq!(p.instructions_remaining, 0);
    }
}
