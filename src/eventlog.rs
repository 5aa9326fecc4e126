//! Lifecycle event log.
//!
//! One record per lifecycle transition of a process. Records are kept in
//! execution order, mirrored to `tracing` at debug level, and can be
//! exported as JSON Lines. Two runs with the same seed and configuration
//! export byte-identical logs.

use std::fmt;
use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::SimResult;
use crate::simulator::process::ProcessId;
use crate::simulator::time::VirtualTime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LifecycleKind {
    Arrival { memory_demand: u32, instructions: u32 },
    /// Memory and processor held together for the first time.
    Admission { memory_available: u32 },
    RunStart { instructions_remaining: i64 },
    WaitEnter { wait_duration: f64 },
    WaitExit,
    Termination { arrival_time: VirtualTime, latency: f64 },
}

impl fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleKind::Arrival { memory_demand, instructions } => write!(
                f,
                "arrives with {} memory and {} instructions",
                memory_demand, instructions
            ),
            LifecycleKind::Admission { memory_available } => {
                write!(f, "admitted ({} memory units left)", memory_available)
            }
            LifecycleKind::RunStart { instructions_remaining } => {
                write!(f, "starts running ({} instructions left)", instructions_remaining)
            }
            LifecycleKind::WaitEnter { wait_duration } => {
                write!(f, "goes to waiting for {}", wait_duration)
            }
            LifecycleKind::WaitExit => write!(f, "is back from waiting"),
            LifecycleKind::Termination { latency, .. } => {
                write!(f, "terminates after {:.3}", latency)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub process_id: ProcessId,
    pub time: VirtualTime,
    #[serde(flatten)]
    pub kind: LifecycleKind,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.time, self.process_id, self.kind)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Vec<LifecycleEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, process_id: ProcessId, time: VirtualTime, kind: LifecycleKind) {
        let event = LifecycleEvent {
            process_id,
            time,
            kind,
        };
        tracing::debug!("{}", event);
        self.entries.push(event);
    }

    pub fn entries(&self) -> &[LifecycleEvent] {
        &self.entries
    }

    /// Records of one process, in order.
    pub fn for_process(&self, process_id: ProcessId) -> impl Iterator<Item = &LifecycleEvent> {
        self.entries.iter().filter(move |e| e.process_id == process_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write one JSON object per line.
    pub fn write_jsonl<W: Write>(&self, mut w: W) -> SimResult<()> {
        for entry in &self.entries {
            serde_json::to_writer(&mut w, entry)?;
            w.write_all(b"\n")?;
        }
        w.flush()?;
        Ok(())
    }
}
