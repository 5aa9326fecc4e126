// procsim: discrete-event model of processes contending for a memory pool
// and a single processor, with latency statistics and parameter sweeps.

pub mod config;
pub mod error;
pub mod eventlog;
pub mod simulator;
pub mod stats;
pub mod sweep;

pub use crate::config::{SimConfig, load_config};
pub use crate::error::{SimError, SimResult};
pub use crate::eventlog::{EventLog, LifecycleEvent, LifecycleKind};
pub use crate::simulator::process::{ProcessId, ProcessSpec, ProcessState};
pub use crate::simulator::sampler::{Sampler, SeededSampler};
pub use crate::simulator::time::VirtualTime;
pub use crate::simulator::{RunOutput, Simulator, run_simulation};
pub use crate::stats::{LatencySummary, RunRecord};
pub use crate::sweep::{SweepPoint, run_sweep};
