//! Error types for the process simulator.
//!
//! Every variant except the I/O and encoding wrappers is a fatal invariant
//! breach: the run that produced it stops at the offending event. A process
//! still in flight when the window closes is not an error.

use thiserror::Error;

use crate::config::ConfigError;
use crate::simulator::process::{ProcessId, ProcessState};
use crate::simulator::resource::PoolKind;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("cannot schedule event at {requested} when current time is {current}")]
    NonCausalEvent { requested: f64, current: f64 },

    #[error("clock regression: event at {event} popped when current time is {current}")]
    ClockRegression { current: f64, event: f64 },

    #[error("invalid virtual time value: {0}")]
    InvalidTime(f64),

    #[error("process {process} demands {demand} units but the {pool} pool holds only {capacity}")]
    DemandExceedsCapacity {
        pool: PoolKind,
        process: ProcessId,
        demand: u32,
        capacity: u32,
    },

    #[error("invalid request of {amount} units on the {pool} pool")]
    InvalidAmount { pool: PoolKind, amount: u32 },

    #[error("releasing {amount} units to the {pool} pool would exceed capacity {capacity} (available {available})")]
    ReleaseExceedsCapacity {
        pool: PoolKind,
        available: u32,
        amount: u32,
        capacity: u32,
    },

    #[error("process {process} releases the {pool} pool without holding it")]
    NotHeld { pool: PoolKind, process: ProcessId },

    #[error("process {process} holds {held} units of the {pool} pool but released {amount}")]
    ReleaseMismatch {
        pool: PoolKind,
        process: ProcessId,
        held: u32,
        amount: u32,
    },

    #[error("process {process} already holds or awaits the {pool} pool")]
    AlreadyHolding { pool: PoolKind, process: ProcessId },

    #[error("process {0} is not live")]
    UnknownProcess(ProcessId),

    #[error("process {process} cannot move from {from:?} to {to:?}")]
    IllegalTransition {
        process: ProcessId,
        from: ProcessState,
        to: ProcessState,
    },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SimResult<T> = Result<T, SimError>;
