//! Discrete-event simulation of processes contending for memory and a
//! single processor.
//!
//! A [`Simulator`] owns one run's whole world: the event queue and clock,
//! both resource pools, the live process table, the arrival generator, the
//! sampler and the outputs. Build a fresh one per run; nothing carries over.
//!
//! Each live process has at most one pending continuation. A process either
//! sits in a pool's wait queue (no event pending) or has exactly one timer
//! or grant event in the queue, so no process can hold a resource twice.

pub mod event_queue;
pub mod generator;
pub mod lifecycle;
pub mod process;
pub mod resource;
pub mod sampler;
pub mod time;

use std::collections::BTreeMap;

use crate::config::{SimConfig, SimulationConfig};
use crate::error::{SimError, SimResult};
use crate::eventlog::{EventLog, LifecycleKind};
use crate::stats::{LatencySummary, RunRecord, StatisticsCollector, summarize};

use event_queue::{Continuation, SimEvent, SimEventQueue};
use generator::{ProcessGenerator, ProcessIdGen};
use lifecycle::{Branch, BranchTable, QuantumOutcome, complete_quantum};
use process::{Process, ProcessId, ProcessSpec, ProcessState};
use resource::{Acquire, PoolKind, ResourcePool};
use sampler::{Sampler, SeededSampler};
use time::VirtualTime;

/// Everything a finished run hands to its consumers.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub records: Vec<RunRecord>,
    pub log: EventLog,
    /// Processes still queued, running or waiting when the window closed.
    pub in_flight: usize,
    pub events_processed: u64,
    pub end_time: VirtualTime,
}

impl RunOutput {
    pub fn summary(&self) -> LatencySummary {
        summarize(&self.records)
    }
}

pub struct Simulator<S: Sampler = SeededSampler> {
    config: SimulationConfig,
    branches: BranchTable,
    window: VirtualTime,
    queue: SimEventQueue,
    memory: ResourcePool,
    processor: ResourcePool,
    processes: BTreeMap<ProcessId, Process>,
    generator: ProcessGenerator,
    ids: ProcessIdGen,
    sampler: S,
    log: EventLog,
    stats: StatisticsCollector,
    events_processed: u64,
}

impl Simulator<SeededSampler> {
    /// Simulator drawing from a `StdRng` seeded with `random_seed`.
    pub fn new(config: &SimConfig) -> SimResult<Self> {
        let sampler = SeededSampler::new(config.simulation.random_seed);
        Self::with_sampler(config, sampler)
    }
}

impl<S: Sampler> Simulator<S> {
    pub fn with_sampler(config: &SimConfig, sampler: S) -> SimResult<Self> {
        config.validate()?;
        let sim = config.simulation.clone();
        if sim.simulation_window < sim.quantum() {
            tracing::warn!(
                "Simulation window {} is shorter than one quantum ({}); no process can finish",
                sim.simulation_window,
                sim.quantum()
            );
        }

        Ok(Self {
            branches: BranchTable::from(&config.lifecycle),
            window: VirtualTime::new(sim.simulation_window)?,
            queue: SimEventQueue::new(),
            memory: ResourcePool::memory(sim.memory_capacity),
            processor: ResourcePool::processor(),
            processes: BTreeMap::new(),
            generator: ProcessGenerator::new(sim.interarrival_interval, sim.max_processes),
            ids: ProcessIdGen::new(),
            sampler,
            log: EventLog::new(),
            stats: StatisticsCollector::new(),
            events_processed: 0,
            config: sim,
        })
    }

    /// Schedule the generator's first arrival, one exponential gap from now.
    pub fn start_generator(&mut self) -> SimResult<()> {
        if let Some(delay) = self.generator.next_delay(&mut self.sampler)? {
            self.queue.schedule(delay, Continuation::GenerateArrival)?;
        }
        Ok(())
    }

    /// Schedule an arrival with fixed attributes at `at`.
    pub fn inject(&mut self, at: VirtualTime, spec: ProcessSpec) -> SimResult<()> {
        self.queue.schedule_at(at, Continuation::Inject(spec))?;
        Ok(())
    }

    /// Execute the next event if it falls inside the window.
    ///
    /// Returns the executed event, or `None` when nothing is due.
    pub fn step(&mut self) -> SimResult<Option<SimEvent>> {
        let Some(event) = self.queue.pop_due(self.window)? else {
            return Ok(None);
        };
        self.events_processed += 1;
        tracing::trace!("{} dispatch {:?}", event.timestamp, event.continuation);
        self.dispatch(&event)?;
        if cfg!(debug_assertions) {
            self.audit()?;
        }
        Ok(Some(event))
    }

    /// Execute every event due by `until` (capped at the window), then
    /// discard the rest.
    ///
    /// Returns the number of events executed by this call.
    pub fn run_until(&mut self, until: VirtualTime) -> SimResult<u64> {
        let until = until.min(self.window);
        let start = self.events_processed;
        while let Some(event) = self.queue.pop_due(until)? {
            self.events_processed += 1;
            tracing::trace!("{} dispatch {:?}", event.timestamp, event.continuation);
            self.dispatch(&event)?;
            if cfg!(debug_assertions) {
                self.audit()?;
            }
        }
        if !self.queue.is_empty() {
            let dropped = self.queue.discard_until(until)?;
            tracing::debug!("Window closed at {}, {} pending events dropped", until, dropped);
        }
        Ok(self.events_processed - start)
    }

    /// Run the whole window and hand back the outputs.
    pub fn run(mut self) -> SimResult<RunOutput> {
        tracing::info!(
            "Starting run: capacity={}, per_cycle={}, cpu_speed={}, interval={}, seed={}, window={}",
            self.config.memory_capacity,
            self.config.instructions_per_cycle,
            self.config.cpu_speed,
            self.config.interarrival_interval,
            self.config.random_seed,
            self.config.simulation_window
        );
        let window = self.window;
        if let Err(e) = self.run_until(window) {
            tracing::error!("Run aborted at {}: {}", self.now(), e);
            return Err(e);
        }
        let output = self.finish();
        tracing::info!(
            "Run finished at {}: {} terminated, {} in flight, {} events",
            output.end_time,
            output.records.len(),
            output.in_flight,
            output.events_processed
        );
        Ok(output)
    }

    /// Stop here and collect the outputs; live processes count as in flight.
    pub fn finish(self) -> RunOutput {
        RunOutput {
            in_flight: self.processes.len(),
            end_time: self.queue.now(),
            events_processed: self.events_processed,
            records: self.stats.into_records(),
            log: self.log,
        }
    }

    fn dispatch(&mut self, event: &SimEvent) -> SimResult<()> {
        match &event.continuation {
            Continuation::GenerateArrival => {
                let spec = self.generator.draw_spec(&mut self.sampler);
                if let Some(delay) = self.generator.next_delay(&mut self.sampler)? {
                    self.queue.schedule(delay, Continuation::GenerateArrival)?;
                }
                self.arrive(spec)
            }
            Continuation::Inject(spec) => self.arrive(*spec),
            Continuation::MemoryGranted(pid) => self.request_processor(*pid),
            Continuation::ProcessorGranted(pid) => self.start_running(*pid),
            Continuation::QuantumElapsed(pid) => self.on_quantum_elapsed(*pid),
            Continuation::WaitElapsed(pid) => {
                self.log.emit(*pid, self.now(), LifecycleKind::WaitExit);
                self.request_processor(*pid)
            }
        }
    }

    fn arrive(&mut self, spec: ProcessSpec) -> SimResult<()> {
        let now = self.now();
        let process = self.ids.spawn(spec, now);
        let pid = process.id;
        self.log.emit(
            pid,
            now,
            LifecycleKind::Arrival {
                memory_demand: spec.memory_demand,
                instructions: spec.instructions,
            },
        );
        self.processes.insert(pid, process);

        match self.memory.acquire(pid, spec.memory_demand)? {
            Acquire::Granted => self.request_processor(pid),
            Acquire::Queued => {
                self.process_mut(pid)?.transition(ProcessState::AwaitingMemory)?;
                tracing::debug!(
                    "{} {} waits for {} memory units ({} free)",
                    now,
                    pid,
                    spec.memory_demand,
                    self.memory.available()
                );
                Ok(())
            }
        }
    }

    fn request_processor(&mut self, pid: ProcessId) -> SimResult<()> {
        self.process_mut(pid)?.transition(ProcessState::AwaitingProcessor)?;
        match self.processor.acquire(pid, 1)? {
            Acquire::Granted => self.start_running(pid),
            Acquire::Queued => Ok(()),
        }
    }

    fn start_running(&mut self, pid: ProcessId) -> SimResult<()> {
        let now = self.now();
        let process = self.process_mut(pid)?;
        process.transition(ProcessState::Running)?;
        let first_run = !process.admitted;
        process.admitted = true;
        let remaining = process.instructions_remaining;

        if first_run {
            let memory_available = self.memory.available();
            self.log.emit(pid, now, LifecycleKind::Admission { memory_available });
        }
        self.log.emit(
            pid,
            now,
            LifecycleKind::RunStart {
                instructions_remaining: remaining,
            },
        );
        self.queue
            .schedule(self.config.quantum(), Continuation::QuantumElapsed(pid))?;
        Ok(())
    }

    fn on_quantum_elapsed(&mut self, pid: ProcessId) -> SimResult<()> {
        let per_cycle = self.config.instructions_per_cycle;
        let outcome = complete_quantum(self.process_mut(pid)?, per_cycle);
        if outcome == QuantumOutcome::Finished {
            return self.terminate(pid);
        }

        let draw = self.sampler.branch_draw(self.branches.total());
        match self.branches.classify(draw) {
            Branch::Wait => {
                let wait_duration = self.sampler.wait_duration();
                self.process_mut(pid)?.transition(ProcessState::Waiting)?;
                self.log
                    .emit(pid, self.now(), LifecycleKind::WaitEnter { wait_duration });
                self.release(PoolKind::Processor, pid, 1)?;
                self.queue
                    .schedule(wait_duration, Continuation::WaitElapsed(pid))?;
            }
            Branch::Continue => {
                self.process_mut(pid)?.transition(ProcessState::Running)?;
                self.queue
                    .schedule(self.config.quantum(), Continuation::QuantumElapsed(pid))?;
            }
        }
        Ok(())
    }

    fn terminate(&mut self, pid: ProcessId) -> SimResult<()> {
        let now = self.now();
        let memory_demand = self.process(pid)?.memory_demand;
        self.release(PoolKind::Processor, pid, 1)?;
        self.release(PoolKind::Memory, pid, memory_demand)?;

        let mut process = self
            .processes
            .remove(&pid)
            .ok_or(SimError::UnknownProcess(pid))?;
        process.transition(ProcessState::Terminated)?;

        let record = RunRecord {
            process_id: pid,
            arrival_time: process.arrival_time,
            termination_time: now,
        };
        self.stats.record(record);
        self.log.emit(
            pid,
            now,
            LifecycleKind::Termination {
                arrival_time: process.arrival_time,
                latency: record.latency(),
            },
        );
        Ok(())
    }

    /// Return units to a pool and schedule a grant event, at the current
    /// time, for every waiter the release satisfies.
    fn release(&mut self, kind: PoolKind, pid: ProcessId, amount: u32) -> SimResult<()> {
        let pool = match kind {
            PoolKind::Memory => &mut self.memory,
            PoolKind::Processor => &mut self.processor,
        };
        for granted in pool.release(pid, amount)? {
            tracing::debug!("{} {} granted {} by release of {}", self.queue.now(), granted, kind, pid);
            let continuation = match kind {
                PoolKind::Memory => Continuation::MemoryGranted(granted),
                PoolKind::Processor => Continuation::ProcessorGranted(granted),
            };
            self.queue.schedule(0.0, continuation)?;
        }
        Ok(())
    }

    /// Cross-check pools against the process table.
    ///
    /// Holds after every event: each pool's held plus free units equal its
    /// capacity, at most one process holds the processor, every holder is
    /// live, and every process past memory admission holds exactly its
    /// demand.
    pub fn audit(&self) -> SimResult<()> {
        for pool in [&self.memory, &self.processor] {
            if !pool.is_balanced() {
                return Err(violation(format!("{} pool accounting is unbalanced", pool.kind())));
            }
            for (pid, _) in pool.holders() {
                if !self.processes.contains_key(&pid) {
                    return Err(violation(format!("{} holds {} but is not live", pid, pool.kind())));
                }
            }
        }

        let cpu_holders: Vec<ProcessId> = self.processor.holders().map(|(p, _)| p).collect();
        if cpu_holders.len() > 1 {
            return Err(violation(format!("processor held by {:?}", cpu_holders)));
        }
        if let Some(&holder) = cpu_holders.first() {
            let state = self.processes[&holder].state();
            if !matches!(state, ProcessState::Running | ProcessState::AwaitingProcessor) {
                return Err(violation(format!("{} holds the processor while {:?}", holder, state)));
            }
        }

        let mut held_by_live = 0u64;
        for process in self.processes.values() {
            let held = self.memory.holds(process.id);
            match (process.state().holds_memory(), held) {
                (true, Some(units)) if units == process.memory_demand => {}
                (true, other) => {
                    return Err(violation(format!(
                        "{} in {:?} holds {:?} memory units, expected {}",
                        process.id,
                        process.state(),
                        other,
                        process.memory_demand
                    )));
                }
                // Granted by a release whose grant event has not run yet.
                (false, Some(units)) if process.state() == ProcessState::AwaitingMemory => {
                    if units != process.memory_demand {
                        return Err(violation(format!(
                            "{} was granted {} memory units, expected {}",
                            process.id, units, process.memory_demand
                        )));
                    }
                }
                (false, Some(_)) => {
                    return Err(violation(format!(
                        "{} in {:?} holds memory",
                        process.id,
                        process.state()
                    )));
                }
                (false, None) => {}
            }
            held_by_live += u64::from(held.unwrap_or(0));
        }
        if held_by_live + u64::from(self.memory.available()) != u64::from(self.memory.capacity()) {
            return Err(violation(format!(
                "memory available {} + held {} != capacity {}",
                self.memory.available(),
                held_by_live,
                self.memory.capacity()
            )));
        }
        Ok(())
    }

    pub fn now(&self) -> VirtualTime {
        self.queue.now()
    }

    pub fn window(&self) -> VirtualTime {
        self.window
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn memory(&self) -> &ResourcePool {
        &self.memory
    }

    pub fn processor(&self) -> &ResourcePool {
        &self.processor
    }

    pub fn process(&self, pid: ProcessId) -> SimResult<&Process> {
        self.processes.get(&pid).ok_or(SimError::UnknownProcess(pid))
    }

    fn process_mut(&mut self, pid: ProcessId) -> SimResult<&mut Process> {
        self.processes
            .get_mut(&pid)
            .ok_or(SimError::UnknownProcess(pid))
    }

    /// Live (not yet terminated) processes in id order.
    pub fn live_processes(&self) -> impl Iterator<Item = &Process> {
        self.processes.values()
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn stats(&self) -> &StatisticsCollector {
        &self.stats
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }
}

fn violation(msg: String) -> SimError {
    SimError::InvariantViolation(msg)
}

/// Build a seeded simulator for `config`, start its generator and run the
/// full window.
pub fn run_simulation(config: &SimConfig) -> SimResult<RunOutput> {
    let mut sim = Simulator::new(config)?;
    sim.start_generator()?;
    sim.run()
}
