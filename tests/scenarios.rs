use std::collections::{BTreeMap, VecDeque};

use procsim::simulator::resource::{Acquire, ResourcePool};
use procsim::{
    LifecycleKind, ProcessId, ProcessSpec, ProcessState, Sampler, SimConfig, SimError, SimResult,
    Simulator, VirtualTime,
};

/// Replays fixed draws; once a script runs out it continues on the
/// processor and waits one time unit.
#[derive(Default)]
struct ScriptedSampler {
    branches: VecDeque<u32>,
    waits: VecDeque<f64>,
}

impl Sampler for ScriptedSampler {
    fn interarrival(&mut self, _mean: f64) -> SimResult<f64> {
        Ok(1.0)
    }
    fn memory_demand(&mut self) -> u32 {
        1
    }
    fn instructions(&mut self) -> u32 {
        1
    }
    fn branch_draw(&mut self, total: u32) -> u32 {
        self.branches.pop_front().unwrap_or(total)
    }
    fn wait_duration(&mut self) -> f64 {
        self.waits.pop_front().unwrap_or(1.0)
    }
}

fn config(memory_capacity: u32, instructions_per_cycle: u32) -> SimConfig {
    let mut config = SimConfig::default();
    config.simulation.memory_capacity = memory_capacity;
    config.simulation.instructions_per_cycle = instructions_per_cycle;
    config
}

fn t(units: f64) -> VirtualTime {
    VirtualTime::new(units).unwrap()
}

fn spec(memory_demand: u32, instructions: u32) -> ProcessSpec {
    ProcessSpec { memory_demand, instructions }
}

fn first_time(
    log: &procsim::EventLog,
    pid: ProcessId,
    pred: impl Fn(&LifecycleKind) -> bool,
) -> Option<VirtualTime> {
    log.for_process(pid).find(|e| pred(&e.kind)).map(|e| e.time)
}

#[test]
fn test_single_quantum_process_releases_memory() {
    let mut sim = Simulator::with_sampler(&config(10, 3), ScriptedSampler::default()).unwrap();
    sim.inject(t(4.0), spec(5, 3)).unwrap();

    sim.step().unwrap();
    assert_eq!(sim.memory().available(), 5);
    assert_eq!(sim.processor().in_use(), 1);

    let output = sim.run().unwrap();
    assert_eq!(output.records.len(), 1);
    let record = output.records[0];
    assert_eq!(record.arrival_time, t(4.0));
    assert_eq!(record.termination_time, t(5.0));
    assert_eq!(record.latency(), 1.0);
}

#[test]
fn test_second_process_blocks_until_memory_released() {
    let mut sim = Simulator::with_sampler(&config(5, 3), ScriptedSampler::default()).unwrap();
    sim.inject(t(0.0), spec(5, 3)).unwrap();
    sim.inject(t(0.0), spec(5, 3)).unwrap();

    let p1 = ProcessId::new(1);
    let p2 = ProcessId::new(2);
    sim.step().unwrap();
    sim.step().unwrap();
    assert_eq!(sim.process(p1).unwrap().state(), ProcessState::Running);
    assert_eq!(sim.process(p2).unwrap().state(), ProcessState::AwaitingMemory);
    assert_eq!(sim.memory().queue_len(), 1);

    let output = sim.run().unwrap();
    let is_admission = |k: &LifecycleKind| matches!(k, LifecycleKind::Admission { .. });
    assert_eq!(first_time(&output.log, p1, is_admission), Some(t(0.0)));
    assert_eq!(first_time(&output.log, p2, is_admission), Some(t(1.0)));
    let terminations: Vec<_> = output.records.iter().map(|r| (r.process_id, r.termination_time)).collect();
    assert_eq!(terminations, vec![(p1, t(1.0)), (p2, t(2.0))]);
}

#[test]
fn test_wait_excursion_delays_completion() {
    let sampler = ScriptedSampler {
        // Continue after quantum one, wait after quantum two.
        branches: VecDeque::from(vec![21, 1]),
        waits: VecDeque::from(vec![4.0]),
    };
    let mut sim = Simulator::with_sampler(&config(10, 3), sampler).unwrap();
    sim.inject(t(0.0), spec(2, 9)).unwrap();
    let output = sim.run().unwrap();

    let p1 = ProcessId::new(1);
    let kinds: Vec<_> = output.log.for_process(p1).map(|e| (e.time, e.kind.clone())).collect();
    assert_eq!(
        kinds,
        vec![
            (t(0.0), LifecycleKind::Arrival { memory_demand: 2, instructions: 9 }),
            (t(0.0), LifecycleKind::Admission { memory_available: 8 }),
            (t(0.0), LifecycleKind::RunStart { instructions_remaining: 9 }),
            (t(2.0), LifecycleKind::WaitEnter { wait_duration: 4.0 }),
            (t(6.0), LifecycleKind::WaitExit),
            (t(6.0), LifecycleKind::RunStart { instructions_remaining: 3 }),
            (t(7.0), LifecycleKind::Termination { arrival_time: t(0.0), latency: 7.0 }),
        ]
    );
}

#[test]
fn test_memory_held_while_waiting() {
    let sampler = ScriptedSampler {
        branches: VecDeque::from(vec![1]),
        waits: VecDeque::from(vec![3.0]),
    };
    let mut sim = Simulator::with_sampler(&config(10, 1), sampler).unwrap();
    sim.inject(t(0.0), spec(6, 2)).unwrap();
    sim.run_until(t(2.0)).unwrap();

    let p1 = sim.process(ProcessId::new(1)).unwrap();
    assert_eq!(p1.state(), ProcessState::Waiting);
    assert_eq!(sim.memory().holds(p1.id), Some(6));
    assert_eq!(sim.processor().in_use(), 0);
}

#[test]
fn test_head_of_line_blocks_smaller_requests() {
    let mut sim = Simulator::with_sampler(&config(10, 1), ScriptedSampler::default()).unwrap();
    sim.inject(t(0.0), spec(8, 3)).unwrap();
    sim.inject(t(0.5), spec(5, 1)).unwrap();
    sim.inject(t(0.6), spec(1, 1)).unwrap();
    sim.run_until(t(0.6)).unwrap();

    // P3 fits in the 2 free units but queues behind P2.
    assert_eq!(sim.memory().available(), 2);
    assert_eq!(sim.process(ProcessId::new(3)).unwrap().state(), ProcessState::AwaitingMemory);
    assert_eq!(sim.memory().queue_len(), 2);
}

#[test]
fn test_invariants_hold_under_contention() {
    let mut config = SimConfig::default();
    config.simulation.interarrival_interval = 1.0;
    config.simulation.memory_capacity = 20;
    config.simulation.max_processes = Some(150);
    config.simulation.simulation_window = 200.0;

    let mut sim = Simulator::new(&config).unwrap();
    sim.start_generator().unwrap();

    let mut last_time = VirtualTime::ZERO;
    let mut remaining: BTreeMap<ProcessId, i64> = BTreeMap::new();
    while let Some(event) = sim.step().unwrap() {
        assert!(event.timestamp >= last_time, "event times went backwards");
        last_time = event.timestamp;

        sim.audit().unwrap();
        assert!(sim.processor().in_use() <= 1);
        let held: u32 = sim.memory().holders().map(|(_, units)| units).sum();
        assert_eq!(held + sim.memory().available(), 20);

        for process in sim.live_processes() {
            let previous = remaining.insert(process.id, process.instructions_remaining);
            if let Some(previous) = previous {
                assert!(process.instructions_remaining <= previous);
            }
        }
    }
    assert!(sim.events_processed() > 0);
    assert!(!sim.stats().records().is_empty());
}

#[test]
fn test_remaining_instructions_bounded_at_termination() {
    let mut config = SimConfig::default();
    config.simulation.max_processes = Some(20);
    config.simulation.simulation_window = 1000.0;
    let output = procsim::run_simulation(&config).unwrap();

    for record in &output.records {
        let run_starts: Vec<i64> = output
            .log
            .for_process(record.process_id)
            .filter_map(|e| match e.kind {
                LifecycleKind::RunStart { instructions_remaining } => Some(instructions_remaining),
                _ => None,
            })
            .collect();
        assert!(run_starts.windows(2).all(|w| w[1] <= w[0]));
        assert!(run_starts.iter().all(|&r| r > 0));
    }
    assert_eq!(output.records.len() + output.in_flight, 20);
}

#[test]
fn test_double_release_rejected() {
    let mut pool = ResourcePool::memory(10);
    let pid = ProcessId::new(1);
    assert_eq!(pool.acquire(pid, 5).unwrap(), Acquire::Granted);
    pool.release(pid, 5).unwrap();
    assert!(matches!(pool.release(pid, 5), Err(SimError::NotHeld { .. })));
    assert_eq!(pool.available(), 10);
}

#[test]
fn test_oversized_demand_aborts_run() {
    let mut sim = Simulator::with_sampler(&config(4, 3), ScriptedSampler::default()).unwrap();
    sim.inject(t(1.0), spec(2, 1)).unwrap();
    sim.inject(t(2.0), spec(5, 1)).unwrap();
    let err = sim.run().unwrap_err();
    assert!(matches!(
        err,
        SimError::DemandExceedsCapacity { demand: 5, capacity: 4, .. }
    ));
}

#[test]
fn test_processes_in_flight_at_window_close() {
    let mut config = config(10, 1);
    config.simulation.simulation_window = 3.0;
    let mut sim = Simulator::with_sampler(&config, ScriptedSampler::default()).unwrap();
    sim.inject(t(0.0), spec(3, 10)).unwrap();
    sim.inject(t(0.0), spec(3, 1)).unwrap();
    let output = sim.run().unwrap();

    assert!(output.records.is_empty());
    assert_eq!(output.in_flight, 2);
    assert_eq!(output.end_time, t(3.0));
}
