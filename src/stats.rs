//! Run records and completion-latency statistics.
//!
//! Latency is `termination_time - arrival_time`. The classic lab script this
//! model comes from subtracted the arrival time from itself, so every mean
//! and deviation it printed was zero; numbers produced here are the real
//! turnaround times and will not match that output.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::SimResult;
use crate::simulator::process::ProcessId;
use crate::simulator::time::VirtualTime;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub process_id: ProcessId,
    pub arrival_time: VirtualTime,
    pub termination_time: VirtualTime,
}

impl RunRecord {
    pub fn latency(&self) -> f64 {
        self.termination_time.as_f64() - self.arrival_time.as_f64()
    }
}

/// Mean and population standard deviation of completion latency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
}

impl LatencySummary {
    pub fn from_latencies(latencies: &[f64]) -> Self {
        let count = latencies.len();
        if count == 0 {
            return Self {
                count,
                mean: 0.0,
                std_dev: 0.0,
            };
        }
        let n = count as f64;
        let mean = latencies.iter().sum::<f64>() / n;
        let variance = latencies.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        Self {
            count,
            mean,
            std_dev: variance.sqrt(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatisticsCollector {
    records: Vec<RunRecord>,
}

impl StatisticsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: RunRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<RunRecord> {
        self.records
    }

    pub fn summary(&self) -> LatencySummary {
        summarize(&self.records)
    }
}

pub fn summarize(records: &[RunRecord]) -> LatencySummary {
    let latencies: Vec<f64> = records.iter().map(RunRecord::latency).collect();
    LatencySummary::from_latencies(&latencies)
}

#[derive(Serialize)]
struct CsvRow {
    process_id: u64,
    arrival_time: f64,
    termination_time: f64,
    latency: f64,
}

/// Write records as CSV with a header row.
pub fn write_records_csv<W: Write>(records: &[RunRecord], w: W) -> SimResult<()> {
    let mut wtr = csv::Writer::from_writer(w);
    for record in records {
        wtr.serialize(CsvRow {
            process_id: record.process_id.raw(),
            arrival_time: record.arrival_time.as_f64(),
            termination_time: record.termination_time.as_f64(),
            latency: record.latency(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, arrival: f64, termination: f64) -> RunRecord {
        RunRecord {
            process_id: ProcessId::new(id),
            arrival_time: VirtualTime::new(arrival).unwrap(),
            termination_time: VirtualTime::new(termination).unwrap(),
        }
    }

    #[test]
    fn test_latency() {
        assert_eq!(record(1, 2.5, 6.0).latency(), 3.5);
    }

    #[test]
    fn test_summary_population_std_dev() {
        let mut stats = StatisticsCollector::new();
        stats.record(record(1, 0.0, 2.0));
        stats.record(record(2, 0.0, 4.0));
        stats.record(record(3, 0.0, 4.0));
        stats.record(record(4, 0.0, 4.0));
        stats.record(record(5, 0.0, 5.0));
        stats.record(record(6, 0.0, 5.0));
        stats.record(record(7, 0.0, 7.0));
        stats.record(record(8, 0.0, 9.0));
        let summary = stats.summary();
        assert_eq!(summary.count, 8);
        assert_eq!(summary.mean, 5.0);
        assert_eq!(summary.std_dev, 2.0);
    }

    #[test]
    fn test_empty_summary() {
        let summary = StatisticsCollector::new().summary();
        assert_eq!(summary, LatencySummary { count: 0, mean: 0.0, std_dev: 0.0 });
    }

    #[test]
    fn test_csv_output() {
        let records = vec![record(1, 0.5, 2.0), record(3, 1.0, 1.5)];
        let mut buf = Vec::new();
        write_records_csv(&records, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "process_id,arrival_time,termination_time,latency");
        assert_eq!(lines[1], "1,0.5,2.0,1.5");
        assert_eq!(lines[2], "3,1.0,1.5,0.5");
    }
}
