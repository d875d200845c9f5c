//! Stats sample parsing and per-container aggregation

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::BufRead;
use tracing::debug;

use shared::{parse_byte_size, parse_percentage};

/// Prefix of marker entries interleaved into the raw sample stream
pub const COMMON_STATS_PREFIX: &str = ">>>";

/// Characters of the clear-screen escape the sampler emits before every batch
const CLEAR_SCREEN_CHARS: [char; 5] = ['\x1b', '[', '2', 'J', 'H'];

const SAMPLE_FIELDS: [&str; 5] = ["name", "cpu", "ram", "net", "block"];

/// One parsed sample of a container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSample {
    pub cpu: f64,
    pub ram: u64,
    pub net: u64,
    pub block: u64,
}

/// Entry of a per-container stats file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatsEntry {
    Sample(StatsSample),
    Marker { test: String },
}

/// Running min/max/sum of one metric
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricAggregate {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl MetricAggregate {
    pub fn record(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    pub fn avg(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Serialized `{min, max, avg}` triple
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
}

impl From<&MetricAggregate> for MetricSummary {
    fn from(aggregate: &MetricAggregate) -> Self {
        Self {
            min: aggregate.min(),
            max: aggregate.max(),
            avg: aggregate.avg(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerStats {
    pub cpu: MetricAggregate,
    pub ram: MetricAggregate,
    pub net_io: MetricAggregate,
    pub block_io: MetricAggregate,
}

impl ContainerStats {
    pub fn update(&mut self, sample: &StatsSample) {
        self.cpu.record(sample.cpu);
        self.ram.record(sample.ram as f64);
        self.net_io.record(sample.net as f64);
        self.block_io.record(sample.block as f64);
    }

    pub fn summary(&self) -> BTreeMap<&'static str, MetricSummary> {
        BTreeMap::from([
            ("cpu", MetricSummary::from(&self.cpu)),
            ("ram", MetricSummary::from(&self.ram)),
            ("net_io", MetricSummary::from(&self.net_io)),
            ("block_io", MetricSummary::from(&self.block_io)),
        ])
    }
}

pub type ClusterStatsSummary = BTreeMap<String, ContainerStats>;

/// Everything derived from one raw sample stream
#[derive(Debug, Clone, Default)]
pub struct StatsReport {
    pub summary: ClusterStatsSummary,
    pub per_container: BTreeMap<String, Vec<StatsEntry>>,
}

impl StatsReport {
    /// Parse a whole raw stream, skipping every line that is not a valid sample
    pub fn from_reader<R: BufRead>(reader: R) -> std::io::Result<Self> {
        let mut report = StatsReport::default();
        let mut common: Vec<StatsEntry> = Vec::new();

        for line in reader.split(b'\n') {
            let line = line?;
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_start_matches(CLEAR_SCREEN_CHARS);

            if let Some(marker) = line.strip_prefix(COMMON_STATS_PREFIX) {
                let entry = StatsEntry::Marker {
                    test: marker.trim().to_string(),
                };
                for entries in report.per_container.values_mut() {
                    entries.push(entry.clone());
                }
                common.push(entry);
                continue;
            }

            let Some((name, sample)) = parse_sample(line) else {
                continue;
            };

            report.summary.entry(name.clone()).or_default().update(&sample);
            report
                .per_container
                .entry(name)
                .or_insert_with(|| common.clone())
                .push(StatsEntry::Sample(sample));
        }

        Ok(report)
    }

    /// Summary document keyed by container name
    pub fn summary_json(&self) -> serde_json::Result<serde_json::Value> {
        let summary: BTreeMap<&str, BTreeMap<&'static str, MetricSummary>> = self
            .summary
            .iter()
            .map(|(name, stats)| (name.as_str(), stats.summary()))
            .collect();
        serde_json::to_value(summary)
    }
}

/// `--` alone or as one side of a `usage / limit` pair
fn is_placeholder(value: &str) -> bool {
    value.split('/').any(|part| part.trim() == "--")
}

/// Parse one sample line of the `docker stats` JSON format
///
/// Lines with missing or extra fields, non string values or `--`
/// placeholders yield `None`.
pub fn parse_sample(line: &str) -> Option<(String, StatsSample)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let fields: serde_json::Map<String, serde_json::Value> = match serde_json::from_str(line) {
        Ok(fields) => fields,
        Err(_) => {
            debug!("Failed parsing stats line: {:?}", line);
            return None;
        }
    };

    if fields.len() != SAMPLE_FIELDS.len() {
        return None;
    }

    let mut values = Vec::with_capacity(SAMPLE_FIELDS.len());
    for key in SAMPLE_FIELDS {
        let value = fields.get(key)?.as_str()?;
        if is_placeholder(value) {
            return None;
        }
        values.push(value);
    }

    let sample = StatsSample {
        cpu: parse_percentage(values[1])?,
        ram: parse_byte_size(values[2]).ok()?,
        net: parse_byte_size(values[3]).ok()?,
        block: parse_byte_size(values[4]).ok()?,
    };
    Some((values[0].to_string(), sample))
}
