use std::{cmp::Ordering, collections::BTreeMap, fmt::Display, str::FromStr};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{label::RunLabel, loader::Schema};

/// One of the two compared operation categories of a test kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    A,
    B,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::A, Side::B];

    pub fn prefix(&self) -> &'static str {
        match self {
            Side::A => "a",
            Side::B => "b",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Statistic {
    #[serde(rename = "mean")]
    Mean,
    #[serde(rename = "50")]
    P50,
    #[serde(rename = "95")]
    P95,
    #[serde(rename = "99")]
    P99,
}

impl Statistic {
    /// Column order inside a block of statistics.
    pub const ALL: [Statistic; 4] = [
        Statistic::Mean,
        Statistic::P50,
        Statistic::P95,
        Statistic::P99,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            Statistic::Mean => "mean",
            Statistic::P50 => "50",
            Statistic::P95 => "95",
            Statistic::P99 => "99",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Statistic::Mean => "Mean",
            Statistic::P50 => "50th",
            Statistic::P95 => "95th",
            Statistic::P99 => "99th",
        }
    }
}

/// Names one of the eight series of a dataset, written `a_mean`, `b_95`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StatKey {
    pub side: Side,
    pub stat: Statistic,
}

impl StatKey {
    pub const fn new(side: Side, stat: Statistic) -> Self {
        StatKey { side, stat }
    }

    pub fn all() -> impl Iterator<Item = StatKey> {
        Side::ALL
            .into_iter()
            .cartesian_product(Statistic::ALL)
            .map(|(side, stat)| StatKey { side, stat })
    }
}

impl Display for StatKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.side.prefix(), self.stat.suffix())
    }
}

impl FromStr for StatKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatKey::all()
            .find(|key| key.to_string() == s)
            .ok_or_else(|| format!("Unknown series key {s}, expected e.g. a_mean or b_99"))
    }
}

impl TryFrom<String> for StatKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StatKey> for String {
    fn from(value: StatKey) -> Self {
        value.to_string()
    }
}

/// Load factor with a total order so it can key an ordered map.
#[derive(Debug, Clone, Copy)]
pub struct LoadFactor(pub f64);

impl PartialEq for LoadFactor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LoadFactor {}

impl PartialOrd for LoadFactor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LoadFactor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SampleKey {
    pub load_factor: LoadFactor,
    pub meta_bits: Option<u32>,
}

impl SampleKey {
    pub fn new(load_factor: f64, meta_bits: Option<u32>) -> Self {
        SampleKey {
            load_factor: LoadFactor(load_factor),
            meta_bits,
        }
    }
}

/// One line of a chart: every sample sharing a meta-bits value.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub meta_bits: Option<u32>,
    /// `(load_factor, value)`, ascending by load factor.
    pub points: Vec<(f64, f64)>,
}

impl Line {
    pub fn label(&self, fallback: &str) -> String {
        match self.meta_bits {
            Some(bits) => format!("{bits} meta bits"),
            None => fallback.to_owned(),
        }
    }
}

/// Pivot of `(load_factor, meta_bits) -> value`. Last write wins.
#[derive(Debug, Clone, Default)]
pub struct Series {
    samples: BTreeMap<SampleKey, f64>,
}

impl Series {
    /// Returns the overwritten value, if the key was already present.
    pub fn insert(&mut self, load_factor: f64, meta_bits: Option<u32>, value: f64) -> Option<f64> {
        self.samples
            .insert(SampleKey::new(load_factor, meta_bits), value)
    }

    pub fn get(&self, load_factor: f64, meta_bits: Option<u32>) -> Option<f64> {
        self.samples
            .get(&SampleKey::new(load_factor, meta_bits))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SampleKey, &f64)> {
        self.samples.iter()
    }

    /// Distinct meta-bits values, ascending.
    pub fn meta_bits(&self) -> Vec<Option<u32>> {
        self.samples
            .keys()
            .map(|k| k.meta_bits)
            .sorted()
            .dedup()
            .collect()
    }

    pub fn load_factor_range(&self) -> Option<(f64, f64)> {
        let first = self.samples.keys().next()?;
        let last = self.samples.keys().next_back()?;
        Some((first.load_factor.0, last.load_factor.0))
    }

    /// Groups samples by meta bits, one [`Line`] per value in ascending
    /// order, each sorted by load factor.
    pub fn lines(&self) -> Vec<Line> {
        self.samples
            .iter()
            .sorted_by_key(|(k, _)| (k.meta_bits, k.load_factor))
            .chunk_by(|(k, _)| k.meta_bits)
            .into_iter()
            .map(|(meta_bits, group)| Line {
                meta_bits,
                points: group.map(|(k, v)| (k.load_factor.0, *v)).collect(),
            })
            .collect()
    }
}

/// All series read from one benchmark file.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub label: RunLabel,
    pub schema: Schema,
    series: BTreeMap<StatKey, Series>,
}

impl Dataset {
    pub fn new(label: RunLabel, schema: Schema) -> Self {
        Dataset {
            label,
            schema,
            series: StatKey::all().map(|k| (k, Series::default())).collect(),
        }
    }

    pub fn series(&self, key: StatKey) -> &Series {
        &self.series[&key]
    }

    pub fn series_mut(&mut self, key: StatKey) -> &mut Series {
        self.series.entry(key).or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.series.values().all(Series::is_empty)
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            test_kind: self.label.test_kind.clone(),
            map_kind: self.label.map_kind.clone(),
            schema: self.schema,
            series: self
                .series
                .iter()
                .map(|(key, series)| {
                    let range = series.load_factor_range();
                    (
                        key.to_string(),
                        SeriesSummary {
                            samples: series.len(),
                            meta_bits: series.meta_bits(),
                            load_factor_min: range.map(|r| r.0),
                            load_factor_max: range.map(|r| r.1),
                        },
                    )
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub test_kind: String,
    pub map_kind: String,
    pub schema: Schema,
    pub series: BTreeMap<String, SeriesSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesSummary {
    pub samples: usize,
    pub meta_bits: Vec<Option<u32>>,
    pub load_factor_min: Option<f64>,
    pub load_factor_max: Option<f64>,
}
