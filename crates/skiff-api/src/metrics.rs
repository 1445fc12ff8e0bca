//! Time-series metrics reported for an app.
//!
//! [`Metrics`] maps a metric name (e.g. `container_memory_usage_bytes`) to a
//! [`Series`]; a series maps a composite resource key
//! (`<user>-<project>_<service>_<app>.<instance-or-mount>`) to chronologically
//! ordered [`DataPoint`]s. One metric may hold several keys, one per volume
//! mount or network interface.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Sample time.
    #[serde(rename = "x")]
    pub timestamp: DateTime<Utc>,
    /// Sample value.
    #[serde(rename = "y")]
    pub value: f64,
}

impl DataPoint {
    /// Creates a data point.
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Samples for one resource key, oldest first.
pub type DataPoints = Vec<DataPoint>;

/// Samples of one metric, keyed by resource key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Series(BTreeMap<String, DataPoints>);

impl Series {
    /// Creates an empty series.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a point under `key`, keeping the points ordered by time.
    pub fn push(&mut self, key: impl Into<String>, point: DataPoint) {
        let points = self.0.entry(key.into()).or_default();
        let at = points.partition_point(|p| p.timestamp <= point.timestamp);
        points.insert(at, point);
    }

    /// Returns the points recorded under `key`.
    #[must_use]
    pub fn points(&self, key: &str) -> Option<&[DataPoint]> {
        self.0.get(key).map(Vec::as_slice)
    }

    /// Iterates over resource keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterates over `(key, points)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[DataPoint])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of resource keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the series has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// All metrics for an app, keyed by metric name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metrics(BTreeMap<String, Series>);

impl Metrics {
    /// Creates an empty metrics set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a sample for `metric` under `key`.
    pub fn record(&mut self, metric: impl Into<String>, key: impl Into<String>, point: DataPoint) {
        self.0.entry(metric.into()).or_default().push(key, point);
    }

    /// Iterates over metric names in lexical order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns the series of one metric.
    #[must_use]
    pub fn series(&self, metric: &str) -> Option<&Series> {
        self.0.get(metric)
    }

    /// Returns the most recent sample of `metric` under `key`.
    #[must_use]
    pub fn latest(&self, metric: &str, key: &str) -> Option<DataPoint> {
        self.series(metric)?.points(key)?.last().copied()
    }

    /// Iterates over `(name, series)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Series)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of metrics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no metrics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 11, 4, 14, minute, 19).unwrap()
    }

    #[test]
    fn decodes_wire_shape() {
        let metrics: Metrics = serde_json::from_value(json!({
            "container_memory_usage_bytes": {
                "user-letschat_frontend_node.59f7edf4": [
                    {"x": "2015-11-04T14:17:19Z", "y": 134217728.0}
                ]
            },
            "container_volume_usage_percentage": {
                "user-letschat_frontend_node./var/www": [{"x": "2015-11-04T14:17:19Z", "y": 12.2}],
                "user-letschat_frontend_node./var/test": [{"x": "2015-11-04T14:17:19Z", "y": 12.9}]
            }
        }))
        .unwrap();

        assert_eq!(metrics.len(), 2);
        let volumes = metrics.series("container_volume_usage_percentage").unwrap();
        assert_eq!(volumes.len(), 2);
        let point = metrics
            .latest("container_memory_usage_bytes", "user-letschat_frontend_node.59f7edf4")
            .unwrap();
        assert!((point.value - 134_217_728.0).abs() < f64::EPSILON);
        assert_eq!(point.timestamp, at(17));
    }

    #[test]
    fn push_keeps_chronological_order() {
        let mut series = Series::new();
        series.push("k", DataPoint::new(at(20), 3.0));
        series.push("k", DataPoint::new(at(10), 1.0));
        series.push("k", DataPoint::new(at(15), 2.0));

        let values: Vec<f64> = series.points("k").unwrap().iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn latest_is_newest_point() {
        let mut metrics = Metrics::new();
        metrics.record("cpu", "k", DataPoint::new(at(30), 9.0));
        metrics.record("cpu", "k", DataPoint::new(at(5), 1.0));

        assert_eq!(metrics.latest("cpu", "k").map(|p| p.timestamp), Some(at(30)));
        assert!(metrics.latest("cpu", "other").is_none());
        assert!(metrics.latest("mem", "k").is_none());
    }

    #[test]
    fn names_are_sorted() {
        let mut metrics = Metrics::new();
        metrics.record("b", "k", DataPoint::new(at(1), 0.0));
        metrics.record("a", "k", DataPoint::new(at(1), 0.0));
        assert_eq!(metrics.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
