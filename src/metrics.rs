//! Measurement points and common labels derived from a [`Platform`].
//!
//! Both derivations are pure: the same platform (and host identity) always
//! yields the same output. [`render_prometheus`] serializes the points into
//! the Prometheus text format with the labels attached as constant labels.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::host::HostIdentity;
use crate::platform::Platform;

pub const LABEL_SOCKETS: &str = "sockets";
pub const LABEL_CORES: &str = "cores";
pub const LABEL_CPUS: &str = "cpus";
pub const LABEL_HOST: &str = "host";
pub const LABEL_VERSION: &str = "version";
pub const LABEL_CPU_MODEL: &str = "cpu_model";

/// Label carrying the logical processor id on per-CPU points.
pub const LABEL_CPU: &str = "cpu";

/// Prefix applied to metric names by [`render_prometheus`].
pub const PROMETHEUS_PREFIX: &str = "platform";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum MetricName {
    #[serde(rename = "memory_usage")]
    MemUsage,
    #[serde(rename = "cpu_usage_per_cpu")]
    CpuUsagePerCpu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Gauge,
    Counter,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::MemUsage => "memory_usage",
            MetricName::CpuUsagePerCpu => "cpu_usage_per_cpu",
        }
    }

    pub fn metric_type(&self) -> MetricType {
        match self {
            MetricName::MemUsage => MetricType::Gauge,
            MetricName::CpuUsagePerCpu => MetricType::Counter,
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            MetricName::MemUsage => {
                "Total memory used by platform in bytes based on /proc/meminfo \
                 (MemTotal - MemFree - Buffers - Cached)"
            }
            MetricName::CpuUsagePerCpu => {
                "Logical CPU busy time based on /proc/stat \
                 (user + nice + system + irq + softirq + steal), USER_HZ ticks"
            }
        }
    }
}

/// A named, timestamped observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub name: MetricName,
    pub value: f64,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub help: &'static str,
    pub labels: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl Metric {
    fn new(name: MetricName, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            name,
            value,
            metric_type: name.metric_type(),
            help: name.help(),
            labels: BTreeMap::new(),
            timestamp,
        }
    }

    fn with_label(mut self, key: &str, value: impl Into<String>) -> Self {
        self.labels.insert(key.to_string(), value.into());
        self
    }
}

/// Builds one memory point plus one busy-time point per logical CPU.
pub fn create_metrics(platform: &Platform) -> Vec<Metric> {
    let mut metrics = Vec::with_capacity(platform.cpus_usage.len() + 1);

    metrics.push(Metric::new(
        MetricName::MemUsage,
        platform.total_memory_used as f64,
        platform.timestamp,
    ));

    for (cpu_id, usage) in &platform.cpus_usage {
        metrics.push(
            Metric::new(MetricName::CpuUsagePerCpu, *usage as f64, platform.timestamp)
                .with_label(LABEL_CPU, cpu_id.to_string()),
        );
    }

    metrics
}

/// Topology counts and host identity, attached by consumers to every metric.
pub fn create_labels(platform: &Platform, host: &HostIdentity) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_SOCKETS.to_string(), platform.sockets.to_string()),
        (LABEL_CORES.to_string(), platform.cores.to_string()),
        (LABEL_CPUS.to_string(), platform.cpus.to_string()),
        (LABEL_HOST.to_string(), host.hostname.clone()),
        (LABEL_VERSION.to_string(), host.version.clone()),
        (LABEL_CPU_MODEL.to_string(), platform.cpu_model.clone()),
    ])
}

enum Family {
    Gauge(GaugeVec),
    Counter(CounterVec),
}

/// Renders measurement points in the Prometheus text exposition format.
///
/// `labels` become constant labels on every series. A fresh registry is used
/// per call, so counters carry exactly the reported cumulative value.
pub fn render_prometheus(
    metrics: &[Metric],
    labels: &BTreeMap<String, String>,
) -> Result<String, prometheus::Error> {
    let const_labels: HashMap<String, String> = labels.clone().into_iter().collect();
    let registry = Registry::new_custom(Some(PROMETHEUS_PREFIX.to_string()), Some(const_labels))?;

    let mut families: BTreeMap<MetricName, Family> = BTreeMap::new();

    for metric in metrics {
        let label_names: Vec<&str> = metric.labels.keys().map(String::as_str).collect();
        let label_values: Vec<&str> = metric.labels.values().map(String::as_str).collect();

        if !families.contains_key(&metric.name) {
            let opts = Opts::new(metric.name.as_str(), metric.help);
            let family = match metric.metric_type {
                MetricType::Gauge => {
                    let vec = GaugeVec::new(opts, &label_names)?;
                    registry.register(Box::new(vec.clone()))?;
                    Family::Gauge(vec)
                }
                MetricType::Counter => {
                    let vec = CounterVec::new(opts, &label_names)?;
                    registry.register(Box::new(vec.clone()))?;
                    Family::Counter(vec)
                }
            };
            families.insert(metric.name, family);
        }

        match &families[&metric.name] {
            Family::Gauge(vec) => vec
                .get_metric_with_label_values(&label_values)?
                .set(metric.value),
            Family::Counter(vec) => {
                if metric.value < 0.0 {
                    return Err(prometheus::Error::Msg(format!(
                        "counter {} has negative value {}",
                        metric.name.as_str(),
                        metric.value
                    )));
                }
                vec.get_metric_with_label_values(&label_values)?
                    .inc_by(metric.value)
            }
        }
    }

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::topology::parse_cpuinfo;
    use crate::collectors::topology::tests::cpuinfo_fixture;
    use crate::collectors::NumaInfo;
    use crate::platform::assemble_platform;

    fn platform(sockets: u32, cores: u32, threads: u32) -> Platform {
        let topology =
            parse_cpuinfo(&cpuinfo_fixture(sockets, cores, threads), "cpuinfo").unwrap();
        let usage = (0..topology.cpus as u32)
            .map(|cpu| (cpu, 100 + u64::from(cpu)))
            .collect();
        assemble_platform(topology, usage, 409600, NumaInfo::default(), None, Utc::now()).unwrap()
    }

    fn host() -> HostIdentity {
        HostIdentity::new("node-01", "0.1.0")
    }

    #[test]
    fn test_create_metrics_counts() {
        for (s, c, t) in [(1, 1, 1), (1, 4, 2), (2, 2, 2), (4, 8, 2)] {
            let p = platform(s, c, t);
            let metrics = create_metrics(&p);
            let per_cpu = metrics
                .iter()
                .filter(|m| m.name == MetricName::CpuUsagePerCpu)
                .count();
            let memory = metrics
                .iter()
                .filter(|m| m.name == MetricName::MemUsage)
                .count();
            assert_eq!(per_cpu, p.cpus);
            assert_eq!(memory, 1);
            assert_eq!(metrics.len(), p.cpus + 1);
        }
    }

    #[test]
    fn test_create_metrics_values_and_labels() {
        let p = platform(1, 2, 1);
        let metrics = create_metrics(&p);
        assert_eq!(metrics[0].name, MetricName::MemUsage);
        assert_eq!(metrics[0].value, 409600.0);
        assert!(metrics[0].labels.is_empty());
        assert_eq!(metrics[0].metric_type, MetricType::Gauge);
        assert!(metrics[0].help.contains("/proc/meminfo"));

        assert_eq!(metrics[2].labels.get(LABEL_CPU).map(String::as_str), Some("1"));
        assert_eq!(metrics[2].value, 101.0);
        assert_eq!(metrics[2].metric_type, MetricType::Counter);
        assert_eq!(metrics[2].help, MetricName::CpuUsagePerCpu.help());
        assert!(metrics.iter().all(|m| m.timestamp == p.timestamp));
    }

    #[test]
    fn test_create_metrics_deterministic() {
        let p = platform(2, 2, 2);
        assert_eq!(create_metrics(&p), create_metrics(&p));
    }

    #[test]
    fn test_create_labels() {
        let p = platform(2, 2, 2);
        let labels = create_labels(&p, &host());
        assert_eq!(labels[LABEL_SOCKETS], "2");
        assert_eq!(labels[LABEL_CORES], "4");
        assert_eq!(labels[LABEL_CPUS], "8");
        assert_eq!(labels[LABEL_HOST], "node-01");
        assert_eq!(labels[LABEL_VERSION], "0.1.0");
        assert_eq!(
            labels[LABEL_CPU_MODEL],
            "Intel(R) Xeon(R) Gold 6148 CPU @ 2.40GHz"
        );
        assert_eq!(labels.len(), 6);
    }

    #[test]
    fn test_render_prometheus() {
        let p = platform(1, 2, 1);
        let text = render_prometheus(&create_metrics(&p), &create_labels(&p, &host())).unwrap();
        assert!(text.contains("# TYPE platform_memory_usage gauge"), "{text}");
        assert!(text.contains("# TYPE platform_cpu_usage_per_cpu counter"), "{text}");
        assert!(text.contains("cpu=\"0\""), "{text}");
        assert!(text.contains("host=\"node-01\""), "{text}");
        assert!(text.contains(" 409600"), "{text}");
    }

    #[test]
    fn test_render_prometheus_rejects_negative_counter() {
        let metric = Metric::new(MetricName::CpuUsagePerCpu, -1.0, Utc::now())
            .with_label(LABEL_CPU, "0");
        assert!(render_prometheus(&[metric], &BTreeMap::new()).is_err());
    }
}
