//! Dependency health aggregation.
//!
//! Every critical dependency is probed concurrently, each under its own timeout
//! and failure isolation, so one slow or broken dependency never blocks or skips
//! the others. The overall verdict is `ok` only when every critical probe
//! answered `ok`. Components that are registered but not probed are reported as
//! `not_checked` and never affect the verdict.

mod probes;

use std::collections::BTreeMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use probes::{PostgresProbe, RedisProbe, CACHE_COMPONENT, DATASTORE_COMPONENT};

/// Component name for the background worker pool, reported as not checked
pub const WORKER_POOL_COMPONENT: &str = "background_workers";

/// Timeout applied to each probe when none is configured
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

pub const HEALTHY_MESSAGE: &str = "All critical components operational.";

/// Health of a single component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    Ok,
    /// Probe answered with a failure
    Error,
    /// Probe did not answer within its timeout
    Unavailable,
    /// Registered but not evaluated
    NotChecked,
}

impl ComponentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Unavailable => "unavailable",
            Self::NotChecked => "not_checked",
        }
    }
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Ok,
    Error,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// Liveness probe for one critical dependency
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Component name used in reports
    fn component(&self) -> &str;

    /// Succeeds when the dependency answers
    async fn ping(&self) -> anyhow::Result<()>;
}

/// Outcome of one health check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: OverallStatus,
    pub message: String,
    pub components: BTreeMap<String, ComponentStatus>,
    #[serde(skip)]
    pub trace_id: String,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == OverallStatus::Ok
    }
}

/// Render `Overall: OK | Components: {a: ok, b: error}`
fn summary(status: OverallStatus, components: &BTreeMap<String, ComponentStatus>) -> String {
    let rendered: Vec<String> = components
        .iter()
        .map(|(name, status)| format!("{}: {}", name, status))
        .collect();
    format!(
        "Overall: {} | Components: {{{}}}",
        status.as_str().to_uppercase(),
        rendered.join(", ")
    )
}

pub struct HealthAggregator {
    critical: Vec<Arc<dyn HealthProbe>>,
    not_checked: Vec<String>,
    probe_timeout: Duration,
}

impl HealthAggregator {
    pub fn new(probe_timeout: Duration) -> Self {
        Self {
            critical: Vec::new(),
            not_checked: Vec::new(),
            probe_timeout,
        }
    }

    /// Register a critical dependency
    pub fn with_probe(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.critical.push(probe);
        self
    }

    /// Register a component that is reported but not evaluated
    pub fn with_unchecked(mut self, component: impl Into<String>) -> Self {
        self.not_checked.push(component.into());
        self
    }

    /// Probe every critical dependency and compose the verdict.
    pub async fn check(&self, trace_id: Option<String>) -> HealthReport {
        let trace_id = trace_id.unwrap_or_else(|| {
            let id = Uuid::new_v4().simple().to_string();
            format!("status_{}", &id[..8])
        });
        let span = tracing::info_span!("status", trace_id = %trace_id);
        span.in_scope(|| tracing::info!("Performing application status check..."));

        let probes = self.critical.iter().map(|probe| {
            let span = span.clone();
            async move {
                let status = self.run_probe(probe.as_ref(), &span).await;
                (probe.component().to_string(), status)
            }
        });
        let results = join_all(probes).await;

        let mut components: BTreeMap<String, ComponentStatus> = BTreeMap::new();
        let mut overall = OverallStatus::Ok;
        for (name, status) in results {
            if status != ComponentStatus::Ok {
                overall = OverallStatus::Error;
            }
            components.insert(name, status);
        }
        for name in &self.not_checked {
            components
                .entry(name.clone())
                .or_insert(ComponentStatus::NotChecked);
        }

        let status_message = summary(overall, &components);
        span.in_scope(|| tracing::info!("Status check completed: {}", status_message));

        let message = match overall {
            OverallStatus::Ok => HEALTHY_MESSAGE.to_string(),
            OverallStatus::Error => status_message,
        };

        HealthReport {
            status: overall,
            message,
            components,
            trace_id,
        }
    }

    async fn run_probe(&self, probe: &dyn HealthProbe, span: &tracing::Span) -> ComponentStatus {
        let name = probe.component();
        let attempt = AssertUnwindSafe(probe.ping()).catch_unwind();
        match tokio::time::timeout(self.probe_timeout, attempt).await {
            Ok(Ok(Ok(()))) => {
                span.in_scope(|| tracing::debug!("{} ping successful.", name));
                ComponentStatus::Ok
            }
            Ok(Ok(Err(e))) => {
                span.in_scope(|| tracing::error!("{} connection check failed: {}", name, e));
                ComponentStatus::Error
            }
            Ok(Err(_panic)) => {
                span.in_scope(|| tracing::error!("{} probe panicked", name));
                ComponentStatus::Error
            }
            Err(_) => {
                span.in_scope(|| {
                    tracing::error!(
                        "{} did not answer within {}ms",
                        name,
                        self.probe_timeout.as_millis()
                    )
                });
                ComponentStatus::Unavailable
            }
        }
    }
}
