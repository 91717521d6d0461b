// crates/orion-council/src/local.rs
// ============================================================================
// Module: Local Validator
// Description: Resource-gated local model reasoning over a single decision.
// Purpose: Implement spec.md §4.7's Local Validator: a RAM floor, an
//          advisory temperature check, and a strict output parser.
// Dependencies: async-trait, orion-core
// ============================================================================

//! ## Overview
//! The local SLM runtime itself is out of scope (spec.md §1: "specified
//! only by call shape and failure semantics"). [`LocalModel`] is that call
//! shape; production wiring supplies a real implementation, tests use
//! [`FakeLocalModel`]. [`LocalValidator::validate`] is everything this crate
//! owns: the resource gate, the call, and the output parser — all fail
//! closed to `(0.0, "ERROR: ...")` or `(0.0, "BLOCKED: ...")`.

use async_trait::async_trait;
use orion_core::contracts::Decision;
use orion_core::contracts::Incident;

/// Default free-RAM floor, in bytes (4 GB), below which inference is
/// skipped entirely.
pub const DEFAULT_MIN_FREE_RAM_BYTES: u64 = 4 * 1024 * 1024 * 1024;

/// Default advisory CPU temperature threshold, in Celsius.
pub const DEFAULT_TEMP_THRESHOLD_C: f64 = 70.0;

/// Capability for reading local resource pressure before inference.
pub trait ResourceMonitor: Send + Sync {
    /// Currently free system RAM, in bytes.
    fn free_ram_bytes(&self) -> u64;
    /// Current CPU package temperature, in Celsius.
    fn cpu_temp_celsius(&self) -> f64;
}

/// The local SLM runtime's call shape: a single inference over a prompt.
#[async_trait]
pub trait LocalModel: Send + Sync {
    /// Runs inference, returning the raw model output text.
    ///
    /// # Errors
    ///
    /// Returns an error string describing why inference could not be
    /// completed (unreachable, crashed, etc).
    async fn infer(&self, prompt: &str) -> Result<String, String>;
}

/// Local reasoning validator: resource gate, model call, output parser.
pub struct LocalValidator<M, R> {
    model: M,
    resources: R,
    min_free_ram_bytes: u64,
    temp_threshold_c: f64,
}

impl<M: LocalModel, R: ResourceMonitor> LocalValidator<M, R> {
    /// Builds a validator with the default resource thresholds.
    #[must_use]
    pub fn new(model: M, resources: R) -> Self {
        Self {
            model,
            resources,
            min_free_ram_bytes: DEFAULT_MIN_FREE_RAM_BYTES,
            temp_threshold_c: DEFAULT_TEMP_THRESHOLD_C,
        }
    }

    /// Overrides the default resource thresholds.
    #[must_use]
    pub const fn with_thresholds(mut self, min_free_ram_bytes: u64, temp_threshold_c: f64) -> Self {
        self.min_free_ram_bytes = min_free_ram_bytes;
        self.temp_threshold_c = temp_threshold_c;
        self
    }

    /// Validates a decision, returning `(confidence, critique)`.
    pub async fn validate(&self, decision: &Decision, incident: &Incident) -> (f64, String) {
        let free_ram = self.resources.free_ram_bytes();
        if free_ram < self.min_free_ram_bytes {
            return (
                0.0,
                format!(
                    "BLOCKED: insufficient free RAM ({free_ram} bytes < {} bytes required)",
                    self.min_free_ram_bytes
                ),
            );
        }
        let temp = self.resources.cpu_temp_celsius();
        if temp > self.temp_threshold_c {
            tracing::warn!(temp_c = temp, threshold_c = self.temp_threshold_c, "advisory: CPU temperature high");
        }

        let prompt = build_prompt(decision, incident);
        match self.model.infer(&prompt).await {
            Ok(output) if output.trim().is_empty() => (0.0, "ERROR: empty model response".to_string()),
            Ok(output) => parse_model_output(&output),
            Err(err) => (0.0, format!("ERROR: local model unreachable: {err}")),
        }
    }
}

fn build_prompt(decision: &Decision, incident: &Incident) -> String {
    format!(
        "incident_type={} severity={:?} decision_type={:?} safety_classification={:?} reasoning={}",
        incident.incident_type,
        incident.severity,
        decision.decision_type,
        decision.safety_classification,
        decision.reasoning
    )
}

/// Parses `"CONFIDENCE: <float>\nCRITIQUE: <text>"`, accepting `0.85`,
/// `85%`, and `0.85/1.0` confidence forms, clamped to `[0, 1]`. Any
/// malformed input is treated as a parse error, itself fail-closed.
#[must_use]
pub fn parse_model_output(output: &str) -> (f64, String) {
    let mut confidence: Option<f64> = None;
    let mut critique: Option<String> = None;
    for line in output.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("CONFIDENCE:") {
            confidence = parse_confidence(rest.trim());
        } else if let Some(rest) = line.strip_prefix("CRITIQUE:") {
            critique = Some(rest.trim().to_string());
        }
    }
    match (confidence, critique) {
        (Some(confidence), Some(critique)) => (confidence.clamp(0.0, 1.0), critique),
        _ => (0.0, "ERROR: failed to parse local model output".to_string()),
    }
}

fn parse_confidence(raw: &str) -> Option<f64> {
    if let Some(pct) = raw.strip_suffix('%') {
        return pct.trim().parse::<f64>().ok().map(|value| value / 100.0);
    }
    if let Some((numerator, denominator)) = raw.split_once('/') {
        let numerator: f64 = numerator.trim().parse().ok()?;
        let denominator: f64 = denominator.trim().parse().ok()?;
        if denominator == 0.0 {
            return None;
        }
        return Some(numerator / denominator);
    }
    raw.parse::<f64>().ok()
}

/// Fail-closed [`LocalModel`] for deployments with no local SLM runtime
/// wired up. Always reports an inference failure, so [`LocalValidator`]
/// falls through to its `(0.0, "ERROR: ...")` path rather than blocking on
/// a call that can never succeed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLocalModel;

#[async_trait]
impl LocalModel for NullLocalModel {
    async fn infer(&self, _prompt: &str) -> Result<String, String> {
        Err("no local model configured".to_string())
    }
}

/// In-memory fake for tests: returns a fixed response or an error.
pub struct FakeLocalModel {
    response: Result<String, String>,
}

impl FakeLocalModel {
    /// Builds a fake that always returns `response`.
    #[must_use]
    pub fn responding(response: impl Into<String>) -> Self {
        Self { response: Ok(response.into()) }
    }

    /// Builds a fake that always fails with `error`.
    #[must_use]
    pub fn failing(error: impl Into<String>) -> Self {
        Self { response: Err(error.into()) }
    }
}

#[async_trait]
impl LocalModel for FakeLocalModel {
    async fn infer(&self, _prompt: &str) -> Result<String, String> {
        self.response.clone()
    }
}

/// In-memory fake resource monitor for tests.
pub struct FakeResourceMonitor {
    /// Free RAM to report, in bytes.
    pub free_ram_bytes: u64,
    /// CPU temperature to report, in Celsius.
    pub cpu_temp_celsius: f64,
}

impl Default for FakeResourceMonitor {
    fn default() -> Self {
        Self { free_ram_bytes: DEFAULT_MIN_FREE_RAM_BYTES * 2, cpu_temp_celsius: 50.0 }
    }
}

impl ResourceMonitor for FakeResourceMonitor {
    fn free_ram_bytes(&self) -> u64 {
        self.free_ram_bytes
    }

    fn cpu_temp_celsius(&self) -> f64 {
        self.cpu_temp_celsius
    }
}

/// Production [`ResourceMonitor`] backed by [`sysinfo`]. Refreshes on every
/// call rather than caching — readings feed an infrequent, safety-relevant
/// gate, not a hot path.
pub struct SysinfoResourceMonitor {
    system: std::sync::Mutex<sysinfo::System>,
}

impl SysinfoResourceMonitor {
    /// Builds a monitor with a freshly initialized [`sysinfo::System`].
    #[must_use]
    pub fn new() -> Self {
        Self { system: std::sync::Mutex::new(sysinfo::System::new_all()) }
    }
}

impl Default for SysinfoResourceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceMonitor for SysinfoResourceMonitor {
    fn free_ram_bytes(&self) -> u64 {
        let mut system = self.system.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        system.refresh_memory();
        system.available_memory()
    }

    fn cpu_temp_celsius(&self) -> f64 {
        let components = sysinfo::Components::new_with_refreshed_list();
        components
            .iter()
            .filter_map(sysinfo::Component::temperature)
            .fold(None, |max, reading| Some(max.map_or(reading, |current: f32| current.max(reading))))
            .map_or(0.0, f64::from)
    }
}
