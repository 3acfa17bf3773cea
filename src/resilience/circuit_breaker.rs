//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: backend assumed down, requests fail fast
//! - Half-Open: a capped number of probes test if the backend recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure ratio >= threshold over >= minimum_sample_size
//!                outcomes within the sliding evaluation window
//! Open → Half-Open: open_duration elapsed since opening
//! Half-Open → Closed: half_open_successes_to_close consecutive probe successes
//! Half-Open → Open: first probe failure (cool-down restarts)
//! ```
//!
//! # Design Decisions
//! - One breaker per logical service, created on first touch
//! - Every transition starts a new generation; an [`Admission`] only
//!   reports into the generation that issued it
//! - The evaluation window slides in `WINDOW_BUCKETS` buckets
//! - Open → Half-Open is evaluated lazily by the next caller

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use dashmap::DashMap;
use serde::Serialize;

use crate::observability::metrics;

/// Buckets per evaluation window.
const WINDOW_BUCKETS: u32 = 10;

/// Tuning of one service's breaker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitBreakerPolicy {
    pub failure_threshold_ratio: f64,
    pub minimum_sample_size: u32,
    pub evaluation_window: Duration,
    pub open_duration: Duration,
    pub half_open_probe_limit: u32,
    pub half_open_successes_to_close: u32,
}

impl Default for CircuitBreakerPolicy {
    fn default() -> Self {
        Self {
            failure_threshold_ratio: 0.5,
            minimum_sample_size: 10,
            evaluation_window: Duration::from_secs(60),
            open_duration: Duration::from_secs(10),
            half_open_probe_limit: 3,
            half_open_successes_to_close: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerMode {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerMode::Closed => "closed",
            BreakerMode::Open => "open",
            BreakerMode::HalfOpen => "half_open",
        }
    }
}

/// Ticket for one request let through by [`CircuitBreaker::allow_request`].
///
/// Its outcome only counts while the breaker is still in the generation
/// that admitted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    generation: u64,
    trial: bool,
}

impl Admission {
    pub fn is_trial(&self) -> bool {
        self.trial
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    start: Instant,
    failures: u32,
    successes: u32,
}

/// Outcomes of the last `evaluation_window`, bucketed.
#[derive(Debug)]
struct OutcomeWindow {
    span: Duration,
    bucket_span: Duration,
    buckets: VecDeque<Bucket>,
}

impl OutcomeWindow {
    fn new(span: Duration) -> Self {
        Self {
            span,
            bucket_span: (span / WINDOW_BUCKETS).max(Duration::from_millis(1)),
            buckets: VecDeque::with_capacity(WINDOW_BUCKETS as usize + 1),
        }
    }

    fn clear(&mut self) {
        self.buckets.clear();
    }

    fn evict(&mut self, now: Instant) {
        while let Some(oldest) = self.buckets.front() {
            if now.saturating_duration_since(oldest.start) >= self.span {
                self.buckets.pop_front();
            } else {
                break;
            }
        }
    }

    fn record(&mut self, success: bool, now: Instant) {
        self.evict(now);
        let needs_bucket = self
            .buckets
            .back()
            .map_or(true, |b| now.saturating_duration_since(b.start) >= self.bucket_span);
        if needs_bucket {
            self.buckets.push_back(Bucket { start: now, failures: 0, successes: 0 });
        }
        if let Some(current) = self.buckets.back_mut() {
            if success {
                current.successes += 1;
            } else {
                current.failures += 1;
            }
        }
    }

    /// `(failures, successes)` currently in the window.
    fn totals(&self) -> (u32, u32) {
        self.buckets
            .iter()
            .fold((0, 0), |(f, s), b| (f + b.failures, s + b.successes))
    }
}

#[derive(Debug)]
struct BreakerState {
    policy: CircuitBreakerPolicy,
    mode: BreakerMode,
    generation: u64,
    window: OutcomeWindow,
    probe_successes: u32,
    opened_at: Instant,
    probes_in_flight: u32,
}

impl BreakerState {
    fn new(policy: CircuitBreakerPolicy, now: Instant) -> Self {
        Self {
            policy,
            mode: BreakerMode::Closed,
            generation: 0,
            window: OutcomeWindow::new(policy.evaluation_window),
            probe_successes: 0,
            opened_at: now,
            probes_in_flight: 0,
        }
    }

    fn transition(&mut self, service: &str, to: BreakerMode, now: Instant) {
        let from = self.mode;
        self.mode = to;
        self.generation += 1;
        self.window.clear();
        self.probe_successes = 0;
        self.probes_in_flight = 0;

        match to {
            BreakerMode::Open => {
                self.opened_at = now;
                tracing::warn!(service = %service, from = from.as_str(), "Circuit opened");
            }
            BreakerMode::HalfOpen => {
                tracing::info!(service = %service, "Circuit half-open, probing backend");
            }
            BreakerMode::Closed => {
                tracing::info!(service = %service, "Circuit closed, backend recovered");
            }
        }
        metrics::record_breaker_transition(service, to.as_str());
    }

    fn allow(&mut self, service: &str, now: Instant) -> Option<Admission> {
        if self.mode == BreakerMode::Open {
            if now.saturating_duration_since(self.opened_at) < self.policy.open_duration {
                return None;
            }
            self.transition(service, BreakerMode::HalfOpen, now);
        }

        match self.mode {
            BreakerMode::Closed => Some(Admission { generation: self.generation, trial: false }),
            BreakerMode::HalfOpen if self.probes_in_flight < self.policy.half_open_probe_limit => {
                self.probes_in_flight += 1;
                Some(Admission { generation: self.generation, trial: true })
            }
            _ => None,
        }
    }

    /// Whether `admission` still belongs to the current state.
    fn is_current(&self, admission: Admission) -> bool {
        admission.generation == self.generation
            && admission.trial == (self.mode == BreakerMode::HalfOpen)
    }

    fn report(&mut self, service: &str, admission: Admission, success: bool, now: Instant) {
        if !self.is_current(admission) {
            tracing::debug!(service = %service, success, "Dropping outcome from an earlier breaker state");
            return;
        }

        match self.mode {
            BreakerMode::Closed => {
                self.window.record(success, now);
                let (failures, successes) = self.window.totals();
                let samples = failures + successes;
                let ratio = f64::from(failures) / f64::from(samples);
                if samples >= self.policy.minimum_sample_size
                    && ratio >= self.policy.failure_threshold_ratio
                {
                    tracing::debug!(service = %service, samples, ratio, "Failure threshold reached");
                    self.transition(service, BreakerMode::Open, now);
                }
            }
            BreakerMode::HalfOpen => {
                self.probes_in_flight = self.probes_in_flight.saturating_sub(1);
                if success {
                    self.probe_successes += 1;
                    if self.probe_successes >= self.policy.half_open_successes_to_close {
                        self.transition(service, BreakerMode::Closed, now);
                    }
                } else {
                    self.transition(service, BreakerMode::Open, now);
                }
            }
            // Open never issues admissions.
            BreakerMode::Open => {}
        }
    }

    fn release(&mut self, admission: Admission) {
        if admission.trial && self.is_current(admission) {
            self.probes_in_flight = self.probes_in_flight.saturating_sub(1);
        }
    }

    fn snapshot(&self) -> BreakerSnapshot {
        let (failure_count, success_count) = match self.mode {
            BreakerMode::Closed => self.window.totals(),
            BreakerMode::HalfOpen => (0, self.probe_successes),
            BreakerMode::Open => (0, 0),
        };
        BreakerSnapshot {
            mode: self.mode,
            failure_count,
            success_count,
            probes_in_flight: self.probes_in_flight,
        }
    }
}

/// Point-in-time view of a service's breaker.
///
/// Counts are the evaluation window while Closed and the probe
/// successes while Half-Open.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub mode: BreakerMode,
    pub failure_count: u32,
    pub success_count: u32,
    pub probes_in_flight: u32,
}

/// Circuit breakers keyed by logical service name.
#[derive(Debug)]
pub struct CircuitBreaker {
    default_policy: CircuitBreakerPolicy,
    policies: HashMap<String, CircuitBreakerPolicy>,
    states: DashMap<String, BreakerState>,
}

impl CircuitBreaker {
    pub fn new(default_policy: CircuitBreakerPolicy) -> Self {
        Self {
            default_policy,
            policies: HashMap::new(),
            states: DashMap::new(),
        }
    }

    /// Override the policy of one service.
    pub fn with_policy(mut self, service: impl Into<String>, policy: CircuitBreakerPolicy) -> Self {
        self.policies.insert(service.into(), policy);
        self
    }

    pub fn policy_for(&self, service: &str) -> CircuitBreakerPolicy {
        self.policies.get(service).copied().unwrap_or(self.default_policy)
    }

    /// Admit a request to `service`, or `None` while the circuit refuses it.
    ///
    /// In Half-Open an admission claims one probe slot, freed by the
    /// matching `report_outcome` or `release_probe`.
    pub fn allow_request(&self, service: &str) -> Option<Admission> {
        self.allow_request_at(service, Instant::now())
    }

    pub fn allow_request_at(&self, service: &str, now: Instant) -> Option<Admission> {
        self.with_state(service, now, |state| state.allow(service, now))
    }

    /// Record the outcome of an admitted request.
    pub fn report_outcome(&self, service: &str, admission: Admission, success: bool) {
        self.report_outcome_at(service, admission, success, Instant::now());
    }

    pub fn report_outcome_at(&self, service: &str, admission: Admission, success: bool, now: Instant) {
        self.with_state(service, now, |state| state.report(service, admission, success, now));
    }

    /// Give back an admission whose request never reached a backend.
    pub fn release_probe(&self, service: &str, admission: Admission) {
        if let Some(mut state) = self.states.get_mut(service) {
            state.value_mut().release(admission);
        }
    }

    pub fn snapshot(&self, service: &str) -> Option<BreakerSnapshot> {
        self.states.get(service).map(|state| state.snapshot())
    }

    pub fn mode(&self, service: &str) -> BreakerMode {
        self.states.get(service).map(|state| state.mode).unwrap_or(BreakerMode::Closed)
    }

    fn with_state<R>(&self, service: &str, now: Instant, f: impl FnOnce(&mut BreakerState) -> R) -> R {
        if let Some(mut state) = self.states.get_mut(service) {
            return f(state.value_mut());
        }
        let mut state = self
            .states
            .entry(service.to_string())
            .or_insert_with(|| BreakerState::new(self.policy_for(service), now));
        f(state.value_mut())
    }
}
