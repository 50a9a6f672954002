//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: backend assumed down, requests fail fast
//! - Half-Open: one probe request allowed through (opt-in)
//!
//! # State Transitions
//! ```text
//! Closed → Open: any attempt returns a status >= 500
//! Open → Closed: first check after the cooldown (half_open = false)
//! Open → Half-Open: first check after the cooldown (half_open = true)
//! Half-Open → Closed: probe settles healthy
//! Half-Open → Open: probe trips or settles unhealthy
//! ```
//!
//! # Design Decisions
//! - Cooldown is fixed from the triggering failure; trips while open do not extend it
//! - Open breakers heal themselves on the next check, no reset call needed
//! - Scope is global by default, per-host on request
//! - A probe is held in a `BreakerPermit`; dropping it unsettled counts as a failure

use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::schema::{BreakerConfig, BreakerScope};
use crate::observability::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreakerState {
    Closed,
    Open { until: Instant },
    HalfOpen,
}

/// How a request was let through the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Breaker closed.
    Normal,
    /// Single trial request while half-open; must be settled.
    Probe,
}

/// A single open/closed gate with a fixed cooldown window.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    state: Mutex<BreakerState>,
    cooldown: Duration,
    half_open: bool,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, cooldown: Duration, half_open: bool) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(BreakerState::Closed),
            cooldown,
            half_open,
        }
    }

    /// Gate a request. `Err` carries the remaining cooldown.
    pub fn check(&self) -> Result<Admission, Duration> {
        let now = Instant::now();
        let mut state = self.state.lock().expect("circuit breaker mutex poisoned");

        match *state {
            BreakerState::Closed => Ok(Admission::Normal),
            BreakerState::Open { until } if now < until => {
                metrics::record_breaker_rejection();
                Err(until - now)
            }
            BreakerState::Open { .. } if self.half_open => {
                tracing::info!(breaker = %self.name, "Circuit half-open, admitting probe");
                *state = BreakerState::HalfOpen;
                Ok(Admission::Probe)
            }
            BreakerState::Open { .. } => {
                tracing::info!(breaker = %self.name, "Circuit cooldown elapsed, closing");
                *state = BreakerState::Closed;
                Ok(Admission::Normal)
            }
            BreakerState::HalfOpen => {
                metrics::record_breaker_rejection();
                Err(Duration::ZERO)
            }
        }
    }

    /// Gate a request and hold the admission for the rest of the call.
    pub fn admit(self: &Arc<Self>) -> Result<BreakerPermit, Duration> {
        let admission = self.check()?;
        Ok(BreakerPermit {
            breaker: self.clone(),
            admission,
            settled: false,
        })
    }

    /// Open the breaker after a server error. Returns true if this call opened it.
    pub fn trip(&self) -> bool {
        let now = Instant::now();
        let mut state = self.state.lock().expect("circuit breaker mutex poisoned");

        if let BreakerState::Open { until } = *state {
            if now < until {
                return false;
            }
        }

        *state = BreakerState::Open {
            until: now + self.cooldown,
        };
        tracing::warn!(
            breaker = %self.name,
            cooldown_ms = self.cooldown.as_millis() as u64,
            "Circuit opened"
        );
        metrics::record_breaker_trip();
        true
    }

    /// Resolve a half-open probe.
    pub fn settle_probe(&self, healthy: bool) {
        let mut state = self.state.lock().expect("circuit breaker mutex poisoned");
        if *state != BreakerState::HalfOpen {
            return;
        }

        if healthy {
            tracing::info!(breaker = %self.name, "Probe succeeded, circuit closed");
            *state = BreakerState::Closed;
        } else {
            tracing::warn!(breaker = %self.name, "Probe failed, circuit reopened");
            *state = BreakerState::Open {
                until: Instant::now() + self.cooldown,
            };
            metrics::record_breaker_trip();
        }
    }

    /// True while requests would be rejected. Does not heal the breaker.
    pub fn is_open(&self) -> bool {
        let state = self.state.lock().expect("circuit breaker mutex poisoned");
        match *state {
            BreakerState::Closed => false,
            BreakerState::Open { until } => Instant::now() < until,
            BreakerState::HalfOpen => true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Admission through a breaker, held until the call completes.
///
/// A probe permit dropped before `settle` reopens the breaker, so a cancelled
/// probe call cannot leave it half-open.
#[derive(Debug)]
pub struct BreakerPermit {
    breaker: Arc<CircuitBreaker>,
    admission: Admission,
    settled: bool,
}

impl BreakerPermit {
    pub fn admission(&self) -> Admission {
        self.admission
    }

    pub fn is_probe(&self) -> bool {
        self.admission == Admission::Probe
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Report the call's outcome. Only probes change breaker state.
    pub fn settle(mut self, healthy: bool) {
        self.settled = true;
        if self.is_probe() {
            self.breaker.settle_probe(healthy);
        }
    }
}

impl Drop for BreakerPermit {
    fn drop(&mut self) {
        if !self.settled && self.is_probe() {
            tracing::warn!(breaker = %self.breaker.name(), "Probe abandoned before completion");
            self.breaker.settle_probe(false);
        }
    }
}

/// Breakers owned by a client, resolved by request URL.
#[derive(Debug)]
pub struct BreakerSet {
    config: BreakerConfig,
    global: Arc<CircuitBreaker>,
    per_host: DashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerSet {
    pub fn new(config: BreakerConfig) -> Self {
        let global = Arc::new(CircuitBreaker::new(
            "global",
            Duration::from_millis(config.cooldown_ms),
            config.half_open,
        ));
        Self {
            config,
            global,
            per_host: DashMap::new(),
        }
    }

    /// Whether breakers participate at all.
    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// Breaker governing `url`.
    ///
    /// Per-host scope keys on `host:port`; URLs without a host share the global breaker.
    pub fn for_url(&self, url: &str) -> Arc<CircuitBreaker> {
        if self.config.scope == BreakerScope::Global {
            return self.global.clone();
        }

        let Some(key) = host_key(url) else {
            return self.global.clone();
        };

        self.per_host
            .entry(key.clone())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(
                    key,
                    Duration::from_millis(self.config.cooldown_ms),
                    self.config.half_open,
                ))
            })
            .clone()
    }
}

fn host_key(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    match parsed.port_or_known_default() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(half_open: bool) -> CircuitBreaker {
        CircuitBreaker::new("test", Duration::from_millis(2000), half_open)
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_and_heals() {
        let cb = breaker(false);
        assert_eq!(cb.check(), Ok(Admission::Normal));

        assert!(cb.trip());
        assert!(cb.is_open());
        let remaining = cb.check().unwrap_err();
        assert_eq!(remaining, Duration::from_millis(2000));

        tokio::time::advance(Duration::from_millis(1999)).await;
        assert!(cb.check().is_err());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cb.check(), Ok(Admission::Normal));
        assert!(!cb.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_trip_does_not_extend_window() {
        let cb = breaker(false);
        assert!(cb.trip());

        tokio::time::advance(Duration::from_millis(1500)).await;
        assert!(!cb.trip());

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(cb.check(), Ok(Admission::Normal));
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_single_probe() {
        let cb = breaker(true);
        cb.trip();
        tokio::time::advance(Duration::from_millis(2000)).await;

        assert_eq!(cb.check(), Ok(Admission::Probe));
        assert_eq!(cb.check(), Err(Duration::ZERO));

        cb.settle_probe(true);
        assert_eq!(cb.check(), Ok(Admission::Normal));
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_probe_failure_reopens() {
        let cb = breaker(true);
        cb.trip();
        tokio::time::advance(Duration::from_millis(2000)).await;

        assert_eq!(cb.check(), Ok(Admission::Probe));
        cb.settle_probe(false);
        assert_eq!(cb.check(), Err(Duration::from_millis(2000)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_trial_permit_reopens() {
        let cb = Arc::new(breaker(true));
        cb.trip();
        tokio::time::advance(Duration::from_millis(2000)).await;

        let permit = cb.admit().unwrap();
        assert!(permit.is_probe());
        assert_eq!(cb.check(), Err(Duration::ZERO));

        drop(permit);
        assert_eq!(cb.check(), Err(Duration::from_millis(2000)));

        tokio::time::advance(Duration::from_millis(2000)).await;
        let permit = cb.admit().unwrap();
        assert!(permit.is_probe());
        permit.settle(true);
        assert_eq!(cb.check(), Ok(Admission::Normal));
    }

    #[tokio::test(start_paused = true)]
    async fn test_normal_permit_drop_is_inert() {
        let cb = Arc::new(breaker(true));
        let permit = cb.admit().unwrap();
        assert_eq!(permit.admission(), Admission::Normal);
        drop(permit);
        assert!(!cb.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_host_scope() {
        let set = BreakerSet::new(BreakerConfig {
            scope: BreakerScope::PerHost,
            ..BreakerConfig::default()
        });

        let a = set.for_url("http://a.test/x");
        let a2 = set.for_url("http://a.test:80/y");
        let b = set.for_url("http://b.test/x");
        assert!(Arc::ptr_eq(&a, &a2));
        assert!(!Arc::ptr_eq(&a, &b));

        a.trip();
        assert!(a.check().is_err());
        assert!(b.check().is_ok());
    }

    #[test]
    fn test_global_scope_shares_breaker() {
        let set = BreakerSet::new(BreakerConfig::default());
        let a = set.for_url("http://a.test/x");
        let b = set.for_url("http://b.test/x");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), "global");
    }
}
