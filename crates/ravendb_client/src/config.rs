//! Configuration for stores, sessions and request retries.

use std::fmt;
use std::time::Duration;

/// How many times the request executor walks the node list before giving up.
///
/// Round `n > 0` waits `backoff * 2^(n-1)` (capped at `max_backoff`) before it
/// starts, plus up to a quarter of that when jitter is on.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Rounds over the node list. Zero behaves like one.
    pub rounds: u32,
    /// Wait before the second round.
    pub backoff: Duration,
    /// Upper bound for the doubled wait.
    pub max_backoff: Duration,
    /// Spread waits of concurrent clients apart.
    pub jitter: bool,
}

impl RetryConfig {
    /// Retries `rounds` times with a 250 ms starting backoff.
    pub fn new(rounds: u32) -> Self {
        Self {
            rounds,
            backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
            jitter: true,
        }
    }

    /// One round, no waiting.
    pub fn no_retry() -> Self {
        Self {
            rounds: 1,
            backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            jitter: false,
        }
    }

    /// Sets the wait before the second round.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Caps the doubled wait.
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Wait before starting `round` (0-indexed).
    pub fn backoff_before(&self, round: u32) -> Duration {
        let Some(exponent) = round.checked_sub(1) else {
            return Duration::ZERO;
        };
        let factor = 1u32 << exponent.min(20);
        let wait = self.backoff.saturating_mul(factor).min(self.max_backoff);
        if self.jitter {
            wait + wait.mul_f64(clock_fraction() / 4.0)
        } else {
            wait
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(2)
    }
}

// Sub-second clock reading in [0, 1).
fn clock_fraction() -> f64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.subsec_nanos())
        .unwrap_or(0);
    f64::from(nanos) / 1_000_000_000.0
}

/// Client certificate settings for secured servers.
///
/// `certificate_pem` must contain both the certificate and its private key.
#[derive(Clone, Default)]
pub struct AuthOptions {
    /// PEM-encoded client certificate and key.
    pub certificate_pem: Vec<u8>,
    /// Additional PEM-encoded root certificate to trust.
    pub trusted_ca_pem: Option<Vec<u8>>,
}

impl AuthOptions {
    /// Creates auth options from a PEM bundle.
    pub fn new(certificate_pem: impl Into<Vec<u8>>) -> Self {
        Self {
            certificate_pem: certificate_pem.into(),
            trusted_ca_pem: None,
        }
    }

    /// Trusts an additional root certificate.
    pub fn with_trusted_ca(mut self, ca_pem: impl Into<Vec<u8>>) -> Self {
        self.trusted_ca_pem = Some(ca_pem.into());
        self
    }
}

impl fmt::Debug for AuthOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthOptions")
            .field("certificate_pem", &format_args!("<{} bytes>", self.certificate_pem.len()))
            .field("trusted_ca_pem", &self.trusted_ca_pem.as_ref().map(Vec::len))
            .finish()
    }
}

/// Options for opening a session.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Database to use instead of the store default.
    pub database: Option<String>,
    /// Overrides the conventions' optimistic concurrency setting.
    pub use_optimistic_concurrency: Option<bool>,
}

impl SessionOptions {
    /// Creates default session options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Targets a specific database.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Enables or disables optimistic concurrency for the session.
    pub fn with_optimistic_concurrency(mut self, enabled: bool) -> Self {
        self.use_optimistic_concurrency = Some(enabled);
        self
    }
}
