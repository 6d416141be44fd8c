//! Environment abstraction for deterministic testing.
//!
//! Decouples message orchestration from system resources (wall clock,
//! randomness). Production uses [`SystemEnv`]; tests use [`SimEnv`] with a
//! virtual clock and a seeded RNG so timestamps and ciphertexts are
//! reproducible.

#![allow(clippy::disallowed_types, reason = "Locking simple clock and RNG state")]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeDelta, Utc};
use rand::{RngCore, SeedableRng, rngs::StdRng};

/// Abstract environment providing time and randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `random_bytes()` uses cryptographically secure entropy in production
/// - Methods are infallible except in exceptional circumstances (e.g., OS
///   entropy exhaustion)
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current wall-clock time in UTC.
    ///
    /// Used for message timestamps and receipt times.
    fn now(&self) -> DateTime<Utc>;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Given the same RNG seed, this produces the same sequence of bytes
    /// - Uses cryptographically secure RNG in production
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a fixed-size array of random bytes.
    ///
    /// Convenience for salts and nonces.
    fn random_array<const N: usize>(&self) -> [u8; N] {
        let mut bytes = [0u8; N];
        self.random_bytes(&mut bytes);
        bytes
    }
}

/// Production environment using the system clock and OS RNG.
///
/// # Panics
///
/// Panics if the OS RNG fails. A client without working randomness cannot
/// produce safe salts or nonces, so continuing is not an option.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }
}

/// Seconds from the Unix epoch to the simulated start (2025-01-01T00:00:00Z).
const SIM_START_SECS: i64 = 1_735_689_600;

/// Deterministic environment for tests and simulation.
///
/// The clock starts at 2025-01-01T00:00:00Z and advances by one second on
/// every [`Environment::now`] call, so consecutive messages get strictly
/// increasing timestamps. Clones share clock and RNG state.
#[derive(Clone)]
pub struct SimEnv {
    inner: Arc<Mutex<SimEnvInner>>,
}

struct SimEnvInner {
    now: DateTime<Utc>,
    rng: StdRng,
}

impl SimEnv {
    /// Create a simulated environment with a seeded RNG.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimEnvInner {
                now: DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(SIM_START_SECS),
                rng: StdRng::seed_from_u64(seed),
            })),
        }
    }

    /// Move the virtual clock forward.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    #[allow(clippy::expect_used)]
    pub fn advance(&self, by: TimeDelta) {
        let mut inner = self.inner.lock().expect("SimEnv mutex poisoned");
        inner.now += by;
    }

    /// Time the next [`Environment::now`] call will return.
    #[allow(clippy::expect_used)]
    pub fn peek(&self) -> DateTime<Utc> {
        self.inner.lock().expect("SimEnv mutex poisoned").now
    }
}

impl Environment for SimEnv {
    #[allow(clippy::expect_used)]
    fn now(&self) -> DateTime<Utc> {
        let mut inner = self.inner.lock().expect("SimEnv mutex poisoned");
        let now = inner.now;
        inner.now += TimeDelta::seconds(1);
        now
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        self.inner.lock().expect("SimEnv mutex poisoned").rng.fill_bytes(buffer);
    }
}
