//! Throughput governor
//!
//! Each container owns one [`Governor`] that admits or throttles requests
//! against its provisioned request-unit rate.
//!
//! # Budget
//!
//! The budget refills at the start of every fixed window (one second by
//! default). A request is admitted while the window's balance is positive;
//! its full cost is then deducted, so the balance may go negative. That
//! debt carries into the next window, so an oversized request delays the
//! ones behind it instead of being rejected outright.
//!
//! Throttled requests are never queued: `admit` returns immediately with a
//! retry hint measured to the first window in which the balance will be
//! positive again.

use docstore_core::{Error, Result};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::cost::RequestCharge;

/// Lowest provisionable throughput in RU/s
pub const MIN_THROUGHPUT: u32 = 400;

/// Highest provisionable throughput in RU/s
pub const MAX_THROUGHPUT: u32 = 1_000_000;

/// Throughput must be a multiple of this
pub const THROUGHPUT_INCREMENT: u32 = 100;

/// Check a provisioned throughput value
pub fn validate_throughput(throughput: u32) -> Result<()> {
    if !(MIN_THROUGHPUT..=MAX_THROUGHPUT).contains(&throughput) {
        return Err(Error::invalid_input(format!(
            "throughput {} RU/s is outside {}..={}",
            throughput, MIN_THROUGHPUT, MAX_THROUGHPUT
        )));
    }
    if throughput % THROUGHPUT_INCREMENT != 0 {
        return Err(Error::invalid_input(format!(
            "throughput {} RU/s is not a multiple of {}",
            throughput, THROUGHPUT_INCREMENT
        )));
    }
    Ok(())
}

// ============================================================================
// Clocks
// ============================================================================

/// Source of time for the governor
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current instant
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    /// Clock frozen at the moment of creation
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }
}

// ============================================================================
// Governor
// ============================================================================

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The cost was deducted from the budget
    Admitted,
    /// Budget exhausted; nothing was deducted
    Throttled {
        /// Time until the budget is positive again
        retry_after: Duration,
    },
}

impl Admission {
    /// True if admitted
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }

    /// Convert a throttle into `Error::Throttled`
    pub fn into_result(self) -> Result<()> {
        match self {
            Admission::Admitted => Ok(()),
            Admission::Throttled { retry_after } => Err(Error::Throttled { retry_after }),
        }
    }
}

/// Counters since the governor was created
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GovernorStats {
    /// Requests admitted
    pub admitted: u64,
    /// Requests throttled
    pub throttled: u64,
    /// Total RU deducted
    pub consumed: f64,
}

#[derive(Debug)]
struct BudgetState {
    throughput: u32,
    window_start: Instant,
    balance: f64,
    stats: GovernorStats,
}

/// Per-container request-unit budget
///
/// All state sits behind one mutex, so concurrent admissions are
/// serialized and can never over-admit.
#[derive(Debug)]
pub struct Governor {
    window: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<BudgetState>,
}

impl Governor {
    /// Create a governor with a full first window
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the throughput is out of range or the window is
    /// zero.
    pub fn new(throughput: u32, window: Duration, clock: Arc<dyn Clock>) -> Result<Self> {
        validate_throughput(throughput)?;
        if window.is_zero() {
            return Err(Error::invalid_input("throughput window must be positive"));
        }
        let now = clock.now();
        Ok(Self {
            window,
            clock,
            state: Mutex::new(BudgetState {
                throughput,
                window_start: now,
                balance: budget_per_window(throughput, window),
                stats: GovernorStats::default(),
            }),
        })
    }

    /// Governor on the system clock with a one second window
    pub fn with_system_clock(throughput: u32) -> Result<Self> {
        Self::new(throughput, Duration::from_secs(1), Arc::new(SystemClock))
    }

    /// Provisioned RU/s
    pub fn throughput(&self) -> u32 {
        self.state.lock().throughput
    }

    /// Window length
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Balance of the current window, after any pending refill
    pub fn available(&self) -> f64 {
        let mut state = self.state.lock();
        self.roll_window(&mut state);
        state.balance
    }

    /// Counters since creation
    pub fn stats(&self) -> GovernorStats {
        self.state.lock().stats
    }

    /// Admit a request of the given cost, or throttle it
    pub fn admit(&self, cost: RequestCharge) -> Admission {
        let mut state = self.state.lock();
        let now = self.roll_window(&mut state);

        if state.balance > 0.0 {
            state.balance -= cost.units();
            state.stats.admitted += 1;
            state.stats.consumed += cost.units();
            return Admission::Admitted;
        }

        let per_window = budget_per_window(state.throughput, self.window);
        // Whole windows until the debt is repaid and the balance is positive
        let windows = (-state.balance / per_window).floor() as u32 + 1;
        let resume_at = state.window_start + self.window * windows;
        let retry_after = resume_at.saturating_duration_since(now);
        state.stats.throttled += 1;
        warn!(
            target: "docstore::throughput",
            throughput = state.throughput,
            balance = state.balance,
            cost = cost.units(),
            retry_after_ms = retry_after.as_millis() as u64,
            "Request throttled"
        );
        Admission::Throttled { retry_after }
    }

    /// Change the provisioned rate
    ///
    /// Scaling up adds the difference between the new and old per-window
    /// budgets to the current balance. Scaling down only caps the balance at
    /// the new per-window budget; units already spent at the old rate do not
    /// become debt.
    pub fn set_throughput(&self, throughput: u32) -> Result<()> {
        validate_throughput(throughput)?;
        let mut state = self.state.lock();
        self.roll_window(&mut state);
        let previous = state.throughput;
        let old_budget = budget_per_window(previous, self.window);
        let new_budget = budget_per_window(throughput, self.window);
        if new_budget >= old_budget {
            state.balance += new_budget - old_budget;
        } else {
            state.balance = state.balance.min(new_budget);
        }
        state.throughput = throughput;
        info!(
            target: "docstore::throughput",
            from = previous,
            to = throughput,
            "Throughput changed"
        );
        Ok(())
    }

    /// Refill for every window that has fully elapsed; returns `now`
    fn roll_window(&self, state: &mut BudgetState) -> Instant {
        let now = self.clock.now();
        let elapsed = now.saturating_duration_since(state.window_start);
        if elapsed >= self.window {
            let windows = (elapsed.as_nanos() / self.window.as_nanos()) as u32;
            let per_window = budget_per_window(state.throughput, self.window);
            state.window_start += self.window * windows;
            state.balance = (state.balance + per_window * windows as f64).min(per_window);
        }
        now
    }
}

fn budget_per_window(throughput: u32, window: Duration) -> f64 {
    throughput as f64 * window.as_secs_f64()
}
