//! Immutable dispatch configuration.
//!
//! Everything here is validated once when a run starts and then only read.

use crate::error::{ConfigError, DispatchError};
use crate::types::TokenAmount;
use crate::utils::retry::EscalationPolicy;
use crate::utils::wallet_manager::Account;
use chrono::NaiveTime;
use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

/// Fraction digits used when sampling. Tokens with a finer precision still
/// receive amounts on this grid.
pub const MAX_SAMPLE_DIGITS: u8 = 9;

/// Token amount bounds in whole-token units. Sampled amounts always land on
/// the token's precision grid inside `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountRange {
    min: f64,
    max: f64,
}

impl AmountRange {
    pub fn new(min: f64, max: f64) -> Result<Self, ConfigError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "amount".to_string(),
                reason: "bounds must be finite numbers".to_string(),
            });
        }
        if min < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "min_amount".to_string(),
                reason: format!("{} is negative", min),
            });
        }
        if min > max {
            return Err(ConfigError::InvalidValue {
                field: "amount".to_string(),
                reason: format!("min {} is greater than max {}", min, max),
            });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Inclusive bounds, in grid steps, of the amounts representable with
    /// `digits` fraction digits.
    fn steps(&self, digits: u8) -> Result<(u128, u128), ConfigError> {
        let scale = 10f64.powi(digits as i32);
        let lo = snap(self.min * scale, f64::ceil);
        let hi = snap(self.max * scale, f64::floor);
        if lo > hi {
            return Err(ConfigError::InvalidValue {
                field: "amount".to_string(),
                reason: format!(
                    "no amount between {} and {} fits {} decimal(s)",
                    self.min, self.max, digits
                ),
            });
        }
        Ok((lo as u128, hi as u128))
    }

    /// Fails when no amount in the range is representable at `decimals`.
    pub fn check_precision(&self, decimals: u8) -> Result<(), ConfigError> {
        self.steps(decimals.min(MAX_SAMPLE_DIGITS)).map(|_| ())
    }

    /// Draws a uniform amount on the `decimals` grid.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        decimals: u8,
    ) -> Result<TokenAmount, ConfigError> {
        let digits = decimals.min(MAX_SAMPLE_DIGITS);
        let (lo, hi) = self.steps(digits)?;
        let step = if hi > lo { rng.gen_range(lo..=hi) } else { lo };
        Ok(TokenAmount::from_steps(step, digits, decimals))
    }
}

/// Rounds `x` with `round`, unless it is already an integer up to float noise.
fn snap(x: f64, round: fn(f64) -> f64) -> f64 {
    let nearest = x.round();
    if (x - nearest).abs() < 1e-6 {
        nearest
    } else {
        round(x)
    }
}

/// Inter-transfer delay bounds, `[min, max]` whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min_secs: u64,
    max_secs: u64,
}

impl DelayRange {
    pub fn new(min_secs: u64, max_secs: u64) -> Result<Self, ConfigError> {
        if min_secs > max_secs {
            return Err(ConfigError::InvalidValue {
                field: "delay".to_string(),
                reason: format!("min {}s is greater than max {}s", min_secs, max_secs),
            });
        }
        Ok(Self { min_secs, max_secs })
    }

    pub fn min_secs(&self) -> u64 {
        self.min_secs
    }

    pub fn max_secs(&self) -> u64 {
        self.max_secs
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_secs(rng.gen_range(self.min_secs..=self.max_secs))
    }
}

/// Share of the daily total, in percent, for sub-sessions one to three.
/// The fourth takes whatever is left.
pub const SESSION_WEIGHTS_PERCENT: [u64; 3] = [20, 10, 50];

/// A daily total split into four ordered sub-sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPlan {
    counts: [u32; 4],
}

impl SessionPlan {
    pub fn split(total: u32) -> Self {
        let n = total as u64;
        let s1 = (n * SESSION_WEIGHTS_PERCENT[0] / 100) as u32;
        let s2 = (n * SESSION_WEIGHTS_PERCENT[1] / 100) as u32;
        let s3 = (n * SESSION_WEIGHTS_PERCENT[2] / 100) as u32;
        let s4 = total - s1 - s2 - s3;
        Self {
            counts: [s1, s2, s3, s4],
        }
    }

    pub fn counts(&self) -> [u32; 4] {
        self.counts
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }
}

/// Which configured accounts take part in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialScope {
    /// Only the first configured account sends.
    #[default]
    First,
    /// Every account sends; accounts run side by side.
    All,
}

impl std::str::FromStr for CredentialScope {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(CredentialScope::First),
            "all" => Ok(CredentialScope::All),
            other => Err(ConfigError::InvalidValue {
                field: "credential_scope".to_string(),
                reason: format!("expected 'first' or 'all', got '{}'", other),
            }),
        }
    }
}

pub const DEFAULT_DAILY_TRANSFERS: u32 = 100;
pub const DEFAULT_SESSION_PAUSE: Duration = Duration::from_secs(65 * 60);

/// Daily wake time, 07:30 local.
pub fn default_wake_at() -> NaiveTime {
    NaiveTime::from_hms_opt(7, 30, 0).unwrap_or(NaiveTime::MIN)
}

/// Daily session layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub daily_transfers: u32,
    pub session_pause: Duration,
    pub wake_at: NaiveTime,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            daily_transfers: DEFAULT_DAILY_TRANSFERS,
            session_pause: DEFAULT_SESSION_PAUSE,
            wake_at: default_wake_at(),
        }
    }
}

impl ScheduleConfig {
    pub fn with_daily_transfers(mut self, daily_transfers: u32) -> Self {
        self.daily_transfers = daily_transfers;
        self
    }

    pub fn with_session_pause(mut self, pause: Duration) -> Self {
        self.session_pause = pause;
        self
    }

    pub fn with_wake_at(mut self, wake_at: NaiveTime) -> Self {
        self.wake_at = wake_at;
        self
    }

    /// Parses an `HH:MM` wake time.
    pub fn parse_wake_at(value: &str) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| ConfigError::InvalidValue {
            field: "wake_at".to_string(),
            reason: format!("'{}' is not HH:MM ({})", value, e),
        })
    }

    pub fn plan(&self) -> SessionPlan {
        SessionPlan::split(self.daily_transfers)
    }
}

/// Snapshot handed to the dispatcher and scheduler when a run starts.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    accounts: Vec<Account>,
    pub amount: AmountRange,
    pub delay: DelayRange,
    pub schedule: ScheduleConfig,
    pub scope: CredentialScope,
    pub retry: EscalationPolicy,
}

impl DispatchConfig {
    pub fn new(
        accounts: Vec<Account>,
        amount: AmountRange,
        delay: DelayRange,
        schedule: ScheduleConfig,
        scope: CredentialScope,
    ) -> Result<Self, DispatchError> {
        if accounts.is_empty() {
            return Err(DispatchError::NoAccounts);
        }
        Ok(Self {
            accounts,
            amount,
            delay,
            schedule,
            scope,
            retry: EscalationPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: EscalationPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// Accounts that take part according to the credential scope.
    pub fn accounts_in_scope(&self) -> &[Account] {
        match self.scope {
            CredentialScope::First => &self.accounts[..1],
            CredentialScope::All => &self.accounts,
        }
    }
}
