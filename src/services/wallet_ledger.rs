//! Wallet ledger - balances, frozen funds and rolling usage limits.
//!
//! This service handles:
//! - Wallet creation with registry default limits
//! - Aggregated invariant validation
//! - Lazy daily/monthly usage resets
//! - Debit, credit, freeze and unfreeze of funds
//! - Status transitions
//!
//! # All-or-nothing mutation
//!
//! Every mutator applies its change to a copy of the wallet and only writes
//! the copy back once it re-validates. A rejected operation leaves the
//! wallet exactly as it was.
//!
//! # Concurrency
//!
//! Nothing here locks. `can_send` followed by `debit` is only safe if the
//! caller holds exclusive access to the wallet for the whole sequence;
//! see [`LedgerStore`](crate::store::LedgerStore).

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use uuid::Uuid;

use crate::{
    error::LedgerError,
    models::wallet::{CreateWalletRequest, Wallet, WalletStatus},
    services::currency_registry::CurrencyRegistry,
};

/// Creates wallets from requests using the injected currency table.
#[derive(Debug, Clone)]
pub struct WalletLedger {
    registry: Arc<CurrencyRegistry>,
}

impl WalletLedger {
    pub fn new(registry: Arc<CurrencyRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &CurrencyRegistry {
        &self.registry
    }

    /// Create a new active wallet.
    ///
    /// Limits come from the registry defaults for the currency and both
    /// reset markers start at `now`.
    ///
    /// # Errors
    ///
    /// - `UnsupportedCurrency`: the registry does not carry the currency
    /// - `Validation`: the request produced an invalid wallet (nil user id)
    pub fn create(
        &self,
        request: &CreateWalletRequest,
        now: DateTime<Utc>,
    ) -> Result<Wallet, LedgerError> {
        let currency = self.registry.parse(&request.currency)?;
        let (daily_limit, monthly_limit) = self.registry.default_limits(currency)?;

        let wallet = Wallet {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            currency,
            balance: 0,
            frozen_balance: 0,
            daily_limit,
            monthly_limit,
            used_this_day: 0,
            used_this_month: 0,
            last_daily_reset: now,
            last_monthly_reset: now,
            status: WalletStatus::Active,
            is_primary: request.is_primary,
            created_at: now,
            updated_at: now,
        };

        wallet.validate()?;
        Ok(wallet)
    }
}

/// Usage counters as they stand at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingUsage {
    pub used_this_day: i64,
    pub used_this_month: i64,
    pub last_daily_reset: DateTime<Utc>,
    pub last_monthly_reset: DateTime<Utc>,
}

fn same_month(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// `used + amount` would breach a nonzero `limit`.
fn exceeds(limit: i64, used: i64, amount: i64) -> bool {
    limit > 0 && used.saturating_add(amount) > limit
}

impl Wallet {
    /// Every invariant this wallet currently violates.
    pub fn violations(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.user_id.is_nil() {
            errors.push("user_id is required".to_string());
        }
        if self.balance < 0 {
            errors.push(format!("balance cannot be negative ({})", self.balance));
        }
        if self.frozen_balance < 0 {
            errors.push(format!(
                "frozen_balance cannot be negative ({})",
                self.frozen_balance
            ));
        }
        if self.frozen_balance > self.balance {
            errors.push(format!(
                "frozen_balance ({}) cannot exceed balance ({})",
                self.frozen_balance, self.balance
            ));
        }
        if self.daily_limit < 0 {
            errors.push(format!("daily_limit cannot be negative ({})", self.daily_limit));
        }
        if self.monthly_limit < 0 {
            errors.push(format!(
                "monthly_limit cannot be negative ({})",
                self.monthly_limit
            ));
        }
        if self.daily_limit > 0 && self.monthly_limit > 0 && self.daily_limit > self.monthly_limit
        {
            errors.push(format!(
                "daily_limit ({}) cannot exceed monthly_limit ({})",
                self.daily_limit, self.monthly_limit
            ));
        }
        if self.used_this_day < 0 {
            errors.push("used_this_day cannot be negative".to_string());
        }
        if self.used_this_month < 0 {
            errors.push("used_this_month cannot be negative".to_string());
        }
        if self.status == WalletStatus::Closed && (self.balance != 0 || self.frozen_balance != 0) {
            errors.push("closed wallet must have zero balance".to_string());
        }

        errors
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        LedgerError::check(self.violations())
    }

    /// Usage counters as seen at `now`.
    ///
    /// A counter whose reset marker falls on an earlier calendar day
    /// (or month) reads as zero, with the marker moved to `now`.
    pub fn rolling_usage(&self, now: DateTime<Utc>) -> RollingUsage {
        let mut usage = RollingUsage {
            used_this_day: self.used_this_day,
            used_this_month: self.used_this_month,
            last_daily_reset: self.last_daily_reset,
            last_monthly_reset: self.last_monthly_reset,
        };

        if self.last_daily_reset.date_naive() != now.date_naive() {
            usage.used_this_day = 0;
            usage.last_daily_reset = now;
        }
        if !same_month(self.last_monthly_reset, now) {
            usage.used_this_month = 0;
            usage.last_monthly_reset = now;
        }

        usage
    }

    /// Apply [`rolling_usage`](Wallet::rolling_usage) to the stored counters.
    pub fn refresh_rolling_usage(&mut self, now: DateTime<Utc>) {
        let usage = self.rolling_usage(now);
        self.used_this_day = usage.used_this_day;
        self.used_this_month = usage.used_this_month;
        self.last_daily_reset = usage.last_daily_reset;
        self.last_monthly_reset = usage.last_monthly_reset;
    }

    /// Check whether `amount` could be debited at `now`.
    ///
    /// # Errors
    ///
    /// - `WalletNotActive`: only active wallets send funds
    /// - `InvalidAmount`: amount is zero or negative
    /// - `InsufficientBalance`: amount exceeds `balance - frozen_balance`
    /// - `DailyLimitExceeded` / `MonthlyLimitExceeded`: a nonzero limit
    ///   would be breached after refreshing the rolling counters
    pub fn can_send(&self, amount: i64, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.status != WalletStatus::Active {
            return Err(LedgerError::WalletNotActive(self.status));
        }
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let available = self.available_balance();
        if amount > available {
            return Err(LedgerError::InsufficientBalance {
                available,
                requested: amount,
            });
        }

        let usage = self.rolling_usage(now);
        if exceeds(self.daily_limit, usage.used_this_day, amount) {
            return Err(LedgerError::DailyLimitExceeded {
                limit: self.daily_limit,
                used: usage.used_this_day,
                requested: amount,
            });
        }
        if exceeds(self.monthly_limit, usage.used_this_month, amount) {
            return Err(LedgerError::MonthlyLimitExceeded {
                limit: self.monthly_limit,
                used: usage.used_this_month,
                requested: amount,
            });
        }

        Ok(())
    }

    /// Check whether `amount` could be credited.
    ///
    /// Active and suspended wallets can receive; frozen and closed cannot.
    pub fn can_receive(&self, amount: i64) -> Result<(), LedgerError> {
        if !matches!(self.status, WalletStatus::Active | WalletStatus::Suspended) {
            return Err(LedgerError::WalletCannotReceive(self.status));
        }
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        Ok(())
    }

    /// Remove `amount` from the wallet and count it against both limits.
    pub fn debit(&mut self, amount: i64, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.can_send(amount, now)?;

        self.commit(now, |w| {
            w.refresh_rolling_usage(now);
            w.balance = w
                .balance
                .checked_sub(amount)
                .ok_or(LedgerError::Overflow)?;
            w.used_this_day = w
                .used_this_day
                .checked_add(amount)
                .ok_or(LedgerError::Overflow)?;
            w.used_this_month = w
                .used_this_month
                .checked_add(amount)
                .ok_or(LedgerError::Overflow)?;
            Ok(())
        })
    }

    /// Add `amount` to the wallet. Incoming funds do not touch usage counters.
    pub fn credit(&mut self, amount: i64, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.can_receive(amount)?;

        self.commit(now, |w| {
            w.balance = w
                .balance
                .checked_add(amount)
                .ok_or(LedgerError::Overflow)?;
            Ok(())
        })
    }

    /// Earmark `amount` of the available balance. Total balance is unchanged.
    pub fn freeze_funds(&mut self, amount: i64, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.ensure_open()?;
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let available = self.available_balance();
        if amount > available {
            return Err(LedgerError::InsufficientBalance {
                available,
                requested: amount,
            });
        }

        self.commit(now, |w| {
            w.frozen_balance += amount;
            Ok(())
        })
    }

    /// Release `amount` of frozen funds back to the available balance.
    pub fn unfreeze_funds(&mut self, amount: i64, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.ensure_open()?;
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        if amount > self.frozen_balance {
            return Err(LedgerError::InsufficientFrozenBalance {
                frozen: self.frozen_balance,
                requested: amount,
            });
        }

        self.commit(now, |w| {
            w.frozen_balance -= amount;
            Ok(())
        })
    }

    pub fn activate(&mut self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.set_status(WalletStatus::Active, now)
    }

    pub fn suspend(&mut self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.set_status(WalletStatus::Suspended, now)
    }

    /// Freeze the whole wallet (status), as opposed to freezing funds.
    pub fn freeze(&mut self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.set_status(WalletStatus::Frozen, now)
    }

    /// Close the wallet for good. Only empty wallets can be closed.
    pub fn close(&mut self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.ensure_open()?;
        if self.balance != 0 || self.frozen_balance != 0 {
            return Err(LedgerError::WalletNotEmpty {
                balance: self.balance,
                frozen_balance: self.frozen_balance,
            });
        }

        self.commit(now, |w| {
            w.status = WalletStatus::Closed;
            w.is_primary = false;
            Ok(())
        })
    }

    /// Flip the primary flag.
    ///
    /// At most one primary wallet per user is a storage-level rule; the
    /// entity does not know about its siblings.
    pub fn set_primary(&mut self, is_primary: bool, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.ensure_open()?;
        self.commit(now, |w| {
            w.is_primary = is_primary;
            Ok(())
        })
    }

    /// Replace both usage limits. Zero disables a limit.
    pub fn update_limits(
        &mut self,
        daily_limit: i64,
        monthly_limit: i64,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.ensure_open()?;
        self.commit(now, |w| {
            w.daily_limit = daily_limit;
            w.monthly_limit = monthly_limit;
            Ok(())
        })
    }

    fn set_status(&mut self, status: WalletStatus, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.ensure_open()?;
        self.commit(now, |w| {
            w.status = status;
            Ok(())
        })
    }

    fn ensure_open(&self) -> Result<(), LedgerError> {
        if self.status == WalletStatus::Closed {
            return Err(LedgerError::WalletClosed);
        }
        Ok(())
    }

    /// Run `change` on a copy, re-validate, then write the copy back.
    fn commit<F>(&mut self, now: DateTime<Utc>, change: F) -> Result<(), LedgerError>
    where
        F: FnOnce(&mut Wallet) -> Result<(), LedgerError>,
    {
        let mut next = self.clone();
        change(&mut next)?;
        next.updated_at = now;
        next.validate()?;

        *self = next;
        Ok(())
    }
}
