//! Currency registry - static knowledge about supported currencies.
//!
//! The registry answers four questions for every currency it carries:
//! - is it supported at all
//! - how many decimal places its minor unit has
//! - which symbol to display
//! - what the default daily/monthly wallet limits are
//!
//! All amounts are integers in the currency's minor unit. IDR and VND have
//! no fractional subdivision, so for them the minor unit *is* the major unit.
//!
//! The table is immutable once built and is handed to the ledger components
//! at construction time, so tests can substitute a narrower or stricter table.

use std::collections::HashMap;

use crate::{error::LedgerError, models::currency::Currency};

/// Static facts about a single currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyInfo {
    /// Number of digits after the decimal point (0 or 2)
    pub decimal_places: u32,

    /// Display symbol, e.g. `$` or `Rp`
    pub symbol: String,

    /// Default daily usage limit for new wallets, in minor units
    pub daily_limit: i64,

    /// Default monthly usage limit for new wallets, in minor units
    pub monthly_limit: i64,
}

impl CurrencyInfo {
    pub fn new(decimal_places: u32, symbol: &str, daily_limit: i64, monthly_limit: i64) -> Self {
        Self {
            decimal_places,
            symbol: symbol.to_string(),
            daily_limit,
            monthly_limit,
        }
    }
}

/// Lookup table of supported currencies.
#[derive(Debug, Clone)]
pub struct CurrencyRegistry {
    table: HashMap<Currency, CurrencyInfo>,
}

impl Default for CurrencyRegistry {
    /// The production table.
    ///
    /// Default limits are roughly USD 10,000 per day and USD 50,000 per
    /// month, converted and rounded per currency.
    fn default() -> Self {
        let table = HashMap::from([
            (Currency::Usd, CurrencyInfo::new(2, "$", 1_000_000, 5_000_000)),
            (Currency::Eur, CurrencyInfo::new(2, "€", 1_000_000, 5_000_000)),
            (Currency::Gbp, CurrencyInfo::new(2, "£", 800_000, 4_000_000)),
            (Currency::Aud, CurrencyInfo::new(2, "A$", 1_500_000, 7_500_000)),
            (Currency::Sgd, CurrencyInfo::new(2, "S$", 1_300_000, 6_500_000)),
            (Currency::Myr, CurrencyInfo::new(2, "RM", 4_500_000, 22_500_000)),
            (Currency::Thb, CurrencyInfo::new(2, "฿", 35_000_000, 175_000_000)),
            (Currency::Php, CurrencyInfo::new(2, "₱", 55_000_000, 275_000_000)),
            (Currency::Cny, CurrencyInfo::new(2, "¥", 7_000_000, 35_000_000)),
            (Currency::Idr, CurrencyInfo::new(0, "Rp", 150_000_000, 750_000_000)),
            (Currency::Vnd, CurrencyInfo::new(0, "₫", 250_000_000, 1_250_000_000)),
        ]);

        Self { table }
    }
}

impl CurrencyRegistry {
    /// Build a registry from an explicit table.
    pub fn new(table: HashMap<Currency, CurrencyInfo>) -> Self {
        Self { table }
    }

    pub fn is_supported(&self, currency: Currency) -> bool {
        self.table.contains_key(&currency)
    }

    /// Parse a currency code and check that this registry carries it.
    ///
    /// # Errors
    ///
    /// `UnsupportedCurrency` if the code is unknown or not in the table.
    pub fn parse(&self, code: &str) -> Result<Currency, LedgerError> {
        code.parse::<Currency>()
            .ok()
            .filter(|c| self.is_supported(*c))
            .ok_or_else(|| LedgerError::UnsupportedCurrency(code.to_string()))
    }

    pub fn info(&self, currency: Currency) -> Result<&CurrencyInfo, LedgerError> {
        self.table
            .get(&currency)
            .ok_or_else(|| LedgerError::UnsupportedCurrency(currency.to_string()))
    }

    /// Digits after the decimal point for this currency's minor unit.
    pub fn decimal_places(&self, currency: Currency) -> Result<u32, LedgerError> {
        Ok(self.info(currency)?.decimal_places)
    }

    pub fn symbol(&self, currency: Currency) -> Result<&str, LedgerError> {
        Ok(&self.info(currency)?.symbol)
    }

    /// Default `(daily, monthly)` limits in minor units.
    pub fn default_limits(&self, currency: Currency) -> Result<(i64, i64), LedgerError> {
        let info = self.info(currency)?;
        Ok((info.daily_limit, info.monthly_limit))
    }

    /// Render a minor-unit amount for humans.
    ///
    /// ```text
    /// 150000 USD -> "$ 1500.00"
    /// 150000 IDR -> "Rp 150000"
    /// -250   USD -> "$ -2.50"
    /// ```
    pub fn format_amount(&self, amount: i64, currency: Currency) -> Result<String, LedgerError> {
        let info = self.info(currency)?;
        let sign = if amount < 0 { "-" } else { "" };
        let magnitude = amount.unsigned_abs();

        if info.decimal_places == 0 {
            return Ok(format!("{} {}{}", info.symbol, sign, magnitude));
        }

        let scale = 10u64.pow(info.decimal_places);
        Ok(format!(
            "{} {}{}.{:0width$}",
            info.symbol,
            sign,
            magnitude / scale,
            magnitude % scale,
            width = info.decimal_places as usize
        ))
    }
}
