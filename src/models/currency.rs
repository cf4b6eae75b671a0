//! Supported currency codes.
//!
//! Currencies travel across the API boundary as ISO 4217 codes (`"USD"`,
//! `"IDR"`, ...). Parsing is case-insensitive; serialization always emits
//! the uppercase code.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A currency the ledger knows about.
///
/// Whether a currency is actually *accepted* is decided by the
/// [`CurrencyRegistry`](crate::services::currency_registry::CurrencyRegistry)
/// in use, which may carry a narrower table than this enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Aud,
    Sgd,
    Myr,
    Thb,
    Php,
    Cny,
    Idr,
    Vnd,
}

impl Currency {
    pub const ALL: [Currency; 11] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Aud,
        Currency::Sgd,
        Currency::Myr,
        Currency::Thb,
        Currency::Php,
        Currency::Cny,
        Currency::Idr,
        Currency::Vnd,
    ];

    /// ISO 4217 code.
    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Aud => "AUD",
            Currency::Sgd => "SGD",
            Currency::Myr => "MYR",
            Currency::Thb => "THB",
            Currency::Php => "PHP",
            Currency::Cny => "CNY",
            Currency::Idr => "IDR",
            Currency::Vnd => "VND",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        Currency::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or_else(|| format!("Unknown currency: {}", s))
    }
}

impl TryFrom<String> for Currency {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.code().to_string()
    }
}
