//! Integer-cents money primitives. Every component above this module does
//! currency math in signed 64-bit cents; floating point appears only at the
//! feed boundary where the provider reports dollar amounts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, CoreResult};

/// Signed cent amount. Negative means money in, positive means money out.
pub type Cents = i64;

/// The only currency this version supports. The field exists on domain types
/// for future extension, but all arithmetic assumes a single currency.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Currency {
    #[default]
    #[serde(rename = "USD")]
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Converts a feed-reported dollar amount to cents, rounding half away from
/// zero so that -10.005 and 10.005 land symmetrically.
pub fn dollars_to_cents(amount: f64) -> Cents {
    (amount * 100.0).round() as Cents
}

/// Rejects any currency other than USD.
pub fn usd_or_reject(currency: &str) -> CoreResult<Currency> {
    if currency != "USD" {
        return Err(CoreError::Validation(
            "Only USD currency is supported".into(),
        ));
    }
    Ok(Currency::Usd)
}
