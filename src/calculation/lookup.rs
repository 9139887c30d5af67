//! Rate table lookup helpers.
//!
//! Two lookups are shared by every calculator:
//!
//! - [`tiered_lookup`] finds the first tier of an ascending schedule whose
//!   threshold covers a value. Used by conventional PMI, the FHA LTV
//!   categories, and both title insurance schedules.
//! - [`lookup_cell`] resolves a matrix cell with a declared fallback policy.
//!   A missing cell is never an error: it resolves to a fallback cell or a
//!   documented default and is logged. Used by the FHA MIP matrix and the VA
//!   funding fee matrix.
//!
//! A missing top-level section is a different failure, reported by the
//! [`RateTableConfig`](crate::config::RateTableConfig) section accessors as
//! [`EngineError::Configuration`].

use rust_decimal::Decimal;
use tracing::warn;

use crate::config::Tier;
use crate::error::{EngineError, EngineResult};

/// Finds the tier that applies to `value`.
///
/// Tiers are sorted ascending by threshold; the first tier whose `up_to` is
/// at or above `value` wins, and the unbounded last tier matches anything.
///
/// # Errors
///
/// Returns [`EngineError::Configuration`] when no tier matches, which only
/// happens for an empty schedule or one without an unbounded last tier.
///
/// # Examples
///
/// ```
/// use mortgage_engine::calculation::tiered_lookup;
/// use mortgage_engine::config::Tier;
/// use rust_decimal_macros::dec;
///
/// let tiers = vec![
///     Tier::bounded(dec!(85), dec!(0.30)),
///     Tier::bounded(dec!(90), dec!(0.52)),
///     Tier::unbounded(dec!(0.85)),
/// ];
/// assert_eq!(tiered_lookup(&tiers, dec!(90), "pmi").unwrap().rate, dec!(0.52));
/// assert_eq!(tiered_lookup(&tiers, dec!(97), "pmi").unwrap().rate, dec!(0.85));
/// ```
pub fn tiered_lookup<'a>(tiers: &'a [Tier], value: Decimal, table: &str) -> EngineResult<&'a Tier> {
    tiers
        .iter()
        .find(|tier| tier.up_to.is_none_or(|up_to| value <= up_to))
        .ok_or_else(|| EngineError::Configuration {
            section: table.to_string(),
            message: format!("no tier covers {}", value),
        })
}

/// How a matrix cell was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellLookup<T> {
    /// The requested cell exists.
    Found(T),
    /// The requested cell is missing; the declared fallback cell was used.
    Fallback(T),
    /// Neither cell exists; the documented default was used.
    Default(T),
}

impl<T> CellLookup<T> {
    /// Returns the resolved value however it was found.
    pub fn into_value(self) -> T {
        match self {
            CellLookup::Found(v) | CellLookup::Fallback(v) | CellLookup::Default(v) => v,
        }
    }

    /// Returns true if the requested cell was missing.
    pub fn is_degraded(&self) -> bool {
        !matches!(self, CellLookup::Found(_))
    }
}

/// Resolves a matrix cell: the requested cell, else the fallback cell, else
/// the default.
///
/// Every miss is logged at `warn` with the table and key.
pub fn lookup_cell<T: std::fmt::Debug>(
    cell: Option<T>,
    fallback: Option<T>,
    default: T,
    table: &str,
    key: &str,
) -> CellLookup<T> {
    if let Some(value) = cell {
        return CellLookup::Found(value);
    }

    match fallback {
        Some(value) => {
            warn!(table, key, fallback = ?value, "Rate table cell missing, using fallback cell");
            CellLookup::Fallback(value)
        }
        None => {
            warn!(table, key, default = ?default, "Rate table cell missing, using default");
            CellLookup::Default(default)
        }
    }
}
