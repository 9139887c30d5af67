//! Rate table configuration for the mortgage calculation engine.
//!
//! This module provides the [`RateTableConfig`] snapshot read by every
//! calculation, and a [`ConfigLoader`] that builds one from a YAML file.
//!
//! # Example
//!
//! ```no_run
//! use mortgage_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/rate_tables.yaml").unwrap().into_config();
//! println!("Max rate: {}%", config.limits().unwrap().max_interest_rate);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    AmountCategory, ClosingCostItem, ClosingCostTable, ContributionBracket, CreditScoreBand,
    DownPaymentBracket, FhaTable, FundingFeeMatrix, Limits, LoanTypeLimits, LoanTypeTable,
    PmiTable, PrepaidTable, RateTableConfig, SellerContributionTable, TermCategory, Tier,
    TitleInsuranceTable, UsdaTable, VaConcessionRule, VaTable,
};
