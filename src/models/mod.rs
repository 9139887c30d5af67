//! Core data models for the mortgage calculation engine.
//!
//! This module contains the loan request consumed by the engine and the
//! calculation result it produces.

mod calculation_result;
mod loan_request;

pub use calculation_result::{
    AuditStep, AuditTrace, AuditWarning, CalculationResult, ClosingCosts, ContributionCap,
    ContributionLimits, Credits, EscrowDeposit, LoanDetails, MonthlyPayment, PrepaidItems,
    TitleInsurance, WarningSeverity,
};
pub use loan_request::{
    DEFAULT_CREDIT_SCORE, DownPayment, LoanRequest, LoanType, Occupancy, TransactionType,
    VaDetails, VaService, VaUsage,
};
