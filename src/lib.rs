//! Mortgage Calculation Engine
//!
//! This crate computes the full cost breakdown of a mortgage loan (monthly
//! payment, mortgage insurance, financed fees, closing costs, prepaid items,
//! escrow, title insurance and seller contribution limits) for conventional,
//! FHA, VA and USDA loans from a request and a set of YAML rate tables.

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
