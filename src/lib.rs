//! obsquery: the query layer between tool callers and an observability backend.
//!
//! Time expressions resolve against a single `now` ([`query::time`]), service
//! health is derived from concurrent pre-aggregated metric queries
//! ([`query::stats`]), and every list-shaped result is bounded
//! ([`query::window`], [`query::truncate`]). [`tools`] exposes these as named
//! operations over JSON arguments.

pub mod backend;
pub mod config;
pub mod errors;
pub mod models;
pub mod query;
pub mod tools;
