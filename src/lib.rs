//! Zenlayer Cloud Provider Library
//!
//! Core of an infrastructure-as-code provider plugin for Zenlayer Cloud.
//!
//! - [`engine`] holds the reconciliation primitives: retries with a
//!   classified error policy, bounded pagination fan-out, status waiters,
//!   composite identifiers and set differences.
//! - [`client`] is the typed vendor REST client.
//! - [`provider`] binds resource kinds and data sources to the engine and
//!   exposes them to the host through [`provider::Provider`].

pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod engine;
pub mod observability;
pub mod provider;
