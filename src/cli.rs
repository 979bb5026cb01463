//! # Command Line
//!
//! Operator-facing entry point to the host callbacks. Every subcommand
//! prints one JSON document on stdout; logs go to stderr.
//!
//! ## Usage
//!
//! ```bash
//! # Create a load balancer from a state file
//! zenlayercloud-provider create zenlayercloud_zlb_instance --state lb.json
//!
//! # Update a key pair description
//! zenlayercloud-provider update zenlayercloud_key_pair --prior old.json --planned new.json
//!
//! # Import a private DNS record by composite id
//! zenlayercloud-provider import zenlayercloud_pvtdns_record zone-1:rec-9
//!
//! # List load balancers matching a query
//! zenlayercloud-provider query zenlayercloud_zlb_instances --query filter.json
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::context::{OperationContext, Timeouts};
use crate::provider::{HostResponse, Provider};

/// Zenlayer Cloud provider
#[derive(Debug, Parser)]
#[command(name = "zenlayercloud-provider", version)]
#[command(
    about = "Drive Zenlayer Cloud resources through the provider lifecycle",
    long_about = None,
    after_help = "\
Credentials are read from ZENLAYERCLOUD_ACCESS_KEY_ID and ZENLAYERCLOUD_ACCESS_KEY_PASSWORD.

Examples:
  zenlayercloud-provider types
  zenlayercloud-provider read zenlayercloud_key_pair --state key.json
  zenlayercloud-provider delete zenlayercloud_zlb_instance --state lb.json --timeout-secs 900
"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Timeout for every operation, in seconds (defaults per operation otherwise)
    #[arg(long, global = true, value_name = "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// Print Prometheus metrics to stderr after the command
    #[arg(long, global = true)]
    pub dump_metrics: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a resource from a planned state file
    Create {
        #[arg(value_name = "TYPE")]
        resource_type: String,
        #[arg(long, value_name = "FILE")]
        state: PathBuf,
    },
    /// Refresh a resource from a state file
    Read {
        #[arg(value_name = "TYPE")]
        resource_type: String,
        #[arg(long, value_name = "FILE")]
        state: PathBuf,
    },
    /// Apply the difference between two state files
    Update {
        #[arg(value_name = "TYPE")]
        resource_type: String,
        #[arg(long, value_name = "FILE")]
        prior: PathBuf,
        #[arg(long, value_name = "FILE")]
        planned: PathBuf,
    },
    /// Delete the resource described by a state file
    Delete {
        #[arg(value_name = "TYPE")]
        resource_type: String,
        #[arg(long, value_name = "FILE")]
        state: PathBuf,
    },
    /// Bind state to an existing remote resource
    Import {
        #[arg(value_name = "TYPE")]
        resource_type: String,
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Run a data source query
    Query {
        #[arg(value_name = "DATA_SOURCE")]
        data_source: String,
        /// Query file; an empty query is used when omitted
        #[arg(long, value_name = "FILE")]
        query: Option<PathBuf>,
    },
    /// List resource and data source type names
    Types,
}

/// What a command printed
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Response(HostResponse),
    Types(Value),
}

impl Output {
    /// True if the host response carries an error diagnostic
    #[must_use]
    pub fn has_errors(&self) -> bool {
        match self {
            Self::Response(response) => response.has_errors(),
            Self::Types(_) => false,
        }
    }

    /// JSON document printed on stdout
    ///
    /// # Errors
    /// Returns an error if the response cannot be serialized.
    pub fn to_json(&self) -> Result<String> {
        let value = match self {
            Self::Response(response) => serde_json::to_value(response)?,
            Self::Types(types) => types.clone(),
        };
        serde_json::to_string_pretty(&value).context("Failed to serialize output")
    }
}

impl Cli {
    /// Context for the command's host call
    #[must_use]
    pub fn operation_context(&self) -> OperationContext {
        let timeouts = self
            .timeout_secs
            .map(|secs| Timeouts::uniform(Duration::from_secs(secs)))
            .unwrap_or_default();
        OperationContext::new(timeouts)
    }

    /// Run the command against `provider`
    ///
    /// # Errors
    /// Returns an error for unknown type names and unreadable input files.
    /// Failures of the operation itself are reported as diagnostics.
    pub async fn execute(&self, provider: &Provider, ctx: &OperationContext) -> Result<Output> {
        let response = match &self.command {
            Command::Create {
                resource_type,
                state,
            } => {
                let state = read_json(state).await?;
                resource(provider, resource_type)?.create(ctx, state).await
            }
            Command::Read {
                resource_type,
                state,
            } => {
                let state = read_json(state).await?;
                resource(provider, resource_type)?.read(ctx, state).await
            }
            Command::Update {
                resource_type,
                prior,
                planned,
            } => {
                let prior = read_json(prior).await?;
                let planned = read_json(planned).await?;
                resource(provider, resource_type)?
                    .update(ctx, prior, planned)
                    .await
            }
            Command::Delete {
                resource_type,
                state,
            } => {
                let state = read_json(state).await?;
                resource(provider, resource_type)?.delete(ctx, state).await
            }
            Command::Import { resource_type, id } => {
                resource(provider, resource_type)?.import(ctx, id).await
            }
            Command::Query { data_source, query } => {
                let query = match query {
                    Some(path) => read_json(path).await?,
                    None => json!({}),
                };
                let Some(data_source) = provider.data_source(data_source) else {
                    bail!(
                        "Unknown data source `{data_source}`; available: {}",
                        provider.data_source_types().collect::<Vec<_>>().join(", ")
                    );
                };
                data_source.read(ctx, query).await
            }
            Command::Types => {
                return Ok(Output::Types(json!({
                    "resources": provider.resource_types().collect::<Vec<_>>(),
                    "data_sources": provider.data_source_types().collect::<Vec<_>>(),
                })));
            }
        };
        Ok(Output::Response(response))
    }
}

fn resource<'a>(
    provider: &'a Provider,
    resource_type: &str,
) -> Result<&'a dyn crate::provider::registry::DynResource> {
    provider.resource(resource_type).with_context(|| {
        format!(
            "Unknown resource type `{resource_type}`; available: {}",
            provider.resource_types().collect::<Vec<_>>().join(", ")
        )
    })
}

async fn read_json(path: &Path) -> Result<Value> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {} as JSON", path.display()))
}
