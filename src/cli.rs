//! Command line interface for the flowq binary

use crate::config::{Config, DEFAULT_TEMPLATE_PATH};
use crate::error::Result;
use crate::query::{DEFAULT_LOOKBACK_HOURS, DEFAULT_RECORD_LIMIT, QueryRequestOptions};
use crate::utils::parse_filter_arg;
use clap::{ArgAction, Parser};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Submit a flow query, wait for it to finish, and save the results
#[derive(Parser, Debug)]
#[command(name = "flowq")]
#[command(about = "Run a flow query against a network telemetry analytics service")]
#[command(version)]
pub struct Cli {
    /// Account used to authenticate; the password is prompted for
    #[arg(short, long, env = "FLOWQ_USERNAME")]
    pub username: String,

    /// File the raw JSON results are written to
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Base URL of the analytics service
    #[arg(long, env = "FLOWQ_BASE_URL")]
    pub base_url: Option<String>,

    /// Tenant (domain) identifier
    #[arg(short, long, env = "FLOWQ_TENANT")]
    pub tenant: Option<String>,

    /// Maximum number of flow records to return
    #[arg(short = 'n', long, default_value_t = DEFAULT_RECORD_LIMIT,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub records: u64,

    /// How many hours back from now to search
    #[arg(long, default_value_t = DEFAULT_LOOKBACK_HOURS,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub hours: u32,

    /// Start from a saved query template
    #[arg(long, value_name = "PATH", num_args = 0..=1,
          default_missing_value = DEFAULT_TEMPLATE_PATH)]
    pub load: Option<PathBuf>,

    /// Save the final query body as a template
    #[arg(long, value_name = "PATH", num_args = 0..=1,
          default_missing_value = DEFAULT_TEMPLATE_PATH)]
    pub save: Option<PathBuf>,

    /// Subject (host) filter as JSON, or @FILE
    #[arg(long, visible_alias = "host", value_name = "JSON|@FILE")]
    pub subject: Option<String>,

    /// Peer filter as JSON, or @FILE
    #[arg(long, value_name = "JSON|@FILE")]
    pub peer: Option<String>,

    /// Flow filter as JSON, or @FILE
    #[arg(long, value_name = "JSON|@FILE")]
    pub flow: Option<String>,

    /// JSON settings file; command line flags take precedence
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Seconds between status polls
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Give up after this many seconds of polling
    #[arg(long, value_name = "SECS")]
    pub poll_timeout: Option<u64>,

    /// Accept untrusted TLS certificates (self-signed appliances)
    #[arg(long)]
    pub insecure: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Default log level when `RUST_LOG` is not set
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Merge the settings file (if any) with command line overrides
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.api.base_url = base_url.clone();
        }
        if let Some(tenant) = &self.tenant {
            config.api.tenant = tenant.clone();
        }
        if self.insecure {
            config.api.accept_invalid_certs = true;
        }
        if let Some(secs) = self.poll_interval {
            config.poll.interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.poll_timeout {
            config.poll.timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Request builder options for this invocation
    pub fn query_options(&self) -> Result<QueryRequestOptions> {
        Ok(QueryRequestOptions {
            record_limit: self.records,
            hours: self.hours,
            load: self.load.clone(),
            save: self.save.clone(),
            subject: parse_optional_filter("subject", self.subject.as_deref())?,
            peer: parse_optional_filter("peer", self.peer.as_deref())?,
            flow: parse_optional_filter("flow", self.flow.as_deref())?,
        })
    }
}

fn parse_optional_filter(name: &str, raw: Option<&str>) -> Result<Option<Value>> {
    raw.map(|r| parse_filter_arg(name, r)).transpose()
}
