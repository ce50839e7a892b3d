//! Command line structure
//!
//! Defaults come from `MonitorConfig::from_env()`; flags given here
//! override them for a single invocation.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};

use crate::logic::sensor::Parameter;

/// ENMOS - sensor monitoring and predictive maintenance
#[derive(Parser)]
#[command(name = "enmos")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(short, long, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Model artifact directory
    #[arg(long, global = true)]
    pub models_dir: Option<PathBuf>,

    /// Combined dataset (JSON Lines)
    #[arg(long, global = true)]
    pub dataset: Option<PathBuf>,

    /// Anomaly log file
    #[arg(long, global = true)]
    pub anomaly_log: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// One injected reading for `generate --spike`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpikeArg {
    pub index: usize,
    pub parameter: Parameter,
    pub value: f64,
}

impl FromStr for SpikeArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (Some(index), Some(parameter), Some(value)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("expected INDEX:PARAMETER:VALUE, got '{}'", s));
        };

        let index = index
            .trim()
            .parse::<usize>()
            .map_err(|e| format!("bad index '{}': {}", index, e))?;
        let parameter = parameter.parse::<Parameter>().map_err(|e| e.to_string())?;
        let value = value
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("bad value '{}': {}", value, e))?;
        if !value.is_finite() {
            return Err(format!("spike value must be finite, got {}", value));
        }

        Ok(Self { index, parameter, value })
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a labelled synthetic dataset
    Generate {
        /// Days of minute data
        #[arg(long, default_value_t = 30)]
        days: u32,

        /// Generator seed
        #[arg(long)]
        seed: Option<u64>,

        /// Per-timestep anomaly probability
        #[arg(long, default_value_t = 0.0005)]
        anomaly_probability: f64,

        /// Also export the dataset as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Force an anomaly, as INDEX:PARAMETER:VALUE (repeatable)
        #[arg(long = "spike", value_name = "INDEX:PARAMETER:VALUE")]
        spikes: Vec<SpikeArg>,
    },

    /// Train detectors and the maintenance predictor
    Train {
        /// Sliding window length
        #[arg(long)]
        window: Option<usize>,

        /// Expected outlier share in training data, in [0, 0.5)
        #[arg(long)]
        contamination: Option<f64>,

        /// Also fit the recurrent model for this many epochs
        #[arg(long)]
        sequence_epochs: Option<usize>,
    },

    /// Summarise a dataset (energy, seasonality, threshold labels)
    Inspect {
        /// Restrict to one parameter
        #[arg(long)]
        parameter: Option<String>,

        /// Threshold in standard deviations
        #[arg(long, default_value_t = 3.0)]
        threshold_std: f64,
    },

    /// Run the live monitor
    Monitor {
        /// Sensor data file written by the serial bridge
        #[arg(long)]
        sensor_file: Option<PathBuf>,

        /// Receiver base URL
        #[arg(long)]
        receiver_url: Option<String>,

        /// Skip receiver polling
        #[arg(long)]
        no_receiver: bool,

        /// Poll interval in seconds
        #[arg(long)]
        interval: Option<u64>,

        /// Stop after this many polls
        #[arg(long)]
        ticks: Option<u64>,

        /// Detection method (isolation_forest | sequence)
        #[arg(long, default_value = "isolation_forest")]
        method: String,
    },

    /// Show model, dataset and log status
    Status,

    /// Inspect or reset the anomaly log
    #[command(subcommand)]
    Log(LogCommands),
}

#[derive(Subcommand)]
pub enum LogCommands {
    /// Most recent entries
    Recent {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Aggregate counts
    Stats,

    /// Remove every entry
    Clear,
}
