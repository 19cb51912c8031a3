//! Command-line interface definitions and argument parsing

use crate::types::customer::CustomerSignals;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Customer churn risk dashboard
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Serve the dashboard and JSON API (default)
    Serve,

    /// Score a single customer and print the assessment as JSON
    Predict {
        /// Months with the company
        #[arg(long, default_value_t = 12, value_parser = clap::value_parser!(u32).range(0..=72))]
        tenure: u32,

        /// Monthly charges in dollars
        #[arg(long, default_value_t = 70, value_parser = clap::value_parser!(u32).range(20..=120))]
        monthly_charges: u32,

        /// Customer is on a month-to-month contract
        #[arg(long)]
        month_to_month: bool,

        /// Customer has fiber internet
        #[arg(long)]
        fiber: bool,

        /// Customer has no tech support
        #[arg(long)]
        no_tech_support: bool,

        /// Customer pays manually
        #[arg(long)]
        manual_payment: bool,

        /// Number of subscribed services
        #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(0..=6))]
        complexity: u32,
    },

    /// Score a CSV file offline and write the scored table
    Score {
        /// Input CSV with every feature column
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the scored CSV
        #[arg(short, long, default_value = "churn_predictions.csv")]
        output: PathBuf,
    },
}

impl Args {
    /// Subcommand to run, `serve` when none is given
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

impl Command {
    /// Customer signals from `predict` flags
    pub fn customer_signals(&self) -> Option<CustomerSignals> {
        match self {
            Command::Predict {
                tenure,
                monthly_charges,
                month_to_month,
                fiber,
                no_tech_support,
                manual_payment,
                complexity,
            } => Some(CustomerSignals {
                tenure: *tenure,
                monthly_charges: *monthly_charges,
                is_month_to_month: *month_to_month,
                fiber_internet: *fiber,
                no_tech_support: *no_tech_support,
                manual_payment: *manual_payment,
                service_complexity: *complexity,
            }),
            _ => None,
        }
    }
}
