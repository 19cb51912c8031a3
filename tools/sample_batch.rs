//! Sample Batch Generator
//!
//! Writes a synthetic customer CSV for a feature schema, ready to upload to the
//! batch view or `POST /api/v1/batch`.

use anyhow::{Context, Result};
use churniq::types::schema::FeatureSchema;
use clap::Parser;
use rand::Rng;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "Generate a synthetic churn batch CSV")]
struct Args {
    /// Feature schema (JSON array of column names)
    #[arg(short, long, default_value = "models/feature_names.json")]
    schema: PathBuf,

    /// Output CSV path
    #[arg(short, long, default_value = "sample_customers.csv")]
    output: PathBuf,

    /// Number of customers to generate
    #[arg(short = 'n', long, default_value_t = 100)]
    count: u64,

    /// Fraction of customers with a high-risk profile
    #[arg(long, default_value_t = 0.25)]
    risky_rate: f64,
}

/// One synthetic customer, before projection onto the schema
struct Customer {
    id: String,
    senior: bool,
    tenure: u32,
    monthly_charges: f64,
    month_to_month: bool,
    fiber: bool,
    no_tech_support: bool,
    manual_payment: bool,
    services: u32,
}

impl Customer {
    /// Value for a schema column; unknown columns get 0
    fn value(&self, column: &str) -> String {
        let flag = |b: bool| (if b { "1" } else { "0" }).to_string();
        match column {
            "SeniorCitizen" => flag(self.senior),
            "tenure" => self.tenure.to_string(),
            "MonthlyCharges" => format!("{:.2}", self.monthly_charges),
            "TotalCharges" => format!("{:.2}", self.monthly_charges * self.tenure as f64),
            "is_month_to_month" => flag(self.month_to_month),
            "fiber_risk_flag" => flag(self.fiber),
            "support_gap" => flag(self.no_tech_support),
            "manual_payment_flag" => flag(self.manual_payment),
            "service_complexity_score" => self.services.to_string(),
            "avg_monthly_spend" => {
                format!("{:.2}", self.monthly_charges * self.tenure as f64 / (self.tenure as f64 + 1.0))
            }
            _ => "0".to_string(),
        }
    }
}

/// Customer generator for testing
struct CustomerGenerator {
    rng: rand::rngs::ThreadRng,
    customer_counter: u64,
}

impl CustomerGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            customer_counter: 0,
        }
    }

    fn next_id(&mut self) -> String {
        self.customer_counter += 1;
        let counter = self.customer_counter;
        format!(
            "{:04}-{}",
            counter,
            self.random_choice(&["VHVEG", "GNVDE", "QPYBK", "CFOCW", "HQITU"])
        )
    }

    /// Long-tenure customer on a contract with support
    fn generate_loyal(&mut self) -> Customer {
        Customer {
            id: self.next_id(),
            senior: self.rng.gen_bool(0.1),
            tenure: self.rng.gen_range(24..=72),
            monthly_charges: self.rng.gen_range(20.0..90.0),
            month_to_month: self.rng.gen_bool(0.15),
            fiber: self.rng.gen_bool(0.3),
            no_tech_support: self.rng.gen_bool(0.2),
            manual_payment: self.rng.gen_bool(0.2),
            services: self.rng.gen_range(2..=6),
        }
    }

    /// New month-to-month customer with few services
    fn generate_risky(&mut self) -> Customer {
        Customer {
            id: self.next_id(),
            senior: self.rng.gen_bool(0.3),
            tenure: self.rng.gen_range(0..12),
            monthly_charges: self.rng.gen_range(70.0..120.0),
            month_to_month: true,
            fiber: self.rng.gen_bool(0.8),
            no_tech_support: self.rng.gen_bool(0.8),
            manual_payment: self.rng.gen_bool(0.7),
            services: self.rng.gen_range(0..=2),
        }
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_batch=info".parse()?),
        )
        .init();

    let args = Args::parse();
    if !(0.0..=1.0).contains(&args.risky_rate) {
        anyhow::bail!("--risky-rate must lie in [0, 1], got {}", args.risky_rate);
    }

    let schema = FeatureSchema::load(&args.schema)
        .with_context(|| format!("Failed to load schema from {}", args.schema.display()))?;
    info!(
        schema = %args.schema.display(),
        features = schema.len(),
        count = args.count,
        risky_rate = args.risky_rate,
        "Configuration loaded"
    );

    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    let mut header = vec!["customerID".to_string()];
    header.extend(schema.names().iter().cloned());
    writer.write_record(&header)?;

    let mut generator = CustomerGenerator::new();
    let mut rng = rand::thread_rng();
    let mut risky_count = 0;

    for _ in 0..args.count {
        let customer = if rng.gen_bool(args.risky_rate) {
            risky_count += 1;
            generator.generate_risky()
        } else {
            generator.generate_loyal()
        };

        let mut record = vec![customer.id.clone()];
        record.extend(schema.names().iter().map(|column| customer.value(column)));
        writer.write_record(&record)?;
    }
    writer.flush()?;

    info!(
        output = %args.output.display(),
        customers = args.count,
        risky = risky_count,
        "Sample batch written"
    );

    Ok(())
}
