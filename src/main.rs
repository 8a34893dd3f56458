//! MallSegment: segment one new mall customer against a reference dataset
//!
//! Loads the reference customers, validates the entered customer, runs
//! K-Means over the combined set and saves a scatter plot of the clusters.

use anyhow::{Context, Result};
use clap::Parser;
use mallsegment::{viz, Args, CustomerDataset, SegmentationService};
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    // The reference dataset is loaded once; failure here is fatal
    let dataset = CustomerDataset::from_csv(&args.input)
        .with_context(|| format!("Cannot load reference dataset from {}", args.input))?;

    let form = args.customer_form();
    if let Some(gender) = form.gender {
        info!(%gender, "Gender recorded");
    }
    let new_customer = form.to_observation().context("Invalid customer information")?;

    let start_time = Instant::now();
    let service = SegmentationService::new(args.segmentation_params());
    let result = service
        .segment(&dataset, &new_customer)
        .inspect_err(|e| error!(error = %e, "Segmentation failed"))?;
    info!(
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "Segmentation finished"
    );

    let cluster = result.new_observation_cluster();
    println!(
        "New customer (age {}, income {}k$, score {}) -> {}",
        new_customer.age,
        new_customer.annual_income,
        new_customer.spending_score,
        result.labels().get(cluster).unwrap_or("unlabelled")
    );

    println!("\n=== Clusters ===");
    let total = result.len();
    for (id, size) in result.cluster_sizes() {
        let percentage = (size as f64 / total as f64) * 100.0;
        println!(
            "{}: {} customers ({:.1}%)",
            result.labels().get(id).unwrap_or("unlabelled"),
            size,
            percentage
        );
    }

    viz::render_scatter(&result, &args.output, None)?;
    println!("\nPlot saved to: {}", args.output);

    Ok(())
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
