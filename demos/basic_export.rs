//! Basic export example
//!
//! This example demonstrates the core functionality of artifact-mirror:
//! - Configuring the remote service and output directory
//! - Creating an exporter instance
//! - Subscribing to events
//! - Running a resumable export of one repository
//!
//! ```sh
//! cargo run --example basic_export -- http://nexus.example.com:8081 libs-release ./exports
//! ```

use artifact_mirror::config::{Config, ExportConfig, RemoteConfig};
use artifact_mirror::{Event, RepositoryExporter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let base_url = args
        .next()
        .unwrap_or_else(|| "http://localhost:8081".to_string());
    let repository = args.next().unwrap_or_else(|| "libs-release".to_string());
    let output_dir = args.next().unwrap_or_else(|| "./exports".to_string());

    // Build configuration
    let config = Config {
        remote: RemoteConfig {
            base_url,
            ..Default::default()
        },
        export: ExportConfig {
            output_dir: output_dir.into(),
            worker_count: 4,
            ..Default::default()
        },
        ..Default::default()
    };

    // Create exporter instance
    let exporter = RepositoryExporter::new(config, &repository)?;

    // Subscribe to events
    let mut events = exporter.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::Progress {
                    found, processed, ..
                } => {
                    println!("progress: {processed}/{found}");
                }
                Event::AssetFailed { path, error } => {
                    eprintln!("failed: {path}: {error}");
                }
                _ => {}
            }
        }
    });

    // Run the export; interrupt and re-run freely, finished work is skipped
    let report = exporter.export().await?;
    println!(
        "{}: {}/{} assets, outcome {:?}",
        report.repository, report.assets_processed, report.assets_found, report.outcome
    );
    Ok(())
}
