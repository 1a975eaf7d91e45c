//! Export every hosted repository of a service in one run
//!
//! ```sh
//! cargo run --example export_all -- http://nexus.example.com:8081 ./exports
//! ```

use artifact_mirror::{Config, DriverConfig, export_all};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let base_url = args
        .next()
        .unwrap_or_else(|| "http://localhost:8081".to_string());
    let output_dir = args.next().unwrap_or_else(|| "./exports".to_string());

    let config = Config::new(base_url, output_dir);

    // Skip the usual public-registry mirrors; they are re-fetchable anyway
    let driver = DriverConfig {
        excluded_repositories: vec![
            "maven-central".to_string(),
            "maven-public".to_string(),
            "nuget.org-proxy".to_string(),
        ],
        ..Default::default()
    };

    let summary = export_all(config, driver).await?;

    println!("completed: {}", summary.completed.join(", "));
    if !summary.failed.is_empty() {
        println!("failed: {}", summary.failed.join(", "));
    }
    Ok(())
}
