// src/main.rs

use std::path::PathBuf;

use futures::future::join_all;
use lapsim_physics::{RunSummary, SimConfig, SimError, run_scenario};
use tracing::{error, info};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}

fn load_scenarios() -> Result<Vec<(String, SimConfig)>, SimError> {
    let paths: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        info!("no config given, running the default acceleration scenario");
        return Ok(vec![("default".to_string(), SimConfig::default())]);
    }

    paths
        .into_iter()
        .map(|p| {
            let config = SimConfig::from_path(&p)?;
            Ok((p.display().to_string(), config))
        })
        .collect()
}

#[tokio::main]
async fn main() {
    init_tracing();

    let scenarios = match load_scenarios() {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            std::process::exit(2);
        }
    };

    // One blocking worker per independent run; ticks within a run stay sequential.
    let handles = scenarios.into_iter().map(|(label, config)| {
        tokio::task::spawn_blocking(move || {
            let result = run_scenario(&config).map(|(summary, _)| summary);
            (label, result)
        })
    });

    let mut failed = false;
    let mut summaries: Vec<RunSummary> = Vec::new();
    for joined in join_all(handles).await {
        match joined {
            Ok((_, Ok(summary))) => summaries.push(summary),
            Ok((label, Err(e))) => {
                error!(scenario = %label, error = %e, "run failed");
                failed = true;
            }
            Err(e) => {
                error!(error = %e, "run worker panicked");
                failed = true;
            }
        }
    }

    match serde_json::to_string_pretty(&summaries) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            error!(error = %e, "failed to serialize run summaries");
            failed = true;
        }
    }

    if failed {
        std::process::exit(1);
    }
}
