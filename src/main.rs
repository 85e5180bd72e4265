use std::process::ExitCode;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use taxiscope::cli::Cli;
use taxiscope::data::export;
use taxiscope::processing::filter::filter_view;
use taxiscope::{build_report, DatasetService};

fn init_tracing() {
    // stdout carries the report
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let service = DatasetService::new(&cli.data);
    let dataset = service.dataset()?;
    tracing::info!("Loaded {} trips from {:?}", dataset.len(), service.path());

    let view = cli.view_criteria(&dataset);
    let tests = cli.test_criteria();

    if let Some(path) = &cli.export {
        let subset = filter_view(&dataset, &view)?;
        export::write_csv_file(path, subset.iter(), dataset.has_trip_type())?;
    }

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let report = build_report(&dataset, &view, &tests, &mut rng)?;

    let json = if cli.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{json}");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
