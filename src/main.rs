use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use fixturecast::config::EngineConfig;
use fixturecast::engine;
use fixturecast::provider::Provider;
use fixturecast::types::MatchSnapshot;

const USAGE: &str = "usage: fixturecast <fixture-id> | fixturecast --snapshot <file.json>";

fn main() -> ExitCode {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fixturecast: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let snapshot = match args.as_slice() {
        [flag, path] if flag == "--snapshot" => load_snapshot(&PathBuf::from(path))?,
        [raw] if raw != "--snapshot" => {
            let fixture_id: u64 = raw
                .parse()
                .with_context(|| format!("invalid fixture id {raw:?}\n{USAGE}"))?;
            let provider = Provider::from_env()?;
            provider
                .assemble_snapshot(fixture_id)
                .with_context(|| format!("could not assemble fixture {fixture_id}"))?
        }
        _ => anyhow::bail!("{USAGE}"),
    };

    let result = engine::predict(&snapshot, &EngineConfig::default())?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn load_snapshot(path: &PathBuf) -> Result<MatchSnapshot> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read snapshot {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid snapshot {}", path.display()))
}
