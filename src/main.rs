//! ionplot - render the QC walkthrough charts for one CSV export
//!
//! Usage: `ionplot <qc.csv> [out_dir]`
//!
//! Property overrides are read from `plot_config.json` in the working
//! directory when present.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};

use ionplot::config::PlotConfig;
use ionplot::lesson::LessonData;
use ionplot::pipeline::{generate_plots, write_results};
use ionplot::table::load_csv;

const CONFIG_FILE: &str = "plot_config.json";
const DEFAULT_OUT_DIR: &str = "plots";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("ionplot v{}", env!("CARGO_PKG_VERSION"));

    let args: Vec<String> = std::env::args().collect();
    if let Err(e) = run(&args) {
        eprintln!("\n✗ {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> anyhow::Result<()> {
    let (csv_path, out_dir) = parse_args(args)?;
    let start = Instant::now();

    println!("\n[1/4] Loading configuration...");
    let config = PlotConfig::load(CONFIG_FILE)
        .with_context(|| format!("Failed to read {}", CONFIG_FILE))?;
    println!("  Theme: {}, format: {}", config.theme, config.output_format);

    println!("\n[2/4] Loading {}...", csv_path.display());
    let table = load_csv(&csv_path)
        .with_context(|| format!("Failed to load {}", csv_path.display()))?;
    let data = LessonData::prepare(&table).context("Table does not look like a QC export")?;
    println!("  {}", data.table.summary());

    println!("\n[3/4] Generating plots...");
    let results = generate_plots(&data, &config).context("Plot generation failed")?;

    println!("\n[4/4] Writing {} plot(s) to {}...", results.len(), out_dir.display());
    let manifest = write_results(&results, &out_dir)
        .with_context(|| format!("Failed to write to {}", out_dir.display()))?;
    for result in &results {
        println!(
            "  ✓ Saved {} ({}x{}, {} bytes)",
            out_dir.join(result.file_name()).display(),
            result.width,
            result.height,
            result.bytes.len()
        );
    }
    println!("  ✓ Saved {}", manifest.display());

    println!("\nDone in {:.2?}", start.elapsed());
    Ok(())
}

fn parse_args(args: &[String]) -> anyhow::Result<(PathBuf, PathBuf)> {
    match args {
        [_, csv] => Ok((PathBuf::from(csv), PathBuf::from(DEFAULT_OUT_DIR))),
        [_, csv, out] => Ok((PathBuf::from(csv), PathBuf::from(out))),
        _ => bail!("Usage: ionplot <qc.csv> [out_dir]"),
    }
}
