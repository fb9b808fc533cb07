/// Ensemble exceedance runner: aligns a present-day precipitation grid with
/// the projection ensemble, computes per-cell statistics over the region of
/// interest and writes the cell table as JSON.
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pluvial_core::source::write_ascii_grid;
use pluvial_core::table::RANK_COLUMN;
use pluvial_core::{DirectorySource, EnsemblePipeline, Extent, MissingMemberPolicy, RunConfig};

#[derive(Parser, Debug)]
#[command(name = "pluvial", about = "Per-cell ensemble exceedance statistics for precipitation projections")]
struct Args {
    /// JSON run configuration (every field optional).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the baseline and projection grids.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Region of interest as min_lon,max_lon,min_lat,max_lat.
    #[arg(long, value_parser = parse_extent, allow_hyphen_values = true)]
    region: Option<Extent>,

    /// Handling of cells with a missing projection sample.
    #[arg(long, value_enum)]
    missing_members: Option<MissingArg>,

    /// Output table (JSON).
    #[arg(short, long, default_value = "data/out/ensemble_table.json")]
    output: PathBuf,

    /// Also write one column as an ESRI ASCII grid.
    #[arg(long)]
    raster_out: Option<PathBuf>,

    /// Column written by --raster-out.
    #[arg(long, default_value = RANK_COLUMN)]
    column: String,

    /// Print the effective configuration and exit.
    #[arg(long)]
    print_config: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MissingArg {
    Exclude,
    DropRow,
}

impl From<MissingArg> for MissingMemberPolicy {
    fn from(m: MissingArg) -> Self {
        match m {
            MissingArg::Exclude => MissingMemberPolicy::Exclude,
            MissingArg::DropRow => MissingMemberPolicy::DropRow,
        }
    }
}

fn parse_extent(s: &str) -> Result<Extent, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("bad region `{s}`: {e}"))?;
    match parts.as_slice() {
        &[min_lon, max_lon, min_lat, max_lat] => Ok(Extent::new(min_lon, max_lon, min_lat, max_lat)),
        _ => Err(format!("region needs 4 comma-separated numbers, got `{s}`")),
    }
}

fn load_config(args: &Args) -> Result<RunConfig> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Cannot read {}", path.display()))?;
            RunConfig::from_json(&text)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        }
        None => RunConfig::default(),
    };
    if let Some(dir) = &args.data_dir {
        cfg.data_dir = dir.clone();
    }
    if let Some(region) = args.region {
        cfg.region = region;
    }
    if let Some(m) = args.missing_members {
        cfg.missing_members = m.into();
    }
    Ok(cfg)
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Cannot create {}", parent.display()))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let cfg = load_config(&args)?;

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
        return Ok(());
    }

    let source = DirectorySource::new(&cfg.data_dir, &cfg.path_template);
    let pipeline = EnsemblePipeline::new(cfg).context("Invalid configuration")?;
    let out = pipeline.run(&source).context("Ensemble run failed")?;

    if out.table.is_empty() {
        tracing::warn!("region contains no cells with a baseline value");
    }

    create_parent(&args.output)?;
    let file = fs::File::create(&args.output)
        .with_context(|| format!("Cannot create {}", args.output.display()))?;
    serde_json::to_writer(BufWriter::new(file), &out.table)
        .with_context(|| format!("Write failed: {}", args.output.display()))?;
    tracing::info!(path = %args.output.display(), rows = out.table.len(), "wrote cell table");

    if let Some(path) = &args.raster_out {
        let Some(grid) = out.table.rasterize(&args.column) else {
            bail!("unknown column `{}`; available: {}", args.column, out.table.columns().join(", "));
        };
        create_parent(path)?;
        let file = fs::File::create(path).with_context(|| format!("Cannot create {}", path.display()))?;
        write_ascii_grid(&grid, BufWriter::new(file))
            .with_context(|| format!("Write failed: {}", path.display()))?;
        tracing::info!(path = %path.display(), column = %args.column, "wrote raster");
    }

    println!("{}", serde_json::to_string_pretty(&out.summary)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_extent_accepts_four_numbers() {
        assert_eq!(parse_extent("-180, 180, -23.5, 23.5"), Ok(Extent::new(-180.0, 180.0, -23.5, 23.5)));
    }

    #[test]
    fn parse_extent_rejects_wrong_arity_and_garbage() {
        assert!(parse_extent("1,2,3").is_err());
        assert!(parse_extent("a,b,c,d").is_err());
    }

    #[test]
    fn flags_override_config_file() {
        let args = Args::parse_from([
            "pluvial",
            "--data-dir",
            "/tmp/grids",
            "--region",
            "-80,-30,-20,10",
            "--missing-members",
            "drop-row",
        ]);
        let cfg = load_config(&args).unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/grids"));
        assert_eq!(cfg.region, Extent::new(-80.0, -30.0, -20.0, 10.0));
        assert_eq!(cfg.missing_members, MissingMemberPolicy::DropRow);
        assert_eq!(cfg.models.len(), 17);
    }
}
