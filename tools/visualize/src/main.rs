//! Diagnostic renderer: draws one column of a cell table to PNG.
//! No coastlines or legend; cells without a row are light grey.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use serde_json::{Map, Value};

use pluvial_core::table::{NEG_INF, POS_INF, PROB_COLUMN, RANK_COLUMN};
use pluvial_core::{Geometry, Grid};

#[derive(Parser, Debug)]
#[command(name = "visualize", about = "Render one cell-table column to PNG")]
struct Args {
    /// Cell table JSON written by `pluvial`.
    #[arg(short, long, default_value = "data/out/ensemble_table.json")]
    table: PathBuf,

    /// Column to draw.
    #[arg(short, long, default_value = RANK_COLUMN)]
    column: String,

    /// Output PNG.
    #[arg(short, long, default_value = "data/debug/rank_pr_fut.png")]
    output: PathBuf,

    /// Pixels per cell.
    #[arg(long, default_value = "4")]
    scale: u32,
}

#[derive(Deserialize)]
struct TableDoc {
    geometry: Geometry,
    rows: Vec<Map<String, Value>>,
}

// ── Colour helpers ────────────────────────────────────────────────────────────

const NO_DATA: [u8; 3] = [220, 220, 220];

/// Probability-like value in [0, 1] → brown (drier) / white (0.5) / blue (wetter).
fn diverging(p: f32) -> [u8; 3] {
    let t = (p.clamp(0.0, 1.0) - 0.5) * 2.0;
    let lerp = |a: f32, b: f32, t: f32| (a + (b - a) * t) as u8;
    if t < 0.0 {
        let t = -t;
        [lerp(255.0, 140.0, t), lerp(255.0, 81.0, t), lerp(255.0, 10.0, t)]
    } else {
        [lerp(255.0, 1.0, t), lerp(255.0, 102.0, t), lerp(255.0, 94.0, t)]
    }
}

/// Value in [lo, hi] → white to deep blue.
fn sequential(v: f32, lo: f32, hi: f32) -> [u8; 3] {
    let t = ((v - lo) / (hi - lo).max(f32::EPSILON)).clamp(0.0, 1.0);
    let rg = (255.0 * (1.0 - t)) as u8;
    let b = (255.0 - 75.0 * t) as u8;
    [rg, rg, b]
}

/// Cell value from the table: null is missing, `"inf"`/`"-inf"` are infinities.
fn cell_value(v: &Value) -> Result<f32> {
    match v {
        Value::Null => Ok(f32::NAN),
        Value::Number(n) => Ok(n.as_f64().map_or(f32::NAN, |v| v as f32)),
        Value::String(s) if s == POS_INF => Ok(f32::INFINITY),
        Value::String(s) if s == NEG_INF => Ok(f32::NEG_INFINITY),
        other => bail!("unexpected cell value {other}"),
    }
}

/// Rebuild the column as a grid; rows whose value is null stay NaN.
fn column_grid(doc: &TableDoc, column: &str) -> Result<Grid> {
    let mut grid = Grid::new(doc.geometry, f32::NAN);
    for row in &doc.rows {
        let (Some(x), Some(y)) = (row.get("x").and_then(Value::as_f64), row.get("y").and_then(Value::as_f64)) else {
            bail!("row without x/y coordinates");
        };
        let Some(v) = row.get(column) else {
            bail!("column `{column}` not in table");
        };
        if let Some((r, c)) = doc.geometry.cell_index(x, y) {
            grid.set(r, c, cell_value(v)?);
        }
    }
    Ok(grid)
}

fn render(grid: &Grid, column: &str, scale: u32) -> image::RgbImage {
    let probability = column == RANK_COLUMN || column == PROB_COLUMN;
    let (lo, hi) = grid.value_range().unwrap_or((0.0, 1.0));
    let scale = scale.max(1);
    let (w, h) = (grid.width() as u32, grid.height() as u32);

    let mut img = image::RgbImage::new(w * scale, h * scale);
    for r in 0..grid.height() {
        for c in 0..grid.width() {
            let v = grid.get(r, c);
            let rgb = if v.is_nan() {
                NO_DATA
            } else if probability {
                diverging(v)
            } else {
                sequential(v, lo, hi)
            };
            for dy in 0..scale {
                for dx in 0..scale {
                    img.put_pixel(c as u32 * scale + dx, r as u32 * scale + dy, image::Rgb(rgb));
                }
            }
        }
    }
    img
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).with_writer(std::io::stderr).init();
    let args = Args::parse();

    let text = fs::read_to_string(&args.table)
        .with_context(|| format!("Cannot read {}", args.table.display()))?;
    let doc: TableDoc = serde_json::from_str(&text).context("Failed to parse cell table")?;

    let grid = column_grid(&doc, &args.column)?;
    tracing::info!(column = %args.column, cells = grid.valid_count(), geometry = %grid.geometry, "rasterised column");

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Cannot create {}", parent.display()))?;
    }
    render(&grid, &args.column, args.scale)
        .save(&args.output)
        .with_context(|| format!("Failed to save {}", args.output.display()))?;
    tracing::info!(path = %args.output.display(), "wrote image");
    Ok(())
}
