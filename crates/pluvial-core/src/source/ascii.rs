//! ESRI ASCII grid (`.asc`) reader and writer.
//!
//! Header keys (case-insensitive): `ncols`, `nrows`, `xllcorner` or
//! `xllcenter`, `yllcorner` or `yllcenter`, `cellsize` (or `dx` + `dy`),
//! optional `NODATA_value`. Data follow north to south.
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::coords::Extent;
use crate::error::SourceError;
use crate::grid::{Geometry, Grid};

/// Sentinel written for missing cells.
pub const ASCII_NODATA: f32 = -9999.0;

const HEADER_KEYS: [&str; 10] = [
    "ncols",
    "nrows",
    "xllcorner",
    "xllcenter",
    "yllcorner",
    "yllcenter",
    "cellsize",
    "dx",
    "dy",
    "nodata_value",
];

/// Largest accepted `ncols`/`nrows`.
const MAX_DIMENSION: f64 = u32::MAX as f64;

pub fn read_ascii_grid(path: &Path) -> Result<Grid, SourceError> {
    let text = fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_ascii_grid(&text, path)
}

/// Parse grid text; `path` is only used in error messages.
pub fn parse_ascii_grid(text: &str, path: &Path) -> Result<Grid, SourceError> {
    let mut header: HashMap<String, f64> = HashMap::new();
    let mut body_start = 0usize;

    for raw in text.split_inclusive('\n') {
        let line = raw.trim_end();
        let mut parts = line.split_whitespace();
        let Some(key) = parts.next() else {
            body_start += raw.len();
            continue;
        };
        let key = key.to_ascii_lowercase();
        if !HEADER_KEYS.contains(&key.as_str()) {
            break;
        }
        let value = parts
            .next()
            .and_then(|v| v.parse::<f64>().ok())
            .ok_or_else(|| SourceError::format(path, format!("bad header line `{line}`")))?;
        header.insert(key, value);
        body_start += raw.len();
    }

    let get = |k: &str| {
        header
            .get(k)
            .copied()
            .ok_or_else(|| SourceError::format(path, format!("missing `{k}` in header")))
    };
    let dimension = |k: &str| {
        let v = get(k)?;
        if v.fract() != 0.0 || !(1.0..=MAX_DIMENSION).contains(&v) {
            return Err(SourceError::format(path, format!("`{k}` must be a positive whole number, got {v}")));
        }
        Ok(v as usize)
    };
    let ncols = dimension("ncols")?;
    let nrows = dimension("nrows")?;
    let expected = ncols
        .checked_mul(nrows)
        .ok_or_else(|| SourceError::format(path, format!("{ncols} x {nrows} cells overflow")))?;
    let (dx, dy) = match header.get("cellsize") {
        Some(&c) => (c, c),
        None => (get("dx")?, get("dy")?),
    };
    let min_lon = match header.get("xllcorner") {
        Some(&x) => x,
        None => get("xllcenter")? - dx / 2.0,
    };
    let min_lat = match header.get("yllcorner") {
        Some(&y) => y,
        None => get("yllcenter")? - dy / 2.0,
    };
    let nodata = header.get("nodata_value").map(|&v| v as f32);

    if !(dx > 0.0 && dy > 0.0) {
        return Err(SourceError::format(path, "non-positive cell size"));
    }

    let body = &text[body_start..];
    // at most one sample per two bytes of body
    let mut data = Vec::with_capacity(expected.min(body.len() / 2 + 1));
    for tok in body.split_whitespace() {
        let v: f32 = tok
            .parse()
            .map_err(|_| SourceError::format(path, format!("bad sample `{tok}`")))?;
        data.push(if Some(v) == nodata { f32::NAN } else { v });
    }
    if data.len() != expected {
        return Err(SourceError::format(
            path,
            format!("expected {expected} samples, found {}", data.len()),
        ));
    }

    let extent = Extent::new(
        min_lon,
        min_lon + ncols as f64 * dx,
        min_lat,
        min_lat + nrows as f64 * dy,
    );
    Ok(Grid { geometry: Geometry::new(ncols, nrows, extent), data })
}

/// Write `grid` as an ESRI ASCII grid; NaN cells become [`ASCII_NODATA`].
pub fn write_ascii_grid<W: Write>(grid: &Grid, mut out: W) -> io::Result<()> {
    let g = &grid.geometry;
    let (dx, dy) = g.cell_size();
    writeln!(out, "ncols {}", g.width)?;
    writeln!(out, "nrows {}", g.height)?;
    writeln!(out, "xllcorner {}", g.extent.min_lon)?;
    writeln!(out, "yllcorner {}", g.extent.min_lat)?;
    if (dx - dy).abs() <= dx.abs() * 1e-9 {
        writeln!(out, "cellsize {dx}")?;
    } else {
        writeln!(out, "dx {dx}")?;
        writeln!(out, "dy {dy}")?;
    }
    writeln!(out, "NODATA_value {ASCII_NODATA}")?;
    for r in 0..g.height {
        let line: Vec<String> = (0..g.width)
            .map(|c| {
                let v = grid.get(r, c);
                if v.is_nan() { ASCII_NODATA.to_string() } else { v.to_string() }
            })
            .collect();
        writeln!(out, "{}", line.join(" "))?;
    }
    Ok(())
}
