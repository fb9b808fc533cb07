/// Single-band GeoTIFF reader.
///
/// Geometry comes from ModelPixelScale + ModelTiepoint (or a non-rotated
/// ModelTransformation). The GDAL_NODATA tag, when present, is the sentinel
/// converted to NaN. TIFF storage order is north to south, the same as Grid.
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tiff::TiffError;

use crate::coords::Extent;
use crate::error::SourceError;
use crate::grid::{Geometry, Grid};

pub fn read_geotiff(path: &Path) -> Result<Grid, SourceError> {
    let file = File::open(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_geotiff(BufReader::new(file), path)
}

/// Decode a GeoTIFF from any seekable reader; `path` is only used in errors.
pub fn decode_geotiff<R: Read + Seek>(reader: R, path: &Path) -> Result<Grid, SourceError> {
    let tiff_err = |source: TiffError| SourceError::Tiff { path: path.to_path_buf(), source };

    let mut decoder = Decoder::new(reader).map_err(tiff_err)?;
    let (width, height) = decoder.dimensions().map_err(tiff_err)?;
    let (width, height) = (width as usize, height as usize);
    if width == 0 || height == 0 {
        return Err(SourceError::format(path, "zero-sized image"));
    }

    let extent = georeference(&mut decoder, width, height, path)?;
    let nodata = match decoder.find_tag(Tag::GdalNodata).map_err(tiff_err)? {
        Some(v) => {
            let text = v.into_string().map_err(tiff_err)?;
            let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
            Some(text.parse::<f64>().map_err(|_| {
                SourceError::format(path, format!("unparseable GDAL_NODATA `{text}`"))
            })? as f32)
        }
        None => None,
    };

    let samples: Vec<f32> = match decoder.read_image().map_err(tiff_err)? {
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        _ => return Err(SourceError::format(path, "unsupported sample type")),
    };
    if samples.len() != width * height {
        return Err(SourceError::format(
            path,
            format!("expected one band of {} samples, found {}", width * height, samples.len()),
        ));
    }

    let data = match nodata {
        Some(nd) => samples
            .into_iter()
            .map(|v| if v == nd { f32::NAN } else { v })
            .collect(),
        None => samples,
    };
    Ok(Grid { geometry: Geometry::new(width, height, extent), data })
}

fn georeference<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    width: usize,
    height: usize,
    path: &Path,
) -> Result<Extent, SourceError> {
    let tiff_err = |source: TiffError| SourceError::Tiff { path: path.to_path_buf(), source };
    let f64s = |v: Option<tiff::decoder::ifd::Value>| -> Result<Option<Vec<f64>>, SourceError> {
        v.map(|v| v.into_f64_vec().map_err(tiff_err)).transpose()
    };

    let scale = f64s(decoder.find_tag(Tag::ModelPixelScaleTag).map_err(tiff_err)?)?;
    let tiepoint = f64s(decoder.find_tag(Tag::ModelTiepointTag).map_err(tiff_err)?)?;

    // Pixel (i, j) maps to model (x, y); y grows north, rows grow south.
    let (dx, dy, min_lon, max_lat) = match (scale, tiepoint) {
        (Some(s), Some(t)) if s.len() >= 2 && t.len() >= 6 => {
            (s[0], s[1], t[3] - t[0] * s[0], t[4] + t[1] * s[1])
        }
        _ => {
            let m = f64s(decoder.find_tag(Tag::ModelTransformationTag).map_err(tiff_err)?)?
                .ok_or_else(|| SourceError::format(path, "no georeferencing tags"))?;
            if m.len() < 16 || m[1] != 0.0 || m[4] != 0.0 {
                return Err(SourceError::format(path, "rotated or malformed ModelTransformation"));
            }
            (m[0], -m[5], m[3], m[7])
        }
    };
    if dx <= 0.0 || dy <= 0.0 {
        return Err(SourceError::format(path, format!("non-positive pixel scale {dx} x {dy}")));
    }

    Ok(Extent::new(
        min_lon,
        min_lon + width as f64 * dx,
        max_lat - height as f64 * dy,
        max_lat,
    ))
}
