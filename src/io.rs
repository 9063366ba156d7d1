//! Safetensors I/O for signal matrices.
//!
//! Input layout (`SignalMatrix::load`):
//!   data        [cells, T]  F32 | F64   one row per recorded cell
//!   fs          [1]         F32 | F64   optional sampling rate (Hz)
//!   very_noisy  [k]         I32 | I64   optional rows to filter strictly
//!
//! Output layout (`write_filtered`):
//!   filtered    [cells, T]  F64
//!   mask        [cells, T]  F64         only when masks are given
use anyhow::{bail, ensure, Context, Result};
use ndarray::Array2;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Parsed safetensors container: header entries plus the raw byte buffer.
struct Container {
    header: HashMap<String, Value>,
    bytes: Vec<u8>,
    data_start: usize,
}

/// A tensor entry decoded to `f64`.
struct Tensor {
    shape: Vec<usize>,
    values: Vec<f64>,
}

impl Container {
    fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        ensure!(bytes.len() >= 8, "{} is too small to be a safetensors file", path.display());

        let mut len = [0u8; 8];
        len.copy_from_slice(&bytes[..8]);
        let n = u64::from_le_bytes(len) as usize;
        ensure!(bytes.len() >= 8 + n, "safetensors header runs past the end of the file");

        let header: HashMap<String, Value> =
            serde_json::from_slice(&bytes[8..8 + n]).context("failed to parse safetensors header")?;
        Ok(Self { header, bytes, data_start: 8 + n })
    }

    fn tensor(&self, key: &str) -> Result<Option<Tensor>> {
        let Some(entry) = self.header.get(key) else {
            return Ok(None);
        };
        let dtype = entry["dtype"].as_str().with_context(|| format!("'{key}' has no dtype"))?;
        let shape: Vec<usize> = entry["shape"]
            .as_array()
            .with_context(|| format!("'{key}' has no shape"))?
            .iter()
            .map(|v| v.as_u64().map(|d| d as usize).context("non-integer dimension"))
            .collect::<Result<_>>()?;

        let offsets = entry["data_offsets"]
            .as_array()
            .with_context(|| format!("'{key}' has no data_offsets"))?;
        ensure!(offsets.len() == 2, "'{key}' data_offsets must have two entries");
        let s = offsets[0].as_u64().context("bad data offset")? as usize;
        let e = offsets[1].as_u64().context("bad data offset")? as usize;
        ensure!(s <= e && self.data_start + e <= self.bytes.len(), "'{key}' data lies outside the file");
        let raw = &self.bytes[self.data_start + s..self.data_start + e];

        let values: Vec<f64> = match dtype {
            "F32" => raw.chunks_exact(4).map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64).collect(),
            "F64" => raw
                .chunks_exact(8)
                .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
                .collect(),
            "I32" => raw.chunks_exact(4).map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64).collect(),
            "I64" => raw
                .chunks_exact(8)
                .map(|b| i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f64)
                .collect(),
            other => bail!("'{key}' has unsupported dtype {other}"),
        };
        let expected: usize = shape.iter().product();
        ensure!(
            values.len() == expected,
            "'{key}' holds {} values but its shape {shape:?} needs {expected}",
            values.len()
        );
        Ok(Some(Tensor { shape, values }))
    }
}

/// Cell signals loaded from a safetensors file.
#[derive(Debug, Clone)]
pub struct SignalMatrix {
    /// `[cells, T]`.
    pub data: Array2<f64>,
    /// Sampling rate stored in the file, if any.
    pub fs: Option<f64>,
    /// Rows flagged as very noisy in the file (may be empty).
    pub very_noisy: Vec<usize>,
}

impl SignalMatrix {
    pub fn load(path: &Path) -> Result<Self> {
        let file = Container::read(path)?;

        let data = file.tensor("data")?.context("missing 'data' key")?;
        ensure!(data.shape.len() == 2, "'data' must be 2-D [cells, T], got shape {:?}", data.shape);
        let data = Array2::from_shape_vec((data.shape[0], data.shape[1]), data.values)?;

        let fs = file.tensor("fs")?.and_then(|t| t.values.first().copied());

        let very_noisy = match file.tensor("very_noisy")? {
            Some(t) => t
                .values
                .iter()
                .map(|&v| {
                    ensure!(v >= 0.0 && v.fract() == 0.0, "very_noisy entry {v} is not a row index");
                    Ok(v as usize)
                })
                .collect::<Result<_>>()?,
            None => Vec::new(),
        };

        Ok(Self { data, fs, very_noisy })
    }
}

/// Minimal safetensors writer for `F64` and `I64` tensors.
///
/// ```rust,no_run
/// use cafilt::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f64("fs", &[1000.0], &[1]);
/// w.add_i64("very_noisy", &[3, 7], &[2]);
/// w.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct StWriter {
    entries: Vec<(String, &'static str, Vec<usize>, Vec<u8>)>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        let bytes = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), "F64", shape.to_vec(), bytes));
    }

    pub fn add_f64_arr2(&mut self, name: &str, arr: &Array2<f64>) {
        let data: Vec<f64> = arr.iter().copied().collect();
        self.add_f64(name, &data, &[arr.nrows(), arr.ncols()]);
    }

    pub fn add_i64(&mut self, name: &str, data: &[i64], shape: &[usize]) {
        let bytes = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), "I64", shape.to_vec(), bytes));
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        use std::io::Write;

        let mut header = serde_json::Map::new();
        let mut offset = 0usize;
        for (name, dtype, shape, bytes) in &self.entries {
            header.insert(
                name.clone(),
                serde_json::json!({
                    "dtype": dtype,
                    "shape": shape,
                    "data_offsets": [offset, offset + bytes.len()],
                }),
            );
            offset += bytes.len();
        }
        let mut header = serde_json::to_vec(&header)?;
        header.resize(header.len().next_multiple_of(8), b' ');

        let mut f = std::io::BufWriter::new(
            std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?,
        );
        f.write_all(&(header.len() as u64).to_le_bytes())?;
        f.write_all(&header)?;
        for (_, _, _, bytes) in &self.entries {
            f.write_all(bytes)?;
        }
        f.flush()?;
        Ok(())
    }
}

/// Write filtered signals (and optionally their masks) to `path`.
pub fn write_filtered(path: &Path, filtered: &Array2<f64>, masks: Option<&Array2<f64>>) -> Result<()> {
    let mut w = StWriter::new();
    w.add_f64_arr2("filtered", filtered);
    if let Some(m) = masks {
        ensure!(m.dim() == filtered.dim(), "mask shape {:?} ≠ signal shape {:?}", m.dim(), filtered.dim());
        w.add_f64_arr2("mask", m);
    }
    w.write(path)
}
