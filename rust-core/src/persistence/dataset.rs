//! Labeled dataset holding a fitted decomposition
//!
//! Arrays are keyed by the same dimension names throughout:
//! `window_time_means` (one entry per window, the mean of its time values),
//! `svd_rank` (rank slots), `space` (data variables), `frequency_band` and
//! `window_index` (samples within a window). Reconstructions are never
//! stored; they are cheap to recompute and can be far larger than the fit.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::{Array1, Array2, Array3};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::encoding::AttrValue;
use crate::error::{CostsError, Result};

/// Attribute prefix of the solver options
pub const SOLVER_OPTIONS_PREFIX: &str = "solver_options__";

/// Coordinate arrays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetCoords {
    /// (window_time_means)
    pub window_time_means: Array1<f64>,

    /// Window index along window_time_means
    pub slide: Array1<usize>,

    /// (svd_rank)
    pub svd_rank: Array1<usize>,

    /// (space)
    pub space: Array1<usize>,

    /// (frequency_band)
    pub frequency_band: Array1<usize>,

    /// (window_index)
    pub window_index: Array1<usize>,

    /// Absolute sample times (window_time_means, window_index)
    pub time: Array2<f64>,
}

/// Data variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetVars {
    /// (window_time_means, svd_rank)
    pub omega: Array2<Complex64>,

    /// (window_time_means, svd_rank), absent before clustering
    pub omega_classes: Option<Array2<usize>>,

    /// (window_time_means, svd_rank)
    pub amplitudes: Array2<Complex64>,

    /// (window_time_means, space, svd_rank)
    pub modes: Array3<Complex64>,

    /// (window_time_means, space)
    pub window_means: Array2<f64>,

    /// Fitted slots per window (window_time_means)
    pub window_ranks: Array1<usize>,

    /// (frequency_band), absent before clustering
    pub cluster_centroids: Option<Array1<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostsDataset {
    pub coords: DatasetCoords,
    pub data_vars: DatasetVars,
    pub attrs: BTreeMap<String, AttrValue>,
}

impl CostsDataset {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the dataset to `path` as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a dataset written by `save`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    fn attr(&self, key: &str) -> Result<&AttrValue> {
        self.attrs
            .get(key)
            .ok_or_else(|| CostsError::config(format!("dataset is missing attribute `{key}`")))
    }

    pub fn attr_usize(&self, key: &str) -> Result<usize> {
        match self.attr(key)? {
            AttrValue::Int(v) if *v >= 0 => Ok(*v as usize),
            other => Err(CostsError::config(format!(
                "attribute `{key}` is not a non-negative integer: {other:?}"
            ))),
        }
    }

    pub fn attr_f64(&self, key: &str) -> Result<f64> {
        match self.attr(key)? {
            AttrValue::Float(v) => Ok(*v),
            AttrValue::Int(v) => Ok(*v as f64),
            other => Err(CostsError::config(format!("attribute `{key}` is not a number: {other:?}"))),
        }
    }

    pub fn attr_bool(&self, key: &str) -> Result<bool> {
        match self.attr(key)? {
            AttrValue::Bool(v) => Ok(*v),
            other => Err(CostsError::config(format!("attribute `{key}` is not a flag: {other:?}"))),
        }
    }

    pub fn attr_text(&self, key: &str) -> Result<&str> {
        match self.attr(key)? {
            AttrValue::Text(v) => Ok(v.as_str()),
            other => Err(CostsError::config(format!("attribute `{key}` is not text: {other:?}"))),
        }
    }

    /// Attribute value as stored, if present
    pub fn attr_value(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }
}
