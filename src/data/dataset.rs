use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use super::chi2::{chi2_per_dof, chi2_total};
use super::error::{DataError, Result};
use super::filter::{filter_table, KinVarFilter};
use super::layout::{self, RawFile};
use super::metadata::Metadata;
use super::table::DataTable;
use super::transform::TransformRegistry;

/// Observed value column.
pub const DATA_COLUMN: &str = "data";
/// Prediction column.
pub const THEORY_COLUMN: &str = "theory";
/// Uncorrelated total error column.
pub const ERROR_COLUMN: &str = "totErrorUncor";

// ---------------------------------------------------------------------------
// Dataset – one file, parsed, transformed and summarised
// ---------------------------------------------------------------------------

/// A measurement file ready for queries. Read-only once built.
#[derive(Debug, Clone)]
pub struct Dataset {
    path: Option<PathBuf>,
    metadata: Metadata,
    table: DataTable,
    chi2_total: f64,
    chi2_per_dof: f64,
}

/// Occupancy of one grid value in a sub-selection relative to the full table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BinRatio {
    pub value: f64,
    pub ratio: f64,
}

/// Data and theory along one kinematic axis, everything else held fixed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub x_axis: String,
    /// The dataset's `TypeTheo` tag, used as y label.
    pub y_label: Option<String>,
    pub x: Vec<f64>,
    pub data: Vec<f64>,
    pub theory: Vec<f64>,
    pub error: Vec<f64>,
}

/// One cell of a per-bin grid: the fixed KinVar values and its series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinPanel {
    pub fixed: Vec<(String, f64)>,
    pub series: Series,
}

impl Dataset {
    /// Read, transform and summarise one file.
    pub fn from_path(path: &Path, registry: &TransformRegistry) -> Result<Self> {
        info!("reading file from {}", path.display());
        let raw = layout::read_file(path)?;
        let mut dataset = Self::from_raw(raw, registry)?;
        dataset.path = Some(path.to_path_buf());
        Ok(dataset)
    }

    /// Same as [`Dataset::from_path`] for content already in memory.
    pub fn parse(text: &str, registry: &TransformRegistry) -> Result<Self> {
        Self::from_raw(layout::parse(text)?, registry)
    }

    pub fn from_raw(raw: RawFile, registry: &TransformRegistry) -> Result<Self> {
        let mut metadata = Metadata::decode(&raw.metadata)?;
        let mut table = DataTable::new(raw.schema, raw.rows)?;

        registry.apply(metadata.type_exp.as_deref(), &mut table, &mut metadata.kin_var)?;
        if let Some(name) = metadata.kin_var.iter().find(|k| !table.has_column(k)) {
            return Err(DataError::MissingColumn(name.clone()));
        }

        let chi2_total = chi2_total(&table)?;
        let chi2_per_dof = chi2_per_dof(&table)?;
        info!(
            "dataset {:?} ({}): {} rows, chi2 {:.4}, chi2/dof {:.4}",
            metadata.id,
            metadata.type_exp.as_deref().unwrap_or("-"),
            table.len(),
            chi2_total,
            chi2_per_dof
        );

        Ok(Dataset {
            path: None,
            metadata,
            table,
            chi2_total,
            chi2_per_dof,
        })
    }

    // -- accessors --

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn id(&self) -> Option<i64> {
        self.metadata.id
    }

    /// Kinematic variables after the variant transform.
    pub fn kin_var(&self) -> &[String] {
        &self.metadata.kin_var
    }

    pub fn type_theo(&self) -> Option<&str> {
        self.metadata.type_theo.as_deref()
    }

    pub fn table(&self) -> &DataTable {
        &self.table
    }

    /// Number of grid points.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Always `false`: a dataset without rows is rejected at load time.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn chi2_total(&self) -> f64 {
        self.chi2_total
    }

    pub fn chi2_per_dof(&self) -> f64 {
        self.chi2_per_dof
    }

    // -- queries --

    /// Rows matching every KinVar constraint. Unknown keys give
    /// `Err(UnknownQueryKey)`, no match gives an empty table.
    pub fn filter_kin_var_by(&self, filter: &KinVarFilter) -> Result<DataTable> {
        filter_table(&self.table, self.kin_var(), filter)
    }

    /// Distinct grid values of every kinematic variable.
    pub fn kin_var_bins(&self) -> Result<BTreeMap<String, Vec<f64>>> {
        self.kin_var()
            .iter()
            .map(|name| Ok((name.clone(), self.table.distinct_values(name)?)))
            .collect()
    }

    /// For each KinVar and each of its grid values in the full table, the
    /// fraction of those rows that survive in `subset`.
    pub fn normalized_histogram_ratios(
        &self,
        subset: &DataTable,
    ) -> Result<BTreeMap<String, Vec<BinRatio>>> {
        if subset.columns() != self.table.columns() {
            return Err(DataError::SchemaMismatch {
                expected: self.table.columns().to_vec(),
                found: subset.columns().to_vec(),
            });
        }

        let mut ratios = BTreeMap::new();
        for name in self.kin_var() {
            let full = self.table.value_counts(name)?;
            let part = subset.value_counts(name)?;
            let bins = full
                .iter()
                .map(|&(value, total)| {
                    let hits = part
                        .iter()
                        .find(|(v, _)| *v == value)
                        .map(|&(_, n)| n)
                        .unwrap_or(0);
                    BinRatio {
                        value,
                        ratio: hits as f64 / total as f64,
                    }
                })
                .collect();
            ratios.insert(name.clone(), bins);
        }
        Ok(ratios)
    }

    /// Data vs theory along the single KinVar left free by `filter`.
    pub fn data_theory_series(&self, filter: &KinVarFilter) -> Result<Series> {
        let selected = self.filter_kin_var_by(filter)?;
        let free: Vec<&String> = self
            .kin_var()
            .iter()
            .filter(|k| !filter.contains_key(*k))
            .collect();
        match free.as_slice() {
            [x_axis] => self.series(&selected, x_axis),
            _ => Err(DataError::AmbiguousAxis(free.len())),
        }
    }

    /// One panel per combination of the KinVars other than `x_axis`,
    /// ordered by those values. Combinations without rows are skipped.
    pub fn bin_panels(&self, x_axis: &str) -> Result<Vec<BinPanel>> {
        if !self.kin_var().iter().any(|k| k == x_axis) {
            return Err(DataError::UnknownQueryKey(x_axis.to_string()));
        }
        let fixed: Vec<&String> = self.kin_var().iter().filter(|k| *k != x_axis).collect();
        let fixed_idx = fixed
            .iter()
            .map(|name| self.table.column_index(name))
            .collect::<Result<Vec<_>>>()?;

        let mut groups: Vec<(Vec<f64>, Vec<Vec<f64>>)> = Vec::new();
        for row in self.table.rows() {
            let key: Vec<f64> = fixed_idx.iter().map(|&i| row[i]).collect();
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, rows)) => rows.push(row.clone()),
                None => groups.push((key, vec![row.clone()])),
            }
        }
        groups.sort_by(|(a, _), (b, _)| {
            a.iter()
                .zip(b)
                .map(|(x, y)| x.total_cmp(y))
                .find(|o| o.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        groups
            .into_iter()
            .map(|(key, rows)| {
                let cell = DataTable::new(self.table.columns().to_vec(), rows)?;
                Ok(BinPanel {
                    fixed: fixed.iter().map(|n| n.to_string()).zip(key).collect(),
                    series: self.series(&cell, x_axis)?,
                })
            })
            .collect()
    }

    fn series(&self, table: &DataTable, x_axis: &str) -> Result<Series> {
        Ok(Series {
            x_axis: x_axis.to_string(),
            y_label: self.metadata.type_theo.clone(),
            x: table.column(x_axis)?,
            data: table.column(DATA_COLUMN)?,
            theory: table.column(THEORY_COLUMN)?,
            error: table.column(ERROR_COLUMN)?,
        })
    }
}
