use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::dataset::Dataset;
use super::error::{DataError, Result};
use super::filter::{select_datasets, MetadataFilter, Selection};
use super::transform::{TransformRegistry, DISNEU_TAG};

// ---------------------------------------------------------------------------
// Load options
// ---------------------------------------------------------------------------

/// Switches applied while turning files into datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Replace `Q2` by the beam energy `E` for `DISNEU` files.
    pub apply_disneu_transform: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            apply_disneu_transform: true,
        }
    }
}

impl LoadOptions {
    /// Transform registry honouring these options.
    pub fn registry(&self) -> TransformRegistry {
        let mut registry = TransformRegistry::default();
        if !self.apply_disneu_transform {
            registry.unregister(DISNEU_TAG);
        }
        registry
    }
}

// ---------------------------------------------------------------------------
// Value types handed to reporting and plotting layers
// ---------------------------------------------------------------------------

/// Mass and charge numbers of one nucleus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Nucleus {
    pub a: f64,
    pub z: f64,
}

/// Goodness of fit of one dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Chi2Entry {
    pub id: Option<i64>,
    pub chi2_per_dof: f64,
}

/// Grid points of one dataset in a two-variable kinematic plane.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KinematicReach {
    pub id: Option<i64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

// ---------------------------------------------------------------------------
// DatasetCollection
// ---------------------------------------------------------------------------

/// Datasets in load order. IDs are not required to be unique.
#[derive(Debug, Clone, Default)]
pub struct DatasetCollection {
    datasets: Vec<Dataset>,
}

impl DatasetCollection {
    pub fn from_datasets(datasets: Vec<Dataset>) -> Self {
        DatasetCollection { datasets }
    }

    /// Load every path in order; the first failing file aborts the load.
    pub fn load<P: AsRef<Path>>(paths: &[P], options: &LoadOptions) -> Result<Self> {
        let registry = options.registry();
        let datasets = paths
            .iter()
            .map(|p| Dataset::from_path(p.as_ref(), &registry))
            .collect::<Result<Vec<_>>>()?;
        info!("loaded {} datasets", datasets.len());
        Ok(Self::from_datasets(datasets))
    }

    /// Load every path in order, keeping going past failures. Files that
    /// could not be loaded are returned next to the collection.
    pub fn load_lenient<P: AsRef<Path>>(
        paths: &[P],
        options: &LoadOptions,
    ) -> (Self, Vec<(PathBuf, DataError)>) {
        let registry = options.registry();
        let mut datasets = Vec::with_capacity(paths.len());
        let mut failures = Vec::new();
        for path in paths {
            let path = path.as_ref();
            match Dataset::from_path(path, &registry) {
                Ok(ds) => datasets.push(ds),
                Err(e) => {
                    warn!("skipping {}: {e}", path.display());
                    failures.push((path.to_path_buf(), e));
                }
            }
        }
        info!(
            "loaded {} datasets, {} failed",
            datasets.len(),
            failures.len()
        );
        (Self::from_datasets(datasets), failures)
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dataset> {
        self.datasets.iter()
    }

    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    /// First dataset carrying `id`.
    pub fn get_by_id(&self, id: i64) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.id() == Some(id))
    }

    /// Datasets matching all metadata constraints, in load order.
    /// See [`select_datasets`] for how unknown keys are handled.
    pub fn filter_by(&self, filter: &MetadataFilter) -> Selection<'_> {
        select_datasets(&self.datasets, filter)
    }

    /// Distinct `(A, Z)` pairs over both beams of every dataset, first
    /// occurrence order. Pairs with a missing number are left out.
    pub fn nuclei_list(&self) -> Vec<Nucleus> {
        let mut nuclei: Vec<Nucleus> = Vec::new();
        for ds in &self.datasets {
            let meta = ds.metadata();
            for pair in [(meta.a1, meta.z1), (meta.a2, meta.z2)] {
                if let (Some(a), Some(z)) = pair {
                    let nucleus = Nucleus { a, z };
                    if !nuclei.contains(&nucleus) {
                        nuclei.push(nucleus);
                    }
                }
            }
        }
        nuclei
    }

    /// `(ID, chi2/dof)` for every dataset, ascending by ID. Stable, so equal
    /// IDs keep load order.
    pub fn chi2dof_by_id(&self) -> Vec<Chi2Entry> {
        let mut entries: Vec<Chi2Entry> = self
            .datasets
            .iter()
            .map(|d| Chi2Entry {
                id: d.id(),
                chi2_per_dof: d.chi2_per_dof(),
            })
            .collect();
        entries.sort_by_key(|e| e.id);
        entries
    }

    /// Grid points in the `(x, y)` plane for every dataset whose KinVar
    /// list has both variables.
    pub fn kinematic_reach(&self, x: &str, y: &str) -> Result<Vec<KinematicReach>> {
        let covering: Vec<&Dataset> = self
            .datasets
            .iter()
            .filter(|d| d.kin_var().iter().any(|k| k == x) && d.kin_var().iter().any(|k| k == y))
            .collect();
        info!(
            "datasets with {x} and {y} kinematic variables: {:?}",
            covering.iter().map(|d| d.id()).collect::<Vec<_>>()
        );
        covering
            .into_iter()
            .map(|d| {
                Ok(KinematicReach {
                    id: d.id(),
                    x: d.table().column(x)?,
                    y: d.table().column(y)?,
                })
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a DatasetCollection {
    type Item = &'a Dataset;
    type IntoIter = std::slice::Iter<'a, Dataset>;

    fn into_iter(self) -> Self::IntoIter {
        self.datasets.iter()
    }
}
