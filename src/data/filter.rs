use std::collections::BTreeMap;

use log::{info, warn};

use super::dataset::Dataset;
use super::error::{DataError, Result};
use super::metadata::{Metadata, MetadataValue};
use super::table::DataTable;

// ---------------------------------------------------------------------------
// Filter predicates
// ---------------------------------------------------------------------------

/// Kinematic constraints: KinVar name → exact grid value.
pub type KinVarFilter = BTreeMap<String, f64>;

/// Metadata constraints: field name (`ID`, `Z1`, `TypeExp`, ...) → value.
pub type MetadataFilter = BTreeMap<String, MetadataValue>;

/// Narrow `table` by every constraint in turn (logical AND).
///
/// Every key must be one of `kin_var`; otherwise nothing is filtered and
/// `UnknownQueryKey` is returned, which callers can tell apart from an
/// `Ok` table with zero rows.
pub fn filter_table(table: &DataTable, kin_var: &[String], filter: &KinVarFilter) -> Result<DataTable> {
    if let Some(key) = filter.keys().find(|key| !kin_var.contains(*key)) {
        warn!("'{key}' is not a kinematic variable of this dataset ({kin_var:?})");
        return Err(DataError::UnknownQueryKey(key.clone()));
    }
    filter
        .iter()
        .try_fold(table.clone(), |narrowed, (key, value)| {
            narrowed.filter_equals(key, *value)
        })
}

// ---------------------------------------------------------------------------
// Collection-level selection
// ---------------------------------------------------------------------------

/// Datasets passing a [`MetadataFilter`], in collection order, together
/// with the keys that were not recognised and therefore skipped.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    pub datasets: Vec<&'a Dataset>,
    pub ignored_keys: Vec<String>,
}

impl<'a> Selection<'a> {
    /// `false` when at least one key was not a metadata field.
    pub fn is_valid(&self) -> bool {
        self.ignored_keys.is_empty()
    }

    /// IDs of the selected datasets, in collection order.
    pub fn ids(&self) -> Vec<Option<i64>> {
        self.datasets.iter().map(|d| d.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

/// Keep the datasets whose metadata matches every recognised constraint.
///
/// Unknown field names are reported and leave the working set unchanged.
/// A known field the file never set matches nothing.
pub fn select_datasets<'a>(datasets: &'a [Dataset], filter: &MetadataFilter) -> Selection<'a> {
    let mut working: Vec<&Dataset> = datasets.iter().collect();
    let mut ignored_keys = Vec::new();

    for (key, wanted) in filter {
        if !Metadata::field_names().any(|name| name == key) {
            warn!("key '{key}' does not match any metadata field, ignored");
            ignored_keys.push(key.clone());
            continue;
        }
        working.retain(|d| match d.metadata().field(key) {
            Ok(Some(value)) => value.matches(wanted),
            _ => false,
        });
    }

    let selection = Selection {
        datasets: working,
        ignored_keys,
    };
    info!("ID datasets found: {:?}", selection.ids());
    selection
}
