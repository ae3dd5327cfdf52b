//! Reader and query layer for data-vs-theory grid files.

pub mod config;
pub mod data;

pub use data::collection::{Chi2Entry, DatasetCollection, KinematicReach, LoadOptions, Nucleus};
pub use data::dataset::{BinPanel, BinRatio, Dataset, Series};
pub use data::error::{DataError, Result};
pub use data::filter::{KinVarFilter, MetadataFilter, Selection};
pub use data::metadata::{Metadata, MetadataValue};
pub use data::table::DataTable;
pub use data::transform::{DisNeu, Identity, TransformRegistry, VariantTransform};
