//! Data layer: file layout, tables, transforms and queries.
//!
//! Architecture:
//! ```text
//!   measurement file (.dat)
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  layout   │  fixed lines → metadata entries, schema, f64 rows
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────────────┐
//!   │ metadata + table  │  typed header, named columns
//!   └──────────────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ transform  │  TypeExp → variant (DISNEU: Q2 → E)
//!   └───────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ dataset   │  chi2 summary, KinVar queries
//!   └──────────┘
//!        │
//!        ▼
//!   ┌────────────┐
//!   │ collection  │  metadata filters, nuclei, chi2/dof by ID
//!   └────────────┘
//! ```

pub mod chi2;
pub mod collection;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod layout;
pub mod metadata;
pub mod table;
pub mod transform;
