//! Experiment-type specific rewrites applied once, right after parsing.
//!
//! A [`TransformRegistry`] maps the `TypeExp` tag of a file to the
//! [`VariantTransform`] that prepares its table. Tags without an entry get
//! [`Identity`]. New experiment types only need a new `register` call.

use std::collections::HashMap;

use log::debug;

use super::error::Result;
use super::table::DataTable;

/// Proton mass in GeV used to derive the beam energy.
pub const PROTON_MASS_GEV: f64 = 0.938;

/// Tag of the neutral-current DIS experiments.
pub const DISNEU_TAG: &str = "DISNEU";

/// A one-time structural rewrite of a table and its kinematic variable list.
pub trait VariantTransform: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Rewrite `table` and `kin_var` in place. On error neither is usable.
    fn apply(&self, table: &mut DataTable, kin_var: &mut Vec<String>) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Leaves everything as parsed.
#[derive(Debug, Default, Clone, Copy)]
pub struct Identity;

impl VariantTransform for Identity {
    fn name(&self) -> &str {
        "identity"
    }

    fn apply(&self, _table: &mut DataTable, _kin_var: &mut Vec<String>) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DISNEU: Q2 → E
// ---------------------------------------------------------------------------

/// Replaces `Q2` by the beam energy `E = Q2 / (2 m_p x y)`.
///
/// Each `E` is rounded to the nearest integer, ties to even, so nearby
/// bins collapse onto the nominal beam energy. `E` becomes the first column
/// and the first kinematic variable.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisNeu;

impl DisNeu {
    /// Beam energy for one grid point, rounded half to even.
    pub fn beam_energy(q2: f64, x: f64, y: f64) -> f64 {
        Self::round_energy(q2 / (2.0 * PROTON_MASS_GEV * x * y))
    }

    /// Nearest integer; exact halves go to the even neighbour.
    pub fn round_energy(energy: f64) -> f64 {
        energy.round_ties_even()
    }
}

impl VariantTransform for DisNeu {
    fn name(&self) -> &str {
        DISNEU_TAG
    }

    fn apply(&self, table: &mut DataTable, kin_var: &mut Vec<String>) -> Result<()> {
        let q2 = table.column_index("Q2")?;
        let x = table.column_index("X")?;
        let y = table.column_index("Y")?;

        let energies: Vec<f64> = table
            .rows()
            .iter()
            .map(|row| DisNeu::beam_energy(row[q2], row[x], row[y]))
            .collect();

        table.drop_column("Q2")?;
        table.insert_front("E", energies)?;

        kin_var.insert(0, "E".to_string());
        match kin_var.iter().position(|k| k == "Q2") {
            Some(pos) => {
                kin_var.remove(pos);
            }
            None => debug!("Q2 column present but not listed as a kinematic variable"),
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Tag → transform lookup with an identity fallback.
pub struct TransformRegistry {
    variants: HashMap<String, Box<dyn VariantTransform>>,
    fallback: Identity,
}

impl Default for TransformRegistry {
    /// Registry with every built-in variant.
    fn default() -> Self {
        let mut registry = TransformRegistry::empty();
        registry.register(DISNEU_TAG, DisNeu);
        registry
    }
}

impl TransformRegistry {
    /// Registry where every tag maps to [`Identity`].
    pub fn empty() -> Self {
        TransformRegistry {
            variants: HashMap::new(),
            fallback: Identity,
        }
    }

    /// Bind `tag` to `transform`, replacing any previous binding.
    pub fn register(&mut self, tag: &str, transform: impl VariantTransform + 'static) {
        self.variants.insert(tag.to_string(), Box::new(transform));
    }

    /// Drop the binding for `tag`, so it falls back to [`Identity`].
    pub fn unregister(&mut self, tag: &str) {
        self.variants.remove(tag);
    }

    /// Transform for a `TypeExp` tag. Missing tags resolve to [`Identity`].
    pub fn resolve(&self, type_exp: Option<&str>) -> &dyn VariantTransform {
        type_exp
            .and_then(|tag| self.variants.get(tag))
            .map(|t| t.as_ref())
            .unwrap_or(&self.fallback)
    }

    /// Resolve and apply in one step.
    pub fn apply(
        &self,
        type_exp: Option<&str>,
        table: &mut DataTable,
        kin_var: &mut Vec<String>,
    ) -> Result<()> {
        let transform = self.resolve(type_exp);
        debug!(
            "applying '{}' transform for TypeExp {:?}",
            transform.name(),
            type_exp
        );
        transform.apply(table, kin_var)
    }
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<&String> = self.variants.keys().collect();
        tags.sort();
        f.debug_struct("TransformRegistry").field("tags", &tags).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::error::DataError;
    use pretty_assertions::assert_eq;

    fn dis_table() -> (DataTable, Vec<String>) {
        let table = DataTable::new(
            ["Q2", "X", "Y", "data", "theory", "totErrorUncor", "chi2Corr"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            vec![
                vec![4.0, 0.1, 0.5, 1.0, 1.05, 0.1, 0.25],
                vec![8.0, 0.2, 0.5, 0.9, 0.95, 0.1, 0.5],
            ],
        )
        .unwrap();
        let kin_var = vec!["Q2".to_string(), "X".to_string(), "Y".to_string()];
        (table, kin_var)
    }

    #[test]
    fn beam_energy_rounds_each_point() {
        // 4 / (2 * 0.938 * 0.1 * 0.5) = 42.64...
        assert_eq!(DisNeu::beam_energy(4.0, 0.1, 0.5), 43.0);
        // 100 / (2 * 0.938 * 0.5 * 0.4) = 266.52...
        assert_eq!(DisNeu::beam_energy(100.0, 0.5, 0.4), 267.0);
        // 10 / (2 * 0.938 * 0.9 * 0.9) = 6.58...
        assert_eq!(DisNeu::beam_energy(10.0, 0.9, 0.9), 7.0);
    }

    #[test]
    fn energy_ties_round_to_even() {
        assert_eq!(DisNeu::round_energy(2.5), 2.0);
        assert_eq!(DisNeu::round_energy(3.5), 4.0);
        assert_eq!(DisNeu::round_energy(42.5), 42.0);
        assert_eq!(DisNeu::round_energy(-2.5), -2.0);
        assert_eq!(DisNeu::round_energy(2.5000001), 3.0);
    }

    #[test]
    fn disneu_moves_e_to_front_and_drops_q2() {
        let (mut table, mut kin_var) = dis_table();
        DisNeu.apply(&mut table, &mut kin_var).unwrap();
        assert_eq!(
            table.columns(),
            &["E", "X", "Y", "data", "theory", "totErrorUncor", "chi2Corr"]
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()[..]
        );
        assert_eq!(kin_var, vec!["E", "X", "Y"]);
        assert_eq!(table.column("E").unwrap(), vec![43.0, 43.0]);
        assert_eq!(table.column("chi2Corr").unwrap(), vec![0.25, 0.5]);
    }

    #[test]
    fn disneu_requires_q2_x_y() {
        let (table, kin_var) = dis_table();
        for missing in ["Q2", "X", "Y"] {
            let mut t = table.clone();
            let mut k = kin_var.clone();
            t.drop_column(missing).unwrap();
            match DisNeu.apply(&mut t, &mut k) {
                Err(DataError::MissingColumn(c)) => assert_eq!(c, missing),
                other => panic!("expected missing column, got {other:?}"),
            }
        }
    }

    #[test]
    fn second_application_fails_on_missing_q2() {
        let (mut table, mut kin_var) = dis_table();
        DisNeu.apply(&mut table, &mut kin_var).unwrap();
        assert!(DisNeu.apply(&mut table, &mut kin_var).is_err());
    }

    #[test]
    fn identity_changes_nothing() {
        let (mut table, mut kin_var) = dis_table();
        let before = (table.clone(), kin_var.clone());
        Identity.apply(&mut table, &mut kin_var).unwrap();
        assert_eq!((table, kin_var), before);
    }

    #[test]
    fn registry_dispatches_by_tag() {
        let registry = TransformRegistry::default();
        assert_eq!(registry.resolve(Some("DISNEU")).name(), "DISNEU");
        assert_eq!(registry.resolve(Some("DISCC")).name(), "identity");
        assert_eq!(registry.resolve(None).name(), "identity");

        let mut registry = registry;
        registry.unregister(DISNEU_TAG);
        assert_eq!(registry.resolve(Some("DISNEU")).name(), "identity");
    }

    #[test]
    fn custom_variants_plug_in_without_touching_callers() {
        struct Rename;
        impl VariantTransform for Rename {
            fn name(&self) -> &str {
                "rename"
            }
            fn apply(&self, table: &mut DataTable, kin_var: &mut Vec<String>) -> Result<()> {
                let values = table.column("X")?;
                table.drop_column("X")?;
                table.insert_front("x", values)?;
                kin_var[1] = "x".to_string();
                Ok(())
            }
        }

        let mut registry = TransformRegistry::empty();
        registry.register("SIA", Rename);
        let (mut table, mut kin_var) = dis_table();
        registry.apply(Some("SIA"), &mut table, &mut kin_var).unwrap();
        assert_eq!(table.columns()[0], "x");
        assert_eq!(kin_var, vec!["Q2", "x", "Y"]);
    }
}
