use super::error::{DataError, Result};
use super::table::DataTable;

/// Column holding each row's contribution to the total chi-square.
pub const CHI2_COLUMN: &str = "chi2Corr";

/// Sum of `chi2Corr` over all rows. Zero for an empty table.
pub fn chi2_total(table: &DataTable) -> Result<f64> {
    Ok(table.column(CHI2_COLUMN)?.iter().sum())
}

/// `chi2_total / rows`. An empty table is an error rather than NaN or zero.
pub fn chi2_per_dof(table: &DataTable) -> Result<f64> {
    if table.is_empty() {
        return Err(DataError::EmptyDataset);
    }
    Ok(chi2_total(table)? / table.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn chi2_table(values: &[f64]) -> DataTable {
        DataTable::new(
            vec!["X".into(), CHI2_COLUMN.into()],
            values.iter().map(|&c| vec![0.0, c]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn totals_and_per_dof() {
        let t = chi2_table(&[0.25, 0.5, 1.25]);
        assert_eq!(chi2_total(&t).unwrap(), 2.0);
        assert!((chi2_per_dof(&t).unwrap() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_table_has_no_per_dof() {
        let t = chi2_table(&[]);
        assert_eq!(chi2_total(&t).unwrap(), 0.0);
        assert!(matches!(chi2_per_dof(&t), Err(DataError::EmptyDataset)));
    }

    #[test]
    fn missing_chi2_column() {
        let t = DataTable::new(vec!["X".into()], vec![vec![1.0]]).unwrap();
        assert!(matches!(chi2_total(&t), Err(DataError::MissingColumn(_))));
    }

    proptest! {
        #[test]
        fn per_dof_times_rows_is_total(values in prop::collection::vec(0.0f64..100.0, 1..64)) {
            let t = chi2_table(&values);
            let total = chi2_total(&t).unwrap();
            let dof = chi2_per_dof(&t).unwrap();
            prop_assert!((dof * values.len() as f64 - total).abs() <= 1e-9 * total.max(1.0));
        }
    }
}
