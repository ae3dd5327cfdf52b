use std::collections::HashMap;

use super::error::{DataError, Result};

// ---------------------------------------------------------------------------
// DataTable – named columns over row-major f64 storage
// ---------------------------------------------------------------------------

/// Rectangular numeric table with an ordered schema and a name → index map.
///
/// With duplicate column names the first occurrence wins on lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<f64>>,
}

impl DataTable {
    /// Build a table, checking that every row matches the schema width.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(DataError::LengthMismatch {
                what: format!("row {i}"),
                expected: columns.len(),
                found: row.len(),
            });
        }
        Ok(Self::from_parts(columns, rows))
    }

    fn from_parts(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Self {
        let index = build_index(&columns);
        DataTable {
            columns,
            index,
            rows,
        }
    }

    /// Column names in schema order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Position of `name` in the schema.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| DataError::MissingColumn(name.to_string()))
    }

    /// All values of one column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| row[idx]).collect())
    }

    /// Project onto `names`, in the order given. Row order is kept.
    pub fn select(&self, names: &[&str]) -> Result<DataTable> {
        let picks = names
            .iter()
            .map(|name| self.column_index(name))
            .collect::<Result<Vec<_>>>()?;
        let rows = self
            .rows
            .iter()
            .map(|row| picks.iter().map(|&i| row[i]).collect())
            .collect();
        Ok(Self::from_parts(
            names.iter().map(|n| n.to_string()).collect(),
            rows,
        ))
    }

    /// Rows whose `column` equals `value` exactly (no tolerance).
    pub fn filter_equals(&self, column: &str, value: f64) -> Result<DataTable> {
        let idx = self.column_index(column)?;
        let rows = self
            .rows
            .iter()
            .filter(|row| row[idx] == value)
            .cloned()
            .collect();
        Ok(Self::from_parts(self.columns.clone(), rows))
    }

    /// Distinct values of `column`, sorted ascending.
    pub fn distinct_values(&self, column: &str) -> Result<Vec<f64>> {
        Ok(self
            .value_counts(column)?
            .into_iter()
            .map(|(value, _)| value)
            .collect())
    }

    /// Distinct values of `column` with their occurrence counts, sorted by value.
    pub fn value_counts(&self, column: &str) -> Result<Vec<(f64, usize)>> {
        let mut values = self.column(column)?;
        values.sort_by(|a, b| a.total_cmp(b));
        let mut counts: Vec<(f64, usize)> = Vec::new();
        for v in values {
            match counts.last_mut() {
                Some((last, n)) if same_value(*last, v) => *n += 1,
                _ => counts.push((v, 1)),
            }
        }
        Ok(counts)
    }

    /// Prepend a column. Meant for variant transforms; datasets only hand out `&DataTable`.
    pub fn insert_front(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(DataError::LengthMismatch {
                what: format!("column '{name}'"),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        self.columns.insert(0, name.to_string());
        for (row, v) in self.rows.iter_mut().zip(values) {
            row.insert(0, v);
        }
        self.index = build_index(&self.columns);
        Ok(())
    }

    /// Remove a column. Meant for variant transforms.
    pub fn drop_column(&mut self, name: &str) -> Result<()> {
        let idx = self.column_index(name)?;
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        self.index = build_index(&self.columns);
        Ok(())
    }
}

fn build_index(columns: &[String]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(columns.len());
    for (i, name) in columns.iter().enumerate() {
        index.entry(name.clone()).or_insert(i);
    }
    index
}

/// Grid-value identity: `==`, with all NaNs in one bucket.
fn same_value(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}
