//! Stable multi-column sorting of alignment tables.

use crate::error::Result;
use crate::labeled::Table;
use std::cmp::Ordering;

/// Columns used by [`by_condition`], in priority order.
pub const CONDITION_COLUMNS: [&str; 2] = ["event_label", "event_index"];

/// Row permutation that sorts `table` ascending by `columns`.
///
/// Rows comparing equal on every column keep their original order.
pub fn sort_order(table: &Table, columns: &[&str]) -> Result<Vec<usize>> {
    let keys = columns
        .iter()
        .map(|name| table.try_column(name))
        .collect::<Result<Vec<_>>>()?;

    let mut order: Vec<usize> = (0..table.n_rows()).collect();
    order.sort_by(|&i, &j| {
        keys.iter()
            .map(|col| col.compare_rows(i, j))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    Ok(order)
}

/// Sort a table by one or more columns.
///
/// # Arguments
/// * `table` - Table to sort (not modified)
/// * `columns` - Sort keys, highest priority first
///
/// # Errors
/// [`AlignError::ColumnNotFound`](crate::error::AlignError::ColumnNotFound)
/// if a key column is absent.
///
/// # Examples
///
/// ```
/// use spike_align::labeled::{Column, Table};
/// use spike_align::sort::sort_table;
///
/// let table = Table::new(vec![
///     ("time".into(), Column::Float(vec![0.3, 0.1, 0.2])),
///     ("event_index".into(), Column::Index(vec![1, 0, 1])),
/// ])
/// .unwrap();
///
/// let sorted = sort_table(&table, &["event_index"]).unwrap();
/// assert_eq!(sorted.column("time").unwrap().as_float().unwrap(), &[0.1, 0.3, 0.2]);
/// ```
pub fn sort_table(table: &Table, columns: &[&str]) -> Result<Table> {
    let order = sort_order(table, columns)?;
    Ok(table.take_rows(&order))
}

/// Group rows by condition: sort by event label, then event index.
pub fn by_condition(table: &Table) -> Result<Table> {
    sort_table(table, &CONDITION_COLUMNS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::{align_times, AlignOptions};
    use crate::error::AlignError;
    use crate::labeled::{Column, Label};
    use crate::window::Window;

    fn labeled_table() -> Table {
        let events: Vec<f64> = (0..6).map(|i| i as f64).collect();
        let times: Vec<f64> = events.iter().flat_map(|&e| [e + 0.01, e + 0.02]).collect();
        let opts = AlignOptions::new().with_event_labels([3, 3, 2, 2, 1, 1]);
        align_times(&times, &events, Window::new(0.0, 0.5).unwrap(), &opts)
            .unwrap()
            .to_table()
            .unwrap()
    }

    #[test]
    fn test_by_condition_descending_labels() {
        let sorted = by_condition(&labeled_table()).unwrap();
        let labels = sorted.column("event_label").unwrap().as_label().unwrap();
        let index = sorted.column("event_index").unwrap().as_index().unwrap();
        for r in 1..sorted.n_rows() {
            let ord = labels[r - 1].total_cmp(&labels[r]);
            assert_ne!(ord, Ordering::Greater);
            if ord == Ordering::Equal {
                assert!(index[r - 1] <= index[r]);
            }
        }
        assert_eq!(labels[0], Label::Int(1));
        assert_eq!(index[..4], [4, 4, 5, 5]);
    }

    #[test]
    fn test_columns_permuted_together() {
        let table = labeled_table();
        let sorted = by_condition(&table).unwrap();
        assert_eq!(sorted.n_rows(), table.n_rows());
        let times = sorted.column("time").unwrap().as_float().unwrap();
        // event 4 has relative times 0.01 then 0.02
        assert!((times[0] - 0.01).abs() < 1e-9);
        assert!((times[1] - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_stable_ties() {
        let table = Table::new(vec![
            ("key".into(), Column::Index(vec![1, 0, 1, 0])),
            ("row".into(), Column::Index(vec![0, 1, 2, 3])),
        ])
        .unwrap();
        let sorted = sort_table(&table, &["key"]).unwrap();
        assert_eq!(sorted.column("row").unwrap().as_index().unwrap(), &[1, 3, 0, 2]);
    }

    #[test]
    fn test_missing_column() {
        let table = Table::new(vec![("time".into(), Column::Float(vec![0.0]))]).unwrap();
        assert_eq!(
            by_condition(&table).unwrap_err(),
            AlignError::ColumnNotFound("event_label".into())
        );
    }

    #[test]
    fn test_no_columns_keeps_order() {
        let table = labeled_table();
        assert_eq!(sort_table(&table, &[]).unwrap(), table);
    }

    #[test]
    fn test_float_column_total_order() {
        let table = Table::new(vec![(
            "time".into(),
            Column::Float(vec![0.5, -0.0, f64::NAN, -1.0]),
        )])
        .unwrap();
        assert_eq!(sort_order(&table, &["time"]).unwrap(), vec![3, 1, 0, 2]);
    }
}
