//! Labeled output structures.
//!
//! [`Table`] is a row table built from named, equal-length columns (the
//! unbinned result). [`LabeledArray`] pairs a [`CountArray`] with one named
//! coordinate axis per dimension (the binned result). Both only validate
//! shapes; they carry no numeric behavior of their own.

use crate::array::CountArray;
use crate::error::{AlignError, Result};
use crate::units::UnitId;
use std::cmp::Ordering;
use std::fmt;

/// Atomic event label.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Label {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Label {
    /// Total order: numbers before text (lexicographic).
    ///
    /// Integers and floats compare by exact value, so `Int(2^53 + 1)` is
    /// above `Float(2^53)`. Floats follow IEEE total order except that `-0.0`
    /// equals `0.0`; NaN sorts above every number (below, if negative).
    pub fn total_cmp(&self, other: &Label) -> Ordering {
        match (self, other) {
            (Label::Int(a), Label::Int(b)) => a.cmp(b),
            (Label::Float(a), Label::Float(b)) => cmp_float(*a, *b),
            (Label::Int(a), Label::Float(b)) => cmp_int_float(*a, *b),
            (Label::Float(a), Label::Int(b)) => cmp_int_float(*b, *a).reverse(),
            (Label::Text(a), Label::Text(b)) => a.cmp(b),
            (Label::Text(_), _) => Ordering::Greater,
            (_, Label::Text(_)) => Ordering::Less,
        }
    }
}

fn cmp_float(a: f64, b: f64) -> Ordering {
    if a == b {
        Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}

/// Exact comparison of an integer with a float.
fn cmp_int_float(i: i64, f: f64) -> Ordering {
    // 2^63, the first float above every i64.
    const I64_END: f64 = 9_223_372_036_854_775_808.0;

    if f.is_nan() {
        return if f.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if f >= I64_END {
        return Ordering::Less;
    }
    if f < -I64_END {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(f - whole)).unwrap_or(Ordering::Equal),
        ord => ord,
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Int(v) => write!(f, "{}", v),
            Label::Float(v) => write!(f, "{}", v),
            Label::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Label {
    fn from(v: i64) -> Self {
        Label::Int(v)
    }
}

impl From<i32> for Label {
    fn from(v: i32) -> Self {
        Label::Int(v as i64)
    }
}

impl From<f64> for Label {
    fn from(v: f64) -> Self {
        Label::Float(v)
    }
}

impl From<&str> for Label {
    fn from(v: &str) -> Self {
        Label::Text(v.to_string())
    }
}

impl From<String> for Label {
    fn from(v: String) -> Self {
        Label::Text(v)
    }
}

/// Typed column (or coordinate) values.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Float(Vec<f64>),
    Index(Vec<usize>),
    Unit(Vec<UnitId>),
    Label(Vec<Label>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Index(v) => v.len(),
            Column::Unit(v) => v.len(),
            Column::Label(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_float(&self) -> Option<&[f64]> {
        match self {
            Column::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_index(&self) -> Option<&[usize]> {
        match self {
            Column::Index(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_unit(&self) -> Option<&[UnitId]> {
        match self {
            Column::Unit(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&[Label]> {
        match self {
            Column::Label(v) => Some(v),
            _ => None,
        }
    }

    /// Ordering of rows `i` and `j` within this column.
    pub fn compare_rows(&self, i: usize, j: usize) -> Ordering {
        match self {
            Column::Float(v) => v[i].total_cmp(&v[j]),
            Column::Index(v) => v[i].cmp(&v[j]),
            Column::Unit(v) => v[i].cmp(&v[j]),
            Column::Label(v) => v[i].total_cmp(&v[j]),
        }
    }

    /// New column with rows taken in `order`.
    pub fn take(&self, order: &[usize]) -> Column {
        match self {
            Column::Float(v) => Column::Float(order.iter().map(|&i| v[i]).collect()),
            Column::Index(v) => Column::Index(order.iter().map(|&i| v[i]).collect()),
            Column::Unit(v) => Column::Unit(order.iter().map(|&i| v[i].clone()).collect()),
            Column::Label(v) => Column::Label(order.iter().map(|&i| v[i].clone()).collect()),
        }
    }
}

/// Row table of named, equal-length columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<(String, Column)>,
    n_rows: usize,
}

impl Table {
    /// Build a table from named columns.
    ///
    /// # Errors
    /// * [`AlignError::ColumnLength`] if the columns differ in length
    /// * [`AlignError::DuplicateKey`] if a column name repeats
    pub fn new(columns: Vec<(String, Column)>) -> Result<Self> {
        let n_rows = columns.first().map_or(0, |(_, c)| c.len());
        for (i, (name, col)) in columns.iter().enumerate() {
            if col.len() != n_rows {
                return Err(AlignError::ColumnLength {
                    column: name.clone(),
                    expected: n_rows,
                    found: col.len(),
                });
            }
            if columns[..i].iter().any(|(n, _)| n == name) {
                return Err(AlignError::DuplicateKey(name.clone()));
            }
        }
        Ok(Self { columns, n_rows })
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    /// Like [`Table::column`] but fails with [`AlignError::ColumnNotFound`].
    pub fn try_column(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| AlignError::ColumnNotFound(name.to_string()))
    }

    /// Columns in order.
    pub fn columns(&self) -> &[(String, Column)] {
        &self.columns
    }

    /// New table with rows taken in `order` (every column permuted alike).
    pub fn take_rows(&self, order: &[usize]) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|(n, c)| (n.clone(), c.take(order)))
                .collect(),
            n_rows: order.len(),
        }
    }
}

/// A named coordinate axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub name: String,
    pub coords: Column,
}

impl Axis {
    pub fn new(name: impl Into<String>, coords: Column) -> Self {
        Self {
            name: name.into(),
            coords,
        }
    }
}

/// Count array with one named coordinate axis per dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledArray {
    data: CountArray,
    axes: Vec<Axis>,
}

impl LabeledArray {
    /// Attach axes to `data`, in dimension order.
    ///
    /// # Errors
    /// [`AlignError::ShapeMismatch`] if the axis count differs from the
    /// array's dimensionality or an axis length differs from its dimension.
    pub fn new(data: CountArray, axes: Vec<Axis>) -> Result<Self> {
        let shape = data.shape();
        if axes.len() != shape.len() {
            return Err(AlignError::ShapeMismatch {
                axis: "<dims>".to_string(),
                expected: shape.len(),
                found: axes.len(),
            });
        }
        for (axis, &dim) in axes.iter().zip(&shape) {
            if axis.coords.len() != dim {
                return Err(AlignError::ShapeMismatch {
                    axis: axis.name.clone(),
                    expected: dim,
                    found: axis.coords.len(),
                });
            }
        }
        Ok(Self { data, axes })
    }

    #[inline]
    pub fn data(&self) -> &CountArray {
        &self.data
    }

    #[inline]
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Axis names in dimension order.
    pub fn dims(&self) -> Vec<&str> {
        self.axes.iter().map(|a| a.name.as_str()).collect()
    }

    /// Coordinates of the named axis.
    pub fn coords(&self, name: &str) -> Option<&Column> {
        self.axes.iter().find(|a| a.name == name).map(|a| &a.coords)
    }

    pub fn into_parts(self) -> (CountArray, Vec<Axis>) {
        (self.data, self.axes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_order() {
        let mut labels = vec![
            Label::from("b"),
            Label::from(2.5),
            Label::from(3),
            Label::from("a"),
            Label::from(-1),
        ];
        labels.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(
            labels,
            vec![
                Label::Int(-1),
                Label::Float(2.5),
                Label::Int(3),
                Label::from("a"),
                Label::from("b"),
            ]
        );
    }

    #[test]
    fn test_label_order_exact_beyond_f64_precision() {
        let big = 1_i64 << 53;
        let above = Label::Int(big + 1);
        let float = Label::Float(big as f64);
        let exact = Label::Int(big);

        assert_eq!(above.total_cmp(&float), Ordering::Greater);
        assert_eq!(float.total_cmp(&above), Ordering::Less);
        assert_eq!(exact.total_cmp(&float), Ordering::Equal);
        assert_eq!(above.total_cmp(&exact), Ordering::Greater);

        let mut labels = vec![above.clone(), float.clone(), exact.clone(), Label::Float(0.5)];
        labels.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(labels, vec![Label::Float(0.5), float, exact, above]);
    }

    #[test]
    fn test_label_order_mixed_edge_values() {
        assert_eq!(Label::Int(2).total_cmp(&Label::Float(2.5)), Ordering::Less);
        assert_eq!(Label::Int(-2).total_cmp(&Label::Float(-2.5)), Ordering::Greater);
        assert_eq!(Label::Int(-3).total_cmp(&Label::Float(-2.5)), Ordering::Less);
        assert_eq!(Label::Int(0).total_cmp(&Label::Float(-0.0)), Ordering::Equal);
        assert_eq!(Label::Float(-0.0).total_cmp(&Label::Float(0.0)), Ordering::Equal);
        assert_eq!(Label::Int(i64::MAX).total_cmp(&Label::Float(f64::INFINITY)), Ordering::Less);
        assert_eq!(Label::Int(i64::MIN).total_cmp(&Label::Float(-1e19)), Ordering::Greater);
        assert_eq!(Label::Int(i64::MIN).total_cmp(&Label::Float(i64::MIN as f64)), Ordering::Equal);
        assert_eq!(Label::Int(5).total_cmp(&Label::Float(f64::NAN)), Ordering::Less);
        assert_eq!(Label::Float(f64::NAN).total_cmp(&Label::Int(5)), Ordering::Greater);
        assert_eq!(Label::Float(f64::NAN).total_cmp(&Label::from("a")), Ordering::Less);
    }

    #[test]
    fn test_table_new_validates_lengths() {
        let err = Table::new(vec![
            ("time".into(), Column::Float(vec![0.0, 1.0])),
            ("event_index".into(), Column::Index(vec![0])),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            AlignError::ColumnLength {
                column: "event_index".into(),
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_table_duplicate_column() {
        let err = Table::new(vec![
            ("a".into(), Column::Index(vec![0])),
            ("a".into(), Column::Index(vec![1])),
        ])
        .unwrap_err();
        assert_eq!(err, AlignError::DuplicateKey("a".into()));
    }

    #[test]
    fn test_table_access_and_take() {
        let table = Table::new(vec![
            ("time".into(), Column::Float(vec![0.1, 0.2, 0.3])),
            ("event_index".into(), Column::Index(vec![2, 0, 1])),
        ])
        .unwrap();
        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.column_names(), vec!["time", "event_index"]);
        assert!(table.column("unit_id").is_none());
        assert!(matches!(
            table.try_column("unit_id"),
            Err(AlignError::ColumnNotFound(_))
        ));

        let t = table.take_rows(&[1, 2, 0]);
        assert_eq!(t.column("time").unwrap().as_float().unwrap(), &[0.2, 0.3, 0.1]);
        assert_eq!(
            t.column("event_index").unwrap().as_index().unwrap(),
            &[0, 1, 2]
        );
    }

    #[test]
    fn test_empty_table() {
        let table = Table::new(vec![]).unwrap();
        assert_eq!(table.n_rows(), 0);
        assert_eq!(table.n_cols(), 0);
    }

    #[test]
    fn test_labeled_array_shape_checks() {
        let data = CountArray::zeros(3, 2, None);
        let ok = LabeledArray::new(
            data.clone(),
            vec![
                Axis::new("time", Column::Float(vec![0.0, 0.1, 0.2])),
                Axis::new("event_index", Column::Index(vec![0, 1])),
            ],
        )
        .unwrap();
        assert_eq!(ok.dims(), vec!["time", "event_index"]);
        assert_eq!(ok.coords("event_index").unwrap().len(), 2);

        let err = LabeledArray::new(
            data.clone(),
            vec![Axis::new("time", Column::Float(vec![0.0, 0.1, 0.2]))],
        )
        .unwrap_err();
        assert!(matches!(err, AlignError::ShapeMismatch { .. }));

        let err = LabeledArray::new(
            data,
            vec![
                Axis::new("time", Column::Float(vec![0.0, 0.1])),
                Axis::new("event_index", Column::Index(vec![0, 1])),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err,
            AlignError::ShapeMismatch {
                axis: "time".into(),
                expected: 3,
                found: 2
            }
        );
    }
}
