//! Unit identifiers and input-shape normalization.
//!
//! Timestamps can arrive as a single series, a list of series, a keyed map
//! of series, or a row-labeled [`UnitTable`]. [`TimesInput`] tags the shape
//! once at entry and [`TimesInput::resolve`] turns it into an ordered set of
//! `(UnitId, &[f64])` pairs, so the alignment engine never inspects the
//! shape again.
//!
//! Resolution order:
//! - single series: one unit, id `0`
//! - list: ids `0..len`
//! - map: keys in key order
//! - table: row labels in row order
//!
//! A caller-supplied id list replaces that order (and may restrict it).

use crate::error::{AlignError, Result};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::trace;

/// Default table field holding each unit's timestamps.
pub const DEFAULT_SPIKE_FIELD: &str = "spike_times";

/// Identifier of one timestamp source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum UnitId {
    Int(i64),
    Name(String),
}

impl UnitId {
    /// Position this id refers to in a list input, if it is a valid index.
    fn as_position(&self, len: usize) -> Option<usize> {
        match self {
            UnitId::Int(i) if *i >= 0 && (*i as u64) < len as u64 => Some(*i as usize),
            _ => None,
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitId::Int(i) => write!(f, "{}", i),
            UnitId::Name(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for UnitId {
    fn from(v: i64) -> Self {
        UnitId::Int(v)
    }
}

impl From<i32> for UnitId {
    fn from(v: i32) -> Self {
        UnitId::Int(v as i64)
    }
}

impl From<usize> for UnitId {
    fn from(v: usize) -> Self {
        UnitId::Int(v as i64)
    }
}

impl From<&str> for UnitId {
    fn from(v: &str) -> Self {
        UnitId::Name(v.to_string())
    }
}

impl From<String> for UnitId {
    fn from(v: String) -> Self {
        UnitId::Name(v)
    }
}

/// One named column of a [`UnitTable`].
#[derive(Debug, Clone, PartialEq)]
pub enum UnitField {
    /// A timestamp series per row.
    Series(Vec<Vec<f64>>),
    /// A scalar per row (e.g. firing rate, depth).
    Float(Vec<f64>),
    /// A text value per row (e.g. brain region, quality label).
    Text(Vec<String>),
}

impl UnitField {
    /// Number of rows in this column.
    pub fn len(&self) -> usize {
        match self {
            UnitField::Series(v) => v.len(),
            UnitField::Float(v) => v.len(),
            UnitField::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Row-labeled table of units.
///
/// Rows are indexed by [`UnitId`]; one or more fields hold a timestamp
/// series per row, the rest carry per-unit metadata.
///
/// ```
/// use spike_align::units::{UnitField, UnitTable};
///
/// let table = UnitTable::new(vec!["a".into(), "b".into()])
///     .unwrap()
///     .with_field("spike_times", UnitField::Series(vec![vec![0.1, 0.5], vec![0.2]]))
///     .unwrap()
///     .with_field("region", UnitField::Text(vec!["CA1".into(), "VISp".into()]))
///     .unwrap();
///
/// assert_eq!(table.n_rows(), 2);
/// assert_eq!(table.series("spike_times", &"b".into()).unwrap(), &[0.2]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct UnitTable {
    index: Vec<UnitId>,
    fields: Vec<(String, UnitField)>,
    positions: HashMap<UnitId, usize>,
}

impl UnitTable {
    /// Create a table with the given row labels and no fields.
    ///
    /// Fails with [`AlignError::DuplicateKey`] if a label repeats.
    pub fn new(index: Vec<UnitId>) -> Result<Self> {
        let mut positions = HashMap::with_capacity(index.len());
        for (row, id) in index.iter().enumerate() {
            if positions.insert(id.clone(), row).is_some() {
                return Err(AlignError::DuplicateKey(id.to_string()));
            }
        }
        Ok(Self {
            index,
            fields: Vec::new(),
            positions,
        })
    }

    /// Add a named field. Its length must match the row count.
    pub fn with_field(mut self, name: impl Into<String>, field: UnitField) -> Result<Self> {
        let name = name.into();
        if field.len() != self.index.len() {
            return Err(AlignError::ColumnLength {
                column: name,
                expected: self.index.len(),
                found: field.len(),
            });
        }
        if self.fields.iter().any(|(n, _)| *n == name) {
            return Err(AlignError::DuplicateKey(name));
        }
        self.fields.push((name, field));
        Ok(self)
    }

    /// Row labels in row order.
    #[inline]
    pub fn index(&self) -> &[UnitId] {
        &self.index
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    /// Field names in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn field(&self, name: &str) -> Option<&UnitField> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    /// Row position of a unit id.
    pub fn row_position(&self, id: &UnitId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// Timestamp series of unit `id` stored in field `field`.
    pub fn series(&self, field: &str, id: &UnitId) -> Result<&[f64]> {
        let rows = self.series_field(field)?;
        let row = self
            .row_position(id)
            .ok_or_else(|| AlignError::KeyNotFound(id.clone()))?;
        Ok(&rows[row])
    }

    fn series_field(&self, field: &str) -> Result<&[Vec<f64>]> {
        match self.field(field) {
            Some(UnitField::Series(rows)) => Ok(rows),
            Some(_) => Err(AlignError::FieldType {
                field: field.to_string(),
            }),
            None => Err(AlignError::MissingField {
                field: field.to_string(),
            }),
        }
    }
}

/// Shape-tagged timestamp input.
#[derive(Debug, Clone, Copy)]
pub enum TimesInput<'a> {
    /// One series; resolves to a single unit.
    Single(&'a [f64]),
    /// Positional series; unit ids are the positions.
    List(&'a [Vec<f64>]),
    /// Keyed series; unit ids are the keys.
    Map(&'a BTreeMap<UnitId, Vec<f64>>),
    /// Row-labeled table; unit ids are the row labels.
    Table(&'a UnitTable),
}

impl<'a> From<&'a [f64]> for TimesInput<'a> {
    fn from(v: &'a [f64]) -> Self {
        TimesInput::Single(v)
    }
}

impl<'a> From<&'a Vec<f64>> for TimesInput<'a> {
    fn from(v: &'a Vec<f64>) -> Self {
        TimesInput::Single(v)
    }
}

impl<'a> From<&'a [Vec<f64>]> for TimesInput<'a> {
    fn from(v: &'a [Vec<f64>]) -> Self {
        TimesInput::List(v)
    }
}

impl<'a> From<&'a Vec<Vec<f64>>> for TimesInput<'a> {
    fn from(v: &'a Vec<Vec<f64>>) -> Self {
        TimesInput::List(v)
    }
}

impl<'a> From<&'a BTreeMap<UnitId, Vec<f64>>> for TimesInput<'a> {
    fn from(v: &'a BTreeMap<UnitId, Vec<f64>>) -> Self {
        TimesInput::Map(v)
    }
}

impl<'a> From<&'a UnitTable> for TimesInput<'a> {
    fn from(v: &'a UnitTable) -> Self {
        TimesInput::Table(v)
    }
}

/// Units resolved from a [`TimesInput`]: ids and their series, in slot order.
#[derive(Debug, Clone)]
pub struct ResolvedUnits<'a> {
    ids: Vec<UnitId>,
    series: Vec<&'a [f64]>,
}

impl<'a> ResolvedUnits<'a> {
    /// Unit ids in slot order.
    #[inline]
    pub fn ids(&self) -> &[UnitId] {
        &self.ids
    }

    /// Series in slot order.
    #[inline]
    pub fn series(&self) -> &[&'a [f64]] {
        &self.series
    }

    /// Number of resolved units.
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Series of the first slot carrying `id`.
    pub fn get(&self, id: &UnitId) -> Option<&'a [f64]> {
        self.ids
            .iter()
            .position(|u| u == id)
            .map(|slot| self.series[slot])
    }

    /// `(id, series)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&UnitId, &'a [f64])> + '_ {
        self.ids.iter().zip(self.series.iter().copied())
    }

    fn push(&mut self, id: UnitId, series: &'a [f64]) {
        debug_assert!(
            series.windows(2).all(|w| w[0] <= w[1]),
            "timestamps of unit {} must be sorted ascending",
            id
        );
        trace!(unit = %id, n_times = series.len(), "resolved unit");
        self.ids.push(id);
        self.series.push(series);
    }
}

impl<'a> TimesInput<'a> {
    /// Resolve the input to an ordered unit set.
    ///
    /// # Arguments
    /// * `unit_ids` - Optional explicit ids; restricts and orders the units
    /// * `spike_field` - Table field holding the timestamps (tables only)
    ///
    /// # Errors
    /// * [`AlignError::KeyNotFound`] if a requested id is absent
    /// * [`AlignError::MissingField`] / [`AlignError::FieldType`] for a bad
    ///   table field
    /// * [`AlignError::InvalidParameter`] if more than one id is requested
    ///   for a single series
    pub fn resolve(
        &self,
        unit_ids: Option<&[UnitId]>,
        spike_field: &str,
    ) -> Result<ResolvedUnits<'a>> {
        let capacity = unit_ids.map_or_else(|| self.natural_len(), |ids| ids.len());
        let mut out = ResolvedUnits {
            ids: Vec::with_capacity(capacity),
            series: Vec::with_capacity(capacity),
        };

        match *self {
            TimesInput::Single(times) => match unit_ids {
                None => out.push(UnitId::Int(0), times),
                Some([id]) => out.push(id.clone(), times),
                Some([]) => {}
                Some(ids) => {
                    return Err(AlignError::InvalidParameter(format!(
                        "a single series resolves to one unit, got {} unit ids",
                        ids.len()
                    )))
                }
            },
            TimesInput::List(list) => match unit_ids {
                None => {
                    for (i, times) in list.iter().enumerate() {
                        out.push(UnitId::from(i), times);
                    }
                }
                Some(ids) => {
                    for id in ids {
                        let pos = id
                            .as_position(list.len())
                            .ok_or_else(|| AlignError::KeyNotFound(id.clone()))?;
                        out.push(id.clone(), &list[pos]);
                    }
                }
            },
            TimesInput::Map(map) => match unit_ids {
                None => {
                    for (id, times) in map {
                        out.push(id.clone(), times);
                    }
                }
                Some(ids) => {
                    for id in ids {
                        let times = map
                            .get(id)
                            .ok_or_else(|| AlignError::KeyNotFound(id.clone()))?;
                        out.push(id.clone(), times);
                    }
                }
            },
            TimesInput::Table(table) => {
                let rows = table.series_field(spike_field)?;
                match unit_ids {
                    None => {
                        for (id, times) in table.index().iter().zip(rows) {
                            out.push(id.clone(), times);
                        }
                    }
                    Some(ids) => {
                        for id in ids {
                            let row = table
                                .row_position(id)
                                .ok_or_else(|| AlignError::KeyNotFound(id.clone()))?;
                            out.push(id.clone(), &rows[row]);
                        }
                    }
                }
            }
        }

        Ok(out)
    }

    fn natural_len(&self) -> usize {
        match self {
            TimesInput::Single(_) => 1,
            TimesInput::List(l) => l.len(),
            TimesInput::Map(m) => m.len(),
            TimesInput::Table(t) => t.n_rows(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_series() -> Vec<Vec<f64>> {
        vec![vec![0.1, 0.2, 0.9], vec![0.5], vec![]]
    }

    fn sample_table() -> UnitTable {
        UnitTable::new(vec![UnitId::Int(10), UnitId::Int(20), UnitId::Int(30)])
            .unwrap()
            .with_field(DEFAULT_SPIKE_FIELD, UnitField::Series(sample_series()))
            .unwrap()
            .with_field("depth", UnitField::Float(vec![100.0, 250.0, 400.0]))
            .unwrap()
    }

    #[test]
    fn test_single_resolves_to_unit_zero() {
        let times = vec![1.0, 2.0];
        let resolved = TimesInput::from(&times).resolve(None, DEFAULT_SPIKE_FIELD).unwrap();
        assert_eq!(resolved.ids(), &[UnitId::Int(0)]);
        assert_eq!(resolved.series()[0], &[1.0, 2.0]);
    }

    #[test]
    fn test_single_with_singleton_id_relabels() {
        let times = vec![1.0, 2.0];
        let ids = vec![UnitId::from("probeA_12")];
        let resolved = TimesInput::from(&times)
            .resolve(Some(&ids[..]), DEFAULT_SPIKE_FIELD)
            .unwrap();
        assert_eq!(resolved.ids(), ids.as_slice());
        assert_eq!(resolved.get(&"probeA_12".into()), Some(&[1.0, 2.0][..]));
    }

    #[test]
    fn test_single_with_many_ids_fails() {
        let times = vec![1.0];
        let ids = vec![UnitId::Int(0), UnitId::Int(1)];
        let err = TimesInput::from(&times)
            .resolve(Some(&ids[..]), DEFAULT_SPIKE_FIELD)
            .unwrap_err();
        assert!(matches!(err, AlignError::InvalidParameter(_)));
    }

    #[test]
    fn test_list_positional_ids() {
        let list = sample_series();
        let resolved = TimesInput::from(&list).resolve(None, DEFAULT_SPIKE_FIELD).unwrap();
        assert_eq!(
            resolved.ids(),
            &[UnitId::Int(0), UnitId::Int(1), UnitId::Int(2)]
        );
        assert_eq!(resolved.series()[1], &[0.5]);
        assert!(resolved.series()[2].is_empty());
    }

    #[test]
    fn test_list_subset_reorders() {
        let list = sample_series();
        let ids = vec![UnitId::Int(2), UnitId::Int(0)];
        let resolved = TimesInput::from(&list)
            .resolve(Some(&ids[..]), DEFAULT_SPIKE_FIELD)
            .unwrap();
        assert_eq!(resolved.ids(), ids.as_slice());
        assert_eq!(resolved.series()[1], &[0.1, 0.2, 0.9]);
    }

    #[test]
    fn test_list_out_of_range_id() {
        let list = sample_series();
        for bad in [UnitId::Int(3), UnitId::Int(-1), UnitId::from("x")] {
            let err = TimesInput::from(&list)
                .resolve(Some(&[bad.clone()][..]), DEFAULT_SPIKE_FIELD)
                .unwrap_err();
            assert_eq!(err, AlignError::KeyNotFound(bad));
        }
    }

    #[test]
    fn test_map_keys_in_order() {
        let mut map = BTreeMap::new();
        map.insert(UnitId::from("b"), vec![2.0]);
        map.insert(UnitId::from("a"), vec![1.0]);
        let resolved = TimesInput::from(&map).resolve(None, DEFAULT_SPIKE_FIELD).unwrap();
        assert_eq!(resolved.ids(), &[UnitId::from("a"), UnitId::from("b")]);
        assert_eq!(resolved.get(&"b".into()), Some(&[2.0][..]));
    }

    #[test]
    fn test_map_missing_key() {
        let mut map = BTreeMap::new();
        map.insert(UnitId::from("a"), vec![1.0]);
        let err = TimesInput::from(&map)
            .resolve(Some(&[UnitId::from("zz")][..]), DEFAULT_SPIKE_FIELD)
            .unwrap_err();
        assert_eq!(err, AlignError::KeyNotFound("zz".into()));
    }

    #[test]
    fn test_table_row_labels() {
        let table = sample_table();
        let resolved = TimesInput::from(&table).resolve(None, DEFAULT_SPIKE_FIELD).unwrap();
        assert_eq!(
            resolved.ids(),
            &[UnitId::Int(10), UnitId::Int(20), UnitId::Int(30)]
        );
        assert_eq!(resolved.series()[0], &[0.1, 0.2, 0.9]);
    }

    #[test]
    fn test_table_subset_and_missing() {
        let table = sample_table();
        let resolved = TimesInput::from(&table)
            .resolve(Some(&[UnitId::Int(20)][..]), DEFAULT_SPIKE_FIELD)
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved.series()[0], &[0.5]);

        let err = TimesInput::from(&table)
            .resolve(Some(&[UnitId::Int(0)][..]), DEFAULT_SPIKE_FIELD)
            .unwrap_err();
        assert_eq!(err, AlignError::KeyNotFound(UnitId::Int(0)));
    }

    #[test]
    fn test_table_field_errors() {
        let table = sample_table();
        let err = TimesInput::from(&table).resolve(None, "times").unwrap_err();
        assert!(matches!(err, AlignError::MissingField { .. }));
        let err = TimesInput::from(&table).resolve(None, "depth").unwrap_err();
        assert!(matches!(err, AlignError::FieldType { .. }));
    }

    #[test]
    fn test_table_construction_errors() {
        let err = UnitTable::new(vec![UnitId::Int(1), UnitId::Int(1)]).unwrap_err();
        assert_eq!(err, AlignError::DuplicateKey("1".into()));

        let err = UnitTable::new(vec![UnitId::Int(1)])
            .unwrap()
            .with_field("spike_times", UnitField::Series(vec![]))
            .unwrap_err();
        assert!(matches!(
            err,
            AlignError::ColumnLength {
                expected: 1,
                found: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_shape_invariance() {
        let list = sample_series();
        let mut map = BTreeMap::new();
        let mut table = UnitTable::new((0..list.len()).map(UnitId::from).collect()).unwrap();
        for (i, s) in list.iter().enumerate() {
            map.insert(UnitId::from(i), s.clone());
        }
        table = table
            .with_field(DEFAULT_SPIKE_FIELD, UnitField::Series(list.clone()))
            .unwrap();

        let a = TimesInput::from(&list).resolve(None, DEFAULT_SPIKE_FIELD).unwrap();
        let b = TimesInput::from(&map).resolve(None, DEFAULT_SPIKE_FIELD).unwrap();
        let c = TimesInput::from(&table).resolve(None, DEFAULT_SPIKE_FIELD).unwrap();
        assert_eq!(a.ids(), b.ids());
        assert_eq!(a.ids(), c.ids());
        assert_eq!(a.series(), b.series());
        assert_eq!(a.series(), c.series());
    }

    #[test]
    fn test_unit_id_display_and_order() {
        assert_eq!(UnitId::from(4usize).to_string(), "4");
        assert_eq!(UnitId::from("ch1").to_string(), "ch1");
        assert!(UnitId::Int(100) < UnitId::from("a"));
    }
}
