use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::model::{Dataset, Field, Measure};

/// Which dimension to group by and which measure to sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSpec {
    pub group_by: Field,
    pub measure: Measure,
}

impl AggregationSpec {
    /// Group by item name, the dimension every category chart uses.
    pub fn by_item(measure: Measure) -> Self {
        AggregationSpec {
            group_by: Field::ItemName,
            measure,
        }
    }
}

/// Two-column result: one summed measure per group key, ordered by key.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub spec: AggregationSpec,
    pub groups: Vec<(String, f64)>,
}

impl Aggregate {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.groups.iter().map(|(_, v)| v).sum()
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.groups.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }
}

/// Group `dataset` by `spec.group_by` and sum `spec.measure` per group.
///
/// Rows without a group key are left out. Null or non-numeric measure
/// values count as zero, so a group present in the input always appears in
/// the output, and groups absent from the input never do.
pub fn aggregate(dataset: &Dataset, spec: AggregationSpec) -> Aggregate {
    let Some(key_idx) = dataset.field_index(spec.group_by) else {
        return Aggregate {
            spec,
            groups: Vec::new(),
        };
    };
    let measure_idx = dataset.field_index(spec.measure.field());

    let mut sums: BTreeMap<String, f64> = BTreeMap::new();
    for row in &dataset.rows {
        let Some(key) = row[key_idx].as_key() else {
            continue;
        };
        let value = measure_idx
            .and_then(|idx| row[idx].as_f64())
            .unwrap_or(0.0);
        *sums.entry(key).or_insert(0.0) += value;
    }

    Aggregate {
        spec,
        groups: sums.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Value;

    fn dataset(rows: &[(&str, Value)]) -> Dataset {
        Dataset::new(
            vec!["item_name".into(), "invoice_value".into()],
            rows.iter()
                .map(|(item, val)| vec![Value::String(item.to_string()), val.clone()])
                .collect(),
        )
    }

    #[test]
    fn sums_per_item() {
        let ds = dataset(&[
            ("A", Value::Integer(10)),
            ("A", Value::Integer(5)),
            ("B", Value::Integer(3)),
        ]);
        let agg = aggregate(&ds, AggregationSpec::by_item(Measure::InvoiceValue));
        assert_eq!(agg.groups, vec![("A".to_string(), 15.0), ("B".to_string(), 3.0)]);
    }

    #[test]
    fn nulls_count_as_zero_and_sums_are_conserved() {
        let ds = dataset(&[
            ("A", Value::Float(2.5)),
            ("A", Value::Null),
            ("B", Value::Null),
            ("C", Value::Float(4.0)),
        ]);
        let agg = aggregate(&ds, AggregationSpec::by_item(Measure::InvoiceValue));
        assert_eq!(agg.get("A"), Some(2.5));
        assert_eq!(agg.get("B"), Some(0.0));
        assert_eq!(agg.total(), 6.5);
    }

    #[test]
    fn missing_measure_column_sums_to_zero() {
        let ds = dataset(&[("A", Value::Integer(1))]);
        let agg = aggregate(&ds, AggregationSpec::by_item(Measure::Qty));
        assert_eq!(agg.groups, vec![("A".to_string(), 0.0)]);
    }

    #[test]
    fn missing_dimension_yields_no_groups() {
        let ds = Dataset::new(vec!["invoice_value".into()], vec![vec![Value::Integer(1)]]);
        assert!(aggregate(&ds, AggregationSpec::by_item(Measure::InvoiceValue)).is_empty());
    }

    #[test]
    fn empty_input_yields_no_groups() {
        let ds = Dataset::empty(vec!["item_name".into(), "invoice_value".into()]);
        assert!(aggregate(&ds, AggregationSpec::by_item(Measure::InvoiceValue)).is_empty());
    }
}
