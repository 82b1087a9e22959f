//! Record filters, as held by the store and reported by the live grid.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::record::Record;
use crate::sort::default_comparator;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "like")]
    Like,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompoundOp {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundFilter {
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub op: CompoundOp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Filter {
    Compound(CompoundFilter),
    Field(FieldFilter),
}

impl Filter {
    pub fn field(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self::Field(FieldFilter {
            field: field.into(),
            op,
            value: value.into(),
        })
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Self::Compound(CompoundFilter {
            filters,
            op: CompoundOp::And,
        })
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Self::Compound(CompoundFilter {
            filters,
            op: CompoundOp::Or,
        })
    }

    pub fn test(&self, record: &Record) -> bool {
        match self {
            Self::Field(filter) => filter.test(record),
            Self::Compound(compound) => match compound.op {
                CompoundOp::And => compound.filters.iter().all(|f| f.test(record)),
                CompoundOp::Or => compound.filters.iter().any(|f| f.test(record)),
            },
        }
    }

    /// True if any nested field filter targets `field`.
    pub fn references_field(&self, field: &str) -> bool {
        match self {
            Self::Field(filter) => filter.field == field,
            Self::Compound(compound) => compound.filters.iter().any(|f| f.references_field(field)),
        }
    }
}

impl FieldFilter {
    pub fn test(&self, record: &Record) -> bool {
        let value = record.get(&self.field);
        match self.op {
            FilterOp::Like => {
                let needle = self.value.to_string().to_lowercase();
                value.to_string().to_lowercase().contains(&needle)
            }
            op => {
                let ord = default_comparator(value, &self.value);
                match op {
                    FilterOp::Eq => ord == Ordering::Equal,
                    FilterOp::Ne => ord != Ordering::Equal,
                    FilterOp::Gt => ord == Ordering::Greater,
                    FilterOp::Ge => ord != Ordering::Less,
                    FilterOp::Lt => ord == Ordering::Less,
                    FilterOp::Le => ord != Ordering::Greater,
                    FilterOp::Like => false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_compound_filters() {
        let rec = Record::new(1).with("px", 10).with("sym", "MSFT");
        let filter = Filter::and(vec![
            Filter::field("px", FilterOp::Ge, 10),
            Filter::or(vec![
                Filter::field("sym", FilterOp::Like, "ms"),
                Filter::field("sym", FilterOp::Eq, "AAPL"),
            ]),
        ]);
        assert!(filter.test(&rec));
        assert!(filter.references_field("sym"));
        assert!(!filter.references_field("qty"));
        assert!(!Filter::field("px", FilterOp::Lt, 5).test(&rec));
    }

    #[test]
    fn deserializes_nested_json() {
        let filter: Filter = serde_json::from_str(
            r#"{"op": "OR", "filters": [{"field": "a", "op": "=", "value": 1}]}"#,
        )
        .expect("parse");
        assert!(filter.references_field("a"));
        assert!(filter.test(&Record::new(1).with("a", 1)));
    }
}
