//! Sort specifications and the default value ordering.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ModelError, Result};
use crate::value::Value;

/// Sort direction. Anything that is not recognisably descending parses as ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse_lenient(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Apply this direction to an ascending ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured sorter input, as found in configs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SorterConfig {
    pub col_id: String,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub abs: Option<bool>,
}

/// Anything [`GridSorter::parse`] accepts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum GridSorterLike {
    Text(String),
    Config(SorterConfig),
    #[serde(skip)]
    Sorter(GridSorter),
}

impl From<&str> for GridSorterLike {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for GridSorterLike {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<SorterConfig> for GridSorterLike {
    fn from(value: SorterConfig) -> Self {
        Self::Config(value)
    }
}

impl From<GridSorter> for GridSorterLike {
    fn from(value: GridSorter) -> Self {
        Self::Sorter(value)
    }
}

/// A column, direction and absolute-value flag.
///
/// Persists as the compact string `colId|sort|abs`, dropping trailing defaults.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GridSorter {
    pub col_id: String,
    pub sort: SortDirection,
    pub abs: bool,
}

impl GridSorter {
    pub fn new(col_id: impl Into<String>, sort: SortDirection, abs: bool) -> Self {
        Self {
            col_id: col_id.into(),
            sort,
            abs,
        }
    }

    pub fn asc(col_id: impl Into<String>) -> Self {
        Self::new(col_id, SortDirection::Asc, false)
    }

    pub fn desc(col_id: impl Into<String>) -> Self {
        Self::new(col_id, SortDirection::Desc, false)
    }

    /// Build from a config, normalizing unknown sort values to ascending.
    pub fn from_config(config: &SorterConfig) -> Result<Self> {
        if config.col_id.trim().is_empty() {
            return Err(ModelError::InvalidSorter(format!("{config:?}")));
        }
        Ok(Self::new(
            config.col_id.clone(),
            config
                .sort
                .as_deref()
                .map_or(SortDirection::Asc, SortDirection::parse_lenient),
            config.abs.unwrap_or(false),
        ))
    }

    pub fn parse(spec: impl Into<GridSorterLike>) -> Result<Self> {
        match spec.into() {
            GridSorterLike::Sorter(sorter) => Ok(sorter),
            GridSorterLike::Config(config) => Self::from_config(&config),
            GridSorterLike::Text(text) => text.parse(),
        }
    }

    /// `None` in, `None` out.
    pub fn parse_opt(spec: Option<impl Into<GridSorterLike>>) -> Result<Option<Self>> {
        spec.map(Self::parse).transpose()
    }

    /// Compare two values under this sorter's `abs` setting, ascending.
    pub fn comparator(&self, v1: &Value, v2: &Value) -> Ordering {
        if self.abs {
            default_comparator(&abs_value(v1), &abs_value(v2))
        } else {
            default_comparator(v1, v2)
        }
    }
}

impl FromStr for GridSorter {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('|');
        let col_id = parts.next().unwrap_or_default().trim();
        if col_id.is_empty() {
            return Err(ModelError::InvalidSorter(s.to_string()));
        }
        let sort = parts
            .next()
            .map_or(SortDirection::Asc, SortDirection::parse_lenient);
        let abs = parts.next().is_some_and(|it| it.trim() == "abs");
        Ok(Self::new(col_id, sort, abs))
    }
}

impl fmt::Display for GridSorter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.col_id)?;
        if self.sort != SortDirection::Asc || self.abs {
            write!(f, "|{}", self.sort)?;
        }
        if self.abs {
            f.write_str("|abs")?;
        }
        Ok(())
    }
}

impl Serialize for GridSorter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for GridSorter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let like = GridSorterLike::deserialize(deserializer)?;
        Self::parse(like).map_err(serde::de::Error::custom)
    }
}

fn abs_value(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(n.abs()),
        other => other.clone(),
    }
}

/// Total order over values.
///
/// Nulls sort first. Values with a numeric sort form (numbers, dates) compare
/// numerically. Strings use a case-insensitive collation that orders digit runs by
/// their numeric value. Remaining mixed kinds order by kind.
pub fn default_comparator(v1: &Value, v2: &Value) -> Ordering {
    match (v1.is_null(), v2.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }

    if let (Some(n1), Some(n2)) = (v1.sort_number(), v2.sort_number()) {
        return n1.total_cmp(&n2);
    }

    match (v1, v2) {
        (Value::Text(s1), Value::Text(s2)) => collate(s1, s2),
        (Value::Bool(b1), Value::Bool(b2)) => b1.cmp(b2),
        _ => kind_rank(v1).cmp(&kind_rank(v2)),
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) | Value::Date(_) => 2,
        Value::Text(_) => 3,
    }
}

/// Case-insensitive, numeric-aware string collation with an exact tie-break.
pub fn collate(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars().peekable();
    let mut bi = b.chars().peekable();
    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => break,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) if ca.is_ascii_digit() && cb.is_ascii_digit() => {
                let da = take_digits(&mut ai);
                let db = take_digits(&mut bi);
                let ord = compare_digit_runs(&da, &db);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(ca), Some(cb)) => {
                let ord = ca.to_lowercase().cmp(cb.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                ai.next();
                bi.next();
            }
        }
    }
    a.cmp(b)
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut ret = String::new();
    while let Some(c) = chars.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        ret.push(c);
        chars.next();
    }
    ret
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compact_form() {
        let sorter = GridSorter::parse("price|desc|abs").expect("parse");
        assert_eq!(sorter, GridSorter::new("price", SortDirection::Desc, true));
        assert_eq!(sorter.to_string(), "price|desc|abs");
    }

    #[test]
    fn omits_trailing_defaults() {
        assert_eq!(GridSorter::asc("name").to_string(), "name");
        assert_eq!(GridSorter::desc("name").to_string(), "name|desc");
        assert_eq!(
            GridSorter::new("name", SortDirection::Asc, true).to_string(),
            "name|asc|abs"
        );
    }

    #[test]
    fn unknown_sort_is_ascending() {
        let sorter = GridSorter::parse(SorterConfig {
            col_id: "a".into(),
            sort: Some("sideways".into()),
            abs: None,
        })
        .expect("parse");
        assert_eq!(sorter.sort, SortDirection::Asc);
        assert!(!sorter.abs);
    }

    #[test]
    fn none_parses_to_none() {
        assert_eq!(GridSorter::parse_opt(None::<&str>).expect("parse"), None);
    }

    #[test]
    fn instance_is_returned_unchanged() {
        let sorter = GridSorter::desc("a");
        assert_eq!(GridSorter::parse(sorter.clone()).expect("parse"), sorter);
    }

    #[test]
    fn empty_col_id_is_rejected() {
        assert!(GridSorter::parse("|desc").is_err());
    }

    #[test]
    fn nulls_sort_first() {
        assert_eq!(default_comparator(&Value::Null, &Value::Null), Ordering::Equal);
        assert_eq!(
            default_comparator(&Value::Null, &Value::number(1)),
            Ordering::Less
        );
        assert_eq!(
            default_comparator(&Value::text("a"), &Value::Null),
            Ordering::Greater
        );
    }

    #[test]
    fn abs_comparator_ignores_sign() {
        let sorter = GridSorter::new("x", SortDirection::Asc, true);
        assert_eq!(
            sorter.comparator(&Value::number(-5), &Value::number(3)),
            Ordering::Greater
        );
        assert_eq!(
            GridSorter::asc("x").comparator(&Value::number(-5), &Value::number(3)),
            Ordering::Less
        );
    }

    #[test]
    fn strings_collate_numerically_and_case_insensitively() {
        assert_eq!(collate("item2", "item10"), Ordering::Less);
        assert_eq!(collate("apple", "Banana"), Ordering::Less);
        assert_eq!(collate("a", "A"), "a".cmp("A"));
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&GridSorter::desc("px")).expect("serialize");
        assert_eq!(json, r#""px|desc""#);
        let back: GridSorter =
            serde_json::from_str(r#"{"col_id": "px", "sort": "desc"}"#).expect("deserialize");
        assert_eq!(back, GridSorter::desc("px"));
    }
}
