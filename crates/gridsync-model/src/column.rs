//! Declarative column and column-group definitions.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ModelError, RenderError, Result};
use crate::record::Record;
use crate::value::Value;

/// Width given to columns that declare none.
pub const DEFAULT_WIDTH: u32 = 60;

/// Minimum width assumed for flex columns that declare none.
pub const FLEX_COL_MIN_WIDTH: u32 = 30;

/// Prefix of column ids generated by the live engine (auto-group, pivot secondaries).
pub const ENGINE_COLUMN_PREFIX: &str = "ag-Grid";

/// Id of the engine's synthetic tree/group column.
pub const AUTO_GROUP_COL_ID: &str = "ag-Grid-AutoColumn";

pub type RenderFn = Arc<dyn Fn(&Value, &Record) -> std::result::Result<String, RenderError> + Send + Sync>;
pub type HeaderFn = Arc<dyn Fn() -> std::result::Result<String, RenderError> + Send + Sync>;
pub type CellClassFn = Arc<dyn Fn(&Value, &Record) -> Vec<String> + Send + Sync>;
pub type CellClassRule = Arc<dyn Fn(&Value, &Record) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pinned {
    Left,
    Right,
}

impl fmt::Display for Pinned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}

/// Header text, either fixed or produced on demand.
#[derive(Clone)]
pub enum HeaderName {
    Text(String),
    Fn(HeaderFn),
}

impl fmt::Debug for HeaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Fn(_) => f.write_str("Fn(..)"),
        }
    }
}

/// A leaf column.
///
/// Optional sizing fields are resolved lazily through accessors, so a column built
/// with `Column::new("x")` reports the same effective settings as a fully specified one.
#[derive(Clone)]
pub struct Column {
    pub col_id: String,
    pub field: String,
    pub header_name: Option<HeaderName>,
    pub header_class: Vec<String>,
    pub width: Option<u32>,
    pub min_width: Option<u32>,
    pub max_width: Option<u32>,
    pub flex: Option<u32>,
    pub hidden: bool,
    pub pinned: Option<Pinned>,
    pub resizable: bool,
    pub sortable: bool,
    pub filterable: bool,
    pub autosizable: Option<bool>,
    pub autosize_include_header: bool,
    pub autosize_include_header_icons: bool,
    pub autosize_min_width: Option<u32>,
    pub autosize_max_width: Option<u32>,
    pub autosize_buffer_px: Option<u32>,
    pub renderer: Option<RenderFn>,
    pub renderer_is_complex: bool,
    pub row_height: Option<u32>,
    pub auto_height: bool,
    pub abs_sort: bool,
    pub is_tree_column: bool,
    pub cell_class: Option<CellClassFn>,
    pub cell_class_rules: Vec<(String, CellClassRule)>,
}

impl Column {
    pub fn new(col_id: impl Into<String>) -> Self {
        let col_id = col_id.into();
        Self {
            field: col_id.clone(),
            col_id,
            header_name: None,
            header_class: Vec::new(),
            width: None,
            min_width: None,
            max_width: None,
            flex: None,
            hidden: false,
            pinned: None,
            resizable: true,
            sortable: true,
            filterable: false,
            autosizable: None,
            autosize_include_header: true,
            autosize_include_header_icons: true,
            autosize_min_width: None,
            autosize_max_width: None,
            autosize_buffer_px: None,
            renderer: None,
            renderer_is_complex: false,
            row_height: None,
            auto_height: false,
            abs_sort: false,
            is_tree_column: false,
            cell_class: None,
            cell_class_rules: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    #[must_use]
    pub fn with_header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = Some(HeaderName::Text(name.into()));
        self
    }

    #[must_use]
    pub fn with_header_fn(
        mut self,
        header: impl Fn() -> std::result::Result<String, RenderError> + Send + Sync + 'static,
    ) -> Self {
        self.header_name = Some(HeaderName::Fn(Arc::new(header)));
        self
    }

    #[must_use]
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    #[must_use]
    pub fn with_min_width(mut self, width: u32) -> Self {
        self.min_width = Some(width);
        self
    }

    #[must_use]
    pub fn with_max_width(mut self, width: u32) -> Self {
        self.max_width = Some(width);
        self
    }

    #[must_use]
    pub fn with_flex(mut self, flex: u32) -> Self {
        self.flex = Some(flex);
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    #[must_use]
    pub fn with_pinned(mut self, pinned: Pinned) -> Self {
        self.pinned = Some(pinned);
        self
    }

    #[must_use]
    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    #[must_use]
    pub fn with_sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    #[must_use]
    pub fn with_filterable(mut self, filterable: bool) -> Self {
        self.filterable = filterable;
        self
    }

    #[must_use]
    pub fn with_autosizable(mut self, autosizable: bool) -> Self {
        self.autosizable = Some(autosizable);
        self
    }

    #[must_use]
    pub fn with_autosize_bounds(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.autosize_min_width = min;
        self.autosize_max_width = max;
        self
    }

    #[must_use]
    pub fn with_renderer(
        mut self,
        renderer: impl Fn(&Value, &Record) -> std::result::Result<String, RenderError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    /// Mark the renderer as reading fields other than this column's own.
    #[must_use]
    pub fn complex(mut self) -> Self {
        self.renderer_is_complex = true;
        self
    }

    #[must_use]
    pub fn with_row_height(mut self, height: u32) -> Self {
        self.row_height = Some(height);
        self
    }

    #[must_use]
    pub fn with_auto_height(mut self, auto_height: bool) -> Self {
        self.auto_height = auto_height;
        self
    }

    #[must_use]
    pub fn with_abs_sort(mut self, abs_sort: bool) -> Self {
        self.abs_sort = abs_sort;
        self
    }

    #[must_use]
    pub fn tree_column(mut self) -> Self {
        self.is_tree_column = true;
        self
    }

    #[must_use]
    pub fn with_cell_class(
        mut self,
        cell_class: impl Fn(&Value, &Record) -> Vec<String> + Send + Sync + 'static,
    ) -> Self {
        self.cell_class = Some(Arc::new(cell_class));
        self
    }

    #[must_use]
    pub fn with_cell_class_rule(
        mut self,
        class: impl Into<String>,
        rule: impl Fn(&Value, &Record) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.cell_class_rules.push((class.into(), Arc::new(rule)));
        self
    }

    pub fn is_flex(&self) -> bool {
        self.flex.is_some()
    }

    /// Effective width; flex columns have none.
    pub fn effective_width(&self) -> Option<u32> {
        if self.is_flex() {
            None
        } else {
            Some(self.width.unwrap_or(DEFAULT_WIDTH))
        }
    }

    pub fn effective_min_width(&self) -> Option<u32> {
        self.min_width
            .or_else(|| self.is_flex().then_some(FLEX_COL_MIN_WIDTH))
    }

    pub fn is_autosizable(&self) -> bool {
        self.autosizable.unwrap_or(self.resizable)
    }

    pub fn effective_autosize_min_width(&self) -> Option<u32> {
        self.autosize_min_width.or_else(|| self.effective_min_width())
    }

    pub fn effective_autosize_max_width(&self) -> Option<u32> {
        self.autosize_max_width.or(self.max_width)
    }

    /// Header text, falling back to a display name derived from the field.
    pub fn header_text(&self) -> std::result::Result<String, RenderError> {
        match &self.header_name {
            Some(HeaderName::Text(text)) => Ok(text.clone()),
            Some(HeaderName::Fn(header)) => header(),
            None => Ok(display_name(&self.field)),
        }
    }

    pub fn value<'a>(&self, record: &'a Record) -> &'a Value {
        record.get(&self.field)
    }

    /// Rendered cell markup for a record.
    pub fn render(&self, record: &Record) -> std::result::Result<String, RenderError> {
        let value = self.value(record);
        match &self.renderer {
            Some(renderer) => renderer(value, record),
            None => Ok(value.to_string()),
        }
    }

    /// All classes applied to this column's cell for a record.
    pub fn cell_classes(&self, record: &Record) -> Vec<String> {
        let value = self.value(record);
        let mut ret = self
            .cell_class
            .as_ref()
            .map(|it| it(value, record))
            .unwrap_or_default();
        for (class, rule) in &self.cell_class_rules {
            if rule(value, record) {
                ret.push(class.clone());
            }
        }
        ret
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("col_id", &self.col_id)
            .field("field", &self.field)
            .field("width", &self.width)
            .field("flex", &self.flex)
            .field("hidden", &self.hidden)
            .field("pinned", &self.pinned)
            .field("renderer_is_complex", &self.renderer_is_complex)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct ColumnGroup {
    pub group_id: String,
    pub header_name: Option<String>,
    pub children: Vec<ColumnNode>,
}

impl ColumnGroup {
    pub fn new(group_id: impl Into<String>, children: Vec<ColumnNode>) -> Self {
        Self {
            group_id: group_id.into(),
            header_name: None,
            children,
        }
    }
}

/// Entry of a column tree.
#[derive(Debug, Clone)]
pub enum ColumnNode {
    Column(Column),
    Group(ColumnGroup),
}

impl ColumnNode {
    pub fn id(&self) -> &str {
        match self {
            Self::Column(col) => &col.col_id,
            Self::Group(group) => &group.group_id,
        }
    }
}

impl From<Column> for ColumnNode {
    fn from(value: Column) -> Self {
        Self::Column(value)
    }
}

impl From<ColumnGroup> for ColumnNode {
    fn from(value: ColumnGroup) -> Self {
        Self::Group(value)
    }
}

/// Leaf columns in definition order.
pub fn gather_leaves(nodes: &[ColumnNode]) -> Vec<&Column> {
    let mut ret = Vec::new();
    fn walk<'a>(nodes: &'a [ColumnNode], ret: &mut Vec<&'a Column>) {
        for node in nodes {
            match node {
                ColumnNode::Column(col) => ret.push(col),
                ColumnNode::Group(group) => walk(&group.children, ret),
            }
        }
    }
    walk(nodes, &mut ret);
    ret
}

pub fn find_column<'a>(nodes: &'a [ColumnNode], col_id: &str) -> Option<&'a Column> {
    nodes.iter().find_map(|node| match node {
        ColumnNode::Column(col) if col.col_id == col_id => Some(col),
        ColumnNode::Column(_) => None,
        ColumnNode::Group(group) => find_column(&group.children, col_id),
    })
}

/// Ids of every column and group, depth first.
pub fn collect_ids(nodes: &[ColumnNode]) -> Vec<&str> {
    let mut ret = Vec::new();
    for node in nodes {
        ret.push(node.id());
        if let ColumnNode::Group(group) = node {
            ret.extend(collect_ids(&group.children));
        }
    }
    ret
}

/// Check id uniqueness. Tree grids without exactly one tree column are only warned about.
pub fn validate_columns(nodes: &[ColumnNode], tree_mode: bool) -> Result<()> {
    let mut seen = HashSet::new();
    for id in collect_ids(nodes) {
        if id.is_empty() {
            return Err(ModelError::MissingColumnId);
        }
        if !seen.insert(id) {
            return Err(ModelError::DuplicateColumnId(id.to_string()));
        }
    }

    if tree_mode {
        let tree_cols = gather_leaves(nodes)
            .iter()
            .filter(|col| col.is_tree_column)
            .count();
        if tree_cols != 1 {
            warn!(
                tree_cols,
                "tree mode grid should have exactly one column marked as tree column"
            );
        }
    }
    Ok(())
}

/// `"firstName"` / `"first_name"` to `"First Name"`.
pub fn display_name(field: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in field.chars() {
        if c == '_' || c == '-' || c == ' ' || c == '.' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Serializable renderer choices for configs read from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RendererSpec {
    Number {
        #[serde(default)]
        precision: Option<usize>,
        #[serde(default)]
        thousands: bool,
        #[serde(default)]
        suffix: Option<String>,
    },
    Uppercase,
    Bold,
}

impl RendererSpec {
    pub fn into_renderer(self) -> RenderFn {
        match self {
            Self::Number {
                precision,
                thousands,
                suffix,
            } => Arc::new(move |value, _| {
                let Some(n) = value.as_f64() else {
                    return Ok(value.to_string());
                };
                if !n.is_finite() {
                    return Err(RenderError::new(format!("cannot format {n}")));
                }
                let mut text = match precision {
                    Some(p) => format!("{n:.p$}"),
                    None => n.to_string(),
                };
                if thousands {
                    text = group_thousands(&text);
                }
                if let Some(suffix) = &suffix {
                    text.push_str(suffix);
                }
                Ok(text)
            }),
            Self::Uppercase => Arc::new(|value, _| Ok(value.to_string().to_uppercase())),
            Self::Bold => Arc::new(|value, _| Ok(format!("<b>{value}</b>"))),
        }
    }
}

fn group_thousands(text: &str) -> String {
    let (sign, rest) = text
        .strip_prefix('-')
        .map_or(("", text), |rest| ("-", rest));
    let (int, frac) = rest.split_once('.').map_or((rest, None), |(i, f)| (i, Some(f)));
    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (idx, c) in int.chars().enumerate() {
        if idx > 0 && (int.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    match frac {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Serializable form of [`Column`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSpec {
    pub col_id: Option<String>,
    pub field: Option<String>,
    pub header_name: Option<String>,
    pub width: Option<u32>,
    pub min_width: Option<u32>,
    pub max_width: Option<u32>,
    pub flex: Option<u32>,
    pub hidden: bool,
    pub pinned: Option<Pinned>,
    pub resizable: Option<bool>,
    pub sortable: Option<bool>,
    pub filterable: bool,
    pub autosizable: Option<bool>,
    pub autosize_min_width: Option<u32>,
    pub autosize_max_width: Option<u32>,
    pub renderer: Option<RendererSpec>,
    pub renderer_is_complex: bool,
    pub row_height: Option<u32>,
    pub auto_height: bool,
    pub abs_sort: bool,
    pub is_tree_column: bool,
}

impl ColumnSpec {
    pub fn into_column(self) -> Result<Column> {
        let col_id = self
            .col_id
            .or_else(|| self.field.clone())
            .ok_or(ModelError::MissingColumnId)?;
        let mut col = Column::new(col_id);
        if let Some(field) = self.field {
            col.field = field;
        }
        col.header_name = self.header_name.map(HeaderName::Text);
        col.width = self.width;
        col.min_width = self.min_width;
        col.max_width = self.max_width;
        col.flex = self.flex;
        col.hidden = self.hidden;
        col.pinned = self.pinned;
        col.resizable = self.resizable.unwrap_or(true);
        col.sortable = self.sortable.unwrap_or(true);
        col.filterable = self.filterable;
        col.autosizable = self.autosizable;
        col.autosize_min_width = self.autosize_min_width;
        col.autosize_max_width = self.autosize_max_width;
        col.renderer = self.renderer.map(RendererSpec::into_renderer);
        col.renderer_is_complex = self.renderer_is_complex;
        col.row_height = self.row_height;
        col.auto_height = self.auto_height;
        col.abs_sort = self.abs_sort;
        col.is_tree_column = self.is_tree_column;
        Ok(col)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnGroupSpec {
    pub group_id: String,
    #[serde(default)]
    pub header_name: Option<String>,
    pub children: Vec<ColumnNodeSpec>,
}

/// Serializable column tree entry; anything with `children` is a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnNodeSpec {
    Group(ColumnGroupSpec),
    Column(ColumnSpec),
}

impl ColumnNodeSpec {
    pub fn into_node(self) -> Result<ColumnNode> {
        match self {
            Self::Column(spec) => spec.into_column().map(ColumnNode::Column),
            Self::Group(spec) => {
                let children = spec
                    .children
                    .into_iter()
                    .map(Self::into_node)
                    .collect::<Result<Vec<_>>>()?;
                Ok(ColumnNode::Group(ColumnGroup {
                    group_id: spec.group_id,
                    header_name: spec.header_name,
                    children,
                }))
            }
        }
    }
}

pub fn build_columns(specs: Vec<ColumnNodeSpec>) -> Result<Vec<ColumnNode>> {
    specs.into_iter().map(ColumnNodeSpec::into_node).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Vec<ColumnNode> {
        vec![
            Column::new("name").into(),
            ColumnGroup::new(
                "prices",
                vec![
                    Column::new("bid").into(),
                    Column::new("ask").with_flex(1).into(),
                ],
            )
            .into(),
        ]
    }

    #[test]
    fn leaves_in_definition_order() {
        let nodes = tree();
        let ids: Vec<_> = gather_leaves(&nodes).iter().map(|c| c.col_id.as_str()).collect();
        assert_eq!(ids, ["name", "bid", "ask"]);
        assert_eq!(collect_ids(&nodes), ["name", "prices", "bid", "ask"]);
        assert!(find_column(&nodes, "ask").is_some());
        assert!(find_column(&nodes, "prices").is_none());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let nodes: Vec<ColumnNode> = vec![
            Column::new("a").into(),
            ColumnGroup::new("g", vec![Column::new("a").into()]).into(),
        ];
        assert!(matches!(
            validate_columns(&nodes, false),
            Err(ModelError::DuplicateColumnId(id)) if id == "a"
        ));
    }

    #[test]
    fn lazy_defaults() {
        let fixed = Column::new("a");
        assert_eq!(fixed.effective_width(), Some(DEFAULT_WIDTH));
        assert_eq!(fixed.effective_min_width(), None);

        let flex = Column::new("b").with_flex(2).with_width(100);
        assert_eq!(flex.effective_width(), None);
        assert_eq!(flex.effective_min_width(), Some(FLEX_COL_MIN_WIDTH));

        let fixed_size = Column::new("c").with_resizable(false);
        assert!(!fixed_size.is_autosizable());
        assert_eq!(
            Column::new("d").with_max_width(90).effective_autosize_max_width(),
            Some(90)
        );
    }

    #[test]
    fn header_defaults_to_display_name() {
        assert_eq!(Column::new("firstName").header_text().expect("header"), "First Name");
        assert_eq!(display_name("trade_date"), "Trade Date");
    }

    #[test]
    fn renderer_spec_formats_numbers() {
        let renderer = RendererSpec::Number {
            precision: Some(2),
            thousands: true,
            suffix: Some("%".into()),
        }
        .into_renderer();
        let rec = Record::new(1);
        assert_eq!(renderer(&Value::number(-1234567.5), &rec).expect("render"), "-1,234,567.50%");
    }

    #[test]
    fn spec_tree_deserializes() {
        let specs: Vec<ColumnNodeSpec> = serde_json::from_str(
            r#"[{"field": "name"}, {"group_id": "g", "children": [{"col_id": "px", "flex": 1}]}]"#,
        )
        .expect("parse");
        let nodes = build_columns(specs).expect("build");
        let leaves = gather_leaves(&nodes);
        assert_eq!(leaves[0].col_id, "name");
        assert!(leaves[1].is_flex());
    }

    #[test]
    fn cell_class_rules_apply() {
        let col = Column::new("px")
            .with_cell_class(|_, _| vec!["num".into()])
            .with_cell_class_rule("neg", |v, _| v.as_f64().is_some_and(|n| n < 0.0));
        let rec = Record::new(1).with("px", -3);
        assert_eq!(col.cell_classes(&rec), ["num", "neg"]);
    }
}
