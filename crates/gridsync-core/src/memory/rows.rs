//! Row node trees: grouping, tree data, filtering, sorting and flattening.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use gridsync_model::{
    AUTO_GROUP_COL_ID, GridSorter, RecordRef, SortDirection, Value, default_comparator,
};

use crate::api::{FilterModel, RowNode};

use super::Engine;

pub(super) struct Branch {
    pub node: RowNode,
    pub children: Vec<Branch>,
}

impl Branch {
    fn leaf(record: &RecordRef, parent_id: Option<&str>, level: usize) -> Self {
        Self {
            node: RowNode {
                id: record.grid_id(),
                key: record.id().to_string(),
                record: Some(RecordRef::clone(record)),
                parent_id: parent_id.map(str::to_string),
                level,
                has_children: false,
                expanded: false,
                selected: false,
                row_index: None,
                row_height: None,
            },
            children: Vec::new(),
        }
    }
}

/// Which view of the row tree to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct View {
    pub filtered: bool,
    pub sorted: bool,
}

impl View {
    pub const RAW: Self = Self {
        filtered: false,
        sorted: false,
    };
    pub const FILTERED: Self = Self {
        filtered: true,
        sorted: false,
    };
    pub const FILTERED_SORTED: Self = Self {
        filtered: true,
        sorted: true,
    };
}

impl Engine {
    /// Row tree for `view`, with expansion, selection, heights and displayed indexes filled in.
    pub(super) fn forest(&self, view: View) -> Vec<Branch> {
        let mut roots = self.prepared(view);
        let indexes = self.displayed_indexes();
        decorate(&mut roots, &indexes, self);
        roots
    }

    /// Nodes in pre-order, optionally only descending into expanded nodes.
    pub(super) fn flat(&self, view: View, displayed_only: bool) -> Vec<RowNode> {
        let mut ret = Vec::new();
        flatten(self.forest(view), displayed_only, &mut ret);
        ret
    }

    fn prepared(&self, view: View) -> Vec<Branch> {
        let mut roots = if !self.group_cols.is_empty() {
            self.grouped(&self.rows, 0, None)
        } else if self.tree_data {
            self.tree()
        } else {
            self.rows.iter().map(|rec| Branch::leaf(rec, None, 0)).collect()
        };

        if view.filtered && !self.filter_model.is_empty() {
            roots = filter_branches(roots, &self.filter_model, &self.field_lookup());
        }
        if view.sorted {
            let group_sort = self
                .columns
                .iter()
                .find(|it| it.state.col_id == AUTO_GROUP_COL_ID)
                .and_then(|it| it.state.sort);
            sort_branches(&mut roots, &self.sorters(), group_sort);
        }
        mark_expanded(&mut roots, &self.expanded);
        roots
    }

    fn displayed_indexes(&self) -> HashMap<String, usize> {
        let mut displayed = Vec::new();
        flatten(self.prepared(View::FILTERED_SORTED), true, &mut displayed);
        displayed
            .into_iter()
            .enumerate()
            .map(|(idx, node)| (node.id, idx))
            .collect()
    }

    fn tree(&self) -> Vec<Branch> {
        let present: HashSet<&str> = self.rows.iter().map(|it| it.id().as_str()).collect();
        let mut children: HashMap<&str, Vec<&RecordRef>> = HashMap::new();
        let mut roots = Vec::new();
        for rec in &self.rows {
            match rec.parent_id() {
                Some(parent) if present.contains(parent.as_str()) => {
                    children.entry(parent.as_str()).or_default().push(rec);
                }
                _ => roots.push(rec),
            }
        }

        fn build(
            rec: &RecordRef,
            parent_id: Option<&str>,
            level: usize,
            children: &HashMap<&str, Vec<&RecordRef>>,
        ) -> Branch {
            let mut branch = Branch::leaf(rec, parent_id, level);
            if let Some(kids) = children.get(rec.id().as_str()) {
                let id = branch.node.id.clone();
                branch.children = kids
                    .iter()
                    .map(|kid| build(kid, Some(id.as_str()), level + 1, children))
                    .collect();
            }
            branch
        }

        roots
            .into_iter()
            .map(|rec| build(rec, None, 0, &children))
            .collect()
    }

    fn grouped(&self, records: &[RecordRef], depth: usize, parent: Option<&str>) -> Vec<Branch> {
        let Some(col_id) = self.group_cols.get(depth) else {
            return records
                .iter()
                .map(|rec| Branch::leaf(rec, parent, depth))
                .collect();
        };
        let field = self.field_for(col_id);

        let mut keys: Vec<String> = Vec::new();
        let mut buckets: HashMap<String, Vec<RecordRef>> = HashMap::new();
        for rec in records {
            let key = rec.get(&field).to_string();
            if !buckets.contains_key(&key) {
                keys.push(key.clone());
            }
            buckets.entry(key).or_default().push(RecordRef::clone(rec));
        }

        keys.into_iter()
            .map(|key| {
                let id = match parent {
                    Some(parent) => format!("{parent}-{col_id}-{key}"),
                    None => format!("row-group-{col_id}-{key}"),
                };
                let members = buckets.remove(&key).unwrap_or_default();
                let children = self.grouped(&members, depth + 1, Some(id.as_str()));
                Branch {
                    node: RowNode {
                        id,
                        key,
                        record: None,
                        parent_id: parent.map(str::to_string),
                        level: depth,
                        has_children: true,
                        expanded: false,
                        selected: false,
                        row_index: None,
                        row_height: None,
                    },
                    children,
                }
            })
            .collect()
    }

    fn field_for(&self, col_id: &str) -> String {
        self.columns
            .iter()
            .find(|it| it.state.col_id == col_id)
            .and_then(|it| it.def.as_ref())
            .map_or_else(|| col_id.to_string(), |def| def.field.clone())
    }

    fn field_lookup(&self) -> HashMap<String, String> {
        self.columns
            .iter()
            .filter_map(|it| {
                it.def
                    .as_ref()
                    .map(|def| (def.col_id.clone(), def.field.clone()))
            })
            .collect()
    }

    /// Active sorters with the field to read, in sort index order.
    fn sorters(&self) -> Vec<(String, GridSorter)> {
        let mut sorted: Vec<_> = self
            .columns
            .iter()
            .filter_map(|col| {
                let sort = col.state.sort?;
                let def = col.def.as_ref()?;
                Some((
                    col.state.sort_index.unwrap_or(usize::MAX),
                    def.field.clone(),
                    GridSorter::new(def.col_id.clone(), sort, col.state.sort_abs),
                ))
            })
            .collect();
        sorted.sort_by_key(|(idx, _, _)| *idx);
        sorted
            .into_iter()
            .map(|(_, field, sorter)| (field, sorter))
            .collect()
    }
}

fn decorate(branches: &mut [Branch], indexes: &HashMap<String, usize>, engine: &Engine) {
    for branch in branches {
        let node = &mut branch.node;
        node.selected = engine.selected.contains(&node.id);
        node.row_index = indexes.get(&node.id).copied();
        node.row_height = engine.row_heights.get(&node.id).copied();
        decorate(&mut branch.children, indexes, engine);
    }
}

fn mark_expanded(branches: &mut [Branch], expanded: &HashSet<String>) {
    for branch in branches {
        branch.node.has_children = !branch.children.is_empty();
        branch.node.expanded = branch.node.has_children && expanded.contains(&branch.node.id);
        mark_expanded(&mut branch.children, expanded);
    }
}

fn flatten(branches: Vec<Branch>, displayed_only: bool, out: &mut Vec<RowNode>) {
    for branch in branches {
        let descend = !displayed_only || branch.node.expanded;
        out.push(branch.node);
        if descend {
            flatten(branch.children, displayed_only, out);
        }
    }
}

/// Keep rows passing every column filter, plus the ancestors of such rows.
///
/// Column filters are set filters: `{"<col_id>": {"values": ["a", "b"]}}`. Entries of
/// any other shape are ignored.
fn filter_branches(
    branches: Vec<Branch>,
    model: &FilterModel,
    fields: &HashMap<String, String>,
) -> Vec<Branch> {
    branches
        .into_iter()
        .filter_map(|mut branch| {
            branch.children = filter_branches(branch.children, model, fields);
            let passes = match &branch.node.record {
                Some(record) => model.iter().all(|(col_id, entry)| {
                    let Some(values) = entry.get("values").and_then(|it| it.as_array()) else {
                        return true;
                    };
                    let field = fields.get(col_id).map_or(col_id.as_str(), String::as_str);
                    let text = record.get(field).to_string();
                    values.iter().any(|it| match it {
                        serde_json::Value::String(s) => *s == text,
                        other => other.to_string() == text,
                    })
                }),
                None => false,
            };
            (passes || !branch.children.is_empty()).then_some(branch)
        })
        .collect()
}

fn sort_branches(
    branches: &mut [Branch],
    sorters: &[(String, GridSorter)],
    group_sort: Option<SortDirection>,
) {
    branches.sort_by(|a, b| compare_nodes(&a.node, &b.node, sorters, group_sort));
    for branch in branches {
        sort_branches(&mut branch.children, sorters, group_sort);
    }
}

fn compare_nodes(
    a: &RowNode,
    b: &RowNode,
    sorters: &[(String, GridSorter)],
    group_sort: Option<SortDirection>,
) -> Ordering {
    match (&a.record, &b.record) {
        (Some(ra), Some(rb)) => sorters
            .iter()
            .map(|(field, sorter)| {
                sorter
                    .sort
                    .apply(sorter.comparator(ra.get(field), rb.get(field)))
            })
            .find(|it| it.is_ne())
            .unwrap_or(Ordering::Equal),
        (None, None) => group_sort.map_or(Ordering::Equal, |sort| {
            sort.apply(default_comparator(
                &Value::text(a.key.as_str()),
                &Value::text(b.key.as_str()),
            ))
        }),
        _ => Ordering::Equal,
    }
}
