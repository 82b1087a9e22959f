use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use gridsync_model::{
    GridSorter, Record, RecordId, RecordRef, RecordSet, SortDirection, SorterConfig, Transaction,
    Value, default_comparator,
};
use proptest::prelude::*;

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<f64>().prop_map(Value::Number),
        (-1000i32..1000).prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,8}".prop_map(Value::Text),
    ]
}

fn ids_strategy() -> impl Strategy<Value = BTreeSet<u32>> {
    proptest::collection::btree_set(0u32..24, 0..16)
}

/// Build prev/next sets sharing some records by handle and replacing others.
fn record_sets(
    prev_ids: &BTreeSet<u32>,
    next_ids: &BTreeSet<u32>,
    replaced: &BTreeSet<u32>,
) -> (RecordSet, RecordSet) {
    let prev: Vec<RecordRef> = prev_ids.iter().map(|id| Record::new(*id).into_ref()).collect();
    let next: Vec<RecordRef> = next_ids
        .iter()
        .map(|id| {
            let existing = prev.iter().find(|r| *r.id() == RecordId::from(*id));
            match existing {
                Some(rec) if !replaced.contains(id) => Arc::clone(rec),
                _ => Record::new(*id).with("v", 1).into_ref(),
            }
        })
        .collect();
    (
        RecordSet::new(prev).expect("prev"),
        RecordSet::new(next).expect("next"),
    )
}

fn ids(records: &[RecordRef]) -> BTreeSet<String> {
    records.iter().map(|r| r.id().to_string()).collect()
}

proptest! {
    #[test]
    fn transaction_partitions_identities(
        prev_ids in ids_strategy(),
        next_ids in ids_strategy(),
        replaced in ids_strategy(),
    ) {
        let (prev, next) = record_sets(&prev_ids, &next_ids, &replaced);
        let tx = Transaction::between(&next, Some(&prev));

        let expected_add: BTreeSet<String> =
            next_ids.difference(&prev_ids).map(u32::to_string).collect();
        let expected_update: BTreeSet<String> = next_ids
            .intersection(&prev_ids)
            .filter(|id| replaced.contains(id))
            .map(u32::to_string)
            .collect();
        let expected_remove: BTreeSet<String> =
            prev_ids.difference(&next_ids).map(u32::to_string).collect();

        prop_assert_eq!(ids(&tx.add), expected_add);
        prop_assert_eq!(ids(&tx.update), expected_update);
        prop_assert_eq!(ids(&tx.remove), expected_remove);
        prop_assert_eq!(tx.add.len() + tx.update.len() + tx.remove.len(),
            ids(&tx.add).len() + ids(&tx.update).len() + ids(&tx.remove).len());
    }

    #[test]
    fn same_record_set_is_idempotent(next_ids in ids_strategy()) {
        let (_, next) = record_sets(&BTreeSet::new(), &next_ids, &BTreeSet::new());
        prop_assert!(Transaction::between(&next, Some(&next)).is_empty());
    }

    #[test]
    fn sorter_round_trips(
        col_id in "[a-zA-Z][a-zA-Z0-9_]{0,10}",
        desc in any::<bool>(),
        abs in any::<bool>(),
    ) {
        let sort = if desc { SortDirection::Desc } else { SortDirection::Asc };
        let sorter = GridSorter::new(col_id, sort, abs);
        let parsed = GridSorter::parse(sorter.to_string()).expect("parse");
        prop_assert_eq!(parsed, sorter);
    }

    #[test]
    fn unknown_sort_normalizes_to_asc(
        col_id in "[a-z]{1,6}",
        sort in "[a-z]{0,6}".prop_filter("not desc", |s| s != "desc"),
    ) {
        let sorter = GridSorter::parse(SorterConfig {
            col_id,
            sort: Some(sort),
            abs: None,
        })
        .expect("parse");
        prop_assert_eq!(sorter.sort, SortDirection::Asc);
    }

    #[test]
    fn default_comparator_is_antisymmetric(a in value_strategy(), b in value_strategy()) {
        prop_assert_eq!(default_comparator(&a, &b), default_comparator(&b, &a).reverse());
        prop_assert_eq!(default_comparator(&a, &a), Ordering::Equal);
    }
}
