//! Property-based tests for rxstore-storage using proptest.

use proptest::prelude::*;
use rxstore_core::{Uri, Value};
use rxstore_storage::{KeyValueStore, MemoryPreferences, MemoryRecordStore, Query, RecordStore, RowCursor};

fn read_ids(store: &MemoryRecordStore, uri: &Uri, query: &Query) -> Vec<i64> {
    let mut cursor = store.query(uri, query).unwrap().unwrap();
    let mut ids = Vec::new();
    if cursor.move_to_first() {
        loop {
            ids.push(cursor.get_i64("_id").unwrap());
            if !cursor.move_to_next() {
                break;
            }
        }
    }
    cursor.close();
    ids
}

proptest! {
    /// Deleting rows keeps the survivors in their original relative order.
    #[test]
    fn delete_preserves_relative_order(
        plays in prop::collection::vec(0i32..100, 1..60),
        deletions in prop::collection::vec(any::<prop::sample::Index>(), 0..20),
    ) {
        let store = MemoryRecordStore::new();
        let songs = Uri::new("content://media/songs");
        store.create_table(songs.clone(), &["plays"]).unwrap();
        for p in &plays {
            store.insert(&songs, vec![Value::Int32(*p)]).unwrap();
        }

        let before = read_ids(&store, &songs, &Query::new());
        let mut removed = Vec::new();
        for index in &deletions {
            let id = before[index.index(before.len())];
            if store.delete(&songs.with_appended_id(id as u64)).unwrap() == 1 {
                removed.push(id);
            }
        }

        let expected: Vec<i64> = before.into_iter().filter(|id| !removed.contains(id)).collect();
        prop_assert_eq!(read_ids(&store, &songs, &Query::new()), expected);
    }

    /// A filtered read returns exactly the rows satisfying the filter.
    #[test]
    fn filter_matches_predicate(plays in prop::collection::vec(0i32..20, 0..60), threshold in 0i32..20) {
        let store = MemoryRecordStore::new();
        let songs = Uri::new("content://media/songs");
        store.create_table(songs.clone(), &["plays"]).unwrap();
        for p in &plays {
            store.insert(&songs, vec![Value::Int32(*p)]).unwrap();
        }

        let query = Query::new().filter("plays >= ?", [Value::Int32(threshold)]);
        let ids = read_ids(&store, &songs, &query);
        let expected: Vec<i64> = plays
            .iter()
            .enumerate()
            .filter(|(_, p)| **p >= threshold)
            .map(|(i, _)| i as i64 + 1)
            .collect();
        prop_assert_eq!(ids, expected);
    }

    /// The last write to a key wins, whatever its kind.
    #[test]
    fn last_write_wins(writes in prop::collection::vec(any::<i32>(), 1..40)) {
        let store = MemoryPreferences::new();
        for w in &writes {
            store.put_i32("count", *w).unwrap();
        }
        prop_assert_eq!(store.get_i32("count", 0).unwrap(), *writes.last().unwrap());
        prop_assert_eq!(store.len(), 1);
    }
}
