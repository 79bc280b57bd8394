use super::*;

fn live(key: &str, value: &str) -> Record<String, String> {
    Record::live(key.to_string(), value.to_string())
}

fn dead(key: &str) -> Record<String, String> {
    Record::tombstone(key.to_string())
}

fn k(s: &str) -> String {
    s.to_string()
}

// -------------------- Basic CRUD --------------------

#[test]
fn put_and_get_single_key() {
    let mut m = Memtable::new();
    m.put(live("k1", "v1"));
    assert_eq!(m.len(), 1);
    assert_eq!(m.get(&k("k1")).map(String::as_str), Some("v1"));
}

#[test]
fn put_overwrites() {
    let mut m = Memtable::new();
    m.put(live("k1", "v1"));
    m.put(live("k1", "v2"));
    assert_eq!(m.len(), 1);
    assert_eq!(m.get(&k("k1")).map(String::as_str), Some("v2"));
}

#[test]
fn get_missing_key_returns_none() {
    let m: Memtable<String, String> = Memtable::new();
    assert!(m.get(&k("nonexistent")).is_none());
    assert!(m.get_entry(&k("nonexistent")).is_none());
}

#[test]
fn tombstone_is_retained_and_distinguishable() {
    let mut m = Memtable::new();
    m.put(live("k1", "v1"));
    m.put(dead("k1"));

    assert!(m.get(&k("k1")).is_none());
    assert_eq!(m.get_entry(&k("k1")), Some(&None));
    assert!(m.contains_key(&k("k1")));
    assert_eq!(m.len(), 1);
}

#[test]
fn put_after_delete_resurrects_key() {
    let mut m = Memtable::new();
    m.put(dead("k"));
    m.put(live("k", "back"));
    assert_eq!(m.get(&k("k")).map(String::as_str), Some("back"));
}

// -------------------- Ordering --------------------

#[test]
fn iter_yields_sorted_keys_with_tombstones() {
    let mut m = Memtable::new();
    m.put(live("c", "3"));
    m.put(dead("b"));
    m.put(live("a", "1"));

    let entries: Vec<_> = m
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_deref()))
        .collect();
    assert_eq!(entries, vec![("a", Some("1")), ("b", None), ("c", Some("3"))]);
}

#[test]
fn integer_keys_sort_numerically() {
    let mut m = Memtable::new();
    for key in [10u32, 2, 33, 1] {
        m.put(Record::live(key, key * 2));
    }
    let keys: Vec<u32> = m.as_map().keys().copied().collect();
    assert_eq!(keys, vec![1, 2, 10, 33]);
}

// -------------------- Replay --------------------

#[test]
fn from_records_later_wins() {
    let m = Memtable::from_records(vec![
        live("a", "1"),
        live("b", "2"),
        live("a", "3"),
        dead("b"),
        live("c", "4"),
    ]);

    assert_eq!(m.len(), 3);
    assert_eq!(m.get(&k("a")).map(String::as_str), Some("3"));
    assert_eq!(m.get_entry(&k("b")), Some(&None));
    assert_eq!(m.get(&k("c")).map(String::as_str), Some("4"));
}

#[test]
fn write_load_with_key_reuse() {
    let mut m = Memtable::new();
    for i in 0..10_000u64 {
        m.put(Record::live(i % 100, i));
    }
    assert_eq!(m.len(), 100);
    assert_eq!(m.get(&42), Some(&9_942));
}

// -------------------- Clear / take --------------------

#[test]
fn clear_then_reuse() {
    let mut m = Memtable::new();
    m.put(live("a", "1"));
    m.clear();
    assert!(m.is_empty());

    m.put(live("b", "2"));
    assert_eq!(m.len(), 1);
}

#[test]
fn take_leaves_empty_table() {
    let mut m = Memtable::new();
    m.put(live("a", "1"));
    m.put(dead("b"));

    let frozen = m.take();
    assert!(m.is_empty());
    assert_eq!(frozen.len(), 2);
    assert_eq!(frozen.into_map().len(), 2);
}

#[test]
fn default_creates_empty() {
    let m: Memtable<u64, u64> = Memtable::default();
    assert!(m.is_empty());
}
