use crate::*;

#[test]
fn new_ids_are_unique_and_parse_back() {
    let a = SegmentId::new(42);
    let b = SegmentId::new(42);
    assert_ne!(a, b);
    assert_eq!(a.seq(), 42);
    assert!(a.name().starts_with("sstable-0000000042-"));

    assert_eq!(SegmentId::parse(a.name()), Some(a.clone()));
    assert_eq!(SegmentId::from_index_file(&a.index_file()), Some(a));
}

#[test]
fn file_names_share_the_base_name() {
    let id = SegmentId::new(1);
    assert_eq!(id.data_file(), format!("{}.data", id.name()));
    assert_eq!(id.index_file(), format!("{}.index", id.name()));
    assert_eq!(id.filter_file(), format!("{}.filter", id.name()));
}

#[test]
fn parse_rejects_foreign_names() {
    for name in [
        "commit-log.txt",
        "sstable-",
        "sstable-abc-123",
        "sstable-0000000001",
        "sstable-0000000001-",
        "other-0000000001-abc",
    ] {
        assert_eq!(SegmentId::parse(name), None, "{name}");
    }
    assert_eq!(SegmentId::from_index_file("sstable-0000000001-abc.data"), None);
}

#[test]
fn ids_order_by_sequence_first() {
    let mut ids = vec![SegmentId::new(10), SegmentId::new(2), SegmentId::new(7)];
    ids.sort();
    let seqs: Vec<u64> = ids.iter().map(SegmentId::seq).collect();
    assert_eq!(seqs, vec![2, 7, 10]);

    // zero padding keeps lexical order aligned with recency
    assert!(SegmentId::new(9).name() < SegmentId::new(10).name());
}
