use super::helpers::{memory_engine, s};
use anyhow::Result;

#[test]
fn get_from_memtable() -> Result<()> {
    let (_storage, mut engine) = memory_engine()?;
    engine.put(s("name"), s("alice"))?;
    assert_eq!(engine.get(&s("name"))?, Some(s("alice")));
    Ok(())
}

#[test]
fn get_missing_key() -> Result<()> {
    let (_storage, engine) = memory_engine()?;
    assert_eq!(engine.get(&s("nope"))?, None);
    Ok(())
}

#[test]
fn latest_write_wins_in_memtable() -> Result<()> {
    let (_storage, mut engine) = memory_engine()?;
    engine.put(s("k"), s("v1"))?;
    engine.put(s("k"), s("v2"))?;
    assert_eq!(engine.get(&s("k"))?, Some(s("v2")));
    Ok(())
}

#[test]
fn put_after_delete_resurrects() -> Result<()> {
    let (_storage, mut engine) = memory_engine()?;
    engine.put(s("k"), s("v1"))?;
    engine.delete(s("k"))?;
    engine.put(s("k"), s("v2"))?;
    assert_eq!(engine.get(&s("k"))?, Some(s("v2")));
    Ok(())
}

#[test]
fn get_from_segment_after_flush() -> Result<()> {
    let (_storage, mut engine) = memory_engine()?;
    engine.put(s("k"), s("v"))?;
    engine.force_flush()?;
    assert_eq!(engine.memtable_len(), 0);
    assert_eq!(engine.get(&s("k"))?, Some(s("v")));
    Ok(())
}

#[test]
fn memtable_shadows_segments() -> Result<()> {
    let (_storage, mut engine) = memory_engine()?;
    engine.put(s("k"), s("old"))?;
    engine.force_flush()?;
    engine.put(s("k"), s("new"))?;
    assert_eq!(engine.get(&s("k"))?, Some(s("new")));
    Ok(())
}

#[test]
fn memtable_tombstone_hides_flushed_value() -> Result<()> {
    let (_storage, mut engine) = memory_engine()?;
    engine.put(s("k"), s("v"))?;
    engine.force_flush()?;
    engine.delete(s("k"))?;
    assert_eq!(engine.get(&s("k"))?, None);
    Ok(())
}

#[test]
fn flushed_tombstone_hides_older_segment() -> Result<()> {
    let (_storage, mut engine) = memory_engine()?;
    engine.put(s("k"), s("v"))?;
    engine.force_flush()?;
    engine.delete(s("k"))?;
    engine.force_flush()?;

    assert_eq!(engine.segment_count(), 2);
    assert_eq!(engine.get(&s("k"))?, None);
    Ok(())
}

#[test]
fn newest_segment_wins() -> Result<()> {
    let (_storage, mut engine) = memory_engine()?;
    for v in ["v1", "v2", "v3"] {
        engine.put(s("k"), s(v))?;
        engine.put(s(v), s(v))?;
        engine.force_flush()?;
    }
    assert_eq!(engine.segment_count(), 3);
    assert_eq!(engine.get(&s("k"))?, Some(s("v3")));
    assert_eq!(engine.get(&s("v1"))?, Some(s("v1")));
    Ok(())
}

#[test]
fn many_keys_across_segments() -> Result<()> {
    let (_storage, mut engine) = memory_engine()?;
    for i in 0..300 {
        engine.put(format!("key{i:04}"), format!("value{i}"))?;
        if i % 100 == 99 {
            engine.force_flush()?;
        }
    }
    for i in (0..300).step_by(7) {
        assert_eq!(
            engine.get(&format!("key{i:04}"))?,
            Some(format!("value{i}"))
        );
    }
    assert_eq!(engine.get(&s("key9999"))?, None);
    Ok(())
}

#[test]
fn debug_output_names_the_engine() -> Result<()> {
    let (_storage, mut engine) = memory_engine()?;
    engine.put(s("a"), s("1"))?;
    let out = format!("{engine:?}");
    assert!(out.contains("Engine"));
    assert!(out.contains("memtable_entries: 1"));
    assert!(out.contains("segment_count: 0"));
    assert!(out.contains("wal_sync: EveryWrite"));
    Ok(())
}
