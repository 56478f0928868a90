use std::env;
use std::fs::{self, File};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use xydata_reader::Cache;

fn scratch(name: &str, content: &str) -> PathBuf {
    let path = env::temp_dir().join(format!("xydata-cache-{}-{}", process::id(), name));
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn identical_key_returns_same_handle() {
    let path = scratch("same.dat", "1 2\n3 4\n");
    let cache = Cache::new();

    let a = cache.get(&path, None, &[]).unwrap();
    let b = cache.get(&path, None, &[]).unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    // A different hint or option list is a different key.
    let c = cache.get(&path, Some("text"), &[]).unwrap();
    assert!(!Arc::ptr_eq(&a, &c));
    let d = cache.get(&path, Some("text"), &["decimal-comma".to_string()]).unwrap();
    assert!(!Arc::ptr_eq(&c, &d));
    fs::remove_file(&path).unwrap();
}

#[test]
fn oldest_entry_is_evicted() {
    let one = scratch("one.dat", "1 2\n");
    let two = scratch("two.dat", "3 4\n");
    let three = scratch("three.dat", "5 6\n");
    let cache = Cache::with_capacity(2);

    let first = cache.get(&one, None, &[]).unwrap();
    let _ = cache.get(&two, None, &[]).unwrap();
    let _ = cache.get(&three, None, &[]).unwrap();
    assert_eq!(cache.len().unwrap(), 2);

    // Evicted, so decoded again, but the old handle is still usable.
    let again = cache.get(&one, None, &[]).unwrap();
    assert!(!Arc::ptr_eq(&first, &again));
    assert_eq!(first.value(0, 1, 0).unwrap(), 1.0);

    for path in [one, two, three] {
        fs::remove_file(path).unwrap();
    }
}

#[test]
fn shrinking_takes_effect_on_next_insert() {
    let one = scratch("shrink-one.dat", "1 2\n");
    let two = scratch("shrink-two.dat", "3 4\n");
    let three = scratch("shrink-three.dat", "5 6\n");
    let cache = Cache::with_capacity(3);
    cache.get(&one, None, &[]).unwrap();
    cache.get(&two, None, &[]).unwrap();

    cache.set_capacity(1).unwrap();
    assert_eq!(cache.capacity().unwrap(), 1);
    assert_eq!(cache.len().unwrap(), 2);

    cache.get(&three, None, &[]).unwrap();
    assert_eq!(cache.len().unwrap(), 1);

    for path in [one, two, three] {
        fs::remove_file(path).unwrap();
    }
}

#[test]
fn clear_keeps_outstanding_handles() {
    let path = scratch("clear.dat", "1 2\n3 4\n");
    let cache = Cache::default();
    let held = cache.get(&path, None, &[]).unwrap();
    cache.clear().unwrap();
    assert!(cache.is_empty().unwrap());
    assert_eq!(held.value(0, 2, 1).unwrap(), 4.0);

    let fresh = cache.get(&path, None, &[]).unwrap();
    assert!(!Arc::ptr_eq(&held, &fresh));
    fs::remove_file(&path).unwrap();
}

#[test]
fn failed_decode_is_not_cached() {
    let path = scratch("broken.dat", "1 2\n3\n");
    let cache = Cache::new();
    let err = cache.get(&path, None, &[]).unwrap_err();
    assert!(err.is_format_violation());
    assert!(cache.is_empty().unwrap());
    fs::remove_file(&path).unwrap();
}

#[test]
fn modified_file_is_reloaded() {
    let path = scratch("stale.dat", "1 2\n");
    let cache = Cache::new();
    let before = cache.get(&path, None, &[]).unwrap();

    fs::write(&path, "1 2\n3 4\n").unwrap();
    File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(60))
        .unwrap();

    let after = cache.get(&path, None, &[]).unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(after.get_block(0).unwrap().point_count(), Some(2));
    assert_eq!(before.get_block(0).unwrap().point_count(), Some(1));
    fs::remove_file(&path).unwrap();
}
