use std::sync::{Arc, Mutex};
use xhtpress::cache::{BoundedCache, ChannelListener};

fn recording_cache(capacity: usize) -> (BoundedCache<u32>, Arc<Mutex<Vec<(String, u32)>>>) {
    let evicted = Arc::new(Mutex::new(Vec::new()));
    let mut cache = BoundedCache::new(capacity).unwrap();
    let sink = Arc::clone(&evicted);
    cache.set_listener(move |id: &str, value: &u32| {
        sink.lock().unwrap().push((id.to_string(), *value));
    });
    (cache, evicted)
}

#[test]
fn test_overflow_evicts_least_recently_touched_in_order() {
    for (capacity, extra) in [(1, 1), (3, 2), (4, 4)] {
        let (mut cache, evicted) = recording_cache(capacity);
        for i in 0..(capacity + extra) as u32 {
            cache.set(format!("t{i}"), i * 10);
        }

        let expected: Vec<(String, u32)> =
            (0..extra as u32).map(|i| (format!("t{i}"), i * 10)).collect();
        assert_eq!(*evicted.lock().unwrap(), expected);
        assert_eq!(cache.len(), capacity);
    }
}

#[test]
fn test_touched_entry_outlives_untouched_one() {
    let (mut cache, evicted) = recording_cache(2);
    cache.set("header", 1);
    cache.set("footer", 2);
    assert_eq!(cache.get("header"), Some(&1));

    cache.set("nav", 3);
    assert_eq!(*evicted.lock().unwrap(), vec![("footer".to_string(), 2)]);
    assert!(cache.contains("header"));
    assert_eq!(cache.ids().collect::<Vec<_>>(), vec!["header", "nav"]);
}

#[test]
fn test_flush_and_absent_ids() {
    let (mut cache, evicted) = recording_cache(2);
    cache.set("a", 1);

    assert_eq!(cache.flush("a"), Some(1));
    assert_eq!(cache.flush("a"), None);
    assert_eq!(cache.get("a"), None);
    assert!(cache.is_empty());
    assert!(evicted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_channel_listener_sees_stored_values() {
    let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
    let mut cache = BoundedCache::new(1).unwrap();
    cache.set_listener(ChannelListener::new(sender));

    cache.set("first", "one".to_string());
    cache.set("second", "two".to_string());
    drop(cache);

    assert_eq!(receiver.recv().await, Some(("first".to_string(), "one".to_string())));
    assert_eq!(receiver.recv().await, None);
}
