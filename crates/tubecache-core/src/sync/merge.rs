use std::collections::HashMap;

use crate::cache::Entry;

/// What a merge did to the cached set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: usize,
    pub replaced: usize,
    /// Incoming entries ignored because the cached copy was as new or newer.
    pub unchanged: usize,
    /// Duplicate ids already present in the cached set, folded into one.
    pub collapsed: usize,
}

/// Merge `incoming` into `cached` by id.
///
/// Duplicate ids in `cached` are folded first: the first position is kept
/// and holds the newest copy. Then a new id is appended; a known id is
/// replaced in place only when the incoming recency is strictly newer. The
/// same rule applies between duplicates inside `incoming`. Cached order is
/// otherwise preserved.
pub fn merge_entries(cached: Vec<Entry>, incoming: Vec<Entry>) -> (Vec<Entry>, MergeStats) {
    let mut merged: Vec<Entry> = Vec::with_capacity(cached.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(cached.len());
    let mut stats = MergeStats::default();

    for entry in cached {
        match index.get(&entry.id) {
            Some(&i) => {
                if entry.recency > merged[i].recency {
                    merged[i] = entry;
                }
                stats.collapsed += 1;
            }
            None => {
                index.insert(entry.id.clone(), merged.len());
                merged.push(entry);
            }
        }
    }

    for entry in incoming {
        match index.get(&entry.id) {
            Some(&i) => {
                if entry.recency > merged[i].recency {
                    merged[i] = entry;
                    stats.replaced += 1;
                } else {
                    stats.unchanged += 1;
                }
            }
            None => {
                index.insert(entry.id.clone(), merged.len());
                merged.push(entry);
                stats.inserted += 1;
            }
        }
    }

    (merged, stats)
}

/// Order newest first and drop everything past `max_entries`.
///
/// Returns the number of entries evicted.
pub fn cap_entries(entries: &mut Vec<Entry>, max_entries: usize) -> usize {
    entries.sort_by(|a, b| b.recency.cmp(&a.recency));
    let evicted = entries.len().saturating_sub(max_entries);
    entries.truncate(max_entries);
    evicted
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(id: &str, recency: i64) -> Entry {
        Entry {
            id: id.to_string(),
            owner_id: "u".to_string(),
            recency,
            payload: json!({ "id": id, "recency": recency }),
            cached_at: 1,
        }
    }

    fn ids(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_merge_inserts_and_replaces_only_when_newer() {
        let cached = vec![entry("a", 10), entry("b", 10)];
        let incoming = vec![entry("a", 11), entry("b", 10), entry("c", 5)];

        let (merged, stats) = merge_entries(cached, incoming);
        assert_eq!(ids(&merged), vec!["a", "b", "c"]);
        assert_eq!(merged[0].recency, 11);
        assert_eq!(
            stats,
            MergeStats {
                inserted: 1,
                replaced: 1,
                unchanged: 1,
                collapsed: 0
            }
        );
    }

    #[test]
    fn test_older_incoming_never_overwrites() {
        let (merged, stats) = merge_entries(vec![entry("a", 10)], vec![entry("a", 3)]);
        assert_eq!(merged[0].recency, 10);
        assert_eq!(stats.unchanged, 1);
    }

    #[test]
    fn test_duplicates_within_incoming_use_same_rule() {
        let (merged, _) = merge_entries(Vec::new(), vec![entry("a", 1), entry("a", 4), entry("a", 2)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].recency, 4);
    }

    #[test]
    fn test_cached_duplicates_fold_to_newest_before_merge() {
        let cached = vec![entry("a", 5), entry("b", 1), entry("a", 9), entry("a", 7)];
        let incoming = vec![entry("a", 8), entry("b", 2)];

        let (merged, stats) = merge_entries(cached, incoming);
        assert_eq!(ids(&merged), vec!["a", "b"]);
        assert_eq!(merged[0].recency, 9);
        assert_eq!(merged[1].recency, 2);
        assert_eq!(stats.collapsed, 2);
        assert_eq!(stats.unchanged, 1);
        assert_eq!(stats.replaced, 1);
    }

    #[test]
    fn test_cap_evicts_oldest() {
        let mut entries: Vec<Entry> = (0..510).map(|i| entry(&format!("v{}", i), i)).collect();
        assert_eq!(cap_entries(&mut entries, 500), 10);
        assert_eq!(entries.len(), 500);
        assert_eq!(entries[0].recency, 509);
        assert_eq!(entries[499].recency, 10);

        let mut small = vec![entry("x", 1), entry("y", 2)];
        assert_eq!(cap_entries(&mut small, 500), 0);
        assert_eq!(ids(&small), vec!["y", "x"]);
    }
}
