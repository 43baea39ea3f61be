//! Bookmark Tree Index
//!
//! Parent/child queries and sibling ordering over the flat record list.
//! Display order within a folder is ascending `order`; ties keep list order.

use crate::identity::IdentityResolver;
use bookmark_sync_core::*;
use std::collections::HashSet;

/// Indices of the children of `parent_id`, in display order.
///
/// A child matches when its `parent_id` is any id the parent is known by,
/// so children keyed by a folder's local UUID and by its server id are both
/// found. `None` lists the root.
pub fn child_indices(records: &[BookmarkRecord], parent_id: Option<&str>) -> Vec<usize> {
    let aliases = parent_id.map(|p| IdentityResolver::new(records).aliases(p));
    let mut seen = HashSet::new();

    let mut indices: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| match (&aliases, r.parent_id.as_deref()) {
            (None, None) => true,
            (Some(aliases), Some(parent)) => aliases.contains(parent),
            _ => false,
        })
        .filter(|(_, r)| seen.insert(r.key()))
        .map(|(i, _)| i)
        .collect();

    // sort_by_key is stable
    indices.sort_by_key(|&i| records[i].order);
    indices
}

pub fn children_of<'a>(records: &'a [BookmarkRecord], parent_id: Option<&str>) -> Vec<&'a BookmarkRecord> {
    child_indices(records, parent_id)
        .into_iter()
        .map(|i| &records[i])
        .collect()
}

pub fn roots(records: &[BookmarkRecord]) -> Vec<&BookmarkRecord> {
    children_of(records, None)
}

/// Order for a record appended to the end of `parent_id`
pub fn next_order(records: &[BookmarkRecord], parent_id: Option<&str>) -> u32 {
    children_of(records, parent_id)
        .iter()
        .map(|r| r.order)
        .max()
        .map_or(0, |max| max + 1)
}

/// True when `candidate` is `ancestor` itself or lies somewhere beneath it
pub fn is_within(records: &[BookmarkRecord], candidate: &str, ancestor: &BookmarkRecord) -> bool {
    let resolver = IdentityResolver::new(records);
    let mut current = resolver.find(candidate);
    let mut steps = 0;

    while let Some(record) = current {
        if record.identity.matches(&ancestor.identity) {
            return true;
        }
        // Cycles are not expected in the data; never walk more than the list
        steps += 1;
        if steps > records.len() {
            return false;
        }
        current = record.parent_id.as_deref().and_then(|p| resolver.find(p));
    }
    false
}

/// Keys of `root_key` and everything beneath it
pub fn subtree_keys(records: &[BookmarkRecord], root_key: &str) -> HashSet<String> {
    let mut keys = HashSet::new();
    let mut stack = vec![root_key.to_string()];

    while let Some(key) = stack.pop() {
        if !keys.insert(key.clone()) {
            continue;
        }
        for child in children_of(records, Some(&key)) {
            stack.push(child.key().to_string());
        }
    }
    keys
}

/// Move the record at `index` to visual position `target_index` among its
/// siblings, then renumber the siblings `0..n` in their new order.
///
/// The siblings keep the array slots they occupied, so records outside the
/// folder do not move. Returns `false` if `index` is out of range.
pub fn move_within(records: &mut [BookmarkRecord], index: usize, target_index: usize) -> bool {
    let Some(record) = records.get(index) else {
        return false;
    };
    let parent_id = record.parent_id.clone();

    let siblings = child_indices(records, parent_id.as_deref());
    let Some(from) = siblings.iter().position(|&i| i == index) else {
        return false;
    };

    let mut visual = siblings.clone();
    let moved = visual.remove(from);
    let target = target_index.min(visual.len());
    visual.insert(target, moved);

    let mut slots = siblings;
    slots.sort_unstable();

    let reordered: Vec<BookmarkRecord> = visual.iter().map(|&i| records[i].clone()).collect();
    for (position, (slot, mut record)) in slots.into_iter().zip(reordered).enumerate() {
        record.order = position as u32;
        records[slot] = record;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str, parent: Option<&str>, order: u32) -> BookmarkRecord {
        let mut r = BookmarkRecord::new_local(
            BookmarkType::Bookmark,
            key,
            Some(format!("https://{}.example", key)),
            parent.map(str::to_string),
            order,
        );
        r.identity = Identity::Synced { server_id: key.to_string() };
        r
    }

    fn folder(key: &str, parent: Option<&str>, order: u32) -> BookmarkRecord {
        let mut r = BookmarkRecord::new_local(BookmarkType::Folder, key, None, parent.map(str::to_string), order);
        r.identity = Identity::Synced { server_id: key.to_string() };
        r
    }

    fn titles(records: &[&BookmarkRecord]) -> Vec<String> {
        records.iter().map(|r| r.title.clone()).collect()
    }

    #[test]
    fn test_children_sorted_with_stable_ties() {
        let records = vec![
            record("c", None, 2),
            record("a1", None, 0),
            record("b", None, 1),
            record("a2", None, 0),
        ];
        assert_eq!(titles(&roots(&records)), vec!["a1", "a2", "b", "c"]);
    }

    #[test]
    fn test_children_found_under_local_and_server_parent_ids() {
        let mut work = folder("work", None, 0);
        work.identity = Identity::LocalSyncedTo {
            local_id: "u-work".to_string(),
            server_id: "srv-work".to_string(),
        };
        let records = vec![
            work,
            record("x", Some("u-work"), 1),
            record("y", Some("srv-work"), 0),
        ];

        assert_eq!(titles(&children_of(&records, Some("srv-work"))), vec!["y", "x"]);
        assert_eq!(titles(&children_of(&records, Some("u-work"))), vec!["y", "x"]);
    }

    #[test]
    fn test_duplicate_keys_listed_once() {
        let records = vec![record("a", None, 0), record("a", None, 1)];
        assert_eq!(roots(&records).len(), 1);
    }

    #[test]
    fn test_next_order_appends() {
        let records = vec![folder("f", None, 0), record("a", Some("f"), 4)];
        assert_eq!(next_order(&records, Some("f")), 5);
        assert_eq!(next_order(&records, None), 1);
        assert_eq!(next_order(&[], None), 0);
    }

    #[test]
    fn test_is_within_detects_descendants() {
        let records = vec![
            folder("outer", None, 0),
            folder("inner", Some("outer"), 0),
            record("leaf", Some("inner"), 0),
        ];
        let outer = &records[0];
        assert!(is_within(&records, "inner", outer));
        assert!(is_within(&records, "outer", outer));
        assert!(!is_within(&records, "inner", &records[2]));
    }

    #[test]
    fn test_subtree_keys() {
        let records = vec![
            folder("outer", None, 0),
            folder("inner", Some("outer"), 0),
            record("leaf", Some("inner"), 0),
            record("other", None, 1),
        ];
        let keys = subtree_keys(&records, "outer");
        assert_eq!(keys.len(), 3);
        assert!(!keys.contains("other"));
    }

    #[test]
    fn test_move_within_renumbers_folder_only() {
        let mut records = vec![
            record("a", Some("f"), 0),
            record("root-item", None, 0),
            record("b", Some("f"), 1),
            record("c", Some("f"), 2),
        ];

        // Move "a" to the last position
        assert!(move_within(&mut records, 0, 2));

        let order: Vec<(String, u32)> = children_of(&records, Some("f"))
            .iter()
            .map(|r| (r.title.clone(), r.order))
            .collect();
        assert_eq!(
            order,
            vec![("b".to_string(), 0), ("c".to_string(), 1), ("a".to_string(), 2)]
        );
        assert_eq!(records[1].title, "root-item");
        assert_eq!(records[1].order, 0);
    }

    #[test]
    fn test_move_within_clamps_target() {
        let mut records = vec![record("a", None, 0), record("b", None, 1)];
        assert!(move_within(&mut records, 0, 99));
        assert_eq!(titles(&roots(&records)), vec!["b", "a"]);
        assert!(!move_within(&mut records, 7, 0));
    }
}
