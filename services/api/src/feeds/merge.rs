//! Static/dynamic list merging

use std::collections::{HashMap, HashSet};

use crate::models::feed::FeedItem;

/// Merge a curated list with freshly fetched items.
///
/// Static order is kept and every static item sharing an id with a dynamic one
/// is replaced by it. Dynamic-only items follow in the order they were first
/// seen. Duplicate ids inside `dynamic` collapse to the last occurrence.
pub fn merge_by_id<T: FeedItem>(static_items: Vec<T>, dynamic: Vec<T>) -> Vec<T> {
    let mut order: Vec<String> = Vec::with_capacity(dynamic.len());
    let mut latest: HashMap<String, T> = HashMap::with_capacity(dynamic.len());
    for item in dynamic {
        let id = item.feed_id().to_string();
        if latest.insert(id.clone(), item).is_none() {
            order.push(id);
        }
    }

    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(static_items.len() + order.len());

    for item in static_items {
        let id = item.feed_id().to_string();
        if !seen.insert(id.clone()) {
            continue;
        }
        merged.push(latest.remove(&id).unwrap_or(item));
    }

    for id in order {
        if let Some(item) = latest.remove(&id) {
            if seen.insert(id) {
                merged.push(item);
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: &'static str,
        value: u32,
    }

    impl FeedItem for Item {
        fn feed_id(&self) -> &str {
            self.id
        }
    }

    fn item(id: &'static str, value: u32) -> Item {
        Item { id, value }
    }

    #[test]
    fn test_dynamic_wins_on_shared_id() {
        let merged = merge_by_id(
            vec![item("a", 1), item("b", 1)],
            vec![item("b", 2), item("c", 2)],
        );
        assert_eq!(merged, vec![item("a", 1), item("b", 2), item("c", 2)]);
    }

    #[test]
    fn test_no_duplicate_ids() {
        let merged = merge_by_id(
            vec![item("a", 1), item("a", 9)],
            vec![item("c", 1), item("a", 2), item("c", 3)],
        );
        let ids: Vec<_> = merged.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(merged[0].value, 2);
        // last duplicate inside the dynamic list wins
        assert_eq!(merged[1].value, 3);
    }

    #[test]
    fn test_empty_sides() {
        assert_eq!(merge_by_id(vec![item("a", 1)], vec![]), vec![item("a", 1)]);
        assert_eq!(merge_by_id(vec![], vec![item("b", 1)]), vec![item("b", 1)]);
        assert!(merge_by_id::<Item>(vec![], vec![]).is_empty());
    }
}
