//! Split a batch into items already forwarded by an earlier run and new ones.

use crate::models::Item;
use crate::store::ProcessedStore;
use tracing::{debug, warn};

/// Result of [`partition`]. Both halves keep the batch's relative order.
#[derive(Debug, Default)]
pub struct Partition {
    pub seen: Vec<Item>,
    pub fresh: Vec<Item>,
}

/// Classify every item against `store`.
///
/// An item without an identifier cannot be tracked, so it is always `fresh`
/// and a warning is logged for it.
pub fn partition<P: ProcessedStore>(items: Vec<Item>, store: &P) -> Partition {
    let mut out = Partition::default();
    for item in items {
        if !item.is_identifiable() {
            warn!(
                title = %item.display_title(),
                "Item has no identifier; it cannot be deduplicated and is treated as new"
            );
            out.fresh.push(item);
        } else if store.contains(&item.id) {
            debug!(id = %item.id, title = %item.display_title(), "Already processed");
            out.seen.push(item);
        } else {
            out.fresh.push(item);
        }
    }
    debug!(
        seen = out.seen.len(),
        fresh = out.fresh.len(),
        "Partitioned batch"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use std::collections::HashSet;

    struct SetStore(HashSet<String>);

    impl ProcessedStore for SetStore {
        fn contains(&self, id: &str) -> bool {
            self.0.contains(id)
        }

        async fn append(&mut self, id: &str) -> Result<(), StoreError> {
            self.0.insert(id.to_string());
            Ok(())
        }

        fn len(&self) -> usize {
            self.0.len()
        }
    }

    fn item(id: &str) -> Item {
        Item {
            id: id.to_string(),
            url: format!("https://example.com/{id}"),
            ..Default::default()
        }
    }

    fn ids(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn test_known_ids_are_excluded_from_fresh() {
        let store = SetStore(["b", "d"].iter().map(|s| s.to_string()).collect());
        let batch = vec![item("a"), item("b"), item("c"), item("d"), item("e")];

        let p = partition(batch, &store);

        assert_eq!(ids(&p.fresh), vec!["a", "c", "e"]);
        assert_eq!(ids(&p.seen), vec!["b", "d"]);
    }

    #[test]
    fn test_missing_id_is_always_fresh() {
        let store = SetStore(["".to_string()].into_iter().collect());
        let batch = vec![item(""), item("x")];

        let p = partition(batch, &store);

        assert_eq!(p.fresh.len(), 2);
        assert!(p.seen.is_empty());
        assert_eq!(p.fresh[0].id, "");
    }

    #[test]
    fn test_empty_store_keeps_everything() {
        let store = SetStore(HashSet::new());
        let p = partition(vec![item("1"), item("2")], &store);
        assert_eq!(ids(&p.fresh), vec!["1", "2"]);
    }
}
