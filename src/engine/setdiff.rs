//! # Set Difference
//!
//! Partitions the old and new snapshots of a child collection.
//!
//! Items are matched by an identity key. Matched items whose fingerprint
//! changed are modified in place; everything else is added or removed. Fields
//! the remote cannot change in place belong in the key, so changing them turns
//! into a remove plus an add.
//!
//! Every output list is sorted by key, so identical inputs always produce the
//! same vendor call sequence.

use std::collections::BTreeMap;

/// An item present in both snapshots whose fingerprint changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modified<T> {
    pub old: T,
    pub new: T,
}

/// Partition of `old ∪ new`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDiff<T> {
    /// In `new` only
    pub to_add: Vec<T>,
    /// In `old` only
    pub to_remove: Vec<T>,
    /// In both, fingerprint changed
    pub to_modify: Vec<Modified<T>>,
    /// In both, fingerprint unchanged
    pub unchanged: Vec<T>,
}

impl<T> SetDiff<T> {
    /// True when nothing needs to be dispatched
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty() && self.to_modify.is_empty()
    }

    /// Number of keys present in both snapshots
    #[must_use]
    pub fn common(&self) -> usize {
        self.to_modify.len() + self.unchanged.len()
    }
}

/// Compute the partition of two snapshots
///
/// Duplicate keys within one snapshot collapse to the last occurrence.
pub fn diff_sets<T, K, M, KF, MF>(old: &[T], new: &[T], key: KF, fingerprint: MF) -> SetDiff<T>
where
    T: Clone,
    K: Ord,
    M: PartialEq,
    KF: Fn(&T) -> K,
    MF: Fn(&T) -> M,
{
    let old_by_key: BTreeMap<K, &T> = old.iter().map(|item| (key(item), item)).collect();
    let mut new_by_key: BTreeMap<K, &T> = new.iter().map(|item| (key(item), item)).collect();

    let mut diff = SetDiff {
        to_add: Vec::new(),
        to_remove: Vec::new(),
        to_modify: Vec::new(),
        unchanged: Vec::new(),
    };

    for (k, old_item) in old_by_key {
        match new_by_key.remove(&k) {
            None => diff.to_remove.push(old_item.clone()),
            Some(new_item) if fingerprint(old_item) == fingerprint(new_item) => {
                diff.unchanged.push(new_item.clone());
            }
            Some(new_item) => diff.to_modify.push(Modified {
                old: old_item.clone(),
                new: new_item.clone(),
            }),
        }
    }
    diff.to_add = new_by_key.into_values().cloned().collect();
    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Server {
        instance: &'static str,
        ip: &'static str,
        port: u16,
        weight: u32,
    }

    fn server(instance: &'static str, ip: &'static str, port: u16, weight: u32) -> Server {
        Server {
            instance,
            ip,
            port,
            weight,
        }
    }

    fn diff(old: &[Server], new: &[Server]) -> SetDiff<Server> {
        diff_sets(old, new, |s| (s.instance, s.ip, s.port), |s| s.weight)
    }

    #[test]
    fn test_backend_weight_change_add_and_remove() {
        let old = [server("i-1", "10.0.0.1", 80, 10), server("i-2", "10.0.0.2", 80, 20)];
        let new = [server("i-2", "10.0.0.2", 80, 50), server("i-3", "10.0.0.3", 80, 30)];

        let d = diff(&old, &new);
        assert_eq!(d.to_remove, vec![server("i-1", "10.0.0.1", 80, 10)]);
        assert_eq!(d.to_add, vec![server("i-3", "10.0.0.3", 80, 30)]);
        assert_eq!(
            d.to_modify,
            vec![Modified {
                old: server("i-2", "10.0.0.2", 80, 20),
                new: server("i-2", "10.0.0.2", 80, 50),
            }]
        );
        assert!(d.unchanged.is_empty());
    }

    #[test]
    fn test_port_change_is_remove_plus_add() {
        let old = [server("i-1", "10.0.0.1", 80, 10)];
        let new = [server("i-1", "10.0.0.1", 8080, 10)];
        let d = diff(&old, &new);
        assert_eq!(d.to_remove.len(), 1);
        assert_eq!(d.to_add.len(), 1);
        assert!(d.to_modify.is_empty());
    }

    #[test]
    fn test_identical_sets_are_empty_diff() {
        let set = [server("i-1", "10.0.0.1", 80, 10), server("i-2", "10.0.0.2", 80, 20)];
        let d = diff(&set, &set);
        assert!(d.is_empty());
        assert_eq!(d.common(), 2);
    }

    #[test]
    fn test_outputs_sorted_by_key_regardless_of_input_order() {
        let new = [
            server("i-9", "10.0.0.9", 80, 1),
            server("i-1", "10.0.0.1", 80, 1),
            server("i-5", "10.0.0.5", 80, 1),
        ];
        let d = diff(&[], &new);
        let order: Vec<_> = d.to_add.iter().map(|s| s.instance).collect();
        assert_eq!(order, vec!["i-1", "i-5", "i-9"]);
    }

    #[test]
    fn test_partition_covers_union_and_is_disjoint() {
        let pool: Vec<Server> = (0..12u32)
            .map(|i| {
                let instance: &'static str = ["i-0", "i-1", "i-2", "i-3"][(i % 4) as usize];
                server(instance, "10.0.0.1", 80 + u16::try_from(i % 3).unwrap(), i % 2)
            })
            .collect();

        for split in 0..pool.len() {
            let (old, new) = pool.split_at(split);
            let new: Vec<Server> = new.iter().chain(old.iter().step_by(2)).cloned().collect();
            let d = diff(old, &new);

            let key = |s: &Server| (s.instance, s.ip, s.port);
            let added: BTreeSet<_> = d.to_add.iter().map(key).collect();
            let removed: BTreeSet<_> = d.to_remove.iter().map(key).collect();
            let common: BTreeSet<_> = d
                .to_modify
                .iter()
                .map(|m| key(&m.new))
                .chain(d.unchanged.iter().map(key))
                .collect();
            let union: BTreeSet<_> = old.iter().chain(new.iter()).map(key).collect();

            assert_eq!(added.len() + removed.len() + common.len(), union.len());
            assert!(added.is_disjoint(&removed));
            assert!(added.is_disjoint(&common));
            assert!(removed.is_disjoint(&common));
        }
    }
}
