//! Minimal reordering of user-ordered collections.
//!
//! Entries kept in place form a longest common subsequence of the two
//! orders; every other matched entry is moved. Among several longest
//! subsequences the one that is lexicographically first in target order is
//! kept, so `[A, B, C] -> [B, A, C]` moves `A` after `B`.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Entries of `target` that keep their relative position.
///
/// `source` and `target` hold the same items in two orders.
pub(crate) fn stable_set<T: Copy + Eq + Hash>(source: &[T], target: &[T]) -> HashSet<T> {
    if source == target {
        return target.iter().copied().collect();
    }

    let rank: HashMap<T, usize> = source.iter().enumerate().map(|(i, t)| (*t, i)).collect();
    let positions: Vec<usize> = target.iter().filter_map(|t| rank.get(t).copied()).collect();

    // Longest increasing run of source positions starting at each target index.
    let mut longest_from = vec![0usize; positions.len()];
    let mut tails: Vec<isize> = Vec::new();
    for (i, pos) in positions.iter().enumerate().rev() {
        let key = -(*pos as isize);
        let idx = tails.partition_point(|t| *t < key);
        if idx == tails.len() {
            tails.push(key);
        } else {
            tails[idx] = key;
        }
        longest_from[i] = idx + 1;
    }

    let mut need = tails.len();
    let mut last: Option<usize> = None;
    let mut stable = HashSet::with_capacity(need);
    for (i, pos) in positions.iter().enumerate() {
        if need == 0 {
            break;
        }
        if longest_from[i] == need && last.is_none_or(|p| *pos > p) {
            stable.insert(target[i]);
            last = Some(*pos);
            need -= 1;
        }
    }
    stable
}
