//! Set algebra over serial lists (spec §4.I).
//!
//! Every index scan in `crate::finders` returns an ordered `Vec<u64>` of
//! serials. The planner (`crate::planner`) dedups and intersects these lists
//! before the final created_at sort. Two dedup strategies are used depending
//! on input size — a hash-set side table is fast for the common small case,
//! but a full side table over a very large scan (the planner's own 10 000
//! cap makes this rare, but callers may hand larger slices directly) costs
//! more memory than sorting in place and restoring order.

use std::collections::HashSet;

/// Above this many elements, `dedup_in_order` switches from a hash-set
/// side table to a sort-based two-pointer pass.
const LARGE_SET_THRESHOLD: usize = 10_000;

/// Remove duplicates, keeping only the first occurrence of each value and
/// preserving the input order.
pub fn dedup_in_order(xs: &[u64]) -> Vec<u64> {
    if xs.len() <= LARGE_SET_THRESHOLD {
        dedup_small(xs)
    } else {
        dedup_large(xs)
    }
}

fn dedup_small(xs: &[u64]) -> Vec<u64> {
    let mut seen = HashSet::with_capacity(xs.len());
    let mut out = Vec::with_capacity(xs.len());
    for &x in xs {
        if seen.insert(x) {
            out.push(x);
        }
    }
    out
}

/// Sort a copy to find duplicates, then rebuild the result in original
/// input order using the first index at which each value occurred.
fn dedup_large(xs: &[u64]) -> Vec<u64> {
    let mut indexed: Vec<(u64, usize)> = xs.iter().copied().zip(0..).collect();
    indexed.sort_unstable_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut first_index_of = Vec::with_capacity(xs.len());
    let mut i = 0;
    while i < indexed.len() {
        let mut j = i + 1;
        while j < indexed.len() && indexed[j].0 == indexed[i].0 {
            j += 1;
        }
        first_index_of.push(indexed[i].1);
        i = j;
    }
    first_index_of.sort_unstable();
    first_index_of.into_iter().map(|idx| xs[idx]).collect()
}

/// Intersect two serial lists, preserving the order of `xs`. Both sides are
/// deduped first. If `ys` is the smaller side it becomes the lookup table
/// directly; if `xs` is smaller, building a full `ys`-sized set would waste
/// the saving, so instead `xs` seeds the lookup table and a single pass over
/// `ys` narrows it down to the actual intersection before the final
/// order-preserving filter over `xs`.
pub fn intersect(xs: &[u64], ys: &[u64]) -> Vec<u64> {
    let xs = dedup_in_order(xs);
    let ys = dedup_in_order(ys);

    if xs.is_empty() || ys.is_empty() {
        return Vec::new();
    }

    let membership: HashSet<u64> = if ys.len() <= xs.len() {
        ys.iter().copied().collect()
    } else {
        let xs_set: HashSet<u64> = xs.iter().copied().collect();
        ys.iter().copied().filter(|y| xs_set.contains(y)).collect()
    };

    xs.into_iter().filter(|x| membership.contains(x)).collect()
}

/// Union several serial lists, preserving first-occurrence order across the
/// concatenation. Used to OR together per-value scans within one tag key
/// before those per-key unions are intersected against each other.
pub fn union(lists: &[Vec<u64>]) -> Vec<u64> {
    let mut all = Vec::new();
    for list in lists {
        all.extend_from_slice(list);
    }
    dedup_in_order(&all)
}
