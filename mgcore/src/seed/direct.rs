//! Anchor expander — direct (SPEC_FULL.md §4.5): expand every match's
//! posting list, then radix-sort the whole array ascending on `x`.

use super::{collect_matches, skip_seed, SeedHits};
use crate::anchor::expand_one;
use crate::index::Index;
use crate::minimizer::Mm128;
use crate::opt::MapFlags;

pub fn collect_seed_hits_direct(
    idx: &dyn Index,
    flag: MapFlags,
    max_occ: i32,
    qname: Option<&str>,
    mv: &[Mm128],
    qlen: i32,
) -> SeedHits {
    let (matches, n_a, rep_len, mini_pos) = collect_matches(idx, max_occ, mv);
    let mut anchors = Vec::with_capacity(n_a as usize);
    for m in &matches {
        for &r in m.postings {
            if skip_seed(flag, r, m.q_pos, qname, qlen, idx) {
                continue;
            }
            anchors.push(expand_one(r, m.q_pos, m.q_span, qlen, m.seg_id, m.is_tandem));
        }
    }
    radix_sort_x(&mut anchors);
    SeedHits {
        anchors,
        rep_len,
        mini_pos,
    }
}

/// LSD radix sort on `x`, ascending, 8 passes over 8-bit digits — mirrors
/// `original_source/map.c`'s `radix_sort_128x` (`ksort.h`) call.
fn radix_sort_x(a: &mut [Mm128]) {
    if a.len() < 2 {
        return;
    }
    // Ping-pong between two owned buffers rather than reborrowing `a`
    // itself, so `a` stays free to copy the sorted result back into at the
    // end regardless of how many passes ran.
    let mut buf_a: Vec<Mm128> = a.to_vec();
    let mut buf_b: Vec<Mm128> = vec![Mm128::default(); a.len()];
    let mut src = &mut buf_a;
    let mut dst = &mut buf_b;
    for shift in (0..64).step_by(8) {
        let mut count = [0usize; 257];
        for m in src.iter() {
            let digit = ((m.x >> shift) & 0xff) as usize;
            count[digit + 1] += 1;
        }
        for i in 1..257 {
            count[i] += count[i - 1];
        }
        for m in src.iter() {
            let digit = ((m.x >> shift) & 0xff) as usize;
            dst[count[digit]] = *m;
            count[digit] += 1;
        }
        std::mem::swap(&mut src, &mut dst);
    }
    a.copy_from_slice(src);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radix_sort_orders_ascending() {
        let mut v: Vec<Mm128> = vec![
            Mm128::new(500, 0),
            Mm128::new(10, 0),
            Mm128::new(u64::MAX, 0),
            Mm128::new(0, 0),
            Mm128::new(300, 0),
        ];
        radix_sort_x(&mut v);
        let xs: Vec<u64> = v.iter().map(|m| m.x).collect();
        let mut sorted = xs.clone();
        sorted.sort_unstable();
        assert_eq!(xs, sorted);
    }

    #[test]
    fn no_hits_yields_empty_anchors() {
        use crate::index::InMemoryIndex;
        let idx = InMemoryIndex::new(15, 10, false);
        let hits = collect_seed_hits_direct(&idx, MapFlags::empty(), 50, None, &[], 50);
        assert!(hits.anchors.is_empty());
        assert_eq!(hits.rep_len, 0);
    }
}
