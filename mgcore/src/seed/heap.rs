//! Anchor expander — heap (SPEC_FULL.md §4.6): k-way merge over posting
//! lists via a hand-rolled binary min-heap on `x`, avoiding the direct
//! expander's radix-sort pass.

use super::{collect_matches, skip_seed, Match, SeedHits};
use crate::anchor::expand_one;
use crate::index::Index;
use crate::minimizer::Mm128;
use crate::opt::MapFlags;

/// One heap entry: `x` is the current posting value, `y` packs
/// `(match_index << 32) | cursor` the way `ks_heapmake_heap` does in the
/// original.
#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    x: u64,
    y: u64,
}

fn heap_make(heap: &mut [HeapEntry]) {
    let n = heap.len();
    for i in (0..n / 2).rev() {
        sift_down(heap, i, n);
    }
}

fn sift_down(heap: &mut [HeapEntry], mut i: usize, n: usize) {
    loop {
        let l = 2 * i + 1;
        let r = 2 * i + 2;
        let mut largest = i; // min-heap on x: `largest` here tracks the smallest
        if l < n && heap[l].x < heap[largest].x {
            largest = l;
        }
        if r < n && heap[r].x < heap[largest].x {
            largest = r;
        }
        if largest == i {
            break;
        }
        heap.swap(i, largest);
        i = largest;
    }
}

pub fn collect_seed_hits_heap(
    idx: &dyn Index,
    flag: MapFlags,
    max_occ: i32,
    qname: Option<&str>,
    mv: &[Mm128],
    qlen: i32,
) -> SeedHits {
    let (matches, n_a, rep_len, mini_pos) = collect_matches(idx, max_occ, mv);
    let n_a = n_a as usize;

    let mut heap: Vec<HeapEntry> = Vec::with_capacity(matches.len());
    for (i, m) in matches.iter().enumerate() {
        if !m.postings.is_empty() {
            heap.push(HeapEntry {
                x: m.postings[0],
                y: (i as u64) << 32,
            });
        }
    }
    heap_make(&mut heap);

    let mut anchors = vec![Mm128::default(); n_a];
    let mut n_for: usize = 0;
    let mut n_rev: usize = 0;

    while !heap.is_empty() {
        let top = heap[0];
        let match_idx = (top.y >> 32) as usize;
        let cursor = top.y as u32 as usize;
        let q: &Match = &matches[match_idx];
        let r = top.x;

        if !skip_seed(flag, r, q.q_pos, qname, qlen, idx) {
            let anchor = expand_one(r, q.q_pos, q.q_span, qlen, q.seg_id, q.is_tandem);
            let forward = (r & 1) as u32 == (q.q_pos & 1);
            if forward {
                anchors[n_for] = anchor;
                n_for += 1;
            } else {
                n_rev += 1;
                anchors[n_a - n_rev] = anchor;
            }
        }

        let heap_len = heap.len();
        if cursor + 1 < q.n() {
            heap[0].y = ((match_idx as u64) << 32) | (cursor as u64 + 1);
            heap[0].x = q.postings[cursor + 1];
        } else {
            heap[0] = heap[heap_len - 1];
            heap.pop();
        }
        let new_len = heap.len();
        if new_len > 0 {
            sift_down(&mut heap, 0, new_len);
        }
    }

    // the reverse half was written descending from the tail; reverse it
    for j in 0..n_rev / 2 {
        anchors.swap(n_a - 1 - j, n_a - (n_rev - j));
    }
    let mut n_a_final = n_a;
    if n_for + n_rev < n_a {
        // compact the reverse block down against the forward block
        let rev_block: Vec<Mm128> = anchors[n_a - n_rev..n_a].to_vec();
        anchors[n_for..n_for + n_rev].copy_from_slice(&rev_block);
        n_a_final = n_for + n_rev;
    }
    anchors.truncate(n_a_final);

    SeedHits {
        anchors,
        rep_len,
        mini_pos,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::InMemoryIndex;
    use crate::seed::collect_seed_hits_direct;

    fn mm(hash: u64, span: u64, seg_id: u64, q_end: u64, strand: u64) -> Mm128 {
        Mm128::new((hash << 8) | span, (seg_id << 32) | (q_end << 1) | strand)
    }

    #[test]
    fn heap_and_direct_agree_as_strand_partitioned_multisets() {
        let mut idx = InMemoryIndex::new(15, 10, false);
        let seg = idx.add_segment("chr1");
        idx.insert(7, seg, 1000, 0);
        idx.insert(7, seg, 2000, 1);
        idx.insert(9, seg, 500, 0);

        let mv = vec![mm(7, 15, 0, 20, 0), mm(9, 15, 0, 60, 0)];

        let direct = collect_seed_hits_direct(&idx, MapFlags::empty(), 50, None, &mv, 100);
        let heap = collect_seed_hits_heap(&idx, MapFlags::empty(), 50, None, &mv, 100);

        assert_eq!(direct.anchors.len(), heap.anchors.len());

        let mut d_sorted: Vec<u64> = direct.anchors.iter().map(|a| a.x).collect();
        let mut h_sorted: Vec<u64> = heap.anchors.iter().map(|a| a.x).collect();
        d_sorted.sort_unstable();
        h_sorted.sort_unstable();
        assert_eq!(d_sorted, h_sorted);

        // heap output stays ascending within each strand partition
        let forward: Vec<u64> = heap
            .anchors
            .iter()
            .filter(|a| a.x >> 63 == 0)
            .map(|a| a.x)
            .collect();
        let mut forward_sorted = forward.clone();
        forward_sorted.sort_unstable();
        assert_eq!(forward, forward_sorted);
    }
}
