//! Seed-hit materialization: match collection plus the two anchor
//! expanders (SPEC_FULL.md §4.3–§4.6).

mod direct;
mod heap;
mod matches;

pub use direct::collect_seed_hits_direct;
pub use heap::collect_seed_hits_heap;
pub use matches::{collect_matches, skip_seed, Match};

use crate::index::Index;
use crate::minimizer::Mm128;
use crate::opt::MapFlags;

/// Result of collecting seed hits: anchors plus repetitiveness bookkeeping.
#[derive(Debug, Default)]
pub struct SeedHits {
    pub anchors: Vec<Mm128>,
    pub rep_len: i32,
    pub mini_pos: Vec<u64>,
}

/// Dispatch to the heap or direct expander per `MapFlags::HEAP_SORT`.
pub fn collect_seed_hits(
    idx: &dyn Index,
    flag: MapFlags,
    max_occ: i32,
    qname: Option<&str>,
    mv: &[Mm128],
    qlen: i32,
) -> SeedHits {
    if flag.contains(MapFlags::HEAP_SORT) {
        collect_seed_hits_heap(idx, flag, max_occ, qname, mv, qlen)
    } else {
        collect_seed_hits_direct(idx, flag, max_occ, qname, mv, qlen)
    }
}
