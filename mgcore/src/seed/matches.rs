//! Match collector and strand filter (SPEC_FULL.md §4.3, §4.4).

use crate::index::Index;
use crate::minimizer::Mm128;
use crate::opt::MapFlags;

/// One retained minimizer's expansion job against the index.
#[derive(Debug, Clone)]
pub struct Match<'a> {
    pub q_pos: u32,
    pub q_span: u32,
    pub seg_id: u32,
    pub is_tandem: bool,
    pub postings: &'a [u64],
}

impl<'a> Match<'a> {
    pub fn n(&self) -> usize {
        self.postings.len()
    }
}

/// `skip_seed` (SPEC_FULL.md §4.4): `qname`/`qlen`/`gi` are accepted but
/// unused, matching the original's reserved-but-inert signature (spec.md
/// §9 Open Question).
pub fn skip_seed(
    flag: MapFlags,
    r: u64,
    q_pos: u32,
    _qname: Option<&str>,
    _qlen: i32,
    _gi: &dyn Index,
) -> bool {
    if flag.intersects(MapFlags::FOR_ONLY | MapFlags::REV_ONLY) {
        if (r & 1) as u32 == (q_pos & 1) {
            // forward strand
            if flag.contains(MapFlags::REV_ONLY) {
                return true;
            }
        } else if flag.contains(MapFlags::FOR_ONLY) {
            return true;
        }
    }
    false
}

/// Collect matches for minimizer vector `mv` against the index, honoring
/// `max_occ`, tandem marking, and rolling repetitive-region accounting
/// (SPEC_FULL.md §4.3).
pub fn collect_matches<'a>(
    idx: &'a dyn Index,
    max_occ: i32,
    mv: &[Mm128],
) -> (Vec<Match<'a>>, i64, i32, Vec<u64>) {
    let mut matches = Vec::with_capacity(mv.len());
    let mut mini_pos = Vec::with_capacity(mv.len());
    let mut n_a: i64 = 0;
    let mut rep_len: i32 = 0;
    let mut rep_st: i32 = 0;
    let mut rep_en: i32 = 0;

    for (i, m) in mv.iter().enumerate() {
        let q_pos = m.y as u32;
        let q_span = m.x & 0xff;
        let key = m.x >> 8;
        let postings = idx.get(key);
        let count = postings.len() as i32;
        if count >= max_occ {
            let en = ((q_pos >> 1) + 1) as i32;
            let st = en - q_span as i32;
            if st > rep_en {
                rep_len += rep_en - rep_st;
                rep_st = st;
                rep_en = en;
            } else {
                rep_en = en;
            }
        } else {
            let mut is_tandem = false;
            if i > 0 && (m.x >> 8) == (mv[i - 1].x >> 8) {
                is_tandem = true;
            }
            if i + 1 < mv.len() && (m.x >> 8) == (mv[i + 1].x >> 8) {
                is_tandem = true;
            }
            n_a += postings.len() as i64;
            mini_pos.push(((q_span as u64) << 32) | (q_pos >> 1) as u64);
            matches.push(Match {
                q_pos,
                q_span,
                seg_id: (m.y >> 32) as u32,
                is_tandem,
                postings,
            });
        }
    }
    rep_len += rep_en - rep_st;
    (matches, n_a, rep_len, mini_pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{pack_posting, InMemoryIndex};

    fn mm(hash: u64, span: u64, seg_id: u64, q_end: u64, strand: u64) -> Mm128 {
        Mm128::new((hash << 8) | span, (seg_id << 32) | (q_end << 1) | strand)
    }

    #[test]
    fn occurrence_cap_emits_no_match_and_grows_rep_len() {
        let mut idx = InMemoryIndex::new(15, 10, false);
        let seg = idx.add_segment("chr1");
        for p in 0..5 {
            idx.insert(7, seg, 1000 + p, 0);
        }
        let mv = vec![mm(7, 15, 0, 20, 0)];
        let (matches, n_a, rep_len, mini_pos) = collect_matches(&idx, 5, &mv);
        assert!(matches.is_empty());
        assert_eq!(n_a, 0);
        assert_eq!(rep_len, 15); // en=21, st=21-15=6 => rep_len = 21-6=15
        assert!(mini_pos.is_empty());
    }

    #[test]
    fn below_cap_emits_match_and_records_mini_pos() {
        let mut idx = InMemoryIndex::new(15, 10, false);
        let seg = idx.add_segment("chr1");
        idx.insert(7, seg, 1000, 0);
        let mv = vec![mm(7, 15, 0, 20, 0)];
        let (matches, n_a, rep_len, mini_pos) = collect_matches(&idx, 5, &mv);
        assert_eq!(matches.len(), 1);
        assert_eq!(n_a, 1);
        assert_eq!(rep_len, 0);
        assert_eq!(mini_pos.len(), 1);
        assert_eq!(mini_pos[0], (15u64 << 32) | 20);
    }

    #[test]
    fn adjacent_identical_hash_marks_tandem() {
        let mut idx = InMemoryIndex::new(15, 10, false);
        let seg = idx.add_segment("chr1");
        idx.insert(7, seg, 1000, 0);
        let mv = vec![mm(7, 15, 0, 20, 0), mm(7, 15, 0, 40, 0)];
        let (matches, _, _, _) = collect_matches(&idx, 5, &mv);
        assert_eq!(matches.len(), 2);
        assert!(matches[0].is_tandem);
        assert!(matches[1].is_tandem);
    }

    #[test]
    fn skip_seed_honors_strand_only_flags() {
        let idx = InMemoryIndex::new(15, 10, false);
        let r = pack_posting(0, 10, 0); // forward posting
        let q_pos = 0u32; // forward minimizer
        assert!(!skip_seed(MapFlags::empty(), r, q_pos, None, 0, &idx));
        assert!(skip_seed(MapFlags::REV_ONLY, r, q_pos, None, 0, &idx));
        assert!(!skip_seed(MapFlags::FOR_ONLY, r, q_pos, None, 0, &idx));

        let r_rev = pack_posting(0, 10, 1); // reverse posting vs forward minimizer
        assert!(skip_seed(MapFlags::FOR_ONLY, r_rev, q_pos, None, 0, &idx));
        assert!(!skip_seed(MapFlags::REV_ONLY, r_rev, q_pos, None, 0, &idx));
    }
}
