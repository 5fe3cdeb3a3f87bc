//! The chaining DP and chain-generator collaborators (SPEC_FULL.md §6).
//!
//! Both the DP's internal algorithm and chain generation's region-building
//! details are explicit Non-goals (spec.md §1) — this module defines the
//! traits the mapper consumes and a minimal reference implementation of
//! each so the crate is runnable and testable end to end. Neither
//! reference implementation claims to reproduce minigraph's actual
//! `lchain.c`/`mg_lchain_gen` scoring; they exist only to exercise the
//! fragment mapper's orchestration (gap bounds, adaptive rechain, region
//! emission) documented in SPEC_FULL.md §4.7.

use crate::anchor::AnchorExt;
use crate::minimizer::Mm128;

/// `chain_dp(gap_ref, gap_qry, bw, skip, min_cnt, min_score, splice, n_segs, anchors) -> (anchors, u)`.
pub trait ChainDp {
    /// Returns the (possibly reordered) anchor array plus `u`, where for
    /// chain `i`, `score = u[i] >> 32` and `anchor_count = u[i] & 0xffff_ffff`,
    /// laid out as consecutive runs in the reordered anchor array.
    #[allow(clippy::too_many_arguments)]
    fn chain_dp(
        &self,
        gap_ref: i32,
        gap_qry: i32,
        bw: i32,
        max_chain_skip: i32,
        min_lc_cnt: i32,
        min_lc_score: i32,
        splice: bool,
        n_segs: usize,
        anchors: Vec<Mm128>,
    ) -> (Vec<Mm128>, Vec<u64>);
}

/// `chain_gen(hash, qlen_sum, u, anchors) -> regions`.
pub trait ChainGen {
    fn chain_gen(&self, hash: u32, qlen_sum: i32, u: &[u64], anchors: &[Mm128]) -> Vec<Region>;
}

/// A mapped region (SPEC_FULL.md §6): `{ qs, qe, rev, as_, cnt, score }`
/// (`as_` mirrors the original's `as` field, renamed to dodge the keyword).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub qs: i32,
    pub qe: i32,
    pub rev: bool,
    pub as_: usize,
    pub cnt: usize,
    pub score: i64,
    pub hash: u32,
}

/// A minimal greedy colinear chainer: sorts anchors by `x` (already mostly
/// sorted by the expanders), then groups consecutive anchors into one chain
/// as long as the query and reference gaps both stay within bound and both
/// advance monotonically on the same strand/segment. Not minigraph's DP —
/// see the module doc.
#[derive(Debug, Default)]
pub struct NaiveChainer;

impl ChainDp for NaiveChainer {
    fn chain_dp(
        &self,
        gap_ref: i32,
        gap_qry: i32,
        _bw: i32,
        _max_chain_skip: i32,
        min_lc_cnt: i32,
        min_lc_score: i32,
        _splice: bool,
        _n_segs: usize,
        mut anchors: Vec<Mm128>,
    ) -> (Vec<Mm128>, Vec<u64>) {
        anchors.sort_unstable_by_key(|a| a.x);
        let mut u = Vec::new();
        let mut out = Vec::with_capacity(anchors.len());
        let mut i = 0usize;
        while i < anchors.len() {
            let start = i;
            let mut j = i + 1;
            while j < anchors.len() {
                let prev = &anchors[j - 1];
                let cur = &anchors[j];
                let same_strand = prev.is_reverse() == cur.is_reverse();
                let same_seg = prev.seg_id() == cur.seg_id();
                let dq = cur.q_end() as i64 - prev.q_end() as i64;
                let dr = cur.ref_pos() as i64 - prev.ref_pos() as i64;
                if same_strand
                    && same_seg
                    && dq > 0
                    && dr > 0
                    && dq <= gap_qry as i64
                    && dr <= gap_ref as i64
                {
                    j += 1;
                } else {
                    break;
                }
            }
            let cnt = j - start;
            let score = cnt as i64 * 10; // placeholder scoring, see module doc
            if cnt as i32 >= min_lc_cnt && score >= min_lc_score as i64 {
                out.extend_from_slice(&anchors[start..j]);
                u.push(((score as u64) << 32) | (cnt as u64 & 0xffff_ffff));
            }
            i = j;
        }
        (out, u)
    }
}

impl ChainGen for NaiveChainer {
    fn chain_gen(&self, hash: u32, _qlen_sum: i32, u: &[u64], anchors: &[Mm128]) -> Vec<Region> {
        let mut regions = Vec::with_capacity(u.len());
        let mut off = 0usize;
        for &uu in u {
            let score = (uu >> 32) as i64;
            let cnt = (uu & 0xffff_ffff) as usize;
            let run = &anchors[off..off + cnt];
            if let (Some(first), Some(last)) = (run.first(), run.last()) {
                let rev = first.is_reverse();
                let qs = first.q_end() as i32 - first.span() as i32;
                let qe = last.q_end() as i32;
                regions.push(Region {
                    qs: qs.min(qe),
                    qe: qs.max(qe),
                    rev,
                    as_: off,
                    cnt,
                    score,
                    hash,
                });
            }
            off += cnt;
        }
        regions
    }
}
