//! Three-stage producer-consumer pipeline (SPEC_FULL.md §4.8): read a batch
//! of fragments, map them in parallel across a fixed worker pool, and emit
//! results in deterministic read order, one stage running ahead of the
//! next via bounded channels.

use std::sync::Mutex;

use crossbeam_channel::bounded;

use crate::bseq::{group_fragment, revcomp, BSeq, SeqSource};
use crate::chain::{ChainDp, ChainGen, Region};
use crate::error::Result;
use crate::index::Index;
use crate::mapper::FragmentMapper;
use crate::minimizer::Sketcher;
use crate::opt::{MapFlags, MapOpt, MG_MAX_SEG};
use crate::tbuf::TBuf;

/// One fragment as read off the source, tagged with its monotonic read id.
struct FragJob {
    rid: u64,
    records: Vec<BSeq>,
}

/// One fragment's mapped output, tagged for order-preserving emission.
pub struct FragResult {
    pub rid: u64,
    pub names: Vec<String>,
    pub regions: Vec<Vec<Region>>,
}

/// How many fragments' worth of lookahead the read stage keeps buffered
/// ahead of the mapping stage: 3 batches under `TWO_IO_THREADS`, 2
/// otherwise (SPEC_FULL.md §4.8).
fn lookahead(flag: MapFlags) -> usize {
    if flag.contains(MapFlags::TWO_IO_THREADS) {
        3
    } else {
        2
    }
}

/// Read fragments from `source` until a batch reaches `mini_batch_size`
/// total bases or the source is exhausted, assigning monotonic `rid`s.
fn read_batch(
    source: &mut dyn SeqSource,
    pending: &mut Option<BSeq>,
    next_rid: &mut u64,
    mini_batch_size: i64,
) -> Result<Vec<FragJob>> {
    let mut batch = Vec::new();
    let mut total: i64 = 0;
    loop {
        let frag = group_fragment(source, pending, MG_MAX_SEG)?;
        if frag.is_empty() {
            break;
        }
        total += frag.iter().map(|r| r.seq.len() as i64).sum::<i64>();
        batch.push(FragJob {
            rid: *next_rid,
            records: frag,
        });
        *next_rid += 1;
        if total >= mini_batch_size {
            break;
        }
    }
    Ok(batch)
}

/// Apply `pe_ori` to a two-segment fragment: reverse-complement and flip
/// the read order of whichever mate(s) the orientation bits mark as
/// reverse, matching the original's `pe_ori>>1&1` / `pe_ori&1` mate bits.
fn apply_pe_orientation(records: &mut [BSeq], pe_ori: u8) {
    if records.len() != 2 {
        return;
    }
    if (pe_ori >> 1) & 1 == 1 {
        records[0].seq = revcomp(&records[0].seq);
    }
    if pe_ori & 1 == 1 {
        records[1].seq = revcomp(&records[1].seq);
    }
}

/// Flip one region's `(qs, qe, rev)` back to the strand of the original,
/// pre-reverse-complement mate (SPEC_FULL.md §4.8): reflect the query
/// interval across the mate's length and invert the strand bit.
fn flip_region(r: &mut Region, qlen: i32) {
    let (qs, qe) = (qlen - r.qe, qlen - r.qs);
    r.qs = qs;
    r.qe = qe;
    r.rev = !r.rev;
}

/// Map one fragment job against the shared collaborators, honoring
/// `INDEPEND_SEG` (map each segment on its own rather than jointly).
fn map_one<S, I, C>(
    sketcher: &S,
    index: &I,
    chainer: &C,
    opt: &MapOpt,
    buf: &mut TBuf,
    job: &FragJob,
) -> FragResult
where
    S: Sketcher,
    I: Index,
    C: ChainDp + ChainGen,
{
    let mut records = job.records.clone();
    apply_pe_orientation(&mut records, opt.pe_ori);

    let mut mapper = FragmentMapper::new(sketcher, index, chainer, opt.clone());
    let qname = records.first().map(|r| r.name.as_str());

    let mut regions = if opt.flag.contains(MapFlags::INDEPEND_SEG) {
        records
            .iter()
            .map(|r| mapper.map(r.seq.len() as i32, &r.seq, buf, Some(r.name.as_str())))
            .collect()
    } else {
        let qlens: Vec<i32> = records.iter().map(|r| r.seq.len() as i32).collect();
        let seqs: Vec<&[u8]> = records.iter().map(|r| r.seq.as_slice()).collect();
        mapper.map_frag(&qlens, &seqs, buf, qname)
    };

    // Reverse-complementing a mate before mapping leaves its regions'
    // coordinates expressed on the flipped strand; flip them back onto the
    // original strand the mate was read on (mirrors the original's
    // post-map coordinate correction in its paired-end worker).
    if records.len() == 2 {
        if (opt.pe_ori >> 1) & 1 == 1 {
            let qlen = records[0].seq.len() as i32;
            for r in &mut regions[0] {
                flip_region(r, qlen);
            }
        }
        if opt.pe_ori & 1 == 1 {
            let qlen = records[1].seq.len() as i32;
            for r in &mut regions[1] {
                flip_region(r, qlen);
            }
        }
    }

    FragResult {
        rid: job.rid,
        names: records.iter().map(|r| r.name.clone()).collect(),
        regions,
    }
}

/// Run the full read → parallel-map → emit pipeline over `source`, calling
/// `emit` once per fragment in monotonic `rid` order. `n_threads` sizes the
/// mapping worker pool (SPEC_FULL.md §5: one thread pool shared by all
/// batches, 2–3 pipeline coordinator threads implicit in the staged loop
/// below rather than spawned as long-lived OS threads, since each batch's
/// read/map/emit already interleaves via the bounded channel lookahead).
#[allow(clippy::too_many_arguments)]
pub fn run_pipeline<S, I, C>(
    source: &mut dyn SeqSource,
    sketcher: &S,
    index: &I,
    chainer: &C,
    opt: &MapOpt,
    n_threads: usize,
    mut emit: impl FnMut(FragResult),
) -> Result<()>
where
    S: Sketcher + Sync,
    I: Index + Sync,
    C: ChainDp + ChainGen + Sync,
{
    let (batch_tx, batch_rx) = bounded::<Vec<FragJob>>(lookahead(opt.flag));
    let (result_tx, result_rx) = bounded::<FragResult>(lookahead(opt.flag) * 64);

    std::thread::scope(|scope| {
        // Stage 0: read batches and hand them to the mapping stage.
        let read_handle = scope.spawn(|| -> Result<()> {
            let mut pending: Option<BSeq> = None;
            let mut next_rid: u64 = 0;
            loop {
                let batch = read_batch(source, &mut pending, &mut next_rid, opt.mini_batch_size)?;
                if batch.is_empty() {
                    break;
                }
                if batch_tx.send(batch).is_err() {
                    break;
                }
            }
            drop(batch_tx);
            Ok(())
        });

        // Stage 1: map each batch's fragments across a fixed worker pool,
        // one private TBuf per worker thread (SPEC_FULL.md §5).
        let n_threads = n_threads.max(1);
        for batch in batch_rx.iter() {
            tracing::info_span!("map_batch", n_fragments = batch.len()).in_scope(|| {
                let jobs = Mutex::new(batch.into_iter());
                std::thread::scope(|map_scope| {
                    for _ in 0..n_threads {
                        let jobs = &jobs;
                        let result_tx = result_tx.clone();
                        map_scope.spawn(move || {
                            let mut buf = TBuf::init();
                            loop {
                                let job = {
                                    let mut guard = jobs.lock().unwrap();
                                    guard.next()
                                };
                                let Some(job) = job else { break };
                                let result = map_one(sketcher, index, chainer, opt, &mut buf, &job);
                                let _ = result_tx.send(result);
                            }
                        });
                    }
                });
            });
        }
        drop(result_tx);

        // Stage 2: free/emit in the order fragments complete. The mapping
        // stage does not guarantee completion order across worker threads,
        // so results are buffered and released in ascending `rid` order to
        // honor the deterministic-output-order invariant (SPEC_FULL.md §5).
        let mut pending_results: std::collections::BTreeMap<u64, FragResult> =
            std::collections::BTreeMap::new();
        let mut next_emit: u64 = 0;
        for result in result_rx.iter() {
            pending_results.insert(result.rid, result);
            while let Some(r) = pending_results.remove(&next_emit) {
                emit(r);
                next_emit += 1;
            }
        }
        for (_, r) in pending_results {
            emit(r);
        }

        read_handle.join().expect("read stage panicked")
    })
}

/// `map_file(idx, path, opt) -> all regions, in read order`.
pub fn map_file<S, I, C>(
    source: &mut dyn SeqSource,
    sketcher: &S,
    index: &I,
    chainer: &C,
    opt: &MapOpt,
    n_threads: usize,
) -> Result<Vec<Vec<Region>>>
where
    S: Sketcher + Sync,
    I: Index + Sync,
    C: ChainDp + ChainGen + Sync,
{
    let results = Mutex::new(Vec::new());
    run_pipeline(source, sketcher, index, chainer, opt, n_threads, |r| {
        results.lock().unwrap().push(r.regions.into_iter().next().unwrap_or_default());
    })?;
    Ok(results.into_inner().unwrap())
}

/// `map_file_frag(idx, path, opt) -> all per-fragment region lists, in read order`.
pub fn map_file_frag<S, I, C>(
    source: &mut dyn SeqSource,
    sketcher: &S,
    index: &I,
    chainer: &C,
    opt: &MapOpt,
    n_threads: usize,
) -> Result<Vec<Vec<Vec<Region>>>>
where
    S: Sketcher + Sync,
    I: Index + Sync,
    C: ChainDp + ChainGen + Sync,
{
    let results = Mutex::new(Vec::new());
    run_pipeline(source, sketcher, index, chainer, opt, n_threads, |r| {
        results.lock().unwrap().push(r.regions);
    })?;
    Ok(results.into_inner().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::NaiveChainer;
    use crate::index::InMemoryIndex;
    use crate::minimizer::DefaultSketcher;

    struct VecSource(std::vec::IntoIter<BSeq>);

    impl SeqSource for VecSource {
        fn next_record(&mut self) -> Result<Option<BSeq>> {
            Ok(self.0.next())
        }
    }

    fn bseq(name: &str, seq: &[u8]) -> BSeq {
        BSeq {
            name: name.to_string(),
            seq: seq.to_vec(),
            qual: None,
            comment: None,
        }
    }

    #[test]
    fn pipeline_emits_results_in_rid_order() {
        let mut source = VecSource(
            vec![
                bseq("read1", &vec![b'A'; 60]),
                bseq("read2", &vec![b'C'; 60]),
                bseq("read3", &vec![b'G'; 60]),
            ]
            .into_iter(),
        );
        let sketcher = DefaultSketcher;
        let idx = InMemoryIndex::new(15, 10, false);
        let chainer = NaiveChainer;
        let opt = MapOpt::default();

        let mut seen = Vec::new();
        run_pipeline(&mut source, &sketcher, &idx, &chainer, &opt, 4, |r| {
            seen.push(r.rid);
        })
        .unwrap();

        let mut sorted = seen.clone();
        sorted.sort_unstable();
        assert_eq!(seen, sorted);
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn independ_seg_maps_each_mate_separately() {
        let mut source = VecSource(
            vec![bseq("pair", &vec![b'A'; 40]), bseq("pair", &vec![b'T'; 40])].into_iter(),
        );
        let sketcher = DefaultSketcher;
        let idx = InMemoryIndex::new(15, 10, false);
        let chainer = NaiveChainer;
        let opt = MapOpt::default().with_flag(MapFlags::INDEPEND_SEG);

        let mut out = Vec::new();
        run_pipeline(&mut source, &sketcher, &idx, &chainer, &opt, 1, |r| out.push(r)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].regions.len(), 2);
    }

    #[test]
    fn pe_orientation_reverse_complements_the_marked_mate() {
        let mut records = vec![bseq("p", b"AACCGG"), bseq("p", b"TTGGCC")];
        apply_pe_orientation(&mut records, 0b01);
        assert_eq!(records[0].seq, b"AACCGG");
        assert_eq!(records[1].seq, crate::bseq::revcomp(b"TTGGCC"));
    }

    #[test]
    fn flip_region_reflects_interval_and_inverts_strand() {
        let mut r = Region {
            qs: 10,
            qe: 30,
            rev: false,
            as_: 0,
            cnt: 3,
            score: 42,
            hash: 0,
        };
        flip_region(&mut r, 100);
        assert_eq!(r.qs, 70);
        assert_eq!(r.qe, 90);
        assert!(r.rev);
    }
}
