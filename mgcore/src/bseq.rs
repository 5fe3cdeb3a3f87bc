//! Sequence-I/O collaborator (SPEC_FULL.md §6): consumed, not owned, by the
//! pipeline. Full-format sequence parsing is out of scope per spec.md §1's
//! Non-goals; [`SeqSource`] is the trait the pipeline reads against, and
//! [`FastxReader`] is a minimal reference reader over `noodles-fastq` /
//! `noodles-fasta` so the crate and demo binary are runnable end to end.

use std::io::BufRead;

use crate::error::{Error, Result};

/// One query record as the pipeline sees it: name, sequence, and an
/// optional quality string (absent for FASTA input or under `NO_QUAL`).
#[derive(Debug, Clone)]
pub struct BSeq {
    pub name: String,
    pub seq: Vec<u8>,
    pub qual: Option<Vec<u8>>,
    pub comment: Option<String>,
}

/// The external sequence-source surface consumed by [`crate::pipeline`]:
/// pull the next record, or `None` at end of input. `Send` is required
/// because the pipeline's read stage owns the source on a dedicated
/// thread (SPEC_FULL.md §5: "input streams are owned by the read stage").
pub trait SeqSource: Send {
    fn next_record(&mut self) -> Result<Option<BSeq>>;
}

/// Which of the two formats a [`FastxReader`] is reading.
enum Inner<R> {
    Fastq(noodles_fastq::Reader<R>),
    Fasta(noodles_fasta::Reader<R>),
}

/// A minimal FASTA/FASTQ reference reader, selected by the first byte of
/// the stream (`>` for FASTA, `@` for FASTQ) the way `htslib`/`kseq.h`-style
/// readers do.
pub struct FastxReader<R> {
    inner: Inner<R>,
}

impl<R: BufRead> FastxReader<R> {
    /// Peek the first byte to select FASTA vs FASTQ framing, then build the
    /// matching `noodles` reader over the rest of the stream.
    pub fn new(mut reader: R) -> Result<Self> {
        let first = {
            let buf = reader.fill_buf()?;
            buf.first().copied()
        };
        let inner = match first {
            Some(b'@') => Inner::Fastq(noodles_fastq::Reader::new(reader)),
            Some(b'>') | None => Inner::Fasta(noodles_fasta::Reader::new(reader)),
            Some(other) => {
                return Err(Error::InvalidFragment {
                    reason: format!("unrecognized sequence format, leading byte {:#x}", other),
                })
            }
        };
        Ok(FastxReader { inner })
    }
}

impl<R: BufRead + Send> SeqSource for FastxReader<R> {
    fn next_record(&mut self) -> Result<Option<BSeq>> {
        match &mut self.inner {
            Inner::Fastq(r) => {
                let mut record = noodles_fastq::Record::default();
                let n = r.read_record(&mut record)?;
                if n == 0 {
                    return Ok(None);
                }
                Ok(Some(BSeq {
                    name: String::from_utf8_lossy(record.name()).into_owned(),
                    seq: record.sequence().to_vec(),
                    qual: Some(record.quality_scores().to_vec()),
                    comment: None,
                }))
            }
            Inner::Fasta(r) => {
                let mut record = noodles_fasta::Record::default();
                let n = r.read_record(&mut record)?;
                if n == 0 {
                    return Ok(None);
                }
                Ok(Some(BSeq {
                    name: record.name().to_string(),
                    seq: record.sequence().as_ref().to_vec(),
                    qual: None,
                    comment: record.description().map(|d| d.to_string()),
                }))
            }
        }
    }
}

/// Group consecutive records sharing the same name into one fragment
/// (SPEC_FULL.md §4.8, `FRAG_MODE`): read-pairs and split reads are named
/// identically and expected adjacent in the stream, mirroring the
/// original's `mm_bseq_read_frag` grouping.
pub fn group_fragment(
    source: &mut dyn SeqSource,
    pending: &mut Option<BSeq>,
    max_seg: usize,
) -> Result<Vec<BSeq>> {
    let mut frag = Vec::with_capacity(max_seg);
    let first = match pending.take() {
        Some(r) => r,
        None => match source.next_record()? {
            Some(r) => r,
            None => return Ok(frag),
        },
    };
    let name = first.name.clone();
    frag.push(first);
    while frag.len() < max_seg {
        match source.next_record()? {
            Some(r) if r.name == name => frag.push(r),
            Some(r) => {
                *pending = Some(r);
                break;
            }
            None => break,
        }
    }
    Ok(frag)
}

/// Reverse-complement a DNA sequence in place semantics, returning a new
/// buffer — used by the pipeline's `pe_ori` handling (SPEC_FULL.md §4.8).
pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&b| match b {
            b'A' => b'T',
            b'a' => b't',
            b'C' => b'G',
            b'c' => b'g',
            b'G' => b'C',
            b'g' => b'c',
            b'T' => b'A',
            b't' => b'a',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct VecSource(std::vec::IntoIter<BSeq>);

    impl SeqSource for VecSource {
        fn next_record(&mut self) -> Result<Option<BSeq>> {
            Ok(self.0.next())
        }
    }

    fn bseq(name: &str) -> BSeq {
        BSeq {
            name: name.to_string(),
            seq: b"ACGT".to_vec(),
            qual: None,
            comment: None,
        }
    }

    #[test]
    fn groups_consecutive_same_named_records() {
        let mut source = VecSource(vec![bseq("read1"), bseq("read1"), bseq("read2")].into_iter());
        let mut pending = None;
        let frag = group_fragment(&mut source, &mut pending, 2).unwrap();
        assert_eq!(frag.len(), 2);
        assert!(pending.is_none());
        let frag2 = group_fragment(&mut source, &mut pending, 2).unwrap();
        assert_eq!(frag2.len(), 1);
        assert_eq!(frag2[0].name, "read2");
    }

    #[test]
    fn stops_grouping_at_max_seg_and_stashes_the_rest() {
        let mut source = VecSource(vec![bseq("r"), bseq("r"), bseq("r")].into_iter());
        let mut pending = None;
        let frag = group_fragment(&mut source, &mut pending, 2).unwrap();
        assert_eq!(frag.len(), 2);
        assert!(pending.is_some());
    }

    #[test]
    fn revcomp_mirrors_bases_and_order() {
        assert_eq!(revcomp(b"ACGT"), b"ACGT");
        assert_eq!(revcomp(b"AACG"), b"CGTT");
    }

    #[test]
    fn fastx_reader_selects_format_by_leading_byte() {
        let fastq = b"@r1\nACGT\n+\nIIII\n";
        let reader = FastxReader::new(Cursor::new(&fastq[..])).unwrap();
        assert!(matches!(reader.inner, Inner::Fastq(_)));

        let fasta = b">r1\nACGT\n";
        let reader = FastxReader::new(Cursor::new(&fasta[..])).unwrap();
        assert!(matches!(reader.inner, Inner::Fasta(_)));
    }
}
