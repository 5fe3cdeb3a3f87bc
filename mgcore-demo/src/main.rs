//! Thin demo binary driving `mgcore`'s fragment-mapping pipeline over a
//! FASTQ/FASTA file against an in-memory index built from a reference
//! FASTA. A real CLI argument parser is out of scope (spec.md §1
//! Non-goals); this takes two positional paths.

use std::fs::File;
use std::io::BufReader;

use anyhow::{bail, Context, Result};
use mgcore::{
    map_file_frag, DefaultSketcher, FastxReader, InMemoryIndex, MapOpt, NaiveChainer, Sketcher,
};

fn build_index(ref_path: &str, k: usize, w: usize) -> Result<InMemoryIndex> {
    let file = File::open(ref_path).with_context(|| format!("opening reference {ref_path}"))?;
    let mut reader = noodles_fasta::Reader::new(BufReader::new(file));
    let mut idx = InMemoryIndex::new(k, w, false);
    let sketcher = DefaultSketcher;

    loop {
        let mut record = noodles_fasta::Record::default();
        if reader.read_record(&mut record)? == 0 {
            break;
        }
        let seg_id = idx.add_segment(record.name().to_string());
        let seq = record.sequence().as_ref();
        let mut mv = Vec::new();
        sketcher.sketch(seq, w, k, 0, false, &mut mv);
        for m in &mv {
            let q_end = (m.y & 0xffff_ffff) as u32 >> 1;
            let strand = (m.y & 1) as u8;
            let span = (m.x & 0xff) as u32;
            let pos = q_end.saturating_sub(span);
            idx.insert(m.x >> 8, seg_id, pos, strand);
        }
    }
    Ok(idx)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        bail!("usage: {} <reference.fasta> <queries.fastq>", args[0]);
    }
    let ref_path = &args[1];
    let query_path = &args[2];

    let index = build_index(ref_path, 15, 10)?;
    let sketcher = DefaultSketcher;
    let chainer = NaiveChainer;
    let opt = MapOpt::default();

    let file = File::open(query_path).with_context(|| format!("opening queries {query_path}"))?;
    let mut source = FastxReader::new(BufReader::new(file))?;

    let n_threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    let frags = map_file_frag(&mut source, &sketcher, &index, &chainer, &opt, n_threads)?;

    let mut n_mapped = 0usize;
    for regions in &frags {
        for segment in regions {
            n_mapped += segment.len();
        }
    }
    tracing::info!(n_fragments = frags.len(), n_regions = n_mapped, "mapping complete");

    Ok(())
}
