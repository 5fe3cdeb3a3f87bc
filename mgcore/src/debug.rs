//! `PRINT_SEED` debug channel (SPEC_FULL.md §6): tab-separated `RS`/`SD`/`CN`
//! records, written to a configurable sink instead of a hardcoded
//! `fprintf(stderr, ...)`.

use std::io::Write;

use crate::anchor::AnchorExt;
use crate::index::Index;
use crate::minimizer::Mm128;

pub fn emit_rs(out: &mut dyn Write, rep_len: i32) -> std::io::Result<()> {
    writeln!(out, "RS\t{}", rep_len)
}

pub fn emit_sd(out: &mut dyn Write, idx: &dyn Index, anchors: &[Mm128]) -> std::io::Result<()> {
    for (i, a) in anchors.iter().enumerate() {
        let delta = if i == 0 {
            0
        } else {
            (a.q_end() as i64 - anchors[i - 1].q_end() as i64)
                - (a.x as i64 - anchors[i - 1].x as i64)
        };
        writeln!(
            out,
            "SD\t{}\t{}\t{}\t{}\t{}\t{}",
            idx.seg_name(a.ref_seg_id()),
            a.x as u32,
            if a.is_reverse() { '-' } else { '+' },
            a.q_end(),
            a.span(),
            delta
        )?;
    }
    Ok(())
}

pub fn emit_cn(
    out: &mut dyn Write,
    idx: &dyn Index,
    chain_id: usize,
    anchors: &[Mm128],
) -> std::io::Result<()> {
    for (i, a) in anchors.iter().enumerate() {
        let delta = if i == 0 {
            0
        } else {
            (a.q_end() as i64 - anchors[i - 1].q_end() as i64)
                - (a.x as i64 - anchors[i - 1].x as i64)
        };
        writeln!(
            out,
            "CN\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            chain_id,
            idx.seg_name(a.ref_seg_id()),
            a.x as u32,
            if a.is_reverse() { '-' } else { '+' },
            a.q_end(),
            a.span(),
            delta
        )?;
    }
    Ok(())
}
