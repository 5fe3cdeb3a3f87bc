//! The option bundle consumed by the mapping core (SPEC_FULL.md §6).

use bitflags::bitflags;

bitflags! {
    /// Mirrors the original `MG_M_*` bit constants from `map.c`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MapFlags: u32 {
        const FOR_ONLY      = 1 << 0;
        const REV_ONLY      = 1 << 1;
        const HEAP_SORT     = 1 << 2;
        const SPLICE        = 1 << 3;
        const SR            = 1 << 4;
        const INDEPEND_SEG  = 1 << 5;
        const FRAG_MODE     = 1 << 6;
        const NO_QUAL       = 1 << 7;
        const COPY_COMMENT  = 1 << 8;
        const TWO_IO_THREADS = 1 << 9;
        const PRINT_SEED    = 1 << 10;
    }
}

/// Per-mate orientation for paired input, packed as two bits the way the
/// original packs `pe_ori` (`pe_ori>>1&1` selects mate 0, `pe_ori&1` mate 1).
pub type PeOrientation = u8;

/// Maximum number of segments that may be mapped jointly as one fragment.
pub const MG_MAX_SEG: usize = 2;

/// Bundle of tunables recognized by the core, matching SPEC_FULL.md §6.
#[derive(Debug, Clone)]
pub struct MapOpt {
    pub flag: MapFlags,
    pub mid_occ: i32,
    pub max_occ: i32,
    pub max_qlen: i32,
    pub max_gap: i32,
    pub max_gap_ref: i32,
    pub max_frag_len: i32,
    pub bw: i32,
    pub max_chain_skip: i32,
    pub min_lc_cnt: i32,
    pub min_lc_score: i32,
    pub mini_batch_size: i64,
    pub pe_ori: PeOrientation,
    pub seed: u32,
}

impl Default for MapOpt {
    fn default() -> Self {
        Self {
            flag: MapFlags::empty(),
            mid_occ: 50,
            max_occ: 500,
            max_qlen: 0,
            max_gap: 5000,
            max_gap_ref: 0,
            max_frag_len: 0,
            bw: 500,
            max_chain_skip: 25,
            min_lc_cnt: 2,
            min_lc_score: 40,
            mini_batch_size: 500_000_000,
            pe_ori: 0,
            seed: 11,
        }
    }
}

impl MapOpt {
    pub fn with_flag(mut self, flag: MapFlags) -> Self {
        self.flag |= flag;
        self
    }
}
