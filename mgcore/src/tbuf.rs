//! Opaque per-thread mapping buffer (SPEC_FULL.md §6): `TBuf::{init, destroy, get_arena}`.

use crate::arena::Arena;

/// Holds the worker's scratch arena plus the last call's `rep_len`/`frag_gap`,
/// mirroring `mg_tbuf_t`. There is no explicit `destroy` step needed in Rust
/// (the arena is dropped along with the buffer), but the method is kept to
/// match the external surface named in SPEC_FULL.md §6.
#[derive(Debug)]
pub struct TBuf {
    arena: Arena,
    pub rep_len: i32,
    pub frag_gap: i32,
}

impl TBuf {
    pub fn init() -> Self {
        TBuf {
            arena: Arena::new(),
            rep_len: 0,
            frag_gap: 0,
        }
    }

    pub fn destroy(self) {
        // Arena is dropped with `self`; kept as an explicit method for
        // parity with the original's `mg_tbuf_destroy`.
        drop(self);
    }

    pub fn get_arena(&self) -> &Arena {
        &self.arena
    }

    pub fn get_arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }
}

impl Default for TBuf {
    fn default() -> Self {
        Self::init()
    }
}
