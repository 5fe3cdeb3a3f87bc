//! Seed-collection and fragment-mapping core for a sequence-to-graph aligner.

pub mod anchor;
pub mod arena;
pub mod bseq;
pub mod chain;
pub mod debug;
pub mod error;
pub mod index;
pub mod mapper;
pub mod minimizer;
pub mod opt;
pub mod pipeline;
pub mod seed;
pub mod tbuf;

pub use anchor::{Anchor, AnchorExt};
pub use arena::{Arena, ArenaStats, Lease};
pub use bseq::{BSeq, FastxReader, SeqSource};
pub use chain::{ChainDp, ChainGen, NaiveChainer, Region};
pub use error::{Error, Result};
pub use index::{Index, InMemoryIndex};
pub use mapper::FragmentMapper;
pub use minimizer::{collect_minimizers, DefaultSketcher, Mm128, Sketcher};
pub use opt::{MapFlags, MapOpt, PeOrientation, MG_MAX_SEG};
pub use pipeline::{map_file, map_file_frag, run_pipeline, FragResult};
pub use tbuf::TBuf;
