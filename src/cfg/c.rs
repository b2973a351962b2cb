//! C4 — CFG Builder (C): C has no virtual dispatch, no RAII teardown,
//! and no exceptions, so the shared structural recursion in `cfg::mod`
//! already covers every construct C supports. This wrapper exists so
//! callers have a `c::build`/`cpp::build` pair that mirrors the
//! language split in the spec (and in `CFG_driver.py`'s
//! `CFGGraph_c`/`CFGGraph_cpp` dispatch).

use crate::classify::Lang;
use crate::extract::ExtractResult;
use crate::graph::ProgramGraph;

pub fn build(extract: &ExtractResult) -> ProgramGraph {
    super::build(Lang::C, extract)
}
