//! `cxgraph` builds AST/CFG/SDFG program-graph views for C and C++ source.
//!
//! The pipeline is: tree-sitter parse → [`classify`] statement kinds →
//! [`extract`] statement nodes + [`records::Records`] → [`symbols`] scope
//! table → [`cfg`] control-flow graph → [`sdfg`] reaching-definitions
//! data-flow graph. [`graph`] holds the shared multi-digraph model and
//! [`analysis`] is the single entry point gluing the phases together.

pub mod analysis;
pub mod cfg;
pub mod classify;
pub mod config;
pub mod errors;
pub mod extract;
pub mod graph;
pub mod ids;
pub mod preproc;
pub mod records;
pub mod sdfg;
pub mod symbols;
pub mod syn;
pub mod typing;

pub use analysis::{AnalysisOutput, GraphKind, analyze_source};
pub use errors::{CxError, CxResult};
