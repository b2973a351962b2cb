//! The single driver entry point: parse → classify → extract → build
//! CFG → (optionally) run SDFG, for one requested `GraphKind` (grounded
//! on `SDFG.py`'s `DfgRda` orchestrating `CFGDriver` then `rda()`, and
//! `CFG_driver.py`'s `CFGDriver` dispatching on `src_language`).

use crate::classify::Lang;
use crate::errors::{CxError, CxResult};
use crate::extract::{self, ExtractResult};
use crate::graph::ProgramGraph;
use crate::{cfg, sdfg};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphKind {
    /// Just the classified statement list, no control edges (useful for
    /// inspecting C1/C3's output in isolation).
    Ast,
    Cfg,
    /// CFG plus reaching-definitions edges.
    Dfg,
    /// CFG and DFG together in one graph.
    Combined,
}

impl GraphKind {
    pub fn parse(s: &str) -> CxResult<GraphKind> {
        match s.to_ascii_lowercase().as_str() {
            "ast" => Ok(GraphKind::Ast),
            "cfg" => Ok(GraphKind::Cfg),
            "dfg" | "sdfg" => Ok(GraphKind::Dfg),
            "combined" | "all" => Ok(GraphKind::Combined),
            other => Err(CxError::UnknownGraphKind(other.to_string())),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalysisOutput {
    pub lang: String,
    pub kind: String,
    pub node_count: usize,
    pub edge_count: usize,
    #[serde(flatten)]
    pub graph: serde_json::Value,
}

/// Parse `source` as `lang`, build the requested graph view, and return
/// both the graph and a JSON-serializable summary.
pub fn analyze_source(lang: Lang, source: &[u8], kind: GraphKind) -> CxResult<(ProgramGraph, AnalysisOutput)> {
    let tree = parse(lang, source)?;
    let root = crate::syn::Syn::new(tree.root_node(), source);

    info!(lang = lang.as_str(), kind = ?kind, "starting analysis");
    let extracted: ExtractResult = extract::extract(lang, root);

    let graph = match kind {
        GraphKind::Ast => ast_only_graph(&extracted),
        GraphKind::Cfg => build_cfg(lang, &extracted),
        GraphKind::Dfg => dfg_only_graph(lang, &extracted),
        GraphKind::Combined => {
            let mut g = build_cfg(lang, &extracted);
            sdfg::run(&mut g, &extracted);
            g
        }
    };

    let output = AnalysisOutput {
        lang: lang.as_str().to_string(),
        kind: format!("{kind:?}").to_lowercase(),
        node_count: graph.node_count(),
        edge_count: graph.edge_count(),
        graph: graph.to_json(),
    };

    Ok((graph, output))
}

fn build_cfg(lang: Lang, extracted: &ExtractResult) -> ProgramGraph {
    match lang {
        Lang::C => cfg::c::build(extracted),
        Lang::Cpp => cfg::cpp::build(extracted),
    }
}

/// The CFG's node set with its control edges *replaced* by dataflow and
/// interprocedural edges (spec §4.6: the SDFG view has the CFG's nodes
/// but replaces its edges with data-dependency edges) — distinct from
/// `Combined`, which keeps both on the same graph.
fn dfg_only_graph(lang: Lang, extracted: &ExtractResult) -> ProgramGraph {
    let cfg_graph = build_cfg(lang, extracted);
    let mut graph = ProgramGraph::new();
    for node in cfg_graph.nodes() {
        graph.add_node(node.clone());
    }
    for (from, to, kind) in sdfg::compute(&cfg_graph, extracted) {
        if graph.contains(from) && graph.contains(to) {
            graph.add_edge(from, to, kind);
        }
    }
    graph
}

fn ast_only_graph(extracted: &ExtractResult) -> ProgramGraph {
    let mut graph = ProgramGraph::new();
    graph.add_node(crate::graph::GraphNode {
        id: crate::ids::NodeId::START,
        line: 0,
        label: "START".into(),
        kind: "synthetic".into(),
        block: None,
    });
    for (id, syn) in &extracted.nodes {
        graph.add_node(crate::graph::GraphNode {
            id: *id,
            line: syn.line(),
            label: syn.kind().to_string(),
            kind: syn.kind().to_string(),
            block: None,
        });
    }
    graph
}

fn parse(lang: Lang, source: &[u8]) -> CxResult<tree_sitter::Tree> {
    let mut parser = tree_sitter::Parser::new();
    let ts_lang = match lang {
        Lang::C => tree_sitter::Language::from(tree_sitter_c::LANGUAGE),
        Lang::Cpp => tree_sitter::Language::from(tree_sitter_cpp::LANGUAGE),
    };
    parser
        .set_language(&ts_lang)
        .map_err(|_| CxError::UnsupportedLanguage(lang.as_str().to_string()))?;
    parser.parse(source, None).ok_or_else(|| CxError::Parse {
        lang: lang.as_str().to_string(),
        path: "<memory>".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cfg_analysis_of_trivial_c_function_has_start_and_end() {
        let (graph, output) = analyze_source(Lang::C, b"int main() { return 0; }", GraphKind::Cfg).unwrap();
        assert!(graph.node_count() >= 3);
        assert_eq!(output.lang, "c");
    }

    #[test]
    fn dfg_analysis_adds_comes_from_edges() {
        let (graph, _) = analyze_source(Lang::C, b"int f() { int x = 1; return x; }", GraphKind::Dfg).unwrap();
        assert!(graph.edges().any(|e| e.kind == crate::graph::EdgeKind::ComesFrom));
    }

    #[test]
    fn ast_view_has_no_control_edges() {
        let (graph, _) = analyze_source(Lang::C, b"int f() { int x = 1; return x; }", GraphKind::Ast).unwrap();
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn dfg_view_replaces_control_edges_rather_than_keeping_them() {
        let (graph, _) =
            analyze_source(Lang::C, b"int f() { int x = 1; return x; }", GraphKind::Dfg).unwrap();
        assert!(!graph.edges().any(|e| e.kind == crate::graph::EdgeKind::NextLine));
        assert!(graph.edges().any(|e| e.kind == crate::graph::EdgeKind::ComesFrom));
    }

    #[test]
    fn combined_view_keeps_control_edges_alongside_dataflow_edges() {
        let (graph, _) =
            analyze_source(Lang::C, b"int f() { int x = 1; return x; }", GraphKind::Combined).unwrap();
        assert!(graph.edges().any(|e| e.kind == crate::graph::EdgeKind::JumpNext));
        assert!(graph.edges().any(|e| e.kind == crate::graph::EdgeKind::ComesFrom));
    }

    #[test]
    fn graph_kind_parse_accepts_aliases() {
        assert_eq!(GraphKind::parse("sdfg").unwrap(), GraphKind::Dfg);
        assert_eq!(GraphKind::parse("all").unwrap(), GraphKind::Combined);
        assert!(GraphKind::parse("bogus").is_err());
    }
}
