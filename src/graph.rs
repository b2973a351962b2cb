//! C8 — Graph Model: the multi-digraph CFG/SDFG builders emit into, plus
//! its two serialization forms (spec §6). Grounded on `cfg.rs`'s
//! petgraph usage (`StmtKind`/`EdgeKind`/`NodeInfo`) generalized from a
//! single taint-flavoured CFG to the full CFG+SDFG edge vocabulary
//! (edge-kind tags confirmed against `CFG_c.py`'s `add_edge()` call
//! sites: `next_line`, `pos_next`, `neg_next`, `loop_control`,
//! `loop_update`, `switch_case`, `switch_exit`, `case_next`,
//! `jump_next`, `function_call`, `function_return`, …).

use crate::ids::NodeId;
use petgraph::graph::DiGraph;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EdgeKind {
    NextLine,
    FirstNextLine,
    PosNext,
    NegNext,
    LoopControl,
    LoopUpdate,
    SwitchCase,
    SwitchExit,
    CaseNext,
    JumpNext,
    TryNext,
    CatchException,
    TryExit,
    CatchNext,
    CatchExit,
    ThrowExit,
    FunctionCall,
    FunctionReturn,
    MethodCall,
    MethodReturn,
    VirtualCall,
    VirtualReturn,
    StaticCall,
    StaticReturn,
    ConstructorCall,
    ConstructorReturn,
    OperatorCall,
    OperatorReturn,
    DestructorCall,
    DestructorReturn,
    IndirectCall,
    IndirectReturn,
    LambdaInvocation,
    LambdaReturn,
    ScopeExitDestructor,
    DestructorChain,
    ScopeDestructorReturn,
    BaseDestructorCall,
    /// SDFG: the use's reaching-definition edge (spec §5).
    ComesFrom,
    /// SDFG: "this definition kills/overwrites that one" edge.
    LastDef,
    CallToFunction,
    ModificationToUse,
}

impl EdgeKind {
    /// The label used in JSON/DOT output, matching `CFG_c.py`'s
    /// string tags verbatim where one exists.
    pub fn label(self) -> &'static str {
        use EdgeKind::*;
        match self {
            NextLine => "next_line",
            FirstNextLine => "first_next_line",
            PosNext => "pos_next",
            NegNext => "neg_next",
            LoopControl => "loop_control",
            LoopUpdate => "loop_update",
            SwitchCase => "switch_case",
            SwitchExit => "switch_exit",
            CaseNext => "case_next",
            JumpNext => "jump_next",
            TryNext => "try_next",
            CatchException => "catch_exception",
            TryExit => "try_exit",
            CatchNext => "catch_next",
            CatchExit => "catch_exit",
            ThrowExit => "throw_exit",
            FunctionCall => "function_call",
            FunctionReturn => "function_return",
            MethodCall => "method_call",
            MethodReturn => "method_return",
            VirtualCall => "virtual_call",
            VirtualReturn => "virtual_return",
            StaticCall => "static_call",
            StaticReturn => "static_return",
            ConstructorCall => "constructor_call",
            ConstructorReturn => "constructor_return",
            OperatorCall => "operator_call",
            OperatorReturn => "operator_return",
            DestructorCall => "destructor_call",
            DestructorReturn => "destructor_return",
            IndirectCall => "indirect_call",
            IndirectReturn => "indirect_return",
            LambdaInvocation => "lambda_invocation",
            LambdaReturn => "lambda_return",
            ScopeExitDestructor => "scope_exit_destructor",
            DestructorChain => "destructor_chain",
            ScopeDestructorReturn => "scope_destructor_return",
            BaseDestructorCall => "base_destructor_call",
            ComesFrom => "comesFrom",
            LastDef => "lastDef",
            CallToFunction => "callToFunction",
            ModificationToUse => "modificationToUse",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub line: usize,
    pub label: String,
    pub kind: String,
    /// Basic-block id this node was partitioned into by
    /// [`ProgramGraph::set_block`] (`None` until a CFG build runs the
    /// partitioning pass; the `ast`-only view never sets it).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
}

/// Multi-digraph of [`GraphNode`]s joined by typed [`Edge`]s. Backed by
/// `petgraph::graph::DiGraph` (grounded on `cfg.rs`'s `Graph` usage),
/// keyed externally by [`NodeId`] rather than petgraph's own index so
/// callers never have to think about index invalidation on removal.
#[derive(Debug, Default)]
pub struct ProgramGraph {
    inner: DiGraph<GraphNode, EdgeKind>,
    index_of: HashMap<NodeId, NodeIndex>,
    seen_edges: std::collections::HashSet<(NodeId, NodeId, EdgeKind)>,
}

impl ProgramGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        if let Some(ix) = self.index_of.get(&node.id) {
            return *ix;
        }
        let id = node.id;
        let ix = self.inner.add_node(node);
        self.index_of.insert(id, ix);
        ix
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index_of.contains_key(&id)
    }

    /// Add an edge, deduplicating on `(from, to, kind)` (a CFG build can
    /// legitimately attempt to add the same control edge twice, e.g. an
    /// empty loop body's `loop_update` and `next_line` coinciding).
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) {
        if !self.seen_edges.insert((from, to, kind)) {
            return;
        }
        let (a, b) = (self.index_of[&from], self.index_of[&to]);
        self.inner.add_edge(a, b, kind);
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.index_of.get(&id).map(|ix| &self.inner[*ix])
    }

    /// Remove the edge `from -> to` of exactly `kind`, if one exists
    /// (spec §4.4 Phase F step 4: a `noreturn` callee's fallthrough edge
    /// is deleted once a call edge models the real control transfer).
    pub fn remove_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) {
        if !self.seen_edges.remove(&(from, to, kind)) {
            return;
        }
        let (Some(&a), Some(&b)) = (self.index_of.get(&from), self.index_of.get(&to)) else {
            return;
        };
        if let Some(edge_id) = self.inner.edges_connecting(a, b).find(|e| *e.weight() == kind).map(|e| e.id()) {
            self.inner.remove_edge(edge_id);
        }
    }

    /// Tag a node with the basic-block id computed by
    /// `cfg::partition_basic_blocks`. No-op if `id` was never added.
    pub fn set_block(&mut self, id: NodeId, block: u32) {
        if let Some(&ix) = self.index_of.get(&id) {
            self.inner[ix].block = Some(block);
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.inner.node_weights()
    }

    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.inner.edge_references().map(|e| Edge {
            from: self.inner[e.source()].id,
            to: self.inner[e.target()].id,
            kind: *e.weight(),
        })
    }

    pub fn successors(&self, id: NodeId) -> Vec<(NodeId, EdgeKind)> {
        let Some(&ix) = self.index_of.get(&id) else {
            return Vec::new();
        };
        self.inner
            .edges(ix)
            .map(|e| (self.inner[e.target()].id, *e.weight()))
            .collect()
    }

    pub fn predecessors(&self, id: NodeId) -> Vec<(NodeId, EdgeKind)> {
        let Some(&ix) = self.index_of.get(&id) else {
            return Vec::new();
        };
        self.inner
            .edges_directed(ix, petgraph::Direction::Incoming)
            .map(|e| (self.inner[e.source()].id, *e.weight()))
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Node-link JSON form (spec §6): `{"nodes": [...], "links": [...]}`.
    pub fn to_json(&self) -> serde_json::Value {
        let nodes: Vec<_> = self.nodes().cloned().collect();
        let links: Vec<_> = self
            .edges()
            .map(|e| {
                serde_json::json!({
                    "source": e.from.0,
                    "target": e.to.0,
                    "type": e.kind.label(),
                })
            })
            .collect();
        serde_json::json!({ "nodes": nodes, "links": links })
    }

    /// Graphviz DOT form (spec §6).
    pub fn to_dot(&self, name: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "digraph {} {{", dot_escape_id(name));
        for node in self.nodes() {
            let _ = writeln!(
                out,
                "  {} [label=\"{}\"];",
                node.id.0,
                dot_escape_label(&format!("{}: {}", node.line, node.label))
            );
        }
        for edge in self.edges() {
            let _ = writeln!(
                out,
                "  {} -> {} [label=\"{}\"];",
                edge.from.0,
                edge.to.0,
                dot_escape_label(edge.kind.label())
            );
        }
        out.push_str("}\n");
        out
    }
}

fn dot_escape_label(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn dot_escape_id(s: &str) -> String {
    if s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        s.to_string()
    } else {
        format!("\"{}\"", dot_escape_label(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u32, label: &str) -> GraphNode {
        GraphNode {
            id: NodeId(id),
            line: id as usize,
            label: label.into(),
            kind: "stub".into(),
            block: None,
        }
    }

    #[test]
    fn set_block_is_visible_on_the_node_and_skips_json_when_absent() {
        let mut g = ProgramGraph::new();
        g.add_node(node(1, "a"));
        g.add_node(node(2, "b"));
        g.set_block(NodeId(1), 7);

        assert_eq!(g.node(NodeId(1)).unwrap().block, Some(7));
        let v = g.to_json();
        assert!(v["nodes"][0]["block"] == 7);
        assert!(v["nodes"][1].get("block").is_none());
    }

    #[test]
    fn remove_edge_deletes_only_the_matching_kind() {
        let mut g = ProgramGraph::new();
        g.add_node(node(1, "a"));
        g.add_node(node(2, "b"));
        g.add_edge(NodeId(1), NodeId(2), EdgeKind::NextLine);
        g.add_edge(NodeId(1), NodeId(2), EdgeKind::FunctionCall);
        g.remove_edge(NodeId(1), NodeId(2), EdgeKind::NextLine);
        assert_eq!(g.edge_count(), 1);
        assert!(g.edges().any(|e| e.kind == EdgeKind::FunctionCall));
    }

    #[test]
    fn add_edge_deduplicates_identical_edges() {
        let mut g = ProgramGraph::new();
        g.add_node(node(1, "a"));
        g.add_node(node(2, "b"));
        g.add_edge(NodeId(1), NodeId(2), EdgeKind::NextLine);
        g.add_edge(NodeId(1), NodeId(2), EdgeKind::NextLine);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn distinct_edge_kinds_between_same_pair_both_survive() {
        let mut g = ProgramGraph::new();
        g.add_node(node(1, "a"));
        g.add_node(node(2, "b"));
        g.add_edge(NodeId(1), NodeId(2), EdgeKind::NextLine);
        g.add_edge(NodeId(1), NodeId(2), EdgeKind::ComesFrom);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn successors_and_predecessors_agree() {
        let mut g = ProgramGraph::new();
        g.add_node(node(1, "a"));
        g.add_node(node(2, "b"));
        g.add_edge(NodeId(1), NodeId(2), EdgeKind::PosNext);

        assert_eq!(g.successors(NodeId(1)), vec![(NodeId(2), EdgeKind::PosNext)]);
        assert_eq!(g.predecessors(NodeId(2)), vec![(NodeId(1), EdgeKind::PosNext)]);
    }

    #[test]
    fn json_round_trips_node_and_link_shape() {
        let mut g = ProgramGraph::new();
        g.add_node(node(1, "int x;"));
        g.add_node(node(2, "return x;"));
        g.add_edge(NodeId(1), NodeId(2), EdgeKind::NextLine);

        let v = g.to_json();
        assert_eq!(v["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(v["links"][0]["type"], "next_line");
    }

    #[test]
    fn dot_output_escapes_quotes_in_labels() {
        let mut g = ProgramGraph::new();
        g.add_node(node(1, "printf(\"hi\")"));
        let dot = g.to_dot("cfg_main");
        assert!(dot.contains("digraph cfg_main"));
        assert!(dot.contains("\\\"hi\\\""));
    }
}
