//! C7 — SDFG Engine: Reaching Definitions Analysis, a classical forward
//! monotone fixed-point dataflow pass over the CFG (grounded on
//! `taint.rs`'s gen/kill worklist shape, generalized from a single
//! taint lattice to def/use-by-name reaching-definitions sets; see also
//! `SDFG.py`'s `rda()` driver, which this mirrors: build the CFG first,
//! then iterate IN/OUT to a fixed point, then synthesize `comesFrom`
//! edges from the result), plus the interprocedural augmentation spec
//! §4.6 layers on top: pointer-modification analysis and
//! `callToFunction`/`modificationToUse` propagation across a call.
//!
//! `IN[n] = ⋃ OUT[pred]`, `OUT[n] = (IN[n] \ killed_at(n)) ∪ defined_at(n)`.

use crate::extract::{function_parameters, leaf_identifier, ExtractResult};
use crate::graph::{EdgeKind, ProgramGraph};
use crate::ids::NodeId;
use crate::records::Records;
use crate::syn::Syn;
use std::collections::{HashMap, HashSet, VecDeque};

/// `(variable name, defining node)` — one fact in a reaching-definitions set.
type Def = (String, NodeId);

/// Input routines whose body isn't analyzable but whose pointer/buffer
/// arguments are conventionally DEF'd by the call (spec §4.6).
const INPUT_ROUTINES: &[&str] = &["scanf", "fscanf", "sscanf", "fgets", "gets"];

/// Run Reaching Definitions Analysis plus interprocedural augmentation
/// over `graph` and add the resulting edges in place (spec §5/§4.6). A
/// thin wrapper over [`compute`] kept for the existing mutate-in-place
/// call sites (`cfg::analysis`'s `Combined` view, and this module's own
/// unit tests).
pub fn run(graph: &mut ProgramGraph, extract: &ExtractResult) {
    for (from, to, kind) in compute(graph, extract) {
        if graph.contains(from) && graph.contains(to) {
            graph.add_edge(from, to, kind);
        }
    }
}

/// Pure variant of [`run`]: reaching-definitions edges (`comesFrom`/
/// `lastDef`) plus interprocedural edges (`callToFunction`/
/// `modificationToUse`), without mutating `graph`. Lets a caller build a
/// DFG-only view from a fresh node set (spec §4.6: the SDFG view
/// replaces the CFG's edges rather than adding to them).
pub fn compute(graph: &ProgramGraph, extract: &ExtractResult) -> Vec<(NodeId, NodeId, EdgeKind)> {
    let mut edges = reaching_definition_edges(graph, extract);
    edges.extend(interprocedural_edges(graph, extract));
    edges
}

fn reaching_definition_edges(graph: &ProgramGraph, extract: &ExtractResult) -> Vec<(NodeId, NodeId, EdgeKind)> {
    let mut defs_at: HashMap<NodeId, Vec<String>> = HashMap::new();
    let mut uses_at: HashMap<NodeId, Vec<String>> = HashMap::new();
    for (id, syn) in &extract.nodes {
        let (defs, uses) = def_use(syn.kind(), syn);
        if !defs.is_empty() {
            defs_at.insert(*id, defs);
        }
        if !uses.is_empty() {
            uses_at.insert(*id, uses);
        }
    }

    let node_ids: Vec<NodeId> = graph.nodes().map(|n| n.id).collect();
    let mut out: HashMap<NodeId, HashSet<Def>> = node_ids.iter().map(|id| (*id, HashSet::new())).collect();

    // Fixed-point iteration: a pass count bounded by the node count is
    // always enough for a monotone dataflow problem over a finite CFG
    // (reaching definitions has no infinite ascending chains here).
    for _ in 0..=node_ids.len() {
        let mut changed = false;
        for &n in &node_ids {
            let mut in_n: HashSet<Def> = HashSet::new();
            for (pred, _) in graph.predecessors(n) {
                if let Some(pred_out) = out.get(&pred) {
                    in_n.extend(pred_out.iter().cloned());
                }
            }

            let empty = Vec::new();
            let defined_vars = defs_at.get(&n).unwrap_or(&empty);
            let mut new_out: HashSet<Def> = in_n
                .iter()
                .filter(|(var, _)| !defined_vars.contains(var))
                .cloned()
                .collect();
            for var in defined_vars {
                new_out.insert((var.clone(), n));
            }

            if out.get(&n) != Some(&new_out) {
                out.insert(n, new_out);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    // A second IN pass from the converged OUT sets, to synthesize edges.
    let mut in_final: HashMap<NodeId, HashSet<Def>> = HashMap::new();
    for &n in &node_ids {
        let mut in_n = HashSet::new();
        for (pred, _) in graph.predecessors(n) {
            if let Some(pred_out) = out.get(&pred) {
                in_n.extend(pred_out.iter().cloned());
            }
        }
        in_final.insert(n, in_n);
    }

    let mut edges = Vec::new();
    for &n in &node_ids {
        let reaching = &in_final[&n];
        if let Some(uses) = uses_at.get(&n) {
            for var in uses {
                for (def_var, def_node) in reaching {
                    if def_var == var {
                        edges.push((*def_node, n, EdgeKind::ComesFrom));
                    }
                }
            }
        }
        if let Some(defs) = defs_at.get(&n) {
            for var in defs {
                for (def_var, def_node) in reaching {
                    if def_var == var && *def_node != n {
                        edges.push((*def_node, n, EdgeKind::LastDef));
                    }
                }
            }
        }
    }
    edges
}

/// DEF/USE extraction for one statement node. Declarations and plain
/// assignments define their left-hand identifier; everything else that
/// mentions an identifier uses it.
fn def_use(kind: &str, syn: &Syn) -> (Vec<String>, Vec<String>) {
    match kind {
        "declaration" | "field_declaration" => {
            let mut defs = Vec::new();
            let mut uses = Vec::new();
            for child in syn.named_children() {
                match child.kind() {
                    "init_declarator" => {
                        if let Some(d) = child.child_by_field("declarator") {
                            if let Some(name) = leaf_identifier(&d) {
                                defs.push(name);
                            }
                        }
                        if let Some(value) = child.child_by_field("value") {
                            uses.extend(collect_identifiers(&value));
                        }
                    }
                    "identifier" => defs.push(child.text()),
                    _ => {
                        if let Some(name) = leaf_identifier(&child) {
                            defs.push(name);
                        }
                    }
                }
            }
            (defs, uses)
        }
        "expression_statement" => {
            let Some(expr) = syn.named_children().into_iter().next() else {
                return (Vec::new(), Vec::new());
            };
            if expr.kind() == "assignment_expression" {
                let mut defs = Vec::new();
                let mut uses = Vec::new();
                if let Some(left) = expr.child_by_field("left") {
                    if left.kind() == "identifier" {
                        defs.push(left.text());
                    } else {
                        uses.extend(collect_identifiers(&left));
                    }
                }
                if let Some(right) = expr.child_by_field("right") {
                    uses.extend(collect_identifiers(&right));
                }
                return (defs, uses);
            }
            (Vec::new(), collect_identifiers(&expr))
        }
        "return_statement" | "if_statement" | "while_statement" | "switch_statement" | "case_statement"
        | "throw_statement" => (Vec::new(), collect_condition_identifiers(syn)),
        _ => (Vec::new(), Vec::new()),
    }
}

/// `if`/`while`/`switch` only use identifiers in their *condition*, not
/// their body (the body's statements are separate CFG nodes with their
/// own def/use facts).
fn collect_condition_identifiers(syn: &Syn) -> Vec<String> {
    if let Some(cond) = syn.child_by_field("condition") {
        return collect_identifiers(&cond);
    }
    if let Some(value) = syn.child_by_field("value") {
        return collect_identifiers(&value);
    }
    // return_statement / throw_statement: the lone expression child.
    syn.named_children()
        .into_iter()
        .next()
        .map(|c| collect_identifiers(&c))
        .unwrap_or_default()
}

fn collect_identifiers(syn: &Syn) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack = vec![*syn];
    while let Some(s) = stack.pop() {
        if s.kind() == "identifier" {
            out.push(s.text());
        }
        stack.extend(s.named_children());
    }
    out
}

/// Interprocedural augmentation (spec §4.6): bind each free-function call
/// site to its definition (`callToFunction`), then, for a callee whose
/// parameter is modified through the pointer it receives, propagate that
/// modification to the caller's first subsequent use of the
/// corresponding argument variable (`modificationToUse`). Scoped to
/// plain-identifier free-function calls — the common case the spec's
/// pass-by-reference scenario (S5) exercises — rather than every call
/// kind; method/virtual/indirect calls don't carry the same
/// statically-known single-definition binding this needs.
fn interprocedural_edges(graph: &ProgramGraph, extract: &ExtractResult) -> Vec<(NodeId, NodeId, EdgeKind)> {
    let syn_by_id: HashMap<NodeId, Syn> = extract.nodes.iter().map(|(id, syn)| (*id, *syn)).collect();
    let mut modified_cache: HashMap<NodeId, HashSet<String>> = HashMap::new();
    let mut edges = Vec::new();

    for call in &extract.records.function_calls {
        let Some(target) = resolve_free_function(&extract.records, &call.callee_name) else {
            continue;
        };
        if !graph.contains(call.stmt_id) || !graph.contains(target) {
            continue;
        }
        edges.push((call.stmt_id, target, EdgeKind::CallToFunction));

        let modified = modified_cache
            .entry(target)
            .or_insert_with(|| syn_by_id.get(&target).map(modified_pointer_params).unwrap_or_default());
        if modified.is_empty() {
            continue;
        }

        let Some(stmt_syn) = syn_by_id.get(&call.stmt_id) else { continue };
        let Some(call_syn) = find_call_expression(stmt_syn, &call.callee_name) else {
            continue;
        };
        let Some(declarator) = syn_by_id.get(&target).and_then(|s| s.child_by_field("declarator")) else {
            continue;
        };
        let params = function_parameters(&declarator);
        let args = call_syn.child_by_field("arguments").map(|a| a.named_children()).unwrap_or_default();

        for (i, (pname, _)) in params.iter().enumerate() {
            if !modified.contains(pname) {
                continue;
            }
            let Some(arg) = args.get(i) else { continue };
            let Some(var) = address_of_target(arg) else { continue };
            if let Some(use_id) = first_use_after(graph, &syn_by_id, call.stmt_id, &var) {
                edges.push((call.stmt_id, use_id, EdgeKind::ModificationToUse));
            }
        }
    }

    for call in &extract.records.function_calls {
        if !INPUT_ROUTINES.contains(&call.callee_name.as_str()) {
            continue;
        }
        if !graph.contains(call.stmt_id) {
            continue;
        }
        let Some(stmt_syn) = syn_by_id.get(&call.stmt_id) else { continue };
        let Some(call_syn) = find_call_expression(stmt_syn, &call.callee_name) else {
            continue;
        };
        let args = call_syn.child_by_field("arguments").map(|a| a.named_children()).unwrap_or_default();
        for arg in &args {
            let Some(var) = address_of_target(arg) else { continue };
            if let Some(use_id) = first_use_after(graph, &syn_by_id, call.stmt_id, &var) {
                edges.push((call.stmt_id, use_id, EdgeKind::ModificationToUse));
            }
        }
    }

    edges
}

fn resolve_free_function(records: &Records, name: &str) -> Option<NodeId> {
    records
        .function_list
        .iter()
        .find(|((owner, n, _), _)| owner.is_none() && n == name)
        .map(|(_, id)| *id)
}

/// Pointer-typed parameter names a function's body ever writes *through*
/// — `*p = …`, `p[i] = …`, `p->f = …`, `(*p)++` — rather than reassigns
/// itself (spec §4.6, pointer-modification analysis).
fn modified_pointer_params(fn_syn: &Syn) -> HashSet<String> {
    let Some(declarator) = fn_syn.child_by_field("declarator") else {
        return HashSet::new();
    };
    let pointer_params = pointer_parameter_names(&declarator);
    if pointer_params.is_empty() {
        return HashSet::new();
    }
    let Some(body) = fn_syn.child_by_field("body") else {
        return HashSet::new();
    };

    let mut modified = HashSet::new();
    let mut stack = vec![body];
    while let Some(s) = stack.pop() {
        if let Some(name) = written_through_name(&s) {
            if pointer_params.contains(&name) {
                modified.insert(name);
            }
        }
        stack.extend(s.named_children());
    }
    modified
}

/// Names of this declarator's parameters whose own declarator is a
/// `pointer_declarator` — unlike `function_parameters`'s `type` field
/// text, which doesn't carry the pointer star (tree-sitter attaches it
/// to the declarator, not the type), so pointer-ness has to be read off
/// the declarator shape directly.
fn pointer_parameter_names(declarator: &Syn) -> HashSet<String> {
    if declarator.kind() != "function_declarator" {
        return match declarator.child_by_field("declarator") {
            Some(inner) => pointer_parameter_names(&inner),
            None => HashSet::new(),
        };
    }
    let Some(params) = declarator.child_by_field("parameters") else {
        return HashSet::new();
    };
    params
        .named_children()
        .iter()
        .filter(|p| p.kind() == "parameter_declaration")
        .filter_map(|p| {
            let d = p.child_by_field("declarator")?;
            if d.kind() == "pointer_declarator" {
                leaf_identifier(&d)
            } else {
                None
            }
        })
        .collect()
}

fn written_through_name(syn: &Syn) -> Option<String> {
    match syn.kind() {
        "assignment_expression" => {
            let left = syn.child_by_field("left")?;
            dereference_target(&left)
        }
        "update_expression" => {
            let arg = syn.child_by_field("argument")?;
            let arg = if arg.kind() == "parenthesized_expression" {
                arg.named_children().into_iter().next()?
            } else {
                arg
            };
            dereference_target(&arg)
        }
        _ => None,
    }
}

/// The pointer variable name being written *through* by `*p`, `p[i]`, or
/// `p->f`, when `syn` is one of those shapes.
fn dereference_target(syn: &Syn) -> Option<String> {
    match syn.kind() {
        "pointer_expression" if syn.text().trim_start().starts_with('*') => {
            as_identifier(&syn.child_by_field("argument")?)
        }
        "subscript_expression" => as_identifier(&syn.child_by_field("argument")?),
        "field_expression" if syn.text().contains("->") => as_identifier(&syn.child_by_field("argument")?),
        _ => None,
    }
}

fn as_identifier(syn: &Syn) -> Option<String> {
    if syn.kind() == "identifier" {
        Some(syn.text())
    } else {
        None
    }
}

/// The variable ultimately modified when `syn` is passed as an argument
/// binding to a modified pointer parameter: `&x` names `x`; a bare
/// pointer/array identifier names itself (spec §4.6).
fn address_of_target(syn: &Syn) -> Option<String> {
    match syn.kind() {
        "pointer_expression" if syn.text().trim_start().starts_with('&') => {
            as_identifier(&syn.child_by_field("argument")?)
        }
        "identifier" => Some(syn.text()),
        _ => None,
    }
}

fn find_call_expression<'a>(root: &Syn<'a>, callee_name: &str) -> Option<Syn<'a>> {
    let mut stack = vec![*root];
    while let Some(s) = stack.pop() {
        if s.kind() == "call_expression" {
            if let Some(function) = s.child_by_field("function") {
                let function = if function.kind() == "template_function" {
                    function.child_by_field("name").unwrap_or(function)
                } else {
                    function
                };
                if function.kind() == "identifier" && function.text() == callee_name {
                    return Some(s);
                }
            }
        }
        stack.extend(s.named_children());
    }
    None
}

/// Breadth-first search over the CFG's successors from `start` for the
/// first node whose DEF/USE facts use `var` (spec §4.6's
/// `modification_inside_callee -> first_use_after_call` propagation).
fn first_use_after(graph: &ProgramGraph, syn_by_id: &HashMap<NodeId, Syn>, start: NodeId, var: &str) -> Option<NodeId> {
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut queue: VecDeque<NodeId> = graph.successors(start).into_iter().map(|(n, _)| n).collect();
    while let Some(n) = queue.pop_front() {
        if !seen.insert(n) {
            continue;
        }
        if let Some(syn) = syn_by_id.get(&n) {
            let (_, uses) = def_use(syn.kind(), syn);
            if uses.iter().any(|u| u == var) {
                return Some(n);
            }
        }
        for (succ, _) in graph.successors(n) {
            queue.push_back(succ);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg;
    use crate::classify::Lang;
    use crate::extract::extract;
    use crate::syn::parse;

    fn analyze(src: &str) -> ProgramGraph {
        let leaked: &'static [u8] = Box::leak(src.as_bytes().to_vec().into_boxed_slice());
        let tree = parse(Lang::C, leaked);
        let tree: &'static tree_sitter::Tree = Box::leak(Box::new(tree));
        let root = Syn::new(tree.root_node(), leaked);
        let extracted = extract(Lang::C, root);
        let mut graph = cfg::c::build(&extracted);
        run(&mut graph, &extracted);
        graph
    }

    #[test]
    fn use_after_declaration_gets_a_comes_from_edge() {
        let g = analyze("int f() { int x = 1; return x; }");
        assert!(g.edges().any(|e| e.kind == EdgeKind::ComesFrom));
    }

    #[test]
    fn reassignment_kills_the_prior_definition_with_last_def() {
        let g = analyze("int f() { int x = 1; x = 2; return x; }");
        assert!(g.edges().any(|e| e.kind == EdgeKind::LastDef));
    }

    #[test]
    fn unreferenced_declaration_has_no_comes_from_edge_for_it() {
        let g = analyze("int f() { int unused = 1; return 0; }");
        // no use of `unused` anywhere, so nothing should reach it as a use
        let uses_unused = g.edges().filter(|e| e.kind == EdgeKind::ComesFrom).count();
        assert_eq!(uses_unused, 0);
    }

    #[test]
    fn call_to_a_free_function_gets_a_call_to_function_edge() {
        let g = analyze("void inc(int *p) { *p = *p + 1; } int main() { int x = 1; inc(&x); return x; }");
        assert!(g.edges().any(|e| e.kind == EdgeKind::CallToFunction));
    }

    #[test]
    fn modifying_a_pointer_parameter_propagates_to_the_caller_s_next_use() {
        let g = analyze("void inc(int *p) { *p = *p + 1; } int main() { int x = 1; inc(&x); return x; }");
        assert!(g.edges().any(|e| e.kind == EdgeKind::ModificationToUse));
    }

    #[test]
    fn a_callee_that_never_writes_through_its_pointer_gets_no_modification_edge() {
        let g = analyze("int peek(int *p) { return *p; } int main() { int x = 1; peek(&x); return x; }");
        assert!(!g.edges().any(|e| e.kind == EdgeKind::ModificationToUse));
    }

    #[test]
    fn scanf_style_input_routine_is_treated_as_defining_its_pointer_argument() {
        let g = analyze("int main() { int x; scanf(\"%d\", &x); return x; }");
        assert!(g.edges().any(|e| e.kind == EdgeKind::ModificationToUse));
    }
}
