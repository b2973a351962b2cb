//! C4/C5 — CFG Builder: structural recursion over the syntax tree that
//! lowers each statement into one or more graph nodes plus a set of
//! dangling exits, which the caller wires to whatever statement follows
//! (grounded on `cfg.rs`'s recursive `build_sub`/`push_node`/
//! `connect_all` trio, generalized from a single taint-flavoured CFG to
//! the full control-flow edge vocabulary confirmed against `CFG_c.py`'s
//! `add_edge()` call sites).
//!
//! C++ adds virtual dispatch, `try`/`catch`, and RAII destructor chains
//! on top of the same structural recursion (`cpp.rs`); C has none of
//! those (`c.rs`).

pub mod c;
pub mod cpp;

use crate::classify::{Lang, StatementTypes};
use crate::extract::ExtractResult;
use crate::graph::{EdgeKind, GraphNode, ProgramGraph};
use crate::ids::NodeId;
use crate::records::Records;
use crate::symbols::SymbolTable;
use crate::syn::Syn;
use crate::typing::{signatures_match, specialization_score, UNKNOWN};
use std::collections::HashMap;

/// A statement's dangling exits: where control goes after it, and under
/// which edge label.
type Exits = Vec<(NodeId, EdgeKind)>;

struct LoopCtx {
    header: NodeId,
}

struct TryCtx {
    /// `(catch type text, catch-clause entry id)`, in source order.
    catch_clauses: Vec<(String, NodeId)>,
}

pub struct CfgBuilder<'a> {
    pub graph: ProgramGraph,
    pub(crate) lang: Lang,
    pub(crate) types: &'static StatementTypes,
    pub(crate) symbols: &'a SymbolTable,
    pub(crate) records: &'a Records,
    by_key: &'a HashMap<(usize, usize), NodeId>,
    loop_stack: Vec<LoopCtx>,
    /// Innermost-first stack of `break` targets — pushed by both loops
    /// and `switch` statements, since `break` exits whichever is
    /// innermost (spec §4.4 Phase E).
    break_stack: Vec<Exits>,
    try_stack: Vec<TryCtx>,
    pending_gotos: Vec<(NodeId, String)>,
    /// Innermost-first stack of each currently-open lexical scope's
    /// local destructor targets (reverse declaration order within each
    /// scope) — consulted by `return_statement` so an early exit chains
    /// through the same teardown a normal fallthrough exit would hit
    /// (spec §4.4 Phase H, invariant 6).
    scope_stack: Vec<Vec<NodeId>>,
}

/// Build the CFG for every `function_definition`/
/// `constructor_or_destructor_definition` found in `extract`, linking
/// them all into one graph rooted at [`NodeId::START`].
pub fn build(lang: Lang, extract: &ExtractResult) -> ProgramGraph {
    let mut by_key = HashMap::new();
    for (id, syn) in &extract.nodes {
        by_key.insert(syn.start_point(), *id);
    }

    let mut builder = CfgBuilder {
        graph: ProgramGraph::new(),
        lang,
        types: StatementTypes::for_lang(lang),
        symbols: &extract.symbols,
        records: &extract.records,
        by_key: &by_key,
        loop_stack: Vec::new(),
        break_stack: Vec::new(),
        try_stack: Vec::new(),
        pending_gotos: Vec::new(),
        scope_stack: Vec::new(),
    };

    builder.graph.add_node(GraphNode {
        id: NodeId::START,
        line: 0,
        label: "START".into(),
        kind: "synthetic".into(),
        block: None,
    });
    builder.graph.add_node(GraphNode {
        id: NodeId::END,
        line: 0,
        label: "END".into(),
        kind: "synthetic".into(),
        block: None,
    });

    for (id, syn) in &extract.nodes {
        if matches!(syn.kind(), "function_definition" | "constructor_or_destructor_definition") {
            builder.build_function(*id, *syn);
        }
    }

    builder.resolve_gotos();
    link_calls(&mut builder.graph, &extract.records);
    link_indirect_calls(&mut builder.graph, &extract.records);
    link_lambda_invocations(&mut builder.graph, extract);
    link_destructor_calls(&mut builder.graph, &extract.records);
    link_constructor_calls(&mut builder.graph, &extract.records);
    link_method_calls(&mut builder.graph, &extract.records);
    link_static_calls(&mut builder.graph, &extract.records);
    link_operator_calls(&mut builder.graph, &extract.records);

    for (id, block) in partition_basic_blocks(&builder.graph) {
        builder.graph.set_block(id, block);
    }

    builder.graph
}

/// Partition the CFG into maximal straight-line basic blocks: a
/// union-find over the node set, merging `a` into `b` whenever a
/// sequential (`NextLine`/`FirstNextLine`) edge is `a`'s only successor
/// and `b`'s only predecessor (ported from the original's
/// weakly-connected straight-line-run grouping, design note §10).
pub fn partition_basic_blocks(graph: &ProgramGraph) -> HashMap<NodeId, u32> {
    let mut parent: HashMap<NodeId, NodeId> = graph.nodes().map(|n| (n.id, n.id)).collect();

    fn find(parent: &mut HashMap<NodeId, NodeId>, x: NodeId) -> NodeId {
        let mut root = x;
        while parent[&root] != root {
            root = parent[&root];
        }
        let mut cur = x;
        while parent[&cur] != root {
            let next = parent[&cur];
            parent.insert(cur, root);
            cur = next;
        }
        root
    }

    for node in graph.nodes() {
        let succs = graph.successors(node.id);
        let sequential: Vec<_> = succs
            .iter()
            .filter(|(_, k)| matches!(k, EdgeKind::NextLine | EdgeKind::FirstNextLine))
            .collect();
        if let [(target, _)] = sequential.as_slice() {
            if graph.predecessors(*target).len() == 1 {
                let (ra, rb) = (find(&mut parent, node.id), find(&mut parent, *target));
                if ra != rb {
                    parent.insert(ra, rb);
                }
            }
        }
    }

    let mut block_ids: HashMap<NodeId, u32> = HashMap::new();
    let mut next_block = 0u32;
    let mut out = HashMap::new();
    for node in graph.nodes() {
        let root = find(&mut parent, node.id);
        let block = *block_ids.entry(root).or_insert_with(|| {
            let id = next_block;
            next_block += 1;
            id
        });
        out.insert(node.id, block);
    }
    out
}

/// A lambda is invoked at the point it's defined and returns to the
/// function that defined it (spec §4.4, lambda invocation). Lambda
/// bodies live inside an expression (not a statement `build_stmt` ever
/// visits), so unlike every other node here the lambda's own graph node
/// is added lazily, right at link time.
fn link_lambda_invocations(graph: &mut ProgramGraph, extract: &ExtractResult) {
    let syn_by_id: HashMap<NodeId, Syn> = extract.nodes.iter().map(|(id, syn)| (*id, *syn)).collect();
    for (&lambda_id, &owner_fn) in &extract.records.lambda_map {
        if !graph.contains(owner_fn) {
            continue;
        }
        if !graph.contains(lambda_id) {
            let Some(syn) = syn_by_id.get(&lambda_id) else { continue };
            graph.add_node(GraphNode {
                id: lambda_id,
                line: syn.line(),
                label: "<lambda>".to_string(),
                kind: "lambda_expression".to_string(),
                block: None,
            });
        }
        graph.add_edge(owner_fn, lambda_id, EdgeKind::LambdaInvocation);
        graph.add_edge(lambda_id, owner_fn, EdgeKind::LambdaReturn);
    }
}

/// Wire one resolved call: `stmt_id -> fn_id` tagged `call_kind`, the
/// matching return edge(s) from every return point of `fn_id` back to
/// `stmt_id` tagged `return_kind` (spec §4.4 Phase F step 2), and —
/// when `fn_id` never returns — delete `stmt_id`'s control-flow
/// fallthrough edge, since it's unreachable once the call edge models
/// the real transfer (Phase F step 4).
fn link_call_site(
    graph: &mut ProgramGraph,
    records: &Records,
    stmt_id: NodeId,
    fn_id: NodeId,
    call_kind: EdgeKind,
    return_kind: EdgeKind,
) {
    if !graph.contains(stmt_id) || !graph.contains(fn_id) {
        return;
    }
    graph.add_edge(stmt_id, fn_id, call_kind);
    add_return_edges(graph, records, fn_id, stmt_id, return_kind);
    remove_fallthrough_if_noreturn(graph, records, stmt_id, fn_id);
}

/// For every return point of `fn_id` — explicit `return` statements and
/// the synthetic implicit-return node for a fallthrough exit — add an
/// edge back to `stmt_id` (spec §4.4 Phase F step 2: "for every return
/// point r, add r -> stmt_id").
pub(crate) fn add_return_edges(
    graph: &mut ProgramGraph,
    records: &Records,
    fn_id: NodeId,
    stmt_id: NodeId,
    kind: EdgeKind,
) {
    if let Some(returns) = records.return_statement_map.get(&fn_id) {
        for &r in returns {
            if graph.contains(r) {
                graph.add_edge(r, stmt_id, kind);
            }
        }
    }
    if let Some(&implicit) = records.implicit_return_map.get(&fn_id) {
        if graph.contains(implicit) {
            graph.add_edge(implicit, stmt_id, kind);
        }
    }
}

pub(crate) fn remove_fallthrough_if_noreturn(graph: &mut ProgramGraph, records: &Records, stmt_id: NodeId, fn_id: NodeId) {
    if !records.noreturn_functions.contains(&fn_id) {
        return;
    }
    for (target, kind) in graph.successors(stmt_id) {
        if matches!(kind, EdgeKind::NextLine | EdgeKind::FirstNextLine) {
            graph.remove_edge(stmt_id, target, kind);
        }
    }
}

/// Explicit destructor calls (`obj.~T()`) resolved by name against
/// `function_list`, from the calling statement — distinct from
/// `cfg::cpp::link_destructor_chains`, which wires the *implicit*
/// base-class teardown chain.
fn link_destructor_calls(graph: &mut ProgramGraph, records: &Records) {
    for call in &records.destructor_calls {
        for ((_, name, _), &target) in &records.function_list {
            if name != &call.callee_name {
                continue;
            }
            link_call_site(graph, records, call.stmt_id, target, EdgeKind::DestructorCall, EdgeKind::DestructorReturn);
        }
    }
}

/// `new T(...)` resolved by type name against `function_list`'s
/// constructor entries, from the calling statement.
fn link_constructor_calls(graph: &mut ProgramGraph, records: &Records) {
    for call in &records.constructor_calls {
        for ((_, name, _), &target) in &records.function_list {
            if name != &call.callee_name {
                continue;
            }
            link_call_site(graph, records, call.stmt_id, target, EdgeKind::ConstructorCall, EdgeKind::ConstructorReturn);
        }
    }
}

/// Indirect calls through a function-pointer variable (spec §4.4,
/// "indirect call through function-pointer variable"): a call site's
/// callee name is only known to name a variable rather than a function
/// once `Records::function_pointer_assignments` is resolved, so both
/// plain-identifier calls (`fp()`, bucketed as `function_calls` since
/// C3 cannot yet tell them apart from a real function name) and the
/// syntactically-indirect ones (`(*fp)()`) are checked here.
fn link_indirect_calls(graph: &mut ProgramGraph, records: &Records) {
    let sites = records.function_calls.iter().chain(records.indirect_calls.iter());
    for call in sites {
        let var = call.callee_name.trim_start_matches('*').trim_matches(|c| c == '(' || c == ')');
        let Some(targets) = records.function_pointer_assignments.get(var) else {
            continue;
        };
        for &target in targets {
            link_call_site(graph, records, call.stmt_id, target, EdgeKind::IndirectCall, EdgeKind::IndirectReturn);
        }
    }
}

/// Member-function calls (`obj.method()`): when the receiver's declared
/// type is known, restrict candidates to its class or one of its bases;
/// virtual methods are left entirely to `cpp::link_virtual_dispatch`'s
/// call-site fan-out so a virtual call doesn't also get this function's
/// single-target edge on top.
fn link_method_calls(graph: &mut ProgramGraph, records: &Records) {
    for call in &records.method_calls {
        let receiver_class = call
            .object_type
            .as_deref()
            .map(|t| t.trim_end_matches('*').trim_end_matches('&').trim());
        for ((owner, name, _), &target) in &records.function_list {
            if name != &call.callee_name || records.virtual_functions.contains(&target) {
                continue;
            }
            if let (Some(owner), Some(receiver_class)) = (owner.as_deref(), receiver_class) {
                if owner != receiver_class && !records.all_bases(receiver_class).iter().any(|b| b == owner) {
                    continue;
                }
            }
            link_call_site(graph, records, call.stmt_id, target, EdgeKind::MethodCall, EdgeKind::MethodReturn);
        }
    }
}

/// Qualified static-method calls (`Scope::fn()`), restricted to the
/// named scope when the call spelled one out.
fn link_static_calls(graph: &mut ProgramGraph, records: &Records) {
    for call in &records.static_method_calls {
        for ((owner, name, _), &target) in &records.function_list {
            if name != &call.callee_name {
                continue;
            }
            if let Some(scope) = call.object.as_deref() {
                if owner.as_deref() != Some(scope) {
                    continue;
                }
            }
            link_call_site(graph, records, call.stmt_id, target, EdgeKind::StaticCall, EdgeKind::StaticReturn);
        }
    }
}

/// Operator-overload calls (`w.operator+(w)`, `operator<<(os, w)`),
/// resolved by name the same way plain function calls are.
fn link_operator_calls(graph: &mut ProgramGraph, records: &Records) {
    for call in &records.operator_calls {
        for ((_, name, _), &target) in &records.function_list {
            if name != &call.callee_name {
                continue;
            }
            link_call_site(graph, records, call.stmt_id, target, EdgeKind::OperatorCall, EdgeKind::OperatorReturn);
        }
    }
}

/// Interprocedural call edges: for each recorded call site whose callee
/// resolves (by name, and by lenient signature match against the
/// argument count) to a free-function `function_list` entry, add a
/// `function_call` edge from the calling statement (spec §4.4 Phase F).
/// When more than one candidate matches — overloads or template
/// specializations of the same name — the most specific signature wins
/// (spec §4.4 target resolution: full specialization=100, partial=50,
/// primary template=0).
fn link_calls(graph: &mut ProgramGraph, records: &Records) {
    for call in &records.function_calls {
        let wildcard_args = vec![UNKNOWN.to_string(); call.arg_count];
        let target = records
            .function_list
            .iter()
            .filter(|((owner, name, params), _)| {
                owner.is_none() && name == &call.callee_name && signatures_match(params, &wildcard_args)
            })
            .max_by_key(|((_, _, params), _)| specialization_score(params))
            .map(|(_, &id)| id);
        if let Some(target) = target {
            link_call_site(graph, records, call.stmt_id, target, EdgeKind::FunctionCall, EdgeKind::FunctionReturn);
        }
    }
}

impl<'a> CfgBuilder<'a> {
    fn node_id(&self, syn: &Syn) -> Option<NodeId> {
        self.by_key.get(&syn.start_point()).copied()
    }

    fn ensure_node(&mut self, id: NodeId, syn: &Syn) {
        if !self.graph.contains(id) {
            self.graph.add_node(GraphNode {
                id,
                line: syn.line(),
                label: summarize(syn),
                kind: syn.kind().to_string(),
                block: None,
            });
        }
    }

    fn connect(&mut self, exits: &Exits, target: NodeId) {
        for (from, kind) in exits {
            self.graph.add_edge(*from, target, *kind);
        }
    }

    fn build_function(&mut self, fn_id: NodeId, syn: Syn<'a>) {
        self.ensure_node(fn_id, &syn);
        self.graph.add_edge(NodeId::START, fn_id, EdgeKind::FirstNextLine);

        let Some(body) = syn.child_by_field("body") else {
            self.graph.add_edge(fn_id, NodeId::END, EdgeKind::NextLine);
            return;
        };

        let (entry, exits) = self.build_scope(body.named_children());
        if let Some(entry) = entry {
            self.graph.add_edge(fn_id, entry, EdgeKind::FirstNextLine);
        } else {
            self.graph.add_edge(fn_id, NodeId::END, EdgeKind::NextLine);
        }

        // `exits` here are fall-through paths that never hit an explicit
        // `return`; an explicit return already wires straight to `END`
        // and isn't part of this set. Route them through a synthetic
        // implicit-return node (spec §10) so the graph makes the
        // distinction visible rather than collapsing both into the same
        // edge into `END`.
        if exits.is_empty() {
            return;
        }
        match self.records.implicit_return_map.get(&fn_id) {
            Some(&implicit_id) => {
                if !self.graph.contains(implicit_id) {
                    self.graph.add_node(GraphNode {
                        id: implicit_id,
                        line: syn.line(),
                        label: "<implicit return>".to_string(),
                        kind: "implicit_return".to_string(),
                        block: None,
                    });
                }
                self.connect(&exits, implicit_id);
                self.graph.add_edge(implicit_id, NodeId::END, EdgeKind::JumpNext);
            }
            None => self.connect(&exits, NodeId::END),
        }
    }

    /// Build a brace-delimited scope: the statement sequence, then (C++
    /// only) RAII teardown of its local variables in reverse declaration
    /// order before the scope's exits continue past it (spec §4.4 Phase
    /// H, invariant 6). Two locals of the same class collapse to that
    /// class's one destructor definition — destructor targets resolve at
    /// function-definition granularity here, not per-instance, so a
    /// second local of the same type chains to the same node the first
    /// already chains to rather than a distinct (and nonexistent) copy.
    fn build_scope(&mut self, stmts: Vec<Syn<'a>>) -> (Option<NodeId>, Exits) {
        if self.lang != Lang::Cpp {
            return self.build_block(stmts);
        }
        let locals = self.scope_local_destructors(&stmts);
        self.scope_stack.push(locals.clone());
        let (entry, exits) = self.build_block(stmts);
        self.scope_stack.pop();

        if exits.is_empty() {
            return (entry, exits);
        }
        let Some((&first_dtor, rest)) = locals.split_first() else {
            return (entry, exits);
        };
        if !self.graph.contains(first_dtor) {
            return (entry, exits);
        }
        for (from, _) in &exits {
            self.graph.add_edge(*from, first_dtor, EdgeKind::ScopeExitDestructor);
        }
        let mut prev = first_dtor;
        for &next_dtor in rest {
            if !self.graph.contains(next_dtor) {
                continue;
            }
            self.graph.add_edge(prev, next_dtor, EdgeKind::DestructorChain);
            prev = next_dtor;
        }
        (entry, vec![(prev, EdgeKind::ScopeDestructorReturn)])
    }

    /// Every currently-open scope's local destructor targets, innermost
    /// scope first, each scope's own locals already in reverse
    /// declaration order — the chain an early `return` tears down on its
    /// way out, same as a normal fallthrough exit would.
    fn active_destructor_chain(&self) -> Vec<NodeId> {
        self.scope_stack.iter().rev().flatten().copied().collect()
    }

    /// Local (by-value, non-pointer, non-reference) variables declared
    /// directly in this scope's statement list whose type has a
    /// destructor, in reverse declaration order. Only the first
    /// declarator of a multi-declarator `declaration` is considered — the
    /// same simplification `extract::declared_name_and_type` already
    /// makes for symbol recording.
    fn scope_local_destructors(&self, stmts: &[Syn<'a>]) -> Vec<NodeId> {
        let mut dtors = Vec::new();
        for stmt in stmts {
            if stmt.kind() != "declaration" {
                continue;
            }
            let Some(ty) = stmt.child_by_field("type").map(|t| t.text()) else {
                continue;
            };
            let Some(declarator) = stmt.child_by_field("declarator") else {
                continue;
            };
            let declarator = if declarator.kind() == "init_declarator" {
                declarator.child_by_field("declarator").unwrap_or(declarator)
            } else {
                declarator
            };
            if matches!(declarator.kind(), "pointer_declarator" | "reference_declarator") {
                continue; // doesn't own the pointee; no teardown here
            }
            if let Some(dtor) = cpp::find_destructor(self.records, ty.trim()) {
                dtors.push(dtor);
            }
        }
        dtors.reverse();
        dtors
    }

    /// Build a sequence of statements, threading `next_line` edges
    /// between them, and return the block's entry id plus dangling exits.
    fn build_block(&mut self, stmts: Vec<Syn<'a>>) -> (Option<NodeId>, Exits) {
        let mut entry = None;
        let mut prev_exits: Exits = Vec::new();
        for stmt in stmts {
            let (stmt_entry, stmt_exits) = self.build_stmt(stmt);
            let Some(stmt_entry) = stmt_entry else { continue };
            if entry.is_none() {
                entry = Some(stmt_entry);
            }
            self.connect(&prev_exits, stmt_entry);
            prev_exits = stmt_exits;
        }
        (entry, prev_exits)
    }

    fn build_stmt(&mut self, syn: Syn<'a>) -> (Option<NodeId>, Exits) {
        let kind = syn.kind();
        if kind == "compound_statement" {
            return self.build_scope(syn.named_children());
        }

        let Some(id) = self.node_id(&syn) else {
            // not a classified node list at all (an expression sub-node
            // wandered in); skip it rather than faking an id.
            return (None, Vec::new());
        };
        self.ensure_node(id, &syn);

        if self.types.is_loop(kind) {
            return self.build_loop(id, syn);
        }

        match kind {
            "if_statement" => self.build_if(id, syn),
            "switch_statement" => self.build_switch(id, syn),
            "case_statement" | "default_statement" => self.build_case(id, syn),
            "break_statement" => {
                self.emit_break(id);
                (Some(id), Vec::new())
            }
            "continue_statement" => {
                if let Some(top) = self.loop_stack.last() {
                    self.graph.add_edge(id, top.header, EdgeKind::LoopControl);
                }
                (Some(id), Vec::new())
            }
            "return_statement" => {
                let chain = if self.lang == Lang::Cpp {
                    self.active_destructor_chain()
                } else {
                    Vec::new()
                };
                match chain.split_first() {
                    Some((&first_dtor, rest)) if self.graph.contains(first_dtor) => {
                        self.graph.add_edge(id, first_dtor, EdgeKind::ScopeExitDestructor);
                        let mut prev = first_dtor;
                        for &next_dtor in rest {
                            if !self.graph.contains(next_dtor) {
                                continue;
                            }
                            self.graph.add_edge(prev, next_dtor, EdgeKind::DestructorChain);
                            prev = next_dtor;
                        }
                        self.graph.add_edge(prev, NodeId::END, EdgeKind::ScopeDestructorReturn);
                    }
                    _ => self.graph.add_edge(id, NodeId::END, EdgeKind::JumpNext),
                }
                (Some(id), Vec::new())
            }
            "goto_statement" => {
                if let Some(label_syn) = syn.named_children().into_iter().next() {
                    self.pending_gotos.push((id, label_syn.text()));
                }
                (Some(id), Vec::new())
            }
            "labeled_statement" => self.build_labeled(id, syn),
            "try_statement" => self.build_try(id, syn),
            "throw_statement" => self.build_throw(id, syn),
            _ => (Some(id), vec![(id, EdgeKind::NextLine)]),
        }
    }

    fn build_if(&mut self, id: NodeId, syn: Syn<'a>) -> (Option<NodeId>, Exits) {
        let mut exits = Vec::new();
        if let Some(cons) = syn.child_by_field("consequence") {
            let (entry, cexits) = self.build_stmt(cons);
            if let Some(entry) = entry {
                self.graph.add_edge(id, entry, EdgeKind::PosNext);
            }
            exits.extend(cexits);
        }
        if let Some(alt) = syn.child_by_field("alternative") {
            let (entry, aexits) = self.build_stmt(alt);
            if let Some(entry) = entry {
                self.graph.add_edge(id, entry, EdgeKind::NegNext);
            }
            exits.extend(aexits);
        } else {
            exits.push((id, EdgeKind::NegNext));
        }
        (Some(id), exits)
    }

    fn build_loop(&mut self, id: NodeId, syn: Syn<'a>) -> (Option<NodeId>, Exits) {
        self.loop_stack.push(LoopCtx { header: id });
        self.break_stack.push(Vec::new());

        let body = syn.child_by_field("body");
        if let Some(body) = body {
            let (entry, bexits) = self.build_stmt(body);
            if let Some(entry) = entry {
                self.graph.add_edge(id, entry, EdgeKind::PosNext);
            }
            for (from, _) in bexits {
                self.graph.add_edge(from, id, EdgeKind::LoopUpdate);
            }
        }

        self.loop_stack.pop();
        let mut exits = self.break_stack.pop().expect("pushed above");
        exits.push((id, EdgeKind::NegNext));
        (Some(id), exits)
    }

    fn emit_break(&mut self, id: NodeId) {
        if let Some(top) = self.break_stack.last_mut() {
            top.push((id, EdgeKind::JumpNext));
        }
    }

    fn build_switch(&mut self, id: NodeId, syn: Syn<'a>) -> (Option<NodeId>, Exits) {
        self.break_stack.push(Vec::new());
        let mut case_exits: Exits = Vec::new();
        if let Some(body) = syn.child_by_field("body") {
            let mut prev_fallthrough: Exits = Vec::new();
            for case in body.named_children() {
                if !matches!(case.kind(), "case_statement") {
                    continue;
                }
                let case_id = self.node_id(&case);
                let Some(case_id) = case_id else { continue };
                self.ensure_node(case_id, &case);
                self.graph.add_edge(id, case_id, EdgeKind::SwitchCase);
                self.connect(&prev_fallthrough, case_id);

                let (_, exits) = self.build_block(case.named_children());
                prev_fallthrough = exits.iter().map(|(n, _)| (*n, EdgeKind::CaseNext)).collect();
                case_exits = exits;
            }
            case_exits.extend(prev_fallthrough);
        }
        let mut exits = case_exits;
        exits.extend(self.break_stack.pop().expect("pushed above"));
        exits.push((id, EdgeKind::SwitchExit));
        (Some(id), exits)
    }

    fn build_case(&mut self, id: NodeId, syn: Syn<'a>) -> (Option<NodeId>, Exits) {
        self.build_block(syn.named_children());
        (Some(id), vec![(id, EdgeKind::CaseNext)])
    }

    fn build_labeled(&mut self, id: NodeId, syn: Syn<'a>) -> (Option<NodeId>, Exits) {
        if let Some(stmt) = syn.child_by_field("statement") {
            let (entry, exits) = self.build_stmt(stmt);
            if let Some(entry) = entry {
                self.graph.add_edge(id, entry, EdgeKind::NextLine);
            }
            return (Some(id), exits);
        }
        (Some(id), vec![(id, EdgeKind::NextLine)])
    }

    fn build_try(&mut self, id: NodeId, syn: Syn<'a>) -> (Option<NodeId>, Exits) {
        self.try_stack.push(TryCtx { catch_clauses: Vec::new() });

        let body = syn.child_by_field("body");
        let (body_entry, body_exits) = match body {
            Some(b) => self.build_scope(b.named_children()),
            None => (None, Vec::new()),
        };
        if let Some(entry) = body_entry {
            self.graph.add_edge(id, entry, EdgeKind::TryNext);
        }

        let mut exits = body_exits;
        for clause in syn.named_children() {
            if clause.kind() != "catch_clause" {
                continue;
            }
            let Some(clause_id) = self.node_id(&clause) else { continue };
            self.ensure_node(clause_id, &clause);
            self.graph.add_edge(id, clause_id, EdgeKind::CatchNext);
            if let Some(ctx) = self.try_stack.last_mut() {
                let ty = clause
                    .child_by_field("parameters")
                    .map(|p| p.text())
                    .unwrap_or_else(|| "...".to_string());
                ctx.catch_clauses.push((ty, clause_id));
            }
            let (cbody_entry, cbody_exits) = match clause.child_by_field("body") {
                Some(b) => self.build_scope(b.named_children()),
                None => (None, Vec::new()),
            };
            if let Some(entry) = cbody_entry {
                self.graph.add_edge(clause_id, entry, EdgeKind::NextLine);
                exits.extend(cbody_exits);
            } else {
                exits.push((clause_id, EdgeKind::CatchExit));
            }
        }
        exits.push((id, EdgeKind::TryExit));
        self.try_stack.pop();
        (Some(id), exits)
    }

    fn build_throw(&mut self, id: NodeId, _syn: Syn<'a>) -> (Option<NodeId>, Exits) {
        if let Some(ctx) = self.try_stack.last() {
            if let Some((_, target)) = ctx.catch_clauses.first() {
                self.graph.add_edge(id, *target, EdgeKind::CatchException);
                return (Some(id), Vec::new());
            }
        }
        self.graph.add_edge(id, NodeId::END, EdgeKind::ThrowExit);
        (Some(id), Vec::new())
    }

    fn resolve_gotos(&mut self) {
        let pending = std::mem::take(&mut self.pending_gotos);
        for (src, label) in pending {
            if let Some(target) = self.records.label_statement_map.get(&label) {
                self.graph.add_edge(src, *target, EdgeKind::JumpNext);
            }
        }
    }
}

fn summarize(syn: &Syn) -> String {
    let text = syn.text();
    let first_line = text.lines().next().unwrap_or("");
    if first_line.len() > 80 {
        format!("{}…", &first_line[..80])
    } else {
        first_line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;
    use crate::graph::EdgeKind;
    use crate::syn::parse;

    fn build_for(lang: Lang, src: &str) -> ProgramGraph {
        let leaked: &'static [u8] = Box::leak(src.as_bytes().to_vec().into_boxed_slice());
        let tree = parse(lang, leaked);
        let tree: &'static tree_sitter::Tree = Box::leak(Box::new(tree));
        let root = Syn::new(tree.root_node(), leaked);
        let extracted = extract(lang, root);
        build(lang, &extracted)
    }

    #[test]
    fn sequential_statements_chain_via_next_line() {
        let g = build_for(Lang::C, "int f() { int x = 1; int y = 2; return x + y; }");
        let has_next_line = g.edges().any(|e| e.kind == EdgeKind::NextLine);
        assert!(has_next_line);
    }

    #[test]
    fn if_without_else_has_a_negative_fallthrough_exit() {
        let g = build_for(Lang::C, "int f(int x) { if (x) { x = 1; } return x; }");
        assert!(g.edges().any(|e| e.kind == EdgeKind::PosNext));
        assert!(g.edges().any(|e| e.kind == EdgeKind::NegNext));
    }

    #[test]
    fn while_loop_has_a_loop_update_back_edge() {
        let g = build_for(Lang::C, "int f(int n) { while (n) { n = n - 1; } return n; }");
        assert!(g.edges().any(|e| e.kind == EdgeKind::LoopUpdate));
    }

    #[test]
    fn break_inside_loop_exits_without_looping_back() {
        let g = build_for(Lang::C, "int f(int n) { while (1) { if (n) { break; } } return n; }");
        assert!(g.edges().any(|e| e.kind == EdgeKind::JumpNext));
    }

    #[test]
    fn return_statement_reaches_the_synthetic_end_node() {
        let g = build_for(Lang::C, "int f() { return 0; }");
        assert!(g
            .edges()
            .any(|e| e.to == NodeId::END && e.kind == EdgeKind::JumpNext));
    }

    #[test]
    fn sequential_statements_share_a_basic_block_but_branch_targets_split() {
        let g = build_for(Lang::C, "int f(int x) { int a = 1; int b = 2; if (x) { x = 1; } return x; }");
        let decls: Vec<_> = g.nodes().filter(|n| n.label.starts_with("int a") || n.label.starts_with("int b")).collect();
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].block, decls[1].block, "two straight-line declarations share a block");

        let if_node = g.nodes().find(|n| n.kind == "if_statement").unwrap();
        let then_node = g.nodes().find(|n| n.label.starts_with("x = 1")).unwrap();
        assert_ne!(if_node.block, then_node.block, "a branch target starts a new block");
    }

    #[test]
    fn falling_off_the_end_routes_through_an_implicit_return_node() {
        let g = build_for(Lang::C, "int f(int x) { if (x) { return 1; } }");
        let implicit = g.nodes().find(|n| n.kind == "implicit_return").expect("implicit return node");
        assert!(g.edges().any(|e| e.from == implicit.id && e.to == NodeId::END && e.kind == EdgeKind::JumpNext));
    }

    #[test]
    fn indirect_call_through_function_pointer_resolves_to_the_assigned_function() {
        let g = build_for(
            Lang::C,
            "void foo(){} int main(){ void (*fp)(); fp = foo; fp(); return 0; }",
        );
        assert!(g.edges().any(|e| e.kind == EdgeKind::IndirectCall));
    }

    #[test]
    fn lambda_expression_gets_invocation_and_return_edges() {
        let g = build_for(Lang::Cpp, "void f() { auto l = []{ return; }; }");
        assert!(g.edges().any(|e| e.kind == EdgeKind::LambdaInvocation));
        assert!(g.edges().any(|e| e.kind == EdgeKind::LambdaReturn));
    }

    #[test]
    fn new_expression_resolves_to_its_constructor_definition() {
        let g = build_for(
            Lang::Cpp,
            "struct Widget { Widget(){} }; void f() { auto w = new Widget(); }",
        );
        assert!(g.edges().any(|e| e.kind == EdgeKind::ConstructorCall));
    }

    #[test]
    fn explicit_destructor_call_resolves_to_its_definition() {
        let g = build_for(
            Lang::Cpp,
            "struct T { ~T(){} }; void f(T t) { t.~T(); }",
        );
        assert!(g.edges().any(|e| e.kind == EdgeKind::DestructorCall));
    }

    #[test]
    fn a_local_falling_out_of_scope_tears_down_via_scope_exit_destructor() {
        let g = build_for(
            Lang::Cpp,
            "struct T { ~T(){} }; void f() { T t; int x = 1; }",
        );
        assert!(g.edges().any(|e| e.kind == EdgeKind::ScopeExitDestructor));
        assert!(g.edges().any(|e| e.kind == EdgeKind::ScopeDestructorReturn));
    }

    #[test]
    fn an_early_return_also_tears_down_the_enclosing_scope_s_locals() {
        let g = build_for(
            Lang::Cpp,
            "struct T { ~T(){} }; void f(int n) { T t; if (n) { return; } }",
        );
        let early_return = g.nodes().find(|n| n.kind == "return_statement").unwrap();
        assert!(g
            .edges()
            .any(|e| e.from == early_return.id && e.kind == EdgeKind::ScopeExitDestructor));
    }

    #[test]
    fn a_scope_with_no_destructible_locals_has_no_teardown_edges() {
        let g = build_for(Lang::Cpp, "void f() { int x = 1; return x; }");
        assert!(!g.edges().any(|e| e.kind == EdgeKind::ScopeExitDestructor));
    }
}
