//! C5 — CFG Builder (C++): the shared structural recursion plus the
//! object-oriented semantics the spec calls out specifically — virtual
//! dispatch fan-out and RAII destructor chaining. Template
//! instantiation, constructor delegation, and lambda capture are
//! resolved earlier, in `extract`/`typing`; this module only adds the
//! control-flow edges that are unique to C++'s object model.

use crate::classify::Lang;
use crate::extract::ExtractResult;
use crate::graph::{EdgeKind, ProgramGraph};
use crate::ids::NodeId;
use crate::records::{FunctionKey, Records};
use crate::typing::signatures_match;

pub fn build(extract: &ExtractResult) -> ProgramGraph {
    let mut graph = super::build(Lang::Cpp, extract);
    link_virtual_dispatch(&mut graph, &extract.records);
    link_destructor_chains(&mut graph, &extract.records);
    graph
}

/// A call through a pointer/reference statically typed as a class with
/// virtual methods may dispatch to any override reachable from that
/// receiver's class, fanned out from the *call site* itself — not from
/// the virtual method's own definition regardless of whether it's ever
/// invoked (spec S3/§8 rule 5: exactly `k` edges for `k` overrides
/// reachable from that specific call).
fn link_virtual_dispatch(graph: &mut ProgramGraph, records: &Records) {
    for call in &records.method_calls {
        let Some(receiver_type) = call.object_type.as_deref() else { continue };
        let base = receiver_type.trim_end_matches('*').trim_end_matches('&').trim();

        let Some(base_target) = find_method(records, base, &call.callee_name) else {
            continue;
        };
        if !records.virtual_functions.contains(&base_target) {
            continue;
        }
        if !graph.contains(call.stmt_id) {
            continue;
        }

        let Some((_, _, params)) = key_for_id(records, base_target) else {
            continue;
        };
        if graph.contains(base_target) {
            graph.add_edge(call.stmt_id, base_target, EdgeKind::VirtualCall);
            super::add_return_edges(graph, records, base_target, call.stmt_id, EdgeKind::VirtualReturn);
        }
        for derived in records.all_derived(base) {
            let Some(override_id) = find_override(records, &derived, &call.callee_name, &params) else {
                continue;
            };
            if !graph.contains(override_id) {
                continue;
            }
            graph.add_edge(call.stmt_id, override_id, EdgeKind::VirtualCall);
            super::add_return_edges(graph, records, override_id, call.stmt_id, EdgeKind::VirtualReturn);
        }
    }
}

fn find_method(records: &Records, owner: &str, name: &str) -> Option<NodeId> {
    records
        .function_list
        .iter()
        .find(|((o, n, _), _)| o.as_deref() == Some(owner) && n == name)
        .map(|(_, id)| *id)
}

fn key_for_id(records: &Records, id: NodeId) -> Option<FunctionKey> {
    records
        .function_list
        .iter()
        .find(|(_, v)| **v == id)
        .map(|(k, _)| k.clone())
}

fn find_override(records: &Records, class: &str, name: &str, params: &[String]) -> Option<NodeId> {
    records
        .function_list
        .iter()
        .find(|((owner, n, p), _)| owner.as_deref() == Some(class) && n == name && signatures_match(p, params))
        .map(|(_, id)| *id)
}

/// At teardown, a derived class's destructor runs its own body then
/// chains into each direct base's destructor, in reverse construction
/// order (spec §4, RAII). With single inheritance (the common case)
/// "reverse order" is just "the one base"; with multiple bases we chain
/// them in the order `extends` records them, reversed.
fn link_destructor_chains(graph: &mut ProgramGraph, records: &Records) {
    for (class, bases) in &records.extends {
        let Some(dtor_id) = find_destructor(records, class) else {
            continue;
        };
        for base in bases.iter().rev() {
            if let Some(base_dtor) = find_destructor(records, base) {
                graph.add_edge(dtor_id, base_dtor, EdgeKind::BaseDestructorCall);
                graph.add_edge(base_dtor, dtor_id, EdgeKind::ScopeDestructorReturn);
            }
        }
    }
}

pub(crate) fn find_destructor(records: &Records, class: &str) -> Option<NodeId> {
    records
        .function_list
        .iter()
        .find(|((owner, name, _), _)| owner.as_deref() == Some(class) && name.starts_with('~'))
        .map(|(_, id)| *id)
}
