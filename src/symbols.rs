//! C2 — Symbol & Scope Table: a preorder walk that pushes a fresh scope id
//! on block entry and pops on exit, assigning every leaf token the current
//! scope stack (spec §3/§4.2). Use-site resolution follows the
//! **longest-scope-match rule**: among all declarations whose scope stack
//! is a prefix of the use's stack, pick the one with the deepest stack.

use crate::ids::NodeId;
use std::collections::HashMap;

pub type ScopeId = u32;

#[derive(Debug, Clone)]
struct Declaration {
    scope_stack: Vec<ScopeId>,
    decl_id: NodeId,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    pub scope_map: HashMap<NodeId, Vec<ScopeId>>,
    pub data_type: HashMap<NodeId, String>,
    pub declaration: HashMap<NodeId, String>,
    pub declaration_map: HashMap<NodeId, NodeId>,

    /// `typedef` name → expansion (preserving pointer stars, §4.2).
    pub typedefs: HashMap<String, String>,
    /// `(struct_name, field_name)` → field type, for `p.x`/`p->x` (§4.2).
    pub struct_fields: HashMap<(String, String), String>,

    decls_by_name: HashMap<String, Vec<Declaration>>,
    next_scope: ScopeId,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            next_scope: 1,
            ..Default::default()
        }
    }

    pub fn fresh_scope(&mut self) -> ScopeId {
        let id = self.next_scope;
        self.next_scope += 1;
        id
    }

    /// Record `node`'s current scope stack. Call once per node visited.
    pub fn record_position(&mut self, node: NodeId, scope_stack: &[ScopeId]) {
        self.scope_map.insert(node, scope_stack.to_vec());
    }

    /// Record that `node` declares `name` with `ty` at `scope_stack`.
    pub fn record_declaration(
        &mut self,
        node: NodeId,
        name: &str,
        ty: &str,
        scope_stack: &[ScopeId],
    ) {
        self.declaration.insert(node, name.to_string());
        self.data_type.insert(node, ty.to_string());
        self.decls_by_name
            .entry(name.to_string())
            .or_default()
            .push(Declaration {
                scope_stack: scope_stack.to_vec(),
                decl_id: node,
            });
    }

    /// Resolve a use of `name` at `use_scope_stack` to the declaration
    /// whose scope stack is the deepest prefix of it, recording the
    /// resolution in `declaration_map` when `use_id` is given.
    pub fn resolve(&mut self, use_id: Option<NodeId>, name: &str, use_scope_stack: &[ScopeId]) -> Option<NodeId> {
        let candidates = self.decls_by_name.get(name)?;
        let best = candidates
            .iter()
            .filter(|d| is_prefix(&d.scope_stack, use_scope_stack))
            .max_by_key(|d| d.scope_stack.len())
            .map(|d| d.decl_id);

        if let (Some(use_id), Some(decl_id)) = (use_id, best) {
            self.declaration_map.insert(use_id, decl_id);
        }
        best
    }

    /// Like [`resolve`](Self::resolve) but never mutates `declaration_map` —
    /// for speculative type lookups (e.g. narrowing a method call's
    /// receiver to its declared type) that shouldn't be confused with a
    /// real use-site resolution.
    pub fn resolve_readonly(&self, name: &str, use_scope_stack: &[ScopeId]) -> Option<NodeId> {
        let candidates = self.decls_by_name.get(name)?;
        candidates
            .iter()
            .filter(|d| is_prefix(&d.scope_stack, use_scope_stack))
            .max_by_key(|d| d.scope_stack.len())
            .map(|d| d.decl_id)
    }

    /// `expand_typedef(T)`: recurse through the typedef chain, preserving
    /// any pointer stars accumulated along the way (§4.2).
    pub fn expand_typedef(&self, ty: &str) -> String {
        let trimmed = ty.trim();
        let stars: String = trimmed.chars().rev().take_while(|c| *c == '*').collect();
        let base = trimmed.trim_end_matches('*').trim();

        let mut seen = std::collections::HashSet::new();
        let mut current = base.to_string();
        while let Some(expansion) = self.typedefs.get(&current) {
            if !seen.insert(current.clone()) {
                break; // cyclic typedef, bail out with what we have
            }
            current = expansion.clone();
        }
        format!("{current}{stars}")
    }

    /// Resolve `p.x`/`p->x` to a concrete field type when `p`'s type is
    /// known (§4.2).
    pub fn field_type(&self, receiver_type: &str, field: &str) -> Option<String> {
        let base = self.expand_typedef(receiver_type);
        let base = base.trim_end_matches('*').trim();
        self.struct_fields.get(&(base.to_string(), field.to_string())).cloned()
    }
}

fn is_prefix(prefix: &[ScopeId], whole: &[ScopeId]) -> bool {
    prefix.len() <= whole.len() && prefix.iter().zip(whole.iter()).all(|(a, b)| a == b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_scope_match_prefers_deepest_prefix() {
        let mut st = SymbolTable::new();
        st.record_declaration(NodeId(10), "x", "int", &[1]);
        st.record_declaration(NodeId(11), "x", "int", &[1, 2]);

        let resolved = st.resolve(None, "x", &[1, 2, 3]);
        assert_eq!(resolved, Some(NodeId(11)));
    }

    #[test]
    fn declaration_outside_prefix_is_not_a_candidate() {
        let mut st = SymbolTable::new();
        st.record_declaration(NodeId(10), "x", "int", &[1, 5]);

        // use's scope stack [1, 2] does not have [1, 5] as a prefix
        let resolved = st.resolve(None, "x", &[1, 2]);
        assert_eq!(resolved, None);
    }

    #[test]
    fn resolve_readonly_finds_a_match_without_recording_it() {
        let mut st = SymbolTable::new();
        st.record_declaration(NodeId(10), "p", "Widget", &[1]);

        let resolved = st.resolve_readonly("p", &[1, 2]);
        assert_eq!(resolved, Some(NodeId(10)));
        assert!(st.declaration_map.is_empty());
    }

    #[test]
    fn expand_typedef_preserves_pointer_stars() {
        let mut st = SymbolTable::new();
        st.typedefs.insert("u32".into(), "unsigned int".into());
        assert_eq!(st.expand_typedef("u32**"), "unsigned int**");
        assert_eq!(st.expand_typedef("u32"), "unsigned int");
    }

    #[test]
    fn expand_typedef_handles_cycles_without_looping_forever() {
        let mut st = SymbolTable::new();
        st.typedefs.insert("A".into(), "B".into());
        st.typedefs.insert("B".into(), "A".into());
        // must terminate
        let _ = st.expand_typedef("A");
    }

    #[test]
    fn field_type_resolves_through_pointer_and_typedef() {
        let mut st = SymbolTable::new();
        st.typedefs.insert("Point_t".into(), "Point".into());
        st.struct_fields.insert(("Point".into(), "x".into()), "int".into());

        assert_eq!(st.field_type("Point_t*", "x").as_deref(), Some("int"));
    }
}
