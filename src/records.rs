//! The `records` workspace (spec §3): a dictionary of maps populated during
//! extraction (C3) and consumed during CFG build (C4/C5/C7). Represented
//! as one typed field per row rather than a stringly-keyed map, so each
//! field traces 1:1 back to a key in spec §3's table / a dict entry in
//! `CFG_c.py`/`CFG_cpp.py`'s `self.records = {...}`.

use crate::ids::NodeId;
use std::collections::{HashMap, HashSet};

/// Ordered tuple of parameter type strings, possibly terminated by a
/// trailing `"..."` marker for variadics (spec §4.5/GLOSSARY).
pub type Signature = Vec<String>;

/// `(owner, name, signature)` — `owner` is a class name, namespace, or
/// `None` for free functions (spec §3, `function_list`).
pub type FunctionKey = (Option<String>, String, Signature);

/// One recorded call site: `(call_expression_id, containing_statement_id, …)`
/// per spec §3's per-site list entries.
#[derive(Debug, Clone)]
pub struct CallSite {
    pub call_id: NodeId,
    pub stmt_id: NodeId,
    pub callee_name: String,
    /// The receiver expression's text, for method/static calls (`o.m()`).
    pub object: Option<String>,
    /// The receiver's declared (or narrowed runtime) type, when known.
    pub object_type: Option<String>,
    /// Template argument tuple, when the call site supplies one explicitly.
    pub template_args: Vec<String>,
    pub arg_count: usize,
}

#[derive(Debug, Default)]
pub struct Records {
    pub function_list: HashMap<FunctionKey, NodeId>,
    pub return_type: HashMap<FunctionKey, String>,

    pub function_calls: Vec<CallSite>,
    pub method_calls: Vec<CallSite>,
    pub static_method_calls: Vec<CallSite>,
    pub constructor_calls: Vec<CallSite>,
    pub destructor_calls: Vec<CallSite>,
    pub operator_calls: Vec<CallSite>,
    pub indirect_calls: Vec<CallSite>,

    pub return_statement_map: HashMap<NodeId, Vec<NodeId>>,
    pub implicit_return_map: HashMap<NodeId, NodeId>,

    pub virtual_functions: HashSet<NodeId>,
    pub constexpr_functions: HashSet<NodeId>,
    pub noexcept_functions: HashSet<NodeId>,
    pub noreturn_functions: HashSet<NodeId>,
    pub attributed_functions: HashMap<NodeId, Vec<String>>,

    pub extends: HashMap<String, Vec<String>>,
    pub class_list: HashMap<String, NodeId>,

    pub label_statement_map: HashMap<String, NodeId>,

    pub function_pointer_assignments: HashMap<String, Vec<NodeId>>,

    pub lambda_map: HashMap<NodeId, NodeId>,
    pub lambda_variables: HashMap<String, NodeId>,
    pub lambda_arguments: HashMap<NodeId, Vec<NodeId>>,
    pub function_parameter_to_lambda: HashMap<(NodeId, usize), NodeId>,

    pub namespace_aliases: HashMap<String, String>,

    pub main_function: Option<NodeId>,
}

impl Records {
    pub fn new() -> Self {
        Self::default()
    }

    /// All base classes reachable from `class_name`, transitively, via
    /// `extends`, using an explicit worklist rather than recursion (design
    /// note §9, "Recursion depth").
    pub fn all_bases(&self, class_name: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut worklist: Vec<String> = self
            .extends
            .get(class_name)
            .cloned()
            .unwrap_or_default();
        while let Some(base) = worklist.pop() {
            if seen.insert(base.clone()) {
                out.push(base.clone());
                if let Some(more) = self.extends.get(&base) {
                    worklist.extend(more.iter().cloned());
                }
            }
        }
        out
    }

    /// All classes that (transitively) derive from `base_name`.
    pub fn all_derived(&self, base_name: &str) -> Vec<String> {
        let mut out = Vec::new();
        for (derived, bases) in &self.extends {
            if bases.iter().any(|b| b == base_name) || self.all_bases(derived).iter().any(|b| b == base_name) {
                out.push(derived.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_bases_follows_multi_level_inheritance() {
        let mut r = Records::new();
        r.extends.insert("C".into(), vec!["B".into()]);
        r.extends.insert("B".into(), vec!["A".into()]);

        let mut bases = r.all_bases("C");
        bases.sort();
        assert_eq!(bases, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn all_derived_finds_indirect_descendants() {
        let mut r = Records::new();
        r.extends.insert("D".into(), vec!["B".into()]);
        r.extends.insert("B".into(), vec!["A".into()]);

        let mut derived = r.all_derived("A");
        derived.sort();
        assert_eq!(derived, vec!["B".to_string(), "D".to_string()]);
    }
}
