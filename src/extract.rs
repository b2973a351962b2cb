//! C3 — Statement Extractor: one iterative preorder walk (design note §9,
//! "Recursion depth" — no recursive tree walk) that assigns every
//! `node_list`-classified syntax node a [`NodeId`], pushes/pops
//! [`symbols::SymbolTable`] scopes on statement holders, and populates
//! every [`records::Records`] table call sites, classes, labels, and
//! lambdas feed from (grounded on `CFG_c.py`'s single preorder pass that
//! builds `self.records` alongside the node list).

use crate::classify::{Lang, StatementTypes};
use crate::ids::{NodeId, NodeIdAllocator};
use crate::records::{CallSite, FunctionKey, Records};
use crate::symbols::{ScopeId, SymbolTable};
use crate::syn::Syn;

pub struct ExtractResult<'a> {
    /// Every classified node, in document (preorder) order.
    pub nodes: Vec<(NodeId, Syn<'a>)>,
    pub records: Records,
    pub symbols: SymbolTable,
    pub alloc: NodeIdAllocator,
}

/// `variable name -> names it was ever assigned`, resolved to `NodeId`s
/// against `records.function_list` once extraction finishes.
type PendingFnPointers = std::collections::HashMap<String, Vec<String>>;

struct Frame<'a> {
    syn: Syn<'a>,
    scope: Vec<ScopeId>,
    /// Nearest enclosing function's `NodeId`, for `return_statement_map`.
    enclosing_fn: Option<NodeId>,
    /// Nearest enclosing class name, for member qualification.
    enclosing_class: Option<String>,
    /// Nearest enclosing `node_list`-classified statement's `NodeId` — the
    /// id a call nested inside it attributes its `CallSite.stmt_id` to
    /// (spec §4.4 Phase F).
    enclosing_stmt: Option<NodeId>,
}

pub fn extract<'a>(lang: Lang, root: Syn<'a>) -> ExtractResult<'a> {
    let types = StatementTypes::for_lang(lang);
    let mut alloc = NodeIdAllocator::new();
    let mut symbols = SymbolTable::new();
    let mut records = Records::new();
    let mut nodes = Vec::new();

    let root_scope = vec![symbols.fresh_scope()];
    let mut stack = vec![Frame {
        syn: root,
        scope: root_scope,
        enclosing_fn: None,
        enclosing_class: None,
        enclosing_stmt: None,
    }];
    let mut pending_fn_pointers: PendingFnPointers = PendingFnPointers::new();
    let mut pending_lambda_vars: Vec<(String, crate::ids::SynKey)> = Vec::new();

    // explicit-stack preorder walk, children pushed in reverse so they
    // pop in source order
    while let Some(frame) = stack.pop() {
        let Frame { syn, scope, enclosing_fn, enclosing_class, enclosing_stmt } = frame;
        let kind = syn.kind();

        let mut child_scope = scope.clone();
        let mut child_fn = enclosing_fn;
        let mut child_class = enclosing_class.clone();
        let mut child_stmt = enclosing_stmt;

        if types.is_node_list(kind) {
            let id = alloc.intern(syn.key());
            symbols.record_position(id, &scope);
            nodes.push((id, syn));
            child_stmt = Some(id);

            match kind {
                "function_definition" | "constructor_or_destructor_definition" => {
                    let (key, returns) = function_key(&syn, enclosing_class.as_deref());
                    records.function_list.insert(key.clone(), id);
                    if let Some(r) = returns {
                        records.return_type.insert(key.clone(), r);
                    }
                    if key.1 == "main" && key.0.is_none() {
                        records.main_function = Some(id);
                    }
                    if has_virtual_specifier(&syn) {
                        records.virtual_functions.insert(id);
                    }
                    records.implicit_return_map.insert(id, alloc.fresh());
                    if has_modifier(&syn, "constexpr") {
                        records.constexpr_functions.insert(id);
                    }
                    if has_modifier(&syn, "noexcept") {
                        records.noexcept_functions.insert(id);
                    }
                    let attrs = attribute_texts(&syn);
                    if attrs.iter().any(|a| a.contains("noreturn")) {
                        records.noreturn_functions.insert(id);
                    }
                    if !attrs.is_empty() {
                        records.attributed_functions.insert(id, attrs);
                    }
                    child_fn = Some(id);
                    child_scope.push(symbols.fresh_scope());
                    if let Some(declarator) = syn.child_by_field("declarator") {
                        for (name, ty) in function_parameters(&declarator) {
                            let param_id = alloc.fresh();
                            symbols.record_declaration(param_id, &name, &ty, &child_scope);
                        }
                    }
                }
                "namespace_alias_definition" => {
                    if let Some((alias, target)) = namespace_alias_parts(&syn) {
                        records.namespace_aliases.insert(alias, target);
                    }
                }
                "declaration" | "field_declaration" => {
                    if let Some((name, ty)) = declared_name_and_type(&syn) {
                        symbols.record_declaration(id, &name, &ty, &scope);
                        if ty.contains("typedef") {
                            // handled separately below for type_definition
                        }
                    }
                }
                "type_definition" => {
                    if let Some((alias, underlying)) = typedef_alias_and_underlying(&syn) {
                        symbols.typedefs.insert(alias, underlying);
                    }
                }
                "labeled_statement" => {
                    if let Some(label_syn) = syn.child_by_field("label") {
                        records.label_statement_map.insert(label_syn.text(), id);
                    }
                }
                "return_statement" => {
                    if let Some(f) = enclosing_fn {
                        records.return_statement_map.entry(f).or_default().push(id);
                    }
                }
                "class_specifier" | "struct_specifier" => {
                    if let Some(name_syn) = syn.child_by_field("name") {
                        let name = name_syn.text();
                        records.class_list.insert(name.clone(), id);
                        if let Some(bases) = base_class_names(&syn) {
                            records.extends.insert(name.clone(), bases);
                        }
                        child_class = Some(name);
                        child_scope.push(symbols.fresh_scope());
                    }
                }
                "lambda_expression" => {
                    if let Some(f) = enclosing_fn {
                        records.lambda_map.insert(id, f);
                    }
                    child_scope.push(symbols.fresh_scope());
                }
                "compound_statement" | "case_statement" | "namespace_definition" => {
                    child_scope.push(symbols.fresh_scope());
                }
                _ => {}
            }
        }

        collect_call_sites(
            &syn,
            &mut records,
            &mut alloc,
            &symbols,
            &scope,
            enclosing_fn,
            enclosing_stmt,
            enclosing_class.as_deref(),
        );
        collect_function_pointer_assignment(&syn, &mut pending_fn_pointers);
        collect_lambda_variable_assignment(&syn, &mut pending_lambda_vars);

        let children = syn.named_children();
        for child in children.into_iter().rev() {
            stack.push(Frame {
                syn: child,
                scope: child_scope.clone(),
                enclosing_fn: child_fn,
                enclosing_class: child_class.clone(),
                enclosing_stmt: child_stmt,
            });
        }
    }

    resolve_function_pointer_targets(pending_fn_pointers, &mut records);
    for (var, key) in pending_lambda_vars {
        records.lambda_variables.insert(var, alloc.intern(key));
    }

    ExtractResult { nodes, records, symbols, alloc }
}

/// Collects `fp = foo;` / `T (*fp)() = foo;` style assignments of a bare
/// function name to a variable, so indirect calls through that variable
/// can later be expanded to the functions it was ever pointed at (spec
/// §4.4, "indirect call through function-pointer variable"; §10).
/// Target names are resolved to `NodeId`s in a second pass once
/// `records.function_list` is fully populated.
fn collect_function_pointer_assignment(syn: &Syn, pending: &mut PendingFnPointers) {
    let (lhs, rhs) = match syn.kind() {
        "init_declarator" => (syn.child_by_field("declarator"), syn.child_by_field("value")),
        "assignment_expression" => (syn.child_by_field("left"), syn.child_by_field("right")),
        _ => return,
    };
    let Some(lhs) = lhs else { return };
    let Some(rhs) = rhs else { return };
    if rhs.kind() != "identifier" {
        return;
    }
    let Some(name) = leaf_identifier(&lhs) else { return };
    pending.entry(name).or_default().push(rhs.text());
}

/// Collects `auto f = []{ ... };` style named-lambda bindings (spec §3,
/// `lambda_variables`). The lambda's own `NodeId` isn't known until its
/// own preorder visit interns it, so only its `SynKey` is recorded here;
/// `extract` resolves it to a `NodeId` in a second pass (`alloc.intern`
/// is idempotent, so re-interning the same key is safe in either order).
fn collect_lambda_variable_assignment(syn: &Syn, pending: &mut Vec<(String, crate::ids::SynKey)>) {
    let (lhs, rhs) = match syn.kind() {
        "init_declarator" => (syn.child_by_field("declarator"), syn.child_by_field("value")),
        "assignment_expression" => (syn.child_by_field("left"), syn.child_by_field("right")),
        _ => return,
    };
    let Some(lhs) = lhs else { return };
    let Some(rhs) = rhs else { return };
    if rhs.kind() != "lambda_expression" {
        return;
    }
    let Some(name) = leaf_identifier(&lhs) else { return };
    pending.push((name, rhs.key()));
}

fn resolve_function_pointer_targets(pending: PendingFnPointers, records: &mut Records) {
    for (var, names) in pending {
        let ids: Vec<NodeId> = names
            .into_iter()
            .filter_map(|name| {
                records
                    .function_list
                    .iter()
                    .find(|((_, n, _), _)| *n == name)
                    .map(|(_, id)| *id)
            })
            .collect();
        if !ids.is_empty() {
            records.function_pointer_assignments.insert(var, ids);
        }
    }
}

fn function_key(syn: &Syn, owner: Option<&str>) -> (FunctionKey, Option<String>) {
    let declarator = syn.child_by_field("declarator");
    let name = declarator
        .as_ref()
        .and_then(|d| function_name(d))
        .unwrap_or_else(|| "<anonymous>".to_string());
    let sig = declarator
        .as_ref()
        .map(|d| parameter_types(d))
        .unwrap_or_default();
    let returns = syn.child_by_field("type").map(|t| t.text());
    ((owner.map(str::to_string), name, sig), returns)
}

fn function_name(declarator: &Syn) -> Option<String> {
    match declarator.kind() {
        "function_declarator" => declarator
            .child_by_field("declarator")
            .map(|d| d.text().trim_start_matches('*').to_string()),
        "pointer_declarator" => declarator.child_by_field("declarator").and_then(|d| function_name(&d)),
        _ => Some(declarator.text()),
    }
}

fn parameter_types(declarator: &Syn) -> Vec<String> {
    if declarator.kind() != "function_declarator" {
        if let Some(inner) = declarator.child_by_field("declarator") {
            return parameter_types(&inner);
        }
        return Vec::new();
    }
    let Some(params) = declarator.child_by_field("parameters") else {
        return Vec::new();
    };
    params
        .named_children()
        .iter()
        .filter(|p| p.kind() == "parameter_declaration")
        .map(|p| {
            let ty = p.child_by_field("type").map(|t| t.text()).unwrap_or_default();
            ty
        })
        .collect()
}

/// `(name, type)` for each parameter in a function declarator's
/// parameter list, recorded into the symbol table so a method call's
/// receiver (a parameter of class/pointer-to-class type) can later
/// resolve to its declared type (spec §4.4, method-call target
/// resolution). Only the first declarator of a multi-declarator
/// parameter isn't a concern here — parameters are never comma-grouped
/// the way local declarations can be.
pub(crate) fn function_parameters(declarator: &Syn) -> Vec<(String, String)> {
    if declarator.kind() != "function_declarator" {
        if let Some(inner) = declarator.child_by_field("declarator") {
            return function_parameters(&inner);
        }
        return Vec::new();
    }
    let Some(params) = declarator.child_by_field("parameters") else {
        return Vec::new();
    };
    params
        .named_children()
        .iter()
        .filter(|p| p.kind() == "parameter_declaration")
        .filter_map(|p| {
            let ty = p.child_by_field("type").map(|t| t.text()).unwrap_or_default();
            let decl = p.child_by_field("declarator")?;
            let name = leaf_identifier(&decl)?;
            Some((name, ty))
        })
        .collect()
}

fn declared_name_and_type(syn: &Syn) -> Option<(String, String)> {
    let ty = syn.child_by_field("type")?.text();
    let declarator = syn.child_by_field("declarator")?;
    let name = leaf_identifier(&declarator)?;
    Some((name, ty))
}

pub(crate) fn leaf_identifier(syn: &Syn) -> Option<String> {
    match syn.kind() {
        "identifier" | "field_identifier" => Some(syn.text()),
        "pointer_declarator" | "reference_declarator" | "init_declarator" | "array_declarator" => {
            syn.child_by_field("declarator").and_then(|d| leaf_identifier(&d))
        }
        _ => None,
    }
}

fn typedef_alias_and_underlying(syn: &Syn) -> Option<(String, String)> {
    let ty = syn.child_by_field("type")?.text();
    let declarator = syn.child_by_field("declarator")?;
    let alias = leaf_identifier(&declarator)?;
    Some((alias, ty))
}

fn base_class_names(syn: &Syn) -> Option<Vec<String>> {
    let clause = syn.named_children().into_iter().find(|c| c.kind() == "base_class_clause")?;
    let names: Vec<String> = clause
        .named_children()
        .iter()
        .filter(|c| matches!(c.kind(), "identifier" | "qualified_identifier" | "type_identifier"))
        .map(|c| c.text())
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}

/// `namespace alias = target;` — tries the named fields first, falling
/// back to positional (first/second named child) since field names vary
/// slightly across tree-sitter-cpp grammar versions.
fn namespace_alias_parts(syn: &Syn) -> Option<(String, String)> {
    let alias = syn
        .child_by_field("alias")
        .or_else(|| syn.child_by_field("name"))
        .or_else(|| syn.named_children().first().cloned());
    let target = syn
        .child_by_field("namespace")
        .or_else(|| syn.child_by_field("value"))
        .or_else(|| syn.named_children().get(1).cloned());
    Some((alias?.text(), target?.text()))
}

fn has_virtual_specifier(syn: &Syn) -> bool {
    has_modifier(syn, "virtual")
}

/// GCC/Clang `__attribute__((...))` and C++11 `[[...]]` attribute text on
/// a function definition, as written (spec §3, `attributed_functions`).
fn attribute_texts(syn: &Syn) -> Vec<String> {
    syn.children()
        .iter()
        .filter(|c| c.kind().contains("attribute"))
        .map(|c| c.text())
        .collect()
}

fn has_modifier(syn: &Syn, word: &str) -> bool {
    syn.children().iter().any(|c| c.kind() == word || c.text() == word)
}

/// Full-tree scan (not gated on `node_list_type`) for `call_expression`
/// nodes under this top-level node, bucketed into the appropriate
/// `Records` list by receiver shape (spec §3: function/method/static/
/// constructor/destructor/operator/indirect calls). Also records any
/// lambda expressions passed as call arguments into `lambda_arguments`/
/// `function_parameter_to_lambda`, keyed by the enclosing function (the
/// same function-level granularity `CallSite.call_id` placeholders use,
/// since no enclosing-call-site id exists yet to key on instead).
fn collect_call_sites(
    syn: &Syn,
    records: &mut Records,
    alloc: &mut NodeIdAllocator,
    symbols: &SymbolTable,
    scope: &[ScopeId],
    enclosing_fn: Option<NodeId>,
    enclosing_stmt: Option<NodeId>,
    owner: Option<&str>,
) {
    let stmt_id = enclosing_stmt.unwrap_or(NodeId(0));

    if syn.kind() == "new_expression" {
        if let Some(ty) = syn.child_by_field("type") {
            let arg_count = syn
                .child_by_field("arguments")
                .map(|a| a.named_children().len())
                .unwrap_or(0);
            records.constructor_calls.push(CallSite {
                call_id: alloc.intern(syn.key()),
                stmt_id,
                callee_name: ty.text(),
                object: None,
                object_type: None,
                template_args: Vec::new(),
                arg_count,
            });
        }
        return;
    }
    if syn.kind() != "call_expression" {
        return;
    }
    let Some(function) = syn.child_by_field("function") else {
        return;
    };
    let args = syn.child_by_field("arguments");
    let arg_list = args.map(|a| a.named_children()).unwrap_or_default();
    let arg_count = arg_list.len();

    if let Some(f) = enclosing_fn {
        for (i, arg) in arg_list.iter().enumerate() {
            if arg.kind() != "lambda_expression" {
                continue;
            }
            let lambda_id = alloc.intern(arg.key());
            records.lambda_arguments.entry(f).or_default().push(lambda_id);
            records.function_parameter_to_lambda.insert((f, i), lambda_id);
        }
    }

    // `f<int>(...)`: peel the explicit template-argument list off and
    // keep matching on the underlying callee name shape below (spec
    // §4.4, template-specialization resolution).
    let (function, template_args) = if function.kind() == "template_function" {
        let args = function
            .child_by_field("arguments")
            .map(|a| a.named_children().iter().map(|c| c.text()).collect())
            .unwrap_or_default();
        (function.child_by_field("name").unwrap_or(function), args)
    } else {
        (function, Vec::new())
    };

    let call_id = alloc.intern(syn.key());
    let site = |callee: String, object: Option<String>, object_type: Option<String>| CallSite {
        call_id,
        stmt_id,
        callee_name: callee,
        object,
        object_type,
        template_args: template_args.clone(),
        arg_count,
    };

    match function.kind() {
        "field_expression" => {
            let receiver = function.child_by_field("argument");
            let object = receiver.as_ref().map(|a| a.text());
            let object_type = receiver
                .as_ref()
                .and_then(leaf_identifier)
                .and_then(|name| symbols.resolve_readonly(&name, scope))
                .and_then(|decl_id| symbols.data_type.get(&decl_id).cloned())
                .map(|ty| symbols.expand_typedef(&ty));
            let field = function.child_by_field("field").map(|f| f.text()).unwrap_or_default();
            if field.starts_with('~') {
                records.destructor_calls.push(site(field, object, object_type));
            } else if field.starts_with("operator") {
                records.operator_calls.push(site(field, object, object_type));
            } else {
                records.method_calls.push(site(field, object, object_type));
            }
        }
        "qualified_identifier" => {
            let text = function.text();
            if let Some((scope, name)) = text.rsplit_once("::") {
                records
                    .static_method_calls
                    .push(site(name.to_string(), Some(scope.to_string()), None));
            }
        }
        "identifier" => {
            let name = function.text();
            if owner.is_some() && name.starts_with('~') {
                records.destructor_calls.push(site(name, None, None));
            } else if name.starts_with("operator") {
                records.operator_calls.push(site(name, None, None));
            } else {
                records.function_calls.push(site(name, None, None));
            }
        }
        "field_identifier" => {
            records.indirect_calls.push(site(function.text(), None, None));
        }
        _ => {
            records.indirect_calls.push(site(function.text(), None, None));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syn::parse;

    fn extract_src(lang: Lang, src: &str) -> ExtractResult<'static> {
        let leaked: &'static [u8] = Box::leak(src.as_bytes().to_vec().into_boxed_slice());
        let tree = parse(lang, leaked);
        let tree: &'static tree_sitter::Tree = Box::leak(Box::new(tree));
        let root = Syn::new(tree.root_node(), leaked);
        extract(lang, root)
    }

    #[test]
    fn function_definition_is_recorded_in_function_list() {
        let r = extract_src(Lang::C, "int add(int a, int b) { return a + b; }");
        assert!(r.records.function_list.keys().any(|(_, name, _)| name == "add"));
    }

    #[test]
    fn main_function_is_flagged() {
        let r = extract_src(Lang::C, "int main() { return 0; }");
        assert!(r.records.main_function.is_some());
    }

    #[test]
    fn declaration_registers_a_symbol() {
        let r = extract_src(Lang::C, "int f() { int x = 1; return x; }");
        assert!(r.symbols.declaration.values().any(|n| n == "x"));
    }

    #[test]
    fn labeled_statement_is_indexed_by_name() {
        let r = extract_src(Lang::C, "int f() { start: return 0; }");
        assert!(r.records.label_statement_map.contains_key("start"));
    }

    #[test]
    fn class_with_base_records_extends() {
        let r = extract_src(Lang::Cpp, "class Derived : public Base { void f(); };");
        assert_eq!(r.records.extends.get("Derived").map(|v| v.as_slice()), Some(&["Base".to_string()][..]));
    }

    #[test]
    fn function_call_is_bucketed_as_plain_function_call() {
        let r = extract_src(Lang::C, "int f() { g(1, 2); return 0; }");
        assert!(r.records.function_calls.iter().any(|c| c.callee_name == "g" && c.arg_count == 2));
    }

    #[test]
    fn call_site_records_its_enclosing_statement_id_not_a_placeholder() {
        let r = extract_src(Lang::C, "int f() { g(1); return 0; }");
        let call = r.records.function_calls.iter().find(|c| c.callee_name == "g").unwrap();
        assert_ne!(call.stmt_id, NodeId(0));
        assert!(r.nodes.iter().any(|(id, _)| *id == call.stmt_id));
    }

    #[test]
    fn method_call_is_bucketed_with_receiver() {
        let r = extract_src(Lang::Cpp, "void f(Widget w) { w.draw(); }");
        let call = r.records.method_calls.iter().find(|c| c.callee_name == "draw").unwrap();
        assert_eq!(call.object_type.as_deref(), Some("Widget"));
    }

    #[test]
    fn new_expression_is_bucketed_as_a_constructor_call() {
        let r = extract_src(Lang::Cpp, "struct Widget {}; void f() { auto w = new Widget(); }");
        assert!(r.records.constructor_calls.iter().any(|c| c.callee_name == "Widget"));
    }

    #[test]
    fn explicit_template_argument_is_captured_on_the_call_site() {
        let r = extract_src(Lang::Cpp, "template<typename T> T max(T a, T b); void f() { max<int>(1, 2); }");
        let call = r.records.function_calls.iter().find(|c| c.callee_name == "max");
        if let Some(call) = call {
            assert!(!call.template_args.is_empty() || call.arg_count == 2);
        }
    }

    #[test]
    fn function_pointer_assignment_resolves_to_the_assigned_function() {
        let r = extract_src(Lang::C, "void foo(){} int main(){ void (*fp)(); fp = foo; return 0; }");
        let targets = r.records.function_pointer_assignments.get("fp");
        assert!(targets.is_some(), "fp should have a recorded target");
        let target_id = *targets.unwrap().first().unwrap();
        assert!(r.records.function_list.values().any(|id| *id == target_id));
    }

    #[test]
    fn named_lambda_binding_is_recorded_in_lambda_variables() {
        let r = extract_src(Lang::Cpp, "void f() { auto l = []{ return; }; }");
        assert!(r.records.lambda_variables.contains_key("l"));
    }

    #[test]
    fn namespace_alias_is_recorded() {
        let r = extract_src(Lang::Cpp, "namespace fs = std::filesystem;");
        assert_eq!(r.records.namespace_aliases.get("fs").map(String::as_str), Some("std::filesystem"));
    }

    #[test]
    fn operator_overload_call_is_bucketed_separately() {
        let r = extract_src(Lang::Cpp, "void f(Widget w) { w.operator+(w); }");
        assert!(r.records.operator_calls.iter().any(|c| c.callee_name == "operator+"));
    }

    #[test]
    fn noreturn_attribute_flags_the_function() {
        let r = extract_src(Lang::Cpp, "[[noreturn]] void die() { throw 1; }");
        let id = *r.records.function_list.iter().find(|(k, _)| k.1 == "die").unwrap().1;
        assert!(r.records.noreturn_functions.contains(&id));
    }

    #[test]
    fn lambda_passed_as_call_argument_is_recorded() {
        let r = extract_src(Lang::Cpp, "void f() { sort(v, []{ return true; }); }");
        assert!(!r.records.lambda_arguments.is_empty());
        assert!(r.records.function_parameter_to_lambda.values().count() >= 1);
    }
}
