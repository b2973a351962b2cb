//! C6 — Argument/Signature Typing: resolves a call site's argument types
//! and matches them against candidate `function_list` signatures under
//! the **lenient matching policy** (spec §4.5): exact match, `unknown`
//! wildcard, template-parameter wildcard, reference binding (`T&`/
//! `const T&`), `const char*` string binding, and variadics.

use crate::records::Signature;
use crate::symbols::SymbolTable;

/// Placeholder used for an argument whose type could not be determined
/// (spec §4.5, "unknown wildcard" — matches anything).
pub const UNKNOWN: &str = "unknown";

/// `get_argument_type`: resolve one call argument's textual type.
///
/// `expr_type` is whatever the caller already determined syntactically
/// (a literal's apparent type, an identifier's declared type via
/// `symbols`, or `None` when the expression shape isn't handled).
pub fn get_argument_type(symbols: &SymbolTable, expr_text: &str, expr_type: Option<&str>) -> String {
    if let Some(t) = expr_type {
        return symbols.expand_typedef(t);
    }
    if expr_text.starts_with('"') {
        return "const char*".to_string();
    }
    if expr_text.starts_with('\'') {
        return "char".to_string();
    }
    if expr_text.parse::<i64>().is_ok() {
        return "int".to_string();
    }
    if expr_text.parse::<f64>().is_ok() {
        return "double".to_string();
    }
    UNKNOWN.to_string()
}

/// True when `args` can bind to `params` under the lenient policy. A
/// trailing `"..."` in `params` accepts any remaining argument count.
pub fn signatures_match(params: &Signature, args: &Signature) -> bool {
    let variadic = params.last().map(|p| p == "...").unwrap_or(false);
    let fixed = if variadic { &params[..params.len() - 1] } else { &params[..] };

    if variadic {
        if args.len() < fixed.len() {
            return false;
        }
    } else if args.len() != fixed.len() {
        return false;
    }

    fixed.iter().zip(args.iter()).all(|(p, a)| type_binds(p, a))
}

/// Does an argument of type `arg` bind to a parameter declared `param`?
fn type_binds(param: &str, arg: &str) -> bool {
    if param == UNKNOWN || arg == UNKNOWN {
        return true;
    }
    if is_template_param(param) {
        return true;
    }
    if normalize(param) == normalize(arg) {
        return true;
    }
    if let Some(referent) = reference_referent(param) {
        return normalize(referent) == normalize(arg) || is_template_param(referent);
    }
    // `const char*` binds a string literal or any char-pointer type.
    if normalize(param) == "const char*" && normalize(arg).ends_with("char*") {
        return true;
    }
    false
}

/// A bare uppercase single-token name (`T`, `U`, `Key`) conventionally
/// stands for a template parameter rather than a concrete type (spec
/// §4.5, "template-parameter wildcard"). We treat any identifier that
/// isn't a recognized builtin/keyword and starts with an uppercase
/// letter as one, mirroring how the original's type comparison skips
/// unresolved template names rather than failing the match.
pub(crate) fn is_template_param(ty: &str) -> bool {
    let t = ty.trim_end_matches(['&', '*', ' ']);
    !t.is_empty()
        && t.chars().next().unwrap().is_ascii_uppercase()
        && t.chars().all(|c| c.is_alphanumeric() || c == '_')
        && !matches!(t, "UNKNOWN")
}

/// `T&` / `const T&` → the referent type, stripped of reference syntax.
fn reference_referent(param: &str) -> Option<&str> {
    let p = param.trim();
    let p = p.strip_suffix('&')?;
    Some(p.trim().trim_start_matches("const").trim())
}

fn normalize(ty: &str) -> String {
    ty.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Score a candidate signature's specificity for template-specialization
/// resolution (spec §4.4 target resolution): a fully concrete signature
/// (no template parameters) scores 100, a partial specialization (some
/// but not all parameters templated) scores 50, and a primary template
/// (every parameter templated) scores 0. Resolution picks the
/// highest-scoring candidate among those whose signature matches at all.
pub fn specialization_score(params: &Signature) -> u32 {
    if params.is_empty() {
        return 100;
    }
    let templated = params.iter().filter(|p| is_template_param(p)).count();
    if templated == 0 {
        100
    } else if templated < params.len() {
        50
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_binds() {
        assert!(signatures_match(
            &vec!["int".into(), "double".into()],
            &vec!["int".into(), "double".into()]
        ));
    }

    #[test]
    fn unknown_wildcard_binds_anything() {
        assert!(signatures_match(&vec!["int".into()], &vec![UNKNOWN.into()]));
    }

    #[test]
    fn template_parameter_binds_anything() {
        assert!(signatures_match(&vec!["T".into()], &vec!["MyClass".into()]));
    }

    #[test]
    fn reference_binding_strips_const_and_ref() {
        assert!(signatures_match(&vec!["const int &".into()], &vec!["int".into()]));
        assert!(signatures_match(&vec!["int&".into()], &vec!["int".into()]));
    }

    #[test]
    fn variadic_accepts_extra_trailing_arguments() {
        let params = vec!["const char*".into(), "...".into()];
        let args = vec!["const char*".into(), "int".into(), "double".into()];
        assert!(signatures_match(&params, &args));
    }

    #[test]
    fn mismatched_arity_without_variadic_fails() {
        assert!(!signatures_match(&vec!["int".into()], &vec!["int".into(), "int".into()]));
    }

    #[test]
    fn string_literal_binds_const_char_pointer() {
        let symbols = SymbolTable::new();
        let ty = get_argument_type(&symbols, "\"hi\"", None);
        assert_eq!(ty, "const char*");
        assert!(signatures_match(&vec!["const char*".into()], &vec![ty]));
    }

    #[test]
    fn full_specialization_outscores_primary_template() {
        assert!(specialization_score(&vec!["int".into()]) > specialization_score(&vec!["T".into()]));
    }

    #[test]
    fn partial_specialization_scores_between_full_and_primary() {
        let partial = specialization_score(&vec!["T".into(), "int".into()]);
        assert!(partial > specialization_score(&vec!["T".into(), "U".into()]));
        assert!(partial < specialization_score(&vec!["int".into(), "int".into()]));
    }
}
