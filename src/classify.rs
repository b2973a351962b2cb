//! C1 — Node Classifier: a purely syntactic dispatch table per language.
//!
//! For each parser node kind this answers whether it is a statement worth
//! modeling, a control statement, a loop header, a definition, or a
//! statement holder (spec §4.1). C and C++ have distinct tables because
//! C++ adds `for_range_loop`, `try_statement`, `catch_clause`,
//! `throw_statement`, `lambda_expression`, `class_specifier`,
//! `namespace_definition`, etc. The kind sets themselves are ported
//! verbatim from `c_nodes.py`/`cpp_nodes.py`'s `statement_types` dict,
//! built as compile-time `phf::Set`s the same way `labels/rust.rs` builds
//! its `KINDS` dispatch table.

use phf::{phf_set, Set};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    C,
    Cpp,
}

impl Lang {
    pub fn parse(s: &str) -> Option<Lang> {
        match s.to_ascii_lowercase().as_str() {
            "c" => Some(Lang::C),
            "cpp" | "c++" | "cxx" => Some(Lang::Cpp),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Lang::C => "c",
            Lang::Cpp => "cpp",
        }
    }
}

/// The statement-kind sets a single language's classifier is built from,
/// mirroring `statement_types` in `c_nodes.py`/`cpp_nodes.py` field for
/// field.
pub struct StatementTypes {
    /// Kinds that become `GraphNode`s at all (filters `node_list`).
    pub node_list_type: &'static Set<&'static str>,
    /// Sequential statements with no control edges of their own.
    pub non_control_statement: &'static Set<&'static str>,
    /// Statements handled by Phase E's per-kind edge rules.
    pub control_statement: &'static Set<&'static str>,
    /// Loop headers specifically (subset of `control_statement`).
    pub loop_control_statement: &'static Set<&'static str>,
    /// Kinds whose body is itself a sequence of statements.
    pub statement_holders: &'static Set<&'static str>,
    /// Function/class/namespace/enum/typedef definitions.
    pub definition_types: &'static Set<&'static str>,
}

static C_NODE_LIST: Set<&'static str> = phf_set! {
    "declaration", "expression_statement", "labeled_statement", "if_statement",
    "while_statement", "for_statement", "do_statement", "break_statement",
    "continue_statement", "return_statement", "switch_statement",
    "function_definition", "case_statement", "goto_statement", "compound_statement",
    "preproc_include", "preproc_def", "preproc_function_def", "preproc_call",
    "preproc_if", "preproc_ifdef", "preproc_elif", "preproc_else",
};

static C_NON_CONTROL: Set<&'static str> = phf_set! {
    "declaration", "expression_statement", "preproc_include", "preproc_def",
    "preproc_function_def", "preproc_call",
};

static C_CONTROL: Set<&'static str> = phf_set! {
    "if_statement", "while_statement", "for_statement", "do_statement",
    "break_statement", "continue_statement", "return_statement",
    "switch_statement", "goto_statement", "case_statement", "preproc_if",
    "preproc_ifdef", "preproc_elif", "preproc_else",
};

static C_LOOP: Set<&'static str> = phf_set! { "while_statement", "for_statement", "do_statement" };

static C_HOLDERS: Set<&'static str> = phf_set! {
    "compound_statement", "translation_unit", "case_statement", "function_definition",
};

static C_DEFINITIONS: Set<&'static str> = phf_set! {
    "function_definition", "declaration", "struct_specifier", "union_specifier", "enum_specifier",
};

pub const C_TYPES: StatementTypes = StatementTypes {
    node_list_type: &C_NODE_LIST,
    non_control_statement: &C_NON_CONTROL,
    control_statement: &C_CONTROL,
    loop_control_statement: &C_LOOP,
    statement_holders: &C_HOLDERS,
    definition_types: &C_DEFINITIONS,
};

static CPP_NODE_LIST: Set<&'static str> = phf_set! {
    "declaration", "expression_statement", "labeled_statement", "if_statement",
    "while_statement", "for_statement", "for_range_loop", "do_statement",
    "break_statement", "continue_statement", "return_statement", "goto_statement",
    "switch_statement", "case_statement", "throw_statement", "try_statement",
    "function_definition", "class_specifier", "struct_specifier", "using_declaration",
    "alias_declaration", "template_declaration", "field_declaration", "access_specifier",
    "constructor_or_destructor_definition", "operator_cast", "lambda_expression",
    "enum_specifier", "union_specifier", "type_definition", "friend_declaration",
    "catch_clause", "attributed_statement", "static_assert_declaration",
    "namespace_alias_definition", "preproc_include", "preproc_def", "preproc_ifdef",
    "preproc_if", "preproc_elif", "preproc_else",
};

static CPP_NON_CONTROL: Set<&'static str> = phf_set! {
    "declaration", "expression_statement", "field_declaration", "using_declaration",
    "alias_declaration", "access_specifier", "enum_specifier", "union_specifier",
    "type_definition", "friend_declaration", "static_assert_declaration",
    "namespace_alias_definition", "attributed_statement",
};

static CPP_CONTROL: Set<&'static str> = phf_set! {
    "if_statement", "while_statement", "for_statement", "for_range_loop",
    "do_statement", "break_statement", "continue_statement", "return_statement",
    "goto_statement", "switch_statement", "try_statement", "throw_statement",
};

static CPP_LOOP: Set<&'static str> = phf_set! {
    "while_statement", "for_statement", "for_range_loop", "do_statement",
};

static CPP_HOLDERS: Set<&'static str> = phf_set! {
    "compound_statement", "case_statement", "function_definition", "class_specifier",
    "struct_specifier", "namespace_definition", "translation_unit",
};

static CPP_DEFINITIONS: Set<&'static str> = phf_set! {
    "function_definition", "class_specifier", "struct_specifier", "field_declaration",
    "namespace_definition", "template_declaration", "enum_specifier", "union_specifier",
    "type_definition",
};

pub const CPP_TYPES: StatementTypes = StatementTypes {
    node_list_type: &CPP_NODE_LIST,
    non_control_statement: &CPP_NON_CONTROL,
    control_statement: &CPP_CONTROL,
    loop_control_statement: &CPP_LOOP,
    statement_holders: &CPP_HOLDERS,
    definition_types: &CPP_DEFINITIONS,
};

impl StatementTypes {
    pub fn for_lang(lang: Lang) -> &'static StatementTypes {
        match lang {
            Lang::C => &C_TYPES,
            Lang::Cpp => &CPP_TYPES,
        }
    }

    pub fn is_node_list(&self, kind: &str) -> bool {
        self.node_list_type.contains(kind)
    }

    pub fn is_control(&self, kind: &str) -> bool {
        self.control_statement.contains(kind)
    }

    pub fn is_loop(&self, kind: &str) -> bool {
        self.loop_control_statement.contains(kind)
    }

    pub fn is_holder(&self, kind: &str) -> bool {
        self.statement_holders.contains(kind)
    }

    pub fn is_definition(&self, kind: &str) -> bool {
        self.definition_types.contains(kind)
    }

    pub fn is_non_control(&self, kind: &str) -> bool {
        self.non_control_statement.contains(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_has_no_cpp_only_kinds() {
        assert!(!C_TYPES.is_node_list("try_statement"));
        assert!(!C_TYPES.is_node_list("lambda_expression"));
    }

    #[test]
    fn cpp_adds_oo_and_exception_kinds() {
        assert!(CPP_TYPES.is_node_list("try_statement"));
        assert!(CPP_TYPES.is_node_list("catch_clause"));
        assert!(CPP_TYPES.is_node_list("lambda_expression"));
        assert!(CPP_TYPES.is_node_list("class_specifier"));
        assert!(CPP_TYPES.is_node_list("for_range_loop"));
    }

    #[test]
    fn loop_headers_are_a_subset_of_control_statements() {
        for lang in [Lang::C, Lang::Cpp] {
            let t = StatementTypes::for_lang(lang);
            for k in t.loop_control_statement {
                assert!(t.is_control(k), "{k} should be a control statement");
            }
        }
    }

    #[test]
    fn lang_parse_accepts_common_spellings() {
        assert_eq!(Lang::parse("C"), Some(Lang::C));
        assert_eq!(Lang::parse("cpp"), Some(Lang::Cpp));
        assert_eq!(Lang::parse("c++"), Some(Lang::Cpp));
        assert_eq!(Lang::parse("rust"), None);
    }
}
