//! Thin ergonomics wrapper over `tree_sitter::Node` — the external syntax
//! tree spec §3/§6 describe. We don't translate it into a crate-private
//! tree; we consume `tree_sitter::Node` directly and just pair it with the
//! source bytes for text/position helpers (grounded on `cfg.rs`'s
//! `text_of`).

use crate::ids::SynKey;
use tree_sitter::Node;

/// A syntax node plus the source bytes it was parsed from.
#[derive(Clone, Copy)]
pub struct Syn<'a> {
    pub node: Node<'a>,
    pub code: &'a [u8],
}

impl<'a> Syn<'a> {
    pub fn new(node: Node<'a>, code: &'a [u8]) -> Self {
        Self { node, code }
    }

    pub fn kind(&self) -> &'static str {
        self.node.kind()
    }

    pub fn start_point(&self) -> (usize, usize) {
        let p = self.node.start_position();
        (p.row, p.column)
    }

    pub fn end_point(&self) -> (usize, usize) {
        let p = self.node.end_position();
        (p.row, p.column)
    }

    pub fn line(&self) -> usize {
        self.node.start_position().row + 1
    }

    pub fn key(&self) -> SynKey {
        (self.start_point(), self.end_point(), self.kind())
    }

    pub fn text(&self) -> String {
        std::str::from_utf8(&self.code[self.node.start_byte()..self.node.end_byte()])
            .unwrap_or("")
            .to_string()
    }

    pub fn child_by_field(&self, field: &str) -> Option<Syn<'a>> {
        self.node
            .child_by_field_name(field)
            .map(|n| Syn::new(n, self.code))
    }

    pub fn named_children(&self) -> Vec<Syn<'a>> {
        let mut cursor = self.node.walk();
        self.node
            .named_children(&mut cursor)
            .map(|n| Syn::new(n, self.code))
            .collect()
    }

    pub fn children(&self) -> Vec<Syn<'a>> {
        let mut cursor = self.node.walk();
        self.node
            .children(&mut cursor)
            .map(|n| Syn::new(n, self.code))
            .collect()
    }

    pub fn parent(&self) -> Option<Syn<'a>> {
        self.node.parent().map(|n| Syn::new(n, self.code))
    }

    pub fn next_named_sibling(&self) -> Option<Syn<'a>> {
        self.node.next_named_sibling().map(|n| Syn::new(n, self.code))
    }
}

impl std::fmt::Debug for Syn<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Syn")
            .field("kind", &self.kind())
            .field("start", &self.start_point())
            .field("text", &self.text())
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn parse<'a>(lang: crate::classify::Lang, src: &'a [u8]) -> tree_sitter::Tree {
    let mut parser = tree_sitter::Parser::new();
    let ts_lang = match lang {
        crate::classify::Lang::C => tree_sitter::Language::from(tree_sitter_c::LANGUAGE),
        crate::classify::Lang::Cpp => tree_sitter::Language::from(tree_sitter_cpp::LANGUAGE),
    };
    parser.set_language(&ts_lang).expect("language load");
    parser.parse(src, None).expect("parse")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Lang;

    #[test]
    fn text_and_kind_round_trip() {
        let src = b"int main(){ return 0; }";
        let tree = parse(Lang::C, src);
        let root = Syn::new(tree.root_node(), src);
        assert_eq!(root.kind(), "translation_unit");
        assert!(root.text().contains("main"));
    }
}
