//
// symbols.rs
//
// Declared symbols and top-level symbol extraction
//

use std::fmt;

use serde::Serialize;

use crate::syntax::{NodeId, NodeKind, Point, SyntaxTree};

/// Symbol kind
///
/// Declaration order is the sort order used when listing symbols by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SymbolKind {
    Service,
    Struct,
    Exception,
    Union,
    Enum,
    Const,
    Typedef,
    Namespace,
    Include,
    Scope,
    Method,
    Field,
    Event,
    EnumValue,
}

impl SymbolKind {
    /// Symbol kind declared by a top-level node, if any
    pub fn from_node_kind(kind: NodeKind) -> Option<Self> {
        let kind = match kind {
            NodeKind::Service => SymbolKind::Service,
            NodeKind::Struct => SymbolKind::Struct,
            NodeKind::Exception => SymbolKind::Exception,
            NodeKind::Union => SymbolKind::Union,
            NodeKind::Enum => SymbolKind::Enum,
            NodeKind::Const => SymbolKind::Const,
            NodeKind::Typedef => SymbolKind::Typedef,
            NodeKind::Namespace => SymbolKind::Namespace,
            NodeKind::Include => SymbolKind::Include,
            NodeKind::Scope => SymbolKind::Scope,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Service => "service",
            SymbolKind::Struct => "struct",
            SymbolKind::Exception => "exception",
            SymbolKind::Union => "union",
            SymbolKind::Enum => "enum",
            SymbolKind::Const => "const",
            SymbolKind::Typedef => "typedef",
            SymbolKind::Namespace => "namespace",
            SymbolKind::Include => "include",
            SymbolKind::Scope => "scope",
            SymbolKind::Method => "method",
            SymbolKind::Field => "field",
            SymbolKind::Event => "event",
            SymbolKind::EnumValue => "enum_value",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named declaration or nested member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// 0-based position of the symbol's name
    pub position: Point,
    /// Node the symbol was extracted from, valid against the tree of the
    /// document version that produced it
    pub node: NodeId,
}

/// Extract the top-level declarations of a document
pub fn extract_symbols(tree: &SyntaxTree, text: &str) -> Vec<Symbol> {
    let mut symbols = Vec::new();
    for &child in tree.children(tree.root()) {
        let node_kind = tree.kind(child);
        let Some(kind) = SymbolKind::from_node_kind(node_kind) else {
            continue;
        };
        let name_node = match node_kind {
            NodeKind::Include => tree.child_of_kind(child, NodeKind::StringLiteral),
            // `namespace <scope> <name>`: the second identifier is the name
            NodeKind::Namespace => tree.children_of_kind(child, NodeKind::Identifier).nth(1),
            _ => tree.child_of_kind(child, NodeKind::Identifier),
        };
        let Some(name_node) = name_node else {
            log::trace!("Skipping unnamed {} declaration at {}", kind, tree.start(child));
            continue;
        };
        let raw = tree.text(name_node, text);
        let name = if node_kind == NodeKind::Include {
            unquote(raw)
        } else {
            raw
        };
        if name.is_empty() {
            continue;
        }
        symbols.push(Symbol {
            name: name.to_string(),
            kind,
            position: tree.start(name_node),
            node: child,
        });
    }
    symbols
}

/// Strip the surrounding quote characters of a string literal
pub fn unquote(literal: &str) -> &str {
    let trimmed = literal.trim();
    let trimmed = trimmed
        .strip_prefix('"')
        .or_else(|| trimmed.strip_prefix('\''))
        .unwrap_or(trimmed);
    trimmed
        .strip_suffix('"')
        .or_else(|| trimmed.strip_suffix('\''))
        .unwrap_or(trimmed)
}
