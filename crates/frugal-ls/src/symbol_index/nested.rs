//
// symbol_index/nested.rs
//
// Member extraction for container declarations
//

use std::sync::OnceLock;

use regex::Regex;

use crate::symbols::{Symbol, SymbolKind};
use crate::syntax::{NodeId, NodeKind, SyntaxTree};

struct BodyPatterns {
    /// `Name: Type` scope event entries
    event: Regex,
    /// `NAME` or `NAME = value` enum entries
    enum_value: Regex,
}

fn patterns() -> &'static BodyPatterns {
    static PATTERNS: OnceLock<BodyPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| BodyPatterns {
        event: Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\s*:\s*[A-Za-z_][A-Za-z0-9_.]*").unwrap(),
        enum_value: Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)(?:\s*=\s*[-+]?[A-Za-z0-9_.]+)?").unwrap(),
    })
}

/// Members declared inside a top-level container declaration.
///
/// Services yield their methods, structs and exceptions their fields,
/// scopes their events and enums their values. Other declarations
/// (including unions) yield nothing.
pub fn extract_members(tree: &SyntaxTree, text: &str, decl: &Symbol) -> Vec<Symbol> {
    let Some(body) = tree.child_of_kind(decl.node, NodeKind::Body) else {
        return Vec::new();
    };
    match decl.kind {
        SymbolKind::Service => named_children(tree, text, body, NodeKind::Function, SymbolKind::Method),
        SymbolKind::Struct | SymbolKind::Exception => {
            named_children(tree, text, body, NodeKind::Field, SymbolKind::Field)
        }
        SymbolKind::Scope => body_entries(tree, text, body, &patterns().event, SymbolKind::Event),
        SymbolKind::Enum => body_entries(tree, text, body, &patterns().enum_value, SymbolKind::EnumValue),
        _ => Vec::new(),
    }
}

/// One symbol per child of `child_kind` that carries a name
fn named_children(
    tree: &SyntaxTree,
    text: &str,
    body: NodeId,
    child_kind: NodeKind,
    kind: SymbolKind,
) -> Vec<Symbol> {
    tree.children_of_kind(body, child_kind)
        .filter_map(|child| {
            let name_node = tree.child_of_kind(child, NodeKind::Identifier)?;
            let name = tree.text(name_node, text);
            (!name.is_empty()).then(|| Symbol {
                name: name.to_string(),
                kind,
                position: tree.start(name_node),
                node: child,
            })
        })
        .collect()
}

/// Symbols for the entries of a raw body, matched by `pattern` over the
/// body text with comments, strings and annotations blanked out
fn body_entries(tree: &SyntaxTree, text: &str, body: NodeId, pattern: &Regex, kind: SymbolKind) -> Vec<Symbol> {
    let range = tree.byte_range(body);
    let Some(raw) = text.get(range.clone()) else {
        return Vec::new();
    };
    let masked = mask_body(raw);

    pattern
        .captures_iter(&masked)
        .filter_map(|caps| caps.get(1))
        .map(|name| Symbol {
            name: name.as_str().to_string(),
            kind,
            position: tree.position_at(text, range.start + name.start()),
            node: body,
        })
        .collect()
}

/// Replace comments, string literals, parenthesized annotations and the
/// body's own braces with spaces. Byte offsets are preserved.
fn mask_body(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = bytes.to_vec();
    let mut i = 0;
    let mut paren_depth = 0usize;
    let mut paren_start = 0;
    while i < bytes.len() {
        let start = i;
        match bytes[i] {
            b'#' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                blank(&mut out, start, i);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                blank(&mut out, start, i);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
                blank(&mut out, start, i);
                continue;
            }
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote && bytes[i] != b'\n' {
                    i += 1;
                }
                i = (i + 1).min(bytes.len());
                blank(&mut out, start, i);
                continue;
            }
            b'(' => {
                if paren_depth == 0 {
                    paren_start = i;
                }
                paren_depth += 1;
            }
            b')' if paren_depth > 0 => {
                paren_depth -= 1;
                if paren_depth == 0 {
                    blank(&mut out, paren_start, i + 1);
                }
            }
            b'{' | b'}' if paren_depth == 0 => out[i] = b' ',
            _ => {}
        }
        i += 1;
    }
    if paren_depth > 0 {
        blank(&mut out, paren_start, bytes.len());
    }

    // Only ASCII bytes were replaced, and always whole multi-byte sequences
    // (inside comments or strings), so the result stays valid UTF-8
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

fn blank(out: &mut [u8], from: usize, to: usize) {
    for b in &mut out[from..to] {
        // keep line structure
        if *b != b'\n' && *b != b'\r' {
            *b = b' ';
        }
    }
}
