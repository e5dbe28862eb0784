//
// syntax.rs
//
// Syntax tree for Frugal/Thrift IDL documents
//

use std::fmt;
use std::ops::Range;

/// Kind of a syntax node.
///
/// The set of grammar productions is fixed, so extraction code matches on
/// this enum instead of comparing node-kind strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Include,
    CppInclude,
    Namespace,
    Const,
    Typedef,
    Enum,
    Struct,
    Exception,
    Union,
    Service,
    Scope,
    Identifier,
    StringLiteral,
    TypeRef,
    ConstValue,
    Body,
    Field,
    FieldId,
    Function,
    Parameters,
    Throws,
    Extends,
    Prefix,
    Annotations,
    Error,
}

/// 0-based position. `column` is measured in UTF-16 code units so that it can
/// be handed to an LSP client unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Point {
    pub line: u32,
    pub column: u32,
}

impl Point {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A syntax error reported by the parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub line: u32,
    pub column: u32,
    pub byte_offset: usize,
}

/// Index of a node inside its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub byte_range: Range<usize>,
    pub start: Point,
    pub end: Point,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Maps byte offsets to line/UTF-16 positions for one source text
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        // Lines end at `\n`, `\r\n` or a lone `\r`, the same breaks the
        // document rope uses
        let bytes = text.as_bytes();
        let mut line_starts = vec![0];
        for (idx, &byte) in bytes.iter().enumerate() {
            match byte {
                b'\n' => line_starts.push(idx + 1),
                b'\r' if bytes.get(idx + 1) != Some(&b'\n') => line_starts.push(idx + 1),
                _ => {}
            }
        }
        Self { line_starts }
    }

    /// Position of `offset` in `text`. Offsets past the end clamp to the end;
    /// offsets inside a multi-byte character snap back to its start.
    pub fn position_at(&self, text: &str, offset: usize) -> Point {
        let mut offset = offset.min(text.len());
        while !text.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let column: usize = text[line_start..offset].chars().map(char::len_utf16).sum();
        Point::new(line as u32, column as u32)
    }
}

/// Arena-allocated syntax tree produced by an [`crate::parser::IdlParser`].
///
/// The tree owns all of its nodes; it is released when the owning document
/// drops it or replaces it with a fresh parse.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
    line_index: LineIndex,
    source_len: usize,
}

impl SyntaxTree {
    pub(crate) fn new(text: &str) -> Self {
        let line_index = LineIndex::new(text);
        let end = line_index.position_at(text, text.len());
        let root = SyntaxNode {
            kind: NodeKind::Document,
            byte_range: 0..text.len(),
            start: Point::default(),
            end,
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            line_index,
            source_len: text.len(),
        }
    }

    /// Append a node under `parent` and return its id
    pub(crate) fn push(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        byte_range: Range<usize>,
        text: &str,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let start = self.line_index.position_at(text, byte_range.start);
        let end = self.line_index.position_at(text, byte_range.end);
        self.nodes.push(SyntaxNode {
            kind,
            byte_range,
            start,
            end,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Widen a node's range to end at `end` (used once a body is closed)
    pub(crate) fn extend_to(&mut self, id: NodeId, end: usize, text: &str) {
        let point = self.line_index.position_at(text, end);
        let node = &mut self.nodes[id.0];
        if end > node.byte_range.end {
            node.byte_range.end = end;
            node.end = point;
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.0].kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// First direct child of the given kind
    pub fn child_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|child| self.kind(*child) == kind)
    }

    pub fn children_of_kind(&self, id: NodeId, kind: NodeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |child| self.kind(*child) == kind)
    }

    pub fn byte_range(&self, id: NodeId) -> Range<usize> {
        self.nodes[id.0].byte_range.clone()
    }

    pub fn start(&self, id: NodeId) -> Point {
        self.nodes[id.0].start
    }

    pub fn end(&self, id: NodeId) -> Point {
        self.nodes[id.0].end
    }

    /// Slice the source text covered by a node.
    ///
    /// Returns an empty string if `source` is not the text this tree was
    /// parsed from (e.g. a stale tree paired with newer content).
    pub fn text<'a>(&self, id: NodeId, source: &'a str) -> &'a str {
        source.get(self.byte_range(id)).unwrap_or("")
    }

    pub fn position_at(&self, source: &str, offset: usize) -> Point {
        self.line_index.position_at(source, offset)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn source_len(&self) -> usize {
        self.source_len
    }

    /// Pre-order walk over every node below (and including) `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            for child in self.children(current).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }
}
