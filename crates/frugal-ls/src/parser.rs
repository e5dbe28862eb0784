//
// parser.rs
//
// Tolerant recursive-descent parser for Frugal/Thrift IDL
//

use crate::syntax::{NodeId, NodeKind, SyntaxError, SyntaxTree};

/// Result of parsing one document. Parsing never fails: malformed input
/// yields a partial tree plus syntax errors.
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub tree: SyntaxTree,
    pub errors: Vec<SyntaxError>,
}

/// Parser collaborator used by the document store
pub trait IdlParser: Send + Sync {
    fn parse(&self, text: &str) -> ParseOutput;
}

/// Parser for the Frugal dialect of Thrift IDL (Thrift plus `scope` blocks)
#[derive(Debug, Clone, Copy, Default)]
pub struct FrugalParser;

impl IdlParser for FrugalParser {
    fn parse(&self, text: &str) -> ParseOutput {
        parse(text)
    }
}

/// Parse `text` with the Frugal grammar
pub fn parse(text: &str) -> ParseOutput {
    let (tokens, lex_errors) = lex(text);
    let mut parser = Parser {
        text,
        tokens,
        pos: 0,
        tree: SyntaxTree::new(text),
        errors: Vec::new(),
    };
    for (message, offset) in lex_errors {
        parser.error_at(offset, message);
    }
    parser.parse_document();

    let mut errors = parser.errors;
    errors.sort_by_key(|e| e.byte_offset);
    log::trace!(
        "Parsed {} bytes into {} nodes with {} syntax errors",
        text.len(),
        parser.tree.len(),
        errors.len()
    );
    ParseOutput {
        tree: parser.tree,
        errors,
    }
}

const DEFINITION_KEYWORDS: &[&str] = &[
    "include",
    "cpp_include",
    "namespace",
    "const",
    "typedef",
    "enum",
    "struct",
    "exception",
    "union",
    "service",
    "scope",
];

fn is_definition_keyword(word: &str) -> bool {
    DEFINITION_KEYWORDS.contains(&word)
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Ident,
    Number,
    Str,
    Punct(char),
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

impl Token {
    fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }
}

const PUNCTUATION: &[char] = &['{', '}', '(', ')', '<', '>', '[', ']', ',', ';', ':', '=', '*'];

fn lex(text: &str) -> (Vec<Token>, Vec<(String, usize)>) {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_whitespace() {
            i += 1;
        } else if b == b'#' || (b == b'/' && bytes.get(i + 1) == Some(&b'/')) {
            while i < bytes.len() && bytes[i] != b'\n' && bytes[i] != b'\r' {
                i += 1;
            }
        } else if b == b'/' && bytes.get(i + 1) == Some(&b'*') {
            let start = i;
            match text[i + 2..].find("*/") {
                Some(rel) => i = i + 2 + rel + 2,
                None => {
                    errors.push(("unterminated block comment".to_string(), start));
                    i = bytes.len();
                }
            }
        } else if b == b'"' || b == b'\'' {
            let start = i;
            i += 1;
            let mut terminated = false;
            while i < bytes.len() {
                match bytes[i] {
                    b'\\' => i += 2,
                    c if c == b => {
                        i += 1;
                        terminated = true;
                        break;
                    }
                    _ => i += 1,
                }
            }
            let end = i.min(bytes.len());
            if !terminated {
                errors.push(("unterminated string literal".to_string(), start));
            }
            tokens.push(Token {
                kind: TokenKind::Str,
                start,
                end,
            });
            i = end;
        } else if b.is_ascii_alphabetic() || b == b'_' {
            let start = i;
            while i < bytes.len()
                && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'.')
            {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Ident,
                start,
                end: i,
            });
        } else if b.is_ascii_digit()
            || ((b == b'-' || b == b'+')
                && bytes.get(i + 1).is_some_and(|next| next.is_ascii_digit()))
        {
            let start = i;
            i += 1;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'.') {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Number,
                start,
                end: i,
            });
        } else {
            // Safe: `i` always sits on a char boundary here because every
            // branch above only advances over ASCII bytes or whole strings.
            let ch = text[i..].chars().next().unwrap_or('\u{fffd}');
            if PUNCTUATION.contains(&ch) {
                tokens.push(Token {
                    kind: TokenKind::Punct(ch),
                    start: i,
                    end: i + 1,
                });
            } else {
                errors.push((format!("unexpected character '{}'", ch), i));
            }
            i += ch.len_utf8();
        }
    }

    (tokens, errors)
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    tree: SyntaxTree,
    errors: Vec<SyntaxError>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_nth(&self, n: usize) -> Option<Token> {
        self.tokens.get(self.pos + n).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.peek()?;
        self.pos += 1;
        Some(tok)
    }

    fn token_text(&self, tok: Token) -> &'a str {
        &self.text[tok.start..tok.end]
    }

    fn at_punct(&self, c: char) -> bool {
        self.peek().is_some_and(|t| t.is_punct(c))
    }

    fn at_word(&self, word: &str) -> bool {
        self.peek()
            .is_some_and(|t| t.kind == TokenKind::Ident && self.token_text(t) == word)
    }

    fn eat_punct(&mut self, c: char) -> Option<Token> {
        if self.at_punct(c) {
            self.bump()
        } else {
            None
        }
    }

    fn eat_word(&mut self, word: &str) -> Option<Token> {
        if self.at_word(word) {
            self.bump()
        } else {
            None
        }
    }

    fn eat_separator(&mut self) {
        if self.at_punct(',') || self.at_punct(';') {
            self.pos += 1;
        }
    }

    /// True when `tok` begins a new top-level definition (`struct Foo`,
    /// `include "x"`). Used to recover from unterminated bodies.
    fn starts_definition(&self, tok: Token) -> bool {
        tok.kind == TokenKind::Ident
            && is_definition_keyword(self.token_text(tok))
            && self
                .tokens
                .get(self.pos + 1)
                .is_some_and(|next| matches!(next.kind, TokenKind::Ident | TokenKind::Str))
    }

    fn last_end(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].end
        }
    }

    fn error_at(&mut self, offset: usize, message: impl Into<String>) {
        let point = self.tree.position_at(self.text, offset);
        self.errors.push(SyntaxError {
            message: message.into(),
            line: point.line,
            column: point.column,
            byte_offset: offset,
        });
    }

    fn error_here(&mut self, message: impl Into<String>) {
        let offset = self.peek().map(|t| t.start).unwrap_or(self.text.len());
        self.error_at(offset, message);
    }

    fn node(&mut self, parent: NodeId, kind: NodeKind, tok: Token) -> NodeId {
        self.tree.push(parent, kind, tok.start..tok.end, self.text)
    }

    fn finish(&mut self, id: NodeId) {
        let end = self.last_end();
        self.tree.extend_to(id, end, self.text);
    }

    fn parse_document(&mut self) {
        let root = self.tree.root();
        while let Some(tok) = self.peek() {
            match tok.kind {
                TokenKind::Ident if is_definition_keyword(self.token_text(tok)) => {
                    self.parse_definition(root);
                }
                TokenKind::Punct(',') | TokenKind::Punct(';') => {
                    self.pos += 1;
                }
                _ => {
                    let text = self.token_text(tok);
                    self.error_at(tok.start, format!("unexpected token '{}'", text));
                    self.node(root, NodeKind::Error, tok);
                    self.pos += 1;
                }
            }
        }
    }

    fn parse_definition(&mut self, root: NodeId) {
        let Some(keyword) = self.bump() else {
            return;
        };
        match self.token_text(keyword) {
            "include" => self.parse_include(root, keyword, NodeKind::Include),
            "cpp_include" => self.parse_include(root, keyword, NodeKind::CppInclude),
            "namespace" => self.parse_namespace(root, keyword),
            "const" => self.parse_const(root, keyword),
            "typedef" => self.parse_typedef(root, keyword),
            "enum" => {
                let decl = self.node(root, NodeKind::Enum, keyword);
                self.expect_identifier(decl, "enum name");
                self.parse_annotations(decl);
                self.parse_raw_body(decl);
                self.parse_annotations(decl);
                self.finish(decl);
            }
            "struct" | "exception" | "union" => {
                let kind = match self.token_text(keyword) {
                    "struct" => NodeKind::Struct,
                    "exception" => NodeKind::Exception,
                    _ => NodeKind::Union,
                };
                let decl = self.node(root, kind, keyword);
                self.expect_identifier(decl, "type name");
                self.eat_word("xsd_all");
                self.parse_field_body(decl);
                self.parse_annotations(decl);
                self.finish(decl);
            }
            "service" => self.parse_service(root, keyword),
            "scope" => self.parse_scope(root, keyword),
            _ => {}
        }
    }

    fn parse_include(&mut self, root: NodeId, keyword: Token, kind: NodeKind) {
        let decl = self.node(root, kind, keyword);
        match self.peek() {
            Some(tok) if tok.kind == TokenKind::Str => {
                self.bump();
                self.node(decl, NodeKind::StringLiteral, tok);
            }
            _ => {
                let what = self.token_text(keyword);
                self.error_here(format!("expected path string after '{}'", what));
            }
        }
        self.finish(decl);
        self.eat_separator();
    }

    fn parse_namespace(&mut self, root: NodeId, keyword: Token) {
        let decl = self.node(root, NodeKind::Namespace, keyword);
        // Language scope: an identifier or `*`
        match self.peek() {
            Some(tok) if tok.kind == TokenKind::Ident || tok.is_punct('*') => {
                self.bump();
                self.node(decl, NodeKind::Identifier, tok);
                self.expect_identifier(decl, "namespace name");
            }
            _ => self.error_here("expected namespace scope"),
        }
        self.parse_annotations(decl);
        self.finish(decl);
        self.eat_separator();
    }

    fn parse_const(&mut self, root: NodeId, keyword: Token) {
        let decl = self.node(root, NodeKind::Const, keyword);
        if self.parse_type(decl).is_none() {
            self.error_here("expected constant type");
            self.finish(decl);
            return;
        }
        self.expect_identifier(decl, "constant name");
        if self.eat_punct('=').is_some() {
            self.parse_const_value(decl);
        } else {
            self.error_here("expected '='");
        }
        self.finish(decl);
        self.eat_separator();
    }

    fn parse_typedef(&mut self, root: NodeId, keyword: Token) {
        let decl = self.node(root, NodeKind::Typedef, keyword);
        if self.parse_type(decl).is_none() {
            self.error_here("expected type after 'typedef'");
            self.finish(decl);
            return;
        }
        self.expect_identifier(decl, "typedef name");
        self.parse_annotations(decl);
        self.finish(decl);
        self.eat_separator();
    }

    fn parse_service(&mut self, root: NodeId, keyword: Token) {
        let decl = self.node(root, NodeKind::Service, keyword);
        self.expect_identifier(decl, "service name");
        if let Some(extends) = self.eat_word("extends") {
            let node = self.node(decl, NodeKind::Extends, extends);
            self.expect_identifier(node, "base service name");
            self.finish(node);
        }

        let Some(open) = self.eat_punct('{') else {
            self.error_here("expected '{'");
            self.finish(decl);
            return;
        };
        let body = self.node(decl, NodeKind::Body, open);
        loop {
            match self.peek() {
                None => {
                    self.error_at(self.text.len(), "expected '}'");
                    break;
                }
                Some(tok) if tok.is_punct('}') => {
                    self.pos += 1;
                    break;
                }
                Some(tok) if tok.is_punct(',') || tok.is_punct(';') => self.pos += 1,
                Some(tok) if self.starts_definition(tok) => {
                    self.error_at(tok.start, "expected '}'");
                    break;
                }
                Some(_) => self.parse_function(body),
            }
        }
        self.finish(body);
        self.parse_annotations(decl);
        self.finish(decl);
    }

    fn parse_scope(&mut self, root: NodeId, keyword: Token) {
        let decl = self.node(root, NodeKind::Scope, keyword);
        self.expect_identifier(decl, "scope name");
        if let Some(prefix) = self.eat_word("prefix") {
            let node = self.node(decl, NodeKind::Prefix, prefix);
            match self.peek() {
                Some(tok) if tok.kind == TokenKind::Str => {
                    self.bump();
                    self.node(node, NodeKind::StringLiteral, tok);
                }
                _ => self.error_here("expected prefix string"),
            }
            self.finish(node);
        }
        self.parse_raw_body(decl);
        self.parse_annotations(decl);
        self.finish(decl);
    }

    fn parse_function(&mut self, parent: NodeId) {
        let Some(start) = self.peek() else {
            return;
        };
        let before = self.pos;
        let func = self.node(parent, NodeKind::Function, start);
        self.eat_word("oneway");
        if self.parse_type(func).is_none() {
            self.error_here("expected method return type");
            if self.pos == before {
                self.pos += 1;
            }
            self.finish(func);
            return;
        }
        self.expect_identifier(func, "method name");

        if let Some(open) = self.eat_punct('(') {
            let params = self.node(func, NodeKind::Parameters, open);
            self.parse_parenthesized_fields(params);
            self.finish(params);
        } else {
            self.error_here("expected '('");
        }

        if let Some(throws) = self.eat_word("throws") {
            let node = self.node(func, NodeKind::Throws, throws);
            if self.eat_punct('(').is_some() {
                self.parse_parenthesized_fields(node);
            } else {
                self.error_here("expected '(' after 'throws'");
            }
            self.finish(node);
        }
        self.parse_annotations(func);
        self.finish(func);
        self.eat_separator();
    }

    /// Fields up to and including the closing `)`
    fn parse_parenthesized_fields(&mut self, parent: NodeId) {
        loop {
            match self.peek() {
                None => {
                    self.error_at(self.text.len(), "expected ')'");
                    break;
                }
                Some(tok) if tok.is_punct(')') => {
                    self.pos += 1;
                    break;
                }
                Some(tok) if tok.is_punct(',') || tok.is_punct(';') => self.pos += 1,
                Some(tok) if tok.is_punct('}') || self.starts_definition(tok) => {
                    self.error_at(tok.start, "expected ')'");
                    break;
                }
                Some(_) => self.parse_field(parent),
            }
        }
    }

    /// `{ field* }` for struct, exception and union
    fn parse_field_body(&mut self, decl: NodeId) {
        let Some(open) = self.eat_punct('{') else {
            self.error_here("expected '{'");
            return;
        };
        let body = self.node(decl, NodeKind::Body, open);
        loop {
            match self.peek() {
                None => {
                    self.error_at(self.text.len(), "expected '}'");
                    break;
                }
                Some(tok) if tok.is_punct('}') => {
                    self.pos += 1;
                    break;
                }
                Some(tok) if tok.is_punct(',') || tok.is_punct(';') => self.pos += 1,
                Some(tok) if self.starts_definition(tok) => {
                    self.error_at(tok.start, "expected '}'");
                    break;
                }
                Some(_) => self.parse_field(body),
            }
        }
        self.finish(body);
    }

    /// `{ ... }` kept as raw text (enum values, scope events)
    fn parse_raw_body(&mut self, decl: NodeId) {
        let Some(open) = self.eat_punct('{') else {
            self.error_here("expected '{'");
            return;
        };
        let body = self.node(decl, NodeKind::Body, open);
        let mut depth = 1usize;
        loop {
            match self.peek() {
                None => {
                    self.error_at(self.text.len(), "expected '}'");
                    break;
                }
                Some(tok) if tok.is_punct('{') => {
                    depth += 1;
                    self.pos += 1;
                }
                Some(tok) if tok.is_punct('}') => {
                    self.pos += 1;
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                Some(tok) if depth == 1 && self.starts_definition(tok) => {
                    self.error_at(tok.start, "expected '}'");
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        self.finish(body);
    }

    fn parse_field(&mut self, parent: NodeId) {
        let Some(start) = self.peek() else {
            return;
        };
        let before = self.pos;
        let field = self.node(parent, NodeKind::Field, start);

        if start.kind == TokenKind::Number && self.peek_nth(1).is_some_and(|t| t.is_punct(':')) {
            self.node(field, NodeKind::FieldId, start);
            self.pos += 2;
        }
        if self.eat_word("required").is_none() {
            self.eat_word("optional");
        }

        if self.parse_type(field).is_none() {
            self.error_here("expected field type");
            if self.pos == before {
                self.pos += 1;
            }
            self.finish(field);
            return;
        }
        self.expect_identifier(field, "field name");
        if self.eat_punct('=').is_some() {
            self.parse_const_value(field);
        }
        self.parse_annotations(field);
        self.finish(field);
        self.eat_separator();
    }

    fn parse_type(&mut self, parent: NodeId) -> Option<NodeId> {
        let tok = self.peek()?;
        if tok.kind != TokenKind::Ident {
            return None;
        }
        self.pos += 1;
        let node = self.node(parent, NodeKind::TypeRef, tok);
        if self.at_punct('<') {
            self.skip_group();
        }
        self.finish(node);
        self.parse_annotations(node);
        Some(node)
    }

    fn parse_const_value(&mut self, parent: NodeId) {
        match self.peek() {
            Some(tok) if tok.is_punct('[') || tok.is_punct('{') => {
                let node = self.node(parent, NodeKind::ConstValue, tok);
                self.skip_group();
                self.finish(node);
            }
            Some(tok) if matches!(tok.kind, TokenKind::Ident | TokenKind::Number | TokenKind::Str) => {
                self.pos += 1;
                self.node(parent, NodeKind::ConstValue, tok);
            }
            _ => self.error_here("expected constant value"),
        }
    }

    fn parse_annotations(&mut self, parent: NodeId) {
        if let Some(tok) = self.peek() {
            if tok.is_punct('(') {
                let node = self.node(parent, NodeKind::Annotations, tok);
                self.skip_group();
                self.finish(node);
            }
        }
    }

    /// Consume a bracketed group starting at the current opener, honouring
    /// nesting of `()`, `[]`, `{}` and `<>`.
    fn skip_group(&mut self) {
        let Some(open) = self.bump() else {
            return;
        };
        let mut closers = vec![closer_for(open)];
        while let Some(tok) = self.peek() {
            if let TokenKind::Punct(c) = tok.kind {
                if let Some(expected) = closers.last() {
                    if c == *expected {
                        closers.pop();
                        self.pos += 1;
                        if closers.is_empty() {
                            return;
                        }
                        continue;
                    }
                }
                if matches!(c, '(' | '[' | '{' | '<') {
                    closers.push(closer_for(tok));
                }
            }
            self.pos += 1;
        }
        let expected = closers.last().copied().unwrap_or(')');
        self.error_at(self.text.len(), format!("expected '{}'", expected));
    }

    fn expect_identifier(&mut self, parent: NodeId, what: &str) -> Option<NodeId> {
        match self.peek() {
            Some(tok) if tok.kind == TokenKind::Ident && !self.starts_definition(tok) => {
                self.pos += 1;
                Some(self.node(parent, NodeKind::Identifier, tok))
            }
            _ => {
                self.error_here(format!("expected {}", what));
                None
            }
        }
    }
}

fn closer_for(tok: Token) -> char {
    match tok.kind {
        TokenKind::Punct('(') => ')',
        TokenKind::Punct('[') => ']',
        TokenKind::Punct('{') => '}',
        _ => '>',
    }
}
