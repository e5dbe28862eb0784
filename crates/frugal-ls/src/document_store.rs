//
// document_store.rs
//
// Authoritative in-memory copy of every open document
//

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use ropey::Rope;
use tower_lsp::lsp_types::{Diagnostic, Position, TextDocumentContentChangeEvent, Url};

use crate::config::{EditRecovery, VersionPolicy, WorkspaceConfig};
use crate::diagnostics::{DiagnosticsProvider, SyntaxDiagnostics};
use crate::error::{WorkspaceError, WorkspaceResult};
use crate::parser::{FrugalParser, IdlParser, ParseOutput};
use crate::symbols::{extract_symbols, Symbol};
use crate::syntax::{SyntaxError, SyntaxTree};
use crate::utf16::{trim_line_terminator, utf16_column_to_char_offset};

// ============================================================================
// Configuration
// ============================================================================

/// Edit handling policies for the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentStoreConfig {
    pub edit_recovery: EditRecovery,
    pub version_policy: VersionPolicy,
}

impl From<&WorkspaceConfig> for DocumentStoreConfig {
    fn from(config: &WorkspaceConfig) -> Self {
        Self {
            edit_recovery: config.edit_recovery,
            version_policy: config.version_policy,
        }
    }
}

// ============================================================================
// Metrics
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentStoreMetrics {
    pub documents_opened: u64,
    pub documents_changed: u64,
    pub documents_closed: u64,
    /// Change batches that hit an out-of-range edit
    pub rejected_edits: u64,
    /// Changes whose version was not newer than the stored one
    pub stale_versions: u64,
}

// ============================================================================
// Document
// ============================================================================

/// Snapshot of one open document.
///
/// Documents are immutable once built. Every change produces a new
/// `Document` that replaces the previous one wholesale, so the syntax tree
/// of an old version is released as soon as its last reader drops it.
#[derive(Debug)]
pub struct Document {
    pub uri: Url,
    /// Filesystem path the URI maps to
    pub path: PathBuf,
    pub contents: Rope,
    /// LSP document version
    pub version: i32,
    /// Incremented for every applied change batch
    pub revision: u64,
    pub tree: SyntaxTree,
    /// Syntax errors of the current content, whatever the diagnostics
    /// provider reports
    pub syntax_errors: Vec<SyntaxError>,
    /// Top-level declarations
    pub symbols: Vec<Symbol>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Document {
    pub fn text(&self) -> String {
        self.contents.to_string()
    }
}

// ============================================================================
// Document Store
// ============================================================================

struct SlotState {
    document: Arc<Document>,
    /// Set when the slot was removed from the map; a writer that looked the
    /// slot up before the close must not resurrect it
    closed: bool,
}

/// Per-document lock. Edits to one document serialize on it while edits to
/// different documents proceed in parallel.
struct DocumentSlot {
    state: Mutex<SlotState>,
}

impl DocumentSlot {
    fn new(document: Arc<Document>) -> Self {
        Self {
            state: Mutex::new(SlotState {
                document,
                closed: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Store for open documents.
///
/// Locks are always taken map first, then document. The `*_with` variants
/// run a hook while the document's lock is still held so that derived
/// structures observe the changes of one document in arrival order. Hooks
/// must not call back into the store.
pub struct DocumentStore {
    documents: RwLock<HashMap<Url, Arc<DocumentSlot>>>,
    parser: Arc<dyn IdlParser>,
    diagnostics: Arc<dyn DiagnosticsProvider>,
    config: RwLock<DocumentStoreConfig>,
    metrics: Mutex<DocumentStoreMetrics>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new(
            Arc::new(FrugalParser),
            Arc::new(SyntaxDiagnostics),
            DocumentStoreConfig::default(),
        )
    }
}

impl DocumentStore {
    pub fn new(
        parser: Arc<dyn IdlParser>,
        diagnostics: Arc<dyn DiagnosticsProvider>,
        config: DocumentStoreConfig,
    ) -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            parser,
            diagnostics,
            config: RwLock::new(config),
            metrics: Mutex::new(DocumentStoreMetrics::default()),
        }
    }

    pub fn config(&self) -> DocumentStoreConfig {
        *self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_config(&self, config: DocumentStoreConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    /// Open a document, replacing any previous copy of the same URI
    pub fn open(&self, uri: Url, text: &str, version: i32) -> WorkspaceResult<Arc<Document>> {
        self.open_with(uri, text, version, |_| {})
    }

    pub fn open_with<F>(
        &self,
        uri: Url,
        text: &str,
        version: i32,
        hook: F,
    ) -> WorkspaceResult<Arc<Document>>
    where
        F: FnOnce(&Arc<Document>),
    {
        let path = uri
            .to_file_path()
            .map_err(|()| WorkspaceError::InvalidUri(uri.clone()))?;

        // Parse before taking any lock
        let mut document = self.build(uri.clone(), path, Rope::from_str(text), version, 0);

        let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        let existing = documents.get(&uri).cloned();
        let document = match existing {
            Some(slot) => {
                let mut state = slot.lock();
                drop(documents);
                document.revision = state.document.revision + 1;
                state.document = Arc::new(document);
                hook(&state.document);
                Arc::clone(&state.document)
            }
            None => {
                let document = Arc::new(document);
                let slot = Arc::new(DocumentSlot::new(Arc::clone(&document)));
                let _state = slot.lock();
                documents.insert(uri, Arc::clone(&slot));
                drop(documents);
                hook(&document);
                document
            }
        };

        self.with_metrics(|m| m.documents_opened += 1);
        log::debug!(
            "Opened {} (version {}, {} symbols, {} syntax errors)",
            document.uri,
            version,
            document.symbols.len(),
            document.syntax_errors.len()
        );
        Ok(document)
    }

    /// Apply a batch of content changes in order and reparse
    pub fn apply_change(
        &self,
        uri: &Url,
        changes: Vec<TextDocumentContentChangeEvent>,
        version: i32,
    ) -> WorkspaceResult<Arc<Document>> {
        self.apply_change_with(uri, changes, version, |_| {})
    }

    pub fn apply_change_with<F>(
        &self,
        uri: &Url,
        changes: Vec<TextDocumentContentChangeEvent>,
        version: i32,
        hook: F,
    ) -> WorkspaceResult<Arc<Document>>
    where
        F: FnOnce(&Arc<Document>),
    {
        let config = self.config();
        let mut slot = self
            .slot(uri)
            .ok_or_else(|| WorkspaceError::UnknownDocument(uri.clone()))?;

        loop {
            let mut state = slot.lock();
            if state.closed {
                // Closed (and possibly reopened) since the lookup
                drop(state);
                match self.slot(uri) {
                    Some(current) if !Arc::ptr_eq(&current, &slot) => {
                        slot = current;
                        continue;
                    }
                    _ => return Err(WorkspaceError::UnknownDocument(uri.clone())),
                }
            }

            let current = Arc::clone(&state.document);
            if version <= current.version {
                self.with_metrics(|m| m.stale_versions += 1);
                match config.version_policy {
                    VersionPolicy::RejectStale => {
                        log::warn!(
                            "Rejecting change to {} with stale version {} (current {})",
                            uri,
                            version,
                            current.version
                        );
                        return Err(WorkspaceError::StaleVersion {
                            uri: uri.clone(),
                            current: current.version,
                            received: version,
                        });
                    }
                    VersionPolicy::LastWriteWins => log::warn!(
                        "Applying change to {} with non-increasing version {} (current {})",
                        uri,
                        version,
                        current.version
                    ),
                }
            }

            let mut contents = current.contents.clone();
            for change in &changes {
                if let Err(position) = apply_change_to_rope(&mut contents, change) {
                    self.with_metrics(|m| m.rejected_edits += 1);
                    match config.edit_recovery {
                        EditRecovery::Reject => {
                            log::warn!(
                                "Rejecting change batch for {}: edit position {}:{} is out of range",
                                uri,
                                position.line,
                                position.character
                            );
                            return Err(WorkspaceError::OutOfRangeEdit {
                                uri: uri.clone(),
                                line: position.line,
                                character: position.character,
                            });
                        }
                        EditRecovery::ReplaceDocument => {
                            log::warn!(
                                "Edit position {}:{} out of range for {}, replacing document with edit text",
                                position.line,
                                position.character,
                                uri
                            );
                            contents = Rope::from_str(&change.text);
                        }
                    }
                }
            }

            let document = self.build(
                uri.clone(),
                current.path.clone(),
                contents,
                version,
                current.revision + 1,
            );
            // Replacing the Arc releases the previous tree once readers let go
            state.document = Arc::new(document);
            hook(&state.document);

            self.with_metrics(|m| m.documents_changed += 1);
            log::trace!(
                "Applied {} change(s) to {} (version {}, revision {})",
                changes.len(),
                uri,
                version,
                state.document.revision
            );
            return Ok(Arc::clone(&state.document));
        }
    }

    /// Close a document. Closing an untracked URI is a no-op.
    ///
    /// Returns whether the document was open.
    pub fn close(&self, uri: &Url) -> bool {
        self.close_with(uri, |_| {})
    }

    pub fn close_with<F>(&self, uri: &Url, hook: F) -> bool
    where
        F: FnOnce(&Url),
    {
        // The map lock is held for the whole close so a concurrent reopen of
        // the same URI runs its hook strictly after ours
        let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        let Some(slot) = documents.remove(uri) else {
            log::trace!("Close of untracked document {}", uri);
            return false;
        };
        let mut state = slot.lock();
        state.closed = true;
        hook(uri);
        drop(state);
        drop(documents);

        self.with_metrics(|m| m.documents_closed += 1);
        log::debug!("Closed {}", uri);
        true
    }

    /// Run `hook` for every open document while holding that document's
    /// lock, so it cannot interleave with a change to the same document
    pub fn for_each_with<F>(&self, mut hook: F)
    where
        F: FnMut(&Arc<Document>),
    {
        let slots: Vec<Arc<DocumentSlot>> = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for slot in slots {
            let state = slot.lock();
            if !state.closed {
                hook(&state.document);
            }
        }
    }

    pub fn get(&self, uri: &Url) -> Option<Arc<Document>> {
        let slot = self.slot(uri)?;
        let state = slot.lock();
        (!state.closed).then(|| Arc::clone(&state.document))
    }

    /// Snapshot of every open document, ordered by URI
    pub fn list(&self) -> Vec<Arc<Document>> {
        let slots: Vec<Arc<DocumentSlot>> = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        let mut documents: Vec<Arc<Document>> = slots
            .iter()
            .filter_map(|slot| {
                let state = slot.lock();
                (!state.closed).then(|| Arc::clone(&state.document))
            })
            .collect();
        documents.sort_by(|a, b| a.uri.cmp(&b.uri));
        documents
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(uri)
    }

    pub fn uris(&self) -> Vec<Url> {
        let mut uris: Vec<Url> = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        uris.sort();
        uris
    }

    pub fn len(&self) -> usize {
        self.documents.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> DocumentStoreMetrics {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn slot(&self, uri: &Url) -> Option<Arc<DocumentSlot>> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .cloned()
    }

    fn with_metrics(&self, f: impl FnOnce(&mut DocumentStoreMetrics)) {
        f(&mut self.metrics.lock().unwrap_or_else(PoisonError::into_inner));
    }

    fn build(&self, uri: Url, path: PathBuf, contents: Rope, version: i32, revision: u64) -> Document {
        let text = contents.to_string();
        let ParseOutput { tree, errors } = self.parser.parse(&text);
        let symbols = extract_symbols(&tree, &text);
        let diagnostics = self.diagnostics.diagnose(&uri, &tree, &errors);
        Document {
            uri,
            path,
            contents,
            version,
            revision,
            tree,
            syntax_errors: errors,
            symbols,
            diagnostics,
        }
    }
}

/// Apply one LSP content change to `contents`.
///
/// On an out-of-range position the rope is left untouched and the offending
/// position is returned.
fn apply_change_to_rope(contents: &mut Rope, change: &TextDocumentContentChangeEvent) -> Result<(), Position> {
    let Some(range) = change.range else {
        // Full document sync
        *contents = Rope::from_str(&change.text);
        return Ok(());
    };

    let start_idx = position_to_char(contents, range.start).ok_or(range.start)?;
    let end_idx = position_to_char(contents, range.end).ok_or(range.end)?;
    if end_idx < start_idx {
        return Err(range.end);
    }

    contents.remove(start_idx..end_idx);
    contents.insert(start_idx, &change.text);
    Ok(())
}

/// Char index of an LSP position, or `None` if it lies outside the content
fn position_to_char(contents: &Rope, position: Position) -> Option<usize> {
    let line = position.line as usize;
    if line >= contents.len_lines() {
        return None;
    }
    let line_text = contents.line(line).to_string();
    let offset = utf16_column_to_char_offset(trim_line_terminator(&line_text), position.character)?;
    Some(contents.line_to_char(line) + offset)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::SymbolKind;
    use crate::syntax::Point;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower_lsp::lsp_types::Range;

    fn uri(name: &str) -> Url {
        Url::parse(&format!("file:///project/{}", name)).unwrap()
    }

    fn insert(line: u32, character: u32, text: &str) -> TextDocumentContentChangeEvent {
        edit(line, character, line, character, text)
    }

    fn edit(sl: u32, sc: u32, el: u32, ec: u32, text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range: Some(Range::new(Position::new(sl, sc), Position::new(el, ec))),
            range_length: None,
            text: text.to_string(),
        }
    }

    fn full(text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: text.to_string(),
        }
    }

    fn store_with(edit_recovery: EditRecovery, version_policy: VersionPolicy) -> DocumentStore {
        DocumentStore::new(
            Arc::new(FrugalParser),
            Arc::new(SyntaxDiagnostics),
            DocumentStoreConfig {
                edit_recovery,
                version_policy,
            },
        )
    }

    #[test]
    fn test_open_and_get() {
        let store = DocumentStore::default();
        let u = uri("user.frugal");
        store.open(u.clone(), "struct User {}", 3).unwrap();

        let doc = store.get(&u).unwrap();
        assert_eq!(doc.text(), "struct User {}");
        assert_eq!(doc.version, 3);
        assert_eq!(doc.revision, 0);
        assert_eq!(doc.path, PathBuf::from("/project/user.frugal"));
        assert_eq!(doc.symbols.len(), 1);
        assert_eq!(doc.symbols[0].kind, SymbolKind::Struct);
        assert!(store.contains(&u));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_open_invalid_uri() {
        let store = DocumentStore::default();
        let u = Url::parse("untitled:Untitled-1").unwrap();
        assert_eq!(
            store.open(u.clone(), "", 1).unwrap_err(),
            WorkspaceError::InvalidUri(u.clone())
        );
        assert!(store.get(&u).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_reopen_replaces_document() {
        let store = DocumentStore::default();
        let u = uri("a.frugal");
        store.open(u.clone(), "struct A {}", 1).unwrap();
        store.open(u.clone(), "struct B {}", 1).unwrap();

        let doc = store.get(&u).unwrap();
        assert_eq!(doc.symbols[0].name, "B");
        assert_eq!(doc.revision, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_incremental_edits() {
        let store = DocumentStore::default();
        let u = uri("user.frugal");
        store
            .open(u.clone(), "struct User {\n    1: string name\n}", 1)
            .unwrap();

        let doc = store.apply_change(&u, vec![insert(1, 18, ",")], 2).unwrap();
        assert_eq!(doc.text(), "struct User {\n    1: string name,\n}");

        let doc = store
            .apply_change(&u, vec![insert(1, 19, "\n    2: i64 id")], 3)
            .unwrap();
        assert_eq!(doc.text(), "struct User {\n    1: string name,\n    2: i64 id\n}");
        assert_eq!(doc.version, 3);
        assert_eq!(doc.revision, 2);
        assert!(doc.syntax_errors.is_empty());
    }

    #[test]
    fn test_batch_edits_see_prior_edits() {
        let store = DocumentStore::default();
        let u = uri("a.frugal");
        store.open(u.clone(), "abc", 1).unwrap();

        let doc = store
            .apply_change(&u, vec![insert(0, 3, "\ndef"), edit(1, 0, 1, 3, "xyz")], 2)
            .unwrap();
        assert_eq!(doc.text(), "abc\nxyz");
    }

    #[test]
    fn test_full_replacement() {
        let store = DocumentStore::default();
        let u = uri("a.frugal");
        store.open(u.clone(), "struct A {}", 1).unwrap();
        let doc = store.apply_change(&u, vec![full("service S {}")], 2).unwrap();
        assert_eq!(doc.text(), "service S {}");
        assert_eq!(doc.symbols[0].kind, SymbolKind::Service);
    }

    #[test]
    fn test_utf16_edit_positions() {
        let store = DocumentStore::default();
        let u = uri("a.frugal");
        // '😀' is two UTF-16 code units
        store.open(u.clone(), "// 😀x\n", 1).unwrap();
        let doc = store.apply_change(&u, vec![edit(0, 5, 0, 6, "y")], 2).unwrap();
        assert_eq!(doc.text(), "// 😀y\n");
    }

    #[test]
    fn test_symbol_positions_match_edit_coordinates() {
        for eol in ["\n", "\r\n", "\r"] {
            let store = DocumentStore::default();
            let u = uri("a.frugal");
            let doc = store
                .open(u.clone(), &format!("struct A {{}}{}struct B {{}}", eol), 1)
                .unwrap();
            let b = doc.symbols[1].position;
            assert_eq!(b, Point::new(1, 7), "line break {:?}", eol);

            let doc = store
                .apply_change(&u, vec![edit(b.line, b.column, b.line, b.column + 1, "C")], 2)
                .unwrap();
            assert_eq!(doc.text(), format!("struct A {{}}{}struct C {{}}", eol));
            assert_eq!(doc.symbols[1].name, "C");
            assert_eq!(doc.symbols[1].position, b);
        }
    }

    #[test]
    fn test_unicode_line_separator_is_not_a_line_break() {
        let store = DocumentStore::default();
        let u = uri("a.frugal");
        let doc = store.open(u.clone(), "struct A {}\u{2028}struct B {}", 1).unwrap();
        let b = doc.symbols[1].position;
        assert_eq!(b, Point::new(0, 19));

        let doc = store
            .apply_change(&u, vec![edit(0, 19, 0, 20, "C")], 2)
            .unwrap();
        assert_eq!(doc.symbols[1].name, "C");
        assert_eq!(doc.symbols[1].position, b);
        assert!(matches!(
            store.apply_change(&u, vec![insert(1, 0, "x")], 3),
            Err(WorkspaceError::OutOfRangeEdit { .. })
        ));
    }

    #[test]
    fn test_change_unknown_document() {
        let store = DocumentStore::default();
        let u = uri("missing.frugal");
        assert_eq!(
            store.apply_change(&u, vec![full("x")], 1).unwrap_err(),
            WorkspaceError::UnknownDocument(u)
        );
    }

    #[test]
    fn test_out_of_range_edit_rejected() {
        let store = DocumentStore::default();
        let u = uri("a.frugal");
        store.open(u.clone(), "line0\nline1", 1).unwrap();

        // first edit is valid, second is past the end of line 1
        let err = store
            .apply_change(&u, vec![insert(0, 0, "x"), insert(1, 6, "y")], 2)
            .unwrap_err();
        assert_eq!(
            err,
            WorkspaceError::OutOfRangeEdit {
                uri: u.clone(),
                line: 1,
                character: 6
            }
        );

        let doc = store.get(&u).unwrap();
        assert_eq!(doc.text(), "line0\nline1");
        assert_eq!(doc.version, 1);
        assert_eq!(store.metrics().rejected_edits, 1);

        // line past the end and inverted ranges are out of range too
        assert!(store.apply_change(&u, vec![insert(2, 0, "z")], 3).is_err());
        assert!(store.apply_change(&u, vec![edit(0, 3, 0, 1, "z")], 3).is_err());
    }

    #[test]
    fn test_out_of_range_edit_replaces_document() {
        let store = store_with(EditRecovery::ReplaceDocument, VersionPolicy::LastWriteWins);
        let u = uri("a.frugal");
        store.open(u.clone(), "line0\nline1", 1).unwrap();

        let doc = store
            .apply_change(&u, vec![insert(9, 0, "struct A {}"), insert(0, 0, "// x\n")], 2)
            .unwrap();
        assert_eq!(doc.text(), "// x\nstruct A {}");
        assert_eq!(doc.version, 2);
    }

    #[test]
    fn test_stale_version_last_write_wins() {
        let store = DocumentStore::default();
        let u = uri("a.frugal");
        store.open(u.clone(), "a", 5).unwrap();
        let doc = store.apply_change(&u, vec![full("b")], 4).unwrap();
        assert_eq!(doc.text(), "b");
        assert_eq!(doc.version, 4);
        assert_eq!(store.metrics().stale_versions, 1);
    }

    #[test]
    fn test_stale_version_rejected() {
        let store = store_with(EditRecovery::Reject, VersionPolicy::RejectStale);
        let u = uri("a.frugal");
        store.open(u.clone(), "a", 5).unwrap();
        assert_eq!(
            store.apply_change(&u, vec![full("b")], 5).unwrap_err(),
            WorkspaceError::StaleVersion {
                uri: u.clone(),
                current: 5,
                received: 5
            }
        );
        assert_eq!(store.get(&u).unwrap().text(), "a");
        assert!(store.apply_change(&u, vec![full("b")], 6).is_ok());
    }

    #[test]
    fn test_close_is_idempotent() {
        let store = DocumentStore::default();
        let u = uri("a.frugal");
        store.open(u.clone(), "struct A {}", 1).unwrap();

        assert!(store.close(&u));
        assert!(store.get(&u).is_none());
        assert!(!store.close(&u));
        assert_eq!(store.metrics().documents_closed, 1);
        assert!(matches!(
            store.apply_change(&u, vec![full("x")], 2),
            Err(WorkspaceError::UnknownDocument(_))
        ));
    }

    #[test]
    fn test_list_is_snapshot() {
        let store = DocumentStore::default();
        store.open(uri("b.frugal"), "", 1).unwrap();
        store.open(uri("a.frugal"), "", 1).unwrap();

        let listed = store.list();
        store.close(&uri("a.frugal"));
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].uri, uri("a.frugal"));
        assert_eq!(store.uris(), vec![uri("b.frugal")]);
    }

    #[test]
    fn test_old_snapshot_survives_change() {
        let store = DocumentStore::default();
        let u = uri("a.frugal");
        let before = store.open(u.clone(), "struct A {}", 1).unwrap();
        store.apply_change(&u, vec![full("struct B {}")], 2).unwrap();
        assert_eq!(before.text(), "struct A {}");
        assert_eq!(before.symbols[0].name, "A");
    }

    #[test]
    fn test_syntax_errors_and_diagnostics() {
        let store = DocumentStore::default();
        let u = uri("a.frugal");
        let doc = store.open(u, "struct A {\n  1: string", 1).unwrap();
        assert!(!doc.syntax_errors.is_empty());
        assert_eq!(doc.diagnostics.len(), doc.syntax_errors.len());
    }

    struct CountingDiagnostics(AtomicUsize);

    impl DiagnosticsProvider for CountingDiagnostics {
        fn diagnose(&self, _uri: &Url, _tree: &SyntaxTree, _errors: &[SyntaxError]) -> Vec<Diagnostic> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Vec::new()
        }
    }

    #[test]
    fn test_injected_diagnostics_provider() {
        let provider = Arc::new(CountingDiagnostics(AtomicUsize::new(0)));
        let store = DocumentStore::new(
            Arc::new(FrugalParser),
            provider.clone(),
            DocumentStoreConfig::default(),
        );
        let u = uri("a.frugal");
        store.open(u.clone(), "struct {", 1).unwrap();
        store.apply_change(&u, vec![full("struct {{")], 2).unwrap();

        assert_eq!(provider.0.load(Ordering::SeqCst), 2);
        let doc = store.get(&u).unwrap();
        // syntax errors stay retrievable even when the provider reports nothing
        assert!(doc.diagnostics.is_empty());
        assert!(!doc.syntax_errors.is_empty());
    }

    #[test]
    fn test_hooks_run_with_new_document() {
        let store = DocumentStore::default();
        let u = uri("a.frugal");
        let mut seen = Vec::new();
        store
            .open_with(u.clone(), "a", 1, |doc| seen.push(doc.version))
            .unwrap();
        store
            .apply_change_with(&u, vec![full("b")], 2, |doc| seen.push(doc.version))
            .unwrap();
        store.close_with(&u, |_| seen.push(-1));
        store.close_with(&u, |_| seen.push(-2));
        assert_eq!(seen, vec![1, 2, -1]);
    }

    #[test]
    fn test_concurrent_edits() {
        let store = DocumentStore::default();
        let uris: Vec<Url> = (0..4).map(|i| uri(&format!("doc{}.frugal", i))).collect();
        for u in &uris {
            store.open(u.clone(), "", 0).unwrap();
        }

        std::thread::scope(|s| {
            for u in &uris {
                for _ in 0..2 {
                    let store = &store;
                    s.spawn(move || {
                        for _ in 0..50 {
                            let len = store.get(u).unwrap().contents.len_chars() as u32;
                            store.apply_change(u, vec![insert(0, len, "x")], 1).unwrap();
                            store.apply_change(u, vec![insert(0, 0, "y")], 1).unwrap();
                        }
                    });
                }
            }
        });

        for u in &uris {
            let doc = store.get(u).unwrap();
            // positions only ever lag behind a growing line, so no edit fails
            assert_eq!(doc.text().matches('y').count(), 100);
            assert_eq!(doc.text().matches('x').count(), 100);
            assert_eq!(doc.revision, 200);
        }
    }

    proptest! {
        #[test]
        fn prop_splice_matches_reference(
            text in "[a-z\n]{0,40}",
            sl in 0u32..6, sc in 0u32..12,
            el in 0u32..6, ec in 0u32..12,
            replacement in "[a-z\n]{0,8}",
        ) {
            let lines: Vec<&str> = text.split('\n').collect();
            let offset = |line: u32, col: u32| -> Option<usize> {
                let line = line as usize;
                let content = lines.get(line)?;
                if col as usize > content.len() {
                    return None;
                }
                Some(lines[..line].iter().map(|l| l.len() + 1).sum::<usize>() + col as usize)
            };
            let expected = match (offset(sl, sc), offset(el, ec)) {
                (Some(start), Some(end)) if start <= end => {
                    Some(format!("{}{}{}", &text[..start], replacement, &text[end..]))
                }
                _ => None,
            };

            let mut rope = Rope::from_str(&text);
            let result = apply_change_to_rope(&mut rope, &edit(sl, sc, el, ec, &replacement));
            match expected {
                Some(expected) => {
                    prop_assert!(result.is_ok());
                    prop_assert_eq!(rope.to_string(), expected);
                }
                None => {
                    prop_assert!(result.is_err());
                    prop_assert_eq!(rope.to_string(), text);
                }
            }
        }
    }
}
