//
// state.rs
//
// Protocol-agnostic workspace state shared by every request handler
//

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use tower_lsp::lsp_types::{TextDocumentContentChangeEvent, Url};

use crate::config::WorkspaceConfig;
use crate::cross_file::{DependencyGraph, IncludeResolver};
use crate::diagnostics::{DiagnosticsProvider, SyntaxDiagnostics};
use crate::document_store::{Document, DocumentStore, DocumentStoreConfig};
use crate::error::WorkspaceResult;
use crate::parser::{FrugalParser, IdlParser};
use crate::symbol_index::{IndexStatistics, IndexedSymbol, SymbolIndex};
use crate::symbols::Symbol;

/// Global workspace state.
///
/// Every lifecycle event updates the document store, then the dependency
/// graph, then the symbol index. The graph and index updates run inside the
/// store's per-document lock, so once a call returns all three agree on the
/// document, and changes to one document reach them in arrival order.
pub struct WorldState {
    pub document_store: DocumentStore,
    pub dependency_graph: DependencyGraph,
    pub symbol_index: SymbolIndex,
    config: RwLock<WorkspaceConfig>,
    /// LSP workspace folders, appended to the configured include roots
    workspace_folders: RwLock<Vec<PathBuf>>,
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new(WorkspaceConfig::default())
    }
}

impl WorldState {
    pub fn new(config: WorkspaceConfig) -> Self {
        Self::with_collaborators(config, Arc::new(FrugalParser), Arc::new(SyntaxDiagnostics))
    }

    pub fn with_collaborators(
        config: WorkspaceConfig,
        parser: Arc<dyn IdlParser>,
        diagnostics: Arc<dyn DiagnosticsProvider>,
    ) -> Self {
        log::info!("Initializing workspace configuration:");
        log::info!("  workspace_roots: {:?}", config.workspace_roots);
        log::info!("  edit_recovery: {:?}", config.edit_recovery);
        log::info!("  version_policy: {:?}", config.version_policy);
        log::info!("  max_workspace_symbols: {}", config.max_workspace_symbols);
        log::info!("  include_cache_capacity: {}", config.include_cache_capacity);

        let resolver = IncludeResolver::new(config.workspace_roots.clone(), config.include_cache_capacity);
        Self {
            document_store: DocumentStore::new(parser, diagnostics, DocumentStoreConfig::from(&config)),
            dependency_graph: DependencyGraph::new(resolver),
            symbol_index: SymbolIndex::new(),
            config: RwLock::new(config),
            workspace_folders: RwLock::new(Vec::new()),
        }
    }

    pub fn config(&self) -> WorkspaceConfig {
        self.config.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the configuration. A change to the include roots re-resolves
    /// the includes of every open document.
    pub fn apply_config(&self, config: WorkspaceConfig) {
        let previous = {
            let mut current = self.config.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, config.clone())
        };
        self.document_store.set_config(DocumentStoreConfig::from(&config));

        if previous.resolution_settings_changed(&config) {
            log::debug!("Include resolution settings changed");
            self.dependency_graph
                .resolver()
                .set_cache_capacity(config.include_cache_capacity);
            if previous.workspace_roots != config.workspace_roots {
                self.refresh_include_roots();
            }
        }
        log::info!("Applied configuration update: {:?}", config);
    }

    /// Record the LSP workspace folders used as additional include roots
    pub fn set_workspace_folders(&self, folders: Vec<PathBuf>) {
        *self.workspace_folders.write().unwrap_or_else(PoisonError::into_inner) = folders;
        self.refresh_include_roots();
    }

    /// Configured roots followed by the workspace folders
    pub fn include_roots(&self) -> Vec<PathBuf> {
        let mut roots = self.config().workspace_roots;
        for folder in self.workspace_folders.read().unwrap_or_else(PoisonError::into_inner).iter() {
            if !roots.contains(folder) {
                roots.push(folder.clone());
            }
        }
        roots
    }

    fn refresh_include_roots(&self) {
        self.dependency_graph.set_workspace_roots(self.include_roots());
        self.document_store
            .for_each_with(|doc| self.dependency_graph.update_document(doc));
    }

    pub fn open_document(&self, uri: Url, text: &str, version: i32) -> WorkspaceResult<Arc<Document>> {
        self.document_store.open_with(uri, text, version, |doc| {
            self.dependency_graph.update_document(doc);
            self.symbol_index.update_document(doc);
        })
    }

    pub fn change_document(
        &self,
        uri: &Url,
        changes: Vec<TextDocumentContentChangeEvent>,
        version: i32,
    ) -> WorkspaceResult<Arc<Document>> {
        self.document_store.apply_change_with(uri, changes, version, |doc| {
            self.dependency_graph.update_document(doc);
            self.symbol_index.update_document(doc);
        })
    }

    /// Close a document. Returns whether it was open.
    pub fn close_document(&self, uri: &Url) -> bool {
        self.document_store.close_with(uri, |uri| {
            self.dependency_graph.remove_document(uri);
            self.symbol_index.remove_document(uri);
        })
    }

    pub fn get_document(&self, uri: &Url) -> Option<Arc<Document>> {
        self.document_store.get(uri)
    }

    pub fn list_documents(&self) -> Vec<Arc<Document>> {
        self.document_store.list()
    }

    pub fn workspace_symbol_search(&self, query: &str, limit: usize) -> Vec<Arc<IndexedSymbol>> {
        self.symbol_index.search(query, limit)
    }

    pub fn document_symbols(&self, uri: &Url) -> Vec<Arc<IndexedSymbol>> {
        self.symbol_index.symbols_for_document(uri)
    }

    pub fn index_statistics(&self) -> IndexStatistics {
        self.symbol_index.get_statistics()
    }

    /// Symbols visible from `uri` through its includes, including its own
    pub fn transitive_symbols(&self, uri: &Url) -> Vec<(Url, Symbol)> {
        match self.document_store.get(uri) {
            Some(doc) => self
                .dependency_graph
                .collect_symbols_transitive(&doc, &self.document_store),
            None => Vec::new(),
        }
    }
}
