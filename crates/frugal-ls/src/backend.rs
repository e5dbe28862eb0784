//
// backend.rs
//
// tower-lsp server driving the workspace core over stdio
//

use std::sync::Arc;

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::Client;
use tower_lsp::LanguageServer;
use tower_lsp::LspService;
use tower_lsp::Server;

use crate::config::WorkspaceConfig;
use crate::cross_file::uri_to_path;
use crate::document_store::Document;
use crate::handlers;
use crate::state::WorldState;
use crate::symbol_index::IndexStatistics;

pub struct Backend {
    client: Client,
    state: Arc<WorldState>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            state: Arc::new(WorldState::default()),
        }
    }

    pub fn state(&self) -> &WorldState {
        &self.state
    }

    async fn publish_diagnostics(&self, doc: &Document) {
        // A newer revision publishes its own diagnostics
        let current = self.state.get_document(&doc.uri).map(|d| d.revision);
        if current != Some(doc.revision) {
            log::trace!(
                "Skipping diagnostics for {}: revision changed (was {}, now {:?})",
                doc.uri,
                doc.revision,
                current
            );
            return;
        }

        self.client
            .publish_diagnostics(doc.uri.clone(), handlers::diagnostics(doc), Some(doc.version))
            .await;
    }

    /// Handle the frugal/indexStatistics request
    async fn handle_index_statistics(&self) -> Result<IndexStatistics> {
        let stats = self.state.index_statistics();
        log::debug!(
            "Index statistics: {} documents, {} symbols",
            stats.documents,
            stats.total_symbols
        );
        Ok(stats)
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        log::info!("Initializing frugal-ls");

        if let Some(config) = params
            .initialization_options
            .as_ref()
            .and_then(WorkspaceConfig::from_value)
        {
            self.state.apply_config(config);
        }

        let mut folders = Vec::new();
        if let Some(workspace_folders) = params.workspace_folders {
            for folder in workspace_folders {
                log::info!("Adding workspace folder: {}", folder.uri);
                folders.extend(uri_to_path(&folder.uri));
            }
        } else if let Some(root_uri) = params.root_uri {
            log::info!("Adding root URI as workspace folder: {}", root_uri);
            folders.extend(uri_to_path(&root_uri));
        }
        self.state.set_workspace_folders(folders);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                document_symbol_provider: Some(OneOf::Left(true)),
                workspace_symbol_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: String::from("frugal-ls"),
                version: Some(String::from(env!("CARGO_PKG_VERSION"))),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        log::info!(
            "frugal-ls initialized with include roots {:?}",
            self.state.include_roots()
        );
    }

    async fn shutdown(&self) -> Result<()> {
        log::info!("frugal-ls shutting down");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        match self
            .state
            .open_document(uri.clone(), &params.text_document.text, params.text_document.version)
        {
            Ok(doc) => self.publish_diagnostics(&doc).await,
            Err(e) => log::warn!("Failed to open {}: {}", uri, e),
        }
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        match self
            .state
            .change_document(&uri, params.content_changes, params.text_document.version)
        {
            Ok(doc) => self.publish_diagnostics(&doc).await,
            Err(e) => log::warn!("Failed to apply change to {}: {}", uri, e),
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        if self.state.close_document(&uri) {
            self.client.publish_diagnostics(uri, Vec::new(), None).await;
        }
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        log::trace!("Configuration changed");

        let Some(config) = WorkspaceConfig::from_settings(&params.settings) else {
            log::warn!("No valid frugal configuration in settings, keeping the current configuration");
            return;
        };
        self.state.apply_config(config);
    }

    async fn symbol(
        &self,
        params: WorkspaceSymbolParams,
    ) -> Result<Option<Vec<SymbolInformation>>> {
        Ok(Some(handlers::workspace_symbol(&self.state, &params.query)))
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        Ok(handlers::document_symbol(&self.state, &params.text_document.uri))
    }
}

pub async fn start_lsp() -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(Backend::new)
        .custom_method("frugal/indexStatistics", Backend::handle_index_statistics)
        .finish();
    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}
