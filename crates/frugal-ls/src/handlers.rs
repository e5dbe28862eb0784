//
// handlers.rs
//
// Read-only LSP feature handlers over the workspace state
//

use tower_lsp::lsp_types::{
    Diagnostic, DocumentSymbolResponse, Location, Position, Range, SymbolInformation, SymbolKind as LspSymbolKind, Url,
};

use crate::document_store::Document;
use crate::state::WorldState;
use crate::symbol_index::IndexedSymbol;
use crate::symbols::SymbolKind;
use crate::utf16::utf16_len;

// ============================================================================
// Symbols
// ============================================================================

pub fn workspace_symbol(state: &WorldState, query: &str) -> Vec<SymbolInformation> {
    let limit = state.config().max_workspace_symbols;
    state
        .workspace_symbol_search(query, limit)
        .iter()
        .map(|symbol| to_symbol_information(symbol))
        .collect()
}

pub fn document_symbol(state: &WorldState, uri: &Url) -> Option<DocumentSymbolResponse> {
    state.get_document(uri)?;
    let symbols = state
        .document_symbols(uri)
        .iter()
        .map(|symbol| to_symbol_information(symbol))
        .collect();
    Some(DocumentSymbolResponse::Flat(symbols))
}

#[allow(deprecated)]
pub fn to_symbol_information(symbol: &IndexedSymbol) -> SymbolInformation {
    SymbolInformation {
        name: symbol.name().to_string(),
        kind: lsp_symbol_kind(symbol.kind()),
        tags: None,
        deprecated: None,
        location: Location {
            uri: symbol.uri.clone(),
            range: name_range(symbol),
        },
        container_name: (!symbol.container.is_empty()).then(|| symbol.container.clone()),
    }
}

/// Range covering the symbol's name as written (an include's name is its
/// path, written between quotes)
fn name_range(symbol: &IndexedSymbol) -> Range {
    let start = symbol.symbol.position;
    let mut width = utf16_len(&symbol.symbol.name) as u32;
    if symbol.kind() == SymbolKind::Include {
        width += 2;
    }
    Range::new(
        Position::new(start.line, start.column),
        Position::new(start.line, start.column + width),
    )
}

pub fn lsp_symbol_kind(kind: SymbolKind) -> LspSymbolKind {
    match kind {
        SymbolKind::Service => LspSymbolKind::INTERFACE,
        SymbolKind::Struct | SymbolKind::Union => LspSymbolKind::STRUCT,
        SymbolKind::Exception => LspSymbolKind::CLASS,
        SymbolKind::Enum => LspSymbolKind::ENUM,
        SymbolKind::Const => LspSymbolKind::CONSTANT,
        SymbolKind::Typedef => LspSymbolKind::TYPE_PARAMETER,
        SymbolKind::Namespace => LspSymbolKind::NAMESPACE,
        SymbolKind::Include => LspSymbolKind::FILE,
        SymbolKind::Scope => LspSymbolKind::MODULE,
        SymbolKind::Method => LspSymbolKind::METHOD,
        SymbolKind::Field => LspSymbolKind::FIELD,
        SymbolKind::Event => LspSymbolKind::EVENT,
        SymbolKind::EnumValue => LspSymbolKind::ENUM_MEMBER,
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Diagnostics to publish for a document snapshot
pub fn diagnostics(doc: &Document) -> Vec<Diagnostic> {
    doc.diagnostics.clone()
}
