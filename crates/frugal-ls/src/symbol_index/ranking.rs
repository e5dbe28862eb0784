//
// symbol_index/ranking.rs
//
// Relevance scoring for symbol search
//

use std::sync::Arc;

use indexmap::IndexMap;
use tower_lsp::lsp_types::Url;

use super::IndexedSymbol;
use crate::symbols::SymbolKind;

pub const EXACT_MATCH_SCORE: i32 = 1000;
pub const EXACT_CASE_BONUS: i32 = 100;
pub const PREFIX_MATCH_SCORE: i32 = 500;
pub const PREFIX_CASE_BONUS: i32 = 50;
pub const SUBSTRING_MATCH_SCORE: i32 = 250;
pub const CONTAINER_MATCH_SCORE: i32 = 100;

/// De-duplication key: (document, qualified name, kind)
pub type MatchKey = (Url, String, SymbolKind);

/// Insertion-ordered, de-duplicated search matches
pub type Matches = IndexMap<MatchKey, Arc<IndexedSymbol>>;

pub fn kind_bonus(kind: SymbolKind) -> i32 {
    match kind {
        SymbolKind::Service | SymbolKind::Struct | SymbolKind::Enum => 50,
        SymbolKind::Method => 30,
        SymbolKind::Const | SymbolKind::Typedef => 20,
        SymbolKind::Field | SymbolKind::Event | SymbolKind::EnumValue => 10,
        _ => 0,
    }
}

/// Relevance of `symbol` for `query` (higher is better).
///
/// `query_lower` is the lower-cased query. The match tier is the first of
/// exact name, name prefix, name substring and container substring that
/// applies; the kind bonus is added on top.
pub fn score(symbol: &IndexedSymbol, query: &str, query_lower: &str) -> i32 {
    let name = symbol.symbol.name.as_str();
    let name_lower = name.to_lowercase();

    let tier = if name_lower == query_lower {
        EXACT_MATCH_SCORE + if name == query { EXACT_CASE_BONUS } else { 0 }
    } else if name_lower.starts_with(query_lower) {
        PREFIX_MATCH_SCORE + if name.starts_with(query) { PREFIX_CASE_BONUS } else { 0 }
    } else if name_lower.contains(query_lower) {
        SUBSTRING_MATCH_SCORE
    } else if symbol.container.to_lowercase().contains(query_lower) {
        CONTAINER_MATCH_SCORE
    } else {
        0
    };
    tier + kind_bonus(symbol.symbol.kind)
}

pub fn match_key(symbol: &IndexedSymbol) -> MatchKey {
    (symbol.uri.clone(), symbol.qualified_name.clone(), symbol.symbol.kind)
}

/// Add `symbol` unless an equal key was already matched
pub fn push_match(matches: &mut Matches, symbol: &Arc<IndexedSymbol>) {
    matches
        .entry(match_key(symbol))
        .or_insert_with(|| Arc::clone(symbol));
}

/// Sort matches by descending score and truncate to `limit` (0 = unlimited).
/// The sort is stable, so ties keep encounter order.
pub fn rank(matches: Matches, query: &str, limit: usize) -> Vec<Arc<IndexedSymbol>> {
    let query_lower = query.to_lowercase();
    let mut scored: Vec<(i32, Arc<IndexedSymbol>)> = matches
        .into_values()
        .map(|symbol| (score(&symbol, query, &query_lower), symbol))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    truncate(scored.into_iter().map(|(_, symbol)| symbol).collect(), limit)
}

/// Order by (kind, name), as used for empty queries
pub fn sort_by_kind_and_name(symbols: &mut [Arc<IndexedSymbol>]) {
    symbols.sort_by(|a, b| {
        a.symbol
            .kind
            .cmp(&b.symbol.kind)
            .then_with(|| a.symbol.name.cmp(&b.symbol.name))
    });
}

pub fn truncate(mut symbols: Vec<Arc<IndexedSymbol>>, limit: usize) -> Vec<Arc<IndexedSymbol>> {
    if limit > 0 {
        symbols.truncate(limit);
    }
    symbols
}
