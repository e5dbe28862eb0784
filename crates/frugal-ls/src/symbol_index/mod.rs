//
// symbol_index/mod.rs
//
// Workspace-wide symbol index with ranked search
//

pub mod nested;
pub mod ranking;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tower_lsp::lsp_types::Url;

use crate::document_store::Document;
use crate::symbols::{Symbol, SymbolKind};
use nested::extract_members;
use ranking::{push_match, rank, sort_by_kind_and_name, truncate, Matches};

/// A symbol plus the metadata needed to find it across documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedSymbol {
    pub symbol: Symbol,
    /// Owning document
    pub uri: Url,
    /// Name of the enclosing declaration, empty for top-level symbols
    pub container: String,
    /// `container.name`, or the bare name for top-level symbols
    pub qualified_name: String,
}

impl IndexedSymbol {
    pub fn new(symbol: Symbol, uri: Url, container: String) -> Self {
        let qualified_name = if container.is_empty() {
            symbol.name.clone()
        } else {
            format!("{}.{}", container, symbol.name)
        };
        Self {
            symbol,
            uri,
            container,
            qualified_name,
        }
    }

    pub fn name(&self) -> &str {
        &self.symbol.name
    }

    pub fn kind(&self) -> SymbolKind {
        self.symbol.kind
    }
}

/// Index counters, exposed over LSP for observability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatistics {
    pub documents: usize,
    pub total_symbols: usize,
    pub by_kind: BTreeMap<SymbolKind, usize>,
    /// Distinct lower-cased names
    pub name_buckets: usize,
    /// Distinct lower-cased container names
    pub container_buckets: usize,
}

type SymbolRef = Arc<IndexedSymbol>;

#[derive(Debug, Default)]
struct IndexInner {
    /// Primary map: document -> its symbols in extraction order
    by_document: BTreeMap<Url, Vec<SymbolRef>>,
    /// Lower-cased name -> symbols
    by_name: BTreeMap<String, Vec<SymbolRef>>,
    by_kind: BTreeMap<SymbolKind, Vec<SymbolRef>>,
    /// Lower-cased container name -> nested symbols
    by_container: BTreeMap<String, Vec<SymbolRef>>,
}

/// Symbol index over every open document.
///
/// Entries are shared between the primary map and the inverted indices.
/// The maps are ordered so that search results, and ties in particular,
/// come out in a deterministic order.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    inner: RwLock<IndexInner>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entries of `doc` with its current top-level symbols and
    /// their nested members
    pub fn update_document(&self, doc: &Document) {
        let text = doc.text();
        let mut entries: Vec<SymbolRef> = Vec::new();
        for symbol in &doc.symbols {
            entries.push(Arc::new(IndexedSymbol::new(
                symbol.clone(),
                doc.uri.clone(),
                String::new(),
            )));
            for member in extract_members(&doc.tree, &text, symbol) {
                entries.push(Arc::new(IndexedSymbol::new(
                    member,
                    doc.uri.clone(),
                    symbol.name.clone(),
                )));
            }
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.purge(&doc.uri);
        for entry in &entries {
            inner.insert(entry);
        }
        log::debug!("Indexed {} symbols for {}", entries.len(), doc.uri);
        inner.by_document.insert(doc.uri.clone(), entries);
    }

    /// Drop every entry of `uri`. Removing an unknown URI is a no-op.
    pub fn remove_document(&self, uri: &Url) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.purge(uri) {
            log::debug!("Removed {} from the symbol index", uri);
        }
    }

    /// Ranked fuzzy search over every indexed symbol (`limit` 0 = unlimited).
    ///
    /// An empty query lists every symbol ordered by (kind, name).
    pub fn search(&self, query: &str, limit: usize) -> Vec<Arc<IndexedSymbol>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        if query.is_empty() {
            let mut all: Vec<SymbolRef> = inner.by_document.values().flatten().cloned().collect();
            sort_by_kind_and_name(&mut all);
            return truncate(all, limit);
        }

        let query_lower = query.to_lowercase();
        let mut matches = Matches::new();

        // 1. exact name
        if let Some(bucket) = inner.by_name.get(&query_lower) {
            bucket.iter().for_each(|s| push_match(&mut matches, s));
        }
        // 2. name prefix, not exact
        for (name, bucket) in inner.by_name.range(query_lower.clone()..) {
            if !name.starts_with(&query_lower) {
                break;
            }
            if *name != query_lower {
                bucket.iter().for_each(|s| push_match(&mut matches, s));
            }
        }
        // 3. name substring, not prefix
        for (name, bucket) in &inner.by_name {
            if !name.starts_with(&query_lower) && name.contains(&query_lower) {
                bucket.iter().for_each(|s| push_match(&mut matches, s));
            }
        }
        // 4. container substring
        for (container, bucket) in &inner.by_container {
            if container.contains(&query_lower) {
                bucket.iter().for_each(|s| push_match(&mut matches, s));
            }
        }

        log::trace!("Search '{}' matched {} symbols", query, matches.len());
        rank(matches, query, limit)
    }

    /// Search restricted to the given kinds. The query filters on name or
    /// container substring (case-insensitive); an empty query keeps every
    /// symbol of those kinds, ordered by (kind, name).
    pub fn search_by_type(&self, kinds: &[SymbolKind], query: &str, limit: usize) -> Vec<Arc<IndexedSymbol>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let kinds: BTreeSet<SymbolKind> = kinds.iter().copied().collect();
        let pool = kinds
            .iter()
            .filter_map(|kind| inner.by_kind.get(kind))
            .flatten();

        if query.is_empty() {
            let mut all: Vec<SymbolRef> = pool.cloned().collect();
            sort_by_kind_and_name(&mut all);
            return truncate(all, limit);
        }

        let query_lower = query.to_lowercase();
        let mut matches = Matches::new();
        for symbol in pool {
            if symbol.symbol.name.to_lowercase().contains(&query_lower)
                || symbol.container.to_lowercase().contains(&query_lower)
            {
                push_match(&mut matches, symbol);
            }
        }
        rank(matches, query, limit)
    }

    /// Indexed symbols of one document in extraction order
    pub fn symbols_for_document(&self, uri: &Url) -> Vec<Arc<IndexedSymbol>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.by_document.get(uri).cloned().unwrap_or_default()
    }

    pub fn get_statistics(&self) -> IndexStatistics {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        IndexStatistics {
            documents: inner.by_document.len(),
            total_symbols: inner.by_document.values().map(Vec::len).sum(),
            by_kind: inner
                .by_kind
                .iter()
                .map(|(kind, bucket)| (*kind, bucket.len()))
                .collect(),
            name_buckets: inner.by_name.len(),
            container_buckets: inner.by_container.len(),
        }
    }
}

impl IndexInner {
    fn insert(&mut self, entry: &SymbolRef) {
        self.by_name
            .entry(entry.symbol.name.to_lowercase())
            .or_default()
            .push(Arc::clone(entry));
        self.by_kind
            .entry(entry.symbol.kind)
            .or_default()
            .push(Arc::clone(entry));
        if !entry.container.is_empty() {
            self.by_container
                .entry(entry.container.to_lowercase())
                .or_default()
                .push(Arc::clone(entry));
        }
    }

    /// Remove `uri` from the primary map and every inverted index. Returns
    /// whether anything was indexed for it.
    fn purge(&mut self, uri: &Url) -> bool {
        let Some(entries) = self.by_document.remove(uri) else {
            return false;
        };
        for entry in &entries {
            retain_other_documents(&mut self.by_name, entry.symbol.name.to_lowercase(), uri);
            retain_other_documents(&mut self.by_kind, entry.symbol.kind, uri);
            if !entry.container.is_empty() {
                retain_other_documents(&mut self.by_container, entry.container.to_lowercase(), uri);
            }
        }
        true
    }
}

/// Drop the entries of `uri` from one bucket, removing the bucket if it
/// becomes empty
fn retain_other_documents<K: Ord>(map: &mut BTreeMap<K, Vec<SymbolRef>>, key: K, uri: &Url) {
    if let Some(bucket) = map.get_mut(&key) {
        bucket.retain(|s| &s.uri != uri);
        if bucket.is_empty() {
            map.remove(&key);
        }
    }
}
