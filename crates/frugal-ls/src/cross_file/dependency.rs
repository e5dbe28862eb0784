//
// cross_file/dependency.rs
//
// Include dependency graph
//

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use tower_lsp::lsp_types::Url;

use super::includes::extract_includes;
use super::path_resolve::IncludeResolver;
use crate::document_store::{Document, DocumentStore};
use crate::symbols::Symbol;

/// A resolved include: `from` includes `to`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub from: Url,
    pub to: Url,
    /// Include text as written (quotes stripped)
    pub include: String,
    /// 0-based line of the include directive
    pub line: u32,
}

#[derive(Debug, Default)]
struct GraphInner {
    /// Forward lookup: including URI -> edges to included documents
    forward: HashMap<Url, Vec<DependencyEdge>>,
    /// Reverse lookup: included URI -> edges from including documents
    backward: HashMap<Url, Vec<DependencyEdge>>,
    /// Resolved includes of every tracked document, as of its last update.
    /// Used to restore edges into a document that is removed and later
    /// updated again.
    declared: HashMap<Url, Vec<DependencyEdge>>,
}

/// Dependency graph derived from include directives.
///
/// The forward and backward maps are kept symmetric: an edge is present in
/// `forward[from]` iff it is present in `backward[to]`.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    inner: RwLock<GraphInner>,
    resolver: IncludeResolver,
}

impl DependencyGraph {
    pub fn new(resolver: IncludeResolver) -> Self {
        Self {
            inner: RwLock::new(GraphInner::default()),
            resolver,
        }
    }

    pub fn resolver(&self) -> &IncludeResolver {
        &self.resolver
    }

    pub fn set_workspace_roots(&self, roots: Vec<PathBuf>) {
        self.resolver.set_workspace_roots(roots);
    }

    /// Replace the edges owned by `doc` with the ones derived from its
    /// current includes
    pub fn update_document(&self, doc: &Document) {
        let text = doc.text();
        let mut edges: Vec<DependencyEdge> = Vec::new();
        for directive in extract_includes(&doc.tree, &text) {
            let Some(to) = self.resolver.resolve(&doc.uri, &directive.target) else {
                continue;
            };
            if edges.iter().any(|e| e.to == to) {
                log::trace!("Skipping duplicate include of {} in {}", to, doc.uri);
                continue;
            }
            edges.push(DependencyEdge {
                from: doc.uri.clone(),
                to,
                include: directive.target,
                line: directive.line,
            });
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.remove_forward_edges(&doc.uri);
        for edge in &edges {
            inner.add_edge(edge.clone());
        }
        inner.declared.insert(doc.uri.clone(), edges);
        inner.restore_edges_into(&doc.uri);

        log::debug!(
            "Updated dependencies of {}: {} includes, {} dependents",
            doc.uri,
            inner.forward.get(&doc.uri).map_or(0, Vec::len),
            inner.backward.get(&doc.uri).map_or(0, Vec::len)
        );
    }

    /// Remove every edge touching `uri`. Removing an unknown URI is a no-op.
    pub fn remove_document(&self, uri: &Url) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        // Where this document is the includer
        inner.remove_forward_edges(uri);
        // Where this document is included
        inner.remove_backward_edges(uri);
        inner.declared.remove(uri);
    }

    /// URIs included by `uri`, in include order
    pub fn get_dependencies(&self, uri: &Url) -> Vec<Url> {
        self.get_dependency_edges(uri).into_iter().map(|e| e.to).collect()
    }

    /// URIs that include `uri`
    pub fn get_dependents(&self, uri: &Url) -> Vec<Url> {
        self.get_dependent_edges(uri).into_iter().map(|e| e.from).collect()
    }

    pub fn get_dependency_edges(&self, uri: &Url) -> Vec<DependencyEdge> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.forward.get(uri).cloned().unwrap_or_default()
    }

    pub fn get_dependent_edges(&self, uri: &Url) -> Vec<DependencyEdge> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.backward.get(uri).cloned().unwrap_or_default()
    }

    /// Whether `from` is reachable from `to` over forward edges, i.e.
    /// whether an edge `from -> to` closes a cycle. `to` itself counts, so
    /// `has_circular_dependency(a, a)` is true.
    pub fn has_circular_dependency(&self, from: &Url, to: &Url) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut visited = HashSet::new();
        inner.reaches(to, from, &mut visited)
    }

    /// Symbols of `doc` and of every document it includes directly or
    /// indirectly, in depth-first pre-order.
    ///
    /// Included documents that are not open contribute no symbols.
    pub fn collect_symbols_transitive(&self, doc: &Document, store: &DocumentStore) -> Vec<(Url, Symbol)> {
        // The graph lock is released before the store is queried
        let order = {
            let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            let mut order = Vec::new();
            let mut visited = HashSet::new();
            inner.preorder(&doc.uri, &mut visited, &mut order);
            order
        };

        let mut symbols = Vec::new();
        for uri in order {
            if uri == doc.uri {
                symbols.extend(doc.symbols.iter().map(|s| (uri.clone(), s.clone())));
            } else if let Some(included) = store.get(&uri) {
                symbols.extend(included.symbols.iter().map(|s| (uri.clone(), s.clone())));
            } else {
                log::trace!("Included document {} is not open, no symbols collected", uri);
            }
        }
        symbols
    }

    #[cfg(test)]
    fn is_symmetric(&self) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let forward_ok = inner.forward.iter().all(|(from, edges)| {
            edges.iter().all(|e| {
                &e.from == from
                    && inner
                        .backward
                        .get(&e.to)
                        .is_some_and(|back| back.iter().any(|b| &b.from == from))
            })
        });
        let backward_ok = inner.backward.iter().all(|(to, edges)| {
            edges.iter().all(|e| {
                &e.to == to
                    && inner
                        .forward
                        .get(&e.from)
                        .is_some_and(|fwd| fwd.iter().any(|f| &f.to == to))
            })
        });
        forward_ok && backward_ok
    }
}

impl GraphInner {
    fn add_edge(&mut self, edge: DependencyEdge) {
        log::trace!("Adding edge: {} -> {} (line {})", edge.from, edge.to, edge.line);
        self.backward.entry(edge.to.clone()).or_default().push(edge.clone());
        self.forward.entry(edge.from.clone()).or_default().push(edge);
    }

    fn remove_forward_edges(&mut self, uri: &Url) {
        if let Some(edges) = self.forward.remove(uri) {
            log::trace!("Removing {} forward edges from {}", edges.len(), uri);
            for edge in edges {
                if let Some(backward_edges) = self.backward.get_mut(&edge.to) {
                    backward_edges.retain(|e| &e.from != uri);
                    if backward_edges.is_empty() {
                        self.backward.remove(&edge.to);
                    }
                }
            }
        }
    }

    fn remove_backward_edges(&mut self, uri: &Url) {
        if let Some(edges) = self.backward.remove(uri) {
            log::trace!("Removing {} backward edges to {}", edges.len(), uri);
            for edge in edges {
                if let Some(forward_edges) = self.forward.get_mut(&edge.from) {
                    forward_edges.retain(|e| &e.to != uri);
                    if forward_edges.is_empty() {
                        self.forward.remove(&edge.from);
                    }
                }
            }
        }
    }

    /// Re-add edges from tracked documents whose includes still resolve to
    /// `uri` but whose edge was dropped when `uri` was removed
    fn restore_edges_into(&mut self, uri: &Url) {
        let missing: Vec<DependencyEdge> = self
            .declared
            .iter()
            .filter(|(from, _)| *from != uri)
            .flat_map(move |(_, edges)| edges.iter().filter(move |e| &e.to == uri))
            .filter(|edge| {
                !self
                    .forward
                    .get(&edge.from)
                    .is_some_and(|fwd| fwd.iter().any(|f| &f.to == uri))
            })
            .cloned()
            .collect();
        for edge in missing {
            log::trace!("Restoring edge {} -> {}", edge.from, edge.to);
            self.add_edge(edge);
        }
    }

    /// Depth-first search from `current` looking for `target`
    fn reaches(&self, current: &Url, target: &Url, visited: &mut HashSet<Url>) -> bool {
        if current == target {
            return true;
        }
        if !visited.insert(current.clone()) {
            return false;
        }
        self.forward
            .get(current)
            .into_iter()
            .flatten()
            .any(|edge| self.reaches(&edge.to, target, visited))
    }

    fn preorder(&self, uri: &Url, visited: &mut HashSet<Url>, order: &mut Vec<Url>) {
        if !visited.insert(uri.clone()) {
            return;
        }
        order.push(uri.clone());
        for edge in self.forward.get(uri).into_iter().flatten() {
            self.preorder(&edge.to, visited, order);
        }
    }
}
