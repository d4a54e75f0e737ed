//! Source-document position lookup for Schematron locations.
//!
//! SVRL reports point back into the validated document with absolute
//! XPath location paths whose element steps use Clark-notation qualified
//! names (`Q{namespace-uri}localname`) and positional predicates, e.g.
//! `/Q{http://www.tei-c.org/ns/1.0}TEI[1]/Q{...}text[1]/Q{...}body[1]`.
//! [`LocationResolver`] loads each referenced document once, keeps a
//! position-annotated index of its element tree, and walks the location
//! path against that index to recover a 1-based line/column.
//!
//! The index is an owned tree built from the `roxmltree` parse, so cached
//! documents carry no borrows into the source text and live for the whole
//! run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{ReportError, Result};

pub const SVRL_NS: &str = "http://purl.oclc.org/dsdl/svrl";
pub const TEI_NS: &str = "http://www.tei-c.org/ns/1.0";
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Prefixes the location-path evaluator understands.
const NAMESPACE_BINDINGS: &[(&str, &str)] = &[("svrl", SVRL_NS), ("tei", TEI_NS), ("xml", XML_NS)];

fn lookup_prefix(prefix: &str) -> Option<&'static str> {
    NAMESPACE_BINDINGS
        .iter()
        .find(|(bound, _)| *bound == prefix)
        .map(|(_, uri)| *uri)
}

/// Rewrite the Clark-notation TEI namespace to its bound prefix so the
/// rewritten path reads (and evaluates) as `tei:localname` steps.
pub fn rewrite_clark_tei(expr: &str) -> String {
    expr.replace("Q{http://www.tei-c.org/ns/1.0}", "tei:")
}

/// 1-based position of a node in its source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

/// One element of the position index. Attribute names are recorded so
/// that trailing attribute steps can be checked for existence; attribute
/// positions fall back to the owning element's start tag.
#[derive(Debug)]
struct ElementIndex {
    namespace: Option<String>,
    local_name: String,
    position: Position,
    attributes: Vec<(Option<String>, String)>,
    children: Vec<ElementIndex>,
}

impl ElementIndex {
    fn from_node(node: roxmltree::Node, doc: &roxmltree::Document) -> Self {
        let pos = doc.text_pos_at(node.range().start);
        Self {
            namespace: node.tag_name().namespace().map(str::to_string),
            local_name: node.tag_name().name().to_string(),
            position: Position {
                line: pos.row,
                column: pos.col,
            },
            attributes: node
                .attributes()
                .map(|a| {
                    (
                        a.namespace().map(str::to_string),
                        a.name().to_string(),
                    )
                })
                .collect(),
            children: node
                .children()
                .filter(|c| c.is_element())
                .map(|c| ElementIndex::from_node(c, doc))
                .collect(),
        }
    }

    fn matches(&self, step: &Step) -> bool {
        self.local_name == step.local_name && self.namespace.as_deref() == step.namespace.as_deref()
    }

    fn has_attribute(&self, step: &Step) -> bool {
        self.attributes.iter().any(|(ns, local)| {
            *local == step.local_name && ns.as_deref() == step.namespace.as_deref()
        })
    }
}

/// Position-annotated element tree of one parsed document.
#[derive(Debug)]
pub struct DocumentIndex {
    root: ElementIndex,
}

impl DocumentIndex {
    /// Parse a document with position tracking. DTDs are tolerated since
    /// TEI sources occasionally carry one.
    pub fn parse(text: &str) -> std::result::Result<Self, roxmltree::Error> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let doc = roxmltree::Document::parse_with_options(text, options)?;
        Ok(Self {
            root: ElementIndex::from_node(doc.root_element(), &doc),
        })
    }

    /// Evaluate an absolute location path and return the position of the
    /// first matching node, or `None` when nothing matches. Both
    /// `Q{uri}local` and registered `prefix:local` step forms are
    /// accepted; unknown prefixes and malformed paths count as misses.
    pub fn resolve(&self, expr: &str) -> Option<Position> {
        let steps = parse_location_path(expr)?;
        let mut steps = steps.iter();

        // The leading step addresses the document's single root element.
        let first = steps.next()?;
        if first.attribute || first.index != 1 || !self.root.matches(first) {
            return None;
        }

        let mut current = &self.root;
        for step in steps {
            if step.attribute {
                // Attribute steps are only generated as the final step;
                // resolve to the owning element's start tag.
                if current.has_attribute(step) {
                    return Some(current.position);
                }
                return None;
            }
            current = current
                .children
                .iter()
                .filter(|child| child.matches(step))
                .nth(step.index.checked_sub(1)?)?;
        }
        Some(current.position)
    }
}

/// One step of an absolute location path.
#[derive(Debug, PartialEq)]
struct Step {
    namespace: Option<String>,
    local_name: String,
    /// 1-based position among the siblings selected by this step.
    index: usize,
    attribute: bool,
}

/// Split an absolute path into its step strings. Slashes inside Clark
/// braces belong to the namespace URI, not the path.
fn split_steps(expr: &str) -> Option<Vec<&str>> {
    let rest = expr.strip_prefix('/')?;
    let mut steps = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in rest.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.checked_sub(1)?,
            '/' if depth == 0 => {
                steps.push(&rest[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    steps.push(&rest[start..]);
    if steps.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(steps)
}

fn parse_step(raw: &str, is_last: bool) -> Option<Step> {
    let (attribute, rest) = match raw.strip_prefix('@') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    if attribute && !is_last {
        return None;
    }

    let (name, index) = match rest.find('[') {
        Some(open) => {
            let predicate = rest[open..].strip_prefix('[')?.strip_suffix(']')?;
            (&rest[..open], predicate.parse::<usize>().ok()?)
        }
        None => (rest, 1),
    };
    if index == 0 {
        return None;
    }

    let (namespace, local_name) = if let Some(clark) = name.strip_prefix("Q{") {
        let close = clark.find('}')?;
        let uri = &clark[..close];
        let local = &clark[close + 1..];
        let namespace = if uri.is_empty() {
            None
        } else {
            Some(uri.to_string())
        };
        (namespace, local)
    } else if let Some((prefix, local)) = name.split_once(':') {
        (Some(lookup_prefix(prefix)?.to_string()), local)
    } else {
        (None, name)
    };
    if local_name.is_empty() {
        return None;
    }

    Some(Step {
        namespace,
        local_name: local_name.to_string(),
        index,
        attribute,
    })
}

fn parse_location_path(expr: &str) -> Option<Vec<Step>> {
    let raw_steps = split_steps(expr)?;
    let last = raw_steps.len() - 1;
    raw_steps
        .iter()
        .enumerate()
        .map(|(i, raw)| parse_step(raw, i == last))
        .collect()
}

/// Cache effectiveness counters, observable in tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

/// Per-run cache of parsed, position-annotated documents.
///
/// A document is parsed at most once per run; entries are never evicted.
/// SVRL reports reference the same source document once per assertion, so
/// repeated lookups are the common case.
#[derive(Debug, Default)]
pub struct DocumentCache {
    documents: HashMap<PathBuf, DocumentIndex>,
    stats: CacheStats,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Load and index a document, or return the already-cached index.
    pub async fn load(&mut self, path: &Path) -> Result<&DocumentIndex> {
        if self.documents.contains_key(path) {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
            let text = fs::read_to_string(path).await?;
            let index =
                DocumentIndex::parse(&text).map_err(|e| ReportError::DocumentParse {
                    path: path.to_path_buf(),
                    details: e.to_string(),
                })?;
            debug!("indexed {} for position lookup", path.display());
            self.documents.insert(path.to_path_buf(), index);
        }
        self.documents
            .get(path)
            .ok_or_else(|| ReportError::CacheLookup {
                path: path.to_path_buf(),
            })
    }
}

/// Resolves location paths against lazily loaded documents.
#[derive(Debug, Default)]
pub struct LocationResolver {
    cache: DocumentCache,
}

impl LocationResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Resolve `location` against `document`, returning `None` when the
    /// path matches no node. An unreadable or ill-formed document is an
    /// error: at this stage the file already passed through a validator,
    /// so a parse failure means the pipeline and the validator saw
    /// different bytes.
    pub async fn resolve(&mut self, document: &Path, location: &str) -> Result<Option<Position>> {
        let index = self.cache.load(document).await?;
        let position = index.resolve(&rewrite_clark_tei(location));
        if position.is_none() {
            debug!(
                "location '{}' matched no node in {}",
                location,
                document.display()
            );
        }
        Ok(position)
    }
}
