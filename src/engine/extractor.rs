//! Fallback-chain extractor
//!
//! A field that has appeared under several markup variants is described by a
//! [`SelectorChain`]: candidates are tried in order and the first one that
//! yields a non-empty value wins. A candidate that errors only counts as a
//! miss, and a chain that misses entirely yields the caller's default.

use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::engine::diagnostics::{DiagnosticEvent, Diagnostics, NoopDiagnostics};
use crate::session::traits::{ElementRef, Locate};

/// Ordered alternative locators for one logical field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorChain<'a> {
    candidates: &'a [&'a str],
}

impl<'a> SelectorChain<'a> {
    pub const fn new(candidates: &'a [&'a str]) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &'a [&'a str] {
        self.candidates
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl<'a> From<&'a [&'a str]> for SelectorChain<'a> {
    fn from(candidates: &'a [&'a str]) -> Self {
        Self::new(candidates)
    }
}

impl<'a, const N: usize> From<&'a [&'a str; N]> for SelectorChain<'a> {
    fn from(candidates: &'a [&'a str; N]) -> Self {
        Self::new(candidates)
    }
}

impl fmt::Display for SelectorChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.candidates.join(" | "))
    }
}

/// Value read through a chain, or a miss
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractionResult {
    pub value: String,
    pub found: bool,
}

impl ExtractionResult {
    pub fn found(value: String) -> Self {
        Self { value, found: true }
    }

    pub fn missing() -> Self {
        Self::default()
    }

    /// The value, or `default` on a miss
    pub fn or_default(self, default: &str) -> String {
        if self.found {
            self.value
        } else {
            default.to_string()
        }
    }
}

/// Where a field's value is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource<'a> {
    Text,
    Attribute(&'a str),
    /// Attribute value reduced to the path segment after a marker
    LinkId { attribute: &'a str, marker: &'a str },
}

/// Declarative description of one field of a repeated item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec<'a> {
    pub name: &'a str,
    pub chain: SelectorChain<'a>,
    pub source: FieldSource<'a>,
    pub default: &'a str,
}

impl<'a> FieldSpec<'a> {
    pub const fn text(name: &'a str, chain: &'a [&'a str], default: &'a str) -> Self {
        Self {
            name,
            chain: SelectorChain::new(chain),
            source: FieldSource::Text,
            default,
        }
    }

    pub const fn attribute(name: &'a str, chain: &'a [&'a str], attribute: &'a str, default: &'a str) -> Self {
        Self {
            name,
            chain: SelectorChain::new(chain),
            source: FieldSource::Attribute(attribute),
            default,
        }
    }

    pub const fn link_id(
        name: &'a str,
        chain: &'a [&'a str],
        attribute: &'a str,
        marker: &'a str,
        default: &'a str,
    ) -> Self {
        Self {
            name,
            chain: SelectorChain::new(chain),
            source: FieldSource::LinkId { attribute, marker },
            default,
        }
    }
}

/// Field values of one extracted item, in field order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// Value of `name`, empty when the record has no such field
    pub fn get(&self, name: &str) -> &str {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
            .unwrap_or("")
    }
}

/// Identifier in `url` following `marker`, without query string or fragment.
///
/// Empty when the marker is absent.
pub fn parse_id_from_link(url: &str, marker: &str) -> String {
    if marker.is_empty() {
        return String::new();
    }
    let Some(position) = url.find(marker) else {
        return String::new();
    };

    let rest = &url[position + marker.len()..];
    let end = rest.find(['?', '#', '/']).unwrap_or(rest.len());
    rest[..end].to_string()
}

/// Walks selector chains, reporting misses to a diagnostics sink
#[derive(Debug, Clone)]
pub struct Extractor {
    diagnostics: Arc<dyn Diagnostics>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(Arc::new(NoopDiagnostics))
    }
}

impl Extractor {
    pub fn new(diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self { diagnostics }
    }

    fn miss(&self, chain: SelectorChain<'_>) -> ExtractionResult {
        self.diagnostics.record(DiagnosticEvent::ChainMiss {
            chain: chain.to_string(),
        });
        ExtractionResult::missing()
    }

    /// First element for `candidate` under `root`; errors count as a miss
    async fn first_match<R>(root: &R, candidate: &str) -> Option<Arc<dyn ElementRef>>
    where
        R: Locate + ?Sized,
    {
        match root.query(candidate).await {
            Ok(found) => found,
            Err(e) => {
                debug!("Candidate {} failed: {}", candidate, e);
                None
            }
        }
    }

    /// First element matched by any candidate, for interaction rather than reading
    pub async fn find_first<R>(&self, root: &R, chain: SelectorChain<'_>) -> Option<Arc<dyn ElementRef>>
    where
        R: Locate + ?Sized,
    {
        for candidate in chain.candidates() {
            if let Some(element) = Self::first_match(root, candidate).await {
                return Some(element);
            }
        }
        self.miss(chain);
        None
    }

    /// First non-empty trimmed text along the chain
    pub async fn try_text<R>(&self, root: &R, chain: SelectorChain<'_>) -> ExtractionResult
    where
        R: Locate + ?Sized,
    {
        for candidate in chain.candidates() {
            let Some(element) = Self::first_match(root, candidate).await else {
                continue;
            };
            match element.get_text().await {
                Ok(text) if !text.trim().is_empty() => return ExtractionResult::found(text.trim().to_string()),
                Ok(_) => debug!("Candidate {} matched with empty text", candidate),
                Err(e) => debug!("Candidate {} text read failed: {}", candidate, e),
            }
        }
        self.miss(chain)
    }

    /// Text along the chain, or `default`
    pub async fn extract_text<R>(&self, root: &R, chain: SelectorChain<'_>, default: &str) -> String
    where
        R: Locate + ?Sized,
    {
        self.try_text(root, chain).await.or_default(default)
    }

    /// First non-empty trimmed attribute value along the chain
    pub async fn try_attribute<R>(&self, root: &R, chain: SelectorChain<'_>, attribute: &str) -> ExtractionResult
    where
        R: Locate + ?Sized,
    {
        for candidate in chain.candidates() {
            let Some(element) = Self::first_match(root, candidate).await else {
                continue;
            };
            match element.get_attribute(attribute).await {
                Ok(Some(value)) if !value.trim().is_empty() => {
                    return ExtractionResult::found(value.trim().to_string())
                }
                Ok(_) => debug!("Candidate {} has no {}", candidate, attribute),
                Err(e) => debug!("Candidate {} attribute read failed: {}", candidate, e),
            }
        }
        self.miss(chain)
    }

    /// Attribute along the chain, or `default`
    pub async fn extract_attribute<R>(
        &self,
        root: &R,
        chain: SelectorChain<'_>,
        attribute: &str,
        default: &str,
    ) -> String
    where
        R: Locate + ?Sized,
    {
        self.try_attribute(root, chain, attribute).await.or_default(default)
    }

    /// Elements of the first candidate with any match, at most `limit`, in document order
    pub async fn extract_list<R>(&self, root: &R, item_chain: SelectorChain<'_>, limit: usize) -> Vec<Arc<dyn ElementRef>>
    where
        R: Locate + ?Sized,
    {
        if limit == 0 {
            return Vec::new();
        }

        for candidate in item_chain.candidates() {
            match root.query_all(candidate).await {
                Ok(mut items) if !items.is_empty() => {
                    debug!("Item candidate {} matched {} elements", candidate, items.len());
                    items.truncate(limit);
                    return items;
                }
                Ok(_) => debug!("Item candidate {} matched nothing", candidate),
                Err(e) => debug!("Item candidate {} failed: {}", candidate, e),
            }
        }

        self.miss(item_chain);
        Vec::new()
    }

    /// One field of `root` per its spec
    pub async fn extract_field<R>(&self, root: &R, spec: &FieldSpec<'_>) -> String
    where
        R: Locate + ?Sized,
    {
        match spec.source {
            FieldSource::Text => self.extract_text(root, spec.chain, spec.default).await,
            FieldSource::Attribute(attribute) => {
                self.extract_attribute(root, spec.chain, attribute, spec.default)
                    .await
            }
            FieldSource::LinkId { attribute, marker } => {
                let link = self.try_attribute(root, spec.chain, attribute).await;
                let id = if link.found {
                    parse_id_from_link(&link.value, marker)
                } else {
                    String::new()
                };
                if id.is_empty() {
                    spec.default.to_string()
                } else {
                    id
                }
            }
        }
    }

    /// All fields of `root`
    pub async fn extract_record<R>(&self, root: &R, fields: &[FieldSpec<'_>]) -> Record
    where
        R: Locate + ?Sized,
    {
        let mut record = Record::default();
        for spec in fields {
            let value = self.extract_field(root, spec).await;
            record.fields.push((spec.name.to_string(), value));
        }
        record
    }

    /// Up to `limit` items located by `item_chain`, each reduced to a record
    pub async fn extract_records<R>(
        &self,
        root: &R,
        item_chain: SelectorChain<'_>,
        limit: usize,
        fields: &[FieldSpec<'_>],
    ) -> Vec<Record>
    where
        R: Locate + ?Sized,
    {
        let items = self.extract_list(root, item_chain, limit).await;
        let mut records = Vec::with_capacity(items.len());
        for item in &items {
            records.push(self.extract_record(item.as_ref(), fields).await);
        }
        records
    }
}
