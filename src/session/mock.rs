//! Mock session implementation for testing
//!
//! An in-memory DOM behind the session traits. Queries are answered by a
//! small CSS matcher (tag, `.class`, `#id`, `[attr]`, `[attr=v]`, `[attr*=v]`,
//! `[attr^=v]`, descendant and `>` combinators, `,` groups) plus the `text=`
//! locators. Every query, reload and navigation is counted so tests can assert
//! on how much work an operation did.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use super::selector::{Locator, SelectorType};
use super::traits::{
    BrowserContext, BrowserDriver, BrowserLauncher, BrowserOptions, ElementRef, EvaluationResult, LaunchedBrowser,
    Locate, NavigationOptions, NavigationResult, PageContext, ScreenshotFormat,
};
use crate::Error;

/// PNG signature returned by mock screenshots
pub const MOCK_PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Node of the fake DOM
#[derive(Debug, Clone, Default)]
pub struct MockNode {
    pub tag: String,
    pub attributes: HashMap<String, String>,
    pub text: String,
    pub children: Vec<MockNode>,
    /// Reads on this node fail as if it was detached mid-read
    pub detached: bool,
}

impl MockNode {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        }
    }

    /// Document root
    pub fn document() -> Self {
        Self::new("body")
    }

    pub fn class(mut self, class: &str) -> Self {
        let classes = match self.attributes.get("class") {
            Some(existing) if !existing.is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        self.attributes.insert("class".to_string(), classes);
        self
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn child(mut self, child: MockNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = MockNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn detached(mut self) -> Self {
        self.detached = true;
        self
    }

    fn has_class(&self, class: &str) -> bool {
        self.attributes
            .get("class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Own text followed by descendant text
    pub fn text_content(&self) -> String {
        let mut text = self.text.clone();
        for child in &self.children {
            text.push_str(&child.text_content());
        }
        text
    }

    fn node_at(&self, path: &[usize]) -> Option<&MockNode> {
        match path.split_first() {
            None => Some(self),
            Some((index, rest)) => self.children.get(*index)?.node_at(rest),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum AttrOp {
    Exists,
    Equals(String),
    Contains(String),
    Prefix(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, AttrOp)>,
}

impl Compound {
    fn matches(&self, node: &MockNode) -> bool {
        if let Some(tag) = &self.tag {
            if tag != "*" && *tag != node.tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if node.attributes.get("id") != Some(id) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| node.has_class(c)) {
            return false;
        }
        self.attributes.iter().all(|(name, op)| match (node.attributes.get(name), op) {
            (None, _) => false,
            (Some(_), AttrOp::Exists) => true,
            (Some(v), AttrOp::Equals(expected)) => v == expected,
            (Some(v), AttrOp::Contains(expected)) => v.contains(expected.as_str()),
            (Some(v), AttrOp::Prefix(expected)) => v.starts_with(expected.as_str()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
    Descendant,
    Child,
}

/// One comma-separated group: compounds joined by combinators, left to right
#[derive(Debug, Clone, PartialEq)]
struct ComplexSelector {
    steps: Vec<(Combinator, Compound)>,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn parse_compound(input: &str) -> Result<Compound, Error> {
    let invalid = || Error::invalid_selector(format!("unsupported selector: {}", input));
    let chars: Vec<char> = input.chars().collect();
    let mut compound = Compound::default();
    let mut i = 0;

    let ident = |start: usize| -> (String, usize) {
        let mut end = start;
        while end < chars.len() && is_ident_char(chars[end]) {
            end += 1;
        }
        (chars[start..end].iter().collect(), end)
    };

    while i < chars.len() {
        match chars[i] {
            '.' => {
                let (name, end) = ident(i + 1);
                if name.is_empty() {
                    return Err(invalid());
                }
                compound.classes.push(name);
                i = end;
            }
            '#' => {
                let (name, end) = ident(i + 1);
                if name.is_empty() {
                    return Err(invalid());
                }
                compound.id = Some(name);
                i = end;
            }
            '[' => {
                let close = chars[i..].iter().position(|&c| c == ']').ok_or_else(invalid)? + i;
                let body: String = chars[i + 1..close].iter().collect();
                let unquote = |v: &str| v.trim().trim_matches(|c| c == '"' || c == '\'').to_string();
                let attr = if let Some((name, value)) = body.split_once("*=") {
                    (name.trim().to_string(), AttrOp::Contains(unquote(value)))
                } else if let Some((name, value)) = body.split_once("^=") {
                    (name.trim().to_string(), AttrOp::Prefix(unquote(value)))
                } else if let Some((name, value)) = body.split_once('=') {
                    (name.trim().to_string(), AttrOp::Equals(unquote(value)))
                } else {
                    (body.trim().to_string(), AttrOp::Exists)
                };
                if attr.0.is_empty() || !attr.0.chars().all(is_ident_char) {
                    return Err(invalid());
                }
                compound.attributes.push(attr);
                i = close + 1;
            }
            '*' if i == 0 => {
                compound.tag = Some("*".to_string());
                i += 1;
            }
            c if is_ident_char(c) && i == 0 => {
                let (name, end) = ident(i);
                compound.tag = Some(name.to_ascii_lowercase());
                i = end;
            }
            _ => return Err(invalid()),
        }
    }

    Ok(compound)
}

/// Split a group into tokens on whitespace, keeping bracketed attribute values intact
fn tokenize(group: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0;
    for c in group.chars() {
        match c {
            '[' => {
                depth += 1;
                current.push(c);
            }
            ']' => {
                depth -= 1;
                current.push(c);
            }
            '>' if depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(">".to_string());
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn parse_css(selector: &str) -> Result<Vec<ComplexSelector>, Error> {
    selector
        .split(',')
        .map(|group| {
            let mut steps = Vec::new();
            let mut combinator = Combinator::Descendant;
            for token in tokenize(group) {
                if token == ">" {
                    if steps.is_empty() || combinator == Combinator::Child {
                        return Err(Error::invalid_selector(selector));
                    }
                    combinator = Combinator::Child;
                    continue;
                }
                steps.push((combinator, parse_compound(&token)?));
                combinator = Combinator::Descendant;
            }
            if steps.is_empty() || combinator == Combinator::Child {
                return Err(Error::invalid_selector(selector));
            }
            Ok(ComplexSelector { steps })
        })
        .collect()
}

impl ComplexSelector {
    /// Does `node` (with its ancestors, nearest last) match?
    fn matches(&self, node: &MockNode, ancestors: &[&MockNode]) -> bool {
        let Some(((_, last), rest)) = self.steps.split_last() else {
            return false;
        };
        last.matches(node) && Self::match_rest(rest, self.steps[rest.len()].0, ancestors)
    }

    fn match_rest(steps: &[(Combinator, Compound)], link: Combinator, ancestors: &[&MockNode]) -> bool {
        let Some(((next_link, compound), rest)) = steps.split_last() else {
            return true;
        };
        match link {
            Combinator::Child => match ancestors.split_last() {
                Some((parent, above)) => {
                    compound.matches(parent) && Self::match_rest(rest, *next_link, above)
                }
                None => false,
            },
            Combinator::Descendant => (0..ancestors.len()).rev().any(|i| {
                compound.matches(ancestors[i]) && Self::match_rest(rest, *next_link, &ancestors[..i])
            }),
        }
    }
}

/// Compiled matcher for one locator
enum Matcher {
    Css(Vec<ComplexSelector>),
    Text { needle: String, exact: bool },
    Unsupported,
}

impl Matcher {
    fn compile(selector: &str) -> Result<Self, Error> {
        let locator = Locator::parse(selector)?;
        Ok(match locator.selector_type {
            SelectorType::Css => Matcher::Css(parse_css(&locator.value)?),
            SelectorType::Text => Matcher::Text {
                needle: locator.value,
                exact: locator.exact,
            },
            SelectorType::XPath => Matcher::Unsupported,
        })
    }

    fn matches(&self, node: &MockNode, ancestors: &[&MockNode]) -> bool {
        match self {
            Matcher::Css(groups) => groups.iter().any(|g| g.matches(node, ancestors)),
            Matcher::Text { needle, exact } => {
                let own = node.text.trim();
                if *exact {
                    own == needle
                } else {
                    !own.is_empty() && own.contains(needle.as_str())
                }
            }
            Matcher::Unsupported => false,
        }
    }
}

/// Paths of all descendants of the node at `scope` that match, in document order
fn find_paths(root: &MockNode, scope: &[usize], matcher: &Matcher) -> Vec<Vec<usize>> {
    fn walk<'a>(
        node: &'a MockNode,
        path: &mut Vec<usize>,
        ancestors: &mut Vec<&'a MockNode>,
        matcher: &Matcher,
        out: &mut Vec<Vec<usize>>,
    ) {
        ancestors.push(node);
        for (index, child) in node.children.iter().enumerate() {
            path.push(index);
            if matcher.matches(child, ancestors) {
                out.push(path.clone());
            }
            walk(child, path, ancestors, matcher, out);
            path.pop();
        }
        ancestors.pop();
    }

    let mut ancestors = Vec::new();
    let mut node = root;
    for index in scope {
        ancestors.push(node);
        match node.children.get(*index) {
            Some(child) => node = child,
            None => return Vec::new(),
        }
    }

    let mut out = Vec::new();
    let mut path = scope.to_vec();
    // The scope node's own ancestors stay on the stack for combinator matching
    let mut stack = ancestors;
    walk(node, &mut path, &mut stack, matcher, &mut out);
    out
}

/// Shared state of a mock page
#[derive(Debug)]
struct MockPageState {
    dom: Mutex<MockNode>,
    /// Bumped whenever the DOM is replaced; older element handles become detached
    generation: AtomicU64,
    routes: Mutex<Vec<(String, MockNode)>>,
    dom_on_click: Mutex<Option<MockNode>>,
    scripts: Mutex<Vec<(String, EvaluationResult)>>,
    query_counts: Mutex<HashMap<String, usize>>,
    failing_selectors: Mutex<HashMap<String, Error>>,
    navigations: Mutex<Vec<String>>,
    reloads: AtomicUsize,
    clicks: Mutex<Vec<String>>,
    typed: Mutex<Vec<String>>,
    pending_wait_timeouts: AtomicUsize,
    pending_navigation_failures: AtomicUsize,
    reload_fails: AtomicBool,
    is_active: AtomicBool,
}

impl MockPageState {
    fn replace_dom(&self, dom: MockNode) {
        if let Ok(mut current) = self.dom.lock() {
            *current = dom;
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn count_query(&self, selector: &str) {
        if let Ok(mut counts) = self.query_counts.lock() {
            *counts.entry(selector.to_string()).or_insert(0) += 1;
        }
    }

    fn injected_failure(&self, selector: &str) -> Option<Error> {
        self.failing_selectors
            .lock()
            .ok()
            .and_then(|failing| failing.get(selector).map(clone_error))
    }

    fn query(self: &Arc<Self>, scope: &[usize], selector: &str) -> Result<Vec<Arc<dyn ElementRef>>, Error> {
        self.count_query(selector);
        if let Some(error) = self.injected_failure(selector) {
            return Err(error);
        }

        let matcher = Matcher::compile(selector)?;
        let dom = self
            .dom
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
        let generation = self.generation.load(Ordering::SeqCst);

        Ok(find_paths(&dom, scope, &matcher)
            .into_iter()
            .map(|path| {
                Arc::new(MockElement {
                    id: Uuid::new_v4().to_string(),
                    page: Arc::clone(self),
                    path,
                    generation,
                }) as Arc<dyn ElementRef>
            })
            .collect())
    }
}

/// `Error` is not `Clone`; rebuild the variants tests inject
fn clone_error(error: &Error) -> Error {
    match error {
        Error::Timeout(msg) => Error::timeout(msg.clone()),
        Error::InvalidSelector(msg) => Error::invalid_selector(msg.clone()),
        Error::ElementNotFound(msg) => Error::element_not_found(msg.clone()),
        Error::ScriptExecutionFailed(msg) => Error::script_execution_failed(msg.clone()),
        Error::NavigationFailed(msg) => Error::navigation_failed(msg.clone()),
        other => Error::internal(other.to_string()),
    }
}

/// Mock page backed by an in-memory DOM
#[derive(Debug, Clone)]
pub struct MockPage {
    id: String,
    state: Arc<MockPageState>,
}

impl MockPage {
    pub fn new(dom: MockNode) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            state: Arc::new(MockPageState {
                dom: Mutex::new(dom),
                generation: AtomicU64::new(0),
                routes: Mutex::new(Vec::new()),
                dom_on_click: Mutex::new(None),
                scripts: Mutex::new(Vec::new()),
                query_counts: Mutex::new(HashMap::new()),
                failing_selectors: Mutex::new(HashMap::new()),
                navigations: Mutex::new(Vec::new()),
                reloads: AtomicUsize::new(0),
                clicks: Mutex::new(Vec::new()),
                typed: Mutex::new(Vec::new()),
                pending_wait_timeouts: AtomicUsize::new(0),
                pending_navigation_failures: AtomicUsize::new(0),
                reload_fails: AtomicBool::new(false),
                is_active: AtomicBool::new(true),
            }),
        }
    }

    /// Empty page
    pub fn blank() -> Self {
        Self::new(MockNode::document())
    }

    /// Replace the document
    pub fn set_dom(&self, dom: MockNode) {
        self.state.replace_dom(dom);
    }

    /// Navigating to a URL containing `url_fragment` loads `dom`
    pub fn route(&self, url_fragment: &str, dom: MockNode) {
        if let Ok(mut routes) = self.state.routes.lock() {
            routes.push((url_fragment.to_string(), dom));
        }
    }

    /// The next click on any element replaces the document with `dom`
    pub fn swap_dom_on_click(&self, dom: MockNode) {
        if let Ok(mut slot) = self.state.dom_on_click.lock() {
            *slot = Some(dom);
        }
    }

    /// `evaluate` returns `result` for scripts containing `fragment`
    pub fn script(&self, fragment: &str, result: EvaluationResult) {
        if let Ok(mut scripts) = self.state.scripts.lock() {
            scripts.push((fragment.to_string(), result));
        }
    }

    /// Every query for exactly `selector` fails with `error`
    pub fn fail_selector(&self, selector: &str, error: Error) {
        if let Ok(mut failing) = self.state.failing_selectors.lock() {
            failing.insert(selector.to_string(), error);
        }
    }

    /// The next `count` calls to `wait_for_selector` time out regardless of the DOM
    pub fn time_out_next_waits(&self, count: usize) {
        self.state.pending_wait_timeouts.store(count, Ordering::SeqCst);
    }

    /// The next `count` navigations time out
    pub fn time_out_next_navigations(&self, count: usize) {
        self.state.pending_navigation_failures.store(count, Ordering::SeqCst);
    }

    /// Make every reload fail
    pub fn fail_reloads(&self, fail: bool) {
        self.state.reload_fails.store(fail, Ordering::SeqCst);
    }

    /// How many times `selector` was queried (directly or through `wait_for_selector`)
    pub fn query_count(&self, selector: &str) -> usize {
        self.state
            .query_counts
            .lock()
            .ok()
            .and_then(|counts| counts.get(selector).copied())
            .unwrap_or(0)
    }

    pub fn reload_count(&self) -> usize {
        self.state.reloads.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.navigations.lock().map(|n| n.clone()).unwrap_or_default()
    }

    /// Text of every clicked element, in order
    pub fn clicks(&self) -> Vec<String> {
        self.state.clicks.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Every string typed into an element, in order
    pub fn typed(&self) -> Vec<String> {
        self.state.typed.lock().map(|t| t.clone()).unwrap_or_default()
    }

    /// Mark the page open again, as a relaunched browser would serve it
    pub fn reopen(&self) {
        self.state.is_active.store(true, Ordering::SeqCst);
    }

    fn ensure_active(&self) -> Result<(), Error> {
        if self.state.is_active.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::session_not_ready(format!("page {} is closed", self.id)))
        }
    }

    /// Consume one unit of a pending-failure counter
    fn take_pending(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for MockPage {
    fn default() -> Self {
        Self::blank()
    }
}

#[async_trait]
impl Locate for MockPage {
    async fn query_all(&self, selector: &str) -> Result<Vec<Arc<dyn ElementRef>>, Error> {
        self.ensure_active()?;
        self.state.query(&[], selector)
    }
}

#[async_trait]
impl PageContext for MockPage {
    fn id(&self) -> &str {
        &self.id
    }

    async fn navigate(&self, url: &str, _options: NavigationOptions) -> Result<NavigationResult, Error> {
        self.ensure_active()?;
        if let Ok(mut navigations) = self.state.navigations.lock() {
            navigations.push(url.to_string());
        }
        if Self::take_pending(&self.state.pending_navigation_failures) {
            return Err(Error::timeout(format!("Navigation to {} timed out", url)));
        }

        let routed = self
            .state
            .routes
            .lock()
            .ok()
            .and_then(|routes| {
                routes
                    .iter()
                    .find(|(fragment, _)| url.contains(fragment.as_str()))
                    .map(|(_, dom)| dom.clone())
            });
        if let Some(dom) = routed {
            self.state.replace_dom(dom);
        }

        Ok(NavigationResult {
            url: url.to_string(),
            is_loaded: true,
        })
    }

    async fn reload(&self, _timeout: Duration) -> Result<(), Error> {
        self.ensure_active()?;
        self.state.reloads.fetch_add(1, Ordering::SeqCst);
        if self.state.reload_fails.load(Ordering::SeqCst) {
            return Err(Error::timeout("Reload timed out"));
        }
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Option<Duration>) -> Result<(), Error> {
        self.ensure_active()?;
        if Self::take_pending(&self.state.pending_wait_timeouts) {
            self.state.count_query(selector);
            return Err(Error::timeout(format!("Selector {} did not appear", selector)));
        }

        if self.state.query(&[], selector)?.is_empty() {
            return Err(Error::timeout(format!(
                "Selector {} did not appear within {:?}",
                selector, timeout
            )));
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str, _await_promise: bool) -> Result<EvaluationResult, Error> {
        self.ensure_active()?;
        let scripted = self.state.scripts.lock().ok().and_then(|scripts| {
            scripts
                .iter()
                .find(|(fragment, _)| script.contains(fragment.as_str()))
                .map(|(_, result)| result.clone())
        });
        Ok(scripted.unwrap_or(EvaluationResult::Null))
    }

    async fn screenshot(&self, _format: ScreenshotFormat) -> Result<Vec<u8>, Error> {
        self.ensure_active()?;
        Ok(MOCK_PNG.to_vec())
    }

    async fn close(&self) -> Result<(), Error> {
        self.state.is_active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.state.is_active.load(Ordering::SeqCst)
    }
}

/// Mock element: a path into the page's DOM at a given generation
#[derive(Debug)]
pub struct MockElement {
    id: String,
    page: Arc<MockPageState>,
    path: Vec<usize>,
    generation: u64,
}

impl MockElement {
    /// Run `f` on the live node, failing if the element went stale or is marked detached
    fn with_node<T>(&self, f: impl FnOnce(&MockNode) -> T) -> Result<T, Error> {
        if self.page.generation.load(Ordering::SeqCst) != self.generation {
            return Err(Error::element_not_found("element is detached from the document"));
        }
        let dom = self
            .page
            .dom
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
        match dom.node_at(&self.path) {
            Some(node) if !node.detached => Ok(f(node)),
            _ => Err(Error::element_not_found("element is detached from the document")),
        }
    }
}

#[async_trait]
impl Locate for MockElement {
    async fn query_all(&self, selector: &str) -> Result<Vec<Arc<dyn ElementRef>>, Error> {
        self.with_node(|_| ())?;
        self.page.query(&self.path, selector)
    }
}

#[async_trait]
impl ElementRef for MockElement {
    fn id(&self) -> &str {
        &self.id
    }

    async fn get_text(&self) -> Result<String, Error> {
        self.with_node(|node| node.text_content())
    }

    async fn get_attribute(&self, name: &str) -> Result<Option<String>, Error> {
        self.with_node(|node| node.attributes.get(name).cloned())
    }

    async fn click(&self) -> Result<(), Error> {
        let text = self.with_node(|node| node.text_content())?;
        if let Ok(mut clicks) = self.page.clicks.lock() {
            clicks.push(text);
        }
        let next = self.page.dom_on_click.lock().ok().and_then(|mut slot| slot.take());
        if let Some(dom) = next {
            self.page.replace_dom(dom);
        }
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), Error> {
        self.with_node(|_| ())?;
        if let Ok(mut typed) = self.page.typed.lock() {
            typed.push(text.to_string());
        }
        Ok(())
    }

    async fn focus(&self) -> Result<(), Error> {
        self.with_node(|_| ())
    }
}

/// Mock browser
#[derive(Debug)]
pub struct MockBrowser {
    id: String,
    existing: Vec<Arc<MockPage>>,
    fresh_page: Arc<MockPage>,
    new_pages: AtomicUsize,
    fail_close: bool,
    is_active: AtomicBool,
}

impl MockBrowser {
    /// Browser whose `new_page` hands out `fresh_page`
    pub fn new(existing: Vec<Arc<MockPage>>, fresh_page: Arc<MockPage>, fail_close: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            existing,
            fresh_page,
            new_pages: AtomicUsize::new(0),
            fail_close,
            is_active: AtomicBool::new(true),
        }
    }

    /// Number of pages opened through `new_page`
    pub fn new_page_count(&self) -> usize {
        self.new_pages.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserContext for MockBrowser {
    fn id(&self) -> &str {
        &self.id
    }

    async fn pages(&self) -> Result<Vec<Arc<dyn PageContext>>, Error> {
        Ok(self
            .existing
            .iter()
            .map(|page| Arc::clone(page) as Arc<dyn PageContext>)
            .collect())
    }

    async fn new_page(&self) -> Result<Arc<dyn PageContext>, Error> {
        if !self.is_active() {
            return Err(Error::session_not_ready("browser is closed"));
        }
        self.new_pages.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.fresh_page) as Arc<dyn PageContext>)
    }

    async fn close(&self) -> Result<(), Error> {
        self.is_active.store(false, Ordering::SeqCst);
        if self.fail_close {
            return Err(Error::cdp("browser refused to close"));
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }
}

/// Mock driver counting stop calls
#[derive(Debug, Default)]
pub struct MockDriver {
    stops: AtomicUsize,
}

impl MockDriver {
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn stop(&self) -> Result<(), Error> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Records launches and hands out mock browsers
#[derive(Debug)]
pub struct MockLauncher {
    page: Arc<MockPage>,
    reuse_existing_page: AtomicBool,
    fail_launch: AtomicBool,
    fail_close: AtomicBool,
    launches: Mutex<Vec<(Arc<MockBrowser>, Arc<MockDriver>)>>,
    options: Mutex<Vec<BrowserOptions>>,
}

impl MockLauncher {
    /// Launcher whose browsers serve `page`
    pub fn new(page: Arc<MockPage>) -> Self {
        Self {
            page,
            reuse_existing_page: AtomicBool::new(false),
            fail_launch: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
            launches: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
        }
    }

    /// Launched browsers already carry `page` as an open tab
    pub fn reuse_existing_page(&self, reuse: bool) {
        self.reuse_existing_page.store(reuse, Ordering::SeqCst);
    }

    pub fn fail_launch(&self, fail: bool) {
        self.fail_launch.store(fail, Ordering::SeqCst);
    }

    /// Browsers launched from now on fail to close
    pub fn fail_close(&self, fail: bool) {
        self.fail_close.store(fail, Ordering::SeqCst);
    }

    pub fn launch_count(&self) -> usize {
        self.launches.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Browser and driver of launch number `index`
    pub fn launched(&self, index: usize) -> Option<(Arc<MockBrowser>, Arc<MockDriver>)> {
        self.launches.lock().ok().and_then(|l| l.get(index).cloned())
    }

    /// Options passed to every launch, in order
    pub fn launch_options(&self) -> Vec<BrowserOptions> {
        self.options.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl BrowserLauncher for MockLauncher {
    async fn launch(&self, options: &BrowserOptions) -> Result<LaunchedBrowser, Error> {
        if let Ok(mut recorded) = self.options.lock() {
            recorded.push(options.clone());
        }
        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(Error::launch("mock launch failure"));
        }
        self.page.reopen();

        let existing = if self.reuse_existing_page.load(Ordering::SeqCst) {
            vec![Arc::clone(&self.page)]
        } else {
            Vec::new()
        };
        let browser = Arc::new(MockBrowser::new(
            existing,
            Arc::clone(&self.page),
            self.fail_close.load(Ordering::SeqCst),
        ));
        let driver = Arc::new(MockDriver::default());

        if let Ok(mut launches) = self.launches.lock() {
            launches.push((Arc::clone(&browser), Arc::clone(&driver)));
        }

        Ok(LaunchedBrowser {
            browser,
            driver,
        })
    }
}
