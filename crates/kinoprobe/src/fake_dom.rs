//! In-memory document driver.
//!
//! [`FakeDriver`] serves [`FakePage`] trees keyed by URL and answers locator
//! queries against them, so resolution and page flows can be exercised
//! without a browser. Every query is recorded for instrumentation.
//!
//! Supported CSS: type, `*`, `#id`, `.class`, `[attr]`, `[attr=v]`, `*=`,
//! `^=`, `$=`, `~=`, the descendant combinator and `,` groups. Supported
//! XPath: a single `//tag[predicate]` step where the predicate combines
//! `contains(text()|.|@attr, 'v')` and `text()|@attr = 'v'` with `and`/`or`.
//! Anything else matches nothing.

use crate::driver::{Driver, ElementHandle};
use crate::locator::{Locator, Strategy};
use crate::result::{KinoError, KinoResult};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

const BLANK_URL: &str = "about:blank";

// =============================================================================
// DOCUMENT BUILDERS
// =============================================================================

/// Element builder for fake pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeElement {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    value: Option<String>,
    displayed: bool,
    enabled: bool,
    appears_after: Duration,
    click_target: Option<String>,
    enter_target: Option<String>,
    children: Vec<FakeElement>,
}

impl FakeElement {
    /// Create an element; `input` and `textarea` start with an empty value
    #[must_use]
    pub fn new(tag: &str) -> Self {
        let tag = tag.to_ascii_lowercase();
        let value = matches!(tag.as_str(), "input" | "textarea").then(String::new);
        Self {
            tag,
            attributes: BTreeMap::new(),
            text: String::new(),
            value,
            displayed: true,
            enabled: true,
            appears_after: Duration::ZERO,
            click_target: None,
            enter_target: None,
            children: Vec::new(),
        }
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    /// Set the `id` attribute
    #[must_use]
    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    /// Add a class
    #[must_use]
    pub fn class(mut self, class: &str) -> Self {
        let entry = self.attributes.entry("class".to_string()).or_default();
        if !entry.is_empty() {
            entry.push(' ');
        }
        entry.push_str(class);
        self
    }

    /// Set own text
    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    /// Set the initial form value
    #[must_use]
    pub fn value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    /// Render as not displayed
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    /// Mark as disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Attach to the DOM only after `delay` has passed since page load
    #[must_use]
    pub const fn appears_after(mut self, delay: Duration) -> Self {
        self.appears_after = delay;
        self
    }

    /// Clicking loads `url`
    #[must_use]
    pub fn navigates_to(mut self, url: &str) -> Self {
        self.click_target = Some(url.to_string());
        self
    }

    /// Pressing Enter in this element loads `url`
    #[must_use]
    pub fn submits_to(mut self, url: &str) -> Self {
        self.enter_target = Some(url.to_string());
        self
    }

    /// Append a child
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Append several children
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.extend(children);
        self
    }

    /// Append an `<option value=..>text</option>` child
    #[must_use]
    pub fn option(self, value: &str, text: &str) -> Self {
        self.child(Self::new("option").attr("value", value).text(text))
    }
}

/// A page served by [`FakeDriver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakePage {
    url: String,
    title: String,
    body: Vec<FakeElement>,
}

impl FakePage {
    /// Create an empty page
    #[must_use]
    pub fn new(url: &str, title: &str) -> Self {
        Self {
            url: url.to_string(),
            title: title.to_string(),
            body: Vec::new(),
        }
    }

    /// Set the body's children
    #[must_use]
    pub fn with_body(mut self, body: Vec<FakeElement>) -> Self {
        self.body = body;
        self
    }

    /// Append one element to the body
    #[must_use]
    pub fn with_element(mut self, element: FakeElement) -> Self {
        self.body.push(element);
        self
    }

    /// Page URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

// =============================================================================
// LOADED DOCUMENT
// =============================================================================

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    value: Option<String>,
    displayed: bool,
    enabled: bool,
    appears_after: Duration,
    click_target: Option<String>,
    enter_target: Option<String>,
    selected: bool,
    parent: Option<usize>,
}

impl Node {
    fn from_element(el: &FakeElement, parent: Option<usize>) -> Self {
        Self {
            tag: el.tag.clone(),
            attributes: el.attributes.clone(),
            text: el.text.clone(),
            value: el.value.clone(),
            displayed: el.displayed,
            enabled: el.enabled,
            appears_after: el.appears_after,
            click_target: el.click_target.clone(),
            enter_target: el.enter_target.clone(),
            selected: el.attributes.contains_key("selected"),
            parent,
        }
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|x| x == class))
    }
}

#[derive(Debug)]
struct Document {
    url: String,
    title: String,
    nodes: Vec<Node>,
    loaded_at: Instant,
    generation: u64,
}

impl Document {
    fn blank(url: &str, generation: u64) -> Self {
        Self::load(&FakePage::new(url, ""), generation)
    }

    fn load(page: &FakePage, generation: u64) -> Self {
        let mut nodes = vec![
            Node::from_element(&FakeElement::new("html"), None),
            Node::from_element(&FakeElement::new("body"), Some(0)),
        ];
        for el in &page.body {
            flatten(el, 1, &mut nodes);
        }
        Self {
            url: page.url.clone(),
            title: page.title.clone(),
            nodes,
            loaded_at: Instant::now(),
            generation,
        }
    }

    fn is_attached(&self, index: usize) -> bool {
        let age = self.loaded_at.elapsed();
        let mut cursor = Some(index);
        while let Some(i) = cursor {
            if age < self.nodes[i].appears_after {
                return false;
            }
            cursor = self.nodes[i].parent;
        }
        true
    }

    fn is_displayed(&self, index: usize) -> bool {
        let mut cursor = Some(index);
        while let Some(i) = cursor {
            if !self.nodes[i].displayed {
                return false;
            }
            cursor = self.nodes[i].parent;
        }
        true
    }

    fn children_of(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| n.parent == Some(index))
            .map(|(i, _)| i)
    }

    fn rendered_text(&self, index: usize) -> String {
        if !self.is_displayed(index) || !self.is_attached(index) {
            return String::new();
        }
        let mut parts = Vec::new();
        let own = self.nodes[index].text.trim();
        if !own.is_empty() {
            parts.push(own.to_string());
        }
        for child in self.children_of(index) {
            let text = self.rendered_text(child);
            if !text.is_empty() {
                parts.push(text);
            }
        }
        parts.join(" ")
    }

    fn value(&self, index: usize) -> Option<String> {
        let node = &self.nodes[index];
        if node.tag == "select" {
            let options: Vec<usize> = self.children_of(index).collect();
            let chosen = options
                .iter()
                .find(|&&i| self.nodes[i].selected)
                .or_else(|| options.first());
            return chosen.map(|&i| {
                self.nodes[i]
                    .attr("value")
                    .map_or_else(|| self.nodes[i].text.clone(), str::to_string)
            });
        }
        node.value.clone()
    }

    fn snapshot(&self, index: usize) -> ElementHandle {
        let node = &self.nodes[index];
        ElementHandle {
            id: format!("fake-{}-{index}", self.generation),
            tag_name: node.tag.clone(),
            text: self.rendered_text(index),
            value: self.value(index),
            displayed: self.is_displayed(index),
            enabled: node.enabled,
            attributes: node.attributes.clone(),
        }
    }

    fn matches(&self, locator: &Locator) -> Vec<usize> {
        let attached = |i: &usize| self.is_attached(*i);
        match locator.strategy() {
            Strategy::Id => (0..self.nodes.len())
                .filter(|&i| self.nodes[i].attr("id") == Some(locator.expression()))
                .filter(attached)
                .collect(),
            Strategy::Tag => (0..self.nodes.len())
                .filter(|&i| self.nodes[i].tag.eq_ignore_ascii_case(locator.expression()))
                .filter(attached)
                .collect(),
            Strategy::Text => (0..self.nodes.len())
                .filter(|&i| {
                    !locator.expression().is_empty()
                        && self.nodes[i].text.contains(locator.expression())
                })
                .filter(attached)
                .collect(),
            Strategy::Css => match parse_css(locator.expression()) {
                Some(groups) => (0..self.nodes.len())
                    .filter(|&i| groups.iter().any(|chain| self.matches_chain(i, chain)))
                    .filter(attached)
                    .collect(),
                None => Vec::new(),
            },
            Strategy::XPath => match parse_xpath(locator.expression()) {
                Some(step) => (0..self.nodes.len())
                    .filter(|&i| step.matches(self, i))
                    .filter(attached)
                    .collect(),
                None => Vec::new(),
            },
        }
    }

    fn matches_chain(&self, index: usize, chain: &[Compound]) -> bool {
        let Some((last, ancestors)) = chain.split_last() else {
            return false;
        };
        if !last.matches(&self.nodes[index]) {
            return false;
        }
        let mut cursor = self.nodes[index].parent;
        for compound in ancestors.iter().rev() {
            loop {
                match cursor {
                    None => return false,
                    Some(i) => {
                        cursor = self.nodes[i].parent;
                        if compound.matches(&self.nodes[i]) {
                            break;
                        }
                    }
                }
            }
        }
        true
    }
}

fn flatten(el: &FakeElement, parent: usize, nodes: &mut Vec<Node>) {
    let index = nodes.len();
    nodes.push(Node::from_element(el, Some(parent)));
    for child in &el.children {
        flatten(child, index, nodes);
    }
}

fn page_key(url: &str) -> &str {
    url.trim_end_matches('/')
}

// =============================================================================
// DRIVER
// =============================================================================

/// Driver over in-memory pages
#[derive(Debug, Default)]
pub struct FakeDriver {
    pages: HashMap<String, FakePage>,
    current: Option<Document>,
    generation: u64,
    queries: Vec<Locator>,
    history: Vec<String>,
    quit: bool,
}

impl FakeDriver {
    /// Create a driver with no pages (every URL loads blank)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a page
    #[must_use]
    pub fn with_page(mut self, page: FakePage) -> Self {
        self.add_page(page);
        self
    }

    /// Serve a page, replacing any page at the same URL
    pub fn add_page(&mut self, page: FakePage) {
        self.pages.insert(page_key(&page.url).to_string(), page);
    }

    /// Times `locator` has been queried
    #[must_use]
    pub fn query_count(&self, locator: &Locator) -> usize {
        self.queries.iter().filter(|q| *q == locator).count()
    }

    /// Every query in order
    #[must_use]
    pub fn queries(&self) -> &[Locator] {
        &self.queries
    }

    /// Forget recorded queries
    pub fn reset_queries(&mut self) {
        self.queries.clear();
    }

    /// URLs loaded so far
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Whether [`Driver::quit`] has been called
    #[must_use]
    pub const fn is_quit(&self) -> bool {
        self.quit
    }

    fn ensure_open(&self) -> KinoResult<()> {
        if self.quit {
            return Err(KinoError::transport("session is closed"));
        }
        Ok(())
    }

    fn node_index(&self, element: &ElementHandle) -> KinoResult<usize> {
        self.ensure_open()?;
        let stale = || KinoError::transport(format!("stale element reference: {}", element.id));
        let doc = self.current.as_ref().ok_or_else(stale)?;
        let index = element
            .id
            .strip_prefix(&format!("fake-{}-", doc.generation))
            .and_then(|i| i.parse::<usize>().ok())
            .filter(|&i| i < doc.nodes.len() && doc.is_attached(i))
            .ok_or_else(stale)?;
        Ok(index)
    }

    fn doc_mut(&mut self) -> KinoResult<&mut Document> {
        self.current
            .as_mut()
            .ok_or_else(|| KinoError::transport("no document loaded"))
    }

    fn editable_index(&self, element: &ElementHandle) -> KinoResult<usize> {
        let index = self.node_index(element)?;
        let doc = self.current.as_ref().ok_or_else(|| KinoError::transport("no document loaded"))?;
        let node = &doc.nodes[index];
        if node.value.is_none() || !node.enabled {
            return Err(KinoError::transport(format!(
                "invalid element state: <{}> is not editable",
                node.tag
            )));
        }
        Ok(index)
    }

    fn select_option<F>(&mut self, element: &ElementHandle, what: &str, pick: F) -> KinoResult<()>
    where
        F: Fn(&Node) -> bool,
    {
        let index = self.node_index(element)?;
        let doc = self.doc_mut()?;
        if doc.nodes[index].tag != "select" {
            return Err(KinoError::transport(format!(
                "element <{}> is not a select",
                doc.nodes[index].tag
            )));
        }
        let options: Vec<usize> = doc.children_of(index).collect();
        let chosen = options
            .iter()
            .copied()
            .find(|&i| pick(&doc.nodes[i]))
            .ok_or_else(|| KinoError::assertion(format!("no option {what}")))?;
        for i in options {
            doc.nodes[i].selected = i == chosen;
        }
        Ok(())
    }
}

impl Driver for FakeDriver {
    fn navigate(&mut self, url: &str) -> KinoResult<()> {
        self.ensure_open()?;
        self.generation += 1;
        let doc = match self.pages.get(page_key(url)) {
            Some(page) => Document::load(page, self.generation),
            None => Document::blank(url, self.generation),
        };
        self.current = Some(doc);
        self.history.push(url.to_string());
        Ok(())
    }

    fn current_url(&mut self) -> KinoResult<String> {
        self.ensure_open()?;
        Ok(self
            .current
            .as_ref()
            .map_or_else(|| BLANK_URL.to_string(), |d| d.url.clone()))
    }

    fn title(&mut self) -> KinoResult<String> {
        self.ensure_open()?;
        Ok(self
            .current
            .as_ref()
            .map(|d| d.title.clone())
            .unwrap_or_default())
    }

    fn find_all(&mut self, locator: &Locator) -> KinoResult<Vec<ElementHandle>> {
        self.ensure_open()?;
        self.queries.push(locator.clone());
        Ok(self.current.as_ref().map_or_else(Vec::new, |doc| {
            doc.matches(locator)
                .into_iter()
                .map(|i| doc.snapshot(i))
                .collect()
        }))
    }

    fn click(&mut self, element: &ElementHandle) -> KinoResult<()> {
        let index = self.node_index(element)?;
        let doc = self.doc_mut()?;
        if !doc.is_displayed(index) || !doc.nodes[index].enabled {
            return Err(KinoError::transport(format!(
                "element not interactable: {}",
                element.id
            )));
        }
        if doc.nodes[index].tag == "option" {
            if let Some(parent) = doc.nodes[index].parent {
                let siblings: Vec<usize> = doc.children_of(parent).collect();
                for i in siblings {
                    doc.nodes[i].selected = i == index;
                }
            }
        }
        if let Some(target) = doc.nodes[index].click_target.clone() {
            self.navigate(&target)?;
        }
        Ok(())
    }

    fn clear(&mut self, element: &ElementHandle) -> KinoResult<()> {
        let index = self.editable_index(element)?;
        self.doc_mut()?.nodes[index].value = Some(String::new());
        Ok(())
    }

    fn send_keys(&mut self, element: &ElementHandle, text: &str) -> KinoResult<()> {
        let index = self.editable_index(element)?;
        if let Some(value) = self.doc_mut()?.nodes[index].value.as_mut() {
            value.push_str(text);
        }
        Ok(())
    }

    fn press_enter(&mut self, element: &ElementHandle) -> KinoResult<()> {
        let index = self.node_index(element)?;
        let target = self.doc_mut()?.nodes[index].enter_target.clone();
        if let Some(target) = target {
            self.navigate(&target)?;
        }
        Ok(())
    }

    fn value_of(&mut self, element: &ElementHandle) -> KinoResult<String> {
        let index = self.node_index(element)?;
        let doc = self.doc_mut()?;
        Ok(doc.value(index).unwrap_or_default())
    }

    fn select_by_value(&mut self, element: &ElementHandle, value: &str) -> KinoResult<()> {
        self.select_option(element, &format!("with value {value:?}"), |n| {
            n.attr("value") == Some(value)
        })
    }

    fn select_by_visible_text(&mut self, element: &ElementHandle, text: &str) -> KinoResult<()> {
        self.select_option(element, &format!("with text {text:?}"), |n| n.text.trim() == text)
    }

    fn quit(&mut self) -> KinoResult<()> {
        self.quit = true;
        self.current = None;
        Ok(())
    }
}

// =============================================================================
// CSS SUBSET
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Contains,
    Prefix,
    Suffix,
    Word,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrTest {
    name: String,
    op: AttrOp,
    value: String,
}

impl AttrTest {
    fn matches(&self, node: &Node) -> bool {
        let Some(actual) = node.attr(&self.name) else {
            return false;
        };
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == self.value,
            AttrOp::Contains => !self.value.is_empty() && actual.contains(&self.value),
            AttrOp::Prefix => !self.value.is_empty() && actual.starts_with(&self.value),
            AttrOp::Suffix => !self.value.is_empty() && actual.ends_with(&self.value),
            AttrOp::Word => actual.split_whitespace().any(|w| w == self.value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

impl Compound {
    fn matches(&self, node: &Node) -> bool {
        self.tag.as_ref().map_or(true, |t| node.tag.eq_ignore_ascii_case(t))
            && self.id.as_ref().map_or(true, |id| node.attr("id") == Some(id))
            && self.classes.iter().all(|c| node.has_class(c))
            && self.attrs.iter().all(|a| a.matches(node))
    }
}

/// Split on `sep` outside brackets and quotes
fn split_top_level(input: &str, sep: fn(char) -> bool) -> Option<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0_i32;
    let mut quote: Option<char> = None;
    for c in input.chars() {
        match (quote, c) {
            (Some(q), _) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), _) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                current.push(c);
            }
            (None, '[') => {
                depth += 1;
                current.push(c);
            }
            (None, ']') => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
                current.push(c);
            }
            (None, _) if depth == 0 && sep(c) => {
                if !current.trim().is_empty() {
                    parts.push(current.trim().to_string());
                }
                current.clear();
            }
            (None, _) => current.push(c),
        }
    }
    if depth != 0 || quote.is_some() {
        return None;
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    Some(parts)
}

fn parse_css(selector: &str) -> Option<Vec<Vec<Compound>>> {
    let groups = split_top_level(selector, |c| c == ',')?;
    if groups.is_empty() {
        return None;
    }
    groups
        .iter()
        .map(|group| {
            split_top_level(group, char::is_whitespace)?
                .iter()
                .map(|c| parse_compound(c))
                .collect::<Option<Vec<_>>>()
        })
        .collect()
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        ident.push(c);
        chars.next();
    }
    ident
}

fn parse_compound(input: &str) -> Option<Compound> {
    let mut compound = Compound::default();
    let mut chars = input.chars().peekable();

    if chars.peek() == Some(&'*') {
        chars.next();
    } else {
        let tag = take_ident(&mut chars);
        if !tag.is_empty() {
            compound.tag = Some(tag);
        }
    }

    while let Some(c) = chars.next() {
        match c {
            '#' => {
                let id = take_ident(&mut chars);
                if id.is_empty() {
                    return None;
                }
                compound.id = Some(id);
            }
            '.' => {
                let class = take_ident(&mut chars);
                if class.is_empty() {
                    return None;
                }
                compound.classes.push(class);
            }
            '[' => {
                let mut inner = String::new();
                let mut quote: Option<char> = None;
                loop {
                    let c = chars.next()?;
                    match (quote, c) {
                        (None, ']') => break,
                        (None, '\'' | '"') => quote = Some(c),
                        (Some(q), _) if q == c => quote = None,
                        _ => {}
                    }
                    inner.push(c);
                }
                compound.attrs.push(parse_attr(&inner)?);
            }
            _ => return None,
        }
    }
    Some(compound)
}

fn parse_attr(inner: &str) -> Option<AttrTest> {
    let Some(eq) = inner.find('=') else {
        let name = inner.trim();
        return (!name.is_empty() && name.chars().all(is_ident_char)).then(|| AttrTest {
            name: name.to_string(),
            op: AttrOp::Exists,
            value: String::new(),
        });
    };
    let (head, tail) = inner.split_at(eq);
    let (name, op) = match head.chars().last() {
        Some('*') => (&head[..head.len() - 1], AttrOp::Contains),
        Some('^') => (&head[..head.len() - 1], AttrOp::Prefix),
        Some('$') => (&head[..head.len() - 1], AttrOp::Suffix),
        Some('~') => (&head[..head.len() - 1], AttrOp::Word),
        _ => (head, AttrOp::Equals),
    };
    let name = name.trim();
    if name.is_empty() || !name.chars().all(is_ident_char) {
        return None;
    }
    let raw = tail[1..].trim();
    let value = strip_quotes(raw).unwrap_or(raw);
    Some(AttrTest {
        name: name.to_string(),
        op,
        value: value.to_string(),
    })
}

fn strip_quotes(raw: &str) -> Option<&str> {
    let first = raw.chars().next()?;
    if (first == '\'' || first == '"') && raw.len() >= 2 && raw.ends_with(first) {
        Some(&raw[1..raw.len() - 1])
    } else {
        None
    }
}

// =============================================================================
// XPATH SUBSET
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum XArg {
    Text,
    Dot,
    Attr(String),
    Translate {
        source: Box<XArg>,
        from: Vec<char>,
        to: Vec<char>,
    },
}

impl XArg {
    fn value(&self, doc: &Document, index: usize) -> Option<String> {
        match self {
            Self::Text => Some(doc.nodes[index].text.clone()),
            Self::Dot => Some(doc.rendered_text(index)),
            Self::Attr(name) => doc.nodes[index].attr(name).map(str::to_string),
            Self::Translate { source, from, to } => source.value(doc, index).map(|v| {
                // characters past the end of `to` are dropped
                v.chars()
                    .filter_map(|c| match from.iter().position(|f| *f == c) {
                        Some(pos) => to.get(pos).copied(),
                        None => Some(c),
                    })
                    .collect()
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum XPred {
    Contains(XArg, String),
    Equals(XArg, String),
    And(Box<XPred>, Box<XPred>),
    Or(Box<XPred>, Box<XPred>),
}

impl XPred {
    fn eval(&self, doc: &Document, index: usize) -> bool {
        let resolve = |arg: &XArg| arg.value(doc, index);
        match self {
            Self::Contains(arg, needle) => resolve(arg).is_some_and(|v| v.contains(needle.as_str())),
            Self::Equals(arg, expected) => resolve(arg).is_some_and(|v| v.trim() == expected.as_str()),
            Self::And(a, b) => a.eval(doc, index) && b.eval(doc, index),
            Self::Or(a, b) => a.eval(doc, index) || b.eval(doc, index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct XStep {
    tag: Option<String>,
    predicate: Option<XPred>,
}

impl XStep {
    fn matches(&self, doc: &Document, index: usize) -> bool {
        self.tag
            .as_ref()
            .map_or(true, |t| doc.nodes[index].tag.eq_ignore_ascii_case(t))
            && self.predicate.as_ref().map_or(true, |p| p.eval(doc, index))
    }
}

struct XParser<'a> {
    rest: &'a str,
}

impl<'a> XParser<'a> {
    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if let Some(rest) = self.rest.strip_prefix(token) {
            self.rest = rest;
            true
        } else {
            false
        }
    }

    fn keyword(&mut self, word: &str) -> bool {
        self.skip_ws();
        match self.rest.strip_prefix(word) {
            Some(rest) if rest.starts_with(|c: char| c.is_whitespace() || c == '(') => {
                self.rest = rest;
                true
            }
            _ => false,
        }
    }

    fn literal(&mut self) -> Option<String> {
        self.skip_ws();
        let quote = self.rest.chars().next().filter(|c| *c == '\'' || *c == '"')?;
        let body = &self.rest[1..];
        let end = body.find(quote)?;
        let value = body[..end].to_string();
        self.rest = &body[end + 1..];
        Some(value)
    }

    fn arg(&mut self) -> Option<XArg> {
        if self.eat("translate(") {
            let source = self.arg()?;
            if !self.eat(",") {
                return None;
            }
            let from = self.literal()?;
            if !self.eat(",") {
                return None;
            }
            let to = self.literal()?;
            self.eat(")").then(|| XArg::Translate {
                source: Box::new(source),
                from: from.chars().collect(),
                to: to.chars().collect(),
            })
        } else if self.eat("text()") {
            Some(XArg::Text)
        } else if self.eat("@") {
            let len = self.rest.find(|c: char| !is_ident_char(c)).unwrap_or(self.rest.len());
            if len == 0 {
                return None;
            }
            let name = self.rest[..len].to_string();
            self.rest = &self.rest[len..];
            Some(XArg::Attr(name))
        } else if self.eat(".") {
            Some(XArg::Dot)
        } else {
            None
        }
    }

    fn term(&mut self) -> Option<XPred> {
        if self.eat("contains(") {
            let arg = self.arg()?;
            if !self.eat(",") {
                return None;
            }
            let needle = self.literal()?;
            self.eat(")").then_some(XPred::Contains(arg, needle))
        } else if self.eat("(") {
            let inner = self.or_expr()?;
            self.eat(")").then_some(inner)
        } else {
            let arg = self.arg()?;
            if !self.eat("=") {
                return None;
            }
            Some(XPred::Equals(arg, self.literal()?))
        }
    }

    fn and_expr(&mut self) -> Option<XPred> {
        let mut left = self.term()?;
        while self.keyword("and") {
            left = XPred::And(Box::new(left), Box::new(self.term()?));
        }
        Some(left)
    }

    fn or_expr(&mut self) -> Option<XPred> {
        let mut left = self.and_expr()?;
        while self.keyword("or") {
            left = XPred::Or(Box::new(left), Box::new(self.and_expr()?));
        }
        Some(left)
    }
}

fn parse_xpath(expr: &str) -> Option<XStep> {
    let body = expr.trim().strip_prefix("//")?;
    let mut parser = XParser { rest: body };
    let tag = if parser.eat("*") {
        None
    } else {
        let len = parser.rest.find(|c: char| !is_ident_char(c)).unwrap_or(parser.rest.len());
        if len == 0 {
            return None;
        }
        let tag = parser.rest[..len].to_string();
        parser.rest = &parser.rest[len..];
        Some(tag)
    };
    let predicate = if parser.eat("[") {
        let p = parser.or_expr()?;
        if !parser.eat("]") {
            return None;
        }
        Some(p)
    } else {
        None
    };
    parser.skip_ws();
    parser.rest.is_empty().then_some(XStep { tag, predicate })
}

// =============================================================================
// TESTS
// =============================================================================
