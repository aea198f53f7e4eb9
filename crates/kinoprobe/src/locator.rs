//! Locator model: how to find elements, independent of what state to wait for.
//!
//! A [`Locator`] is an immutable `(strategy, expression)` pair. Expressions are
//! never validated here; a malformed selector simply matches nothing and shows
//! up later as a resolution failure.
//!
//! A [`CandidateList`] is an ordered set of equivalent locators for one logical
//! target, most stable first.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a locator expression is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Element `id` attribute
    Id,
    /// CSS selector
    Css,
    /// XPath expression
    XPath,
    /// Tag name
    Tag,
    /// Visible text substring
    Text,
}

impl Strategy {
    /// Short name used in diagnostics
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Css => "css",
            Self::XPath => "xpath",
            Self::Tag => "tag",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable `(strategy, expression)` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    strategy: Strategy,
    expression: String,
}

impl Locator {
    /// Create a locator from its parts
    #[must_use]
    pub fn new(strategy: Strategy, expression: impl Into<String>) -> Self {
        Self {
            strategy,
            expression: expression.into(),
        }
    }

    /// Locate by element id
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::new(Strategy::Id, id)
    }

    /// Locate by CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(Strategy::Css, selector)
    }

    /// Locate by XPath
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::new(Strategy::XPath, expr)
    }

    /// Locate by tag name
    #[must_use]
    pub fn tag(name: impl Into<String>) -> Self {
        Self::new(Strategy::Tag, name)
    }

    /// Locate by visible text
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Strategy::Text, text)
    }

    /// XPath when the expression starts with `/` or `(`, CSS otherwise.
    ///
    /// Lets mixed selector lists be written as plain strings.
    #[must_use]
    pub fn selector(expr: &str) -> Self {
        if expr.starts_with('/') || expr.starts_with("(/") {
            Self::xpath(expr)
        } else {
            Self::css(expr)
        }
    }

    /// Strategy
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Raw expression
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// JavaScript expression evaluating to an `Array` of every matching element
    #[must_use]
    pub fn to_query_all(&self) -> String {
        let e = &self.expression;
        match self.strategy {
            Strategy::Id => format!("[document.getElementById({e:?})].filter(Boolean)"),
            Strategy::Css => format!("Array.from(document.querySelectorAll({e:?}))"),
            Strategy::XPath => format!(
                "(() => {{ const r = document.evaluate({e:?}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
                 const out = []; for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); return out; }})()"
            ),
            Strategy::Tag => format!("Array.from(document.getElementsByTagName({e:?}))"),
            Strategy::Text => format!(
                "Array.from(document.querySelectorAll('body *')).filter(el => \
                 Array.from(el.childNodes).some(n => n.nodeType === 3 && n.textContent.includes({e:?})))"
            ),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy, self.expression)
    }
}

/// Ordered alternatives for one logical UI target.
///
/// Construction never fails; emptiness is checked by the resolver, which
/// reports it as a precondition violation before any wait begins.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CandidateList {
    locators: Vec<Locator>,
}

impl CandidateList {
    /// Create from locators in preference order
    #[must_use]
    pub fn new(locators: Vec<Locator>) -> Self {
        Self { locators }
    }

    /// Create from plain selector strings (see [`Locator::selector`])
    #[must_use]
    pub fn from_selectors(selectors: &[&str]) -> Self {
        Self::new(selectors.iter().map(|s| Locator::selector(s)).collect())
    }

    /// Append a lower-preference alternative
    #[must_use]
    pub fn or(mut self, locator: Locator) -> Self {
        self.locators.push(locator);
        self
    }

    /// Number of candidates
    #[must_use]
    pub fn len(&self) -> usize {
        self.locators.len()
    }

    /// True when there are no candidates
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }

    /// Candidates in preference order
    pub fn iter(&self) -> std::slice::Iter<'_, Locator> {
        self.locators.iter()
    }

    /// Most preferred candidate
    #[must_use]
    pub fn first(&self) -> Option<&Locator> {
        self.locators.first()
    }
}

impl From<Locator> for CandidateList {
    fn from(locator: Locator) -> Self {
        Self::new(vec![locator])
    }
}

impl From<&Locator> for CandidateList {
    fn from(locator: &Locator) -> Self {
        Self::new(vec![locator.clone()])
    }
}

impl From<&CandidateList> for CandidateList {
    fn from(list: &Self) -> Self {
        list.clone()
    }
}

impl From<Vec<Locator>> for CandidateList {
    fn from(locators: Vec<Locator>) -> Self {
        Self::new(locators)
    }
}

impl<'a> IntoIterator for &'a CandidateList {
    type Item = &'a Locator;
    type IntoIter = std::slice::Iter<'a, Locator>;

    fn into_iter(self) -> Self::IntoIter {
        self.locators.iter()
    }
}

impl fmt::Display for CandidateList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, locator) in self.locators.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{locator}")?;
        }
        f.write_str("]")
    }
}
