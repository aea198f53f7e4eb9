//! Conditions the wait primitive polls for.

use crate::driver::{Driver, ElementHandle};
use crate::locator::Locator;
use crate::result::KinoResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What state a locator must reach before resolution succeeds
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    /// At least one element is in the DOM
    Present,
    /// An element is displayed and enabled
    Clickable,
    /// An element is displayed
    Visible,
    /// At least one element is in the DOM; all matches are returned
    AllPresent,
    /// An element's text or form value equals the given string
    TextEquals(String),
    /// The page URL contains the given fragment (the locator is not consulted)
    UrlContains(String),
}

/// What a satisfied condition hands back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// A single element
    Element(ElementHandle),
    /// Every matching element, in document order
    Elements(Vec<ElementHandle>),
    /// The URL that satisfied a URL condition
    Url(String),
}

impl Resolved {
    /// The single (or first) element, if any
    #[must_use]
    pub fn element(&self) -> Option<&ElementHandle> {
        match self {
            Self::Element(el) => Some(el),
            Self::Elements(els) => els.first(),
            Self::Url(_) => None,
        }
    }

    /// Consume into the single (or first) element
    #[must_use]
    pub fn into_element(self) -> Option<ElementHandle> {
        match self {
            Self::Element(el) => Some(el),
            Self::Elements(els) => els.into_iter().next(),
            Self::Url(_) => None,
        }
    }

    /// Consume into every element
    #[must_use]
    pub fn into_elements(self) -> Vec<ElementHandle> {
        match self {
            Self::Element(el) => vec![el],
            Self::Elements(els) => els,
            Self::Url(_) => Vec::new(),
        }
    }
}

impl Condition {
    /// Check the condition once.
    ///
    /// `Ok(None)` means "not yet"; errors come from the driver.
    pub fn evaluate<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        locator: &Locator,
    ) -> KinoResult<Option<Resolved>> {
        if let Self::UrlContains(fragment) = self {
            let url = driver.current_url()?;
            return Ok(url.contains(fragment.as_str()).then_some(Resolved::Url(url)));
        }

        let found = driver.find_all(locator)?;
        let resolved = match self {
            Self::Present => found.into_iter().next().map(Resolved::Element),
            Self::Visible => found.into_iter().find(|el| el.displayed).map(Resolved::Element),
            Self::Clickable => found
                .into_iter()
                .find(ElementHandle::is_interactable)
                .map(Resolved::Element),
            Self::AllPresent => (!found.is_empty()).then_some(Resolved::Elements(found)),
            Self::TextEquals(expected) => found
                .into_iter()
                .find(|el| {
                    el.text.trim() == expected.as_str()
                        || el.value.as_deref() == Some(expected.as_str())
                })
                .map(Resolved::Element),
            Self::UrlContains(_) => None,
        };
        Ok(resolved)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => f.write_str("present"),
            Self::Clickable => f.write_str("clickable"),
            Self::Visible => f.write_str("visible"),
            Self::AllPresent => f.write_str("all present"),
            Self::TextEquals(text) => write!(f, "text equals {text:?}"),
            Self::UrlContains(fragment) => write!(f, "url contains {fragment:?}"),
        }
    }
}
