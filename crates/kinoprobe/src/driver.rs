//! Driver abstraction consumed by the resolution engine.
//!
//! The engine only needs "find elements" and a handful of element actions; the
//! session lifecycle, transport, and DOM query engine live behind [`Driver`].
//! Two implementations ship with the crate: [`crate::fake_dom::FakeDriver`]
//! for tests and, with the `browser` feature, `ChromiumDriver` over CDP.

use crate::locator::Locator;
use crate::result::KinoResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot of an element as seen by the last query.
///
/// The `id` is the driver's reference; every other field may be stale by the
/// time it is read, which is why nothing caches handles between resolutions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-side element reference
    pub id: String,
    /// Lower-case tag name
    pub tag_name: String,
    /// Rendered text, including descendants
    pub text: String,
    /// Current form value, for inputs and selects
    pub value: Option<String>,
    /// Rendered and not hidden
    pub displayed: bool,
    /// Not disabled
    pub enabled: bool,
    /// Attributes at query time
    pub attributes: BTreeMap<String, String>,
}

impl ElementHandle {
    /// Create a handle with only an id and tag
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
            text: String::new(),
            value: None,
            displayed: true,
            enabled: true,
            attributes: BTreeMap::new(),
        }
    }

    /// Attribute value, if present
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Displayed and enabled
    #[must_use]
    pub const fn is_interactable(&self) -> bool {
        self.displayed && self.enabled
    }
}

/// Browser driver primitives.
///
/// All methods take `&mut self`: one logical thread drives one session.
/// Errors are transport-level; "nothing matched" is an empty `Vec`, not an error.
pub trait Driver {
    /// Load a URL and wait for the page load to finish
    fn navigate(&mut self, url: &str) -> KinoResult<()>;

    /// URL of the current page
    fn current_url(&mut self) -> KinoResult<String>;

    /// Title of the current page
    fn title(&mut self) -> KinoResult<String>;

    /// Every element currently matching `locator`, in document order.
    ///
    /// Returns immediately; waiting is the resolver's job.
    fn find_all(&mut self, locator: &Locator) -> KinoResult<Vec<ElementHandle>>;

    /// Click an element
    fn click(&mut self, element: &ElementHandle) -> KinoResult<()>;

    /// Clear an editable element's value
    fn clear(&mut self, element: &ElementHandle) -> KinoResult<()>;

    /// Type text at the end of an element's value
    fn send_keys(&mut self, element: &ElementHandle, text: &str) -> KinoResult<()>;

    /// Press Enter while the element has focus
    fn press_enter(&mut self, element: &ElementHandle) -> KinoResult<()>;

    /// Re-read an element's current value
    fn value_of(&mut self, element: &ElementHandle) -> KinoResult<String>;

    /// Choose the `<option>` whose `value` attribute equals `value`
    fn select_by_value(&mut self, element: &ElementHandle, value: &str) -> KinoResult<()>;

    /// Choose the `<option>` whose visible text equals `text`
    fn select_by_visible_text(&mut self, element: &ElementHandle, text: &str) -> KinoResult<()>;

    /// End the session
    fn quit(&mut self) -> KinoResult<()>;
}

impl<D: Driver + ?Sized> Driver for Box<D> {
    fn navigate(&mut self, url: &str) -> KinoResult<()> {
        (**self).navigate(url)
    }

    fn current_url(&mut self) -> KinoResult<String> {
        (**self).current_url()
    }

    fn title(&mut self) -> KinoResult<String> {
        (**self).title()
    }

    fn find_all(&mut self, locator: &Locator) -> KinoResult<Vec<ElementHandle>> {
        (**self).find_all(locator)
    }

    fn click(&mut self, element: &ElementHandle) -> KinoResult<()> {
        (**self).click(element)
    }

    fn clear(&mut self, element: &ElementHandle) -> KinoResult<()> {
        (**self).clear(element)
    }

    fn send_keys(&mut self, element: &ElementHandle, text: &str) -> KinoResult<()> {
        (**self).send_keys(element, text)
    }

    fn press_enter(&mut self, element: &ElementHandle) -> KinoResult<()> {
        (**self).press_enter(element)
    }

    fn value_of(&mut self, element: &ElementHandle) -> KinoResult<String> {
        (**self).value_of(element)
    }

    fn select_by_value(&mut self, element: &ElementHandle, value: &str) -> KinoResult<()> {
        (**self).select_by_value(element, value)
    }

    fn select_by_visible_text(&mut self, element: &ElementHandle, text: &str) -> KinoResult<()> {
        (**self).select_by_visible_text(element, text)
    }

    fn quit(&mut self) -> KinoResult<()> {
        (**self).quit()
    }
}
