//! Chromium driver over CDP.
//!
//! Runs chromiumoxide on a private tokio runtime and blocks on each call, so
//! it satisfies the synchronous [`Driver`] trait. Elements found by
//! [`Driver::find_all`] are tagged with a `data-kinoprobe-ref` attribute;
//! that attribute is the handle id for later actions. Looking a handle up
//! again is retried for the session's implicit wait; a node that stays gone
//! ends in [`KinoError::Timeout`].

use crate::driver::{Driver, ElementHandle};
use crate::locator::Locator;
use crate::result::{KinoError, KinoResult};
use crate::session::SessionConfig;
use crate::wait::Waiter;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::fmt;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{debug, info};

const REF_ATTR: &str = "data-kinoprobe-ref";

const HIDE_WEBDRIVER: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined })";

/// Script that every new document runs before its own scripts
fn fingerprint_script(config: &SessionConfig) -> Option<AddScriptToEvaluateOnNewDocumentParams> {
    config
        .suppress_automation_fingerprint
        .then(|| AddScriptToEvaluateOnNewDocumentParams::new(HIDE_WEBDRIVER))
}

fn cdp_error(err: impl fmt::Display) -> KinoError {
    KinoError::transport(err.to_string())
}

fn describe_all(query: &str) -> String {
    format!(
        "(() => {{
            let found;
            try {{ found = {query}; }} catch (e) {{ return []; }}
            window.__kinoprobeSeq = window.__kinoprobeSeq || 0;
            return found.map(el => {{
                let ref = el.getAttribute('{REF_ATTR}');
                if (!ref) {{
                    ref = 'kp-' + (++window.__kinoprobeSeq);
                    el.setAttribute('{REF_ATTR}', ref);
                }}
                const style = window.getComputedStyle(el);
                const rect = el.getBoundingClientRect();
                const attributes = {{}};
                for (const a of el.attributes) {{ if (a.name !== '{REF_ATTR}') attributes[a.name] = a.value; }}
                return {{
                    id: ref,
                    tag_name: el.tagName.toLowerCase(),
                    text: (el.innerText || el.textContent || '').trim(),
                    value: ('value' in el && el.value !== undefined) ? String(el.value) : null,
                    displayed: style.display !== 'none' && style.visibility !== 'hidden'
                        && (rect.width > 0 || rect.height > 0),
                    enabled: !el.disabled,
                    attributes,
                }};
            }});
        }})()"
    )
}

fn with_element(id: &str, body: &str) -> String {
    format!(
        "(() => {{
            const el = document.querySelector('[{REF_ATTR}=\"{id}\"]');
            if (!el) return 'stale';
            {body}
        }})()"
    )
}

fn choose_option(id: &str, predicate: &str) -> String {
    with_element(
        id,
        &format!(
            "const opt = Array.from(el.options || []).find(o => {predicate});
            if (!opt) return 'missing';
            el.value = opt.value;
            opt.selected = true;
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return 'ok';"
        ),
    )
}

/// [`Driver`] backed by a Chromium process
pub struct ChromiumDriver {
    runtime: Runtime,
    browser: Option<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    implicit_wait: Duration,
    waiter: Waiter,
}

impl fmt::Debug for ChromiumDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChromiumDriver")
            .field("open", &self.browser.is_some())
            .field("implicit_wait", &self.implicit_wait)
            .finish()
    }
}

impl ChromiumDriver {
    /// Launch a browser and open a blank page
    pub fn launch(config: &SessionConfig) -> KinoResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;

        let mut builder = BrowserConfig::builder()
            .window_size(config.window_size.0, config.window_size.1)
            .request_timeout(config.page_load_timeout)
            .args(config.browser_args());
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.browser_binary_path {
            builder = builder.chrome_executable(path);
        }
        if let Some(dir) = &config.profile_directory {
            builder = builder.user_data_dir(dir);
        }
        let cdp_config = builder.build().map_err(KinoError::precondition)?;

        let (browser, page, handler) = runtime.block_on(async {
            let (browser, mut handler) = Browser::launch(cdp_config).await.map_err(cdp_error)?;
            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });
            let page = browser.new_page("about:blank").await.map_err(cdp_error)?;
            if let Some(script) = fingerprint_script(config) {
                page.evaluate_on_new_document(script).await.map_err(cdp_error)?;
            }
            Ok::<_, KinoError>((browser, page, handler))
        })?;

        info!(
            headless = config.headless,
            implicit_wait_ms = u64::try_from(config.implicit_wait.as_millis()).unwrap_or(u64::MAX),
            "chromium launched"
        );
        Ok(Self {
            runtime,
            browser: Some(browser),
            page,
            handler,
            implicit_wait: config.implicit_wait,
            waiter: Waiter::new(),
        })
    }

    fn ensure_open(&self) -> KinoResult<()> {
        if self.browser.is_none() {
            return Err(KinoError::transport("session is closed"));
        }
        Ok(())
    }

    fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> KinoResult<T> {
        self.ensure_open()?;
        self.runtime.block_on(async {
            let result = self.page.evaluate(script).await.map_err(cdp_error)?;
            result.into_value::<T>().map_err(cdp_error)
        })
    }

    fn eval_on(&self, element: &ElementHandle, script: String) -> KinoResult<String> {
        let status: String = self.eval(script)?;
        if status == "stale" {
            return Err(KinoError::transport(format!(
                "stale element reference: {}",
                element.id
            )));
        }
        Ok(status)
    }

    fn element(&self, handle: &ElementHandle) -> KinoResult<Element> {
        self.ensure_open()?;
        let selector = format!("[{REF_ATTR}=\"{}\"]", handle.id);
        let what = format!("element {}", handle.id);
        self.waiter.retry(self.implicit_wait, &what, || {
            self.runtime.block_on(self.page.find_element(selector.clone()))
        })
    }
}

impl Driver for ChromiumDriver {
    fn navigate(&mut self, url: &str) -> KinoResult<()> {
        self.ensure_open()?;
        debug!(url, "navigate");
        self.runtime
            .block_on(self.page.goto(url))
            .map(|_| ())
            .map_err(|e| KinoError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    fn current_url(&mut self) -> KinoResult<String> {
        self.ensure_open()?;
        let url = self.runtime.block_on(self.page.url()).map_err(cdp_error)?;
        Ok(url.unwrap_or_default())
    }

    fn title(&mut self) -> KinoResult<String> {
        self.ensure_open()?;
        let title = self.runtime.block_on(self.page.get_title()).map_err(cdp_error)?;
        Ok(title.unwrap_or_default())
    }

    fn find_all(&mut self, locator: &Locator) -> KinoResult<Vec<ElementHandle>> {
        self.eval(describe_all(&locator.to_query_all()))
    }

    fn click(&mut self, element: &ElementHandle) -> KinoResult<()> {
        let target = self.element(element)?;
        self.runtime
            .block_on(target.click())
            .map(|_| ())
            .map_err(cdp_error)
    }

    fn clear(&mut self, element: &ElementHandle) -> KinoResult<()> {
        let script = with_element(
            &element.id,
            "if (el.disabled || el.readOnly || !('value' in el)) return 'readonly';
            el.value = '';
            el.dispatchEvent(new Event('input', { bubbles: true }));
            return 'ok';",
        );
        match self.eval_on(element, script)?.as_str() {
            "ok" => Ok(()),
            _ => Err(KinoError::transport(format!(
                "invalid element state: <{}> is not editable",
                element.tag_name
            ))),
        }
    }

    fn send_keys(&mut self, element: &ElementHandle, text: &str) -> KinoResult<()> {
        let target = self.element(element)?;
        self.runtime
            .block_on(async {
                target.focus().await?;
                target.type_str(text).await?;
                Ok::<_, chromiumoxide::error::CdpError>(())
            })
            .map_err(cdp_error)
    }

    fn press_enter(&mut self, element: &ElementHandle) -> KinoResult<()> {
        let target = self.element(element)?;
        self.runtime
            .block_on(target.press_key("Enter"))
            .map(|_| ())
            .map_err(cdp_error)
    }

    fn value_of(&mut self, element: &ElementHandle) -> KinoResult<String> {
        let script = with_element(&element.id, "return String(el.value ?? '');");
        self.eval_on(element, script)
    }

    fn select_by_value(&mut self, element: &ElementHandle, value: &str) -> KinoResult<()> {
        let predicate = format!("o.value === {value:?}");
        match self.eval_on(element, choose_option(&element.id, &predicate))?.as_str() {
            "ok" => Ok(()),
            _ => Err(KinoError::assertion(format!("no option with value {value:?}"))),
        }
    }

    fn select_by_visible_text(&mut self, element: &ElementHandle, text: &str) -> KinoResult<()> {
        let predicate = format!("o.text.trim() === {text:?}");
        match self.eval_on(element, choose_option(&element.id, &predicate))?.as_str() {
            "ok" => Ok(()),
            _ => Err(KinoError::assertion(format!("no option with text {text:?}"))),
        }
    }

    fn quit(&mut self) -> KinoResult<()> {
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };
        let closed = self.runtime.block_on(async {
            browser.close().await.map_err(cdp_error)?;
            browser.wait().await.map_err(cdp_error)?;
            Ok::<_, KinoError>(())
        });
        self.handler.abort();
        info!("chromium closed");
        closed
    }
}

impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        if self.browser.is_some() {
            let _ = self.quit();
        }
    }
}
