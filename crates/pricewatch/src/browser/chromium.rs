//! Remote Chromium session over the DevTools protocol, using chromiumoxide.

use super::{BrowserConnector, BrowserSession, ElementHandle, PageHandle};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

/// Connects to a remote browser over a CDP WebSocket endpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromiumConnector;

#[async_trait]
impl BrowserConnector for ChromiumConnector {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn BrowserSession>> {
        let (browser, mut handler) = Browser::connect(endpoint)
            .await
            .context("failed to connect to remote browser")?;

        // The handler must be polled for any CDP command to make progress.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::warn!("chromiumoxide handler event error: {e}");
                }
            }
        });

        Ok(Box::new(ChromiumSession {
            browser,
            handler_task,
        }))
    }
}

/// A connected remote browser.
pub struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;
        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let ChromiumSession {
            mut browser,
            handler_task,
        } = *self;
        let closed = browser.close().await.context("failed to close browser");
        let _ = browser.wait().await;
        handler_task.abort();
        closed.map(|_| ())
    }
}

/// Script that resolves once `selector` matches, watching DOM mutations
/// instead of polling.
fn wait_for_selector_script(selector: &str) -> Result<String> {
    let selector = serde_json::to_string(selector)?;
    Ok(format!(
        r#"new Promise((resolve) => {{
    const sel = {selector};
    if (document.querySelector(sel)) {{ resolve(true); return; }}
    const observer = new MutationObserver(() => {{
        if (document.querySelector(sel)) {{ observer.disconnect(); resolve(true); }}
    }});
    observer.observe(document.documentElement, {{
        childList: true, subtree: true, attributes: true
    }});
}})"#
    ))
}

/// A single remote page.
pub struct ChromiumPage {
    page: Page,
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .with_context(|| format!("navigation to {url} failed"))?;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str) -> Result<Box<dyn ElementHandle>> {
        let params = EvaluateParams::builder()
            .expression(wait_for_selector_script(selector)?)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(|e| anyhow!("failed to build wait script: {e}"))?;

        self.page
            .evaluate_expression(params)
            .await
            .with_context(|| format!("waiting for {selector} failed"))?;

        let element = self
            .page
            .find_element(selector)
            .await
            .with_context(|| format!("element {selector} vanished after appearing"))?;
        Ok(Box::new(ChromiumElement { element }))
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .with_context(|| format!("query for {selector} failed"))?;
        Ok(elements
            .into_iter()
            .map(|element| Box::new(ChromiumElement { element }) as Box<dyn ElementHandle>)
            .collect())
    }

    async fn wait_for_load(&self) -> Result<()> {
        self.page
            .wait_for_navigation()
            .await
            .context("page did not finish loading")?;
        Ok(())
    }

    async fn url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .context("failed to get URL")?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }
}

/// A DOM element on a remote page.
pub struct ChromiumElement {
    element: Element,
}

#[async_trait]
impl ElementHandle for ChromiumElement {
    async fn query(&self, selector: &str) -> Result<Option<Box<dyn ElementHandle>>> {
        // find_elements returns an empty list for no match, where
        // find_element would report absence as a CDP error.
        let first = self
            .element
            .find_elements(selector)
            .await
            .with_context(|| format!("query for {selector} failed"))?
            .into_iter()
            .next();
        Ok(first.map(|element| Box::new(ChromiumElement { element }) as Box<dyn ElementHandle>))
    }

    async fn inner_text(&self) -> Result<Option<String>> {
        self.element
            .inner_text()
            .await
            .context("failed to read inner text")
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.element
            .attribute(name)
            .await
            .with_context(|| format!("failed to read attribute {name}"))
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        self.element.focus().await.context("failed to focus element")?;
        self.element
            .type_str(text)
            .await
            .context("failed to type into element")?;
        Ok(())
    }

    async fn click(&self) -> Result<()> {
        self.element.click().await.context("failed to click element")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_script_escapes_selector() {
        let script = wait_for_selector_script(r#"input[value="Go"]"#).unwrap();
        assert!(script.contains(r#"const sel = "input[value=\"Go\"]";"#));
        assert!(script.contains("MutationObserver"));
    }

    #[tokio::test]
    #[ignore] // Requires a reachable remote browser in PRICEWATCH_BROWSER_WS
    async fn test_remote_session_roundtrip() {
        let endpoint = std::env::var("PRICEWATCH_BROWSER_WS").expect("endpoint not set");
        let session = ChromiumConnector
            .connect(&endpoint)
            .await
            .expect("failed to connect");
        let page = session.new_page().await.expect("failed to open page");

        page.goto("data:text/html,<div class='card'><h2>Hello</h2></div>")
            .await
            .expect("navigation failed");
        let cards = page.query_all("div.card").await.expect("query failed");
        assert_eq!(cards.len(), 1);

        let heading = cards[0].query("h2").await.expect("query failed");
        let text = heading.unwrap().inner_text().await.expect("text failed");
        assert_eq!(text.as_deref(), Some("Hello"));
        assert!(cards[0].query("span").await.expect("query failed").is_none());

        session.close().await.expect("close failed");
    }
}
