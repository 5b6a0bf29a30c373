//! In-memory browser capabilities for driving the pipeline without Chromium.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use pricewatch::browser::{BrowserConnector, BrowserSession, ElementHandle, PageHandle};
use pricewatch::sink::ResultSink;
use pricewatch::{FieldSelectors, ResultBatch, SelectorExtractor};

/// Shared record of every page interaction, in call order.
#[derive(Clone, Default)]
pub struct InteractionLog(Arc<Mutex<Vec<String>>>);

impl InteractionLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

// ─────────────────────── elements ───────────────────────

/// A synthetic DOM node. Children are keyed by the exact selector that
/// finds them.
#[derive(Clone, Default)]
pub struct FakeNode {
    pub text: Option<String>,
    pub attrs: HashMap<String, String>,
    pub children: HashMap<String, FakeNode>,
    /// Latency added to every query made on this node.
    pub delay: Duration,
    /// Queries on this node fail as if the remote browser errored.
    pub broken: bool,
}

impl FakeNode {
    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    pub fn attr(name: &str, value: &str) -> Self {
        let mut node = Self::default();
        node.attrs.insert(name.to_string(), value.to_string());
        node
    }

    pub fn child(mut self, selector: &str, node: FakeNode) -> Self {
        self.children.insert(selector.to_string(), node);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }
}

pub struct FakeElement {
    node: FakeNode,
    label: String,
    log: InteractionLog,
}

impl FakeElement {
    pub fn new(node: FakeNode, label: &str, log: InteractionLog) -> Self {
        Self {
            node,
            label: label.to_string(),
            log,
        }
    }
}

#[async_trait]
impl ElementHandle for FakeElement {
    async fn query(&self, selector: &str) -> Result<Option<Box<dyn ElementHandle>>> {
        if !self.node.delay.is_zero() {
            tokio::time::sleep(self.node.delay).await;
        }
        if self.node.broken {
            bail!("remote object {} is gone", self.label);
        }
        Ok(self.node.children.get(selector).map(|child| {
            Box::new(FakeElement::new(child.clone(), selector, self.log.clone()))
                as Box<dyn ElementHandle>
        }))
    }

    async fn inner_text(&self) -> Result<Option<String>> {
        Ok(self.node.text.clone())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.node.attrs.get(name).cloned())
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        self.log.push(format!("type {} {text}", self.label));
        Ok(())
    }

    async fn click(&self) -> Result<()> {
        self.log.push(format!("click {}", self.label));
        Ok(())
    }
}

// ─────────────────────── pages ───────────────────────

/// Behaviour of every page opened from a fake session.
#[derive(Clone, Default)]
pub struct PageScript {
    /// Selectors that appear after the given delay. Others never appear.
    pub appearing: HashMap<String, Duration>,
    /// Containers returned by `query_all`, keyed by selector.
    pub listings: HashMap<String, Vec<FakeNode>>,
    /// `goto` never completes.
    pub navigation_hangs: bool,
    /// `goto` fails immediately.
    pub navigation_fails: bool,
}

impl PageScript {
    pub fn appears(mut self, selector: &str, after: Duration) -> Self {
        self.appearing.insert(selector.to_string(), after);
        self
    }

    pub fn listing(mut self, selector: &str, containers: Vec<FakeNode>) -> Self {
        self.listings.insert(selector.to_string(), containers);
        self
    }
}

pub struct FakePage {
    script: Arc<PageScript>,
    log: InteractionLog,
}

impl FakePage {
    pub fn new(script: PageScript, log: InteractionLog) -> Self {
        Self {
            script: Arc::new(script),
            log,
        }
    }
}

#[async_trait]
impl PageHandle for FakePage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.log.push(format!("goto {url}"));
        if self.script.navigation_fails {
            bail!("net::ERR_NAME_NOT_RESOLVED");
        }
        if self.script.navigation_hangs {
            futures::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str) -> Result<Box<dyn ElementHandle>> {
        self.log.push(format!("wait {selector}"));
        match self.script.appearing.get(selector) {
            Some(after) => {
                tokio::time::sleep(*after).await;
                Ok(Box::new(FakeElement::new(
                    FakeNode::default(),
                    selector,
                    self.log.clone(),
                )) as Box<dyn ElementHandle>)
            }
            None => futures::future::pending::<Result<Box<dyn ElementHandle>>>().await,
        }
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>> {
        self.log.push(format!("query_all {selector}"));
        Ok(self
            .script
            .listings
            .get(selector)
            .map(|nodes| {
                nodes
                    .iter()
                    .enumerate()
                    .map(|(i, node)| {
                        Box::new(FakeElement::new(
                            node.clone(),
                            &format!("{selector}#{i}"),
                            self.log.clone(),
                        )) as Box<dyn ElementHandle>
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn wait_for_load(&self) -> Result<()> {
        self.log.push("load");
        Ok(())
    }

    async fn url(&self) -> Result<String> {
        Ok("about:blank".to_string())
    }
}

// ─────────────────────── sessions ───────────────────────

#[derive(Default)]
pub struct SessionCounters {
    pub connects: AtomicUsize,
    pub closes: AtomicUsize,
}

impl SessionCounters {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub struct FakeConnector {
    pub script: PageScript,
    pub refuse: bool,
    pub counters: Arc<SessionCounters>,
    pub log: InteractionLog,
}

impl FakeConnector {
    pub fn new(script: PageScript) -> Self {
        Self {
            script,
            refuse: false,
            counters: Arc::new(SessionCounters::default()),
            log: InteractionLog::default(),
        }
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::new(PageScript::default())
        }
    }
}

#[async_trait]
impl BrowserConnector for FakeConnector {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn BrowserSession>> {
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Err(anyhow!("handshake with {endpoint} rejected: 407"));
        }
        Ok(Box::new(FakeSession {
            script: self.script.clone(),
            counters: Arc::clone(&self.counters),
            log: self.log.clone(),
        }))
    }
}

struct FakeSession {
    script: PageScript,
    counters: Arc<SessionCounters>,
    log: InteractionLog,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>> {
        Ok(Box::new(FakePage::new(self.script.clone(), self.log.clone())))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ─────────────────────── sink ───────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub refuse: bool,
    pub batches: Mutex<Vec<(String, ResultBatch)>>,
}

impl RecordingSink {
    pub fn batches(&self) -> Vec<(String, ResultBatch)> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultSink for RecordingSink {
    async fn deliver(&self, callback: &str, batch: &ResultBatch) -> Result<()> {
        if self.refuse {
            bail!("sink unavailable");
        }
        self.batches
            .lock()
            .unwrap()
            .push((callback.to_string(), batch.clone()));
        Ok(())
    }
}

// ─────────────────────── fixtures ───────────────────────

pub const CARD: &str = "div.card";

/// Extractor over the selectors used by [`product_card`].
pub fn card_extractor() -> SelectorExtractor {
    SelectorExtractor::new(FieldSelectors {
        image: "img".into(),
        name: ".name".into(),
        price: ".price".into(),
        url: "a".into(),
    })
    .with_base_url("https://shop.test")
}

/// A product container; `None` leaves the sub-element out entirely.
pub fn product_card(name: Option<&str>, price: Option<&str>, href: Option<&str>) -> FakeNode {
    let mut card =
        FakeNode::default().child("img", FakeNode::attr("src", "https://img.test/p.jpg"));
    if let Some(name) = name {
        card = card.child(".name", FakeNode::text(name));
    }
    if let Some(price) = price {
        card = card.child(".price", FakeNode::text(price));
    }
    if let Some(href) = href {
        card = card.child("a", FakeNode::attr("href", href));
    }
    card
}
