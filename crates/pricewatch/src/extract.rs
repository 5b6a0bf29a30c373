//! Product extraction from a single results-page container.
//!
//! Extraction never fails because something is missing. A container
//! without a price element, or with a price like "Out of stock", yields a
//! product with `price: None`, and the collector decides what to keep.
//! Only transport errors from the browser propagate.

use crate::browser::ElementHandle;
use crate::types::ExtractedProduct;
use anyhow::Result;
use async_trait::async_trait;
use url::Url;

/// Extracts one product from its container element.
#[async_trait]
pub trait ProductExtractor: Send + Sync {
    async fn extract(&self, container: &dyn ElementHandle) -> Result<ExtractedProduct>;
}

/// CSS selectors for the four product fields, relative to the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelectors {
    pub image: String,
    pub name: String,
    pub price: String,
    pub url: String,
}

/// Declarative extractor driven by [`FieldSelectors`].
#[derive(Debug, Clone)]
pub struct SelectorExtractor {
    selectors: FieldSelectors,
    base_url: Option<Url>,
}

impl SelectorExtractor {
    pub fn new(selectors: FieldSelectors) -> Self {
        Self {
            selectors,
            base_url: None,
        }
    }

    /// Resolve relative product hrefs against `base`.
    pub fn with_base_url(mut self, base: &str) -> Self {
        self.base_url = Url::parse(base).ok();
        self
    }

    pub fn selectors(&self) -> &FieldSelectors {
        &self.selectors
    }
}

#[async_trait]
impl ProductExtractor for SelectorExtractor {
    async fn extract(&self, container: &dyn ElementHandle) -> Result<ExtractedProduct> {
        let s = &self.selectors;

        // None of the four lookups depends on another.
        let (image_el, name_el, price_el, url_el) = futures::join!(
            container.query(&s.image),
            container.query(&s.name),
            container.query(&s.price),
            container.query(&s.url),
        );
        let (image_el, name_el, price_el, url_el) = (image_el?, name_el?, price_el?, url_el?);

        let (image, name, price_text, href) = futures::join!(
            fetch(image_el.as_deref(), |el| el.attribute("src")),
            fetch(name_el.as_deref(), |el| el.inner_text()),
            fetch(price_el.as_deref(), |el| el.inner_text()),
            fetch(url_el.as_deref(), |el| el.attribute("href")),
        );

        let name = name?
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let price = price_text?.as_deref().and_then(parse_price);
        let url = href?
            .as_deref()
            .and_then(|h| normalize_url(self.base_url.as_ref(), h));

        Ok(ExtractedProduct {
            name,
            url,
            image: image?,
            price,
        })
    }
}

/// Run `op` on the element if it is present.
async fn fetch<'a, F, Fut>(element: Option<&'a dyn ElementHandle>, op: F) -> Result<Option<String>>
where
    F: FnOnce(&'a dyn ElementHandle) -> Fut,
    Fut: std::future::Future<Output = Result<Option<String>>>,
{
    match element {
        Some(el) => op(el).await,
        None => Ok(None),
    }
}

/// Currency marks that may surround a displayed price. Longer marks come
/// first so `CDN$` is not taken for `$`.
const CURRENCY_MARKS: &[&str] = &["CDN$", "CA$", "US$", "C$", "$", "€", "£"];

fn strip_currency(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = CURRENCY_MARKS.iter().find_map(|m| s.strip_prefix(m)) {
        s = rest.trim_start();
    }
    if let Some(rest) = CURRENCY_MARKS.iter().find_map(|m| s.strip_suffix(m)) {
        s = rest.trim_end();
    }
    s
}

/// Parse a displayed price such as `"$1,299.00"` or `"CDN$ 45.99"`.
///
/// Only a currency mark and `,` thousands separators are removed; what is
/// left must be a plain non-negative decimal, so text like
/// `"Only 3 left in stock"` is `None`.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned = strip_currency(text).replace(',', "");
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    value.is_finite().then_some(value)
}

/// Shorten a product href to its four leading `/`-separated segments.
///
/// Absolute hrefs keep scheme, host and the first two path segments, so
/// `https://site.com/dp/ID/ref=abc?x=1` becomes `https://site.com/dp/ID`.
/// Relative hrefs are treated as root-relative and keep their first three
/// path pieces (`/Name/dp/ID`), then are resolved against `base` when one
/// is given.
pub fn normalize_url(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    match Url::parse(href) {
        Ok(url) => {
            let host = url.host_str()?;
            let mut out = format!("{}://{}", url.scheme(), host);
            if let Some(port) = url.port() {
                out.push_str(&format!(":{port}"));
            }
            for segment in url
                .path_segments()
                .into_iter()
                .flatten()
                .filter(|s| !s.is_empty())
                .take(2)
            {
                out.push('/');
                out.push_str(segment);
            }
            Some(out)
        }
        Err(_) => {
            // Root-relative whether or not the href had a leading slash.
            let pieces: Vec<&str> = href.trim_start_matches('/').split('/').take(3).collect();
            let short = format!("/{}", pieces.join("/"));
            match base {
                Some(base) => base.join(&short).ok().map(String::from),
                None => Some(short),
            }
        }
    }
}
