//! Site profile registry.
//!
//! Maps a site identifier (the site's root URL) to the selectors needed to
//! search it and the extractor that turns a product container into a
//! record. Supporting another site means adding one row to [`SITES`].

mod amazon;

use crate::extract::{FieldSelectors, ProductExtractor, SelectorExtractor};
use std::collections::HashMap;
use std::sync::Arc;

/// How to search and enumerate products on one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteProfile {
    pub search_field_selector: Option<String>,
    pub search_button_selector: Option<String>,
    pub product_container_selector: String,
}

/// One row of the static site table.
#[derive(Debug, Clone, Copy)]
pub struct SiteDefinition {
    pub site: &'static str,
    pub search_field: Option<&'static str>,
    pub search_button: Option<&'static str>,
    pub product_container: &'static str,
    pub image: &'static str,
    pub name: &'static str,
    pub price: &'static str,
    pub url: &'static str,
}

impl SiteDefinition {
    fn profile(&self) -> SiteProfile {
        SiteProfile {
            search_field_selector: self.search_field.map(String::from),
            search_button_selector: self.search_button.map(String::from),
            product_container_selector: self.product_container.to_string(),
        }
    }

    fn extractor(&self) -> SelectorExtractor {
        SelectorExtractor::new(FieldSelectors {
            image: self.image.to_string(),
            name: self.name.to_string(),
            price: self.price.to_string(),
            url: self.url.to_string(),
        })
        .with_base_url(self.site)
    }
}

/// Every built-in site.
pub const SITES: &[SiteDefinition] = &[amazon::AMAZON_CA];

/// A registered site: its profile plus its extraction capability.
#[derive(Clone)]
pub struct SiteEntry {
    pub site: String,
    pub profile: SiteProfile,
    pub extractor: Arc<dyn ProductExtractor>,
}

impl std::fmt::Debug for SiteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteEntry")
            .field("site", &self.site)
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

/// Lookup table from site identifier to [`SiteEntry`].
#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    entries: HashMap<String, SiteEntry>,
}

/// Canonical form of a site identifier: trimmed, lowercased, no trailing `/`.
pub fn normalize_site_id(site: &str) -> String {
    site.trim().trim_end_matches('/').to_lowercase()
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every row of [`SITES`].
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for def in SITES {
            registry.register(def.site, def.profile(), Arc::new(def.extractor()));
        }
        registry
    }

    /// Add or replace a site.
    pub fn register(
        &mut self,
        site: &str,
        profile: SiteProfile,
        extractor: Arc<dyn ProductExtractor>,
    ) {
        let key = normalize_site_id(site);
        self.entries.insert(
            key.clone(),
            SiteEntry {
                site: key,
                profile,
                extractor,
            },
        );
    }

    pub fn lookup(&self, site: &str) -> Option<&SiteEntry> {
        self.entries.get(&normalize_site_id(site))
    }

    /// Supported site identifiers, sorted.
    pub fn sites(&self) -> Vec<&str> {
        let mut sites: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        sites.sort_unstable();
        sites
    }
}
