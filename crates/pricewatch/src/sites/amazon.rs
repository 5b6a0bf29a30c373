//! amazon.ca search results.

use super::SiteDefinition;

pub(super) const AMAZON_CA: SiteDefinition = SiteDefinition {
    site: "https://amazon.ca",
    search_field: Some(r#"input[name="field-keywords"]"#),
    search_button: Some(r#"input[value="Go"]"#),
    product_container: "div.s-card-container",
    image: "img.s-image",
    name: "h2 a span",
    price: "span.a-offscreen",
    url: concat!(
        "a.a-link-normal.s-no-hover.s-underline-text",
        ".s-underline-link-text.s-link-style.a-text-normal"
    ),
};
