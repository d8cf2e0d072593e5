//! User-facing notices rendered in place of protected content.
//!
//! Notices are generic. Validation diagnostics never reach them, and every
//! interpolated value is HTML-escaped.

use crate::config::GateConfig;
use crate::protocol::models::ContentId;
use url::Url;

/// Words kept from an excerpt in the teaser preview.
pub const PREVIEW_WORDS: usize = 20;

/// Message emitted in place of a protected feed.
pub const FEED_DENIED_MESSAGE: &str =
    "This feed is protected. Please access content through our website.";

/// Escape text for inclusion in HTML body or attribute context.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Drop anything between `<` and `>`.
pub fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// First `count` whitespace-separated words of the tag-stripped text.
pub fn trim_words(input: &str, count: usize) -> String {
    strip_tags(input)
        .split_whitespace()
        .take(count)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Marketplace URL for a content item, carrying `content_id` and `site`.
///
/// Falls back to the bare configured URL when it does not parse.
pub fn marketplace_link(config: &GateConfig, content_id: ContentId) -> String {
    match Url::parse(&config.marketplace_url) {
        Ok(mut url) => {
            url.query_pairs_mut()
                .append_pair("content_id", &content_id.to_string())
                .append_pair("site", &config.site_url);
            url.into()
        }
        Err(_) => config.marketplace_url.clone(),
    }
}

/// Block substituted for a protected item's full content.
pub fn access_denied(config: &GateConfig, content_id: ContentId) -> String {
    format!(
        concat!(
            "<div class=\"contentgate-access-denied\">",
            "<p>This content is protected. Please provide a valid access token to view it.</p>",
            "<p><a href=\"{}\">Get access</a> through the marketplace.</p>",
            "</div>"
        ),
        escape_html(&marketplace_link(config, content_id))
    )
}

/// Teaser substituted for a protected item's excerpt.
pub fn excerpt_preview(config: &GateConfig, content_id: ContentId, excerpt: &str) -> String {
    format!(
        "{}... (Protected Content) <a href=\"{}\">Get access</a>",
        escape_html(&trim_words(excerpt, PREVIEW_WORDS)),
        escape_html(&marketplace_link(config, content_id))
    )
}
