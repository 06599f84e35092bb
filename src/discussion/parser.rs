// src/discussion/parser.rs
//! Structural HTML parsing for discussion list pages, kept apart from HTTP so
//! the selector strategy can be swapped or faked.

use scraper::{ElementRef, Html, Selector};

use super::DiscussionError;

/// Class prefix of discussion list items; the suffix is a build hash.
pub const ITEM_CLASS_PREFIX: &str = "DiscussionList_item__";

/// Raw fields pulled out of one list item, before URL resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFields {
    pub title: String,
    pub href: String,
    pub info: String,
}

pub trait PostParser: Send + Sync {
    fn parse(&self, html: &str) -> Result<Vec<PostFields>, DiscussionError>;
}

/// CSS-selector based parser.
pub struct SelectorParser {
    item: Selector,
    item_prefix: String,
    title: Selector,
    link: Selector,
    info: Selector,
}

fn selector(css: &str) -> Result<Selector, DiscussionError> {
    Selector::parse(css).map_err(|e| DiscussionError::Selector(format!("{css}: {e}")))
}

/// Text of every descendant node, each piece trimmed, concatenated.
fn stripped_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).collect()
}

impl SelectorParser {
    pub fn new() -> Result<Self, DiscussionError> {
        Self::with_item_class_prefix(ITEM_CLASS_PREFIX)
    }

    pub fn with_item_class_prefix(prefix: &str) -> Result<Self, DiscussionError> {
        Ok(Self {
            item: selector(&format!("li[class*=\"{prefix}\"]"))?,
            item_prefix: prefix.to_string(),
            title: selector("strong")?,
            link: selector("a")?,
            info: selector("span")?,
        })
    }
}

impl PostParser for SelectorParser {
    fn parse(&self, html: &str) -> Result<Vec<PostFields>, DiscussionError> {
        let document = Html::parse_document(html);
        let mut out = Vec::new();

        // The attribute selector is a substring match; keep only items with a
        // class token that actually starts with the prefix.
        let items = document.select(&self.item).filter(|li| {
            li.value()
                .classes()
                .any(|c| c.starts_with(self.item_prefix.as_str()))
        });

        for (index, item) in items.enumerate() {
            let title = item
                .select(&self.title)
                .next()
                .map(stripped_text)
                .ok_or(DiscussionError::MissingElement {
                    index,
                    part: "title",
                })?;
            let href = item
                .select(&self.link)
                .next()
                .and_then(|a| a.value().attr("href"))
                .ok_or(DiscussionError::MissingElement {
                    index,
                    part: "link",
                })?;
            let info = item
                .select(&self.info)
                .next()
                .map(stripped_text)
                .unwrap_or_default();

            out.push(PostFields {
                title,
                href: href.to_string(),
                info,
            });
        }

        tracing::debug!(posts = out.len(), "discussion document parsed");
        Ok(out)
    }
}
