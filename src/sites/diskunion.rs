//! Diskunion product watches
//!
//! Items file format: alternating lines of a display name and the product page URL.
//! Blank lines are ignored.

use crate::batch::{Item, ItemLink, WatchQuery};
use crate::extract::{self, diskunion};

pub const HOST: &str = "diskunion.net";
const DETAIL_PATH: &str = "/portal/ct/detail/";

/// One watched product page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiskunionItemQuery {
    pub name: String,
    pub url: String,

    /// Product code, the last path segment of the URL
    pub code: String,
}

impl DiskunionItemQuery {
    /// Creates a query from a product URL; `None` if the URL has no product code
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Option<Self> {
        let url = url.into();
        let code = product_code(&url)?.to_string();
        Some(Self {
            name: name.into(),
            url,
            code,
        })
    }
}

fn product_code(url: &str) -> Option<&str> {
    let path = url.split(|c: char| c == '?' || c == '#').next().unwrap_or(url);
    let code = path.rsplit('/').next()?;
    (!code.is_empty() && code != path).then_some(code)
}

impl WatchQuery for DiskunionItemQuery {
    fn label(&self) -> String {
        self.name.clone()
    }

    fn target(&self) -> String {
        format!("{}{}", DETAIL_PATH, self.code)
    }

    fn extract(&self, payload: &[u8]) -> Vec<Item> {
        let html = extract::payload_text(payload);
        let release = diskunion::extract_description(&html).summary();

        diskunion::extract_used_items(&html)
            .into_iter()
            .map(|item| {
                item.with_title(release.as_str())
                    .with_link(ItemLink::new("diskunion", self.url.as_str()))
            })
            .collect()
    }

    fn links(&self) -> Vec<ItemLink> {
        vec![ItemLink::new("product page", self.url.as_str())]
    }
}

/// Parses an items file into queries, in file order
///
/// A trailing name without URL is ignored; pairs whose URL has no product code are
/// skipped with a warning.
pub fn parse_items(content: &str) -> Vec<DiskunionItemQuery> {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    lines
        .chunks_exact(2)
        .filter_map(|pair| {
            let query = DiskunionItemQuery::new(pair[0], pair[1]);
            if query.is_none() {
                tracing::warn!(name = pair[0], url = pair[1], "No product code in URL, skipping");
            }
            query
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_items() {
        let content = "\
Black Sabbath - Paranoid
https://diskunion.net/portal/ct/detail/1006123456

Budgie - Never Turn Your Back
https://diskunion.net/portal/ct/detail/XAT-1245
Dangling name
";
        let queries = parse_items(content);

        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].name, "Black Sabbath - Paranoid");
        assert_eq!(queries[0].code, "1006123456");
        assert_eq!(queries[1].code, "XAT-1245");
    }

    #[test]
    fn test_url_without_code_is_skipped() {
        let queries = parse_items("Nothing\nhttps://diskunion.net/portal/ct/detail/\n");
        assert!(queries.is_empty());
        assert_eq!(DiskunionItemQuery::new("x", "no-slashes"), None);
    }

    #[test]
    fn test_code_ignores_query_string() {
        let query =
            DiskunionItemQuery::new("x", "https://diskunion.net/portal/ct/detail/ABC123?ref=list")
                .unwrap();
        assert_eq!(query.code, "ABC123");
        assert_eq!(query.target(), "/portal/ct/detail/ABC123");
    }

    #[test]
    fn test_extract_titles_items_with_release() {
        let query =
            DiskunionItemQuery::new("Paranoid", "https://diskunion.net/portal/ct/detail/1").unwrap();
        let page = r#"<div class="itemSpecArea"><dt class="itemSpecArea__dt">フォーマット</dt><dd class="itemSpecArea__dd">LP</dd></div>
<div class="itemUsedArea__txtArea"><a data-id="U1"><p class="u-price">5,500</p></a></div>"#;

        let items = query.extract(page.as_bytes());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "U1");
        assert_eq!(items[0].title, "LP");
        assert_eq!(items[0].price, "5,500");
        assert_eq!(items[0].links[0].url, "https://diskunion.net/portal/ct/detail/1");
    }
}
