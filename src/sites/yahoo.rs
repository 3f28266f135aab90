//! Yahoo! Auctions keyword searches
//!
//! Keywords file format: one keyword per line. A line starting with `-` sets
//! parameters for the keywords that follow it:
//!
//! ```text
//! -categories:22260,2084007217 -searchMethod:title
//! led zeppelin
//! -searchMethod:fuzzySearch
//! budgie
//! ```
//!
//! Every keyword yields one query per category in effect.

use crate::batch::{Item, ItemLink, WatchQuery};
use crate::extract::{self, yahoo::extract_auctions};
use std::fmt;
use url::form_urlencoded;

pub const HOST: &str = "auctions.yahoo.co.jp";
const AUCTION_PAGE_URL: &str = "https://auctions.yahoo.co.jp/jp/auction/";
const MIRROR_AUCTION_URL: &str = "https://injapan.ru/auction/";
const MIRROR_SEARCH_URL: &str =
    "https://injapan.ru/search/do//currency-JPY/mode-1/page-1/sort-start/order-na.html";

const CATEGORIES_PARAM: &str = "-categories:";
const SEARCH_METHOD_PARAM: &str = "-searchMethod:";

/// Category searched when the keywords file does not name one (Music)
pub const DEFAULT_CATEGORY: &str = "22152";

/// Which part of a listing a keyword is matched against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SearchMethod {
    Title,
    #[default]
    TitleAndDescription,
    FuzzySearch,
}

impl SearchMethod {
    /// Parses a keywords file value; unknown values fall back to title and description
    pub fn parse(s: &str) -> Self {
        match s {
            "title" => Self::Title,
            "fuzzySearch" => Self::FuzzySearch,
            _ => Self::TitleAndDescription,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::TitleAndDescription => "titleAndDescription",
            Self::FuzzySearch => "fuzzySearch",
        }
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display name of a Yahoo! Auctions category id
pub fn category_name(category: &str) -> &'static str {
    match category {
        "22152" => "Music",
        "22192" => "CD",
        "22260" => "Records",
        "22344" => "Tapes",
        "2084007217" => "Records, Hard Rock",
        "2084007205" => "CD, Hard Rock",
        "2084007218" => "Records, Punk",
        "2084007024" => "Records, Rock",
        "22196" => "CD, Rock",
        _ => "Unknown category",
    }
}

/// One keyword search in one category
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct YahooSearchQuery {
    pub keyword: String,
    pub category: String,
    pub method: SearchMethod,
}

impl YahooSearchQuery {
    pub fn new(keyword: impl Into<String>, category: impl Into<String>, method: SearchMethod) -> Self {
        Self {
            keyword: keyword.into(),
            category: category.into(),
            method,
        }
    }

    pub fn category_name(&self) -> &'static str {
        category_name(&self.category)
    }

    /// Keyword as it appears in query strings (spaces become `+`)
    fn encoded_keyword(&self) -> String {
        form_urlencoded::byte_serialize(self.keyword.as_bytes()).collect()
    }

    /// Search on the injapan.ru mirror, which proxies bids
    pub fn mirror_search_url(&self) -> String {
        let mut url = format!(
            "{}?query={}&scope={}",
            MIRROR_SEARCH_URL,
            self.encoded_keyword(),
            self.category
        );
        if self.method == SearchMethod::TitleAndDescription {
            url.push_str("&description=on");
        }
        url
    }
}

impl WatchQuery for YahooSearchQuery {
    fn label(&self) -> String {
        format!("{} {} {}", self.keyword, self.category_name(), self.method)
    }

    fn target(&self) -> String {
        let keyword = self.encoded_keyword();
        let matching = match self.method {
            SearchMethod::FuzzySearch => "ngram=1",
            SearchMethod::Title => "f=0x2",
            SearchMethod::TitleAndDescription => "f=0x4",
        };

        format!(
            "/search/search?p={keyword}&auccat={category}&va={keyword}\
             &is_postage_mode=1&dest_pref_code=13&exflg=1&b=1&n=100&s1=new&o1=d&{matching}",
            category = self.category,
        )
    }

    fn extract(&self, payload: &[u8]) -> Vec<Item> {
        extract_auctions(&extract::payload_text(payload))
            .into_iter()
            .map(|item| {
                let yahoo = ItemLink::new("Yahoo", format!("{}{}", AUCTION_PAGE_URL, item.id));
                let mirror = ItemLink::new("injapan", format!("{}{}", MIRROR_AUCTION_URL, item.id));
                item.with_link(yahoo).with_link(mirror)
            })
            .collect()
    }

    fn links(&self) -> Vec<ItemLink> {
        vec![ItemLink::new("injapan search", self.mirror_search_url())]
    }
}

/// Parameters in effect while reading a keywords file
#[derive(Debug, Clone, PartialEq, Eq)]
struct SearchParams {
    categories: Vec<String>,
    method: SearchMethod,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            categories: vec![DEFAULT_CATEGORY.to_string()],
            method: SearchMethod::default(),
        }
    }
}

impl SearchParams {
    /// Applies a parameter line; returns false for keyword lines
    fn apply(&mut self, line: &str) -> bool {
        if !line.starts_with('-') {
            return false;
        }

        if let Some(value) = param_value(line, CATEGORIES_PARAM) {
            let categories: Vec<String> = value
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
            if !categories.is_empty() {
                self.categories = categories;
            }
        }

        if let Some(value) = param_value(line, SEARCH_METHOD_PARAM) {
            self.method = SearchMethod::parse(value);
        }

        true
    }
}

/// Value following `name` up to the next whitespace
fn param_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let start = line.find(name)? + name.len();
    let rest = &line[start..];
    let value = rest.split(char::is_whitespace).next().unwrap_or("");
    (!value.is_empty()).then_some(value)
}

/// Parses a keywords file into queries, in file order
pub fn parse_keywords(content: &str) -> Vec<YahooSearchQuery> {
    let mut params = SearchParams::default();
    let mut queries = Vec::new();

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if params.apply(line) {
            continue;
        }
        for category in &params.categories {
            queries.push(YahooSearchQuery::new(line, category.as_str(), params.method));
        }
    }

    queries
}
