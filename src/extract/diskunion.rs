//! Diskunion product detail pages
//!
//! A product page describes one release and lists the used copies currently in
//! stock. Each used copy becomes an item; the release description is shared.

use crate::batch::Item;
use crate::extract::markup::{decode_entities, Markup};

const SPEC_AREA: &str = "<div class=\"itemSpecArea\"";
const SPEC_VALUE_OPEN: &str = "<dd class=\"itemSpecArea__dd\">";
const SPEC_VALUE_CLOSE: &str = "</dd>";
const LINK_CLOSE: &str = "</a>";

const LABEL_TERM: &str = "<dt class=\"itemSpecArea__dt\">レーベル</dt>";
const COUNTRY_TERM: &str = "<dt class=\"itemSpecArea__dt\">国(Country)</dt>";
const FORMAT_TERM: &str = "<dt class=\"itemSpecArea__dt\">フォーマット</dt>";
const CATALOG_NUMBER_TERM: &str = "<dt class=\"itemSpecArea__dt\">規格番号</dt>";
const RELEASE_DATE_TERM: &str = "<dt class=\"itemSpecArea__dt\">発売日</dt>";
const BARCODE_TERM: &str = "<dt class=\"itemSpecArea__dt\">EAN</dt>";

const USED_AREA: &str = "<div class=\"itemUsedArea__txtArea\">";
const DATA_ID: &str = "data-id";
const PRICE_OPEN: &str = "<p class=\"u-price\">";
const NOTES_OPEN: &str = "<ul class=\"u-bullet-note add__du__text_wordbreak\">";
const NOTES_CLOSE: &str = "</ul>";
const NOTE_OPEN: &str = "<li>";
const NOTE_CLOSE: &str = "</li>";

/// Release details from the details table of a product page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseDescription {
    pub label: String,
    pub country: String,
    pub format: String,
    pub catalog_number: String,
    pub release_year: String,
    pub barcode: String,
}

impl ReleaseDescription {
    /// One-line summary of the non-empty fields
    pub fn summary(&self) -> String {
        [
            self.label.as_str(),
            self.format.as_str(),
            self.country.as_str(),
            self.release_year.as_str(),
            self.catalog_number.as_str(),
            self.barcode.as_str(),
        ]
        .into_iter()
        .filter(|field| !field.is_empty())
        .collect::<Vec<_>>()
        .join(" / ")
    }
}

/// Reads the details table; missing fields are left empty
pub fn extract_description(html: &str) -> ReleaseDescription {
    let spec = Markup::new(html).after(SPEC_AREA);

    let release_year = spec_value(spec, RELEASE_DATE_TERM)
        .chars()
        .take(4)
        .collect();

    ReleaseDescription {
        label: label(spec),
        country: spec_value(spec, COUNTRY_TERM),
        format: spec_value(spec, FORMAT_TERM),
        catalog_number: spec_value(spec, CATALOG_NUMBER_TERM),
        release_year,
        barcode: spec_value(spec, BARCODE_TERM),
    }
}

/// Extracts the used copies listed on a product page, in page order
///
/// Items carry the copy's id and price; each line of its condition notes becomes
/// an item note.
pub fn extract_used_items(html: &str) -> Vec<Item> {
    let mut items = Vec::new();
    let mut cursor = Markup::new(html);

    loop {
        cursor.skip_past(USED_AREA);
        if !cursor.has_content() {
            break;
        }

        let copy = cursor.section(USED_AREA);
        let id = copy.attribute(DATA_ID).trim();
        if id.is_empty() {
            tracing::trace!("Skipping used copy without data-id");
            continue;
        }

        let price = copy.after(PRICE_OPEN).before("<");
        let mut item = Item::new(id).with_price(price.content().trim());
        for note in notes(copy) {
            item = item.with_note(note);
        }
        items.push(item);
    }

    items
}

fn spec_value(spec: Markup<'_>, term: &str) -> String {
    let value = spec.after(term).after(SPEC_VALUE_OPEN).before(SPEC_VALUE_CLOSE);
    decode_entities(value.content().trim())
}

/// The label cell usually wraps the name in a link
fn label(spec: Markup<'_>) -> String {
    let cell = spec
        .after(LABEL_TERM)
        .after(SPEC_VALUE_OPEN)
        .before(SPEC_VALUE_CLOSE);

    let linked = cell.before(LINK_CLOSE).after(">");
    let name = if linked.has_content() { linked } else { cell };
    decode_entities(name.content().trim())
}

fn notes(copy: Markup<'_>) -> Vec<String> {
    let mut list = copy.after(NOTES_OPEN).before(NOTES_CLOSE);
    let mut notes = Vec::new();

    while list.has_content() {
        let note = list.after(NOTE_OPEN).before(NOTE_CLOSE);
        let text = note.content().trim();
        if !text.is_empty() {
            notes.push(decode_entities(text));
        }
        list.skip_past(NOTE_CLOSE);
    }

    notes
}
