//! Yahoo! Auctions search result pages

use crate::batch::Item;
use crate::extract::markup::{decode_entities, Markup};

const PRODUCT_TITLE_MARKER: &str = "class=\"Product__title\"";
const AUCTION_ID: &str = "data-auction-id";
const AUCTION_TITLE: &str = "data-auction-title";
const AUCTION_IMAGE: &str = "data-auction-img";
const AUCTION_PRICE: &str = "data-auction-price";

/// Extracts every auction listed on a search result page, in page order
///
/// Each product title marker yields one item whose fields come from the
/// `data-auction-*` attributes between it and the next marker. Listings without
/// an auction id are skipped since they cannot be tracked.
pub fn extract_auctions(html: &str) -> Vec<Item> {
    let mut auctions = Vec::new();
    let mut cursor = Markup::new(html);

    loop {
        cursor.skip_past(PRODUCT_TITLE_MARKER);
        if !cursor.has_content() {
            break;
        }

        let listing = cursor.section(PRODUCT_TITLE_MARKER);
        let id = listing.attribute(AUCTION_ID).trim();
        if id.is_empty() {
            tracing::trace!("Skipping listing without auction id");
            continue;
        }

        let mut item = Item::new(id)
            .with_title(decode_entities(listing.attribute(AUCTION_TITLE)))
            .with_price(listing.attribute(AUCTION_PRICE).trim());

        let image = listing.attribute(AUCTION_IMAGE).trim();
        if !image.is_empty() {
            item = item.with_image(image);
        }

        auctions.push(item);
    }

    auctions
}
