//! Content-addressed storage keys.
//!
//! Every stored row is keyed by a deterministic hash of its column values in
//! a fixed column order, reduced into the 32-bit key space. Re-running an
//! unchanged search therefore reproduces keys that already exist in storage,
//! and the upsert path skips them.

use sha2::{Digest, Sha256};

use crate::db::{HotelRow, SearchRow};
use crate::parser::Listing;

pub const KEY_SPACE: u64 = 0xFFFF_FFFF;

/// Hash column values into a 32-bit key.
///
/// Columns are fed through SHA-256 with a separator byte between values, so
/// `("ab", "c")` and `("a", "bc")` hash differently.
pub fn row_key<'a, I>(columns: I) -> u32
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = Sha256::new();
    for value in columns {
        hasher.update(value.as_bytes());
        hasher.update([0x1f]);
    }
    let digest = hasher.finalize();
    let mut word = [0u8; 8];
    word.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(word) % KEY_SPACE) as u32
}

/// Key for a search row, computed over the full parameter set and the
/// capture timestamp. The derived `days_from_search`/`nights` columns and
/// the `id` itself are excluded; they are filled in after keying.
pub fn search_key(row: &SearchRow) -> u32 {
    let columns = [
        row.checkin_datetime.to_rfc3339(),
        row.checkout_datetime.to_rfc3339(),
        row.price_min.to_string(),
        row.price_max.to_string(),
        row.price_multiplier.to_string(),
        row.star_rating_min.to_string(),
        row.star_rating_max.to_string(),
        row.guest_rating_min.to_string(),
        row.guest_rating_max.to_string(),
        opt_f64(row.distance_centre),
        row.rooms.to_string(),
        row.adults.to_string(),
        row.children.to_string(),
        row.currency.clone(),
        row.city.clone(),
        row.state.clone(),
        row.country.clone(),
        row.search_datetime.to_rfc3339(),
    ];
    row_key(columns.iter().map(String::as_str))
}

/// Key for a normalized listing under a given search.
///
/// The foreign `search_id` is part of the hashed content, so identical
/// listing text seen by two different searches yields two different keys,
/// while a re-scrape within one search collapses to the same key.
pub fn listing_key(listing: &Listing, search_id: u32) -> u32 {
    let columns = [
        listing.name.clone(),
        listing.address.clone(),
        listing.landmarks.clone(),
        listing.amenities.clone(),
        listing.details.clone(),
        listing.review_box.clone(),
        opt_f64(listing.rating),
        opt_i64(listing.num_reviews),
        opt_i64(listing.price),
        listing.star_rating.to_string(),
        listing.price_metadata.clone(),
        opt_i64(listing.price_sale),
        listing.rating_sentiment.clone().unwrap_or_default(),
        opt_f64(listing.distance_centre),
        search_id.to_string(),
    ];
    row_key(columns.iter().map(String::as_str))
}

/// Keep the first occurrence of every key within a batch.
pub fn dedup_by_key(rows: Vec<HotelRow>) -> Vec<HotelRow> {
    let mut seen = std::collections::HashSet::new();
    rows.into_iter().filter(|r| seen.insert(r.id)).collect()
}

fn opt_i64(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn opt_f64(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

// ── Tests ──
