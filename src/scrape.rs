//! One search execution: fetch the result page, normalize the listings,
//! assign storage keys, and reconcile both tables against the database.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::config::Search;
use crate::db::{self, HotelRow, SearchRow};
use crate::fetch::PageFetcher;
use crate::{keys, parser, url};

/// What one search contributed to storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchOutcome {
    pub listings_parsed: usize,
    pub searches_inserted: usize,
    pub hotels_inserted: usize,
}

/// Run a single search end to end.
///
/// Configuration has already been validated; a malformed mandatory field in
/// the scraped page aborts this search's batch, and storage write failures
/// are logged without rolling back whatever already committed.
pub fn run_search(
    conn: &Connection,
    fetcher: &dyn PageFetcher,
    search: &Search,
    now: DateTime<Utc>,
) -> Result<SearchOutcome> {
    let url = url::search_url(search);
    info!("Searching url: {}", url);

    let table = fetcher.fetch(&url)?;
    if table.is_empty() {
        info!("No listings returned for ordinal {}", search.ordinal);
        return Ok(SearchOutcome::default());
    }

    let listings = parser::parse(&table)?;
    let search_row = build_search_row(search, now);
    let hotel_rows: Vec<HotelRow> = listings
        .into_iter()
        .map(|listing| HotelRow {
            id: keys::listing_key(&listing, search_row.id),
            search_id: search_row.id,
            listing,
        })
        .collect();
    let hotel_rows = keys::dedup_by_key(hotel_rows);
    let listings_parsed = hotel_rows.len();

    // Best-effort persistence: a failed append is reported, not fatal.
    let searches_inserted = match db::upsert_search(conn, &search_row) {
        Ok(n) => n,
        Err(e) => {
            warn!("Failed to upsert 1 record to <search>: {}", e);
            0
        }
    };
    let hotels_inserted = match db::upsert_hotels(conn, &hotel_rows) {
        Ok(n) => n,
        Err(e) => {
            warn!(
                "Failed to upsert {} records to <hotels>: {}",
                hotel_rows.len(),
                e
            );
            0
        }
    };

    Ok(SearchOutcome {
        listings_parsed,
        searches_inserted,
        hotels_inserted,
    })
}

/// Assemble the search row: capture timestamp, derived columns, and the
/// content key. Derived columns are filled after keying.
fn build_search_row(search: &Search, now: DateTime<Utc>) -> SearchRow {
    let mut row = SearchRow {
        id: 0,
        city: search.city.clone(),
        state: search.state.clone(),
        country: search.country.clone(),
        checkin_datetime: search.checkin_datetime,
        checkout_datetime: search.checkout_datetime,
        price_min: search.price_min,
        price_max: search.price_max,
        price_multiplier: search.price_multiplier,
        star_rating_min: search.star_rating_min,
        star_rating_max: search.star_rating_max,
        guest_rating_min: search.guest_rating_min,
        guest_rating_max: search.guest_rating_max,
        distance_centre: search.distance_centre,
        rooms: search.rooms,
        adults: search.adults,
        children: search.children,
        currency: search.currency.clone(),
        search_datetime: now,
        days_from_search: 0,
        nights: 0,
    };
    row.id = keys::search_key(&row);
    row.days_from_search = search
        .checkin_datetime
        .signed_duration_since(now)
        .num_days();
    row.nights = search
        .checkout_datetime
        .signed_duration_since(search.checkin_datetime)
        .num_days();
    row
}

// ── Tests ──
