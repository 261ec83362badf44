use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::info;

use crate::parser::Listing;

const DB_PATH: &str = "data/hotels.sqlite";

pub fn connect() -> Result<Connection> {
    if let Some(dir) = std::path::Path::new(DB_PATH).parent() {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(DB_PATH)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS search (
            id                INTEGER PRIMARY KEY,
            city              TEXT NOT NULL,
            state             TEXT NOT NULL,
            country           TEXT NOT NULL,
            checkin_datetime  TEXT NOT NULL,
            checkout_datetime TEXT NOT NULL,
            price_min         INTEGER,
            price_max         INTEGER,
            price_multiplier  INTEGER,
            star_rating_min   INTEGER,
            star_rating_max   INTEGER,
            guest_rating_min  INTEGER,
            guest_rating_max  INTEGER,
            distance_centre   REAL,
            rooms             INTEGER,
            adults            INTEGER,
            children          INTEGER,
            currency          TEXT,
            search_datetime   TEXT NOT NULL,
            days_from_search  INTEGER,
            nights            INTEGER
        );

        CREATE TABLE IF NOT EXISTS hotels (
            id               INTEGER PRIMARY KEY,
            search_id        INTEGER NOT NULL REFERENCES search(id),
            name             TEXT,
            address          TEXT,
            landmarks        TEXT,
            amenities        TEXT,
            details          TEXT,
            review_box       TEXT,
            rating           REAL,
            num_reviews      INTEGER,
            price            INTEGER,
            star_rating      REAL NOT NULL,
            price_metadata   TEXT,
            price_sale       INTEGER,
            rating_sentiment TEXT,
            distance_centre  REAL
        );
        CREATE INDEX IF NOT EXISTS idx_hotels_search ON hotels(search_id);
        ",
    )?;
    Ok(())
}

// ── Rows ──

/// One search execution, keyed by the fingerprint of its parameters.
#[derive(Debug, Clone)]
pub struct SearchRow {
    pub id: u32,
    pub city: String,
    pub state: String,
    pub country: String,
    pub checkin_datetime: DateTime<Utc>,
    pub checkout_datetime: DateTime<Utc>,
    pub price_min: i64,
    pub price_max: i64,
    pub price_multiplier: i64,
    pub star_rating_min: i64,
    pub star_rating_max: i64,
    pub guest_rating_min: i64,
    pub guest_rating_max: i64,
    pub distance_centre: Option<f64>,
    pub rooms: i64,
    pub adults: i64,
    pub children: i64,
    pub currency: String,
    pub search_datetime: DateTime<Utc>,
    pub days_from_search: i64,
    pub nights: i64,
}

/// One stored listing: a normalized record plus its storage keys.
#[derive(Debug, Clone)]
pub struct HotelRow {
    pub id: u32,
    pub search_id: u32,
    pub listing: Listing,
}

// ── Upserts ──

/// Which of `ids` already exist in `table`.
fn existing_ids(conn: &Connection, table: &str, ids: &[u32]) -> Result<HashSet<u32>> {
    if ids.is_empty() {
        return Ok(HashSet::new());
    }
    let placeholders = vec!["?"; ids.len()].join(",");
    let sql = format!("SELECT id FROM {} WHERE id IN ({})", table, placeholders);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            rusqlite::params_from_iter(ids.iter().map(|id| *id as i64)),
            |row| row.get::<_, i64>(0),
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().map(|id| id as u32).collect())
}

/// Insert the search row unless its key is already stored. Returns the
/// number of rows appended (0 or 1).
pub fn upsert_search(conn: &Connection, row: &SearchRow) -> Result<usize> {
    let existing = existing_ids(conn, "search", &[row.id])?;
    if existing.contains(&row.id) {
        info!("0/1 records upserted to <search> (key already stored)");
        return Ok(0);
    }
    conn.execute(
        "INSERT INTO search
         (id, city, state, country, checkin_datetime, checkout_datetime,
          price_min, price_max, price_multiplier, star_rating_min, star_rating_max,
          guest_rating_min, guest_rating_max, distance_centre, rooms, adults,
          children, currency, search_datetime, days_from_search, nights)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21)",
        rusqlite::params![
            row.id as i64,
            row.city,
            row.state,
            row.country,
            row.checkin_datetime.to_rfc3339(),
            row.checkout_datetime.to_rfc3339(),
            row.price_min,
            row.price_max,
            row.price_multiplier,
            row.star_rating_min,
            row.star_rating_max,
            row.guest_rating_min,
            row.guest_rating_max,
            row.distance_centre,
            row.rooms,
            row.adults,
            row.children,
            row.currency,
            row.search_datetime.to_rfc3339(),
            row.days_from_search,
            row.nights,
        ],
    )?;
    info!("1/1 records upserted to <search>");
    Ok(1)
}

/// Append the listing rows whose keys are not yet stored. Rows with known
/// keys are skipped; nothing is ever updated in place. Returns the number
/// of rows appended.
pub fn upsert_hotels(conn: &Connection, rows: &[HotelRow]) -> Result<usize> {
    let attempted = rows.len();
    if rows.is_empty() {
        return Ok(0);
    }

    let ids: Vec<u32> = rows.iter().map(|r| r.id).collect();
    let existing = existing_ids(conn, "hotels", &ids)?;
    let fresh: Vec<&HotelRow> = rows.iter().filter(|r| !existing.contains(&r.id)).collect();
    if fresh.is_empty() {
        info!("0/{} records upserted to <hotels> (no unseen keys)", attempted);
        return Ok(0);
    }

    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO hotels
             (id, search_id, name, address, landmarks, amenities, details, review_box,
              rating, num_reviews, price, star_rating, price_metadata, price_sale,
              rating_sentiment, distance_centre)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16)",
        )?;
        for row in &fresh {
            let l = &row.listing;
            stmt.execute(rusqlite::params![
                row.id as i64,
                row.search_id as i64,
                l.name,
                l.address,
                l.landmarks,
                l.amenities,
                l.details,
                l.review_box,
                l.rating,
                l.num_reviews,
                l.price,
                l.star_rating,
                l.price_metadata,
                l.price_sale,
                l.rating_sentiment,
                l.distance_centre,
            ])?;
        }
    }
    tx.commit()?;
    info!("{}/{} records upserted to <hotels>", fresh.len(), attempted);
    Ok(fresh.len())
}

// ── Reporting ──

pub struct Stats {
    pub searches: usize,
    pub hotels: usize,
    pub discounted: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let searches: usize = conn.query_row("SELECT COUNT(*) FROM search", [], |r| r.get(0))?;
    let hotels: usize = conn.query_row("SELECT COUNT(*) FROM hotels", [], |r| r.get(0))?;
    let discounted: usize = conn.query_row(
        "SELECT COUNT(*) FROM hotels WHERE price_sale IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    Ok(Stats {
        searches,
        hotels,
        discounted,
    })
}

pub struct OverviewRow {
    pub id: u32,
    pub city: String,
    pub state: String,
    pub checkin_datetime: String,
    pub nights: i64,
    pub search_datetime: String,
    pub hotel_count: i64,
}

/// Recent searches with their stored listing counts.
pub fn fetch_overview(conn: &Connection, limit: usize) -> Result<Vec<OverviewRow>> {
    let sql = format!(
        "SELECT s.id, s.city, s.state, s.checkin_datetime, s.nights, s.search_datetime,
                COUNT(h.id)
         FROM search s
         LEFT JOIN hotels h ON h.search_id = s.id
         GROUP BY s.id
         ORDER BY s.search_datetime DESC
         LIMIT {}",
        limit
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(OverviewRow {
                id: row.get::<_, i64>(0)? as u32,
                city: row.get(1)?,
                state: row.get(2)?,
                checkin_datetime: row.get(3)?,
                nights: row.get(4)?,
                search_datetime: row.get(5)?,
                hotel_count: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn search_row(id: u32) -> SearchRow {
        let checkin = Utc.with_ymd_and_hms(2020, 6, 30, 0, 0, 0).unwrap();
        SearchRow {
            id,
            city: "Las Vegas".to_string(),
            state: "Nevada".to_string(),
            country: "United States of America".to_string(),
            checkin_datetime: checkin,
            checkout_datetime: checkin + chrono::Duration::days(1),
            price_min: 0,
            price_max: 10000,
            price_multiplier: 1,
            star_rating_min: 1,
            star_rating_max: 5,
            guest_rating_min: 1,
            guest_rating_max: 9,
            distance_centre: None,
            rooms: 1,
            adults: 2,
            children: 0,
            currency: "USD".to_string(),
            search_datetime: Utc.with_ymd_and_hms(2020, 6, 1, 12, 0, 0).unwrap(),
            days_from_search: 28,
            nights: 1,
        }
    }

    fn hotel_row(id: u32, search_id: u32) -> HotelRow {
        HotelRow {
            id,
            search_id,
            listing: Listing {
                name: "Alpha".to_string(),
                address: "Las Vegas Blvd".to_string(),
                landmarks: "0.3 miles to City center".to_string(),
                amenities: "Pool".to_string(),
                details: String::new(),
                review_box: String::new(),
                rating: Some(4.5),
                num_reviews: Some(134),
                price: Some(100),
                star_rating: 4.0,
                price_metadata: "$100 $80".to_string(),
                price_sale: Some(80),
                rating_sentiment: Some("Good".to_string()),
                distance_centre: Some(0.3),
            },
        }
    }

    #[test]
    fn search_upsert_skips_known_key() {
        let conn = test_conn();
        let row = search_row(17);
        assert_eq!(upsert_search(&conn, &row).unwrap(), 1);
        assert_eq!(upsert_search(&conn, &row).unwrap(), 0);
        let stats = get_stats(&conn).unwrap();
        assert_eq!(stats.searches, 1);
    }

    #[test]
    fn hotels_upsert_appends_only_unseen() {
        let conn = test_conn();
        upsert_search(&conn, &search_row(17)).unwrap();

        let batch = vec![hotel_row(1, 17), hotel_row(2, 17)];
        assert_eq!(upsert_hotels(&conn, &batch).unwrap(), 2);

        // Second run with one overlapping and one new key.
        let batch = vec![hotel_row(2, 17), hotel_row(3, 17)];
        assert_eq!(upsert_hotels(&conn, &batch).unwrap(), 1);

        let stats = get_stats(&conn).unwrap();
        assert_eq!(stats.hotels, 3);
        assert_eq!(stats.discounted, 3);
    }

    #[test]
    fn empty_batch_is_a_noop() {
        let conn = test_conn();
        assert_eq!(upsert_hotels(&conn, &[]).unwrap(), 0);
    }

    #[test]
    fn overview_counts_listings_per_search() {
        let conn = test_conn();
        upsert_search(&conn, &search_row(17)).unwrap();
        upsert_hotels(&conn, &[hotel_row(1, 17), hotel_row(2, 17)]).unwrap();

        let rows = fetch_overview(&conn, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, 17);
        assert_eq!(rows[0].hotel_count, 2);
        assert_eq!(rows[0].city, "Las Vegas");
    }
}
