pub mod fields;

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use rayon::prelude::*;

use fields::PriceMode;

/// Raw per-field text pulled off a rendered search-result page: one column
/// per semantic field, one entry per listing card, all columns equal length.
#[derive(Debug, Clone, Default)]
pub struct RawListingTable {
    columns: BTreeMap<String, Vec<String>>,
}

impl RawListingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column. Every column must have one value per listing; a length
    /// mismatch means the page fetcher lost row alignment.
    pub fn insert_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        if let Some((first_name, first)) = self.columns.iter().next() {
            if first.len() != values.len() {
                bail!(
                    "column {:?} has {} rows, expected {} (from {:?})",
                    name,
                    values.len(),
                    first.len(),
                    first_name
                );
            }
        }
        self.columns.insert(name.to_string(), values);
        Ok(())
    }

    pub fn column(&self, name: &str) -> Result<&[String]> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .with_context(|| format!("missing column {:?}", name))
    }

    /// Number of listing rows.
    pub fn len(&self) -> usize {
        self.columns.values().next().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One normalized hotel listing, before storage keys are assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub name: String,
    pub address: String,
    pub landmarks: String,
    pub amenities: String,
    pub details: String,
    pub review_box: String,
    pub rating: Option<f64>,
    pub num_reviews: Option<i64>,
    pub price: Option<i64>,
    pub star_rating: f64,
    pub price_metadata: String,
    pub price_sale: Option<i64>,
    pub rating_sentiment: Option<String>,
    pub distance_centre: Option<f64>,
}

/// Normalize a raw listing table into typed records.
///
/// Applies the field extractors column-wise per row, keeping row order and
/// alignment, then drops fully-booked listings (no primary and no sale
/// price). New extractable fields must be wired in here; nothing is
/// inferred from the table's column set.
pub fn parse(table: &RawListingTable) -> Result<Vec<Listing>> {
    let name = table.column("name")?;
    let address = table.column("address")?;
    let landmarks = table.column("landmarks")?;
    let amenities = table.column("amenities")?;
    let details = table.column("details")?;
    let review_box = table.column("review_box")?;
    let rating = table.column("rating")?;
    let num_reviews = table.column("num_reviews")?;
    let price = table.column("price")?;
    let star_rating = table.column("star_rating")?;

    let mut listings = (0..table.len())
        .into_par_iter()
        .map(|i| {
            Ok(Listing {
                name: name[i].clone(),
                address: address[i].clone(),
                landmarks: landmarks[i].clone(),
                amenities: amenities[i].clone(),
                details: details[i].clone(),
                review_box: review_box[i].clone(),
                rating: fields::parse_rating(&rating[i]),
                num_reviews: fields::parse_num_reviews(&num_reviews[i]),
                price: fields::parse_price(&price[i], PriceMode::Primary),
                star_rating: fields::parse_star_rating(&star_rating[i])?,
                price_metadata: price[i].clone(),
                price_sale: fields::parse_price(&price[i], PriceMode::Sale),
                rating_sentiment: fields::parse_rating_sentiment(&rating[i]),
                distance_centre: fields::parse_landmarks(&landmarks[i]),
            })
        })
        .collect::<Result<Vec<Listing>>>()?;

    listings.retain(|l| !fully_booked(l));
    Ok(listings)
}

/// A listing showing no price at all has no available rooms.
fn fully_booked(listing: &Listing) -> bool {
    listing.price.is_none() && listing.price_sale.is_none()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(&str, &str, &str, &str)]) -> RawListingTable {
        // (name, price, rating, landmarks); the rest of the columns are
        // filled with fixed plausible text.
        let mut t = RawListingTable::new();
        let n = rows.len();
        t.insert_column("name", rows.iter().map(|r| r.0.to_string()).collect())
            .unwrap();
        t.insert_column("price", rows.iter().map(|r| r.1.to_string()).collect())
            .unwrap();
        t.insert_column("rating", rows.iter().map(|r| r.2.to_string()).collect())
            .unwrap();
        t.insert_column("landmarks", rows.iter().map(|r| r.3.to_string()).collect())
            .unwrap();
        t.insert_column("address", vec!["Las Vegas Blvd".to_string(); n])
            .unwrap();
        t.insert_column("amenities", vec!["Pool".to_string(); n]).unwrap();
        t.insert_column("details", vec!["Details".to_string(); n]).unwrap();
        t.insert_column("review_box", vec!["(10 reviews)".to_string(); n])
            .unwrap();
        t.insert_column("num_reviews", vec!["(10 reviews)".to_string(); n])
            .unwrap();
        t.insert_column("star_rating", vec!["4-star".to_string(); n])
            .unwrap();
        t
    }

    #[test]
    fn column_length_mismatch_rejected() {
        let mut t = RawListingTable::new();
        t.insert_column("name", vec!["a".into(), "b".into()]).unwrap();
        assert!(t.insert_column("price", vec!["$1".into()]).is_err());
    }

    #[test]
    fn missing_column_reported() {
        let t = RawListingTable::new();
        let err = t.column("price").unwrap_err();
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn normalizes_rows_in_order() {
        let t = table(&[
            ("Alpha", "$100 $80", "4.5 Good", "0.3 miles to City center"),
            ("Beta", "$150", "Exceptional", "Las Vegas Strip"),
        ]);
        let listings = parse(&t).unwrap();
        assert_eq!(listings.len(), 2);

        assert_eq!(listings[0].name, "Alpha");
        assert_eq!(listings[0].price, Some(100));
        assert_eq!(listings[0].price_sale, Some(80));
        assert_eq!(listings[0].price_metadata, "$100 $80");
        assert_eq!(listings[0].rating, Some(4.5));
        assert_eq!(listings[0].rating_sentiment.as_deref(), Some("Good"));
        assert_eq!(listings[0].distance_centre, Some(0.3));
        assert_eq!(listings[0].star_rating, 4.0);

        assert_eq!(listings[1].name, "Beta");
        assert_eq!(listings[1].price, Some(150));
        assert_eq!(listings[1].price_sale, None);
        assert_eq!(listings[1].rating, None);
        assert_eq!(listings[1].rating_sentiment.as_deref(), Some("Exceptional"));
        assert_eq!(listings[1].distance_centre, None);
    }

    #[test]
    fn fully_booked_rows_dropped() {
        let t = table(&[
            ("Open", "$99", "4.0 Good", "1 mile to City center"),
            ("Booked", "We are sold out", "4.8 Wonderful", "0.5 miles to City center"),
            ("Open2", "$120 $100", "3.9 Good", ""),
        ]);
        let listings = parse(&t).unwrap();
        let names: Vec<&str> = listings.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Open", "Open2"]);
    }

    #[test]
    fn malformed_star_rating_fails_the_batch() {
        let mut t = table(&[("Alpha", "$100", "4.5 Good", "")]);
        t.insert_column("star_rating", vec!["boutique".to_string()])
            .unwrap();
        assert!(parse(&t).is_err());
    }

    #[test]
    fn empty_table_parses_to_nothing() {
        let t = table(&[]);
        assert!(parse(&t).unwrap().is_empty());
    }
}
