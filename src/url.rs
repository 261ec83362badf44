//! Search-parameter to hotels.com URL rendering.

use crate::config::Search;

/// Render a search as a `search.do` query URL.
///
/// The star-rating filter is a descending comma list (`5,4,3,2,1`) and the
/// destination is `city,%20state,%20country` with spaces encoded. The
/// `f-distance` filter is emitted only when a distance cap is set.
pub fn search_url(search: &Search) -> String {
    let star_rating: Vec<String> = (search.star_rating_min..=search.star_rating_max)
        .rev()
        .map(|v| v.to_string())
        .collect();
    let star_rating = star_rating.join(",");

    let encode = |text: &str| text.replace(' ', "%20");

    let mut url = format!(
        "https://www.hotels.com/search.do?\
         f-price-currency-code={currency}&\
         f-price-multiplier={multiplier}&\
         f-price-min={price_min}&\
         f-price-max={price_max}&\
         f-star-rating={star_rating}&\
         f-guest-rating-min={guest_min}&\
         f-guest-rating-max={guest_max}&",
        currency = search.currency,
        multiplier = search.price_multiplier,
        price_min = search.price_min,
        price_max = search.price_max,
        star_rating = star_rating,
        guest_min = search.guest_rating_min,
        guest_max = search.guest_rating_max,
    );
    if let Some(distance) = search.distance_centre {
        url.push_str(&format!("f-distance={}&", distance));
    }
    url.push_str(&format!(
        "q-destination={city},%20{state},%20{country}&\
         q-check-in={checkin}&\
         q-check-out={checkout}&\
         q-rooms={rooms}&\
         q-room-0-adults={adults}&\
         q-room-0-children={children}",
        city = encode(&search.city),
        state = encode(&search.state),
        country = encode(&search.country),
        checkin = search.checkin_datetime.format("%Y-%m-%d"),
        checkout = search.checkout_datetime.format("%Y-%m-%d"),
        rooms = search.rooms,
        adults = search.adults,
        children = search.children,
    ));
    url
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn search() -> Search {
        let checkin = Utc.with_ymd_and_hms(2020, 6, 30, 0, 0, 0).unwrap();
        Search {
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
            ordinal: 1,
        }
    }

    #[test]
    fn renders_full_query() {
        assert_eq!(
            search_url(&search()),
            "https://www.hotels.com/search.do?\
             f-price-currency-code=USD&\
             f-price-multiplier=1&\
             f-price-min=0&\
             f-price-max=10000&\
             f-star-rating=5,4,3,2,1&\
             f-guest-rating-min=1&\
             f-guest-rating-max=9&\
             q-destination=Las%20Vegas,%20Nevada,%20United%20States%20of%20America&\
             q-check-in=2020-06-30&\
             q-check-out=2020-07-01&\
             q-rooms=1&\
             q-room-0-adults=2&\
             q-room-0-children=0"
        );
    }

    #[test]
    fn distance_filter_emitted_when_set() {
        let mut s = search();
        s.distance_centre = Some(2.0);
        let url = search_url(&s);
        assert!(url.contains("f-guest-rating-max=9&f-distance=2&q-destination="));
    }

    #[test]
    fn star_range_respects_bounds() {
        let mut s = search();
        s.star_rating_min = 3;
        s.star_rating_max = 5;
        assert!(search_url(&s).contains("f-star-rating=5,4,3&"));
    }
}
