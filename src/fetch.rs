//! Page fetching: drive a headless browser over a search-result page,
//! scroll until no more listings load, and pull the raw per-field text out
//! of the final DOM.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use headless_chrome::{Browser, LaunchOptions, Tab};
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::parser::RawListingTable;

const MAX_SCROLL: u32 = 100;
const MAX_SCROLL_GLOBAL: u32 = 35;
const SCROLL_PAUSE: Duration = Duration::from_millis(500);

/// One result card in the listing feed.
const CARD_SELECTOR: &str = "li.hotel-wrap";

/// Semantic field name → CSS selector within one card.
const FIELD_SELECTORS: &[(&str, &str)] = &[
    ("name", "h3.p-name"),
    ("address", "span.address"),
    ("landmarks", "ul.property-landmarks"),
    ("amenities", "ul[class*='amenities']"),
    ("details", "div.additional-details"),
    ("review_box", "div.details"),
    ("rating", "strong[class*='guest-reviews-badge']"),
    ("num_reviews", "span.small-view"),
    ("price", "aside[class*='pricing']"),
    ("star_rating", "span.star-rating-text"),
];

/// Source of raw listing tables. The browser-backed implementation is the
/// production one; tests substitute canned tables.
pub trait PageFetcher {
    fn fetch(&self, url: &str) -> Result<RawListingTable>;
}

pub struct BrowserFetcher {
    browser: Browser,
}

impl BrowserFetcher {
    pub fn new() -> Result<Self> {
        info!("Launching headless browser...");
        let options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((1920, 1080)))
            .build()
            .context("Failed to build browser launch options")?;
        let browser = Browser::new(options).context("Failed to launch browser")?;
        Ok(Self { browser })
    }
}

impl PageFetcher for BrowserFetcher {
    fn fetch(&self, url: &str) -> Result<RawListingTable> {
        let tab = self.browser.new_tab()?;
        tab.navigate_to(url)?;
        tab.wait_until_navigated()?;

        scroll_to_end(&tab)?;

        let html = tab
            .evaluate("document.documentElement.outerHTML", false)?
            .value
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        if html.is_empty() {
            warn!("Empty page body for {}", url);
        }
        parse_listing_table(&html)
    }
}

/// Scroll to the bottom until the result feed stops growing.
///
/// The feed shows a loading indicator while more listings stream in; each
/// sighting resets the idle counter. An end-of-results marker or either
/// scroll cap stops the loop.
fn scroll_to_end(tab: &Tab) -> Result<()> {
    let mut scroll_count = 0u32;
    let mut scroll_count_global = 0u32;
    loop {
        tab.evaluate("window.scrollTo(0, document.body.scrollHeight);", false)?;

        if listings_loading(tab)? {
            scroll_count = 0;
        } else {
            thread::sleep(SCROLL_PAUSE);
            scroll_count += 1;
            scroll_count_global += 1;
            debug!("Scroll count: {}", scroll_count_global);
        }

        if end_of_results(tab)? {
            info!("Reached end of results after {} scrolls", scroll_count_global);
            break;
        }
        if scroll_count >= MAX_SCROLL || scroll_count_global >= MAX_SCROLL_GLOBAL {
            info!(
                "Reached maximum number of page loads ({}/{}), stopping",
                scroll_count_global, MAX_SCROLL_GLOBAL
            );
            break;
        }
    }
    Ok(())
}

fn listings_loading(tab: &Tab) -> Result<bool> {
    eval_bool(
        tab,
        "(() => { const el = document.getElementById('listings-loading'); \
         return !!el && getComputedStyle(el).display === 'block'; })()",
    )
}

fn end_of_results(tab: &Tab) -> Result<bool> {
    eval_bool(
        tab,
        "Array.from(document.getElementsByClassName('info'))\
         .some((el) => el.offsetParent !== null)",
    )
}

fn eval_bool(tab: &Tab, expression: &str) -> Result<bool> {
    Ok(tab
        .evaluate(expression, false)?
        .value
        .and_then(|v| v.as_bool())
        .unwrap_or(false))
}

/// Pull the raw field texts out of rendered markup, one column per field.
///
/// Selection runs per card, so a card missing a field contributes an empty
/// string and column alignment survives listings with sparse markup.
pub fn parse_listing_table(html: &str) -> Result<RawListingTable> {
    let document = Html::parse_document(html);
    let card_selector = Selector::parse(CARD_SELECTOR).unwrap();
    let field_selectors: Vec<(&str, Selector)> = FIELD_SELECTORS
        .iter()
        .map(|(name, css)| (*name, Selector::parse(css).unwrap()))
        .collect();

    let cards: Vec<_> = document.select(&card_selector).collect();
    debug!("Found {} listing cards", cards.len());

    let mut table = RawListingTable::new();
    for (name, selector) in &field_selectors {
        let values: Vec<String> = cards
            .iter()
            .map(|card| {
                card.select(selector)
                    .next()
                    .map(|el| el.text().collect::<String>().trim().to_string())
                    .unwrap_or_default()
            })
            .collect();
        table.insert_column(name, values)?;
    }
    Ok(table)
}

// ── Tests ──
