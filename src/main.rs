mod config;
mod db;
mod fetch;
mod keys;
mod parser;
mod scrape;
mod url;

use std::time::Instant;

use chrono::Utc;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

#[derive(Parser)]
#[command(name = "hotscrape", about = "Hotel search scraper with SQLite storage")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,
    /// Run the searches described in a config file
    Run {
        /// Path to the search config file
        #[arg(short, long, default_value = "searches.json")]
        config: String,
        /// Max searches to execute (default: the full expanded batch)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show storage statistics
    Stats,
    /// Recent searches with stored listing counts
    Overview {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            println!("Schema ready.");
            Ok(())
        }
        Commands::Run { config, limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;

            // Config problems abort here, before anything is fetched.
            let plans = config::load_search_plans(&config)?;
            let mut searches = Vec::new();
            for plan in &plans {
                searches.extend(config::expand(plan, Utc::now()));
            }
            if let Some(n) = limit {
                searches.truncate(n);
            }
            if searches.is_empty() {
                println!("No searches in {}.", config);
                return Ok(());
            }

            println!("Running {} searches...", searches.len());
            let fetcher = fetch::BrowserFetcher::new()?;

            let pb = ProgressBar::new(searches.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
                    .progress_chars("=> "),
            );

            let mut totals = RunTotals::default();
            for search in &searches {
                match scrape::run_search(&conn, &fetcher, search, Utc::now()) {
                    Ok(outcome) => totals.add(&outcome),
                    Err(e) => {
                        totals.failed += 1;
                        warn!("Search ordinal {} failed: {}", search.ordinal, e);
                    }
                }
                pb.inc(1);
            }
            pb.finish_and_clear();
            totals.print(searches.len());
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Searches:   {}", s.searches);
            println!("Hotels:     {}", s.hotels);
            println!("Discounted: {}", s.discounted);
            Ok(())
        }
        Commands::Overview { limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let rows = db::fetch_overview(&conn, limit)?;
            if rows.is_empty() {
                println!("No searches stored.");
                return Ok(());
            }

            println!(
                "{:>10} | {:<20} | {:<10} | {:>6} | {:>6} | {:<20}",
                "id", "Destination", "Check-in", "Nights", "Hotels", "Searched at"
            );
            println!("{}", "-".repeat(86));
            for r in &rows {
                let destination = truncate(&format!("{}, {}", r.city, r.state), 20);
                println!(
                    "{:>10} | {:<20} | {:<10} | {:>6} | {:>6} | {:<20}",
                    r.id,
                    destination,
                    &r.checkin_datetime[..10.min(r.checkin_datetime.len())],
                    r.nights,
                    r.hotel_count,
                    truncate(&r.search_datetime, 20),
                );
            }
            println!("\n{} searches", rows.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

#[derive(Default)]
struct RunTotals {
    listings_parsed: usize,
    searches_inserted: usize,
    hotels_inserted: usize,
    failed: usize,
}

impl RunTotals {
    fn add(&mut self, outcome: &scrape::SearchOutcome) {
        self.listings_parsed += outcome.listings_parsed;
        self.searches_inserted += outcome.searches_inserted;
        self.hotels_inserted += outcome.hotels_inserted;
    }

    fn print(&self, total: usize) {
        println!(
            "Saved {} searches and {} hotel listings ({} parsed, {} of {} searches failed).",
            self.searches_inserted, self.hotels_inserted, self.listings_parsed, self.failed, total,
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
