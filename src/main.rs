use adloop::ad::MediaKind;
use adloop::clicks::ClickOutcome;
use adloop::cooldown::JsonSeedStore;
use adloop::core::{CarouselCore, CarouselSession, SlideView};
use adloop::engagement::{ClickReceipt, EngagementSink, Navigator};
use adloop::inventory::Inventory;
use adloop::report::{EngagementReportGenerator, ReportFormat};
use adloop::stats::EngagementLogger;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "adloop", about = "Ad Carousel Engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show engine status
    Status,
    /// Ad inventory management
    Ad {
        #[command(subcommand)]
        action: AdCmd,
    },
    /// Run the carousel headlessly for a while
    Run {
        /// Number of rotation periods to simulate
        #[arg(short, long, default_value = "6")]
        ticks: u64,
        /// Rotation period in milliseconds (default: real 10s period)
        #[arg(short, long)]
        period_ms: Option<u64>,
    },
    /// Click an ad through the engine (cooldown-gated)
    Click {
        /// Ad id to click
        id: String,
    },
    /// Cooldown management
    Cooldowns {
        #[command(subcommand)]
        action: CooldownCmd,
    },
    /// Engagement statistics
    Stats {
        #[command(subcommand)]
        action: StatsCmd,
    },
    /// Advertiser reports
    Report {
        #[command(subcommand)]
        action: ReportCmd,
    },
}

#[derive(Subcommand)]
enum AdCmd {
    /// Add an ad to the inventory
    Add {
        /// Display title
        title: String,
        /// Banner media URL
        banner_url: String,
        /// Click-through destination URL
        click_url: String,
        /// Media kind: image or video
        #[arg(short, long, default_value = "image")]
        media: String,
        /// Display priority (higher shows first)
        #[arg(short, long, default_value = "0")]
        priority: i32,
    },
    /// List all ads
    List,
    /// Remove an ad by id
    Remove { id: String },
    /// Enable or disable an ad
    Toggle { id: String },
    /// Set an ad's display priority
    Priority { id: String, value: i32 },
    /// Set an ad's active window (YYYY-MM-DD bounds)
    Window {
        id: String,
        /// Window start date (omit to clear)
        #[arg(long)]
        starts: Option<String>,
        /// Window end date (omit to clear)
        #[arg(long)]
        ends: Option<String>,
    },
    /// Move an ad from one position to another (1-based)
    Move { from: usize, to: usize },
}

#[derive(Subcommand)]
enum CooldownCmd {
    /// List active cooldown entries
    List,
    /// Clear all persisted cooldowns
    Clear,
}

#[derive(Subcommand)]
enum StatsCmd {
    /// Show engagement totals (optionally date-filtered)
    Show {
        /// Range start (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// Range end (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
    },
    /// Clear all engagement data
    Reset,
}

#[derive(Subcommand)]
enum ReportCmd {
    /// Generate per-ad CSV + PDF reports for a period
    Generate {
        /// Range start (YYYY-MM-DD)
        start: String,
        /// Range end (YYYY-MM-DD)
        end: String,
        /// Restrict to a single ad id
        #[arg(long)]
        ad: Option<String>,
        /// Company name shown in the PDF title
        #[arg(long)]
        company: Option<String>,
        /// Output directory (default: current directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Generate a multi-ad daily-clicks matrix
    Matrix {
        /// Range start (YYYY-MM-DD)
        start: String,
        /// Range end (YYYY-MM-DD)
        end: String,
        /// Output format: csv or pdf
        #[arg(short, long, default_value = "csv")]
        format: String,
        /// Output file (default: ./matrix.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Sink that narrates engine events on stdout.
struct ConsoleSink;

impl EngagementSink for ConsoleSink {
    fn record_impression(&self, ad_id: &str) -> Result<(), String> {
        println!("  impression -> {}", ad_id);
        Ok(())
    }

    fn record_click(&self, ad_id: &str) -> Result<ClickReceipt, String> {
        println!("  click      -> {}", ad_id);
        Ok(ClickReceipt { counted_as_new: true })
    }
}

struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn open(&self, url: &str) -> Result<(), String> {
        println!("  opening    -> {}", url);
        Ok(())
    }
}

fn data_dir() -> PathBuf {
    Inventory::default_state_path()
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn parse_date(s: &str) -> DateTime<Utc> {
    match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        Ok(date) => match date.and_hms_opt(0, 0, 0) {
            Some(dt) => dt.and_utc(),
            None => {
                eprintln!("Error: invalid date '{}'", s);
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Error: invalid date '{}' (expected YYYY-MM-DD): {}", s, e);
            std::process::exit(1);
        }
    }
}

/// Build an engine core over the live inventory, wired to console
/// collaborators and the persistent cooldown/engagement stores.
fn build_core(inventory: &Inventory) -> CarouselCore {
    let dir = data_dir();
    let mut core = CarouselCore::new(
        Arc::new(ConsoleSink),
        Arc::new(ConsoleNavigator),
        Arc::new(JsonSeedStore::new(&dir)),
    );
    core.set_engagement_logger(Some(EngagementLogger::new(&dir)));
    core.set_promos(inventory.promos.clone());
    core
}

fn main() {
    let cli = Cli::parse();
    let mut inventory = Inventory::load();

    match cli.command {
        Commands::Status => {
            println!("adLoop engine v{}", env!("CARGO_PKG_VERSION"));
            let live = inventory.live();
            println!(
                "Ads: {} ({} live) | Promos: {} | Data dir: {}",
                inventory.ads.len(),
                live.len(),
                inventory.promos.len(),
                data_dir().display()
            );
            if let Some(first) = live.first() {
                println!(
                    "Next to show: {} — {} [{}]",
                    first.id, first.title, first.media_type
                );
            }
        }
        Commands::Ad { action } => match action {
            AdCmd::Add {
                title,
                banner_url,
                click_url,
                media,
                priority,
            } => {
                let kind = match MediaKind::from_str_loose(&media) {
                    Ok(k) => k,
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                };
                let id = inventory.add_ad(kind, banner_url, click_url, title.clone());
                if priority != 0 {
                    if let Err(e) = inventory.set_priority(&id, priority) {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                }
                if let Err(e) = inventory.save() {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
                println!("Added ad '{}' (id: {})", title, id);
            }
            AdCmd::List => {
                if inventory.ads.is_empty() {
                    println!("No ads. Use 'ad add' to create one.");
                    return;
                }
                println!(
                    "{:<4} {:<8} {:<6} {:<24} {:<4} {:<8} {}",
                    "#", "ID", "Kind", "Title", "Pri", "Status", "Window"
                );
                println!("{}", "-".repeat(72));
                for (i, ad) in inventory.ads.iter().enumerate() {
                    let status = if ad.enabled { "on" } else { "off" };
                    println!(
                        "{:<4} {:<8} {:<6} {:<24} {:<4} {:<8} {}",
                        i + 1,
                        ad.id,
                        ad.media_type.to_string(),
                        truncate(&ad.title, 23),
                        ad.priority,
                        status,
                        ad.window_display()
                    );
                }
            }
            AdCmd::Remove { id } => match inventory.remove_ad(&id) {
                Ok(ad) => {
                    if let Err(e) = inventory.save() {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                    println!("Removed ad '{}' ({})", ad.title, id);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            },
            AdCmd::Toggle { id } => match inventory.toggle_ad(&id) {
                Ok(enabled) => {
                    if let Err(e) = inventory.save() {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                    let status = if enabled { "enabled" } else { "disabled" };
                    println!("Ad '{}' {}", id, status);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            },
            AdCmd::Priority { id, value } => match inventory.set_priority(&id, value) {
                Ok(()) => {
                    if let Err(e) = inventory.save() {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                    println!("Ad '{}' priority set to {}", id, value);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            },
            AdCmd::Window { id, starts, ends } => {
                let starts_at = starts.as_deref().map(parse_date);
                let ends_at = ends.as_deref().map(parse_date);
                if let (Some(s), Some(e)) = (starts_at, ends_at) {
                    if e <= s {
                        eprintln!("Error: window end must be after start");
                        std::process::exit(1);
                    }
                }
                match inventory.find_ad_mut(&id) {
                    Some(ad) => {
                        ad.starts_at = starts_at;
                        ad.ends_at = ends_at;
                        let display = ad.window_display();
                        if let Err(e) = inventory.save() {
                            eprintln!("Error: {}", e);
                            std::process::exit(1);
                        }
                        println!("Ad '{}' window: {}", id, display);
                    }
                    None => {
                        eprintln!("Error: ad '{}' not found", id);
                        std::process::exit(1);
                    }
                }
            }
            AdCmd::Move { from, to } => {
                if from == 0 || to == 0 {
                    eprintln!("Error: positions are 1-based");
                    std::process::exit(1);
                }
                match inventory.reorder_ad(from - 1, to - 1) {
                    Ok(()) => {
                        if let Err(e) = inventory.save() {
                            eprintln!("Error: {}", e);
                            std::process::exit(1);
                        }
                        println!("Moved ad {} -> {}", from, to);
                    }
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                }
            }
        },
        Commands::Run { ticks, period_ms } => {
            let live = inventory.live();
            let period = period_ms
                .map(Duration::from_millis)
                .unwrap_or(adloop::rotation::ROTATION_PERIOD);

            let core = build_core(&inventory);
            let mut session = CarouselSession::new(core).with_period(period);

            println!(
                "Running carousel with {} live ad(s), period {:?}, {} tick(s)...",
                live.len(),
                period,
                ticks
            );
            session.configure_ads(live);

            match session.core().lock().unwrap().current_view() {
                SlideView::Ad { id, title, .. } => println!("Showing: {} — {}", id, title),
                SlideView::Promo { title, .. } => println!("No live ads; promo: {}", title),
                SlideView::Blank => println!("No live ads and no promos."),
            }

            std::thread::sleep(period * ticks as u32 + Duration::from_millis(200));
            session.shutdown();

            let core = session.core();
            let core = core.lock().unwrap();
            let status = core.get_status();
            println!(
                "Done. Position {}/{} | impressions recorded: {}",
                status.current_index.map(|i| i + 1).unwrap_or(0),
                status.ad_count,
                status.impressions_recorded
            );
        }
        Commands::Click { id } => {
            let live = inventory.live();
            if !live.iter().any(|a| a.id == id) {
                eprintln!("Error: ad '{}' is not live (check 'ad list')", id);
                std::process::exit(1);
            }
            let mut core = build_core(&inventory);
            core.configure_ads(live);

            match core.handle_click(&id) {
                Ok(ClickOutcome::Navigated { counted_as_new }) => {
                    if counted_as_new {
                        println!("Click counted.");
                    } else {
                        println!("Click not counted (duplicate or backend unreachable).");
                    }
                }
                Ok(ClickOutcome::CoolingDown { message, .. }) => {
                    println!("{}", message);
                }
                Ok(ClickOutcome::InFlight) => {
                    println!("A click for this ad is already in flight.");
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Cooldowns { action } => {
            use adloop::cooldown::CooldownSeedStore;
            let store = JsonSeedStore::new(&data_dir());
            match action {
                CooldownCmd::List => {
                    let entries = store.load();
                    if entries.is_empty() {
                        println!("No cooldown entries.");
                        return;
                    }
                    let now = Utc::now();
                    println!("{:<10} {:<26} {}", "Ad", "Allowed after", "State");
                    println!("{}", "-".repeat(48));
                    let mut sorted: Vec<_> = entries.iter().collect();
                    sorted.sort_by(|a, b| a.0.cmp(b.0));
                    for (id, allowed_after) in sorted {
                        let state = if *allowed_after > now { "active" } else { "expired" };
                        println!(
                            "{:<10} {:<26} {}",
                            id,
                            allowed_after.format("%Y-%m-%d %H:%M:%S UTC"),
                            state
                        );
                    }
                }
                CooldownCmd::Clear => {
                    store.persist(&Default::default());
                    println!("Cooldowns cleared.");
                }
            }
        }
        Commands::Stats { action } => {
            let logger = EngagementLogger::new(&data_dir());
            match action {
                StatsCmd::Show { start, end } => {
                    let stats = match (start, end) {
                        (Some(s), Some(e)) => logger.get_statistics_filtered(&s, &e),
                        _ => logger.get_statistics(),
                    };
                    println!(
                        "Impressions: {} | Clicks: {}",
                        stats.total_impressions, stats.total_clicks
                    );
                    if stats.per_ad.is_empty() {
                        println!("No engagement recorded yet.");
                        return;
                    }
                    println!("{:<12} {:>12} {:>8} {:>8}", "Ad", "Impressions", "Clicks", "CTR");
                    println!("{}", "-".repeat(44));
                    for entry in &stats.per_ad {
                        println!(
                            "{:<12} {:>12} {:>8} {:>7.1}%",
                            truncate(&entry.ad_id, 11),
                            entry.impressions,
                            entry.clicks,
                            entry.ctr()
                        );
                    }
                    let failures = logger.get_failures();
                    if !failures.is_empty() {
                        println!("Delivery failures: {} (most recent kept)", failures.len());
                    }
                }
                StatsCmd::Reset => {
                    logger.reset_all();
                    println!("Engagement data cleared.");
                }
            }
        }
        Commands::Report { action } => {
            let logger = EngagementLogger::new(&data_dir());
            let reporter = EngagementReportGenerator::new(&logger);
            match action {
                ReportCmd::Generate {
                    start,
                    end,
                    ad,
                    company,
                    output_dir,
                } => {
                    let out = output_dir.unwrap_or_else(|| PathBuf::from("."));
                    if let Err(e) = std::fs::create_dir_all(&out) {
                        eprintln!("Error: cannot create '{}': {}", out.display(), e);
                        std::process::exit(1);
                    }
                    match ad {
                        Some(id) => match reporter.generate_single_report(
                            &id,
                            &start,
                            &end,
                            company.as_deref(),
                            &out,
                        ) {
                            Some(result) => {
                                println!("Report for '{}':", result.ad_id);
                                println!("  {}", result.csv_path.display());
                                println!("  {}", result.pdf_path.display());
                            }
                            None => {
                                println!("No engagement for '{}' in {} to {}.", id, start, end);
                            }
                        },
                        None => {
                            let results =
                                reporter.generate_report(&start, &end, company.as_deref(), &out);
                            if results.is_empty() {
                                println!("No engagement in {} to {}.", start, end);
                                return;
                            }
                            for result in &results {
                                println!(
                                    "{}: {} / {}",
                                    result.ad_id,
                                    result.csv_path.display(),
                                    result.pdf_path.display()
                                );
                            }
                        }
                    }
                }
                ReportCmd::Matrix {
                    start,
                    end,
                    format,
                    output,
                } => {
                    let fmt = match ReportFormat::from_str_loose(&format) {
                        Some(f) => f,
                        None => {
                            eprintln!("Error: unknown format '{}'. Expected: csv, pdf", format);
                            std::process::exit(1);
                        }
                    };
                    let out = output
                        .unwrap_or_else(|| PathBuf::from(format!("matrix.{}", fmt.extension())));
                    match reporter.generate_multi_ad_report(&[], &start, &end, &out, fmt) {
                        Some(result) => println!("Matrix report: {}", result.path.display()),
                        None => println!("No clicks in {} to {}.", start, end),
                    }
                }
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() > max {
        format!("{}…", &s[..max - 1])
    } else {
        s.to_string()
    }
}
