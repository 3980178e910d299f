use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use setstats::report::{self, View};
use setstats::setlist::{Fetcher, SetlistFmClient};
use setstats::stats::{self, AggregateOptions, Aggregation, ConcertSummary};

#[derive(Parser)]
#[command(
    name = "setstats",
    version,
    about = "Song statistics for the concerts you attended, from setlist.fm"
)]
struct Cli {
    /// Artist to count (exact setlist.fm name; defaults to config, then "Die Ärzte")
    #[arg(long, global = true, env = "SETSTATS_ARTIST")]
    artist: Option<String>,

    /// setlist.fm API key
    #[arg(long, global = true, env = "SETLISTFM_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Args)]
struct RunArgs {
    /// Your setlist.fm username
    user: String,

    /// Don't count cover songs
    #[arg(long)]
    no_covers: bool,

    /// Count annotated versions ("acoustic", "with intro", ...) as separate songs
    #[arg(long)]
    variations: bool,

    /// Show how often each song was played per year
    #[arg(long)]
    trend: bool,
}

impl RunArgs {
    fn options(&self) -> AggregateOptions {
        AggregateOptions {
            include_covers: !self.no_covers,
            include_variations: self.variations,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Rank the songs played at your concerts
    Songs(RunArgs),

    /// List the concerts you attended
    Concerts(RunArgs),

    /// Songs and concerts together
    Report(RunArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = setstats::config::AppConfig::load();
    let settings = config.setlistfm;

    // CLI / env > config > built-in default
    let artist = cli.artist.unwrap_or_else(|| settings.artist.clone());
    let Some(api_key) = cli.api_key.or_else(|| settings.api_key.clone()) else {
        anyhow::bail!(
            "No setlist.fm API key. Pass --api-key, set SETLISTFM_API_KEY, \
             or set api_key in the [setlistfm] config section."
        );
    };

    let (view, args) = match cli.command {
        Commands::Songs(args) => (View::Songs, args),
        Commands::Concerts(args) => (View::Concerts, args),
        Commands::Report(args) => (View::Both, args),
    };
    log::info!("Counting {artist} concerts attended by {}", args.user);

    let progress = match cli.format {
        OutputFormat::Table => {
            let style = ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} setlists",
            )?
            .progress_chars("=>-");
            let pb = ProgressBar::new(0);
            pb.set_style(style);
            pb
        }
        OutputFormat::Json => ProgressBar::hidden(),
    };

    let client = SetlistFmClient::new(api_key, settings.base_url.clone(), settings.timeout());
    let fetcher = Fetcher::new(client)
        .with_max_pages(settings.max_pages)
        .with_page_delay(settings.page_delay())
        .with_progress(progress);

    let setlists = fetcher
        .fetch(&args.user, &artist)
        .with_context(|| format!("Failed to fetch attended concerts for {}", args.user))?;

    let agg = stats::aggregate(&setlists, &args.options())
        .context("setlist.fm returned a setlist that can't be counted")?;

    match cli.format {
        OutputFormat::Json => {
            let json = report::to_json(&agg, view, args.trend).context("Failed to encode JSON")?;
            println!("{json}");
        }
        OutputFormat::Table => {
            if agg.is_empty() {
                println!("No attended {artist} concerts found for {}.", args.user);
                return Ok(());
            }
            if view.songs() {
                print_song_table(&agg, args.trend);
            }
            if view.concerts() {
                if view.songs() {
                    println!();
                }
                print_concert_table(&agg.concerts);
            }
        }
    }

    Ok(())
}

/// Print the ranked song table, with a sparkline column if `show_trend`.
fn print_song_table(agg: &Aggregation, show_trend: bool) {
    println!("Songs ({})", agg.songs.len());
    println!();

    if show_trend {
        println!("{:<40} {:>4} {:>5}  {}", "Song", "%", "Count", "Trend");
    } else {
        println!("{:<40} {:>4} {:>5}", "Song", "%", "Count");
    }
    println!("{}", "-".repeat(if show_trend { 60 } else { 51 }));

    for row in report::song_rows(&agg.songs, show_trend) {
        let percent = format!("{}%", row.percent);
        match &row.trend {
            Some(trend) => println!(
                "{:<40} {:>4} {:>5}  {}",
                report::truncate(&row.song, 40),
                percent,
                row.count,
                report::sparkline(trend),
            ),
            None => println!(
                "{:<40} {:>4} {:>5}",
                report::truncate(&row.song, 40),
                percent,
                row.count,
            ),
        }
    }

    if show_trend {
        if let (Some(first), Some(last)) = (agg.years.first(), agg.years.last()) {
            println!();
            println!(
                "Trend: one bar per concert year, {first} to {last} ({} years)",
                agg.years.len()
            );
        }
    }
}

/// Print the attended concerts in API order.
fn print_concert_table(concerts: &[ConcertSummary]) {
    println!("Concerts ({})", concerts.len());
    println!();
    println!(
        "{:<10} {:<18} {:<28} {:<24} {:>5}  {}",
        "Date", "City", "Venue", "Tour", "Songs", "URL"
    );
    println!("{}", "-".repeat(110));

    for c in concerts {
        println!(
            "{:<10} {:<18} {:<28} {:<24} {:>5}  {}",
            report::format_date(c.date),
            report::truncate(&c.city, 18),
            report::truncate(&c.venue, 28),
            report::truncate(c.tour.as_deref().unwrap_or("-"), 24),
            c.song_count,
            c.url,
        );
    }
}
