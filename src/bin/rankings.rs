use clap::Parser;
use sjr_percentile::core::rankings::RankingsDownloader;
use sjr_percentile::utils::{logger, validation};
use sjr_percentile::{CategoryKind, ChromeSession, ExportFetcher, SessionGateway, SjrConfig};
use std::path::PathBuf;

/// Columns a usable export is expected to carry.
const EXPECTED_COLUMNS: [&str; 4] = ["Rank", "Title", "SJR", "H index"];

#[derive(Debug, Parser)]
#[command(name = "sjr-rankings")]
#[command(about = "Download one SCImago ranking table and show what it contains")]
struct Args {
    /// Classification kind: area or category
    #[arg(long, default_value = "area")]
    kind: CategoryKind,

    /// Numeric classification id
    #[arg(long, default_value_t = 1200)]
    id: u32,

    #[arg(long, default_value = "2022")]
    year: String,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    validation::validate_year("year", &args.year)?;
    let settings = match &args.config {
        Some(path) => SjrConfig::from_file(path)?,
        None => SjrConfig::default(),
    };

    println!(
        "Testing ranking download for {} {}, year {}...",
        args.kind.label(),
        args.id,
        args.year
    );

    let fetcher = ExportFetcher::new(&settings.site.user_agent, settings.timeouts.download())?;
    let session = ChromeSession::launch(
        &settings.browser,
        &settings.site.user_agent,
        &settings.timeouts,
    )
    .await?;
    let diagnostics_dir = PathBuf::from(&settings.output.diagnostics_dir);

    let outcome = SessionGateway::with_session(session, settings.timeouts.clone(), |gateway| {
        let site = settings.site.clone();
        let (kind, id, year) = (args.kind, args.id, args.year.clone());
        async move {
            let downloader = RankingsDownloader::new(&gateway, &site, &fetcher, &diagnostics_dir);
            Ok(downloader.download(&year, id, kind).await)
        }
    })
    .await?;

    let table = match outcome {
        Ok(table) => table,
        Err(e) => {
            println!("\nDownload Failed: {}", e);
            std::process::exit(1);
        }
    };

    println!("\nDownload Successful!");
    println!("Table size: {} rows x {} columns", table.total(), table.columns().len());
    println!("\nColumns:\n{:?}", table.columns());
    println!("\nFirst 5 rows:");
    for row in table.rows().iter().take(5) {
        println!(
            "{:>5}  {}  [{}]  SJR {}  {}",
            row.rank,
            row.title,
            row.issns.join(", "),
            row.sjr,
            row.quartile
        );
    }

    let missing: Vec<&str> = EXPECTED_COLUMNS
        .iter()
        .copied()
        .filter(|expected| !table.columns().iter().any(|c| c == expected))
        .collect();
    if missing.is_empty() {
        println!("\nVerification Passed: All expected columns {:?} found.", EXPECTED_COLUMNS);
    } else {
        println!("\nWARNING: Missing columns: {:?}", missing);
    }

    Ok(())
}
