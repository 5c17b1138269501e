use clap::Parser;
use sjr_percentile::core::report::{render_metrics, render_summary};
use sjr_percentile::domain::ports::CandidateSelector;
use sjr_percentile::utils::error::ErrorSeverity;
use sjr_percentile::utils::{logger, validation::Validate};
use sjr_percentile::{
    ChromeSession, CliConfig, ExportFetcher, FirstCandidate, JournalCandidate, LocalStorage,
    LookupEngine, PickIndex, ReportWriter, RunOptions, SessionGateway, SessionStatus, SjrError,
    SjrPipeline,
};
use std::io::{BufRead, Write};

/// Lists the hits on stdout and reads a 1-based choice; `0` cancels.
struct PromptSelector;

impl CandidateSelector for PromptSelector {
    fn select(&self, candidates: &[JournalCandidate]) -> Option<usize> {
        println!("\nFound {} results:", candidates.len());
        for (i, candidate) in candidates.iter().enumerate() {
            println!("{}. {}", i + 1, candidate.title);
        }
        match read_choice(candidates.len()) {
            Ok(choice) => choice,
            Err(e) => {
                tracing::warn!("⚠️ Could not read selection: {}", e);
                None
            }
        }
    }
}

fn read_choice(max: usize) -> anyhow::Result<Option<usize>> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("\nSelect a journal (1-{}, 0 to cancel): ", max);
        std::io::stdout().flush()?;
        let Some(line) = lines.next().transpose()? else {
            return Ok(None);
        };
        match line.trim().parse::<usize>() {
            Ok(0) => return Ok(None),
            Ok(n) if n <= max => return Ok(Some(n - 1)),
            _ => println!("Invalid selection."),
        }
    }
}

fn exit_with(e: &SjrError) -> ! {
    tracing::error!(
        "❌ Lookup failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::info!("Starting sjr-percentile");
    tracing::debug!("CLI config: {:?}", cli);

    if let Err(e) = cli.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        exit_with(&e);
    }
    let settings = match cli.load_settings() {
        Ok(settings) => settings,
        Err(e) => exit_with(&e),
    };

    let selector: Box<dyn CandidateSelector> = match (cli.first, cli.pick) {
        (true, _) => Box::new(FirstCandidate),
        (false, Some(n)) => Box::new(PickIndex(n)),
        (false, None) => Box::new(PromptSelector),
    };
    let options = RunOptions {
        year: cli.year.clone(),
        metrics_only: cli.metrics_only,
    };

    let fetcher = match ExportFetcher::new(&settings.site.user_agent, settings.timeouts.download()) {
        Ok(fetcher) => fetcher,
        Err(e) => exit_with(&e),
    };
    let session = match ChromeSession::launch(
        &settings.browser,
        &settings.site.user_agent,
        &settings.timeouts,
    )
    .await
    {
        Ok(session) => session,
        Err(e) => exit_with(&e),
    };

    let site = settings.site.clone();
    let diagnostics_dir = settings.output.diagnostics_dir.clone();
    let outcome = SessionGateway::with_session(session, settings.timeouts.clone(), |gateway| {
        let mut status = gateway.subscribe();
        tokio::spawn(async move {
            while status.changed().await.is_ok() {
                let current = status.borrow_and_update().clone();
                if let SessionStatus::ChallengePending { url, waited_up_to } = current {
                    eprintln!(
                        "🔐 Verification needed on {}; solve it in the browser window (waiting up to {}s)",
                        url,
                        waited_up_to.as_secs()
                    );
                }
            }
        });

        let engine = LookupEngine::new(SjrPipeline::new(gateway, site, fetcher, diagnostics_dir));
        let query = cli.query.clone();
        let options = options.clone();
        async move { engine.run(&query, &options, selector.as_ref()).await }
    })
    .await;

    let report = match outcome {
        Ok(report) => report,
        Err(e) => exit_with(&e),
    };

    let Some(candidate) = &report.candidate else {
        if report.candidates_found == 0 {
            println!("Journal not found.");
        } else {
            println!("No journal selected.");
        }
        return Ok(());
    };

    println!("\n{}", "=".repeat(60));
    if let Some(bundle) = &report.metrics {
        print!("{}", render_metrics(&candidate.title, bundle));
    }
    if !cli.metrics_only {
        println!("\nPercentiles for {}:", report.year);
        if report.percentiles.is_empty() {
            println!("No percentiles could be computed.");
        } else {
            print!("{}", render_summary(&report.percentiles));
        }
    }
    println!("{}", "=".repeat(60));

    if let Some(path) = &settings.output.path {
        match ReportWriter::new(LocalStorage::new(path)).write(&report).await {
            Ok(locations) => {
                for location in locations {
                    tracing::info!("📁 Output saved to: {}", location);
                    println!("📁 Output saved to: {}", location);
                }
            }
            Err(e) => exit_with(&e),
        }
    }

    Ok(())
}
