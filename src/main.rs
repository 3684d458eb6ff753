use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use rayon::prelude::*;

use mneme::anki::{self, Collection};
use mneme::ebisu::EbisuModel;
use mneme::memory::{self, CardBelief, CardId, ReviewRow, DEFAULT_HALF_LIFE_SECS};
use mneme::report::{self, Summary};

#[derive(Parser)]
#[command(
    name = "mneme",
    about = "Replay Anki review logs through a Bayesian recall model",
    version
)]
struct Cli {
    /// Anki deck or collection package (.apkg / .colpkg)
    #[arg(long)]
    deck: PathBuf,

    /// Print one recall line per card instead of progress dots
    #[arg(long)]
    verbose: bool,

    /// Starting half-life in seconds for a freshly learned card
    #[arg(long, default_value_t = DEFAULT_HALF_LIFE_SECS)]
    half_life: f64,

    /// Recall-probability target for the projected-review estimate
    #[arg(long, default_value_t = 0.85)]
    target: f64,

    /// Output format
    #[arg(long, default_value = "plain")]
    format: OutputFormat,
}

#[derive(Clone, Debug, PartialEq, clap::ValueEnum)]
enum OutputFormat {
    Plain,
    Json,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    if !(cli.target > 0.0 && cli.target < 1.0) {
        bail!("--target must be strictly between 0 and 1");
    }
    if cli.half_life <= 0.0 {
        bail!("--half-life must be positive");
    }

    let beliefs = import_deck(&cli)?;
    render(&cli, &beliefs)
}

fn import_deck(cli: &Cli) -> Result<BTreeMap<CardId, CardBelief<EbisuModel>>> {
    let database = anki::extract_collection(&cli.deck)
        .with_context(|| format!("failed to open deck package {}", cli.deck.display()))?;
    let collection =
        Collection::open(database.path()).context("failed to open collection database")?;

    let card_ids = collection.card_ids().context("failed to list cards")?;
    log::info!("deck lists {} cards", card_ids.len());

    // SQLite access stays on this thread; the replays fan out per card.
    let histories = card_ids
        .into_iter()
        .map(|id| Ok((id, collection.review_rows(id)?)))
        .collect::<anki::Result<Vec<(CardId, Vec<ReviewRow>)>>>()?;
    let total = histories.len();

    let progress = Dots::new(!cli.verbose && cli.format == OutputFormat::Plain);
    let beliefs: BTreeMap<CardId, CardBelief<EbisuModel>> = histories
        .into_par_iter()
        .filter_map(|(card_id, rows)| emulate_card(card_id, &rows, cli.half_life, &progress))
        .collect();
    progress.finish();

    log::info!("emulated {} of {} cards", beliefs.len(), total);
    Ok(beliefs)
}

/// One card's replay. Cards that never passed a review yield `None` and do
/// not count towards the progress dots; only imported cards tick.
fn emulate_card(
    card_id: CardId,
    rows: &[ReviewRow],
    half_life: f64,
    progress: &Dots,
) -> Option<(CardId, CardBelief<EbisuModel>)> {
    let sessions = memory::aggregate_reviews(rows);
    let belief = memory::emulate::<EbisuModel>(card_id, sessions, half_life)?;
    progress.tick();
    Some((card_id, belief))
}

fn render(cli: &Cli, beliefs: &BTreeMap<CardId, CardBelief<EbisuModel>>) -> Result<()> {
    let now = Utc::now().timestamp();
    let summary = Summary::of_beliefs(beliefs);

    match cli.format {
        OutputFormat::Json => {
            let document = report::json_report(beliefs, now, cli.target);
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        OutputFormat::Plain => {
            if cli.verbose {
                for belief in beliefs.values() {
                    println!("{}", report::card_line(belief, now, cli.target));
                }
            }
            println!("{}", summary.line());
        }
    }

    Ok(())
}

/// Progress dots on stderr, one per hundred cards; stdout stays reserved
/// for the report.
struct Dots {
    enabled: bool,
    count: AtomicUsize,
}

impl Dots {
    fn new(enabled: bool) -> Self {
        Dots {
            enabled,
            count: AtomicUsize::new(0),
        }
    }

    fn tick(&self) {
        if !self.enabled {
            return;
        }
        let done = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        if done % 100 == 0 {
            eprint!(".");
            let _ = std::io::stderr().flush();
        }
    }

    fn finish(&self) {
        if self.enabled {
            eprintln!(" done!");
        }
    }
}
