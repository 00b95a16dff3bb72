use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use physica::config::Config;
use physica::flashcards::{
    get_flashcards_explorer_data, load_flashcards_session_summary, normalize_flashcards_session_summary,
    FileStore, FlashcardsExplorerData, FlashcardsOptions, FlashcardsPlay, FlashcardsSearchState,
    FlashcardsSelection, FlashcardsStudy, SearchParams, SessionEffect, SessionEngine, SessionEvent, SessionKey,
    SystemClock, TimeSeed,
};
use physica::i18n::{FlashcardsDeckLabels, Locale, Translations};

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

#[derive(Parser, Debug)]
#[command(name = "flashcards", version, about = "Browse, study and play lecture-note flashcards")]
struct Cli {
    /// YAML config file (defaults to ./physica.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// local content root
    #[arg(long, global = true)]
    content_dir: Option<PathBuf>,

    /// remote content server exposing index.json
    #[arg(long, global = true)]
    content_url: Option<String>,

    #[arg(long, global = true)]
    locale: Option<Locale>,

    /// JSON file holding saved session results
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List courses and their topics
    Courses,
    /// Print the deck of a selection as JSON
    Deck {
        /// selection query, e.g. "scope=course&course=calc"
        #[arg(default_value = "")]
        query: String,
    },
    /// Print the study sheet of a selection
    Study {
        #[arg(default_value = "")]
        query: String,
    },
    /// Play a selection interactively
    Play {
        #[arg(default_value = "")]
        query: String,
    },
    /// Show the stored results of a selection
    Report {
        #[arg(default_value = "")]
        query: String,
    },
}

struct App {
    config: Config,
    t: Translations,
    data: FlashcardsExplorerData,
    options: FlashcardsOptions,
}

impl App {
    fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
        if let Some(dir) = &cli.content_dir {
            config.content_dir = Some(dir.clone());
        }
        if let Some(url) = &cli.content_url {
            config.content_url = Some(url.clone());
        }
        if let Some(locale) = cli.locale {
            config.locale = locale;
        }
        if let Some(store) = &cli.store {
            config.store_path = store.clone();
        }

        let source = config.content_source().context("failed to open content")?;
        let cache = config.render_cache();
        let data = get_flashcards_explorer_data(source.as_ref(), config.locale.as_str(), &cache)
            .context("failed to collect flashcards")?;
        log::debug!(
            "loaded {} topics across {} courses, {} fragments rendered",
            data.topics.len(),
            data.courses.len(),
            cache.len()
        );

        Ok(Self {
            t: Translations::new(config.locale),
            options: FlashcardsOptions::from_explorer(&data),
            config,
            data,
        })
    }

    fn store(&self) -> anyhow::Result<FileStore> {
        let store = FileStore::open(self.config.store_path.clone()).context(format!(
            "failed to open result store {}",
            self.config.store_path.display()
        ))?;
        log::debug!("session results in {}", store.path().display());
        Ok(store)
    }

    fn selection(&self, query: &str) -> FlashcardsSelection {
        let state = FlashcardsSearchState::from_params(&SearchParams::parse(query));
        FlashcardsSelection::resolve(&self.data, &self.options, &state, &self.t)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let app = App::load(&cli)?;

    match &cli.command {
        Command::Courses => print_courses(&app),
        Command::Deck { query } => {
            let selection = app.selection(query);
            let json = serde_json::to_string_pretty(&selection.cards).context("failed to serialize deck")?;
            println!("{}", json);
            Ok(())
        }
        Command::Study { query } => {
            let mut store = app.store()?;
            let study = FlashcardsStudy::resolve(&app.data, &app.options, &SearchParams::parse(query), &mut store, &app.t)
                .context("failed to resolve study view")?;
            let sheet = study.render_sheet(&app.t).context("failed to render study sheet")?;
            println!("{}", sheet);
            Ok(())
        }
        Command::Play { query } => play(&app, query),
        Command::Report { query } => report(&app, query),
    }
}

fn print_courses(app: &App) -> anyhow::Result<()> {
    if app.options.courses.is_empty() {
        println!("{}", app.t.t("flashcardsNoTopic"));
        return Ok(());
    }

    for course in &app.options.courses {
        println!("{BOLD}{}{RESET} {DIM}({}){RESET}", course.title, course.slug);
        for topic in app.options.topics(Some(&course.slug)) {
            println!("  {} {DIM}{} · {} cards{RESET}", topic.title, topic.slug, topic.card_count);
        }
    }
    Ok(())
}

fn report(app: &App, query: &str) -> anyhow::Result<()> {
    let store = app.store()?;
    let selection = app.selection(query);
    let stored = load_flashcards_session_summary(&store, &selection.storage_key)
        .and_then(|summary| normalize_flashcards_session_summary(&summary, &selection.card_ids()));

    println!("{BOLD}{}{RESET}", selection.heading());
    match stored {
        Some(summary) => {
            println!(
                "{}: {} {} · {} {}",
                app.t.t("flashcardsResultsTitle"),
                summary.confirm_ids.len(),
                app.t.t("flashcardsResultsPassed"),
                summary.pass_ids.len(),
                app.t.t("flashcardsResultsNotPassed"),
            );
            let json = serde_json::to_string_pretty(&summary).context("failed to serialize summary")?;
            println!("{}", json);
        }
        None => println!("{DIM}{}{RESET}", selection.storage_key),
    }
    Ok(())
}

fn play(app: &App, query: &str) -> anyhow::Result<()> {
    let mut store = app.store()?;
    let play = FlashcardsPlay::resolve(&app.data, &app.options, &SearchParams::parse(query), &store, &app.t);
    let labels = app.t.deck_labels();

    println!("{BOLD}{}{RESET}", play.selection.heading());
    if play.game_cards.is_empty() {
        println!("{}", app.t.t("flashcardsNoCards"));
        return Ok(());
    }

    let mut engine = SessionEngine::new(play.game_cards.clone(), SystemClock, &TimeSeed::new(SystemClock));
    print_card(&engine, &labels);
    prompt(&labels)?;

    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read input")?;
        let mut words = line.split_whitespace();
        let events = match words.next() {
            Some("q") => break,
            Some("r") => {
                engine.restart();
                print_card(&engine, &labels);
                prompt(&labels)?;
                continue;
            }
            Some("f") => vec![SessionEvent::KeyPress(SessionKey::Flip)],
            Some("p" | "h") => vec![SessionEvent::KeyPress(SessionKey::Discard)],
            Some("c" | "l") => vec![SessionEvent::KeyPress(SessionKey::Confirm)],
            Some("s") => {
                let offset: f64 = words.next().and_then(|dx| dx.parse().ok()).unwrap_or_default();
                let velocity: f64 = words.next().and_then(|vx| vx.parse().ok()).unwrap_or_default();
                vec![
                    SessionEvent::DragStart,
                    SessionEvent::DragUpdate { offset },
                    SessionEvent::DragEnd { offset, velocity },
                ]
            }
            _ => {
                prompt(&labels)?;
                continue;
            }
        };

        while engine.is_locked() {
            std::thread::sleep(std::time::Duration::from_millis(20));
        }

        let mut pending = events;
        while !pending.is_empty() {
            let mut settle = false;
            for event in pending.drain(..) {
                for effect in engine.handle(event) {
                    match effect {
                        SessionEffect::Flipped { .. } => print_card(&engine, &labels),
                        SessionEffect::ExitAnimation { .. } => settle = true,
                        SessionEffect::Committed { .. } => {
                            if !engine.is_complete() {
                                print_card(&engine, &labels);
                            }
                        }
                        SessionEffect::Completed { summary } => {
                            println!("{BOLD}{}{RESET}", labels.completed_title);
                            println!(
                                "{}: {} · {}: {}",
                                labels.passed, summary.confirm_ids.len(), labels.confirmed, summary.pass_ids.len()
                            );
                            let href = play
                                .selection
                                .view_report(&mut store, &summary)
                                .context("failed to save session results")?;
                            if let Some(href) = href {
                                println!("{}: {}", labels.view_report, href);
                            }
                            println!("{DIM}r: {} · q{RESET}", labels.restart);
                        }
                        SessionEffect::Offset { .. } | SessionEffect::SpringBack => {}
                    }
                }
            }
            if settle {
                pending.push(SessionEvent::AnimationSettled);
            }
        }
        prompt(&labels)?;
    }

    Ok(())
}

fn print_card<C: physica::flashcards::Clock>(engine: &SessionEngine<C>, labels: &FlashcardsDeckLabels) {
    let Some(card) = engine.current_card() else {
        return;
    };
    println!(
        "\n{DIM}{}: {} · {}: {} · {}: {}{RESET}",
        labels.remaining,
        engine.remaining(),
        labels.passed,
        engine.confirmed_count(),
        labels.confirmed,
        engine.passed_count()
    );
    println!("{BOLD}{}{RESET}: {}", labels.question, card.question);
    if engine.is_flipped() {
        println!("{BOLD}{}{RESET}: {}", labels.answer, card.answer);
    }
}

fn prompt(labels: &FlashcardsDeckLabels) -> anyhow::Result<()> {
    print!(
        "{DIM}f {} · p {} · c {} · s <dx> [vx] · r · q{RESET} > ",
        labels.flip, labels.pass, labels.confirm
    );
    io::stdout().flush().context("failed to flush stdout")
}
