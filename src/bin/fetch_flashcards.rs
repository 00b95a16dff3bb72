use std::env;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path};

use anyhow::Context;
use physica::content::{ContentSource, HttpContentSource};
use physica::flashcards::FlashcardCatalog;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";
const DEFAULT_OUTPUT_DIR: &str = "output/content";

pub struct Config {
    pub base_url: String,
    pub output_dir: String,
}

impl Config {
    pub fn new(base_url: String, output_dir: &str) -> Self {
        Self {
            base_url,
            output_dir: output_dir.to_string(),
        }
    }
}

fn parse_config(mut args: impl Iterator<Item = String>) -> anyhow::Result<Config> {
    let base_url = args
        .next()
        .or_else(|| env::var("PHYSICA_CONTENT_URL").ok())
        .context("base_url is required, the server must expose index.json")?;
    let output_dir = args.next().unwrap_or(DEFAULT_OUTPUT_DIR.to_string());

    Ok(Config::new(base_url, &output_dir))
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();
    let args = env::args().skip(1);

    let config = match parse_config(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Usage: fetch_flashcards <base_url> [output_dir]");
            return Err(e);
        }
    };

    let source = HttpContentSource::new(&config.base_url);
    let catalog = FlashcardCatalog::load(&source)
        .context(format!("could not list content at {}", config.base_url))?;
    let paths = catalog.mirror_paths();

    create_output_dir(&config.output_dir).context("failed to create output directory")?;

    for path in &paths {
        if let Err(e) = mirror_file(&source, path, &config.output_dir) {
            eprintln!("Error writing {}: {}", path, e);
            return Err(e);
        }
    }

    println!(
        "mirrored {BOLD}{}{RESET} files ({BOLD}{}{RESET} flashcard sources, {BOLD}{}{RESET} courses) into {BOLD}{}{RESET}",
        paths.len(),
        catalog.files().len(),
        catalog.active_courses().len(),
        &config.output_dir
    );

    Ok(())
}

fn mirror_file(source: &dyn ContentSource, path: &str, output_dir: &str) -> anyhow::Result<()> {
    let relative = Path::new(path);
    if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
        anyhow::bail!("refusing to write {} outside the output directory", path);
    }

    let body = source.load(path).context(format!("failed to fetch {}", path))?;

    let target = Path::new(output_dir).join(relative);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).context(format!("failed to create directory for {}", path))?;
    }

    let mut file = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&target)
        .context(format!("failed to open file for {}", path))?;
    write!(file, "{}", body).context(format!("failed to write {}", path))?;
    log::debug!("wrote {}", target.display());

    Ok(())
}

fn create_output_dir(output_dir: &str) -> anyhow::Result<()> {
    if fs::metadata(output_dir).is_ok() {
        fs::remove_dir_all(output_dir)?;
    }

    fs::create_dir_all(output_dir)?;
    Ok(())
}
