use crate::cli::opts::*;
use crate::import::{ImportError, ImportOutcome, ImportWorkflow};
use crate::ocr::{GeminiExtractor, ImagePayload, OcrConfig, OcrError};

use anyhow::{anyhow, bail, Result};
use flashcards_core::credentials::{clear_api_key, load_api_key, save_api_key};
use flashcards_core::sanitize::DEFAULT_MAX_LEN;
use flashcards_core::{
    render, resolve_category, sanitize, Card, CardStore, CoreError, KeyValueStore, QuizSession,
    StorageError,
};
use flashcards_json::paths::{backups_dir_for, default_store_file};
use flashcards_json::JsonFileStore;
use std::io::{stdin, stdout, Write};
use std::sync::Arc;

pub async fn run_cli(args: Cli) -> Result<()> {
    let kv = Arc::new(open_kv(&args)?);
    let store = CardStore::new(kv.clone());

    match args.cmd {
        Command::Add(a) => {
            let c = store
                .create(&a.category, &a.question, &a.answer)
                .map_err(actionable)?;
            println!("{}", c.id);
        }
        Command::List { category, html } => {
            for line in list_lines(&store, category.as_deref(), html) {
                println!("{line}");
            }
        }
        Command::Rm(rm) => {
            let removed = match (rm.id, rm.index) {
                (Some(id), _) => store.delete(id),
                (None, Some(index)) => store.delete(index),
                (None, None) => bail!("give a card id or --index"),
            };
            removed.map_err(actionable)?;
            println!("ok");
        }
        Command::Categories => {
            for cat in store.categories() {
                println!("{cat}");
            }
        }
        Command::Import { path, category } => {
            let text = std::fs::read_to_string(&path)?;
            let out = ImportWorkflow::new().import_text(&text, &category, &store);
            report_import(out)?;
        }
        Command::ImportCsv { path, category } => import_csv(&store, &path, category)?,
        Command::ExportCsv { path, category } => export_csv(&store, &path, category)?,
        Command::Ocr { image, category } => {
            let config = OcrConfig::from_env_or(load_api_key(&*kv))
                .ok_or_else(|| anyhow!("no OCR key: run `flashcards key set <KEY>` or set FLASHCARDS_API_KEY"))?;
            let payload = ImagePayload::from_path(&image)?;
            let extractor = GeminiExtractor::new(config);
            let out = ImportWorkflow::new()
                .import_image(&extractor, &payload, &category, &store)
                .await;
            report_import(out)?;
        }
        Command::Quiz { category, max } => quiz(&store, category, max)?,
        Command::Key(cmd) => key_cmd(&*kv, cmd)?,
        Command::Clear { yes } => {
            if !yes {
                bail!("this deletes every card; rerun with --yes");
            }
            store.clear().map_err(actionable)?;
            println!("ok");
        }
    }
    Ok(())
}

/// One row per card. The leading index is the card's position in the whole
/// store, which is what `rm --index` takes, even when a category filter is on.
fn list_lines(store: &CardStore, category: Option<&str>, html: bool) -> Vec<String> {
    store
        .load()
        .iter()
        .enumerate()
        .filter(|(_, c)| category.map_or(true, |cat| c.category == cat))
        .map(|(i, c)| {
            if html {
                format!("{i}\t{}\t{}\t{}\t{}", c.id, c.category, render(&c.question), render(&c.answer))
            } else {
                format!("{i}\t{}\t{}\t{}\t{}", c.id, c.category, c.question, c.answer)
            }
        })
        .collect()
}

pub fn open_kv(args: &Cli) -> Result<JsonFileStore> {
    let file = args.data_file.clone().unwrap_or_else(default_store_file);
    let backups = backups_dir_for(&file);
    let kv = JsonFileStore::open_with(file, backups, args.max_backups)
        .map_err(|e| anyhow!(storage_message(&e)))?;
    Ok(kv.with_quota(Some(args.quota_bytes)))
}

fn storage_message(e: &StorageError) -> String {
    match e {
        StorageError::QuotaExceeded => {
            "storage is full: delete some cards or raise --quota-bytes".to_string()
        }
        StorageError::AccessDenied => {
            "storage is not writable: check permissions on the data file".to_string()
        }
        StorageError::Other(msg) => format!("could not save: {msg}"),
    }
}

fn actionable(e: CoreError) -> anyhow::Error {
    match e {
        CoreError::Storage(s) => anyhow!(storage_message(&s)),
        other => other.into(),
    }
}

fn report_import(out: Result<ImportOutcome, ImportError>) -> Result<()> {
    match out {
        Ok(ImportOutcome::Imported { parsed, added }) => {
            println!("imported {added} of {parsed} card(s)");
            Ok(())
        }
        Ok(ImportOutcome::NothingFound) => {
            println!("no question/answer pairs found");
            Ok(())
        }
        Ok(ImportOutcome::AlreadyRunning) => {
            println!("an import is already running");
            Ok(())
        }
        Err(ImportError::Store(e)) => Err(actionable(e)),
        Err(ImportError::Ocr(e)) => Err(anyhow!(ocr_message(&e))),
    }
}

fn ocr_message(e: &OcrError) -> String {
    match e {
        OcrError::RateLimited => "OCR service is busy; wait a minute and try again".to_string(),
        OcrError::Unauthorized => "OCR key was rejected; check it with `flashcards key set`".to_string(),
        OcrError::EmptyResponse => "no text was found in the image".to_string(),
        OcrError::OversizedResponse => "the image produced too much text; crop it and retry".to_string(),
        other => other.to_string(),
    }
}

fn import_csv(store: &CardStore, path: &std::path::Path, category: Option<String>) -> Result<()> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut cards = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let cat = match &category {
            Some(c) => c.as_str(),
            None => rec.get(0).unwrap_or(""),
        };
        let cat = resolve_category(sanitize(cat, DEFAULT_MAX_LEN));
        let question = sanitize(rec.get(1).unwrap_or(""), DEFAULT_MAX_LEN);
        let answer = sanitize(rec.get(2).unwrap_or(""), DEFAULT_MAX_LEN);
        cards.push(Card::new(store.ids().generate(), cat, question, answer));
    }
    let total = cards.len();
    let added = store.append(cards).map_err(actionable)?;
    println!("imported {added} of {total} row(s)");
    Ok(())
}

fn export_csv(store: &CardStore, path: &std::path::Path, category: Option<String>) -> Result<()> {
    let cards = match category {
        Some(cat) => store.cards_in(&cat),
        None => store.load(),
    };
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["category", "question", "answer", "id"])?;
    for c in &cards {
        wtr.write_record([&c.category, &c.question, &c.answer, &c.id])?;
    }
    wtr.flush()?;
    println!("wrote {} card(s) to {}", cards.len(), path.display());
    Ok(())
}

fn quiz(store: &CardStore, category: Option<String>, max: usize) -> Result<()> {
    let cards = match category {
        Some(cat) => store.cards_in(&cat),
        None => store.load(),
    };
    let mut session = QuizSession::new(&cards);
    if session.is_empty() {
        println!("no cards to quiz");
        return Ok(());
    }

    let total = session.len().min(max);
    let mut seen = 0usize;
    while let Some(card) = session.current() {
        if seen >= total {
            break;
        }
        seen += 1;
        println!("\n[{seen}/{total}] {}", card.category);
        println!("Q: {}", card.question);
        if read_line("[enter=show, q=quit] ")?.trim().eq_ignore_ascii_case("q") {
            break;
        }
        if let Some(answer) = session.reveal() {
            println!("A: {answer}");
        }
        if read_line("[enter=next, q=quit] ")?.trim().eq_ignore_ascii_case("q") {
            break;
        }
        session.advance();
    }
    println!("\nreviewed {seen}");
    Ok(())
}

fn key_cmd(kv: &dyn KeyValueStore, cmd: KeyCmd) -> Result<()> {
    match cmd {
        KeyCmd::Set { key } => {
            save_api_key(kv, &key).map_err(|e| match e {
                CoreError::Invalid(_) => anyhow!(
                    "that does not look like an API key (20-100 letters, digits, '-' or '_')"
                ),
                other => actionable(other),
            })?;
            println!("ok");
        }
        KeyCmd::Show => match load_api_key(kv) {
            Some(k) => println!("{}…", k.chars().take(6).collect::<String>()),
            None => println!("no key stored"),
        },
        KeyCmd::Clear => {
            clear_api_key(kv).map_err(actionable)?;
            println!("ok");
        }
    }
    Ok(())
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    stdout().flush().ok();
    let mut s = String::new();
    stdin().read_line(&mut s)?;
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::Path;

    fn cli(data: &Path, rest: &[&str]) -> Cli {
        let mut argv = vec!["flashcards", "--data-file"];
        argv.push(data.to_str().unwrap());
        argv.extend_from_slice(rest);
        Cli::parse_from(argv)
    }

    fn cards_at(args: &Cli) -> Vec<Card> {
        CardStore::new(Arc::new(open_kv(args).unwrap())).load()
    }

    #[tokio::test]
    async fn add_then_remove_by_index() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("cards.json");

        run_cli(cli(&data, &["add", "--category", "math", "--question", "x^2", "--answer", "square"]))
            .await
            .unwrap();
        run_cli(cli(&data, &["add", "--question", "H_2O", "--answer", "water"]))
            .await
            .unwrap();
        let args = cli(&data, &["categories"]);
        let cards = cards_at(&args);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[1].category, flashcards_core::DEFAULT_CATEGORY);

        run_cli(cli(&data, &["rm", "--index", "0"])).await.unwrap();
        let left = cards_at(&args);
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].question, "H_2O");
    }

    #[tokio::test]
    async fn filtered_list_index_deletes_the_listed_card() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("cards.json");
        run_cli(cli(&data, &["add", "--category", "a", "--question", "keep-me", "--answer", "1"]))
            .await
            .unwrap();
        run_cli(cli(&data, &["add", "--category", "b", "--question", "delete-me", "--answer", "2"]))
            .await
            .unwrap();

        let args = cli(&data, &["categories"]);
        let store = CardStore::new(Arc::new(open_kv(&args).unwrap()));
        for html in [false, true] {
            let rows = list_lines(&store, Some("b"), html);
            assert_eq!(rows.len(), 1);
            assert!(rows[0].starts_with("1\t"), "{}", rows[0]);
        }

        run_cli(cli(&data, &["rm", "--index", "1"])).await.unwrap();
        let left: Vec<_> = cards_at(&args).into_iter().map(|c| c.question).collect();
        assert_eq!(left, ["keep-me"]);
    }

    #[tokio::test]
    async fn csv_export_then_import_copies_cards() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.json");
        let dst = dir.path().join("b.json");
        let csv_path = dir.path().join("cards.csv");
        let csv_arg = csv_path.to_str().unwrap();

        let words = dir.path().join("words.txt");
        std::fs::write(&words, "apple→りんご\nbanana→バナナ\n").unwrap();
        run_cli(cli(&src, &["import", "--category", "英単語", words.to_str().unwrap()]))
            .await
            .unwrap();
        run_cli(cli(&src, &["export-csv", csv_arg])).await.unwrap();
        run_cli(cli(&dst, &["import-csv", csv_arg])).await.unwrap();

        let copied = cards_at(&cli(&dst, &["categories"]));
        let original = cards_at(&cli(&src, &["categories"]));
        assert_eq!(copied.len(), 2);
        for (a, b) in copied.iter().zip(&original) {
            assert_eq!((&a.category, &a.question, &a.answer), (&b.category, &b.question, &b.answer));
            assert_ne!(a.id, b.id);
        }
    }

    #[tokio::test]
    async fn invalid_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("cards.json");
        assert!(run_cli(cli(&data, &["key", "set", "nope"])).await.is_err());
        let key = format!("AIza{}", "k".repeat(35));
        run_cli(cli(&data, &["key", "set", key.as_str()])).await.unwrap();
        let kv = open_kv(&cli(&data, &["categories"])).unwrap();
        assert_eq!(load_api_key(&kv), Some(key));
    }
}
