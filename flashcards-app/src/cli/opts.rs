use clap::{Args, Parser, Subcommand};
use flashcards_json::DEFAULT_QUOTA_BYTES;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[command(name = "flashcards", version, about = "Flashcards: categorised question/answer cards and a shuffled quiz")]
pub struct Cli {
    /// Store file (defaults to the platform data dir)
    #[arg(long)]
    pub data_file: Option<PathBuf>,

    /// Reject writes once the store holds this many bytes
    #[arg(long, default_value_t = DEFAULT_QUOTA_BYTES)]
    pub quota_bytes: usize,

    /// Timestamped copies of the store file to keep
    #[arg(long, default_value_t = 10)]
    pub max_backups: usize,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Add one card
    Add(CardAdd),
    /// List cards
    List {
        #[arg(long)]
        category: Option<String>,
        /// Print question/answer as HTML with super/subscripts
        #[arg(long)]
        html: bool,
    },
    /// Delete a card by id, or by position for old data
    Rm(CardRm),
    /// List categories
    Categories,
    /// Import cards from a text file (one pair per line)
    Import {
        path: PathBuf,
        #[arg(long, default_value = "")]
        category: String,
    },
    /// Import cards from CSV (category,question,answer)
    ImportCsv {
        path: PathBuf,
        /// Overrides the CSV category column
        #[arg(long)]
        category: Option<String>,
    },
    /// Export cards to CSV
    ExportCsv {
        path: PathBuf,
        #[arg(long)]
        category: Option<String>,
    },
    /// Import cards from a photo of a word list
    Ocr {
        image: PathBuf,
        #[arg(long, default_value = "")]
        category: String,
    },
    /// Shuffled question/answer loop
    Quiz {
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value_t = 50)]
        max: usize,
    },
    /// Manage the OCR service key
    #[command(subcommand)]
    Key(KeyCmd),
    /// Delete every card
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Args, Clone)]
pub struct CardAdd {
    #[arg(long, default_value = "")]
    pub category: String,
    #[arg(long)]
    pub question: String,
    #[arg(long)]
    pub answer: String,
}

#[derive(Debug, Args, Clone)]
pub struct CardRm {
    #[arg(required_unless_present = "index", conflicts_with = "index")]
    pub id: Option<String>,
    #[arg(long)]
    pub index: Option<usize>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum KeyCmd {
    Set { key: String },
    Show,
    Clear,
}
