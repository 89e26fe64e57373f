use directories::ProjectDirs;
use std::path::PathBuf;

pub fn data_root() -> PathBuf {
    if let Some(pd) = ProjectDirs::from("com", "flashcards", "Flashcards") {
        pd.data_dir().to_path_buf()
    } else {
        // No home directory: keep data next to the working directory.
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }
}

pub fn default_store_file() -> PathBuf {
    data_root().join("flashcards.json")
}

/// Backups live in a `backups` directory beside the store file.
pub fn backups_dir_for(store_file: &std::path::Path) -> PathBuf {
    store_file
        .parent()
        .map(|p| p.join("backups"))
        .unwrap_or_else(|| PathBuf::from("backups"))
}
