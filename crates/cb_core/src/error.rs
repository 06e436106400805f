use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Scoring error: {0}")]
    Scoring(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Newsletter already archived for week {week}/{year}")]
    DuplicateWeek { week: u32, year: i32 },

    #[error("No ranked articles found for week {week}/{year}")]
    NoArticlesForWeek { week: u32, year: i32 },

    #[error("Invalid week: {0}")]
    InvalidWeek(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
