use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetcladError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Data corruption: {message}")]
    DataCorruption { message: String },
    #[error("Query syntax error at {}: {message}", position(.line, .col))]
    QuerySyntax { message: String, line: Option<usize>, col: Option<usize> },
    #[error("Invalid term: {0}")]
    InvalidTerm(String),
    #[error("Transaction error: {0}")]
    Transaction(String),
    #[error("Server error: {0}")]
    Server(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, NetcladError>;

fn position(line: &Option<usize>, col: &Option<usize>) -> String {
    match (line, col) {
        (Some(l), Some(c)) => format!("line {l}, column {c}"),
        (Some(l), None) => format!("line {l}"),
        _ => "unknown position".to_string(),
    }
}

impl NetcladError {
    pub fn syntax(message: impl Into<String>, (line, col): (usize, usize)) -> Self {
        Self::QuerySyntax { message: message.into(), line: Some(line), col: Some(col) }
    }
}

// Helper conversions
impl From<rusqlite::Error> for NetcladError {
    fn from(e: rusqlite::Error) -> Self { Self::Persistence(e.to_string()) }
}
impl From<config::ConfigError> for NetcladError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl<T> From<std::sync::PoisonError<T>> for NetcladError {
    fn from(e: std::sync::PoisonError<T>) -> Self { Self::Lock(e.to_string()) }
}
