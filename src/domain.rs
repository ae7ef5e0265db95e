use std::fmt;
use std::io::Error;

use ratatui::crossterm::event::KeyEvent;

pub const HELP_TEXT: &str = "\
sv - Google Sheets data viewer

  q          Quit
  /          Search all columns
  Esc        Clear search / close popup
  c / C      Next / previous category
  p / P      Next / previous page size
  → / n      Next page
  ← / b      Previous page
  g / G      First / last page
  ↑ k / ↓ j  Move row cursor
  ?          Show this help
";

#[derive(Debug)]
pub enum SVError {
    IoError(Error),
    HttpError(reqwest::Error),
    JsonError(serde_json::Error),
    MalformedResponse(String),
    ConfigError(String),
    FileNotFound,
    PermissionDenied,
}

impl fmt::Display for SVError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SVError::IoError(e) => write!(f, "io error: {e}"),
            SVError::HttpError(e) => write!(f, "http request failed: {e}"),
            SVError::JsonError(e) => write!(f, "invalid json: {e}"),
            SVError::MalformedResponse(msg) => write!(f, "malformed response: {msg}"),
            SVError::ConfigError(msg) => write!(f, "configuration error: {msg}"),
            SVError::FileNotFound => write!(f, "file not found"),
            SVError::PermissionDenied => write!(f, "permission denied"),
        }
    }
}

impl std::error::Error for SVError {}

impl From<Error> for SVError {
    fn from(err: Error) -> Self {
        SVError::IoError(err)
    }
}

impl From<reqwest::Error> for SVError {
    fn from(err: reqwest::Error) -> Self {
        SVError::HttpError(err)
    }
}

impl From<serde_json::Error> for SVError {
    fn from(err: serde_json::Error) -> Self {
        SVError::JsonError(err)
    }
}

/// UI side configuration, the sheet connection lives in `config::SheetConfig`.
#[derive(Debug, Clone)]
pub struct SVConfig {
    pub event_poll_time: u64,
    pub page_size: usize,
}

impl Default for SVConfig {
    fn default() -> Self {
        SVConfig {
            event_poll_time: 100,
            page_size: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    NextPage,
    PreviousPage,
    FirstPage,
    LastPage,
    NextCategory,
    PreviousCategory,
    NextPageSize,
    PreviousPageSize,
    Search,
    Exit,
    Help,
    RawKey(KeyEvent),
}
