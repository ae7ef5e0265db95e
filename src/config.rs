use std::fs;
use std::io::ErrorKind;

use derive_setters::Setters;
use serde::Deserialize;
use tracing::debug;

use crate::domain::SVError;

pub const DEFAULT_ENDPOINT: &str = "https://sheets.googleapis.com/v4/spreadsheets";
pub const DEFAULT_SHEET: &str = "Sheet1";

/// Everything needed to address one sheet of one spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Setters)]
#[setters(into)]
pub struct SheetConfig {
    pub spreadsheet_id: String,
    pub sheet: String,
    pub api_key: String,
    pub endpoint: String,
}

impl SheetConfig {
    pub fn new(spreadsheet_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        SheetConfig {
            spreadsheet_id: spreadsheet_id.into(),
            sheet: DEFAULT_SHEET.to_string(),
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

/// Sheet settings as found in a config file or on the command line.
/// Every field is optional, later sources win in `merge`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialSheetConfig {
    pub spreadsheet_id: Option<String>,
    pub sheet: Option<String>,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
}

impl PartialSheetConfig {
    /// Reads a JSON config file. `~` and environment variables in the path are expanded.
    pub fn load(path: &str) -> Result<Self, SVError> {
        let expanded = shellexpand::full(path)
            .map_err(|e| SVError::ConfigError(format!("cannot expand {path}: {e}")))?;
        debug!("Reading config file {expanded}");
        let content = fs::read_to_string(expanded.as_ref()).map_err(|e| match e.kind() {
            ErrorKind::NotFound => SVError::FileNotFound,
            ErrorKind::PermissionDenied => SVError::PermissionDenied,
            _ => SVError::IoError(e),
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, SVError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn merge(self, other: PartialSheetConfig) -> Self {
        PartialSheetConfig {
            spreadsheet_id: other.spreadsheet_id.or(self.spreadsheet_id),
            sheet: other.sheet.or(self.sheet),
            api_key: other.api_key.or(self.api_key),
            endpoint: other.endpoint.or(self.endpoint),
        }
    }
}

impl TryFrom<PartialSheetConfig> for SheetConfig {
    type Error = SVError;

    fn try_from(partial: PartialSheetConfig) -> Result<Self, Self::Error> {
        let spreadsheet_id = non_empty(partial.spreadsheet_id).ok_or_else(|| {
            SVError::ConfigError(
                "missing spreadsheet id (--spreadsheet-id or SHEETVIEW_SPREADSHEET_ID)".into(),
            )
        })?;
        let api_key = non_empty(partial.api_key).ok_or_else(|| {
            SVError::ConfigError("missing api key (--api-key or SHEETVIEW_API_KEY)".into())
        })?;

        let mut config = SheetConfig::new(spreadsheet_id, api_key);
        if let Some(sheet) = non_empty(partial.sheet) {
            config = config.sheet(sheet);
        }
        if let Some(endpoint) = non_empty(partial.endpoint) {
            config = config.endpoint(endpoint);
        }
        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_sheet_and_endpoint() {
        let partial = PartialSheetConfig {
            spreadsheet_id: Some("abc".into()),
            api_key: Some("key".into()),
            ..Default::default()
        };
        let config = SheetConfig::try_from(partial).unwrap();
        assert_eq!(config, SheetConfig::new("abc", "key"));
        assert_eq!(config.sheet, DEFAULT_SHEET);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn later_source_wins() {
        let file = PartialSheetConfig::parse(
            r#"{"spreadsheet_id": "from-file", "api_key": "file-key", "sheet": "Numbers"}"#,
        )
        .unwrap();
        let cli = PartialSheetConfig {
            api_key: Some("cli-key".into()),
            ..Default::default()
        };
        let config = SheetConfig::try_from(file.merge(cli)).unwrap();
        assert_eq!(config.spreadsheet_id, "from-file");
        assert_eq!(config.api_key, "cli-key");
        assert_eq!(config.sheet, "Numbers");
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let partial = PartialSheetConfig {
            spreadsheet_id: Some("abc".into()),
            api_key: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(
            SheetConfig::try_from(partial),
            Err(SVError::ConfigError(_))
        ));
    }

    #[test]
    fn unknown_file_fields_are_rejected() {
        assert!(matches!(
            PartialSheetConfig::parse(r#"{"spreadsheet": "abc"}"#),
            Err(SVError::JsonError(_))
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        assert!(matches!(
            PartialSheetConfig::load("/nonexistent/sheetview/config.json"),
            Err(SVError::FileNotFound)
        ));
    }

    #[test]
    fn setters_override_defaults() {
        let config = SheetConfig::new("abc", "key")
            .sheet("Other")
            .endpoint("http://localhost:8080");
        assert_eq!(config.sheet, "Other");
        assert_eq!(config.endpoint, "http://localhost:8080");
    }
}
