use std::sync::Arc;

use reqwest::{Client, Url};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, error, info};

use crate::config::SheetConfig;
use crate::domain::SVError;
use crate::row::{Row, rows_from_values};

/// The only error text a user ever sees from the loader.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch data from Google Sheets";

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loading,
    Ready(Arc<Vec<Row>>),
    Failed(String),
}

impl LoadState {
    /// Collapses a fetch result into the published state. The cause of a
    /// failure is logged and replaced by `FETCH_FAILED_MESSAGE`.
    pub fn settle(result: Result<Vec<Row>, SVError>) -> Self {
        match result {
            Ok(rows) => {
                info!("Loaded {} rows", rows.len());
                LoadState::Ready(Arc::new(rows))
            }
            Err(e) => {
                error!("Fetching sheet failed: {e}");
                LoadState::Failed(FETCH_FAILED_MESSAGE.to_string())
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn rows(&self) -> &[Row] {
        match self {
            LoadState::Ready(rows) => rows.as_slice(),
            _ => &[],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Failed(msg) => Some(msg.as_str()),
            _ => None,
        }
    }
}

pub fn values_url(config: &SheetConfig) -> Result<Url, SVError> {
    let mut url = Url::parse(&config.endpoint)
        .map_err(|e| SVError::ConfigError(format!("invalid endpoint {}: {e}", config.endpoint)))?;
    url.path_segments_mut()
        .map_err(|_| SVError::ConfigError(format!("invalid endpoint {}", config.endpoint)))?
        .pop_if_empty()
        .extend([config.spreadsheet_id.as_str(), "values", config.sheet.as_str()]);
    url.query_pairs_mut().append_pair("key", &config.api_key);
    Ok(url)
}

/// Extracts the `values` grid of a values API response. A response without
/// `values` is an empty sheet.
pub fn parse_values(body: &str) -> Result<Vec<Vec<String>>, SVError> {
    let Value::Object(mut object) = serde_json::from_str::<Value>(body)? else {
        return Err(SVError::MalformedResponse("expected a json object".into()));
    };
    match object.remove("values") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(lines)) => lines
            .into_iter()
            .enumerate()
            .map(|(idx, line)| match line {
                Value::Array(cells) => Ok(cells.into_iter().map(cell_to_string).collect()),
                other => Err(SVError::MalformedResponse(format!(
                    "line {idx} is not an array: {other}"
                ))),
            })
            .collect(),
        Some(other) => Err(SVError::MalformedResponse(format!(
            "values is not an array: {other}"
        ))),
    }
}

fn cell_to_string(cell: Value) -> String {
    match cell {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub async fn fetch_rows(client: &Client, config: &SheetConfig) -> Result<Vec<Row>, SVError> {
    let url = values_url(config)?;
    // The url carries the api key, keep it out of the logs.
    info!(
        spreadsheet = %config.spreadsheet_id,
        sheet = %config.sheet,
        "Fetching sheet values"
    );
    let response = client.get(url).send().await?.error_for_status()?;
    let body = response.text().await?;
    debug!("Received {} bytes", body.len());
    let values = parse_values(&body)?;
    Ok(rows_from_values(values))
}

/// Handle to the single fetch issued at startup.
pub struct Loader {
    receiver: oneshot::Receiver<LoadState>,
    settled: bool,
}

impl Loader {
    pub fn spawn(handle: &Handle, client: Client, config: SheetConfig) -> Self {
        let (sender, receiver) = oneshot::channel();
        handle.spawn(async move {
            let state = LoadState::settle(fetch_rows(&client, &config).await);
            if sender.send(state).is_err() {
                debug!("Load result dropped, nobody is listening");
            }
        });
        Loader {
            receiver,
            settled: false,
        }
    }

    /// Non-blocking. Yields the settled state exactly once.
    pub fn poll(&mut self) -> Option<LoadState> {
        if self.settled {
            return None;
        }
        match self.receiver.try_recv() {
            Ok(state) => {
                self.settled = true;
                Some(state)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => {
                error!("Fetch task ended without a result");
                self.settled = true;
                Some(LoadState::Failed(FETCH_FAILED_MESSAGE.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::{Duration, Instant};

    fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    /// Answers a single request with `status` and `body`, hands back the request line.
    fn serve_once(status: &'static str, body: &'static str) -> (u16, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&request)
                .lines()
                .next()
                .unwrap_or_default()
                .to_string()
        });
        (port, handle)
    }

    fn local_config(port: u16) -> SheetConfig {
        SheetConfig::new("abc", "secret").endpoint(format!("http://127.0.0.1:{port}/v4/spreadsheets"))
    }

    #[test]
    fn url_contains_id_sheet_and_key() {
        let config = SheetConfig::new("158k", "secret").sheet("Sheet 1");
        let url = values_url(&config).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/158k/values/Sheet%201?key=secret"
        );
    }

    #[test]
    fn url_tolerates_trailing_slash() {
        let config = SheetConfig::new("id", "k").endpoint("http://localhost/api/");
        assert_eq!(
            values_url(&config).unwrap().as_str(),
            "http://localhost/api/id/values/Sheet1?key=k"
        );
    }

    #[test]
    fn invalid_endpoint_is_a_config_error() {
        let config = SheetConfig::new("id", "k").endpoint("not a url");
        assert!(matches!(values_url(&config), Err(SVError::ConfigError(_))));
    }

    #[test]
    fn parse_values_reads_grid() {
        let body = r#"{"range": "Sheet1!A1:H2", "majorDimension": "ROWS",
            "values": [["Assigned", "MSISDN"], ["Alice", 1234, true, null]]}"#;
        let values = parse_values(body).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[1], vec!["Alice", "1234", "true", ""]);
    }

    #[test]
    fn missing_values_is_an_empty_sheet() {
        assert!(parse_values(r#"{"range": "Sheet1!A1:Z1000"}"#).unwrap().is_empty());
    }

    #[test]
    fn malformed_bodies_are_errors() {
        assert!(matches!(parse_values("<html>"), Err(SVError::JsonError(_))));
        assert!(matches!(
            parse_values("[[\"a\"]]"),
            Err(SVError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_values(r#"{"values": "nope"}"#),
            Err(SVError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_values(r#"{"values": [["a"], "b"]}"#),
            Err(SVError::MalformedResponse(_))
        ));
    }

    #[test]
    fn settle_collapses_errors_to_one_message() {
        let state = LoadState::settle(Err(SVError::MalformedResponse("boom".into())));
        assert!(!state.is_loading());
        assert_eq!(state.error(), Some(FETCH_FAILED_MESSAGE));
        assert!(state.rows().is_empty());
    }

    #[test]
    fn settle_publishes_rows() {
        let state = LoadState::settle(Ok(vec![Row::from_cells(&["Alice"])]));
        assert!(!state.is_loading());
        assert_eq!(state.error(), None);
        assert_eq!(state.rows().len(), 1);
        assert!(LoadState::Loading.is_loading());
    }

    #[tokio::test]
    async fn fetch_maps_response_rows() {
        let (port, server) = serve_once(
            "200 OK",
            r#"{"values": [["Assigned","MSISDN","Category","Status","In Process Date","Activation Date","Remove","@dropdown"],
                ["Alice","1234567890","Gold","Active","2024-01-01","2024-01-05","No","x"]]}"#,
        );
        let rows = fetch_rows(&Client::new(), &local_config(port)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category, "Gold");
        assert_eq!(rows[0].status, "Active");

        let request_line = server.join().unwrap();
        assert!(request_line.starts_with("GET /v4/spreadsheets/abc/values/Sheet1?key=secret"));
    }

    #[tokio::test]
    async fn fetch_rejects_error_status() {
        let (port, server) = serve_once("403 Forbidden", r#"{"error": {"code": 403}}"#);
        let result = fetch_rows(&Client::new(), &local_config(port)).await;
        assert!(matches!(result, Err(SVError::HttpError(_))));
        server.join().unwrap();
    }

    #[tokio::test]
    async fn fetch_reports_network_errors() {
        let result = fetch_rows(&Client::new(), &local_config(closed_port())).await;
        assert!(matches!(result, Err(SVError::HttpError(_))));
    }

    #[test]
    fn loader_settles_once_on_network_error() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut loader = Loader::spawn(
            runtime.handle(),
            Client::new(),
            local_config(closed_port()),
        );

        let started = Instant::now();
        let state = loop {
            if let Some(state) = loader.poll() {
                break state;
            }
            assert!(started.elapsed() < Duration::from_secs(10), "loader never settled");
            thread::sleep(Duration::from_millis(10));
        };

        assert!(!state.is_loading());
        assert_eq!(state.error(), Some(FETCH_FAILED_MESSAGE));
        assert!(state.rows().is_empty());
        assert_eq!(loader.poll(), None);
    }
}
