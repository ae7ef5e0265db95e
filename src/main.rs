use std::fs::File;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, prelude::*};

mod config;
mod controller;
mod domain;
mod inputter;
mod loader;
mod model;
mod row;
mod status;
mod ui;
mod view;

use config::{PartialSheetConfig, SheetConfig};
use controller::Controller;
use domain::{SVConfig, SVError};
use loader::Loader;
use model::{Model, Status};
use ui::TableUI;

#[derive(Parser, Debug)]
#[command(name = "sv", version)]
#[command(about = "Terminal viewer for Google Sheets assignment data")]
struct Args {
    /// Id of the spreadsheet, as found in its URL.
    #[arg(long, env = "SHEETVIEW_SPREADSHEET_ID")]
    spreadsheet_id: Option<String>,

    /// Google API key with read access to the spreadsheet.
    #[arg(long, env = "SHEETVIEW_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Name of the sheet (tab) to show. Defaults to Sheet1.
    #[arg(long, env = "SHEETVIEW_SHEET")]
    sheet: Option<String>,

    /// Base URL of the values API.
    #[arg(long, env = "SHEETVIEW_ENDPOINT")]
    endpoint: Option<String>,

    /// JSON file with spreadsheet_id, sheet, api_key and endpoint.
    /// Command line and environment take precedence.
    #[arg(short, long, env = "SHEETVIEW_CONFIG")]
    config: Option<String>,

    /// Rows per page on startup.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u16).range(1..))]
    page_size: u16,

    /// Write logs to this file. Nothing is logged otherwise.
    #[arg(long, env = "SHEETVIEW_LOG")]
    log_file: Option<String>,

    /// Log filter, RUST_LOG takes precedence.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Input poll interval in milliseconds.
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,
}

impl Args {
    fn sheet_overrides(&self) -> PartialSheetConfig {
        PartialSheetConfig {
            spreadsheet_id: self.spreadsheet_id.clone(),
            sheet: self.sheet.clone(),
            api_key: self.api_key.clone(),
            endpoint: self.endpoint.clone(),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn init_tracing(log_file: Option<&str>, level: &str) -> Result<(), SVError> {
    // The terminal belongs to the UI, so logs only ever go to a file.
    let Some(path) = log_file else {
        return Ok(());
    };
    let path = shellexpand::full(path)
        .map_err(|e| SVError::ConfigError(format!("cannot expand log file path: {e}")))?;
    let file = File::create(path.as_ref())?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn resolve_config(args: &Args) -> Result<SheetConfig, SVError> {
    let file = match &args.config {
        Some(path) => PartialSheetConfig::load(path)?,
        None => PartialSheetConfig::default(),
    };
    SheetConfig::try_from(file.merge(args.sheet_overrides()))
}

fn run(args: Args) -> Result<(), SVError> {
    init_tracing(args.log_file.as_deref(), &args.log_level)?;
    let sheet_config = resolve_config(&args)?;
    let cfg = SVConfig {
        event_poll_time: args.poll_ms,
        page_size: args.page_size as usize,
    };
    info!(
        spreadsheet = %sheet_config.spreadsheet_id,
        sheet = %sheet_config.sheet,
        page_size = cfg.page_size,
        "Starting sv"
    );

    let runtime = tokio::runtime::Runtime::new()?;
    let client = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let mut loader = Loader::spawn(runtime.handle(), client, sheet_config.clone());

    let mut model = Model::init(
        &cfg,
        format!("Google Sheets Data Viewer · {}", sheet_config.sheet),
    );
    let mut ui = TableUI::new(&cfg);
    let controller = Controller::new(&cfg);

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut model, &mut ui, &controller, &mut loader);
    ratatui::restore();
    info!("Exiting sv");
    result
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    model: &mut Model,
    ui: &mut TableUI,
    controller: &Controller,
    loader: &mut Loader,
) -> Result<(), SVError> {
    while model.status != Status::QUITTING {
        if let Some(state) = loader.poll() {
            info!("Load settled with {} rows", state.rows().len());
            model.set_load_state(state);
        }

        // Render the current view
        terminal.draw(|f| ui.draw(model.get_uidata(), f))?;

        // Handle events and map to a Message
        let message = controller.handle_event(model)?;
        model.update(message)?;
    }
    Ok(())
}
