use std::time::Instant;

use ratatui::crossterm::event::KeyEvent;
use tracing::{info, trace};

use crate::domain::{HELP_TEXT, Message, SVConfig, SVError};
use crate::inputter::{InputResult, Inputter};
use crate::loader::LoadState;
use crate::row::Row;
use crate::view::{PageSize, TableView};

#[derive(Debug, PartialEq)]
pub enum Status {
    LOADING,
    READY,
    FAILED,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
    CMDINPUT,
}

/// Snapshot of everything the UI renders. Rebuilt after every update.
pub struct UIData {
    pub name: String,
    pub loading: bool,
    pub error: Option<String>,
    pub rows: Vec<Row>,
    pub selected_row: usize,
    pub summary: String,
    pub search: String,
    pub category: String,
    pub page_size: String,
    pub page: usize,
    pub pages: usize,
    pub can_previous: bool,
    pub can_next: bool,
    pub show_popup: bool,
    pub popup_message: String,
    pub cmdinput: InputResult,
    pub active_cmdinput: bool,
    pub status_message: String,
    pub last_status_message_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            loading: true,
            error: None,
            rows: Vec::new(),
            selected_row: 0,
            summary: String::new(),
            search: String::new(),
            category: String::new(),
            page_size: String::new(),
            page: 0,
            pages: 0,
            can_previous: false,
            can_next: false,
            show_popup: false,
            popup_message: String::new(),
            cmdinput: InputResult::default(),
            active_cmdinput: false,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        }
    }
}

pub struct Model {
    name: String,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    load_state: LoadState,
    table: TableView,
    uidata: UIData,
    input: Inputter,
    last_input: InputResult,
    search_before_input: String,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(config: &SVConfig, name: impl Into<String>) -> Self {
        let mut model = Self {
            name: name.into(),
            status: Status::LOADING,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            load_state: LoadState::Loading,
            table: TableView::new(Default::default(), PageSize::Fixed(config.page_size)),
            uidata: UIData::empty(),
            input: Inputter::default(),
            last_input: InputResult::default(),
            search_before_input: String::new(),
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        };
        model.set_status_message("Loading ...");
        model.update_uidata();
        model
    }

    /// Publishes the settled fetch result to the view.
    pub fn set_load_state(&mut self, state: LoadState) {
        match &state {
            LoadState::Loading => self.status = Status::LOADING,
            LoadState::Ready(rows) => {
                self.table.replace_data(rows.clone());
                self.status = Status::READY;
                self.set_status_message(format!("Loaded {} rows", rows.len()));
            }
            LoadState::Failed(msg) => {
                self.status = Status::FAILED;
                self.set_status_message(msg.clone());
            }
        }
        self.load_state = state;
        self.update_uidata();
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CMDINPUT
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), SVError> {
        let Some(msg) = message else {
            return Ok(());
        };
        trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
        match self.modus {
            Modus::TABLE => match msg {
                Message::Quit => self.quit(),
                Message::MoveUp => self.table.move_curser(-1),
                Message::MoveDown => self.table.move_curser(1),
                Message::NextPage => {
                    if !self.table.next_page() {
                        self.set_status_message("Already on the last page");
                    }
                }
                Message::PreviousPage => {
                    if !self.table.previous_page() {
                        self.set_status_message("Already on the first page");
                    }
                }
                Message::FirstPage => self.table.first_page(),
                Message::LastPage => self.table.last_page_jump(),
                Message::NextCategory => self.table.cycle_category(1),
                Message::PreviousCategory => self.table.cycle_category(-1),
                Message::NextPageSize => self.table.cycle_page_size(1),
                Message::PreviousPageSize => self.table.cycle_page_size(-1),
                Message::Search => self.enter_cmd_mode(),
                Message::Help => self.show_help(),
                Message::Exit => self.exit(),
                Message::RawKey(_) => (),
            },
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Exit | Message::Help => self.exit(),
                _ => (),
            },
            Modus::CMDINPUT => {
                if let Message::RawKey(key) = msg {
                    self.raw_input(key)
                }
            }
        }
        self.update_uidata();
        Ok(())
    }

    fn exit(&mut self) {
        match self.modus {
            Modus::TABLE => {
                if !self.table.search().is_empty() {
                    self.table.set_search("");
                    self.set_status_message("Search cleared");
                }
            }
            Modus::POPUP => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
            }
            Modus::CMDINPUT => {}
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
    }

    fn enter_cmd_mode(&mut self) {
        trace!("Entering search input ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.search_before_input = self.table.search().to_string();
        self.input.clear();
        self.input.set(&self.search_before_input);
        self.last_input = self.input.get();
    }

    // Every keystroke refilters, Esc restores what was there before.
    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.canceled {
            let previous = self.search_before_input.clone();
            self.table.set_search(&previous);
        } else if self.last_input.input != self.table.search() {
            let input = self.last_input.input.clone();
            self.table.set_search(&input);
        }

        if self.last_input.finished {
            self.modus = self.previous_modus;
            self.previous_modus = Modus::CMDINPUT;
            info!(
                "Search {:?} matched {} rows",
                self.table.search(),
                self.table.filtered_len()
            );
            self.set_status_message(format!(
                "{} of {} rows match",
                self.table.filtered_len(),
                self.table.total_len()
            ));
        }
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    fn update_uidata(&mut self) {
        let table = &self.table;
        self.uidata = UIData {
            name: self.name.clone(),
            loading: self.load_state.is_loading(),
            error: self.load_state.error().map(str::to_string),
            rows: table.page_rows().into_iter().cloned().collect(),
            selected_row: table.curser_row(),
            summary: table.summary(),
            search: table.search().to_string(),
            category: table.category().to_string(),
            page_size: table.page_size().to_string(),
            page: table.page(),
            pages: table.page_count(),
            can_previous: table.can_previous_page(),
            can_next: table.can_next_page(),
            show_popup: self.modus == Modus::POPUP,
            popup_message: HELP_TEXT.to_string(),
            cmdinput: self.last_input.clone(),
            active_cmdinput: self.modus == Modus::CMDINPUT,
            status_message: self.status_message.clone(),
            last_status_message_update: self.last_status_message_update,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::FETCH_FAILED_MESSAGE;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};
    use std::sync::Arc;

    fn rows(n: usize) -> Arc<Vec<Row>> {
        Arc::new(
            (0..n)
                .map(|i| {
                    Row::from_cells(&[
                        format!("User{i}"),
                        format!("{i:010}"),
                        if i % 2 == 0 { "Gold" } else { "Silver" }.to_string(),
                        "Active".to_string(),
                    ])
                })
                .collect(),
        )
    }

    fn ready_model(n: usize) -> Model {
        let mut model = Model::init(&SVConfig::default(), "Sheet1");
        model.set_load_state(LoadState::Ready(rows(n)));
        model
    }

    fn key(model: &mut Model, code: KeyCode) {
        let event = KeyEvent::new(code, KeyModifiers::NONE);
        model.update(Some(Message::RawKey(event))).unwrap();
    }

    #[test]
    fn starts_loading() {
        let model = Model::init(&SVConfig::default(), "Sheet1");
        assert_eq!(model.status, Status::LOADING);
        assert!(model.get_uidata().loading);
        assert!(model.get_uidata().rows.is_empty());
    }

    #[test]
    fn failed_load_shows_error_without_data() {
        let mut model = Model::init(&SVConfig::default(), "Sheet1");
        model.set_load_state(LoadState::Failed(FETCH_FAILED_MESSAGE.to_string()));
        let ui = model.get_uidata();
        assert_eq!(model.status, Status::FAILED);
        assert!(!ui.loading);
        assert_eq!(ui.error.as_deref(), Some(FETCH_FAILED_MESSAGE));
        assert!(ui.rows.is_empty());
        assert!(model.load_state.rows().is_empty());
    }

    #[test]
    fn paging_through_loaded_rows() {
        let mut model = ready_model(23);
        assert_eq!(model.get_uidata().pages, 3);
        model.update(Some(Message::NextPage)).unwrap();
        model.update(Some(Message::NextPage)).unwrap();
        model.update(Some(Message::NextPage)).unwrap();
        let ui = model.get_uidata();
        assert_eq!(ui.page, 2);
        assert_eq!(ui.rows.len(), 3);
        assert_eq!(ui.summary, "Showing 21 to 23 of 23 entries");
        assert!(!ui.can_next);
        assert_eq!(ui.status_message, "Already on the last page");
    }

    #[test]
    fn live_search_and_cancel() {
        let mut model = ready_model(23);
        model.update(Some(Message::Search)).unwrap();
        assert!(model.raw_keyevents());
        key(&mut model, KeyCode::Char('u'));
        key(&mut model, KeyCode::Char('s'));
        key(&mut model, KeyCode::Char('e'));
        key(&mut model, KeyCode::Char('r'));
        key(&mut model, KeyCode::Char('2'));
        assert_eq!(model.get_uidata().summary, "Showing 1 to 4 of 4 entries");

        key(&mut model, KeyCode::Esc);
        assert!(!model.raw_keyevents());
        assert_eq!(model.get_uidata().search, "");
        assert_eq!(model.get_uidata().summary, "Showing 1 to 10 of 23 entries");
    }

    #[test]
    fn accepted_search_is_cleared_with_escape() {
        let mut model = ready_model(23);
        model.update(Some(Message::Search)).unwrap();
        key(&mut model, KeyCode::Char('7'));
        key(&mut model, KeyCode::Enter);
        assert_eq!(model.get_uidata().search, "7");
        assert!(!model.get_uidata().active_cmdinput);

        model.update(Some(Message::Exit)).unwrap();
        assert_eq!(model.get_uidata().search, "");
    }

    #[test]
    fn category_and_page_size_selectors() {
        let mut model = ready_model(23);
        model.update(Some(Message::LastPage)).unwrap();
        model.update(Some(Message::NextCategory)).unwrap();
        let ui = model.get_uidata();
        assert_eq!(ui.category, "Gold");
        assert_eq!(ui.page, 0);
        assert_eq!(ui.summary, "Showing 1 to 10 of 12 entries");

        model.update(Some(Message::PreviousPageSize)).unwrap();
        let ui = model.get_uidata();
        assert_eq!(ui.page_size, "All");
        assert_eq!(ui.pages, 1);
        assert_eq!(ui.rows.len(), 12);
    }

    #[test]
    fn help_popup_opens_and_closes() {
        let mut model = ready_model(3);
        model.update(Some(Message::Help)).unwrap();
        assert!(model.get_uidata().show_popup);
        model.update(Some(Message::NextPage)).unwrap();
        assert!(model.get_uidata().show_popup);
        model.update(Some(Message::Exit)).unwrap();
        assert!(!model.get_uidata().show_popup);
    }

    #[test]
    fn quit() {
        let mut model = ready_model(1);
        model.update(Some(Message::Quit)).unwrap();
        assert_eq!(model.status, Status::QUITTING);
    }
}
