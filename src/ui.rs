use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row as TableRow, Table, TableState},
};

use crate::domain::SVConfig;
use crate::model::UIData;
use crate::row::{COLUMNS, STATUS_COLUMN};
use crate::status::{StatusClass, classify};

pub const TABLE_HEADER_HEIGHT: u16 = 1;
pub const CMDLINE_HEIGH: u16 = 1;
pub const CONTROLS_HEIGHT: u16 = 1;
pub const COLUMN_SPACING: u16 = 1;
const STATUS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);
const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

pub struct TableUI {
    event_poll_time: u64,
    frame_count: usize,
}

impl TableUI {
    pub fn new(config: &SVConfig) -> Self {
        Self {
            event_poll_time: config.event_poll_time,
            frame_count: 0,
        }
    }

    pub fn draw(&mut self, uidata: &UIData, frame: &mut Frame) {
        self.frame_count = self.frame_count.wrapping_add(1);

        let title = Line::from(Span::from(format!(" {} ", uidata.name)).bold());
        let instructions = Line::from(vec![
            " Search ".into(),
            "</>".blue().bold(),
            " Category ".into(),
            "<c>".blue().bold(),
            " Page size ".into(),
            "<p>".blue().bold(),
            " Help ".into(),
            "<?>".blue().bold(),
            " Quit ".into(),
            "<q> ".blue().bold(),
        ]);
        let block = Block::bordered()
            .title(title.centered())
            .title_bottom(instructions.centered())
            .border_set(border::THICK);
        let inner = block.inner(frame.area());
        frame.render_widget(block, frame.area());

        let [controls, table, pager, cmdline] = Layout::vertical([
            Constraint::Length(CONTROLS_HEIGHT),
            Constraint::Min(TABLE_HEADER_HEIGHT),
            Constraint::Length(CONTROLS_HEIGHT),
            Constraint::Length(CMDLINE_HEIGH),
        ])
        .areas(inner);

        if uidata.loading {
            self.render_loading(frame, table);
        } else if let Some(error) = &uidata.error {
            render_centered(frame, table, Line::from(error.as_str().red().bold()));
        } else {
            render_controls(uidata, frame, controls);
            render_table(uidata, frame, table);
            render_pager(uidata, frame, pager);
        }
        render_cmdline(uidata, frame, cmdline);

        if uidata.show_popup {
            render_popup(&uidata.popup_message, frame);
        }
    }

    fn render_loading(&self, frame: &mut Frame, area: Rect) {
        // Four spinner steps per second, independent of the poll interval
        let elapsed_ms = self.frame_count as u64 * self.event_poll_time;
        let step = (elapsed_ms / 250) as usize % SPINNER.len();
        render_centered(
            frame,
            area,
            Line::from(Span::from(format!("{} Loading data ...", SPINNER[step])).magenta()),
        );
    }
}

pub fn status_style(status: &str) -> Style {
    match classify(status) {
        StatusClass::Active => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        StatusClass::Pending => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        StatusClass::Inactive => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        StatusClass::Neutral => Style::default(),
    }
}

fn render_centered(frame: &mut Frame, area: Rect, line: Line) {
    let [middle] = Layout::vertical([Constraint::Length(1)])
        .flex(Flex::Center)
        .areas(area);
    frame.render_widget(Paragraph::new(line).centered(), middle);
}

fn render_controls(uidata: &UIData, frame: &mut Frame, area: Rect) {
    let search = if uidata.search.is_empty() {
        "Search all columns...".dark_gray()
    } else {
        uidata.search.as_str().yellow()
    };
    let line = Line::from(vec![
        " Search: ".into(),
        search,
        "   Category: ".into(),
        uidata.category.as_str().cyan().bold(),
        "   Show ".into(),
        uidata.page_size.as_str().cyan().bold(),
        " entries".into(),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_table(uidata: &UIData, frame: &mut Frame, area: Rect) {
    let header = TableRow::new(COLUMNS.iter().map(|c| Cell::from(c.to_uppercase())))
        .style(Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED))
        .height(TABLE_HEADER_HEIGHT);

    let rows = uidata.rows.iter().map(|row| {
        TableRow::new(row.fields().into_iter().enumerate().map(|(idx, value)| {
            let cell = Cell::from(value.to_string());
            if idx == STATUS_COLUMN {
                cell.style(status_style(value))
            } else {
                cell
            }
        }))
    });

    let widths: Vec<Constraint> = COLUMNS
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let longest = uidata
                .rows
                .iter()
                .filter_map(|r| r.get(idx))
                .map(|v| v.chars().count())
                .max()
                .unwrap_or(0);
            Constraint::Length(std::cmp::max(longest, name.len()) as u16)
        })
        .collect();

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(COLUMN_SPACING)
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = TableState::default();
    if !uidata.rows.is_empty() {
        state.select(Some(uidata.selected_row));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_pager(uidata: &UIData, frame: &mut Frame, area: Rect) {
    let button = |label: &'static str, enabled: bool| -> Span<'static> {
        if enabled {
            label.white().bold()
        } else {
            label.dark_gray()
        }
    };
    let [summary, buttons] =
        Layout::horizontal([Constraint::Fill(1), Constraint::Length(36)]).areas(area);

    frame.render_widget(Paragraph::new(format!(" {}", uidata.summary)), summary);
    let page = format!(" {}/{} ", uidata.page + 1, uidata.pages.max(1));
    let line = Line::from(vec![
        button("◀ Previous", uidata.can_previous),
        page.into(),
        button("Next ▶", uidata.can_next),
    ]);
    frame.render_widget(Paragraph::new(line).right_aligned(), buttons);
}

fn render_cmdline(uidata: &UIData, frame: &mut Frame, area: Rect) {
    if uidata.active_cmdinput {
        let prompt = "/";
        frame.render_widget(
            Paragraph::new(format!("{prompt}{}", uidata.cmdinput.input)),
            area,
        );
        // Curser is counted in chars; good enough for the single width input we expect
        let x = area.x + (prompt.len() + uidata.cmdinput.curser_pos) as u16;
        frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
    } else if uidata.last_status_message_update.elapsed() < STATUS_MESSAGE_TIMEOUT {
        frame.render_widget(
            Paragraph::new(uidata.status_message.as_str().italic()),
            area,
        );
    }
}

fn render_popup(message: &str, frame: &mut Frame) {
    let height = message.lines().count() as u16 + 2;
    let width = message.lines().map(|l| l.chars().count()).max().unwrap_or(0) as u16 + 4;
    let [area] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(frame.area());
    let [area] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(area);

    let block = Block::bordered().title(" Help ").border_set(border::ROUNDED);
    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(message).block(block), area);
}
