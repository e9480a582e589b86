use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Position, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, Wrap},
};

use crate::model::{Model, UIData};

pub const FILTERBAR_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const STATUSLINE_HEIGHT: usize = 1;
pub const CMDLINE_HEIGH: usize = 1;
/// Rows of the screen not available for table rows.
pub const CHROME_HEIGHT: usize =
    FILTERBAR_HEIGHT + TABLE_HEADER_HEIGHT + STATUSLINE_HEIGHT + CMDLINE_HEIGH;
pub const COLUMN_WIDTH_MARGIN: usize = 1;
pub const INDEX_MARGIN: usize = 1;

const HIGHLIGHT_COLOR: Color = Color::Yellow;
const ENABLED_COLOR: Color = Color::Green;
const DISABLED_COLOR: Color = Color::DarkGray;
const SELECTED_ROW_COLOR: Color = Color::DarkGray;

#[derive(Debug, Default)]
pub struct TableUI {}

impl TableUI {
    pub fn new() -> Self {
        Self {}
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [filter_area, table_area, status_area, cmd_area] = Layout::vertical([
            Constraint::Length(FILTERBAR_HEIGHT as u16),
            Constraint::Min(0),
            Constraint::Length(STATUSLINE_HEIGHT as u16),
            Constraint::Length(CMDLINE_HEIGH as u16),
        ])
        .areas(frame.area());

        frame.render_widget(Paragraph::new(filter_bar(uidata)), filter_area);
        if uidata.loaded {
            frame.render_widget(table(uidata), table_area);
        } else {
            frame.render_widget(empty_table(), table_area);
        }
        frame.render_widget(Paragraph::new(status_line(uidata)).reversed(), status_area);
        self.draw_cmdline(uidata, frame, cmd_area);

        if uidata.show_popup {
            self.draw_popup(&uidata.popup_message, frame);
        }
    }

    fn draw_cmdline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        match uidata.cmd_mode {
            Some(mode) if uidata.active_cmdinput => {
                let prompt = mode.prompt();
                let line = Line::from(vec![
                    Span::styled(prompt, Style::new().bold()),
                    Span::raw(uidata.cmdinput.input.as_str()),
                ]);
                frame.render_widget(Paragraph::new(line), area);
                let x = area.x + (prompt.chars().count() + uidata.cmdinput.curser_pos) as u16;
                frame.set_cursor_position(Position::new(x.min(area.right().saturating_sub(1)), area.y));
            }
            _ => {
                let hint = " ? help  / filter  ! not  Tab filters  s/S sort  o open  q quit";
                frame.render_widget(Paragraph::new(hint).fg(DISABLED_COLOR), area);
            }
        }
    }

    fn draw_popup(&self, message: &str, frame: &mut Frame) {
        let height = message.lines().count() + 2;
        let width = message.lines().map(|l| l.chars().count()).max().unwrap_or(0) + 4;
        let area = popup_area(frame.area(), width as u16, height as u16);
        let popup = Paragraph::new(Text::from(message))
            .wrap(Wrap { trim: false })
            .block(Block::bordered().title(Line::from(" Help ").centered()));
        frame.render_widget(Clear, area);
        frame.render_widget(popup, area);
    }
}

fn filter_bar(uidata: &UIData) -> Line<'_> {
    let mut spans = vec![Span::styled(" Filters ", Style::new().bold())];
    if uidata.filters.is_empty() {
        spans.push(Span::styled("none, press / to add one", Style::new().fg(DISABLED_COLOR)));
    }
    for filter in &uidata.filters {
        let (marker, color) = if filter.enabled {
            ("●", ENABLED_COLOR)
        } else {
            ("○", DISABLED_COLOR)
        };
        let mut style = Style::new().fg(color);
        if filter.selected {
            style = style.reversed();
        }
        spans.push(Span::styled(format!(" {marker} {} ", filter.label), style));
    }
    if uidata.filters_focused {
        spans.push(Span::styled(
            "  Space toggle, d remove, Esc back",
            Style::new().fg(DISABLED_COLOR),
        ));
    }
    Line::from(spans)
}

fn table(uidata: &UIData) -> Table<'_> {
    let mut widths = vec![Constraint::Length(uidata.index.width as u16)];
    widths.extend(uidata.table.iter().map(|c| Constraint::Length(c.width as u16)));

    let mut header = vec![Cell::from("")];
    header.extend(uidata.table.iter().map(|column| {
        let name = match column.sorted {
            Some(true) => format!("{}↑", column.name),
            Some(false) => format!("{}↓", column.name),
            None => column.name.clone(),
        };
        let style = if column.highlighted {
            Style::new().bold().fg(HIGHLIGHT_COLOR)
        } else {
            Style::new().bold()
        };
        Cell::from(name).style(style)
    }));

    let rows = uidata.index.data.iter().enumerate().map(|(ridx, id)| {
        let mut cells = vec![Cell::from(id.as_str()).style(Style::new().fg(DISABLED_COLOR))];
        for (cidx, column) in uidata.table.iter().enumerate() {
            let value = column.data.get(ridx).map(String::as_str).unwrap_or("");
            let mut style = Style::new();
            if column.highlighted {
                style = style.fg(HIGHLIGHT_COLOR);
            }
            if ridx == uidata.selected_row && cidx == uidata.selected_column {
                style = style.reversed();
            }
            cells.push(Cell::from(value).style(style));
        }
        let row = Row::new(cells);
        if ridx == uidata.selected_row {
            row.style(Style::new().bg(SELECTED_ROW_COLOR))
        } else {
            row
        }
    });

    Table::new(rows, widths)
        .column_spacing(1)
        .header(Row::new(header).underlined())
}

fn empty_table() -> Paragraph<'static> {
    Paragraph::new(Text::from(vec![
        Line::from(""),
        Line::from("No file loaded".bold()),
        Line::from("Press o to open a file or ? for help"),
    ]))
    .centered()
}

fn status_line(uidata: &UIData) -> Line<'_> {
    let mut spans = Vec::new();
    if uidata.loaded {
        spans.push(Span::styled(format!(" {} ", uidata.hits), Style::new().bold()));
        if !uidata.index.data.is_empty() {
            spans.push(Span::raw(format!("| row {} ", uidata.abs_selected_row + 1)));
        }
        spans.push(Span::raw(format!("| {} ", uidata.name)));
    }
    if !uidata.status_message.is_empty() {
        spans.push(Span::raw(format!("| {}", uidata.status_message)));
    }
    Line::from(spans)
}

fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let [area] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(area);
    area
}
