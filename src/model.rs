use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, trace};

use crate::domain::{CMDMode, HELP_TEXT, Message, TFConfig, TFError};
use crate::engine::FilterEngine;
use crate::inputter::{InputResult, Inputter};
use crate::loader::{LoadConfig, expand_path, read_files};
use crate::table::ColumnKind;
use crate::ui::{CHROME_HEIGHT, COLUMN_WIDTH_MARGIN, INDEX_MARGIN};

#[derive(Debug, PartialEq)]
pub enum Status {
    EMPTY,
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    FILTERS,
    POPUP,
    CMDINPUT,
}

#[derive(Clone, Debug, Default)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub data: Vec<String>,
    pub highlighted: bool,
    pub sorted: Option<bool>, // Some(ascending) for the last sorted column
}

#[derive(Clone, Debug)]
pub struct FilterView {
    pub label: String,
    pub enabled: bool,
    pub selected: bool,
}

// Which part of the visible rows and columns is on screen.
#[derive(Debug, Default)]
struct Viewport {
    curser_row: usize,
    curser_column: usize,
    offset_row: usize,
    offset_column: usize,
    visible_columns: Vec<usize>, // Table column idx of columns on screen
    height: usize,
    width: usize,
}

impl Viewport {
    fn abs_row(&self) -> usize {
        self.offset_row + self.curser_row
    }

    fn reset(&mut self) {
        self.curser_row = 0;
        self.curser_column = 0;
        self.offset_row = 0;
        self.offset_column = 0;
    }
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
    pub index_width: usize,
}

impl UILayout {
    pub fn from_values(index_width: usize, ui_width: usize, ui_height: usize) -> Self {
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: ui_width.saturating_sub(index_width + INDEX_MARGIN),
            table_height: ui_height.saturating_sub(CHROME_HEIGHT),
            index_width,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct UIData {
    pub name: String,
    pub loaded: bool,
    pub table: Vec<ColumnView>,
    pub index: ColumnView,
    pub selected_row: usize,
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub filters: Vec<FilterView>,
    pub filters_focused: bool,
    pub hits: String,
    pub show_popup: bool,
    pub popup_message: String,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            loaded: false,
            table: Vec::new(),
            index: ColumnView::default(),
            selected_row: 0,
            selected_column: 0,
            abs_selected_row: 0,
            filters: Vec::new(),
            filters_focused: false,
            hits: String::new(),
            show_popup: false,
            popup_message: String::new(),
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
        }
    }
}

pub struct Model {
    config: TFConfig,
    load_config: LoadConfig,
    files: Vec<PathBuf>,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    engine: Option<FilterEngine>,
    viewport: Viewport,
    selected_filter: usize,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    status_message: String,
}

impl Model {
    pub fn init(config: &TFConfig, load_config: LoadConfig, ui_width: usize, ui_height: usize) -> Self {
        let mut model = Self {
            config: config.clone(),
            load_config,
            files: Vec::new(),
            status: Status::EMPTY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            engine: None,
            viewport: Viewport::default(),
            selected_filter: 0,
            uilayout: UILayout::from_values(0, ui_width, ui_height),
            uidata: UIData::empty(),
            clipboard: None,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            status_message: "No file loaded, press o to open one".to_string(),
        };
        model.update_table_data();
        model
    }

    /// Load `paths` as the new table. Filters on columns that still exist
    /// are kept, disabled. A failed read leaves no table loaded.
    pub fn open(&mut self, paths: Vec<PathBuf>) {
        let start_time = Instant::now();
        match read_files(&paths, &self.load_config) {
            Ok(table) => {
                let columns = table.column_names().map(String::from).collect();
                match self.engine.as_mut() {
                    Some(engine) => engine.reload(table),
                    None => self.engine = Some(FilterEngine::new(table)),
                }
                self.input.set_candidates(columns);
                self.files = paths;
                self.status = Status::READY;
                self.viewport.reset();
                self.selected_filter = 0;
                self.set_status_message(format!(
                    "Loaded data in {}ms ...",
                    start_time.elapsed().as_millis()
                ));
            }
            Err(e) => {
                error!("Loading {paths:?} failed: {e}");
                self.engine = None;
                self.files.clear();
                self.status = Status::EMPTY;
                self.modus = Modus::TABLE;
                self.set_status_message(e.to_string());
            }
        }
        self.update_table_data();
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), TFError> {
        let Some(msg) = message else {
            return Ok(());
        };
        match self.modus {
            Modus::TABLE => match msg {
                Message::Quit => self.quit(),
                Message::MoveDown => self.move_table_selection_down(1),
                Message::MoveUp => self.move_table_selection_up(1),
                Message::MoveLeft => self.move_table_selection_left(),
                Message::MoveRight => self.move_table_selection_right(),
                Message::MovePageUp => self.move_table_selection_up(self.viewport.height.max(1)),
                Message::MovePageDown => {
                    self.move_table_selection_down(self.viewport.height.max(1))
                }
                Message::MoveBeginning => self.select_row(0),
                Message::MoveEnd => self.select_row(usize::MAX),
                Message::MoveToFirstColumn => self.select_column(0),
                Message::MoveToLastColumn => self.select_column(usize::MAX),
                Message::Filter => self.enter_cmd_mode(CMDMode::Filter),
                Message::NegatedFilter => self.enter_cmd_mode(CMDMode::NegatedFilter),
                Message::FocusFilters => self.focus_filters(),
                Message::ClearFilters => self.clear_filters(),
                Message::SortAscending => self.sort_current_column(true),
                Message::SortDescending => self.sort_current_column(false),
                Message::Unsort => self.unsort(),
                Message::Reload => self.reload(),
                Message::Open => self.enter_cmd_mode(CMDMode::Open),
                Message::CopyCell => self.copy_table_cell(),
                Message::CopyRow => self.copy_table_row(),
                Message::Help => self.show_help(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::FILTERS => match msg {
                Message::Quit => self.quit(),
                Message::MoveLeft => self.select_filter(-1),
                Message::MoveRight => self.select_filter(1),
                Message::ToggleFilter | Message::Enter => self.toggle_selected_filter(),
                Message::RemoveFilter => self.remove_selected_filter(),
                Message::ClearFilters => self.clear_filters(),
                Message::FocusFilters | Message::Exit => self.exit(),
                Message::Help => self.show_help(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Exit | Message::Enter | Message::Help => self.exit(),
                _ => (),
            },
            Modus::CMDINPUT => {
                if let Message::RawKey(key) = msg {
                    self.raw_input(key)
                }
            }
        }
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn exit(&mut self) {
        match self.modus {
            Modus::TABLE | Modus::CMDINPUT => {}
            Modus::FILTERS => {
                self.previous_modus = Modus::FILTERS;
                self.modus = Modus::TABLE;
                self.update_table_data();
            }
            Modus::POPUP => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
                self.update_uidata();
            }
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.update_uidata();
    }

    fn reload(&mut self) {
        if self.files.is_empty() {
            self.set_status_message("No file to re-read");
        } else {
            self.open(self.files.clone());
        }
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if self.active_cmdinput {
            self.last_input = self.input.read(key);
            if self.last_input.finished {
                self.handle_cmd_input();
            }
            self.update_uidata();
        }
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        if mode != CMDMode::Open && self.engine.is_none() {
            self.set_status_message("No file loaded, press o to open one");
            return;
        }
        trace!("Entering command mode {mode:?} ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);

        self.active_cmdinput = true;
        self.input.clear();
        self.last_input = self.input.get();
        self.update_uidata();
    }

    fn leave_cmd_mode(&mut self) {
        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;
        self.cmd_mode = None;
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {}", self.last_input.input);
        let cmd_input = self.last_input.input.clone();
        let mode = self.cmd_mode;

        if self.last_input.canceled || cmd_input.trim().is_empty() {
            self.leave_cmd_mode();
            return;
        }

        match mode {
            Some(CMDMode::Filter) => self.submit_filter(&cmd_input, false),
            Some(CMDMode::NegatedFilter) => self.submit_filter(&cmd_input, true),
            Some(CMDMode::Open) => {
                self.leave_cmd_mode();
                let paths = cmd_input
                    .split_whitespace()
                    .map(expand_path)
                    .collect::<Vec<PathBuf>>();
                self.open(paths);
            }
            None => {
                info!("Cmd mode is none!");
                self.leave_cmd_mode();
            }
        }
    }

    // A bare column name is turned into the start of a filter on it.
    fn submit_filter(&mut self, text: &str, negated: bool) {
        let Some(engine) = self.engine.as_mut() else {
            self.leave_cmd_mode();
            return;
        };

        if !text.contains(['<', '>', ':', '=']) {
            let wanted = text.trim().to_lowercase();
            let column = engine
                .table()
                .column_names()
                .find(|c| c.to_lowercase() == wanted);
            if let Some(column) = column {
                let operator = match engine.classification().kind_of(column) {
                    Some(ColumnKind::Numeric) => ">",
                    _ => ":",
                };
                let started = format!("{column} {operator} ");
                self.input.set(&started);
                self.last_input = self.input.get();
                return;
            }
        }

        match engine.add_filter(text, negated) {
            Ok(key) => {
                let message = format!("Added \"{key}\": {}", engine.hits());
                self.leave_cmd_mode();
                self.viewport.offset_row = 0;
                self.viewport.curser_row = 0;
                self.set_status_message(message);
                self.update_table_data();
            }
            Err(e) => {
                // Keep the text so it can be corrected
                self.input.set(text);
                self.last_input = self.input.get();
                self.set_status_message(e.to_string());
            }
        }
    }

    fn focus_filters(&mut self) {
        match &self.engine {
            Some(engine) if !engine.filters().is_empty() => {
                self.previous_modus = self.modus;
                self.modus = Modus::FILTERS;
                self.selected_filter = self.selected_filter.min(engine.filters().len() - 1);
                self.update_uidata();
            }
            _ => self.set_status_message("No filter, press / to add one"),
        }
    }

    fn select_filter(&mut self, step: isize) {
        let Some(engine) = &self.engine else { return };
        let count = engine.filters().len();
        if count > 0 {
            self.selected_filter = (self.selected_filter as isize + step).rem_euclid(count as isize) as usize;
        }
        self.update_uidata();
    }

    fn selected_filter_text(&self) -> Option<String> {
        self.engine
            .as_ref()?
            .filters()
            .get_index(self.selected_filter)
            .map(|f| f.canonical_text())
    }

    fn toggle_selected_filter(&mut self) {
        let Some(text) = self.selected_filter_text() else { return };
        let Some(engine) = self.engine.as_mut() else { return };
        let message = match engine.toggle(&text) {
            Ok(enabled) => format!(
                "{} \"{text}\": {}",
                if enabled { "Enabled" } else { "Disabled" },
                engine.hits()
            ),
            Err(e) => e.to_string(),
        };
        self.set_status_message(message);
        self.update_table_data();
    }

    fn remove_selected_filter(&mut self) {
        let Some(text) = self.selected_filter_text() else { return };
        let Some(engine) = self.engine.as_mut() else { return };
        engine.remove(&text);
        let remaining = engine.filters().len();
        let message = format!("Removed \"{text}\": {}", engine.hits());
        if remaining == 0 {
            self.modus = Modus::TABLE;
        }
        self.selected_filter = self.selected_filter.min(remaining.saturating_sub(1));
        self.set_status_message(message);
        self.update_table_data();
    }

    fn clear_filters(&mut self) {
        let Some(engine) = self.engine.as_mut() else { return };
        engine.clear();
        self.modus = Modus::TABLE;
        self.selected_filter = 0;
        self.set_status_message("Removed all filters");
        self.update_table_data();
    }

    fn current_column(&self) -> Option<usize> {
        self.viewport
            .visible_columns
            .get(self.viewport.curser_column)
            .copied()
    }

    fn sort_current_column(&mut self, ascending: bool) {
        let Some(column) = self.current_column() else { return };
        let Some(engine) = self.engine.as_mut() else { return };
        if engine.sort(column, ascending) {
            let name = engine.table().column_at(column).map(|c| c.name().to_string());
            self.set_status_message(format!(
                "Sorted {} {}",
                name.unwrap_or_default(),
                if ascending { "ascending" } else { "descending" }
            ));
        }
        self.update_table_data();
    }

    fn unsort(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.unsort();
            self.set_status_message("Back to file order");
            self.update_table_data();
        }
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.uidata.status_message = self.status_message.clone();
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(self.uilayout.index_width, width, height);
        self.update_table_data();
    }

    fn calculate_column_width(max_width: usize, max_column_width: usize) -> usize {
        std::cmp::min(max_width + COLUMN_WIDTH_MARGIN, max_column_width)
    }

    fn get_visible_name(name: &str, width: usize) -> String {
        if width < 3 {
            return String::new();
        }
        if name.chars().count() > width {
            let mut reduced: String = name.chars().take(width - 3).collect();
            reduced.push_str("...");
            reduced
        } else {
            name.to_string()
        }
    }

    fn update_table_data(&mut self) {
        let Some(engine) = &self.engine else {
            self.viewport = Viewport::default();
            self.update_uidata();
            return;
        };

        let index_width = engine.table().nrows().to_string().len();
        self.uilayout = UILayout::from_values(index_width, self.uilayout.width, self.uilayout.height);

        let vp = &mut self.viewport;
        vp.width = self.uilayout.table_width;
        vp.height = self.uilayout.table_height;

        // Keep the selected row inside the visible rows and the screen
        let nrows = engine.row_count();
        let abs = vp.abs_row().min(nrows.saturating_sub(1));
        if abs < vp.offset_row {
            vp.offset_row = abs;
        } else if vp.height > 0 && abs >= vp.offset_row + vp.height {
            vp.offset_row = abs + 1 - vp.height;
        }
        vp.curser_row = abs - vp.offset_row;

        // Create a list of columns that fit in the table
        let ncols = engine.column_count();
        vp.offset_column = vp.offset_column.min(ncols.saturating_sub(1));
        vp.visible_columns.clear();
        let mut widths = Vec::new();
        let mut visible_width = 0;
        for (cidx, column) in engine.table().columns().enumerate().skip(vp.offset_column) {
            let width = Self::calculate_column_width(column.max_width(), self.config.max_column_width);
            if visible_width + width + 1 <= vp.width {
                vp.visible_columns.push(cidx);
                widths.push(width);
                visible_width += width + 1;
            } else {
                // Add the last partial visible column
                if visible_width < vp.width {
                    vp.visible_columns.push(cidx);
                    widths.push(vp.width - visible_width);
                }
                break;
            }
        }
        vp.curser_column = vp.curser_column.min(vp.visible_columns.len().saturating_sub(1));

        let rows = &engine.view_state().rows;
        let rbegin = vp.offset_row.min(rows.len());
        let rend = std::cmp::min(rbegin + vp.height, rows.len());
        let last_sort = engine.sort_keys().last();

        let mut table = Vec::with_capacity(vp.visible_columns.len());
        for (&cidx, &width) in vp.visible_columns.iter().zip(widths.iter()) {
            let Some(column) = engine.table().column_at(cidx) else {
                error!("Trying to access column with unknown idx {cidx}!");
                continue;
            };
            table.push(ColumnView {
                name: Self::get_visible_name(column.name(), width),
                width,
                data: rows[rbegin..rend]
                    .iter()
                    .map(|&id| column.display(id).to_string())
                    .collect(),
                highlighted: engine.highlights().contains(column.name()),
                sorted: last_sort
                    .filter(|k| k.column == column.name())
                    .map(|k| k.ascending),
            });
        }

        let index = ColumnView {
            name: String::new(),
            width: index_width,
            data: rows[rbegin..rend].iter().map(|id| (id + 1).to_string()).collect(),
            ..ColumnView::default()
        };

        self.uidata.table = table;
        self.uidata.index = index;
        self.update_uidata();
    }

    fn update_uidata(&mut self) {
        let uidata = &mut self.uidata;
        match &self.engine {
            Some(engine) => {
                uidata.name = engine.table().title().to_string();
                uidata.loaded = true;
                uidata.hits = engine.hits();
                uidata.filters = engine
                    .filters()
                    .iter()
                    .enumerate()
                    .map(|(idx, f)| FilterView {
                        label: f.canonical_text(),
                        enabled: f.enabled(),
                        selected: self.modus == Modus::FILTERS && idx == self.selected_filter,
                    })
                    .collect();
            }
            None => {
                uidata.name = String::new();
                uidata.loaded = false;
                uidata.table = Vec::new();
                uidata.index = ColumnView::default();
                uidata.hits = String::new();
                uidata.filters = Vec::new();
            }
        }
        uidata.selected_row = self.viewport.curser_row;
        uidata.selected_column = self.viewport.curser_column;
        uidata.abs_selected_row = self.viewport.abs_row();
        uidata.filters_focused = self.modus == Modus::FILTERS;
        uidata.show_popup = self.modus == Modus::POPUP;
        uidata.popup_message = HELP_TEXT.to_string();
        uidata.cmdinput = self.last_input.clone();
        uidata.cmd_mode = self.cmd_mode;
        uidata.active_cmdinput = self.active_cmdinput;
        uidata.status_message = self.status_message.clone();
    }

    fn select_row(&mut self, row: usize) {
        let nrows = self.engine.as_ref().map(|e| e.row_count()).unwrap_or(0);
        let row = row.min(nrows.saturating_sub(1));
        let vp = &mut self.viewport;
        if row < vp.offset_row {
            vp.offset_row = row;
        } else if vp.height > 0 && row >= vp.offset_row + vp.height {
            vp.offset_row = row + 1 - vp.height;
        }
        vp.curser_row = row - vp.offset_row;
        self.update_table_data();
    }

    fn move_table_selection_up(&mut self, size: usize) {
        self.select_row(self.viewport.abs_row().saturating_sub(size));
    }

    fn move_table_selection_down(&mut self, size: usize) {
        self.select_row(self.viewport.abs_row().saturating_add(size));
    }

    fn select_column(&mut self, column: usize) {
        let ncols = self.engine.as_ref().map(|e| e.column_count()).unwrap_or(0);
        let column = column.min(ncols.saturating_sub(1));
        let vp = &mut self.viewport;
        match vp.visible_columns.iter().position(|&c| c == column) {
            Some(pos) => vp.curser_column = pos,
            None => {
                vp.offset_column = column;
                vp.curser_column = 0;
            }
        }
        self.update_table_data();
    }

    fn move_table_selection_left(&mut self) {
        let vp = &mut self.viewport;
        if vp.curser_column > 0 {
            vp.curser_column -= 1;
        } else if vp.offset_column > 0 {
            vp.offset_column -= 1;
        }
        self.update_table_data();
    }

    fn move_table_selection_right(&mut self) {
        let ncols = self.engine.as_ref().map(|e| e.column_count()).unwrap_or(0);
        let vp = &mut self.viewport;
        if vp.offset_column + vp.curser_column + 1 < ncols {
            if vp.curser_column + 1 < vp.visible_columns.len() {
                // In the middle
                vp.curser_column += 1;
            } else {
                // At the end of the screen
                vp.offset_column += 1;
            }
            self.update_table_data();
        }
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.contains('"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_wrapping || needs_escaping {
            out = format!("\"{out}\"");
        }
        out
    }

    fn copy_to_clipboard(&mut self, content: String) {
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    error!("No clipboard available: {e:?}");
                    self.set_status_message("No clipboard available");
                    return;
                }
            }
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            match clipboard.set_text(content) {
                Ok(_) => {
                    trace!("Copied content to clipboard.");
                    self.set_status_message("Copied to clipboard");
                }
                Err(e) => trace!("Error copying to clipboard: {:?}", e),
            }
        }
    }

    fn copy_table_cell(&mut self) {
        let Some(engine) = &self.engine else { return };
        let Some(column) = self.current_column() else { return };
        if let Some(cell) = engine.cell(self.viewport.abs_row(), column) {
            trace!("Cell content: {}", cell);
            let cell = cell.to_string();
            self.copy_to_clipboard(cell);
        }
    }

    fn copy_table_row(&mut self) {
        let Some(engine) = &self.engine else { return };
        let row = self.viewport.abs_row();
        if engine.row_id(row).is_none() {
            return;
        }
        let content = (0..engine.column_count())
            .filter_map(|c| engine.cell(row, c))
            .map(Model::wrap_cell_content)
            .collect::<Vec<String>>()
            .join(",");
        self.copy_to_clipboard(content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyCode;
    use std::path::Path;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    fn loaded() -> Model {
        let mut model = Model::init(&TFConfig::default(), LoadConfig::default(), 80, 24);
        model.open(vec![fixture("languages.csv")]);
        model
    }

    fn send(model: &mut Model, message: Message) {
        model.update(Some(message)).unwrap();
    }

    fn type_line(model: &mut Model, text: &str) {
        for c in text.chars() {
            send(model, Message::RawKey(KeyCode::Char(c).into()));
        }
        send(model, Message::RawKey(KeyCode::Enter.into()));
    }

    #[test]
    fn starts_without_table() {
        let model = Model::init(&TFConfig::default(), LoadConfig::default(), 80, 24);
        assert_eq!(model.status, Status::EMPTY);
        assert!(!model.get_uidata().loaded);
    }

    #[test]
    fn filter_from_command_line() {
        let mut model = loaded();
        assert_eq!(model.get_uidata().hits, "5 rows");

        send(&mut model, Message::Filter);
        assert!(model.raw_keyevents());
        type_line(&mut model, "Col1 < 12");

        let uidata = model.get_uidata();
        assert!(!uidata.active_cmdinput);
        assert_eq!(uidata.hits, "2 / 5 rows");
        assert_eq!(uidata.index.data, ["1", "2"]);
        assert!(uidata.table[0].highlighted);
        assert!(!uidata.table[1].highlighted);
        assert_eq!(uidata.filters.len(), 1);
        assert_eq!(uidata.filters[0].label, "Col1< 12");
    }

    #[test]
    fn invalid_filter_keeps_the_line_open() {
        let mut model = loaded();
        send(&mut model, Message::Filter);
        type_line(&mut model, "Col3 < 12");

        let uidata = model.get_uidata();
        assert!(uidata.active_cmdinput);
        assert_eq!(uidata.cmdinput.input, "Col3 < 12");
        assert!(uidata.status_message.contains("Col3"));
        assert_eq!(uidata.hits, "5 rows");

        send(&mut model, Message::RawKey(KeyCode::Esc.into()));
        assert!(!model.raw_keyevents());
    }

    #[test]
    fn bare_column_name_starts_a_filter() {
        let mut model = loaded();
        send(&mut model, Message::Filter);
        type_line(&mut model, "col2");
        assert_eq!(model.get_uidata().cmdinput.input, "Col2 : ");

        type_line(&mut model, "rust");
        assert_eq!(model.get_uidata().hits, "1 / 5 rows");
    }

    #[test]
    fn negated_filter_and_filter_bar() {
        let mut model = loaded();
        send(&mut model, Message::NegatedFilter);
        type_line(&mut model, "Col2 : java*");
        assert_eq!(model.get_uidata().hits, "3 / 5 rows");
        assert_eq!(model.get_uidata().filters[0].label, "not Col2= java*");

        send(&mut model, Message::FocusFilters);
        assert!(model.get_uidata().filters_focused);
        assert!(model.get_uidata().filters[0].selected);

        send(&mut model, Message::ToggleFilter);
        assert_eq!(model.get_uidata().hits, "5 rows");
        assert!(!model.get_uidata().filters[0].enabled);

        send(&mut model, Message::RemoveFilter);
        assert!(model.get_uidata().filters.is_empty());
        assert!(!model.get_uidata().filters_focused);
    }

    #[test]
    fn sort_current_column() {
        let mut model = loaded();
        send(&mut model, Message::MoveRight);
        send(&mut model, Message::SortAscending);
        let uidata = model.get_uidata();
        assert_eq!(uidata.table[1].sorted, Some(true));
        assert_eq!(uidata.table[1].data[0], "c++");
        assert_eq!(uidata.index.data[0], "5");
    }

    #[test]
    fn failed_open_drops_the_table() {
        let mut model = loaded();
        send(&mut model, Message::Filter);
        type_line(&mut model, "Col1 < 12");

        model.open(vec![fixture("missing.csv")]);
        assert_eq!(model.status, Status::EMPTY);
        assert!(!model.get_uidata().loaded);
        assert!(model.get_uidata().filters.is_empty());
        assert!(model.get_uidata().status_message.contains("missing.csv"));
    }

    #[test]
    fn reopen_keeps_filters_disabled() {
        let mut model = loaded();
        send(&mut model, Message::Filter);
        type_line(&mut model, "Col1 < 12");
        send(&mut model, Message::Reload);

        let uidata = model.get_uidata();
        assert_eq!(uidata.hits, "5 rows");
        assert_eq!(uidata.filters.len(), 1);
        assert!(!uidata.filters[0].enabled);
    }

    #[test]
    fn movement_stays_in_bounds() {
        let mut model = loaded();
        send(&mut model, Message::MoveUp);
        send(&mut model, Message::MoveLeft);
        assert_eq!(model.get_uidata().abs_selected_row, 0);
        send(&mut model, Message::MoveEnd);
        assert_eq!(model.get_uidata().abs_selected_row, 4);
        send(&mut model, Message::MovePageDown);
        assert_eq!(model.get_uidata().abs_selected_row, 4);
        send(&mut model, Message::MoveToLastColumn);
        assert_eq!(model.get_uidata().selected_column, 1);
    }

    #[test]
    fn help_popup() {
        let mut model = loaded();
        send(&mut model, Message::Help);
        assert!(model.get_uidata().show_popup);
        send(&mut model, Message::Exit);
        assert!(!model.get_uidata().show_popup);
    }

    #[test]
    fn cell_wrapping() {
        assert_eq!(Model::wrap_cell_content("abc"), "abc");
        assert_eq!(Model::wrap_cell_content("a,b"), "\"a,b\"");
        assert_eq!(Model::wrap_cell_content("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
