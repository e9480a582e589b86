use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use tracing::trace;

/// Single line editor used for the command line.
#[derive(Default)]
pub struct Inputter {
    current_input: String,
    curser_pos: usize, // In chars, not bytes
    finished: bool,
    canceled: bool,
    candidates: Vec<String>,
    completion: Option<Completion>,
}

// Tab cycles through candidates matching the text typed before the first Tab.
struct Completion {
    prefix: String,
    next: usize,
}

#[derive(Default, Clone, Debug)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub curser_pos: usize,
}

impl Inputter {
    pub fn read(&mut self, key: event::KeyEvent) -> InputResult {
        if key.code != KeyCode::Tab {
            self.completion = None;
        }
        match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => self.enter(),
            (KeyCode::Esc, _) => self.escape(),
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Delete, _) => self.delete(),
            (KeyCode::Left, _) => self.left(),
            (KeyCode::Right, _) => self.right(),
            (KeyCode::Home, _) => self.home(),
            (KeyCode::End, _) => self.end(),
            (KeyCode::Tab, _) => self.complete(),
            (kc, km) => self.key(kc, km),
        }
    }

    /// Names offered by Tab completion.
    pub fn set_candidates(&mut self, candidates: Vec<String>) {
        self.candidates = candidates;
    }

    /// Replace the input and keep editing at its end.
    pub fn set(&mut self, s: &str) {
        self.current_input = s.to_string();
        self.curser_pos = s.chars().count();
        self.finished = false;
        self.canceled = false;
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            canceled: self.canceled,
            finished: self.finished,
            input: self.current_input.clone(),
            curser_pos: self.curser_pos,
        }
    }

    pub fn clear(&mut self) {
        self.canceled = false;
        self.finished = false;
        self.current_input.clear();
        self.curser_pos = 0;
        self.completion = None;
    }

    fn enter(&mut self) -> InputResult {
        self.finished = true;
        self.get()
    }

    fn escape(&mut self) -> InputResult {
        self.clear();
        self.canceled = true;
        self.finished = true;
        self.get()
    }

    fn backspace(&mut self) -> InputResult {
        if self.curser_pos > 0 {
            self.curser_pos -= 1;
            let idx = self.getbytepos();
            self.current_input.remove(idx);
        }
        self.get()
    }

    fn delete(&mut self) -> InputResult {
        let idx = self.getbytepos();
        if idx < self.current_input.len() {
            self.current_input.remove(idx);
        }
        self.get()
    }

    fn left(&mut self) -> InputResult {
        self.curser_pos = self.curser_pos.saturating_sub(1);
        self.get()
    }

    fn right(&mut self) -> InputResult {
        if self.curser_pos < self.current_input.chars().count() {
            self.curser_pos += 1;
        }
        self.get()
    }

    fn home(&mut self) -> InputResult {
        self.curser_pos = 0;
        self.get()
    }

    fn end(&mut self) -> InputResult {
        self.curser_pos = self.current_input.chars().count();
        self.get()
    }

    fn complete(&mut self) -> InputResult {
        // Only the column part is completed
        if self.current_input.contains(['<', '>', ':', '=']) {
            return self.get();
        }
        let completion = self.completion.get_or_insert_with(|| Completion {
            prefix: self.current_input.trim().to_lowercase(),
            next: 0,
        });
        let matches: Vec<&String> = self
            .candidates
            .iter()
            .filter(|c| c.to_lowercase().starts_with(&completion.prefix))
            .collect();
        if let Some(candidate) = matches.get(completion.next % matches.len().max(1)) {
            trace!("Completing {:?} with {candidate}", completion.prefix);
            completion.next += 1;
            let candidate = candidate.to_string();
            self.current_input = candidate;
            self.curser_pos = self.current_input.chars().count();
        }
        self.get()
    }

    fn key(&mut self, code: KeyCode, modifier: KeyModifiers) -> InputResult {
        if modifier.contains(KeyModifiers::CONTROL) {
            return self.get();
        }
        if let Some(chr) = code.as_char() {
            self.current_input.insert(self.getbytepos(), chr);
            self.curser_pos += 1;
        }
        self.get()
    }

    fn getbytepos(&self) -> usize {
        self.current_input
            .char_indices()
            .nth(self.curser_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn type_text(input: &mut Inputter, text: &str) {
        for c in text.chars() {
            input.read(KeyEvent::from(KeyCode::Char(c)));
        }
    }

    #[test]
    fn edits_at_the_curser() {
        let mut input = Inputter::default();
        type_text(&mut input, "Colé < 2");
        input.read(KeyCode::Left.into());
        input.read(KeyCode::Backspace.into());
        type_text(&mut input, "1");
        let result = input.read(KeyCode::Enter.into());
        assert_eq!(result.input, "Colé <12");
        assert!(result.finished);
        assert!(!result.canceled);
    }

    #[test]
    fn escape_cancels() {
        let mut input = Inputter::default();
        type_text(&mut input, "abc");
        let result = input.read(KeyCode::Esc.into());
        assert!(result.canceled && result.finished);
        assert!(result.input.is_empty());
    }

    #[test]
    fn tab_cycles_matching_columns() {
        let mut input = Inputter::default();
        input.set_candidates(vec!["Price".into(), "Name".into(), "price_eur".into()]);
        type_text(&mut input, "pr");
        assert_eq!(input.read(KeyCode::Tab.into()).input, "Price");
        assert_eq!(input.read(KeyCode::Tab.into()).input, "price_eur");
        assert_eq!(input.read(KeyCode::Tab.into()).input, "Price");

        type_text(&mut input, " > 1");
        assert_eq!(input.read(KeyCode::Tab.into()).input, "Price > 1");
    }

    #[test]
    fn tab_without_match_keeps_input() {
        let mut input = Inputter::default();
        input.set_candidates(vec!["Name".into()]);
        type_text(&mut input, "zz");
        assert_eq!(input.read(KeyCode::Tab.into()).input, "zz");
    }
}
