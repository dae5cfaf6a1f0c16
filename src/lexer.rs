//! Scanning of argument lists such as `a, b` or `x=1, label="a, b"`.
//!
//! Rule patterns locate the list; this module splits it while respecting double quotes.

use thiserror::Error;

/// Errors that can occur while scanning an argument list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexingError {
    /// A closing double quote was not found.
    #[error("unfinished quote")]
    UnfinishedQuote,
    /// A `key=value` item had no `=`.
    #[error("expected key=value, found `{0}`")]
    MissingEquals(String),
    /// A `key=value` item had an empty key.
    #[error("empty key in `{0}`")]
    EmptyKey(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingItem,
    ReadingQuote,
}

struct ListFSM {
    input: Vec<char>,
    pos: usize,
    sep: char,
    state: LexingState,
    buffer: String,
}

impl ListFSM {
    fn new(input: &str, sep: char) -> Self {
        ListFSM {
            input: input.chars().collect(),
            pos: 0,
            sep,
            state: LexingState::Start,
            buffer: String::new(),
        }
    }

    /// Runs the machine and returns the raw items, quotes removed and whitespace trimmed.
    /// Empty items are dropped.
    fn make_items(&mut self) -> Result<Vec<String>, LexingError> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch, &mut out),
                LexingState::ReadingItem => self.handle_item(ch, &mut out),
                LexingState::ReadingQuote => self.handle_quote(ch),
            }
        }

        if self.state == LexingState::ReadingQuote {
            return Err(LexingError::UnfinishedQuote);
        }
        self.finalize_item(&mut out);
        Ok(out)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn handle_start(&mut self, ch: char, out: &mut Vec<String>) {
        match ch {
            ' ' | '\t' => {}
            '"' => self.state = LexingState::ReadingQuote,
            c if c == self.sep => self.finalize_item(out),
            c => {
                self.buffer.push(c);
                self.state = LexingState::ReadingItem;
            }
        }
    }

    fn handle_item(&mut self, ch: char, out: &mut Vec<String>) {
        match ch {
            '"' => self.state = LexingState::ReadingQuote,
            c if c == self.sep => {
                self.finalize_item(out);
                self.state = LexingState::Start;
            }
            c => self.buffer.push(c),
        }
    }

    fn handle_quote(&mut self, ch: char) {
        match ch {
            // A quote always continues the current item; trailing text is glued on.
            '"' => self.state = LexingState::ReadingItem,
            c => self.buffer.push(c),
        }
    }

    fn finalize_item(&mut self, out: &mut Vec<String>) {
        let item = std::mem::take(&mut self.buffer);
        let item = item.trim();
        if !item.is_empty() {
            out.push(item.to_string());
        }
    }
}

/// Split `input` on `sep`, honouring double quotes.
///
/// ```text
/// a, "b, c" , ,d   ->   ["a", "b, c", "d"]
/// ```
pub fn split_list(input: &str, sep: char) -> Result<Vec<String>, LexingError> {
    ListFSM::new(input, sep).make_items()
}

/// Split a comma-separated `key=value` list. Values may be quoted.
pub fn split_pairs(input: &str) -> Result<Vec<(String, String)>, LexingError> {
    let mut pairs = Vec::new();
    for item in split_raw_items(input)? {
        let Some((key, value)) = item.split_once('=') else {
            return Err(LexingError::MissingEquals(item));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(LexingError::EmptyKey(item));
        }
        let value = unquote(value.trim());
        pairs.push((key.to_string(), value.to_string()));
    }
    Ok(pairs)
}

/// Strip one pair of surrounding double quotes, if present.
pub fn unquote(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(s)
}

/// Like [`split_list`] on commas but keeps quotes, so `split_pairs` can tell
/// a quoted `=` from a separator.
fn split_raw_items(input: &str) -> Result<Vec<String>, LexingError> {
    let mut items = Vec::new();
    let mut buffer = String::new();
    let mut quoted = false;
    for ch in input.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                buffer.push(ch);
            }
            ',' if !quoted => {
                let item = std::mem::take(&mut buffer);
                if !item.trim().is_empty() {
                    items.push(item.trim().to_string());
                }
            }
            c => buffer.push(c),
        }
    }
    if quoted {
        return Err(LexingError::UnfinishedQuote);
    }
    if !buffer.trim().is_empty() {
        items.push(buffer.trim().to_string());
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list_drops_empty_items() {
        assert_eq!(
            split_list(r#"a, "b, c" , ,d"#, ',').unwrap(),
            vec!["a", "b, c", "d"]
        );
    }

    #[test]
    fn test_split_list_unfinished_quote() {
        assert_eq!(
            split_list(r#"a, "b"#, ','),
            Err(LexingError::UnfinishedQuote)
        );
    }

    #[test]
    fn test_split_pairs_with_quoted_commas() {
        let pairs = split_pairs(r#"x=1, label="a, b=c""#).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("x".to_string(), "1".to_string()),
                ("label".to_string(), "a, b=c".to_string()),
            ]
        );
    }

    #[test]
    fn test_split_pairs_rejects_bare_item() {
        assert_eq!(
            split_pairs("x=1, y"),
            Err(LexingError::MissingEquals("y".to_string()))
        );
        assert_eq!(
            split_pairs("=1"),
            Err(LexingError::EmptyKey("=1".to_string()))
        );
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote(r#" "hi" "#), "hi");
        assert_eq!(unquote(r#""hi"#), r#""hi"#);
        assert_eq!(unquote("plain"), "plain");
    }
}
