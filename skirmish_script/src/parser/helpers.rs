use pest::iterators::Pair;

use skirmish_data::{Attrs, Cell, EventSink, TraceEvent, ref_to_index};

use super::{ParseError, ParseOptions, Rule};

/// Per-line state handed to the directive builders.
pub(super) struct LineContext<'a> {
    pub line: usize,
    pub options: &'a ParseOptions,
    pub sink: &'a mut dyn EventSink,
}

impl LineContext<'_> {
    /// Decode every `list_item` under `list`, dropping (and reporting) the malformed ones.
    pub fn cells(&mut self, list: Pair<Rule>) -> Vec<Cell> {
        list.into_inner()
            .filter(|p| p.as_rule() == Rule::list_item)
            .filter_map(|item| self.cell(item.as_str()))
            .collect()
    }

    /// Decode a single reference, reporting it if malformed.
    pub fn cell(&mut self, text: &str) -> Option<Cell> {
        let cell = ref_to_index(text, self.options.row_base);
        if cell.is_none() {
            self.sink.record(TraceEvent::EntryDropped {
                line: self.line,
                entry: text.to_string(),
            });
        }
        cell
    }

    /// Parse an optional numeric attribute; a malformed value is reported and ignored.
    pub fn attr_number<T: std::str::FromStr>(&mut self, attrs: &Attrs, key: &str) -> Option<T> {
        let raw = attrs.get(key)?;
        let parsed = raw.parse().ok();
        if parsed.is_none() {
            self.sink.record(TraceEvent::EntryDropped {
                line: self.line,
                entry: format!("{key}={raw}"),
            });
        }
        parsed
    }
}

/// Strip one layer of matching single or double quotes.
pub(super) fn unquote(s: &str) -> String {
    let s = s.trim();
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return s[1..s.len() - 1].to_string();
        }
    }
    s.to_string()
}

/// Collect a `kv_list` into attributes. Keys are lowercased; later duplicates win.
pub(super) fn parse_kv_list(list: Pair<Rule>) -> Result<Attrs, ParseError> {
    let mut attrs = Attrs::new();
    for kv in list.into_inner() {
        if kv.as_rule() != Rule::kv_pair {
            continue;
        }
        let mut it = kv.into_inner();
        let key = it.next().ok_or(ParseError::Shape("expected attribute key"))?;
        let value = it.next().ok_or(ParseError::Shape("expected attribute value"))?;
        attrs.insert(key.as_str().to_lowercase(), unquote(value.as_str()));
    }
    Ok(attrs)
}

pub(super) fn parse_u32(pair: &Pair<Rule>) -> Result<u32, ParseError> {
    pair.as_str()
        .parse()
        .map_err(|_| ParseError::Number(pair.as_str().to_string()))
}

pub(super) fn parse_i32(pair: &Pair<Rule>) -> Result<i32, ParseError> {
    pair.as_str()
        .trim_start_matches('+')
        .parse()
        .map_err(|_| ParseError::Number(pair.as_str().to_string()))
}

fn parse_f64(pair: &Pair<Rule>) -> Result<f64, ParseError> {
    pair.as_str()
        .parse()
        .map_err(|_| ParseError::Number(pair.as_str().to_string()))
}

/// The single numeric operand of a `speed_opt` / `dur_opt`.
pub(super) fn option_value(opt: Pair<Rule>) -> Result<f64, ParseError> {
    let number = opt
        .into_inner()
        .find(|p| p.as_rule() == Rule::number)
        .ok_or(ParseError::Shape("option without a value"))?;
    parse_f64(&number)
}
