use skirmish_data::{EventSink, Instruction, TraceEvent};

use super::ParseOptions;
use super::directives::{Directive, is_height_continuation, parse_directive};
use super::helpers::LineContext;

/// Walks a script line by line, tracking the two multi-line modes.
pub(super) struct Scanner<'a> {
    options: &'a ParseOptions,
    sink: &'a mut dyn EventSink,
    out: Vec<Instruction>,
    /// Rows collected since `HEIGHT_START`.
    block: Option<Vec<String>>,
    /// Text of an open `HEIGHT` directive.
    pending_height: Option<String>,
}

impl<'a> Scanner<'a> {
    pub fn new(options: &'a ParseOptions, sink: &'a mut dyn EventSink) -> Self {
        Self {
            options,
            sink,
            out: Vec::new(),
            block: None,
            pending_height: None,
        }
    }

    pub fn run(mut self, source: &str) -> Vec<Instruction> {
        for (line_no, text) in logical_lines(source) {
            self.feed(line_no, &text);
        }
        self.flush_block();
        self.flush_height();
        self.out
    }

    fn feed(&mut self, line_no: usize, text: &str) {
        let line = text.trim();
        if line.is_empty() || is_comment(line) {
            return;
        }

        if let Some(rows) = self.block.as_mut() {
            if is_block_end(line) {
                self.flush_block();
            } else {
                rows.push(line.to_string());
            }
            return;
        }

        if let Some(pending) = self.pending_height.as_mut()
            && is_height_continuation(line)
        {
            pending.push(' ');
            pending.push_str(line);
            return;
        }

        let mut ctx = LineContext {
            line: line_no,
            options: self.options,
            sink: &mut *self.sink,
        };
        match parse_directive(line, &mut ctx) {
            Ok(directive) => {
                self.flush_height();
                match directive {
                    Some(Directive::Emit(instr)) => self.out.push(instr),
                    Some(Directive::HeightOpen(text)) => self.pending_height = Some(text),
                    Some(Directive::HeightStart) => self.block = Some(Vec::new()),
                    Some(Directive::HeightEnd) => self.sink.record(TraceEvent::ParseMiss {
                        line: line_no,
                        text: line.to_string(),
                    }),
                    None => {},
                }
            },
            Err(_) => self.sink.record(TraceEvent::ParseMiss {
                line: line_no,
                text: line.to_string(),
            }),
        }
    }

    fn flush_block(&mut self) {
        if let Some(rows) = self.block.take() {
            self.out.push(Instruction::HeightRows { rows });
        }
    }

    fn flush_height(&mut self) {
        if let Some(text) = self.pending_height.take()
            && !text.trim().is_empty()
        {
            self.out.push(Instruction::HeightRaw { text });
        }
    }
}

fn is_comment(line: &str) -> bool {
    line.starts_with('#') || line.starts_with("//")
}

fn is_block_end(line: &str) -> bool {
    line.eq_ignore_ascii_case("HEIGHT_END") || line.eq_ignore_ascii_case("END_HEIGHT")
}

/// Join `\`-continued physical lines. Each logical line carries the 1-based
/// number of the physical line it started on.
fn logical_lines(source: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut joined: Option<(usize, String)> = None;
    for (idx, raw) in source.lines().enumerate() {
        let trimmed = raw.trim_end();
        let (piece, continues) = match trimmed.strip_suffix('\\') {
            Some(head) => (head, true),
            None => (trimmed, false),
        };
        let entry = joined.get_or_insert_with(|| (idx + 1, String::new()));
        if !entry.1.is_empty() {
            entry.1.push(' ');
        }
        entry.1.push_str(piece.trim());
        if !continues && let Some(done) = joined.take() {
            lines.push(done);
        }
    }
    if let Some(rest) = joined {
        lines.push(rest);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_with;
    use skirmish_data::{Cell, MemorySink};

    fn run(source: &str) -> Vec<Instruction> {
        parse_with(source, &ParseOptions::default(), &mut MemorySink::new())
    }

    #[test]
    fn continuation_joins_physical_lines() {
        let lines = logical_lines("PLACE G @ A1, \\\n  B2, \\\n C3\nRESET");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], (1, "PLACE G @ A1, B2, C3".to_string()));
        assert_eq!(lines[1].0, 4);
    }

    #[test]
    fn trailing_continuation_at_end_of_input() {
        let out = run("MOVE G-1 TO A1 \\");
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let out = run("# header\n\n   // note\nRESET\n");
        assert_eq!(out, vec![Instruction::Reset]);
    }

    #[test]
    fn height_block_collects_rows() {
        let out = run("HEIGHT_START\n1,1,1,1\n2,2,2,2\nHEIGHT_END\nRESET");
        assert_eq!(
            out,
            vec![
                Instruction::HeightRows {
                    rows: vec!["1,1,1,1".into(), "2,2,2,2".into()]
                },
                Instruction::Reset,
            ]
        );
    }

    #[test]
    fn end_height_spelling_and_unterminated_block() {
        let out = run("HEIGHT_START\n0,1\nEND_HEIGHT");
        assert_eq!(out.len(), 1);
        let out = run("HEIGHT_START\n0,1\n3,4");
        assert_eq!(
            out,
            vec![Instruction::HeightRows {
                rows: vec!["0,1".into(), "3,4".into()]
            }]
        );
    }

    #[test]
    fn height_accumulates_until_next_directive() {
        let out = run("HEIGHT A1=1 B1=2\nC1=3\nD1=4, E1=5\nPLACE G @ A1");
        assert_eq!(
            out,
            vec![
                Instruction::HeightRaw {
                    text: "A1=1 B1=2 C1=3 D1=4, E1=5".into()
                },
                Instruction::Place {
                    code: "G".into(),
                    cells: vec![Cell::new(0, 0)],
                },
            ]
        );
    }

    #[test]
    fn height_flushes_at_end_of_input() {
        let out = run("HEIGHT A1=1\nB1=2");
        assert_eq!(
            out,
            vec![Instruction::HeightRaw {
                text: "A1=1 B1=2".into()
            }]
        );
    }

    #[test]
    fn unrecognized_line_does_not_close_pending_height() {
        let mut sink = MemorySink::new();
        let out = parse_with("HEIGHT A1=1\nwobble\nB1=2", &ParseOptions::default(), &mut sink);
        assert_eq!(
            out,
            vec![Instruction::HeightRaw {
                text: "A1=1 B1=2".into()
            }]
        );
        assert_eq!(sink.misses(), vec![2]);
    }

    #[test]
    fn block_start_flushes_pending_height() {
        let out = run("HEIGHT A1=1\nHEIGHT_START\n5,5\nHEIGHT_END");
        assert_eq!(out.len(), 2);
        assert!(matches!(out[0], Instruction::HeightRaw { .. }));
        assert!(matches!(out[1], Instruction::HeightRows { .. }));
    }

    #[test]
    fn stray_height_end_is_a_miss() {
        let mut sink = MemorySink::new();
        let out = parse_with("HEIGHT_END", &ParseOptions::default(), &mut sink);
        assert!(out.is_empty());
        assert_eq!(sink.misses(), vec![1]);
    }
}
