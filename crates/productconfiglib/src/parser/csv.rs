//! Character-level tokenizer for the CSV dump format.

use {
    crate::parser::{ConfigError, Position},
    std::mem::take,
};

/// One row of a CSV dump.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Line {
    /// The 1-based line number the row started on.
    pub line: u32,

    /// The fields of the row, with quoting removed.
    pub fields: Vec<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    /// At the start of a field: start of a line, or just after a comma.
    StartOfField,

    /// Inside an unquoted field.
    Unquoted,

    /// Inside a quoted field.
    Quoted,

    /// Saw a quote inside a quoted field: either an escape or the close.
    QuoteEnd,
}

/// Split a CSV dump into rows of fields.
///
/// Fields are separated by commas and rows by newlines (`\r\n` is accepted
/// outside quotes). A field may be quoted with `"`; an embedded `""` is a
/// literal quote, and separators and newlines inside quotes are content.
/// Blank lines produce no row. `filename` is used only for error positions.
pub fn parse(filename: &str, data: &str) -> Result<Vec<Line>, ConfigError> {
    let mut rows = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut state = State::StartOfField;
    let mut line = 1_u32;
    let mut row_line = 1_u32;
    let mut chars = data.chars().peekable();

    fn end_row(rows: &mut Vec<Line>, fields: &mut Vec<String>, field: &mut String, row_line: u32) {
        fields.push(take(field));
        rows.push(Line {
            line: row_line,
            fields: take(fields),
        });
    }

    while let Some(c) = chars.next() {
        // Fold \r\n into \n outside quoted fields.
        let c = if c == '\r' && state != State::Quoted && chars.peek() == Some(&'\n') {
            chars.next();
            '\n'
        } else {
            c
        };

        match state {
            State::StartOfField => match c {
                ',' => fields.push(String::new()),
                '"' => state = State::Quoted,
                '\n' => {
                    if !fields.is_empty() {
                        end_row(&mut rows, &mut fields, &mut field, row_line);
                    }
                    line += 1;
                    row_line = line;
                }
                _ => {
                    field.push(c);
                    state = State::Unquoted;
                }
            },

            State::Unquoted => match c {
                ',' => {
                    fields.push(take(&mut field));
                    state = State::StartOfField;
                }
                '\n' => {
                    end_row(&mut rows, &mut fields, &mut field, row_line);
                    line += 1;
                    row_line = line;
                    state = State::StartOfField;
                }
                _ => field.push(c),
            },

            State::Quoted => match c {
                '"' => state = State::QuoteEnd,
                '\n' => {
                    field.push('\n');
                    line += 1;
                }
                _ => field.push(c),
            },

            State::QuoteEnd => match c {
                '"' => {
                    field.push('"');
                    state = State::Quoted;
                }
                ',' => {
                    fields.push(take(&mut field));
                    state = State::StartOfField;
                }
                '\n' => {
                    end_row(&mut rows, &mut fields, &mut field, row_line);
                    line += 1;
                    row_line = line;
                    state = State::StartOfField;
                }
                _ => {
                    return Err(ConfigError::csv(
                        format!("unexpected character {c:?} after quoted field"),
                        Position::new(filename, Some(line)),
                    ));
                }
            },
        }
    }

    match state {
        State::Quoted => {
            return Err(ConfigError::csv(
                "end of input inside quoted field",
                Position::new(filename, Some(line)),
            ));
        }
        State::Unquoted | State::QuoteEnd => end_row(&mut rows, &mut fields, &mut field, row_line),
        State::StartOfField => {
            // A trailing comma leaves an empty final field to flush.
            if !fields.is_empty() {
                end_row(&mut rows, &mut fields, &mut field, row_line);
            }
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use {
        super::parse,
        crate::parser::ConfigErrorKind,
    };

    fn fields(data: &str) -> Vec<Vec<String>> {
        parse("test.csv", data)
            .unwrap()
            .into_iter()
            .map(|row| row.fields)
            .collect()
    }

    #[test]
    fn simple_rows() {
        assert_eq!(fields("a,b,c\nd,e\n"), vec![vec!["a", "b", "c"], vec!["d", "e"]]);
    }

    #[test]
    fn line_numbers() {
        let rows = parse("test.csv", "a,b\nc\n").unwrap();
        assert_eq!(rows[0].line, 1);
        assert_eq!(rows[1].line, 2);
    }

    #[test]
    fn quoted_separators_are_content() {
        assert_eq!(fields("a,\"b,c\nd\",e\n"), vec![vec!["a", "b,c\nd", "e"]]);
    }

    #[test]
    fn quoted_row_reports_starting_line() {
        let rows = parse("test.csv", "\"one\ntwo\"\nafter\n").unwrap();
        assert_eq!(rows[0].line, 1);
        assert_eq!(rows[1].line, 3);
    }

    #[test]
    fn escaped_quotes() {
        assert_eq!(fields("\"say \"\"hi\"\"\",x\n"), vec![vec!["say \"hi\"", "x"]]);
    }

    #[test]
    fn crlf_terminators() {
        assert_eq!(fields("a,b\r\nc,d\r\n"), vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn blank_lines_produce_no_row() {
        assert_eq!(fields("\n\na\n\n"), vec![vec!["a"]]);
    }

    #[test]
    fn empty_fields() {
        assert_eq!(fields(",\n"), vec![vec!["", ""]]);
        assert_eq!(fields("a,\n"), vec![vec!["a", ""]]);
    }

    #[test]
    fn final_row_without_newline() {
        assert_eq!(fields("a,b"), vec![vec!["a", "b"]]);
        assert_eq!(fields("\"a\""), vec![vec!["a"]]);
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        let e = parse("test.csv", "\"abc").unwrap_err();
        assert!(matches!(e.kind, ConfigErrorKind::Csv(_)));
    }

    #[test]
    fn junk_after_closing_quote_is_an_error() {
        let e = parse("test.csv", "\"a\"x,b\n").unwrap_err();
        assert!(matches!(e.kind, ConfigErrorKind::Csv(_)));
        assert_eq!(e.position.as_ref().map(ToString::to_string).as_deref(), Some("test.csv:1"));
    }
}
