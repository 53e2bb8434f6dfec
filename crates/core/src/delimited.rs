//! Delimited text tables (comma and pipe separated).
//!
//! Fields may be wrapped in double quotes; inside quotes the delimiter,
//! line breaks and doubled quotes (`""`) are literal.

use crate::{Error, Result};

/// Reading/writing options for one delimited dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiter {
    pub separator: char,
    pub quote: char,
}

impl Delimiter {
    /// Comma-separated values, used by the config feed and local tables.
    pub const COMMA: Self = Self {
        separator: ',',
        quote: '"',
    };

    /// Pipe-separated values, used by the slide feed since bullet text carries commas.
    pub const PIPE: Self = Self {
        separator: '|',
        quote: '"',
    };
}

impl Default for Delimiter {
    fn default() -> Self {
        Self::COMMA
    }
}

/// Parse delimited text into rows of cells.
///
/// Blank lines between records are skipped. A trailing newline does not
/// produce an empty final row.
pub fn parse(text: &str, dialect: Delimiter) -> Result<Vec<Vec<String>>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    // Whether the current field already consumed its opening quote.
    let mut field_quoted = false;
    // Whether the current record has any content yet.
    let mut pending = false;
    let mut line = 1usize;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == dialect.quote {
                if chars.peek() == Some(&dialect.quote) {
                    field.push(dialect.quote);
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                if c == '\n' {
                    line += 1;
                }
                field.push(c);
            }
            continue;
        }

        match c {
            c if c == dialect.quote && field.is_empty() && !field_quoted => {
                in_quotes = true;
                field_quoted = true;
                pending = true;
            }
            c if c == dialect.separator => {
                row.push(std::mem::take(&mut field));
                field_quoted = false;
                pending = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\r' | '\n' => {
                line += 1;
                if pending {
                    row.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut row));
                }
                field_quoted = false;
                pending = false;
            }
            c => {
                field.push(c);
                pending = true;
            }
        }
    }

    if in_quotes {
        return Err(Error::FeedError(format!(
            "unterminated quoted field at line {}",
            line
        )));
    }
    if pending {
        row.push(field);
        rows.push(row);
    }

    Ok(rows)
}

/// Render rows as delimited text, quoting fields only when needed.
pub fn write(rows: &[Vec<String>], dialect: Delimiter) -> String {
    let mut out = String::new();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            if idx > 0 {
                out.push(dialect.separator);
            }
            let needs_quote = cell.contains(dialect.separator)
                || cell.contains(dialect.quote)
                || cell.contains('\n')
                || cell.contains('\r')
                || cell.starts_with(' ')
                || cell.ends_with(' ');
            if needs_quote {
                out.push(dialect.quote);
                for c in cell.chars() {
                    if c == dialect.quote {
                        out.push(dialect.quote);
                    }
                    out.push(c);
                }
                out.push(dialect.quote);
            } else {
                out.push_str(cell);
            }
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_parse_simple_csv() {
        let parsed = parse("Setting,Value\nDeck Title,X\n", Delimiter::COMMA).unwrap();
        assert_eq!(parsed, rows(&[&["Setting", "Value"], &["Deck Title", "X"]]));
    }

    #[test]
    fn test_parse_quoted_fields() {
        let parsed = parse(
            "a,b\r\n\"x, y\",\"say \"\"hi\"\"\"\r\n\"multi\nline\",\r\n",
            Delimiter::COMMA,
        )
        .unwrap();
        assert_eq!(
            parsed,
            rows(&[
                &["a", "b"],
                &["x, y", "say \"hi\""],
                &["multi\nline", ""]
            ])
        );
    }

    #[test]
    fn test_parse_pipe_keeps_commas() {
        let parsed = parse(
            "order|title|bullets\n1|Intro|one, two, three\n",
            Delimiter::PIPE,
        )
        .unwrap();
        assert_eq!(parsed[1], vec!["1", "Intro", "one, two, three"]);
    }

    #[test]
    fn test_parse_skips_blank_lines_and_bom() {
        let parsed = parse("\u{feff}a,b\n\n1,2", Delimiter::COMMA).unwrap();
        assert_eq!(parsed, rows(&[&["a", "b"], &["1", "2"]]));
    }

    #[test]
    fn test_parse_unterminated_quote() {
        assert!(matches!(
            parse("a,\"b\n", Delimiter::COMMA),
            Err(Error::FeedError(_))
        ));
    }

    #[test]
    fn test_write_quotes_when_needed() {
        let text = write(
            &rows(&[&["plain", "has,comma", "has \"quote\""]]),
            Delimiter::COMMA,
        );
        assert_eq!(text, "plain,\"has,comma\",\"has \"\"quote\"\"\"\n");

        let reparsed = parse(&text, Delimiter::COMMA).unwrap();
        assert_eq!(reparsed[0][1], "has,comma");
    }
}
