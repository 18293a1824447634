//! Source normalization applied before the model grammar runs.
//!
//! - backslash-newline pairs are spliced (line continuation)
//! - `#` starts a comment that runs to end of line, unless it is inside a
//!   quoted string
//! - leading and trailing whitespace is trimmed
//! - the result ends with exactly one newline

pub fn preprocess(text: &str) -> String {
    let spliced = text.replace("\\\r\n", "").replace("\\\n", "");
    let stripped: Vec<&str> = spliced.lines().map(strip_comment).collect();
    let joined = stripped.join("\n");
    let mut out = joined.trim().to_owned();
    out.push('\n');
    out
}

fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '#' => return &line[..i],
                '\'' | '"' => quote = Some(c),
                _ => {}
            },
        }
    }
    line
}
