/*!
Parsing path templates like `logs/{date: yyyy-MM-dd}_{count}.log` into [`PathSegment`]s.
*/

use crate::{date::DatePattern, diagnostics::Diagnostics, error::Error, path::PathSegment};

/**
The date pattern used by `{date}` without an argument.
*/
pub const DEFAULT_DATE_PATTERN: &str = "yyyy-MM-dd_HH-mm-ss";

/**
Parse a path template.

Placeholders are written as `{name}` or `{name: argument}`. Text inside single quotes is copied literally, and `''` produces a single quote. Unknown placeholders and invalid date patterns are reported to `diagnostics` and produce the literal text `undefined`. Unbalanced braces or quotes are an error.
*/
pub fn parse(template: &str, diagnostics: impl Diagnostics) -> Result<Vec<PathSegment>, Error> {
    let mut segments = Vec::new();
    let mut literal = String::new();

    let mut chars = template.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\'' => {
                if let Some((_, '\'')) = chars.peek() {
                    chars.next();
                    literal.push('\'');
                    continue;
                }

                let mut terminated = false;

                while let Some((_, c)) = chars.next() {
                    if c != '\'' {
                        literal.push(c);
                    } else if let Some((_, '\'')) = chars.peek() {
                        chars.next();
                        literal.push('\'');
                    } else {
                        terminated = true;
                        break;
                    }
                }

                if !terminated {
                    return Err(Error::config(format!(
                        "the path template {template:?} has an unterminated quote"
                    )));
                }
            }
            '{' => {
                let start = i + 1;
                let end = loop {
                    match chars.next() {
                        Some((end, '}')) => break end,
                        Some((_, '{')) | None => {
                            return Err(Error::config(format!(
                                "the path template {template:?} has unbalanced braces"
                            )))
                        }
                        Some(_) => (),
                    }
                };

                if !literal.is_empty() {
                    segments.push(PathSegment::Static(std::mem::take(&mut literal)));
                }

                segments.push(placeholder(&template[start..end], &diagnostics));
            }
            '}' => {
                return Err(Error::config(format!(
                    "the path template {template:?} has unbalanced braces"
                )))
            }
            c => literal.push(c),
        }
    }

    if !literal.is_empty() {
        segments.push(PathSegment::Static(literal));
    }

    Ok(segments)
}

fn placeholder(placeholder: &str, diagnostics: impl Diagnostics) -> PathSegment {
    let (name, argument) = match placeholder.split_once(':') {
        Some((name, argument)) => (name.trim(), Some(argument.trim())),
        None => (placeholder.trim(), None),
    };

    match name {
        "date" => {
            let pattern = argument.unwrap_or(DEFAULT_DATE_PATTERN);

            match DatePattern::new(pattern) {
                Ok(pattern) => {
                    if pattern.contains_separator() {
                        diagnostics.warn(format_args!(
                            "the date pattern {:?} contains a file separator, so files will be written to nested directories",
                            pattern.pattern()
                        ));
                    }

                    PathSegment::DateTime(pattern)
                }
                Err(err) => {
                    diagnostics.error(format_args!("{err}"));
                    undefined()
                }
            }
        }
        "count" | "pid" => {
            if let Some(argument) = argument {
                diagnostics.warn(format_args!(
                    "the {{{name}}} placeholder does not accept an argument; ignoring {argument:?}"
                ));
            }

            if name == "count" {
                PathSegment::Count
            } else {
                PathSegment::ProcessId
            }
        }
        _ => {
            diagnostics.error(format_args!("unknown placeholder {{{name}}} in path template"));
            undefined()
        }
    }
}

fn undefined() -> PathSegment {
    PathSegment::Static("undefined".into())
}
