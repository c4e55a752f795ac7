//! Splits one script line into argv-style tokens.

/// Splits `line` on whitespace, keeping single- or double-quoted runs as
/// part of one token with the quote characters stripped.
///
/// Only quotes are special: `#` and `\` are ordinary characters, so names
/// like `#backup` and Windows paths reach the command untouched. Never
/// fails: an unterminated quote runs to the end of the line. Arity is the
/// caller's concern.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = vec![];
    let mut current: Option<String> = None;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.get_or_insert_with(String::new).push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                // `""` still yields an (empty) token
                let _ = current.get_or_insert_with(String::new);
            }
            None if c.is_whitespace() => {
                if let Some(token) = current.take() {
                    tokens.push(token);
                }
            }
            None => current.get_or_insert_with(String::new).push(c),
        }
    }

    tokens.extend(current);
    tokens
}
