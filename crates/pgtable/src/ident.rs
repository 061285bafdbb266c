//! SQL identifier quoting.
//!
//! Table and column names are trusted as given; they are only wrapped in
//! double quotes so that reserved words and mixed-case names survive.
//!
//! - Dotted names quote each segment: `public.users` → `"public"."users"`
//! - Segments already wrapped in quotes are kept as written
//! - `*` is never quoted, so `users.*` → `"users".*`
//! - Embedded `"` is escaped as `""`

/// A part of a SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentPart {
    /// A name that must be quoted when rendered.
    Name(String),
    /// A segment the caller already quoted; rendered verbatim.
    PreQuoted(String),
    /// The `*` wildcard.
    Wildcard,
}

/// A SQL identifier (column, table, or schema name), possibly dotted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub parts: Vec<IdentPart>,
}

impl Ident {
    /// Split a raw identifier into its dotted segments.
    ///
    /// Dots inside an already quoted segment do not split it.
    pub fn new(raw: &str) -> Self {
        let raw = raw.trim();
        let mut parts = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;

        for ch in raw.chars() {
            match ch {
                '"' => {
                    in_quotes = !in_quotes;
                    current.push(ch);
                }
                '.' if !in_quotes => parts.push(Self::classify(std::mem::take(&mut current))),
                _ => current.push(ch),
            }
        }
        parts.push(Self::classify(current));

        Self { parts }
    }

    fn classify(segment: String) -> IdentPart {
        let trimmed = segment.trim();
        if trimmed == "*" {
            IdentPart::Wildcard
        } else if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
            IdentPart::PreQuoted(trimmed.to_string())
        } else {
            IdentPart::Name(trimmed.to_string())
        }
    }

    /// Render the identifier as SQL.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        self.write_sql(&mut out);
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            match part {
                IdentPart::Wildcard => out.push('*'),
                IdentPart::PreQuoted(s) => out.push_str(s),
                IdentPart::Name(s) => {
                    out.push('"');
                    for ch in s.chars() {
                        if ch == '"' {
                            out.push('"');
                            out.push('"');
                        } else {
                            out.push(ch);
                        }
                    }
                    out.push('"');
                }
            }
        }
    }
}

/// Quote a raw table or column name.
pub fn quote_ident(raw: &str) -> String {
    Ident::new(raw).to_sql()
}

/// Derive a placeholder name from a column name.
///
/// Placeholders may only contain `[A-Za-z0-9_]`; anything else becomes `_`.
pub fn placeholder_name(column: &str) -> String {
    column
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Placeholder names for a column list, in order.
///
/// Columns that sanitize to the same name are numbered: `first name` and
/// `first_name` become `first_name` and `first_name_2`.
pub fn placeholder_names<I, S>(columns: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut names: Vec<String> = Vec::new();
    for column in columns {
        let base = placeholder_name(column.as_ref());
        let mut name = base.clone();
        let mut n = 1;
        while names.contains(&name) {
            n += 1;
            name = format!("{base}_{n}");
        }
        names.push(name);
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_simple() {
        assert_eq!(quote_ident("users"), r#""users""#);
    }

    #[test]
    fn quote_trims_whitespace() {
        assert_eq!(quote_ident("  username "), r#""username""#);
    }

    #[test]
    fn quote_dotted() {
        assert_eq!(quote_ident("public.users"), r#""public"."users""#);
    }

    #[test]
    fn quote_wildcard_segment() {
        assert_eq!(quote_ident("u.*"), r#""u".*"#);
        assert_eq!(quote_ident("*"), "*");
    }

    #[test]
    fn quote_keeps_prequoted_segment() {
        assert_eq!(quote_ident(r#"public."User.Table""#), r#""public"."User.Table""#);
    }

    #[test]
    fn quote_escapes_embedded_quote() {
        assert_eq!(quote_ident(r#"has"quote"#), r#""has""quote""#);
    }

    #[test]
    fn quote_reserved_word() {
        assert_eq!(quote_ident("order"), r#""order""#);
    }

    #[test]
    fn placeholder_sanitizes() {
        assert_eq!(placeholder_name("username"), "username");
        assert_eq!(placeholder_name("u.id"), "u_id");
        assert_eq!(placeholder_name(" first name "), "first_name");
    }

    #[test]
    fn colliding_placeholders_are_numbered() {
        assert_eq!(
            placeholder_names(["first name", "first_name", "first-name", "age"]),
            ["first_name", "first_name_2", "first_name_3", "age"]
        );
        assert_eq!(
            placeholder_names(["a_2", "a", "a"]),
            ["a_2", "a", "a_3"]
        );
    }
}
