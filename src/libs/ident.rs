//! SQL identifier validation and quoting.
//!
//! Every table or column name that ends up in statement text passes through
//! here. User-supplied names go through [`Ident::parse`]; names read back from
//! the catalog are only quoted with [`quote_ident`].

use std::fmt;

use thiserror::Error;

/// Postgres truncates identifiers longer than this (NAMEDATALEN - 1).
pub const MAX_IDENT_LEN: usize = 63;

/// Keywords Postgres reserves outright. Quoting would make them legal, but a
/// table called `select` is almost always a client bug.
const RESERVED: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric", "both", "case",
    "cast", "check", "collate", "column", "constraint", "create", "current_catalog",
    "current_date", "current_role", "current_time", "current_timestamp", "current_user",
    "default", "deferrable", "desc", "distinct", "do", "else", "end", "except", "false", "fetch",
    "for", "foreign", "from", "grant", "group", "having", "in", "initially", "intersect", "into",
    "lateral", "leading", "limit", "localtime", "localtimestamp", "not", "null", "offset", "on",
    "only", "or", "order", "placing", "primary", "references", "returning", "select",
    "session_user", "some", "symmetric", "table", "then", "to", "trailing", "true", "union",
    "unique", "user", "using", "variadic", "when", "where", "window", "with",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentError {
    #[error("identifier must not be empty")]
    Empty,
    #[error("identifier is {0} characters long, the limit is 63")]
    TooLong(usize),
    #[error("identifier must start with a letter or underscore, found '{0}'")]
    BadStart(char),
    #[error("identifier may only contain letters, digits and underscores, found '{0}'")]
    BadChar(char),
    #[error("'{0}' is a reserved SQL keyword")]
    Reserved(String),
}

/// A validated SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

impl Ident {
    pub fn parse(raw: &str) -> Result<Self, IdentError> {
        let len = raw.chars().count();
        if len == 0 {
            return Err(IdentError::Empty);
        }
        if len > MAX_IDENT_LEN {
            return Err(IdentError::TooLong(len));
        }

        let mut chars = raw.chars();
        if let Some(first) = chars.next() {
            if !(first.is_ascii_alphabetic() || first == '_') {
                return Err(IdentError::BadStart(first));
            }
        }
        if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
            return Err(IdentError::BadChar(bad));
        }

        let lower = raw.to_ascii_lowercase();
        if RESERVED.binary_search(&lower.as_str()).is_ok() {
            return Err(IdentError::Reserved(raw.to_string()));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier wrapped in double quotes, ready for statement text.
    pub fn quoted(&self) -> String {
        quote_ident(&self.0)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Ident {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Double-quote an identifier, doubling any embedded quotes.
pub fn quote_ident(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "\"\""))
}

/// `"schema"."table"`
pub fn qualified(schema: &Ident, table: &Ident) -> String {
    format!("{}.{}", schema.quoted(), table.quoted())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_list_is_sorted() {
        let mut sorted = RESERVED.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, RESERVED);
    }

    #[test]
    fn accepts_plain_names() {
        for name in ["people", "_tmp", "Table_2", "a"] {
            assert_eq!(Ident::parse(name).unwrap().as_str(), name);
        }
        assert!(Ident::parse(&"x".repeat(MAX_IDENT_LEN)).is_ok());
    }

    #[test]
    fn rejects_bad_names() {
        assert_eq!(Ident::parse(""), Err(IdentError::Empty));
        assert_eq!(
            Ident::parse(&"x".repeat(MAX_IDENT_LEN + 1)),
            Err(IdentError::TooLong(64))
        );
        assert_eq!(Ident::parse("1abc"), Err(IdentError::BadStart('1')));
        assert_eq!(Ident::parse("a-b"), Err(IdentError::BadChar('-')));
        assert_eq!(
            Ident::parse("x\"; DROP TABLE y; --"),
            Err(IdentError::BadChar('"'))
        );
        assert_eq!(
            Ident::parse("Select"),
            Err(IdentError::Reserved("Select".into()))
        );
    }

    #[test]
    fn quoting_escapes_embedded_quotes() {
        assert_eq!(quote_ident("name"), "\"name\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");

        let schema = Ident::parse("public").unwrap();
        let table = Ident::parse("People").unwrap();
        assert_eq!(qualified(&schema, &table), "\"public\".\"People\"");
    }
}
