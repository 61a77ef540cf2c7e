//! Named-parameter processing.
//!
//! Rewrites statements written with `:name` or `:{name}` parameters into the
//! driver-native `?` form and records parameter names in occurrence order.
//!
//! Rules:
//!
//! - `::` is copied through unchanged (type casts).
//! - `:{name}` ends at the first `}`. A `:` or `{` inside the braces, or a
//!   missing `}`, is an error. Payloads shorter than two characters are
//!   copied through.
//! - `:name` ends at whitespace or any of
//!   [`PARAMETER_SEPARATORS`](prettysql_common::PARAMETER_SEPARATORS). A `}`
//!   inside the name is an error, and a nested `:` is only accepted as `::`
//!   right after the name. A lone `:` is copied through.
//!
//! Text inside SQL string literals or comments is not treated specially.

use std::collections::HashMap;

use prettysql_common::{DEFAULT_PARAMETER_CAPACITY, NATIVE_PARAMETER, PARAMETER_PREFIX, PARAMETER_SEPARATORS};

use crate::error::{ClientError, ClientResult};

/// Result of processing a named-parameter statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedQueryPlan {
    native_query: String,
    parameters: Vec<String>,
}

impl NamedQueryPlan {
    /// Processes `query`.
    pub fn process(query: &str) -> ClientResult<Self> {
        process(query)
    }

    /// Statement with every parameter replaced by `?`.
    pub fn native_query(&self) -> &str {
        &self.native_query
    }

    /// Parameter names in occurrence order, duplicates included.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Builds the name to positional index table.
    pub fn parameter_table(&self) -> ParameterTable {
        ParameterTable::new(&self.parameters)
    }

    /// Splits the plan into its parts.
    pub fn into_parts(self) -> (String, Vec<String>) {
        (self.native_query, self.parameters)
    }
}

/// A parameter found while scanning.
#[derive(Debug)]
struct ParameterToken {
    name: String,
    /// Index one past the token's last character.
    end: usize,
}

enum Scan {
    Parameter(ParameterToken),
    Verbatim(usize),
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || PARAMETER_SEPARATORS.contains(&c)
}

fn parse_error(message: String, position: usize, query: &str) -> ClientError {
    ClientError::Parse {
        message,
        position,
        query: query.to_string(),
    }
}

/// Rewrites `query` to native placeholders.
pub fn process(query: &str) -> ClientResult<NamedQueryPlan> {
    let chars: Vec<char> = query.chars().collect();
    let mut native_query = String::with_capacity(query.len());
    let mut parameters = Vec::with_capacity(DEFAULT_PARAMETER_CAPACITY);

    let mut i = 0;
    while i < chars.len() {
        if chars[i] != PARAMETER_PREFIX {
            native_query.push(chars[i]);
            i += 1;
            continue;
        }

        match scan(&chars, i, query)? {
            Scan::Parameter(token) => {
                native_query.push(NATIVE_PARAMETER);
                parameters.push(token.name);
                i = token.end;
            }
            Scan::Verbatim(end) => {
                native_query.extend(&chars[i..end]);
                i = end;
            }
        }
    }

    Ok(NamedQueryPlan {
        native_query,
        parameters,
    })
}

/// Scans the span starting at the prefix character `chars[start]`.
fn scan(chars: &[char], start: usize, query: &str) -> ClientResult<Scan> {
    let len = chars.len();
    let Some(&next) = chars.get(start + 1) else {
        return Ok(Scan::Verbatim(start + 1));
    };

    if next == PARAMETER_PREFIX {
        return Ok(Scan::Verbatim(start + 2));
    }

    if next == '{' {
        let mut j = start + 2;
        while j < len && chars[j] != '}' {
            if chars[j] == PARAMETER_PREFIX || chars[j] == '{' {
                return Err(parse_error(
                    format!("Invalid character '{}' in named parameter declaration", chars[j]),
                    start,
                    query,
                ));
            }
            j += 1;
        }
        if j >= len {
            return Err(parse_error(
                "Non-terminated named parameter declaration".to_string(),
                start,
                query,
            ));
        }
        if j - start > 3 {
            return Ok(Scan::Parameter(ParameterToken {
                name: chars[start + 2..j].iter().collect(),
                end: j + 1,
            }));
        }
        return Ok(Scan::Verbatim(j + 1));
    }

    let mut j = start + 1;
    while j < len && !is_separator(chars[j]) {
        if chars[j] == '}' {
            return Err(parse_error(
                "Invalid character '}' in named parameter declaration".to_string(),
                start,
                query,
            ));
        }
        j += 1;
    }
    if j < len
        && chars[j] == PARAMETER_PREFIX
        && chars.get(j + 1) != Some(&PARAMETER_PREFIX)
        && j > start + 1
    {
        return Err(parse_error(
            "Invalid character ':' in named parameter declaration".to_string(),
            start,
            query,
        ));
    }
    if j - start > 1 {
        return Ok(Scan::Parameter(ParameterToken {
            name: chars[start + 1..j].iter().collect(),
            end: j,
        }));
    }
    Ok(Scan::Verbatim(start + 1))
}

// =============================================================================
// Parameter Table
// =============================================================================

/// Maps parameter names to 1-based positional indices.
///
/// A name used several times maps to every position it occupies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterTable {
    positions: HashMap<String, Vec<usize>>,
    count: usize,
}

impl ParameterTable {
    /// Builds the table from names in occurrence order.
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        let mut positions: HashMap<String, Vec<usize>> = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            positions
                .entry(name.as_ref().to_string())
                .or_default()
                .push(i + 1);
        }
        Self {
            positions,
            count: names.len(),
        }
    }

    /// Returns the first position of `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.positions.get(name).and_then(|p| p.first().copied())
    }

    /// Returns every position of `name`.
    pub fn indices_of(&self, name: &str) -> Option<&[usize]> {
        self.positions.get(name).map(Vec::as_slice)
    }

    /// Returns true if `name` is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Number of placeholders.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true if the statement has no parameters.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of distinct names.
    pub fn distinct_names(&self) -> usize {
        self.positions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn native(query: &str) -> String {
        process(query).unwrap().native_query
    }

    #[test]
    fn test_bare_parameters() {
        let plan = process("SELECT * FROM films WHERE year >= :year OFFSET :offset LIMIT :limit").unwrap();
        assert_eq!(plan.native_query(), "SELECT * FROM films WHERE year >= ? OFFSET ? LIMIT ?");
        assert_eq!(plan.parameters(), ["year", "offset", "limit"]);
    }

    #[test]
    fn test_braced_parameters() {
        let plan = process("SELECT * FROM films WHERE year >= :{year} OFFSET :{offset} LIMIT :{limit}").unwrap();
        assert_eq!(plan.native_query(), "SELECT * FROM films WHERE year >= ? OFFSET ? LIMIT ?");
        assert_eq!(plan.parameters(), ["year", "offset", "limit"]);
    }

    #[test]
    fn test_mixed_forms_and_separators() {
        let plan = process("INSERT INTO t VALUES(:id,:{name},:year)").unwrap();
        assert_eq!(plan.native_query(), "INSERT INTO t VALUES(?,?,?)");
        assert_eq!(plan.parameters(), ["id", "name", "year"]);

        assert_eq!(native("a=:x+:y*2"), "a=?+?*2");
        assert_eq!(native("a = :x\n AND b = :y\t"), "a = ?\n AND b = ?\t");
    }

    #[test]
    fn test_no_parameters() {
        let plan = process("SELECT 1").unwrap();
        assert_eq!(plan.native_query(), "SELECT 1");
        assert!(plan.parameters().is_empty());
        assert_eq!(native(""), "");
    }

    #[test]
    fn test_double_colon_passthrough() {
        assert_eq!(native("SELECT '1'::INTEGER"), "SELECT '1'::INTEGER");
        assert_eq!(native("SELECT :id::INTEGER"), "SELECT ?::INTEGER");
        let plan = process("SELECT a::text, :b").unwrap();
        assert_eq!(plan.native_query(), "SELECT a::text, ?");
        assert_eq!(plan.parameters(), ["b"]);
    }

    #[test]
    fn test_lone_colon_passthrough() {
        assert_eq!(native("SELECT ':'"), "SELECT ':'");
        assert_eq!(native("a : b"), "a : b");
        assert_eq!(native("ends with :"), "ends with :");
    }

    #[test]
    fn test_short_braced_payload_passthrough() {
        assert_eq!(native("x = :{}"), "x = :{}");
        assert_eq!(native("x = :{a}"), "x = :{a}");
        assert_eq!(native("x = :{ab}"), "x = ?");
    }

    #[test]
    fn test_single_char_bare_parameter() {
        let plan = process("x = :a").unwrap();
        assert_eq!(plan.native_query(), "x = ?");
        assert_eq!(plan.parameters(), ["a"]);
    }

    #[test]
    fn test_non_terminated_braced_parameter() {
        let query = "SELECT * FROM films WHERE year >= :{year";
        let err = process(query).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        match err {
            ClientError::Parse { message, position, query: q } => {
                assert!(message.contains("Non-terminated"));
                assert_eq!(position, 34);
                assert_eq!(q, query);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_parameters() {
        for query in [
            "SELECT * FROM films WHERE year >= :{{year}}",
            "SELECT * FROM films WHERE year >= :{ye:ar}",
            "SELECT * FROM films WHERE year >= :year}",
            "SELECT * FROM films WHERE year >= :year:month",
        ] {
            let err = process(query).unwrap_err();
            assert!(matches!(err, ClientError::Parse { .. }), "{query}");
        }
    }

    #[test]
    fn test_string_literals_are_not_special() {
        let plan = process("SELECT * FROM t WHERE a = ':x'").unwrap();
        assert_eq!(plan.native_query(), "SELECT * FROM t WHERE a = '?'");
        assert_eq!(plan.parameters(), ["x"]);
    }

    #[test]
    fn test_non_ascii_text() {
        let plan = process("SELECT 'ünïcödé' WHERE name = :näme").unwrap();
        assert_eq!(plan.native_query(), "SELECT 'ünïcödé' WHERE name = ?");
        assert_eq!(plan.parameters(), ["näme"]);
    }

    #[test]
    fn test_parameter_table() {
        let plan = process("SELECT * FROM t WHERE a = :x OR b = :y OR c = :x").unwrap();
        let table = plan.parameter_table();
        assert_eq!(table.len(), 3);
        assert_eq!(table.distinct_names(), 2);
        assert_eq!(table.index_of("x"), Some(1));
        assert_eq!(table.indices_of("x"), Some(&[1, 3][..]));
        assert_eq!(table.index_of("y"), Some(2));
        assert!(table.contains("y"));
        assert_eq!(table.index_of("z"), None);
        assert!(!table.is_empty());
        assert!(ParameterTable::new::<&str>(&[]).is_empty());
    }
}
