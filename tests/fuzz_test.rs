//! Black-box fuzzing tests for the statement classifier.
//!
//! This test suite generates random, malicious, and edge-case inputs to make
//! sure classification never panics, is deterministic, and never lets a
//! denylisted keyword through.

use pg_readonly_mcp::tools::sql_validator::{classify, denied_keywords, ensure_read_only};
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;

/// Generate random string of given length
fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generate various edge-case strings
fn edge_case_strings() -> Vec<String> {
    vec![
        String::new(),                           // Empty
        " ".to_string(),                         // Single space
        "\n\r\t".to_string(),                    // Whitespace chars
        "\0".to_string(),                        // Null byte
        ";;;".to_string(),                       // Only separators
        "🚀".repeat(100),                        // Unicode
        "'OR 1=1--".to_string(),                 // SQL injection
        "'; DROP TABLE users--".to_string(),     // SQL injection
        "SELECT '".to_string(),                  // Unterminated literal
        "SELECT /* unterminated".to_string(),    // Unterminated comment
        "((((((((((".to_string(),                // Unbalanced parens
        "WITH".to_string(),                      // Truncated CTE
        "WITH a AS".to_string(),                 // Truncated CTE
        "a".repeat(10000),                       // Very long string
        format!("SELECT {}", "1 + ".repeat(200) + "1"), // Deep expression
        random_string(100),
        random_string(1000),
        "\u{0000}\u{FFFF}".to_string(), // Special unicode
        "1' UNION SELECT NULL, NULL--".to_string(),
        "$$ DO $$".to_string(),
        "\x00\x01\x02".to_string(), // Binary data
    ]
}

/// Read-only statements that a random keyword gets spliced into.
const CARRIERS: &[&str] = &[
    "SELECT 1",
    "SELECT * FROM users WHERE id = 1",
    "VALUES (1)",
    "WITH t AS (SELECT 1) SELECT * FROM t",
];

fn mixed_case(word: &str) -> String {
    let mut rng = rand::thread_rng();
    word.chars()
        .map(|c| {
            if rng.gen_bool(0.5) {
                c.to_ascii_lowercase()
            } else {
                c.to_ascii_uppercase()
            }
        })
        .collect()
}

#[test]
fn fuzz_edge_cases_never_panic() {
    for sql in edge_case_strings() {
        let first = classify(&sql);
        let _ = ensure_read_only(&sql);
        assert_eq!(first, classify(&sql), "non-deterministic for {:?}", sql);
    }
}

#[test]
fn fuzz_random_text_is_idempotent() {
    for _ in 0..200 {
        let len = rand::thread_rng().gen_range(0..200);
        let sql = random_string(len);
        assert_eq!(classify(&sql), classify(&sql));
    }
}

#[test]
fn fuzz_random_tokens_never_panic() {
    let tokens = [
        "SELECT", "FROM", "WHERE", "(", ")", ",", ";", "WITH", "AS", "UNION", "VALUES", "'x'",
        "1", "t", "--", "/*", "*/", "FOR", "SHARE", "INTO", "JOIN", "ON", "=",
    ];
    let mut rng = rand::thread_rng();
    for _ in 0..500 {
        let count = rng.gen_range(1..20);
        let sql: Vec<&str> = (0..count)
            .map(|_| *tokens.choose(&mut rng).unwrap_or(&"SELECT"))
            .collect();
        let sql = sql.join(" ");
        assert_eq!(classify(&sql), classify(&sql));
    }
}

/// A denylisted keyword anywhere in the text, as a whole word and in any
/// case, always rejects.
#[test]
fn fuzz_denied_keyword_always_rejects() {
    let keywords = denied_keywords();
    let mut rng = rand::thread_rng();

    for _ in 0..300 {
        let keyword = mixed_case(keywords.choose(&mut rng).unwrap_or(&"DROP"));
        let carrier = CARRIERS.choose(&mut rng).unwrap_or(&"SELECT 1");
        let sql = match rng.gen_range(0..4) {
            0 => format!("{}; {} something", carrier, keyword),
            1 => format!("{} -- {}", carrier, keyword),
            2 => format!("/* {} */ {}", keyword, carrier),
            _ => format!("{} {}", keyword, carrier),
        };
        assert!(
            !classify(&sql).is_authorized(),
            "keyword {:?} slipped through in {:?}",
            keyword,
            sql
        );
    }
}

#[test]
fn fuzz_keyword_as_identifier_fragment_allowed() {
    let mut rng = rand::thread_rng();
    for keyword in denied_keywords() {
        let column = format!(
            "{}_{}",
            keyword.to_ascii_lowercase(),
            random_string(rng.gen_range(1..8)).to_ascii_lowercase()
        );
        let sql = format!("SELECT x{} FROM t", column);
        assert!(
            classify(&sql).is_authorized(),
            "identifier {:?} should not trip the keyword scan",
            column
        );
    }
}
