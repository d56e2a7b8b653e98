//! Migration file parsing.
//!
//! A migration file holds both actions of a unit, separated by marker
//! comments:
//!
//! ```sql
//! -- +migrate Up
//! CREATE TABLE users (id SERIAL PRIMARY KEY);
//!
//! -- +migrate Down
//! DROP TABLE users;
//! ```
//!
//! `-- +migrate Up notransaction` runs the up action outside a transaction.
//! Statements are split on `;` outside literals, comments and dollar-quoted
//! bodies; a block between `-- +migrate StatementBegin` and
//! `-- +migrate StatementEnd` is kept whole.

use tidemark_core::error::{MigrateError, Result};
use tidemark_core::migration::{MigrationId, MigrationScript, MigrationUnit};

const MARKER: &str = "-- +migrate";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Up,
    Down,
}

#[derive(Default)]
struct SectionBuilder {
    statements: Vec<String>,
    buffer: String,
    transactional: bool,
    seen: bool,
}

impl SectionBuilder {
    fn open(&mut self, transactional: bool) {
        self.seen = true;
        self.transactional = transactional;
    }

    fn flush(&mut self) {
        let buffer = std::mem::take(&mut self.buffer);
        self.statements.extend(
            split_sql_statements(&buffer)
                .into_iter()
                .filter(|s| !is_comment_only(s)),
        );
    }

    fn push_block(&mut self) {
        let block = std::mem::take(&mut self.buffer);
        let block = block.trim().trim_end_matches(';').trim_end();
        if !block.is_empty() {
            self.statements.push(block.to_string());
        }
    }

    fn finish(self) -> Option<MigrationScript> {
        if !self.seen || self.statements.is_empty() {
            return None;
        }
        let script = MigrationScript::new(self.statements);
        Some(if self.transactional {
            script
        } else {
            script.without_transaction()
        })
    }
}

/// Parse the contents of a migration file into a unit.
///
/// A file must contain a `-- +migrate Up` section. An absent or empty down
/// section leaves the unit irreversible.
pub fn parse_migration(id: MigrationId, content: &str) -> Result<MigrationUnit> {
    let invalid = |reason: String| MigrateError::InvalidScript {
        unit: id.to_string(),
        reason,
    };

    let mut up = SectionBuilder::default();
    let mut down = SectionBuilder::default();
    let mut section = Section::Preamble;
    let mut in_block = false;

    for (line_no, line) in content.lines().enumerate() {
        let line_no = line_no + 1;
        let Some(command) = line.trim_start().strip_prefix(MARKER) else {
            match section {
                Section::Preamble => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() && !trimmed.starts_with("--") {
                        return Err(invalid(format!(
                            "line {}: statement before `{} Up`",
                            line_no, MARKER
                        )));
                    }
                }
                Section::Up => push_line(&mut up.buffer, line),
                Section::Down => push_line(&mut down.buffer, line),
            }
            continue;
        };

        let mut words = command.split_whitespace();
        let keyword = words.next().unwrap_or_default();
        let options: Vec<&str> = words.collect();
        let current = match section {
            Section::Up => Some(&mut up),
            Section::Down => Some(&mut down),
            Section::Preamble => None,
        };

        match keyword {
            "Up" | "Down" => {
                if in_block {
                    return Err(invalid(format!(
                        "line {}: section change inside StatementBegin block",
                        line_no
                    )));
                }
                if let Some(current) = current {
                    current.flush();
                }

                let transactional = !options.iter().any(|o| *o == "notransaction");
                let (next, builder) = if keyword == "Up" {
                    (Section::Up, &mut up)
                } else {
                    (Section::Down, &mut down)
                };
                if builder.seen {
                    return Err(invalid(format!(
                        "line {}: duplicate `{} {}` section",
                        line_no, MARKER, keyword
                    )));
                }
                builder.open(transactional);
                section = next;
            }
            "StatementBegin" => {
                let Some(current) = current else {
                    return Err(invalid(format!(
                        "line {}: StatementBegin outside an Up or Down section",
                        line_no
                    )));
                };
                if in_block {
                    return Err(invalid(format!("line {}: nested StatementBegin", line_no)));
                }
                current.flush();
                in_block = true;
            }
            "StatementEnd" => {
                let Some(current) = current.filter(|_| in_block) else {
                    return Err(invalid(format!(
                        "line {}: StatementEnd without StatementBegin",
                        line_no
                    )));
                };
                current.push_block();
                in_block = false;
            }
            other => {
                return Err(invalid(format!(
                    "line {}: unknown migrate command '{}'",
                    line_no, other
                )));
            }
        }
    }

    if in_block {
        return Err(invalid("unterminated StatementBegin block".to_string()));
    }
    if !up.seen {
        return Err(invalid(format!("missing `{} Up` section", MARKER)));
    }

    up.flush();
    down.flush();

    let up = up.finish().unwrap_or_else(|| MigrationScript::new(Vec::new()));
    let mut unit = MigrationUnit::new(id, up);
    if let Some(down) = down.finish() {
        unit = unit.with_down(down);
    }
    Ok(unit)
}

fn push_line(buffer: &mut String, line: &str) {
    buffer.push_str(line);
    buffer.push('\n');
}

fn is_comment_only(statement: &str) -> bool {
    statement.lines().all(|l| {
        let l = l.trim();
        l.is_empty() || l.starts_with("--")
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Lexeme {
    Code,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
}

/// Split SQL into individual statements.
///
/// Only a `;` in plain code ends a statement. Semicolons inside string
/// literals, quoted identifiers, `--` and `/* */` comments, and dollar-quoted
/// bodies (`$$ ... $$`, `$tag$ ... $tag$`) are kept.
pub fn split_sql_statements(sql: &str) -> Vec<String> {
    let bytes = sql.as_bytes();
    let mut statements = Vec::new();
    let mut lexeme = Lexeme::Code;
    let mut dollar_tag: Option<&[u8]> = None;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if let Some(tag) = dollar_tag {
            if bytes[i..].starts_with(tag) {
                i += tag.len();
                dollar_tag = None;
            } else {
                i += 1;
            }
            continue;
        }

        let next = bytes.get(i + 1).copied();
        match (lexeme, bytes[i]) {
            (Lexeme::Code, b'\'') => lexeme = Lexeme::SingleQuoted,
            (Lexeme::Code, b'"') => lexeme = Lexeme::DoubleQuoted,
            (Lexeme::Code, b'-') if next == Some(b'-') => {
                lexeme = Lexeme::LineComment;
                i += 1;
            }
            (Lexeme::Code, b'/') if next == Some(b'*') => {
                lexeme = Lexeme::BlockComment(1);
                i += 1;
            }
            (Lexeme::Code, b'$') => {
                if let Some(len) = dollar_tag_len(&bytes[i..]) {
                    dollar_tag = Some(&bytes[i..i + len]);
                    i += len;
                    continue;
                }
            }
            (Lexeme::Code, b';') => {
                push_statement(&mut statements, &sql[start..i]);
                start = i + 1;
            }
            // A doubled quote is an escaped quote and keeps the literal open.
            (Lexeme::SingleQuoted, b'\'') | (Lexeme::DoubleQuoted, b'"') => {
                if next == Some(bytes[i]) {
                    i += 1;
                } else {
                    lexeme = Lexeme::Code;
                }
            }
            (Lexeme::LineComment, b'\n') => lexeme = Lexeme::Code,
            (Lexeme::BlockComment(depth), b'*') if next == Some(b'/') => {
                lexeme = if depth == 1 {
                    Lexeme::Code
                } else {
                    Lexeme::BlockComment(depth - 1)
                };
                i += 1;
            }
            (Lexeme::BlockComment(depth), b'/') if next == Some(b'*') => {
                lexeme = Lexeme::BlockComment(depth + 1);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }

    push_statement(&mut statements, &sql[start..]);
    statements
}

/// Length of the dollar-quote opener at the start of `bytes`, if any.
///
/// `$1` style parameters are not openers: a tag must start with a letter or
/// an underscore.
fn dollar_tag_len(bytes: &[u8]) -> Option<usize> {
    let mut end = 1;
    if let Some(&first) = bytes.get(1) {
        if first.is_ascii_alphabetic() || first == b'_' {
            end = 2;
            while bytes
                .get(end)
                .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_')
            {
                end += 1;
            }
        }
    }
    (bytes.get(end) == Some(&b'$')).then_some(end + 1)
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    let statement = raw.trim();
    if !statement.is_empty() {
        statements.push(statement.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<MigrationUnit> {
        parse_migration(MigrationId::new("001_init"), content)
    }

    #[test]
    fn test_parse_up_and_down() {
        let unit = parse(
            r#"
-- +migrate Up
CREATE TABLE users (id SERIAL PRIMARY KEY);
CREATE INDEX users_id ON users (id);

-- +migrate Down
DROP TABLE users;
"#,
        )
        .unwrap();

        assert_eq!(unit.up.statements.len(), 2);
        assert!(unit.up.transactional);
        let down = unit.down.unwrap();
        assert_eq!(down.statements, ["DROP TABLE users"]);
    }

    #[test]
    fn test_missing_up_section() {
        let err = parse("CREATE TABLE users (id INT);").unwrap_err();
        assert!(matches!(err, MigrateError::InvalidScript { .. }));

        let err = parse("-- just a comment\n").unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_leading_comments_allowed() {
        let unit = parse("-- adds users\n\n-- +migrate Up\nSELECT 1;\n").unwrap();
        assert_eq!(unit.up.statements, ["SELECT 1"]);
        assert!(!unit.is_reversible());
    }

    #[test]
    fn test_empty_down_is_irreversible() {
        let unit = parse("-- +migrate Up\nSELECT 1;\n-- +migrate Down\n-- nothing to undo\n").unwrap();
        assert!(unit.down.is_none());
    }

    #[test]
    fn test_notransaction_option() {
        let unit = parse(
            "-- +migrate Up notransaction\nCREATE INDEX CONCURRENTLY i ON t (c);\n-- +migrate Down\nDROP INDEX i;\n",
        )
        .unwrap();
        assert!(!unit.up.transactional);
        assert!(unit.down.unwrap().transactional);
    }

    #[test]
    fn test_statement_block_kept_whole() {
        let unit = parse(
            r#"
-- +migrate Up
-- +migrate StatementBegin
CREATE FUNCTION touch() RETURNS trigger AS '
BEGIN
    NEW.updated_at = NOW();
    RETURN NEW;
END;
' LANGUAGE plpgsql;
-- +migrate StatementEnd
SELECT 1;
"#,
        )
        .unwrap();

        assert_eq!(unit.up.statements.len(), 2);
        assert!(unit.up.statements[0].contains("RETURN NEW;"));
        assert!(unit.up.statements[0].ends_with("LANGUAGE plpgsql"));
        assert_eq!(unit.up.statements[1], "SELECT 1");
    }

    #[test]
    fn test_unterminated_block() {
        let err = parse("-- +migrate Up\n-- +migrate StatementBegin\nSELECT 1;\n").unwrap_err();
        assert!(err.to_string().contains("unterminated"));
    }

    #[test]
    fn test_stray_statement_end() {
        assert!(parse("-- +migrate Up\n-- +migrate StatementEnd\n").is_err());
    }

    #[test]
    fn test_duplicate_section() {
        assert!(parse("-- +migrate Up\nSELECT 1;\n-- +migrate Up\nSELECT 2;\n").is_err());
    }

    #[test]
    fn test_unknown_command() {
        let err = parse("-- +migrate Sideways\n").unwrap_err();
        assert!(err.to_string().contains("Sideways"));
    }

    #[test]
    fn test_split_simple_statements() {
        let stmts = split_sql_statements("SELECT 1; SELECT 2; SELECT 3;");
        assert_eq!(stmts, ["SELECT 1", "SELECT 2", "SELECT 3"]);
    }

    #[test]
    fn test_split_with_dollar_quoted_function() {
        let sql = r#"
CREATE FUNCTION test() RETURNS void AS $$
BEGIN
    SELECT 1;
    SELECT 2;
END;
$$ LANGUAGE plpgsql;

SELECT 3;
"#;
        let stmts = split_sql_statements(sql);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].contains("CREATE FUNCTION"));
        assert!(stmts[0].contains("$$ LANGUAGE plpgsql"));
        assert!(stmts[1].contains("SELECT 3"));
    }

    #[test]
    fn test_split_with_tagged_dollar_quote() {
        let sql = "DO $body$ BEGIN PERFORM 1; END $body$; SELECT 2;";
        let stmts = split_sql_statements(sql);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].starts_with("DO $body$"));
        assert!(stmts[0].ends_with("END $body$"));
    }

    #[test]
    fn test_split_keeps_semicolon_in_string_literal() {
        let stmts = split_sql_statements("INSERT INTO t (v) VALUES ('a;b'); SELECT 'it''s; fine';");
        assert_eq!(stmts, ["INSERT INTO t (v) VALUES ('a;b')", "SELECT 'it''s; fine'"]);
    }

    #[test]
    fn test_split_keeps_semicolon_in_comments() {
        let sql = "CREATE TABLE t (\n  id INT -- key; never null\n);\n/* a; /* nested; */ b; */ SELECT 1;";
        let stmts = split_sql_statements(sql);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], "CREATE TABLE t (\n  id INT -- key; never null\n)");
        assert!(stmts[1].ends_with("SELECT 1"));
    }

    #[test]
    fn test_split_keeps_semicolon_in_quoted_identifier() {
        let stmts = split_sql_statements(r#"CREATE TABLE "odd;name" (id INT); SELECT 1;"#);
        assert_eq!(stmts, [r#"CREATE TABLE "odd;name" (id INT)"#, "SELECT 1"]);
    }

    #[test]
    fn test_split_positional_parameter_is_not_dollar_quote() {
        let stmts = split_sql_statements("PREPARE q AS SELECT $1; SELECT 2;");
        assert_eq!(stmts, ["PREPARE q AS SELECT $1", "SELECT 2"]);
    }

    #[test]
    fn test_parse_literal_with_semicolon_is_one_statement() {
        let unit = parse(
            "-- +migrate Up\nINSERT INTO t (v) VALUES ('a;b');\n-- +migrate Down\nDELETE FROM t WHERE v = 'a;b';\n",
        )
        .unwrap();
        assert_eq!(unit.up.statements, ["INSERT INTO t (v) VALUES ('a;b')"]);
        assert_eq!(unit.down.unwrap().statements, ["DELETE FROM t WHERE v = 'a;b'"]);
    }
}
