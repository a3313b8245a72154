// PostgreSQL identifier handling and statement generation
//
// Key design decisions:
// - Operator-chosen database names are validated before any statement is built
// - Identifiers are always double-quoted (embedded quotes doubled); never interpolated raw
// - Values (names in WHERE clauses, hashes) are always bound parameters, never formatted in

use regex::Regex;

/// PostgreSQL truncates identifiers longer than NAMEDATALEN - 1 bytes.
pub const MAX_DB_NAME_LEN: usize = 63;

const RESERVED_DB_NAMES: [&str; 3] = ["postgres", "template0", "template1"];

/// Validate a database name (letters, numbers, underscore only; 1-63 bytes; not reserved)
pub fn validate_db_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Database name is required.".to_string());
    }
    if name.len() > MAX_DB_NAME_LEN {
        return Err(format!(
            "Database name must be {} characters or fewer.",
            MAX_DB_NAME_LEN
        ));
    }
    let re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
        .map_err(|e| format!("Internal error: failed to compile database name regex: {}", e))?;
    if !re.is_match(name) {
        return Err(
            "Database name must start with a letter or underscore and contain only letters, numbers, and underscores.".to_string(),
        );
    }
    if RESERVED_DB_NAMES.iter().any(|r| r.eq_ignore_ascii_case(name)) {
        return Err(format!("'{}' is a reserved database name.", name));
    }
    Ok(())
}

/// Double-quote a PostgreSQL identifier
pub fn pg_quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Generate CREATE DATABASE statement
pub fn create_db_stmt(db_name: &str) -> String {
    format!("CREATE DATABASE {};", pg_quote_ident(db_name))
}

/// Generate DROP DATABASE statement
pub fn drop_db_stmt(db_name: &str) -> String {
    format!("DROP DATABASE {};", pg_quote_ident(db_name))
}

/// Exact-name lookup; binds the name as $1 and returns the stored datname.
pub const FIND_DB_EXACT_QUERY: &str = "SELECT datname::text FROM pg_database WHERE datname = $1";

/// Case-insensitive lookup; binds the name as $1 and returns the stored datname.
pub const FIND_DB_CASE_INSENSITIVE_QUERY: &str =
    "SELECT datname::text FROM pg_database WHERE lower(datname) = lower($1) ORDER BY datname LIMIT 1";

/// Legacy admin credential row update; binds hash as $1 and user id as $2.
pub const LEGACY_PASSWORD_UPDATE: &str = "UPDATE res_users SET password = $1 WHERE id = $2";

/// Id of the `admin` user row in the application's users table.
pub const LEGACY_ADMIN_USER_ID: i32 = 2;
