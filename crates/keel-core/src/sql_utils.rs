//! SQL identifier quoting utilities

/// Quote a SQL identifier so it can be embedded in generated DDL.
///
/// Wraps the identifier in double quotes and escapes any embedded double quotes
/// by doubling them, following the SQL standard.
///
/// # Examples
/// ```
/// use keel_core::sql_utils::quote_ident;
/// assert_eq!(quote_ident("shop"), r#""shop""#);
/// assert_eq!(quote_ident(r#"my"schema"#), r#""my""schema""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a table name inside a namespace, e.g. `"shop"."schema_migrations"`.
///
/// # Examples
/// ```
/// use keel_core::sql_utils::qualified_table;
/// assert_eq!(qualified_table("shop", "orders"), r#""shop"."orders""#);
/// ```
pub fn qualified_table(namespace: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(namespace), quote_ident(table))
}

/// Quote a string literal by doubling embedded single quotes.
///
/// Only used where a driver cannot bind a parameter (e.g. `SET` statements).
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
