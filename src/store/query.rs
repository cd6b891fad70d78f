use std::collections::BTreeMap;

use rusqlite::types::Value as SqlValue;
use serde_json::Value as JsonValue;

use super::{QUERYABLE_TABLES, Store};
use crate::error::StoreError;

/// Runs the ad-hoc `query` command against one of the eight whitelisted
/// tables, returning each matching row as a JSON object.
///
/// Filter column names must be strictly alphanumeric (no underscore);
/// `order_by` may additionally contain underscores. Both rules mirror the
/// whitelist this command was ported from, and exist to keep identifiers
/// out of string-built SQL without reaching for a full SQL parser.
impl Store {
    pub fn query(
        &self,
        table: &str,
        filters: &BTreeMap<String, JsonValue>,
        limit: i64,
        order_by: &str,
    ) -> Result<Vec<BTreeMap<String, JsonValue>>, StoreError> {
        debug_assert!(QUERYABLE_TABLES.contains(&table));

        let mut sql = format!("SELECT * FROM {table}");
        let mut params: Vec<SqlValue> = Vec::new();

        let clauses: Vec<String> = filters
            .iter()
            .filter(|(col, _)| is_safe_column(col))
            .map(|(col, val)| {
                params.push(json_to_sql(val));
                format!("{col} = ?")
            })
            .collect();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        if let Some(clause) = safe_order_by(order_by) {
            sql.push_str(" ORDER BY ");
            sql.push_str(&clause);
        }

        sql.push_str(" LIMIT ?");
        params.push(SqlValue::Integer(limit));

        let conn = self.reader()?;
        let mut stmt = conn.prepare(&sql)?;
        let column_names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                let mut object = BTreeMap::new();
                for (index, name) in column_names.iter().enumerate() {
                    let value: SqlValue = row.get(index)?;
                    object.insert(name.clone(), sql_to_json(value));
                }
                Ok(object)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

/// Only strictly alphanumeric column names are allowed in filters — no
/// underscore, unlike `order_by` below.
fn is_safe_column(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric())
}

/// `order_by` accepts "<column> [ASC|DESC]", where the column may also
/// contain underscores.
fn safe_order_by(order_by: &str) -> Option<String> {
    let parts: Vec<&str> = order_by.split_whitespace().collect();
    if parts.is_empty() || parts.len() > 2 {
        return None;
    }
    let column = parts[0];
    if column.is_empty() || !column.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let direction = parts
        .get(1)
        .map(|d| d.to_ascii_uppercase())
        .unwrap_or_else(|| "DESC".to_string());
    if direction != "ASC" && direction != "DESC" {
        return None;
    }
    Some(format!("{column} {direction}"))
}

fn json_to_sql(value: &JsonValue) -> SqlValue {
    match value {
        JsonValue::Null => SqlValue::Null,
        JsonValue::Bool(b) => SqlValue::Integer(i64::from(*b)),
        JsonValue::Number(n) => n
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| n.as_f64().map(SqlValue::Real))
            .unwrap_or(SqlValue::Null),
        JsonValue::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn sql_to_json(value: SqlValue) -> JsonValue {
    match value {
        SqlValue::Null => JsonValue::Null,
        SqlValue::Integer(i) => JsonValue::from(i),
        SqlValue::Real(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        SqlValue::Text(s) => JsonValue::String(s),
        SqlValue::Blob(b) => JsonValue::String(hex::encode(b)),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn query_applies_filters_and_limit() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");
        store
            .upsert_project("core", "Cortex Core", "active", 1, "", "")
            .await
            .expect("insert");
        store
            .upsert_project("side", "Side Quest", "paused", 1, "", "")
            .await
            .expect("insert");

        let mut filters = BTreeMap::new();
        filters.insert("status".to_string(), JsonValue::String("active".to_string()));
        let rows = store.query("projects", &filters, 20, "").expect("query");
        assert_eq!(1, rows.len());
        assert_eq!(Some(&JsonValue::String("core".to_string())), rows[0].get("tag"));
    }

    #[rstest]
    #[case("name", true)]
    #[case("note_type", false)]
    #[case("", false)]
    #[case("name; DROP TABLE notes", false)]
    fn is_safe_column_rejects_non_alphanumeric(#[case] column: &str, #[case] expected: bool) {
        assert_eq!(expected, is_safe_column(column));
    }

    #[rstest]
    #[case("created_at DESC", Some("created_at DESC".to_string()))]
    #[case("created_at", Some("created_at DESC".to_string()))]
    #[case("created_at SIDEWAYS", None)]
    #[case("created_at DESC extra", None)]
    fn safe_order_by_matches_expected(#[case] input: &str, #[case] expected: Option<String>) {
        assert_eq!(expected, safe_order_by(input));
    }
}
