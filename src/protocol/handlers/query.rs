use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::HandlerError;
use crate::protocol::wire;
use crate::store::{QUERYABLE_TABLES, Store};

/// Ad-hoc read against one of the eight whitelisted tables. `filters` and
/// `order_by` are validated column-by-column inside `Store::query`; this
/// handler only decides whether `table` itself is allowed at all.
pub async fn query(store: &Store, payload: &str) -> Result<String, HandlerError> {
    let data: Value = if payload.is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(payload)?
    };

    let table = data.get("table").and_then(Value::as_str).unwrap_or("");
    if !QUERYABLE_TABLES.contains(&table) {
        return Err(HandlerError::InvalidTable);
    }

    let filters: BTreeMap<String, Value> = data
        .get("filters")
        .and_then(Value::as_object)
        .map(|object| object.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();

    let limit = data.get("limit").and_then(Value::as_i64).unwrap_or(20).clamp(1, 100);
    let order_by = data.get("order_by").and_then(Value::as_str).unwrap_or("");

    let rows = store.query(table, &filters, limit, order_by)?;
    Ok(wire::response("query", &serde_json::to_string(&rows)?))
}
