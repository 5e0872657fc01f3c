use crate::query::{BoxPredicate, BoxQuery, FolderQuery, SortDescriptor, SortField};
use rusqlite::types::Value as SqlValue;

/// Compiled SQL query fragment with bound parameters.
pub(crate) struct CompiledQuery {
    pub where_clause: String,
    pub params: Vec<SqlValue>,
    pub order_clause: String,
}

/// Translate a BoxQuery into SQL fragments over the `boxes` table.
pub(crate) fn compile_box_query(q: &BoxQuery) -> CompiledQuery {
    let mut params = Vec::new();

    let mut conditions = Vec::new();
    for pred in &q.predicates {
        let (sql, pred_params) = compile_predicate(pred);
        conditions.push(sql);
        params.extend(pred_params);
    }

    CompiledQuery {
        where_clause: where_clause(&conditions),
        params,
        order_clause: compile_sort(&q.sort),
    }
}

/// Translate a FolderQuery into SQL fragments over the `folders` table.
pub(crate) fn compile_folder_query(q: &FolderQuery) -> CompiledQuery {
    let mut params = Vec::new();
    let mut conditions = Vec::new();
    if let Some(ref creator) = q.creator {
        conditions.push("creator_id = ?".to_string());
        params.push(SqlValue::Text(creator.clone()));
    }
    if let Some(ref ids) = q.ids {
        conditions.push(in_clause(
            "id",
            ids.iter().map(|id| id.to_string()),
            &mut params,
        ));
    }
    CompiledQuery {
        where_clause: where_clause(&conditions),
        params,
        order_clause: "ORDER BY created ASC, rowid ASC".to_string(),
    }
}

fn where_clause(conditions: &[String]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

fn in_clause(
    column: &str,
    values: impl Iterator<Item = String>,
    params: &mut Vec<SqlValue>,
) -> String {
    let placeholders: Vec<&str> = values
        .map(|v| {
            params.push(SqlValue::Text(v));
            "?"
        })
        .collect();
    if placeholders.is_empty() {
        // Empty set matches nothing.
        "0".to_string()
    } else {
        format!("{} IN ({})", column, placeholders.join(", "))
    }
}

fn compile_predicate(pred: &BoxPredicate) -> (String, Vec<SqlValue>) {
    let mut params = Vec::new();
    let sql = match pred {
        BoxPredicate::IdIn(ids) => in_clause("id", ids.iter().map(|id| id.to_string()), &mut params),
        BoxPredicate::CreatedBy(creator) => {
            params.push(SqlValue::Text(creator.clone()));
            "creator_id = ?".to_string()
        }
        // NULL column means the flag was never written.
        BoxPredicate::NotDeletedByUser => {
            "(is_deleted_by_user = 0 OR is_deleted_by_user IS NULL)".to_string()
        }
        BoxPredicate::HoldsCatalogItem(kind, catalog_id) => {
            params.push(SqlValue::Text(catalog_id.clone()));
            format!(
                "EXISTS (SELECT 1 FROM json_each(document, '$.items.{}') \
                 WHERE json_extract(json_each.value, '$.payload.id') = ?)",
                kind.collection_name()
            )
        }
    };
    (sql, params)
}

fn compile_sort(sorts: &[SortDescriptor]) -> String {
    if sorts.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = sorts
        .iter()
        .map(|s| {
            let col = match s.field {
                SortField::Created => "created",
            };
            let dir = if s.ascending { "ASC" } else { "DESC" };
            format!("{} {}", col, dir)
        })
        .collect();
    // rowid breaks ties between rows written in the same millisecond.
    format!("ORDER BY {}, rowid ASC", parts.join(", "))
}
