//! Parameterized query builders over a single table.
//!
//! Values are always bound as `?N` parameters. Table and column names cannot
//! be bound, so they are checked against a plain identifier pattern instead.

use crate::error::StoreError;
use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension, Row};

/// A column name and the value bound to it.
pub type Field<'a> = (&'a str, &'a dyn ToSql);

#[derive(Debug, Clone, Copy)]
pub enum Order<'a> {
    Asc(&'a str),
    Desc(&'a str),
}

fn ident(name: &str) -> Result<&str, StoreError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

/// `a = ?n AND b = ?n+1 ...`, numbering from `first`.
fn assignments(fields: &[Field<'_>], first: usize, sep: &str) -> Result<String, StoreError> {
    let parts = fields
        .iter()
        .enumerate()
        .map(|(i, (column, _))| Ok(format!("{} = ?{}", ident(column)?, first + i)))
        .collect::<Result<Vec<_>, StoreError>>()?;
    Ok(parts.join(sep))
}

fn values<'a>(groups: &[&'a [Field<'a>]]) -> Vec<&'a dyn ToSql> {
    groups.iter().flat_map(|g| g.iter().map(|(_, v)| *v)).collect()
}

/// Insert one row and return its rowid.
pub fn insert(conn: &Connection, table: &str, fields: &[Field<'_>]) -> Result<i64, StoreError> {
    let table = ident(table)?;
    let sql = if fields.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", table)
    } else {
        let columns = fields
            .iter()
            .map(|(c, _)| ident(c))
            .collect::<Result<Vec<_>, _>>()?;
        let placeholders = (1..=fields.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        )
    };
    log::debug!("{}", sql);
    conn.execute(&sql, values(&[fields]).as_slice())?;
    Ok(conn.last_insert_rowid())
}

/// Update the row with the given `id`. Returns the number of rows changed.
pub fn update(conn: &Connection, table: &str, id: i64, fields: &[Field<'_>]) -> Result<usize, StoreError> {
    update_if(conn, table, id, &[], fields)
}

/// Update the row with the given `id` only while every `expected` column still
/// holds its expected value. Returns the number of rows changed (0 or 1).
pub fn update_if(
    conn: &Connection,
    table: &str,
    id: i64,
    expected: &[Field<'_>],
    fields: &[Field<'_>],
) -> Result<usize, StoreError> {
    let table = ident(table)?;
    if fields.is_empty() {
        return Ok(0);
    }
    let set = assignments(fields, 1, ", ")?;
    let id_param = fields.len() + 1;
    let mut sql = format!("UPDATE {} SET {} WHERE id = ?{}", table, set, id_param);
    if !expected.is_empty() {
        sql.push_str(" AND ");
        sql.push_str(&assignments(expected, id_param + 1, " AND ")?);
    }
    log::debug!("{}", sql);

    let id_value: &dyn ToSql = &id;
    let mut params = values(&[fields]);
    params.push(id_value);
    params.extend(values(&[expected]));
    Ok(conn.execute(&sql, params.as_slice())?)
}

/// Insert a row, or overwrite the non-key columns of the row sharing `key`.
pub fn upsert(conn: &Connection, table: &str, key: &str, fields: &[Field<'_>]) -> Result<(), StoreError> {
    let table = ident(table)?;
    let key = ident(key)?;
    let columns = fields
        .iter()
        .map(|(c, _)| ident(c))
        .collect::<Result<Vec<_>, _>>()?;
    let placeholders = (1..=fields.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>();
    let updates = columns
        .iter()
        .filter(|c| **c != key)
        .map(|c| format!("{0} = excluded.{0}", c))
        .collect::<Vec<_>>();
    let conflict = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) {}",
        table,
        columns.join(", "),
        placeholders.join(", "),
        key,
        conflict
    );
    log::debug!("{}", sql);
    conn.execute(&sql, values(&[fields]).as_slice())?;
    Ok(())
}

/// Select the first row matching every `predicate` equality, in `order`.
pub fn select_one<T, F>(
    conn: &Connection,
    table: &str,
    columns: &[&str],
    predicate: &[Field<'_>],
    order: &[Order<'_>],
    map: F,
) -> Result<Option<T>, StoreError>
where
    F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
{
    let table = ident(table)?;
    let columns = columns
        .iter()
        .map(|c| ident(c))
        .collect::<Result<Vec<_>, _>>()?;
    let mut sql = format!("SELECT {} FROM {}", columns.join(", "), table);
    if !predicate.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&assignments(predicate, 1, " AND ")?);
    }
    if !order.is_empty() {
        let terms = order
            .iter()
            .map(|o| match o {
                Order::Asc(c) => ident(c).map(|c| format!("{} ASC", c)),
                Order::Desc(c) => ident(c).map(|c| format!("{} DESC", c)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        sql.push_str(" ORDER BY ");
        sql.push_str(&terms.join(", "));
    }
    sql.push_str(" LIMIT 1");
    log::debug!("{}", sql);
    Ok(conn.query_row(&sql, values(&[predicate]).as_slice(), map).optional()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT NOT NULL, state TEXT NOT NULL, rank INTEGER);
             CREATE TABLE notes (item_id INTEGER PRIMARY KEY, body TEXT NOT NULL);",
        )
        .unwrap();
        conn
    }

    fn name_of(conn: &Connection, id: i64) -> Option<String> {
        select_one(conn, "items", &["name"], &[("id", &id)], &[], |r| r.get(0)).unwrap()
    }

    #[test]
    fn insert_binds_hostile_values_verbatim() {
        let conn = conn();
        let hostile = "x'); DROP TABLE items; --";
        let id = insert(&conn, "items", &[("name", &hostile), ("state", &"new")]).unwrap();
        assert_eq!(name_of(&conn, id).as_deref(), Some(hostile));
    }

    #[test]
    fn identifiers_are_validated() {
        let conn = conn();
        let err = insert(&conn, "items; DROP TABLE items", &[("name", &"a")]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidIdentifier(_)));
        let err = select_one(&conn, "items", &["name"], &[("1=1 OR name", &"a")], &[], |r| {
            r.get::<_, String>(0)
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidIdentifier(_)));
    }

    #[test]
    fn update_if_only_touches_matching_rows() {
        let conn = conn();
        let id = insert(&conn, "items", &[("name", &"a"), ("state", &"new")]).unwrap();

        let changed = update_if(&conn, "items", id, &[("state", &"new")], &[("state", &"taken")]).unwrap();
        assert_eq!(changed, 1);
        let changed = update_if(&conn, "items", id, &[("state", &"new")], &[("state", &"again")]).unwrap();
        assert_eq!(changed, 0);

        let state: Option<String> =
            select_one(&conn, "items", &["state"], &[("id", &id)], &[], |r| r.get(0)).unwrap();
        assert_eq!(state.as_deref(), Some("taken"));
        assert_eq!(update(&conn, "items", 999, &[("name", &"z")]).unwrap(), 0);
    }

    #[test]
    fn select_one_honours_order() {
        let conn = conn();
        insert(&conn, "items", &[("name", &"late"), ("state", &"new"), ("rank", &2)]).unwrap();
        insert(&conn, "items", &[("name", &"early"), ("state", &"new"), ("rank", &1)]).unwrap();
        insert(&conn, "items", &[("name", &"done"), ("state", &"old"), ("rank", &0)]).unwrap();

        let first: Option<String> = select_one(
            &conn,
            "items",
            &["name"],
            &[("state", &"new")],
            &[Order::Asc("rank"), Order::Asc("id")],
            |r| r.get(0),
        )
        .unwrap();
        assert_eq!(first.as_deref(), Some("early"));

        let last: Option<String> =
            select_one(&conn, "items", &["name"], &[], &[Order::Desc("rank")], |r| r.get(0)).unwrap();
        assert_eq!(last.as_deref(), Some("late"));

        let none: Option<String> =
            select_one(&conn, "items", &["name"], &[("state", &"gone")], &[], |r| r.get(0)).unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn upsert_replaces_by_key() {
        let conn = conn();
        upsert(&conn, "notes", "item_id", &[("item_id", &1), ("body", &"first")]).unwrap();
        upsert(&conn, "notes", "item_id", &[("item_id", &1), ("body", &"second")]).unwrap();

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM notes", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
        let body: Option<String> =
            select_one(&conn, "notes", &["body"], &[("item_id", &1)], &[], |r| r.get(0)).unwrap();
        assert_eq!(body.as_deref(), Some("second"));
    }
}
