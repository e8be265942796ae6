use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, ToSql};

use crate::models::{
    ArticleRow, Column, CommentField, CommentRow, Direction, Entity, Owned, UserField, UserRow,
};
use crate::{Database, Result, format_timestamp};

impl Database {
    // -- Generic --

    pub fn get_by_id<E: Entity>(&self, id: i64) -> Result<Option<E>> {
        self.with_conn(|conn| get_by_id(conn, id))
    }

    pub fn find_by<E: Entity>(
        &self,
        field: E::Field,
        value: &dyn ToSql,
        order_by: E::Field,
        direction: Direction,
    ) -> Result<Vec<E>> {
        self.with_conn(|conn| find_by(conn, field, value, order_by, direction))
    }

    pub fn list_all<E: Entity>(&self, order_by: E::Field, direction: Direction) -> Result<Vec<E>> {
        self.with_conn(|conn| list_all(conn, order_by, direction))
    }

    pub fn find_by_owner<E: Owned>(&self, user_id: i64) -> Result<Vec<E>> {
        self.with_conn(|conn| find_by_owner(conn, user_id))
    }

    pub fn count<E: Entity>(&self) -> Result<i64> {
        self.with_conn(count::<E>)
    }

    // -- Users --

    pub fn insert_user(&self, username: &str, email: &str, password_hash: &str) -> Result<i64> {
        self.with_tx(|conn| insert_user(conn, username, email, password_hash))
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| find_user_by_email(conn, email))
    }

    // -- Articles --

    pub fn insert_article(
        &self,
        user_id: i64,
        title: &str,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        self.with_tx(|conn| insert_article(conn, user_id, title, body, now))
    }

    pub fn update_article(&self, id: i64, title: &str, body: &str) -> Result<bool> {
        self.with_tx(|conn| update_article(conn, id, title, body))
    }

    // -- Comments --

    pub fn insert_comment(
        &self,
        user_id: i64,
        article_id: i64,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        self.with_tx(|conn| insert_comment(conn, user_id, article_id, body, now))
    }

    pub fn find_comments_by_article(&self, article_id: i64) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| find_comments_by_article(conn, article_id))
    }
}

pub fn get_by_id<E: Entity>(conn: &Connection, id: i64) -> Result<Option<E>> {
    let sql = format!("SELECT {} FROM {} WHERE id = ?1", E::COLUMNS, E::TABLE);
    let row = conn.query_row(&sql, [id], E::from_row).optional()?;
    Ok(row)
}

/// Rows whose `field` equals `value`, ordered by `order_by` with `id` as tie-breaker.
pub fn find_by<E: Entity>(
    conn: &Connection,
    field: E::Field,
    value: &dyn ToSql,
    order_by: E::Field,
    direction: Direction,
) -> Result<Vec<E>> {
    let sql = format!(
        "SELECT {cols} FROM {table} WHERE {field} = ?1 ORDER BY {order} {dir}, id {dir}",
        cols = E::COLUMNS,
        table = E::TABLE,
        field = field.name(),
        order = order_by.name(),
        dir = direction.as_sql(),
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([value], E::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

pub fn list_all<E: Entity>(
    conn: &Connection,
    order_by: E::Field,
    direction: Direction,
) -> Result<Vec<E>> {
    let sql = format!(
        "SELECT {cols} FROM {table} ORDER BY {order} {dir}, id {dir}",
        cols = E::COLUMNS,
        table = E::TABLE,
        order = order_by.name(),
        dir = direction.as_sql(),
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], E::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Newest first.
pub fn find_by_owner<E: Owned>(conn: &Connection, user_id: i64) -> Result<Vec<E>> {
    find_by(conn, E::OWNER, &user_id, E::CREATED_AT, Direction::Desc)
}

pub fn count<E: Entity>(conn: &Connection) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", E::TABLE);
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}

pub fn insert_user(
    conn: &Connection,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO users (username, email, password) VALUES (?1, ?2, ?3)",
        (username, email, password_hash),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    let rows = find_by::<UserRow>(conn, UserField::Email, &email, UserField::Id, Direction::Asc)?;
    Ok(rows.into_iter().next())
}

pub fn insert_article(
    conn: &Connection,
    user_id: i64,
    title: &str,
    body: &str,
    now: DateTime<Utc>,
) -> Result<i64> {
    let created_at = next_timestamp(conn, ArticleRow::TABLE, now)?;
    conn.execute(
        "INSERT INTO articles (title, body, created_at, user_id) VALUES (?1, ?2, ?3, ?4)",
        (title, body, &created_at, user_id),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_article(conn: &Connection, id: i64, title: &str, body: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE articles SET title = ?1, body = ?2 WHERE id = ?3",
        (title, body, id),
    )?;
    Ok(changed > 0)
}

pub fn insert_comment(
    conn: &Connection,
    user_id: i64,
    article_id: i64,
    body: &str,
    now: DateTime<Utc>,
) -> Result<i64> {
    let created_at = next_timestamp(conn, CommentRow::TABLE, now)?;
    conn.execute(
        "INSERT INTO comments (body, created_at, user_id, article_id) VALUES (?1, ?2, ?3, ?4)",
        (body, &created_at, user_id, article_id),
    )?;
    Ok(conn.last_insert_rowid())
}

/// Oldest first, the order a thread is read in.
pub fn find_comments_by_article(conn: &Connection, article_id: i64) -> Result<Vec<CommentRow>> {
    find_by(
        conn,
        CommentField::ArticleId,
        &article_id,
        CommentField::CreatedAt,
        Direction::Asc,
    )
}

/// Creation timestamps never go backwards within a table, even if the wall
/// clock does.
fn next_timestamp(conn: &Connection, table: &str, now: DateTime<Utc>) -> Result<String> {
    let latest: Option<String> = conn.query_row(
        &format!("SELECT MAX(created_at) FROM {table}"),
        [],
        |row| row.get(0),
    )?;

    let now = format_timestamp(now);
    Ok(match latest {
        Some(latest) if latest > now => latest,
        _ => now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbError;
    use crate::models::ArticleField;
    use chrono::{Duration, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn db_with_user() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_user("alice", "alice@example.com", "hash").unwrap();
        (db, id)
    }

    #[test]
    fn get_by_id_missing_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_by_id::<UserRow>(42).unwrap().is_none());
        assert!(db.get_by_id::<ArticleRow>(42).unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_constraint_violation() {
        let (db, _) = db_with_user();
        let err = db.insert_user("bob", "alice@example.com", "hash").unwrap_err();
        match err {
            DbError::ConstraintViolation { column } => assert_eq!(column, "email"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(db.count::<UserRow>().unwrap(), 1);
    }

    #[test]
    fn duplicate_username_is_constraint_violation() {
        let (db, _) = db_with_user();
        let err = db.insert_user("alice", "other@example.com", "hash").unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation { ref column } if column == "username"));
    }

    #[test]
    fn article_requires_existing_user() {
        let db = Database::open_in_memory().unwrap();
        let err = db.insert_article(99, "T", "B", t(0)).unwrap_err();
        assert!(matches!(err, DbError::ForeignKey));
        assert_eq!(db.count::<ArticleRow>().unwrap(), 0);
    }

    #[test]
    fn comment_requires_existing_article() {
        let (db, uid) = db_with_user();
        let err = db.insert_comment(uid, 7, "hi", t(0)).unwrap_err();
        assert!(matches!(err, DbError::ForeignKey));
    }

    #[test]
    fn timestamps_are_clamped_monotonic() {
        let (db, uid) = db_with_user();
        let first = db.insert_article(uid, "first", "b", t(10)).unwrap();
        let second = db.insert_article(uid, "second", "b", t(5)).unwrap();

        let a = db.get_by_id::<ArticleRow>(first).unwrap().unwrap();
        let b = db.get_by_id::<ArticleRow>(second).unwrap().unwrap();
        assert_eq!(a.created_at, t(10));
        assert!(b.created_at >= a.created_at);
    }

    #[test]
    fn list_all_is_ordered_regardless_of_insert_order() {
        let (db, uid) = db_with_user();
        // Bypass the clamp to simulate rows written out of order.
        db.with_conn(|conn| {
            for (title, secs) in [("mid", 20), ("old", 0), ("new", 40), ("older", -5)] {
                conn.execute(
                    "INSERT INTO articles (title, body, created_at, user_id) VALUES (?1, 'b', ?2, ?3)",
                    (title, format_timestamp(t(secs)), uid),
                )?;
            }
            Ok::<_, DbError>(())
        })
        .unwrap();

        let rows = db.list_all::<ArticleRow>(ArticleField::CreatedAt, Direction::Desc).unwrap();
        let titles: Vec<_> = rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["new", "mid", "old", "older"]);
        assert!(rows.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[test]
    fn update_article_reports_missing_rows() {
        let (db, uid) = db_with_user();
        let id = db.insert_article(uid, "T", "B", t(0)).unwrap();

        assert!(db.update_article(id, "T2", "B2").unwrap());
        assert!(!db.update_article(id + 100, "x", "y").unwrap());

        let row = db.get_by_id::<ArticleRow>(id).unwrap().unwrap();
        assert_eq!((row.title.as_str(), row.body.as_str()), ("T2", "B2"));
    }

    #[test]
    fn comments_by_article_are_ascending() {
        let (db, uid) = db_with_user();
        let article = db.insert_article(uid, "T", "B", t(0)).unwrap();
        let other = db.insert_article(uid, "T", "B", t(1)).unwrap();
        db.insert_comment(uid, article, "one", t(2)).unwrap();
        db.insert_comment(uid, other, "elsewhere", t(3)).unwrap();
        db.insert_comment(uid, article, "two", t(4)).unwrap();

        let bodies: Vec<_> = db
            .find_comments_by_article(article)
            .unwrap()
            .into_iter()
            .map(|c| c.body)
            .collect();
        assert_eq!(bodies, ["one", "two"]);
    }

    #[test]
    fn find_by_owner_filters_by_user() {
        let (db, alice) = db_with_user();
        let bob = db.insert_user("bob", "bob@example.com", "hash").unwrap();
        db.insert_article(alice, "a1", "b", t(0)).unwrap();
        db.insert_article(bob, "b1", "b", t(1)).unwrap();
        db.insert_article(alice, "a2", "b", t(2)).unwrap();

        let titles: Vec<_> = db
            .find_by_owner::<ArticleRow>(alice)
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, ["a2", "a1"]);
    }

    #[test]
    fn failed_transaction_leaves_nothing_behind() {
        let (db, uid) = db_with_user();
        let result = db.with_tx(|conn| {
            insert_article(conn, uid, "T", "B", t(0))?;
            insert_user(conn, "alice", "dup@example.com", "hash")
        });

        assert!(result.is_err());
        assert_eq!(db.count::<ArticleRow>().unwrap(), 0);
    }

    #[test]
    fn find_user_by_email_matches_exactly() {
        let (db, uid) = db_with_user();
        assert_eq!(db.find_user_by_email("alice@example.com").unwrap().unwrap().id, uid);
        assert!(db.find_user_by_email("ALICE@example.com").unwrap().is_none());
    }
}
