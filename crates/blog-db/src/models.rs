//! Database row types. These map directly to SQLite rows and stay independent
//! of the view models in `blog-types`.

use std::fmt;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

use crate::parse_timestamp;

/// A table that can be read through the generic queries in [`crate::queries`].
pub trait Entity: Sized {
    const TABLE: &'static str;
    /// Column list in the order `from_row` reads them.
    const COLUMNS: &'static str;

    type Field: Column;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// A queryable column of an [`Entity`].
pub trait Column: Copy {
    fn name(self) -> &'static str;
}

/// Entities that carry an owning user and a creation timestamp.
pub trait Owned: Entity {
    const OWNER: Self::Field;
    const CREATED_AT: Self::Field;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// PHC-format password hash.
    pub password: String,
}

impl fmt::Debug for UserRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRow")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    Id,
    Username,
    Email,
}

impl Column for UserField {
    fn name(self) -> &'static str {
        match self {
            UserField::Id => "id",
            UserField::Username => "username",
            UserField::Email => "email",
        }
    }
}

impl Entity for UserRow {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static str = "id, username, email, password";
    type Field = UserField;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(UserRow {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password: row.get(3)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArticleRow {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub user_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleField {
    Id,
    Title,
    CreatedAt,
    UserId,
}

impl Column for ArticleField {
    fn name(self) -> &'static str {
        match self {
            ArticleField::Id => "id",
            ArticleField::Title => "title",
            ArticleField::CreatedAt => "created_at",
            ArticleField::UserId => "user_id",
        }
    }
}

impl Entity for ArticleRow {
    const TABLE: &'static str = "articles";
    const COLUMNS: &'static str = "id, title, body, created_at, user_id";
    type Field = ArticleField;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ArticleRow {
            id: row.get(0)?,
            title: row.get(1)?,
            body: row.get(2)?,
            created_at: timestamp_at(row, 3)?,
            user_id: row.get(4)?,
        })
    }
}

impl Owned for ArticleRow {
    const OWNER: ArticleField = ArticleField::UserId;
    const CREATED_AT: ArticleField = ArticleField::CreatedAt;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentRow {
    pub id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub user_id: i64,
    pub article_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentField {
    Id,
    CreatedAt,
    UserId,
    ArticleId,
}

impl Column for CommentField {
    fn name(self) -> &'static str {
        match self {
            CommentField::Id => "id",
            CommentField::CreatedAt => "created_at",
            CommentField::UserId => "user_id",
            CommentField::ArticleId => "article_id",
        }
    }
}

impl Entity for CommentRow {
    const TABLE: &'static str = "comments";
    const COLUMNS: &'static str = "id, body, created_at, user_id, article_id";
    type Field = CommentField;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(CommentRow {
            id: row.get(0)?,
            body: row.get(1)?,
            created_at: timestamp_at(row, 2)?,
            user_id: row.get(3)?,
            article_id: row.get(4)?,
        })
    }
}

impl Owned for CommentRow {
    const OWNER: CommentField = CommentField::UserId;
    const CREATED_AT: CommentField = CommentField::CreatedAt;
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
