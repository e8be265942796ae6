use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info, warn};

use blog_db::models::{ArticleField, ArticleRow, CommentField, CommentRow, Direction, UserRow};
use blog_db::{Connection, Database, queries};
use blog_types::api::ArticleDetail;
use blog_types::models::{Article, Comment, User};

use crate::credentials;
use crate::error::{BlogError, Result};
use crate::session::{SessionManager, SessionToken, UserId};

const MAX_USERNAME_LEN: usize = 50;
const MAX_EMAIL_LEN: usize = 100;
const MAX_TITLE_LEN: usize = 100;

/// The blog's use cases. Each operation is one transaction against the store.
pub struct BlogService {
    db: Database,
    sessions: SessionManager,
}

impl BlogService {
    pub fn new(db: Database, sessions: SessionManager) -> Self {
        Self { db, sessions }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    // -- Accounts --

    pub fn register(&self, username: &str, email: &str, password: &str) -> Result<UserRow> {
        require("Username", username, Some(MAX_USERNAME_LEN))?;
        require("Email", email, Some(MAX_EMAIL_LEN))?;
        require("Password", password, None)?;

        // Hash before taking the store lock.
        let password_hash = credentials::hash_password(password)?;
        let id = self.db.insert_user(username, email, &password_hash)?;

        info!("Registered user {} (id {})", username, id);
        Ok(UserRow {
            id,
            username: username.to_string(),
            email: email.to_string(),
            password: password_hash,
        })
    }

    pub fn login(&self, email: &str, password: &str) -> Result<(UserRow, SessionToken)> {
        let user = self
            .db
            .find_user_by_email(email)?
            .ok_or(BlogError::AuthenticationFailed)?;

        if !credentials::verify_password(password, &user.password) {
            warn!("Failed login for user {}", user.id);
            return Err(BlogError::AuthenticationFailed);
        }

        let token = self.sessions.establish(user.id);
        info!("User {} logged in", user.username);
        Ok((user, token))
    }

    /// Whether a live session was closed. Unknown or expired tokens are a no-op.
    pub fn logout(&self, token: &str) -> bool {
        let live = self.sessions.is_authenticated(token);
        self.sessions.terminate(token);
        live
    }

    /// The user bound to `token`, if the session is live.
    pub fn current_user(&self, token: &str) -> Result<Option<UserRow>> {
        match self.sessions.current_identity(token) {
            Some(id) => Ok(self.db.get_by_id::<UserRow>(id)?),
            None => Ok(None),
        }
    }

    // -- Articles --

    /// Newest first.
    pub fn list_articles(&self) -> Result<Vec<Article>> {
        self.db.with_conn(|conn| {
            let rows =
                queries::list_all::<ArticleRow>(conn, ArticleField::CreatedAt, Direction::Desc)?;
            let mut authors = Authors::default();
            rows.into_iter()
                .map(|row| {
                    let author = authors.resolve(conn, row.user_id)?;
                    Ok(article_view(row, author))
                })
                .collect()
        })
    }

    pub fn create_article(&self, owner: UserId, title: &str, body: &str) -> Result<ArticleRow> {
        validate_article(title, body)?;

        let article = self.db.with_tx(|conn| {
            let id = queries::insert_article(conn, owner, title, body, Utc::now())?;
            queries::get_by_id::<ArticleRow>(conn, id)?.ok_or(BlogError::NotFound("Article"))
        })?;

        info!("User {} posted article {}", owner, article.id);
        Ok(article)
    }

    /// The article as it should prefill the edit form. Only its owner may see it.
    pub fn article_for_edit(&self, caller: UserId, id: i64) -> Result<Article> {
        self.db.with_conn(|conn| {
            let row = owned_article(conn, caller, id)?;
            let author = Authors::default().resolve(conn, row.user_id)?;
            Ok(article_view(row, author))
        })
    }

    pub fn edit_article(
        &self,
        caller: UserId,
        id: i64,
        title: &str,
        body: &str,
    ) -> Result<ArticleRow> {
        let article = self.db.with_tx(|conn| {
            owned_article(conn, caller, id)?;
            validate_article(title, body)?;
            queries::update_article(conn, id, title, body)?;
            queries::get_by_id::<ArticleRow>(conn, id)?.ok_or(BlogError::NotFound("Article"))
        })?;

        info!("User {} edited article {}", caller, id);
        Ok(article)
    }

    /// The article with its comments, oldest comment first.
    pub fn view_article(&self, id: i64) -> Result<ArticleDetail> {
        self.db.with_conn(|conn| {
            let row = queries::get_by_id::<ArticleRow>(conn, id)?
                .ok_or(BlogError::NotFound("Article"))?;

            let mut authors = Authors::default();
            let comments = queries::find_comments_by_article(conn, id)?
                .into_iter()
                .map(|c| {
                    let author = authors.resolve(conn, c.user_id)?;
                    Ok(comment_view(c, author))
                })
                .collect::<Result<Vec<_>>>()?;

            let author = authors.resolve(conn, row.user_id)?;
            Ok(ArticleDetail {
                article: article_view(row, author),
                comments,
            })
        })
    }

    // -- Comments --

    /// Anonymous submissions are dropped without error: `Ok(None)` and nothing stored.
    /// A missing article is still reported, whoever asks.
    pub fn add_comment(
        &self,
        caller: Option<UserId>,
        article_id: i64,
        body: &str,
    ) -> Result<Option<CommentRow>> {
        self.db.with_tx(|conn| {
            if queries::get_by_id::<ArticleRow>(conn, article_id)?.is_none() {
                return Err(BlogError::NotFound("Article"));
            }

            let Some(user_id) = caller else {
                debug!("Ignoring anonymous comment on article {}", article_id);
                return Ok(None);
            };

            require("Comment", body, None)?;

            let id = queries::insert_comment(conn, user_id, article_id, body, Utc::now())?;
            let comment = queries::get_by_id::<CommentRow>(conn, id)?;
            info!("User {} commented on article {}", user_id, article_id);
            Ok(comment)
        })
    }

    /// Every comment on the site, newest first.
    pub fn list_comments(&self) -> Result<Vec<Comment>> {
        self.db.with_conn(|conn| {
            let rows =
                queries::list_all::<CommentRow>(conn, CommentField::CreatedAt, Direction::Desc)?;
            let mut authors = Authors::default();
            rows.into_iter()
                .map(|row| {
                    let author = authors.resolve(conn, row.user_id)?;
                    Ok(comment_view(row, author))
                })
                .collect()
        })
    }
}

fn owned_article(conn: &Connection, caller: UserId, id: i64) -> Result<ArticleRow> {
    let row = queries::get_by_id::<ArticleRow>(conn, id)?.ok_or(BlogError::NotFound("Article"))?;
    if row.user_id != caller {
        warn!("User {} tried to edit article {} owned by {}", caller, id, row.user_id);
        return Err(BlogError::Forbidden);
    }
    Ok(row)
}

fn require(field: &str, value: &str, max_len: Option<usize>) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BlogError::ValidationFailed(format!("{field} must not be empty.")));
    }
    if let Some(max) = max_len {
        if value.chars().count() > max {
            return Err(BlogError::ValidationFailed(format!(
                "{field} must be at most {max} characters."
            )));
        }
    }
    Ok(())
}

fn validate_article(title: &str, body: &str) -> Result<()> {
    require("Title", title, Some(MAX_TITLE_LEN))?;
    require("Body", body, None)
}

/// Per-request lookup of authors, so a page touches each user row once.
#[derive(Default)]
struct Authors(HashMap<UserId, User>);

impl Authors {
    fn resolve(&mut self, conn: &Connection, user_id: UserId) -> Result<User> {
        if let Some(user) = self.0.get(&user_id) {
            return Ok(user.clone());
        }

        let user = match queries::get_by_id::<UserRow>(conn, user_id)? {
            Some(row) => User {
                id: row.id,
                username: row.username,
            },
            None => {
                warn!("Author {} is missing", user_id);
                User {
                    id: user_id,
                    username: "unknown".to_string(),
                }
            }
        };

        self.0.insert(user_id, user.clone());
        Ok(user)
    }
}

fn article_view(row: ArticleRow, author: User) -> Article {
    Article {
        id: row.id,
        title: row.title,
        body: row.body,
        created_at: row.created_at,
        author,
    }
}

fn comment_view(row: CommentRow, author: User) -> Comment {
    Comment {
        id: row.id,
        article_id: row.article_id,
        body: row.body,
        created_at: row.created_at,
        author,
    }
}
