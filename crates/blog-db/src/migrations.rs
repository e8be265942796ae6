use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users, articles, comments)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          INTEGER PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL
            );

            CREATE TABLE articles (
                id          INTEGER PRIMARY KEY,
                title       TEXT NOT NULL,
                body        TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                user_id     INTEGER NOT NULL REFERENCES users(id)
            );

            CREATE INDEX idx_articles_created ON articles(created_at);
            CREATE INDEX idx_articles_user ON articles(user_id);

            CREATE TABLE comments (
                id          INTEGER PRIMARY KEY,
                body        TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                user_id     INTEGER NOT NULL REFERENCES users(id),
                article_id  INTEGER NOT NULL REFERENCES articles(id)
            );

            CREATE INDEX idx_comments_article ON comments(article_id, created_at);
            CREATE INDEX idx_comments_created ON comments(created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
