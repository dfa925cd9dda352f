use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial forum schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                          INTEGER PRIMARY KEY AUTOINCREMENT,
                username                    TEXT NOT NULL UNIQUE,
                email                       TEXT NOT NULL,
                email_key                   TEXT NOT NULL UNIQUE,
                password                    TEXT NOT NULL,
                role                        TEXT NOT NULL DEFAULT 'user',
                image_url                   TEXT,
                refresh_token               TEXT,
                refresh_token_expires_at    TEXT,
                created_at                  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE topics (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                description TEXT,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE posts (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT NOT NULL,
                content     TEXT NOT NULL,
                topic_id    INTEGER NOT NULL REFERENCES topics(id) ON DELETE CASCADE,
                user_id     INTEGER NOT NULL REFERENCES users(id),
                link        TEXT NOT NULL DEFAULT '',
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_posts_topic ON posts(topic_id, created_at);
            CREATE INDEX idx_posts_user ON posts(user_id, created_at);

            CREATE TABLE post_images (
                post_id     INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                position    INTEGER NOT NULL,
                url         TEXT NOT NULL,
                PRIMARY KEY (post_id, position)
            );

            CREATE TABLE comments (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                content     TEXT NOT NULL,
                post_id     INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                user_id     INTEGER NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_comments_post ON comments(post_id, created_at);

            CREATE TABLE tags (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                name    TEXT NOT NULL UNIQUE
            );

            CREATE TABLE post_tags (
                post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                tag_id  INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (post_id, tag_id)
            );

            CREATE TABLE reactions (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL REFERENCES users(id),
                post_id     INTEGER REFERENCES posts(id) ON DELETE CASCADE,
                comment_id  INTEGER REFERENCES comments(id) ON DELETE CASCADE,
                type        TEXT NOT NULL CHECK (type IN ('like', 'dislike')),
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                CHECK ((post_id IS NULL) <> (comment_id IS NULL))
            );

            -- One reaction per (user, target)
            CREATE UNIQUE INDEX idx_reactions_user_post
                ON reactions(user_id, post_id) WHERE post_id IS NOT NULL;
            CREATE UNIQUE INDEX idx_reactions_user_comment
                ON reactions(user_id, comment_id) WHERE comment_id IS NOT NULL;

            CREATE TABLE email_queue (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                queue       TEXT NOT NULL,
                payload     TEXT NOT NULL,
                enqueued_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_email_queue_name ON email_queue(queue, id);

            INSERT INTO topics (name) VALUES
                ('Sport'),
                ('Technology'),
                ('Self-Development'),
                ('Health & Wellness'),
                ('Finance'),
                ('Education'),
                ('Travel'),
                ('Productivity'),
                ('Books & Literature'),
                ('Entertainment');

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
