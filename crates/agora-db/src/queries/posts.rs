use anyhow::Result;
use rusqlite::{Connection, Params};

use super::tags::attach_tags;
use super::{OptionalExt, id_params, placeholders};
use crate::Database;
use crate::models::{PostImageRow, PostRow};

// JOIN topic and author to fetch display names in a single query (no N+1)
const POST_SELECT: &str = "
    SELECT p.id, p.title, p.content, p.topic_id, t.name, p.user_id, u.username, p.link, p.created_at,
           (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id)
    FROM posts p
    JOIN topics t ON t.id = p.topic_id
    LEFT JOIN users u ON u.id = p.user_id";

pub struct NewPost<'a> {
    pub topic_id: i64,
    pub user_id: i64,
    pub title: &'a str,
    pub content: &'a str,
    pub tags: &'a [String],
}

impl Database {
    /// Insert a post with its tags. `link` receives the
    /// new post id and returns the permalink stored alongside it.
    pub fn create_post<F>(&self, post: NewPost<'_>, link: F) -> Result<i64>
    where
        F: FnOnce(i64) -> String,
    {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (topic_id, user_id, title, content) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![post.topic_id, post.user_id, post.title, post.content],
            )?;
            let id = conn.last_insert_rowid();

            conn.execute("UPDATE posts SET link = ?2 WHERE id = ?1", rusqlite::params![id, link(id)])?;
            attach_tags(conn, id, post.tags)?;
            Ok(id)
        })
    }

    /// Overwrite title, content and topic. When `tags` is given the post's
    /// tag set is replaced. Returns false if the post does not exist.
    pub fn update_post(
        &self,
        id: i64,
        topic_id: i64,
        title: &str,
        content: &str,
        tags: Option<&[String]>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE posts SET topic_id = ?2, title = ?3, content = ?4 WHERE id = ?1",
                rusqlite::params![id, topic_id, title, content],
            )?;
            if changed == 0 {
                return Ok(false);
            }

            if let Some(tags) = tags {
                conn.execute("DELETE FROM post_tags WHERE post_id = ?1", [id])?;
                attach_tags(conn, id, tags)?;
            }
            Ok(true)
        })
    }

    pub fn delete_post(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    pub fn get_post(&self, id: i64) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE p.id = ?1", POST_SELECT);
            conn.query_row(&sql, [id], map_post).optional()
        })
    }

    pub fn list_posts(&self, limit: u32, offset: u32) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                "ORDER BY p.created_at DESC, p.id DESC LIMIT ?1 OFFSET ?2",
                rusqlite::params![limit, offset],
            )
        })
    }

    pub fn count_posts(&self) -> Result<i64> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?))
    }

    pub fn list_posts_by_topic(&self, topic_id: i64, limit: u32, offset: u32) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                "WHERE p.topic_id = ?1 ORDER BY p.created_at DESC, p.id DESC LIMIT ?2 OFFSET ?3",
                rusqlite::params![topic_id, limit, offset],
            )
        })
    }

    pub fn list_posts_by_user(&self, user_id: i64, limit: u32, offset: u32) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                "WHERE p.user_id = ?1 ORDER BY p.created_at DESC, p.id DESC LIMIT ?2 OFFSET ?3",
                rusqlite::params![user_id, limit, offset],
            )
        })
    }

    /// Most-reacted posts first.
    pub fn popular_posts(&self, count: u32) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                "ORDER BY (SELECT COUNT(*) FROM reactions r WHERE r.post_id = p.id) DESC, p.id DESC
                 LIMIT ?1",
                [count],
            )
        })
    }

    pub fn search_posts(&self, title: &str, limit: u32, offset: u32) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                "WHERE p.title LIKE '%' || ?1 || '%' ESCAPE '\\'
                 ORDER BY p.created_at DESC, p.id DESC LIMIT ?2 OFFSET ?3",
                rusqlite::params![escape_like(title), limit, offset],
            )
        })
    }

    /// Append an image URL after the post's existing images.
    pub fn add_post_image(&self, post_id: i64, url: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO post_images (post_id, position, url)
                 VALUES (?1, (SELECT COALESCE(MAX(position), -1) + 1 FROM post_images WHERE post_id = ?1), ?2)",
                rusqlite::params![post_id, url],
            )?;
            Ok(())
        })
    }

    /// Batch-fetch images for a set of post IDs, in upload order.
    pub fn get_images_for_posts(&self, post_ids: &[i64]) -> Result<Vec<PostImageRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT post_id, url FROM post_images WHERE post_id IN ({}) ORDER BY post_id, position",
                placeholders(post_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(id_params(post_ids).as_slice(), |row| {
                    Ok(PostImageRow {
                        post_id: row.get(0)?,
                        url: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_posts<P: Params>(conn: &Connection, tail: &str, params: P) -> Result<Vec<PostRow>> {
    let sql = format!("{} {}", POST_SELECT, tail);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, map_post)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        topic_id: row.get(3)?,
        topic_name: row.get(4)?,
        user_id: row.get(5)?,
        username: row.get::<_, Option<String>>(6)?.unwrap_or_else(|| "unknown".to_string()),
        link: row.get(7)?,
        created_at: row.get(8)?,
        comment_count: row.get(9)?,
    })
}

/// Makes `%`, `_` and `\` in user input match literally under `ESCAPE '\'`.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::{NewPost, escape_like};
    use crate::Database;

    fn seed_user(db: &Database) -> i64 {
        db.create_user("ann", "ann@example.com", "hash", "user").unwrap()
    }

    #[test]
    fn create_post_stores_link_and_tags() {
        let db = Database::open_in_memory().unwrap();
        let user = seed_user(&db);
        let tags = vec!["rust".to_string(), " ".to_string(), "rust".to_string(), "sql".to_string()];

        let id = db
            .create_post(
                NewPost { topic_id: 2, user_id: user, title: "Hello", content: "World", tags: &tags },
                |id| format!("/posts/{}", id),
            )
            .unwrap();

        let post = db.get_post(id).unwrap().unwrap();
        assert_eq!(post.link, format!("/posts/{}", id));
        assert_eq!(post.topic_name, "Technology");
        assert_eq!(post.username, "ann");

        let names: Vec<String> = db.get_tags_for_posts(&[id]).unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["rust", "sql"]);
    }

    #[test]
    fn update_replaces_tag_set_only_when_given() {
        let db = Database::open_in_memory().unwrap();
        let user = seed_user(&db);
        let tags = vec!["a".to_string(), "b".to_string()];
        let id = db
            .create_post(NewPost { topic_id: 1, user_id: user, title: "t", content: "c", tags: &tags }, |_| String::new())
            .unwrap();

        assert!(db.update_post(id, 1, "t2", "c2", None).unwrap());
        assert_eq!(db.get_tags_for_posts(&[id]).unwrap().len(), 2);

        let replaced = vec!["c".to_string()];
        assert!(db.update_post(id, 1, "t3", "c3", Some(replaced.as_slice())).unwrap());
        let names: Vec<String> = db.get_tags_for_posts(&[id]).unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["c"]);

        assert!(!db.update_post(id + 100, 1, "x", "y", None).unwrap());
    }

    #[test]
    fn images_keep_upload_order() {
        let db = Database::open_in_memory().unwrap();
        let user = seed_user(&db);
        let id = db
            .create_post(NewPost { topic_id: 1, user_id: user, title: "t", content: "c", tags: &[] }, |_| String::new())
            .unwrap();

        db.add_post_image(id, "/images/1.png").unwrap();
        db.add_post_image(id, "/images/2.png").unwrap();

        let urls: Vec<String> = db.get_images_for_posts(&[id]).unwrap().into_iter().map(|i| i.url).collect();
        assert_eq!(urls, vec!["/images/1.png", "/images/2.png"]);
    }

    #[test]
    fn search_matches_title_substring() {
        let db = Database::open_in_memory().unwrap();
        let user = seed_user(&db);
        for title in ["Learning Rust", "Cooking pasta", "Rust in production"] {
            db.create_post(NewPost { topic_id: 1, user_id: user, title, content: "c", tags: &[] }, |_| String::new())
                .unwrap();
        }

        let found = db.search_posts("Rust", 10, 0).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(db.count_posts().unwrap(), 3);
    }

    #[test]
    fn search_treats_wildcards_literally() {
        let db = Database::open_in_memory().unwrap();
        let user = seed_user(&db);
        for title in ["100% Rust", "snake_case names", "Plain title"] {
            db.create_post(NewPost { topic_id: 1, user_id: user, title, content: "c", tags: &[] }, |_| String::new())
                .unwrap();
        }

        let percent = db.search_posts("%", 10, 0).unwrap();
        assert_eq!(percent.len(), 1);
        assert_eq!(percent[0].title, "100% Rust");

        let underscore = db.search_posts("_", 10, 0).unwrap();
        assert_eq!(underscore.len(), 1);
        assert_eq!(underscore[0].title, "snake_case names");

        assert!(db.search_posts("\\", 10, 0).unwrap().is_empty());
        assert_eq!(escape_like(r"50%_a\b"), r"50\%\_a\\b");
    }
}
