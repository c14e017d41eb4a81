use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};

use super::{HistoryPolicy, Store};
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a throwaway in-memory database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Maps unique-constraint violations to `Conflict`; everything else passes
/// through as a store error.
fn map_constraint(e: rusqlite::Error, what: &str) -> Error {
    if let rusqlite::Error::SqliteFailure(inner, _) = &e {
        if inner.code == ErrorCode::ConstraintViolation {
            return Error::Conflict(format!("{what} already exists"));
        }
    }
    Error::Store(e)
}

fn identity_from_row(row: &Row<'_>) -> rusqlite::Result<Identity> {
    Ok(Identity {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        full_name: row.get(3)?,
        password_hash: row.get(4)?,
        avatar_url: row.get(5)?,
        cover_url: row.get(6)?,
        refresh_token: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
        updated_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

const IDENTITY_COLS: &str = "id, username, email, full_name, password_hash, \
                             avatar_url, cover_url, refresh_token, created_at, updated_at";

fn video_from_row(row: &Row<'_>) -> rusqlite::Result<Video> {
    Ok(Video {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        video_url: row.get(4)?,
        thumbnail_url: row.get(5)?,
        views: row.get(6)?,
        published: row.get::<_, i64>(7)? != 0,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

const VIDEO_COLS: &str =
    "id, owner_id, title, description, video_url, thumbnail_url, views, published, created_at";

/// Same as `VIDEO_COLS` but qualified and followed by the owner summary, for
/// join queries producing `VideoWithOwner`.
const VIDEO_WITH_OWNER_COLS: &str = "v.id, v.owner_id, v.title, v.description, v.video_url, \
     v.thumbnail_url, v.views, v.published, v.created_at, i.id, i.username, i.avatar_url";

fn video_with_owner_from_row(row: &Row<'_>) -> rusqlite::Result<VideoWithOwner> {
    Ok(VideoWithOwner {
        video: video_from_row(row)?,
        owner: IdentitySummary {
            id: row.get(9)?,
            username: row.get(10)?,
            avatar_url: row.get(11)?,
        },
    })
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Identity operations

    fn create_identity(&self, identity: &Identity) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO identities (id, username, email, full_name, password_hash,
                                         avatar_url, cover_url, refresh_token, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    identity.id,
                    identity.username,
                    identity.email,
                    identity.full_name,
                    identity.password_hash,
                    identity.avatar_url,
                    identity.cover_url,
                    identity.refresh_token,
                    format_datetime(&identity.created_at),
                    format_datetime(&identity.updated_at),
                ],
            )
            .map_err(|e| map_constraint(e, "identity"))?;
        Ok(())
    }

    fn get_identity(&self, id: &str) -> Result<Option<Identity>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {IDENTITY_COLS} FROM identities WHERE id = ?1"),
            params![id],
            identity_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_identity_by_username(&self, username: &str) -> Result<Option<Identity>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {IDENTITY_COLS} FROM identities WHERE username = ?1"),
            params![username],
            identity_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn find_identity_by_login(&self, login: &str) -> Result<Option<Identity>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {IDENTITY_COLS} FROM identities WHERE username = ?1 OR email = ?1"),
            params![login],
            identity_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_password(&self, id: &str, password_hash: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE identities SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
            params![password_hash, format_datetime(&Utc::now()), id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn update_account(&self, id: &str, full_name: &str, email: &str) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE identities SET full_name = ?1, email = ?2, updated_at = ?3 WHERE id = ?4",
                params![full_name, email, format_datetime(&Utc::now()), id],
            )
            .map_err(|e| map_constraint(e, "identity"))?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Refresh-token slot

    fn set_refresh_token(&self, id: &str, token: Option<&str>) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE identities SET refresh_token = ?1, updated_at = ?2 WHERE id = ?3",
            params![token, format_datetime(&Utc::now()), id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn swap_refresh_token(&self, id: &str, expected: &str, replacement: &str) -> Result<bool> {
        // Conditioning the update on the old value makes rotation a CAS:
        // of two concurrent refreshes with the same token, exactly one wins.
        let rows = self.conn().execute(
            "UPDATE identities SET refresh_token = ?1, updated_at = ?2
             WHERE id = ?3 AND refresh_token = ?4",
            params![replacement, format_datetime(&Utc::now()), id, expected],
        )?;
        Ok(rows > 0)
    }

    // Video operations

    fn create_video(&self, video: &Video) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO videos (id, owner_id, title, description, video_url,
                                     thumbnail_url, views, published, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    video.id,
                    video.owner_id,
                    video.title,
                    video.description,
                    video.video_url,
                    video.thumbnail_url,
                    video.views,
                    video.published as i64,
                    format_datetime(&video.created_at),
                ],
            )
            .map_err(|e| map_constraint(e, "video"))?;
        Ok(())
    }

    fn get_video(&self, id: &str) -> Result<Option<Video>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {VIDEO_COLS} FROM videos WHERE id = ?1"),
            params![id],
            video_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_video(&self, video: &Video) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE videos SET title = ?1, description = ?2, thumbnail_url = ?3, published = ?4
             WHERE id = ?5",
            params![
                video.title,
                video.description,
                video.thumbnail_url,
                video.published as i64,
                video.id,
            ],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_video(&self, id: &str) -> Result<()> {
        let rows = self
            .conn()
            .execute("DELETE FROM videos WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn increment_views(&self, id: &str) -> Result<()> {
        let rows = self
            .conn()
            .execute("UPDATE videos SET views = views + 1 WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn list_videos_by_owner(&self, owner_id: &str, limit: i64, offset: i64) -> Result<Vec<Video>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {VIDEO_COLS} FROM videos WHERE owner_id = ?1
             ORDER BY created_at DESC, id
             LIMIT ?2 OFFSET ?3"
        ))?;

        let rows = stmt.query_map(params![owner_id, limit, offset], video_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_videos_by_owner(&self, owner_id: &str) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM videos WHERE owner_id = ?1",
            params![owner_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn sum_views_by_owner(&self, owner_id: &str) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COALESCE(SUM(views), 0) FROM videos WHERE owner_id = ?1",
            params![owner_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    // Comment operations

    fn create_comment(&self, comment: &Comment) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO comments (id, video_id, owner_id, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    comment.id,
                    comment.video_id,
                    comment.owner_id,
                    comment.body,
                    format_datetime(&comment.created_at),
                ],
            )
            .map_err(|e| map_constraint(e, "comment"))?;
        Ok(())
    }

    fn get_comment(&self, id: &str) -> Result<Option<Comment>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, video_id, owner_id, body, created_at FROM comments WHERE id = ?1",
            params![id],
            |row| {
                Ok(Comment {
                    id: row.get(0)?,
                    video_id: row.get(1)?,
                    owner_id: row.get(2)?,
                    body: row.get(3)?,
                    created_at: parse_datetime(&row.get::<_, String>(4)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_video_comments(
        &self,
        video_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CommentWithAuthor>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT c.id, c.video_id, c.owner_id, c.body, c.created_at,
                    i.id, i.username, i.avatar_url
             FROM comments c
             JOIN identities i ON i.id = c.owner_id
             WHERE c.video_id = ?1
             ORDER BY c.created_at, c.id
             LIMIT ?2 OFFSET ?3",
        )?;

        let rows = stmt.query_map(params![video_id, limit, offset], |row| {
            Ok(CommentWithAuthor {
                comment: Comment {
                    id: row.get(0)?,
                    video_id: row.get(1)?,
                    owner_id: row.get(2)?,
                    body: row.get(3)?,
                    created_at: parse_datetime(&row.get::<_, String>(4)?),
                },
                author: IdentitySummary {
                    id: row.get(5)?,
                    username: row.get(6)?,
                    avatar_url: row.get(7)?,
                },
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_video_comments(&self, video_id: &str) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM comments WHERE video_id = ?1",
            params![video_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn update_comment(&self, id: &str, body: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE comments SET body = ?1 WHERE id = ?2",
            params![body, id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_comment(&self, id: &str) -> Result<()> {
        let rows = self
            .conn()
            .execute("DELETE FROM comments WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Tweet operations

    fn create_tweet(&self, tweet: &Tweet) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO tweets (id, owner_id, body, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    tweet.id,
                    tweet.owner_id,
                    tweet.body,
                    format_datetime(&tweet.created_at),
                ],
            )
            .map_err(|e| map_constraint(e, "tweet"))?;
        Ok(())
    }

    fn get_tweet(&self, id: &str) -> Result<Option<Tweet>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, owner_id, body, created_at FROM tweets WHERE id = ?1",
            params![id],
            |row| {
                Ok(Tweet {
                    id: row.get(0)?,
                    owner_id: row.get(1)?,
                    body: row.get(2)?,
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_tweet(&self, id: &str, body: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE tweets SET body = ?1 WHERE id = ?2",
            params![body, id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_tweet(&self, id: &str) -> Result<()> {
        let rows = self
            .conn()
            .execute("DELETE FROM tweets WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn list_tweets_by_owner(&self, owner_id: &str) -> Result<Vec<Tweet>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, body, created_at FROM tweets
             WHERE owner_id = ?1
             ORDER BY created_at DESC, id",
        )?;

        let rows = stmt.query_map(params![owner_id], |row| {
            Ok(Tweet {
                id: row.get(0)?,
                owner_id: row.get(1)?,
                body: row.get(2)?,
                created_at: parse_datetime(&row.get::<_, String>(3)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Subscription edges

    fn toggle_subscription(&self, channel_id: &str, subscriber_id: &str) -> Result<bool> {
        let conn = self.conn();
        // INSERT OR IGNORE leans on the primary key: a concurrent duplicate
        // insert is a no-op, not an error, and the whole flip is one
        // transaction.
        let tx = conn.unchecked_transaction()?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO subscriptions (channel_id, subscriber_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![channel_id, subscriber_id, format_datetime(&Utc::now())],
        )?;

        let subscribed = if inserted > 0 {
            true
        } else {
            tx.execute(
                "DELETE FROM subscriptions WHERE channel_id = ?1 AND subscriber_id = ?2",
                params![channel_id, subscriber_id],
            )?;
            false
        };

        tx.commit()?;
        Ok(subscribed)
    }

    fn is_subscribed(&self, subscriber_id: &str, channel_id: &str) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM subscriptions WHERE channel_id = ?1 AND subscriber_id = ?2",
            params![channel_id, subscriber_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn count_subscribers(&self, channel_id: &str) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM subscriptions WHERE channel_id = ?1",
            params![channel_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn count_subscribed_to(&self, subscriber_id: &str) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = ?1",
            params![subscriber_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn list_subscribers(&self, channel_id: &str) -> Result<Vec<IdentitySummary>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT i.id, i.username, i.avatar_url
             FROM subscriptions s
             JOIN identities i ON i.id = s.subscriber_id
             WHERE s.channel_id = ?1
             ORDER BY s.created_at, i.username",
        )?;

        let rows = stmt.query_map(params![channel_id], |row| {
            Ok(IdentitySummary {
                id: row.get(0)?,
                username: row.get(1)?,
                avatar_url: row.get(2)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_subscribed_channels(&self, subscriber_id: &str) -> Result<Vec<IdentitySummary>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT i.id, i.username, i.avatar_url
             FROM subscriptions s
             JOIN identities i ON i.id = s.channel_id
             WHERE s.subscriber_id = ?1
             ORDER BY s.created_at, i.username",
        )?;

        let rows = stmt.query_map(params![subscriber_id], |row| {
            Ok(IdentitySummary {
                id: row.get(0)?,
                username: row.get(1)?,
                avatar_url: row.get(2)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Like edges

    fn toggle_like(&self, identity_id: &str, kind: LikeTarget, target_id: &str) -> Result<bool> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO likes (identity_id, target_kind, target_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![identity_id, kind.as_str(), target_id, format_datetime(&Utc::now())],
        )?;

        let liked = if inserted > 0 {
            true
        } else {
            tx.execute(
                "DELETE FROM likes WHERE identity_id = ?1 AND target_kind = ?2 AND target_id = ?3",
                params![identity_id, kind.as_str(), target_id],
            )?;
            false
        };

        tx.commit()?;
        Ok(liked)
    }

    fn has_liked(&self, identity_id: &str, kind: LikeTarget, target_id: &str) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM likes
             WHERE identity_id = ?1 AND target_kind = ?2 AND target_id = ?3",
            params![identity_id, kind.as_str(), target_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn count_likes_on_owned_content(&self, owner_id: &str) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM likes l
             WHERE (l.target_kind = 'video'
                    AND l.target_id IN (SELECT id FROM videos WHERE owner_id = ?1))
                OR (l.target_kind = 'comment'
                    AND l.target_id IN (SELECT id FROM comments WHERE owner_id = ?1))
                OR (l.target_kind = 'tweet'
                    AND l.target_id IN (SELECT id FROM tweets WHERE owner_id = ?1))",
            params![owner_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn list_liked_videos(
        &self,
        identity_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<VideoWithOwner>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {VIDEO_WITH_OWNER_COLS}
             FROM likes l
             JOIN videos v ON v.id = l.target_id
             JOIN identities i ON i.id = v.owner_id
             WHERE l.identity_id = ?1 AND l.target_kind = 'video'
             ORDER BY l.created_at DESC, v.id
             LIMIT ?2 OFFSET ?3"
        ))?;

        let rows = stmt.query_map(params![identity_id, limit, offset], video_with_owner_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_liked_videos(&self, identity_id: &str) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM likes l
             JOIN videos v ON v.id = l.target_id
             WHERE l.identity_id = ?1 AND l.target_kind = 'video'",
            params![identity_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    // Watch history

    fn record_watch(
        &self,
        identity_id: &str,
        video_id: &str,
        policy: &HistoryPolicy,
    ) -> Result<()> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;

        if policy.dedupe {
            tx.execute(
                "DELETE FROM watch_history WHERE identity_id = ?1 AND video_id = ?2",
                params![identity_id, video_id],
            )?;
        }

        let next_seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq), 0) + 1 FROM watch_history WHERE identity_id = ?1",
            params![identity_id],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO watch_history (identity_id, seq, video_id, watched_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![identity_id, next_seq, video_id, format_datetime(&Utc::now())],
        )?;

        if let Some(max_len) = policy.max_len {
            tx.execute(
                "DELETE FROM watch_history WHERE identity_id = ?1 AND seq <= ?2",
                params![identity_id, next_seq - i64::from(max_len)],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn watch_history(&self, identity_id: &str) -> Result<Vec<VideoWithOwner>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {VIDEO_WITH_OWNER_COLS}
             FROM watch_history h
             JOIN videos v ON v.id = h.video_id
             JOIN identities i ON i.id = v.owner_id
             WHERE h.identity_id = ?1
             ORDER BY h.seq DESC"
        ))?;

        let rows = stmt.query_map(params![identity_id], video_with_owner_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize().unwrap();
        store
    }

    fn identity(username: &str) -> Identity {
        let now = Utc::now();
        Identity {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            full_name: username.to_string(),
            password_hash: "$argon2id$fake".to_string(),
            avatar_url: None,
            cover_url: None,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn video(owner: &Identity, title: &str) -> Video {
        Video {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner.id.clone(),
            title: title.to_string(),
            description: None,
            video_url: format!("https://media.example.com/{title}.mp4"),
            thumbnail_url: None,
            views: 0,
            published: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn duplicate_username_is_conflict() {
        let store = store();
        store.create_identity(&identity("alice")).unwrap();

        let mut dup = identity("alice");
        dup.email = "other@example.com".to_string();
        assert!(matches!(
            store.create_identity(&dup),
            Err(Error::Conflict(_))
        ));
    }

    #[test]
    fn find_identity_by_username_or_email() {
        let store = store();
        let alice = identity("alice");
        store.create_identity(&alice).unwrap();

        let by_name = store.find_identity_by_login("alice").unwrap().unwrap();
        let by_email = store
            .find_identity_by_login("alice@example.com")
            .unwrap()
            .unwrap();
        assert_eq!(by_name.id, alice.id);
        assert_eq!(by_email.id, alice.id);
        assert!(store.find_identity_by_login("nobody").unwrap().is_none());
    }

    #[test]
    fn swap_refresh_token_is_conditional() {
        let store = store();
        let alice = identity("alice");
        store.create_identity(&alice).unwrap();
        store.set_refresh_token(&alice.id, Some("r1")).unwrap();

        assert!(store.swap_refresh_token(&alice.id, "r1", "r2").unwrap());
        // The superseded value no longer matches.
        assert!(!store.swap_refresh_token(&alice.id, "r1", "r3").unwrap());
        assert!(store.swap_refresh_token(&alice.id, "r2", "r3").unwrap());

        let stored = store.get_identity(&alice.id).unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some("r3"));
    }

    #[test]
    fn toggle_subscription_flips_edge_existence() {
        let store = store();
        let channel = identity("channel");
        let viewer = identity("viewer");
        store.create_identity(&channel).unwrap();
        store.create_identity(&viewer).unwrap();

        assert!(store.toggle_subscription(&channel.id, &viewer.id).unwrap());
        assert!(store.is_subscribed(&viewer.id, &channel.id).unwrap());
        assert_eq!(store.count_subscribers(&channel.id).unwrap(), 1);

        assert!(!store.toggle_subscription(&channel.id, &viewer.id).unwrap());
        assert!(!store.is_subscribed(&viewer.id, &channel.id).unwrap());
        assert_eq!(store.count_subscribers(&channel.id).unwrap(), 0);
    }

    #[test]
    fn toggle_like_flips_per_target() {
        let store = store();
        let owner = identity("owner");
        let fan = identity("fan");
        store.create_identity(&owner).unwrap();
        store.create_identity(&fan).unwrap();
        let v = video(&owner, "clip");
        store.create_video(&v).unwrap();

        assert!(store.toggle_like(&fan.id, LikeTarget::Video, &v.id).unwrap());
        assert!(store.has_liked(&fan.id, LikeTarget::Video, &v.id).unwrap());
        // A comment like on the same id is a distinct edge.
        assert!(!store.has_liked(&fan.id, LikeTarget::Comment, &v.id).unwrap());

        assert!(!store.toggle_like(&fan.id, LikeTarget::Video, &v.id).unwrap());
        assert!(!store.has_liked(&fan.id, LikeTarget::Video, &v.id).unwrap());
    }

    #[test]
    fn likes_on_owned_content_spans_kinds() {
        let store = store();
        let owner = identity("owner");
        let fan = identity("fan");
        store.create_identity(&owner).unwrap();
        store.create_identity(&fan).unwrap();

        let v = video(&owner, "clip");
        store.create_video(&v).unwrap();
        let tweet = Tweet {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner.id.clone(),
            body: "hello".to_string(),
            created_at: Utc::now(),
        };
        store.create_tweet(&tweet).unwrap();

        store.toggle_like(&fan.id, LikeTarget::Video, &v.id).unwrap();
        store.toggle_like(&fan.id, LikeTarget::Tweet, &tweet.id).unwrap();
        store.toggle_like(&owner.id, LikeTarget::Video, &v.id).unwrap();

        assert_eq!(store.count_likes_on_owned_content(&owner.id).unwrap(), 3);
        assert_eq!(store.count_likes_on_owned_content(&fan.id).unwrap(), 0);
    }

    #[test]
    fn watch_history_dedupes_and_caps() {
        let store = store();
        let owner = identity("owner");
        let viewer = identity("viewer");
        store.create_identity(&owner).unwrap();
        store.create_identity(&viewer).unwrap();

        let videos: Vec<Video> = (0..5).map(|n| video(&owner, &format!("v{n}"))).collect();
        for v in &videos {
            store.create_video(v).unwrap();
        }

        let policy = HistoryPolicy {
            dedupe: true,
            max_len: Some(3),
        };

        for v in &videos[..3] {
            store.record_watch(&viewer.id, &v.id, &policy).unwrap();
        }
        // Rewatch the first: moves to front instead of duplicating.
        store.record_watch(&viewer.id, &videos[0].id, &policy).unwrap();

        let history = store.watch_history(&viewer.id).unwrap();
        let ids: Vec<&str> = history.iter().map(|h| h.video.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                videos[0].id.as_str(),
                videos[2].id.as_str(),
                videos[1].id.as_str()
            ]
        );

        // Two more watches push the oldest entries out.
        store.record_watch(&viewer.id, &videos[3].id, &policy).unwrap();
        store.record_watch(&viewer.id, &videos[4].id, &policy).unwrap();

        let history = store.watch_history(&viewer.id).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].video.id, videos[4].id);
        assert_eq!(history[0].owner.username, "owner");
    }

    #[test]
    fn comment_pagination_is_creation_ordered() {
        let store = store();
        let owner = identity("owner");
        store.create_identity(&owner).unwrap();
        let v = video(&owner, "clip");
        store.create_video(&v).unwrap();

        let base = Utc::now();
        for n in 0..5 {
            let comment = Comment {
                id: format!("c{n}"),
                video_id: v.id.clone(),
                owner_id: owner.id.clone(),
                body: format!("comment {n}"),
                created_at: base + chrono::Duration::seconds(n),
            };
            store.create_comment(&comment).unwrap();
        }

        let page = store.list_video_comments(&v.id, 2, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].comment.id, "c2");
        assert_eq!(page[1].comment.id, "c3");
        assert_eq!(page[0].author.username, "owner");
        assert_eq!(store.count_video_comments(&v.id).unwrap(), 5);
    }

    #[test]
    fn new_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data").join("test.db");

        let store = SqliteStore::new(&path).unwrap();
        store.initialize().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn update_account_keeps_email_unique() {
        let store = store();
        let alice = identity("alice");
        let bob = identity("bob");
        store.create_identity(&alice).unwrap();
        store.create_identity(&bob).unwrap();

        store
            .update_account(&alice.id, "Alice Cooper", "cooper@example.com")
            .unwrap();
        let updated = store.get_identity(&alice.id).unwrap().unwrap();
        assert_eq!(updated.full_name, "Alice Cooper");
        assert_eq!(updated.email, "cooper@example.com");

        assert!(matches!(
            store.update_account(&bob.id, "Bob", "cooper@example.com"),
            Err(Error::Conflict(_))
        ));
        assert!(matches!(
            store.update_account("missing", "X", "x@example.com"),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn mutations_on_missing_rows_are_not_found() {
        let store = store();
        let owner = identity("owner");
        store.create_identity(&owner).unwrap();
        let v = video(&owner, "clip");

        assert!(matches!(store.update_video(&v), Err(Error::NotFound)));
        assert!(matches!(store.delete_video(&v.id), Err(Error::NotFound)));
        assert!(matches!(
            store.update_comment("missing", "x"),
            Err(Error::NotFound)
        ));
        assert!(matches!(store.delete_tweet("missing"), Err(Error::NotFound)));
    }

    #[test]
    fn delete_video_cascades_engagement_and_strands_likes() {
        let store = store();
        let owner = identity("owner");
        let fan = identity("fan");
        store.create_identity(&owner).unwrap();
        store.create_identity(&fan).unwrap();
        let v = video(&owner, "clip");
        store.create_video(&v).unwrap();

        store
            .create_comment(&Comment {
                id: "c1".to_string(),
                video_id: v.id.clone(),
                owner_id: fan.id.clone(),
                body: "nice".to_string(),
                created_at: Utc::now(),
            })
            .unwrap();
        store
            .record_watch(&fan.id, &v.id, &HistoryPolicy::default())
            .unwrap();
        store.toggle_like(&fan.id, LikeTarget::Video, &v.id).unwrap();

        store.delete_video(&v.id).unwrap();

        // Comments and history rows go with the video; the like edge stays
        // behind but never surfaces through the joined reads.
        assert_eq!(store.count_video_comments(&v.id).unwrap(), 0);
        assert!(store.watch_history(&fan.id).unwrap().is_empty());
        assert!(store.has_liked(&fan.id, LikeTarget::Video, &v.id).unwrap());
        assert!(store.list_liked_videos(&fan.id, 10, 0).unwrap().is_empty());
        assert_eq!(store.count_liked_videos(&fan.id).unwrap(), 0);
    }

    #[test]
    fn video_update_rewrites_fields_and_publish_flag() {
        let store = store();
        let owner = identity("owner");
        store.create_identity(&owner).unwrap();
        let mut v = video(&owner, "clip");
        store.create_video(&v).unwrap();

        v.title = "renamed".to_string();
        v.description = Some("now with words".to_string());
        v.published = false;
        store.update_video(&v).unwrap();

        let stored = store.get_video(&v.id).unwrap().unwrap();
        assert_eq!(stored.title, "renamed");
        assert_eq!(stored.description.as_deref(), Some("now with words"));
        assert!(!stored.published);
    }

    #[test]
    fn tweets_list_newest_first_and_shrink_on_delete() {
        let store = store();
        let owner = identity("owner");
        store.create_identity(&owner).unwrap();

        let base = Utc::now();
        for n in 0..3 {
            store
                .create_tweet(&Tweet {
                    id: format!("t{n}"),
                    owner_id: owner.id.clone(),
                    body: format!("tweet {n}"),
                    created_at: base + chrono::Duration::seconds(n),
                })
                .unwrap();
        }

        store.update_tweet("t1", "edited").unwrap();
        store.delete_tweet("t2").unwrap();

        let tweets = store.list_tweets_by_owner(&owner.id).unwrap();
        assert_eq!(tweets.len(), 2);
        assert_eq!(tweets[0].id, "t1");
        assert_eq!(tweets[0].body, "edited");
        assert_eq!(tweets[1].id, "t0");
    }

    #[test]
    fn concurrent_toggles_settle_on_one_state() {
        use std::sync::Arc;

        let store = Arc::new(store());
        let channel = identity("channel");
        let fan = identity("fan");
        store.create_identity(&channel).unwrap();
        store.create_identity(&fan).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let channel_id = channel.id.clone();
                let fan_id = fan.id.clone();
                std::thread::spawn(move || {
                    store.toggle_subscription(&channel_id, &fan_id).unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // An even number of toggles always lands back on "absent", and the
        // edge count can only ever be zero or one.
        assert_eq!(store.count_subscribers(&channel.id).unwrap(), 0);
        assert!(!store.is_subscribed(&fan.id, &channel.id).unwrap());
    }
}
