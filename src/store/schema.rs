pub const SCHEMA: &str = r#"
-- Identities are both user accounts and channels
CREATE TABLE IF NOT EXISTS identities (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    full_name TEXT NOT NULL,
    password_hash TEXT NOT NULL,     -- argon2id hash with embedded salt

    -- Opaque refs into the external object store
    avatar_url TEXT,
    cover_url TEXT,

    -- Exactly one active refresh token per identity; superseded on rotation
    refresh_token TEXT,

    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS videos (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL REFERENCES identities(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    description TEXT,
    video_url TEXT NOT NULL,
    thumbnail_url TEXT,
    views INTEGER NOT NULL DEFAULT 0,
    published INTEGER NOT NULL DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS comments (
    id TEXT PRIMARY KEY,
    video_id TEXT NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
    owner_id TEXT NOT NULL REFERENCES identities(id) ON DELETE CASCADE,
    body TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS tweets (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL REFERENCES identities(id) ON DELETE CASCADE,
    body TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Directed channel <- subscriber edges; the natural key doubles as the
-- uniqueness constraint the toggle primitive relies on
CREATE TABLE IF NOT EXISTS subscriptions (
    channel_id TEXT NOT NULL REFERENCES identities(id) ON DELETE CASCADE,
    subscriber_id TEXT NOT NULL REFERENCES identities(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (channel_id, subscriber_id),
    CHECK (channel_id <> subscriber_id)
);

-- Likes are polymorphic over videos, comments, and tweets; target existence
-- is checked by the toggle engine, not the schema
CREATE TABLE IF NOT EXISTS likes (
    identity_id TEXT NOT NULL REFERENCES identities(id) ON DELETE CASCADE,
    target_kind TEXT NOT NULL CHECK (target_kind IN ('video', 'comment', 'tweet')),
    target_id TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (identity_id, target_kind, target_id)
);

-- Per-identity watch log; seq is a monotonic counter, highest = most recent
CREATE TABLE IF NOT EXISTS watch_history (
    identity_id TEXT NOT NULL REFERENCES identities(id) ON DELETE CASCADE,
    seq INTEGER NOT NULL,
    video_id TEXT NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
    watched_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (identity_id, seq)
);

-- Create indexes
CREATE INDEX IF NOT EXISTS idx_videos_owner ON videos(owner_id);
CREATE INDEX IF NOT EXISTS idx_comments_video ON comments(video_id);
CREATE INDEX IF NOT EXISTS idx_comments_owner ON comments(owner_id);
CREATE INDEX IF NOT EXISTS idx_tweets_owner ON tweets(owner_id);
CREATE INDEX IF NOT EXISTS idx_subscriptions_subscriber ON subscriptions(subscriber_id);
CREATE INDEX IF NOT EXISTS idx_likes_target ON likes(target_kind, target_id);
CREATE INDEX IF NOT EXISTS idx_watch_history_video ON watch_history(identity_id, video_id);
"#;
