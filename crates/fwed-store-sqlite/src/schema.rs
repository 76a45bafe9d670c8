//! SQL schema for the fwedbot SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per user; never deleted, reset to 'start' instead.
CREATE TABLE IF NOT EXISTS user_states (
    user_id             INTEGER PRIMARY KEY,
    chat_id             INTEGER NOT NULL,
    current_step        TEXT NOT NULL DEFAULT 'start',
    draft_connection_id INTEGER
        REFERENCES user_connections(connection_id) ON DELETE SET NULL,
    updated_at          TEXT NOT NULL
);

-- A group belongs to exactly one owner.
CREATE TABLE IF NOT EXISTS user_groups (
    group_id      INTEGER PRIMARY KEY,
    user_id       INTEGER NOT NULL,
    group_name    TEXT NOT NULL,
    is_active     INTEGER NOT NULL DEFAULT 1,
    registered_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS group_topics (
    group_id   INTEGER NOT NULL REFERENCES user_groups(group_id),
    topic_id   INTEGER NOT NULL,
    topic_name TEXT NOT NULL,
    PRIMARY KEY (group_id, topic_id),
    UNIQUE (group_id, topic_name)
);

-- Routing columns stay NULL until the wizard fills them in.
CREATE TABLE IF NOT EXISTS user_connections (
    connection_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id          INTEGER NOT NULL,
    connection_title TEXT,
    source_group_id  INTEGER,
    source_topic_id  INTEGER,   -- NULL: any topic
    target_group_id  INTEGER,
    target_topic_id  INTEGER,   -- NULL: general stream
    is_active        INTEGER NOT NULL DEFAULT 1,
    created_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS groups_user_idx       ON user_groups(user_id);
CREATE INDEX IF NOT EXISTS connections_user_idx  ON user_connections(user_id);
CREATE INDEX IF NOT EXISTS connections_route_idx ON user_connections(source_group_id, source_topic_id);

PRAGMA user_version = 1;
";
