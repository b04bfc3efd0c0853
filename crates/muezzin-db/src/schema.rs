//! Database schema for Muezzin

/// SQLite schema initialization
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    registration_token TEXT,
    timezone TEXT,
    prayers TEXT NOT NULL DEFAULT '[]',
    notification_settings TEXT NOT NULL DEFAULT '{}',
    daily_night_notification_enabled INTEGER NOT NULL DEFAULT 0,
    prayer_blocker_enabled INTEGER NOT NULL DEFAULT 0,
    token_stale INTEGER NOT NULL DEFAULT 0,
    token_error_code TEXT,
    token_stale_at TEXT,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_users_blocker ON users(prayer_blocker_enabled);

CREATE TABLE IF NOT EXISTS completions (
    user_id TEXT NOT NULL,
    day TEXT NOT NULL,
    prayer TEXT NOT NULL,
    status TEXT NOT NULL,
    PRIMARY KEY (user_id, day, prayer)
);

CREATE TABLE IF NOT EXISTS dispatch_markers (
    user_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    prayer TEXT NOT NULL,
    day TEXT NOT NULL,
    sent_at TEXT NOT NULL,
    PRIMARY KEY (user_id, kind, prayer, day)
);

CREATE INDEX IF NOT EXISTS idx_dispatch_markers_day ON dispatch_markers(day);

CREATE TABLE IF NOT EXISTS like_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_id TEXT NOT NULL,
    recipient_id TEXT NOT NULL,
    actor_display_name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    due_at TEXT NOT NULL,
    processed INTEGER NOT NULL DEFAULT 0,
    processed_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_like_events_pending ON like_events(processed, due_at);
"#;
