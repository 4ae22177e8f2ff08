pub const SCHEMA: &str = r#"
-- summary_counts table: one row per authenticated account
CREATE TABLE IF NOT EXISTS summary_counts (
    user_id TEXT PRIMARY KEY NOT NULL,
    count INTEGER NOT NULL DEFAULT 0 CHECK (count >= 0),
    last_reset TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
