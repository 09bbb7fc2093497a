//! SQL schema for the Herald SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `PRAGMA user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS campaigns (
    campaign_id  TEXT PRIMARY KEY,
    subject      TEXT NOT NULL,
    body_html    TEXT NOT NULL,
    target_type  TEXT NOT NULL,   -- 'category' | 'registered_users' | 'upload_only'
    state        TEXT NOT NULL,   -- 'queued' | 'sending' | 'completed'
    created_at   TEXT NOT NULL,   -- ISO 8601 UTC; store-assigned
    started_at   TEXT,
    completed_at TEXT
);

-- Audit trail: which categories a category-targeted campaign was aimed at.
CREATE TABLE IF NOT EXISTS campaign_categories (
    campaign_id TEXT NOT NULL REFERENCES campaigns(campaign_id),
    category_id TEXT NOT NULL,
    PRIMARY KEY (campaign_id, category_id)
);

-- One row per campaign x resolved address. Status moves pending -> sent or
-- pending -> failed exactly once; rows are never deleted.
CREATE TABLE IF NOT EXISTS recipients (
    recipient_id  TEXT PRIMARY KEY,
    campaign_id   TEXT NOT NULL REFERENCES campaigns(campaign_id),
    contact_id    TEXT,                 -- NULL for directory/upload sources
    email         TEXT NOT NULL,        -- original case, used for delivery
    email_norm    TEXT NOT NULL,        -- lower-cased, used for comparison
    display_name  TEXT,
    is_registered INTEGER NOT NULL DEFAULT 0,
    status        TEXT NOT NULL DEFAULT 'pending',  -- 'pending' | 'sent' | 'failed'
    sent_at       TEXT,
    last_error    TEXT,
    message_id    TEXT,                 -- provider id; success only
    UNIQUE (campaign_id, email_norm)
);

-- Owned by the catalogue/admin side of the product; the dispatch engine
-- only reads these.
CREATE TABLE IF NOT EXISTS contacts (
    contact_id TEXT PRIMARY KEY,
    email      TEXT,
    name       TEXT
);

CREATE TABLE IF NOT EXISTS contact_categories (
    contact_id  TEXT NOT NULL REFERENCES contacts(contact_id),
    category_id TEXT NOT NULL,
    PRIMARY KEY (contact_id, category_id)
);

-- Opt-out list. Read-only from the dispatch engine.
CREATE TABLE IF NOT EXISTS suppressions (
    email_norm TEXT PRIMARY KEY,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS recipients_campaign_idx
    ON recipients(campaign_id);
CREATE INDEX IF NOT EXISTS recipients_status_idx
    ON recipients(campaign_id, status);
CREATE INDEX IF NOT EXISTS contact_categories_category_idx
    ON contact_categories(category_id);

PRAGMA user_version = 1;
";
