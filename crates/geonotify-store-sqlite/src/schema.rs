//! SQL schema for the geonotify SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS incidents (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    title       TEXT    NOT NULL,
    description TEXT    NOT NULL,
    latitude    REAL    NOT NULL,
    longitude   REAL    NOT NULL,
    radius_m    INTEGER NOT NULL CHECK (radius_m >= 0),
    active      INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT    NOT NULL,   -- RFC 3339 UTC, fixed width
    updated_at  TEXT    NOT NULL
);

-- Append-only. No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS location_checks (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id      INTEGER NOT NULL,
    latitude     REAL    NOT NULL,
    longitude    REAL    NOT NULL,
    incident_ids TEXT    NOT NULL,   -- JSON array of incident ids
    checked_at   TEXT    NOT NULL
);

-- Rows are deleted by the consumer that claims them.
CREATE TABLE IF NOT EXISTS webhook_queue (
    seq            INTEGER PRIMARY KEY AUTOINCREMENT,
    queue          TEXT    NOT NULL,
    payload        TEXT    NOT NULL,   -- JSON-encoded DeliveryTask
    not_before_ms  INTEGER NOT NULL,   -- unix millis; 0 = eligible now
    enqueued_at    TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS webhook_dead_letters (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    queue        TEXT    NOT NULL,
    delivery_id  TEXT,
    payload      TEXT    NOT NULL,
    reason       TEXT    NOT NULL,
    attempts     INTEGER NOT NULL,
    failed_at    TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS incidents_active_idx       ON incidents(active);
CREATE INDEX IF NOT EXISTS location_checks_at_idx     ON location_checks(checked_at);
CREATE INDEX IF NOT EXISTS webhook_queue_eligible_idx ON webhook_queue(queue, not_before_ms);

PRAGMA user_version = 1;
";
