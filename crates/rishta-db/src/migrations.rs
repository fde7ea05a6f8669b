use anyhow::Result;
use rishta_types::models::AppSettings;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                TEXT PRIMARY KEY,
                name              TEXT NOT NULL,
                email             TEXT NOT NULL UNIQUE,
                phone             TEXT NOT NULL,
                password          TEXT NOT NULL,
                role              TEXT NOT NULL CHECK (role IN ('bride', 'groom')),
                is_verified       INTEGER NOT NULL DEFAULT 0,
                is_blocked        INTEGER NOT NULL DEFAULT 0,
                block_reason      TEXT,
                boost_status      TEXT NOT NULL DEFAULT 'none',
                boost_expires_at  TEXT,
                created_at        TEXT NOT NULL,
                updated_at        TEXT NOT NULL
            );

            CREATE TABLE user_blocks (
                user_id          TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                blocked_user_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at       TEXT NOT NULL,
                PRIMARY KEY (user_id, blocked_user_id)
            );

            CREATE TABLE admins (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL UNIQUE,
                name        TEXT NOT NULL,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE contact_requests (
                id            TEXT PRIMARY KEY,
                from_user_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                to_user_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                request_type  TEXT NOT NULL,
                status        TEXT NOT NULL DEFAULT 'pending',
                message       TEXT,
                created_at    TEXT NOT NULL,
                responded_at  TEXT
            );

            -- At most one pending request per ordered pair
            CREATE UNIQUE INDEX idx_contact_requests_pending
                ON contact_requests(from_user_id, to_user_id) WHERE status = 'pending';
            CREATE INDEX idx_contact_requests_to ON contact_requests(to_user_id, created_at);

            CREATE TABLE conversations (
                id                TEXT PRIMARY KEY,
                participant_low   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                participant_high  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                last_message      TEXT,
                last_message_at   TEXT,
                created_at        TEXT NOT NULL,
                UNIQUE (participant_low, participant_high),
                CHECK (participant_low < participant_high)
            );

            CREATE TABLE conversation_unread (
                conversation_id  TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                user_id          TEXT NOT NULL,
                unread_count     INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (conversation_id, user_id)
            );

            CREATE TABLE messages (
                id               TEXT PRIMARY KEY,
                conversation_id  TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                sender_id        TEXT NOT NULL,
                receiver_id      TEXT NOT NULL,
                message_type     TEXT NOT NULL,
                content          TEXT NOT NULL,
                is_read          INTEGER NOT NULL DEFAULT 0,
                created_at       TEXT NOT NULL
            );

            CREATE INDEX idx_messages_conversation ON messages(conversation_id, created_at);

            CREATE TABLE promo_codes (
                id              TEXT PRIMARY KEY,
                code            TEXT NOT NULL UNIQUE,
                description     TEXT NOT NULL DEFAULT '',
                discount_type   TEXT NOT NULL,
                discount_value  INTEGER NOT NULL,
                usage_limit     INTEGER NOT NULL,
                usage_count     INTEGER NOT NULL DEFAULT 0,
                valid_from      TEXT NOT NULL,
                valid_until     TEXT NOT NULL,
                is_active       INTEGER NOT NULL DEFAULT 1,
                created_at      TEXT NOT NULL,
                CHECK (usage_count <= usage_limit)
            );

            CREATE TABLE transactions (
                id                  TEXT PRIMARY KEY,
                user_id             TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                kind                TEXT NOT NULL,
                amount_cents        INTEGER NOT NULL,
                discount_cents      INTEGER NOT NULL DEFAULT 0,
                final_amount_cents  INTEGER NOT NULL,
                currency            TEXT NOT NULL,
                promo_code          TEXT,
                payment_reference   TEXT,
                status              TEXT NOT NULL,
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_transactions_user ON transactions(user_id, created_at);

            CREATE TABLE reports (
                id                TEXT PRIMARY KEY,
                reporter_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                reported_user_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                reason            TEXT NOT NULL,
                description       TEXT,
                status            TEXT NOT NULL DEFAULT 'pending',
                action_taken      TEXT,
                resolved_by       TEXT,
                resolved_at       TEXT,
                created_at        TEXT NOT NULL
            );

            CREATE TABLE notifications (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                kind        TEXT NOT NULL,
                title       TEXT NOT NULL,
                body        TEXT NOT NULL,
                is_read     INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_notifications_user ON notifications(user_id, created_at);

            CREATE TABLE app_settings (
                id                   INTEGER PRIMARY KEY CHECK (id = 1),
                boost_price_cents    INTEGER NOT NULL,
                boost_duration_days  INTEGER NOT NULL,
                currency             TEXT NOT NULL,
                max_message_length   INTEGER NOT NULL,
                maintenance_mode     INTEGER NOT NULL,
                support_email        TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;

        let defaults = AppSettings::default();
        conn.execute(
            "INSERT INTO app_settings
                (id, boost_price_cents, boost_duration_days, currency, max_message_length, maintenance_mode, support_email)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                defaults.boost_price_cents,
                defaults.boost_duration_days,
                defaults.currency,
                defaults.max_message_length,
                defaults.maintenance_mode,
                defaults.support_email,
            ],
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
