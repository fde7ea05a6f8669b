use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use rishta_types::models::{Conversation, Message, MessageType};

use super::{OptionalExt, get_enum, get_opt_ts, get_ts, get_uuid, ts};
use crate::Database;
use crate::models::{NewMessage, Page, SentMessage};

const CONVERSATION_COLUMNS: &str =
    "id, participant_low, participant_high, last_message, last_message_at, created_at";

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, sender_id, receiver_id, message_type, content, is_read, created_at";

/// Longest `last_message` preview kept on the conversation row.
const PREVIEW_CHARS: usize = 100;

fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: get_uuid(row, 0)?,
        participants: [get_uuid(row, 1)?, get_uuid(row, 2)?],
        last_message: row.get(3)?,
        last_message_at: get_opt_ts(row, 4)?,
        unread: HashMap::new(),
        created_at: get_ts(row, 5)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: get_uuid(row, 0)?,
        conversation_id: get_uuid(row, 1)?,
        sender_id: get_uuid(row, 2)?,
        receiver_id: get_uuid(row, 3)?,
        message_type: get_enum(row, 4)?,
        content: row.get(5)?,
        is_read: row.get(6)?,
        created_at: get_ts(row, 7)?,
    })
}

fn load_unread(conn: &Connection, conv: &mut Conversation) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT user_id, unread_count FROM conversation_unread WHERE conversation_id = ?1",
    )?;
    let counts = stmt
        .query_map([conv.id.to_string()], |row| Ok((get_uuid(row, 0)?, row.get::<_, i64>(1)?)))?
        .collect::<std::result::Result<HashMap<_, _>, _>>()?;
    conv.unread = counts;
    Ok(())
}

fn query_conversation(conn: &Connection, id: Uuid) -> Result<Option<Conversation>> {
    let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1");
    let Some(mut conv) = conn
        .query_row(&sql, [id.to_string()], conversation_from_row)
        .optional()?
    else {
        return Ok(None);
    };
    load_unread(conn, &mut conv)?;
    Ok(Some(conv))
}

/// Returns the id of the conversation for the unordered pair, creating it if
/// needed. The UNIQUE(participant_low, participant_high) constraint makes
/// this idempotent: a losing concurrent insert is ignored and the winner's
/// row is read back.
fn get_or_create_conversation_id(
    conn: &Connection,
    a: Uuid,
    b: Uuid,
    now: DateTime<Utc>,
) -> Result<Uuid> {
    let (low, high) = Conversation::pair_key(a, b);
    let (low, high) = (low.to_string(), high.to_string());

    conn.execute(
        "INSERT INTO conversations (id, participant_low, participant_high, created_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (participant_low, participant_high) DO NOTHING",
        (Uuid::new_v4().to_string(), &low, &high, ts(now)),
    )?;

    let id = conn.query_row(
        "SELECT id FROM conversations WHERE participant_low = ?1 AND participant_high = ?2",
        (&low, &high),
        |row| get_uuid(row, 0),
    )?;

    for participant in [&low, &high] {
        conn.execute(
            "INSERT OR IGNORE INTO conversation_unread (conversation_id, user_id, unread_count)
             VALUES (?1, ?2, 0)",
            (id.to_string(), participant),
        )?;
    }
    Ok(id)
}

fn preview(message_type: MessageType, content: &str) -> String {
    match message_type {
        MessageType::Text => content.chars().take(PREVIEW_CHARS).collect(),
        MessageType::Image => "[image]".to_string(),
        MessageType::File => "[file]".to_string(),
    }
}

impl Database {
    // -- Conversations --

    pub fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>> {
        self.with_conn(|conn| query_conversation(conn, id))
    }

    pub fn list_conversations_for_user(&self, user_id: Uuid) -> Result<Vec<Conversation>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 WHERE participant_low = ?1 OR participant_high = ?1
                 ORDER BY COALESCE(last_message_at, created_at) DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut convs = stmt
                .query_map([user_id.to_string()], conversation_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            for conv in &mut convs {
                load_unread(conn, conv)?;
            }
            Ok(convs)
        })
    }

    pub fn list_conversations(&self, page: Page) -> Result<(Vec<Conversation>, i64)> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row("SELECT COUNT(*) FROM conversations", [], |r| r.get(0))?;
            let sql = format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 ORDER BY COALESCE(last_message_at, created_at) DESC LIMIT ?1 OFFSET ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut convs = stmt
                .query_map((page.limit, page.offset()), conversation_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            for conv in &mut convs {
                load_unread(conn, conv)?;
            }
            Ok((convs, total))
        })
    }

    // -- Messages --

    /// Stores a message: resolves the pair's conversation, inserts the
    /// message, updates the preview and bumps only the receiver's unread
    /// counter. One SQL transaction.
    pub fn send_message(&self, new: &NewMessage<'_>, now: DateTime<Utc>) -> Result<SentMessage> {
        let message_id = Uuid::new_v4();
        let now_s = ts(now);

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let conversation_id = get_or_create_conversation_id(&tx, new.sender_id, new.receiver_id, now)?;

            tx.execute(
                "INSERT INTO messages (id, conversation_id, sender_id, receiver_id, message_type, content, is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
                rusqlite::params![
                    message_id.to_string(),
                    conversation_id.to_string(),
                    new.sender_id.to_string(),
                    new.receiver_id.to_string(),
                    new.message_type.as_str(),
                    new.content,
                    now_s,
                ],
            )?;

            tx.execute(
                "UPDATE conversations SET last_message = ?2, last_message_at = ?3 WHERE id = ?1",
                (
                    conversation_id.to_string(),
                    preview(new.message_type, new.content),
                    &now_s,
                ),
            )?;

            tx.execute(
                "INSERT INTO conversation_unread (conversation_id, user_id, unread_count)
                 VALUES (?1, ?2, 1)
                 ON CONFLICT (conversation_id, user_id)
                 DO UPDATE SET unread_count = unread_count + 1",
                (conversation_id.to_string(), new.receiver_id.to_string()),
            )?;

            let conversation = query_conversation(&tx, conversation_id)?
                .ok_or_else(|| anyhow::anyhow!("conversation {} vanished", conversation_id))?;
            tx.commit()?;

            Ok(SentMessage {
                conversation,
                message: Message {
                    id: message_id,
                    conversation_id,
                    sender_id: new.sender_id,
                    receiver_id: new.receiver_id,
                    message_type: new.message_type,
                    content: new.content.to_string(),
                    is_read: false,
                    created_at: now,
                },
            })
        })
    }

    /// Messages in chronological order. `before` is the id of the oldest
    /// message already shown; the page holds the messages stored before it,
    /// ordered by `(created_at, rowid)` so equal timestamps are not skipped.
    /// An id from another conversation yields an empty page.
    pub fn get_messages(
        &self,
        conversation_id: Uuid,
        limit: u32,
        before: Option<Uuid>,
    ) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE conversation_id = ?1
                   AND (?2 IS NULL OR (created_at, rowid) < (
                        SELECT created_at, rowid FROM messages
                        WHERE id = ?2 AND conversation_id = ?1))
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt
                .query_map(
                    rusqlite::params![
                        conversation_id.to_string(),
                        before.map(|id| id.to_string()),
                        limit
                    ],
                    message_from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.reverse();
            Ok(rows)
        })
    }

    /// Marks everything addressed to `reader` as read and resets the
    /// reader's counter. The other participant's counter is untouched.
    pub fn mark_conversation_read(&self, conversation_id: Uuid, reader: Uuid) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let marked = tx.execute(
                "UPDATE messages SET is_read = 1
                 WHERE conversation_id = ?1 AND receiver_id = ?2 AND is_read = 0",
                (conversation_id.to_string(), reader.to_string()),
            )?;
            tx.execute(
                "UPDATE conversation_unread SET unread_count = 0
                 WHERE conversation_id = ?1 AND user_id = ?2",
                (conversation_id.to_string(), reader.to_string()),
            )?;
            tx.commit()?;
            Ok(marked)
        })
    }
}
