//! SQLite game repository implementation.
//!
//! Implements `GameRepository` from `cardroom-core` using sqlx with split
//! read/write pools. A game spans three tables (`games`, `game_users`,
//! `game_messages`). `save` writes all three for a new table; `update` and
//! `add_message` touch only the rows they change, inside one writer
//! transaction each. Every committed write is announced on the repository's
//! [`ChangeFeed`].

use std::collections::BTreeMap;

use cardroom_core::feed::{ChangeFeed, ChangeSubscription, GameListener};
use cardroom_core::repository::GameRepository;
use cardroom_types::chat::ChatMessage;
use cardroom_types::error::RepositoryError;
use cardroom_types::game::{Game, GameId, GameStatus, GameSummary, User, UserId, UserMetadata};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Row, SqliteConnection};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `GameRepository`.
pub struct SqliteGameRepository {
    pool: DatabasePool,
    feed: ChangeFeed,
}

impl SqliteGameRepository {
    pub fn new(pool: DatabasePool, feed: ChangeFeed) -> Self {
        Self { pool, feed }
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }
}

impl GameListener for SqliteGameRepository {
    fn subscribe(&self) -> ChangeSubscription {
        self.feed.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Internal row types
// ---------------------------------------------------------------------------

const SUMMARY_COLUMNS: &str = r#"g.id, g.name, g.status, g.max_players, g.small_blind,
    g.big_blind, g.created_at, g.updated_at,
    (SELECT COUNT(*) FROM game_users u WHERE u.game_id = g.id) AS players"#;

struct GameRow {
    id: String,
    name: String,
    status: String,
    max_players: i64,
    small_blind: i64,
    big_blind: i64,
    created_at: String,
    updated_at: String,
    players: i64,
}

impl GameRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            status: row.try_get("status")?,
            max_players: row.try_get("max_players")?,
            small_blind: row.try_get("small_blind")?,
            big_blind: row.try_get("big_blind")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            players: row.try_get("players")?,
        })
    }

    fn status(&self) -> Result<GameStatus, RepositoryError> {
        self.status.parse::<GameStatus>().map_err(RepositoryError::Query)
    }

    fn into_summary(self) -> Result<GameSummary, RepositoryError> {
        Ok(GameSummary {
            status: self.status()?,
            updated_at: parse_datetime(&self.updated_at)?,
            id: GameId(self.id),
            name: self.name,
            players: to_u32(self.players)?,
            max_players: to_u32(self.max_players)?,
            small_blind: to_u64(self.small_blind)?,
            big_blind: to_u64(self.big_blind)?,
        })
    }

    fn into_game(
        self,
        users: BTreeMap<UserId, User>,
        messages: Vec<ChatMessage>,
    ) -> Result<Game, RepositoryError> {
        Ok(Game {
            status: self.status()?,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
            id: GameId(self.id),
            name: self.name,
            max_players: to_u32(self.max_players)?,
            small_blind: to_u64(self.small_blind)?,
            big_blind: to_u64(self.big_blind)?,
            users,
            messages,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width RFC 3339 so `ORDER BY updated_at` sorts chronologically.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn to_u32(v: i64) -> Result<u32, RepositoryError> {
    u32::try_from(v).map_err(|_| RepositoryError::Query(format!("value out of range: {v}")))
}

fn to_u64(v: i64) -> Result<u64, RepositoryError> {
    u64::try_from(v).map_err(|_| RepositoryError::Query(format!("value out of range: {v}")))
}

fn to_i64(v: u64) -> Result<i64, RepositoryError> {
    i64::try_from(v).map_err(|_| RepositoryError::Query(format!("value out of range: {v}")))
}

async fn load_users(
    conn: &mut SqliteConnection,
    id: &GameId,
) -> Result<BTreeMap<UserId, User>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT user_id, name, joined_at FROM game_users WHERE game_id = ? ORDER BY joined_at",
    )
    .bind(id.as_str())
    .fetch_all(&mut *conn)
    .await
    .map_err(query_err)?;

    let mut users = BTreeMap::new();
    for row in &rows {
        let user_id: String = row.try_get("user_id").map_err(query_err)?;
        let name: String = row.try_get("name").map_err(query_err)?;
        let joined_at: String = row.try_get("joined_at").map_err(query_err)?;
        let uid = UserId(user_id);
        users.insert(
            uid.clone(),
            User {
                id: uid,
                metadata: UserMetadata { name },
                joined_at: parse_datetime(&joined_at)?,
            },
        );
    }
    Ok(users)
}

async fn load_messages(
    conn: &mut SqliteConnection,
    id: &GameId,
) -> Result<Vec<ChatMessage>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT user_id, message, timestamp FROM game_messages WHERE game_id = ? ORDER BY id",
    )
    .bind(id.as_str())
    .fetch_all(&mut *conn)
    .await
    .map_err(query_err)?;

    let mut messages = Vec::with_capacity(rows.len());
    for row in &rows {
        let user_id: String = row.try_get("user_id").map_err(query_err)?;
        let message: String = row.try_get("message").map_err(query_err)?;
        let timestamp: String = row.try_get("timestamp").map_err(query_err)?;
        messages.push(ChatMessage {
            user_id: UserId(user_id),
            message,
            timestamp: parse_datetime(&timestamp)?,
        });
    }
    Ok(messages)
}

async fn fetch_row(
    conn: &mut SqliteConnection,
    id: &GameId,
) -> Result<Option<GameRow>, RepositoryError> {
    let sql = format!("SELECT {SUMMARY_COLUMNS} FROM games g WHERE g.id = ?");
    let row = sqlx::query(&sql)
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await
        .map_err(query_err)?;

    row.as_ref()
        .map(GameRow::from_row)
        .transpose()
        .map_err(query_err)
}

/// Full record, read on one connection so the three tables agree.
async fn load_game(conn: &mut SqliteConnection, id: &GameId) -> Result<Option<Game>, RepositoryError> {
    let Some(row) = fetch_row(conn, id).await? else {
        return Ok(None);
    };
    let users = load_users(conn, id).await?;
    let messages = load_messages(conn, id).await?;
    row.into_game(users, messages).map(Some)
}

/// Write the seat changes between `before` and `after` row by row.
async fn sync_users(
    conn: &mut SqliteConnection,
    id: &GameId,
    before: &BTreeMap<UserId, User>,
    after: &BTreeMap<UserId, User>,
) -> Result<(), RepositoryError> {
    for uid in before.keys().filter(|uid| !after.contains_key(*uid)) {
        sqlx::query("DELETE FROM game_users WHERE game_id = ? AND user_id = ?")
            .bind(id.as_str())
            .bind(uid.as_str())
            .execute(&mut *conn)
            .await
            .map_err(query_err)?;
    }

    for user in after.values() {
        match before.get(&user.id) {
            None => {
                sqlx::query(
                    "INSERT INTO game_users (game_id, user_id, name, joined_at) VALUES (?, ?, ?, ?)",
                )
                .bind(id.as_str())
                .bind(user.id.as_str())
                .bind(&user.metadata.name)
                .bind(format_datetime(&user.joined_at))
                .execute(&mut *conn)
                .await
                .map_err(query_err)?;
            }
            Some(old) if old.metadata.name != user.metadata.name => {
                sqlx::query("UPDATE game_users SET name = ? WHERE game_id = ? AND user_id = ?")
                    .bind(&user.metadata.name)
                    .bind(id.as_str())
                    .bind(user.id.as_str())
                    .execute(&mut *conn)
                    .await
                    .map_err(query_err)?;
            }
            Some(_) => {}
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// GameRepository impl
// ---------------------------------------------------------------------------

impl GameRepository for SqliteGameRepository {
    async fn exists(&self, id: &GameId) -> Result<bool, RepositoryError> {
        let row: (i64,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM games WHERE id = ?)")
            .bind(id.as_str())
            .fetch_one(&self.pool.reader)
            .await
            .map_err(query_err)?;
        Ok(row.0 != 0)
    }

    async fn get(&self, id: &GameId) -> Result<Option<Game>, RepositoryError> {
        let mut conn = self.pool.reader.acquire().await.map_err(query_err)?;
        load_game(&mut conn, id).await
    }

    async fn abridged(&self, id: &GameId) -> Result<Option<GameSummary>, RepositoryError> {
        let mut conn = self.pool.reader.acquire().await.map_err(query_err)?;
        fetch_row(&mut conn, id)
            .await?
            .map(GameRow::into_summary)
            .transpose()
    }

    async fn list(&self) -> Result<Vec<GameSummary>, RepositoryError> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM games g ORDER BY g.updated_at DESC, g.id ASC"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        let mut games = Vec::with_capacity(rows.len());
        for row in &rows {
            let r = GameRow::from_row(row).map_err(query_err)?;
            games.push(r.into_summary()?);
        }
        Ok(games)
    }

    async fn save(&self, game: &Game) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        sqlx::query(
            r#"INSERT INTO games
               (id, name, status, max_players, small_blind, big_blind, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 status = excluded.status,
                 max_players = excluded.max_players,
                 small_blind = excluded.small_blind,
                 big_blind = excluded.big_blind,
                 updated_at = excluded.updated_at"#,
        )
        .bind(game.id.as_str())
        .bind(&game.name)
        .bind(game.status.to_string())
        .bind(game.max_players as i64)
        .bind(to_i64(game.small_blind)?)
        .bind(to_i64(game.big_blind)?)
        .bind(format_datetime(&game.created_at))
        .bind(format_datetime(&game.updated_at))
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        sqlx::query("DELETE FROM game_users WHERE game_id = ?")
            .bind(game.id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

        for user in game.users.values() {
            sqlx::query(
                "INSERT INTO game_users (game_id, user_id, name, joined_at) VALUES (?, ?, ?, ?)",
            )
            .bind(game.id.as_str())
            .bind(user.id.as_str())
            .bind(&user.metadata.name)
            .bind(format_datetime(&user.joined_at))
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        }

        sqlx::query("DELETE FROM game_messages WHERE game_id = ?")
            .bind(game.id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

        for msg in &game.messages {
            sqlx::query(
                "INSERT INTO game_messages (game_id, user_id, message, timestamp) VALUES (?, ?, ?, ?)",
            )
            .bind(game.id.as_str())
            .bind(msg.user_id.as_str())
            .bind(&msg.message)
            .bind(format_datetime(&msg.timestamp))
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        }

        tx.commit().await.map_err(query_err)?;

        self.feed.publish(game.id.clone());
        Ok(())
    }

    async fn update<F, E>(&self, id: &GameId, apply: F) -> Result<Game, E>
    where
        F: FnOnce(&mut Game) -> Result<(), E> + Send,
        E: From<RepositoryError> + Send,
    {
        let now = Utc::now();
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        // Take the write lock before reading so the snapshot cannot go stale.
        let claimed = sqlx::query("UPDATE games SET updated_at = ? WHERE id = ?")
            .bind(format_datetime(&now))
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        if claimed.rows_affected() == 0 {
            return Err(RepositoryError::NotFound.into());
        }

        let mut game = load_game(&mut tx, id).await?.ok_or(RepositoryError::NotFound)?;
        let seated = game.users.clone();
        apply(&mut game)?;
        game.updated_at = now;

        sqlx::query(
            r#"UPDATE games SET
                 name = ?, status = ?, max_players = ?, small_blind = ?, big_blind = ?,
                 updated_at = ?
               WHERE id = ?"#,
        )
        .bind(&game.name)
        .bind(game.status.to_string())
        .bind(game.max_players as i64)
        .bind(to_i64(game.small_blind)?)
        .bind(to_i64(game.big_blind)?)
        .bind(format_datetime(&game.updated_at))
        .bind(id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        sync_users(&mut tx, id, &seated, &game.users).await?;

        tx.commit().await.map_err(query_err)?;

        self.feed.publish(id.clone());
        Ok(game)
    }

    async fn delete(&self, id: &GameId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM games WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;

        let removed = result.rows_affected() > 0;
        if removed {
            self.feed.publish(id.clone());
        }
        Ok(removed)
    }

    async fn add_message(&self, id: &GameId, message: &ChatMessage) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        let updated = sqlx::query("UPDATE games SET updated_at = ? WHERE id = ?")
            .bind(format_datetime(&Utc::now()))
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            "INSERT INTO game_messages (game_id, user_id, message, timestamp) VALUES (?, ?, ?, ?)",
        )
        .bind(id.as_str())
        .bind(message.user_id.as_str())
        .bind(&message.message)
        .bind(format_datetime(&message.timestamp))
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        tx.commit().await.map_err(query_err)?;

        self.feed.publish(id.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
