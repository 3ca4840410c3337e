// SQLite implementation of the UserStore trait

use crate::core::economy::{EconomyError, UserRecord, UserStore, UserUpdate, XpChange};
use crate::core::leveling::level_from_xp;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};

#[derive(Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
}

fn storage(e: sqlx::Error) -> EconomyError {
    EconomyError::StorageError(e.to_string())
}

fn row_to_user(row: &SqliteRow) -> UserRecord {
    UserRecord {
        user_id: row.get::<i64, _>("user_id") as u64,
        xp: row.get("xp"),
        level: row.get("level"),
        coins: row.get("coins"),
        invites: row.get("invites"),
    }
}

impl SqliteUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Run database migrations to create tables.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY,
                xp INTEGER NOT NULL DEFAULT 0,
                level INTEGER NOT NULL DEFAULT 1,
                coins INTEGER NOT NULL DEFAULT 0,
                invites INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_users_rank
            ON users(level DESC, xp DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn ensure_user(&self, user_id: u64) -> Result<(), EconomyError> {
        sqlx::query("INSERT OR IGNORE INTO users (user_id) VALUES (?)")
            .bind(user_id as i64)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }
}

async fn ensure_user_in(tx: &mut Transaction<'_, Sqlite>, user_id: u64) -> Result<(), EconomyError> {
    sqlx::query("INSERT OR IGNORE INTO users (user_id) VALUES (?)")
        .bind(user_id as i64)
        .execute(&mut **tx)
        .await
        .map_err(storage)?;
    Ok(())
}

/// Credit (or debit) coins on an existing connection, creating the user row
/// if needed. Lets other stores pay users inside their own transaction.
pub(crate) async fn credit_coins(
    conn: &mut SqliteConnection,
    user_id: u64,
    delta: i64,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO users (user_id, coins) VALUES (?, MAX(?, 0))
        ON CONFLICT(user_id) DO UPDATE SET coins = MAX(users.coins + ?, 0)
        RETURNING coins
        "#,
    )
    .bind(user_id as i64)
    .bind(delta)
    .bind(delta)
    .fetch_one(conn)
    .await?;

    Ok(row.get("coins"))
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn get_user(&self, user_id: u64) -> Result<UserRecord, EconomyError> {
        self.ensure_user(user_id).await?;

        let row = sqlx::query(
            "SELECT user_id, xp, level, coins, invites FROM users WHERE user_id = ?",
        )
        .bind(user_id as i64)
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;

        Ok(row_to_user(&row))
    }

    async fn update_user(
        &self,
        user_id: u64,
        update: UserUpdate,
    ) -> Result<UserRecord, EconomyError> {
        let update = update.normalized();
        self.ensure_user(user_id).await?;

        // NULL binds leave the column as it was; MAX() of NULL is NULL.
        let row = sqlx::query(
            r#"
            UPDATE users
            SET xp = COALESCE(MAX(?, 0), xp),
                level = COALESCE(MAX(?, 1), level),
                coins = COALESCE(MAX(?, 0), coins),
                invites = COALESCE(MAX(?, 0), invites)
            WHERE user_id = ?
            RETURNING user_id, xp, level, coins, invites
            "#,
        )
        .bind(update.xp)
        .bind(update.level)
        .bind(update.coins)
        .bind(update.invites)
        .bind(user_id as i64)
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;

        Ok(row_to_user(&row))
    }

    async fn add_coins(&self, user_id: u64, delta: i64) -> Result<i64, EconomyError> {
        let mut conn = self.pool.acquire().await.map_err(storage)?;
        credit_coins(&mut conn, user_id, delta).await.map_err(storage)
    }

    async fn spend_coins(&self, user_id: u64, amount: i64) -> Result<Option<i64>, EconomyError> {
        self.ensure_user(user_id).await?;

        let row = sqlx::query(
            r#"
            UPDATE users SET coins = coins - ?
            WHERE user_id = ? AND coins >= ?
            RETURNING coins
            "#,
        )
        .bind(amount)
        .bind(user_id as i64)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        Ok(row.map(|r| r.get("coins")))
    }

    async fn settle_wager(
        &self,
        user_id: u64,
        stake: i64,
        payout: i64,
    ) -> Result<Option<i64>, EconomyError> {
        self.ensure_user(user_id).await?;

        let row = sqlx::query(
            r#"
            UPDATE users SET coins = coins - ? + ?
            WHERE user_id = ? AND coins >= ?
            RETURNING coins
            "#,
        )
        .bind(stake)
        .bind(payout)
        .bind(user_id as i64)
        .bind(stake)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        Ok(row.map(|r| r.get("coins")))
    }

    async fn transfer_coins(
        &self,
        from: u64,
        to: u64,
        amount: i64,
    ) -> Result<Option<(i64, i64)>, EconomyError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        ensure_user_in(&mut tx, from).await?;
        ensure_user_in(&mut tx, to).await?;

        let debited = sqlx::query(
            r#"
            UPDATE users SET coins = coins - ?
            WHERE user_id = ? AND coins >= ?
            RETURNING coins
            "#,
        )
        .bind(amount)
        .bind(from as i64)
        .bind(amount)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage)?;

        let Some(debited) = debited else {
            tx.rollback().await.map_err(storage)?;
            return Ok(None);
        };

        let credited = sqlx::query(
            "UPDATE users SET coins = coins + ? WHERE user_id = ? RETURNING coins",
        )
        .bind(amount)
        .bind(to as i64)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage)?;

        tx.commit().await.map_err(storage)?;
        Ok(Some((debited.get("coins"), credited.get("coins"))))
    }

    async fn add_xp(&self, user_id: u64, delta: i64) -> Result<XpChange, EconomyError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        ensure_user_in(&mut tx, user_id).await?;

        // `level` is untouched by this statement, so RETURNING gives the old level.
        let row = sqlx::query(
            r#"
            UPDATE users SET xp = MAX(xp + ?, 0)
            WHERE user_id = ?
            RETURNING xp, level
            "#,
        )
        .bind(delta)
        .bind(user_id as i64)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage)?;

        let total_xp: i64 = row.get("xp");
        let old_level: i64 = row.get("level");
        let new_level = level_from_xp(total_xp);

        if new_level != old_level {
            sqlx::query("UPDATE users SET level = ? WHERE user_id = ?")
                .bind(new_level)
                .bind(user_id as i64)
                .execute(&mut *tx)
                .await
                .map_err(storage)?;
        }

        tx.commit().await.map_err(storage)?;

        Ok(XpChange {
            user_id,
            old_level,
            new_level,
            total_xp,
        })
    }

    async fn add_invites(&self, user_id: u64, delta: i64) -> Result<i64, EconomyError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (user_id, invites) VALUES (?, MAX(?, 0))
            ON CONFLICT(user_id) DO UPDATE SET invites = MAX(users.invites + ?, 0)
            RETURNING invites
            "#,
        )
        .bind(user_id as i64)
        .bind(delta)
        .bind(delta)
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;

        Ok(row.get("invites"))
    }

    async fn get_top_users(&self, limit: usize) -> Result<Vec<UserRecord>, EconomyError> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, xp, level, coins, invites
            FROM users
            ORDER BY level DESC, xp DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        Ok(rows.iter().map(row_to_user).collect())
    }

    async fn get_top_inviters(&self, limit: usize) -> Result<Vec<UserRecord>, EconomyError> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, xp, level, coins, invites
            FROM users
            WHERE invites > 0
            ORDER BY invites DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        Ok(rows.iter().map(row_to_user).collect())
    }
}
