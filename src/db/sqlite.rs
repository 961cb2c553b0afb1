use crate::db::models::{DbAccount, DbQuestion, DbSession, SubmitOutcome};
use crate::db::schema::SQLITE_INIT;
use crate::error::ZakiError;
use crate::quota::QuotaStatus;
use backon::{ExponentialBuilder, Retryable};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub type SqlitePool = Pool<Sqlite>;

const ACCOUNT_COLUMNS: &str =
    "id, email, questions_count, is_paid_user, created_at, updated_at";

/// Open the pool and make sure the schema exists.
///
/// In-memory databases live as long as their connection, so they get a single
/// connection that is never recycled.
pub async fn connect(database_url: &str) -> Result<AccountStorage, ZakiError> {
    let connect_opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let mut pool_opts = SqlitePoolOptions::new();
    if database_url.contains(":memory:") {
        pool_opts = pool_opts
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }
    let pool = pool_opts.connect_with(connect_opts).await?;
    let storage = AccountStorage::new(pool);
    storage.init_schema().await?;
    Ok(storage)
}

/// [`connect`] with a few backed-off attempts, for process startup only.
pub async fn connect_with_retry(database_url: &str) -> Result<AccountStorage, ZakiError> {
    let policy = ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(200))
        .with_max_delay(Duration::from_secs(3))
        .with_max_times(5)
        .with_jitter();

    (|| connect(database_url))
        .retry(policy)
        .notify(|err, dur: Duration| {
            warn!(error = %err, "database connect failed, retrying in {:?}", dur);
        })
        .await
}

fn ts(dt: DateTime<Utc>) -> String {
    // fixed width so that TEXT comparison matches time order
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn to_count(v: i64) -> Result<u32, sqlx::Error> {
    u32::try_from(v).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

#[derive(Clone)]
pub struct AccountStorage {
    pool: SqlitePool,
}

impl AccountStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), ZakiError> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Insert a fresh account with a zero counter on the free tier.
    pub async fn create_account(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<DbAccount, ZakiError> {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        let res = sqlx::query(
            r#"INSERT INTO accounts
               (id, email, password_hash, questions_count, is_paid_user, created_at, updated_at)
               VALUES (?, ?, ?, 0, 0, ?, ?)"#,
        )
        .bind(&id)
        .bind(email)
        .bind(password_hash)
        .bind(ts(now))
        .bind(ts(now))
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => {}
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(ZakiError::EmailTaken);
            }
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %id, "account created");
        self.get_account(&id)
            .await?
            .ok_or(ZakiError::AccountNotFound(id))
    }

    pub async fn get_account(&self, id: &str) -> Result<Option<DbAccount>, ZakiError> {
        let row = sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_account).transpose()
    }

    /// Account plus its password hash, looked up case-insensitively by email.
    pub async fn credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<(DbAccount, String)>, ZakiError> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS}, password_hash FROM accounts WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => {
                let hash: String = row.try_get("password_hash")?;
                Ok(Some((Self::row_to_account(row)?, hash)))
            }
            None => Ok(None),
        }
    }

    pub async fn quota_status(&self, user_id: &str) -> Result<QuotaStatus, ZakiError> {
        self.get_account(user_id)
            .await?
            .map(|a| a.quota())
            .ok_or_else(|| ZakiError::AccountNotFound(user_id.to_string()))
    }

    /// Store one question and bump the counter, atomically.
    ///
    /// The increment is a single conditional `UPDATE ... RETURNING` that only
    /// matches when `is_paid_user` is set or `questions_count < free_limit`, so
    /// concurrent submissions cannot both pass the check on a stale read. The
    /// insert runs in the same transaction: either both rows change or neither.
    pub async fn submit_question(
        &self,
        user_id: &str,
        question: &str,
        free_limit: u32,
    ) -> Result<SubmitOutcome, ZakiError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"UPDATE accounts
               SET questions_count = questions_count + 1, updated_at = ?
               WHERE id = ? AND (is_paid_user = 1 OR questions_count < ?)
               RETURNING questions_count, is_paid_user"#,
        )
        .bind(ts(now))
        .bind(user_id)
        .bind(i64::from(free_limit))
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = updated else {
            tx.rollback().await?;
            let status = self.quota_status(user_id).await?;
            debug!(user_id, count = status.questions_count, "submission blocked by quota");
            return Ok(SubmitOutcome::LimitReached(status));
        };
        let status = QuotaStatus {
            questions_count: to_count(row.try_get("questions_count")?)?,
            is_paid_user: row.try_get::<i64, _>("is_paid_user")? != 0,
        };

        let question = DbQuestion {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            question: question.to_string(),
            created_at: now,
            updated_at: now,
        };
        sqlx::query(
            r#"INSERT INTO questions (id, user_id, question, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(&question.id)
        .bind(&question.user_id)
        .bind(&question.question)
        .bind(ts(now))
        .bind(ts(now))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(SubmitOutcome::Accepted { question, status })
    }

    /// Administrative upgrade (or downgrade). The counter is left untouched.
    pub async fn set_paid(&self, user_id: &str, is_paid_user: bool) -> Result<DbAccount, ZakiError> {
        let res = sqlx::query("UPDATE accounts SET is_paid_user = ?, updated_at = ? WHERE id = ?")
            .bind(i64::from(is_paid_user))
            .bind(ts(Utc::now()))
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(ZakiError::AccountNotFound(user_id.to_string()));
        }
        self.get_account(user_id)
            .await?
            .ok_or_else(|| ZakiError::AccountNotFound(user_id.to_string()))
    }

    pub async fn list_questions(&self, user_id: &str) -> Result<Vec<DbQuestion>, ZakiError> {
        let rows = sqlx::query(
            r#"SELECT id, user_id, question, created_at, updated_at
               FROM questions WHERE user_id = ? ORDER BY created_at, id"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_question).collect()
    }

    pub async fn insert_session(&self, session: &DbSession) -> Result<(), ZakiError> {
        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.token)
        .bind(&session.user_id)
        .bind(ts(session.created_at))
        .bind(ts(session.expires_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Live session for `token` with its account; expired tokens yield `None`.
    pub async fn find_session(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<(DbSession, DbAccount)>, ZakiError> {
        let row = sqlx::query(
            r#"SELECT s.token, s.user_id, s.created_at AS s_created_at, s.expires_at,
                      a.id, a.email, a.questions_count, a.is_paid_user, a.created_at, a.updated_at
               FROM sessions s JOIN accounts a ON a.id = s.user_id
               WHERE s.token = ? AND s.expires_at > ?"#,
        )
        .bind(token)
        .bind(ts(now))
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let session = DbSession {
            token: row.try_get("token")?,
            user_id: row.try_get("user_id")?,
            created_at: parse_ts(&row.try_get::<String, _>("s_created_at")?)?,
            expires_at: parse_ts(&row.try_get::<String, _>("expires_at")?)?,
        };
        Ok(Some((session, Self::row_to_account(row)?)))
    }

    /// Returns whether a session was removed.
    pub async fn delete_session(&self, token: &str) -> Result<bool, ZakiError> {
        let res = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, ZakiError> {
        let res = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(ts(now))
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    pub async fn insert_password_reset(
        &self,
        token: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), ZakiError> {
        sqlx::query(
            r#"INSERT INTO password_resets (token, user_id, created_at, expires_at, used_at)
               VALUES (?, ?, ?, ?, NULL)"#,
        )
        .bind(token)
        .bind(user_id)
        .bind(ts(Utc::now()))
        .bind(ts(expires_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Burn a reset token and replace the password hash. All sessions of the
    /// account are dropped. Returns the account id, or `None` if the token is
    /// unknown, used or expired.
    pub async fn consume_password_reset(
        &self,
        token: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, ZakiError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            r#"UPDATE password_resets SET used_at = ?
               WHERE token = ? AND used_at IS NULL AND expires_at > ?
               RETURNING user_id"#,
        )
        .bind(ts(now))
        .bind(token)
        .bind(ts(now))
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        let user_id: String = row.try_get("user_id")?;

        sqlx::query("UPDATE accounts SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(new_password_hash)
            .bind(ts(now))
            .bind(&user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(&user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(user_id))
    }

    fn row_to_account(row: SqliteRow) -> Result<DbAccount, ZakiError> {
        let id: String = row.try_get("id")?;
        let email: String = row.try_get("email")?;
        let questions_count: i64 = row.try_get("questions_count")?;
        let is_paid_i: i64 = row.try_get("is_paid_user")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(DbAccount {
            id,
            email,
            questions_count: to_count(questions_count)?,
            is_paid_user: is_paid_i != 0,
            created_at: parse_ts(&created_at)?,
            updated_at: parse_ts(&updated_at)?,
        })
    }

    fn row_to_question(row: SqliteRow) -> Result<DbQuestion, ZakiError> {
        Ok(DbQuestion {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            question: row.try_get("question")?,
            created_at: parse_ts(&row.try_get::<String, _>("created_at")?)?,
            updated_at: parse_ts(&row.try_get::<String, _>("updated_at")?)?,
        })
    }
}
