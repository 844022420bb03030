use std::future::Future;

use anyhow::{bail, Context, Result};
use thiserror::Error;

use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use sqlx::postgres::{PgConnectOptions, PgRow};
use sqlx::{query, Executor, PgPool, Row};

use warbler_app::data_access::{DataAccess, TIMELINE_LOAD_LIMIT};
use warbler_app::{Message, MessageId, User, UserId};
use warbler_auth::{AuthStorage, AuthenticationInfo};

pub const MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();
const DB_VERSION: i64 = 1;

#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    pub async fn new(connection_string: &str) -> Result<Self> {
        let options: PgConnectOptions = connection_string.parse()?;
        let pool = PgPool::connect_with(options).await?;

        Ok(Db { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Db { pool }
    }

    pub fn graceful_shutdown(
        &self,
        cancellation_token: CancellationToken,
    ) -> impl Future<Output = Result<(), JoinError>> {
        let pool_cloned = self.pool.clone();
        tokio::spawn(async move {
            cancellation_token.cancelled().await;
            eprintln!("Shutting down database connection...");
            pool_cloned.close().await;
            eprintln!("Shutting down database connection...Success");
        })
    }

    pub async fn check_migrations(&self) -> Result<()> {
        let migrations_table_exists: bool = self.pool
            .acquire().await?
            .fetch_one(query("select exists (select from pg_tables where (schemaname = 'public') and (tablename = '_sqlx_migrations'))"))
            .await?
            .get(0);

        if !migrations_table_exists {
            bail!("Database uninitialized. Please migrate database using the 'migrate' tool");
        }

        let latest_version: i64 = self
            .pool
            .acquire()
            .await?
            .fetch_optional(query(
                "select version from _sqlx_migrations order by version desc limit 1",
            ))
            .await?
            .map(|row| row.get(0))
            .unwrap_or(-1);

        if latest_version < DB_VERSION {
            bail!("Database schema not up to date. Please migrate database using the 'migrate' tool")
        } else if latest_version > DB_VERSION {
            bail!("Application not up to date with the database. Please use a newer version of the app or undo database migrations until version {}", DB_VERSION)
        };

        Ok(())
    }

    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.context("Couldn't migrate")
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Postgres error: {0}")]
    PgError(#[from] sqlx::Error),
    #[error("Auth info parsing error: {0}")]
    AuthInfoParsingError(#[from] warbler_auth::AuthenticationInfoParsingError),
}

const USER_COLUMNS: &str = "user_id, username, email, image_url, header_image_url, bio, location";

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get(0),
        username: row.get(1),
        email: row.get(2),
        image_url: row.get(3),
        header_image_url: row.get(4),
        bio: row.get(5),
        location: row.get(6),
    }
}

fn message_from_row(row: &PgRow) -> Message {
    Message {
        id: row.get(0),
        user_id: row.get(1),
        text: row.get(2),
        timestamp: row.get(3),
    }
}

impl DataAccess for Db {
    type Error = Error;

    async fn fetch_users(&self) -> Result<Vec<User>, Self::Error> {
        let res = self
            .pool
            .acquire()
            .await?
            .fetch_all(query(&format!("select {USER_COLUMNS} from users")))
            .await?
            .iter()
            .map(user_from_row)
            .collect();
        Ok(res)
    }

    async fn fetch_user(&self, user_id: &UserId) -> Result<Option<User>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let res = conn
            .fetch_optional(
                query(&format!(
                    "select {USER_COLUMNS} from users where user_id = $1"
                ))
                .bind(user_id),
            )
            .await?
            .map(|row| user_from_row(&row));
        Ok(res)
    }

    async fn find_user_by_username(
        &self,
        requested_username: &str,
    ) -> Result<Option<UserId>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let res = conn
            .fetch_optional(
                query("select user_id from users where lower(username) = $1")
                    .bind(requested_username.to_lowercase()),
            )
            .await?;
        Ok(res.map(|row| row.get(0)))
    }

    async fn find_user_by_email(&self, requested_email: &str) -> Result<Option<UserId>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let res = conn
            .fetch_optional(
                query("select user_id from users where lower(email) = $1")
                    .bind(requested_email.to_lowercase()),
            )
            .await?;
        Ok(res.map(|row| row.get(0)))
    }

    async fn find_users_by_substring(&self, search_query: &str) -> Result<Vec<User>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let res = conn
            .fetch_all(
                query(&format!(
                    "select {USER_COLUMNS} from users where lower(username) like $1"
                ))
                .bind(format!("%{}%", search_query.to_lowercase())),
            )
            .await?
            .iter()
            .map(user_from_row)
            .collect();
        Ok(res)
    }

    async fn create_user(&self, user: &User) -> Result<bool, Self::Error> {
        let mut transaction = self.pool.begin().await?;

        transaction
            .execute("lock table users in exclusive mode;")
            .await?;

        let identity_taken: bool = transaction
            .fetch_one(
                query(
                    "select exists(select 1 from users where lower(username) = $1 or lower(email) = $2)",
                )
                .bind(user.username.to_lowercase())
                .bind(user.email.to_lowercase()),
            )
            .await?
            .get(0);

        if identity_taken {
            return Ok(false);
        };

        transaction
            .execute(
                query(&format!(
                    "insert into users({USER_COLUMNS}) values ($1, $2, $3, $4, $5, $6, $7)"
                ))
                .bind(user.id)
                .bind(&user.username)
                .bind(&user.email)
                .bind(&user.image_url)
                .bind(&user.header_image_url)
                .bind(&user.bio)
                .bind(&user.location),
            )
            .await?;

        transaction.commit().await?;

        Ok(true)
    }

    async fn update_user(&self, user: &User) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let res = conn
            .execute(
                query(
                    "update users set username = $2, email = $3, image_url = $4, \
                     header_image_url = $5, bio = $6, location = $7 where user_id = $1",
                )
                .bind(user.id)
                .bind(&user.username)
                .bind(&user.email)
                .bind(&user.image_url)
                .bind(&user.header_image_url)
                .bind(&user.bio)
                .bind(&user.location),
            )
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_user(&self, user_id: &UserId) -> Result<bool, Self::Error> {
        let mut transaction = self.pool.begin().await?;

        // dependent rows first: likes, follow edges, messages, credentials
        transaction
            .execute(query("delete from likes where user_id = $1").bind(user_id))
            .await?;
        transaction
            .execute(
                query(
                    "delete from likes where message_id in \
                     (select id from messages where user_id = $1)",
                )
                .bind(user_id),
            )
            .await?;
        transaction
            .execute(
                query("delete from follows where follower_id = $1 or followed_id = $1")
                    .bind(user_id),
            )
            .await?;
        transaction
            .execute(query("delete from messages where user_id = $1").bind(user_id))
            .await?;
        transaction
            .execute(query("delete from auth where user_id = $1").bind(user_id))
            .await?;
        let res = transaction
            .execute(query("delete from users where user_id = $1").bind(user_id))
            .await?;

        transaction.commit().await?;

        Ok(res.rows_affected() > 0)
    }

    async fn create_message(&self, message: &Message) -> Result<(), Self::Error> {
        let mut conn = self.pool.acquire().await?;
        conn.execute(
            query("insert into messages(id, user_id, text, timestamp) values ($1, $2, $3, $4)")
                .bind(message.id)
                .bind(message.user_id)
                .bind(&message.text)
                .bind(message.timestamp),
        )
        .await?;
        Ok(())
    }

    async fn fetch_message(&self, message_id: &MessageId) -> Result<Option<Message>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let res = conn
            .fetch_optional(
                query("select id, user_id, text, timestamp from messages where id = $1")
                    .bind(message_id),
            )
            .await?
            .map(|row| message_from_row(&row));
        Ok(res)
    }

    async fn fetch_user_messages(&self, user_id: &UserId) -> Result<Vec<Message>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let res = conn
            .fetch_all(
                query(
                    "select id, user_id, text, timestamp from messages \
                     where user_id = $1 order by timestamp desc, id desc",
                )
                .bind(user_id),
            )
            .await?
            .iter()
            .map(message_from_row)
            .collect();
        Ok(res)
    }

    async fn fetch_timeline(&self, user_id: &UserId) -> Result<Vec<Message>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let res = conn
            .fetch_all(
                query(
                    "select id, user_id, text, timestamp from messages \
                     where user_id = $1 or user_id in \
                     (select followed_id from follows where follower_id = $1) \
                     order by timestamp desc, id desc limit $2",
                )
                .bind(user_id)
                .bind(TIMELINE_LOAD_LIMIT),
            )
            .await?
            .iter()
            .map(message_from_row)
            .collect();
        Ok(res)
    }

    async fn delete_message(&self, message_id: &MessageId) -> Result<bool, Self::Error> {
        let mut transaction = self.pool.begin().await?;

        transaction
            .execute(query("delete from likes where message_id = $1").bind(message_id))
            .await?;
        let res = transaction
            .execute(query("delete from messages where id = $1").bind(message_id))
            .await?;

        transaction.commit().await?;

        Ok(res.rows_affected() > 0)
    }

    async fn create_follow(
        &self,
        follower_id: &UserId,
        followed_id: &UserId,
    ) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let res = conn
            .execute(
                query(
                    "insert into follows(follower_id, followed_id) values ($1, $2) \
                     on conflict do nothing",
                )
                .bind(follower_id)
                .bind(followed_id),
            )
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_follow(
        &self,
        follower_id: &UserId,
        followed_id: &UserId,
    ) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let res = conn
            .execute(
                query("delete from follows where follower_id = $1 and followed_id = $2")
                    .bind(follower_id)
                    .bind(followed_id),
            )
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn follow_exists(
        &self,
        follower_id: &UserId,
        followed_id: &UserId,
    ) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let res = conn
            .fetch_one(
                query(
                    "select exists(select 1 from follows \
                     where follower_id = $1 and followed_id = $2)",
                )
                .bind(follower_id)
                .bind(followed_id),
            )
            .await?
            .get(0);
        Ok(res)
    }

    async fn fetch_following(&self, user_id: &UserId) -> Result<Vec<User>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let res = conn
            .fetch_all(
                query(
                    "select u.user_id, u.username, u.email, u.image_url, \
                     u.header_image_url, u.bio, u.location \
                     from follows f join users u on u.user_id = f.followed_id \
                     where f.follower_id = $1 order by lower(u.username)",
                )
                .bind(user_id),
            )
            .await?
            .iter()
            .map(user_from_row)
            .collect();
        Ok(res)
    }

    async fn fetch_followers(&self, user_id: &UserId) -> Result<Vec<User>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let res = conn
            .fetch_all(
                query(
                    "select u.user_id, u.username, u.email, u.image_url, \
                     u.header_image_url, u.bio, u.location \
                     from follows f join users u on u.user_id = f.follower_id \
                     where f.followed_id = $1 order by lower(u.username)",
                )
                .bind(user_id),
            )
            .await?
            .iter()
            .map(user_from_row)
            .collect();
        Ok(res)
    }

    async fn create_like(
        &self,
        user_id: &UserId,
        message_id: &MessageId,
    ) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let res = conn
            .execute(
                query(
                    "insert into likes(user_id, message_id) values ($1, $2) \
                     on conflict do nothing",
                )
                .bind(user_id)
                .bind(message_id),
            )
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_like(
        &self,
        user_id: &UserId,
        message_id: &MessageId,
    ) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let res = conn
            .execute(
                query("delete from likes where user_id = $1 and message_id = $2")
                    .bind(user_id)
                    .bind(message_id),
            )
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn fetch_liked_messages(&self, user_id: &UserId) -> Result<Vec<Message>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let res = conn
            .fetch_all(
                query(
                    "select m.id, m.user_id, m.text, m.timestamp \
                     from likes l join messages m on m.id = l.message_id \
                     where l.user_id = $1 order by m.timestamp desc, m.id desc",
                )
                .bind(user_id),
            )
            .await?
            .iter()
            .map(message_from_row)
            .collect();
        Ok(res)
    }
}

impl AuthStorage for Db {
    type Error = Error;

    async fn fetch_authentication(
        &self,
        user_id: &UserId,
    ) -> Result<Option<AuthenticationInfo>, Self::Error> {
        let res = self
            .pool
            .acquire()
            .await?
            .fetch_optional(query("select phc_string from auth where user_id = $1").bind(user_id))
            .await?;

        match res {
            Some(row) => {
                let phc_string: &str = row.get(0);
                let auth_info = phc_string.parse()?;
                Ok(Some(auth_info))
            }
            None => Ok(None),
        }
    }

    async fn update_authentication(
        &self,
        user_id: &UserId,
        auth_info: AuthenticationInfo,
    ) -> Result<Option<AuthenticationInfo>, Self::Error> {
        let mut transaction = self.pool.begin().await?;
        transaction
            .execute(query("lock table auth in exclusive mode"))
            .await?;
        let old_auth = transaction
            .fetch_optional(query("select phc_string from auth where user_id = $1").bind(user_id))
            .await?;

        match old_auth {
            Some(row) => {
                let old_phc_string: &str = row.get(0);
                let old_auth: AuthenticationInfo = old_phc_string.parse()?;
                transaction
                    .execute(
                        query("update auth set phc_string = $1 where user_id = $2")
                            .bind(auth_info.phc_string().to_string())
                            .bind(user_id),
                    )
                    .await?;
                transaction.commit().await?;
                Ok(Some(old_auth))
            }
            None => {
                transaction
                    .execute(
                        query("insert into auth (user_id, phc_string) values ($1, $2)")
                            .bind(user_id)
                            .bind(auth_info.phc_string().to_string()),
                    )
                    .await?;
                transaction.commit().await?;
                Ok(None)
            }
        }
    }
}
