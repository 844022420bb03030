use std::future::Future;
use std::str::FromStr;

use anyhow::{bail, Context};
use thiserror::Error;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use warbler_app::authorization::AuthService;
use warbler_app::UserId;

macro_rules! async_result {
    ($t:ty) => {
        impl Future<Output = Result<$t, Self::Error>> + Send
    };
}

/// Where PHC strings live. On user deletion the backing store drops the
/// record together with the user row.
pub trait AuthStorage: 'static + Send + Sync + Clone {
    type Error: 'static + std::error::Error + Send + Sync;

    fn fetch_authentication(&self, user_id: &UserId) -> async_result!(Option<AuthenticationInfo>);
    fn update_authentication(
        &self,
        user_id: &UserId,
        auth_info: AuthenticationInfo,
    ) -> async_result!(Option<AuthenticationInfo>);
}

#[derive(Debug, Error)]
#[error(transparent)]
pub struct PasswordAuthenticatorError(#[from] anyhow::Error);

/// Argon2-backed implementation of the credential seam. Hashing and
/// verification run on blocking threads.
#[derive(Clone)]
pub struct PasswordAuthenticator<S> {
    storage: S,
}

impl<S> PasswordAuthenticator<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }
}

impl<S: AuthStorage> AuthService for PasswordAuthenticator<S> {
    type Error = PasswordAuthenticatorError;

    async fn verify_password(
        &self,
        user_id: &UserId,
        password: String,
    ) -> Result<bool, Self::Error> {
        let auth_info = match self
            .storage
            .fetch_authentication(user_id)
            .await
            .with_context(|| format!("Couldn't fetch authentication for {user_id}"))?
        {
            Some(auth_info) => auth_info,
            None => return Ok(false),
        };

        let handle = tokio::task::spawn_blocking(move || {
            let password_hash = auth_info.phc_string().password_hash();
            Argon2::default()
                .verify_password(password.as_bytes(), &password_hash)
                .is_ok()
        });

        let res = handle
            .await
            .context("Password verification thread failed")?;
        Ok(res)
    }

    async fn set_password(&self, user_id: &UserId, password: String) -> Result<(), Self::Error> {
        let handle = tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(OsRng);
            let password_hash = match Argon2::default().hash_password(password.as_bytes(), &salt) {
                Ok(hash) => hash,
                Err(e) => bail!("Couldn't generate password hash: {e}"),
            };
            Ok(AuthenticationInfo::from(password_hash))
        });

        let auth_info = handle
            .await
            .context("Password hash generation thread failed")??;
        self.storage
            .update_authentication(user_id, auth_info)
            .await
            .with_context(|| format!("Couldn't update authentication for {user_id}"))?;
        Ok(())
    }
}

/// A stored credential: the argon2 PHC string, nothing else.
pub struct AuthenticationInfo {
    phc_string: password_hash::PasswordHashString,
}

impl AuthenticationInfo {
    pub fn phc_string(&self) -> &password_hash::PasswordHashString {
        &self.phc_string
    }
}

impl<'a> From<password_hash::PasswordHash<'a>> for AuthenticationInfo {
    fn from(value: password_hash::PasswordHash<'a>) -> Self {
        AuthenticationInfo {
            phc_string: value.into(),
        }
    }
}

impl From<password_hash::PasswordHashString> for AuthenticationInfo {
    fn from(value: password_hash::PasswordHashString) -> Self {
        AuthenticationInfo { phc_string: value }
    }
}

impl FromStr for AuthenticationInfo {
    type Err = AuthenticationInfoParsingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse() {
            Ok(phc_string) => Ok(AuthenticationInfo { phc_string }),
            Err(_) => Err(AuthenticationInfoParsingError::IncorrectPhcString(
                s.to_owned(),
            )),
        }
    }
}

#[derive(Error, Debug)]
pub enum AuthenticationInfoParsingError {
    #[error("Incorrect phc string: {0}")]
    IncorrectPhcString(String),
}
