use std::future::Future;

use crate::UserId;

macro_rules! async_result {
    ($t:ty) => {
        impl Future<Output = Result<$t, Self::Error>> + Send
    };
}

/// Credential checking seam. Implementations store a one-way hash, never the
/// raw password.
pub trait AuthService: 'static + Send + Sync + Clone {
    type Error: 'static + std::error::Error + Send + Sync;

    fn verify_password(&self, user_id: &UserId, password: String) -> async_result!(bool);
    fn set_password(&self, user_id: &UserId, password: String) -> async_result!(());
}
