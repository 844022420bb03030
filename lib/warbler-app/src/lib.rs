use chrono::DateTime;
use uuid::Uuid;

pub mod app;
pub mod authorization;
pub mod data_access;
pub mod error;

pub type UserId = Uuid;
pub type MessageId = Uuid;

pub const DEFAULT_IMAGE_URL: &str = "/static/images/default-pic.png";
pub const DEFAULT_HEADER_IMAGE_URL: &str = "/static/images/warbler-hero.jpg";

/// Hard cap on message text, counted in characters.
pub const MESSAGE_MAX_LENGTH: usize = 140;

#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub user_id: UserId,
    pub text: String,
    pub timestamp: DateTime<chrono::Utc>,
}

/// Signup input. Omitted image urls fall back to the stock pictures.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub image_url: Option<String>,
}

/// Profile edit input. `None` fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}
