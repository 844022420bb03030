use warbler_app::app::Warbler;
use warbler_app::authorization::AuthService;
use warbler_app::error::Error;
use warbler_app::{NewUser, ProfileUpdate, UserId};
use warbler_auth::PasswordAuthenticator;

type App = Warbler<mock_db::Db, PasswordAuthenticator<mock_db::Db>>;

fn make_app() -> App {
    let db = mock_db::Db::new();
    Warbler::new(db.clone(), PasswordAuthenticator::new(db))
}

fn new_user(username: &str, email: &str) -> NewUser {
    NewUser {
        username: username.into(),
        email: email.into(),
        image_url: None,
    }
}

async fn sign_up(app: &App, username: &str, email: &str, password: &str) -> UserId {
    app.sign_up(new_user(username, email), password.into())
        .await
        .unwrap()
}

#[tokio::test]
async fn basic_user_model_works() {
    let app = make_app();
    let user_id = sign_up(&app, "testuser", "test@test.com", "HASHED_PASSWORD").await;

    let user = app.fetch_user(&user_id).await.unwrap().unwrap();
    assert_eq!(user.username, "testuser");
    assert_eq!(user.email, "test@test.com");
    assert_eq!(user.image_url, warbler_app::DEFAULT_IMAGE_URL);

    // a fresh user has no messages and no followers
    assert!(app.user_messages(&user_id).await.unwrap().is_empty());
    assert!(app.followers(&user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn signup_then_authenticate_returns_same_user() {
    let app = make_app();
    let user_id = sign_up(&app, "testuser", "test@test.com", "password123").await;

    let authenticated = app
        .authenticate("testuser", "password123".into())
        .await
        .unwrap();
    assert_eq!(authenticated, Some(user_id));
}

#[tokio::test]
async fn authenticate_rejects_wrong_password_and_unknown_username() {
    let app = make_app();
    sign_up(&app, "testuser", "test@test.com", "password123").await;

    let wrong_password = app
        .authenticate("testuser", "wrongpassword".into())
        .await
        .unwrap();
    assert_eq!(wrong_password, None);

    let unknown_username = app
        .authenticate("nobody", "password123".into())
        .await
        .unwrap();
    assert_eq!(unknown_username, None);
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let app = make_app();
    sign_up(&app, "testuser", "test@test.com", "password123").await;

    let res = app
        .sign_up(new_user("testuser", "other@test.com"), "password123".into())
        .await;
    assert!(matches!(res, Err(Error::DuplicateIdentity)));

    // no new row was created
    assert_eq!(app.fetch_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = make_app();
    sign_up(&app, "testuser", "test@test.com", "password123").await;

    let res = app
        .sign_up(new_user("otheruser", "test@test.com"), "password123".into())
        .await;
    assert!(matches!(res, Err(Error::DuplicateIdentity)));
    assert_eq!(app.fetch_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_identity_check_ignores_case() {
    let app = make_app();
    sign_up(&app, "testuser", "test@test.com", "password123").await;

    let res = app
        .sign_up(new_user("TestUser", "other@test.com"), "password123".into())
        .await;
    assert!(matches!(res, Err(Error::DuplicateIdentity)));

    let res = app
        .sign_up(new_user("otheruser", "TEST@TEST.COM"), "password123".into())
        .await;
    assert!(matches!(res, Err(Error::DuplicateIdentity)));

    assert_eq!(app.fetch_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn empty_signup_fields_are_rejected() {
    let app = make_app();

    let res = app
        .sign_up(new_user("", "test@test.com"), "password123".into())
        .await;
    assert!(matches!(res, Err(Error::ValidationFailure(_))));

    let res = app
        .sign_up(new_user("testuser", "test@test.com"), "".into())
        .await;
    assert!(matches!(res, Err(Error::ValidationFailure(_))));

    assert!(app.fetch_users().await.unwrap().is_empty());
}

#[tokio::test]
async fn follow_works_in_both_directions() {
    let app = make_app();
    let followed = sign_up(&app, "followed_testuser", "tester1@testcase.com", "pw").await;
    let following = sign_up(&app, "following_testuser", "tester2@testcase.com", "pw").await;

    app.follow(&following, &followed).await.unwrap();

    assert!(app.is_followed_by(&followed, &following).await.unwrap());
    assert!(app.is_following(&following, &followed).await.unwrap());
}

#[tokio::test]
async fn unfollow_removes_the_edge() {
    let app = make_app();
    let followed = sign_up(&app, "followed_testuser", "tester1@testcase.com", "pw").await;
    let following_1 = sign_up(&app, "following_testuser", "tester2@testcase.com", "pw").await;
    let following_2 = sign_up(&app, "following_testuser_too", "tester3@testcase.com", "pw").await;

    app.follow(&following_1, &followed).await.unwrap();
    app.follow(&following_2, &followed).await.unwrap();
    assert_eq!(app.followers(&followed).await.unwrap().len(), 2);

    app.unfollow(&following_1, &followed).await.unwrap();

    let followers = app.followers(&followed).await.unwrap();
    assert_eq!(followers.len(), 1);
    assert_eq!(followers[0].id, following_2);
    assert!(!app.is_following(&following_1, &followed).await.unwrap());
    assert!(!app.is_followed_by(&followed, &following_1).await.unwrap());
}

#[tokio::test]
async fn unfollow_without_edge_is_a_noop() {
    let app = make_app();
    let user_1 = sign_up(&app, "user1", "user1@test.com", "pw").await;
    let user_2 = sign_up(&app, "user2", "user2@test.com", "pw").await;

    app.unfollow(&user_1, &user_2).await.unwrap();
    assert!(!app.is_following(&user_1, &user_2).await.unwrap());
}

#[tokio::test]
async fn duplicate_follow_is_a_noop() {
    let app = make_app();
    let followed = sign_up(&app, "followed", "followed@test.com", "pw").await;
    let following = sign_up(&app, "following", "following@test.com", "pw").await;

    app.follow(&following, &followed).await.unwrap();
    app.follow(&following, &followed).await.unwrap();

    assert_eq!(app.followers(&followed).await.unwrap().len(), 1);
}

#[tokio::test]
async fn self_follow_is_rejected() {
    let app = make_app();
    let user_id = sign_up(&app, "testuser", "test@test.com", "pw").await;

    let res = app.follow(&user_id, &user_id).await;
    assert!(matches!(res, Err(Error::ValidationFailure(_))));
    assert!(app.followers(&user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn following_unknown_user_is_not_found() {
    let app = make_app();
    let user_id = sign_up(&app, "testuser", "test@test.com", "pw").await;

    let res = app.follow(&user_id, &uuid::Uuid::new_v4()).await;
    assert!(matches!(res, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn update_profile_requires_the_current_password() {
    let app = make_app();
    let user_id = sign_up(&app, "testuser", "test@test.com", "testuser").await;

    let update = ProfileUpdate {
        username: Some("newusername".into()),
        ..ProfileUpdate::default()
    };
    let res = app
        .update_profile(&user_id, "wrongpassword".into(), update)
        .await;
    assert!(matches!(res, Err(Error::AuthenticationFailed)));

    let user = app.fetch_user(&user_id).await.unwrap().unwrap();
    assert_eq!(user.username, "testuser");
}

#[tokio::test]
async fn update_profile_applies_changes() {
    let app = make_app();
    let user_id = sign_up(&app, "testuser", "test@test.com", "testuser").await;

    let update = ProfileUpdate {
        username: Some("newusername".into()),
        bio: Some("I warble".into()),
        location: Some("Tulsa".into()),
        ..ProfileUpdate::default()
    };
    app.update_profile(&user_id, "testuser".into(), update)
        .await
        .unwrap();

    let user = app.fetch_user(&user_id).await.unwrap().unwrap();
    assert_eq!(user.username, "newusername");
    assert_eq!(user.bio.as_deref(), Some("I warble"));
    assert_eq!(user.location.as_deref(), Some("Tulsa"));
    assert_eq!(user.email, "test@test.com");
}

#[tokio::test]
async fn update_profile_rejects_taken_username() {
    let app = make_app();
    let user_id = sign_up(&app, "testuser", "test@test.com", "testuser").await;
    sign_up(&app, "otheruser", "other@test.com", "pw").await;

    let update = ProfileUpdate {
        username: Some("otheruser".into()),
        ..ProfileUpdate::default()
    };
    let res = app.update_profile(&user_id, "testuser".into(), update).await;
    assert!(matches!(res, Err(Error::DuplicateIdentity)));
}

#[tokio::test]
async fn deleting_a_user_cascades_to_everything_they_touched() {
    let app = make_app();
    let user_1 = sign_up(&app, "user1", "user1@test.com", "pw").await;
    let user_2 = sign_up(&app, "user2", "user2@test.com", "pw").await;

    let message_id = app.post_message(&user_1, "Hello".into()).await.unwrap();
    app.like(&user_2, &message_id).await.unwrap();
    app.follow(&user_2, &user_1).await.unwrap();
    app.follow(&user_1, &user_2).await.unwrap();

    app.delete_user(&user_1).await.unwrap();

    assert!(app.fetch_user(&user_1).await.unwrap().is_none());
    assert!(app.fetch_message(&message_id).await.unwrap().is_none());
    assert!(app.liked_messages(&user_2).await.unwrap().is_empty());
    assert!(app.followers(&user_2).await.unwrap().is_empty());
    assert!(app.following(&user_2).await.unwrap().is_empty());

    // the freed identity can be claimed again
    sign_up(&app, "user1", "user1@test.com", "pw").await;
}

#[tokio::test]
async fn deleting_an_unknown_user_is_not_found() {
    let app = make_app();
    let res = app.delete_user(&uuid::Uuid::new_v4()).await;
    assert!(matches!(res, Err(Error::NotFound(_))));
}

#[derive(Clone)]
struct FailingAuthService;

#[derive(Debug)]
struct CredentialStorageError;

impl std::fmt::Display for CredentialStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "credential storage unavailable")
    }
}

impl std::error::Error for CredentialStorageError {}

impl AuthService for FailingAuthService {
    type Error = CredentialStorageError;

    async fn verify_password(
        &self,
        _user_id: &UserId,
        _password: String,
    ) -> Result<bool, Self::Error> {
        Ok(false)
    }

    async fn set_password(
        &self,
        _user_id: &UserId,
        _password: String,
    ) -> Result<(), Self::Error> {
        Err(CredentialStorageError)
    }
}

#[tokio::test]
async fn failed_credential_storage_releases_the_identity() {
    let db = mock_db::Db::new();
    let broken = Warbler::new(db.clone(), FailingAuthService);

    let res = broken
        .sign_up(new_user("testuser", "test@test.com"), "password123".into())
        .await;
    assert!(res.is_err());
    assert!(broken.fetch_users().await.unwrap().is_empty());

    // the identity stays claimable
    let app = Warbler::new(db.clone(), PasswordAuthenticator::new(db));
    sign_up(&app, "testuser", "test@test.com", "password123").await;
}
