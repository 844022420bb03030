use tokio_test::io::Mock;

use http_server::request::Request;
use http_server::response::Response;

use warbler_app::app::Warbler;
use warbler_app::{NewUser, UserId};
use warbler_auth::PasswordAuthenticator;
use warbler_web::routing;
use warbler_web::sessions;

type App = Warbler<mock_db::Db, PasswordAuthenticator<mock_db::Db>>;

fn make_app() -> App {
    let db = mock_db::Db::new();
    Warbler::new(db.clone(), PasswordAuthenticator::new(db))
}

async fn sign_up(app: &App, username: &str, email: &str) -> UserId {
    let new_user = NewUser {
        username: username.into(),
        email: email.into(),
        image_url: None,
    };
    app.sign_up(new_user, "password123".into()).await.unwrap()
}

fn login_session(user_id: UserId) -> String {
    let session_id = sessions::generate_session_id();
    sessions::update_session_info(session_id.clone(), sessions::SessionInfo { user_id }).unwrap();
    session_id
}

async fn get_request(path: &str, session_id: Option<&str>) -> Request<Mock> {
    let mut raw = format!("GET {path} HTTP/1.1\r\n");
    if let Some(session_id) = session_id {
        raw.push_str(&format!(
            "Cookie: {}={session_id}\r\n",
            sessions::SESSION_ID_COOKIE
        ));
    }
    raw.push_str("\r\n");
    let stream = tokio_test::io::Builder::new().read(raw.as_bytes()).build();
    Request::try_from_stream(stream).await.unwrap()
}

async fn post_request(path: &str, session_id: Option<&str>, body: &str) -> Request<Mock> {
    let mut raw = format!("POST {path} HTTP/1.1\r\n");
    if let Some(session_id) = session_id {
        raw.push_str(&format!(
            "Cookie: {}={session_id}\r\n",
            sessions::SESSION_ID_COOKIE
        ));
    }
    raw.push_str(&format!("Content-Length: {}\r\n\r\n{body}", body.len()));
    let stream = tokio_test::io::Builder::new().read(raw.as_bytes()).build();
    Request::try_from_stream(stream).await.unwrap()
}

fn html_content(response: Response) -> String {
    match response {
        Response::Html { content, .. } => content,
        _ => panic!("expected an html response"),
    }
}

#[tokio::test]
async fn posting_a_message_requires_login() {
    let app = make_app();
    sign_up(&app, "testuser", "test@test.com").await;

    let mut request = post_request("/messages/new", None, "text=Hello").await;
    let response = routing::route(&mut request, app.clone()).await.unwrap();

    assert!(response.is_redirect_to("/login"));
}

#[tokio::test]
async fn posting_a_message_adds_it_and_redirects_to_the_profile() {
    let app = make_app();
    let user_id = sign_up(&app, "testuser", "test@test.com").await;

    let session_id = login_session(user_id);
    let mut request = post_request("/messages/new", Some(&session_id), "text=Hello").await;
    let response = routing::route(&mut request, app.clone()).await.unwrap();

    assert!(response.is_redirect_to(&format!("/users/{user_id}")));

    let messages = app.user_messages(&user_id).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, "Hello");
}

#[tokio::test]
async fn posting_an_empty_message_re_renders_the_form() {
    let app = make_app();
    let user_id = sign_up(&app, "testuser", "test@test.com").await;

    let session_id = login_session(user_id);
    let mut request = post_request("/messages/new", Some(&session_id), "text=").await;
    let response = routing::route(&mut request, app.clone()).await.unwrap();

    let content = html_content(response);
    assert!(content.contains("Add my message!"));
    assert!(app.user_messages(&user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn message_page_shows_the_text() {
    let app = make_app();
    let user_id = sign_up(&app, "testuser", "test@test.com").await;
    let message_id = app.post_message(&user_id, "TEST".into()).await.unwrap();

    let session_id = login_session(user_id);
    let mut request = get_request(&format!("/messages/{message_id}"), Some(&session_id)).await;
    let response = routing::route(&mut request, app).await.unwrap();

    let content = html_content(response);
    assert!(content.contains(r#"<p class="single-message">TEST</p>"#));
}

#[tokio::test]
async fn unknown_message_page_is_not_found() {
    let app = make_app();
    let user_id = sign_up(&app, "testuser", "test@test.com").await;

    let session_id = login_session(user_id);
    let unknown = uuid::Uuid::new_v4();
    let mut request = get_request(&format!("/messages/{unknown}"), Some(&session_id)).await;
    let response = routing::route(&mut request, app).await.unwrap();

    assert!(response.is_not_found());
}

#[tokio::test]
async fn deleting_a_message_requires_login() {
    let app = make_app();
    let user_id = sign_up(&app, "testuser", "test@test.com").await;
    let message_id = app.post_message(&user_id, "Hello".into()).await.unwrap();

    let mut request = post_request(&format!("/messages/{message_id}/delete"), None, "").await;
    let response = routing::route(&mut request, app.clone()).await.unwrap();

    assert!(response.is_redirect_to("/login"));
    assert!(app.fetch_message(&message_id).await.unwrap().is_some());
}

#[tokio::test]
async fn owner_can_delete_their_message() {
    let app = make_app();
    let user_id = sign_up(&app, "testuser", "test@test.com").await;
    let message_id = app.post_message(&user_id, "Hello".into()).await.unwrap();

    let session_id = login_session(user_id);
    let mut request =
        post_request(&format!("/messages/{message_id}/delete"), Some(&session_id), "").await;
    let response = routing::route(&mut request, app.clone()).await.unwrap();

    assert!(response.is_redirect_to(&format!("/users/{user_id}")));
    assert!(app.fetch_message(&message_id).await.unwrap().is_none());
}

#[tokio::test]
async fn deleting_another_users_message_is_rejected() {
    let app = make_app();
    let author = sign_up(&app, "author", "author@test.com").await;
    let intruder = sign_up(&app, "intruder", "intruder@test.com").await;
    let message_id = app.post_message(&author, "Hello".into()).await.unwrap();

    let session_id = login_session(intruder);
    let mut request =
        post_request(&format!("/messages/{message_id}/delete"), Some(&session_id), "").await;
    let response = routing::route(&mut request, app.clone()).await.unwrap();

    assert!(response.is_redirect_to("/login"));
    assert!(app.fetch_message(&message_id).await.unwrap().is_some());
}

#[tokio::test]
async fn like_toggle_adds_and_removes_the_like() {
    let app = make_app();
    let author = sign_up(&app, "author", "author@test.com").await;
    let reader = sign_up(&app, "reader", "reader@test.com").await;
    let message_id = app.post_message(&author, "Hello".into()).await.unwrap();

    let session_id = login_session(reader);

    let mut request =
        post_request(&format!("/users/add_like/{message_id}"), Some(&session_id), "").await;
    let response = routing::route(&mut request, app.clone()).await.unwrap();
    assert!(response.is_redirect_to(&format!("/users/{reader}/likes")));
    assert!(app.has_liked(&reader, &message_id).await.unwrap());

    // a second post toggles the like off
    let mut request =
        post_request(&format!("/users/add_like/{message_id}"), Some(&session_id), "").await;
    routing::route(&mut request, app.clone()).await.unwrap();
    assert!(!app.has_liked(&reader, &message_id).await.unwrap());
}

#[tokio::test]
async fn likes_page_lists_liked_messages() {
    let app = make_app();
    let author = sign_up(&app, "author", "author@test.com").await;
    let reader = sign_up(&app, "reader", "reader@test.com").await;
    let message_id = app
        .post_message(&author, "a likable warble".into())
        .await
        .unwrap();
    app.like(&reader, &message_id).await.unwrap();

    let session_id = login_session(reader);
    let mut request = get_request(&format!("/users/{reader}/likes"), Some(&session_id)).await;
    let response = routing::route(&mut request, app).await.unwrap();

    let content = html_content(response);
    assert!(content.contains("a likable warble"));
}

#[tokio::test]
async fn empty_likes_page_shows_a_placeholder() {
    let app = make_app();
    let user_id = sign_up(&app, "testuser", "test@test.com").await;

    let session_id = login_session(user_id);
    let mut request = get_request(&format!("/users/{user_id}/likes"), Some(&session_id)).await;
    let response = routing::route(&mut request, app).await.unwrap();

    let content = html_content(response);
    assert!(content.contains("<h3>Sorry, no liked messages found</h3>"));
}

#[tokio::test]
async fn new_message_form_requires_login() {
    let app = make_app();
    let mut request = get_request("/messages/new", None).await;
    let response = routing::route(&mut request, app).await.unwrap();

    assert!(response.is_redirect_to("/login"));
}
