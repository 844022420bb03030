use http_server::method::Method;
use http_server::request::Request;

#[tokio::test]
async fn fails_on_gibberish_stream() {
    let stream = tokio_test::io::Builder::new()
        .read(b"fhgwgads?!\r\n\r\n")
        .build();
    let request = Request::try_from_stream(stream).await;
    assert!(request.is_err());
}

#[tokio::test]
async fn parses_method_url_and_headers() {
    let stream = tokio_test::io::Builder::new()
        .read(b"GET /users/profile?q=test HTTP/1.1\r\n")
        .read(b"Host: localhost:8080\r\n")
        .read(b"Cookie: _warbler_sid=abc\r\n")
        .read(b"\r\n")
        .build();
    let request = Request::try_from_stream(stream).await.unwrap();

    assert_eq!(request.method(), Method::Get);
    assert_eq!(request.url(), "/users/profile?q=test");
    assert_eq!(
        request.headers().get(&"host".into()),
        Some(&"localhost:8080".to_owned())
    );
    assert_eq!(
        request.headers().get(&"COOKIE".into()),
        Some(&"_warbler_sid=abc".to_owned())
    );
}

#[tokio::test]
async fn content_fails_without_content_length() {
    let stream = tokio_test::io::Builder::new()
        .read(b"POST /login HTTP/1.1\r\n")
        .read(b"\r\n")
        .build();
    let mut request = Request::try_from_stream(stream).await.unwrap();

    assert!(request.content().await.is_err());
}

#[tokio::test]
async fn content_reads_exactly_content_length_bytes() {
    let body = "username=testuser&password=pw";
    let stream = tokio_test::io::Builder::new()
        .read(b"POST /login HTTP/1.1\r\n")
        .read(format!("Content-Length: {}\r\n", body.len()).as_bytes())
        .read(b"\r\n")
        .read(body.as_bytes())
        .build();
    let mut request = Request::try_from_stream(stream).await.unwrap();

    assert_eq!(request.method(), Method::Post);
    assert_eq!(request.content().await.unwrap(), body);
}
