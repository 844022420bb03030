use warbler_utils::http::Header;

#[derive(Clone, Copy)]
pub enum HttpStatusCode {
    Ok,
    SeeOther,
    BadRequest,
    NotFound,
    InternalServerError,
}

impl HttpStatusCode {
    fn status_line(self) -> &'static str {
        match self {
            HttpStatusCode::Ok => "200 OK",
            HttpStatusCode::SeeOther => "303 See Other",
            HttpStatusCode::BadRequest => "400 Bad Request",
            HttpStatusCode::NotFound => "404 Not Found",
            HttpStatusCode::InternalServerError => "500 Internal Server Error",
        }
    }
}

pub struct HttpResponse {
    status: HttpStatusCode,
    headers: Vec<Header>,
    body: String,
}

impl HttpResponse {
    pub fn into_bytes(self) -> Vec<u8> {
        let mut res = format!("HTTP/1.1 {}\r\n", self.status.status_line());
        for (key, value) in &self.headers {
            res.push_str(&format!("{key}: {value}\r\n"));
        }
        res.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        res.push_str("Connection: close\r\n");
        res.push_str("\r\n");
        res.push_str(&self.body);
        res.into_bytes()
    }
}

pub struct HttpResponseBuilder {
    status: HttpStatusCode,
    headers: Vec<Header>,
    body: String,
}

impl HttpResponseBuilder {
    pub fn new() -> Self {
        HttpResponseBuilder {
            status: HttpStatusCode::Ok,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn status(&mut self, status: HttpStatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub fn header(&mut self, header: Header) -> &mut Self {
        self.headers.push(header);
        self
    }

    pub fn body(&mut self, body: &str) -> &mut Self {
        self.body = body.to_owned();
        self
    }

    pub fn content_html(&mut self) -> &mut Self {
        self.header(("Content-Type".into(), "text/html; charset=utf-8".into()))
    }

    pub fn build(&mut self) -> HttpResponse {
        HttpResponse {
            status: self.status,
            headers: std::mem::take(&mut self.headers),
            body: std::mem::take(&mut self.body),
        }
    }
}

impl Default for HttpResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}
