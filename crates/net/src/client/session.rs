//! Client sessions: one pending request, the last response and a connection kept
//! open between exchanges.
//!
//! ```no_run
//! # async fn run() -> Result<(), micro_net::client::ClientError> {
//! use micro_net::client::HttpClient;
//!
//! let mut session = HttpClient::new().target("http://example.com/")?;
//! let response = session.request().await?;
//! println!("{} with {} body bytes", response.status(), response.body().len());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::time::Duration;

use http::{Method, StatusCode};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::client::{BodySink, ClientError, Connector, Received, ResponseReceiver, Target, TcpConnector};
use crate::ensure;
use crate::protocol::{HeaderFieldName, HttpRequest, HttpResponse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Merge cookies set by a response into the cookies of the next request.
    pub allow_cookies: bool,
    /// Follow `301` and `302` redirects.
    pub auto_jump: bool,
    pub keep_alive: bool,
    /// Connection attempts before giving up, at least one is always made.
    pub connect_retry_count: usize,
    pub connect_retry_interval: Duration,
    pub max_redirects: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            allow_cookies: false,
            auto_jump: true,
            keep_alive: true,
            connect_retry_count: 3,
            connect_retry_interval: Duration::from_millis(100),
            max_redirects: 16,
        }
    }
}

/// Builds sessions that share a set of options.
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    options: SessionOptions,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SessionOptions) -> Self {
        Self { options }
    }

    /// A plain TCP session for `url`.
    pub fn target(&self, url: &str) -> Result<HttpSession, ClientError> {
        self.target_with(TcpConnector, url)
    }

    /// A session for `url` whose connections come from `connector`.
    pub fn target_with<C: Connector>(&self, connector: C, url: &str) -> Result<HttpSession<C>, ClientError> {
        Ok(HttpSession::new(connector, Target::parse(url)?, self.options.clone()))
    }
}

pub struct HttpSession<C: Connector = TcpConnector> {
    connector: C,
    target: Target,
    options: SessionOptions,
    request: HttpRequest,
    response: HttpResponse,
    stream: Option<C::Stream>,
    receiver: ResponseReceiver,
    sink: Option<Box<dyn BodySink>>,
}

impl<C: Connector> HttpSession<C> {
    pub fn new(connector: C, target: Target, options: SessionOptions) -> Self {
        let mut request = HttpRequest::new(Method::GET, target.request_uri());
        request.headers_mut().add_common(HeaderFieldName::Host, target.host_header());
        if options.keep_alive {
            request.headers_mut().add_common(HeaderFieldName::Connection, "keep-alive");
        }

        Self {
            connector,
            target,
            options,
            request,
            response: HttpResponse::default(),
            stream: None,
            receiver: ResponseReceiver::new(),
            sink: None,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// The request the next call to [`request`](Self::request) sends.
    pub fn pending_request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn pending_request_mut(&mut self) -> &mut HttpRequest {
        &mut self.request
    }

    /// The last response received. Its body is empty when a sink is set.
    pub fn response(&self) -> &HttpResponse {
        &self.response
    }

    pub fn is_alive(&self) -> bool {
        self.stream.is_some()
    }

    /// Points the session at `url`, dropping the connection when the origin changes.
    pub fn set_url(&mut self, url: &str) -> Result<&mut Self, ClientError> {
        let target = Target::parse(url)?;
        self.retarget(target);
        Ok(self)
    }

    pub fn set_uri<U: Into<String>>(&mut self, uri: U) -> &mut Self {
        self.request.set_uri(uri);
        self
    }

    pub fn set_method(&mut self, method: Method) -> &mut Self {
        self.request.set_method(method);
        self
    }

    pub fn add_header<N: AsRef<str>, V: Into<String>>(&mut self, name: N, value: V) -> &mut Self {
        self.request.add_header(name, value);
        self
    }

    pub fn set_body<B: Into<Vec<u8>>>(&mut self, body: B) -> &mut Self {
        let body = body.into();
        self.request.headers_mut().add_common(HeaderFieldName::ContentLength, body.len().to_string());
        self.request.set_body(body);
        self
    }

    /// Adds or removes `Connection: keep-alive`. Without keep-alive the connection
    /// is closed after every exchange.
    pub fn set_keep_alive(&mut self, keep_alive: bool) -> &mut Self {
        self.options.keep_alive = keep_alive;
        if keep_alive {
            self.request.headers_mut().add_common(HeaderFieldName::Connection, "keep-alive");
        } else {
            self.request.headers_mut().remove_common(HeaderFieldName::Connection);
        }
        self
    }

    pub fn set_auto_jump(&mut self, auto_jump: bool) -> &mut Self {
        self.options.auto_jump = auto_jump;
        self
    }

    pub fn set_allow_cookies(&mut self, allow_cookies: bool) -> &mut Self {
        self.options.allow_cookies = allow_cookies;
        self
    }

    /// Streams response bodies into `sink` instead of collecting them in [`response`](Self::response).
    pub fn set_sink<S: BodySink + 'static>(&mut self, sink: S) -> &mut Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Releases the connection; the next request reconnects.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!(host = self.target.host(), port = self.target.port(), "connection released");
        }
        self.receiver.clear();
    }

    /// Sends the pending request and receives the response, following redirects
    /// when auto-jump is on.
    ///
    /// # Errors
    ///
    /// Transport failures close the connection, so the next call reconnects.
    pub async fn request(&mut self) -> Result<&HttpResponse, ClientError> {
        self.exchange().await?;
        if !self.options.auto_jump {
            return Ok(&self.response);
        }

        let mut redirects = 0;
        while let Some(location) = self.redirect_location() {
            ensure!(redirects < self.options.max_redirects, ClientError::TooManyRedirects { max: self.options.max_redirects });
            redirects += 1;

            let next = self.target.join(&location)?;
            info!(status = %self.response.status(), from = %self.target.url(), to = %next.url(), "following redirect");
            self.retarget(next);
            self.exchange().await?;
        }
        Ok(&self.response)
    }

    fn redirect_location(&self) -> Option<String> {
        let status = self.response.status();
        if status != StatusCode::MOVED_PERMANENTLY && status != StatusCode::FOUND {
            return None;
        }
        self.response.headers().get_any_case(HeaderFieldName::Location).map(str::to_owned)
    }

    /// Same origin only rewrites the request URI and keeps the connection;
    /// another origin also updates `Host` and forces a reconnect.
    fn retarget(&mut self, next: Target) {
        if !next.same_origin(&self.target) {
            self.close();
            self.request.headers_mut().add_common(HeaderFieldName::Host, next.host_header());
        }
        self.request.set_uri(next.request_uri());
        self.target = next;
    }

    /// One request and its response, without redirects.
    async fn exchange(&mut self) -> Result<(), ClientError> {
        if self.stream.is_none() {
            self.connect().await?;
        }

        let mut body = Vec::new();
        let received = match self.send_and_receive(&mut body).await {
            Ok(received) => received,
            Err(e) => {
                self.close();
                return Err(e);
            }
        };

        let reusable = !received.is_eof();
        let mut response = received.into_response();
        if self.sink.is_none() {
            response.set_body(body);
        }

        if self.options.allow_cookies {
            self.request.cookies_mut().merge(response.cookies());
        }
        let close_requested = response.header(HeaderFieldName::Connection) == Some("close");
        self.response = response;

        if !self.options.keep_alive || close_requested || !reusable {
            self.close();
        }
        Ok(())
    }

    async fn send_and_receive(&mut self, body: &mut Vec<u8>) -> Result<Received, ClientError> {
        let Self { stream, receiver, sink, request, .. } = self;
        let stream = stream.as_mut().ok_or(ClientError::ConnectionClosed)?;

        write_request(stream, &request.to_bytes()).await?;
        match sink.as_deref_mut() {
            Some(sink) => receiver.receive(stream, request.method(), sink).await,
            None => receiver.receive(stream, request.method(), body).await,
        }
    }

    async fn connect(&mut self) -> Result<(), ClientError> {
        let attempts = self.options.connect_retry_count.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.connector.connect(&self.target).await {
                Ok(stream) => {
                    debug!(host = self.target.host(), port = self.target.port(), attempt, "connected");
                    self.stream = Some(stream);
                    self.receiver.clear();
                    return Ok(());
                }
                Err(ClientError::Io { source }) if attempt < attempts => {
                    warn!(host = self.target.host(), attempt, cause = %source, "connect failed, retrying");
                    tokio::time::sleep(self.options.connect_retry_interval).await;
                }
                Err(ClientError::Io { source }) => return Err(ClientError::Connect { attempts: attempt, source }),
                Err(e) => return Err(e),
            }
        }
    }
}

/// Writes the whole request. A write that makes no progress is a failure and is not retried.
async fn write_request<W: AsyncWrite + Unpin>(stream: &mut W, bytes: &[u8]) -> Result<(), ClientError> {
    let mut sent = 0;
    while sent < bytes.len() {
        let n = stream.write(&bytes[sent..]).await?;
        ensure!(n > 0, ClientError::ShortWrite { sent, expected: bytes.len() });
        sent += n;
    }
    stream.flush().await?;
    Ok(())
}

impl<C: Connector + fmt::Debug> fmt::Debug for HttpSession<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSession")
            .field("connector", &self.connector)
            .field("target", &self.target.url().as_str())
            .field("options", &self.options)
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}
