#[cfg(feature = "metrics")]
mod metrics;
mod path;
mod v1;

use std::any::Any;
use std::convert::Infallible;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::FutureExt;
use hyper::header::{HeaderValue, IntoHeaderName};
use hyper::http::request::Parts;
use hyper::server::conn::Http;
use hyper::service::Service;
use hyper::{Body, HeaderMap, Method, StatusCode, Uri};
use pin_project::pin_project;
use snowflaked::sync::Generator;
use tokio::net::TcpSocket;
use tokio::time::Instant;

use crate::state::State;
use crate::Error;

pub use self::path::RequestUri;

pub type Result = std::result::Result<Response, Error>;

/// Ids used to correlate the log lines of a single request.
static REQUEST_IDS: Generator = Generator::new_unchecked(0);

/// Checks the request method and runs the matching branch. `OPTIONS` is
/// answered automatically, any other unlisted method yields a 405.
#[macro_export]
macro_rules! method {
    ($req:expr, {$($method:expr => $branch:expr),* $(,)?}) => {
        match $req.method() {
            $(
                method if method == $method => $branch,
            )*
            method if method == hyper::Method::OPTIONS => {
                use hyper::header::{HeaderValue, ALLOW};

                let allow = vec![$($method.as_str()),*];
                let allow = HeaderValue::from_bytes(allow.join(",").as_bytes()).unwrap();

                Ok($crate::http::Response::no_content().header(ALLOW, allow))
            }
            _ => Err($crate::Error::MethodNotAllowed),
        }
    };
}

pub async fn bind(addr: SocketAddr, state: State) -> std::result::Result<(), crate::Error> {
    let mut shutdown_rx = state.shutdown_rx.clone();

    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };

    if let Err(err) = socket.set_reuseaddr(true) {
        log::warn!("Failed to set SO_REUSEADDR flag: {}", err);
    }

    socket.bind(addr)?;
    let listener = socket.listen(1024)?;
    log::info!("Listening on {}", addr);

    loop {
        tokio::select! {
            res = listener.accept() => {
                let (stream, addr) = match res {
                    Ok((stream, addr)) => (stream, addr),
                    Err(err) => {
                        log::warn!("Failed to accept connection: {:?}", err);
                        continue;
                    }
                };
                log::debug!("Accepting new connection from {}", addr);

                let service = RootService { state: state.clone(), addr };
                let mut shutdown_rx = shutdown_rx.clone();
                tokio::task::spawn(async move {
                    let mut conn = Http::new()
                        .http1_keep_alive(true)
                        .serve_connection(stream, service);

                    let mut conn = Pin::new(&mut conn);

                    tokio::select! {
                        res = &mut conn => {
                            if let Err(err) = res {
                                log::warn!("Http error: {:?}", err);
                            }
                        }
                        _ = shutdown_rx.changed() => {
                            log::debug!("Shutting down connection");
                            conn.graceful_shutdown();
                        }
                    }
                });
            }
            // Shut down the server.
            _ = shutdown_rx.changed() => {
                log::debug!("Shutting down http server");
                return Ok(());
            }
        }
    }
}

#[derive(Clone, Debug)]
struct RootService {
    state: State,
    addr: SocketAddr,
}

impl Service<hyper::Request<Body>> for RootService {
    type Response = hyper::Response<Body>;
    type Error = Infallible;
    type Future = RootServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    #[inline]
    fn call(&mut self, req: hyper::Request<Body>) -> Self::Future {
        let state = self.state.clone();
        let addr = self.addr;

        RootServiceFuture(Box::pin(async move { Ok(serve(req, state, addr, route).await) }))
    }
}

#[pin_project]
struct RootServiceFuture(
    #[pin] BoxFuture<'static, std::result::Result<hyper::Response<Body>, Infallible>>,
);

impl Future for RootServiceFuture {
    type Output = std::result::Result<hyper::Response<Body>, Infallible>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.project().0.poll(cx)
    }
}

/// Runs a single request through the middleware chain: request id tagging,
/// client ip extraction, timeout, panic recovery and access logging.
///
/// `handler` is the innermost step of the chain. The server always uses
/// [`route`], tests may substitute their own.
async fn serve<H, F>(
    req: hyper::Request<Body>,
    state: State,
    addr: SocketAddr,
    handler: H,
) -> hyper::Response<Body>
where
    H: FnOnce(Request) -> F,
    F: Future<Output = Result>,
{
    let request_id: u64 = REQUEST_IDS.generate();
    let client_ip = client_ip(req.headers(), addr);
    let method = req.method().clone();
    let uri = req.uri().clone();

    #[cfg(feature = "metrics")]
    {
        state.metrics.http_requests_total.inc();
        state.metrics.http_requests_in_flight.inc();
    }

    let start = Instant::now();
    let timeout = state.config.request_timeout();

    let fut = AssertUnwindSafe(handler(Request::new(req, state.clone()))).catch_unwind();

    let resp = match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(Ok(resp))) => resp,
        Ok(Ok(Err(err))) => error_response(err, request_id),
        Ok(Err(panic)) => {
            log::error!(
                "[{}] Handler panicked: {}",
                request_id,
                panic_message(panic.as_ref())
            );

            Response::ok().status(StatusCode::INTERNAL_SERVER_ERROR)
        }
        Err(_) => {
            log::warn!(
                "[{}] Request exceeded the {}s deadline, aborting",
                request_id,
                timeout.as_secs()
            );

            Response::ok().status(StatusCode::REQUEST_TIMEOUT)
        }
    };

    let status = resp.status;
    let latency = start.elapsed();

    #[cfg(feature = "metrics")]
    state.metrics.http_requests_in_flight.dec();

    log::info!(
        "[{}] {} \"{} {}\" {} {}ms",
        request_id,
        client_ip,
        method,
        uri,
        status.as_u16(),
        latency.as_millis()
    );

    resp.build()
}

async fn route(req: Request) -> Result {
    let path = String::from(req.uri().path());
    let mut uri = RequestUri::new(&path);

    match uri.take_str() {
        None => method!(req, {
            Method::GET => index(req).await,
        }),
        Some("api") => match uri.take_str() {
            Some("v1") => v1::route(req, uri).await,
            _ => Err(Error::NotFound),
        },
        #[cfg(feature = "metrics")]
        Some("metrics") => metrics::route(req, uri).await,
        _ => Err(Error::NotFound),
    }
}

async fn index(_req: Request) -> Result {
    Ok(Response::ok().body("Hello World"))
}

/// Maps a handler error to its client-visible response. Failures are
/// status-only, diagnostic detail stays in the log.
fn error_response(err: Error, request_id: u64) -> Response {
    match err {
        Error::NotFound => Response::ok().status(StatusCode::NOT_FOUND),
        Error::BadRequest => Response::ok().status(StatusCode::BAD_REQUEST),
        Error::MethodNotAllowed => Response::ok().status(StatusCode::METHOD_NOT_ALLOWED),
        err => {
            log::error!("[{}] {:?}", request_id, err);

            Response::ok().status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// The connecting client address, honoring `X-Forwarded-For` and `X-Real-IP`
/// set by a fronting proxy.
fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> IpAddr {
    for key in ["X-Forwarded-For", "X-Real-IP"] {
        if let Some(value) = headers.get(key) {
            if let Ok(value) = value.to_str() {
                let value = value.split(',').next().unwrap_or(value).trim();

                if let Ok(ip) = value.parse() {
                    return ip;
                }
            }
        }
    }

    addr.ip()
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic payload"
    }
}

#[derive(Debug)]
pub struct Request {
    parts: Parts,
    state: State,
}

impl Request {
    #[inline]
    fn new(req: hyper::Request<Body>, state: State) -> Self {
        let (parts, _body) = req.into_parts();

        Self { parts, state }
    }

    #[inline]
    pub fn state(&self) -> &State {
        &self.state
    }

    #[inline]
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    #[inline]
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap<HeaderValue> {
        &self.parts.headers
    }
}

#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl Response {
    /// 200 OK
    pub fn ok() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }

    /// 204 No Content
    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn body<T>(mut self, body: T) -> Self
    where
        T: Into<Body>,
    {
        self.body = body.into();
        self
    }

    pub fn header<K>(mut self, key: K, value: HeaderValue) -> Self
    where
        K: IntoHeaderName,
    {
        self.headers.append(key, value);
        self
    }

    fn build(self) -> hyper::Response<Body> {
        let mut resp = hyper::Response::new(self.body);
        *resp.status_mut() = self.status;
        *resp.headers_mut() = self.headers;
        resp
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use futures::future;
    use hyper::header::{ALLOW, CONTENT_TYPE};
    use hyper::{Body, Method, StatusCode};
    use serde_json::Value;

    use super::{client_ip, route, serve, Request, Response, Result};
    use crate::state::State;

    fn addr() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 40000))
    }

    fn request(method: Method, path: &str) -> hyper::Request<Body> {
        hyper::Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(state: &State, method: Method, path: &str) -> hyper::Response<Body> {
        serve(request(method, path), state.clone(), addr(), route).await
    }

    async fn body(resp: hyper::Response<Body>) -> Vec<u8> {
        hyper::body::to_bytes(resp.into_body())
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_index() {
        let state = State::test();

        let resp = send(&state, Method::GET, "/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body(resp).await, b"Hello World");
    }

    #[tokio::test]
    async fn test_list_tournaments() {
        let state = State::test();

        let resp = send(&state, Method::GET, "/api/v1/tournament").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(CONTENT_TYPE).unwrap(), "application/json");

        let value: Value = serde_json::from_slice(&body(resp).await).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 2);

        assert_eq!(array[0]["id"], 1);
        assert_eq!(array[0]["name"], "First Tournament");
        assert_eq!(array[0]["startDateTime"], 234234234234i64);
        assert_eq!(array[0]["endDateTime"], 2342134234234i64);
        assert_eq!(array[0]["numberOfHoles"], 18);
        assert_eq!(array[0]["minimumCompetitorsPerSession"], 1);
        assert_eq!(array[0]["description"], "Some Test dEscrption");

        assert_eq!(array[1]["id"], 2);
        assert_eq!(array[1]["name"], "Another Tournament");
        assert_eq!(array[1]["startDateTime"], 123123123);
        assert_eq!(array[1]["endDateTime"], 123123123);
        assert_eq!(array[1]["numberOfHoles"], 18);
        assert_eq!(array[1]["minimumCompetitorsPerSession"], 3);
        assert_eq!(array[1]["description"], "asdasdasd");
    }

    #[tokio::test]
    async fn test_get_tournament() {
        let state = State::test();

        let resp = send(&state, Method::GET, "/api/v1/tournament/1").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let value: Value = serde_json::from_slice(&body(resp).await).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["name"], "First Tournament");

        let resp = send(&state, Method::GET, "/api/v1/tournament/2").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let value: Value = serde_json::from_slice(&body(resp).await).unwrap();
        assert_eq!(value["id"], 2);
    }

    #[tokio::test]
    async fn test_get_tournament_not_found() {
        let state = State::test();

        let resp = send(&state, Method::GET, "/api/v1/tournament/999").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(body(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_get_tournament_invalid_id() {
        let state = State::test();

        let resp = send(&state, Method::GET, "/api/v1/tournament/abc").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body(resp).await.is_empty());

        let resp = send(&state, Method::GET, "/api/v1/tournament/-1").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let state = State::test();

        let resp = send(&state, Method::GET, "/does-not-exist").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(body(resp).await.is_empty());

        let resp = send(&state, Method::GET, "/api/v2/tournament").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = send(&state, Method::GET, "/api/v1/tournament/1/extra").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let state = State::test();

        let resp = send(&state, Method::POST, "/api/v1/tournament").await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

        let resp = send(&state, Method::DELETE, "/").await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_options() {
        let state = State::test();

        let resp = send(&state, Method::OPTIONS, "/api/v1/tournament").await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(resp.headers().get(ALLOW).unwrap(), "GET");
    }

    #[tokio::test]
    async fn test_concurrent_list() {
        let state = State::test();

        let mut requests = Vec::new();
        for _ in 0..100 {
            requests.push(send(&state, Method::GET, "/api/v1/tournament"));
        }

        let mut bodies = Vec::new();
        for resp in future::join_all(requests).await {
            assert_eq!(resp.status(), StatusCode::OK);
            bodies.push(body(resp).await);
        }

        assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
    }

    async fn sleeping(_req: Request) -> Result {
        tokio::time::sleep(Duration::from_secs(3600)).await;

        Ok(Response::ok())
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_timeout() {
        let state = State::test();

        let resp = serve(request(Method::GET, "/"), state, addr(), sleeping).await;
        assert_eq!(resp.status(), StatusCode::REQUEST_TIMEOUT);
    }

    async fn panicking(_req: Request) -> Result {
        panic!("handler exploded");
    }

    #[tokio::test]
    async fn test_panic_recovery() {
        let state = State::test();

        let resp = serve(request(Method::GET, "/"), state.clone(), addr(), panicking).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body(resp).await.is_empty());

        // The service keeps serving after a recovered panic.
        let resp = send(&state, Method::GET, "/").await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_client_ip() {
        let addr = addr();

        let headers = hyper::HeaderMap::new();
        assert_eq!(client_ip(&headers, addr), addr.ip());

        let mut headers = hyper::HeaderMap::new();
        headers.insert("X-Forwarded-For", "10.0.0.1, 10.0.0.2".parse().unwrap());
        assert_eq!(client_ip(&headers, addr), "10.0.0.1".parse::<std::net::IpAddr>().unwrap());

        let mut headers = hyper::HeaderMap::new();
        headers.insert("X-Real-IP", "192.168.1.5".parse().unwrap());
        assert_eq!(client_ip(&headers, addr), "192.168.1.5".parse::<std::net::IpAddr>().unwrap());
    }
}
