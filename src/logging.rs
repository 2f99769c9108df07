use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rocket::{
    fairing::{Fairing, Info, Kind},
    http::StatusClass,
    request::{FromRequest, Outcome},
    Data, Orbit, Request, Response, Rocket,
};

/// A unique identifier for a particular request, plus when it arrived.
#[derive(Debug, Copy, Clone)]
pub struct RequestMarker {
    id: usize,
    received_at: Instant,
}

impl RequestMarker {
    /// Atomically allocate the next marker. Wraps around on overflow.
    fn next() -> Self {
        static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(0);
        Self {
            id: REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed),
            received_at: Instant::now(),
        }
    }
}

impl Display for RequestMarker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for &'r RequestMarker {
    type Error = std::convert::Infallible;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(req.local_cache(RequestMarker::next))
    }
}

/// Fairing that logs every request and response, with the response level
/// chosen by status class and the latency attached.
#[derive(Debug, Copy, Clone)]
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request logger",
            kind: Kind::Liftoff | Kind::Request | Kind::Response | Kind::Shutdown,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let protocol = if rocket.config().tls_enabled() {
            "https"
        } else {
            "http"
        };
        let ip = &rocket.config().address;
        let port = &rocket.config().port;
        info!("Server launched on {protocol}://{ip}:{port}");
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let marker = req.local_cache(RequestMarker::next);
        info!("->req{marker} {} {}", req.method(), req.uri());
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let marker = req.local_cache(RequestMarker::next);
        let elapsed = marker.received_at.elapsed();
        let code = res.status();
        let route = match req.route() {
            Some(route) => route
                .name
                .as_ref()
                .map(|name| name.to_string())
                .unwrap_or_else(|| route.uri.to_string()),
            None => "UNKNOWN ROUTE".to_string(),
        };
        let log_msg = format!("<-rsp{marker} {code} {route} ({elapsed:.1?})");
        match code.class() {
            StatusClass::ServerError => error!("{log_msg}"),
            StatusClass::ClientError => warn!("{log_msg}"),
            _ => info!("{log_msg}"),
        }
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        warn!("Shutdown requested, stopping gracefully...");
    }
}
