use std::{future::IntoFuture as _, io, sync::OnceLock, time};

use application::{config, Args, Config};
use axum::{body::Body, extract::MatchedPath, Router};
use axum_client_ip::InsecureClientIp;
use http::{header, Method, Request, Response};
use service::{
    infra::{postgres, Postgres},
    Service,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing as log;
use tracing_subscriber::{
    filter::filter_fn,
    fmt::MakeWriter,
    layer::{Layer, SubscriberExt as _},
    registry::LookupSpan,
    util::SubscriberInitExt as _,
};

/// Levels written to `stderr` rather than `stdout`.
const STDERR_LEVELS: &[log::Level] = &[log::Level::WARN, log::Level::ERROR];

/// Maximum verbosity, set once the [`Config`] is loaded.
static LOG_LEVEL: OnceLock<log::Level> = OnceLock::new();

postgres::embed_migrations!("../migrations");

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(output(io::stdout, false))
        .with(output(io::stderr, true))
        .init();

    _ = start().await;
}

/// Builds a logging layer writing either the [`STDERR_LEVELS`] or all the
/// others into the provided `writer`.
fn output<S, W>(writer: W, errors: bool) -> impl Layer<S>
where
    S: log::Subscriber + for<'s> LookupSpan<'s>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .compact()
        .with_ansi(true)
        .with_thread_names(true)
        .with_writer(writer)
        .with_filter(filter_fn(move |meta| {
            let max = LOG_LEVEL.get().copied().unwrap_or(log::Level::INFO);
            meta.is_span()
                || (STDERR_LEVELS.contains(meta.level()) == errors
                    && max >= *meta.level())
        }))
}

async fn start() -> Result<(), ()> {
    let Args { config } = Args::parse().map_err(|e| {
        log::error!("failed to parse command line arguments: {e}");
    })?;

    let Config {
        postgres,
        service,
        server,
        log,
    } = Config::new(config).map_err(|e| {
        log::error!("failed to load `Config`: {e}");
    })?;

    LOG_LEVEL
        .set(log.level.into())
        .unwrap_or_else(|_| unreachable!("first initialization"));

    let mut postgres = Postgres::new(&postgres.into()).map_err(|e| {
        log::error!("failed to initialize `Postgres` client: {e}");
    })?;
    migrations::runner()
        .run_async(&mut postgres)
        .await
        .map_err(|e| {
            log::error!("failed to run database migrations: {e}");
        })?;

    let service = service::Config::try_from(service)
        .map(|conf| Service::new(conf, postgres))
        .map_err(|e| log::error!("invalid `service` config: {e}"))?;

    let app = traced(application::router(service).layer(cors(&server.cors)?));

    let addr = format!("{}:{}", server.host, server.port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        log::error!("failed to listen on `{addr}`: {e}");
    })?;
    log::info!("listening on `{addr}`");

    axum::serve(listener, app)
        .into_future()
        .await
        .map_err(|e| log::error!("webserver failed: {e}"))
}

/// Builds a [`CorsLayer`] allowing the configured origins to send
/// `Authorization` headers.
fn cors(conf: &config::Cors) -> Result<CorsLayer, ()> {
    conf.origins.iter().try_fold(
        CorsLayer::new()
            .allow_methods([Method::GET, Method::OPTIONS, Method::POST])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        |cors, origin| {
            origin
                .parse::<header::HeaderValue>()
                .map(|o| cors.allow_origin(o))
                .map_err(|e| {
                    log::error!("`{origin}` is not a correct CORS origin: {e}");
                })
        },
    )
}

/// Wraps each HTTP request served by the provided [`Router`] into a span.
///
/// Session tokens are never recorded, so the `Authorization` header is
/// omitted from the span fields.
fn traced(app: Router) -> Router {
    app.layer(
        TraceLayer::new_for_http()
            .make_span_with(|r: &Request<Body>| {
                log::info_span!(
                    "HTTP request",
                    http.client_ip = InsecureClientIp::from(
                        r.headers(),
                        r.extensions(),
                    )
                    .map(|ip| ip.0.to_string())
                    .ok(),
                    http.flavor = ?r.version(),
                    http.method = r.method().as_str(),
                    http.route = r
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str),
                    http.target = r.uri().path(),
                    http.user_agent = r
                        .headers()
                        .get(header::USER_AGENT)
                        .and_then(|h| h.to_str().ok()),
                    http.status_code = log::field::Empty,
                )
            })
            .on_response(
                |r: &Response<Body>, dur: time::Duration, span: &log::Span| {
                    let status = r.status();
                    _ = span.record(
                        "http.status_code",
                        log::field::display(status.as_u16()),
                    );
                    let duration = format!("{}ms", dur.as_millis());
                    if status.is_server_error() {
                        log::error!(duration = %duration);
                    } else if status.is_client_error() {
                        log::warn!(duration = %duration);
                    } else {
                        log::info!(duration = %duration);
                    }
                },
            ),
    )
}
