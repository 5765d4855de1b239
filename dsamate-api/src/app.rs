/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use dsamate_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::from_config(pool, config).await?;
/// let app = dsamate_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{rate_limit::RateLimiter, security::SecurityHeadersLayer},
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use dsamate_shared::{
    auth::middleware::create_session_middleware,
    catalog::{questions::QuestionCatalog, roadmaps::RoadmapCatalog},
    leaderboard::LeaderboardCache,
    mail::{HttpMailer, LogMailer, Mailer},
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Avatar uploads are capped at 5 MiB; leave room for multipart framing
const BODY_LIMIT_BYTES: usize = 6 * 1024 * 1024;

const LEADERBOARD_TTL: Duration = Duration::from_secs(3600);
const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(20);

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every
/// field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Outbound mail
    pub mailer: Arc<dyn Mailer>,

    /// Limiter for the credential endpoints
    pub limiter: Arc<RateLimiter>,

    /// Client for OAuth providers and GitHub
    pub http: reqwest::Client,

    pub questions: Arc<QuestionCatalog>,
    pub roadmaps: Arc<RoadmapCatalog>,
    pub leaderboard: Arc<LeaderboardCache>,
}

impl AppState {
    /// Creates application state from already-built parts
    pub fn new(
        db: PgPool,
        config: Config,
        mailer: Arc<dyn Mailer>,
        limiter: RateLimiter,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(OUTBOUND_TIMEOUT)
            .build()?;

        Ok(Self {
            db,
            config: Arc::new(config),
            mailer,
            limiter: Arc::new(limiter),
            http,
            questions: Arc::new(QuestionCatalog::bundled()?),
            roadmaps: Arc::new(RoadmapCatalog::bundled()?),
            leaderboard: Arc::new(LeaderboardCache::new(LEADERBOARD_TTL)),
        })
    }

    /// Creates application state, choosing mailer and limiter from config
    ///
    /// A configured but unreachable Redis falls back to in-process
    /// rate limiting.
    pub async fn from_config(db: PgPool, config: Config) -> anyhow::Result<Self> {
        let mailer: Arc<dyn Mailer> = match &config.mail.api_url {
            Some(url) => Arc::new(HttpMailer::new(
                reqwest::Client::builder().timeout(OUTBOUND_TIMEOUT).build()?,
                url.clone(),
                config.mail.api_key.clone(),
                config.mail.from.clone(),
            )),
            None => {
                tracing::warn!("MAIL_API_URL not set; mail will only be logged");
                Arc::new(LogMailer::new(config.mail.from.clone()))
            }
        };

        let window = Duration::from_secs(config.rate_limit.window_secs);
        let max = config.rate_limit.max_requests;
        let limiter = match &config.rate_limit.redis_url {
            Some(url) => match RateLimiter::with_redis(url, max, window).await {
                Ok(limiter) => limiter,
                Err(e) => {
                    tracing::warn!(error = %e, "Redis unavailable; rate limiting in memory");
                    RateLimiter::in_memory(max, window)
                }
            },
            None => RateLimiter::in_memory(max, window),
        };

        tracing::info!(
            mailer = mailer.name(),
            rate_limit_store = limiter.backend(),
            "Application state ready"
        );

        Self::new(db, config, mailer, limiter)
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Whether session cookies carry the `Secure` flag
    pub fn secure_cookies(&self) -> bool {
        self.config.api.production
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /health
/// /api/auth/...                     sign-up, sign-in, OTP, password reset, OAuth
/// /api/progress/update              (session)
/// /api/progress/:userId
/// /api/badges, /api/badges/:userId
/// /api/roadmaps[/:id[/progress]]    progress routes need a session
/// /api/quiz-results[/:userId[/recent|/stats]]
/// /api/testimonials
/// /api/interview-experiences[/:id]
/// /api/email-preference
/// /api/avatar                       (session)
/// /api/questions
/// /api/potd, /api/potd/send
/// /api/contributors/points
/// ```
///
/// # Middleware Stack
///
/// Applied in order (outermost first):
/// 1. Security headers
/// 2. CORS
/// 3. Compression
/// 4. Request tracing
/// 5. Session authentication and rate limiting (per route group)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let session = || axum::middleware::from_fn(create_session_middleware(state.config.jwt.secret.clone()));
    let rate_limited = || {
        axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::rate_limit::auth_rate_limit,
        )
    };

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Credential endpoints that are brute-forceable
    let limited_auth_routes = Router::new()
        .route("/sign-up", post(routes::auth::sign_up))
        .route("/sign-in", post(routes::auth::sign_in))
        .route(
            "/verify-forgot-password-otp",
            post(routes::auth::verify_forgot_password_otp),
        )
        .route_layer(rate_limited());

    let session_auth_routes = Router::new()
        .route("/check-auth", get(routes::auth::check_auth))
        .route_layer(session());

    let auth_routes = Router::new()
        .route("/verify-otp", post(routes::auth::verify_otp))
        .route("/resend-otp", post(routes::auth::resend_otp))
        .route("/forgot-password", post(routes::auth::forgot_password))
        .route("/change-password", post(routes::auth::change_password))
        .route("/logout", post(routes::auth::logout))
        .route("/google", get(routes::oauth::google_start))
        .route("/google/callback", get(routes::oauth::google_callback))
        .route("/github", get(routes::oauth::github_start))
        .route("/github/callback", get(routes::oauth::github_callback))
        .merge(limited_auth_routes)
        .merge(session_auth_routes);

    // Routes that act on the signed-in user
    let session_routes = Router::new()
        .route("/progress/update", post(routes::progress::update_progress))
        .route("/badges", post(routes::badges::award_badges))
        .route(
            "/roadmaps/:roadmap_id/progress",
            get(routes::roadmaps::get_progress).post(routes::roadmaps::update_progress),
        )
        .route("/quiz-results", post(routes::quiz_results::create_result))
        .route(
            "/avatar",
            post(routes::avatar::upload_avatar).delete(routes::avatar::remove_avatar),
        )
        .route_layer(session());

    let public_routes = Router::new()
        .route("/progress/:user_id", get(routes::progress::get_progress))
        .route("/badges/:user_id", get(routes::badges::get_badges))
        .route("/roadmaps", get(routes::roadmaps::list_roadmaps))
        .route("/roadmaps/:roadmap_id", get(routes::roadmaps::get_roadmap))
        .route("/quiz-results/:user_id", get(routes::quiz_results::list_results))
        .route(
            "/quiz-results/:user_id/recent",
            get(routes::quiz_results::recent_results),
        )
        .route(
            "/quiz-results/:user_id/stats",
            get(routes::quiz_results::result_stats),
        )
        .route(
            "/testimonials",
            get(routes::testimonials::list_testimonials).post(routes::testimonials::create_testimonial),
        )
        .route(
            "/interview-experiences",
            get(routes::interview_experiences::list_experiences)
                .post(routes::interview_experiences::create_experience),
        )
        .route(
            "/interview-experiences/:id",
            get(routes::interview_experiences::get_experience),
        )
        .route("/email-preference", get(routes::email_preference::update_preference))
        .route("/questions", get(routes::questions::list_questions))
        .route("/potd", get(routes::potd::get_potd))
        .route("/potd/send", post(routes::potd::send_potd))
        .route("/contributors/points", get(routes::contributors::contributor_points));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(session_routes)
        .merge(public_routes);

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// CORS for the configured origins
///
/// Any origin is mirrored back when `*` is configured, since session
/// cookies require credentials and so rule out a literal wildcard.
fn cors_layer(config: &Config) -> CorsLayer {
    let origin = if config.api.cors_origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-cron-secret"),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
