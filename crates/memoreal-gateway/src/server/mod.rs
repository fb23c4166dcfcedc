//! Gateway server.

mod accounts;
mod extract;
mod media;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use memoreal_core::Config;
use tower_http::{cors::CorsLayer, services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};

use crate::GatewayError;
use crate::auth::{AuthState, ErrorBody};
use crate::media::{DidClient, ImageHost, ImgurClient, UploadDir, VideoGenerator};
use crate::store::CredentialStore;

/// Gateway state shared across handlers.
///
/// Everything here is immutable after startup.
#[derive(Clone)]
pub struct GatewayState {
    /// Authentication state.
    pub auth: Arc<AuthState>,
    /// Credential store.
    pub store: Arc<dyn CredentialStore>,
    /// Local upload directory.
    pub uploads: UploadDir,
    /// Remote image host.
    pub images: Arc<dyn ImageHost>,
    /// Talking-video generator.
    pub videos: Arc<dyn VideoGenerator>,
}

impl FromRef<GatewayState> for Arc<AuthState> {
    fn from_ref(state: &GatewayState) -> Self {
        state.auth.clone()
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("auth", &self.auth)
            .field("uploads", &self.uploads)
            .finish_non_exhaustive()
    }
}

/// Gateway server.
pub struct Gateway {
    config: Config,
    state: GatewayState,
}

/// Builder for constructing a Gateway with its dependencies.
pub struct GatewayBuilder {
    config: Config,
    store: Option<Arc<dyn CredentialStore>>,
    auth_state: Option<Arc<AuthState>>,
    images: Option<Arc<dyn ImageHost>>,
    videos: Option<Arc<dyn VideoGenerator>>,
}

impl GatewayBuilder {
    /// Create a new builder with default config.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            store: None,
            auth_state: None,
            images: None,
            videos: None,
        }
    }

    /// Set the configuration.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Set the credential store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a prebuilt auth state instead of deriving one from config.
    #[must_use]
    pub fn with_auth_state(mut self, auth: Arc<AuthState>) -> Self {
        self.auth_state = Some(auth);
        self
    }

    /// Set the image host.
    #[must_use]
    pub fn with_image_host(mut self, images: Arc<dyn ImageHost>) -> Self {
        self.images = Some(images);
        self
    }

    /// Set the video generator.
    #[must_use]
    pub fn with_video_generator(mut self, videos: Arc<dyn VideoGenerator>) -> Self {
        self.videos = Some(videos);
        self
    }

    /// Build the gateway.
    ///
    /// # Errors
    ///
    /// Returns error if no store was supplied, auth initialization fails, or
    /// the uploads directory cannot be created.
    pub fn build(self) -> Result<Gateway, GatewayError> {
        let config = self.config;

        let store = self
            .store
            .ok_or_else(|| GatewayError::Config("No credential store configured".to_string()))?;

        let auth = match self.auth_state {
            Some(auth) => auth,
            None => Arc::new(AuthState::initialize(config.auth.clone())?),
        };

        let uploads = UploadDir::open(&config.server.uploads_dir, config.server.public_url())
            .map_err(|e| GatewayError::Config(format!("Failed to open uploads dir: {e}")))?;

        let images: Arc<dyn ImageHost> = match self.images {
            Some(images) => images,
            None => Arc::new(
                ImgurClient::from_config(&config.media)
                    .map_err(|e| GatewayError::Config(format!("Image host init failed: {e}")))?,
            ),
        };

        let videos: Arc<dyn VideoGenerator> = match self.videos {
            Some(videos) => videos,
            None => Arc::new(
                DidClient::from_config(&config.media)
                    .map_err(|e| GatewayError::Config(format!("Video API init failed: {e}")))?,
            ),
        };

        if config.media.imgur_client_id.is_none() {
            tracing::warn!("Imgur client id not configured; image host routes will fail");
        }
        if config.media.did_api_key.is_none() {
            tracing::warn!("D-ID API key not configured; video routes will fail");
        }

        Ok(Gateway {
            config,
            state: GatewayState {
                auth,
                store,
                uploads,
                images,
                videos,
            },
        })
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Gateway {
    /// Create a builder.
    #[must_use]
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// Shared handler state.
    #[must_use]
    pub const fn state(&self) -> &GatewayState {
        &self.state
    }

    /// Build the HTTP router.
    pub fn router(&self) -> Router {
        let server = &self.config.server;

        let mut app = Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_handler))
            .route("/ready", get(ready_handler))
            .route("/api/login", post(accounts::login))
            .route("/api/logout", post(accounts::logout))
            .route("/api/addUser", post(accounts::add_user))
            .route("/api/checkUser", get(accounts::check_user))
            .route("/api/me", get(accounts::me))
            .route("/api/users", get(accounts::list_users))
            .route("/api/fetchUser/{id}", get(accounts::fetch_user))
            .route("/api/updateUser/{username}", put(accounts::update_user))
            .route("/api/deleteUser/{id}", delete(accounts::delete_user))
            .route("/api/uploadImage", post(media::upload_image))
            .route("/api/uploadImageToImgur", post(media::upload_to_image_host))
            .route("/api/retrieveImage/{image_id}", get(media::retrieve_image))
            .route("/api/generateVideo", post(media::generate_video))
            .route("/api/retrieveVideo/{video_id}", get(media::retrieve_video))
            .nest_service("/uploads", ServeDir::new(self.state.uploads.root()))
            .layer(DefaultBodyLimit::max(server.max_upload_bytes))
            .with_state(self.state.clone());

        if self.state.auth.sessions.is_enabled() {
            let sessions = SessionManagerLayer::new(MemoryStore::default())
                .with_secure(self.config.auth.secure_cookies)
                .with_same_site(SameSite::Lax)
                .with_expiry(session_expiry(self.config.auth.token_expiry_secs));
            app = app.layer(sessions);
        }

        if server.cors {
            app = app.layer(CorsLayer::permissive());
        }

        app.layer(TimeoutLayer::new(server.request_timeout()))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the gateway server until interrupted.
    ///
    /// # Errors
    ///
    /// Returns error if the listener cannot bind or the server fails.
    pub async fn run(self) -> Result<(), GatewayError> {
        let addr = format!(
            "{}:{}",
            self.config.server.bind_address, self.config.server.port
        );
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("Memoreal gateway listening on {addr}");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| GatewayError::Server(e.to_string()))
    }
}

fn session_expiry(secs: u64) -> Expiry {
    match std::time::Duration::from_secs(secs).try_into() {
        Ok(inactivity) => Expiry::OnInactivity(inactivity),
        Err(_) => Expiry::OnSessionEnd,
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

async fn root_handler() -> &'static str {
    "Hello from Memoreal server"
}

async fn health_handler() -> &'static str {
    "OK"
}

/// Health plus a round trip to the credential store.
async fn ready_handler(State(state): State<GatewayState>) -> Response {
    match state.store.ping().await {
        Ok(()) => "OK".into_response(),
        Err(e) => {
            tracing::warn!("Readiness check failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorBody::new("Credential store unavailable")),
            )
                .into_response()
        }
    }
}
