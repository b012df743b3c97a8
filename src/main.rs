use axum::routing::{get, post};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod db;
mod errors;
mod helpers;
mod routes;
mod services;

use config::{AppConfig, LogFormat};
use db::queries::PgWeatherStore;
use routes::AppState;
use services::geocoding::GeocodingClient;
use services::open_meteo::ForecastClient;
use services::pipeline::Providers;

/// Maximum number of connections in the database pool.
const DB_POOL_MAX_CONNECTIONS: u32 = 5;
/// Minimum number of connections kept alive in the database pool.
const DB_POOL_MIN_CONNECTIONS: u32 = 2;

/// Weather Entries API OpenAPI document.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Weather Entries API",
        version = "0.1.0",
        description = "City/day weather journal. Resolves city names with the Open-Meteo \
            geocoding API, fetches hourly and daily forecasts, aggregates them into one \
            record per city, country and day, and serves filtered, paginated reads.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Weather", description = "Weather records and live fetching"),
        (name = "Geocoding", description = "Reverse-geocoding passthrough"),
    ),
    paths(
        routes::health::health_check,
        routes::weather::list_weather,
        routes::weather::get_weather,
        routes::weather::create_weather,
        routes::weather::update_weather,
        routes::weather::delete_weather,
        routes::weather::preview_weather,
        routes::weather::live_fetch_weather,
        routes::proxy::reverse_geocode,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::weather::WeatherResponse,
            routes::weather::WeatherListItem,
            routes::weather::WeatherListResponse,
            routes::weather::CreatedResponse,
            routes::weather::UpdatedResponse,
            routes::weather::WeatherPreview,
            routes::weather::LiveFetchResponse,
            services::records::WeatherInput,
            services::pipeline::FetchRequest,
            services::aggregate::TemperatureKind,
            db::models::HourlyData,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    let config = AppConfig::from_env();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "weather_entries_api=debug,tower_http=debug".into());
    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }

    // Set up database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(DB_POOL_MAX_CONNECTIONS)
        .min_connections(DB_POOL_MIN_CONNECTIONS)
        .acquire_timeout(config.upstream_timeout)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    let providers = Providers {
        geocoder: GeocodingClient::new(&config.geocoding_api_url, config.upstream_timeout)
            .expect("Failed to build geocoding HTTP client"),
        forecasts: ForecastClient::new(&config.forecast_api_url, config.upstream_timeout)
            .expect("Failed to build forecast HTTP client"),
    };

    let app_state = AppState {
        store: Arc::new(PgWeatherStore::new(pool)),
        providers,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
        ])
        .allow_headers(Any);

    // Static segments take precedence over `:id`.
    let weather_routes = Router::new()
        .route(
            "/api/weather",
            get(routes::weather::list_weather).post(routes::weather::create_weather),
        )
        .route("/api/weather/fetch", post(routes::weather::preview_weather))
        .route(
            "/api/weather/live-fetch",
            post(routes::weather::live_fetch_weather),
        )
        .route(
            "/api/weather/:id",
            get(routes::weather::get_weather)
                .put(routes::weather::update_weather)
                .delete(routes::weather::delete_weather),
        );

    let app = Router::new()
        .route("/api/health", get(routes::health::health_check))
        .route(
            "/api/proxy/reverse-geocode",
            get(routes::proxy::reverse_geocode),
        )
        .merge(weather_routes)
        .with_state(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
