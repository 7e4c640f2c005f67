//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI specification for the media-dl REST API using utoipa
//! for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the media-dl REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation (if enabled)
#[derive(OpenApi)]
#[openapi(
    info(
        title = "media-dl REST API",
        version = "0.1.0",
        description = "REST API for submitting media download jobs, polling their progress, and fetching completed artifacts",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8090", description = "Local development server")
    ),
    paths(
        // Downloads
        crate::api::routes::submit_download,
        crate::api::routes::list_downloads,
        crate::api::routes::download_status,
        crate::api::routes::download_file,

        // System
        crate::api::routes::list_platforms,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
        crate::api::routes::shutdown,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::JobId,
        crate::types::Status,
        crate::types::Quality,
        crate::types::Platform,
        crate::types::JobOptions,
        crate::types::JobRecord,
        crate::types::JobResult,
        crate::types::JobFailure,
        crate::types::FailureKind,
        crate::types::MediaMetadata,
        crate::types::PlatformInfo,
        crate::types::Event,

        // Config types from config.rs
        crate::config::Config,
        crate::config::DownloadConfig,
        crate::config::ExtractorConfig,
        crate::config::RetentionConfig,
        crate::config::ApiConfig,

        // API request/response types
        crate::api::routes::SubmitRequest,
        crate::api::routes::SubmitResponse,
        crate::api::routes::StatusResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "downloads", description = "Download jobs - Submit, monitor, and fetch media downloads"),
        (name = "system", description = "System endpoints - Health checks, platform listing, OpenAPI spec, events, shutdown"),
    )
)]
pub struct ApiDoc;
