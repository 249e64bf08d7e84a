//! OpenAPI documentation aggregator.
//!
//! Collects the `#[utoipa::path]`-annotated handlers and `ToSchema`-derived
//! types into a single OpenAPI 3.1 document, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "hydrosync API",
        version = "0.1.0",
        description = "Reconciliation poller for hydraulic machine readings: prediction history, operator directory, and manual triggers.",
    ),
    tags(
        (name = "Health", description = "Server liveness and effective configuration"),
        (name = "Outputs", description = "Operators, machines, and computed prediction history"),
        (name = "Reconciliation", description = "Manual reconciliation triggers"),
    ),
    paths(
        crate::api::health::health,
        crate::api::outputs::operators,
        crate::api::outputs::history,
        crate::api::trigger::force_check,
    ),
    components(schemas(
        crate::api::ErrorResponse,
        crate::api::health::HealthResponse,
        crate::api::outputs::MachineSummary,
        crate::api::outputs::OperatorSummary,
        crate::api::outputs::OutputRow,
        crate::api::trigger::ForceCheckResponse,
    ))
)]
pub struct ApiDoc;
