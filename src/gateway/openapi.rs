//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::{
    LoginRequest, LoginResponse, MetricRequest, MetricResponse, PlanUsageResponse,
};
use crate::store::Plan;

/// Bearer security schemes: session ID for people, API key for machines
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_auth",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "Authorization",
                    "Session auth: Bearer {sessionID} as returned by POST /api/login",
                ))),
            );
            components.add_security_scheme(
                "api_key_auth",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "Authorization",
                    r#"API key auth: Bearer {api_key}

The JSON body must carry the account_id the key was issued for."#,
                ))),
            );
        }
    }
}

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tenant Accounts API",
        version = "1.0.0",
        description = "Session login, API-key metric ingest and plan management for tenant accounts."
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::gateway::handlers::session::login,
        crate::gateway::handlers::session::logout,
        crate::gateway::handlers::metrics::get_usage,
        crate::gateway::handlers::metrics::record_metric,
        crate::gateway::handlers::account::upgrade,
    ),
    components(
        schemas(
            HealthResponse,
            LoginRequest,
            LoginResponse,
            MetricRequest,
            MetricResponse,
            PlanUsageResponse,
            Plan,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and logout"),
        (name = "Metrics", description = "Usage ingest (API key) and plan usage (session)"),
        (name = "Account", description = "Plan management (session)"),
        (name = "System", description = "Health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::OpenApi;

    #[test]
    fn test_openapi_spec_generates() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Tenant Accounts API");
        assert_eq!(spec.info.version, "1.0.0");
    }

    #[test]
    fn test_openapi_json_serializable() {
        let json = ApiDoc::openapi().to_json().unwrap();
        assert!(json.contains("Tenant Accounts API"));
        assert!(json.contains("session_auth"));
        assert!(json.contains("api_key_auth"));
    }

    #[test]
    fn test_endpoints_registered() {
        let paths = ApiDoc::openapi().paths.paths;
        for path in [
            "/api/health",
            "/api/login",
            "/api/logout",
            "/api/metrics",
            "/api/upgrade",
        ] {
            assert!(paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn test_metrics_path_carries_both_gates() {
        let json: serde_json::Value =
            serde_json::from_str(&ApiDoc::openapi().to_json().unwrap()).unwrap();
        let metrics = &json["paths"]["/api/metrics"];
        assert!(metrics["get"]["security"][0]["session_auth"].is_array());
        assert!(metrics["post"]["security"][0]["api_key_auth"].is_array());
        assert!(json["paths"]["/api/upgrade"]["patch"].is_object());
        assert!(json["paths"]["/api/logout"]["delete"].is_object());
    }

    #[test]
    fn test_security_schemes_registered() {
        let spec = ApiDoc::openapi();
        let components = spec.components.expect("should have components");
        assert!(components.security_schemes.contains_key("session_auth"));
        assert!(components.security_schemes.contains_key("api_key_auth"));
    }
}
