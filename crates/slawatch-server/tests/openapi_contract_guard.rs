mod common;

use anyhow::{anyhow, Result};
use common::{build_test_context, request_no_body};
use std::collections::{BTreeSet, HashSet};

#[tokio::test]
async fn openapi_paths_should_be_covered_by_test_matrix() -> Result<()> {
    let ctx = build_test_context().await?;
    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/openapi.json").await;
    assert_eq!(status, axum::http::StatusCode::OK);

    let Some(paths) = body["paths"].as_object() else {
        return Err(anyhow!("openapi paths should be object"));
    };

    let mut exposed: BTreeSet<String> = BTreeSet::new();
    for (path, methods) in paths {
        let Some(methods) = methods.as_object() else {
            return Err(anyhow!("path methods should be object for {path}"));
        };
        for method in methods.keys() {
            let method = method.to_ascii_uppercase();
            exposed.insert(format!("{method} {path}"));
        }
    }

    let covered: HashSet<String> = [
        "GET /v1/health",
        "GET /v1/incidents",
        "POST /v1/incidents",
        "GET /v1/incidents/{id}",
        "PATCH /v1/incidents/{id}",
        "DELETE /v1/incidents/{id}",
        "POST /v1/incidents/{id}/assign",
        "POST /v1/incidents/{id}/status",
        "GET /v1/incidents/stats/summary",
        "GET /v1/incidents/{id}/sla",
        "POST /v1/incidents/{id}/sla/response",
        "POST /v1/incidents/{id}/sla/pause",
        "POST /v1/incidents/{id}/sla/resume",
        "GET /v1/incidents/{id}/comments",
        "POST /v1/incidents/{id}/comments",
        "GET /v1/incidents/{id}/attachments",
        "POST /v1/incidents/{id}/attachments",
        "GET /v1/users",
        "POST /v1/users",
    ]
    .into_iter()
    .map(|s| s.to_string())
    .collect();

    let missing: Vec<String> = exposed
        .into_iter()
        .filter(|route| {
            route.starts_with("GET /v1/")
                || route.starts_with("POST /v1/")
                || route.starts_with("PATCH /v1/")
                || route.starts_with("DELETE /v1/")
        })
        .filter(|route| !route.starts_with("GET /v1/openapi"))
        .filter(|route| !covered.contains(route))
        .collect();

    assert!(
        missing.is_empty(),
        "missing endpoint coverage for: {missing:?}"
    );
    Ok(())
}

#[tokio::test]
async fn openapi_incident_list_query_params_should_be_optional() -> Result<()> {
    let ctx = build_test_context().await?;
    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/openapi.json").await;
    assert_eq!(status, axum::http::StatusCode::OK);

    let Some(paths) = body["paths"].as_object() else {
        return Err(anyhow!("openapi paths should be object"));
    };

    let operation = paths
        .get("/v1/incidents")
        .and_then(|item| item.get("get"))
        .ok_or_else(|| anyhow!("missing GET operation for /v1/incidents"))?;
    let Some(parameters) = operation["parameters"].as_array() else {
        return Err(anyhow!("missing parameters for GET /v1/incidents"));
    };

    for name in [
        "status__eq",
        "priority__eq",
        "assignee_id__eq",
        "reporter_id__eq",
        "search",
        "limit",
        "offset",
    ] {
        let parameter = parameters
            .iter()
            .find(|param| {
                param["in"].as_str() == Some("query") && param["name"].as_str() == Some(name)
            })
            .ok_or_else(|| anyhow!("missing query parameter {name} on GET /v1/incidents"))?;

        let required = parameter
            .get("required")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);

        assert!(
            !required,
            "query parameter {name} on GET /v1/incidents should be optional"
        );
    }
    Ok(())
}

#[tokio::test]
async fn openapi_sla_schema_should_expose_lifecycle_fields() -> Result<()> {
    let ctx = build_test_context().await?;
    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/openapi.json").await;
    assert_eq!(status, axum::http::StatusCode::OK);

    let Some(schemas) = body["components"]["schemas"].as_object() else {
        return Err(anyhow!("openapi components.schemas should be object"));
    };

    let sla = schemas
        .get("SlaResponse")
        .ok_or_else(|| anyhow!("SlaResponse schema should exist"))?;
    let Some(props) = sla["properties"].as_object() else {
        return Err(anyhow!("SlaResponse.properties should be object"));
    };

    for field in [
        "response_deadline",
        "resolution_deadline",
        "effective_resolution_deadline",
        "response_at",
        "paused_duration_secs",
        "breach_notified_at",
        "response_remaining_minutes",
        "resolution_remaining_minutes",
    ] {
        assert!(
            props.contains_key(field),
            "SlaResponse should contain field {field}"
        );
    }
    Ok(())
}
