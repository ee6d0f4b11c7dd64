//! REST router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. CORS → 2. Access log → Handler

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the clinic API router.
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

fn build_router(ctx: ApiContext) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        // Calendar
        .route("/appointments", get(endpoints::appointments::list))
        .route("/appointments/:id/status", post(endpoints::appointments::set_status))
        .route("/book-appointment", post(endpoints::appointments::book))
        .route("/check-schedule", post(endpoints::appointments::check))
        // Patients
        .route("/patients", get(endpoints::patients::list))
        .route("/patients/:id", get(endpoints::patients::detail))
        .route("/lookup-patient", post(endpoints::patients::lookup))
        .route("/get-patient-history", post(endpoints::patients::history))
        .route("/summarize-history", post(endpoints::patients::summarize))
        .route("/save-note", post(endpoints::notes::save))
        .route("/check-patterns", post(endpoints::alerts::check))
        // Follow-ups
        .route("/get-followups", post(endpoints::followups::queue))
        .route("/send-followup", post(endpoints::followups::send))
        .route("/followups/:id/complete", post(endpoints::followups::complete))
        .route("/followups/:id/reschedule", post(endpoints::followups::reschedule))
        // Dashboard
        .route("/stats", get(endpoints::stats::header))
        .route("/analytics", get(endpoints::stats::report))
        // Voice
        .route(
            "/tts",
            post(endpoints::tts::speak).layer(SetResponseHeaderLayer::overriding(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-store"),
            )),
        )
        .route("/agent/modes", get(endpoints::agent::list))
        .route("/agent/modes/:mode", get(endpoints::agent::get))
        .with_state(ctx);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .nest("/api", routes)
        .layer(axum::middleware::from_fn(middleware::access_log::log_access))
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::core_state::{test_state, test_state_with};
    use crate::db::repository::get_followup_messages;
    use crate::models::enums::DeliveryStatus;
    use crate::voice::{MockMailer, MockSpeechSynthesizer};

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_empty(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn response_json(response: axum::http::Response<Body>) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_response_shape() {
        let app = api_router(test_state());
        let response = app.oneshot(get_req("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["status"], "ok");
        assert!(json["version"].is_string());
    }

    #[tokio::test]
    async fn not_found_for_unknown_route() {
        let app = api_router(test_state());
        let response = app.oneshot(get_req("/api/nonexistent")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn roster_is_a_bare_array() {
        let app = api_router(test_state());
        let response = app.oneshot(get_req("/api/patients")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        let roster = json.as_array().unwrap();
        assert_eq!(roster.len(), 5);
        assert!(roster[0]["alert_counts"]["critical"].is_number());
        assert!(roster[0]["total_notes"].is_number());
    }

    #[tokio::test]
    async fn unknown_patient_returns_404() {
        let app = api_router(test_state());
        let response = app.oneshot(get_req("/api/patients/pat_404")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn appointments_filter_by_patient() {
        let app = api_router(test_state());
        let response = app
            .oneshot(get_req("/api/appointments?patient_id=pat_001"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        let appointments = json["appointments"].as_array().unwrap();
        assert_eq!(appointments.len(), 2);
        assert_eq!(appointments[0]["date"], "2026-02-16");
        assert_eq!(appointments[1]["type"], "lab_review");
    }

    #[tokio::test]
    async fn appointments_reject_bad_date_filter() {
        let app = api_router(test_state());
        let response = app
            .oneshot(get_req("/api/appointments?date=10-03-2026"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn booking_a_taken_slot_returns_409() {
        let app = api_router(test_state());
        let response = app
            .oneshot(post_json(
                "/api/book-appointment",
                serde_json::json!({
                    "patient_id": "pat_003",
                    "date": "2026-03-10",
                    "time": "9:00 AM",
                    "reason": "Review"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn booking_then_checking_the_slot() {
        let state = test_state();
        let booked = api_router(state.clone())
            .oneshot(post_json(
                "/api/book-appointment",
                serde_json::json!({
                    "patient_id": "pat_002",
                    "date": "2026-03-10",
                    "time": "10:00",
                    "type": "new_consultation",
                    "reason": "Thyroid consult"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(booked.status(), StatusCode::OK);
        let json = response_json(booked).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["patient_name"], "Kavitha Suresh");
        assert_eq!(json["time"], "10:00 AM");

        let check = api_router(state)
            .oneshot(post_json(
                "/api/check-schedule",
                serde_json::json!({"date": "2026-03-10", "time": "10:00 AM"}),
            ))
            .await
            .unwrap();
        let json = response_json(check).await;
        assert_eq!(json["available"], false);
        assert_eq!(json["suggestions"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn status_change_only_from_scheduled() {
        let state = test_state();
        let done = api_router(state.clone())
            .oneshot(post_json(
                "/api/appointments/apt_007/status",
                serde_json::json!({"status": "completed"}),
            ))
            .await
            .unwrap();
        assert_eq!(done.status(), StatusCode::OK);
        assert_eq!(response_json(done).await["status"], "completed");

        let again = api_router(state)
            .oneshot(post_json(
                "/api/appointments/apt_007/status",
                serde_json::json!({"status": "cancelled"}),
            ))
            .await
            .unwrap();
        assert_eq!(again.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn lookup_without_body_lists_patients() {
        let app = api_router(test_state());
        let response = app.oneshot(post_empty("/api/lookup-patient")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["total"], 5);
    }

    #[tokio::test]
    async fn lookup_by_first_name() {
        let app = api_router(test_state());
        let response = app
            .oneshot(post_json("/api/lookup-patient", serde_json::json!({"name": "kavitha"})))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["found"], true);
        assert_eq!(json["patient_id"], "pat_002");
    }

    #[tokio::test]
    async fn history_requires_patient_id() {
        let app = api_router(test_state());
        let response = app
            .oneshot(post_json("/api/get-patient-history", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_json_returns_400() {
        let app = api_router(test_state());
        let request = Request::builder()
            .method("POST")
            .uri("/api/save-note")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn summary_is_cached_until_note_saved() {
        let state = test_state();
        let body = serde_json::json!({"patient_id": "pat_001"});

        let first = api_router(state.clone())
            .oneshot(post_json("/api/summarize-history", body.clone()))
            .await
            .unwrap();
        let first = response_json(first).await;
        assert_eq!(first["cached"], false);
        assert_eq!(first["patient_name"], "Ramesh Iyer");

        let second = api_router(state.clone())
            .oneshot(post_json("/api/summarize-history", body.clone()))
            .await
            .unwrap();
        assert_eq!(response_json(second).await["cached"], true);

        let saved = api_router(state.clone())
            .oneshot(post_json(
                "/api/save-note",
                serde_json::json!({
                    "patient_id": "pat_001",
                    "subjective": "Tired in the afternoons",
                    "assessment": "T2DM, review HbA1c"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(saved.status(), StatusCode::OK);
        let saved = response_json(saved).await;
        assert_eq!(saved["success"], true);
        assert_eq!(saved["message"], "SOAP note saved for Ramesh Iyer");

        let third = api_router(state)
            .oneshot(post_json("/api/summarize-history", body))
            .await
            .unwrap();
        assert_eq!(response_json(third).await["cached"], false);
    }

    #[tokio::test]
    async fn check_patterns_without_body_covers_everyone() {
        let state = test_state();
        let all = api_router(state.clone())
            .oneshot(post_empty("/api/check-patterns"))
            .await
            .unwrap();
        let all = response_json(all).await;

        let one = api_router(state)
            .oneshot(post_json(
                "/api/check-patterns",
                serde_json::json!({"patient_id": "pat_001"}),
            ))
            .await
            .unwrap();
        let one = response_json(one).await;
        assert!(all["total"].as_u64().unwrap() > one["total"].as_u64().unwrap());
    }

    #[tokio::test]
    async fn followup_queue_puts_overdue_first() {
        let app = api_router(test_state());
        let response = app.oneshot(post_empty("/api/get-followups")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["followups"][0]["status"], "overdue");
        assert_eq!(json["total"], 5);
    }

    #[tokio::test]
    async fn send_followup_emails_the_patient() {
        let mailer = Arc::new(MockMailer::new());
        let state = test_state_with(Arc::new(MockSpeechSynthesizer::new(b"ID3")), mailer.clone());
        let response = api_router(state)
            .oneshot(post_json(
                "/api/send-followup",
                serde_json::json!({"patient_id": "pat_002", "message_type": "lab_results"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["channels"], serde_json::json!(["email"]));
        assert_eq!(json["deliveries"][0]["status"], "sent");

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "kavitha.s@example.com");
    }

    #[tokio::test]
    async fn failed_email_returns_502_without_provider_detail() {
        let state = test_state_with(
            Arc::new(MockSpeechSynthesizer::new(b"ID3")),
            Arc::new(MockMailer::failing(401, "invalid api key sk-live-123")),
        );
        let response = api_router(state.clone())
            .oneshot(post_json(
                "/api/send-followup",
                serde_json::json!({"patient_id": "pat_002", "send_email": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
        let text = String::from_utf8_lossy(&body);
        assert!(!text.contains("sk-live-123"));
        assert!(!text.contains("invalid api key"));

        // The attempt is still in the outbox.
        let conn = state.lock_db().unwrap();
        let outbox = get_followup_messages(&conn, "pat_002").unwrap();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].status, DeliveryStatus::Failed);
    }

    #[tokio::test]
    async fn failed_email_with_queued_sms_reports_generic_error() {
        let state = test_state_with(
            Arc::new(MockSpeechSynthesizer::new(b"ID3")),
            Arc::new(MockMailer::failing(401, "invalid api key sk-live-123")),
        );
        let response = api_router(state)
            .oneshot(post_json(
                "/api/send-followup",
                serde_json::json!({"patient_id": "pat_002", "send_email": true, "send_sms": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert!(!json.to_string().contains("sk-live-123"));
        assert_eq!(json["success"], false);
        assert_eq!(json["deliveries"][0]["status"], "failed");
        assert_eq!(json["deliveries"][0]["error"], "Email delivery failed");
        assert_eq!(json["deliveries"][1]["status"], "queued");
    }

    #[tokio::test]
    async fn optional_bodies_still_reject_malformed_json() {
        let state = test_state();
        for uri in ["/api/check-patterns", "/api/lookup-patient"] {
            let request = Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from("{garbage"))
                .unwrap();
            let response = api_router(state.clone()).oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[tokio::test]
    async fn send_followup_without_email_address_returns_400() {
        let app = api_router(test_state());
        let response = app
            .oneshot(post_json(
                "/api/send-followup",
                serde_json::json!({"patient_id": "pat_003", "send_email": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn complete_unknown_followup_returns_404() {
        let app = api_router(test_state());
        let response = app
            .oneshot(post_empty("/api/followups/fu_404/complete"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reschedule_followup_sets_upcoming() {
        let app = api_router(test_state());
        let response = app
            .oneshot(post_json(
                "/api/followups/fu_004/reschedule",
                serde_json::json!({"due_date": "2026-12-01"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["due_date"], "2026-12-01");
        assert_eq!(json["status"], "upcoming");
    }

    #[tokio::test]
    async fn stats_use_camel_case() {
        let app = api_router(test_state());
        let response = app.oneshot(get_req("/api/stats")).await.unwrap();
        let json = response_json(response).await;
        assert_eq!(json["patientCount"], 5);
        assert!(json["todayCount"].is_number());
        assert!(json["weekCount"].is_number());
    }

    #[tokio::test]
    async fn analytics_rejects_unknown_grouping() {
        let state = test_state();
        let ok = api_router(state.clone())
            .oneshot(get_req("/api/analytics?group_by=week"))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
        let json = response_json(ok).await;
        assert_eq!(json["group_by"], "week");
        assert_eq!(json["total_appointments"], 8);

        let bad = api_router(state)
            .oneshot(get_req("/api/analytics?group_by=year"))
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn tts_returns_audio_without_caching() {
        let app = api_router(test_state());
        let response = app
            .oneshot(post_json("/api/tts", serde_json::json!({"text": "Good morning"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "audio/mpeg");
        assert_eq!(response.headers()["cache-control"], "no-store");
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"ID3mock");
    }

    #[tokio::test]
    async fn tts_requires_text() {
        let app = api_router(test_state());
        let response = app
            .oneshot(post_json("/api/tts", serde_json::json!({"text": "  "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn tts_without_key_returns_500() {
        let state = test_state_with(
            Arc::new(MockSpeechSynthesizer::unconfigured()),
            Arc::new(MockMailer::new()),
        );
        let response = api_router(state)
            .oneshot(post_json("/api/tts", serde_json::json!({"text": "Hello"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "NOT_CONFIGURED");
    }

    #[tokio::test]
    async fn tts_provider_failure_returns_502() {
        let state = test_state_with(
            Arc::new(MockSpeechSynthesizer::failing(429, "quota exceeded")),
            Arc::new(MockMailer::new()),
        );
        let response = api_router(state)
            .oneshot(post_json("/api/tts", serde_json::json!({"text": "Hello"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn agent_modes_catalogue() {
        let state = test_state();
        let all = api_router(state.clone())
            .oneshot(get_req("/api/agent/modes"))
            .await
            .unwrap();
        let json = response_json(all).await;
        assert_eq!(json["modes"].as_array().unwrap().len(), 5);

        let booking = api_router(state.clone())
            .oneshot(get_req("/api/agent/modes/booking"))
            .await
            .unwrap();
        assert_eq!(response_json(booking).await["label"], "Voice Booking");

        let unknown = api_router(state)
            .oneshot(get_req("/api/agent/modes/triage"))
            .await
            .unwrap();
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }
}
