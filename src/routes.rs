use crate::{
    api::{attendance, notifications, payslip, profile, vacation},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let protected_limiter = build_limiter(config.rate_protected_per_min);
    let upload_limiter = build_limiter(config.rate_upload_per_min);

    // All routes require a verified bearer token; the identity provider
    // that mints the tokens is external.
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/attendance")
                    .service(
                        web::resource("/start").route(web::post().to(attendance::start_shift)),
                    )
                    .service(web::resource("/end").route(web::post().to(attendance::end_shift)))
                    .service(
                        web::resource("/end-at").route(web::post().to(attendance::end_shift_at)),
                    )
                    .service(web::resource("/state").route(web::get().to(attendance::shift_state)))
                    .service(
                        web::resource("/periods").route(web::get().to(attendance::day_periods)),
                    )
                    .service(
                        web::resource("/monthly-hours")
                            .route(web::get().to(attendance::monthly_hours)),
                    ),
            )
            .service(
                web::scope("/vacation")
                    // /vacation
                    .service(
                        web::resource("")
                            .route(web::post().to(vacation::create_request))
                            .route(web::get().to(vacation::my_requests)),
                    )
                    // /vacation/pending
                    .service(
                        web::resource("/pending").route(web::get().to(vacation::pending_requests)),
                    )
                    // /vacation/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(vacation::approve_request)),
                    )
                    // /vacation/{id}/reject
                    .service(
                        web::resource("/{id}/reject").route(web::put().to(vacation::reject_request)),
                    ),
            )
            .service(
                web::scope("/notifications")
                    .service(
                        web::resource("").route(web::get().to(notifications::list_notifications)),
                    )
                    .service(
                        web::resource("/{id}/read")
                            .route(web::post().to(notifications::read_notification)),
                    ),
            )
            .service(
                web::scope("/payslips")
                    .service(
                        web::resource("/upload")
                            .wrap(upload_limiter)
                            .route(web::post().to(payslip::upload_payslip)),
                    )
                    .service(web::resource("").route(web::get().to(payslip::list_payslips)))
                    .service(
                        web::resource("/{period_key}")
                            .route(web::get().to(payslip::get_payslip))
                            .route(web::delete().to(payslip::delete_payslip)),
                    ),
            )
            .service(web::resource("/me").route(web::get().to(profile::me))),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_db;
    use crate::models::{Claims, TokenType};
    use crate::workflow::events::ShiftEvents;
    use actix_web::{App, test, web::Data};
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::Value;
    use sqlx::SqlitePool;
    use uuid::Uuid;

    const SECRET: &str = "test-secret";

    fn peer() -> std::net::SocketAddr {
        "127.0.0.1:49000".parse().unwrap()
    }

    fn test_config() -> Config {
        Config {
            server_addr: "127.0.0.1:0".into(),
            database_url: "sqlite::memory:".into(),
            jwt_secret: SECRET.into(),
            company_tz: chrono_tz::Asia::Jerusalem,
            rate_protected_per_min: 1000,
            rate_upload_per_min: 100,
            api_prefix: "/api".into(),
        }
    }

    fn bearer(user_id: &str, role: &str) -> String {
        let claims = Claims {
            sub: user_id.to_string(),
            company_id: "c1".to_string(),
            role: role.to_string(),
            exp: (Utc::now().timestamp() as usize) + 3600,
            jti: Uuid::new_v4().to_string(),
            token_type: TokenType::Access,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        format!("Bearer {}", token)
    }

    async fn seed_user(pool: &SqlitePool, id: &str, role: &str, manager_id: Option<&str>, balance: f64) {
        sqlx::query(
            r#"
            INSERT INTO users
                (id, company_id, full_name, role, direct_manager_id, vacation_balance, created_at)
            VALUES (?, 'c1', 'Test User', ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(role)
        .bind(manager_id)
        .bind(balance)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
    }

    macro_rules! test_app {
        ($pool:expr) => {{
            let config = test_config();
            let config_data = config.clone();
            test::init_service(
                App::new()
                    .app_data(Data::new($pool.clone()))
                    .app_data(Data::new(config))
                    .app_data(Data::new(ShiftEvents::new(16)))
                    .configure(move |cfg| configure(cfg, config_data.clone())),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn attendance_flow_over_http() {
        let pool = init_memory_db().await;
        seed_user(&pool, "u1", "employee", None, 0.0).await;
        let app = test_app!(pool);
        let token = bearer("u1", "employee");

        let req = test::TestRequest::post().peer_addr(peer())
            .uri("/api/attendance/start")
            .insert_header(("Authorization", token.clone()))
            .set_json(serde_json::json!({}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["result"], "STARTED");

        let req = test::TestRequest::post().peer_addr(peer())
            .uri("/api/attendance/start")
            .insert_header(("Authorization", token.clone()))
            .set_json(serde_json::json!({}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["result"], "ALREADY_STARTED");

        let req = test::TestRequest::get().peer_addr(peer())
            .uri("/api/attendance/state")
            .insert_header(("Authorization", token.clone()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["is_active"], true);

        let req = test::TestRequest::post().peer_addr(peer())
            .uri("/api/attendance/end")
            .insert_header(("Authorization", token.clone()))
            .set_json(serde_json::json!({}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["result"], "ENDED");

        let req = test::TestRequest::get().peer_addr(peer())
            .uri("/api/attendance/monthly-hours")
            .insert_header(("Authorization", token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["hours"].as_f64().unwrap() >= 0.0);
    }

    #[actix_web::test]
    async fn forced_end_requires_a_timestamp() {
        let pool = init_memory_db().await;
        seed_user(&pool, "u1", "employee", None, 0.0).await;
        let app = test_app!(pool);

        let req = test::TestRequest::post().peer_addr(peer())
            .uri("/api/attendance/end-at")
            .insert_header(("Authorization", bearer("u1", "employee")))
            .set_json(serde_json::json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["result"], "ERROR");
    }

    #[actix_web::test]
    async fn vacation_approval_flow_over_http() {
        let pool = init_memory_db().await;
        seed_user(&pool, "mgr", "manager", None, 0.0).await;
        seed_user(&pool, "emp", "employee", Some("mgr"), 10.0).await;
        let app = test_app!(pool);

        let req = test::TestRequest::post().peer_addr(peer())
            .uri("/api/vacation")
            .insert_header(("Authorization", bearer("emp", "employee")))
            .set_json(serde_json::json!({
                "start_date": "2026-06-01",
                "end_date": "2026-06-04",
                "reason": "Family trip"
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "PENDING");
        let request_id = body["request_id"].as_str().unwrap().to_string();

        // employees cannot approve
        let req = test::TestRequest::put().peer_addr(peer())
            .uri(&format!("/api/vacation/{}/approve", request_id))
            .insert_header(("Authorization", bearer("emp", "employee")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 403);

        let req = test::TestRequest::put().peer_addr(peer())
            .uri(&format!("/api/vacation/{}/approve", request_id))
            .insert_header(("Authorization", bearer("mgr", "manager")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let balance: f64 = sqlx::query_scalar("SELECT vacation_balance FROM users WHERE id = 'emp'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(balance, 6.0);

        // the employee got exactly one approval notification
        let req = test::TestRequest::get().peer_addr(peer())
            .uri("/api/notifications")
            .insert_header(("Authorization", bearer("emp", "employee")))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let approved: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .filter(|n| n["kind"] == "VACATION_APPROVED")
            .collect();
        assert_eq!(approved.len(), 1);
    }

    #[actix_web::test]
    async fn requests_without_a_token_are_rejected() {
        let pool = init_memory_db().await;
        let app = test_app!(pool);

        let req = test::TestRequest::get().peer_addr(peer()).uri("/api/me").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }
}
