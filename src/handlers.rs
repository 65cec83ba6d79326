use std::sync::Arc;

use actix_web::{error, get, http::header, post, web, HttpRequest, HttpResponse, ResponseError};
use log::{info, warn};

use crate::auth::verify_credentials;
use crate::directory::UserDirectory;
use crate::error::AuthError;
use crate::models::{Credentials, Identity, LoginResponse};
use crate::token::TokenIssuer;

pub struct AppState {
    pub directory: Arc<dyn UserDirectory>,
    pub issuer: TokenIssuer,
}

#[post("/login")]
async fn login_user(
    credentials: web::Json<Credentials>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AuthError> {
    let identity = verify_credentials(
        state.directory.as_ref(),
        &credentials.email,
        &credentials.password,
    )?;

    let token = state.issuer.issue(&identity)?;
    info!("Issued token for {}", identity.email);

    Ok(HttpResponse::Ok().json(LoginResponse {
        message: "Login successful".to_owned(),
        email: identity.email,
        token,
    }))
}

#[get("/me")]
async fn current_user(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<web::Json<Identity>, AuthError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AuthError::TokenInvalid("missing bearer token".into()))?;

    Ok(web::Json(state.issuer.verify(token.trim())?))
}

/// Turns unreadable JSON bodies into the same 400 shape as other validation
/// failures.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        warn!("Rejected login body: {}", err);
        let detail = err.to_string();
        error::InternalError::from_response(err, AuthError::Validation(detail).error_response())
            .into()
    })
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .app_data(json_config())
            .service(login_user)
            .service(current_user),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hash_password;
    use crate::directory::InMemoryUserDirectory;
    use crate::models::User;
    use crate::token::HmacSigner;
    use actix_web::{http::StatusCode, test, App};
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde_json::json;

    fn state() -> web::Data<AppState> {
        let directory = InMemoryUserDirectory::new(vec![User {
            name: "John Doe".into(),
            email: "john@example.com".into(),
            password_hash: hash_password("password123").unwrap(),
        }])
        .unwrap();
        let signer = Arc::new(HmacSigner::new(b"s3cr3t").unwrap());
        web::Data::new(AppState {
            directory: Arc::new(directory),
            issuer: TokenIssuer::new(signer, 3600).unwrap(),
        })
    }

    #[actix_web::test]
    async fn login_returns_token() {
        let app = test::init_service(
            App::new().app_data(state()).configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({"email": "john@example.com", "password": "password123"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: LoginResponse = test::read_body_json(resp).await;
        assert_eq!(body.message, "Login successful");
        assert_eq!(body.email, "john@example.com");

        let parts: Vec<&str> = body.token.split('.').collect();
        assert_eq!(parts.len(), 3);
        let payload: serde_json::Value =
            serde_json::from_slice(&STANDARD.decode(parts[1]).unwrap()).unwrap();
        assert_eq!(payload["email"], "john@example.com");
        assert_eq!(payload["name"], "John Doe");
    }

    #[actix_web::test]
    async fn bad_credentials_get_generic_401() {
        let app = test::init_service(
            App::new().app_data(state()).configure(configure_routes),
        )
        .await;

        let mut bodies = Vec::new();
        for creds in [
            json!({"email": "john@example.com", "password": "wrong"}),
            json!({"email": "nobody@example.com", "password": "password123"}),
            json!({"email": "john@example.com"}),
            json!({}),
        ] {
            let req = test::TestRequest::post()
                .uri("/auth/login")
                .set_json(creds)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            let body: serde_json::Value = test::read_body_json(resp).await;
            assert!(body.get("token").is_none());
            bodies.push(body);
        }
        assert!(bodies.iter().all(|b| b == &json!({"message": "Invalid email or password"})));
    }

    #[actix_web::test]
    async fn malformed_body_is_bad_request() {
        let app = test::init_service(
            App::new().app_data(state()).configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"message": "Invalid request"}));
    }

    #[actix_web::test]
    async fn me_returns_identity_for_valid_token() {
        let state = state();
        let token = state
            .issuer
            .issue(&Identity {
                email: "john@example.com".into(),
                name: "John Doe".into(),
            })
            .unwrap();
        let app =
            test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let req = test::TestRequest::get()
            .uri("/auth/me")
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Identity = test::read_body_json(resp).await;
        assert_eq!(body.email, "john@example.com");
        assert_eq!(body.name, "John Doe");
    }

    #[actix_web::test]
    async fn me_rejects_missing_or_bad_token() {
        let app = test::init_service(
            App::new().app_data(state()).configure(configure_routes),
        )
        .await;

        for auth in [None, Some("Bearer nope"), Some("Basic am9objpwdw==")] {
            let mut req = test::TestRequest::get().uri("/auth/me");
            if let Some(value) = auth {
                req = req.insert_header((header::AUTHORIZATION, value));
            }
            let resp = test::call_service(&app, req.to_request()).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            let body: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(body, json!({"message": "Invalid email or password"}));
        }
    }
}
