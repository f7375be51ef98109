//! Tradução de resultados e erros de serviço em respostas HTTP

use axum::http::header::LOCATION;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::error::ServiceError;
use crate::outcome::{Destination, Flash, Outcome};

/// Corpo de erro: para onde voltar e o que exibir
#[derive(Debug, Serialize)]
struct ErrorBody {
    redirect: Destination,
    flash: Flash,
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Conflict { .. } => StatusCode::CONFLICT,
            ServiceError::Authentication => StatusCode::UNAUTHORIZED,
            ServiceError::Authorization { .. } => StatusCode::FORBIDDEN,
            ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::AccessDenied => StatusCode::SEE_OTHER,
            ServiceError::Store(_) | ServiceError::Session(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match &self {
            ServiceError::Store(e) => error!(error = %e, "Erro de banco de dados"),
            ServiceError::Session(e) => error!(error = %e, "Falha ao emitir token de sessão"),
            _ => {}
        }

        let redirect = self.redirect();
        let body = ErrorBody {
            redirect,
            flash: self.flash(),
        };

        let mut response = (self.status_code(), Json(body)).into_response();
        if matches!(self, ServiceError::AccessDenied) {
            if let Ok(location) = HeaderValue::from_str(&redirect.path()) {
                response.headers_mut().insert(LOCATION, location);
            }
        }
        response
    }
}

impl<T: Serialize> IntoResponse for Outcome<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hospital_db::DbError;

    async fn json_of(response: Response) -> serde_json::Value {
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn access_denied_redirects_to_login() {
        let response = ServiceError::AccessDenied.into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/login");
        let json = json_of(response).await;
        assert_eq!(json["redirect"], "/login");
        assert_eq!(json["flash"]["level"], "info");
    }

    #[tokio::test]
    async fn status_codes_follow_error_kind() {
        let cases = [
            (
                ServiceError::validation("x", Destination::Registration),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ServiceError::conflict("x", Destination::Registration),
                StatusCode::CONFLICT,
            ),
            (ServiceError::Authentication, StatusCode::UNAUTHORIZED),
            (
                ServiceError::authorization("x", Destination::DoctorDashboard),
                StatusCode::FORBIDDEN,
            ),
            (
                ServiceError::not_found("x", Destination::Home),
                StatusCode::NOT_FOUND,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn store_error_hides_detail() {
        let response =
            ServiceError::from(DbError::QueryError("disk I/O error".into())).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_of(response).await;
        assert_eq!(json["redirect"], "/");
        assert!(!json["flash"]["message"].as_str().unwrap().contains("disk"));
    }

    #[tokio::test]
    async fn outcome_carries_redirect_flash_and_data() {
        let outcome = Outcome::new(
            Destination::PatientDashboard,
            Flash::success("Consulta agendada!"),
            serde_json::json!({ "id": 7 }),
        );

        let response = outcome.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        assert_eq!(json["redirect"], "/patient_dashboard");
        assert_eq!(json["flash"]["level"], "success");
        assert_eq!(json["data"]["id"], 7);
    }
}
