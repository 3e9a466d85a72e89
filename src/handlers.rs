use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Responder};
use futures_util::StreamExt;
use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::app_config::Config;
use crate::upstream::{SessionPayload, UpstreamClient};

pub struct AppState {
    pub config: Config,
    pub upstream: UpstreamClient,
}

#[derive(Serialize)]
struct ConfigResponse {
    workflow_id: Option<String>,
}

#[derive(Deserialize)]
struct SessionRequest {
    workflow_id: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn get_config(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(ConfigResponse {
        workflow_id: data.config.workflow_id.clone(),
    })
}

pub async fn create_session(mut payload: web::Payload, data: web::Data<AppState>) -> HttpResponse {
    let mut body_buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = payload.next().await {
        match chunk {
            Ok(bytes) => body_buffer.extend_from_slice(&bytes),
            Err(err) => {
                error!("Reading session request body failed: {err}");
                return HttpResponse::BadRequest().json(ErrorResponse {
                    error: "unable to read request body".into(),
                });
            }
        }
    }

    let request: SessionRequest = match serde_json::from_slice(&body_buffer) {
        Ok(parsed) => parsed,
        Err(err) => {
            debug!("Malformed session request: {err}");
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: format!("invalid JSON body: {err}"),
            });
        }
    };

    let session_payload = SessionPayload {
        workflow_id: request
            .workflow_id
            .or_else(|| data.config.workflow_id.clone()),
    };

    match data.upstream.create_session(&session_payload).await {
        Ok((status, body)) => {
            let status = StatusCode::from_u16(status.as_u16())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

            HttpResponse::build(status)
                .content_type("application/json")
                .body(body)
        }
        Err(err) => {
            error!("Session request to upstream failed: {err}");
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: err.to_string(),
            })
        }
    }
}
