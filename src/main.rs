mod app_config;
mod handlers;
mod static_files;
mod std_logger;
mod upstream;

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::Method;
use actix_web::middleware::DefaultHeaders;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use clap::Parser;
use log::{info, LevelFilter};
use std::io::{Error, ErrorKind, Result};
use std::env;

use app_config::{CliArgs, Config};
use handlers::AppState;
use upstream::UpstreamClient;

#[actix_web::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let log_level = env::var("LOG_LEVEL")
        .ok()
        .and_then(|value| value.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);
    if let Err(err) = std_logger::init(log_level) {
        eprintln!("Unable to install logger: {err}");
    }

    let config = Config::load(&args)?;
    let client = UpstreamClient::build(&config)
        .map_err(|err| Error::new(ErrorKind::Other, err))?;

    info!("Listening on http://{}:{}", config.bind, config.port);
    info!("Serving static files from '{}'", config.static_dir.display());
    info!("Proxying POST /api/session to {}", client.session_url());

    let state = web::Data::new(AppState {
        config: config.clone(),
        upstream: client,
    });
    let bind_addr = (config.bind.clone(), config.port);

    HttpServer::new(move || build_app(state.clone()))
        .workers(config.worker_count)
        .bind(bind_addr)?
        .run()
        .await
}

fn build_app(
    state: web::Data<AppState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(state)
        .wrap(
            DefaultHeaders::new()
                .add(("Access-Control-Allow-Origin", "*"))
                .add(("Access-Control-Allow-Methods", "GET, POST, OPTIONS"))
                .add(("Access-Control-Allow-Headers", "Content-Type, x-api-key")),
        )
        .service(
            web::resource("/api/config")
                .route(web::get().to(handlers::get_config))
                .default_service(web::to(preflight_or_405)),
        )
        .service(
            web::resource("/api/session")
                .route(web::post().to(handlers::create_session))
                .default_service(web::to(preflight_or_405)),
        )
        .default_service(web::to(fallback))
}

/// CORS preflights short-circuit with an empty 204 on every path; other
/// unmatched methods on API resources are rejected outright rather than
/// falling through to the file server.
async fn preflight_or_405(req: HttpRequest) -> HttpResponse {
    if req.method() == Method::OPTIONS {
        HttpResponse::NoContent().finish()
    } else {
        HttpResponse::MethodNotAllowed().finish()
    }
}

async fn fallback(req: HttpRequest, data: web::Data<AppState>) -> HttpResponse {
    let method = req.method();

    if method == Method::OPTIONS {
        return HttpResponse::NoContent().finish();
    }

    if method == Method::GET || method == Method::HEAD {
        return static_files::serve(req.path(), &data.config.static_dir).await;
    }

    HttpResponse::MethodNotAllowed().finish()
}
