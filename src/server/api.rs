use crate::cli::Args;
use crate::llm::chat::ChatClient;
use crate::models::chat::ChatMessage;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    routing::post,
    Router,
    Json,
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tower_http::cors::{Any, CorsLayer};
use log::{info, error};

#[derive(Clone)]
struct AppState {
    client: Arc<dyn ChatClient>,
    system_prompt: Arc<str>,
}

pub fn router(client: Arc<dyn ChatClient>, system_prompt: Arc<str>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat_handler))
        .layer(cors)
        .with_state(AppState {
            client,
            system_prompt,
        })
}

pub async fn start_http_server(
    addr: &str,
    client: Arc<dyn ChatClient>,
    system_prompt: Arc<str>,
    args: Args,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = addr.parse::<SocketAddr>()?;
    let app = router(client, system_prompt);

    if args.enable_tls && args.tls_cert_path.is_some() && args.tls_key_path.is_some() {
        let cert_path = args.tls_cert_path.as_ref().unwrap();
        let key_path = args.tls_key_path.as_ref().unwrap();

        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            cert_path,
            key_path
        ).await?;

        info!("Starting HTTPS server on: https://{}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await?;
    } else {
        info!("Starting HTTP server on: http://{}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app.into_make_service()).await?;
    }

    Ok(())
}

/// Outbound sequence: the service-owned system instruction first, then the
/// caller's conversation in its original order.
fn with_system_instruction(system_prompt: &str, messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let mut outbound = Vec::with_capacity(messages.len() + 1);
    outbound.push(ChatMessage::system(system_prompt));
    outbound.extend(messages);
    outbound
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(messages): Json<Vec<ChatMessage>>,
) -> Response {
    let outbound = with_system_instruction(state.system_prompt.as_ref(), messages);

    match state.client.stream_chat(outbound).await {
        Ok(stream) => {
            // Fragments are forwarded as they arrive; an Err item from the
            // upstream stream aborts the body mid-transfer.
            let body = Body::from_stream(stream);
            ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
        }
        Err(e) => {
            error!("Failed to open completion stream: {}", e);
            (StatusCode::BAD_GATEWAY, "Upstream completion call failed").into_response()
        }
    }
}
