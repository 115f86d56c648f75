use std::convert::Infallible;
use std::sync::Arc;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::ai::ChatSessions;
use crate::commands::{split_commands, split_hosts};
use crate::config::{Config, ConfigManager};
use crate::device::{self, Connector, Credentials};
use crate::models::*;

const MAX_BODY: u64 = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConfigManager>,
    pub connector: Arc<dyn Connector>,
    pub chats: Arc<ChatSessions>,
}

pub fn routes(
    state: AppState,
    static_dir: &str,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let static_files = warp::fs::dir(static_dir.to_string());
    api(state).or(static_files).recover(handle_rejection)
}

pub fn api(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let presets = warp::path!("api" / "presets")
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(handle_presets);

    let fetch = warp::path!("api" / "device" / "fetch")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handle_fetch);

    let configure = warp::path!("api" / "device" / "configure")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handle_configure);

    let chat = warp::path!("api" / "chat" / String)
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handle_chat);

    let transcript = warp::path!("api" / "chat" / "session" / Uuid)
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(handle_transcript);

    let clear = warp::path!("api" / "chat" / "session" / Uuid)
        .and(warp::delete())
        .and(with_state(state.clone()))
        .map(handle_clear);

    let reload = warp::path!("api" / "config" / "reload")
        .and(warp::post())
        .and(with_state(state))
        .then(handle_reload);

    presets
        .or(fetch)
        .or(configure)
        .or(chat)
        .or(transcript)
        .or(clear)
        .or(reload)
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY).and(warp::body::json())
}

fn error_reply(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorResponse { error: message.into() };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::PayloadTooLarge>() {
        (StatusCode::PAYLOAD_TOO_LARGE, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::UnsupportedMediaType>() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else {
        error!("unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
    };

    Ok(error_reply(code, message))
}

async fn handle_presets(state: AppState) -> Response {
    let config = state.config.get().await;
    let device = &config.device;
    let profiles: Vec<_> = config
        .ai
        .profiles
        .iter()
        .map(|p| {
            json!({
                "id": p.id,
                "title": p.title,
                "model": p.model,
                "endpoint": p.endpoint,
            })
        })
        .collect();

    warp::reply::json(&json!({
        "host": device.default_host,
        "username": device.default_username,
        "device_type": device.device_type,
        "device_types": [DeviceType::CiscoXr, DeviceType::CiscoIos],
        "show_commands": device.show_commands,
        "profiles": profiles,
    }))
    .into_response()
}

fn credentials(
    config: &Config,
    username: String,
    password: String,
    secret: Option<String>,
    device_type: Option<DeviceType>,
    port: Option<u16>,
) -> Credentials {
    Credentials(ConnectionParams {
        host: String::new(),
        port: port.unwrap_or(config.device.port),
        username,
        password,
        secret: secret.filter(|s| !s.is_empty()),
        device_type: device_type.unwrap_or(config.device.device_type),
    })
}

async fn handle_fetch(request: FetchRequest, state: AppState) -> Result<Response, Rejection> {
    let commands = split_commands(&request.command);
    if split_hosts(&request.hosts).is_empty() {
        return Ok(error_reply(StatusCode::BAD_REQUEST, "no target host given"));
    }
    if commands.is_empty() {
        return Ok(error_reply(StatusCode::BAD_REQUEST, "no command given"));
    }

    let config = state.config.get().await;
    let credentials = credentials(
        &config,
        request.username,
        request.password,
        None,
        request.device_type,
        request.port,
    );
    let results = device::fetch(state.connector.clone(), &request.hosts, &credentials, commands.clone()).await;
    info!("抓取完成: 主机数={}", results.len());

    Ok(warp::reply::json(&FetchResponse { commands, results }).into_response())
}

async fn handle_configure(request: ConfigureRequest, state: AppState) -> Result<Response, Rejection> {
    if split_hosts(&request.hosts).is_empty() {
        return Ok(error_reply(StatusCode::BAD_REQUEST, "no target host given"));
    }
    if request.commands.trim().is_empty() {
        return Ok(error_reply(StatusCode::BAD_REQUEST, "no configuration commands given"));
    }

    let config = state.config.get().await;
    let credentials = credentials(
        &config,
        request.username,
        request.password,
        request.secret,
        request.device_type,
        request.port,
    );
    let results = device::configure(state.connector.clone(), &request.hosts, &credentials, &request.commands).await;
    info!("配置完成: 主机数={}", results.len());

    Ok(warp::reply::json(&ConfigureResponse { results }).into_response())
}

async fn handle_chat(profile_id: String, request: ChatRequest, state: AppState) -> Result<Response, Rejection> {
    let config = state.config.get().await;
    let Some(profile) = config.ai.profile(&profile_id) else {
        warn!("未知的模型配置: {}", profile_id);
        return Ok(error_reply(StatusCode::NOT_FOUND, format!("unknown chat profile: {}", profile_id)));
    };
    if request.message.trim().is_empty() {
        return Ok(error_reply(StatusCode::BAD_REQUEST, "empty message"));
    }

    let outcome = state
        .chats
        .chat(
            request.session_id,
            profile,
            request.endpoint.as_deref(),
            request.api_key.as_deref(),
            &request.message,
        )
        .await;

    Ok(warp::reply::json(&ChatResponse {
        session_id: outcome.session_id,
        answer: outcome.answer,
        ok: outcome.ok,
        transcript_len: outcome.transcript_len,
    })
    .into_response())
}

async fn handle_transcript(session_id: Uuid, state: AppState) -> Response {
    match state.chats.transcript(&session_id).await {
        Some(transcript) => warp::reply::json(&transcript).into_response(),
        None => error_reply(StatusCode::NOT_FOUND, "unknown session"),
    }
}

fn handle_clear(session_id: Uuid, state: AppState) -> Response {
    if state.chats.clear(&session_id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_reply(StatusCode::NOT_FOUND, "unknown session")
    }
}

async fn handle_reload(state: AppState) -> Response {
    match state.config.reload().await {
        Ok(()) => {
            info!("配置已重新加载: {}", state.config.path());
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => {
            error!("重新加载配置失败: {:#}", e);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
        }
    }
}
