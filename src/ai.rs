use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::ModelProfile;
use crate::models::ChatMessage;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("请求失败: {0}")]
    RequestFailed(String),
    #[error("接口返回错误 {status}: {body}")]
    Status { status: u16, body: String },
    #[error("响应格式无效")]
    InvalidResponse,
    #[error("缺少API密钥: {0}")]
    MissingApiKey(String),
}

/// 一次补全调用的全部参数
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub endpoint: &'a str,
    pub api_key: &'a str,
    pub profile: &'a ModelProfile,
    pub messages: &'a [ChatMessage],
}

impl CompletionRequest<'_> {
    pub fn body(&self) -> serde_json::Value {
        let mut body = json!({
            "model": self.profile.model,
            "messages": self.messages,
            "max_tokens": self.profile.max_tokens,
        });
        let optional = [
            ("temperature", self.profile.temperature),
            ("top_p", self.profile.top_p),
            ("presence_penalty", self.profile.presence_penalty),
            ("frequency_penalty", self.profile.frequency_penalty),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                body[key] = json!(value);
            }
        }
        body
    }
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, ChatError>;
}

/// Azure AI 推理接口（OpenAI 兼容的 chat/completions）
pub struct AzureInferenceClient {
    client: reqwest::Client,
}

impl AzureInferenceClient {
    pub fn new(timeout: Duration) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| ChatError::RequestFailed(e.to_string()))?;
        Ok(Self { client })
    }
}

pub fn completions_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim_end_matches('/');
    if endpoint.ends_with("/chat/completions") {
        endpoint.to_string()
    } else {
        format!("{}/chat/completions", endpoint)
    }
}

#[async_trait]
impl CompletionBackend for AzureInferenceClient {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, ChatError> {
        let url = completions_url(request.endpoint);
        info!("发送推理请求: 模型={}, 消息数={}", request.profile.model, request.messages.len());

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", request.api_key))
            .header("api-key", request.api_key)
            .json(&request.body())
            .send()
            .await
            .map_err(|e| ChatError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("推理接口错误 {}: {}", status, body);
            return Err(ChatError::Status { status: status.as_u16(), body });
        }

        let result: serde_json::Value = response.json().await.map_err(|e| {
            error!("解析推理响应失败: {}", e);
            ChatError::InvalidResponse
        })?;

        result["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or(ChatError::InvalidResponse)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    pub profile: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transcript {
    fn new(profile: &str, system_prompt: &str) -> Self {
        let now = Utc::now();
        Self {
            profile: profile.to_string(),
            messages: vec![ChatMessage::system(system_prompt)],
            created_at: now,
            updated_at: now,
        }
    }
}

/// 一次提问的结果；失败时 answer 为错误信息
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub session_id: Uuid,
    pub answer: String,
    pub ok: bool,
    pub transcript_len: usize,
}

/// 按会话保存的内存对话记录，同一会话的提问串行执行
pub struct ChatSessions {
    backend: Arc<dyn CompletionBackend>,
    transcripts: DashMap<Uuid, Arc<Mutex<Transcript>>>,
    system_prompt: String,
}

impl ChatSessions {
    pub fn new(backend: Arc<dyn CompletionBackend>, system_prompt: impl Into<String>) -> Self {
        Self {
            backend,
            transcripts: DashMap::new(),
            system_prompt: system_prompt.into(),
        }
    }

    pub async fn chat(
        &self,
        session_id: Option<Uuid>,
        profile: &ModelProfile,
        endpoint: Option<&str>,
        api_key: Option<&str>,
        message: &str,
    ) -> ChatOutcome {
        let session_id = session_id.unwrap_or_else(Uuid::new_v4);

        // 先取出 Arc，不跨 await 持有 DashMap 的分片锁
        let slot = self
            .transcripts
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(Transcript::new(&profile.id, &self.system_prompt))))
            .clone();

        let mut transcript = slot.lock().await;
        transcript.messages.push(ChatMessage::user(message));
        transcript.updated_at = Utc::now();

        let result = match resolve_key(profile, api_key) {
            Ok(key) => {
                let endpoint = endpoint.filter(|e| !e.trim().is_empty()).unwrap_or(profile.endpoint.as_str());
                let request = CompletionRequest {
                    endpoint,
                    api_key: &key,
                    profile,
                    messages: &transcript.messages,
                };
                self.backend.complete(request).await
            }
            Err(e) => Err(e),
        };

        // 等待期间会话可能已被清除，此时只修改已脱离表的副本
        transcript.updated_at = Utc::now();
        match result {
            Ok(answer) => {
                transcript.messages.push(ChatMessage::assistant(answer.clone()));
                ChatOutcome {
                    session_id,
                    answer,
                    ok: true,
                    transcript_len: transcript.messages.len(),
                }
            }
            Err(e) => {
                error!("对话请求失败: 会话={}, 错误={}", session_id, e);
                // 持锁期间最后一条必然是本轮提问
                transcript.messages.pop();
                ChatOutcome {
                    session_id,
                    answer: e.to_string(),
                    ok: false,
                    transcript_len: transcript.messages.len(),
                }
            }
        }
    }

    pub async fn transcript(&self, session_id: &Uuid) -> Option<Transcript> {
        let slot = self.transcripts.get(session_id).map(|t| t.value().clone())?;
        let transcript = slot.lock().await;
        Some(transcript.clone())
    }

    pub fn clear(&self, session_id: &Uuid) -> bool {
        self.transcripts.remove(session_id).is_some()
    }
}

fn resolve_key(profile: &ModelProfile, api_key: Option<&str>) -> Result<String, ChatError> {
    api_key
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .or_else(|| profile.resolve_api_key())
        .ok_or_else(|| ChatError::MissingApiKey(profile.id.clone()))
}
