use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 支持的设备操作系统类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeviceType {
    #[default]
    #[serde(rename = "cisco_xr")]
    CiscoXr,
    #[serde(rename = "cisco_ios")]
    CiscoIos,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::CiscoXr => "cisco_xr",
            DeviceType::CiscoIos => "cisco_ios",
        }
    }

    /// 保存/提交配置的命令
    pub fn save_command(&self) -> &'static str {
        match self {
            DeviceType::CiscoXr => "commit",
            DeviceType::CiscoIos => "write memory",
        }
    }

    /// XR 的配置需要在配置模式内提交
    pub fn commits_in_config_mode(&self) -> bool {
        matches!(self, DeviceType::CiscoXr)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cisco_xr" => Ok(DeviceType::CiscoXr),
            "cisco_ios" => Ok(DeviceType::CiscoIos),
            other => Err(format!("unsupported device type: {}", other)),
        }
    }
}

/// 单台设备的连接参数
#[derive(Clone)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub secret: Option<String>,
    pub device_type: DeviceType,
}

// 避免把口令写进日志
impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("device_type", &self.device_type)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostOutput {
    pub host: String,
    pub output: String,
    pub ok: bool,
}

#[derive(Debug, Deserialize)]
pub struct FetchRequest {
    pub hosts: String,
    pub username: String,
    pub password: String,
    pub device_type: Option<DeviceType>,
    pub port: Option<u16>,
    pub command: String,
}

#[derive(Debug, Serialize)]
pub struct FetchResponse {
    pub commands: Vec<String>,
    pub results: Vec<HostOutput>,
}

#[derive(Debug, Deserialize)]
pub struct ConfigureRequest {
    pub hosts: String,
    pub username: String,
    pub password: String,
    pub secret: Option<String>,
    pub device_type: Option<DeviceType>,
    pub port: Option<u16>,
    pub commands: String,
}

#[derive(Debug, Serialize)]
pub struct ConfigureResponse {
    pub results: Vec<HostOutput>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<Uuid>,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: Uuid,
    pub answer: String,
    pub ok: bool,
    pub transcript_len: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
