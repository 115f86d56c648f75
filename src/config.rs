use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use serde::{Serialize, Deserialize};
use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::models::DeviceType;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub device: DeviceConfig,
    pub ai: AIConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub address: String,
    pub log_level: String,
    pub json_logs: bool,
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            address: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            static_dir: "static".to_string(),
        }
    }
}

/// 设备表单默认值与SSH参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub default_host: String,
    pub default_username: String,
    pub device_type: DeviceType,
    pub port: u16,
    pub connect_timeout: u64,
    pub read_timeout: u64,
    pub show_commands: Vec<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            default_host: "sandbox-iosxr-1.cisco.com".to_string(),
            default_username: "admin".to_string(),
            device_type: DeviceType::CiscoXr,
            port: 22,
            connect_timeout: 10, // 秒
            read_timeout: 30,    // 秒
            show_commands: vec![
                "show ip interface brief".to_string(),
                "show version".to_string(),
                "show running-config".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AIConfig {
    pub system_prompt: String,
    pub timeout: u64,
    pub profiles: Vec<ModelProfile>,
}

impl Default for AIConfig {
    fn default() -> Self {
        Self {
            system_prompt: "You are a helpful assistant.".to_string(),
            timeout: 120,
            profiles: vec![
                ModelProfile {
                    id: "deepseek".to_string(),
                    title: "Azure Deepseek Chatbot".to_string(),
                    model: "DeepSeek-R1".to_string(),
                    endpoint: "https://DeepSeek-R1-cbngc.eastus.models.ai.azure.com".to_string(),
                    api_key: None,
                    api_key_env: Some("DEEPSEEK_API_KEY".to_string()),
                    max_tokens: 2048,
                    temperature: None,
                    top_p: None,
                    presence_penalty: None,
                    frequency_penalty: None,
                },
                ModelProfile {
                    id: "phi4".to_string(),
                    title: "Azure Microsoft phi-4 Chatbot".to_string(),
                    model: "Phi-4".to_string(),
                    endpoint: "https://Phi-4-jhzdm.eastus.models.ai.azure.com".to_string(),
                    api_key: None,
                    api_key_env: Some("PHI4_API_KEY".to_string()),
                    max_tokens: 2048,
                    temperature: Some(0.8),
                    top_p: Some(0.1),
                    presence_penalty: Some(0.0),
                    frequency_penalty: Some(0.0),
                },
            ],
        }
    }
}

/// 托管模型的固定调用参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub id: String,
    pub title: String,
    pub model: String,
    pub endpoint: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default)]
    pub presence_penalty: Option<f32>,
    #[serde(default)]
    pub frequency_penalty: Option<f32>,
}

impl ModelProfile {
    /// 配置文件中的密钥优先，其次读取环境变量
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| {
                self.api_key_env
                    .as_deref()
                    .and_then(|name| std::env::var(name).ok())
                    .filter(|key| !key.is_empty())
            })
    }
}

impl AIConfig {
    pub fn profile(&self, id: &str) -> Option<&ModelProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }
}

pub const CONFIG_PATH_ENV: &str = "ROUTER_CONSOLE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// 配置文件路径：环境变量优先
pub fn config_path() -> String {
    std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|path| !path.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

#[derive(Debug)]
pub struct ConfigManager {
    config: Arc<RwLock<Config>>,
    path: String,
}

impl ConfigManager {
    pub async fn new(path: &str) -> Result<Self> {
        let config = Self::load_config(path)?;
        Ok(ConfigManager {
            config: Arc::new(RwLock::new(config)),
            path: path.to_string(),
        })
    }

    fn load_config(path: &str) -> Result<Config> {
        let path = Path::new(path);
        if !path.exists() {
            warn!("配置文件 {} 不存在，使用默认配置", path.display());
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config = Self::parse(path, &content)?;
        info!("已加载配置文件: {}", path.display());
        Ok(config)
    }

    fn parse(path: &Path, content: &str) -> Result<Config> {
        let is_toml = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            toml::from_str(content)
                .with_context(|| format!("解析TOML配置失败: {}", path.display()))
        } else {
            serde_json::from_str(content)
                .with_context(|| format!("解析JSON配置失败: {}", path.display()))
        }
    }

    pub async fn get(&self) -> Config {
        self.config.read().await.clone()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// 重新读取配置文件；解析失败时保留当前配置
    pub async fn reload(&self) -> Result<()> {
        let config = Self::load_config(&self.path)?;
        let mut current = self.config.write().await;
        *current = config;
        Ok(())
    }
}
