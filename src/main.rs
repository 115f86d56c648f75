use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use router_console::ai::{AzureInferenceClient, ChatSessions};
use router_console::api::{self, AppState};
use router_console::config::{self, Config, ConfigManager};
use router_console::ssh::SshConnector;
use router_console::{NAME, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = config::config_path();

    // 日志初始化之前的配置加载只能通过返回值报告错误
    let config_manager = ConfigManager::new(&path).await?;
    let config = config_manager.get().await;
    init_tracing(&config);

    info!("{} v{} 启动，配置文件: {}", NAME, VERSION, path);

    let connector = SshConnector::new(
        Duration::from_secs(config.device.connect_timeout),
        Duration::from_secs(config.device.read_timeout),
    );
    let backend = AzureInferenceClient::new(Duration::from_secs(config.ai.timeout))
        .context("创建HTTP客户端失败")?;
    let chats = ChatSessions::new(Arc::new(backend), config.ai.system_prompt.clone());

    let addr: SocketAddr = format!("{}:{}", config.server.address, config.server.port)
        .parse()
        .with_context(|| format!("无效的监听地址: {}:{}", config.server.address, config.server.port))?;

    let state = AppState {
        config: Arc::new(config_manager),
        connector: Arc::new(connector),
        chats: Arc::new(chats),
    };

    info!("Server starting on {}", addr);
    // 静态目录在启动时确定，重新加载配置不影响
    warp::serve(api::routes(state, &config.server.static_dir)).run(addr).await;
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.server.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
