// 设备操作：抓取输出与下发配置
// 每台主机独立建立会话，调用结束即关闭，不做连接复用

use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::commands::{split_config_lines, split_hosts};
use crate::models::{ConnectionParams, HostOutput};

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("连接失败: {0}")]
    ConnectionFailed(String),
    #[error("认证失败: 用户名或密码错误")]
    AuthenticationFailed,
    #[error("通道创建失败: {0}")]
    ChannelCreationFailed(String),
    #[error("网络超时: 无法连接到 {host}:{port}")]
    NetworkTimeout { host: String, port: u16 },
    #[error("握手失败: SSH协议握手失败")]
    HandshakeFailed,
    #[error("等待设备提示符超时: {0}")]
    PromptTimeout(String),
    #[error("进入特权模式失败: {0}")]
    EnableFailed(String),
    #[error("后台任务异常: {0}")]
    TaskFailed(String),
    #[error("IO错误: {0}")]
    IoError(#[from] std::io::Error),
}

/// 已登录设备上的一个CLI会话
pub trait DeviceSession: Send {
    /// 执行一条命令，返回去掉回显与提示符后的输出
    fn send_command(&mut self, command: &str) -> Result<String, DeviceError>;

    fn enable(&mut self) -> Result<(), DeviceError>;

    fn send_config_set(&mut self, lines: &[String]) -> Result<String, DeviceError>;

    /// 按设备类型保存或提交配置
    fn save_config(&mut self) -> Result<String, DeviceError>;

    fn disconnect(&mut self) -> Result<(), DeviceError>;
}

pub trait Connector: Send + Sync {
    fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn DeviceSession>, DeviceError>;
}

/// 在单台设备上依次执行只读命令
pub fn fetch_outputs(
    connector: &dyn Connector,
    params: &ConnectionParams,
    commands: &[String],
) -> Result<String, DeviceError> {
    let mut session = connector.connect(params)?;

    let mut output = String::new();
    for cmd in commands {
        output.push_str(&format!("*****{} ********\n", cmd));
        output.push_str(&session.send_command(cmd)?);
        output.push('\n');
    }

    close_quietly(session.as_mut(), params);
    Ok(output)
}

/// 进入特权模式，下发配置块并保存
pub fn configure_device(
    connector: &dyn Connector,
    params: &ConnectionParams,
    lines: &[String],
) -> Result<String, DeviceError> {
    let mut session = connector.connect(params)?;
    session.enable()?;

    let mut output = session.send_config_set(lines)?;
    output.push_str(&session.save_config()?);

    close_quietly(session.as_mut(), params);
    Ok(output)
}

// 设备在 exit 后通常会主动断开，关闭失败不影响已取得的结果
fn close_quietly(session: &mut dyn DeviceSession, params: &ConnectionParams) {
    if let Err(e) = session.disconnect() {
        warn!("关闭会话失败: 主机={}, 错误={}", params.host, e);
    }
}

/// 与 `ConnectionParams` 相同，但主机字段留空，由主机列表逐一填充
#[derive(Debug, Clone)]
pub struct Credentials(pub ConnectionParams);

impl Credentials {
    fn for_host(&self, host: &str) -> ConnectionParams {
        ConnectionParams {
            host: host.to_string(),
            ..self.0.clone()
        }
    }
}

/// 按主机顺序执行抓取，单台失败不影响其他主机
pub async fn fetch(
    connector: Arc<dyn Connector>,
    hosts: &str,
    credentials: &Credentials,
    commands: Vec<String>,
) -> Vec<HostOutput> {
    let commands = Arc::new(commands);
    let mut results = Vec::new();

    for host in split_hosts(hosts) {
        let params = credentials.for_host(&host);
        let connector = connector.clone();
        let commands = commands.clone();
        info!("抓取输出: 主机={}, 命令数={}", host, commands.len());

        let result = run_blocking(move || fetch_outputs(connector.as_ref(), &params, &commands)).await;
        results.push(render(host, result));
    }

    results
}

/// 按主机顺序下发配置
pub async fn configure(
    connector: Arc<dyn Connector>,
    hosts: &str,
    credentials: &Credentials,
    config_block: &str,
) -> Vec<HostOutput> {
    let lines = Arc::new(split_config_lines(config_block));
    let mut results = Vec::new();

    for host in split_hosts(hosts) {
        let params = credentials.for_host(&host);
        let connector = connector.clone();
        let lines = lines.clone();
        info!("下发配置: 主机={}, 行数={}", host, lines.len());

        let result = run_blocking(move || configure_device(connector.as_ref(), &params, &lines)).await;
        results.push(render(host, result));
    }

    results
}

// ssh2 为阻塞接口，放到阻塞线程池执行
async fn run_blocking<F>(task: F) -> Result<String, DeviceError>
where
    F: FnOnce() -> Result<String, DeviceError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| DeviceError::TaskFailed(e.to_string()))?
}

fn render(host: String, result: Result<String, DeviceError>) -> HostOutput {
    match result {
        Ok(output) => HostOutput { host, output, ok: true },
        Err(e) => {
            error!("设备操作失败: 主机={}, 错误={}", host, e);
            HostOutput { host, output: e.to_string(), ok: false }
        }
    }
}
