// 路由器运维控制台库
// 设备抓取/配置与托管模型问答的公共接口

pub mod api;
pub mod ai;
pub mod commands;
pub mod config;
pub mod device;
pub mod models;
pub mod ssh;

// 重新导出常用类型
pub use models::*;
pub use config::ConfigManager;
pub use api::AppState;

// 版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
