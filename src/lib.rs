//! vcode - 代码编辑器外壳的工作区文件模型
//!
//! 模块结构：
//! - models: 数据模型（VirtualPath, WorkspaceTree, LanguageId）
//! - services: 端口与适配器（文件能力、编辑面、通知、键值存储）
//! - workspace: 工作区门面（文件操作、目录懒加载、会话持久化）
//! - logging: 滚动文件日志装配
//!
//! 宿主实现 services::ports 里的编辑面与询问端口，经授权代理拿根目录
//! 句柄后一切文件操作走 workspace::Workspace；空闲时周期调用
//! Workspace::tick 驱动去抖会话快照与恢复激活。

pub mod logging;
pub mod models;
pub mod services;
pub mod workspace;
