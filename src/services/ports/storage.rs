//! 持久键值存储端口
//!
//! 对应浏览器 localStorage 一类的客户端存储：无错误通道，写失败由适配器
//! 记日志吞掉，模型不感知。

/// 会话快照的存储键
pub const SNAPSHOT_KEY: &str = "session";
/// 根目录授权令牌的存储键
pub const ROOT_TOKEN_KEY: &str = "rootToken";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}
