//! 通知端口

/// 默认通知停留时长（毫秒）
pub const DEFAULT_NOTIFY_MS: u64 = 3000;

/// 宿主通知面。只承载成功提示；失败以错误返回给调用方呈现。
pub trait NotificationSink {
    fn notify(&mut self, message: &str, duration_ms: u64);
}

/// 丢弃一切通知的空实现
pub struct NullNotifier;

impl NotificationSink for NullNotifier {
    fn notify(&mut self, _message: &str, _duration_ms: u64) {}
}
