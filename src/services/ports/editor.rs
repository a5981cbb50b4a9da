//! 编辑器面端口
//!
//! 模型不渲染编辑器，只向宿主的编辑面推送文本与语言提示。
//! 就绪状态是电平而非事件：恢复会话时反复查询，不依赖宿主回调。

use crate::models::path::VirtualPath;

/// 宿主编辑面（如 Monaco、TUI 缓冲区）
pub trait EditingSurface {
    /// 编辑面是否已可接收内容
    fn is_ready(&self) -> bool;
    /// 当前编辑面上的全文
    fn text(&self) -> String;
    fn set_text(&mut self, text: &str);
    fn set_language_hint(&mut self, language: &str);
}

/// 关闭含未保存改动的文件时宿主的选择
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    /// 先保存再关闭；保存失败则放弃关闭
    Save,
    /// 丢弃脏标记后关闭，内容保留在内容存储中
    Discard,
    /// 取消，一切不变
    Cancel,
}

/// 保存确认对话。模型唯一允许阻塞等待宿主的地方。
pub trait SavePrompt {
    fn confirm_close(&mut self, path: &VirtualPath) -> CloseDecision;
}
