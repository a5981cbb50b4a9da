//! 服务层：端口与适配器
//!
//! 端口描述模型对宿主环境的全部要求：
//! - fs: 能力句柄形态的文件访问与授权代理
//! - editor: 编辑面与关闭询问
//! - notify: 通知投递
//! - storage: 持久键值存储
//!
//! 适配器给出本地磁盘、内存测试替身与 JSON 文件存储的实现。

pub mod adapters;
pub mod ports;

pub use ports::{
    CapabilityBroker, CloseDecision, DirEntry, DirHandleRef, DirectoryHandle, EditingSurface,
    FileHandle, FileHandleRef, FsError, Handle, KeyValueStore, NotificationSink, NullNotifier,
    RootGrant, SavePrompt,
};
