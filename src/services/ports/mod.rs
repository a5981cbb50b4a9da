//! 端口层：模型消费的宿主能力抽象

pub mod editor;
pub mod fs;
pub mod notify;
pub mod storage;

pub use editor::{CloseDecision, EditingSurface, SavePrompt};
pub use fs::{
    CapabilityBroker, DirEntry, DirHandleRef, DirectoryHandle, FileHandle, FileHandleRef, FsError,
    Handle, Result, RootGrant,
};
pub use notify::{NotificationSink, NullNotifier, DEFAULT_NOTIFY_MS};
pub use storage::{KeyValueStore, ROOT_TOKEN_KEY, SNAPSHOT_KEY};
