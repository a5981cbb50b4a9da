//! 环境适配器

pub mod local;
pub mod memory;
pub mod storage;

pub use local::{LocalBroker, LocalDirHandle, LocalFileHandle};
pub use memory::{MemDir, MemFile, MemoryBroker, MemoryStore};
pub use storage::{ensure_config_file, load_config, JsonFileStore};
