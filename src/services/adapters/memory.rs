//! 内存文件树适配器
//!
//! 行为完全可控的能力实现：支持吊销、注入写失败、统计枚举次数，
//! 供模型层测试与无持久化宿主嵌入使用。

use crate::services::ports::fs::{
    CapabilityBroker, DirEntry, DirHandleRef, DirectoryHandle, FileHandle, FileHandleRef, FsError,
    Handle, Result, RootGrant,
};
use crate::services::ports::storage::KeyValueStore;
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct MemFileState {
    content: String,
    revoked: bool,
    fail_next_write: bool,
}

pub struct MemFile {
    name: String,
    state: Mutex<MemFileState>,
}

impl MemFile {
    pub fn new(name: &str, content: &str) -> Arc<Self> {
        Arc::new(MemFile {
            name: name.to_string(),
            state: Mutex::new(MemFileState {
                content: content.to_string(),
                ..MemFileState::default()
            }),
        })
    }

    /// 吊销此句柄，后续读写返回 PermissionDenied
    pub fn revoke(&self) {
        lock(&self.state).revoked = true;
    }

    /// 让下一次写入失败一次
    pub fn fail_next_write(&self) {
        lock(&self.state).fail_next_write = true;
    }
}

impl FileHandle for MemFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> Result<String> {
        let state = lock(&self.state);
        if state.revoked {
            return Err(FsError::PermissionDenied(self.name.clone()));
        }
        Ok(state.content.clone())
    }

    fn write(&self, content: &str) -> Result<()> {
        let mut state = lock(&self.state);
        if state.revoked {
            return Err(FsError::PermissionDenied(self.name.clone()));
        }
        if state.fail_next_write {
            state.fail_next_write = false;
            return Err(FsError::Io(io::Error::new(
                io::ErrorKind::Other,
                "injected write failure",
            )));
        }
        state.content = content.to_string();
        Ok(())
    }
}

#[derive(Clone)]
enum MemEntry {
    File(Arc<MemFile>),
    Dir(Arc<MemDir>),
}

impl MemEntry {
    fn handle(&self) -> Handle {
        match self {
            MemEntry::File(file) => Handle::File(file.clone()),
            MemEntry::Dir(dir) => Handle::Dir(dir.clone()),
        }
    }
}

#[derive(Default)]
struct MemDirState {
    children: Vec<(String, MemEntry)>,
    revoked: bool,
    enumerations: usize,
}

pub struct MemDir {
    name: String,
    state: Mutex<MemDirState>,
}

impl MemDir {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(MemDir {
            name: name.to_string(),
            state: Mutex::new(MemDirState::default()),
        })
    }

    /// 测试播种：直接挂一个文件，不走冲突检查
    pub fn add_file(&self, name: &str, content: &str) -> Arc<MemFile> {
        let file = MemFile::new(name, content);
        lock(&self.state)
            .children
            .push((name.to_string(), MemEntry::File(file.clone())));
        file
    }

    /// 测试播种：直接挂一个子目录
    pub fn add_dir(&self, name: &str) -> Arc<MemDir> {
        let dir = MemDir::new(name);
        lock(&self.state)
            .children
            .push((name.to_string(), MemEntry::Dir(dir.clone())));
        dir
    }

    pub fn revoke(&self) {
        lock(&self.state).revoked = true;
    }

    /// 累计被枚举的次数，供展开复用断言使用
    pub fn enumeration_count(&self) -> usize {
        lock(&self.state).enumerations
    }

    pub fn child_names(&self) -> Vec<String> {
        lock(&self.state)
            .children
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// 测试观察：按名取文件
    pub fn get_file(&self, name: &str) -> Option<Arc<MemFile>> {
        match self.find(name) {
            Some(MemEntry::File(file)) => Some(file),
            _ => None,
        }
    }

    /// 测试观察：按名取子目录
    pub fn get_dir(&self, name: &str) -> Option<Arc<MemDir>> {
        match self.find(name) {
            Some(MemEntry::Dir(dir)) => Some(dir),
            _ => None,
        }
    }

    fn find(&self, name: &str) -> Option<MemEntry> {
        lock(&self.state)
            .children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, e)| e.clone())
    }
}

impl DirectoryHandle for MemDir {
    fn name(&self) -> &str {
        &self.name
    }

    fn entries(&self) -> Result<Vec<DirEntry>> {
        let mut state = lock(&self.state);
        if state.revoked {
            return Err(FsError::PermissionDenied(self.name.clone()));
        }
        state.enumerations += 1;
        Ok(state
            .children
            .iter()
            .map(|(name, entry)| DirEntry {
                name: name.clone(),
                handle: entry.handle(),
            })
            .collect())
    }

    fn open_dir(&self, name: &str) -> Result<DirHandleRef> {
        if lock(&self.state).revoked {
            return Err(FsError::PermissionDenied(self.name.clone()));
        }
        match self.find(name) {
            Some(MemEntry::Dir(dir)) => Ok(dir),
            Some(MemEntry::File(_)) => {
                Err(FsError::NotFound(format!("{} is not a directory", name)))
            }
            None => Err(FsError::NotFound(name.to_string())),
        }
    }

    fn create_file(&self, name: &str) -> Result<FileHandleRef> {
        let mut state = lock(&self.state);
        if state.revoked {
            return Err(FsError::PermissionDenied(self.name.clone()));
        }
        if state.children.iter().any(|(n, _)| n == name) {
            return Err(FsError::NameConflict(name.to_string()));
        }
        let file = MemFile::new(name, "");
        state
            .children
            .push((name.to_string(), MemEntry::File(file.clone())));
        Ok(file)
    }

    fn create_dir(&self, name: &str) -> Result<DirHandleRef> {
        let mut state = lock(&self.state);
        if state.revoked {
            return Err(FsError::PermissionDenied(self.name.clone()));
        }
        if state.children.iter().any(|(n, _)| n == name) {
            return Err(FsError::NameConflict(name.to_string()));
        }
        let dir = MemDir::new(name);
        state
            .children
            .push((name.to_string(), MemEntry::Dir(dir.clone())));
        Ok(dir)
    }

    fn remove(&self, name: &str, recursive: bool) -> Result<()> {
        let mut state = lock(&self.state);
        if state.revoked {
            return Err(FsError::PermissionDenied(self.name.clone()));
        }
        let idx = state
            .children
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;
        if let (_, MemEntry::Dir(dir)) = &state.children[idx] {
            if !recursive && !lock(&dir.state).children.is_empty() {
                return Err(FsError::Io(io::Error::new(
                    io::ErrorKind::Other,
                    "directory not empty",
                )));
            }
        }
        state.children.remove(idx);
        Ok(())
    }
}

/// 内存授权代理：令牌在 register 时登记，可切换为拒绝一切恢复
#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<Mutex<BrokerState>>,
}

#[derive(Default)]
struct BrokerState {
    roots: HashMap<String, DirHandleRef>,
    deny: bool,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, token: &str, handle: DirHandleRef) {
        lock(&self.inner).roots.insert(token.to_string(), handle);
    }

    pub fn set_deny(&self, deny: bool) {
        lock(&self.inner).deny = deny;
    }
}

impl CapabilityBroker for MemoryBroker {
    fn restore_folder(&self, token: &str) -> Result<RootGrant> {
        let state = lock(&self.inner);
        if state.deny {
            return Err(FsError::PermissionDenied("folder access declined".into()));
        }
        state
            .roots
            .get(token)
            .cloned()
            .map(|handle| RootGrant {
                token: token.to_string(),
                handle,
            })
            .ok_or_else(|| FsError::NotFound(token.to_string()))
    }
}

/// 进程内键值存储。克隆共享同一份数据，测试里留一个克隆即可观察写入。
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreState>>,
}

#[derive(Default)]
struct StoreState {
    entries: HashMap<String, String>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 累计写入次数，供去抖断言使用
    pub fn write_count(&self) -> usize {
        lock(&self.inner).writes
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.inner).entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        let mut state = lock(&self.inner);
        state.entries.insert(key.to_string(), value.to_string());
        state.writes += 1;
    }
}
