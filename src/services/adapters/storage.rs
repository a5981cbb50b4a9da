//! 持久存储适配器
//!
//! 键值存储落在应用缓存目录下的单个 JSON 对象文件里。
//! 端口没有错误通道（对应 localStorage），写失败记日志后吞掉。

use crate::services::ports::storage::KeyValueStore;
use crate::workspace::WorkspaceConfig;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".vcode";
const STORE_FILE: &str = "storage.json";
const CONFIG_FILE: &str = "config.json";

/// 应用数据目录（缓存位置下的 .vcode）
pub fn get_app_dir() -> Option<PathBuf> {
    get_cache_dir().map(|dir| dir.join(APP_DIR))
}

pub fn get_storage_path() -> Option<PathBuf> {
    get_app_dir().map(|dir| dir.join(STORE_FILE))
}

pub fn get_config_path() -> Option<PathBuf> {
    get_app_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// 日志目录（应用数据目录下的 logs），不存在则创建
pub fn ensure_log_dir() -> io::Result<PathBuf> {
    let dir = get_app_dir()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "cannot determine log directory"))?
        .join("logs");
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

/// 配置文件不存在时写入默认值
pub fn ensure_config_file() -> io::Result<PathBuf> {
    let path = get_config_path().ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "cannot determine config directory")
    })?;
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    if !path.exists() {
        let content = serde_json::to_string_pretty(&WorkspaceConfig::default())
            .unwrap_or_else(|_| "{}".to_string());
        fs::write(&path, content)?;
    }
    Ok(path)
}

/// 读配置；文件缺失或损坏时回退默认值
pub fn load_config() -> WorkspaceConfig {
    match get_config_path() {
        Some(path) => load_config_from(&path),
        None => WorkspaceConfig::default(),
    }
}

fn load_config_from(path: &Path) -> WorkspaceConfig {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(_) => return WorkspaceConfig::default(),
    };
    match serde_json::from_str(&data) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "config file unreadable, using defaults");
            WorkspaceConfig::default()
        }
    }
}

/// 单 JSON 文件键值存储
///
/// 打开时整体读入，set 直写回文件。定不出存储目录时退化为纯内存。
pub struct JsonFileStore {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// 默认位置（应用缓存目录下 storage.json）
    pub fn open_default() -> Self {
        match get_storage_path() {
            Some(path) => Self::open(path),
            None => {
                tracing::warn!("no cache directory available, key-value store is memory-only");
                JsonFileStore {
                    path: None,
                    entries: BTreeMap::new(),
                }
            }
        }
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "storage file unreadable, starting empty");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        JsonFileStore {
            path: Some(path),
            entries,
        }
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let result = (|| -> io::Result<()> {
            if let Some(parent) = path.parent() {
                if !parent.exists() {
                    fs::create_dir_all(parent)?;
                }
            }
            let content = serde_json::to_string_pretty(&self.entries)
                .unwrap_or_else(|_| "{}".to_string());
            fs::write(path, content)
        })();
        if let Err(err) = result {
            tracing::warn!(path = %path.display(), error = %err, "storage write failed");
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
        self.persist();
    }
}

fn get_cache_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        cache_dir_macos()
    }

    #[cfg(target_os = "linux")]
    {
        cache_dir_linux()
    }

    #[cfg(target_os = "windows")]
    {
        cache_dir_windows()
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}

#[cfg(target_os = "macos")]
fn cache_dir_macos() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join("Library/Caches"))
}

#[cfg(target_os = "linux")]
fn cache_dir_linux() -> Option<PathBuf> {
    // 优先 XDG_CACHE_HOME，否则 ~/.cache
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        return Some(PathBuf::from(xdg));
    }
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".cache"))
}

#[cfg(target_os = "windows")]
fn cache_dir_windows() -> Option<PathBuf> {
    if let Ok(local) = std::env::var("LOCALAPPDATA") {
        return Some(PathBuf::from(local));
    }
    std::env::var("APPDATA").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_store_roundtrip_across_reopen() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("storage.json");

        let mut store = JsonFileStore::open(&path);
        assert_eq!(store.get("session"), None);
        store.set("session", "{\"openFiles\":[]}");
        store.set("rootToken", "/tmp/project");

        let store = JsonFileStore::open(&path);
        assert_eq!(store.get("session"), Some("{\"openFiles\":[]}".to_string()));
        assert_eq!(store.get("rootToken"), Some("/tmp/project".to_string()));
    }

    #[test]
    fn test_store_tolerates_corrupt_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("storage.json");
        fs::write(&path, "not json at all").unwrap();

        let mut store = JsonFileStore::open(&path);
        assert_eq!(store.get("k"), None);
        store.set("k", "v");
        assert_eq!(JsonFileStore::open(&path).get("k"), Some("v".to_string()));
    }

    #[test]
    fn test_config_defaults_when_missing_or_corrupt() {
        let tmp = tempdir().unwrap();

        let config = load_config_from(&tmp.path().join("missing.json"));
        assert_eq!(config.snapshot_debounce_ms, 500);
        assert_eq!(config.notify_duration_ms, 3000);
        assert!(config.filter_junk_names);

        let corrupt = tmp.path().join("bad.json");
        fs::write(&corrupt, "{{{{").unwrap();
        let config = load_config_from(&corrupt);
        assert_eq!(config.snapshot_debounce_ms, 500);
    }

    #[test]
    fn test_config_partial_file_fills_defaults() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, "{\"snapshot_debounce_ms\": 50}").unwrap();

        let config = load_config_from(&path);
        assert_eq!(config.snapshot_debounce_ms, 50);
        assert_eq!(config.notify_duration_ms, 3000);
    }
}
