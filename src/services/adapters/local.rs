//! 本地磁盘适配器
//!
//! 用 std::fs 实现能力句柄，令牌即目录的绝对路径。
//! 每个浮现条目对应一个 Arc 分配，身份在句柄缓存生命周期内稳定。

use crate::services::ports::fs::{
    CapabilityBroker, DirEntry, DirHandleRef, DirectoryHandle, FileHandle, FileHandleRef, FsError,
    Result, RootGrant,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct LocalFileHandle {
    name: String,
    path: PathBuf,
}

impl FileHandle for LocalFileHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> Result<String> {
        if !self.path.exists() {
            return Err(FsError::NotFound(self.path.display().to_string()));
        }
        Ok(fs::read_to_string(&self.path)?)
    }

    fn write(&self, content: &str) -> Result<()> {
        let mut file = fs::File::create(&self.path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

pub struct LocalDirHandle {
    name: String,
    path: PathBuf,
}

impl LocalDirHandle {
    fn child(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl DirectoryHandle for LocalDirHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn entries(&self) -> Result<Vec<DirEntry>> {
        if !self.path.is_dir() {
            return Err(FsError::NotFound(self.path.display().to_string()));
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            // 符号链接与特殊文件不浮现
            if file_type.is_dir() {
                entries.push(DirEntry::dir(dir_handle(entry.path())));
            } else if file_type.is_file() {
                entries.push(DirEntry::file(file_handle(entry.path())));
            }
        }
        Ok(entries)
    }

    fn open_dir(&self, name: &str) -> Result<DirHandleRef> {
        let path = self.child(name);
        if !path.is_dir() {
            return Err(FsError::NotFound(path.display().to_string()));
        }
        Ok(dir_handle(path))
    }

    fn create_file(&self, name: &str) -> Result<FileHandleRef> {
        let path = self.child(name);
        if path.exists() {
            return Err(FsError::NameConflict(name.to_string()));
        }
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        Ok(file_handle(path))
    }

    fn create_dir(&self, name: &str) -> Result<DirHandleRef> {
        let path = self.child(name);
        if path.exists() {
            return Err(FsError::NameConflict(name.to_string()));
        }
        fs::create_dir(&path)?;
        Ok(dir_handle(path))
    }

    fn remove(&self, name: &str, recursive: bool) -> Result<()> {
        let path = self.child(name);
        if !path.exists() {
            return Err(FsError::NotFound(path.display().to_string()));
        }
        if path.is_dir() {
            if recursive {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_dir(&path)?;
            }
        } else {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn file_handle(path: PathBuf) -> FileHandleRef {
    Arc::new(LocalFileHandle {
        name: name_of(&path),
        path,
    })
}

fn dir_handle(path: PathBuf) -> DirHandleRef {
    Arc::new(LocalDirHandle {
        name: name_of(&path),
        path,
    })
}

/// 本地磁盘的授权代理
#[derive(Default)]
pub struct LocalBroker;

impl LocalBroker {
    pub fn new() -> Self {
        Self
    }

    /// 首次授权一个目录；令牌为其规范化绝对路径
    pub fn grant_folder(&self, path: impl AsRef<Path>) -> Result<RootGrant> {
        let canonical = path.as_ref().canonicalize()?;
        if !canonical.is_dir() {
            return Err(FsError::NotFound(format!(
                "{} is not a directory",
                canonical.display()
            )));
        }
        Ok(RootGrant {
            token: canonical.to_string_lossy().to_string(),
            handle: dir_handle(canonical),
        })
    }
}

impl CapabilityBroker for LocalBroker {
    fn restore_folder(&self, token: &str) -> Result<RootGrant> {
        self.grant_folder(Path::new(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn root_of(dir: &Path) -> DirHandleRef {
        dir_handle(dir.to_path_buf())
    }

    #[test]
    fn test_entries_lists_files_and_dirs() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), "aaa").unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();

        let root = root_of(tmp.path());
        let entries = root.entries().unwrap();
        assert_eq!(entries.len(), 2);
        let a = entries.iter().find(|e| e.name == "a.txt").unwrap();
        assert!(!a.handle.is_dir());
        let sub = entries.iter().find(|e| e.name == "sub").unwrap();
        assert!(sub.handle.is_dir());
    }

    #[test]
    fn test_read_write_roundtrip() {
        let tmp = tempdir().unwrap();
        let root = root_of(tmp.path());

        let file = root.create_file("note.txt").unwrap();
        file.write("hello world").unwrap();
        assert_eq!(file.read().unwrap(), "hello world");
        assert_eq!(
            fs::read_to_string(tmp.path().join("note.txt")).unwrap(),
            "hello world"
        );
    }

    #[test]
    fn test_create_is_exclusive() {
        let tmp = tempdir().unwrap();
        let root = root_of(tmp.path());

        root.create_file("a.txt").unwrap();
        assert!(matches!(
            root.create_file("a.txt"),
            Err(FsError::NameConflict(_))
        ));
        root.create_dir("sub").unwrap();
        assert!(matches!(
            root.create_dir("sub"),
            Err(FsError::NameConflict(_))
        ));
        // 文件与目录同名也算冲突
        assert!(matches!(
            root.create_dir("a.txt"),
            Err(FsError::NameConflict(_))
        ));
    }

    #[test]
    fn test_open_dir_not_found() {
        let tmp = tempdir().unwrap();
        let root = root_of(tmp.path());
        assert!(matches!(root.open_dir("missing"), Err(FsError::NotFound(_))));

        fs::write(tmp.path().join("f.txt"), "").unwrap();
        assert!(matches!(root.open_dir("f.txt"), Err(FsError::NotFound(_))));
    }

    #[test]
    fn test_remove_file_and_recursive_dir() {
        let tmp = tempdir().unwrap();
        let root = root_of(tmp.path());

        fs::write(tmp.path().join("a.txt"), "x").unwrap();
        root.remove("a.txt", false).unwrap();
        assert!(!tmp.path().join("a.txt").exists());

        fs::create_dir_all(tmp.path().join("sub/inner")).unwrap();
        fs::write(tmp.path().join("sub/inner/f.txt"), "x").unwrap();
        root.remove("sub", true).unwrap();
        assert!(!tmp.path().join("sub").exists());

        assert!(matches!(root.remove("gone", false), Err(FsError::NotFound(_))));
    }

    #[test]
    fn test_read_after_external_delete() {
        let tmp = tempdir().unwrap();
        let root = root_of(tmp.path());
        let file = root.create_file("a.txt").unwrap();
        fs::remove_file(tmp.path().join("a.txt")).unwrap();
        assert!(matches!(file.read(), Err(FsError::NotFound(_))));
    }

    #[test]
    fn test_broker_token_roundtrip() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), "aaa").unwrap();

        let broker = LocalBroker::new();
        let grant = broker.grant_folder(tmp.path()).unwrap();
        let restored = broker.restore_folder(&grant.token).unwrap();

        assert_eq!(restored.token, grant.token);
        let names: Vec<_> = restored
            .handle
            .entries()
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a.txt"]);
    }

    #[test]
    fn test_broker_restore_missing_fails() {
        let broker = LocalBroker::new();
        assert!(matches!(
            broker.restore_folder("/definitely/not/here"),
            Err(FsError::NotFound(_))
        ));
    }
}
