//! 文件能力端口
//!
//! 文件系统只能通过用户授权得到的不透明句柄访问，模型内部没有环境权限。
//! 句柄 API 不提供父指针，反查路径只能按身份（同一 Arc 分配）比较。

use crate::models::tree::TreeError;
use std::fmt;
use std::io;
use std::sync::Arc;

pub type Result<T> = std::result::Result<T, FsError>;

#[derive(Debug)]
pub enum FsError {
    /// 授权被拒绝或已吊销
    PermissionDenied(String),
    /// 创建/改名/移动与既有同级名冲突
    NameConflict(String),
    /// 路径没有句柄缓存或内容存储条目，或条目已消失
    NotFound(String),
    /// 底层存储故障
    Io(io::Error),
    /// 环境缺少能力 API，或操作超出能力面
    Unsupported(String),
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::PermissionDenied(what) => write!(f, "permission denied: {}", what),
            FsError::NameConflict(name) => write!(f, "name already exists: {}", name),
            FsError::NotFound(path) => write!(f, "no such entry: {}", path),
            FsError::Io(err) => write!(f, "io error: {}", err),
            FsError::Unsupported(what) => write!(f, "unsupported operation: {}", what),
        }
    }
}

impl std::error::Error for FsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FsError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for FsError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => FsError::NotFound(err.to_string()),
            io::ErrorKind::PermissionDenied => FsError::PermissionDenied(err.to_string()),
            io::ErrorKind::AlreadyExists => FsError::NameConflict(err.to_string()),
            _ => FsError::Io(err),
        }
    }
}

impl From<TreeError> for FsError {
    fn from(err: TreeError) -> Self {
        let message = err.to_string();
        match err {
            TreeError::NameExists => FsError::NameConflict(message),
            TreeError::MoveIntoDescendant => FsError::Unsupported(message),
            TreeError::ParentNotDirectory | TreeError::InvalidNodeId => FsError::NotFound(message),
        }
    }
}

/// 文件句柄。文本整读整写，二进制内容不在范围内。
pub trait FileHandle {
    fn name(&self) -> &str;
    fn read(&self) -> Result<String>;
    fn write(&self, content: &str) -> Result<()>;
}

/// 目录句柄。`entries` 只展开一层；`create_*` 对已存在的名字返回 NameConflict。
pub trait DirectoryHandle {
    fn name(&self) -> &str;
    fn entries(&self) -> Result<Vec<DirEntry>>;
    fn open_dir(&self, name: &str) -> Result<DirHandleRef>;
    fn create_file(&self, name: &str) -> Result<FileHandleRef>;
    fn create_dir(&self, name: &str) -> Result<DirHandleRef>;
    fn remove(&self, name: &str, recursive: bool) -> Result<()>;
}

pub type FileHandleRef = Arc<dyn FileHandle>;
pub type DirHandleRef = Arc<dyn DirectoryHandle>;

/// 文件或目录句柄的统一包装
#[derive(Clone)]
pub enum Handle {
    File(FileHandleRef),
    Dir(DirHandleRef),
}

impl Handle {
    pub fn name(&self) -> &str {
        match self {
            Handle::File(h) => h.name(),
            Handle::Dir(h) => h.name(),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Handle::Dir(_))
    }

    pub fn as_file(&self) -> Option<&FileHandleRef> {
        match self {
            Handle::File(h) => Some(h),
            Handle::Dir(_) => None,
        }
    }

    pub fn as_dir(&self) -> Option<&DirHandleRef> {
        match self {
            Handle::Dir(h) => Some(h),
            Handle::File(_) => None,
        }
    }

    /// 身份比较：指向同一分配才算同一句柄
    pub fn same(&self, other: &Handle) -> bool {
        match (self, other) {
            (Handle::File(a), Handle::File(b)) => Arc::ptr_eq(a, b),
            (Handle::Dir(a), Handle::Dir(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handle::File(h) => write!(f, "Handle::File({})", h.name()),
            Handle::Dir(h) => write!(f, "Handle::Dir({})", h.name()),
        }
    }
}

/// 一层枚举得到的子条目
#[derive(Clone, Debug)]
pub struct DirEntry {
    pub name: String,
    pub handle: Handle,
}

impl DirEntry {
    pub fn file(handle: FileHandleRef) -> Self {
        DirEntry {
            name: handle.name().to_string(),
            handle: Handle::File(handle),
        }
    }

    pub fn dir(handle: DirHandleRef) -> Self {
        DirEntry {
            name: handle.name().to_string(),
            handle: Handle::Dir(handle),
        }
    }
}

/// 一次根目录授权。令牌可持久化，句柄仅本次会话有效。
#[derive(Clone)]
pub struct RootGrant {
    pub token: String,
    pub handle: DirHandleRef,
}

impl fmt::Debug for RootGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootGrant")
            .field("token", &self.token)
            .field("handle", &self.handle.name())
            .finish()
    }
}

/// 由持久化令牌重新取得根目录授权
pub trait CapabilityBroker {
    fn restore_folder(&self, token: &str) -> Result<RootGrant>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DummyFile {
        name: String,
    }

    impl FileHandle for DummyFile {
        fn name(&self) -> &str {
            &self.name
        }

        fn read(&self) -> Result<String> {
            Ok(String::new())
        }

        fn write(&self, _content: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_io_error_kind_mapping() {
        let err: FsError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, FsError::NotFound(_)));
        let err: FsError = io::Error::new(io::ErrorKind::PermissionDenied, "nope").into();
        assert!(matches!(err, FsError::PermissionDenied(_)));
        let err: FsError = io::Error::new(io::ErrorKind::AlreadyExists, "dup").into();
        assert!(matches!(err, FsError::NameConflict(_)));
        let err: FsError = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert!(matches!(err, FsError::Io(_)));
    }

    #[test]
    fn test_handle_identity() {
        let a: FileHandleRef = Arc::new(DummyFile {
            name: "a.txt".into(),
        });
        let also_a = Handle::File(Arc::clone(&a));
        let a = Handle::File(a);
        let b = Handle::File(Arc::new(DummyFile {
            name: "a.txt".into(),
        }));

        assert!(a.same(&also_a));
        assert!(!a.same(&b), "equal names are not the same handle");
    }

    #[test]
    fn test_error_display() {
        let err = FsError::NameConflict("a.txt".into());
        assert_eq!(err.to_string(), "name already exists: a.txt");
        let err = FsError::Unsupported("no capability broker".into());
        assert_eq!(err.to_string(), "unsupported operation: no capability broker");
    }
}
