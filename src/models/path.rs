//! 虚拟路径模型
//!
//! 工作区内部以 `/` 分隔、相对授权根目录的路径。空路径表示根目录本身。
//! 路径段来自能力句柄的枚举结果或宿主校验过的输入，不做 `.`/`..` 归一化。

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualPath(String);

impl VirtualPath {
    /// 根目录（空路径）
    pub fn root() -> Self {
        VirtualPath(String::new())
    }

    pub fn new(path: impl Into<String>) -> Self {
        VirtualPath(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// 追加一个名字段
    pub fn join(&self, name: &str) -> VirtualPath {
        if self.0.is_empty() {
            VirtualPath(name.to_string())
        } else {
            VirtualPath(format!("{}/{}", self.0, name))
        }
    }

    /// 最后一段名；根目录为空串
    pub fn base_name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// 父路径；顶层条目的父路径为根，根的父路径仍为根
    pub fn parent(&self) -> VirtualPath {
        match self.0.rfind('/') {
            Some(idx) => VirtualPath(self.0[..idx].to_string()),
            None => VirtualPath::root(),
        }
    }

    /// 等于 prefix 或位于其子树内。按段对齐：`a/bc` 不是 `a/b` 的后代。
    pub fn starts_with(&self, prefix: &VirtualPath) -> bool {
        if prefix.0.is_empty() || self.0 == prefix.0 {
            return true;
        }
        self.0.len() > prefix.0.len()
            && self.0.starts_with(prefix.0.as_str())
            && self.0.as_bytes()[prefix.0.len()] == b'/'
    }

    /// 把 from 子树内的路径改挂到 to 下；不在 from 内时返回 None
    pub fn rebase(&self, from: &VirtualPath, to: &VirtualPath) -> Option<VirtualPath> {
        if !self.starts_with(from) {
            return None;
        }
        if self.0 == from.0 {
            return Some(to.clone());
        }
        let rest = if from.0.is_empty() {
            self.0.as_str()
        } else {
            &self.0[from.0.len() + 1..]
        };
        if to.0.is_empty() {
            Some(VirtualPath(rest.to_string()))
        } else {
            Some(VirtualPath(format!("{}/{}", to.0, rest)))
        }
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VirtualPath {
    fn from(s: &str) -> Self {
        VirtualPath(s.to_string())
    }
}

impl From<String> for VirtualPath {
    fn from(s: String) -> Self {
        VirtualPath(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_and_base_name() {
        let root = VirtualPath::root();
        let src = root.join("src");
        assert_eq!(src.as_str(), "src");
        let main = src.join("main.js");
        assert_eq!(main.as_str(), "src/main.js");
        assert_eq!(main.base_name(), "main.js");
        assert_eq!(src.base_name(), "src");
        assert_eq!(root.base_name(), "");
    }

    #[test]
    fn test_parent() {
        let p = VirtualPath::new("a/b/c.txt");
        assert_eq!(p.parent().as_str(), "a/b");
        assert_eq!(VirtualPath::new("top.txt").parent(), VirtualPath::root());
        assert_eq!(VirtualPath::root().parent(), VirtualPath::root());
    }

    #[test]
    fn test_starts_with_segment_boundary() {
        let base = VirtualPath::new("a/b");
        assert!(VirtualPath::new("a/b").starts_with(&base));
        assert!(VirtualPath::new("a/b/c").starts_with(&base));
        assert!(!VirtualPath::new("a/bc").starts_with(&base));
        assert!(!VirtualPath::new("a").starts_with(&base));
        assert!(VirtualPath::new("anything").starts_with(&VirtualPath::root()));
    }

    #[test]
    fn test_rebase() {
        let from = VirtualPath::new("a/b");
        let to = VirtualPath::new("a/x");
        assert_eq!(
            VirtualPath::new("a/b/c/d.txt").rebase(&from, &to),
            Some(VirtualPath::new("a/x/c/d.txt"))
        );
        assert_eq!(
            VirtualPath::new("a/b").rebase(&from, &to),
            Some(VirtualPath::new("a/x"))
        );
        assert_eq!(VirtualPath::new("a/other").rebase(&from, &to), None);
    }

    #[test]
    fn test_rebase_to_root_and_from_root() {
        let p = VirtualPath::new("dir/file.txt");
        assert_eq!(
            p.rebase(&VirtualPath::new("dir"), &VirtualPath::root()),
            Some(VirtualPath::new("file.txt"))
        );
        assert_eq!(
            VirtualPath::new("file.txt").rebase(&VirtualPath::root(), &VirtualPath::new("dir")),
            Some(VirtualPath::new("dir/file.txt"))
        );
    }
}
