//! 工作区的三个按路径编址的状态存储

use crate::models::path::VirtualPath;
use crate::services::ports::fs::Handle;
use rustc_hash::{FxHashMap, FxHashSet};

/// 路径 ↔ 能力句柄双向缓存
///
/// 正向查询哈希命中；反向没有父指针可走，只能按句柄身份线性扫描，
/// n 为已浮现条目数，够小。
#[derive(Default)]
pub struct HandleCache {
    by_path: FxHashMap<VirtualPath, Handle>,
}

impl HandleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &VirtualPath) -> Option<&Handle> {
        self.by_path.get(path)
    }

    pub fn put(&mut self, path: VirtualPath, handle: Handle) {
        self.by_path.insert(path, handle);
    }

    pub fn remove(&mut self, path: &VirtualPath) -> Option<Handle> {
        self.by_path.remove(path)
    }

    pub fn contains(&self, path: &VirtualPath) -> bool {
        self.by_path.contains_key(path)
    }

    /// 把 old 键下的句柄挪到 new 键下；old 不存在则无操作
    pub fn rekey(&mut self, old: &VirtualPath, new: &VirtualPath) {
        if let Some(handle) = self.by_path.remove(old) {
            self.by_path.insert(new.clone(), handle);
        }
    }

    /// 身份反查：指向同一分配才算同一句柄
    pub fn path_of(&self, handle: &Handle) -> Option<&VirtualPath> {
        self.by_path
            .iter()
            .find(|(_, h)| h.same(handle))
            .map(|(p, _)| p)
    }
}

/// 会话内打开或新建文件的全文内容，编辑真相所在
#[derive(Default)]
pub struct ContentStore {
    texts: FxHashMap<VirtualPath, String>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &VirtualPath) -> Option<&str> {
        self.texts.get(path).map(|s| s.as_str())
    }

    pub fn insert(&mut self, path: VirtualPath, text: String) {
        self.texts.insert(path, text);
    }

    pub fn remove(&mut self, path: &VirtualPath) -> Option<String> {
        self.texts.remove(path)
    }

    pub fn contains(&self, path: &VirtualPath) -> bool {
        self.texts.contains_key(path)
    }

    pub fn rekey(&mut self, old: &VirtualPath, new: &VirtualPath) {
        if let Some(text) = self.texts.remove(old) {
            self.texts.insert(new.clone(), text);
        }
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&VirtualPath) -> bool,
    {
        self.texts.retain(|path, _| keep(path));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VirtualPath, &str)> {
        self.texts.iter().map(|(p, t)| (p, t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }
}

/// 有未保存改动的路径集合。只有句柄背书的文件会进来；
/// 集合成员资格就是未保存标记的唯一事实来源。
#[derive(Default)]
pub struct DirtySet {
    paths: FxHashSet<VirtualPath>,
}

impl DirtySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: VirtualPath) {
        self.paths.insert(path);
    }

    pub fn remove(&mut self, path: &VirtualPath) -> bool {
        self.paths.remove(path)
    }

    pub fn contains(&self, path: &VirtualPath) -> bool {
        self.paths.contains(path)
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }

    pub fn rekey(&mut self, old: &VirtualPath, new: &VirtualPath) {
        if self.paths.remove(old) {
            self.paths.insert(new.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &VirtualPath> {
        self.paths.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
