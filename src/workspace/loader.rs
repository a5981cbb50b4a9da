//! 目录树的懒加载
//!
//! 子项只在首次展开时经能力枚举一层并缓存；收起只是可见性切换，
//! 重新展开不再触碰磁盘。与磁盘的重新同步是显式手势（refresh）。

use super::Workspace;
use crate::models::language::{icon_for_name, IconKind};
use crate::models::path::VirtualPath;
use crate::models::tree::{should_ignore, ExpandState, NodeId, NodeKind};
use crate::services::ports::fs::{DirEntry, FsError, Handle, Result};

impl Workspace {
    /// 展开目录并把子项浮现到树里。
    ///
    /// Unexpanded 时经句柄枚举一层，子项句柄登记进缓存；Expanding
    /// 期间的重复请求被忽略；Expanded 直接复用缓存子项。枚举失败
    /// 回到 Unexpanded 并把错误上抛，之后可重试。
    pub fn expand(&mut self, path: &VirtualPath) -> Result<()> {
        let id = self
            .tree
            .find(path)
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;
        if self.tree.kind(id) != Some(NodeKind::Dir) {
            return Ok(());
        }
        self.tree.set_expanded(id, true);
        if matches!(
            self.tree.expand_state(id),
            Some(ExpandState::Expanded) | Some(ExpandState::Expanding)
        ) {
            return Ok(());
        }

        let dir = if path.is_root() {
            match &self.root {
                Some(grant) => grant.handle.clone(),
                None => {
                    // 纯内存工作区：子项全在树里，无可枚举
                    self.tree.set_expand_state(id, ExpandState::Expanded);
                    return Ok(());
                }
            }
        } else {
            match self.handles.get(path).cloned() {
                Some(Handle::Dir(dir)) => dir,
                Some(Handle::File(_)) => {
                    return Err(FsError::NotFound(format!("{} is not a directory", path)));
                }
                None => {
                    if self.has_root() {
                        return Err(FsError::NotFound(path.to_string()));
                    }
                    self.tree.set_expand_state(id, ExpandState::Expanded);
                    return Ok(());
                }
            }
        };

        self.tree.set_expand_state(id, ExpandState::Expanding);
        let entries = match dir.entries() {
            Ok(entries) => entries,
            Err(err) => {
                // 不留 Expanding 卡死，保持可重试
                self.tree.set_expand_state(id, ExpandState::Unexpanded);
                tracing::warn!(path = %path, error = %err, "directory enumeration failed");
                return Err(err);
            }
        };
        let count = entries.len();
        self.populate_children(id, entries);
        self.tree.set_expand_state(id, ExpandState::Expanded);
        tracing::debug!(path = %path, children = count, "expanded directory");
        Ok(())
    }

    /// 收起目录。只改可见性，缓存的子项与句柄全保留。
    pub fn collapse(&mut self, path: &VirtualPath) {
        if let Some(id) = self.tree.find(path) {
            self.tree.set_expanded(id, false);
        }
    }

    /// 资源管理器的点击手势：展开态收起，否则展开
    pub fn toggle(&mut self, path: &VirtualPath) -> Result<()> {
        match self.tree.find(path) {
            Some(id) if self.tree.is_expanded(id) => {
                self.tree.set_expanded(id, false);
                Ok(())
            }
            Some(_) => self.expand(path),
            None => Err(FsError::NotFound(path.to_string())),
        }
    }

    /// 显式与磁盘重新同步：丢弃缓存的子树与其句柄缓存条目后重新
    /// 枚举。内容存储、脏集合与打开列表不动。
    pub fn refresh(&mut self, path: &VirtualPath) -> Result<()> {
        let id = self
            .tree
            .find(path)
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;
        if self.tree.kind(id) != Some(NodeKind::Dir) {
            return Err(FsError::NotFound(format!("{} is not a directory", path)));
        }
        let removed = self.tree.remove_children(id)?;
        for gone in &removed {
            self.handles.remove(gone);
        }
        self.tree.set_expand_state(id, ExpandState::Unexpanded);
        tracing::debug!(path = %path, dropped = removed.len(), "refresh directory");
        self.expand(path)
    }

    /// 把一层枚举结果挂到节点下并登记句柄缓存；
    /// 配置开启时过滤目录噪声
    pub(crate) fn populate_children(&mut self, parent: NodeId, entries: Vec<DirEntry>) {
        let Some(base) = self.tree.path(parent).cloned() else {
            return;
        };
        for entry in entries {
            if self.config.filter_junk_names && should_ignore(&entry.name) {
                continue;
            }
            let (kind, icon) = match &entry.handle {
                Handle::Dir(_) => (NodeKind::Dir, IconKind::Folder),
                Handle::File(_) => (NodeKind::File, icon_for_name(&entry.name)),
            };
            match self
                .tree
                .insert_child(parent, &entry.name, kind, icon, ExpandState::Unexpanded)
            {
                Ok(_) => {
                    self.handles.put(base.join(&entry.name), entry.handle);
                }
                Err(err) => {
                    tracing::warn!(name = %entry.name, error = %err, "skipped enumerated entry");
                }
            }
        }
    }
}
