//! 工作区目录树数据模型
//!
//! slotmap 竞技场存放已浮现的条目。子节点按枚举顺序保存，不排序；
//! 目录的加载状态（Unexpanded/Expanding/Expanded）与展开可见性分开记录，
//! 折叠再展开只是可见性切换，不触发重新枚举。
//! 改名/移动返回受影响节点的 (旧路径, 新路径) 对，供上层一次性重映射
//! 打开列表、内容存储、脏集合与句柄缓存。

use crate::models::language::IconKind;
use crate::models::path::VirtualPath;
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{new_key_type, SlotMap};
use std::fmt;

new_key_type! { pub struct NodeId; }

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Dir,
}

/// 目录子项的加载状态
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExpandState {
    /// 尚未枚举过子项
    Unexpanded,
    /// 枚举进行中，期间的再次展开请求被忽略
    Expanding,
    /// 子项已缓存，再次展开直接复用
    Expanded,
}

#[derive(Debug)]
pub enum TreeError {
    ParentNotDirectory,
    NameExists,
    MoveIntoDescendant,
    InvalidNodeId,
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::ParentNotDirectory => write!(f, "parent is not a directory"),
            TreeError::NameExists => write!(f, "name already exists in parent"),
            TreeError::MoveIntoDescendant => {
                write!(f, "cannot move node into its own subtree")
            }
            TreeError::InvalidNodeId => write!(f, "invalid node id"),
        }
    }
}

impl std::error::Error for TreeError {}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    name: String,
    path: VirtualPath,
    icon: IconKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    expand: ExpandState,
}

/// 渲染器消费的扁平行投影
#[derive(Debug, Clone)]
pub struct TreeRow {
    pub id: NodeId,
    pub path: VirtualPath,
    pub name: String,
    pub depth: u16,
    pub kind: NodeKind,
    pub icon: IconKind,
    pub expand_state: ExpandState,
    pub is_expanded: bool,
}

pub struct WorkspaceTree {
    arena: SlotMap<NodeId, Node>,
    root: NodeId,
    /// 可见展开集合，与加载状态无关
    expanded: FxHashSet<NodeId>,
    index: FxHashMap<VirtualPath, NodeId>,
}

impl WorkspaceTree {
    /// 空树：合成根节点，未打开文件夹时内存文件也挂在它下面
    pub fn new() -> Self {
        let mut tree = WorkspaceTree {
            arena: SlotMap::with_key(),
            root: NodeId::default(),
            expanded: FxHashSet::default(),
            index: FxHashMap::default(),
        };
        tree.install_root("");
        tree
    }

    /// 丢弃全部节点并以新名字重建根（打开文件夹）
    pub fn reset_root(&mut self, name: &str) {
        self.arena.clear();
        self.expanded.clear();
        self.index.clear();
        self.install_root(name);
    }

    fn install_root(&mut self, name: &str) {
        let root = self.arena.insert(Node {
            kind: NodeKind::Dir,
            name: name.to_string(),
            path: VirtualPath::root(),
            icon: IconKind::Folder,
            parent: None,
            children: Vec::new(),
            expand: ExpandState::Unexpanded,
        });
        self.root = root;
        self.expanded.insert(root);
        self.index.insert(VirtualPath::root(), root);
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_name(&self) -> &str {
        &self.arena[self.root].name
    }

    pub fn find(&self, path: &VirtualPath) -> Option<NodeId> {
        self.index.get(path).copied()
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.arena.get(id).map(|n| n.kind)
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.arena.get(id).map(|n| n.name.as_str())
    }

    pub fn path(&self, id: NodeId) -> Option<&VirtualPath> {
        self.arena.get(id).map(|n| &n.path)
    }

    pub fn icon(&self, id: NodeId) -> Option<IconKind> {
        self.arena.get(id).map(|n| n.icon)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.arena.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn child_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.arena.get(parent)?.children.iter().copied().find(|&c| {
            self.arena.get(c).map(|n| n.name == name).unwrap_or(false)
        })
    }

    pub fn expand_state(&self, id: NodeId) -> Option<ExpandState> {
        self.arena.get(id).map(|n| n.expand)
    }

    pub fn set_expand_state(&mut self, id: NodeId, state: ExpandState) {
        if let Some(node) = self.arena.get_mut(id) {
            node.expand = state;
        }
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.expanded.contains(&id)
    }

    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) {
        if expanded {
            self.expanded.insert(id);
        } else {
            self.expanded.remove(&id);
        }
    }

    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// 追加子节点，保持插入顺序
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        name: &str,
        kind: NodeKind,
        icon: IconKind,
        state: ExpandState,
    ) -> Result<NodeId, TreeError> {
        let parent_node = self.arena.get(parent).ok_or(TreeError::InvalidNodeId)?;
        if parent_node.kind != NodeKind::Dir {
            return Err(TreeError::ParentNotDirectory);
        }
        if self.child_by_name(parent, name).is_some() {
            return Err(TreeError::NameExists);
        }
        let path = self.arena[parent].path.join(name);
        let id = self.arena.insert(Node {
            kind,
            name: name.to_string(),
            path: path.clone(),
            icon,
            parent: Some(parent),
            children: Vec::new(),
            expand: state,
        });
        self.arena[parent].children.push(id);
        self.index.insert(path, id);
        Ok(id)
    }

    pub fn is_ancestor(&self, maybe_ancestor: NodeId, id: NodeId) -> bool {
        let mut cur = self.arena.get(id).and_then(|n| n.parent);
        while let Some(p) = cur {
            if p == maybe_ancestor {
                return true;
            }
            cur = self.arena.get(p).and_then(|n| n.parent);
        }
        false
    }

    /// 改名并重映射子树路径；返回受影响的 (旧, 新) 路径对。
    /// 同名调用是无操作，返回空表。
    pub fn rename(
        &mut self,
        id: NodeId,
        new_name: &str,
    ) -> Result<Vec<(VirtualPath, VirtualPath)>, TreeError> {
        let node = self.arena.get(id).ok_or(TreeError::InvalidNodeId)?;
        let parent = node.parent.ok_or(TreeError::InvalidNodeId)?;
        if node.name == new_name {
            return Ok(Vec::new());
        }
        if let Some(existing) = self.child_by_name(parent, new_name) {
            if existing != id {
                return Err(TreeError::NameExists);
            }
        }
        let old_path = self.arena[id].path.clone();
        let new_path = old_path.parent().join(new_name);
        self.arena[id].name = new_name.to_string();
        Ok(self.remap_subtree(id, &old_path, &new_path))
    }

    /// 挂到新父目录末尾并重映射子树路径
    pub fn move_to(
        &mut self,
        id: NodeId,
        new_parent: NodeId,
    ) -> Result<Vec<(VirtualPath, VirtualPath)>, TreeError> {
        let node = self.arena.get(id).ok_or(TreeError::InvalidNodeId)?;
        let old_parent = node.parent.ok_or(TreeError::InvalidNodeId)?;
        let target = self.arena.get(new_parent).ok_or(TreeError::InvalidNodeId)?;
        if target.kind != NodeKind::Dir {
            return Err(TreeError::ParentNotDirectory);
        }
        if old_parent == new_parent {
            return Ok(Vec::new());
        }
        if id == new_parent || self.is_ancestor(id, new_parent) {
            return Err(TreeError::MoveIntoDescendant);
        }
        let name = self.arena[id].name.clone();
        if self.child_by_name(new_parent, &name).is_some() {
            return Err(TreeError::NameExists);
        }

        self.arena[old_parent].children.retain(|&c| c != id);
        self.arena[new_parent].children.push(id);
        self.arena[id].parent = Some(new_parent);

        let old_path = self.arena[id].path.clone();
        let new_path = self.arena[new_parent].path.join(&name);
        Ok(self.remap_subtree(id, &old_path, &new_path))
    }

    /// 摘除整棵子树（含自身），返回被移除的路径
    pub fn remove(&mut self, id: NodeId) -> Result<Vec<VirtualPath>, TreeError> {
        let node = self.arena.get(id).ok_or(TreeError::InvalidNodeId)?;
        let parent = node.parent.ok_or(TreeError::InvalidNodeId)?;
        self.arena[parent].children.retain(|&c| c != id);
        Ok(self.remove_collected(self.collect_subtree(id)))
    }

    /// 只清空子项，节点本身保留（refresh 用），返回被移除的路径
    pub fn remove_children(&mut self, id: NodeId) -> Result<Vec<VirtualPath>, TreeError> {
        let node = self.arena.get(id).ok_or(TreeError::InvalidNodeId)?;
        if node.kind != NodeKind::Dir {
            return Err(TreeError::ParentNotDirectory);
        }
        let mut ids = Vec::new();
        for &child in &self.arena[id].children.clone() {
            ids.extend(self.collect_subtree(child));
        }
        self.arena[id].children.clear();
        Ok(self.remove_collected(ids))
    }

    fn collect_subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            out.push(cur);
            if let Some(node) = self.arena.get(cur) {
                stack.extend(node.children.iter().copied());
            }
        }
        out
    }

    fn remove_collected(&mut self, ids: Vec<NodeId>) -> Vec<VirtualPath> {
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(node) = self.arena.remove(id) {
                self.expanded.remove(&id);
                self.index.remove(&node.path);
                removed.push(node.path);
            }
        }
        removed
    }

    fn remap_subtree(
        &mut self,
        id: NodeId,
        from: &VirtualPath,
        to: &VirtualPath,
    ) -> Vec<(VirtualPath, VirtualPath)> {
        let mut pairs = Vec::new();
        for sub in self.collect_subtree(id) {
            let old = self.arena[sub].path.clone();
            // 子树内的路径必然以 from 为前缀
            if let Some(new) = old.rebase(from, to) {
                self.arena[sub].path = new.clone();
                self.index.remove(&old);
                self.index.insert(new.clone(), sub);
                pairs.push((old, new));
            }
        }
        pairs
    }

    /// 按可见性展平为渲染行，根节点本身不出现在行里
    pub fn rows(&self) -> Vec<TreeRow> {
        let mut rows = Vec::new();
        self.push_rows(self.root, 0, &mut rows);
        rows
    }

    fn push_rows(&self, id: NodeId, depth: u16, rows: &mut Vec<TreeRow>) {
        let node = match self.arena.get(id) {
            Some(n) => n,
            None => return,
        };
        if id != self.root {
            rows.push(TreeRow {
                id,
                path: node.path.clone(),
                name: node.name.clone(),
                depth,
                kind: node.kind,
                icon: node.icon,
                expand_state: node.expand,
                is_expanded: self.is_expanded(id),
            });
        }
        let descend =
            id == self.root || (node.kind == NodeKind::Dir && self.is_expanded(id));
        if descend {
            let child_depth = if id == self.root { 0 } else { depth + 1 };
            for &child in &node.children {
                self.push_rows(child, child_depth, rows);
            }
        }
    }
}

impl Default for WorkspaceTree {
    fn default() -> Self {
        Self::new()
    }
}

/// 枚举时跳过的目录噪声
pub fn should_ignore(name: &str) -> bool {
    matches!(
        name,
        ".git" | ".svn" | ".hg" | "node_modules" | ".DS_Store" | "Thumbs.db" | ".idea"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::language::icon_for_name;

    fn sample_tree() -> WorkspaceTree {
        let mut tree = WorkspaceTree::new();
        tree.reset_root("project");
        let root = tree.root();
        let src = tree
            .insert_child(root, "src", NodeKind::Dir, IconKind::Folder, ExpandState::Unexpanded)
            .unwrap();
        tree.insert_child(
            src,
            "main.js",
            NodeKind::File,
            icon_for_name("main.js"),
            ExpandState::Unexpanded,
        )
        .unwrap();
        tree.insert_child(
            root,
            "readme.md",
            NodeKind::File,
            icon_for_name("readme.md"),
            ExpandState::Unexpanded,
        )
        .unwrap();
        tree.set_expand_state(src, ExpandState::Expanded);
        tree
    }

    #[test]
    fn test_insert_and_find() {
        let tree = sample_tree();
        let src = tree.find(&VirtualPath::new("src")).unwrap();
        assert_eq!(tree.kind(src), Some(NodeKind::Dir));
        let main = tree.find(&VirtualPath::new("src/main.js")).unwrap();
        assert_eq!(tree.parent(main), Some(src));
        assert_eq!(tree.path(main).unwrap().as_str(), "src/main.js");
        assert!(tree.find(&VirtualPath::new("missing")).is_none());
    }

    #[test]
    fn test_insert_duplicate_name_fails() {
        let mut tree = sample_tree();
        let root = tree.root();
        let result = tree.insert_child(
            root,
            "src",
            NodeKind::Dir,
            IconKind::Folder,
            ExpandState::Unexpanded,
        );
        assert!(matches!(result, Err(TreeError::NameExists)));
    }

    #[test]
    fn test_insert_under_file_fails() {
        let mut tree = sample_tree();
        let readme = tree.find(&VirtualPath::new("readme.md")).unwrap();
        let result = tree.insert_child(
            readme,
            "x",
            NodeKind::File,
            IconKind::Code,
            ExpandState::Unexpanded,
        );
        assert!(matches!(result, Err(TreeError::ParentNotDirectory)));
    }

    #[test]
    fn test_rename_remaps_subtree() {
        let mut tree = sample_tree();
        let src = tree.find(&VirtualPath::new("src")).unwrap();
        let mut pairs = tree.rename(src, "lib").unwrap();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                (VirtualPath::new("src"), VirtualPath::new("lib")),
                (VirtualPath::new("src/main.js"), VirtualPath::new("lib/main.js")),
            ]
        );
        assert!(tree.find(&VirtualPath::new("src")).is_none());
        assert!(tree.find(&VirtualPath::new("lib/main.js")).is_some());
        assert_eq!(tree.name(src), Some("lib"));
    }

    #[test]
    fn test_rename_same_name_is_noop() {
        let mut tree = sample_tree();
        let src = tree.find(&VirtualPath::new("src")).unwrap();
        assert!(tree.rename(src, "src").unwrap().is_empty());
    }

    #[test]
    fn test_rename_sibling_conflict() {
        let mut tree = sample_tree();
        let src = tree.find(&VirtualPath::new("src")).unwrap();
        assert!(matches!(tree.rename(src, "readme.md"), Err(TreeError::NameExists)));
    }

    #[test]
    fn test_move_reparents_and_remaps() {
        let mut tree = sample_tree();
        let src = tree.find(&VirtualPath::new("src")).unwrap();
        let readme = tree.find(&VirtualPath::new("readme.md")).unwrap();
        let pairs = tree.move_to(readme, src).unwrap();
        assert_eq!(
            pairs,
            vec![(VirtualPath::new("readme.md"), VirtualPath::new("src/readme.md"))]
        );
        assert_eq!(tree.parent(readme), Some(src));
        // 挂在目标子项末尾
        assert_eq!(tree.children(src).last(), Some(&readme));
        assert!(tree.find(&VirtualPath::new("src/readme.md")).is_some());
    }

    #[test]
    fn test_move_into_descendant_fails() {
        let mut tree = sample_tree();
        let root = tree.root();
        let src = tree.find(&VirtualPath::new("src")).unwrap();
        let nested = tree
            .insert_child(src, "nested", NodeKind::Dir, IconKind::Folder, ExpandState::Unexpanded)
            .unwrap();
        assert!(matches!(tree.move_to(src, nested), Err(TreeError::MoveIntoDescendant)));
        assert!(matches!(tree.move_to(root, src), Err(TreeError::InvalidNodeId)));
    }

    #[test]
    fn test_remove_subtree_returns_paths() {
        let mut tree = sample_tree();
        let src = tree.find(&VirtualPath::new("src")).unwrap();
        let mut removed = tree.remove(src).unwrap();
        removed.sort();
        assert_eq!(
            removed,
            vec![VirtualPath::new("src"), VirtualPath::new("src/main.js")]
        );
        assert!(tree.find(&VirtualPath::new("src")).is_none());
        assert_eq!(tree.node_count(), 2); // 根 + readme.md
    }

    #[test]
    fn test_remove_children_keeps_node() {
        let mut tree = sample_tree();
        let src = tree.find(&VirtualPath::new("src")).unwrap();
        let removed = tree.remove_children(src).unwrap();
        assert_eq!(removed, vec![VirtualPath::new("src/main.js")]);
        assert!(tree.find(&VirtualPath::new("src")).is_some());
        assert!(tree.children(src).is_empty());
    }

    #[test]
    fn test_rows_preserve_insertion_order() {
        let mut tree = WorkspaceTree::new();
        tree.reset_root("p");
        let root = tree.root();
        // 故意倒序插入：行顺序必须跟随插入顺序，不做排序
        tree.insert_child(root, "zeta.txt", NodeKind::File, IconKind::Text, ExpandState::Unexpanded)
            .unwrap();
        tree.insert_child(root, "alpha.txt", NodeKind::File, IconKind::Text, ExpandState::Unexpanded)
            .unwrap();
        let names: Vec<_> = tree.rows().iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["zeta.txt", "alpha.txt"]);
    }

    #[test]
    fn test_rows_respect_visibility() {
        let mut tree = sample_tree();
        let src = tree.find(&VirtualPath::new("src")).unwrap();

        tree.set_expanded(src, true);
        let names: Vec<_> = tree.rows().iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["src", "main.js", "readme.md"]);
        let depths: Vec<_> = tree.rows().iter().map(|r| r.depth).collect();
        assert_eq!(depths, vec![0, 1, 0]);

        tree.set_expanded(src, false);
        let names: Vec<_> = tree.rows().iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["src", "readme.md"]);
    }

    #[test]
    fn test_should_ignore() {
        assert!(should_ignore(".git"));
        assert!(should_ignore("node_modules"));
        assert!(!should_ignore("src"));
    }
}
