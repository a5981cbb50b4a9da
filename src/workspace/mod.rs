//! 工作区文件模型
//!
//! 以虚拟路径为键的统一门面，调和三个存储域：
//! 用户授权的目录能力（磁盘）、内存内容存储（编辑真相）、
//! 持久键值快照（会话恢复）。
//!
//! 单线程协作调用：所有操作在调用方线程上同步完成，宿主在空闲时
//! 周期性调用 [`Workspace::tick`] 驱动去抖快照与恢复激活。
//! 错误策略：可失败的能力操作在前，不可失败的簿记在后；任何操作
//! 失败时状态保持一致，绝不把能力错误吞成静默的陈旧内容。

mod loader;
mod session;
mod state;

pub use session::SessionSnapshot;

use crate::models::language::{icon_for_name, IconKind, LanguageId};
use crate::models::path::VirtualPath;
use crate::models::tree::{ExpandState, NodeKind, TreeRow, WorkspaceTree};
use crate::services::ports::editor::{CloseDecision, EditingSurface, SavePrompt};
use crate::services::ports::fs::{
    CapabilityBroker, DirHandleRef, FileHandleRef, FsError, Handle, Result, RootGrant,
};
use crate::services::ports::notify::NotificationSink;
use crate::services::ports::storage::{KeyValueStore, ROOT_TOKEN_KEY};
use serde::{Deserialize, Serialize};
use session::SessionService;
use state::{ContentStore, DirtySet, HandleCache};

/// 模型可调参数，持久化为 JSON（见 adapters::storage）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// 会话快照写入的去抖间隔（毫秒）
    pub snapshot_debounce_ms: u64,
    /// 通知停留时长（毫秒）
    pub notify_duration_ms: u64,
    /// 枚举时过滤目录噪声（.git、node_modules 等）
    pub filter_junk_names: bool,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        WorkspaceConfig {
            snapshot_debounce_ms: 500,
            notify_duration_ms: 3000,
            filter_junk_names: true,
        }
    }
}

pub struct Workspace {
    config: WorkspaceConfig,
    root: Option<RootGrant>,
    tree: WorkspaceTree,
    handles: HandleCache,
    contents: ContentStore,
    dirty: DirtySet,
    open_files: Vec<VirtualPath>,
    active: Option<VirtualPath>,
    editor: Box<dyn EditingSurface>,
    prompt: Box<dyn SavePrompt>,
    notifier: Box<dyn NotificationSink>,
    storage: Box<dyn KeyValueStore>,
    broker: Option<Box<dyn CapabilityBroker>>,
    session: SessionService,
}

impl Workspace {
    pub fn new(
        editor: Box<dyn EditingSurface>,
        prompt: Box<dyn SavePrompt>,
        notifier: Box<dyn NotificationSink>,
        storage: Box<dyn KeyValueStore>,
        broker: Option<Box<dyn CapabilityBroker>>,
    ) -> Self {
        Self::with_config(WorkspaceConfig::default(), editor, prompt, notifier, storage, broker)
    }

    pub fn with_config(
        config: WorkspaceConfig,
        editor: Box<dyn EditingSurface>,
        prompt: Box<dyn SavePrompt>,
        notifier: Box<dyn NotificationSink>,
        storage: Box<dyn KeyValueStore>,
        broker: Option<Box<dyn CapabilityBroker>>,
    ) -> Self {
        Workspace {
            config,
            root: None,
            tree: WorkspaceTree::new(),
            handles: HandleCache::new(),
            contents: ContentStore::new(),
            dirty: DirtySet::new(),
            open_files: Vec::new(),
            active: None,
            editor,
            prompt,
            notifier,
            storage,
            broker,
            session: SessionService::new(),
        }
    }

    // ---- 查询 ----

    pub fn has_root(&self) -> bool {
        self.root.is_some()
    }

    pub fn root_name(&self) -> Option<&str> {
        self.root.as_ref().map(|grant| grant.handle.name())
    }

    pub fn open_files(&self) -> &[VirtualPath] {
        &self.open_files
    }

    pub fn active_path(&self) -> Option<&VirtualPath> {
        self.active.as_ref()
    }

    pub fn is_open(&self, path: &VirtualPath) -> bool {
        self.open_files.contains(path)
    }

    pub fn is_dirty(&self, path: &VirtualPath) -> bool {
        self.dirty.contains(path)
    }

    pub fn has_unsaved_changes(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn unsaved_paths(&self) -> Vec<VirtualPath> {
        let mut paths: Vec<_> = self.dirty.iter().cloned().collect();
        paths.sort();
        paths
    }

    pub fn content(&self, path: &VirtualPath) -> Option<&str> {
        self.contents.get(path)
    }

    pub fn tree(&self) -> &WorkspaceTree {
        &self.tree
    }

    pub fn rows(&self) -> Vec<TreeRow> {
        self.tree.rows()
    }

    /// 句柄反查路径（身份比较）
    pub fn path_of_handle(&self, handle: &Handle) -> Option<&VirtualPath> {
        self.handles.path_of(handle)
    }

    // ---- 操作 ----

    /// 打开新的根目录。先枚举验证能力，成功后才触碰任何状态；
    /// 失败时之前的工作区完整保留。
    ///
    /// 状态重置是选择性的：句柄缓存与脏集合整体作废；内容存储只丢
    /// 句柄背书的条目，纯内存文件保留；打开列表与活动文件不动。
    pub fn open_folder(&mut self, grant: RootGrant) -> Result<()> {
        let entries = grant.handle.entries()?;
        tracing::info!(folder = grant.handle.name(), entries = entries.len(), "open folder");

        self.storage.set(ROOT_TOKEN_KEY, &grant.token);

        let stale = std::mem::take(&mut self.handles);
        self.contents.retain(|path| !stale.contains(path));
        self.dirty.clear();

        self.tree.reset_root(grant.handle.name());
        let root_id = self.tree.root();
        self.populate_children(root_id, entries);
        self.tree.set_expand_state(root_id, ExpandState::Expanded);

        self.root = Some(grant);
        let name = self.tree.root_name().to_string();
        self.notify(&format!("Opened folder: {}", name));
        Ok(())
    }

    /// 打开文件并返回其内容。
    ///
    /// 句柄背书的路径每次都经能力重读（陈旧缓存被覆盖，句柄被吊销
    /// 则错误上浮，绝不静默给旧内容）；纯内存路径用现有内容存储条目，
    /// 没有则建一个空条目。追加到打开列表（如不在）并设为活动文件；
    /// 不触碰脏集合。
    pub fn open_file(&mut self, path: &VirtualPath) -> Result<String> {
        let cached = self.handles.get(path).cloned();
        let text = match cached {
            Some(Handle::File(file)) => {
                let text = file.read()?;
                self.contents.insert(path.clone(), text.clone());
                text
            }
            Some(Handle::Dir(_)) => {
                return Err(FsError::NotFound(format!("{} is not a file", path)));
            }
            None => match self.contents.get(path) {
                Some(text) => text.to_string(),
                None => {
                    self.contents.insert(path.clone(), String::new());
                    self.schedule_snapshot();
                    String::new()
                }
            },
        };

        self.editor.set_text(&text);
        self.editor
            .set_language_hint(LanguageId::from_name(path.base_name()).hint());

        if !self.open_files.contains(path) {
            self.open_files.push(path.clone());
            self.notify(&format!("Opened file: {}", path.base_name()));
            self.schedule_snapshot();
        }
        if self.active.as_ref() != Some(path) {
            self.active = Some(path.clone());
            self.schedule_snapshot();
        }
        tracing::debug!(path = %path, "open file");
        Ok(text)
    }

    /// 宿主的单文件授权：以裸文件名注册句柄并按 open_file 语义打开。
    /// 不进目录树。
    pub fn open_file_handle(&mut self, handle: FileHandleRef) -> Result<VirtualPath> {
        let path = VirtualPath::new(handle.name());
        if self.handles.contains(&path) {
            tracing::debug!(path = %path, "single-file grant shadows existing cache entry");
        }
        self.handles.put(path.clone(), Handle::File(handle));
        self.open_file(&path)?;
        Ok(path)
    }

    /// 新建文件并按 open_file 语义打开；parent 为 None 表示根目录
    pub fn create_file(&mut self, name: &str, parent: Option<&VirtualPath>) -> Result<VirtualPath> {
        self.create_entry(name, parent, NodeKind::File)
    }

    /// 新建文件夹；有根目录时经能力创建并以未展开节点浮现
    pub fn create_folder(
        &mut self,
        name: &str,
        parent: Option<&VirtualPath>,
    ) -> Result<VirtualPath> {
        self.create_entry(name, parent, NodeKind::Dir)
    }

    fn create_entry(
        &mut self,
        name: &str,
        parent: Option<&VirtualPath>,
        kind: NodeKind,
    ) -> Result<VirtualPath> {
        let name = name.trim();
        if name.is_empty() || name.contains('/') {
            return Err(FsError::Unsupported(
                "entry name must be a single non-empty segment".into(),
            ));
        }
        let parent_path = parent.cloned().unwrap_or_else(VirtualPath::root);
        let parent_id = self
            .tree
            .find(&parent_path)
            .ok_or_else(|| FsError::NotFound(parent_path.to_string()))?;
        if self.tree.kind(parent_id) != Some(NodeKind::Dir) {
            return Err(FsError::NotFound(format!("{} is not a directory", parent_path)));
        }

        if self.has_root() {
            // 先展开父目录再创建，树里的同级冲突判断才与磁盘一致
            if self.tree.expand_state(parent_id) != Some(ExpandState::Expanded) {
                self.expand(&parent_path)?;
            }
            if self.tree.child_by_name(parent_id, name).is_some() {
                return Err(FsError::NameConflict(name.to_string()));
            }
            let dir = self.resolve_dir_handle(&parent_path)?;
            let path = parent_path.join(name);
            match kind {
                NodeKind::File => {
                    let file = dir.create_file(name)?;
                    self.tree.insert_child(
                        parent_id,
                        name,
                        NodeKind::File,
                        icon_for_name(name),
                        ExpandState::Unexpanded,
                    )?;
                    self.handles.put(path.clone(), Handle::File(file));
                    self.contents.insert(path.clone(), String::new());
                    self.notify(&format!("Created file: {}", name));
                    self.open_file(&path)?;
                }
                NodeKind::Dir => {
                    let sub = dir.create_dir(name)?;
                    self.tree.insert_child(
                        parent_id,
                        name,
                        NodeKind::Dir,
                        IconKind::Folder,
                        ExpandState::Unexpanded,
                    )?;
                    self.handles.put(path.clone(), Handle::Dir(sub));
                    self.notify(&format!("Created folder: {}", name));
                }
            }
            tracing::info!(path = %path, kind = ?kind, "created entry");
            Ok(path)
        } else {
            // 纯内存工作区：只有 UI 节点；文件内容进内容存储，永不脏
            let path = parent_path.join(name);
            if self.tree.child_by_name(parent_id, name).is_some() || self.contents.contains(&path) {
                return Err(FsError::NameConflict(name.to_string()));
            }
            match kind {
                NodeKind::File => {
                    self.tree.insert_child(
                        parent_id,
                        name,
                        NodeKind::File,
                        icon_for_name(name),
                        ExpandState::Unexpanded,
                    )?;
                    self.contents.insert(path.clone(), String::new());
                    self.schedule_snapshot();
                    self.notify(&format!("Created file: {}", name));
                    self.open_file(&path)?;
                }
                NodeKind::Dir => {
                    // 无能力背书，子项全在内存里管理，无可加载
                    self.tree.insert_child(
                        parent_id,
                        name,
                        NodeKind::Dir,
                        IconKind::Folder,
                        ExpandState::Expanded,
                    )?;
                    self.notify(&format!("Created folder: {}", name));
                }
            }
            Ok(path)
        }
    }

    /// 改名。
    ///
    /// 句柄背书的文件先做磁盘迁移（能力面没有原生改名：建新名、写入
    /// 当前内容、删旧名），可失败的都在前；之后的命名空间重映射一步
    /// 完成，打开列表、活动文件、内容存储、脏集合要么全反映新名，
    /// 要么（迁移失败时）全保持旧名。目录与纯内存条目只改命名空间。
    pub fn rename_entry(&mut self, path: &VirtualPath, new_name: &str) -> Result<VirtualPath> {
        let new_name = new_name.trim();
        if new_name.is_empty() || new_name.contains('/') {
            return Err(FsError::Unsupported(
                "entry name must be a single non-empty segment".into(),
            ));
        }
        let id = self
            .tree
            .find(path)
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;
        let parent_id = self
            .tree
            .parent(id)
            .ok_or_else(|| FsError::Unsupported("cannot rename the workspace root".into()))?;
        let old_name = self.tree.name(id).unwrap_or("").to_string();
        if old_name == new_name {
            return Ok(path.clone());
        }
        if self.tree.child_by_name(parent_id, new_name).is_some() {
            return Err(FsError::NameConflict(new_name.to_string()));
        }

        let relocated = if self.tree.kind(id) == Some(NodeKind::File) {
            if let Some(Handle::File(old_file)) = self.handles.get(path).cloned() {
                let parent_dir = self.resolve_dir_handle(&path.parent())?;
                let content = match self.contents.get(path) {
                    Some(text) => text.to_string(),
                    None => old_file.read()?,
                };
                Some(relocate_file(&parent_dir, &old_name, &parent_dir, new_name, &content)?)
            } else {
                None
            }
        } else {
            None
        };

        let pairs = self.tree.rename(id, new_name)?;
        self.apply_remap(&pairs);
        let new_path = path.parent().join(new_name);
        if let Some(new_file) = relocated {
            // 重映射搬过去的是旧句柄，换成迁移后新建的
            self.handles.put(new_path.clone(), Handle::File(new_file));
        }
        self.schedule_snapshot();
        tracing::info!(from = %path, to = %new_path, "renamed entry");
        Ok(new_path)
    }

    /// 移动到另一目录下，后代虚拟路径随之重算。
    /// 目标目录未展开则先展开（同级冲突判断与磁盘一致）；
    /// 句柄背书的文件照改名一样做磁盘迁移，目录只改命名空间。
    pub fn move_entry(&mut self, path: &VirtualPath, target_dir: &VirtualPath) -> Result<VirtualPath> {
        let id = self
            .tree
            .find(path)
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;
        let target_id = self
            .tree
            .find(target_dir)
            .ok_or_else(|| FsError::NotFound(target_dir.to_string()))?;
        if self.tree.kind(target_id) != Some(NodeKind::Dir) {
            return Err(FsError::NotFound(format!("{} is not a directory", target_dir)));
        }
        if self.tree.parent(id).is_none() {
            return Err(FsError::Unsupported("cannot move the workspace root".into()));
        }
        if id == target_id || self.tree.is_ancestor(id, target_id) {
            return Err(FsError::Unsupported(
                "cannot move a directory into its own subtree".into(),
            ));
        }
        if self.tree.parent(id) == Some(target_id) {
            return Ok(path.clone());
        }
        let name = self.tree.name(id).unwrap_or("").to_string();
        if self.tree.child_by_name(target_id, &name).is_some() {
            return Err(FsError::NameConflict(name));
        }

        if self.has_root() && self.tree.expand_state(target_id) != Some(ExpandState::Expanded) {
            self.expand(target_dir)?;
            // 展开可能把同名子项浮现出来，再查一次
            if self.tree.child_by_name(target_id, &name).is_some() {
                return Err(FsError::NameConflict(name));
            }
        }

        let relocated = if self.tree.kind(id) == Some(NodeKind::File) {
            if let Some(Handle::File(old_file)) = self.handles.get(path).cloned() {
                let from_dir = self.resolve_dir_handle(&path.parent())?;
                let to_dir = self.resolve_dir_handle(target_dir)?;
                let content = match self.contents.get(path) {
                    Some(text) => text.to_string(),
                    None => old_file.read()?,
                };
                Some(relocate_file(&from_dir, &name, &to_dir, &name, &content)?)
            } else {
                None
            }
        } else {
            None
        };

        let pairs = self.tree.move_to(id, target_id)?;
        self.apply_remap(&pairs);
        let new_path = target_dir.join(&name);
        if let Some(new_file) = relocated {
            self.handles.put(new_path.clone(), Handle::File(new_file));
        }
        self.schedule_snapshot();
        tracing::info!(from = %path, to = %new_path, "moved entry");
        Ok(new_path)
    }

    /// 删除条目（目录则整棵子树）。
    ///
    /// 子树内所有打开的脏文件先走关闭询问，任何一个取消则整体放弃
    /// 并返回 false，此时尚未碰过磁盘；随后经父目录能力做真实删除，
    /// 最后清树、三个存储与打开列表。
    pub fn delete_entry(&mut self, path: &VirtualPath) -> Result<bool> {
        let node = self.tree.find(path);
        if node.is_none() && !self.contents.contains(path) && !self.handles.contains(path) {
            return Err(FsError::NotFound(path.to_string()));
        }
        if let Some(id) = node {
            if self.tree.parent(id).is_none() {
                return Err(FsError::Unsupported("cannot delete the workspace root".into()));
            }
        }

        let affected: Vec<VirtualPath> = self
            .open_files
            .iter()
            .filter(|open| open.starts_with(path))
            .cloned()
            .collect();
        for open in &affected {
            if self.dirty.contains(open) {
                match self.prompt.confirm_close(open) {
                    CloseDecision::Cancel => return Ok(false),
                    CloseDecision::Save => self.save_file(open)?,
                    CloseDecision::Discard => {
                        self.dirty.remove(open);
                    }
                }
            }
        }

        if let Some(id) = node {
            // 单文件授权的裸路径不在树里，只忘掉句柄，不碰磁盘
            if self.has_root() && self.handles.contains(path) {
                let parent_dir = self.resolve_dir_handle(&path.parent())?;
                let name = self.tree.name(id).unwrap_or("").to_string();
                let recursive = self.tree.kind(id) == Some(NodeKind::Dir);
                parent_dir.remove(&name, recursive)?;
            }
        }

        let removed: Vec<VirtualPath> = match node {
            Some(id) => self.tree.remove(id)?,
            None => vec![path.clone()],
        };
        for gone in &removed {
            self.contents.remove(gone);
            self.dirty.remove(gone);
            self.handles.remove(gone);
        }
        if !affected.is_empty() {
            self.open_files.retain(|open| !open.starts_with(path));
            if self.active.as_ref().is_some_and(|active| active.starts_with(path)) {
                self.activate_fallback();
            }
        }
        self.schedule_snapshot();
        let label = path.base_name().to_string();
        self.notify(&format!("Deleted: {}", label));
        tracing::info!(path = %path, removed = removed.len(), "deleted entry");
        Ok(true)
    }

    /// 关闭打开的文件。脏文件先问宿主：保存失败放弃关闭，丢弃只清
    /// 脏标记（内容保留），取消返回 false 且一切不变。活动文件被关
    /// 后回退到打开列表首位，编辑面从内容存储同步。
    pub fn close_file(&mut self, path: &VirtualPath) -> Result<bool> {
        if !self.open_files.contains(path) {
            return Ok(true);
        }
        if self.dirty.contains(path) {
            match self.prompt.confirm_close(path) {
                CloseDecision::Cancel => return Ok(false),
                CloseDecision::Save => self.save_file(path)?,
                CloseDecision::Discard => {
                    self.dirty.remove(path);
                }
            }
        }
        self.open_files.retain(|open| open != path);
        if self.active.as_ref() == Some(path) {
            self.activate_fallback();
        }
        self.schedule_snapshot();
        tracing::debug!(path = %path, "closed file");
        Ok(true)
    }

    /// 保存。活动文件先把编辑面现行文本拉进内容存储。
    /// 句柄背书的写回磁盘成功后才清脏标记，写失败脏标记保留；
    /// 纯内存文件确认存储即当前值并排程快照。
    pub fn save_file(&mut self, path: &VirtualPath) -> Result<()> {
        if self.active.as_ref() == Some(path) {
            let live = self.editor.text();
            self.contents.insert(path.clone(), live);
        }
        let cached = self.handles.get(path).cloned();
        match cached {
            Some(Handle::File(file)) => {
                let text = self
                    .contents
                    .get(path)
                    .ok_or_else(|| FsError::NotFound(format!("{} has no content to save", path)))?
                    .to_string();
                file.write(&text)?;
                self.dirty.remove(path);
                self.notify(&format!("Saved file: {}", path.base_name()));
                tracing::info!(path = %path, bytes = text.len(), "saved file");
                Ok(())
            }
            Some(Handle::Dir(_)) => Err(FsError::NotFound(format!("{} is not a file", path))),
            None => {
                if self.contents.contains(path) {
                    // 纯内存：持久化靠会话快照
                    self.schedule_snapshot();
                    self.notify(&format!("Saved file: {}", path.base_name()));
                    Ok(())
                } else {
                    Err(FsError::NotFound(path.to_string()))
                }
            }
        }
    }

    /// 只有句柄背书的文件进脏集合；其余路径是无操作
    pub fn mark_dirty(&mut self, path: &VirtualPath) {
        if matches!(self.handles.get(path), Some(Handle::File(_))) {
            self.dirty.insert(path.clone());
        }
    }

    /// 编辑面对活动文件的变更通知。更新内容存储；句柄背书的标脏，
    /// 纯内存的排程会话快照。没有活动文件时忽略。
    pub fn content_changed(&mut self, text: &str) {
        let Some(active) = self.active.clone() else {
            return;
        };
        self.contents.insert(active.clone(), text.to_string());
        if matches!(self.handles.get(&active), Some(Handle::File(_))) {
            self.dirty.insert(active);
        } else {
            self.schedule_snapshot();
        }
    }

    // ---- 内部 ----

    fn notify(&mut self, message: &str) {
        let duration = self.config.notify_duration_ms;
        self.notifier.notify(message, duration);
    }

    /// 活动文件空缺时回退到打开列表首位；编辑面从内容存储同步，
    /// 不重读磁盘（关闭不该因为邻居不可读而失败）
    fn activate_fallback(&mut self) {
        self.active = self.open_files.first().cloned();
        if let Some(next) = self.active.clone() {
            let text = self.contents.get(&next).unwrap_or("").to_string();
            self.editor.set_text(&text);
            self.editor
                .set_language_hint(LanguageId::from_name(next.base_name()).hint());
        } else {
            self.editor.set_text("");
            self.editor.set_language_hint(LanguageId::PlainText.hint());
        }
    }

    /// 解析目录句柄：根为授权句柄，其余查缓存；未缓存时从根逐段
    /// 只开既有目录下走（绝不隐式创建），沿途登记句柄缓存
    fn resolve_dir_handle(&mut self, path: &VirtualPath) -> Result<DirHandleRef> {
        let root = match &self.root {
            Some(grant) => grant.handle.clone(),
            None => return Err(FsError::Unsupported("no folder capability granted".into())),
        };
        if path.is_root() {
            return Ok(root);
        }
        if let Some(handle) = self.handles.get(path) {
            return handle
                .as_dir()
                .cloned()
                .ok_or_else(|| FsError::NotFound(format!("{} is not a directory", path)));
        }
        let mut current = root;
        let mut walked = VirtualPath::root();
        for segment in path.as_str().split('/') {
            walked = walked.join(segment);
            current = match self.handles.get(&walked).cloned() {
                Some(Handle::Dir(dir)) => dir,
                Some(Handle::File(_)) => {
                    return Err(FsError::NotFound(format!("{} is not a directory", walked)));
                }
                None => {
                    let dir = current.open_dir(segment)?;
                    self.handles.put(walked.clone(), Handle::Dir(dir.clone()));
                    dir
                }
            };
        }
        Ok(current)
    }

    /// 把 (旧, 新) 路径对一次性应用到内容存储、脏集合、句柄缓存、
    /// 打开列表与活动文件。无失败路径。
    fn apply_remap(&mut self, pairs: &[(VirtualPath, VirtualPath)]) {
        for (old, new) in pairs {
            self.contents.rekey(old, new);
            self.dirty.rekey(old, new);
            self.handles.rekey(old, new);
            for open in &mut self.open_files {
                if open == old {
                    *open = new.clone();
                }
            }
            if self.active.as_ref() == Some(old) {
                self.active = Some(new.clone());
            }
        }
    }
}

/// 能力面没有原生改名/移动：建新文件、写入当前内容、删除旧文件。
/// 中途失败尽力回收已建的新文件后把错误上抛。
fn relocate_file(
    from_dir: &DirHandleRef,
    old_name: &str,
    to_dir: &DirHandleRef,
    new_name: &str,
    content: &str,
) -> Result<FileHandleRef> {
    let new_file = to_dir.create_file(new_name)?;
    if let Err(err) = new_file.write(content) {
        if let Err(cleanup) = to_dir.remove(new_name, false) {
            tracing::warn!(name = new_name, error = %cleanup, "cleanup after failed relocation write failed");
        }
        return Err(err);
    }
    if let Err(err) = from_dir.remove(old_name, false) {
        if let Err(cleanup) = to_dir.remove(new_name, false) {
            tracing::warn!(name = new_name, error = %cleanup, "cleanup after failed relocation remove failed");
        }
        return Err(err);
    }
    Ok(new_file)
}
