//! 会话持久化
//!
//! 两样东西进键值存储：去抖后的会话快照（纯内存文件内容、打开列表、
//! 活动路径）与根目录授权令牌。磁盘内容一律不入快照，重载后经令牌
//! 换回句柄重读。恢复流程不失败：任何一步坏了记日志、保住其余。

use super::Workspace;
use crate::models::language::{icon_for_name, IconKind};
use crate::models::path::VirtualPath;
use crate::models::tree::{ExpandState, NodeKind};
use crate::services::ports::storage::{ROOT_TOKEN_KEY, SNAPSHOT_KEY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// 持久化的会话文档。字段都带默认值，旧版本或残缺文档照常读。
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// 纯内存文件：虚拟路径到内容
    #[serde(default, rename = "memoryFiles")]
    pub memory_files: BTreeMap<String, String>,
    #[serde(default, rename = "openFiles")]
    pub open_files: Vec<String>,
    #[serde(default, rename = "activePath")]
    pub active_path: Option<String>,
}

/// 去抖计时与待激活文件
pub(crate) struct SessionService {
    deadline: Option<Instant>,
    pending_active: Option<VirtualPath>,
}

impl SessionService {
    pub(crate) fn new() -> Self {
        SessionService {
            deadline: None,
            pending_active: None,
        }
    }
}

impl Workspace {
    /// 快照相关状态变更后重置去抖窗口
    pub(crate) fn schedule_snapshot(&mut self) {
        self.session.deadline =
            Some(Instant::now() + Duration::from_millis(self.config.snapshot_debounce_ms));
    }

    /// 宿主空闲心跳：到期的快照落盘；编辑面就绪后补开待激活文件。
    /// 就绪是电平不是脉冲，每拍重查，先恢复后就绪也不会错过。
    pub fn tick(&mut self, now: Instant) {
        if self.session.deadline.is_some_and(|deadline| deadline <= now) {
            self.session.deadline = None;
            self.write_snapshot();
        }
        if self.session.pending_active.is_some() && self.editor.is_ready() {
            if let Some(path) = self.session.pending_active.take() {
                self.open_pending(path);
            }
        }
    }

    /// 立即落盘，不等去抖（宿主退出钩子用）
    pub fn flush_session(&mut self) {
        self.session.deadline = None;
        self.write_snapshot();
    }

    fn write_snapshot(&mut self) {
        let mut snapshot = SessionSnapshot::default();
        for (path, text) in self.contents.iter() {
            if !self.handles.contains(path) {
                snapshot
                    .memory_files
                    .insert(path.to_string(), text.to_string());
            }
        }
        snapshot.open_files = self.open_files.iter().map(|p| p.to_string()).collect();
        snapshot.active_path = self.active.as_ref().map(|p| p.to_string());

        match serde_json::to_string(&snapshot) {
            Ok(json) => {
                self.storage.set(SNAPSHOT_KEY, &json);
                tracing::debug!(
                    open = snapshot.open_files.len(),
                    memory = snapshot.memory_files.len(),
                    "session snapshot written"
                );
            }
            Err(err) => tracing::warn!(error = %err, "snapshot serialization failed"),
        }
    }

    /// 恢复上次会话：先回放快照（内存文件、标签、活动路径），再凭
    /// 令牌向授权代理换根目录句柄。令牌失效或被拒时保持纯内存状态，
    /// 已回放的内容不丢。
    pub fn restore_session(&mut self) {
        if let Some(raw) = self.storage.get(SNAPSHOT_KEY) {
            match serde_json::from_str::<SessionSnapshot>(&raw) {
                Ok(snapshot) => self.apply_snapshot(snapshot),
                Err(err) => {
                    tracing::warn!(error = %err, "session snapshot unreadable, starting clean");
                }
            }
        }

        if let Some(token) = self.storage.get(ROOT_TOKEN_KEY) {
            let attempt = self
                .broker
                .as_ref()
                .map(|broker| broker.restore_folder(&token));
            match attempt {
                Some(Ok(grant)) => {
                    let name = grant.handle.name().to_string();
                    if let Err(err) = self.open_folder(grant) {
                        tracing::warn!(folder = %name, error = %err, "restored folder failed to open, staying memory-only");
                    }
                }
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "folder re-authorization declined, staying memory-only");
                }
                None => tracing::debug!("no capability broker, skipping folder restore"),
            }
        }

        if self.editor.is_ready() {
            if let Some(path) = self.session.pending_active.take() {
                self.open_pending(path);
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: SessionSnapshot) {
        for (path, text) in snapshot.memory_files {
            let path = VirtualPath::new(path);
            self.ensure_memory_file_node(&path);
            self.contents.insert(path, text);
        }
        for path in snapshot.open_files {
            let path = VirtualPath::new(path);
            if !self.open_files.contains(&path) {
                self.open_files.push(path);
            }
        }
        if let Some(active) = snapshot.active_path.map(VirtualPath::new) {
            if self.open_files.contains(&active) {
                self.session.pending_active = Some(active);
            }
        }
        tracing::info!(
            open = self.open_files.len(),
            memory = self.contents.len(),
            "session snapshot applied"
        );
    }

    /// 打开恢复的活动文件。句柄还没浮现时先逐级展开祖先目录；
    /// 两边都不认识这条路径就把标签留着不动，避免凭空造出空文件。
    fn open_pending(&mut self, path: VirtualPath) {
        if self.has_root() && !self.handles.contains(&path) {
            let mut chain = Vec::new();
            let mut cursor = path.parent();
            while !cursor.is_root() {
                chain.push(cursor.clone());
                cursor = cursor.parent();
            }
            for dir in chain.iter().rev() {
                if let Err(err) = self.expand(dir) {
                    tracing::warn!(path = %dir, error = %err, "could not expand ancestor during restore");
                    break;
                }
            }
        }
        if !self.handles.contains(&path) && !self.contents.contains(&path) {
            tracing::warn!(path = %path, "restored active file is unreachable, leaving tab unopened");
            return;
        }
        if let Err(err) = self.open_file(&path) {
            tracing::warn!(path = %path, error = %err, "failed to reopen restored active file");
        }
    }

    /// 把恢复的内存文件挂回树里（含缺失的祖先目录节点）。
    /// 之后若成功恢复根目录，open_folder 的树重置会照常取代它们。
    fn ensure_memory_file_node(&mut self, path: &VirtualPath) {
        if path.is_root() || self.tree.find(path).is_some() {
            return;
        }
        let mut parent = self.tree.root();
        let mut walked = VirtualPath::root();
        let segments: Vec<&str> = path.as_str().split('/').collect();
        for (i, segment) in segments.iter().enumerate() {
            walked = walked.join(segment);
            if let Some(existing) = self.tree.find(&walked) {
                parent = existing;
                continue;
            }
            let inserted = if i + 1 == segments.len() {
                self.tree.insert_child(
                    parent,
                    segment,
                    NodeKind::File,
                    icon_for_name(segment),
                    ExpandState::Unexpanded,
                )
            } else {
                self.tree.insert_child(
                    parent,
                    segment,
                    NodeKind::Dir,
                    IconKind::Folder,
                    ExpandState::Expanded,
                )
            };
            match inserted {
                Ok(id) => parent = id,
                Err(err) => {
                    tracing::warn!(path = %walked, error = %err, "could not surface restored memory file");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ports::storage::KeyValueStore;
    use crate::workspace::harness::*;

    #[test]
    fn test_snapshot_debounce_coalesces_writes() {
        let mut fix = fixture_with(crate::workspace::WorkspaceConfig {
            snapshot_debounce_ms: 10_000,
            ..Default::default()
        });
        fix.ws.create_file("notes.txt", None).unwrap();
        type_text(&mut fix, "a");
        type_text(&mut fix, "ab");
        type_text(&mut fix, "abc");
        assert_eq!(fix.store.write_count(), 0);

        // 去抖窗口内的心跳不落盘
        fix.ws.tick(Instant::now());
        assert_eq!(fix.store.write_count(), 0);

        fix.ws.tick(Instant::now() + Duration::from_secs(60));
        assert_eq!(fix.store.write_count(), 1);

        // 没有新变更就不再写
        fix.ws.tick(Instant::now() + Duration::from_secs(120));
        assert_eq!(fix.store.write_count(), 1);

        type_text(&mut fix, "abcd");
        fix.ws.tick(Instant::now() + Duration::from_secs(180));
        assert_eq!(fix.store.write_count(), 2);
    }

    #[test]
    fn test_flush_session_writes_immediately() {
        let mut fix = fixture();
        fix.ws.create_file("notes.txt", None).unwrap();
        type_text(&mut fix, "text");
        assert!(fix.store.get(SNAPSHOT_KEY).is_none());

        fix.ws.flush_session();
        let raw = fix.store.get(SNAPSHOT_KEY).unwrap();
        assert!(raw.contains("notes.txt"));
    }

    #[test]
    fn test_snapshot_excludes_disk_backed_contents() {
        let mut fix = fixture();
        fix.ws.create_file("notes.txt", None).unwrap();
        type_text(&mut fix, "memory text");
        let g = grant(&fix);
        fix.ws.open_folder(g).unwrap();
        fix.ws.open_file(&p("readme.md")).unwrap();
        fix.ws.flush_session();

        let raw = fix.store.get(SNAPSHOT_KEY).unwrap();
        let snapshot: SessionSnapshot = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            snapshot.memory_files.get("notes.txt").map(String::as_str),
            Some("memory text")
        );
        assert!(!snapshot.memory_files.contains_key("readme.md"));
        assert_eq!(snapshot.open_files, vec!["notes.txt", "readme.md"]);
        assert_eq!(snapshot.active_path.as_deref(), Some("readme.md"));
    }

    #[test]
    fn test_restore_roundtrip_memory_workspace() {
        let mut fix = fixture();
        fix.ws.create_file("notes.txt", None).unwrap();
        type_text(&mut fix, "remember me");
        fix.ws.flush_session();

        let mut next = reload(&fix);
        next.ws.restore_session();

        assert_eq!(next.ws.content(&p("notes.txt")), Some("remember me"));
        assert_eq!(next.ws.open_files(), &[p("notes.txt")]);
        assert_eq!(next.ws.active_path(), Some(&p("notes.txt")));
        assert_eq!(next.surface.borrow().text, "remember me");
        // 恢复的内存文件回到树里
        assert!(next.ws.tree().find(&p("notes.txt")).is_some());
    }

    #[test]
    fn test_restore_reacquires_folder_and_reopens_nested_active() {
        let mut fix = opened_fixture();
        fix.ws.expand(&p("src")).unwrap();
        fix.ws.open_file(&p("src/main.js")).unwrap();
        fix.ws.flush_session();

        let mut next = reload(&fix);
        next.ws.restore_session();

        assert!(next.ws.has_root());
        assert_eq!(next.ws.root_name(), Some("project"));
        assert_eq!(next.ws.open_files(), &[p("src/main.js")]);
        // 活动文件经祖先展开重新拿到句柄，内容来自磁盘
        assert_eq!(next.ws.active_path(), Some(&p("src/main.js")));
        assert_eq!(next.surface.borrow().text, "console.log(1);\n");
        assert!(next.ws.tree().find(&p("src/main.js")).is_some());
    }

    #[test]
    fn test_restore_declined_grant_keeps_memory_state() {
        let mut fix = fixture();
        fix.ws.create_file("notes.txt", None).unwrap();
        type_text(&mut fix, "survives");
        let g = grant(&fix);
        fix.ws.open_folder(g).unwrap();
        fix.ws.open_file(&p("readme.md")).unwrap();
        fix.ws.flush_session();

        let mut next = reload(&fix);
        next.broker.set_deny(true);
        next.ws.restore_session();

        assert!(!next.ws.has_root());
        assert_eq!(next.ws.content(&p("notes.txt")), Some("survives"));
        // 标签保留；磁盘背书的活动文件拿不到内容，不凭空开空文件
        assert_eq!(next.ws.open_files(), &[p("notes.txt"), p("readme.md")]);
        assert_eq!(next.ws.active_path(), None);
        assert_eq!(next.ws.content(&p("readme.md")), None);
    }

    #[test]
    fn test_restore_corrupt_snapshot_starts_clean() {
        let fix = fixture();
        let mut store = fix.store.clone();
        {
            use crate::services::ports::storage::KeyValueStore;
            store.set(SNAPSHOT_KEY, "{definitely not json");
        }

        let mut next = reload(&fix);
        next.ws.restore_session();
        assert!(next.ws.open_files().is_empty());
        assert_eq!(next.ws.active_path(), None);

        // 之后照常工作
        next.ws.create_file("fresh.txt", None).unwrap();
        assert!(next.ws.is_open(&p("fresh.txt")));
    }

    #[test]
    fn test_pending_active_waits_for_editor_readiness() {
        let mut fix = fixture();
        fix.ws.create_file("notes.txt", None).unwrap();
        type_text(&mut fix, "late bloomer");
        fix.ws.flush_session();

        let mut next = reload(&fix);
        next.surface.borrow_mut().ready = false;
        next.ws.restore_session();
        assert_eq!(next.ws.active_path(), None);

        next.ws.tick(Instant::now());
        assert_eq!(next.ws.active_path(), None);

        next.surface.borrow_mut().ready = true;
        next.ws.tick(Instant::now());
        assert_eq!(next.ws.active_path(), Some(&p("notes.txt")));
        assert_eq!(next.surface.borrow().text, "late bloomer");

        // 只补开一次
        let calls = next.surface.borrow().set_text_calls;
        next.ws.tick(Instant::now());
        assert_eq!(next.surface.borrow().set_text_calls, calls);
    }
}
