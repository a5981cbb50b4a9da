//! 数据模型层

pub mod language;
pub mod path;
pub mod tree;

pub use language::{icon_for_name, IconKind, LanguageId};
pub use path::VirtualPath;
pub use tree::{should_ignore, ExpandState, NodeId, NodeKind, TreeError, TreeRow, WorkspaceTree};
