//! 语言提示与文件图标分类
//!
//! 纯扩展名查表，不做内容嗅探。未知扩展回退纯文本 / 通用代码图标。

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageId {
    Html,
    Css,
    JavaScript,
    TypeScript,
    Json,
    Markdown,
    Python,
    Java,
    C,
    Cpp,
    CSharp,
    Go,
    Php,
    Ruby,
    Rust,
    Swift,
    Sql,
    Xml,
    Yaml,
    PlainText,
}

impl LanguageId {
    /// 按文件名扩展判定语言
    pub fn from_name(name: &str) -> Self {
        match extension_of(name).as_str() {
            "html" | "htm" => Self::Html,
            "css" => Self::Css,
            "js" | "jsx" => Self::JavaScript,
            "ts" | "tsx" => Self::TypeScript,
            "json" => Self::Json,
            "md" => Self::Markdown,
            "py" => Self::Python,
            "java" => Self::Java,
            "c" => Self::C,
            "cpp" => Self::Cpp,
            "cs" => Self::CSharp,
            "go" => Self::Go,
            "php" => Self::Php,
            "rb" => Self::Ruby,
            "rs" => Self::Rust,
            "swift" => Self::Swift,
            "sql" => Self::Sql,
            "xml" => Self::Xml,
            "yaml" | "yml" => Self::Yaml,
            _ => Self::PlainText,
        }
    }

    /// 编辑器语言标识字符串
    pub fn hint(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Css => "css",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Json => "json",
            Self::Markdown => "markdown",
            Self::Python => "python",
            Self::Java => "java",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::CSharp => "csharp",
            Self::Go => "go",
            Self::Php => "php",
            Self::Ruby => "ruby",
            Self::Rust => "rust",
            Self::Swift => "swift",
            Self::Sql => "sql",
            Self::Xml => "xml",
            Self::Yaml => "yaml",
            Self::PlainText => "plaintext",
        }
    }
}

/// 资源管理器里的文件图标分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconKind {
    Folder,
    Image,
    Pdf,
    Document,
    Spreadsheet,
    Presentation,
    Archive,
    Audio,
    Video,
    Text,
    Script,
    Database,
    Config,
    Code,
}

/// 按文件名扩展分类图标；目录节点由树直接赋 Folder
pub fn icon_for_name(name: &str) -> IconKind {
    match extension_of(name).as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "svg" | "webp" | "bmp" | "ico" => IconKind::Image,
        "pdf" => IconKind::Pdf,
        "doc" | "docx" | "rtf" | "odt" => IconKind::Document,
        "xls" | "xlsx" | "ods" | "csv" => IconKind::Spreadsheet,
        "ppt" | "pptx" | "odp" => IconKind::Presentation,
        "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" => IconKind::Archive,
        "mp3" | "wav" | "ogg" | "flac" | "aac" => IconKind::Audio,
        "mp4" | "avi" | "mov" | "wmv" | "mkv" | "webm" => IconKind::Video,
        "txt" | "md" | "markdown" | "log" => IconKind::Text,
        "sh" | "bash" | "zsh" | "fish" | "bat" | "ps1" => IconKind::Script,
        "sql" | "db" | "sqlite" => IconKind::Database,
        "json" | "xml" | "yaml" | "yml" | "toml" | "ini" | "conf" => IconKind::Config,
        _ => IconKind::Code,
    }
}

fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(idx) => name[idx + 1..].to_ascii_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_name() {
        assert_eq!(LanguageId::from_name("app.js"), LanguageId::JavaScript);
        assert_eq!(LanguageId::from_name("App.JSX"), LanguageId::JavaScript);
        assert_eq!(LanguageId::from_name("lib.rs"), LanguageId::Rust);
        assert_eq!(LanguageId::from_name("index.tsx"), LanguageId::TypeScript);
        assert_eq!(LanguageId::from_name("Makefile"), LanguageId::PlainText);
        assert_eq!(LanguageId::from_name("data.weird"), LanguageId::PlainText);
    }

    #[test]
    fn test_language_hint_strings() {
        assert_eq!(LanguageId::from_name("a.md").hint(), "markdown");
        assert_eq!(LanguageId::from_name("a.yml").hint(), "yaml");
        assert_eq!(LanguageId::from_name("noext").hint(), "plaintext");
    }

    #[test]
    fn test_icon_for_name() {
        assert_eq!(icon_for_name("photo.PNG"), IconKind::Image);
        assert_eq!(icon_for_name("notes.txt"), IconKind::Text);
        assert_eq!(icon_for_name("backup.tar"), IconKind::Archive);
        assert_eq!(icon_for_name("settings.toml"), IconKind::Config);
        assert_eq!(icon_for_name("main.rs"), IconKind::Code);
        assert_eq!(icon_for_name("no_extension"), IconKind::Code);
    }
}
