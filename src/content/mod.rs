//! Content files.
//!
//! Every file in the content directory is one page. A file may start with a
//! frontmatter block holding a JSON object; the surrounding braces are optional:
//!
//! ```text
//! ---
//! "title": "About",
//! "template": "article"
//! ---
//! Written by {{page.author}}.
//! ```
//!
//! The rest of the file is the page body. Before the page template runs, the
//! body's plain `{{path}}` tokens are substituted once against the page scope
//! (see [`Content::scope`]). This is a single, simple pass: no filters, no
//! directives, and any token whose value is missing or falsy stays as written.

use chrono::{DateTime, Utc};
use gray_matter::engine::Engine;
use gray_matter::{Matter, Pod};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use crate::config::SiteConfig;
use crate::core::file_error::{FileOperation, FileOperationError, FileResultExt};
use crate::templating::loose;
use crate::templating::scope::resolve;

/// gray_matter engine that hands back the frontmatter text untouched; it is
/// parsed as JSON afterwards.
struct RawFrontmatter;

impl Engine for RawFrontmatter {
    fn parse(content: &str) -> Result<Pod, gray_matter::Error> {
        Ok(Pod::String(content.to_string()))
    }
}

/// File system facts about a content file, exposed to templates as `file.*`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileMeta {
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
}

impl FileMeta {
    fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        let modified = metadata.modified().ok().map(DateTime::<Utc>::from);
        Self {
            size: metadata.len(),
            modified: modified.map(|time| time.to_rfc3339()),
            modified_ms: modified.map(|time| time.timestamp_millis()),
            created: metadata.created().ok().map(rfc3339),
        }
    }
}

fn rfc3339(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339()
}

/// One loaded content file.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    /// File name without its extension; names the output page.
    pub id: String,
    pub path: PathBuf,
    pub frontmatter: Map<String, Value>,
    pub body: String,
    pub meta: FileMeta,
}

impl Content {
    /// Read a content file and split off its frontmatter.
    ///
    /// Unparsable frontmatter is logged and the whole file becomes the body.
    pub async fn load(path: &Path) -> Result<Self, FileOperationError> {
        let raw = tokio::fs::read_to_string(path).await.with_file_context(
            FileOperation::Read,
            path,
            "loading content",
        )?;
        let metadata = tokio::fs::metadata(path).await.with_file_context(
            FileOperation::Metadata,
            path,
            "reading content file metadata",
        )?;

        let mut content = Self::parse(path, &raw);
        content.meta = FileMeta::from_metadata(&metadata);
        Ok(content)
    }

    /// Build content from text already in memory. `meta` is left empty.
    pub fn parse(path: &Path, raw: &str) -> Self {
        let id = path.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default();

        let (frontmatter, body) = match split_frontmatter(raw) {
            Some((text, body)) => match parse_frontmatter(&text) {
                Ok(frontmatter) => (frontmatter, body),
                Err(reason) => {
                    tracing::warn!("Bad frontmatter in '{}': {}", path.display(), reason);
                    (Map::new(), raw.to_string())
                }
            },
            None => (Map::new(), raw.to_string()),
        };

        Self {
            id,
            path: path.to_path_buf(),
            frontmatter,
            body,
            meta: FileMeta::default(),
        }
    }

    /// The page scope.
    ///
    /// Built up in layers, later layers winning:
    /// 1. `{ "id": …, "page": {} }`
    /// 2. the whole site configuration ([`SiteConfig::globals`])
    /// 3. `page` = the config's `page` table overlaid with this file's
    ///    frontmatter, and `file` = [`FileMeta`]
    ///
    /// The body, with its `{{path}}` tokens substituted against that scope, is
    /// then stored as `content`.
    pub fn scope(&self, config: &SiteConfig) -> Value {
        let mut data = Map::new();
        data.insert("id".to_string(), Value::String(self.id.clone()));
        data.insert("page".to_string(), Value::Object(Map::new()));
        data.extend(config.globals());

        let mut page = config.page.clone();
        page.extend(self.frontmatter.clone());
        data.insert("page".to_string(), Value::Object(page));
        data.insert(
            "file".to_string(),
            serde_json::to_value(&self.meta).unwrap_or(Value::Null),
        );

        let mut scope = Value::Object(data);
        let content = substitute(&self.body, &scope);
        if let Value::Object(map) = &mut scope {
            map.insert("content".to_string(), Value::String(content));
        }
        scope
    }

    /// The template this page asks for: `page.template`, falling back to the
    /// configured default when it is unset, `null` or empty. `None` when it is
    /// some other non-string value.
    pub fn template_name<'a>(&self, scope: &'a Value, config: &'a SiteConfig) -> Option<&'a str> {
        match scope.pointer("/page/template") {
            None | Some(Value::Null) => Some(config.default_template.as_str()),
            Some(Value::String(name)) if name.trim().is_empty() => Some(config.default_template.as_str()),
            Some(Value::String(name)) => Some(name.trim()),
            Some(_) => None,
        }
    }
}

/// Split `---` fenced frontmatter from the body. Returns the frontmatter text
/// (without fences) and the body.
fn split_frontmatter(raw: &str) -> Option<(String, String)> {
    // Single-line form: ---{"title": "x"}---
    if let Some(first_line) = raw.lines().next() {
        let line = first_line.trim_end();
        if line.len() > 6 && line.starts_with("---") && line.ends_with("---") {
            let body = raw[first_line.len()..].trim_start_matches(['\r', '\n']);
            return Some((line[3..line.len() - 3].to_string(), body.to_string()));
        }
    }

    let matter = Matter::<RawFrontmatter>::new();
    let parsed = matter.parse::<String>(raw).ok()?;
    let text = parsed.data.filter(|text| !text.trim().is_empty())?;
    let body = parsed.content.strip_prefix("\r\n").or_else(|| parsed.content.strip_prefix('\n'));
    let body = body.map_or_else(|| parsed.content.clone(), str::to_string);
    Some((text, body))
}

fn parse_frontmatter(text: &str) -> Result<Map<String, Value>, String> {
    let trimmed = text.trim();
    let json = if trimmed.starts_with('{') {
        trimmed.to_string()
    } else {
        format!("{{{trimmed}}}")
    };

    match serde_json::from_str::<Value>(&json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, found {other}")),
        Err(error) => Err(error.to_string()),
    }
}

fn token_pattern() -> Option<&'static Regex> {
    static TOKEN: OnceLock<Option<Regex>> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"(?i)\{\{([a-z0-9_.]*)\}\}").ok()).as_ref()
}

/// Replace `{{path}}` tokens in `body` with values from `scope`.
///
/// Missing values and falsy ones (`null`, `false`, `0`, `""`) keep the token.
pub fn substitute(body: &str, scope: &Value) -> String {
    let Some(pattern) = token_pattern() else {
        return body.to_string();
    };

    pattern
        .replace_all(body, |captures: &regex::Captures<'_>| {
            let token = &captures[0];
            let path = &captures[1];
            if path.is_empty() {
                return token.to_string();
            }
            match resolve(path, scope) {
                Some(value) if !is_falsy(&value) => loose::to_text(&value),
                _ => token.to_string(),
            }
        })
        .into_owned()
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64().is_none_or(|n| n == 0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_fenced_frontmatter_without_braces() {
        let raw = "---\n\"title\": \"About\",\n\"template\": \"article\"\n---\nHello";
        let content = Content::parse(Path::new("content/about.txt"), raw);

        assert_eq!(content.id, "about");
        assert_eq!(content.frontmatter.get("title"), Some(&json!("About")));
        assert_eq!(content.frontmatter.get("template"), Some(&json!("article")));
        assert_eq!(content.body.trim(), "Hello");
    }

    #[test]
    fn test_parse_fenced_frontmatter_with_braces() {
        let raw = "---\n{\"title\": \"Home\"}\n---\nBody";
        let content = Content::parse(Path::new("index.html"), raw);
        assert_eq!(content.frontmatter.get("title"), Some(&json!("Home")));
        assert_eq!(content.body.trim(), "Body");
    }

    #[test]
    fn test_parse_single_line_frontmatter() {
        let raw = "---{\"title\": \"Inline\"}---\nBody";
        let content = Content::parse(Path::new("inline.xht"), raw);
        assert_eq!(content.frontmatter.get("title"), Some(&json!("Inline")));
        assert_eq!(content.body, "Body");
    }

    #[test]
    fn test_bad_frontmatter_keeps_whole_file() {
        let raw = "---\nnot json at all\n---\nBody";
        let content = Content::parse(Path::new("bad.txt"), raw);
        assert!(content.frontmatter.is_empty());
        assert_eq!(content.body, raw);
    }

    #[test]
    fn test_no_frontmatter() {
        let content = Content::parse(Path::new("plain.txt"), "Just text");
        assert!(content.frontmatter.is_empty());
        assert_eq!(content.body, "Just text");
    }

    #[test]
    fn test_scope_layers() {
        let mut config = SiteConfig::default();
        config.site.insert("name".to_string(), json!("Example"));
        config.page.insert("author".to_string(), json!("Jane"));
        config.page.insert("template".to_string(), json!("page"));

        let raw = "---\n\"title\": \"About\", \"template\": \"article\"\n---\n{{page.title}} by {{page.author}} on {{site.name}} {{missing}}";
        let content = Content::parse(Path::new("about.txt"), raw);
        let scope = content.scope(&config);

        assert_eq!(scope["id"], json!("about"));
        assert_eq!(scope["site"]["name"], json!("Example"));
        assert_eq!(scope["page"]["template"], json!("article"));
        assert_eq!(scope["page"]["author"], json!("Jane"));
        assert_eq!(scope["content"].as_str().unwrap().trim(), "About by Jane on Example {{missing}}");
        assert_eq!(content.template_name(&scope, &config), Some("article"));
    }

    #[test]
    fn test_template_name_fallback_and_invalid() {
        let config = SiteConfig::default();
        let content = Content::parse(Path::new("a.txt"), "x");

        let scope = json!({"page": {}});
        assert_eq!(content.template_name(&scope, &config), Some("page"));

        let scope = json!({"page": {"template": 3}});
        assert_eq!(content.template_name(&scope, &config), None);
    }

    #[test]
    fn test_substitute_keeps_falsy_tokens() {
        let scope = json!({"zero": 0, "empty": "", "no": false, "n": null, "yes": "y", "list": [1, 2]});
        assert_eq!(
            substitute("{{zero}}|{{empty}}|{{no}}|{{n}}|{{yes}}|{{list}}|{{}}|{{ yes }}", &scope),
            "{{zero}}|{{empty}}|{{no}}|{{n}}|y|1,2|{{}}|{{ yes }}"
        );
    }

    #[tokio::test]
    async fn test_load_reads_metadata() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("news.txt");
        tokio::fs::write(&path, "hello").await.unwrap();

        let content = Content::load(&path).await.unwrap();
        assert_eq!(content.id, "news");
        assert_eq!(content.meta.size, 5);
        assert!(content.meta.modified.is_some());
        assert!(content.meta.modified_ms.is_some());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let error = Content::load(&temp_dir.path().join("missing.txt")).await.unwrap_err();
        assert!(error.is_not_found());
        assert_eq!(error.operation, FileOperation::Read);
    }
}
