use serde_json::json;
use std::path::Path;
use xhtpress::config::SiteConfig;
use xhtpress::content::{Content, substitute};

#[test]
fn test_frontmatter_overrides_page_defaults() {
    let config: SiteConfig = toml::from_str(
        r#"
        [site]
        name = "Example"

        [page]
        author = "Site Author"
        lang = "en"
        "#,
    )
    .unwrap();

    let content = Content::parse(
        Path::new("content/post.txt"),
        "---\n\"author\": \"Guest\", \"tags\": [\"a\", \"b\"]\n---\nBy {{page.author}} ({{page.lang}}) on {{site.name}}",
    );
    let scope = content.scope(&config);

    assert_eq!(scope["page"]["author"], json!("Guest"));
    assert_eq!(scope["page"]["lang"], json!("en"));
    assert_eq!(scope["page"]["tags"], json!(["a", "b"]));
    assert_eq!(scope["content"], json!("By Guest (en) on Example"));
}

#[test]
fn test_body_substitution_is_a_single_plain_pass() {
    let scope = json!({"a": "{{b}}", "b": "B", "n": 3});
    assert_eq!(substitute("{{a}} {{n}} {{ n }} {{n|fixed}}", &scope), "{{b}} 3 {{ n }} {{n|fixed}}");
}
