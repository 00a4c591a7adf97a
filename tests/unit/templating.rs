use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use xhtpress::templating::scope::resolve;
use xhtpress::templating::{
    Registry, Scope, TemplateEngine, TemplateError, WidgetArgs, process_segment, resolve_widgets,
};

fn render(template: &str, data: Value) -> String {
    process_segment(template, &Scope::new(data), &Registry::with_builtins(), false)
}

#[test]
fn test_scope_resolution() {
    let scope = json!({"a": {"b": {"c": 5}}});
    assert_eq!(resolve("a.b.c", &scope).as_deref(), Some(&json!(5)));
    assert_eq!(resolve("a.x.c", &scope), None);
    assert_eq!(resolve("", &scope).as_deref(), Some(&scope));
}

#[test]
fn test_directive_free_text_renders_verbatim() {
    let text = "<p>Prices: 10% off {today}</p>\n<script>if (a) { b(); }</script>";
    for data in [json!({}), json!({"today": "x"}), json!([1, 2]), json!("s")] {
        assert_eq!(render(text, data), text);
    }
}

#[test]
fn test_list_page() {
    let template = "<ul>{%EACH posts%}<li>{%IF draft%}[draft] {%ENDIF%}{{title|slug}}</li>{%ENDEACH%}</ul>\
                    {%IF posts.length > 1%}<p>{{posts.length}} posts</p>{%ENDIF%}";
    let data = json!({"posts": [
        {"title": "Hello World", "draft": false},
        {"title": "Second Post!", "draft": true},
    ]});
    assert_eq!(
        render(template, data),
        "<ul><li>hello-world</li><li>[draft] second-post-</li></ul><p>2 posts</p>"
    );
}

#[test]
fn test_custom_filter_registration() {
    let mut registry = Registry::with_builtins();
    registry.register_filter("upper", |value: &Value| {
        value.as_str().unwrap_or_default().to_uppercase()
    });
    let scope = Scope::new(json!({"name": "ada"}));
    assert_eq!(process_segment("{{ name | upper }}", &scope, &registry, false), "ADA");
    assert_eq!(
        process_segment("{{ name | upper }}", &scope, &Registry::new(), false),
        "ada"
    );
}

#[test]
fn test_preserve_keeps_unresolved_conditionals() {
    let registry = Registry::with_builtins();
    let scope = Scope::new(json!({"known": true}));
    let template = "{%IF known%}K{%ENDIF%}{%IF later%}L{%ENDIF%}";
    assert_eq!(process_segment(template, &scope, &registry, true), "K{%IF later%}L{%ENDIF%}");
    assert_eq!(process_segment(template, &scope, &registry, false), "K");
}

#[test]
fn test_engine_composes_includes() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("page.xht"), "{% head %}<body>{{content}}</body>").unwrap();
    std::fs::write(temp_dir.path().join("head.xht"), "<head><title>{{title}}</title></head>").unwrap();

    let engine = TemplateEngine::builder().template_dir(temp_dir.path()).build().unwrap();
    let scope = Scope::new(json!({"title": "T", "content": "C"}));
    assert_eq!(
        engine.render("page", &scope).unwrap(),
        "<head><title>T</title></head><body>C</body>"
    );
}

#[test]
fn test_engines_do_not_share_caches() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("a.xht"), "A").unwrap();

    let first = TemplateEngine::builder().template_dir(temp_dir.path()).build().unwrap();
    let second = TemplateEngine::builder().template_dir(temp_dir.path()).build().unwrap();
    first.render("a", &Scope::new(json!({}))).unwrap();

    assert_eq!(first.cached_templates().len(), 1);
    assert!(second.cached_templates().is_empty());
}

#[tokio::test]
async fn test_widgets_land_in_their_own_slots() {
    let mut registry = Registry::new();
    registry.register_widget("a", |_: WidgetArgs| async {
        tokio::time::sleep(Duration::from_millis(40)).await;
        Ok("slow".to_string())
    });
    registry.register_widget("b", |_: WidgetArgs| async { Ok("fast".to_string()) });

    let scope = Scope::new(json!({}));
    let output = resolve_widgets("<{{$ a $}}|{{$ b $}}>", &scope, &registry).await.unwrap();
    assert_eq!(output, "<slow|fast>");
}

#[tokio::test]
async fn test_builtin_test_widget_echoes_arguments() {
    let registry = Arc::new(Registry::with_builtins());
    let scope = Scope::new(json!({"page": {"id": "gallery"}}));
    let output = resolve_widgets(r#"{{$ test size="2" $}}"#, &scope, &registry).await.unwrap();
    let echoed: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(echoed, json!({"scope": {"page": {"id": "gallery"}}, "size": "2"}));
}

#[test]
fn test_missing_template_error_names_path() {
    let temp_dir = TempDir::new().unwrap();
    let engine = TemplateEngine::builder().template_dir(temp_dir.path()).build().unwrap();
    let error = engine.render("absent", &Scope::new(json!({}))).unwrap_err();
    assert!(matches!(error, TemplateError::Load { .. }));
    assert!(error.to_string().contains("absent.xht"));
}
