use std::sync::Arc;
use xhtpress::builder::SiteBuilder;
use xhtpress::templating::{Registry, WidgetArgs};
use xhtpress::test_utils::{SiteFixture, init_test_logging};

#[tokio::test]
async fn test_site_with_partials_loops_and_widgets() {
    init_test_logging(None);
    let site = SiteFixture::new().unwrap();
    site.config(
        r#"
        default_template = "page"
        widgets = ["year"]

        [site]
        name = "Garden"
        menu = [{ label = "Home", href = "/" }, { label = "Plants", href = "/plants.html" }]

        [page]
        author = "Editors"
        "#,
    )
    .unwrap();
    site.template("page.xht", "<html>{% partials/head %}<body>{% partials/menu %}<main>{{content}}</main>{{$ year $}}</body></html>")
        .unwrap();
    site.template("partials/head.xht", "<head><title>{{page.title}} | {{site.name}}</title></head>")
        .unwrap();
    site.template("partials/menu.xht", "<nav>{%EACH site.menu%}{% item %}{%ENDEACH%}</nav>")
        .unwrap();
    site.template("partials/item.xht", "<a href=\"{{href}}\">{{label}}</a>").unwrap();
    site.content("index.txt", "---\n\"title\": \"Welcome\"\n---\nHello from {{page.author}}.")
        .unwrap();
    site.content(
        "plants.txt",
        "---\n{\"title\": \"Plants\", \"author\": \"Botanist\"}\n---\nWritten by {{page.author}}.",
    )
    .unwrap();

    let mut registry = Registry::with_builtins();
    registry.register_widget("year", |_: WidgetArgs| async { Ok("<footer>2024</footer>".to_string()) });

    let config = site.load_config().await.unwrap();
    let builder = SiteBuilder::new(config, Arc::new(registry)).unwrap();
    let report = builder.build().await.unwrap();
    assert_eq!(report.page_count(), 2);

    let menu = "<nav><a href=\"/\">Home</a><a href=\"/plants.html\">Plants</a></nav>";
    assert_eq!(
        site.read_output("index.html").unwrap(),
        format!(
            "<html><head><title>Welcome | Garden</title></head><body>{menu}<main>Hello from Editors.</main><footer>2024</footer></body></html>"
        )
    );
    assert_eq!(
        site.read_output("plants.html").unwrap(),
        format!(
            "<html><head><title>Plants | Garden</title></head><body>{menu}<main>Written by Botanist.</main><footer>2024</footer></body></html>"
        )
    );

    // Both pages share one engine, so each template was read once.
    assert_eq!(builder.engine().cached_templates().len(), 4);
}

#[tokio::test]
async fn test_output_extension_and_directory_are_configurable() {
    let site = SiteFixture::new().unwrap();
    site.config("output_dir = \"public\"\noutput_extension = \"htm\"\n").unwrap();
    site.template("page.xht", "{{id}}").unwrap();
    site.content("a.txt", "").unwrap();

    let config = site.load_config().await.unwrap();
    SiteBuilder::new(config, Arc::new(Registry::with_builtins()))
        .unwrap()
        .build()
        .await
        .unwrap();

    let written = std::fs::read_to_string(site.root().join("public/a.htm")).unwrap();
    assert_eq!(written, "a");
}

#[tokio::test]
async fn test_missing_template_fails_build() {
    let site = SiteFixture::new().unwrap();
    site.content("a.txt", "---\n\"template\": \"nowhere\"\n---\nx").unwrap();

    let config = site.load_config().await.unwrap();
    let error = SiteBuilder::new(config, Arc::new(Registry::with_builtins()))
        .unwrap()
        .build()
        .await
        .unwrap_err();
    assert!(format!("{error:#}").contains("nowhere.xht"));
}
