use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use xhtpress::test_utils::SiteFixture;

fn xhtpress() -> Command {
    let mut cmd = Command::cargo_bin("xhtpress").unwrap();
    cmd.env_remove("XHTPRESS_CONFIG").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_build_command_writes_pages() {
    let site = SiteFixture::new().unwrap();
    site.config("[site]\nname = \"CLI\"\n").unwrap();
    site.template("page.xht", "<h1>{{site.name}}</h1>{{content}}").unwrap();
    site.content("home.txt", "body").unwrap();

    xhtpress()
        .current_dir(site.root())
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("Built").and(predicate::str::contains("1 page(s)")));

    assert_eq!(site.read_output("home.html").unwrap(), "<h1>CLI</h1>body");
}

#[test]
fn test_build_quiet_prints_nothing() {
    let site = SiteFixture::new().unwrap();
    site.template("page.xht", "x").unwrap();
    site.content("a.txt", "").unwrap();

    xhtpress()
        .current_dir(site.root())
        .args(["build", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_build_with_explicit_config_path() {
    let site = SiteFixture::new().unwrap();
    site.write("conf/site.toml", "content_dir = \"../content\"\ntemplate_dir = \"../tmpl\"\noutput_dir = \"../out\"\n")
        .unwrap();
    site.template("page.xht", "[{{id}}]").unwrap();
    site.content("p.txt", "").unwrap();

    xhtpress()
        .current_dir(site.root())
        .args(["--config", "conf/site.toml", "build"])
        .assert()
        .success();

    assert_eq!(fs::read_to_string(site.root().join("out/p.html")).unwrap(), "[p]");
}

#[test]
fn test_missing_config_file_is_reported() {
    let site = SiteFixture::new().unwrap();
    xhtpress()
        .current_dir(site.root())
        .args(["--config", "missing.toml", "build"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("missing.toml").and(predicate::str::contains("suggestion")));
}

#[test]
fn test_missing_content_dir_is_reported() {
    let site = SiteFixture::new().unwrap();
    site.config("content_dir = \"pages\"\n").unwrap();

    xhtpress()
        .current_dir(site.root())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Content directory"));
}

#[test]
fn test_render_inline_template_with_data() {
    let site = SiteFixture::new().unwrap();
    site.write("data.json", r#"{"items": [1, 2, 3], "price": 4}"#).unwrap();

    xhtpress()
        .current_dir(site.root())
        .args([
            "render",
            "--inline",
            "--data",
            "data.json",
            "{%EACH items%}[{{value}}]{%ENDEACH%} {{price|fixed}} {{missing}}",
        ])
        .assert()
        .success()
        .stdout("[1][2][3] 4.00 {{missing}}");
}

#[test]
fn test_render_named_template() {
    let site = SiteFixture::new().unwrap();
    site.template("card.xht", "<b>{{name}}</b>{{$ test a=\"1\" $}}").unwrap();
    site.write("data.json", r#"{"name": "Ada"}"#).unwrap();

    xhtpress()
        .current_dir(site.root())
        .args(["render", "card", "--data", "data.json", "--no-widgets"])
        .assert()
        .success()
        .stdout("<b>Ada</b>{{$ test a=\"1\" $}}");

    xhtpress()
        .current_dir(site.root())
        .args(["render", "card", "--data", "data.json"])
        .assert()
        .success()
        .stdout(
            predicate::str::starts_with("<b>Ada</b>{")
                .and(predicate::str::contains("\"a\": \"1\""))
                .and(predicate::str::contains("\"name\": \"Ada\"")),
        );
}

#[test]
fn test_render_include_cycle_fails() {
    let site = SiteFixture::new().unwrap();
    site.template("loop.xht", "{% loop %}").unwrap();

    xhtpress()
        .current_dir(site.root())
        .args(["render", "loop"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Include depth exceeded"));
}
