use std::fs;
use std::path::Path;

use hexo_widgets::{Engine, WidgetError};

const CONFIG: &str = r#"
title: Widget Site
url: http://example.com
root: /blog/
authors:
  alice: Alice
placeholders:
  rust:
    - type: latest_entries
      categories: [programming]
      subcategories: true
  tagged:
    - type: latest_entries
      tags: [go, python]
  by_author:
    - type: latest_entries
      authors: [alice]
      number_of_entries: 1
  picked:
    - type: selected_entries
      entries: [python-notes, missing, rust-ownership]
  search:
    - type: query_entries
      query: "tag:rust OR title:never"
  lucky:
    - type: random_entries
      number_of_entries: 2
      template_to_render: widgets/entry_list.html
"#;

fn write_post(dir: &Path, name: &str, front: &str, body: &str) {
    fs::write(dir.join(name), format!("---\n{}---\n\n{}\n", front, body)).unwrap();
}

fn site() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let posts = dir.path().join("source/_posts");
    fs::create_dir_all(&posts).unwrap();
    fs::write(dir.path().join("_config.yml"), CONFIG).unwrap();

    write_post(
        &posts,
        "rust-ownership.md",
        "title: Rust Ownership\ndate: 2024-03-01 10:00:00\nauthor: alice\ncategories:\n  - Programming\n  - Rust\ntags: [rust]\n",
        "Borrowing rules.",
    );
    write_post(
        &posts,
        "python-notes.md",
        "title: Python Notes\ndate: 2024-02-01 10:00:00\nauthor: bob\ncategories: Programming\ntags: [python]\n",
        "Indentation.",
    );
    write_post(
        &posts,
        "go-tips.md",
        "title: Go Tips\ndate: 2024-01-01 10:00:00\nauthor: alice\ncategories: Misc\ntags: [Go, python]\n",
        "Goroutines.",
    );
    write_post(
        &posts,
        "draft.md",
        "title: Secret Draft\ndate: 2024-04-01 10:00:00\ndraft: true\ntags: [rust, go]\ncategories: Programming\n",
        "Not yet.",
    );
    dir
}

fn titles(html: &str) -> Vec<&str> {
    ["Rust Ownership", "Python Notes", "Go Tips", "Secret Draft"]
        .into_iter()
        .filter(|t| html.contains(t))
        .collect()
}

#[test]
fn test_entries_loaded_from_posts_dir() {
    let dir = site();
    let engine = Engine::new(dir.path().to_path_buf()).unwrap();
    assert_eq!(engine.store.all().len(), 4);
    assert_eq!(engine.store.published().len(), 3);

    let rust = engine.store.get("rust-ownership").unwrap();
    assert_eq!(rust.path, "/blog/2024/03/01/rust-ownership/");
    assert_eq!(rust.categories[0].slug, "rust");
}

#[test]
fn test_latest_with_subcategories() {
    let dir = site();
    let engine = Engine::new(dir.path().to_path_buf()).unwrap();
    let html = engine.render_placeholder("rust").unwrap();
    assert_eq!(titles(&html), vec!["Rust Ownership", "Python Notes"]);
}

#[test]
fn test_latest_tags_are_a_union() {
    let dir = site();
    let engine = Engine::new(dir.path().to_path_buf()).unwrap();
    let html = engine.render_placeholder("tagged").unwrap();
    assert_eq!(titles(&html), vec!["Python Notes", "Go Tips"]);
    assert_eq!(html.matches("Go Tips").count(), 1);
}

#[test]
fn test_latest_by_author_with_limit() {
    let dir = site();
    let engine = Engine::new(dir.path().to_path_buf()).unwrap();
    let html = engine.render_placeholder("by_author").unwrap();
    assert_eq!(titles(&html), vec!["Rust Ownership"]);
}

#[test]
fn test_selected_keeps_configured_order() {
    let dir = site();
    let engine = Engine::new(dir.path().to_path_buf()).unwrap();
    let html = engine.render_placeholder("picked").unwrap();
    let python = html.find("Python Notes").unwrap();
    let rust = html.find("Rust Ownership").unwrap();
    assert!(python < rust);
}

#[test]
fn test_query_widget_and_search() {
    let dir = site();
    let engine = Engine::new(dir.path().to_path_buf()).unwrap();
    let html = engine.render_placeholder("search").unwrap();
    assert_eq!(titles(&html), vec!["Rust Ownership"]);

    let found: Vec<&str> = engine
        .search("tag:python -author:bob", None)
        .iter()
        .map(|e| e.slug.as_str())
        .collect();
    assert_eq!(found, vec!["go-tips"]);
}

#[test]
fn test_random_entries_with_listing_template() {
    let dir = site();
    let engine = Engine::new(dir.path().to_path_buf()).unwrap();
    let html = engine.render_placeholder("lucky").unwrap();
    assert!(html.contains("widget-random_entries"));
    assert!(!html.contains("No entries yet."));
    assert_eq!(html.matches("<li class=\"entry\">").count(), 2);
    assert!(!html.contains("Secret Draft"));
}

#[test]
fn test_unknown_placeholder() {
    let dir = site();
    let engine = Engine::new(dir.path().to_path_buf()).unwrap();
    let err = engine.render_placeholder("nowhere").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<WidgetError>(),
        Some(WidgetError::UnknownPlaceholder { .. })
    ));
}

#[test]
fn test_generate_writes_every_placeholder() {
    let dir = site();
    let engine = Engine::new(dir.path().to_path_buf()).unwrap();
    assert_eq!(engine.generate().unwrap(), 6);
    let picked = fs::read_to_string(dir.path().join("public/widgets/picked.html")).unwrap();
    assert!(picked.contains("Python Notes"));
}
