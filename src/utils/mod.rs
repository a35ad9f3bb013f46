use chrono::{DateTime, Utc};
use std::path::Path;

/// 生成 URL 友好的别名
pub fn slugify(text: &str) -> String {
    slug::slugify(text)
}

/// 从日期和别名创建永久链接
pub fn create_permalink(
    date: &DateTime<Utc>,
    slug: &str,
    pattern: &str,
) -> String {
    pattern
        .replace(":year", &date.format("%Y").to_string())
        .replace(":month", &date.format("%m").to_string())
        .replace(":day", &date.format("%d").to_string())
        .replace(":hour", &date.format("%H").to_string())
        .replace(":minute", &date.format("%M").to_string())
        .replace(":second", &date.format("%S").to_string())
        .replace(":title", slug)
        .trim_start_matches('/')
        .to_string()
}

/// 检查文件是否为 Markdown 文件
pub fn is_markdown_file<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    if let Some(ext) = path.extension() {
        ext == "md" || ext == "markdown"
    } else {
        false
    }
}

/// 确保路径以斜杠结尾
pub fn ensure_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

/// 确保路径以斜杠开头
pub fn ensure_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// 把相对路径拼接到站点根路径上
pub fn join_url(root: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}{}",
        ensure_trailing_slash(&ensure_leading_slash(root)),
        path.trim_start_matches('/')
    )
}

pub mod markdown;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_create_permalink() {
        let date = Utc.with_ymd_and_hms(2024, 2, 9, 8, 0, 0).unwrap();
        assert_eq!(create_permalink(&date, "hello", ":year/:month/:day/:title/"), "2024/02/09/hello/");
        assert_eq!(create_permalink(&date, "hello", "/posts/:title.html"), "posts/hello.html");
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("/", "/search/"), "/search/");
        assert_eq!(join_url("blog", "archives/2024/"), "/blog/archives/2024/");
        assert_eq!(join_url("/blog/", "https://example.com/x"), "https://example.com/x");
    }
}
