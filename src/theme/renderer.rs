use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Datelike, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tera::{Context as TeraContext, Tera, Value};
use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::core::calendar::CalendarMonth;
use crate::core::selector::pick_random;
use crate::core::store::EntryStore;
use crate::models::config::Config;

/// 内置的挂件模板
const DEFAULT_TEMPLATES: [(&str, &str); 5] = [
    ("widgets/entry_list.html", include_str!("../../embed/widgets/entry_list.html")),
    ("widgets/random_entries.html", include_str!("../../embed/widgets/random_entries.html")),
    ("widgets/calendar.html", include_str!("../../embed/widgets/calendar.html")),
    ("widgets/search_form.html", include_str!("../../embed/widgets/search_form.html")),
    ("widgets/tools.html", include_str!("../../embed/widgets/tools.html")),
];

/// 挂件模板渲染器
#[derive(Clone)]
pub struct WidgetRenderer {
    /// 模板引擎
    pub tera: Tera,
}

impl WidgetRenderer {
    /// 创建渲染器：先加载内置模板，再用主题中的同名模板覆盖
    pub fn new(base_dir: &Path, config: &Config, store: Arc<EntryStore>) -> Result<Self> {
        let theme = config.theme.as_deref().unwrap_or("default");
        let theme_dir = base_dir.join("themes").join(theme);

        let mut tera = Tera::default();
        tera.add_raw_templates(DEFAULT_TEMPLATES.to_vec())
            .context("加载内置挂件模板失败")?;

        let overrides = Self::load_theme_templates(&mut tera, &theme_dir.join("layout"))?;
        if overrides > 0 {
            info!("从主题 {} 加载了 {} 个挂件模板", theme, overrides);
        }

        Self::register_filters(&mut tera);
        Self::register_functions(&mut tera, config, store);

        Ok(Self { tera })
    }

    /// 加载主题 `layout/widgets` 目录下的模板
    fn load_theme_templates(tera: &mut Tera, layout_dir: &Path) -> Result<usize> {
        let widgets_dir = layout_dir.join("widgets");
        if !widgets_dir.exists() {
            return Ok(0);
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&widgets_dir) {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("html") {
                continue;
            }
            let name = path
                .strip_prefix(layout_dir)?
                .to_string_lossy()
                .replace('\\', "/");
            debug!("主题挂件模板: {}", name);
            files.push((path.to_path_buf(), Some(name)));
        }

        let count = files.len();
        tera.add_template_files(files)
            .with_context(|| format!("加载主题模板失败: {}", widgets_dir.display()))?;
        Ok(count)
    }

    /// 注册模板过滤器
    fn register_filters(tera: &mut Tera) {
        tera.register_filter("date_format", Self::date_format_filter);
        tera.register_filter("markdown", Self::markdown_filter);
    }

    /// 注册模板函数
    fn register_functions(tera: &mut Tera, config: &Config, store: Arc<EntryStore>) {
        let root = config.root();
        tera.register_function("url_for", move |args: &HashMap<String, Value>| -> tera::Result<Value> {
            let path = args
                .get("path")
                .and_then(Value::as_str)
                .ok_or_else(|| tera::Error::msg("缺少必要的参数: path"))?;
            Ok(Value::String(crate::utils::join_url(&root, path)))
        });

        let random_store = store.clone();
        tera.register_function("get_random_entries", move |args: &HashMap<String, Value>| -> tera::Result<Value> {
            let count = args.get("number").and_then(Value::as_u64).map(|n| n as usize);
            let published = random_store.published().into_vec();
            let picked = pick_random(published, count, &mut rand::thread_rng());
            tera::to_value(picked).map_err(tera::Error::from)
        });

        let first_weekday = config.calendar.first_weekday;
        let archive_root = crate::utils::join_url(&config.root(), &config.calendar.archive_dir);
        tera.register_function("get_calendar_entries", move |args: &HashMap<String, Value>| -> tera::Result<Value> {
            let now = Utc::now();
            let today = now.date_naive();
            let year = args.get("year").and_then(Value::as_i64);
            let month = args.get("month").and_then(Value::as_u64);
            let (year, month) = match (year, month) {
                (Some(y), Some(m)) => match (i32::try_from(y), u32::try_from(m)) {
                    (Ok(y), Ok(m)) => (y, m),
                    _ => return Err(tera::Error::msg(format!("无效的年月: {}-{}", y, m))),
                },
                _ => (today.year(), today.month()),
            };

            let published = store.published_at(now).into_vec();
            let calendar = CalendarMonth::build(&published, year, month, first_weekday, today, &archive_root)
                .ok_or_else(|| tera::Error::msg(format!("无效的年月: {}-{}", year, month)))?;
            tera::to_value(calendar).map_err(tera::Error::from)
        });
    }

    /// 渲染模板
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        match self.tera.render(template, context) {
            Ok(result) => Ok(result),
            Err(e) => {
                error!("模板渲染失败: {} ({:?})", template, e);
                Err(anyhow!(e).context(format!("模板渲染失败: {}", template)))
            }
        }
    }

    /// 检查模板是否存在
    pub fn has_template(&self, template: &str) -> bool {
        self.tera.get_template_names().any(|name| name == template)
    }

    fn date_format_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        if let Some(date) = value.as_str().and_then(|s| DateTime::parse_from_rfc3339(s).ok()) {
            let format = args
                .get("format")
                .and_then(|f| f.as_str())
                .unwrap_or("%Y-%m-%d");
            Ok(Value::String(date.format(format).to_string()))
        } else {
            Ok(value.clone())
        }
    }

    fn markdown_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        match value.as_str() {
            Some(text) => crate::utils::markdown::render(text)
                .map(Value::String)
                .map_err(|e| tera::Error::msg(e.to_string())),
            None => Ok(value.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::categories::CategoryTree;
    use crate::models::Entry;
    use chrono::Duration;

    fn renderer(base_dir: &Path) -> WidgetRenderer {
        let mut entries = Vec::new();
        for i in 0..4 {
            entries.push(Entry::new(&format!("e{}", i), &format!("Entry {}", i), Utc::now() - Duration::days(i)));
        }
        let store = Arc::new(EntryStore::new(entries, CategoryTree::new()));
        WidgetRenderer::new(base_dir, &Config::default(), store).unwrap()
    }

    #[test]
    fn test_default_templates_available() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = renderer(dir.path());
        for (name, _) in DEFAULT_TEMPLATES {
            assert!(renderer.has_template(name), "{}", name);
        }
        assert!(!renderer.has_template("widgets/missing.html"));
    }

    #[test]
    fn test_get_random_entries_function() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = renderer(dir.path());
        renderer
            .tera
            .add_raw_template(
                "r.txt",
                "{% set two = get_random_entries(number=2) %}{% set all = get_random_entries() %}{{ two | length }}/{{ all | length }}",
            )
            .unwrap();
        let html = renderer.render("r.txt", &TeraContext::new()).unwrap();
        assert_eq!(html, "2/4");
    }

    #[test]
    fn test_calendar_template() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = renderer(dir.path());
        let mut context = TeraContext::new();
        context.insert("year", &2023);
        context.insert("month", &2);
        let html = renderer.render("widgets/calendar.html", &context).unwrap();
        assert!(html.contains("February 2023"));
        assert!(html.contains(">28<") || html.contains("28\n"));
    }

    #[test]
    fn test_calendar_rejects_oversized_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = renderer(dir.path());
        let mut context = TeraContext::new();
        context.insert("year", &2023);
        context.insert("month", &4_294_967_297u64);
        assert!(renderer.render("widgets/calendar.html", &context).is_err());

        let mut context = TeraContext::new();
        context.insert("year", &(i64::from(i32::MAX) + 1));
        context.insert("month", &1);
        assert!(renderer.render("widgets/calendar.html", &context).is_err());
    }

    #[test]
    fn test_theme_template_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        let widgets_dir = dir.path().join("themes/default/layout/widgets");
        std::fs::create_dir_all(&widgets_dir).unwrap();
        std::fs::write(widgets_dir.join("tools.html"), "custom tools {{ url_for(path='admin/') | safe }}").unwrap();
        std::fs::write(widgets_dir.join("compact.html"), "compact").unwrap();

        let renderer = renderer(dir.path());
        assert!(renderer.has_template("widgets/compact.html"));
        let html = renderer.render("widgets/tools.html", &TeraContext::new()).unwrap();
        assert_eq!(html, "custom tools /admin/");
    }

    #[test]
    fn test_filters() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = renderer(dir.path());
        renderer
            .tera
            .add_raw_template("t.txt", "{{ d | date_format(format=\"%d/%m/%Y\") }}|{{ md | markdown | safe }}")
            .unwrap();
        let mut context = TeraContext::new();
        context.insert("d", "2024-03-05T10:00:00Z");
        context.insert("md", "*hi*");
        let html = renderer.render("t.txt", &context).unwrap();
        assert_eq!(html.trim(), "05/03/2024|<p><em>hi</em></p>");
    }
}
