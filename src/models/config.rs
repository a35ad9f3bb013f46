use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use anyhow::{Context, Result};
use url::Url;

use super::widget::WidgetConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    pub url: Option<String>,
    pub root: Option<String>,
    pub permalink: Option<String>,
    pub source_dir: Option<String>,
    pub public_dir: Option<String>,
    pub theme: Option<String>,
    pub date_format: Option<String>,
    /// 作者显示名称（用户名 -> 名称）
    pub authors: BTreeMap<String, String>,
    /// 预先声明的分类层级
    pub categories: Vec<CategoryConfig>,
    pub search: SearchConfig,
    pub calendar: CalendarConfig,
    pub admin: AdminConfig,
    /// 占位符及其中按顺序放置的挂件
    pub placeholders: BTreeMap<String, Vec<WidgetConfig>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    pub slug: Option<String>,
    pub parent: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// 搜索结果页面路径
    pub path: String,
    /// 查询参数名
    pub param: String,
    /// 搜索结果的最大数量
    pub limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirstWeekday {
    Monday,
    Sunday,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub first_weekday: FirstWeekday,
    /// 按日归档页面路径
    pub archive_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// 管理后台地址
    pub url: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            path: "/search/".to_string(),
            param: "pattern".to_string(),
            limit: 10,
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            first_weekday: FirstWeekday::Monday,
            archive_dir: "archives".to_string(),
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            url: "/admin/".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "My Blog".to_string(),
            subtitle: None,
            description: None,
            author: None,
            language: Some("en".to_string()),
            url: None,
            root: Some("/".to_string()),
            permalink: None,
            source_dir: None,
            public_dir: None,
            theme: Some("default".to_string()),
            date_format: None,
            authors: BTreeMap::new(),
            categories: Vec::new(),
            search: SearchConfig::default(),
            calendar: CalendarConfig::default(),
            admin: AdminConfig::default(),
            placeholders: BTreeMap::new(),
        }
    }
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        Self::parse(&content)
    }

    /// 从YAML字符串解析配置并校验挂件
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content).context("解析配置文件失败")?;
        config.validate()?;
        Ok(config)
    }

    /// 加载配置的别名
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_file(path)
    }

    /// 校验所有占位符中的挂件配置
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.url {
            Url::parse(url).with_context(|| format!("站点 URL 无效: {}", url))?;
        }
        for (placeholder, widgets) in &self.placeholders {
            for (index, widget) in widgets.iter().enumerate() {
                widget
                    .validate()
                    .with_context(|| format!("占位符 {} 中第 {} 个挂件配置无效", placeholder, index + 1))?;
            }
        }
        Ok(())
    }

    /// 站点根路径，保证以斜杠开头和结尾
    pub fn root(&self) -> String {
        let root = self.root.as_deref().unwrap_or("/");
        crate::utils::ensure_trailing_slash(&crate::utils::ensure_leading_slash(root))
    }

    pub fn source_dir(&self) -> &str {
        self.source_dir.as_deref().unwrap_or("source")
    }

    pub fn public_dir(&self) -> &str {
        self.public_dir.as_deref().unwrap_or("public")
    }

    pub fn permalink(&self) -> &str {
        self.permalink.as_deref().unwrap_or(":year/:month/:day/:title/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_missing() {
        let config = Config::parse("title: Demo\n").unwrap();
        assert_eq!(config.title, "Demo");
        assert_eq!(config.root(), "/");
        assert_eq!(config.search.param, "pattern");
        assert_eq!(config.calendar.first_weekday, FirstWeekday::Monday);
        assert!(config.placeholders.is_empty());
    }

    #[test]
    fn test_invalid_widget_is_rejected() {
        let yaml = r#"
title: Demo
placeholders:
  sidebar:
    - type: calendar_entries
      month: 4
"#;
        let err = Config::parse(yaml).unwrap_err();
        assert!(format!("{:#}", err).contains("sidebar"));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        assert!(Config::parse("url: not a url\n").is_err());
        assert!(Config::parse("url: http://example.com/blog\n").is_ok());
    }

    #[test]
    fn test_root_normalised() {
        let config = Config {
            root: Some("blog".to_string()),
            ..Config::default()
        };
        assert_eq!(config.root(), "/blog/");
    }
}
