use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use gray_matter::engine::YAML;
use gray_matter::Matter;
use rayon::prelude::*;
use serde::Deserialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::core::categories::CategoryTree;
use crate::core::query::EntryQuery;
use crate::models::config::Config;
use crate::models::{Author, Entry, EntryStatus, Tag};
use crate::utils;

/// 单个或多个值
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// 分类列表中的一项：单个名称或一条完整路径
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CategoryItem {
    Name(String),
    Path(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CategoryField {
    One(String),
    Many(Vec<CategoryItem>),
}

impl CategoryField {
    /// 展开为分类路径：全部是名称时视为一条父子链，否则每一项各为一条路径
    fn into_paths(self) -> Vec<Vec<String>> {
        match self {
            CategoryField::One(name) => vec![vec![name]],
            CategoryField::Many(items) => {
                if items.iter().all(|i| matches!(i, CategoryItem::Name(_))) {
                    let chain = items
                        .into_iter()
                        .filter_map(|i| match i {
                            CategoryItem::Name(n) => Some(n),
                            CategoryItem::Path(_) => None,
                        })
                        .collect();
                    vec![chain]
                } else {
                    items
                        .into_iter()
                        .map(|i| match i {
                            CategoryItem::Name(n) => vec![n],
                            CategoryItem::Path(p) => p,
                        })
                        .collect()
                }
            }
        }
    }
}

/// 文章前置元数据
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FrontMatter {
    title: Option<String>,
    slug: Option<String>,
    date: Option<String>,
    updated: Option<String>,
    status: Option<String>,
    published: Option<bool>,
    draft: Option<bool>,
    start_publication: Option<String>,
    end_publication: Option<String>,
    author: Option<OneOrMany>,
    authors: Option<OneOrMany>,
    categories: Option<CategoryField>,
    tags: Option<OneOrMany>,
    excerpt: Option<String>,
}

/// 解析后尚未分配分类的文章
struct ParsedEntry {
    entry: Entry,
    category_paths: Vec<Vec<String>>,
}

/// 文章存储，保存所有文章（按发布时间倒序）和分类层级
#[derive(Debug, Clone, Default)]
pub struct EntryStore {
    entries: Vec<Entry>,
    categories: CategoryTree,
    author_names: BTreeMap<String, String>,
}

impl EntryStore {
    /// 从已有数据创建
    pub fn new(mut entries: Vec<Entry>, categories: CategoryTree) -> Self {
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        Self {
            entries,
            categories,
            author_names: BTreeMap::new(),
        }
    }

    /// 设置作者显示名称
    pub fn with_author_names(mut self, names: BTreeMap<String, String>) -> Self {
        self.author_names = names;
        self
    }

    /// 从站点目录加载 `source/_posts` 下的所有文章
    pub fn load(base_dir: &Path, config: &Config) -> Result<Self> {
        let posts_dir = base_dir.join(config.source_dir()).join("_posts");
        info!("从 {} 加载文章", posts_dir.display());

        let mut files: Vec<PathBuf> = Vec::new();
        if posts_dir.exists() {
            for entry in WalkDir::new(&posts_dir) {
                let entry = entry?;
                let path = entry.path();
                if path.is_file() && utils::is_markdown_file(path) {
                    files.push(path.to_path_buf());
                }
            }
        } else {
            warn!("文章目录不存在: {}", posts_dir.display());
        }
        files.sort();

        let parsed: Vec<ParsedEntry> = files
            .par_iter()
            .map(|path| parse_entry_file(path, config))
            .collect::<Result<Vec<_>>>()?;

        let mut categories = CategoryTree::from_config(&config.categories);
        let mut entries = Vec::with_capacity(parsed.len());
        for ParsedEntry { mut entry, category_paths } in parsed {
            for path in &category_paths {
                if let Some(category) = categories.add_path(path) {
                    if !entry.categories.contains(&category) {
                        entry.categories.push(category);
                    }
                }
            }
            entries.push(entry);
        }

        let mut seen = std::collections::HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.slug.clone()) {
                warn!("文章别名重复: {} ({})", entry.slug, entry.source.display());
            }
        }

        info!("加载了 {} 篇文章，{} 个分类", entries.len(), categories.len());
        Ok(Self::new(entries, categories).with_author_names(config.authors.clone()))
    }

    /// 所有文章，包含草稿和隐藏文章
    pub fn all(&self) -> &[Entry] {
        &self.entries
    }

    /// 按别名查找文章
    pub fn get(&self, slug: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.slug == slug)
    }

    pub fn categories(&self) -> &CategoryTree {
        &self.categories
    }

    /// 当前已发布的文章
    pub fn published(&self) -> EntryQuery<'_> {
        self.published_at(Utc::now())
    }

    /// 指定时间点已发布的文章
    pub fn published_at(&self, now: DateTime<Utc>) -> EntryQuery<'_> {
        self.entries.iter().filter(|e| e.is_published_at(now)).collect()
    }

    /// 至少有一篇已发布文章的作者
    pub fn authors_published(&self, now: DateTime<Utc>) -> Vec<Author> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for entry in self.published_at(now).iter() {
            for author in &entry.authors {
                *counts.entry(author.as_str()).or_default() += 1;
            }
        }
        counts
            .into_iter()
            .map(|(username, count)| Author {
                username: username.to_string(),
                name: self
                    .author_names
                    .get(username)
                    .cloned()
                    .unwrap_or_else(|| username.to_string()),
                count,
            })
            .collect()
    }

    /// 已发布文章使用的标签，按名称排序
    pub fn tags_published(&self, now: DateTime<Utc>) -> Vec<Tag> {
        let mut tags: BTreeMap<String, Tag> = BTreeMap::new();
        for entry in self.published_at(now).iter() {
            for name in &entry.tags {
                let slug = utils::slugify(name);
                tags.entry(slug.clone())
                    .or_insert_with(|| Tag {
                        name: name.clone(),
                        slug,
                        count: 0,
                    })
                    .count += 1;
            }
        }
        let mut tags: Vec<Tag> = tags.into_values().collect();
        tags.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        tags
    }
}

fn parse_entry_file(path: &Path, config: &Config) -> Result<ParsedEntry> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("读取文章失败: {}", path.display()))?;
    let fallback_date = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    parse_entry(&raw, path, fallback_date, config)
        .with_context(|| format!("解析文章失败: {}", path.display()))
}

/// 解析文章内容（前置元数据 + Markdown）
fn parse_entry(raw: &str, path: &Path, fallback_date: DateTime<Utc>, config: &Config) -> Result<ParsedEntry> {
    let matter = Matter::<YAML>::new();
    let result = matter.parse(raw);
    let front: FrontMatter = match result.data {
        Some(data) => data.deserialize()?,
        None => FrontMatter::default(),
    };

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled")
        .to_string();

    let title = front.title.clone().unwrap_or_else(|| stem.clone());
    let slug = front
        .slug
        .as_deref()
        .map(utils::slugify)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| utils::slugify(&stem));

    let date = match front.date.as_deref() {
        Some(value) => parse_date(value).unwrap_or_else(|| {
            warn!("无法解析日期 {:?}: {}", value, path.display());
            fallback_date
        }),
        None => fallback_date,
    };

    let status = if front.draft == Some(true) || front.published == Some(false) {
        EntryStatus::Draft
    } else {
        match front.status.as_deref() {
            Some(value) => EntryStatus::parse(value).unwrap_or_else(|| {
                warn!("未知的文章状态 {:?}: {}", value, path.display());
                EntryStatus::Draft
            }),
            None => EntryStatus::Published,
        }
    };

    let mut authors: Vec<String> = front
        .author
        .into_iter()
        .chain(front.authors)
        .flat_map(OneOrMany::into_vec)
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    authors.dedup();

    let tags: Vec<String> = front
        .tags
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let content = result.content;
    let excerpt = front.excerpt.or_else(|| {
        content
            .split_once("<!-- more -->")
            .map(|(head, _)| head.trim().to_string())
    });
    let html = utils::markdown::render(&content)?;

    let path_url = format!(
        "{}{}",
        config.root(),
        utils::create_permalink(&date, &slug, config.permalink())
    );

    debug!("解析文章: {} ({})", title, slug);

    let entry = Entry {
        title,
        slug,
        date,
        updated: front.updated.as_deref().and_then(parse_date),
        status,
        start_publication: front.start_publication.as_deref().and_then(parse_date),
        end_publication: front.end_publication.as_deref().and_then(parse_date),
        authors,
        categories: Vec::new(),
        tags,
        content,
        html,
        excerpt,
        path: path_url,
        source: path.to_path_buf(),
    };

    Ok(ParsedEntry {
        entry,
        category_paths: front
            .categories
            .map(CategoryField::into_paths)
            .unwrap_or_default(),
    })
}

/// 解析常见的日期格式
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S %z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}
