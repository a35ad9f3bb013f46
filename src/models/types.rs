use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 文章状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// 草稿
    Draft,
    /// 隐藏（可通过链接访问，但不出现在列表中）
    Hidden,
    /// 已发布
    #[default]
    Published,
}

impl EntryStatus {
    /// 从前置元数据中的字符串解析状态
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(EntryStatus::Draft),
            "hidden" => Some(EntryStatus::Hidden),
            "published" => Some(EntryStatus::Published),
            _ => None,
        }
    }
}

/// 文章所属分类的引用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryCategory {
    /// 分类名称
    pub name: String,
    /// 分类别名
    pub slug: String,
}

/// 博客文章
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// 文章标题
    pub title: String,
    /// 文章别名（唯一标识）
    pub slug: String,
    /// 发布时间
    pub date: DateTime<Utc>,
    /// 更新时间
    pub updated: Option<DateTime<Utc>>,
    /// 文章状态
    pub status: EntryStatus,
    /// 开始发布时间
    pub start_publication: Option<DateTime<Utc>>,
    /// 结束发布时间
    pub end_publication: Option<DateTime<Utc>>,
    /// 作者用户名
    pub authors: Vec<String>,
    /// 文章分类（每条分类路径的末端分类）
    pub categories: Vec<EntryCategory>,
    /// 文章标签
    pub tags: Vec<String>,
    /// 文章内容（原始Markdown）
    pub content: String,
    /// 渲染后的HTML内容
    pub html: String,
    /// 文章摘要
    pub excerpt: Option<String>,
    /// 永久链接
    pub path: String,
    /// 源文件路径
    pub source: PathBuf,
}

impl Entry {
    /// 创建一篇已发布的空白文章
    pub fn new(slug: &str, title: &str, date: DateTime<Utc>) -> Self {
        Self {
            title: title.to_string(),
            slug: slug.to_string(),
            date,
            updated: None,
            status: EntryStatus::Published,
            start_publication: None,
            end_publication: None,
            authors: Vec::new(),
            categories: Vec::new(),
            tags: Vec::new(),
            content: String::new(),
            html: String::new(),
            excerpt: None,
            path: format!("/{}/", slug),
            source: PathBuf::new(),
        }
    }

    /// 在给定时间点是否处于发布状态
    pub fn is_published_at(&self, now: DateTime<Utc>) -> bool {
        if self.status != EntryStatus::Published {
            return false;
        }
        if let Some(start) = self.start_publication {
            if start > now {
                return false;
            }
        }
        match self.end_publication {
            Some(end) => end > now,
            None => true,
        }
    }

    /// 标签是否匹配（名称或别名，不区分大小写）
    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = tag.trim().to_lowercase();
        let wanted_slug = slug::slugify(&wanted);
        self.tags.iter().any(|t| {
            let name = t.to_lowercase();
            name == wanted || slug::slugify(&name) == wanted_slug
        })
    }
}

/// 分类结构
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// 分类名称
    pub name: String,
    /// 分类别名（用于URL）
    pub slug: String,
    /// 父分类别名
    pub parent: Option<String>,
    /// 分类描述
    pub description: Option<String>,
}

/// 标签结构
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    /// 标签名称
    pub name: String,
    /// 标签别名（用于URL）
    pub slug: String,
    /// 已发布文章数量
    pub count: usize,
}

/// 作者结构
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Author {
    /// 用户名
    pub username: String,
    /// 显示名称
    pub name: String,
    /// 已发布文章数量
    pub count: usize,
}
