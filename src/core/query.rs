use std::collections::HashSet;

use crate::core::search::SearchQuery;
use crate::models::Entry;

/// 文章查询结果，所有过滤操作都保持原有顺序
#[derive(Debug, Clone, Default)]
pub struct EntryQuery<'a> {
    entries: Vec<&'a Entry>,
}

impl<'a> EntryQuery<'a> {
    pub fn new(entries: Vec<&'a Entry>) -> Self {
        Self { entries }
    }

    /// 只保留属于任一分类的文章
    pub fn in_categories(mut self, slugs: &HashSet<String>) -> Self {
        self.entries
            .retain(|e| e.categories.iter().any(|c| slugs.contains(&c.slug)));
        self
    }

    /// 只保留由任一作者撰写的文章
    pub fn by_authors(mut self, usernames: &[String]) -> Self {
        self.entries
            .retain(|e| e.authors.iter().any(|a| usernames.contains(a)));
        self
    }

    /// 带有任一标签的文章（并集）
    pub fn union_by_tags(mut self, tags: &[String]) -> Self {
        self.entries.retain(|e| tags.iter().any(|t| e.has_tag(t)));
        self
    }

    pub fn search(mut self, query: &SearchQuery) -> Self {
        self.entries.retain(|e| query.matches(e));
        self
    }

    /// 去除重复的文章，保留第一次出现的位置
    pub fn distinct(mut self) -> Self {
        let mut seen = HashSet::new();
        self.entries.retain(|e| seen.insert(*e as *const Entry));
        self
    }

    /// 截断到指定数量，None 表示不限
    pub fn limit(mut self, limit: Option<usize>) -> Self {
        if let Some(n) = limit {
            self.entries.truncate(n);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Entry> + '_ {
        self.entries.iter().copied()
    }

    pub fn into_vec(self) -> Vec<&'a Entry> {
        self.entries
    }
}

impl<'a> FromIterator<&'a Entry> for EntryQuery<'a> {
    fn from_iter<I: IntoIterator<Item = &'a Entry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
