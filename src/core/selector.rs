use std::collections::HashSet;

use chrono::{DateTime, Datelike, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::core::search::SearchQuery;
use crate::core::store::EntryStore;
use crate::models::widget::{
    limit_of, CalendarEntries, LatestEntries, QueryEntries, RandomEntries, SelectedEntries,
};
use crate::models::{Entry, WidgetConfig};

/// 随机文章挂件的默认模板
pub const DEFAULT_RANDOM_TEMPLATE: &str = "widgets/random_entries.html";

/// 一个挂件选出的内容，交给渲染层
#[derive(Debug, Clone)]
pub enum Selection<'a> {
    /// 有序的文章列表
    Entries(Vec<&'a Entry>),
    /// 随机选择交给模板完成
    Random {
        template: String,
        count: Option<usize>,
    },
    /// 日历的年月参数
    Calendar {
        year: i32,
        month: u32,
    },
    /// 无需计算
    Static,
}

/// 根据挂件配置选择文章，每次渲染创建一个
#[derive(Debug, Clone, Copy)]
pub struct EntrySelector<'a> {
    store: &'a EntryStore,
    now: DateTime<Utc>,
}

impl<'a> EntrySelector<'a> {
    pub fn new(store: &'a EntryStore) -> Self {
        Self {
            store,
            now: Utc::now(),
        }
    }

    /// 使用指定的当前时间
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn store(&self) -> &'a EntryStore {
        self.store
    }

    pub fn select(&self, widget: &WidgetConfig) -> Selection<'a> {
        debug!("选择文章: {} ({})", widget.kind(), widget.summary());
        match widget {
            WidgetConfig::LatestEntries(c) => Selection::Entries(self.latest(c)),
            WidgetConfig::SelectedEntries(c) => Selection::Entries(self.selected(c)),
            WidgetConfig::RandomEntries(c) => self.random(c),
            WidgetConfig::QueryEntries(c) => Selection::Entries(self.query(c)),
            WidgetConfig::CalendarEntries(c) => {
                let (year, month) = self.calendar(c);
                Selection::Calendar { year, month }
            }
            WidgetConfig::SearchForm | WidgetConfig::Tools => Selection::Static,
        }
    }

    /// 参与过滤的分类集合，可选地包含子分类
    pub fn effective_categories(&self, config: &LatestEntries) -> HashSet<String> {
        self.store
            .categories()
            .expand(&config.categories, config.subcategories)
    }

    /// 最新文章：按分类、作者、标签依次过滤，空集合不过滤
    pub fn latest(&self, config: &LatestEntries) -> Vec<&'a Entry> {
        let mut entries = self.store.published_at(self.now);

        if !config.categories.is_empty() {
            let categories = self.effective_categories(config);
            entries = entries.in_categories(&categories);
        }
        if !config.authors.is_empty() {
            entries = entries.by_authors(&config.authors);
        }
        if !config.tags.is_empty() {
            entries = entries.union_by_tags(&config.tags);
        }

        entries
            .distinct()
            .limit(limit_of(config.number_of_entries))
            .into_vec()
    }

    /// 精选文章：保持配置中的顺序，不去重也不过滤
    pub fn selected(&self, config: &SelectedEntries) -> Vec<&'a Entry> {
        config
            .entries
            .iter()
            .filter_map(|slug| {
                let entry = self.store.get(slug);
                if entry.is_none() {
                    warn!("精选文章不存在: {}", slug);
                }
                entry
            })
            .collect()
    }

    pub fn random(&self, config: &RandomEntries) -> Selection<'a> {
        let template = config
            .template_to_render
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_RANDOM_TEMPLATE)
            .to_string();
        Selection::Random {
            template,
            count: limit_of(config.number_of_entries),
        }
    }

    /// 搜索文章，空白查询不返回任何文章
    pub fn query(&self, config: &QueryEntries) -> Vec<&'a Entry> {
        let query = SearchQuery::new(&config.query);
        if query.is_empty() {
            return Vec::new();
        }
        self.store
            .published_at(self.now)
            .search(&query)
            .limit(limit_of(config.number_of_entries))
            .into_vec()
    }

    /// 年月同时设置时使用配置，否则使用当前月份
    pub fn calendar(&self, config: &CalendarEntries) -> (i32, u32) {
        match (config.year, config.month) {
            (Some(year), Some(month)) => (year, month),
            _ => {
                let today = self.now.date_naive();
                (today.year(), today.month())
            }
        }
    }
}

/// 从文章中随机选出若干篇，None 表示打乱全部
pub fn pick_random<'a, R: Rng + ?Sized>(
    entries: Vec<&'a Entry>,
    count: Option<usize>,
    rng: &mut R,
) -> Vec<&'a Entry> {
    let amount = count.unwrap_or(entries.len()).min(entries.len());
    entries.choose_multiple(rng, amount).copied().collect()
}
