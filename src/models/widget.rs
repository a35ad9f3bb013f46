use serde::{Deserialize, Serialize};

use crate::widgets::WidgetError;

/// 最新文章挂件配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatestEntries {
    /// 文章数量，0 或未设置表示全部
    pub number_of_entries: Option<usize>,
    /// 覆盖使用的模板
    pub template_to_render: Option<String>,
    /// 分类别名
    pub categories: Vec<String>,
    /// 是否包含子分类
    pub subcategories: bool,
    /// 作者用户名
    pub authors: Vec<String>,
    /// 标签
    pub tags: Vec<String>,
}

/// 精选文章挂件配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectedEntries {
    /// 按顺序排列的文章别名
    pub entries: Vec<String>,
    pub template_to_render: Option<String>,
}

/// 随机文章挂件配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomEntries {
    pub number_of_entries: Option<usize>,
    pub template_to_render: Option<String>,
}

/// 搜索文章挂件配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryEntries {
    /// 搜索表达式
    pub query: String,
    pub number_of_entries: Option<usize>,
    pub template_to_render: Option<String>,
}

/// 日历挂件配置，年月都不设置时使用当前月份
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarEntries {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// 放置在占位符中的挂件实例
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WidgetConfig {
    LatestEntries(LatestEntries),
    SelectedEntries(SelectedEntries),
    RandomEntries(RandomEntries),
    QueryEntries(QueryEntries),
    CalendarEntries(CalendarEntries),
    SearchForm,
    Tools,
}

impl WidgetConfig {
    /// 挂件类型名称，与注册表中的名称一致
    pub fn kind(&self) -> &'static str {
        match self {
            WidgetConfig::LatestEntries(_) => "latest_entries",
            WidgetConfig::SelectedEntries(_) => "selected_entries",
            WidgetConfig::RandomEntries(_) => "random_entries",
            WidgetConfig::QueryEntries(_) => "query_entries",
            WidgetConfig::CalendarEntries(_) => "calendar_entries",
            WidgetConfig::SearchForm => "search_form",
            WidgetConfig::Tools => "tools",
        }
    }

    /// 非空的覆盖模板
    pub fn template_to_render(&self) -> Option<&str> {
        let template = match self {
            WidgetConfig::LatestEntries(c) => c.template_to_render.as_deref(),
            WidgetConfig::SelectedEntries(c) => c.template_to_render.as_deref(),
            WidgetConfig::RandomEntries(c) => c.template_to_render.as_deref(),
            WidgetConfig::QueryEntries(c) => c.template_to_render.as_deref(),
            _ => None,
        };
        template.map(str::trim).filter(|t| !t.is_empty())
    }

    /// 简短描述，用于列表显示
    pub fn summary(&self) -> String {
        match self {
            WidgetConfig::LatestEntries(c) => match c.number_of_entries {
                Some(n) if n > 0 => format!("{} entries", n),
                _ => "all entries".to_string(),
            },
            WidgetConfig::SelectedEntries(c) => format!("{} entries", c.entries.len()),
            WidgetConfig::RandomEntries(c) => {
                format!("{} entries", c.number_of_entries.unwrap_or(0))
            }
            WidgetConfig::QueryEntries(c) => format!("{:?}", c.query),
            WidgetConfig::CalendarEntries(c) => match (c.year, c.month) {
                (Some(y), Some(m)) => format!("{}-{:02}", y, m),
                _ => "current month".to_string(),
            },
            WidgetConfig::SearchForm => "search form".to_string(),
            WidgetConfig::Tools => "tools".to_string(),
        }
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), WidgetError> {
        match self {
            WidgetConfig::CalendarEntries(c) => {
                if c.year.is_some() != c.month.is_some() {
                    return Err(WidgetError::InvalidConfig {
                        widget: self.kind().to_string(),
                        message: "year and month must be defined together".to_string(),
                    });
                }
                if let Some(month) = c.month {
                    if !(1..=12).contains(&month) {
                        return Err(WidgetError::InvalidConfig {
                            widget: self.kind().to_string(),
                            message: format!("month out of range: {}", month),
                        });
                    }
                }
                Ok(())
            }
            WidgetConfig::QueryEntries(c) if c.query.trim().is_empty() => {
                Err(WidgetError::InvalidConfig {
                    widget: self.kind().to_string(),
                    message: "query is required".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// 把数量配置转换为截断长度，0 表示不限
pub fn limit_of(number_of_entries: Option<usize>) -> Option<usize> {
    number_of_entries.filter(|n| *n > 0)
}
