//! 挂件注册表
//!
//! 每种挂件由一个 [`WidgetDescriptor`] 描述：名称、显示名、默认模板以及
//! 管理界面使用的字段分组。渲染时根据挂件配置选择文章，写入模板上下文，
//! 并返回需要渲染的模板名称。

use serde::Serialize;
use tera::Context as TeraContext;
use tracing::{debug, info};

use crate::core::selector::{pick_random, EntrySelector, Selection, DEFAULT_RANDOM_TEMPLATE};
use crate::models::WidgetConfig;

mod error;
pub use error::*;

/// 所有挂件共用的图标
pub const ICON_PATH: &str = "widgets/img/plugin.png";

/// 挂件所属模块
pub const MODULE: &str = "Entries";

/// 管理界面中的字段分组
#[derive(Debug, Clone, Serialize)]
pub struct Fieldset {
    /// 分组标题
    pub legend: Option<&'static str>,
    /// 每行一个或多个字段
    pub rows: &'static [&'static [&'static str]],
    /// 是否默认折叠
    pub collapsed: bool,
    pub description: Option<&'static str>,
}

/// 挂件描述
#[derive(Debug, Clone, Serialize)]
pub struct WidgetDescriptor {
    pub name: &'static str,
    pub label: &'static str,
    pub module: &'static str,
    pub render_template: &'static str,
    /// 是否可以嵌入正文
    pub text_enabled: bool,
    pub fieldsets: Vec<Fieldset>,
    /// 使用左右选择框的多选字段
    pub filter_horizontal: &'static [&'static str],
    pub icon_alt: Option<&'static str>,
}

impl WidgetDescriptor {
    fn new(name: &'static str, label: &'static str, render_template: &'static str) -> Self {
        Self {
            name,
            label,
            module: MODULE,
            render_template,
            text_enabled: true,
            fieldsets: Vec::new(),
            filter_horizontal: &[],
            icon_alt: None,
        }
    }

    /// 图标地址
    pub fn icon_src(&self, static_url: &str) -> String {
        crate::utils::join_url(static_url, ICON_PATH)
    }

    /// 所有字段名，按分组顺序
    pub fn fields(&self) -> Vec<&'static str> {
        self.fieldsets
            .iter()
            .flat_map(|f| f.rows.iter())
            .flat_map(|row| row.iter().copied())
            .collect()
    }
}

fn fields(rows: &'static [&'static [&'static str]]) -> Fieldset {
    Fieldset {
        legend: None,
        rows,
        collapsed: false,
        description: None,
    }
}

/// 默认注册的七种挂件
pub fn default_descriptors() -> Vec<WidgetDescriptor> {
    vec![
        WidgetDescriptor {
            fieldsets: vec![
                fields(&[&["number_of_entries"], &["template_to_render"]]),
                Fieldset {
                    legend: Some("Filters"),
                    rows: &[&["categories", "subcategories"], &["authors"], &["tags"]],
                    collapsed: true,
                    description: None,
                },
            ],
            filter_horizontal: &["categories", "authors", "tags"],
            ..WidgetDescriptor::new("latest_entries", "Latest entries", "widgets/entry_list.html")
        },
        WidgetDescriptor {
            fieldsets: vec![fields(&[&["entries"], &["template_to_render"]])],
            filter_horizontal: &["entries"],
            ..WidgetDescriptor::new("selected_entries", "Selected entries", "widgets/entry_list.html")
        },
        WidgetDescriptor {
            fieldsets: vec![fields(&[&["number_of_entries"], &["template_to_render"]])],
            ..WidgetDescriptor::new("random_entries", "Random entries", DEFAULT_RANDOM_TEMPLATE)
        },
        WidgetDescriptor {
            fieldsets: vec![fields(&[&["query"], &["number_of_entries"], &["template_to_render"]])],
            ..WidgetDescriptor::new("query_entries", "Query entries", "widgets/entry_list.html")
        },
        WidgetDescriptor {
            fieldsets: vec![Fieldset {
                description: Some("If you don't set year and month, the current month will be used."),
                ..fields(&[&["year", "month"]])
            }],
            ..WidgetDescriptor::new("calendar_entries", "Calendar entries", "widgets/calendar.html")
        },
        WidgetDescriptor {
            icon_alt: Some("Entries search form"),
            ..WidgetDescriptor::new("search_form", "Entries search form", "widgets/search_form.html")
        },
        WidgetDescriptor {
            icon_alt: Some("Administration tools"),
            ..WidgetDescriptor::new("tools", "Administration tools", "widgets/tools.html")
        },
    ]
}

/// 管理界面的可选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

/// 挂件注册表，保持注册顺序
#[derive(Debug, Clone, Default)]
pub struct WidgetPool {
    widgets: Vec<WidgetDescriptor>,
}

impl WidgetPool {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册全部默认挂件
    pub fn with_defaults() -> Self {
        let pool = Self {
            widgets: default_descriptors(),
        };
        info!("注册了 {} 种挂件", pool.widgets.len());
        pool
    }

    pub fn register(&mut self, descriptor: WidgetDescriptor) -> Result<(), WidgetError> {
        if self.get(descriptor.name).is_some() {
            return Err(WidgetError::AlreadyRegistered {
                name: descriptor.name.to_string(),
            });
        }
        debug!("注册挂件: {}", descriptor.name);
        self.widgets.push(descriptor);
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> Result<WidgetDescriptor, WidgetError> {
        match self.widgets.iter().position(|w| w.name == name) {
            Some(index) => Ok(self.widgets.remove(index)),
            None => Err(WidgetError::NotRegistered {
                name: name.to_string(),
            }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&WidgetDescriptor> {
        self.widgets.iter().find(|w| w.name == name)
    }

    pub fn descriptors(&self) -> &[WidgetDescriptor] {
        &self.widgets
    }

    /// 用挂件的数据更新上下文，返回要渲染的模板
    pub fn render(
        &self,
        context: &mut TeraContext,
        instance: &WidgetConfig,
        placeholder: &str,
        selector: &EntrySelector<'_>,
    ) -> Result<String, WidgetError> {
        let descriptor = self.get(instance.kind()).ok_or_else(|| WidgetError::NotRegistered {
            name: instance.kind().to_string(),
        })?;
        instance.validate()?;

        context.insert("object", instance);
        context.insert("placeholder", placeholder);
        context.insert("widget", descriptor);

        match selector.select(instance) {
            Selection::Entries(entries) => {
                debug!("{} 选出 {} 篇文章", descriptor.name, entries.len());
                context.insert("entries", &entries);
            }
            Selection::Random { template, count } => {
                let published = selector.store().published_at(selector.now()).into_vec();
                let entries = pick_random(published, count, &mut rand::thread_rng());
                debug!("{} 随机选出 {} 篇文章", descriptor.name, entries.len());
                context.insert("entries", &entries);
                context.insert("template_to_render", &template);
                context.insert("number_of_entries", &count);
                return Ok(template);
            }
            Selection::Calendar { year, month } => {
                context.insert("year", &year);
                context.insert("month", &month);
            }
            Selection::Static => {}
        }

        Ok(instance
            .template_to_render()
            .unwrap_or(descriptor.render_template)
            .to_string())
    }

    /// 管理界面中多选字段的可选项
    pub fn choices(&self, field: &str, selector: &EntrySelector<'_>) -> Result<Vec<Choice>, WidgetError> {
        let store = selector.store();
        let choices = match field {
            "categories" => store
                .categories()
                .outline()
                .into_iter()
                .map(|(depth, c)| Choice {
                    value: c.slug.clone(),
                    label: format!("{}{}", "-- ".repeat(depth), c.name),
                })
                .collect(),
            "authors" => store
                .authors_published(selector.now())
                .into_iter()
                .map(|a| Choice {
                    label: format!("{} ({})", a.name, a.count),
                    value: a.username,
                })
                .collect(),
            "tags" => store
                .tags_published(selector.now())
                .into_iter()
                .map(|t| Choice {
                    label: format!("{} ({})", t.name, t.count),
                    value: t.name,
                })
                .collect(),
            "entries" => store
                .all()
                .iter()
                .map(|e| Choice {
                    value: e.slug.clone(),
                    label: e.title.clone(),
                })
                .collect(),
            _ => {
                return Err(WidgetError::UnknownField {
                    field: field.to_string(),
                })
            }
        };
        Ok(choices)
    }
}
