use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as AnyhowContext, Result};
use tera::Context as TeraContext;
use tracing::{debug, info, warn};

use crate::core::selector::EntrySelector;
use crate::core::server::Server;
use crate::core::store::EntryStore;
use crate::models::config::Config;
use crate::models::widget::QueryEntries;
use crate::models::{Entry, WidgetConfig};
use crate::theme::renderer::WidgetRenderer;
use crate::widgets::{WidgetError, WidgetPool};

/// 挂件引擎：持有配置、文章存储、挂件注册表和渲染器
#[derive(Clone)]
pub struct Engine {
    /// 基础目录
    pub base_dir: PathBuf,
    /// 公共目录（输出）
    pub public_dir: PathBuf,
    /// 站点配置
    pub config: Config,
    /// 文章存储
    pub store: Arc<EntryStore>,
    /// 挂件注册表
    pub pool: Arc<WidgetPool>,
    /// 模板渲染器
    renderer: Arc<WidgetRenderer>,
}

impl Engine {
    /// 从站点目录创建引擎，没有 `_config.yml` 时使用默认配置
    pub fn new(base_dir: PathBuf) -> Result<Self> {
        info!("工作目录: {}", base_dir.display());

        let config_path = base_dir.join("_config.yml");
        let config = if config_path.exists() {
            Config::load(&config_path)?
        } else {
            warn!("配置文件不存在，使用默认配置: {}", config_path.display());
            Config::default()
        };

        let store = EntryStore::load(&base_dir, &config)?;
        Self::from_parts(base_dir, config, store)
    }

    /// 使用已加载的配置和文章创建引擎
    pub fn from_parts(base_dir: PathBuf, config: Config, store: EntryStore) -> Result<Self> {
        let store = Arc::new(store);
        let renderer = WidgetRenderer::new(&base_dir, &config, store.clone())?;
        let public_dir = base_dir.join(config.public_dir());

        Ok(Self {
            base_dir,
            public_dir,
            config,
            store,
            pool: Arc::new(WidgetPool::with_defaults()),
            renderer: Arc::new(renderer),
        })
    }

    pub fn renderer(&self) -> &WidgetRenderer {
        &self.renderer
    }

    /// 本次请求使用的文章选择器
    pub fn selector(&self) -> EntrySelector<'_> {
        EntrySelector::new(&self.store)
    }

    /// 所有挂件共享的页面上下文
    pub fn page_context(&self) -> TeraContext {
        let root = self.config.root();
        let mut context = TeraContext::new();
        context.insert("site", &self.config);
        context.insert("root", &root);
        context.insert("search_url", &self.search_url());
        context.insert("search_param", &self.config.search.param);
        context.insert("admin_url", &crate::utils::ensure_trailing_slash(&self.config.admin.url));
        context
    }

    /// 搜索页面地址，搜索表单提交到这里
    pub fn search_url(&self) -> String {
        crate::utils::join_url(&self.config.root(), &self.config.search.path)
    }

    /// 配置中的占位符名称
    pub fn placeholders(&self) -> Vec<&str> {
        self.config.placeholders.keys().map(String::as_str).collect()
    }

    /// 渲染单个挂件
    pub fn render_widget(
        &self,
        base: &TeraContext,
        instance: &WidgetConfig,
        placeholder: &str,
        selector: &EntrySelector<'_>,
    ) -> Result<String> {
        let mut context = base.clone();
        let template = self.pool.render(&mut context, instance, placeholder, selector)?;
        if !self.renderer.has_template(&template) {
            return Err(WidgetError::TemplateNotFound { template }.into());
        }

        debug!("渲染挂件 {} ({}) -> {}", instance.kind(), placeholder, template);
        self.renderer
            .render(&template, &context)
            .map_err(|e| WidgetError::RenderError {
                widget: instance.kind().to_string(),
                placeholder: placeholder.to_string(),
                message: format!("{:#}", e),
            })
            .map_err(anyhow::Error::from)
    }

    /// 按顺序渲染占位符中的所有挂件
    pub fn render_placeholder(&self, name: &str) -> Result<String> {
        let widgets = self
            .config
            .placeholders
            .get(name)
            .ok_or_else(|| WidgetError::UnknownPlaceholder {
                name: name.to_string(),
            })?;

        let base = self.page_context();
        let selector = self.selector();
        let mut output = String::new();
        for instance in widgets {
            output.push_str(&self.render_widget(&base, instance, name, &selector)?);
        }
        Ok(output)
    }

    /// 搜索已发布的文章
    pub fn search(&self, pattern: &str, limit: Option<usize>) -> Vec<&Entry> {
        let config = QueryEntries {
            query: pattern.to_string(),
            number_of_entries: limit,
            template_to_render: None,
        };
        self.selector().query(&config)
    }

    /// 以搜索挂件的形式渲染搜索结果
    pub fn render_search(&self, pattern: &str) -> Result<String> {
        let instance = WidgetConfig::QueryEntries(QueryEntries {
            query: pattern.to_string(),
            number_of_entries: Some(self.config.search.limit),
            template_to_render: None,
        });
        let mut base = self.page_context();
        base.insert("pattern", pattern);
        if pattern.trim().is_empty() {
            base.insert("entries", &Vec::<Entry>::new());
            let template = self.pool.get("query_entries").map(|d| d.render_template).unwrap_or("widgets/entry_list.html");
            base.insert("object", &instance);
            base.insert("placeholder", "search");
            return self.renderer.render(template, &base);
        }
        self.render_widget(&base, &instance, "search", &self.selector())
    }

    /// 把每个占位符渲染到 `public/widgets/<name>.html`
    pub fn generate(&self) -> Result<usize> {
        let output_dir = self.public_dir.join("widgets");
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("创建目录失败: {}", output_dir.display()))?;

        let mut count = 0;
        for name in self.placeholders() {
            let html = self.render_placeholder(name)?;
            let path = output_dir.join(format!("{}.html", name));
            fs::write(&path, html).with_context(|| format!("写入文件失败: {}", path.display()))?;
            info!("生成占位符: {}", path.display());
            count += 1;
        }
        Ok(count)
    }

    /// 删除生成的挂件文件
    pub fn clean(&self) -> Result<()> {
        let output_dir = self.public_dir.join("widgets");
        if output_dir.exists() {
            fs::remove_dir_all(&output_dir)
                .with_context(|| format!("删除目录失败: {}", output_dir.display()))?;
            info!("已清理: {}", output_dir.display());
        }
        Ok(())
    }

    /// 启动预览服务器
    pub async fn server(self, port: u16) -> Result<()> {
        Server::new(Arc::new(self), port).start().await
    }
}
