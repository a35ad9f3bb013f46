use hexo_widgets::core::Engine;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// 指定站点目录
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 初始化带有示例挂件的站点
    Init(InitArgs),

    /// 渲染占位符并输出到终端
    Render(RenderArgs),

    /// 把所有占位符生成到公共目录
    Generate,

    /// 清理生成的文件
    Clean,

    /// 列出已注册的挂件
    Widgets,

    /// 列出管理界面字段的可选项
    Choices(ChoicesArgs),

    /// 搜索文章
    Search(SearchArgs),

    /// 显示分类层级
    Categories,

    /// 启动预览服务器
    Server(ServerArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// 站点目录名称
    #[arg(value_name = "NAME")]
    pub name: String,

    /// 站点标题
    #[arg(short, long)]
    pub title: Option<String>,
}

#[derive(Args)]
pub struct RenderArgs {
    /// 占位符名称，不指定时渲染全部
    pub placeholder: Option<String>,
}

#[derive(Args)]
pub struct ChoicesArgs {
    /// 字段名称（categories、authors、tags、entries）
    pub field: String,
}

#[derive(Args)]
pub struct SearchArgs {
    /// 搜索表达式
    pub query: String,

    /// 最多显示的结果数量
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct ServerArgs {
    /// 服务器端口
    #[arg(short, long, default_value = "4000")]
    pub port: u16,
}

// 嵌入的默认配置模板
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# 站点信息
title: {title}
description: '使用挂件展示文章的示例站点'
author: admin
language: zh-CN

# URL配置
url: http://example.com
root: /
permalink: :year/:month/:day/:title/

# 目录配置
source_dir: source
public_dir: public

# 作者显示名称
authors:
  admin: 管理员

# 预先声明的分类
categories:
  - name: Programming
  - name: Rust
    parent: programming

# 搜索
search:
  path: /search/
  param: pattern
  limit: 10

# 日历
calendar:
  first_weekday: monday
  archive_dir: archives

# 管理后台
admin:
  url: /admin/

# 占位符中的挂件
placeholders:
  sidebar:
    - type: search_form
    - type: latest_entries
      number_of_entries: 5
    - type: calendar_entries
  footer:
    - type: random_entries
      number_of_entries: 3
    - type: latest_entries
      categories: [programming]
      subcategories: true
      tags: [rust]
    - type: tools
"#;

const HELLO_POST: &str = r#"---
title: Hello World
date: 2024-01-01 12:00:00
author: admin
categories:
  - Programming
  - Rust
tags:
  - rust
  - widgets
---

这是第一篇文章。

<!-- more -->

挂件会在侧边栏和页脚中列出它。
"#;

// 初始化网站文件结构
fn initialize_site_structure(site_path: &Path, site_title: &str) -> Result<()> {
    let posts_dir = site_path.join("source").join("_posts");
    let widgets_dir = site_path.join("themes").join("default").join("layout").join("widgets");
    for dir in [&posts_dir, &widgets_dir] {
        fs::create_dir_all(dir)?;
    }

    let config_content = DEFAULT_CONFIG_TEMPLATE.replace("{title}", site_title);
    fs::write(site_path.join("_config.yml"), config_content)?;
    fs::write(posts_dir.join("hello-world.md"), HELLO_POST)?;
    Ok(())
}

/// 执行命令
pub async fn execute(cli: Cli) -> Result<()> {
    let site_path = cli.path.clone();

    if let Commands::Init(args) = &cli.command {
        let site_path = site_path.join(&args.name);
        if site_path.exists() && site_path.read_dir()?.next().is_some() {
            println!("Directory is not empty. Do you want to continue? (y/N)");
            let mut input = String::new();
            std::io::stdin().read_line(&mut input)?;
            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Operation cancelled.");
                return Ok(());
            }
        }
        fs::create_dir_all(&site_path)?;
        let site_title = args.title.clone().unwrap_or_else(|| args.name.clone());
        initialize_site_structure(&site_path, &site_title)?;
        info!("Initialized new site at: {}", site_path.display());
        return Ok(());
    }

    let engine = Engine::new(site_path)?;

    match cli.command {
        Commands::Init(_) => {}
        Commands::Render(args) => {
            let names: Vec<String> = match args.placeholder {
                Some(name) => vec![name],
                None => engine.placeholders().into_iter().map(String::from).collect(),
            };
            for name in names {
                println!("{}", format!("<!-- placeholder: {} -->", name).bright_black());
                println!("{}", engine.render_placeholder(&name)?);
            }
        }
        Commands::Generate => {
            let count = engine.generate()?;
            println!("{} {} placeholders", "Generated".bright_green(), count);
        }
        Commands::Clean => {
            engine.clean()?;
        }
        Commands::Widgets => {
            for descriptor in engine.pool.descriptors() {
                println!(
                    "{} {} ({})",
                    descriptor.name.bright_cyan(),
                    descriptor.label,
                    descriptor.render_template.bright_black()
                );
                for fieldset in &descriptor.fieldsets {
                    if let Some(legend) = fieldset.legend {
                        println!("    [{}]", legend);
                    }
                    for row in fieldset.rows {
                        println!("    - {}", row.join(", "));
                    }
                }
            }
        }
        Commands::Choices(args) => {
            for choice in engine.pool.choices(&args.field, &engine.selector())? {
                println!("{}\t{}", choice.value.bright_cyan(), choice.label);
            }
        }
        Commands::Search(args) => {
            let results = engine.search(&args.query, args.limit);
            if results.is_empty() {
                println!("{}", "No entries found.".yellow());
            }
            for entry in results {
                println!(
                    "{} {} {}",
                    entry.date.format("%Y-%m-%d").to_string().bright_black(),
                    entry.title.bright_white(),
                    entry.path.bright_black()
                );
                if let Some(excerpt) = &entry.excerpt {
                    println!("    {}", hexo_widgets::utils::markdown::plain_text(excerpt));
                }
            }
        }
        Commands::Categories => {
            for (depth, category) in engine.store.categories().outline() {
                println!("{}{} ({})", "  ".repeat(depth), category.name, category.slug.bright_black());
            }
        }
        Commands::Server(args) => {
            engine.server(args.port).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialized_site_renders() {
        let dir = tempfile::tempdir().unwrap();
        initialize_site_structure(dir.path(), "Demo").unwrap();

        let engine = Engine::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(engine.config.title, "Demo");
        assert_eq!(engine.placeholders(), vec!["footer", "sidebar"]);
        assert_eq!(engine.store.categories().descendants("programming"), vec!["rust".to_string()]);

        let footer = engine.render_placeholder("footer").unwrap();
        assert!(footer.contains("Hello World"));
        assert!(engine.render_placeholder("sidebar").unwrap().contains("widget-calendar"));
    }

    #[test]
    fn test_cli_parses_commands() {
        let cli = Cli::try_parse_from(["hexo-widgets", "-p", "site", "search", "rust", "-n", "3"]).unwrap();
        assert_eq!(cli.path, PathBuf::from("site"));
        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.query, "rust");
                assert_eq!(args.limit, Some(3));
            }
            _ => panic!("unexpected command"),
        }
    }
}
