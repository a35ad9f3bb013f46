use std::collections::{HashMap, HashSet};

use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use petgraph::Direction;
use tracing::{debug, warn};

use crate::models::config::CategoryConfig;
use crate::models::{Category, EntryCategory};

/// 分类层级，边从父分类指向子分类
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    graph: DiGraph<Category, ()>,
    index: HashMap<String, NodeIndex>,
}

impl CategoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从配置中声明的分类创建
    pub fn from_config(declared: &[CategoryConfig]) -> Self {
        let mut tree = Self::new();
        for category in declared {
            let slug = tree.insert(&category.name, category.slug.as_deref(), category.parent.as_deref());
            if let Some(description) = &category.description {
                if let Some(node) = tree.index.get(&slug) {
                    tree.graph[*node].description = Some(description.clone());
                }
            }
        }
        tree
    }

    /// 插入分类并返回其别名；已存在时只补充父分类
    pub fn insert(&mut self, name: &str, slug: Option<&str>, parent: Option<&str>) -> String {
        let slug = match slug {
            Some(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => slug::slugify(name),
        };

        let node = match self.index.get(&slug) {
            Some(node) => *node,
            None => {
                let node = self.graph.add_node(Category {
                    name: name.to_string(),
                    slug: slug.clone(),
                    parent: None,
                    description: None,
                });
                self.index.insert(slug.clone(), node);
                node
            }
        };

        if let Some(parent) = parent {
            // 父分类可以写别名，也可以写名称
            let parent_slug = match parent.trim() {
                p if self.index.contains_key(p) => p.to_string(),
                p => slug::slugify(p),
            };
            let parent_node = match self.index.get(&parent_slug) {
                Some(p) => *p,
                None => {
                    let p = self.graph.add_node(Category {
                        name: parent.trim().to_string(),
                        slug: parent_slug.clone(),
                        parent: None,
                        description: None,
                    });
                    self.index.insert(parent_slug, p);
                    p
                }
            };
            self.attach(node, parent_node);
        }

        slug
    }

    fn attach(&mut self, child: NodeIndex, parent: NodeIndex) {
        let child_slug = self.graph[child].slug.clone();
        let parent_slug = self.graph[parent].slug.clone();

        match &self.graph[child].parent {
            Some(existing) if *existing == parent_slug => return,
            Some(existing) => {
                warn!("分类 {} 已有父分类 {}，忽略 {}", child_slug, existing, parent_slug);
                return;
            }
            None => {}
        }

        if child == parent || has_path_connecting(&self.graph, child, parent, None) {
            warn!("分类 {} 不能作为 {} 的子分类（形成环）", child_slug, parent_slug);
            return;
        }

        debug!("分类层级: {} -> {}", parent_slug, child_slug);
        self.graph.add_edge(parent, child, ());
        self.graph[child].parent = Some(parent_slug);
    }

    /// 按父到子的顺序添加一条分类路径，返回末端分类
    pub fn add_path(&mut self, names: &[String]) -> Option<EntryCategory> {
        let mut parent: Option<String> = None;
        let mut leaf = None;
        for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            let slug = self.insert(name, None, parent.as_deref());
            leaf = self.get(&slug).map(|c| EntryCategory {
                name: c.name.clone(),
                slug: c.slug.clone(),
            });
            parent = Some(slug);
        }
        leaf
    }

    pub fn get(&self, slug: &str) -> Option<&Category> {
        self.index.get(slug).map(|node| &self.graph[*node])
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// 所有分类，按插入顺序
    pub fn all(&self) -> Vec<&Category> {
        self.graph.node_weights().collect()
    }

    /// 直接子分类，按名称排序
    pub fn children(&self, slug: &str) -> Vec<&Category> {
        let Some(node) = self.index.get(slug) else {
            return Vec::new();
        };
        let mut children: Vec<&Category> = self
            .graph
            .neighbors_directed(*node, Direction::Outgoing)
            .map(|n| &self.graph[n])
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        children
    }

    /// 所有后代分类的别名，不包含自身
    pub fn descendants(&self, slug: &str) -> Vec<String> {
        let Some(start) = self.index.get(slug) else {
            return Vec::new();
        };
        let mut dfs = Dfs::new(&self.graph, *start);
        let mut result = Vec::new();
        while let Some(node) = dfs.next(&self.graph) {
            if node != *start {
                result.push(self.graph[node].slug.clone());
            }
        }
        result
    }

    /// 给定分类集合，可选地加上所有后代分类
    pub fn expand(&self, slugs: &[String], with_descendants: bool) -> HashSet<String> {
        let mut result: HashSet<String> = slugs.iter().cloned().collect();
        if with_descendants {
            for slug in slugs {
                result.extend(self.descendants(slug));
            }
        }
        result
    }

    /// 深度优先遍历整棵树，返回 (深度, 分类)
    pub fn outline(&self) -> Vec<(usize, &Category)> {
        let mut roots: Vec<&Category> = self
            .graph
            .node_weights()
            .filter(|c| c.parent.is_none())
            .collect();
        roots.sort_by(|a, b| a.name.cmp(&b.name));

        let mut lines = Vec::new();
        let mut stack: Vec<(usize, &Category)> = roots.into_iter().rev().map(|c| (0, c)).collect();
        while let Some((depth, category)) = stack.pop() {
            lines.push((depth, category));
            for child in self.children(&category.slug).into_iter().rev() {
                stack.push((depth + 1, child));
            }
        }
        lines
    }
}
