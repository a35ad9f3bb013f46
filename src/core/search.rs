//! 文章全文搜索
//!
//! 支持的表达式语法（不区分大小写）：
//!
//! ```text
//! rust tera            同时包含两个词
//! rust or go           包含任意一个词
//! -draft / not draft   不包含
//! "static site"        短语
//! tag:rust category:notes author:admin
//! (rust or go) -java   括号分组
//! ```
//!
//! 无法解析的表达式会退化为基本搜索：任意一个词匹配即可。

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::Entry;

/// 搜索表达式解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("引号未闭合，位置: {0}")]
    UnterminatedQuote(usize),

    #[error("缺少右括号")]
    UnbalancedParen,

    #[error("意外的符号: {0}")]
    UnexpectedToken(String),

    #[error("字段 {0} 缺少值")]
    EmptyField(String),

    #[error("表达式不完整")]
    UnexpectedEnd,

    #[error("括号嵌套超过 {0} 层")]
    TooDeep(usize),
}

/// 括号的最大嵌套层数
const MAX_DEPTH: usize = 64;

/// 可限定的搜索字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Tag,
    Category,
    Author,
}

impl SearchField {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "tag" => Some(SearchField::Tag),
            "category" => Some(SearchField::Category),
            "author" => Some(SearchField::Author),
            _ => None,
        }
    }
}

/// 搜索表达式语法树
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchExpr {
    Text(String),
    Field(SearchField, String),
    Not(Box<SearchExpr>),
    And(Vec<SearchExpr>),
    Or(Vec<SearchExpr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    Not,
    Text(String),
    Field(SearchField, String),
}

/// 解析后的搜索条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    expr: Option<SearchExpr>,
}

impl SearchQuery {
    /// 解析搜索表达式，失败时退化为基本搜索
    pub fn new(pattern: &str) -> Self {
        match Self::parse(pattern) {
            Ok(query) => query,
            Err(e) => {
                warn!("搜索表达式解析失败，使用基本搜索: {} ({})", pattern, e);
                Self::basic(pattern)
            }
        }
    }

    /// 严格解析搜索表达式
    pub fn parse(pattern: &str) -> Result<Self, SearchError> {
        let tokens = tokenize(pattern)?;
        if tokens.is_empty() {
            return Ok(Self { expr: None });
        }

        let mut parser = Parser { tokens, pos: 0, depth: 0 };
        let expr = parser.parse_or()?;
        if let Some(token) = parser.peek() {
            return Err(SearchError::UnexpectedToken(describe(token)));
        }
        debug!("搜索表达式: {:?}", expr);
        Ok(Self { expr: Some(expr) })
    }

    /// 基本搜索：任意一个词出现即匹配
    pub fn basic(pattern: &str) -> Self {
        let words: Vec<SearchExpr> = pattern
            .split_whitespace()
            .map(|w| SearchExpr::Text(w.to_lowercase()))
            .collect();
        let expr = if words.is_empty() {
            None
        } else {
            Some(SearchExpr::Or(words))
        };
        Self { expr }
    }

    pub fn expr(&self) -> Option<&SearchExpr> {
        self.expr.as_ref()
    }

    /// 空表达式不匹配任何文章
    pub fn is_empty(&self) -> bool {
        self.expr.is_none()
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        match &self.expr {
            Some(expr) => evaluate(expr, &Haystack::new(entry)),
            None => false,
        }
    }
}

/// 预先转换为小写的文章字段
struct Haystack<'a> {
    text: String,
    tags: Vec<String>,
    categories: Vec<String>,
    authors: &'a [String],
}

impl<'a> Haystack<'a> {
    fn new(entry: &'a Entry) -> Self {
        let mut text = entry.title.to_lowercase();
        if let Some(excerpt) = &entry.excerpt {
            text.push('\n');
            text.push_str(&excerpt.to_lowercase());
        }
        text.push('\n');
        text.push_str(&entry.content.to_lowercase());

        let tags: Vec<String> = entry.tags.iter().map(|t| t.to_lowercase()).collect();
        for tag in &tags {
            text.push('\n');
            text.push_str(tag);
        }

        let categories = entry
            .categories
            .iter()
            .flat_map(|c| [c.name.to_lowercase(), c.slug.clone()])
            .collect();

        Self {
            text,
            tags,
            categories,
            authors: &entry.authors,
        }
    }
}

fn evaluate(expr: &SearchExpr, haystack: &Haystack) -> bool {
    match expr {
        SearchExpr::Text(term) => haystack.text.contains(term.as_str()),
        SearchExpr::Field(SearchField::Tag, value) => {
            haystack.tags.iter().any(|t| t.contains(value.as_str()))
        }
        SearchExpr::Field(SearchField::Category, value) => {
            haystack.categories.iter().any(|c| c.contains(value.as_str()))
        }
        SearchExpr::Field(SearchField::Author, value) => haystack
            .authors
            .iter()
            .any(|a| a.to_lowercase().contains(value.as_str())),
        SearchExpr::Not(inner) => !evaluate(inner, haystack),
        SearchExpr::And(items) => items.iter().all(|e| evaluate(e, haystack)),
        SearchExpr::Or(items) => items.iter().any(|e| evaluate(e, haystack)),
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, SearchError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        match c {
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '"' => {
                let (phrase, next) = read_phrase(&chars, i)?;
                if !phrase.trim().is_empty() {
                    tokens.push(Token::Text(phrase));
                }
                i = next;
            }
            '-' if chars.get(i + 1).is_some_and(|n| !n.is_whitespace()) => {
                tokens.push(Token::Not);
                i += 1;
            }
            _ => {
                let start = i;
                while i < chars.len()
                    && !chars[i].is_whitespace()
                    && !matches!(chars[i], '(' | ')' | '"')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();

                if let Some((name, rest)) = word.split_once(':') {
                    if let Some(field) = SearchField::parse(name) {
                        let value = if rest.is_empty() && chars.get(i) == Some(&'"') {
                            let (phrase, next) = read_phrase(&chars, i)?;
                            i = next;
                            phrase
                        } else {
                            rest.to_lowercase()
                        };
                        if value.trim().is_empty() {
                            return Err(SearchError::EmptyField(name.to_string()));
                        }
                        tokens.push(Token::Field(field, value));
                        continue;
                    }
                }

                let lower = word.to_lowercase();
                tokens.push(match lower.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Text(lower),
                });
            }
        }
    }

    Ok(tokens)
}

/// 读取引号内的短语，返回短语和引号之后的位置
fn read_phrase(chars: &[char], start: usize) -> Result<(String, usize), SearchError> {
    let begin = start + 1;
    let mut i = begin;
    while i < chars.len() && chars[i] != '"' {
        i += 1;
    }
    if i >= chars.len() {
        return Err(SearchError::UnterminatedQuote(start));
    }
    let phrase: String = chars[begin..i].iter().collect();
    Ok((phrase.to_lowercase(), i + 1))
}

fn describe(token: &Token) -> String {
    match token {
        Token::LParen => "(".to_string(),
        Token::RParen => ")".to_string(),
        Token::And => "and".to_string(),
        Token::Or => "or".to_string(),
        Token::Not => "not".to_string(),
        Token::Text(t) => t.clone(),
        Token::Field(_, v) => v.clone(),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_or(&mut self) -> Result<SearchExpr, SearchError> {
        let mut items = vec![self.parse_and()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            items.push(self.parse_and()?);
        }
        Ok(collapse(items, SearchExpr::Or))
    }

    fn parse_and(&mut self) -> Result<SearchExpr, SearchError> {
        let mut items = vec![self.parse_unary()?];
        loop {
            match self.peek() {
                Some(Token::And) => {
                    self.pos += 1;
                    items.push(self.parse_unary()?);
                }
                Some(Token::Or) | Some(Token::RParen) | None => break,
                Some(_) => items.push(self.parse_unary()?),
            }
        }
        Ok(collapse(items, SearchExpr::And))
    }

    fn parse_unary(&mut self) -> Result<SearchExpr, SearchError> {
        // 连续的否定只看奇偶
        let mut negated = false;
        while self.peek() == Some(&Token::Not) {
            self.pos += 1;
            negated = !negated;
        }

        let expr = match self.next() {
            Some(Token::LParen) => {
                if self.depth >= MAX_DEPTH {
                    return Err(SearchError::TooDeep(MAX_DEPTH));
                }
                self.depth += 1;
                let expr = self.parse_or()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token::RParen) => expr,
                    _ => return Err(SearchError::UnbalancedParen),
                }
            }
            Some(Token::Text(term)) => SearchExpr::Text(term),
            Some(Token::Field(field, value)) => SearchExpr::Field(field, value),
            Some(token) => return Err(SearchError::UnexpectedToken(describe(&token))),
            None => return Err(SearchError::UnexpectedEnd),
        };

        Ok(if negated {
            SearchExpr::Not(Box::new(expr))
        } else {
            expr
        })
    }
}

fn collapse(mut items: Vec<SearchExpr>, wrap: fn(Vec<SearchExpr>) -> SearchExpr) -> SearchExpr {
    if items.len() == 1 {
        items.remove(0)
    } else {
        wrap(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryCategory;
    use chrono::Utc;

    fn entry(title: &str, content: &str, tags: &[&str]) -> Entry {
        let mut entry = Entry::new(&slug::slugify(title), title, Utc::now());
        entry.content = content.to_string();
        entry.tags = tags.iter().map(|t| t.to_string()).collect();
        entry
    }

    #[test]
    fn test_implicit_and() {
        let query = SearchQuery::new("rust tera");
        assert!(query.matches(&entry("Rust", "templates with Tera", &[])));
        assert!(!query.matches(&entry("Rust", "templates", &[])));
    }

    #[test]
    fn test_or_and_negation() {
        let query = SearchQuery::parse("(rust or go) -java").unwrap();
        assert!(query.matches(&entry("Go notes", "", &[])));
        assert!(!query.matches(&entry("Rust and Java", "", &[])));
        assert!(!query.matches(&entry("Python", "", &[])));

        let query = SearchQuery::parse("rust and not draft").unwrap();
        assert!(query.matches(&entry("Rust", "final", &[])));
        assert!(!query.matches(&entry("Rust", "a draft", &[])));
    }

    #[test]
    fn test_phrase_and_fields() {
        let query = SearchQuery::parse("\"static site\" tag:web").unwrap();
        assert!(query.matches(&entry("A static site", "", &["Web"])));
        assert!(!query.matches(&entry("A static blog site", "", &["web"])));

        let mut e = entry("Notes", "", &[]);
        e.authors = vec!["Admin".to_string()];
        e.categories = vec![EntryCategory { name: "Daily Life".to_string(), slug: "daily-life".to_string() }];
        assert!(SearchQuery::parse("author:admin").unwrap().matches(&e));
        assert!(SearchQuery::parse("category:\"daily life\"").unwrap().matches(&e));
        assert!(SearchQuery::parse("category:daily-life").unwrap().matches(&e));
        assert!(!SearchQuery::parse("author:bob").unwrap().matches(&e));
    }

    #[test]
    fn test_tags_are_searchable_as_text() {
        let query = SearchQuery::new("tokio");
        assert!(query.matches(&entry("Async", "", &["Tokio"])));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(SearchQuery::parse("\"open").unwrap_err(), SearchError::UnterminatedQuote(0));
        assert_eq!(SearchQuery::parse("(rust").unwrap_err(), SearchError::UnbalancedParen);
        assert_eq!(SearchQuery::parse("rust or").unwrap_err(), SearchError::UnexpectedEnd);
        assert_eq!(
            SearchQuery::parse("rust)").unwrap_err(),
            SearchError::UnexpectedToken(")".to_string())
        );
        assert_eq!(SearchQuery::parse("tag:").unwrap_err(), SearchError::EmptyField("tag".to_string()));
    }

    #[test]
    fn test_fallback_to_basic_search() {
        let query = SearchQuery::new("rust (go");
        assert_eq!(
            query.expr(),
            Some(&SearchExpr::Or(vec![
                SearchExpr::Text("rust".to_string()),
                SearchExpr::Text("(go".to_string()),
            ]))
        );
        assert!(query.matches(&entry("Rust", "", &[])));
    }

    #[test]
    fn test_long_negation_runs_are_folded() {
        let query = SearchQuery::parse(&format!("{}rust", "-".repeat(10_000))).unwrap();
        assert_eq!(query.expr(), Some(&SearchExpr::Text("rust".to_string())));

        let query = SearchQuery::parse(&format!("{}rust", "not ".repeat(5_001))).unwrap();
        assert!(!query.matches(&entry("Rust", "", &[])));
        assert!(query.matches(&entry("Go", "", &[])));
    }

    #[test]
    fn test_deep_nesting_falls_back_to_basic_search() {
        let pattern = format!("{}rust{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(SearchQuery::parse(&pattern).unwrap_err(), SearchError::TooDeep(MAX_DEPTH));
        assert!(SearchQuery::parse(&"-(".repeat(5_000)).is_err());

        let query = SearchQuery::new(&pattern);
        assert_eq!(query.expr(), Some(&SearchExpr::Or(vec![SearchExpr::Text(pattern.to_lowercase())])));

        let nested = format!("{}rust{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert!(SearchQuery::parse(&nested).unwrap().matches(&entry("Rust", "", &[])));
    }

    #[test]
    fn test_blank_pattern_matches_nothing() {
        let query = SearchQuery::new("   ");
        assert!(query.is_empty());
        assert!(!query.matches(&entry("Anything", "at all", &[])));
    }
}
