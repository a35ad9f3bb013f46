use anyhow::Result;
use pulldown_cmark::{html, Event, Options, Parser, Tag};

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    options
}

/// 将Markdown渲染为HTML
pub fn render(markdown: &str) -> Result<String> {
    let parser = Parser::new_ext(markdown, options());
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    Ok(html_output)
}

/// 渲染纯文本摘要，去掉HTML标签
pub fn plain_text(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, options());
    let mut text = String::new();
    for event in parser {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            Event::End(Tag::Paragraph | Tag::Heading(..) | Tag::Item | Tag::CodeBlock(_)) => text.push(' '),
            _ => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
