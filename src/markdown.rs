//! Task descriptions rendered from Markdown into ratatui lines.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

pub fn render(content: &str) -> Vec<Line<'static>> {
    let mut renderer = Renderer::default();
    let parser = Parser::new_ext(
        content,
        Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS,
    );
    for event in parser {
        renderer.event(event);
    }
    renderer.flush();
    // Trailing blank line from the last block.
    while renderer.lines.last().is_some_and(|line| line.spans.is_empty()) {
        renderer.lines.pop();
    }
    renderer.lines
}

#[derive(Default)]
struct Renderer {
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    // Counters so nested emphasis unwinds correctly.
    bold: usize,
    italic: usize,
    strike: usize,
    heading: bool,
    code_block: bool,
    link: Option<String>,
    lists: Vec<Option<u64>>,
}

impl Renderer {
    fn style(&self) -> Style {
        let mut style = Style::default();
        if self.bold > 0 {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.italic > 0 {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.strike > 0 {
            style = style.add_modifier(Modifier::CROSSED_OUT);
        }
        if self.heading {
            style = style.fg(Color::Cyan);
        }
        if self.link.is_some() {
            style = style.fg(Color::Blue).add_modifier(Modifier::UNDERLINED);
        }
        style
    }

    fn flush(&mut self) {
        if !self.spans.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.spans)));
        }
    }

    fn blank(&mut self) {
        self.flush();
        if self.lines.last().is_some_and(|line| !line.spans.is_empty()) {
            self.lines.push(Line::default());
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) if self.code_block => {
                for line in text.lines() {
                    self.lines.push(Line::from(Span::styled(
                        format!("  {line}"),
                        Style::default().fg(Color::Yellow),
                    )));
                }
            }
            Event::Text(text) => {
                let style = self.style();
                self.spans.push(Span::styled(text.into_string(), style));
            }
            Event::Code(code) => self.spans.push(Span::styled(
                code.into_string(),
                Style::default().fg(Color::Yellow),
            )),
            Event::SoftBreak => self.spans.push(Span::raw(" ")),
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                self.lines.push(Line::from(Span::styled(
                    "─".repeat(24),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            Event::TaskListMarker(done) => {
                self.spans
                    .push(Span::raw(if done { "[x] " } else { "[ ] " }));
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                self.spans.push(Span::raw(html.into_string()));
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { .. } => {
                self.blank();
                self.heading = true;
                self.bold += 1;
            }
            Tag::Strong => self.bold += 1,
            Tag::Emphasis => self.italic += 1,
            Tag::Strikethrough => self.strike += 1,
            Tag::CodeBlock(_) => {
                self.flush();
                self.code_block = true;
            }
            Tag::Link { dest_url, .. } => self.link = Some(dest_url.into_string()),
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{indent}{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => format!("{indent}• "),
                };
                self.spans.push(Span::raw(marker));
            }
            Tag::BlockQuote(_) => self.spans.push(Span::styled(
                "│ ",
                Style::default().fg(Color::DarkGray),
            )),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_) => {
                self.heading = false;
                self.bold = self.bold.saturating_sub(1);
                self.blank();
            }
            TagEnd::Strong => self.bold = self.bold.saturating_sub(1),
            TagEnd::Emphasis => self.italic = self.italic.saturating_sub(1),
            TagEnd::Strikethrough => self.strike = self.strike.saturating_sub(1),
            TagEnd::CodeBlock => {
                self.code_block = false;
                self.blank();
            }
            TagEnd::Link => {
                if let Some(url) = self.link.take() {
                    self.spans.push(Span::styled(
                        format!(" <{url}>"),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
            }
            TagEnd::List(_) => {
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Item => self.flush(),
            TagEnd::Paragraph => {
                if self.lists.is_empty() {
                    self.blank();
                } else {
                    self.flush();
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn paragraphs_and_lists() {
        let lines = render("Pick up:\n\n- milk\n- **eggs**\n\n1. first\n2. second");
        assert_eq!(
            text(&lines),
            ["Pick up:", "", "• milk", "• eggs", "", "1. first", "2. second"]
        );
        let eggs = &lines[3].spans[1];
        assert!(eggs.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn links_show_their_target() {
        let lines = render("See [docs](https://example.com).");
        assert_eq!(text(&lines), ["See docs <https://example.com>."]);
    }

    #[test]
    fn empty_input_renders_nothing() {
        assert!(render("").is_empty());
    }
}
