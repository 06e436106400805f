use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use cb_core::{Article, ScoringModel, WeekWindow};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(45);

/// Produces the weekly newsletter body: AI prose when a model is configured
/// and responsive, a deterministic Markdown template otherwise.
pub struct NewsletterComposer {
    model: Option<Arc<dyn ScoringModel>>,
    timeout: Duration,
}

impl NewsletterComposer {
    pub fn new(model: Option<Arc<dyn ScoringModel>>) -> Self {
        Self::with_timeout(model, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(model: Option<Arc<dyn ScoringModel>>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    /// Returns the Markdown body and whether it was AI-generated. Never
    /// fails: a model error or timeout degrades to the template.
    pub async fn compose(&self, articles: &[Article], window: &WeekWindow) -> (String, bool) {
        if let Some(model) = &self.model {
            match tokio::time::timeout(self.timeout, model.compose_newsletter(articles, window))
                .await
            {
                Ok(Ok(body)) if !body.trim().is_empty() => return (body, true),
                Ok(Ok(_)) => warn!("Newsletter model returned an empty body, using template"),
                Ok(Err(e)) => warn!("Newsletter generation failed, using template: {}", e),
                Err(_) => warn!(
                    "Newsletter generation timed out after {:?}, using template",
                    self.timeout
                ),
            }
        }
        (render_template(articles, window), false)
    }
}

pub fn newsletter_title(window: &WeekWindow) -> String {
    format!("Campus Brief, Week {} of {}", window.week, window.year)
}

/// Deterministic fallback rendering: one section per article with title,
/// description, score and link.
pub fn render_template(articles: &[Article], window: &WeekWindow) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", newsletter_title(window)));
    out.push_str(&format!(
        "The top {} stories for students, {}.\n",
        articles.len(),
        window.date_range_label()
    ));

    for (i, article) in articles.iter().enumerate() {
        out.push_str(&format!("\n## {}. {}\n\n", i + 1, article.title));
        if !article.description.is_empty() {
            out.push_str(&format!("{}\n\n", article.description));
        }
        out.push_str(&format!(
            "Relevance: {:.1}/10 | Source: {} | [Read more]({})\n",
            article.relevance_score, article.source_name, article.link
        ));
    }
    out
}

/// Minimal Markdown-to-HTML rendering for the archived `html_content`.
/// Covers what the template and typical model output use: headings, lists,
/// bold, links, paragraphs.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut html = String::new();
    let mut in_list = false;
    let mut paragraph: Vec<String> = Vec::new();

    let mut flush_paragraph = |html: &mut String, paragraph: &mut Vec<String>| {
        if !paragraph.is_empty() {
            html.push_str(&format!("<p>{}</p>\n", render_inline(&paragraph.join(" "))));
            paragraph.clear();
        }
    };

    for line in markdown.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            flush_paragraph(&mut html, &mut paragraph);
            if in_list {
                html.push_str("</ul>\n");
                in_list = false;
            }
        } else if let Some(rest) = trimmed.strip_prefix("## ") {
            flush_paragraph(&mut html, &mut paragraph);
            html.push_str(&format!("<h2>{}</h2>\n", render_inline(rest)));
        } else if let Some(rest) = trimmed.strip_prefix("# ") {
            flush_paragraph(&mut html, &mut paragraph);
            html.push_str(&format!("<h1>{}</h1>\n", render_inline(rest)));
        } else if let Some(rest) = trimmed.strip_prefix("- ") {
            flush_paragraph(&mut html, &mut paragraph);
            if !in_list {
                html.push_str("<ul>\n");
                in_list = true;
            }
            html.push_str(&format!("<li>{}</li>\n", render_inline(rest)));
        } else {
            if in_list {
                html.push_str("</ul>\n");
                in_list = false;
            }
            paragraph.push(trimmed.to_string());
        }
    }
    flush_paragraph(&mut html, &mut paragraph);
    if in_list {
        html.push_str("</ul>\n");
    }
    html
}

/// Inline Markdown: `[text](url)` and `**bold**`.
fn render_inline(text: &str) -> String {
    let mut out = String::new();
    let mut rest = text;

    while let Some(start) = rest.find('[') {
        let (before, tail) = rest.split_at(start);
        out.push_str(&render_bold(before));
        if let Some(close) = tail.find("](") {
            if let Some(end) = tail[close..].find(')') {
                let label = &tail[1..close];
                let url = &tail[close + 2..close + end];
                out.push_str(&format!("<a href=\"{}\">{}</a>", url, render_bold(label)));
                rest = &tail[close + end + 1..];
                continue;
            }
        }
        // Unmatched bracket, emit literally.
        out.push('[');
        rest = &tail[1..];
    }
    out.push_str(&render_bold(rest));
    out
}

fn render_bold(text: &str) -> String {
    let mut out = String::new();
    let mut parts = text.split("**");
    if let Some(first) = parts.next() {
        out.push_str(first);
    }
    let mut open = true;
    for part in parts {
        out.push_str(if open { "<strong>" } else { "</strong>" });
        out.push_str(part);
        open = !open;
    }
    // Odd trailing marker: close the tag to keep output well-formed.
    if !open {
        out.push_str("</strong>");
    }
    out
}
