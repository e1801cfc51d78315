//! Readable text extraction from news pages.
//!
//! Non-content elements are skipped, the main content region is preferred
//! over the whole document, whitespace is collapsed and the output is capped
//! at a character budget.

use scraper::{ElementRef, Html, Selector};

use crate::domain::record::MAX_CONTENT_CHARS;

/// Elements whose text never counts as page content.
const SKIPPED_TAGS: [&str; 5] = ["script", "style", "nav", "footer", "header"];


/// Extracts at most [`MAX_CONTENT_CHARS`] characters of readable text.
pub fn extract_text(html: &str) -> String {
    extract_text_with_limit(html, MAX_CONTENT_CHARS)
}

/// Extracts readable text truncated to `max_chars` characters.
///
/// Returns an empty string when the page has no readable text.
pub fn extract_text_with_limit(html: &str, max_chars: usize) -> String {
    let document = Html::parse_document(html);

    let regions = [
        first_match(&document, "article"),
        first_match(&document, "main"),
        content_div(&document),
        first_match(&document, "body"),
    ];
    let text = regions
        .into_iter()
        .flatten()
        .map(visible_text)
        .find(|text| !text.is_empty())
        .unwrap_or_default();

    text.chars().take(max_chars).collect()
}

fn first_match<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    document.select(&selector).next()
}

/// First `div` whose class attribute mentions "content", in any case.
fn content_div(document: &Html) -> Option<ElementRef<'_>> {
    let selector = Selector::parse("div[class]").ok()?;
    document.select(&selector).find(|div| {
        div.value()
            .attr("class")
            .is_some_and(|class| class.to_lowercase().contains("content"))
    })
}

/// Collects the text below `root`, skipping boilerplate subtrees, with runs
/// of whitespace collapsed to single spaces.
fn visible_text(root: ElementRef<'_>) -> String {
    let mut words: Vec<&str> = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let skipped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| SKIPPED_TAGS.contains(&el.name()))
        });
        if !skipped {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_is_preferred_and_boilerplate_dropped() {
        let html = r#"<html><body>
            <header>Site header</header>
            <nav>Menu</nav>
            <article><h1>Projeto aprovado</h1>
                <script>var tracking = 1;</script>
                <p>A   câmara
                aprovou o projeto.</p></article>
            <footer>Rodapé</footer>
        </body></html>"#;
        let text = extract_text(html);
        assert_eq!(text, "Projeto aprovado A câmara aprovou o projeto.");
    }

    #[test]
    fn main_then_content_div_then_body() {
        let html = "<html><body><div>Outer</div><main>Main text</main></body></html>";
        assert_eq!(extract_text(html), "Main text");

        let html = r#"<html><body><div class="post-content">Div text</div><p>Other</p></body></html>"#;
        assert_eq!(extract_text(html), "Div text");

        let html = r#"<html><body><div class="mainContent">Camel case</div><p>Other</p></body></html>"#;
        assert_eq!(extract_text(html), "Camel case");

        let html = "<html><body><style>.a{}</style><p>Body only</p></body></html>";
        assert_eq!(extract_text(html), "Body only");
    }

    #[test]
    fn empty_article_falls_through() {
        let html = "<html><body><article> <script>x()</script> </article><main>Real</main></body></html>";
        assert_eq!(extract_text(html), "Real");
    }

    #[test]
    fn output_is_truncated_by_chars() {
        let html = format!("<html><body><p>{}</p></body></html>", "ção ".repeat(1000));
        let text = extract_text(&html);
        assert_eq!(text.chars().count(), MAX_CONTENT_CHARS);
        assert_eq!(extract_text_with_limit(&html, 3), "ção");
    }

    #[test]
    fn blank_page_yields_empty_text() {
        assert_eq!(extract_text(""), "");
        assert_eq!(extract_text("<html><body>  \n </body></html>"), "");
    }
}
