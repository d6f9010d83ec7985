//! Main-content selection over raw page markup.
//!
//! Non-content subtrees (scripts, navigation, ads) are skipped while collecting
//! text, then the longest block among the likely content containers wins.

use scraper::{ElementRef, Html, Node, Selector};

use super::models::PageContent;
use crate::text::{collapse_whitespace, truncate_chars};

/// Likely main-content containers, most specific first
const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role='main']",
    ".post-content",
    ".entry-content",
    ".article-body",
    "#content",
    ".content",
    "#main",
    ".post",
];

/// Elements whose text is never content
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "aside", "form", "iframe", "svg",
    "button", "template", "select",
];

/// Class/id tokens that mark ads and page furniture
const NOISE_TOKENS: &[&str] = &[
    "ad", "ads", "advert", "advertisement", "sponsored", "sidebar", "cookie", "cookies",
    "cookie-banner", "consent", "share", "sharing", "social", "newsletter", "promo", "related",
    "breadcrumb", "breadcrumbs", "comments",
];

/// Elements that break text flow
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "section", "article",
    "main", "tr", "td", "th", "table", "blockquote", "pre", "dd", "dt", "figcaption", "hr",
];

/// Parse a page and pick its title, description and main text
pub fn parse_page(html: &str, max_chars: usize) -> PageContent {
    let document = Html::parse_document(html);

    let text = extract_main_text(&document);

    PageContent {
        title: extract_title(&document),
        description: extract_description(&document),
        text: truncate_chars(&text, max_chars).to_string(),
    }
}

/// Title from `<title>`, then `og:title`, then the first `<h1>`
fn extract_title(document: &Html) -> Option<String> {
    first_text(document, "title")
        .or_else(|| meta_content(document, "meta[property='og:title']"))
        .or_else(|| first_text(document, "h1"))
}

fn extract_description(document: &Html) -> Option<String> {
    meta_content(document, "meta[name='description']")
        .or_else(|| meta_content(document, "meta[property='og:description']"))
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .find(|c| !c.is_empty())
}

/// Longest cleaned text among the content containers, falling back to `<body>`
fn extract_main_text(document: &Html) -> String {
    let mut best = String::new();

    for selector_str in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for element in document.select(&selector) {
            if is_noise(&element) {
                continue;
            }
            let text = element_text(element);
            // Strictly longer, so earlier selectors win ties
            if text.chars().count() > best.chars().count() {
                best = text;
            }
        }
    }

    if !best.is_empty() {
        return best;
    }

    Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .map(element_text)
        .unwrap_or_default()
}

fn element_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(element, &mut out);
    collapse_whitespace(&out)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                if is_noise(&child_el) {
                    continue;
                }
                let is_block = BLOCK_TAGS.contains(&child_el.value().name());
                if is_block {
                    out.push(' ');
                }
                collect_text(child_el, out);
                if is_block {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

/// Whether an element is page furniture rather than content
fn is_noise(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    if SKIPPED_TAGS.contains(&value.name()) {
        return true;
    }
    if value.attr("aria-hidden") == Some("true") {
        return true;
    }

    value
        .classes()
        .chain(value.id())
        .any(|token| is_noise_token(&token.to_ascii_lowercase()))
}

fn is_noise_token(token: &str) -> bool {
    NOISE_TOKENS.contains(&token)
        || token.starts_with("ad-")
        || token.starts_with("ads-")
        || token.ends_with("-ad")
        || token.ends_with("-ads")
        || token.contains("advert")
        || token.contains("cookie")
        || token.contains("sidebar")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE_PAGE: &str = r#"
        <html>
          <head>
            <title>  Rust Ownership
                 Explained </title>
            <meta name="description" content="A tour of borrowing.">
            <script>var tracking = "should never appear";</script>
          </head>
          <body>
            <nav>Home | About | Contact</nav>
            <header>Site Header</header>
            <div class="ad-banner">Buy things now</div>
            <article>
              <h1>Ownership</h1>
              <p>Every value has a single owner.</p>
              <p>When the owner goes out of scope, the value is dropped.</p>
              <aside>Related posts</aside>
              <script>console.log("nope")</script>
            </article>
            <footer>Copyright</footer>
          </body>
        </html>
    "#;

    #[test]
    fn test_extracts_title_description_and_article() {
        let page = parse_page(ARTICLE_PAGE, 5000);

        assert_eq!(page.title.as_deref(), Some("Rust Ownership Explained"));
        assert_eq!(page.description.as_deref(), Some("A tour of borrowing."));
        assert_eq!(
            page.text,
            "Ownership Every value has a single owner. When the owner goes out of scope, the value is dropped."
        );
    }

    #[test]
    fn test_strips_non_content_elements() {
        let page = parse_page(ARTICLE_PAGE, 5000);

        for noise in ["tracking", "console.log", "Home | About", "Site Header", "Buy things", "Related posts", "Copyright"] {
            assert!(!page.text.contains(noise), "found {:?} in {:?}", noise, page.text);
        }
    }

    #[test]
    fn test_picks_longest_container() {
        let html = r#"
            <html><body>
              <main><p>Short main.</p></main>
              <div class="post-content"><p>This post content block is clearly the longest piece of text on the page.</p></div>
            </body></html>
        "#;
        let page = parse_page(html, 5000);
        assert!(page.text.starts_with("This post content block"));
    }

    #[test]
    fn test_falls_back_to_body_and_og_title() {
        let html = r#"
            <html><head><meta property="og:title" content="OG Title"></head>
            <body><div>Plain body text.</div><nav>menu</nav></body></html>
        "#;
        let page = parse_page(html, 5000);
        assert_eq!(page.title.as_deref(), Some("OG Title"));
        assert_eq!(page.text, "Plain body text.");
        assert!(page.description.is_none());
    }

    #[test]
    fn test_h1_title_fallback() {
        let html = "<html><body><h1>Heading Title</h1><p>text</p></body></html>";
        assert_eq!(parse_page(html, 5000).title.as_deref(), Some("Heading Title"));
    }

    #[test]
    fn test_truncates_text() {
        let html = format!("<html><body><article>{}</article></body></html>", "a".repeat(9000));
        let page = parse_page(&html, 5000);
        assert_eq!(page.text.chars().count(), 5000);
    }

    #[test]
    fn test_noise_tokens() {
        assert!(is_noise_token("ad"));
        assert!(is_noise_token("ad-slot"));
        assert!(is_noise_token("main-sidebar"));
        assert!(is_noise_token("cookie-notice"));
        assert!(!is_noise_token("header-image"));
        assert!(!is_noise_token("read-more"));
        assert!(!is_noise_token("loaded"));
    }
}
