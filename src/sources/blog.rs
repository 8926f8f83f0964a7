use super::{get, FetchError};
use scraper::{Html, Selector};
use tracing::info;

/// Fetch a blog post and return the text of its paragraphs.
pub async fn fetch_blog_content(url: &str) -> Result<String, FetchError> {
    let resp = get(url).await?;
    let html = resp.text().await?;
    let content = paragraph_text(&html);
    if content.is_empty() {
        return Err(FetchError::NoContent(format!(
            "No paragraph text found at '{url}'"
        )));
    }
    info!(url, chars = content.chars().count(), "blog content fetched");
    Ok(content)
}

/// Text of every non-empty `<p>`, one per line, in document order.
pub fn paragraph_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("p") else {
        return String::new();
    };
    document
        .select(&selector)
        .map(|p| p.text().collect::<String>())
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_text() {
        let html = r#"
            <html><head><style>p { color: red }</style></head>
            <body>
              <h1>Title</h1>
              <p>First <b>bold</b> paragraph.</p>
              <div><p>   </p><p>Second &amp; last.</p></div>
            </body></html>"#;
        assert_eq!(paragraph_text(html), "First bold paragraph.\nSecond & last.");
    }

    #[test]
    fn test_paragraph_text_none() {
        assert_eq!(paragraph_text("<html><body><div>no paragraphs</div></body></html>"), "");
    }
}
