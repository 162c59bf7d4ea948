//! Minimal server-rendered pages. Every interpolated value is escaped.
use crate::model::{BookWithLinks, RetailerLink};

pub fn home(featured: Option<&BookWithLinks>) -> String {
    let body = match featured {
        Some(b) => format!(
            "<section class=\"featured\">{}</section>\n<p><a href=\"/books\">All books</a></p>",
            book_card(b)
        ),
        None => "<p>New books are on the way.</p>".to_string(),
    };
    layout("Home", &body)
}

pub fn book_list(books: &[BookWithLinks]) -> String {
    if books.is_empty() {
        return layout("Books", "<p>No books yet.</p>");
    }
    let items: String = books
        .iter()
        .map(|b| format!("<li>{}</li>\n", book_card(b)))
        .collect();
    layout("Books", &format!("<ul class=\"books\">\n{items}</ul>"))
}

pub fn book_detail(b: &BookWithLinks) -> String {
    let book = &b.book;
    let mut body = String::new();
    if let Some(cover) = &book.cover_image_url {
        body.push_str(&format!(
            "<img class=\"cover\" src=\"{}\" alt=\"{}\" />\n",
            escape(cover),
            escape(&book.title)
        ));
    }
    for sub in [&book.subtitle1, &book.subtitle2].into_iter().flatten() {
        body.push_str(&format!("<h2>{}</h2>\n", escape(sub)));
    }
    if book.coming_soon {
        body.push_str("<p class=\"badge\">Coming soon</p>\n");
    }
    if let Some(desc) = book.long_description.as_ref().or(book.short_description.as_ref()) {
        body.push_str(&format!("<div class=\"description\">{}</div>\n", escape(desc)));
    }
    if let Some(isbn) = &book.isbn {
        body.push_str(&format!("<p class=\"isbn\">ISBN {}</p>\n", escape(isbn)));
    }
    body.push_str(&links(&b.retailers));
    if let Some(back) = &book.back_cover_image_url {
        body.push_str(&format!(
            "<img class=\"back-cover\" src=\"{}\" alt=\"\" />\n",
            escape(back)
        ));
    }
    layout(book.seo_title.as_deref().unwrap_or(&book.title), &body)
}

pub fn not_found() -> String {
    layout("Not found", "<p>That book could not be found.</p>")
}

fn book_card(b: &BookWithLinks) -> String {
    let book = &b.book;
    let mut card = format!(
        "<a href=\"/books/{}\">{}</a>",
        escape(&book.slug),
        escape(&book.title)
    );
    if book.coming_soon {
        card.push_str(" <span class=\"badge\">Coming soon</span>");
    }
    if let Some(short) = &book.short_description {
        card.push_str(&format!("<p>{}</p>", escape(short)));
    }
    card.push_str(&links(&b.retailers));
    card
}

fn links(retailers: &[RetailerLink]) -> String {
    if retailers.is_empty() {
        return String::new();
    }
    let items: String = retailers
        .iter()
        .map(|l| {
            format!(
                "<li><a href=\"{}\" rel=\"noopener\">{}</a></li>",
                escape(&l.url),
                escape(&l.name)
            )
        })
        .collect();
    format!("<ul class=\"retailers\">{items}</ul>\n")
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
  </head>
  <body>
    <header><h1>{title}</h1></header>
    <main>
{body}
    </main>
  </body>
</html>"#,
        title = escape(title),
        body = body
    )
}

/// Escapes text for both element content and double- or single-quoted
/// attribute values.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Book;
    use chrono::Utc;

    fn book(title: &str) -> BookWithLinks {
        BookWithLinks {
            book: Book {
                id: 1,
                slug: "guide".into(),
                title: title.into(),
                subtitle1: None,
                subtitle2: None,
                isbn: None,
                short_description: None,
                long_description: None,
                cover_image_url: None,
                back_cover_image_url: None,
                direct_sale_enabled: false,
                stripe_product_id: None,
                paypal_button_id: None,
                is_published: true,
                coming_soon: false,
                tags: vec![],
                sales_metadata: Default::default(),
                seo: Default::default(),
                seo_title: None,
                seo_description: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            retailers: vec![RetailerLink {
                retailer_id: 1,
                name: "Amazon".into(),
                slug: "amazon".into(),
                kind: "marketplace".into(),
                url: "https://amazon.com/x?a=1&b=\"2\"".into(),
                logo_url: None,
                is_active: true,
                retailer_active: true,
                types: vec![],
            }],
        }
    }

    #[test]
    fn detail_escapes_text_and_attributes() {
        let html = book_detail(&book("<script>alert(1)</script>"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("href=\"https://amazon.com/x?a=1&amp;b=&quot;2&quot;\""));
    }

    #[test]
    fn escape_covers_quotes() {
        assert_eq!(escape(r#"O'Neil & "Co" <b>"#), "O&#39;Neil &amp; &quot;Co&quot; &lt;b&gt;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn empty_list_renders_placeholder() {
        assert!(book_list(&[]).contains("No books yet."));
        assert!(home(None).contains("on the way"));
    }
}
