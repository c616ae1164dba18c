//! List-page extraction strategies
//!
//! Three structurally different list layouts exist on the source site:
//! - the legacy layout (`.list li` with an anchor and a date `<span>`),
//! - the notice layout (plain `<li>` rows carrying a "发布时间：YYYY-MM-DD"
//!   text marker),
//! - the zcpt layout (`li.wb-data-list` with `span.wb-data-date`).
//!
//! A page may be recognized by more than one shape; that redundancy is
//! intentional and the caller unions the results.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use url::Url;

/// A single announcement row extracted from a list page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub title: String,
    /// Relative or absolute link to the detail page
    pub link: String,
    /// Date text as published, not yet normalized
    pub date_raw: String,
}

fn published_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"发布时间[:：]\s*(\d{4}-\d{2}-\d{2})").unwrap())
}

/// Collects an element's text nodes, trimmed and joined with a separator
fn element_text(el: ElementRef, sep: &str) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Parses the legacy list layout: `.list li` rows with `<a>` + `<span>`
pub fn parse_list_page(html: &str) -> Vec<ListItem> {
    let document = Html::parse_document(html);
    let mut items = Vec::new();

    let Ok(li_selector) = Selector::parse(".list li") else {
        return items;
    };
    let Ok(a_selector) = Selector::parse("a") else {
        return items;
    };
    let Ok(span_selector) = Selector::parse("span") else {
        return items;
    };

    for li in document.select(&li_selector) {
        let (Some(a), Some(span)) = (
            li.select(&a_selector).next(),
            li.select(&span_selector).next(),
        ) else {
            continue;
        };

        let title = element_text(a, "");
        let link = a.value().attr("href").unwrap_or("").trim().to_string();
        let date_raw = element_text(span, "");
        if title.is_empty() || link.is_empty() {
            continue;
        }
        items.push(ListItem {
            title,
            link,
            date_raw,
        });
    }

    items
}

/// Parses the notice layout, where the date is embedded as row text
/// like `发布时间：YYYY-MM-DD HH:MM:SS`
pub fn parse_notice_list_page(html: &str) -> Vec<ListItem> {
    let document = Html::parse_document(html);
    let mut items = Vec::new();

    let Ok(li_selector) = Selector::parse("li") else {
        return items;
    };
    let Ok(a_selector) = Selector::parse("a") else {
        return items;
    };

    for li in document.select(&li_selector) {
        let text = element_text(li, " ");
        let Some(captures) = published_date_re().captures(&text) else {
            continue;
        };
        let Some(a) = li.select(&a_selector).next() else {
            continue;
        };

        let title = element_text(a, "");
        let link = a.value().attr("href").unwrap_or("").trim().to_string();
        if title.is_empty() || link.is_empty() {
            continue;
        }
        items.push(ListItem {
            title,
            link,
            date_raw: captures[1].to_string(),
        });
    }

    items
}

/// Parses the zcpt layout: `li.wb-data-list` rows with `span.wb-data-date`
///
/// Dates on these pages are not guaranteed to be sorted within a page; the
/// crawl collector's stop rule accounts for that.
pub fn parse_zcpt_list_page(html: &str) -> Vec<ListItem> {
    let document = Html::parse_document(html);
    let mut items = Vec::new();

    let Ok(li_selector) = Selector::parse("li.wb-data-list") else {
        return items;
    };
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return items;
    };
    let Ok(date_selector) = Selector::parse("span.wb-data-date") else {
        return items;
    };

    for li in document.select(&li_selector) {
        let (Some(a), Some(date)) = (
            li.select(&a_selector).next(),
            li.select(&date_selector).next(),
        ) else {
            continue;
        };

        let title = element_text(a, " ");
        let link = a.value().attr("href").unwrap_or("").trim().to_string();
        let date_raw = element_text(date, "");
        if title.is_empty() || link.is_empty() || date_raw.is_empty() {
            continue;
        }
        items.push(ListItem {
            title,
            link,
            date_raw,
        });
    }

    items
}

/// Extracts category navigation links, resolved against the base URL
pub fn parse_category_links(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut urls = Vec::new();

    let Ok(base) = Url::parse(base_url) else {
        return urls;
    };
    let Ok(selector) = Selector::parse("ul.list-se a[href], ul.menu-list a[href]") else {
        return urls;
    };

    for a in document.select(&selector) {
        let href = a.value().attr("href").unwrap_or("").trim();
        if href.is_empty() {
            continue;
        }
        if let Ok(resolved) = base.join(href) {
            urls.push(resolved.to_string());
        }
    }

    urls
}

/// Finds the generic "next page" pager link ("下一页"), absolute if found
///
/// Looks inside the common pager container first, falling back to the whole
/// document.
pub fn parse_next_page_url(html: &str, current_url: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let pager_selector = Selector::parse("div.fenye").ok()?;
    let a_selector = Selector::parse("a").ok()?;

    let anchors: Vec<ElementRef> = match document.select(&pager_selector).next() {
        Some(pager) => pager.select(&a_selector).collect(),
        None => document.select(&a_selector).collect(),
    };

    for a in anchors {
        if element_text(a, "") != "下一页" {
            continue;
        }
        let href = a.value().attr("href").unwrap_or("").trim();
        if href.is_empty() {
            return None;
        }
        let base = Url::parse(current_url).ok()?;
        return base.join(href).ok().map(|u| u.to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_page_basic() {
        let html = r#"
            <div class="list"><ul>
                <li><a href="/notice/1.html">软件采购公告</a><span>2025-03-10</span></li>
                <li><a href="/notice/2.html">平台招标公告</a><span>2025-03-09</span></li>
                <li><a href="/notice/3.html"></a><span>2025-03-09</span></li>
            </ul></div>
        "#;
        let items = parse_list_page(html);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "软件采购公告");
        assert_eq!(items[0].link, "/notice/1.html");
        assert_eq!(items[0].date_raw, "2025-03-10");
    }

    #[test]
    fn test_parse_list_page_ignores_rows_without_span() {
        let html = r#"<div class="list"><ul><li><a href="/x">标题</a></li></ul></div>"#;
        assert!(parse_list_page(html).is_empty());
    }

    #[test]
    fn test_parse_notice_list_page() {
        let html = r#"
            <ul>
                <li><a href="/n/1.html">系统建设公告</a> 发布时间：2025-03-10 09:00:00</li>
                <li><a href="/n/2.html">无日期行</a></li>
            </ul>
        "#;
        let items = parse_notice_list_page(html);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].date_raw, "2025-03-10");
    }

    #[test]
    fn test_parse_zcpt_list_page() {
        let html = r#"
            <ul>
                <li class="wb-data-list">
                    <a href="/z/1.html">大数据平台采购</a>
                    <span class="wb-data-date">2025-03-08</span>
                </li>
                <li class="wb-data-list"><a href="/z/2.html">缺日期</a></li>
            </ul>
        "#;
        let items = parse_zcpt_list_page(html);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "大数据平台采购");
        assert_eq!(items[0].date_raw, "2025-03-08");
    }

    #[test]
    fn test_multiple_shapes_can_match_same_page() {
        let html = r#"
            <div class="list"><ul>
                <li class="wb-data-list">
                    <a href="/b/1.html">双形态公告</a>
                    <span class="wb-data-date">2025-03-08</span>
                </li>
            </ul></div>
        "#;
        assert_eq!(parse_list_page(html).len(), 1);
        assert_eq!(parse_zcpt_list_page(html).len(), 1);
    }

    #[test]
    fn test_parse_category_links_resolved() {
        let html = r#"
            <ul class="list-se">
                <a href="/cat/a/">A</a>
                <a href="https://other.example.com/cat/b/">B</a>
            </ul>
            <ul class="menu-list"><a href="/cat/c/">C</a></ul>
            <ul class="unrelated"><a href="/cat/d/">D</a></ul>
        "#;
        let links = parse_category_links(html, "https://announce.example.com");
        assert_eq!(
            links,
            vec![
                "https://announce.example.com/cat/a/",
                "https://other.example.com/cat/b/",
                "https://announce.example.com/cat/c/",
            ]
        );
    }

    #[test]
    fn test_parse_next_page_url_in_pager() {
        let html = r#"
            <div class="fenye">
                <a href="index_1.jhtml">上一页</a>
                <a href="index_3.jhtml">下一页</a>
            </div>
        "#;
        let next = parse_next_page_url(html, "https://announce.example.com/cat/index_2.jhtml");
        assert_eq!(
            next.as_deref(),
            Some("https://announce.example.com/cat/index_3.jhtml")
        );
    }

    #[test]
    fn test_parse_next_page_url_absent() {
        let html = r#"<div class="fenye"><a href="index_1.jhtml">上一页</a></div>"#;
        assert_eq!(
            parse_next_page_url(html, "https://announce.example.com/cat/index_2.jhtml"),
            None
        );
    }
}
