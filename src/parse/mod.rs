//! HTML extraction for list and detail pages
//!
//! The site has evolved through several HTML layouts, so list extraction is a
//! set of independent strategies applied speculatively to every page; callers
//! union the results. All functions here are pure: markup in, structured
//! fields out, no network.

mod detail;
mod list;

pub use detail::extract_detail_content;
pub use list::{
    parse_category_links, parse_list_page, parse_next_page_url, parse_notice_list_page,
    parse_zcpt_list_page, ListItem,
};
