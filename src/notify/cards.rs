//! Interactive card layouts

use serde_json::{json, Value};

/// One announcement as rendered in a notification
#[derive(Debug, Clone)]
pub struct DigestItem {
    pub title: String,
    pub date: String,
    pub ai_summary: String,
    pub url: String,
}

/// Run-level figures shown in card headers
#[derive(Debug, Clone, Copy)]
pub struct RunSummaryInfo<'a> {
    pub execution_time: &'a str,
    pub keyword_label: &'a str,
    pub total_processed: u32,
    pub total_new: u32,
    pub total_duplicate: u32,
    pub days_lookback: u32,
}

/// One page of a digest, with its position in the whole batch
#[derive(Debug, Clone, Copy)]
pub struct DigestChunk<'a> {
    pub items: &'a [DigestItem],
    /// 1-based index of the first item in the whole batch
    pub start_index: usize,
    /// Total new items across all chunks
    pub total: usize,
}

fn wrap(card: Value) -> Value {
    json!({ "msg_type": "interactive", "card": card })
}

fn header(title: &str, template: &str) -> Value {
    json!({
        "title": { "tag": "plain_text", "content": title },
        "template": template,
    })
}

fn md_div(content: String) -> Value {
    json!({ "tag": "div", "text": { "tag": "lark_md", "content": content } })
}

fn link_button(label: &str, url: &str) -> Value {
    json!({
        "tag": "action",
        "actions": [{
            "tag": "button",
            "text": { "tag": "plain_text", "content": label },
            "type": "primary",
            "url": url,
        }],
    })
}

/// Card for a single new announcement (per-item mode)
pub fn build_new_item_card(item: &DigestItem, card_image_url: Option<&str>) -> Value {
    let mut elements = Vec::new();
    if let Some(image_url) = card_image_url {
        elements.push(json!({
            "tag": "img",
            "img_key": image_url,
            "alt": { "tag": "plain_text", "content": "" },
        }));
    }
    elements.push(md_div(format!(
        "**{}**\n发布日期：{}\n\n{}",
        item.title, item.date, item.ai_summary
    )));
    elements.push(link_button("查看原文", &item.url));

    wrap(json!({
        "header": header("新采购公告", "blue"),
        "elements": elements,
    }))
}

/// Run-completion stats card (per-item mode)
pub fn build_summary_card(info: &RunSummaryInfo<'_>) -> Value {
    wrap(json!({
        "header": header("采购公告巡检完成", "green"),
        "elements": [md_div(format!(
            "{} | 关键词：{} | 近{}天\n处理 {} 条，新增 {} 条，重复 {} 条",
            info.execution_time,
            info.keyword_label,
            info.days_lookback,
            info.total_processed,
            info.total_new,
            info.total_duplicate,
        ))],
    }))
}

/// Digest card for one chunk of new announcements
///
/// The first item is rendered in full with its own link button; the rest
/// are compact one-line entries. A trailing action links to the public list
/// when one is configured.
pub fn build_digest_card(
    info: &RunSummaryInfo<'_>,
    chunk: &DigestChunk<'_>,
    public_url: Option<&str>,
) -> Value {
    let end_index = chunk.start_index + chunk.items.len().saturating_sub(1);
    let mut elements = vec![md_div(format!(
        "{} | 关键词：{} | 近{}天 | 新增{}/重复{}/处理{} | 第{}-{}条，共{}条",
        info.execution_time,
        info.keyword_label,
        info.days_lookback,
        info.total_new,
        info.total_duplicate,
        info.total_processed,
        chunk.start_index,
        end_index,
        chunk.total,
    ))];

    if let Some((first, rest)) = chunk.items.split_first() {
        elements.push(json!({ "tag": "hr" }));
        elements.push(md_div(format!(
            "**{}**\n发布日期：{}\n\n{}",
            first.title, first.date, first.ai_summary
        )));
        elements.push(link_button("查看原文", &first.url));

        if !rest.is_empty() {
            let lines: Vec<String> = rest
                .iter()
                .map(|item| format!("• [{}]({})  {}", item.title, item.url, item.date))
                .collect();
            elements.push(json!({ "tag": "hr" }));
            elements.push(md_div(lines.join("\n")));
        }
    }

    if let Some(url) = public_url {
        elements.push(link_button("查看全部公告", url));
    }

    wrap(json!({
        "header": header("采购公告速递", "blue"),
        "elements": elements,
    }))
}

/// Card reporting a failed run
pub fn build_error_card(run_id: &str, execution_time: &str, error: &str) -> Value {
    wrap(json!({
        "header": header("采购公告巡检失败", "red"),
        "elements": [md_div(format!(
            "{}\n运行编号：{}\n\n错误：{}",
            execution_time, run_id, error
        ))],
    }))
}
