/// RSS node: fetch an RSS 2.0 or Atom feed, normalize, sort and truncate
///
/// Items are normalized to `{title, link, description, pubDate, guid}`.
/// Sorting compares dates chronologically when both values parse as
/// RFC 2822 or RFC 3339 timestamps and falls back to text comparison.

use super::{as_list, Execute, NodeContext, NodeOutput};
use crate::error::NodeError;
use crate::expression::xml::{self, text_of};
use crate::runtime::services::{HttpRequest, Services};
use crate::workflow::types::{RssConfig, SortDirection};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde_json::{json, Value};
use std::cmp::Ordering;

const FEED_ACCEPT: &str = "application/rss+xml, application/atom+xml, application/xml, text/xml";

#[async_trait]
impl Execute for RssConfig {
    async fn execute(&self, ctx: &NodeContext<'_>, services: &Services) -> Result<NodeOutput, NodeError> {
        if self.url.trim().is_empty() {
            return Err(NodeError::Configuration("RSS node has no feed URL".to_string()));
        }
        let url = ctx.render(self.url.trim())?;

        tracing::debug!("📰 Fetching feed: {}", url);

        let mut request = HttpRequest::get(url.clone());
        request.headers.push(("Accept".to_string(), FEED_ACCEPT.to_string()));
        request.timeout = Some(ctx.timeout);

        let response = services
            .http
            .request(request)
            .await
            .map_err(|e| NodeError::External(format!("feed request failed: {}", e)))?;
        if !response.is_success() {
            return Err(NodeError::External(format!(
                "feed request returned status {}",
                response.status
            )));
        }

        let document = xml::to_value(&response.body)
            .map_err(|e| NodeError::External(format!("cannot parse feed: {}", e)))?;
        let (title, mut items) = read_feed(&document)?;

        if let Some(field) = self.sort_field.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
            items.sort_by(|a, b| {
                let ordering = compare_field(a.get(field), b.get(field));
                match self.sort_direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }
        if let Some(max) = self.max_items {
            items.truncate(max);
        }

        tracing::info!("📰 Feed '{}' returned {} items", url, items.len());

        Ok(NodeOutput::new(json!({
            "title": title,
            "count": items.len(),
            "items": items,
        })))
    }
}

fn read_feed(document: &Value) -> Result<(String, Vec<Value>), NodeError> {
    if let Some(channel) = document.get("rss").and_then(|rss| rss.get("channel")) {
        let items = as_list(channel.get("item"))
            .iter()
            .map(|item| {
                json!({
                    "title": field_text(item, "title"),
                    "link": field_text(item, "link"),
                    "description": field_text(item, "description"),
                    "pubDate": field_text(item, "pubDate"),
                    "guid": field_text(item, "guid"),
                })
            })
            .collect();
        return Ok((field_text(channel, "title"), items));
    }

    if let Some(feed) = document.get("feed") {
        let items = as_list(feed.get("entry"))
            .iter()
            .map(|entry| {
                let description = match field_text(entry, "summary") {
                    summary if summary.is_empty() => field_text(entry, "content"),
                    summary => summary,
                };
                let published = match field_text(entry, "updated") {
                    updated if updated.is_empty() => field_text(entry, "published"),
                    updated => updated,
                };
                json!({
                    "title": field_text(entry, "title"),
                    "link": atom_link(entry.get("link")),
                    "description": description,
                    "pubDate": published,
                    "guid": field_text(entry, "id"),
                })
            })
            .collect();
        return Ok((field_text(feed, "title"), items));
    }

    Err(NodeError::External("document is neither an RSS nor an Atom feed".to_string()))
}

fn field_text(value: &Value, field: &str) -> String {
    value.get(field).and_then(text_of).unwrap_or_default()
}

/// Prefer the `alternate` link of an Atom entry, else the first one
fn atom_link(links: Option<&Value>) -> String {
    let links = as_list(links);
    let href = |link: &Value| link.get("@href").and_then(Value::as_str).map(str::to_string);
    links
        .iter()
        .find(|l| l.get("@rel").and_then(Value::as_str) == Some("alternate"))
        .and_then(href)
        .or_else(|| links.first().and_then(href))
        .unwrap_or_default()
}

fn parse_date(text: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(text.trim())
        .or_else(|_| DateTime::parse_from_rfc3339(text.trim()))
        .ok()
}

fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.and_then(Value::as_str).unwrap_or_default();
    let b = b.and_then(Value::as_str).unwrap_or_default();
    match (parse_date(a), parse_date(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}
