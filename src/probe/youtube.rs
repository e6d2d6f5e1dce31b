use std::sync::LazyLock;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::DateTime;
use regex::Regex;
use reqwest::{Client, Url};
use serde_json::Value;

use super::{LiveStatusSource, ProbeError, StreamEntry};

static LIKE_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""likeCount"\s*:\s*"?(\d+)"#).unwrap());

// Without a browser UA the consent interstitial is served instead of the page.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const INITIAL_DATA_MARKER: &str = "var ytInitialData";
const PLAYER_RESPONSE_MARKER: &str = "var ytInitialPlayerResponse";

/// Live-status lookup against a channel's `/streams` listing, with metrics
/// pulled from the watch page of the first live entry.
pub struct YoutubeSource {
    client: Client,
}

impl YoutubeSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_page(&self, url: &str) -> Result<String, ProbeError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    async fn stream_details(&self, watch_url: &str) -> Result<StreamDetails, ProbeError> {
        let html = self.fetch_page(watch_url).await?;

        let blob = extract_json_object(&html, PLAYER_RESPONSE_MARKER)
            .ok_or(ProbeError::MalformedPage("no player response"))?;
        let player: Value = serde_json::from_str(blob)?;

        let viewers = player
            .get("videoDetails")
            .and_then(|d| d.get("viewCount"))
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse().ok());

        let release_timestamp = player
            .get("microformat")
            .and_then(|m| m.get("playerMicroformatRenderer"))
            .and_then(|m| m.get("liveBroadcastDetails"))
            .and_then(|d| d.get("startTimestamp"))
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.timestamp());

        let likes = LIKE_COUNT_RE
            .captures(&html)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok());

        Ok(StreamDetails {
            viewers,
            likes,
            release_timestamp,
        })
    }
}

#[derive(Debug, Default)]
struct StreamDetails {
    viewers: Option<u64>,
    likes: Option<u64>,
    release_timestamp: Option<i64>,
}

#[async_trait]
impl LiveStatusSource for YoutubeSource {
    async fn live_streams(&self, channel_url: &str) -> Result<Vec<StreamEntry>, ProbeError> {
        let origin = page_origin(channel_url)?;
        let listing_url = format!("{}/streams", channel_url.trim_end_matches('/'));
        let html = self.fetch_page(&listing_url).await?;

        let blob = extract_json_object(&html, INITIAL_DATA_MARKER)
            .ok_or(ProbeError::MalformedPage("no initial data"))?;
        let data: Value = serde_json::from_str(blob)?;

        let items = listing_items(&data).ok_or(ProbeError::MissingListing)?;

        let mut entries = Vec::with_capacity(items.len());
        let mut detailed = false;
        for item in items {
            let Some(video) = video_renderer(item) else {
                continue;
            };
            let Some(video_id) = video.get("videoId").and_then(Value::as_str) else {
                continue;
            };

            let is_live = has_live_badge(video);
            let watch_url = format!("{origin}/watch?v={video_id}");
            let mut entry = StreamEntry {
                is_live,
                url: Some(watch_url.clone()),
                ..StreamEntry::default()
            };

            // Only the first live entry gets the expensive watch-page lookup.
            if is_live && !detailed {
                detailed = true;
                tracing::debug!("live entry found, fetching {watch_url}");
                let details = self.stream_details(&watch_url).await?;
                entry.viewers = details.viewers;
                entry.likes = details.likes;
                entry.release_timestamp = details.release_timestamp;
            }

            entries.push(entry);
        }

        Ok(entries)
    }
}

fn page_origin(channel_url: &str) -> Result<String, ProbeError> {
    let url = Url::parse(channel_url)
        .map_err(|_| ProbeError::MalformedPage("channel url is not a url"))?;
    let origin = url.origin().ascii_serialization();
    if origin == "null" {
        return Err(ProbeError::MalformedPage("channel url has no origin"));
    }
    Ok(origin)
}

/// Locate the `{...}` object assigned right after `marker`, balancing braces
/// while skipping string contents. The page inlines these blobs on one line,
/// so a regex over the whole document is both fragile and slow.
fn extract_json_object<'a>(html: &'a str, marker: &str) -> Option<&'a str> {
    let after_marker = &html[html.find(marker)? + marker.len()..];
    let open = after_marker.find('{')?;
    let bytes = after_marker.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&after_marker[open..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// The streams tab's grid items, wherever the tab landed in the response.
fn listing_items(data: &Value) -> Option<&Vec<Value>> {
    data.get("contents")?
        .get("twoColumnBrowseResultsRenderer")?
        .get("tabs")?
        .as_array()?
        .iter()
        .find_map(|tab| {
            tab.get("tabRenderer")?
                .get("content")?
                .get("richGridRenderer")?
                .get("contents")?
                .as_array()
        })
}

fn video_renderer(item: &Value) -> Option<&Value> {
    item.get("richItemRenderer")?
        .get("content")?
        .get("videoRenderer")
}

fn has_live_badge(video: &Value) -> bool {
    video
        .get("thumbnailOverlays")
        .and_then(Value::as_array)
        .is_some_and(|overlays| {
            overlays.iter().any(|overlay| {
                overlay
                    .get("thumbnailOverlayTimeStatusRenderer")
                    .and_then(|r| r.get("style"))
                    .and_then(Value::as_str)
                    == Some("LIVE")
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_json_object_balances_braces() {
        let html = r#"<script>var ytInitialData = {"a":{"b":1},"c":"}"};</script>"#;
        let blob = extract_json_object(html, INITIAL_DATA_MARKER).unwrap();
        let parsed: Value = serde_json::from_str(blob).unwrap();
        assert_eq!(parsed["a"]["b"], 1);
        assert_eq!(parsed["c"], "}");
    }

    #[test]
    fn extract_json_object_handles_escaped_quotes() {
        let html = r#"var ytInitialData = {"title":"say \"hi\" {now}"};"#;
        let blob = extract_json_object(html, INITIAL_DATA_MARKER).unwrap();
        let parsed: Value = serde_json::from_str(blob).unwrap();
        assert_eq!(parsed["title"], "say \"hi\" {now}");
    }

    #[test]
    fn extract_json_object_missing_marker() {
        assert!(extract_json_object("<html></html>", INITIAL_DATA_MARKER).is_none());
    }

    #[test]
    fn live_badge_detection() {
        let live = json!({
            "videoId": "abc",
            "thumbnailOverlays": [
                {"thumbnailOverlayTimeStatusRenderer": {"style": "LIVE"}}
            ]
        });
        let upcoming = json!({
            "videoId": "def",
            "thumbnailOverlays": [
                {"thumbnailOverlayTimeStatusRenderer": {"style": "UPCOMING"}}
            ]
        });
        let vod = json!({"videoId": "ghi"});

        assert!(has_live_badge(&live));
        assert!(!has_live_badge(&upcoming));
        assert!(!has_live_badge(&vod));
    }

    #[test]
    fn page_origin_strips_path() {
        assert_eq!(
            page_origin("https://www.youtube.com/@somebody").unwrap(),
            "https://www.youtube.com"
        );
        assert_eq!(
            page_origin("http://127.0.0.1:8080/@somebody/").unwrap(),
            "http://127.0.0.1:8080"
        );
        assert!(page_origin("not a url").is_err());
    }

    #[test]
    fn like_count_regex_accepts_both_encodings() {
        let quoted = r#"{"likeCount":"4821"}"#;
        let bare = r#"{"likeCount": 4821}"#;
        assert_eq!(&LIKE_COUNT_RE.captures(quoted).unwrap()[1], "4821");
        assert_eq!(&LIKE_COUNT_RE.captures(bare).unwrap()[1], "4821");
    }
}
