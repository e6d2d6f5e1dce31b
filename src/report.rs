use crate::probe::LiveStatusResult;

const HEADER: &str = "<b>\u{2705} NOW ON AIR:</b>";
const FOOTER: &str = "<i>Powered by <a href=\"https://github.com/muk2/onair\">onair</a></i>";

/// Order live results for the report: most watched first, probe order on
/// ties (`sort_by` is stable).
pub fn rank(mut results: Vec<LiveStatusResult>) -> Vec<LiveStatusResult> {
    results.sort_by(|a, b| b.viewers.cmp(&a.viewers));
    results
}

/// Render the ranked results as Telegram HTML, or `None` when there is
/// nothing on air. `None` means "leave the previous message alone", not
/// "publish an empty report".
pub fn render(ranked: &[LiveStatusResult]) -> Option<String> {
    if ranked.is_empty() {
        return None;
    }

    let mut body = String::new();
    for (position, result) in ranked.iter().enumerate() {
        body.push_str(&format!(
            "{}. <b><a href=\"{}\">{}</a></b>\n",
            position + 1,
            escape_attr(&result.url),
            escape_html(&result.label),
        ));
        if result.viewers > 0 {
            body.push_str(&format!("\u{1f440} Watching: {}\n", result.viewers));
        }
        if result.likes > 0 {
            body.push_str(&format!("\u{1f44d} Likes: {}\n", result.likes));
        }
        if let Some(duration) = &result.duration {
            body.push_str(&format!("\u{1f551} Runtime: {duration}\n"));
        }
        body.push('\n');
    }

    Some(format!("{HEADER}\n\n{body}{FOOTER}"))
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(raw: &str) -> String {
    escape_html(raw).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: &str, viewers: u64) -> LiveStatusResult {
        LiveStatusResult {
            label: label.into(),
            url: format!("https://www.youtube.com/watch?v={label}"),
            viewers,
            likes: 0,
            duration: Some("00:10:00".into()),
        }
    }

    #[test]
    fn rank_is_descending_by_viewers() {
        let ranked = rank(vec![result("a", 120), result("b", 500), result("c", 7)]);
        let viewers: Vec<u64> = ranked.iter().map(|r| r.viewers).collect();
        assert_eq!(viewers, [500, 120, 7]);
    }

    #[test]
    fn rank_keeps_probe_order_on_ties() {
        let ranked = rank(vec![
            result("first", 100),
            result("second", 100),
            result("third", 100),
        ]);
        let labels: Vec<&str> = ranked.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["first", "second", "third"]);
    }

    #[test]
    fn empty_set_renders_nothing() {
        assert!(render(&[]).is_none());
    }

    #[test]
    fn entries_are_numbered_in_ranked_order() {
        let ranked = rank(vec![result("small", 10), result("big", 900)]);
        let text = render(&ranked).unwrap();

        let big_at = text.find("1. <b><a href=\"https://www.youtube.com/watch?v=big\"").unwrap();
        let small_at = text.find("2. <b><a href=\"https://www.youtube.com/watch?v=small\"").unwrap();
        assert!(big_at < small_at);
        assert!(text.starts_with(HEADER));
        assert!(text.ends_with(FOOTER));
    }

    #[test]
    fn zero_counts_are_omitted() {
        let zero_viewers = LiveStatusResult {
            label: "Quiet".into(),
            url: "https://www.youtube.com/watch?v=q".into(),
            viewers: 0,
            likes: 0,
            duration: None,
        };
        let text = render(&[zero_viewers]).unwrap();

        assert!(!text.contains("Watching:"));
        assert!(!text.contains("Likes:"));
        assert!(!text.contains("Runtime:"));
        assert!(text.contains("Quiet"));
    }

    #[test]
    fn nonzero_metrics_each_get_a_line() {
        let full = LiveStatusResult {
            label: "Busy".into(),
            url: "https://www.youtube.com/watch?v=b".into(),
            viewers: 500,
            likes: 42,
            duration: Some("01:02:05".into()),
        };
        let text = render(&[full]).unwrap();

        assert!(text.contains("Watching: 500"));
        assert!(text.contains("Likes: 42"));
        assert!(text.contains("Runtime: 01:02:05"));
    }

    #[test]
    fn labels_are_html_escaped() {
        let tricky = LiveStatusResult {
            label: "Fish & <Chips>".into(),
            url: "https://www.youtube.com/watch?v=x".into(),
            viewers: 1,
            likes: 0,
            duration: None,
        };
        let text = render(&[tricky]).unwrap();

        assert!(text.contains("Fish &amp; &lt;Chips&gt;"));
        assert!(!text.contains("<Chips>"));
    }
}
