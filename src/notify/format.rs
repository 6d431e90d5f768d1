use crate::github::types::Issue;

const MAX_BODY_CHARS: usize = 300;
const MAX_LABELS: usize = 5;

/// Escape the characters Telegram's HTML parse mode treats as markup
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Truncate to `max_chars` characters, accounting for Unicode
fn truncate_body(body: &str, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// Format an issue as a Telegram HTML message with a clickable link
pub fn format_issue_alert(issue: &Issue, repo: &str) -> String {
    let number = issue
        .number
        .map(|n| n.to_string())
        .unwrap_or_else(|| "?".to_string());
    let title = if issue.title.is_empty() {
        "Untitled"
    } else {
        issue.title.as_str()
    };

    let labels: Vec<String> = issue
        .labels
        .iter()
        .take(MAX_LABELS)
        .filter(|label| !label.is_empty())
        .map(|label| format!("#{}", escape_html(label)))
        .collect();

    let mut message = String::from("🔔 <b>New Issue Opened</b>\n\n");
    message.push_str(&format!("<b>Repository:</b> <code>{}</code>\n", escape_html(repo)));
    message.push_str(&format!("<b>Author:</b> {}\n", escape_html(&issue.author)));
    message.push_str(&format!("<b>Issue #{}:</b> {}\n", number, escape_html(title)));

    if !labels.is_empty() {
        message.push_str(&format!("<b>Labels:</b> {}\n", labels.join(" ")));
    }

    message.push('\n');

    if let Some(body) = issue.body.as_deref().filter(|b| !b.trim().is_empty()) {
        let body = truncate_body(body, MAX_BODY_CHARS);
        message.push_str(&format!("<b>Description:</b>\n{}\n\n", escape_html(&body)));
    }

    message.push_str(&format!(
        "🔗 <a href='{}'><b>View Issue on GitHub →</b></a>\n",
        issue.url
    ));
    message.push_str(&format!("<code>{}</code>", issue.url));

    message
}
