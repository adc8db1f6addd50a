//! GitHub-flavoured markdown for ETA comments and the issue sync block.
//!
//! The sync block is delimited by HTML comments so it can be replaced in
//! place on every refresh without touching what the author wrote.

use chrono::NaiveDate;

use crate::ports::{EtaNotice, SyncSummary, TextRenderer};

const BLOCK_START: &str = "<!-- tracksync:start -->";
const BLOCK_END: &str = "<!-- tracksync:end -->";

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }

    fn sync_block(summary: &SyncSummary) -> String {
        let schedule = if summary.scheduled {
            "scheduled"
        } else {
            "not scheduled"
        };
        let mut lines = vec![
            BLOCK_START.to_owned(),
            "---".to_owned(),
            format!("**Tracker status:** {} ({schedule})", summary.status),
        ];
        if let Some(url) = &summary.story_url {
            lines.push(format!("**Story:** {url}"));
        }
        if let Some(eta) = summary.eta {
            lines.push(format!("**ETA:** {}", format_date(eta)));
        }
        lines.push(BLOCK_END.to_owned());
        lines.join("\n")
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// `body` without its sync block, trailing whitespace trimmed.
fn strip_block(body: &str) -> String {
    let Some(start) = body.find(BLOCK_START) else {
        return body.trim_end().to_owned();
    };
    let before = body[..start].trim_end();
    let after = body[start..]
        .find(BLOCK_END)
        .map(|end| body[start + end + BLOCK_END.len()..].trim())
        .unwrap_or_default();
    match (before.is_empty(), after.is_empty()) {
        (_, true) => before.to_owned(),
        (true, false) => after.to_owned(),
        (false, false) => format!("{before}\n\n{after}"),
    }
}

impl TextRenderer for MarkdownRenderer {
    fn eta_comment(&self, notice: &EtaNotice) -> String {
        let mut text = match notice.eta {
            Some(eta) if notice.display_previous => match notice.previous_eta {
                Some(previous) => format!(
                    "**ETA:** {} (previously {})",
                    format_date(eta),
                    format_date(previous)
                ),
                None => format!("**ETA:** {}", format_date(eta)),
            },
            Some(eta) => format!("**ETA:** {}", format_date(eta)),
            None => "**ETA:** not scheduled yet".to_owned(),
        };
        if let Some(url) = &notice.story_url {
            text.push_str(&format!("\n\nTracked in {url}"));
        }
        text
    }

    fn issue_description(&self, body: &str, summary: &SyncSummary) -> String {
        let authored = strip_block(body);
        let block = Self::sync_block(summary);
        if authored.is_empty() {
            block
        } else {
            format!("{authored}\n\n{block}")
        }
    }
}
