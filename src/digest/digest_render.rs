use chrono::NaiveDate;

use crate::task::TaskPriority;
use super::digest_models::{Digest, DigestSection, RenderedDigest};

const NO_DESCRIPTION: &str = "No description";

/// Colours and marker used for one priority section of the HTML body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accent {
    pub background: &'static str,
    pub border: &'static str,
    pub heading: &'static str,
    pub marker: &'static str,
}

pub fn accent(priority: TaskPriority) -> Accent {
    match priority {
        TaskPriority::High => Accent {
            background: "#ffebee",
            border: "#f44336",
            heading: "#c62828",
            marker: "🔴",
        },
        TaskPriority::Medium => Accent {
            background: "#fff3e0",
            border: "#ff9800",
            heading: "#e65100",
            marker: "🟠",
        },
        TaskPriority::Low => Accent {
            background: "#e8f5e9",
            border: "#4CAF50",
            heading: "#2e7d32",
            marker: "🟢",
        },
    }
}

fn label(priority: TaskPriority) -> &'static str {
    match priority {
        TaskPriority::High => "High",
        TaskPriority::Medium => "Medium",
        TaskPriority::Low => "Low",
    }
}

/// `October 16, 2026`
pub fn long_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

pub fn subject(date: NaiveDate) -> String {
    format!("📋 Your Tasks for Today - {}", long_date(date))
}

pub fn render(digest: Digest, app_url: &str) -> RenderedDigest {
    let html = render_html(&digest, app_url);
    let text = render_text(&digest);
    RenderedDigest { digest, html, text }
}

pub fn render_html(digest: &Digest, app_url: &str) -> String {
    let date = long_date(digest.date);
    let mut html = String::new();

    html.push_str(r#"<html><body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">"#);
    html.push_str(r#"<div style="max-width: 600px; margin: 0 auto; padding: 20px;">"#);
    html.push_str(&format!(
        r#"<h2 style="color: #4CAF50;">Good Morning, {}!</h2>"#,
        html_escape(&digest.recipient_name)
    ));
    html.push_str(&format!("<p>Here are your tasks due today ({}):</p>", date));

    for section in &digest.sections {
        html.push_str(&render_html_section(section));
    }

    html.push_str(&format!(
        r#"<p style="margin-top: 30px;"><a href="{}/dashboard" style="background-color: #4CAF50; color: white; padding: 10px 20px; text-decoration: none; border-radius: 5px; display: inline-block;">View All Tasks</a></p>"#,
        html_escape(app_url)
    ));
    html.push_str(
        r#"<p style="color: #666; font-size: 12px; margin-top: 30px;">This is an automated email from Task Manager. You're receiving this because you have tasks due today.</p>"#,
    );
    html.push_str("</div></body></html>");
    html
}

fn render_html_section(section: &DigestSection) -> String {
    let accent = accent(section.priority);
    let mut html = format!(
        r#"<div class="digest-section" data-priority="{}" style="background-color: {}; border-left: 4px solid {}; padding: 15px; margin: 15px 0;">"#,
        section.priority, accent.background, accent.border
    );
    html.push_str(&format!(
        r#"<h3 style="margin-top: 0; color: {};">{} {} Priority ({} tasks)</h3><ul>"#,
        accent.heading,
        accent.marker,
        label(section.priority),
        section.entries.len()
    ));

    for entry in &section.entries {
        html.push_str(&format!(
            "<li><strong>{}</strong> - {}</li>",
            html_escape(&entry.title),
            html_escape(entry.description.as_deref().unwrap_or(NO_DESCRIPTION))
        ));
    }

    html.push_str("</ul></div>");
    html
}

pub fn render_text(digest: &Digest) -> String {
    let mut text = format!(
        "Good Morning, {}!\n\nHere are your tasks due today ({}):\n",
        digest.recipient_name,
        long_date(digest.date)
    );

    for section in &digest.sections {
        text.push_str(&format!(
            "\n{} PRIORITY ({} tasks):\n",
            label(section.priority).to_uppercase(),
            section.entries.len()
        ));
        for entry in &section.entries {
            text.push_str(&format!(
                "- {}: {}\n",
                entry.title,
                entry.description.as_deref().unwrap_or(NO_DESCRIPTION)
            ));
        }
    }

    text
}

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
