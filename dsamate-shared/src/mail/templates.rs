/// Message templates

use reqwest::Url;

use super::Email;
use crate::auth::otp::OTP_TTL_MINUTES;
use crate::catalog::questions::{Question, QuestionLinks};

/// One-time password mail
pub fn otp_email(to: &str, code: &str) -> Email {
    let html = format!(
        r#"<div style="font-family: sans-serif;">
  <h2>Your OTP</h2>
  <p>Use the following OTP to verify your account:</p>
  <h1>{code}</h1>
  <p>This code will expire in {OTP_TTL_MINUTES} minutes.</p>
</div>"#,
        code = escape_html(code),
    );

    Email {
        to: to.to_string(),
        subject: "Your OTP Code".to_string(),
        html,
    }
}

/// Problem of the Day mail with unsubscribe and newsletter links
pub fn potd_email(to: &str, question: &Question, base_url: &str) -> Email {
    let links = platform_links(&question.links);
    let platforms = if links.is_empty() {
        "No links available".to_string()
    } else {
        links
            .iter()
            .map(|(platform, url)| {
                format!(
                    r#"<a href="{}" target="_blank" style="color: #3b82f6;">{}</a>"#,
                    escape_html(url),
                    platform
                )
            })
            .collect::<Vec<_>>()
            .join(" | ")
    };

    let solution = question
        .solution_link
        .as_deref()
        .map(|link| {
            format!(
                r#"<p><a href="{}" target="_blank">GitHub Solution</a></p>"#,
                escape_html(link)
            )
        })
        .unwrap_or_default();

    let html = format!(
        r#"<h2>DSAMate Problem of the Day</h2>
<p><strong>{title}</strong></p>
<p>Difficulty: <strong>{difficulty}</strong></p>
<p>Links: {platforms}</p>
{solution}
<br/>
<small>
  <a href="{unsubscribe}">Unsubscribe</a> |
  <a href="{newsletter}">Subscribe to Newsletter</a>
</small>"#,
        title = escape_html(&question.title),
        difficulty = question.difficulty.as_str(),
        unsubscribe = escape_html(&preference_link(base_url, to, "unsubscribe")),
        newsletter = escape_html(&preference_link(base_url, to, "newsletter")),
    );

    Email {
        to: to.to_string(),
        subject: format!("DSAMate POTD - {}", question.title),
        html,
    }
}

/// `<base>/email-preference?email=..&action=..` with the address encoded
pub fn preference_link(base_url: &str, email: &str, action: &str) -> String {
    let page = format!("{}/email-preference", base_url.trim_end_matches('/'));
    match Url::parse_with_params(&page, &[("email", email), ("action", action)]) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{page}?email={email}&action={action}"),
    }
}

fn platform_links(links: &QuestionLinks) -> Vec<(&'static str, &str)> {
    [
        ("leetcode", &links.leetcode),
        ("gfg", &links.gfg),
        ("hackerrank", &links.hackerrank),
        ("spoj", &links.spoj),
        ("ninja", &links.ninja),
        ("code", &links.code),
        ("custom", &links.custom),
    ]
    .into_iter()
    .filter_map(|(name, url)| url.as_deref().map(|url| (name, url)))
    .collect()
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
