//! HTML and plain-text email templates.
//!
//! Styles are inlined for email client compatibility. Theme: orange and
//! black.

const ORANGE: &str = "#e85d04";
const BLACK: &str = "#0a0a0a";
const BLACK_SOFT: &str = "#1a1a1a";
const WHITE: &str = "#ffffff";
const GRAY_LIGHT: &str = "#f5f5f5";
const GRAY_TEXT: &str = "#6b6b6b";

/// Default public URL of the application.
pub const DEFAULT_APP_URL: &str = "https://buenavista.in";

/// Subject, HTML and text bodies of one email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Escapes `& < > "` for interpolation into HTML.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Drops `< > " &` from a display name, falling back when it is empty.
fn safe_name(name: Option<&str>, fallback: &str) -> String {
    match name.filter(|n| !n.is_empty()) {
        Some(name) => name.chars().filter(|c| !matches!(c, '<' | '>' | '"' | '&')).collect(),
        None => fallback.to_string(),
    }
}

fn non_empty<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    value.filter(|v| !v.is_empty()).unwrap_or(fallback)
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

fn button(href: &str, label: &str) -> String {
    format!(
        r#"<table role="presentation" cellspacing="0" cellpadding="0" style="margin: 0;">
                <tr>
                  <td style="border-radius: 8px; background-color: {ORANGE};">
                    <a href="{href}" target="_blank" rel="noopener" style="display: inline-block; padding: 14px 28px; font-size: 15px; font-weight: 600; color: {WHITE}; text-decoration: none;">{label}</a>
                  </td>
                </tr>
              </table>"#
    )
}

fn layout(title: &str, tagline: &str, body: &str, footer: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title}</title>
</head>
<body style="margin:0; padding:0; background-color:#e5e5e5; font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;">
  <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="background-color:#e5e5e5;">
    <tr>
      <td align="center" style="padding: 32px 16px;">
        <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="max-width: 560px; margin: 0 auto;">
          <tr>
            <td style="background-color: {BLACK}; padding: 28px 32px; border-radius: 12px 12px 0 0;">
              <h1 style="margin:0; font-size: 26px; font-weight: 700; color: {WHITE}; letter-spacing: -0.5px;">BuenaVista</h1>
              <p style="margin: 6px 0 0 0; font-size: 13px; color: {ORANGE}; font-weight: 600; letter-spacing: 0.5px;">{tagline}</p>
            </td>
          </tr>
          <tr>
            <td style="background-color: {WHITE}; padding: 40px 32px; border-left: 1px solid #eee; border-right: 1px solid #eee;">
              {body}
            </td>
          </tr>
          <tr>
            <td style="background-color: {BLACK_SOFT}; padding: 24px 32px; border-radius: 0 0 12px 12px; border: 1px solid #2a2a2a;">
              {footer}
            </td>
          </tr>
        </table>
      </td>
    </tr>
  </table>
</body>
</html>"#
    )
}

const SIGNATURE_FOOTER: &str =
    r#"<p style="margin: 0; font-size: 12px; color: #999;">BuenaVista · Share. Explore. Connect.</p>"#;

/// Welcome email sent after registration.
pub fn onboarding_email(username: Option<&str>, app_url: &str) -> RenderedEmail {
    let name = safe_name(username, "Explorer");
    let body = format!(
        r#"<p style="margin: 0 0 20px 0; font-size: 20px; font-weight: 600; color: {BLACK}; line-height: 1.4;">Hola, {name}!</p>
              <p style="margin: 0 0 24px 0; font-size: 16px; color: #333; line-height: 1.6;">Welcome to BuenaVista. We're glad you're here.</p>
              <p style="margin: 0 0 28px 0; font-size: 15px; color: {GRAY_TEXT}; line-height: 1.6;">Discover stunning places shared by explorers around the world, and add your own. One community, endless adventures.</p>
              {button}"#,
        button = button(&format!("{app_url}/locations"), "Explore locations →"),
    );
    let footer = r#"<p style="margin: 0; font-size: 12px; color: #999;">You're receiving this because you signed up at BuenaVista.</p>
              <p style="margin: 8px 0 0 0; font-size: 12px; color: #666;">© BuenaVista · Share. Explore. Connect.</p>"#;

    RenderedEmail {
        subject: format!("Hola, {name}! Welcome to BuenaVista"),
        html: layout(
            "Welcome to BuenaVista",
            "DISCOVER AMAZING LOCATIONS",
            &body,
            footer,
        ),
        text: format!(
            "Hola, {name}! Welcome to BuenaVista. We're glad you're here. Discover amazing locations and share your own with explorers around the world. Visit {app_url}/locations to get started."
        ),
    }
}

/// Confirmation sent to the author of a new location.
pub fn location_created_email(
    username: Option<&str>,
    location_name: Option<&str>,
    view_url: &str,
) -> RenderedEmail {
    let name = safe_name(username, "Explorer");
    let location_name = non_empty(location_name, "New location");
    let body = format!(
        r#"<p style="margin: 0 0 16px 0; font-size: 20px; font-weight: 600; color: {BLACK}; line-height: 1.4;">Hey {name}, your post is live.</p>
              <p style="margin: 0 0 12px 0; font-size: 18px; color: {ORANGE}; font-weight: 600;">"{escaped}"</p>
              <p style="margin: 0 0 24px 0; font-size: 15px; color: #333; line-height: 1.6;">Other explorers can now discover it, like it, and leave comments. You're building the map together.</p>
              {button}"#,
        escaped = escape_html(location_name),
        button = button(view_url, "View your post →"),
    );

    RenderedEmail {
        subject: format!(
            "Your post \"{}\" is live — BuenaVista",
            truncate(location_name, 50)
        ),
        html: layout(
            "Your post is live — BuenaVista",
            "YOUR POST IS LIVE",
            &body,
            SIGNATURE_FOOTER,
        ),
        text: format!(
            "Hey {name}, your post \"{location_name}\" is live. Other explorers can discover it and comment. View it here: {view_url}"
        ),
    }
}

/// Notification sent to a location's author when someone else comments.
pub fn comment_notification_email(
    recipient: Option<&str>,
    location_name: Option<&str>,
    commenter: Option<&str>,
    comment_text: &str,
    view_url: &str,
) -> RenderedEmail {
    let recipient_name = safe_name(recipient, "there");
    let location_name = non_empty(location_name, "your post");
    let commenter = non_empty(commenter, "Someone");
    let body = format!(
        r#"<p style="margin: 0 0 20px 0; font-size: 20px; font-weight: 600; color: {BLACK}; line-height: 1.4;">{recipient_name}, someone left a comment on your post.</p>
              <p style="margin: 0 0 16px 0; font-size: 16px; color: #333; line-height: 1.5;"><strong>"{escaped_location}"</strong></p>
              <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="background-color: {GRAY_LIGHT}; border-radius: 8px; border-left: 4px solid {ORANGE}; margin: 0 0 24px 0;">
                <tr>
                  <td style="padding: 20px 24px;">
                    <p style="margin: 0 0 6px 0; font-size: 12px; color: {GRAY_TEXT}; font-weight: 600; text-transform: uppercase;">{escaped_commenter} said:</p>
                    <p style="margin: 0; font-size: 15px; color: #333; line-height: 1.6;">{escaped_comment}</p>
                  </td>
                </tr>
              </table>
              <p style="margin: 0 0 24px 0; font-size: 15px; color: #333; line-height: 1.6;">Reply and keep the conversation going. Your community is growing.</p>
              {button}"#,
        escaped_location = escape_html(location_name),
        escaped_commenter = escape_html(commenter),
        escaped_comment = escape_html(comment_text).replace('\n', "<br>"),
        button = button(view_url, "View your post →"),
    );

    RenderedEmail {
        subject: format!("{commenter} commented on your post — BuenaVista"),
        html: layout(
            "New comment on your post — BuenaVista",
            "YOUR COMMUNITY IS ENGAGING",
            &body,
            SIGNATURE_FOOTER,
        ),
        text: format!(
            "{}, {commenter} commented on your post \"{location_name}\": \"{}...\" View and reply: {view_url}",
            non_empty(recipient, "There"),
            truncate(comment_text, 100),
        ),
    }
}
