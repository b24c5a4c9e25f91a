//! Mail relays and message templates.

use crate::domain::types::User;
use crate::ports::{MailError, Mailer, OutgoingMail};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// "3 days", "1 hour", "90 seconds": the largest whole unit that fits.
fn describe_lifetime(ttl: Duration) -> String {
    const UNITS: [(u64, &str); 4] = [
        (86_400, "day"),
        (3_600, "hour"),
        (60, "minute"),
        (1, "second"),
    ];
    let secs = ttl.as_secs();
    let (size, unit) = UNITS
        .iter()
        .copied()
        .find(|(size, _)| secs >= *size && secs % size == 0)
        .unwrap_or((1, "second"));
    let count = secs / size;
    if count == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

/// Registration email carrying the activation token, valid for `ttl`.
pub fn welcome_email(
    from: &str,
    user: &User,
    activation_token: &str,
    ttl: Duration,
) -> OutgoingMail {
    let lifetime = describe_lifetime(ttl);
    let plain_body = format!(
        "Hi {name},\n\n\
         Thanks for signing up for a Viadro account. Your user ID is {id}.\n\n\
         To activate your account, send a PUT request to /v1/user/activate with:\n\n\
         {{\"token\": \"{token}\"}}\n\n\
         This token is single-use and expires in {lifetime}.\n",
        name = user.username,
        id = user.id,
        token = activation_token,
        lifetime = lifetime,
    );
    let html_body = format!(
        "<!doctype html>\n<html>\n<body>\n\
         <p>Hi {name},</p>\n\
         <p>Thanks for signing up for a Viadro account. Your user ID is {id}.</p>\n\
         <p>To activate your account, send a <code>PUT /v1/user/activate</code> request with:</p>\n\
         <pre><code>{{\"token\": \"{token}\"}}</code></pre>\n\
         <p>This token is single-use and expires in {lifetime}.</p>\n\
         </body>\n</html>\n",
        name = escape_html(&user.username),
        id = user.id,
        token = escape_html(activation_token),
        lifetime = lifetime,
    );
    OutgoingMail {
        from: from.to_string(),
        to: user.email.clone(),
        subject: "Welcome to Viadro!".to_string(),
        plain_body,
        html_body,
    }
}

/// Writes each message to the log instead of a relay.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        info!(
            to = %mail.to,
            from = %mail.from,
            subject = %mail.subject,
            body = %mail.plain_body,
            "email dispatched"
        );
        Ok(())
    }
}

/// Collects messages in an outbox.
#[derive(Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<OutgoingMail>>,
    failing: AtomicBool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.outbox.lock().clone()
    }

    /// Most recent message addressed to `to`.
    pub fn last_to(&self, to: &str) -> Option<OutgoingMail> {
        self.outbox.lock().iter().rev().find(|m| m.to == to).cloned()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Unavailable("relay offline".into()));
        }
        self.outbox.lock().push(mail);
        Ok(())
    }
}

/// Pull the activation token back out of a welcome email.
pub fn extract_activation_token(mail: &OutgoingMail) -> Option<String> {
    let start = mail.plain_body.find("{\"token\": \"")? + "{\"token\": \"".len();
    let rest = &mail.plain_body[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}
