//! Mailer
//!
//! Resend HTTP API로 승인/거절 메일을 보낸다.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EmailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mailer not configured: {0}")]
    NotConfigured(String),

    #[error("email request failed: {0}")]
    Request(String),

    #[error("email API rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

impl MailError {
    pub fn is_permanent(&self) -> bool {
        match self {
            MailError::NotConfigured(_) => true,
            // 4xx: 요청 자체가 잘못됨. 429는 재시도
            MailError::Rejected { status, .. } => (400..500).contains(status) && *status != 429,
            MailError::Request(_) => false,
        }
    }
}

/// 발송할 메일
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Resend 클라이언트
pub struct ResendMailer {
    api_url: String,
    api_key: Option<String>,
    from: String,
    http: reqwest::Client,
}

impl ResendMailer {
    pub fn new(config: &EmailConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build Resend HTTP client")?;

        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
            http,
        })
    }
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

#[async_trait]
impl EmailSender for ResendMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| MailError::NotConfigured("RESEND_API_KEY not set".into()))?;

        let response = self
            .http
            .post(format!("{}/emails", self.api_url))
            .bearer_auth(api_key)
            .json(&ResendRequest {
                from: &self.from,
                to: &message.to,
                subject: &message.subject,
                html: &message.html,
            })
            .send()
            .await
            .map_err(|e| MailError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(to = %message.to, subject = %message.subject, "email sent");
        Ok(())
    }
}

// ============ Templates ============

const WRAPPER_OPEN: &str =
    r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">"#;
const SIGNATURE: &str = "<p>Best regards,<br/>The Quiflix Team</p>";

/// distributor 승인 메일 내용
#[derive(Debug, Clone)]
pub struct DistributorWelcome<'a> {
    pub company_name: Option<&'a str>,
    pub personalized_link: &'a str,
    pub referral_code: &'a str,
    pub film_title: &'a str,
    pub trailer_url: Option<&'a str>,
}

pub fn filmmaker_approved(to: &str, film_title: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Congratulations! Your Film Application is Approved".to_string(),
        html: format!(
            "{WRAPPER_OPEN}\
             <h2 style=\"color: #D4AF37;\">Welcome to Quiflix!</h2>\
             <p>We're excited to inform you that your film <strong>{}</strong> has been approved.</p>\
             <p>Your film is now eligible for distribution on our platform. \
             Our team will contact you shortly with next steps.</p>\
             {SIGNATURE}</div>",
            escape_html(film_title)
        ),
    }
}

pub fn distributor_approved(to: &str, welcome: &DistributorWelcome<'_>) -> EmailMessage {
    let trailer_block = welcome
        .trailer_url
        .map(|url| {
            let url = escape_html(url);
            format!(
                "<div style=\"background: #f5f5f5; padding: 20px; border-radius: 8px; margin: 20px 0;\">\
                 <h3 style=\"margin-top: 0;\">Download Film Trailer</h3>\
                 <p>Share this trailer on social media to promote <strong>{}</strong>:</p>\
                 <a href=\"{url}?download=true\">Download Trailer</a>\
                 </div>",
                escape_html(welcome.film_title)
            )
        })
        .unwrap_or_default();

    EmailMessage {
        to: to.to_string(),
        subject: "Congratulations! Your Distributor Application is Approved".to_string(),
        html: format!(
            "{WRAPPER_OPEN}\
             <h2 style=\"color: #D4AF37;\">Welcome to Quiflix, {}!</h2>\
             <p>Your distributor application has been approved and you have received \
             1 Digital Distribution Token (DDT) for <strong>{}</strong>.</p>\
             {trailer_block}\
             <h3>Your Personalized Distribution Link</h3>\
             <p>Share this link to earn 20% of every sale:</p>\
             <p><a href=\"{link}\">{link}</a></p>\
             <p>Referral Code: <code>{}</code></p>\
             {SIGNATURE}</div>",
            escape_html(welcome.company_name.unwrap_or("Distributor")),
            escape_html(welcome.film_title),
            escape_html(welcome.referral_code),
            link = escape_html(welcome.personalized_link),
        ),
    }
}

pub fn application_rejected(to: &str, is_filmmaker: bool) -> EmailMessage {
    let subject = if is_filmmaker {
        "Your Film Application Status"
    } else {
        "Your Distributor Application Status"
    };

    EmailMessage {
        to: to.to_string(),
        subject: subject.to_string(),
        html: format!(
            "{WRAPPER_OPEN}\
             <h2>Application Update</h2>\
             <p>Thank you for your interest in Quiflix. Unfortunately, your application \
             was not approved at this time.</p>\
             <p>We encourage you to apply again in the future.</p>\
             {SIGNATURE}</div>"
        ),
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distributor_template_contains_link_and_code() {
        let message = distributor_approved(
            "dist@example.com",
            &DistributorWelcome {
                company_name: Some("Nairobi Screens"),
                personalized_link: "http://localhost:3000/films?ref=abc&film=1",
                referral_code: "abc",
                film_title: "Kati Kati",
                trailer_url: Some("https://blob.example/trailer.mp4"),
            },
        );

        assert_eq!(message.to, "dist@example.com");
        assert!(message.html.contains("films?ref=abc&amp;film=1"));
        assert!(message.html.contains("<code>abc</code>"));
        assert!(message.html.contains("Download Trailer"));
        assert!(message.html.contains("Nairobi Screens"));
    }

    #[test]
    fn test_template_escapes_input() {
        let message = filmmaker_approved("a@b.c", "<script>");
        assert!(!message.html.contains("<script>"));
        assert!(message.html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_rejected_subject() {
        assert_eq!(
            application_rejected("a@b.c", true).subject,
            "Your Film Application Status"
        );
        assert_eq!(
            application_rejected("a@b.c", false).subject,
            "Your Distributor Application Status"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(MailError::NotConfigured("x".into()).is_permanent());
        assert!(MailError::Rejected { status: 422, body: String::new() }.is_permanent());
        assert!(!MailError::Rejected { status: 429, body: String::new() }.is_permanent());
        assert!(!MailError::Rejected { status: 503, body: String::new() }.is_permanent());
        assert!(!MailError::Request("timeout".into()).is_permanent());
    }

    #[tokio::test]
    async fn test_send_without_key_fails() {
        let mailer = ResendMailer::new(&EmailConfig {
            api_url: "http://127.0.0.1:1".to_string(),
            api_key: None,
            from: "noreply@quiflix.com".to_string(),
        })
        .unwrap();
        let err = mailer
            .send(&application_rejected("a@b.c", true))
            .await
            .unwrap_err();
        assert!(err.is_permanent());
    }
}
