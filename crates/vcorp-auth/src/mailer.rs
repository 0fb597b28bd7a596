// Transactional email delivery.
//
// The Mailer trait is the seam between handlers and whatever provider the
// deployment uses. Templates live here so the sign-in copy stays in one
// place; the PIN email states the five-minute validity window, matching
// the enforced expiry.

use async_trait::async_trait;

use vcorp_core::error::VcorpError;
use vcorp_core::program::ProgramId;

/// A single outbound email.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Email delivery backend.
#[async_trait]
pub trait Mailer: Send + Sync + std::fmt::Debug {
    async fn send(&self, message: EmailMessage) -> Result<(), VcorpError>;
}

/// Build the magic-link sign-in email.
pub fn magic_link_email(to: &str, program: ProgramId, link: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("Sign in to {}", program.display_name()),
        html: format!(
            "<p>Click the link below to sign in to {name}.</p>\
             <p><a href=\"{link}\">Sign in</a></p>\
             <p>This link is valid for 24 hours. If you did not request it, you can ignore this email.</p>",
            name = program.display_name(),
            link = link,
        ),
    }
}

/// Build the PIN sign-in email.
pub fn pin_email(to: &str, program: ProgramId, pin: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("Your {} sign-in code", program.display_name()),
        html: format!(
            "<p>Your sign-in code for {name} is:</p>\
             <p style=\"font-size:24px;letter-spacing:4px\"><strong>{pin}</strong></p>\
             <p>This code expires in 5 minutes. If you did not request it, you can ignore this email.</p>",
            name = program.display_name(),
            pin = pin,
        ),
    }
}

#[cfg(test)]
pub mod tests_support {
    use super::*;
    use std::sync::Mutex;

    /// Mailer that drops every message.
    #[derive(Debug, Default)]
    pub struct NoopMailer;

    #[async_trait]
    impl Mailer for NoopMailer {
        async fn send(&self, _message: EmailMessage) -> Result<(), VcorpError> {
            Ok(())
        }
    }

    /// Mailer that captures every message for assertions.
    #[derive(Debug, Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: EmailMessage) -> Result<(), VcorpError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }

    /// Mailer that always fails, for exercising send-failure paths.
    #[derive(Debug, Default)]
    pub struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _message: EmailMessage) -> Result<(), VcorpError> {
            Err(VcorpError::Other("SMTP connection refused".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_link_email_contains_link() {
        let msg = magic_link_email(
            "a@b.com",
            ProgramId::Fyht4,
            "https://fyht4.com/auth/verify?token=abc",
        );
        assert_eq!(msg.to, "a@b.com");
        assert!(msg.subject.contains("FYHT4"));
        assert!(msg.html.contains("token=abc"));
        assert!(msg.html.contains("24 hours"));
    }

    #[test]
    fn test_pin_email_states_five_minutes() {
        let msg = pin_email("a@b.com", ProgramId::SpiritOf, "123456");
        assert!(msg.html.contains("123456"));
        assert!(msg.html.contains("5 minutes"));
    }
}
