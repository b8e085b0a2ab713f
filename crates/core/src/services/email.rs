//! Outgoing mail.
//!
//! Sends account-confirmation and password-reset mail over SMTP. When SMTP
//! is disabled in the configuration, messages are logged instead of sent so
//! development setups work without a relay.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
};
use usof_common::{AppError, AppResult, config::SmtpConfig};

/// Email service for transactional mail.
#[derive(Clone)]
pub struct EmailService {
    config: SmtpConfig,
    server_url: String,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl EmailService {
    /// Create a new email service. Builds the SMTP transport eagerly so a
    /// bad relay host fails at startup rather than on first send.
    pub fn new(config: SmtpConfig, server_url: String) -> AppResult<Self> {
        let transport = if config.enabled {
            let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| AppError::Email(e.to_string()))?;
            if !config.username.is_empty() {
                builder = builder.credentials(Credentials::new(
                    config.username.clone(),
                    config.password.clone(),
                ));
            }
            Some(builder.build())
        } else {
            None
        };

        Ok(Self {
            config,
            server_url,
            transport,
        })
    }

    /// Send the account confirmation link.
    pub async fn send_confirmation(&self, to: &str, token: &str) -> AppResult<()> {
        let link = format!("{}/api/auth/confirm-email/{}", self.server_url, token);
        let body = format!(
            "Welcome!\n\nConfirm your account by opening the link below:\n\n{link}\n\n\
             If you did not register, ignore this message.\n"
        );
        self.send(to, "Confirm your account", body).await
    }

    /// Send the password reset link. The token expires shortly after issue.
    pub async fn send_password_reset(&self, to: &str, token: &str) -> AppResult<()> {
        let link = format!("{}/password-reset/{}", self.server_url, token);
        let body = format!(
            "A password reset was requested for your account.\n\n\
             Open the link below to choose a new password:\n\n{link}\n\n\
             The link expires in 10 minutes. If you did not request a reset,\n\
             ignore this message.\n"
        );
        self.send(to, "Reset your password", body).await
    }

    async fn send(&self, to: &str, subject: &str, body: String) -> AppResult<()> {
        let Some(transport) = &self.transport else {
            tracing::info!(to = %to, subject = %subject, "SMTP disabled, logging mail instead");
            tracing::debug!(body = %body, "mail body");
            return Ok(());
        };

        let message = Message::builder()
            .from(
                self.config
                    .from_address
                    .parse()
                    .map_err(|e| AppError::Email(format!("invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| AppError::Email(format!("invalid recipient: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| AppError::Email(e.to_string()))?;

        transport
            .send(message)
            .await
            .map_err(|e| AppError::Email(e.to_string()))?;

        tracing::debug!(to = %to, subject = %subject, "Sent mail");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn disabled_service() -> EmailService {
        EmailService::new(SmtpConfig::default(), "http://localhost:3000".to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_disabled_smtp_logs_instead_of_sending() {
        let service = disabled_service();
        service
            .send_confirmation("user@example.com", "tok123")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_disabled_smtp_password_reset() {
        let service = disabled_service();
        service
            .send_password_reset("user@example.com", "tok456")
            .await
            .unwrap();
    }
}
