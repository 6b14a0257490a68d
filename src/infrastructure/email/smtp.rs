//! SMTP email sender backed by Lettre

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::application::ports::EmailSender;
use crate::domain::{DomainError, DomainResult};

/// Outbound send timeout.
const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Production email sender over SMTP.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(
        smtp_server: &str,
        smtp_port: u16,
        username: String,
        password: String,
        from: String,
    ) -> DomainResult<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_server)
            .map_err(|e| DomainError::internal(format!("smtp relay: {}", e)))?
            .port(smtp_port)
            .credentials(Credentials::new(username, password))
            .timeout(Some(SMTP_TIMEOUT))
            .build();
        Ok(Self { transport, from })
    }

    async fn send(&self, to: &str, subject: &str, body: String) -> DomainResult<()> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| DomainError::internal(format!("bad MAIL_FROM: {}", e)))?,
            )
            .to(to
                .parse()
                .map_err(|e| DomainError::internal(format!("bad recipient: {}", e)))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| DomainError::internal(format!("message build: {}", e)))?;

        self.transport.send(message).await.map_err(|e| {
            tracing::warn!("smtp failure sending to {}: {}", to, e);
            DomainError::Dependency {
                code: "EMAIL_DELIVERY_FAILED".into(),
                provider: "smtp",
                upstream_status: None,
            }
        })?;
        debug!("email sent to {}: {}", to, subject);
        Ok(())
    }
}

#[async_trait]
impl EmailSender for SmtpMailer {
    async fn send_welcome(&self, to: &str, first_name: &str) -> DomainResult<()> {
        let body = format!(
            "Hola {},\n\n¡Bienvenido a Wheels Sabana! Tu cuenta quedó activa.\n",
            first_name
        );
        self.send(to, "Bienvenido a Wheels Sabana", body).await
    }

    async fn send_password_reset(
        &self,
        to: &str,
        raw_token: &str,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let body = format!(
            "Recibimos una solicitud para restablecer tu contraseña.\n\n\
             Código: {}\n\nVence: {}\n\nSi no fuiste tú, ignora este mensaje.\n",
            raw_token,
            expires_at.format("%Y-%m-%d %H:%M UTC")
        );
        self.send(to, "Restablecer contraseña", body).await
    }

    async fn send_trip_cancelled(
        &self,
        to: &str,
        passenger_name: &str,
        origin: &str,
        destination: &str,
        departure_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let body = format!(
            "Hola {},\n\nEl viaje {} → {} del {} fue cancelado por el conductor.\n\
             Tu reserva quedó sin efecto.\n",
            passenger_name,
            origin,
            destination,
            departure_at.format("%Y-%m-%d %H:%M UTC")
        );
        self.send(to, "Viaje cancelado", body).await
    }
}
