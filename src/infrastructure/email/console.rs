//! Console email sender for development and tests
//!
//! Prints what would be sent instead of talking SMTP.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::application::ports::EmailSender;
use crate::domain::DomainResult;

#[derive(Debug, Default, Clone)]
pub struct ConsoleMailer;

#[async_trait]
impl EmailSender for ConsoleMailer {
    async fn send_welcome(&self, to: &str, first_name: &str) -> DomainResult<()> {
        info!("[email] welcome -> {} ({})", to, first_name);
        Ok(())
    }

    async fn send_password_reset(
        &self,
        to: &str,
        raw_token: &str,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        info!(
            "[email] password reset -> {} token={} expires={}",
            to, raw_token, expires_at
        );
        Ok(())
    }

    async fn send_trip_cancelled(
        &self,
        to: &str,
        passenger_name: &str,
        origin: &str,
        destination: &str,
        departure_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        info!(
            "[email] trip cancelled -> {} ({}): {} -> {} at {}",
            to, passenger_name, origin, destination, departure_at
        );
        Ok(())
    }
}
