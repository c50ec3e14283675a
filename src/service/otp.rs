//! OTP Service
//!
//! Issues one-time codes, delivers them by email and checks submitted codes.
//!
//! Per `(email, otp_type)` only the most recent unvalidated record counts.
//! A record moves from active to validated on a correct code; it is expired
//! once its expiry has passed and, when a retry limit is configured,
//! exhausted after too many wrong codes.

use chrono::{Duration, Utc};
use log::{debug, info, warn};
use std::sync::Arc;
use thiserror::Error;

use crate::config::OtpConfig;
use crate::models::{NewOtp, OtpRecord, OtpType, OtpVerification};
use crate::repository::{retry_read, OtpRepository, RepositoryError};
use crate::service::email_service::{MailError, Mailer};
use crate::service::email_templates::EmailTemplates;
use crate::utils::error::{codes, CodedError};
use crate::utils::security::{constant_time_compare, generate_otp_code};

#[derive(Error, Debug)]
pub enum OtpError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The code was stored but could not be delivered
    #[error("OTP delivery failed: {0}")]
    Delivery(#[from] MailError),
}

impl CodedError for OtpError {
    fn code(&self) -> &'static str {
        codes::SERVICE_UNAVAILABLE
    }
}

/// Lifetime and retry limit of issued codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpPolicy {
    pub ttl: Duration,
    /// Wrong attempts allowed before a code stops being compared
    pub max_retries: Option<u32>,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(5),
            max_retries: None,
        }
    }
}

impl OtpPolicy {
    pub fn from_config(config: &OtpConfig) -> Self {
        Self {
            ttl: Duration::minutes(config.expiration_minutes),
            max_retries: config.max_retries,
        }
    }
}

/// Who a code is addressed to
#[derive(Debug, Clone, Copy)]
pub struct OtpRecipient<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub mobile: Option<&'a str>,
}

pub struct OtpService {
    repository: Arc<dyn OtpRepository>,
    mailer: Arc<dyn Mailer>,
    templates: Arc<EmailTemplates>,
    policy: OtpPolicy,
}

impl OtpService {
    pub fn new(
        repository: Arc<dyn OtpRepository>,
        mailer: Arc<dyn Mailer>,
        templates: Arc<EmailTemplates>,
        policy: OtpPolicy,
    ) -> Self {
        Self {
            repository,
            mailer,
            templates,
            policy,
        }
    }

    pub fn policy(&self) -> OtpPolicy {
        self.policy
    }

    /// Store a fresh code and email it.
    ///
    /// A delivery failure is returned as `OtpError::Delivery`; the stored
    /// record stays usable and can be re-sent.
    pub async fn generate_and_send(
        &self,
        recipient: OtpRecipient<'_>,
        otp_type: OtpType,
    ) -> Result<(), OtpError> {
        let record = self
            .repository
            .create(NewOtp {
                mobile: recipient.mobile.map(str::to_string),
                email: recipient.email.to_string(),
                otp_code: generate_otp_code(),
                otp_type,
                expires_at: Utc::now() + self.policy.ttl,
            })
            .await?;

        info!("Issued {} OTP #{} for {}", otp_type, record.id, recipient.email);
        self.deliver(recipient, &record).await
    }

    /// Send the active code again, or a new one when there is none
    pub async fn resend(&self, recipient: OtpRecipient<'_>, otp_type: OtpType) -> Result<(), OtpError> {
        let latest = retry_read("otp lookup", || {
            self.repository.latest_unvalidated(recipient.email, otp_type)
        })
        .await?;

        match latest {
            Some(record) if !record.is_expired_at(Utc::now()) && !self.is_exhausted(&record) => {
                debug!("Re-sending {} OTP #{}", otp_type, record.id);
                self.deliver(recipient, &record).await
            }
            _ => self.generate_and_send(recipient, otp_type).await,
        }
    }

    /// Check a submitted code against the latest unvalidated record.
    ///
    /// Expired records are reported without counting the attempt. A correct
    /// code validates the record, so it never validates again; when two
    /// requests race on the same code only the one that claims the record
    /// sees `Valid`.
    pub async fn verify(
        &self,
        email: &str,
        code: &str,
        otp_type: OtpType,
    ) -> Result<OtpVerification, OtpError> {
        let record = retry_read("otp lookup", || {
            self.repository.latest_unvalidated(email, otp_type)
        })
        .await?;

        let Some(record) = record else {
            return Ok(OtpVerification::NotFound);
        };

        if record.is_expired_at(Utc::now()) {
            return Ok(OtpVerification::Expired);
        }

        if self.is_exhausted(&record) {
            warn!("{} OTP #{} has no attempts left", otp_type, record.id);
            return Ok(OtpVerification::Exhausted);
        }

        if constant_time_compare(code, &record.otp_code) {
            if self.repository.mark_validated(record.id).await? {
                Ok(OtpVerification::Valid)
            } else {
                debug!("{} OTP #{} was already used", otp_type, record.id);
                Ok(OtpVerification::NotFound)
            }
        } else {
            self.repository.increment_retry(record.id).await?;
            debug!("Wrong code for {} OTP #{}", otp_type, record.id);
            Ok(OtpVerification::Invalid)
        }
    }

    /// Delete expired records; safe to run repeatedly
    pub async fn cleanup_expired(&self) -> Result<u64, OtpError> {
        let removed = self.repository.delete_expired(Utc::now()).await?;
        if removed > 0 {
            info!("Removed {} expired OTP records", removed);
        }
        Ok(removed)
    }

    fn is_exhausted(&self, record: &OtpRecord) -> bool {
        self.policy
            .max_retries
            .is_some_and(|max| u32::try_from(record.retry_count).is_ok_and(|count| count >= max))
    }

    async fn deliver(&self, recipient: OtpRecipient<'_>, record: &OtpRecord) -> Result<(), OtpError> {
        let email = self.templates.otp(
            recipient.name,
            &record.otp_code,
            self.policy.ttl.num_minutes(),
            record.otp_type,
        )?;

        self.mailer
            .send(recipient.email, &email.subject, &email.html)
            .await?;
        Ok(())
    }
}
