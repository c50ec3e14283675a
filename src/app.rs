//! Application Wiring
//!
//! Declares the container keys and registers a factory for every service.
//! Nothing is constructed until a handler first resolves it.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use sqlx::PgPool;
use tokio::task::JoinHandle;

use crate::config::{AppConfig, EmailConfig};
use crate::database::{PgOtpRepository, PgPatientRepository, PgUserRepository};
use crate::di::{Container, ContainerError, Key, Resolver};
use crate::repository::{OtpRepository, PatientRepository, UserRepository};
use crate::service::{
    AuthService, CredentialService, EmailTemplates, LogMailer, MailError, Mailer, OtpPolicy,
    OtpService, PatientService, SmtpMailer, TokenService,
};

/// Capability keys
pub mod keys {
    use super::*;

    pub const CONFIG: Key<AppConfig> = Key::new("config");
    pub const USER_REPOSITORY: Key<dyn UserRepository> = Key::new("user_repository");
    pub const OTP_REPOSITORY: Key<dyn OtpRepository> = Key::new("otp_repository");
    pub const PATIENT_REPOSITORY: Key<dyn PatientRepository> = Key::new("patient_repository");
    pub const MAILER: Key<dyn Mailer> = Key::new("mailer");
    pub const EMAIL_TEMPLATES: Key<EmailTemplates> = Key::new("email_templates");
    pub const CREDENTIAL_SERVICE: Key<CredentialService> = Key::new("credential_service");
    pub const TOKEN_SERVICE: Key<TokenService> = Key::new("token_service");
    pub const OTP_SERVICE: Key<OtpService> = Key::new("otp_service");
    pub const AUTH_SERVICE: Key<AuthService> = Key::new("auth_service");
    pub const PATIENT_SERVICE: Key<PatientService> = Key::new("patient_service");
}

/// Storage and delivery backends the services are built on
pub struct Infrastructure {
    pub users: Arc<dyn UserRepository>,
    pub otps: Arc<dyn OtpRepository>,
    pub patients: Arc<dyn PatientRepository>,
    pub mailer: Arc<dyn Mailer>,
}

impl Infrastructure {
    /// PostgreSQL repositories, plus SMTP when it is configured. Without
    /// SMTP, emails are only logged.
    pub fn postgres(pool: PgPool, email: Option<&EmailConfig>) -> Result<Self, MailError> {
        let mailer: Arc<dyn Mailer> = match email {
            Some(config) => {
                info!("Email delivery via SMTP relay {}", config.smtp_host);
                Arc::new(SmtpMailer::new(config)?)
            }
            None => {
                warn!("SMTP is not configured; emails will be logged, not sent");
                Arc::new(LogMailer)
            }
        };

        Ok(Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            otps: Arc::new(PgOtpRepository::new(pool.clone())),
            patients: Arc::new(PgPatientRepository::new(pool)),
            mailer,
        })
    }
}

/// Register the configuration, the infrastructure and lazy factories for
/// every service
pub fn build_container(config: AppConfig, infrastructure: Infrastructure) -> Arc<Container> {
    let container = Container::new();

    container.register(keys::CONFIG, Arc::new(config));
    container.register(keys::USER_REPOSITORY, infrastructure.users);
    container.register(keys::OTP_REPOSITORY, infrastructure.otps);
    container.register(keys::PATIENT_REPOSITORY, infrastructure.patients);
    container.register(keys::MAILER, infrastructure.mailer);

    container.register_factory(keys::EMAIL_TEMPLATES, |r: &Resolver<'_>| {
        let config = r.resolve(keys::CONFIG)?;
        EmailTemplates::new(config.hospital.name.clone())
            .map(Arc::new)
            .map_err(|e| ContainerError::factory(keys::EMAIL_TEMPLATES.name(), e))
    });

    container.register_factory(keys::CREDENTIAL_SERVICE, |r: &Resolver<'_>| {
        let config = r.resolve(keys::CONFIG)?;
        Ok(Arc::new(CredentialService::new(config.security.bcrypt_cost)))
    });

    container.register_factory(keys::TOKEN_SERVICE, |r: &Resolver<'_>| {
        let config = r.resolve(keys::CONFIG)?;
        Ok(Arc::new(TokenService::from_config(&config.jwt)))
    });

    container.register_factory(keys::OTP_SERVICE, |r: &Resolver<'_>| {
        let config = r.resolve(keys::CONFIG)?;
        Ok(Arc::new(OtpService::new(
            r.resolve(keys::OTP_REPOSITORY)?,
            r.resolve(keys::MAILER)?,
            r.resolve(keys::EMAIL_TEMPLATES)?,
            OtpPolicy::from_config(&config.otp),
        )))
    });

    container.register_factory(keys::AUTH_SERVICE, |r: &Resolver<'_>| {
        Ok(Arc::new(AuthService::new(
            r.resolve(keys::USER_REPOSITORY)?,
            r.resolve(keys::OTP_SERVICE)?,
            r.resolve(keys::TOKEN_SERVICE)?,
            r.resolve(keys::CREDENTIAL_SERVICE)?,
            r.resolve(keys::MAILER)?,
            r.resolve(keys::EMAIL_TEMPLATES)?,
        )))
    });

    container.register_factory(keys::PATIENT_SERVICE, |r: &Resolver<'_>| {
        let config = r.resolve(keys::CONFIG)?;
        Ok(Arc::new(PatientService::new(
            r.resolve(keys::PATIENT_REPOSITORY)?,
            config.hospital.tag.clone(),
        )))
    });

    Arc::new(container)
}

/// Delete expired OTP records every `interval` until the task is aborted
pub fn spawn_otp_cleanup(container: Arc<Container>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let otp = match container.resolve(keys::OTP_SERVICE) {
                Ok(otp) => otp,
                Err(err) => {
                    error!("OTP cleanup cannot resolve the OTP service: {}", err);
                    continue;
                }
            };

            if let Err(err) = otp.cleanup_expired().await {
                error!("OTP cleanup failed: {}", err);
            }
        }
    })
}
