//! Email Templates
//!
//! HTML bodies for OTP, welcome and password-reset emails, rendered with
//! tera from templates embedded in the binary.

use chrono::Datelike;
use tera::{Context, Tera};

use crate::models::OtpType;
use crate::service::email_service::MailError;

const LAYOUT: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{% block title %}{% endblock title %}</title>
    <style>
        body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px; }
        .header { text-align: center; background: #eef6f3; padding: 20px; border-radius: 8px 8px 0 0; }
        .content { background: white; padding: 30px; border: 1px solid #dee2e6; }
        .code { font-size: 32px; font-weight: bold; color: #0b7a5c; letter-spacing: 6px; text-align: center; margin: 20px 0; padding: 15px; background: #eef6f3; border-radius: 4px; }
        .footer { background: #eef6f3; padding: 20px; border-radius: 0 0 8px 8px; text-align: center; font-size: 12px; color: #666; }
    </style>
</head>
<body>
    <div class="header">
        <h1>{{ hospital_name }}</h1>
    </div>
    <div class="content">
        {% block content %}{% endblock content %}
        <p>Regards,<br>{{ hospital_name }}</p>
    </div>
    <div class="footer">
        <p>This is an automated message from {{ hospital_name }}. Please do not reply.</p>
        <p>&copy; {{ current_year }} {{ hospital_name }}</p>
    </div>
</body>
</html>
"#;

const OTP: &str = r#"{% extends "layout.html" %}
{% block title %}{{ heading }}{% endblock title %}
{% block content %}
        <p>Hello {{ user_name }},</p>
        <p>{{ purpose }}</p>
        <div class="code">{{ otp_code }}</div>
        <p>This code expires in <strong>{{ expires_in_minutes }} minutes</strong>. Never share it with anyone, including hospital staff.</p>
        <p>If you did not request this code, you can ignore this email.</p>
{% endblock content %}
"#;

const WELCOME: &str = r#"{% extends "layout.html" %}
{% block title %}Welcome{% endblock title %}
{% block content %}
        <p>Hello {{ user_name }},</p>
        <p>Your account has been verified.{% if awaiting_approval %} An administrator will review it shortly; you can sign in once it is approved.{% else %} You can now sign in.{% endif %}</p>
{% endblock content %}
"#;

const PASSWORD_RESET: &str = r#"{% extends "layout.html" %}
{% block title %}Password changed{% endblock title %}
{% block content %}
        <p>Hello {{ user_name }},</p>
        <p>The password of your account was just changed. If this was not you, contact the hospital administration immediately.</p>
{% endblock content %}
"#;

/// Subject and HTML body of an email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Email renderer
pub struct EmailTemplates {
    tera: Tera,
    hospital_name: String,
}

impl EmailTemplates {
    pub fn new(hospital_name: impl Into<String>) -> Result<Self, MailError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("layout.html", LAYOUT),
            ("otp.html", OTP),
            ("welcome.html", WELCOME),
            ("password_reset.html", PASSWORD_RESET),
        ])
        .map_err(|e| MailError::Template(e.to_string()))?;

        Ok(Self {
            tera,
            hospital_name: hospital_name.into(),
        })
    }

    /// One-time code email; subject and wording depend on the code's purpose
    pub fn otp(
        &self,
        user_name: &str,
        otp_code: &str,
        expires_in_minutes: i64,
        otp_type: OtpType,
    ) -> Result<RenderedEmail, MailError> {
        let (subject, heading, purpose) = match otp_type {
            OtpType::Registration => (
                format!("Verify your {} account", self.hospital_name),
                "Verify your account",
                "Use the code below to verify your staff account.",
            ),
            OtpType::Login => (
                format!("Your {} login code", self.hospital_name),
                "Sign-in code",
                "Use the code below to sign in.",
            ),
            OtpType::ForgotPassword => (
                format!("Reset your {} password", self.hospital_name),
                "Password reset",
                "Use the code below to choose a new password.",
            ),
        };

        let mut context = self.context(user_name);
        context.insert("heading", heading);
        context.insert("purpose", purpose);
        context.insert("otp_code", otp_code);
        context.insert("expires_in_minutes", &expires_in_minutes);

        Ok(RenderedEmail {
            subject,
            html: self.render("otp.html", &context)?,
        })
    }

    pub fn welcome(&self, user_name: &str, awaiting_approval: bool) -> Result<RenderedEmail, MailError> {
        let mut context = self.context(user_name);
        context.insert("awaiting_approval", &awaiting_approval);

        Ok(RenderedEmail {
            subject: format!("Welcome to {}", self.hospital_name),
            html: self.render("welcome.html", &context)?,
        })
    }

    pub fn password_reset_confirmation(&self, user_name: &str) -> Result<RenderedEmail, MailError> {
        let context = self.context(user_name);

        Ok(RenderedEmail {
            subject: format!("Your {} password was changed", self.hospital_name),
            html: self.render("password_reset.html", &context)?,
        })
    }

    fn context(&self, user_name: &str) -> Context {
        let mut context = Context::new();
        context.insert("user_name", user_name);
        context.insert("hospital_name", &self.hospital_name);
        context.insert("current_year", &chrono::Utc::now().year());
        context
    }

    fn render(&self, template: &str, context: &Context) -> Result<String, MailError> {
        self.tera
            .render(template, context)
            .map_err(|e| MailError::Template(e.to_string()))
    }
}
