//! Message and email templates for reminder and renewal notifications.
//!
//! Templates are plain functions over domain values so the jobs stay free of
//! string formatting and the wording is testable in one place.

use crate::domain::foundation::Timestamp;
use crate::domain::notification::ReminderBucket;
use crate::domain::payment::PaymentRecord;

/// Channel text for an expiration reminder.
///
/// Daily-cycle reminders switch to urgent wording inside the final lead
/// window; `urgent` carries that decision from the caller.
pub fn reminder_text(bucket: ReminderBucket, expires_at: Timestamp, urgent: bool) -> String {
    match bucket {
        ReminderBucket::ThreeDay => format!(
            "Your subscription expires in 3 days, on {expires_at}. \
             Renew now to keep your access active."
        ),
        ReminderBucket::OneDay => format!(
            "Your subscription expires within 24 hours, on {expires_at}. \
             Renew today to avoid losing access."
        ),
        ReminderBucket::Expired => {
            "Your subscription expired yesterday. Renew now to restore your access.".to_string()
        }
        ReminderBucket::DailyReminder if urgent => format!(
            "Last call: your access ends at {expires_at}. \
             Renew in the next few hours to stay connected."
        ),
        ReminderBucket::DailyReminder => format!(
            "Your access ends at {expires_at}. Renew today to keep it active."
        ),
        ReminderBucket::DailyExpired => {
            "Your access has just expired. Renew now to get back online.".to_string()
        }
    }
}

/// Email subject for an expiration reminder.
pub fn reminder_subject(bucket: ReminderBucket) -> &'static str {
    match bucket {
        ReminderBucket::ThreeDay => "Your subscription expires in 3 days",
        ReminderBucket::OneDay => "Your subscription expires tomorrow",
        ReminderBucket::Expired => "Your subscription has expired",
        ReminderBucket::DailyReminder => "Your access expires today",
        ReminderBucket::DailyExpired => "Your access has expired",
    }
}

/// Email body for an expiration reminder.
pub fn reminder_email_html(bucket: ReminderBucket, expires_at: Timestamp, urgent: bool) -> String {
    format!(
        "<p>{}</p><p>If you have already renewed, you can ignore this message.</p>",
        reminder_text(bucket, expires_at, urgent)
    )
}

/// Channel text carrying a freshly generated PIX code.
pub fn renewal_pix_text(record: &PaymentRecord) -> Option<String> {
    record.pix.as_ref().map(|pix| {
        format!(
            "Renew with PIX (valid until {}). Copy and paste this code in your bank app:\n{}",
            pix.expires_at, pix.code
        )
    })
}

/// Renewal email: PIX and boleto details when available, otherwise a
/// checkout link so the tenant always has a way to pay.
pub fn renewal_email_html(record: &PaymentRecord, checkout_url: &str) -> String {
    let mut body = String::from("<p>Here is everything you need to renew your subscription.</p>");

    if let Some(pix) = &record.pix {
        body.push_str(&format!(
            "<p><strong>PIX</strong> (valid until {}):<br><code>{}</code></p>\
             <p><img src=\"data:image/png;base64,{}\" alt=\"PIX QR code\"></p>",
            pix.expires_at, pix.code, pix.qr_base64
        ));
    }
    if let Some(boleto) = &record.boleto {
        body.push_str(&format!(
            "<p><strong>Boleto</strong> (due {}):<br><code>{}</code><br>\
             <a href=\"{}\">Open boleto</a></p>",
            boleto.due_at, boleto.line_code, boleto.url
        ));
    }
    if record.pix.is_none() && record.boleto.is_none() {
        body.push_str(&format!(
            "<p><a href=\"{checkout_url}\">Renew through our checkout page</a></p>"
        ));
    }
    body
}

/// Failed-recurring-payment reminder text for ladder stop `stop` (1-based).
pub fn failed_payment_text(stop: u32, checkout_url: &str) -> String {
    match stop {
        1 => format!(
            "We could not process your subscription payment. \
             Please update your payment method or renew manually: {checkout_url}"
        ),
        2 => format!(
            "Your subscription payment is still failing and your access is at risk. \
             Renew manually here: {checkout_url}"
        ),
        _ => format!(
            "Final notice: your subscription payment keeps failing. \
             Renew now to avoid losing access: {checkout_url}"
        ),
    }
}

/// Email subject for a failed-recurring-payment reminder.
pub fn failed_payment_subject(stop: u32) -> &'static str {
    match stop {
        1 => "We could not process your payment",
        2 => "Your subscription payment is still failing",
        _ => "Final notice: subscription payment failed",
    }
}
