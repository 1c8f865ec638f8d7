//! Outbound contractor notifications.
//!
//! SMS delivery is simulated: [`LogNotifier`] records the message in the log
//! and reports it as sent.

use log::info;

pub const NO_PHONE_STATUS: &str = "No phone number linked.";
pub const SENT_STATUS: &str = "Sent";

pub trait Notifier {
    /// Delivers `message` and returns a human-readable delivery status.
    fn send_sms(&self, phone: Option<&str>, message: &str) -> String;
}

impl<T: Notifier + ?Sized> Notifier for &T {
    fn send_sms(&self, phone: Option<&str>, message: &str) -> String {
        (**self).send_sms(phone, message)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send_sms(&self, phone: Option<&str>, message: &str) -> String {
        let Some(phone) = phone.map(str::trim).filter(|value| !value.is_empty()) else {
            return NO_PHONE_STATUS.to_string();
        };
        info!(
            "event=sms_alert module=notify status=sent to={} chars={}",
            mask_phone(phone),
            message.chars().count()
        );
        SENT_STATUS.to_string()
    }
}

/// Keeps the last four digits only.
fn mask_phone(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(char::is_ascii_digit).collect();
    let keep = digits.len().saturating_sub(4);
    digits
        .iter()
        .enumerate()
        .map(|(index, digit)| if index < keep { '*' } else { *digit })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{mask_phone, LogNotifier, Notifier, NO_PHONE_STATUS, SENT_STATUS};

    #[test]
    fn missing_or_blank_phone_is_not_sent() {
        assert_eq!(LogNotifier.send_sms(None, "hi"), NO_PHONE_STATUS);
        assert_eq!(LogNotifier.send_sms(Some("  "), "hi"), NO_PHONE_STATUS);
        assert_eq!(LogNotifier.send_sms(Some("+91 98765 43210"), "hi"), SENT_STATUS);
    }

    #[test]
    fn mask_keeps_last_four_digits() {
        assert_eq!(mask_phone("98765-43210"), "******3210");
    }
}
