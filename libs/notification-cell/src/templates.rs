// libs/notification-cell/src/templates.rs
use chrono::{DateTime, Utc};

/// One message rendered for both channels. SMS uses `text`; email uses
/// `subject` and `html`.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub subject: String,
    pub text: String,
    pub html: String,
}

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Human-readable appointment time. Times are rendered in UTC with the
/// client's zone named alongside.
pub fn format_appointment_time(at: DateTime<Utc>, time_zone: Option<&str>) -> String {
    let when = at.format("%A, %B %-d, %Y at %H:%M UTC").to_string();
    match time_zone.map(str::trim).filter(|tz| !tz.is_empty() && *tz != "UTC") {
        Some(tz) => format!("{} ({})", when, tz),
        None => when,
    }
}

fn wrap_html(practice_name: &str, body: &str) -> String {
    format!(
        "<div style=\"font-family: sans-serif; max-width: 560px; margin: 0 auto;\">\
         {}<p style=\"color: #666; font-size: 12px;\">{}</p></div>",
        body,
        escape_html(practice_name)
    )
}

pub fn booking_confirmation(practice_name: &str, name: &str, when: &str, cancel_url: &str) -> Notice {
    Notice {
        subject: format!("Your consultation with {} is confirmed", practice_name),
        text: format!(
            "Hi {}, your consultation with {} is booked for {}. Need to cancel? {}",
            name, practice_name, when, cancel_url
        ),
        html: wrap_html(
            practice_name,
            &format!(
                "<p>Hi {},</p><p>Your free consultation is booked for <strong>{}</strong>.</p>\
                 <p>If you need to cancel, use <a href=\"{}\">this link</a>.</p>",
                escape_html(name),
                escape_html(when),
                escape_html(cancel_url)
            ),
        ),
    }
}

pub fn appointment_reminder(
    practice_name: &str,
    first_name: &str,
    when: &str,
    hours_before: i64,
    cancel_url: &str,
) -> Notice {
    let lead = if hours_before >= 24 {
        "tomorrow".to_string()
    } else {
        format!("in about {} hours", hours_before)
    };

    Notice {
        subject: format!("Reminder: your appointment with {}", practice_name),
        text: format!(
            "Hi {}, a reminder that your appointment with {} is {} ({}). Can't make it? {}",
            first_name, practice_name, lead, when, cancel_url
        ),
        html: wrap_html(
            practice_name,
            &format!(
                "<p>Hi {},</p><p>This is a reminder that your appointment is {}: <strong>{}</strong>.</p>\
                 <p>Can't make it? <a href=\"{}\">Cancel here</a>.</p>",
                escape_html(first_name),
                lead,
                escape_html(when),
                escape_html(cancel_url)
            ),
        ),
    }
}

pub fn missed_appointment(practice_name: &str, first_name: &str, rebook_url: &str) -> Notice {
    Notice {
        subject: "We missed you today".to_string(),
        text: format!(
            "Hi {}, we missed you at your appointment with {}. You can pick a new time here: {}",
            first_name, practice_name, rebook_url
        ),
        html: wrap_html(
            practice_name,
            &format!(
                "<p>Hi {},</p><p>We missed you at your appointment. Life happens!</p>\
                 <p><a href=\"{}\">Pick a new time</a> whenever you're ready.</p>",
                escape_html(first_name),
                escape_html(rebook_url)
            ),
        ),
    }
}

pub fn questionnaire_nudge(practice_name: &str, first_name: &str, prompt: &str) -> Notice {
    Notice {
        subject: format!("A quick question from {}", practice_name),
        text: format!("Hi {}, picking up where we left off: {}", first_name, prompt),
        html: wrap_html(
            practice_name,
            &format!(
                "<p>Hi {},</p><p>Picking up where we left off:</p><p><em>{}</em></p>\
                 <p>Just reply to our text message to continue.</p>",
                escape_html(first_name),
                escape_html(prompt)
            ),
        ),
    }
}
