//! Plain-text rendering of profile and author screens.

use std::fmt::Write;

use authordesk_core::api::FieldError;
use authordesk_core::auth::CookieRecord;
use authordesk_core::models::{Author, Profile};
use authordesk_core::utils::{format_date, format_optional, truncate_string};

/// Column widths for the author list
const NAME_WIDTH: usize = 32;
const EMAIL_WIDTH: usize = 28;

const NONE: &str = "-";

pub fn profile(profile: &Profile) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", profile.full_name());
    let _ = writeln!(out, "  Email:    {}", profile.email);
    if let Some(phone) = profile.phone.as_deref().filter(|p| !p.is_empty()) {
        let _ = writeln!(out, "  Phone:    {}", phone);
    }
    let _ = writeln!(out, "  Status:   {}", profile.status_display());
    let _ = writeln!(out, "  Created:  {}", format_date(&profile.created_at));
    let _ = writeln!(out, "  Updated:  {}", format_date(&profile.updated_at));
    out
}

pub fn author_table(authors: &[Author]) -> String {
    if authors.is_empty() {
        return "No authors yet.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>6}  {:<name$}  {:<email$}  {}",
        "ID",
        "NAME",
        "EMAIL",
        "UPDATED",
        name = NAME_WIDTH,
        email = EMAIL_WIDTH
    );
    for author in authors {
        let _ = writeln!(
            out,
            "{:>6}  {:<name$}  {:<email$}  {}",
            author.id,
            truncate_string(&author.full_name(), NAME_WIDTH),
            truncate_string(&format_optional(author.email.as_deref(), NONE), EMAIL_WIDTH),
            format_date(&author.updated_at),
            name = NAME_WIDTH,
            email = EMAIL_WIDTH
        );
    }
    let _ = writeln!(out, "{} author(s)", authors.len());
    out
}

pub fn author_detail(author: &Author) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "#{} {}", author.id, author.full_name());
    let _ = writeln!(
        out,
        "  Email:        {}",
        format_optional(author.email.as_deref(), NONE)
    );
    let _ = writeln!(
        out,
        "  Avatar:       {}",
        format_optional(author.avatar_url(), NONE)
    );
    let _ = writeln!(
        out,
        "  Summary:      {}",
        format_optional(author.short_description.as_deref(), NONE)
    );
    let _ = writeln!(out, "  Created:      {}", format_date(&author.created_at));
    let _ = writeln!(out, "  Updated:      {}", format_date(&author.updated_at));
    if let Some(description) = author.description.as_deref().filter(|d| !d.trim().is_empty()) {
        let _ = writeln!(out, "\n{}", description);
    }
    out
}

pub fn field_errors(errors: &[FieldError]) -> String {
    let mut out = String::new();
    for error in errors {
        let _ = writeln!(out, "  {:<18} {}", error.field, error.message);
    }
    out
}

pub fn session(access: Option<&CookieRecord>, refresh: Option<&CookieRecord>) -> String {
    let line = |label: &str, cookie: Option<&CookieRecord>| match cookie {
        Some(c) => format!("  {:<14} expires {}\n", label, c.expires_at.format("%Y-%m-%d %H:%M UTC")),
        None => format!("  {:<14} none\n", label),
    };
    let status = if access.is_some() || refresh.is_some() {
        "Session stored"
    } else {
        "Not logged in"
    };
    format!(
        "{}\n{}{}",
        status,
        line("Access token", access),
        line("Refresh token", refresh)
    )
}
