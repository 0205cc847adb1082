use time::format_description::well_known::Rfc3339;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

const MEDIUM_DATE: &[FormatItem<'static>] =
    format_description!("[month repr:short] [day padding:none], [year]");
const SHORT_DATE: &[FormatItem<'static>] =
    format_description!("[month repr:short] [day padding:none]");

pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

pub fn format_rfc3339(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_else(|_| value.to_string())
}

/// Medium date rendering for the results screen, e.g. "Jan 2, 2025".
pub fn format_medium_date(value: OffsetDateTime) -> String {
    value.format(&MEDIUM_DATE).unwrap_or_else(|_| value.to_string())
}

/// Short month-day rendering for score history charts, e.g. "Jan 2".
pub fn format_short_date(value: OffsetDateTime) -> String {
    value.format(&SHORT_DATE).unwrap_or_else(|_| value.to_string())
}
