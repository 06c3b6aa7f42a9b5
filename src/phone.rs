//! Phone number display formatting for the identity header.

use rlibphonenumber::{region_code::RegionCode, PhoneNumberFormat, PHONE_NUMBER_UTIL};

/// Format a raw phone number for display, using the configured default
/// region for numbers without a country prefix. Falls back to the raw
/// string when the number does not parse.
pub fn format_display(raw: &str, default_region: Option<&str>) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    format_with_regions(trimmed, default_region).unwrap_or_else(|| trimmed.to_string())
}

fn format_with_regions(input: &str, default_region: Option<&str>) -> Option<String> {
    let util = &*PHONE_NUMBER_UTIL;
    let mut candidates: Vec<&str> = Vec::new();

    if let Some(region) = default_region {
        if !region.is_empty() {
            candidates.push(region);
        }
    }

    let unknown = RegionCode::get_unknown();
    if candidates
        .iter()
        .all(|candidate| !candidate.eq_ignore_ascii_case(unknown))
    {
        candidates.push(unknown);
    }

    for region in candidates {
        if let Ok(parsed) = util.parse(input, region) {
            return Some(
                util.format(&parsed, PhoneNumberFormat::International)
                    .into_owned(),
            );
        }
    }

    None
}
