//! Coarse human-readable time deltas for recall reports

/// Units from largest to smallest; seconds are the unconditional fallback.
const UNITS: [(&str, u64); 7] = [
    ("year", 60 * 60 * 24 * 365),
    ("month", 60 * 60 * 24 * 30),
    ("week", 60 * 60 * 24 * 7),
    ("day", 60 * 60 * 24),
    ("hour", 60 * 60),
    ("minute", 60),
    ("second", 1),
];

/// Render a signed delta in seconds as a coarse "about N units" phrase.
///
/// The largest unit covering at least one whole interval is chosen and the
/// count rounds down. With `raw` the bare phrase is returned; otherwise
/// positive deltas are framed as "in ..." and negative ones as "... ago".
/// Zero is always the literal "now".
pub fn fuzzy_delta(delta_secs: i64, raw: bool) -> String {
    if delta_secs == 0 {
        return "now".to_string();
    }

    let (periods, unit) = whole_units(delta_secs.unsigned_abs());
    let fuzzy = format!(
        "about {} {}{}",
        periods,
        unit,
        if periods > 1 { "s" } else { "" }
    );

    if raw {
        fuzzy
    } else if delta_secs > 0 {
        format!("in {}", fuzzy)
    } else {
        format!("{} ago", fuzzy)
    }
}

fn whole_units(magnitude: u64) -> (u64, &'static str) {
    for (name, interval) in UNITS {
        if magnitude >= interval {
            return (magnitude / interval, name);
        }
    }
    (magnitude, "second")
}
