use std::sync::OnceLock;

use regex::Regex;

use crate::db::ReminderRecord;

fn triple_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\(\s*([^()]*?)\s*,\s*(\d{4}-\d{2}-\d{2})\s*,\s*(\d{1,2}:\d{2})\s*\)")
            .expect("triple pattern is valid")
    })
}

/// Prompt asking the model to reduce `text` to a `(DESCRIPTION, DATE, TIME)`
/// triple. `year` fills in dates the speaker left implicit.
pub fn extraction_prompt(text: &str, year: i32) -> String {
    format!(
        r#"Extract the following information from this text:

Text: "{text}"

Format the output exactly like this:
(DESCRIPTION, DATE, TIME)

DESCRIPTION: The main task in 1-4 essential words (do not include time or date).
DATE: In YYYY-MM-DD format. If no year is mentioned, use {year}.
TIME: In 24-hour HH:MM format. Never include letters.
"#
    )
}

/// Pads a single-digit hour, `9:05` -> `09:05`.
pub fn pad_hour(time: &str) -> String {
    match time.split_once(':') {
        Some((hour, _)) if hour.len() == 1 => format!("0{time}"),
        _ => time.to_string(),
    }
}

/// First valid `(description, YYYY-MM-DD, H:MM)` triple in the model output.
/// Triples with an empty description or an impossible date or time are
/// skipped.
pub fn parse_extraction(output: &str) -> Option<ReminderRecord> {
    triple_pattern().captures_iter(output).find_map(|caps| {
        let description = caps[1].trim().trim_matches(|c| c == '"' || c == '\'');
        let time = pad_hour(&caps[3]);
        ReminderRecord::parse(description, &caps[2], &time).ok()
    })
}
