//! Structured facts pulled out of a free-text client brief.
//!
//! Each field has its own small matcher; `ParsedContext::from_message` just
//! runs them in turn. None of them share state, so every matcher can be
//! exercised on its own.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::ParseError;

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][a-z]+ [A-Z][a-z]+)\b").unwrap());
static AGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)-?\s*years?-?\s*old").unwrap());
static BUDGET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"budget of \$([\d,]+)").unwrap());
static GENDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(he|she|him|her)\b").unwrap());
static SALARY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:salary|income|pay|wage)[^\d]*(\d+)").unwrap());
static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:January|February|March|April|May|June|July|August|September|October|November|December)\s\d{1,2}(?i:st|nd|rd|th)?,\s\d{4}|\d{4}-\d{2}-\d{2}",
    )
    .unwrap()
});
static ORDINAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)(st|nd|rd|th)").unwrap());

const ISO_FORMAT: &str = "%Y-%m-%d";
const LONG_FORMAT: &str = "%B %d, %Y";

#[derive(Debug, Deserialize)]
pub struct ContextResponse {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedContext {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Gender,
    pub budget: Option<u64>,
    pub salary: Option<u64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ParsedContext {
    /// Parse the `{"message": ...}` envelope returned by `/request`.
    pub fn from_context(context_json: &str) -> Result<Self, ParseError> {
        let ctx: ContextResponse = serde_json::from_str(context_json)?;
        let parsed = Self::from_message(&ctx.message)?;
        info!("Parsed context: {}", parsed);
        Ok(parsed)
    }

    pub fn from_message(msg: &str) -> Result<Self, ParseError> {
        let (start_date, end_date) = extract_dates(msg)?;

        Ok(ParsedContext {
            name: extract_name(msg),
            age: extract_age(msg),
            gender: extract_gender(msg),
            budget: extract_budget(msg),
            salary: extract_salary(msg),
            start_date,
            end_date,
        })
    }

    /// Whole months between start and end, ignoring the day of month.
    pub fn horizon_months(&self) -> Option<i32> {
        let (s, e) = (self.start_date?, self.end_date?);
        Some((e.year() - s.year()) * 12 + (e.month() as i32 - s.month() as i32))
    }

    pub fn start_date_iso(&self) -> Option<String> {
        self.start_date.map(|d| d.format(ISO_FORMAT).to_string())
    }

    pub fn end_date_iso(&self) -> Option<String> {
        self.end_date.map(|d| d.format(ISO_FORMAT).to_string())
    }
}

impl fmt::Display for ParsedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt<T: fmt::Display>(v: &Option<T>) -> String {
            v.as_ref().map_or_else(|| "-".to_string(), |x| x.to_string())
        }
        write!(
            f,
            "name={} age={} gender={} budget={} salary={} start={} end={}",
            opt(&self.name),
            opt(&self.age),
            self.gender,
            opt(&self.budget),
            opt(&self.salary),
            opt(&self.start_date),
            opt(&self.end_date),
        )
    }
}

fn first_capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    Some(re.captures(text)?.get(1)?.as_str())
}

pub fn extract_name(text: &str) -> Option<String> {
    first_capture(&NAME_RE, text).map(str::to_string)
}

pub fn extract_age(text: &str) -> Option<u32> {
    first_capture(&AGE_RE, text)?.parse().ok()
}

pub fn extract_budget(text: &str) -> Option<u64> {
    first_capture(&BUDGET_RE, text)?
        .replace(',', "")
        .parse()
        .ok()
}

pub fn extract_gender(text: &str) -> Gender {
    match first_capture(&GENDER_RE, text).map(str::to_ascii_lowercase).as_deref() {
        Some("he" | "him") => Gender::Male,
        Some("she" | "her") => Gender::Female,
        _ => Gender::Unknown,
    }
}

pub fn extract_salary(text: &str) -> Option<u64> {
    first_capture(&SALARY_RE, text)?.parse().ok()
}

/// First two date tokens in order of appearance, whichever format each uses.
pub fn extract_dates(text: &str) -> Result<(Option<NaiveDate>, Option<NaiveDate>), ParseError> {
    let mut tokens = DATE_RE.find_iter(text).map(|m| parse_date(m.as_str()));
    let start = tokens.next().transpose()?;
    let end = tokens.next().transpose()?;
    Ok((start, end))
}

/// Parse a `YYYY-MM-DD` or `Month Day[st|nd|rd|th], Year` token.
pub fn parse_date(token: &str) -> Result<NaiveDate, ParseError> {
    if let Ok(d) = NaiveDate::parse_from_str(token, ISO_FORMAT) {
        return Ok(d);
    }
    let clean = ORDINAL_RE.replace_all(token, "$1");
    NaiveDate::parse_from_str(&clean, LONG_FORMAT)
        .map_err(|_| ParseError::UnsupportedDate(token.to_string()))
}

/// Canonical `YYYY-MM-DD` form of a date token.
pub fn normalize_date(token: &str) -> Result<String, ParseError> {
    Ok(parse_date(token)?.format(ISO_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOE: &str = "Joe Lee is a 53-year-old man with a budget of $5,856 looking to invest from 2010-08-14 to 2011-06-21";

    fn envelope(message: &str) -> String {
        serde_json::json!({ "message": message }).to_string()
    }

    #[test]
    fn extracts_the_reference_brief() {
        let parsed = ParsedContext::from_context(&envelope(JOE)).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("Joe Lee"));
        assert_eq!(parsed.age, Some(53));
        assert_eq!(parsed.budget, Some(5856));
        assert_eq!(parsed.salary, None);
        assert_eq!(parsed.start_date_iso().as_deref(), Some("2010-08-14"));
        assert_eq!(parsed.end_date_iso().as_deref(), Some("2011-06-21"));
        assert_eq!(parsed.horizon_months(), Some(10));
    }

    #[test]
    fn pronouns_decide_gender() {
        assert_eq!(extract_gender("He wants growth."), Gender::Male);
        assert_eq!(extract_gender("Give HIM bonds"), Gender::Male);
        assert_eq!(extract_gender("Ask her later, then him"), Gender::Female);
        assert_eq!(extract_gender("The client is Joe Lee"), Gender::Unknown);
        // Whole words only.
        assert_eq!(extract_gender("The theme is shelter"), Gender::Unknown);
    }

    #[test]
    fn reference_brief_has_no_pronoun() {
        // "man" is not a pronoun; the sentinel is explicit rather than absent.
        let parsed = ParsedContext::from_message(JOE).unwrap();
        assert_eq!(parsed.gender, Gender::Unknown);

        let parsed = ParsedContext::from_message(&format!("{JOE}. He is patient.")).unwrap();
        assert_eq!(parsed.gender, Gender::Male);
    }

    #[test]
    fn unrecognised_fields_are_empty_not_errors() {
        let parsed = ParsedContext::from_message("nothing useful here").unwrap();
        assert_eq!(
            parsed,
            ParsedContext {
                gender: Gender::Unknown,
                ..ParsedContext::default()
            }
        );
        assert_eq!(parsed.horizon_months(), None);
    }

    #[test]
    fn missing_message_field_is_an_empty_brief() {
        let parsed = ParsedContext::from_context(r#"{"other": 1}"#).unwrap();
        assert_eq!(parsed, ParsedContext::default());
    }

    #[test]
    fn malformed_json_is_fatal() {
        let err = ParsedContext::from_context("{not json").unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }

    #[test]
    fn age_tolerates_spaces_and_hyphens() {
        assert_eq!(extract_age("a 53-year-old"), Some(53));
        assert_eq!(extract_age("is 40 years old"), Some(40));
        assert_eq!(extract_age("aged 7 year-old"), Some(7));
        assert_eq!(extract_age("old age"), None);
    }

    #[test]
    fn budget_strips_commas() {
        assert_eq!(extract_budget("with a budget of $1,250,000 total"), Some(1_250_000));
        assert_eq!(extract_budget("a budget of $900"), Some(900));
        assert_eq!(extract_budget("budget is $900"), None);
    }

    #[test]
    fn salary_skips_non_digits() {
        assert_eq!(extract_salary("Annual salary: $85000"), Some(85000));
        assert_eq!(extract_salary("INCOME around 42000 a year"), Some(42000));
        assert_eq!(extract_salary("no earnings mentioned"), None);
    }

    #[test]
    fn name_is_first_pair_of_capitalised_words() {
        assert_eq!(extract_name("Ada Lovelace wants bonds").as_deref(), Some("Ada Lovelace"));
        assert_eq!(extract_name("client: Mary Jane Watson").as_deref(), Some("Mary Jane"));
        assert_eq!(extract_name("all lowercase words"), None);
    }

    #[test]
    fn name_is_found_mid_sentence() {
        assert_eq!(
            extract_name("A client named Joe Lee wants bonds").as_deref(),
            Some("Joe Lee")
        );
        assert_eq!(
            extract_name("our new client, Priya Shah, is 41").as_deref(),
            Some("Priya Shah")
        );
    }

    #[test]
    fn ordinal_suffixes_are_stripped_in_any_case() {
        assert_eq!(normalize_date("March 3rd, 2022").unwrap(), "2022-03-03");
        assert_eq!(normalize_date("March 1st, 2022").unwrap(), "2022-03-01");
        assert_eq!(normalize_date("June 22ND, 2019").unwrap(), "2019-06-22");
        assert_eq!(normalize_date("July 4Th, 2001").unwrap(), "2001-07-04");
        assert_eq!(normalize_date("August 9, 2015").unwrap(), "2015-08-09");
    }

    #[test]
    fn normalizing_canonical_dates_is_idempotent() {
        for d in ["2010-08-14", "1999-12-31", "2024-02-29"] {
            let once = normalize_date(d).unwrap();
            assert_eq!(once, d);
            assert_eq!(normalize_date(&once).unwrap(), d);
        }
    }

    #[test]
    fn unsupported_date_tokens_abort_extraction() {
        assert!(matches!(
            normalize_date("2010-13-45"),
            Err(ParseError::UnsupportedDate(t)) if t == "2010-13-45"
        ));
        let err = ParsedContext::from_message("Invest from 2010-02-30 to 2011-01-01").unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedDate(_)));
    }

    #[test]
    fn dates_are_taken_in_order_across_formats() {
        let msg = "Start on March 3rd, 2022, end 2023-01-15, review 2024-01-01";
        let (start, end) = extract_dates(msg).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2022, 3, 3));
        assert_eq!(end, NaiveDate::from_ymd_opt(2023, 1, 15));

        let (start, end) = extract_dates("until 2020-05-01 only").unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2020, 5, 1));
        assert_eq!(end, None);
    }

    #[test]
    fn horizon_ignores_day_of_month() {
        let ctx = ParsedContext {
            start_date: NaiveDate::from_ymd_opt(2020, 1, 31),
            end_date: NaiveDate::from_ymd_opt(2020, 12, 1),
            ..ParsedContext::default()
        };
        assert_eq!(ctx.horizon_months(), Some(11));
    }
}
