//! Deterministic reading of a student's question: which domains it touches
//! and which tool parameters it spells out.

use serde_json::{json, Map, Value};

use campusdesk_core::domain::Domain;

pub const HELP_TEXT: &str = "Hello! I'm the University Assistant. I can help you with:

- Academic: courses, prerequisites, lecturers
- Calendar: registration dates, exam periods
- Financial: school fees, payment methods
- Hostel: accommodation and facilities
- Library: library hours and services
- Administrative: transcripts, ID cards, certificates

Try asking:
- \"When is registration?\"
- \"How much is school fees?\"
- \"What courses can I take after CSC201?\"
- \"How do I apply for hostel?\"

What would you like to know?";

const ACADEMIC_KEYWORDS: &[&str] = &["course", "prerequisite", "class", "lecturer", "csc", "mth"];
const CALENDAR_KEYWORDS: &[&str] =
    &["registration", "when", "exam", "deadline", "semester", "calendar"];
const FINANCIAL_KEYWORDS: &[&str] = &["fee", "pay", "cost", "price", "tuition", "money"];
const HOSTEL_KEYWORDS: &[&str] = &["hostel", "accommodation", "room", "hall"];
const LIBRARY_KEYWORDS: &[&str] = &["library", "book", "borrow", "reading"];
const ADMINISTRATIVE_KEYWORDS: &[&str] =
    &["transcript", "id card", "certificate", "clearance", "verification"];

pub fn keywords(domain: Domain) -> &'static [&'static str] {
    match domain {
        Domain::Academic => ACADEMIC_KEYWORDS,
        Domain::Calendar => CALENDAR_KEYWORDS,
        Domain::Financial => FINANCIAL_KEYWORDS,
        Domain::Hostel => HOSTEL_KEYWORDS,
        Domain::Library => LIBRARY_KEYWORDS,
        Domain::Administrative => ADMINISTRATIVE_KEYWORDS,
    }
}

/// Domains whose keywords occur as substrings of the normalized query, in
/// priority order.
pub fn matched_domains(normalized: &str) -> Vec<Domain> {
    Domain::PRIORITY
        .into_iter()
        .filter(|domain| keywords(*domain).iter().any(|keyword| normalized.contains(keyword)))
        .collect()
}

#[derive(Clone, Debug, Default)]
pub struct ParameterExtractor;

impl ParameterExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Tool parameters for `domain` read out of the normalized query. Absent
    /// values are omitted so the tool falls back to its unfiltered read.
    pub fn extract(&self, domain: Domain, normalized: &str) -> Value {
        let tokens = tokenize(normalized);
        let mut params = Map::new();

        let extracted = match domain {
            Domain::Academic => extract_course_code(&tokens).map(|code| ("search", code)),
            Domain::Calendar => extract_semester(&tokens).map(|semester| ("semester", semester)),
            Domain::Financial => extract_level(&tokens).map(|level| ("level", level)),
            Domain::Hostel => extract_gender(&tokens).map(|gender| ("gender", gender)),
            Domain::Library => extract_library_topic(normalized).map(|topic| ("topic", topic)),
            Domain::Administrative => {
                extract_administrative_service(normalized).map(|service| ("service", service))
            }
        };

        if let Some((key, value)) = extracted {
            params.insert(key.to_string(), json!(value));
        }
        Value::Object(params)
    }
}

fn tokenize(text: &str) -> Vec<String> {
    let mut sanitized = String::with_capacity(text.len());
    for character in text.chars() {
        if character.is_ascii_alphanumeric() {
            sanitized.push(character);
        } else {
            sanitized.push(' ');
        }
    }
    sanitized.split_whitespace().map(|token| token.to_string()).collect()
}

fn is_subject_prefix(token: &str) -> bool {
    (2..=4).contains(&token.len()) && token.chars().all(|character| character.is_ascii_alphabetic())
}

fn is_course_number(token: &str) -> bool {
    token.len() == 3 && token.chars().all(|character| character.is_ascii_digit())
}

/// `csc301` or `csc 301`, upper-cased.
fn extract_course_code(tokens: &[String]) -> Option<String> {
    for (index, token) in tokens.iter().enumerate() {
        let split = token.find(|character: char| character.is_ascii_digit());
        if let Some(split) = split {
            let (prefix, number) = token.split_at(split);
            if is_subject_prefix(prefix) && is_course_number(number) {
                return Some(token.to_ascii_uppercase());
            }
        }

        if is_subject_prefix(token) && !is_common_word(token) {
            if let Some(next) = tokens.get(index + 1) {
                if is_course_number(next) {
                    return Some(format!("{}{}", token.to_ascii_uppercase(), next));
                }
            }
        }
    }
    None
}

fn is_common_word(token: &str) -> bool {
    matches!(token, "for" | "the" | "in" | "of" | "is" | "at" | "on" | "and" | "to" | "my" | "a")
}

fn extract_semester(tokens: &[String]) -> Option<String> {
    tokens.windows(2).find_map(|window| match window {
        [ordinal, semester] if semester == "semester" => match ordinal.as_str() {
            "first" | "1st" => Some("first".to_string()),
            "second" | "2nd" => Some("second".to_string()),
            _ => None,
        },
        _ => None,
    })
}

/// `N level` mapped onto the fee bands; levels outside every band stay unfiltered.
fn extract_level(tokens: &[String]) -> Option<String> {
    let level = tokens.windows(2).find_map(|window| match window {
        [number, unit] if unit == "level" => number.parse::<u32>().ok(),
        _ => None,
    })?;

    let band = match level {
        100 => "100",
        200..=400 => "200-400",
        500 => "500",
        _ => return None,
    };
    Some(band.to_string())
}

fn extract_gender(tokens: &[String]) -> Option<String> {
    let has = |word: &str| tokens.iter().any(|token| token == word);
    if has("female") || has("females") || has("women") || has("girls") {
        Some("female".to_string())
    } else if has("male") || has("males") || has("men") || has("boys") {
        Some("male".to_string())
    } else if has("mixed") {
        Some("mixed".to_string())
    } else {
        None
    }
}

fn extract_library_topic(normalized: &str) -> Option<String> {
    if normalized.contains("hour") || normalized.contains("opening") || normalized.contains("open")
    {
        Some("hours".to_string())
    } else if normalized.contains("borrow") || normalized.contains("fine") {
        Some("borrowing".to_string())
    } else {
        None
    }
}

fn extract_administrative_service(normalized: &str) -> Option<String> {
    ADMINISTRATIVE_KEYWORDS
        .iter()
        .find(|keyword| normalized.contains(*keyword))
        .map(|keyword| keyword.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use campusdesk_core::domain::Domain;

    use super::{matched_domains, ParameterExtractor};

    #[test]
    fn multi_domain_question_matches_calendar_and_financial_only() {
        let domains = matched_domains("when is registration and how much are fees?");
        assert_eq!(domains, vec![Domain::Calendar, Domain::Financial]);
    }

    #[test]
    fn weather_question_matches_nothing() {
        assert!(matched_domains("what is the weather today?").is_empty());
    }

    #[test]
    fn matches_are_in_priority_order_regardless_of_wording() {
        let domains = matched_domains("i need my transcript and the library hours for csc301");
        assert_eq!(domains, vec![Domain::Academic, Domain::Library, Domain::Administrative]);
    }

    #[test]
    fn extracts_course_code_in_either_spelling() {
        let extractor = ParameterExtractor::new();
        assert_eq!(
            extractor.extract(Domain::Academic, "what courses can i take after csc201?"),
            json!({ "search": "CSC201" })
        );
        assert_eq!(
            extractor.extract(Domain::Academic, "who teaches mth 302"),
            json!({ "search": "MTH302" })
        );
        assert_eq!(extractor.extract(Domain::Academic, "list all courses"), json!({}));
    }

    #[test]
    fn extracts_level_and_semester() {
        let extractor = ParameterExtractor::new();
        assert_eq!(
            extractor.extract(Domain::Financial, "how much is school fees for 200 level?"),
            json!({ "level": "200-400" })
        );
        assert_eq!(
            extractor.extract(Domain::Financial, "fees for 300 level"),
            json!({ "level": "200-400" })
        );
        assert_eq!(extractor.extract(Domain::Financial, "fees for 100 level"), json!({ "level": "100" }));
        assert_eq!(extractor.extract(Domain::Financial, "fees for 700 level"), json!({}));
        assert_eq!(
            extractor.extract(Domain::Calendar, "when is second semester registration?"),
            json!({ "semester": "second" })
        );
    }

    #[test]
    fn female_is_not_mistaken_for_male() {
        let extractor = ParameterExtractor::new();
        assert_eq!(
            extractor.extract(Domain::Hostel, "hostels for female students"),
            json!({ "gender": "female" })
        );
        assert_eq!(
            extractor.extract(Domain::Hostel, "any male hostel rooms?"),
            json!({ "gender": "male" })
        );
        assert_eq!(extractor.extract(Domain::Hostel, "how do i apply for hostel?"), json!({}));
    }

    #[test]
    fn administrative_service_is_the_matched_keyword() {
        let extractor = ParameterExtractor::new();
        assert_eq!(
            extractor.extract(Domain::Administrative, "how do i replace my id card?"),
            json!({ "service": "id card" })
        );
        assert_eq!(
            extractor.extract(Domain::Library, "what are the library opening hours?"),
            json!({ "topic": "hours" })
        );
    }
}
