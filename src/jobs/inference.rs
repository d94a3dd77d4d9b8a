// src/jobs/inference.rs
//! Heuristic job title / location guess from free-form CV text

use regex::Regex;
use std::sync::LazyLock;

pub const DEFAULT_ROLE: &str = "software engineer";
pub const DEFAULT_LOCATION: &str = "India";

const ROLE_SCAN_LINES: usize = 40;
const LOCATION_SCAN_LINES: usize = 80;

// Ordered: the first pattern that matches anywhere in the text wins.
static TITLE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(senior|lead|principal)?\s*(software|data|ml|ai|devops|full[-\s]?stack|frontend|backend|mobile|cloud)\s*(engineer|developer|scientist|manager|architect)",
        r"(?i)(product|project)\s*manager",
        r"(?i)(business|data)\s*analyst",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid title pattern"))
    .collect()
});

static ROLE_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)engineer|developer|manager|analyst|scientist").expect("valid keyword pattern")
});

static LOCATION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)location\s*[:\-]").expect("valid location pattern"));

static LOCATION_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)location\s*[:\-]\s*").expect("valid label pattern"));

static KNOWN_CITIES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(Bengaluru|Bangalore|Hyderabad|Pune|Mumbai|Delhi|Chennai|Kolkata|Noida|Gurgaon|Ahmedabad|Remote|India)",
    )
    .expect("valid city pattern")
});

/// Guess `(role, location)` from CV text. Pure and deterministic.
pub fn infer(cv_text: &str) -> (String, String) {
    let lines: Vec<&str> = cv_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let blob = lines.join(" ");

    (infer_role(&lines, &blob), infer_location(&lines, &blob))
}

fn infer_role(lines: &[&str], blob: &str) -> String {
    let role = TITLE_PATTERNS
        .iter()
        .find_map(|pattern| pattern.find(blob).map(|m| m.as_str()))
        .or_else(|| {
            lines
                .iter()
                .take(ROLE_SCAN_LINES)
                .find(|line| ROLE_KEYWORD.is_match(line))
                .copied()
        })
        .unwrap_or(DEFAULT_ROLE);

    title_case(&role.trim().to_lowercase())
}

fn infer_location(lines: &[&str], blob: &str) -> String {
    let labelled = lines
        .iter()
        .take(LOCATION_SCAN_LINES)
        .find(|line| LOCATION_LINE.is_match(line))
        .map(|line| LOCATION_LABEL.replace_all(line, "").trim().to_string())
        .filter(|location| !location.is_empty());

    let location = labelled
        .or_else(|| KNOWN_CITIES.find(blob).map(|m| m.as_str().to_string()))
        .unwrap_or_else(|| DEFAULT_LOCATION.to_string());

    location.replace("Bangalore", "Bengaluru")
}

/// Uppercase every letter that follows a non-letter, lowercase the rest
/// ("full-stack developer" -> "Full-Stack Developer").
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_is_letter = false;

    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(c);
            previous_is_letter = false;
        }
    }

    out
}
