// src/jobs/linkedin.rs
//! Guest job search against LinkedIn's public results fragment

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::header::{ACCEPT_LANGUAGE, COOKIE};
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::ScrapedJob;
use crate::environment::JobBoardConfig;

const LINKEDIN_ORIGIN: &str = "https://www.linkedin.com";
const VIA: &str = "linkedin";
const UNTITLED: &str = "Untitled";

static JOB_VIEW_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/jobs/view/(\d+)").expect("valid job id pattern"));

#[derive(Debug, Error)]
pub enum JobBoardError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("job board answered with HTTP {0}")]
    Status(StatusCode),
}

/// Anything that can turn a role and location into job listings
#[rocket::async_trait]
pub trait JobSource: Send + Sync {
    /// Human-readable name used in error messages
    fn name(&self) -> &str;

    async fn search(
        &self,
        role: &str,
        location: &str,
        cookie: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScrapedJob>, JobBoardError>;
}

pub struct LinkedInClient {
    client: Client,
    search_url: String,
}

impl LinkedInClient {
    pub fn new(config: &JobBoardConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = Client::builder()
            .user_agent("Mozilla/5.0")
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            search_url: config.search_url.clone(),
        })
    }
}

#[rocket::async_trait]
impl JobSource for LinkedInClient {
    fn name(&self) -> &str {
        "LinkedIn"
    }

    async fn search(
        &self,
        role: &str,
        location: &str,
        cookie: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScrapedJob>, JobBoardError> {
        info!("Searching LinkedIn for '{}' in '{}'", role, location);

        let mut request = self
            .client
            .get(&self.search_url)
            .query(&[("keywords", role), ("location", location), ("start", "0")])
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9");

        if let Some(cookie) = cookie {
            request = request.header(COOKIE, format!("li_at={}", cookie));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("LinkedIn search returned {}", status);
            return Err(JobBoardError::Status(status));
        }

        let html = response.text().await?;
        let jobs = parse_job_cards(&html, location, limit);

        info!("Parsed {} job cards", jobs.len());
        Ok(jobs)
    }
}

struct CardSelectors {
    card: Selector,
    title: Selector,
    company: Selector,
    link: Selector,
    location: Selector,
}

impl CardSelectors {
    fn new() -> Option<Self> {
        Some(Self {
            card: Selector::parse("li").ok()?,
            title: Selector::parse("h3").ok()?,
            company: Selector::parse("h4").ok()?,
            link: Selector::parse("a[href*='/jobs/view/']").ok()?,
            location: Selector::parse(
                ".job-search-card__location, .base-search-card__metadata span",
            )
            .ok()?,
        })
    }
}

/// Pull job cards out of a results page. Cards without a job link are
/// skipped, job ids are unique, and at most `limit` jobs come back.
/// `fallback_location` fills cards that carry no location of their own.
pub fn parse_job_cards(html: &str, fallback_location: &str, limit: usize) -> Vec<ScrapedJob> {
    let Some(selectors) = CardSelectors::new() else {
        warn!("Job card selectors failed to parse");
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut jobs = Vec::new();

    for card in document.select(&selectors.card) {
        if jobs.len() >= limit {
            break;
        }

        let Some(href) = card
            .select(&selectors.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| unescape_entities(href.trim()))
            .filter(|href| !href.is_empty())
        else {
            continue;
        };

        let url = if href.starts_with('/') {
            format!("{}{}", LINKEDIN_ORIGIN, href)
        } else {
            href
        };

        let job_id = JOB_VIEW_ID
            .captures(&url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| url.clone());

        if !seen.insert(job_id.clone()) {
            debug!("Skipping duplicate job card {}", job_id);
            continue;
        }

        let title = first_text(card, &selectors.title);
        let location = first_text(card, &selectors.location);

        jobs.push(ScrapedJob {
            job_id,
            title: if title.is_empty() {
                UNTITLED.to_string()
            } else {
                title
            },
            company: first_text(card, &selectors.company),
            location: if location.is_empty() {
                fallback_location.to_string()
            } else {
                location
            },
            url,
            via: VIA.to_string(),
        });
    }

    jobs
}

fn first_text(card: ElementRef<'_>, selector: &Selector) -> String {
    card.select(selector)
        .next()
        .map(|element| clean_text(&element.text().collect::<Vec<_>>().join(" ")))
        .unwrap_or_default()
}

fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode character references left in an href.
///
/// `scraper` already decodes attribute values once, so this is a second pass
/// for hrefs the board escapes twice (`&amp;amp;`). Numeric references are
/// decoded with or without the closing `;`. Named references cover the common
/// set in `NAMED_ENTITIES`, not the full HTML5 table.
pub fn unescape_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start + 1..];

        match decode_reference(candidate) {
            Some((decoded, consumed)) => {
                out.push(decoded);
                rest = &candidate[consumed..];
            }
            None => {
                out.push('&');
                rest = candidate;
            }
        }
    }

    out.push_str(rest);
    out
}

const NAMED_ENTITIES: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
    ("ndash", '\u{2013}'),
    ("mdash", '\u{2014}'),
    ("hellip", '\u{2026}'),
    ("copy", '\u{a9}'),
    ("reg", '\u{ae}'),
];

// Names HTML also accepts without the trailing `;`
const LEGACY_NAMES: &[&str] = &["amp", "lt", "gt", "quot", "nbsp", "copy", "reg"];

/// Decoded char and the number of bytes consumed after the `&`
fn decode_reference(candidate: &str) -> Option<(char, usize)> {
    if let Some(number) = candidate.strip_prefix('#') {
        let (radix, digits_start) = match number.chars().next() {
            Some('x' | 'X') => (16, 2),
            _ => (10, 1),
        };
        let digits: String = candidate[digits_start..]
            .chars()
            .take_while(|c| c.is_digit(radix))
            .collect();
        if digits.is_empty() {
            return None;
        }

        let code = u32::from_str_radix(&digits, radix).ok();
        let decoded = code
            .filter(|code| *code != 0)
            .and_then(char::from_u32)
            .unwrap_or('\u{fffd}');
        let mut consumed = digits_start + digits.len();
        if candidate[consumed..].starts_with(';') {
            consumed += 1;
        }
        return Some((decoded, consumed));
    }

    let name_len = candidate
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(candidate.len());
    let name = &candidate[..name_len];

    if candidate[name_len..].starts_with(';') {
        if let Some(decoded) = named_entity(name) {
            return Some((decoded, name_len + 1));
        }
    }

    // `&ampx` decodes as `&` followed by `x`
    LEGACY_NAMES
        .iter()
        .filter(|legacy| name.starts_with(*legacy))
        .max_by_key(|legacy| legacy.len())
        .and_then(|legacy| named_entity(legacy).map(|decoded| (decoded, legacy.len())))
}

fn named_entity(name: &str) -> Option<char> {
    NAMED_ENTITIES
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, decoded)| *decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;

    const RESULTS_PAGE: &str = r#"
        <ul class="jobs-search__results-list">
          <li>
            <div class="base-card">
              <a class="base-card__full-link" href="/jobs/view/3812345678/?refId=abc&amp;trackingId=xyz">
                <span class="sr-only">Senior Software Engineer</span>
              </a>
              <h3 class="base-search-card__title">
                Senior Software Engineer
              </h3>
              <h4 class="base-search-card__subtitle"><a>Acme   Corp</a></h4>
              <div class="base-search-card__metadata">
                <span class="job-search-card__location">Pune, Maharashtra, India</span>
              </div>
            </div>
          </li>
          <li>
            <a href="https://in.linkedin.com/jobs/view/3899999999/?position=2&amp;pageNum=0">x</a>
            <h3>Backend Developer</h3>
            <h4>Initech</h4>
          </li>
          <li>
            <p>Promoted content without a job link</p>
          </li>
          <li>
            <a href="/jobs/view/3812345678/?refId=dup">dup</a>
            <h3>Senior Software Engineer (repost)</h3>
          </li>
          <li>
            <a href="/jobs/view/3777777777/">z</a>
            <h3>Platform Engineer</h3>
            <h4>Globex</h4>
            <div class="base-search-card__metadata"><span>Remote</span></div>
          </li>
        </ul>
    "#;

    #[test]
    fn parses_cards_with_fallbacks_and_dedup() {
        let jobs = parse_job_cards(RESULTS_PAGE, "Pune", 10);
        assert_eq!(jobs.len(), 3);

        assert_eq!(jobs[0].job_id, "3812345678");
        assert_eq!(jobs[0].title, "Senior Software Engineer");
        assert_eq!(jobs[0].company, "Acme Corp");
        assert_eq!(jobs[0].location, "Pune, Maharashtra, India");
        assert_eq!(
            jobs[0].url,
            "https://www.linkedin.com/jobs/view/3812345678/?refId=abc&trackingId=xyz"
        );
        assert_eq!(jobs[0].via, "linkedin");

        assert_eq!(jobs[1].job_id, "3899999999");
        assert_eq!(jobs[1].location, "Pune");
        assert!(jobs[1].url.starts_with("https://in.linkedin.com/"));
        assert!(jobs[1].url.ends_with("position=2&pageNum=0"));

        assert_eq!(jobs[2].job_id, "3777777777");
        assert_eq!(jobs[2].location, "Remote");
    }

    #[test]
    fn respects_limit() {
        let jobs = parse_job_cards(RESULTS_PAGE, "Pune", 1);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].job_id, "3812345678");
    }

    #[test]
    fn url_without_numeric_id_becomes_the_id() {
        let html = r#"<ul><li><a href="/jobs/view/some-slug/">x</a></li></ul>"#;
        let jobs = parse_job_cards(html, "India", 10);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].job_id, "https://www.linkedin.com/jobs/view/some-slug/");
        assert_eq!(jobs[0].url, jobs[0].job_id);
        assert_eq!(jobs[0].title, "Untitled");
        assert_eq!(jobs[0].company, "");
    }

    #[test]
    fn empty_page_yields_no_jobs() {
        assert!(parse_job_cards("<html><body></body></html>", "India", 10).is_empty());
    }

    #[test]
    fn unescapes_named_and_numeric_entities() {
        assert_eq!(unescape_entities("a&amp;b&#38;c&#x26;d"), "a&b&c&d");
        assert_eq!(unescape_entities("&lt;tag&gt; &quot;x&quot;"), "<tag> \"x\"");
        assert_eq!(unescape_entities("AT&T; fish & chips"), "AT&T; fish & chips");
        assert_eq!(unescape_entities("trailing &"), "trailing &");
        assert_eq!(unescape_entities("&unknown; &#;"), "&unknown; &#;");
    }

    #[test]
    fn unescapes_nbsp_and_unterminated_numeric_references() {
        assert_eq!(unescape_entities("Data&nbsp;Engineer"), "Data\u{a0}Engineer");
        assert_eq!(unescape_entities("O&#39Reilly &#x27;s"), "O'Reilly 's");
        assert_eq!(unescape_entities("a&ampb"), "a&b");
        assert_eq!(unescape_entities("&#0;"), "\u{fffd}");
        assert_eq!(
            unescape_entities("/jobs/view/1/?a=1&amp;amp;b=2"),
            "/jobs/view/1/?a=1&amp;b=2"
        );
    }

    fn client_for(base_url: String) -> LinkedInClient {
        LinkedInClient::new(&JobBoardConfig {
            search_url: format!("{}/jobs-guest/search", base_url),
            timeout_seconds: 5,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn search_sends_query_and_cookie() {
        let (url, server) = serve_once("200 OK", "text/html", RESULTS_PAGE.to_string()).await;
        let client = client_for(url);

        let jobs = client
            .search("Senior Software Engineer", "Pune", Some("secret123"), 2)
            .await
            .unwrap();
        assert_eq!(jobs.len(), 2);

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with(
            "get /jobs-guest/search?keywords=senior+software+engineer&location=pune&start=0 "
        ));
        assert!(request.contains("cookie: li_at=secret123"));
        assert!(request.contains("accept-language: en-us,en;q=0.9"));
        assert!(request.contains("user-agent: mozilla/5.0"));
    }

    #[tokio::test]
    async fn search_without_cookie_sends_no_cookie_header() {
        let (url, server) = serve_once("200 OK", "text/html", "<ul></ul>".to_string()).await;
        let jobs = client_for(url).search("Dev", "India", None, 10).await.unwrap();
        assert!(jobs.is_empty());

        let request = server.await.unwrap().to_lowercase();
        assert!(!request.contains("cookie:"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (url, server) = serve_once("503 Service Unavailable", "text/plain", "busy".to_string()).await;
        let err = client_for(url)
            .search("Dev", "India", None, 10)
            .await
            .unwrap_err();

        assert!(matches!(err, JobBoardError::Status(s) if s == StatusCode::SERVICE_UNAVAILABLE));
        server.await.unwrap();
    }
}
