use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::config::Config;
use crate::models::Article;

// ── Constants ────────────────────────────────────────────────────────────────

pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/215x134";
pub const DEFAULT_TITLE: &str = "Article sans titre";
pub const DEFAULT_ALT: &str = "Image article";
pub const ERROR_TITLE: &str = "Erreur de scraping";
pub const ERROR_ALT: &str = "Image non disponible";

const ALT_FROM_TITLE_CHARS: usize = 100;
const ABO_MARKER: &str = " [ABO]";

// ── Lazy statics ─────────────────────────────────────────────────────────────

static SITE_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*[-–|]\s*TourMaG\.com.*$").unwrap());

static ABO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*\[ABO\]\s*$").unwrap());

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static OG_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:title"]"#).unwrap());
static TWITTER_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="twitter:title"]"#).unwrap());
static OG_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:image"]"#).unwrap());
static TWITTER_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="twitter:image"]"#).unwrap());
static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static ARTICLE_IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("article img").unwrap());
static IMG_WITH_ALT: Lazy<Selector> = Lazy::new(|| Selector::parse("img[alt]").unwrap());
static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").unwrap());
static CHAPO: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".chapeau h3.access, .chapeau .access, div.chapeau h3").unwrap()
});

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Request failed with status code {0}")]
    Status(u16),
    #[error("timeout of {0}ms exceeded")]
    Timeout(u128),
    #[error("{0}")]
    Request(String),
}

// ── Scraper ──────────────────────────────────────────────────────────────────

/// Fetches pages and turns them into [`Article`]s. Cheap to clone.
#[derive(Clone)]
pub struct Scraper {
    client: reqwest::Client,
    timeout: Duration,
}

impl Scraper {
    pub fn new(config: &Config) -> reqwest::Result<Self> {
        Ok(Self {
            client: config.http_client()?,
            timeout: config.fetch_timeout,
        })
    }

    /// Never fails: fetch or parse errors become a `success: false` article.
    pub async fn scrape_article(&self, url: &str) -> Article {
        match self.try_scrape(url).await {
            Ok(article) => article,
            Err(e) => {
                tracing::warn!(url, error = %e, "error scraping article");
                failed_article(url, e.to_string())
            }
        }
    }

    async fn try_scrape(&self, url: &str) -> Result<Article, FetchError> {
        let page = Url::parse(url)?;
        let html = self.fetch_html(&page).await?;
        Ok(extract_from_html(&html, url, &page))
    }

    async fn fetch_html(&self, page: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(page.clone())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.text().await.map_err(|e| self.classify(e))
    }

    fn classify(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout.as_millis())
        } else {
            FetchError::Request(e.to_string())
        }
    }
}

pub fn failed_article(url: &str, error: String) -> Article {
    Article {
        url: url.to_string(),
        title: ERROR_TITLE.to_string(),
        image: PLACEHOLDER_IMAGE.to_string(),
        alt: ERROR_ALT.to_string(),
        chapo: None,
        success: false,
        error: Some(error),
    }
}

// ── Extraction pipeline ──────────────────────────────────────────────────────

/// `url` is echoed verbatim; `page` is its parsed form, used for the origin.
pub fn extract_from_html(html: &str, url: &str, page: &Url) -> Article {
    let document = Html::parse_document(html);

    let title = find_title(&document)
        .map(|t| clean_title(&t))
        .unwrap_or_default();

    let raw_image = find_image(&document);

    // Lookup uses the value as found in the page, not the absolute form.
    let mut alt = raw_image
        .as_deref()
        .and_then(|src| alt_for_src(&document, src))
        .unwrap_or_default();
    if alt.is_empty() && !title.is_empty() {
        alt = title.chars().take(ALT_FROM_TITLE_CHARS).collect();
    }

    let image = raw_image.map(|src| absolutize_image(&src, page));

    let chapo = document
        .select(&CHAPO)
        .next()
        .map(|el| finish_chapo(el.text().collect::<String>().trim()))
        .unwrap_or_default();

    tracing::debug!(url, %title, image = image.as_deref().unwrap_or(""), "extracted article");

    Article {
        url: url.to_string(),
        title: non_empty_or(title, DEFAULT_TITLE),
        image: image.unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
        alt: non_empty_or(alt, DEFAULT_ALT),
        chapo: Some(chapo),
        success: true,
        error: None,
    }
}

// ── Fallback chains ──────────────────────────────────────────────────────────

fn find_title(document: &Html) -> Option<String> {
    meta_content(document, &OG_TITLE)
        .or_else(|| meta_content(document, &TWITTER_TITLE))
        .or_else(|| {
            document
                .select(&H1)
                .next()
                .map(trimmed_text)
                .filter(|s| !s.is_empty())
        })
        .or_else(|| {
            let text: String = document.select(&TITLE).flat_map(|el| el.text()).collect();
            Some(text.trim().to_string()).filter(|s| !s.is_empty())
        })
}

fn find_image(document: &Html) -> Option<String> {
    meta_content(document, &OG_IMAGE)
        .or_else(|| meta_content(document, &TWITTER_IMAGE))
        .or_else(|| {
            document
                .select(&ARTICLE_IMG)
                .next()
                .and_then(|el| non_empty_attr(el, "src"))
        })
        .or_else(|| {
            document
                .select(&IMG_WITH_ALT)
                .find(|el| el.value().attr("alt").is_some_and(|a| !a.is_empty()))
                .and_then(|el| non_empty_attr(el, "src"))
        })
}

fn alt_for_src(document: &Html, src: &str) -> Option<String> {
    document
        .select(&IMG)
        .find(|el| el.value().attr("src") == Some(src))
        .and_then(|el| non_empty_attr(el, "alt"))
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .and_then(|el| non_empty_attr(el, "content"))
}

// ── String cleanup ───────────────────────────────────────────────────────────

/// Strip the site-name suffix, normalise a trailing `[ABO]` marker and
/// collapse whitespace.
pub fn clean_title(raw: &str) -> String {
    let title = SITE_SUFFIX_RE.replace(raw, "");
    let title = ABO_RE.replace(&title, ABO_MARKER);
    let title = WHITESPACE_RE.replace_all(&title, " ");
    title.trim().to_string()
}

/// Join a non-`http` image reference onto the page origin.
pub fn absolutize_image(image: &str, page: &Url) -> String {
    if image.starts_with("http") {
        return image.to_string();
    }
    let origin = page.origin().ascii_serialization();
    let sep = if image.starts_with('/') { "" } else { "/" };
    format!("{origin}{sep}{image}")
}

pub fn finish_chapo(text: &str) -> String {
    if text.is_empty() || text.ends_with("...") || text.ends_with('…') {
        return text.to_string();
    }
    format!("{text}...")
}

// ── DOM utility helpers ──────────────────────────────────────────────────────

fn trimmed_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn non_empty_attr(el: ElementRef<'_>, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn non_empty_or(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}
