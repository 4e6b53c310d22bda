// src/fetch.rs
//! Production `PageFetcher`: renders a listings page through a browserless
//! `/content` endpoint and pulls the ad cards out of the HTML. Extraction is
//! deliberately best-effort; the engine is written against the trait and the
//! selectors here mirror the markup OLX currently ships.

use once_cell::sync::OnceCell;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;

use crate::scan::types::{FetchError, PageFetcher, RawItem, TrackedSource};

pub struct BrowserlessFetcher {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessFetcher {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    /// Reads BROWSERLESS_URL (default local instance) and BROWSERLESS_TOKEN.
    pub fn from_env() -> Self {
        let base = std::env::var("BROWSERLESS_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());
        let token = std::env::var("BROWSERLESS_TOKEN").ok();
        Self::new(&base, token.as_deref())
    }

    async fn content(&self, url: &str) -> Result<String, FetchError> {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(token) = &self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        let body = serde_json::json!({
            "url": url,
            // Let lazy-loaded cards render before the HTML snapshot.
            "gotoOptions": { "waitUntil": "networkidle2" },
        });

        let resp = self
            .client
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Other(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Other(format!("browserless status {status}")));
        }
        resp.text()
            .await
            .map_err(|e| FetchError::Other(e.to_string()))
    }
}

#[async_trait::async_trait]
impl PageFetcher for BrowserlessFetcher {
    async fn fetch(
        &self,
        source: &TrackedSource,
        max_items: usize,
    ) -> Result<Vec<RawItem>, FetchError> {
        let html = self.content(&source.url).await?;
        Ok(extract_items(&html, max_items))
    }
}

fn re_card() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r#"data-cy="l-card""#).unwrap())
}

fn re_href() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r#"href="([^"]+)""#).unwrap())
}

fn re_title() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r#"<h[46][^>]*>\s*([^<]+?)\s*</h[46]>"#).unwrap())
}

fn re_title_alt() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r#"data-cy="ad-card-title"[^>]*>\s*([^<]+?)\s*<"#).unwrap())
}

fn re_price() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r#"data-testid="ad-price"[^>]*>\s*([^<]+?)\s*<"#).unwrap())
}

fn re_image() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r#"<img[^>]+src="(http[^"]+)""#).unwrap())
}

fn re_location_date() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r#"data-testid="location-date"[^>]*>\s*([^<]+?)\s*<"#).unwrap())
}

/// Slice the page into ad cards and pull id/title/price/location/date out of
/// each. Cards appear in the page's newest-first order and are kept that way.
pub fn extract_items(html: &str, max_items: usize) -> Vec<RawItem> {
    let starts: Vec<usize> = re_card().find_iter(html).map(|m| m.start()).collect();
    let mut out = Vec::new();

    for (i, &start) in starts.iter().enumerate() {
        if out.len() >= max_items {
            break;
        }
        let end = starts.get(i + 1).copied().unwrap_or(html.len());
        let card = &html[start..end];

        let Some(href) = capture(re_href(), card) else {
            continue;
        };
        let id = canonical_url(&href);
        if !id.contains("olx.pl") {
            continue;
        }

        let title = capture(re_title(), card)
            .or_else(|| capture(re_title_alt(), card))
            .unwrap_or_else(|| "Untitled".to_string());
        let price = capture(re_price(), card);
        let image_url = capture(re_image(), card);

        // "Wrocław, Fabryczna - dzisiaj o 14:30" style footer.
        let (location, posted_at) = match capture(re_location_date(), card) {
            Some(loc_date) => match loc_date.rsplit_once(" - ") {
                Some((loc, date)) => (Some(loc.trim().to_string()), date.trim().to_string()),
                None => (None, loc_date),
            },
            None => (None, String::new()),
        };

        out.push(RawItem {
            id,
            title,
            posted_at,
            price,
            location,
            image_url,
        });
    }
    out
}

fn capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn canonical_url(href: &str) -> String {
    let href = href.replace("m.olx.pl", "www.olx.pl");
    if href.starts_with('/') {
        format!("https://www.olx.pl{href}")
    } else {
        href
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD: &str = r#"
        <div data-cy="l-card" id="100">
          <a href="/d/oferta/rower-gorski-ID1.html"><h6>Rower górski</h6></a>
          <p data-testid="ad-price">450 zł</p>
          <img src="https://img.olx.pl/1.jpg">
          <p data-testid="location-date">Wrocław, Fabryczna - dzisiaj o 14:30</p>
        </div>
        <div data-cy="l-card" id="101">
          <a href="https://m.olx.pl/d/oferta/lampa-ID2.html"><h6>Lampa</h6></a>
          <p data-testid="location-date">Kraków - 5 minut temu</p>
        </div>
    "#;

    #[test]
    fn extracts_cards_in_page_order() {
        let items = extract_items(CARD, 10);
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].id, "https://www.olx.pl/d/oferta/rower-gorski-ID1.html");
        assert_eq!(items[0].title, "Rower górski");
        assert_eq!(items[0].price.as_deref(), Some("450 zł"));
        assert_eq!(items[0].location.as_deref(), Some("Wrocław, Fabryczna"));
        assert_eq!(items[0].posted_at, "dzisiaj o 14:30");
        assert_eq!(items[0].image_url.as_deref(), Some("https://img.olx.pl/1.jpg"));

        // Mobile domain is canonicalized; missing fields stay None.
        assert_eq!(items[1].id, "https://www.olx.pl/d/oferta/lampa-ID2.html");
        assert_eq!(items[1].posted_at, "5 minut temu");
        assert!(items[1].price.is_none());
        assert!(items[1].image_url.is_none());
    }

    #[test]
    fn respects_the_depth_cap() {
        let items = extract_items(CARD, 1);
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn no_cards_yields_empty() {
        assert!(extract_items("<html><body>bot check</body></html>", 10).is_empty());
    }
}
