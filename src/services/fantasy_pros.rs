//! Start/sit comparisons scraped from FantasyPros' head-to-head pages.

use anyhow::{anyhow, Result};
use reqwest::Client;
use scraper::{Html, Selector};

use crate::utils::parse_percentage;

/// Share of experts who would start each player.
#[derive(Debug, Clone, PartialEq)]
pub struct StartSitAdvice {
    pub player_pct: f64,
    pub candidate_pct: f64,
    pub url: String,
}

/// URL slug for a player name: "Odell Beckham Jr." → "odell-beckham".
pub fn slugify(name: &str) -> String {
    name.to_lowercase().replace(" jr.", "").replace(' ', "-").replace('.', "")
}

pub fn comparison_url(base_url: &str, candidate: &str, player: &str) -> String {
    format!("{}/{}-{}.php", base_url.trim_end_matches('/'), slugify(candidate), slugify(player))
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Failed to create selector '{}': {}", css, e))
}

/// Pull the two start percentages out of a comparison page.
///
/// `span.more` carries the recommended player's share and `span.same` the other's;
/// the first player photo's alt text names the recommended player, matched back to
/// whichever input name it most resembles. Returns `None` when any piece is missing.
pub fn parse_comparison(html: &str, candidate: &str, player: &str, url: &str) -> Result<Option<StartSitAdvice>> {
    let document = Html::parse_document(html);
    let more = selector("span.more")?;
    let same = selector("span.same")?;
    let photo = selector("div.player-photo img")?;

    let recommended_pct = document.select(&more).next().map(|e| e.text().collect::<String>());
    let other_pct = document.select(&same).next().map(|e| e.text().collect::<String>());
    let recommended_name = document
        .select(&photo)
        .next()
        .and_then(|img| img.value().attr("alt"))
        .map(str::to_string);

    let (Some(recommended_pct), Some(other_pct), Some(recommended_name)) = (recommended_pct, other_pct, recommended_name)
    else {
        return Ok(None);
    };

    let (Some(recommended_pct), Some(other_pct)) = (parse_percentage(&recommended_pct), parse_percentage(&other_pct))
    else {
        tracing::warn!("Unparseable start percentages at {}", url);
        return Ok(None);
    };

    let candidate_similarity = strsim::normalized_levenshtein(&recommended_name, candidate);
    let player_similarity = strsim::normalized_levenshtein(&recommended_name, player);

    let (candidate_pct, player_pct) = if candidate_similarity > player_similarity {
        (recommended_pct, other_pct)
    } else {
        (other_pct, recommended_pct)
    };

    Ok(Some(StartSitAdvice {
        player_pct,
        candidate_pct,
        url: url.to_string(),
    }))
}

pub struct FantasyProsClient {
    client: Client,
    base_url: String,
}

impl FantasyProsClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("FantasyPros error {}: {}", status, body));
        }
        Ok(resp.text().await?)
    }

    /// Expert start/sit split for `candidate` vs `player`; `None` when the page
    /// can't be fetched or read.
    pub async fn compare(&self, candidate: &str, player: &str) -> Option<StartSitAdvice> {
        let url = comparison_url(&self.base_url, candidate, player);
        tracing::info!("Fetching start/sit comparison {} vs {}…", candidate, player);

        let html = match self.fetch_page(&url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Start/sit fetch failed for {}: {}", url, e);
                return None;
            }
        };

        match parse_comparison(&html, candidate, player, &url) {
            Ok(advice) => advice,
            Err(e) => {
                tracing::warn!("Start/sit parse failed for {}: {}", url, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="player-photo"><img alt="Gus Edwards" src="x.png"></div>
          <div class="player-photo"><img alt="Ezekiel Elliott" src="y.png"></div>
          <span class="more">76%</span>
          <span class="same">24%</span>
        </body></html>
    "#;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Odell Beckham Jr."), "odell-beckham");
        assert_eq!(slugify("D.K. Metcalf"), "dk-metcalf");
        assert_eq!(slugify("Josh Allen"), "josh-allen");
    }

    #[test]
    fn test_comparison_url() {
        assert_eq!(
            comparison_url("https://www.fantasypros.com/nfl/start/", "Gus Edwards", "Ezekiel Elliott"),
            "https://www.fantasypros.com/nfl/start/gus-edwards-ezekiel-elliott.php"
        );
    }

    #[test]
    fn test_recommended_candidate() {
        let advice = parse_comparison(PAGE, "Gus Edwards", "Ezekiel Elliott", "u").unwrap().unwrap();
        assert_eq!(advice.candidate_pct, 76.0);
        assert_eq!(advice.player_pct, 24.0);
        assert_eq!(advice.url, "u");
    }

    #[test]
    fn test_recommended_incumbent() {
        let advice = parse_comparison(PAGE, "Zeke Elliot", "Gus Edwards", "u").unwrap().unwrap();
        assert_eq!(advice.player_pct, 76.0);
        assert_eq!(advice.candidate_pct, 24.0);
    }

    #[test]
    fn test_missing_pieces_yield_none() {
        let html = r#"<html><body><span class="more">76%</span></body></html>"#;
        assert!(parse_comparison(html, "A", "B", "u").unwrap().is_none());

        let html = PAGE.replace("76%", "lots");
        assert!(parse_comparison(&html, "Gus Edwards", "Ezekiel Elliott", "u").unwrap().is_none());
    }
}
