//! Album cover lookup via MusicBrainz and the Cover Art Archive.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use simplplayr_types::UNKNOWN;

const DEFAULT_BASE_URL: &str = "https://musicbrainz.org/ws/2";
const COVER_ART_BASE_URL: &str = "https://coverartarchive.org/release";
const RELEASE_LIMIT: usize = 5;
const MIN_MATCH_SCORE: i32 = 90;

/// Resolves an (artist, album) pair to candidate cover image URLs.
pub trait CoverArtFinder: Send + Sync {
    fn find_cover_art(&self, artist: &str, album: &str) -> Result<Option<Vec<String>>>;
}

/// Used when cover lookups are switched off.
pub struct NoCoverArt;

impl CoverArtFinder for NoCoverArt {
    fn find_cover_art(&self, _artist: &str, _album: &str) -> Result<Option<Vec<String>>> {
        Ok(None)
    }
}

pub struct MusicBrainzCoverArt {
    base_url: String,
    agent: ureq::Agent,
}

impl MusicBrainzCoverArt {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        let user_agent = format!(
            "simplplayr/{} (local music library)",
            env!("CARGO_PKG_VERSION")
        );
        let config = ureq::Agent::config_builder().user_agent(&user_agent).build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::Agent::new_with_config(config),
        }
    }

    fn call_request(
        &self,
        request: ureq::RequestBuilder<ureq::typestate::WithoutBody>,
        url: &str,
    ) -> Result<ureq::http::Response<ureq::Body>> {
        let resp = match request.config().http_status_as_error(false).build().call() {
            Ok(resp) => resp,
            Err(err) => bail!("musicbrainz request failed (transport) url={url}: {err}"),
        };
        let code = resp.status();
        if code.as_u16() >= 400 {
            let body = resp
                .into_body()
                .with_config()
                .limit(200_000)
                .read_to_string()
                .unwrap_or_default();
            let snippet: String = body.trim().chars().take(300).collect();
            if snippet.is_empty() {
                bail!("musicbrainz request failed (status {code}) url={url}");
            }
            bail!("musicbrainz request failed (status {code}) url={url}: {snippet}");
        }
        Ok(resp)
    }
}

impl Default for MusicBrainzCoverArt {
    fn default() -> Self {
        Self::new()
    }
}

impl CoverArtFinder for MusicBrainzCoverArt {
    fn find_cover_art(&self, artist: &str, album: &str) -> Result<Option<Vec<String>>> {
        if !is_known(artist) || !is_known(album) {
            return Ok(None);
        }
        let url = format!("{}/release/", self.base_url);
        let query = build_release_query(album, artist);
        tracing::debug!(%query, "musicbrainz release search");
        let resp = self.call_request(
            self.agent
                .get(&url)
                .query("fmt", "json")
                .query("query", &query)
                .query("limit", RELEASE_LIMIT.to_string()),
            &url,
        )?;
        let body = resp
            .into_body()
            .with_config()
            .limit(1_000_000)
            .read_to_string()
            .context("musicbrainz response read failed")?;
        let urls = parse_release_urls(&body)?;
        tracing::info!(
            artist,
            album,
            matches = urls.as_ref().map_or(0, Vec::len),
            "cover art lookup finished"
        );
        Ok(urls)
    }
}

#[derive(Debug, Deserialize)]
struct ReleaseSearchResponse {
    #[serde(default)]
    releases: Vec<ReleaseResult>,
}

#[derive(Debug, Deserialize)]
struct ReleaseResult {
    id: String,
    score: Option<i32>,
}

/// Front cover URLs for every release scoring at least [`MIN_MATCH_SCORE`].
fn parse_release_urls(body: &str) -> Result<Option<Vec<String>>> {
    let body: ReleaseSearchResponse =
        serde_json::from_str(body).context("musicbrainz response parse failed")?;
    let urls: Vec<String> = body
        .releases
        .into_iter()
        .filter(|release| release.score.unwrap_or(0) >= MIN_MATCH_SCORE)
        .map(|release| front_cover_url(&release.id))
        .collect();
    Ok((!urls.is_empty()).then_some(urls))
}

fn front_cover_url(mbid: &str) -> String {
    format!("{COVER_ART_BASE_URL}/{mbid}/front")
}

fn is_known(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != UNKNOWN
}

fn build_release_query(album: &str, artist: &str) -> String {
    format!(
        "release:\"{}\" AND artist:\"{}\"",
        escape_query(album),
        escape_query(artist)
    )
}

fn escape_query(raw: &str) -> String {
    raw.replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_release_query_escapes_quotes() {
        let query = build_release_query("The \"Best\"", "Artist");
        assert_eq!(query, "release:\"The \\\"Best\\\"\" AND artist:\"Artist\"");
    }

    #[test]
    fn parse_keeps_high_scoring_releases_in_order() {
        let body = r#"{
            "count": 3,
            "releases": [
                {"id": "aaa", "score": 100, "title": "Jazz"},
                {"id": "bbb", "score": 42, "title": "Jazz (Live)"},
                {"id": "ccc", "score": 90, "title": "Jazz"}
            ]
        }"#;
        let urls = parse_release_urls(body).unwrap().unwrap();
        assert_eq!(
            urls,
            vec![
                "https://coverartarchive.org/release/aaa/front",
                "https://coverartarchive.org/release/ccc/front",
            ]
        );
    }

    #[test]
    fn parse_without_matches_is_none() {
        assert_eq!(parse_release_urls(r#"{"releases": []}"#).unwrap(), None);
        assert_eq!(
            parse_release_urls(r#"{"releases": [{"id": "x", "score": 10}]}"#).unwrap(),
            None
        );
        assert_eq!(parse_release_urls("{}").unwrap(), None);
    }

    #[test]
    fn parse_rejects_malformed_body() {
        assert!(parse_release_urls("<html>").is_err());
    }

    #[test]
    fn unknown_tags_skip_the_request() {
        // Unroutable base URL: any request would fail.
        let finder = MusicBrainzCoverArt::with_base_url("http://127.0.0.1:9");
        assert_eq!(finder.find_cover_art("Unknown", "Jazz").unwrap(), None);
        assert_eq!(finder.find_cover_art("Queen", "  ").unwrap(), None);
    }

    #[test]
    fn disabled_finder_returns_none() {
        assert_eq!(NoCoverArt.find_cover_art("Queen", "Jazz").unwrap(), None);
    }

    #[test]
    #[ignore]
    fn live_cover_art_lookup() {
        let urls = MusicBrainzCoverArt::new()
            .find_cover_art("Red Hot Chili Peppers", "The Getaway")
            .expect("cover art lookup")
            .expect("expected matches");
        assert!(urls.iter().all(|url| url.ends_with("/front")));
    }
}
