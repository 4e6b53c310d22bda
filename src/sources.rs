// src/sources.rs
//! Tracked-source list, read from disk at the start of every cycle so that
//! admin edits (add/remove a URL) take effect on the next cycle without a
//! restart. Supports TOML or JSON.

use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::scan::types::TrackedSource;

pub const ENV_PATH: &str = "WATCHER_SOURCES_PATH";

/// Load tracked sources from an explicit path. Format by extension, with a
/// content-sniffing fallback.
pub fn load_sources_from(path: &Path) -> Result<Vec<TrackedSource>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading tracked sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
}

/// Load tracked sources using env var + fallbacks:
/// 1) $WATCHER_SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
pub fn load_sources_default() -> Result<Vec<TrackedSource>> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        }
        return Err(anyhow!("WATCHER_SOURCES_PATH points to non-existent path"));
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_sources_from(&json_p);
    }
    Ok(Vec::new())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<TrackedSource>> {
    let try_toml = hint_ext == "toml" || s.contains("[[sources]]");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported tracked-sources format"))
}

fn parse_toml(s: &str) -> Result<Vec<TrackedSource>> {
    #[derive(serde::Deserialize)]
    struct SourcesFile {
        sources: Vec<TrackedSource>,
    }
    let v: SourcesFile = toml::from_str(s)?;
    Ok(clean_list(v.sources))
}

fn parse_json(s: &str) -> Result<Vec<TrackedSource>> {
    let v: Vec<TrackedSource> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

/// Trim, drop empties, dedup by URL. File order is preserved because it is
/// also the delivery order across sources.
fn clean_list(items: Vec<TrackedSource>) -> Vec<TrackedSource> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for mut it in items {
        it.url = it.url.trim().to_string();
        it.hashtag = it.hashtag.trim().to_string();
        if it.url.is_empty() {
            continue;
        }
        if seen.insert(it.url.clone()) {
            out.push(it);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_formats_parse_and_dedup_by_url() {
        let toml = r##"
            [[sources]]
            url = " https://www.olx.pl/rowery/ "
            hashtag = "#rowery"

            [[sources]]
            url = "https://www.olx.pl/rowery/"
            hashtag = "#dup"

            [[sources]]
            url = ""
        "##;
        let out = parse_toml(toml).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "https://www.olx.pl/rowery/");
        assert_eq!(out[0].hashtag, "#rowery");

        let json = r##"[
            {"url": "https://www.olx.pl/meble/", "hashtag": "#meble"},
            {"url": "https://www.olx.pl/rtv/"}
        ]"##;
        let out = parse_json(json).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].hashtag, "");
    }

    #[test]
    fn file_order_is_preserved() {
        let json = r##"[
            {"url": "https://a.example", "hashtag": "#a"},
            {"url": "https://b.example", "hashtag": "#b"},
            {"url": "https://c.example", "hashtag": "#c"}
        ]"##;
        let out = parse_json(json).unwrap();
        let urls: Vec<_> = out.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.example", "https://b.example", "https://c.example"]);
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = std::env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        std::env::set_current_dir(tmp.path()).unwrap();

        std::env::remove_var(ENV_PATH);

        // No files in the temp CWD: empty list, not an error.
        let v = load_sources_default().unwrap();
        assert!(v.is_empty());

        // Env path wins over fallbacks.
        let p_json = tmp.path().join("sources.json");
        std::fs::write(&p_json, r##"[{"url": "https://x.example", "hashtag": "#x"}]"##).unwrap();
        std::env::set_var(ENV_PATH, p_json.display().to_string());
        let v2 = load_sources_default().unwrap();
        assert_eq!(v2.len(), 1);
        assert_eq!(v2[0].url, "https://x.example");
        std::env::remove_var(ENV_PATH);

        std::env::set_current_dir(&old).unwrap();
    }
}
