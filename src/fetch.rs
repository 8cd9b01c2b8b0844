//! Secure acquisition of the provider tiles referenced by a query page.
//!
//! The query URL and every discovered tile URL go through the allow-list
//! gate independently; a failing tile is skipped and logged, a failing
//! query aborts the whole acquisition with an empty result.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::imageops::FilterType;
use owo_colors::OwoColorize;
use reqwest::blocking::Client;
use roxmltree::Document;

use crate::config::FetchConfig;
use crate::constants::{TILE_FETCH_RETRIES, USER_AGENT};
use crate::error::PipelineError;
use crate::extract::CoordExtractor;
use crate::manifest::{self, TileRecord};
use crate::progress::progress_bar;
use crate::safety::{sanitize_filename, validate_url};

pub struct TileFetcher<'a> {
    config: &'a FetchConfig,
    extractor: &'a dyn CoordExtractor,
}

impl<'a> TileFetcher<'a> {
    pub fn new(config: &'a FetchConfig, extractor: &'a dyn CoordExtractor) -> Self {
        Self { config, extractor }
    }

    /// Fetches the query page, downloads every referenced tile and writes
    /// the manifest. Returns `None` when the run produced no usable tile;
    /// an unsafe query URL is a precondition violation and propagates.
    pub fn fetch(&self, query_url: &str, subject: &str) -> Result<Option<PathBuf>> {
        validate_url(query_url, self.config.allowed_domains())?;
        let client = self.build_client()?;

        let html = match self.fetch_document(&client, query_url) {
            Ok(html) => html,
            Err(err) => {
                println!("{} Query fetch failed: {err}", "⚠".yellow().bold());
                return Ok(None);
            }
        };
        let sources = extract_image_sources(&html, self.config.tile_url_prefix());
        if sources.is_empty() {
            println!(
                "{} No tile images found in the query document",
                "⚠".yellow().bold()
            );
            return Ok(None);
        }

        let safe_subject = sanitize_filename(subject);
        let subject_dir = self.config.base_dir().join(&safe_subject);
        let tile_dir = subject_dir.join("pics_satellite");
        fs::create_dir_all(&tile_dir)
            .with_context(|| format!("Failed to create tile directory {}", tile_dir.display()))?;

        println!(
            "{} Discovered {} tile candidate(s)",
            "ℹ".blue().bold(),
            sources.len()
        );
        let pb = progress_bar(sources.len() as u64, "Fetching tiles");
        let mut records: Vec<TileRecord> = Vec::new();
        for source in &sources {
            // ids are assigned in document order, successes only
            let id = records.len() as u32;
            match self.acquire_tile(&client, source, &safe_subject, &tile_dir, id) {
                Ok(record) => records.push(record),
                Err(err) => {
                    pb.println(format!("  {} Skipping tile {source}: {err}", "⚠".yellow()));
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        if records.is_empty() {
            println!(
                "{} Every discovered tile failed; nothing to record",
                "⚠".yellow().bold()
            );
            return Ok(None);
        }
        let path = manifest::manifest_path(&subject_dir, &safe_subject);
        if let Err(err) = manifest::write_manifest(&path, &records) {
            println!("{} Manifest save failed: {err:#}", "⚠".yellow().bold());
            return Ok(None);
        }
        println!(
            "{} Acquired {} tile(s), manifest {}",
            "✔".green().bold(),
            records.len(),
            path.display()
        );
        Ok(Some(path))
    }

    fn build_client(&self) -> Result<Client> {
        Client::builder()
            .timeout(self.config.http_timeout())
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")
    }

    fn fetch_document(&self, client: &Client, url: &str) -> Result<String, PipelineError> {
        let response = client.get(url).send()?.error_for_status()?;
        Ok(response.text()?)
    }

    /// Downloads, normalizes and records one tile. Any failure is
    /// reported to the caller, which skips the tile and continues.
    fn acquire_tile(
        &self,
        client: &Client,
        source: &str,
        subject: &str,
        tile_dir: &Path,
        id: u32,
    ) -> Result<TileRecord, PipelineError> {
        validate_url(source, self.config.allowed_domains())?;
        // subject is already sanitized, the id suffix is ours
        let path = tile_dir.join(format!("{subject}-{id}.png"));
        self.download_tile(client, source, &path)?;
        self.normalize_tile(&path)?;
        let (x, y) = self.extractor.extract(source);
        Ok(TileRecord {
            id,
            subject: subject.to_string(),
            path_file: path.display().to_string(),
            url_pic: source.to_string(),
            x,
            y,
        })
    }

    fn download_tile(&self, client: &Client, url: &str, path: &Path) -> Result<(), PipelineError> {
        let mut attempt = 0;
        let bytes = loop {
            attempt += 1;
            let result = client
                .get(url)
                .send()
                .and_then(|response| response.error_for_status())
                .and_then(|response| response.bytes());
            match result {
                Ok(bytes) => break bytes,
                Err(err) if attempt <= TILE_FETCH_RETRIES => {
                    println!("  {} Retrying tile after: {err}", "↻".yellow());
                }
                Err(err) => return Err(PipelineError::Network(err)),
            }
        };
        fs::write(path, &bytes).map_err(|err| {
            PipelineError::Processing(format!("failed to write tile {}: {err}", path.display()))
        })
    }

    /// Decodes the downloaded file and rewrites it with its longest side
    /// scaled to the target size. An undecodable file is removed.
    fn normalize_tile(&self, path: &Path) -> Result<(), PipelineError> {
        let decoded = match image::open(path) {
            Ok(image) => image,
            Err(err) => {
                let _ = fs::remove_file(path);
                return Err(PipelineError::Decode(err));
            }
        };
        let target = self.config.target_tile_size();
        let resized = decoded.resize(target, target, FilterType::Lanczos3);
        resized.save(path).map_err(|err| {
            let _ = fs::remove_file(path);
            PipelineError::Decode(err)
        })
    }
}

/// Extracts `<img src="...">` values matching the tile prefix, in
/// document order. Well-formed documents go through roxmltree; provider
/// pages are rarely valid XML, so a tolerant scan is the fallback.
fn extract_image_sources(html: &str, prefix: &str) -> Vec<String> {
    let sources = match Document::parse(html) {
        Ok(doc) => doc
            .descendants()
            .filter(|node| node.is_element() && node.tag_name().name().eq_ignore_ascii_case("img"))
            .filter_map(|node| node.attribute("src"))
            .map(str::to_string)
            .collect(),
        Err(_) => scan_img_sources(html),
    };
    sources
        .into_iter()
        .filter(|source| source.starts_with(prefix))
        .collect()
}

/// Minimal tag-soup scan: every `<img ...>` tag with a quoted `src`
/// attribute.
fn scan_img_sources(html: &str) -> Vec<String> {
    let lower = html.to_ascii_lowercase();
    let mut out = Vec::new();
    let mut cursor = 0;
    while let Some(found) = lower[cursor..].find("<img") {
        let tag_start = cursor + found;
        let Some(offset) = lower[tag_start..].find('>') else {
            break;
        };
        let tag_end = tag_start + offset;
        let tag = &html[tag_start..tag_end];
        let tag_lower = &lower[tag_start..tag_end];
        if let Some(attr) = find_src_attr(tag_lower) {
            let rest = &tag[attr..];
            if let Some(quote @ ('"' | '\'')) = rest.chars().next() {
                if let Some(end) = rest[1..].find(quote) {
                    out.push(rest[1..1 + end].to_string());
                }
            }
        }
        cursor = tag_end + 1;
    }
    out
}

/// Locates the value offset of a `src` attribute on any whitespace
/// boundary, so `data-src=` and friends never match.
fn find_src_attr(tag: &str) -> Option<usize> {
    let bytes = tag.as_bytes();
    let mut from = 0;
    while let Some(found) = tag[from..].find("src=") {
        let idx = from + found;
        if idx > 0 && bytes[idx - 1].is_ascii_whitespace() {
            return Some(idx + 4);
        }
        from = idx + 4;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::FirstTwoIntegers;

    const PREFIX: &str = "https://mt.google.com/vt/lyrs=y";

    #[test]
    fn extracts_matching_sources_from_well_formed_markup() {
        let html = r#"<html><body>
            <img src="https://mt.google.com/vt/lyrs=y&amp;x=1&amp;y=2"/>
            <img src="https://cdn.example.com/logo.png"/>
            <img src="https://mt.google.com/vt/lyrs=y&amp;x=1&amp;y=3"/>
        </body></html>"#;
        let sources = extract_image_sources(html, PREFIX);
        assert_eq!(sources.len(), 2);
        assert!(sources.iter().all(|s| s.starts_with(PREFIX)));
    }

    #[test]
    fn falls_back_to_scanning_tag_soup() {
        let html = r#"<!DOCTYPE html><html><body>
            <p>unclosed paragraph
            <img alt=tile src="https://mt.google.com/vt/lyrs=y&x=5&y=9">
            <img src='https://mt.google.com/vt/lyrs=y&x=5&y=10'>
            <img src="https://elsewhere.example.com/pic.png">
        </body>"#;
        let sources = extract_image_sources(html, PREFIX);
        assert_eq!(
            sources,
            vec![
                "https://mt.google.com/vt/lyrs=y&x=5&y=9".to_string(),
                "https://mt.google.com/vt/lyrs=y&x=5&y=10".to_string(),
            ]
        );
    }

    #[test]
    fn scan_accepts_any_whitespace_before_src() {
        let html = "<body>\n<img\tsrc=\"https://mt.google.com/vt/lyrs=y&x=1&y=2\">\n<img alt=t\n  src=\"https://mt.google.com/vt/lyrs=y&x=1&y=3\">\n<img data-src=\"https://mt.google.com/vt/lyrs=y&x=9&y=9\">\n</body>";
        let sources = extract_image_sources(html, PREFIX);
        assert_eq!(
            sources,
            vec![
                "https://mt.google.com/vt/lyrs=y&x=1&y=2".to_string(),
                "https://mt.google.com/vt/lyrs=y&x=1&y=3".to_string(),
            ]
        );
    }

    #[test]
    fn document_order_is_preserved() {
        let html = r#"<div>
            <img src="https://mt.google.com/vt/lyrs=y&x=2&y=1">
            <img src="https://mt.google.com/vt/lyrs=y&x=1&y=1">
        </div>"#;
        let sources = extract_image_sources(html, PREFIX);
        assert_eq!(sources.len(), 2);
        assert!(sources[0].contains("x=2"));
        assert!(sources[1].contains("x=1"));
    }

    #[test]
    fn no_matching_images_yields_nothing() {
        let sources = extract_image_sources("<html><body><p>hello</p></body></html>", PREFIX);
        assert!(sources.is_empty());
    }

    #[test]
    fn unsafe_query_url_is_a_precondition_violation() {
        let config = crate::config::FetchConfig::default();
        let fetcher = TileFetcher::new(&config, &FirstTwoIntegers);
        let err = fetcher
            .fetch("https://evil.example.com/satellite", "subject")
            .unwrap_err();
        assert!(err.downcast_ref::<PipelineError>().is_some());
    }
}
