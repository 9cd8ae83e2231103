//! Creative parameter bag
//!
//! The `AdParameters` blob handed over at `initialize`: a JSON object naming
//! the media file to play plus the asset locations the ad surface needs.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Decoded creative parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdParameters {
    /// Media file the ad plays
    pub video_url: String,
    /// Root for image assets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url_images: Option<Url>,
    /// Font family name to font file URL
    #[serde(default)]
    pub fonts: BTreeMap<String, String>,
    /// Any other creative-specific fields, passed through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AdParameters {
    /// Decode a parameter blob
    pub fn parse(blob: &str) -> Result<Self> {
        if blob.trim().is_empty() {
            return Err(Error::MalformedParameters("parameter blob is empty".into()));
        }

        let params: AdParameters = serde_json::from_str(blob)?;
        if params.video_url.trim().is_empty() {
            return Err(Error::MalformedParameters("videoUrl is empty".into()));
        }
        Ok(params)
    }

    /// Resolve an asset path against `baseUrlImages`
    pub fn asset_url(&self, path: &str) -> Result<Url> {
        let mut base = self
            .base_url_images
            .clone()
            .ok_or_else(|| Error::MalformedParameters("baseUrlImages is not set".into()))?;

        // treat the base as a directory even without a trailing slash
        if !base.path().ends_with('/') {
            let dir = format!("{}/", base.path());
            base.set_path(&dir);
        }

        base.join(path.trim_start_matches('/'))
            .map_err(|e| Error::MalformedParameters(format!("asset path '{}': {}", path, e)))
    }

    /// Font faces to install, as (family, url) pairs
    pub fn font_faces(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fonts.iter().map(|(family, url)| (family.as_str(), url.as_str()))
    }
}
