//! Catalog data model
//!
//! These types double as the served representation: serializing a
//! [`BoxEntry`] yields the JSON document Vagrant expects from
//! `GET /{owner}/{box}`. The local file path of a provider is internal and
//! is never serialized.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One box file after its name (and optionally its contents) has been read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArtifact {
    pub owner: String,
    pub boxname: String,
    pub version: String,
    pub provider: String,
    /// Absolute path of the box file
    pub path: PathBuf,
}

/// Release status of a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    #[default]
    Active,
}

/// A downloadable box for one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderEntry {
    pub name: String,
    #[serde(serialize_with = "serialize_flag")]
    pub hosted: bool,
    pub download_url: String,
    pub url: String,
    #[serde(skip)]
    pub local_path: PathBuf,
}

impl ProviderEntry {
    pub fn new(name: impl Into<String>, download_url: String, local_path: PathBuf) -> Self {
        Self {
            name: name.into(),
            hosted: true,
            url: download_url.clone(),
            download_url,
            local_path,
        }
    }
}

/// Box-hosting clients read provider flags as the strings "true"/"false"
fn serialize_flag<S: Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *flag { "true" } else { "false" })
}

/// One version of a box and the providers it is available for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionEntry {
    pub version: String,
    pub status: VersionStatus,
    pub providers: Vec<ProviderEntry>,
}

impl VersionEntry {
    pub fn provider(&self, name: &str) -> Option<&ProviderEntry> {
        self.providers.iter().find(|p| p.name == name)
    }
}

/// All versions of `owner/boxname`
///
/// `versions` is sorted newest-first and never empty, so the current
/// version is always `versions[0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxEntry {
    pub name: String,
    pub username: String,
    pub private: bool,
    pub versions: Vec<VersionEntry>,
}

impl BoxEntry {
    /// The semantically highest version present
    pub fn current_version(&self) -> Option<&VersionEntry> {
        self.versions.first()
    }

    pub fn version(&self, version: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.version == version)
    }

    /// Short name without the owner prefix
    pub fn boxname(&self) -> &str {
        self.name
            .split_once('/')
            .map(|(_, b)| b)
            .unwrap_or(&self.name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for BoxEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("BoxEntry", 6)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("username", &self.username)?;
        s.serialize_field("private", &self.private)?;
        s.serialize_field("short_description", "")?;
        s.serialize_field("current_version", &self.current_version())?;
        s.serialize_field("versions", &self.versions)?;
        s.end()
    }
}

/// Counts describing a catalog, used for rebuild logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub owners: usize,
    pub boxes: usize,
    pub versions: usize,
    pub providers: usize,
}

/// owner -> boxname -> box
///
/// Immutable once built; rebuilds produce a new value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    owners: BTreeMap<String, BTreeMap<String, BoxEntry>>,
}

impl Catalog {
    pub fn new(owners: BTreeMap<String, BTreeMap<String, BoxEntry>>) -> Self {
        Self { owners }
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn get_box(&self, owner: &str, boxname: &str) -> Option<&BoxEntry> {
        self.owners.get(owner)?.get(boxname)
    }

    pub fn box_available(&self, owner: &str, boxname: &str) -> bool {
        self.get_box(owner, boxname).is_some()
    }

    /// Local file backing `owner/boxname` at `version` for `provider`
    pub fn file_location(
        &self,
        owner: &str,
        boxname: &str,
        provider: &str,
        version: &str,
    ) -> Option<&Path> {
        self.get_box(owner, boxname)?
            .version(version)?
            .provider(provider)
            .map(|p| p.local_path.as_path())
    }

    pub fn owners(&self) -> impl Iterator<Item = &str> {
        self.owners.keys().map(String::as_str)
    }

    /// Every box, ordered by owner then box name
    pub fn boxes(&self) -> impl Iterator<Item = &BoxEntry> {
        self.owners.values().flat_map(|boxes| boxes.values())
    }

    pub fn summary(&self) -> CatalogSummary {
        let mut summary = CatalogSummary {
            owners: self.owners.len(),
            ..Default::default()
        };
        for entry in self.boxes() {
            summary.boxes += 1;
            summary.versions += entry.versions.len();
            summary.providers += entry.versions.iter().map(|v| v.providers.len()).sum::<usize>();
        }
        summary
    }
}
