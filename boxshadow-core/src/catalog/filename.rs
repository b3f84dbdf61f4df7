//! Box filename grammar
//!
//! Boxes are published as files named after the path segments Vagrant
//! uses, with `/` replaced by the literal `-VAGRANTSLASH-`:
//!
//! ```text
//! {owner}-VAGRANTSLASH-{boxname}__{version}__{provider}.box   (version_provider)
//! {owner}-VAGRANTSLASH-{boxname}__{provider}__{version}.box   (provider_version)
//! ```
//!
//! `owner` and `boxname` are ASCII alphanumeric. `provider` is alphanumeric
//! with single inner underscores allowed (`vmware_desktop`). `version` also
//! allows `.` and `-`. Matching is case-sensitive and anchored.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::config::FilenameLayout;
use crate::error::ParseError;

/// Literal token standing in for `/` between owner and box name
pub const SLASH_TOKEN: &str = "-VAGRANTSLASH-";

static VERSION_PROVIDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<owner>[A-Za-z0-9]+)-VAGRANTSLASH-(?P<boxname>[A-Za-z0-9]+)__(?P<version>[A-Za-z0-9.\-]+)__(?P<provider>[A-Za-z0-9]+(?:_[A-Za-z0-9]+)*)\.box$",
    )
    .expect("version_provider pattern is valid")
});

static PROVIDER_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<owner>[A-Za-z0-9]+)-VAGRANTSLASH-(?P<boxname>[A-Za-z0-9]+)__(?P<provider>[A-Za-z0-9]+(?:_[A-Za-z0-9]+)*)__(?P<version>[A-Za-z0-9.\-]+)\.box$",
    )
    .expect("provider_version pattern is valid")
});

/// The four fields carried by a box filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxFilename {
    pub owner: String,
    pub boxname: String,
    pub version: String,
    pub provider: String,
}

/// Parses box filenames according to one configured layout
#[derive(Debug, Clone, Copy)]
pub struct FilenameParser {
    layout: FilenameLayout,
}

impl FilenameParser {
    pub fn new(layout: FilenameLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> FilenameLayout {
        self.layout
    }

    fn pattern(&self) -> &'static Regex {
        match self.layout {
            FilenameLayout::VersionProvider => &VERSION_PROVIDER,
            FilenameLayout::ProviderVersion => &PROVIDER_VERSION,
        }
    }

    /// Parse a file basename (no directory components)
    pub fn parse(&self, basename: &str) -> Result<BoxFilename, ParseError> {
        let caps = self.pattern().captures(basename).ok_or_else(|| ParseError {
            filename: basename.to_string(),
            layout: self.layout.as_str(),
        })?;

        let field = |caps: &Captures<'_>, name: &str| caps[name].to_string();

        Ok(BoxFilename {
            owner: field(&caps, "owner"),
            boxname: field(&caps, "boxname"),
            version: field(&caps, "version"),
            provider: field(&caps, "provider"),
        })
    }

    /// Render the filename a box would be published under with this layout
    pub fn format(&self, name: &BoxFilename) -> String {
        let (a, b) = match self.layout {
            FilenameLayout::VersionProvider => (&name.version, &name.provider),
            FilenameLayout::ProviderVersion => (&name.provider, &name.version),
        };
        format!("{}{SLASH_TOKEN}{}__{a}__{b}.box", name.owner, name.boxname)
    }
}
