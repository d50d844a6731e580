//! `rosa list versions` and helpers for picking versions out of the list.

use rosacli_core::CapturedOutput;
use rosacli_parser::{TableRow, Tree};
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::Client;
use crate::error::{ExecError, Result};
use crate::service::ResourcesCleaner;

/// Parses an OpenShift version leniently: a leading `v` is dropped and a
/// missing minor or patch component is filled with zero.
pub fn parse_version(text: &str) -> Result<Version> {
    let text = text.trim();
    let text = text.strip_prefix('v').unwrap_or(text);
    let (core, rest) = match text.find(['-', '+']) {
        Some(at) => text.split_at(at),
        None => (text, ""),
    };
    let padded = match core.split('.').count() {
        1 => format!("{core}.0.0{rest}"),
        2 => format!("{core}.0{rest}"),
        _ => text.to_string(),
    };
    Ok(Version::parse(&padded)?)
}

/// One row of `rosa list versions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenShiftVersion {
    #[serde(rename = "VERSION")]
    pub version: String,
    #[serde(rename = "DEFAULT")]
    pub default: String,
    #[serde(rename = "AVAILABLE UPGRADES")]
    pub available_upgrades: String,
}

impl OpenShiftVersion {
    pub fn semver(&self) -> Result<Version> {
        parse_version(&self.version)
    }

    /// `(major, minor, "major.minor")`.
    pub fn major_minor(&self) -> Result<(u64, u64, String)> {
        let version = self.semver()?;
        Ok((
            version.major,
            version.minor,
            format!("{}.{}", version.major, version.minor),
        ))
    }

    pub fn is_default(&self) -> bool {
        self.default == "yes"
    }
}

/// One entry of `rosa list versions -o json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenShiftVersionJson {
    pub id: String,
    pub raw_id: String,
    pub channel_group: String,
    pub enabled: bool,
    pub hosted_control_plane_default: bool,
    pub hosted_control_plane_enabled: bool,
    pub default: bool,
    pub available_upgrades: Vec<String>,
}

/// Reflected `rosa list versions` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionList {
    pub versions: Vec<OpenShiftVersion>,
}

impl VersionList {
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Sorted by semantic version, ascending or (`reverse`) descending.
    /// Fails on the first row that does not parse.
    pub fn sort(&self, reverse: bool) -> Result<VersionList> {
        let mut keyed = self
            .versions
            .iter()
            .map(|version| -> Result<(Version, OpenShiftVersion)> {
                Ok((version.semver()?, version.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        keyed.sort_by(|(a, _), (b, _)| a.cmp(b));
        if reverse {
            keyed.reverse();
        }
        Ok(VersionList {
            versions: keyed.into_iter().map(|(_, version)| version).collect(),
        })
    }

    /// The row marked default, else the first row.
    pub fn default_version(&self) -> Option<&OpenShiftVersion> {
        self.versions
            .iter()
            .find(|version| version.is_default())
            .or_else(|| self.versions.first())
    }

    pub fn latest(&self) -> Result<Option<OpenShiftVersion>> {
        Ok(self.sort(true)?.versions.into_iter().next())
    }

    /// Versions strictly lower than `version`.
    pub fn filter_lower_than(&self, version: &str) -> Result<VersionList> {
        let given = parse_version(version)?;
        let mut versions = Vec::new();
        for candidate in &self.versions {
            if candidate.semver()? < given {
                versions.push(candidate.clone());
            }
        }
        Ok(VersionList { versions })
    }

    /// Versions with `major` and a minor equal to `minor` (`strict`) or
    /// lower than or equal to it.
    pub fn filter_same_major_minor(&self, major: u64, minor: u64, strict: bool) -> Result<VersionList> {
        let mut versions = Vec::new();
        for candidate in &self.versions {
            let parsed = candidate.semver()?;
            let minor_matches = if strict {
                parsed.minor == minor
            } else {
                parsed.minor <= minor
            };
            if parsed.major == major && minor_matches {
                versions.push(candidate.clone());
            }
        }
        Ok(VersionList { versions })
    }

    /// Nearest version at `major.(minor - minor_sub)` or below (`strict`
    /// keeps only that exact minor).
    ///
    /// With `upgradable`, the candidate must list `version` among its
    /// available upgrades; of those the lowest one wins.
    pub fn find_nearest_backward_minor(
        &self,
        version: &str,
        minor_sub: u64,
        strict: bool,
        upgradable: bool,
    ) -> Result<Option<OpenShiftVersion>> {
        let base = parse_version(version)?;
        let Some(minor) = base.minor.checked_sub(minor_sub) else {
            return Ok(None);
        };
        let candidates = self
            .filter_same_major_minor(base.major, minor, strict)?
            .sort(true)?;
        debug!(
            version,
            minor_sub,
            strict,
            upgradable,
            candidates = candidates.len(),
            "Looking for backward version"
        );
        if upgradable {
            return Ok(candidates
                .versions
                .into_iter()
                .rev()
                .find(|candidate| candidate.available_upgrades.contains(version)));
        }
        Ok(candidates.versions.into_iter().next())
    }
}

/// Version commands for one client.
pub struct VersionService<'c> {
    client: &'c mut Client,
}

impl<'c> VersionService<'c> {
    pub(crate) fn new(client: &'c mut Client) -> Self {
        Self { client }
    }

    /// `rosa list versions <flags> [--hosted-cp] [--channel-group <group>]`.
    pub fn list(&self, channel_group: &str, hosted_cp: bool, flags: &[&str]) -> Result<CapturedOutput> {
        let mut args = vec!["list", "versions"];
        args.extend_from_slice(flags);
        if hosted_cp {
            args.push("--hosted-cp");
        }
        if !channel_group.is_empty() {
            args.extend(["--channel-group", channel_group]);
        }
        self.client.runner.run(args)
    }

    pub fn reflect(&self, output: &CapturedOutput) -> Result<VersionList> {
        let versions = self
            .client
            .parser
            .table(output)
            .iter()
            .map(TableRow::deserialize)
            .collect::<rosacli_parser::Result<Vec<OpenShiftVersion>>>()?;
        Ok(VersionList { versions })
    }

    /// Reads a JSON array of versions.
    pub fn reflect_json(&self, output: &CapturedOutput) -> Result<Vec<OpenShiftVersionJson>> {
        let tree = Tree::try_parse(output.as_bytes(), output.format())?;
        if tree.is_null() {
            return Ok(Vec::new());
        }
        Ok(tree.deserialize()?)
    }

    pub fn list_and_reflect(&self, channel_group: &str, hosted_cp: bool, flags: &[&str]) -> Result<VersionList> {
        let output = self.list(channel_group, hosted_cp, flags)?;
        self.reflect(&output)
    }

    /// Same listing with `-o json` appended.
    pub fn list_and_reflect_json(
        &self,
        channel_group: &str,
        hosted_cp: bool,
        flags: &[&str],
    ) -> Result<Vec<OpenShiftVersionJson>> {
        let mut flags = flags.to_vec();
        flags.extend(["-o", "json"]);
        let output = self.list(channel_group, hosted_cp, &flags)?;
        self.reflect_json(&output)
    }
}

impl ResourcesCleaner for VersionService<'_> {
    fn clean_resources(&mut self, cluster_id: &str) -> Vec<ExecError> {
        debug!(cluster_id, "Nothing to clean for versions");
        Vec::new()
    }
}
