use log::{error, info, warn};
use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path};

use crate::config::MonitorConfig;
use crate::error::Error;

/// A single URL and how it should be checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub url: String,
    pub excluded: bool,
    /// Substrings of which at least one must appear in the response body.
    pub match_texts: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TargetLists {
    pub do_not_monitor: Vec<ExcludedEntry>,
    pub monitor: Vec<MonitorEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ExcludedEntry {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct MonitorEntry {
    pub url: String,
    pub accessibility_texts: Option<Vec<String>>,
}

/// Read-only mapping from URL to [`Target`], built once at startup.
#[derive(Debug, Default, Clone)]
pub struct TargetRegistry {
    targets: BTreeMap<String, Target>,
}

impl TargetRegistry {
    /// Builds the registry from the raw lists.
    ///
    /// A URL on the exclusion list stays excluded even if it is also listed
    /// for monitoring. Targets without their own match texts use the global
    /// ones.
    pub fn build(lists: TargetLists, global_texts: &[String]) -> Self {
        let mut targets = BTreeMap::new();

        for entry in lists.monitor {
            let match_texts = match entry.accessibility_texts {
                Some(texts) if !texts.is_empty() => texts,
                _ => global_texts.to_vec(),
            };
            targets.insert(
                entry.url.clone(),
                Target {
                    url: entry.url,
                    excluded: false,
                    match_texts,
                },
            );
        }

        for entry in lists.do_not_monitor {
            if targets.contains_key(&entry.url) {
                warn!(
                    "{}: listed in both do_not_monitor and monitor, it will not be checked",
                    entry.url
                );
            }
            targets.insert(
                entry.url.clone(),
                Target {
                    url: entry.url,
                    excluded: true,
                    match_texts: Vec::new(),
                },
            );
        }

        Self { targets }
    }

    /// Reads the target lists from the config file.
    ///
    /// Failures are logged and produce an empty registry; the monitor keeps
    /// running with nothing to check rather than aborting.
    pub fn load<P: AsRef<Path>>(path: P, config: &MonitorConfig) -> Self {
        let path = path.as_ref();
        match read_lists(path) {
            Ok(lists) => {
                let registry = Self::build(lists, &config.global_accessibility_texts);
                info!(
                    "Loaded {} targets ({} monitored) from {}",
                    registry.len(),
                    registry.monitored().count(),
                    path.display()
                );
                registry
            }
            Err(e) => {
                error!(
                    "Error occurred while loading the websites from file \"{}\": {e}",
                    path.display()
                );
                Self::default()
            }
        }
    }

    pub fn resolve(&self, url: &str) -> Option<&Target> {
        self.targets.get(url)
    }

    /// Targets that are checked every round, in URL order.
    pub fn monitored(&self) -> impl Iterator<Item = &Target> {
        self.targets.values().filter(|t| !t.excluded)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

fn read_lists(path: &Path) -> Result<TargetLists, Error> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}
