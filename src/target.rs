//! Named targets supplied by the caller for one run

use crate::errors::{CanaryError, Result};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Targets probed when the caller supplies none
pub const DEFAULT_TARGETS: [(&str, &str); 2] = [
    ("Google", "https://www.google.com/"),
    ("Youtube", "https://www.youtube.com/"),
];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub url: String,
}

/// Ordered name to URL mapping.
///
/// Iteration follows insertion order. Inserting a name that is already
/// present replaces its URL but keeps the original position, so the last
/// value seen for a name wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetSet {
    targets: Vec<Target>,
}

impl TargetSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_targets() -> Self {
        DEFAULT_TARGETS.iter().copied().collect()
    }

    /// Insert a target, returning the URL it replaced if the name was known
    pub fn insert(&mut self, name: impl Into<String>, url: impl Into<String>) -> Option<String> {
        let name = name.into();
        let url = url.into();

        match self.targets.iter_mut().find(|t| t.name == name) {
            Some(existing) => Some(std::mem::replace(&mut existing.url, url)),
            None => {
                self.targets.push(Target { name, url });
                None
            }
        }
    }

    pub fn with_target(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.insert(name, url);
        self
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Target> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Parse an invocation payload.
    ///
    /// Accepts either a bare JSON object of name to URL or one wrapped as
    /// `{"urls": {...}}`. A blank payload, `null`, or `{"urls": null}`
    /// yields the default targets. `{}` is an empty run.
    pub fn from_json(payload: &str) -> Result<Self> {
        if payload.trim().is_empty() {
            return Ok(Self::default_targets());
        }

        let parsed: Option<Payload> = serde_json::from_str(payload)
            .map_err(|e| CanaryError::InvalidTargets(e.to_string()))?;

        let targets = match parsed {
            Some(Payload::Wrapped(Wrapped { urls })) => urls,
            Some(Payload::Bare(targets)) => Some(targets),
            None => None,
        };

        Ok(targets.unwrap_or_else(Self::default_targets))
    }
}

impl<'a> IntoIterator for &'a TargetSet {
    type Item = &'a Target;
    type IntoIter = std::slice::Iter<'a, Target>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.iter()
    }
}

impl<N: Into<String>, U: Into<String>> FromIterator<(N, U)> for TargetSet {
    fn from_iter<I: IntoIterator<Item = (N, U)>>(iter: I) -> Self {
        let mut set = TargetSet::new();
        for (name, url) in iter {
            set.insert(name, url);
        }
        set
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Wrapped(Wrapped),
    Bare(TargetSet),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Wrapped {
    // `urls` must be present, otherwise `{}` would read as a wrapper
    #[serde(deserialize_with = "Option::deserialize")]
    urls: Option<TargetSet>,
}

impl<'de> Deserialize<'de> for TargetSet {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TargetSetVisitor;

        impl<'de> Visitor<'de> for TargetSetVisitor {
            type Value = TargetSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of target name to URL")
            }

            fn visit_map<M>(self, mut map: M) -> std::result::Result<TargetSet, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut set = TargetSet::new();
                while let Some((name, url)) = map.next_entry::<String, String>()? {
                    set.insert(name, url);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(TargetSetVisitor)
    }
}
