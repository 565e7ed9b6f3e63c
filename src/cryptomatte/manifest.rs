use std::collections::{BTreeMap, BTreeSet};

use crate::{
    foundation::core::instance_category,
    foundation::error::{LimboError, LimboResult},
};

/// 32-bit instance hash stored in a cryptomatte rank.
///
/// Renderers write the hash bit-for-bit into a float channel, so a pixel id matches
/// when `id.to_bits() == hash`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CryptoHash(pub u32);

impl CryptoHash {
    pub fn from_id(id: f32) -> Self {
        Self(id.to_bits())
    }

    pub fn as_id(self) -> f32 {
        f32::from_bits(self.0)
    }

    /// Parse the conventional manifest form: exactly eight hex digits.
    pub fn parse_hex(s: &str) -> Option<Self> {
        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(s, 16).ok().map(Self)
    }

    fn from_json(label: &str, value: &serde_json::Value) -> LimboResult<Self> {
        match value {
            serde_json::Value::String(s) => Self::parse_hex(s).ok_or_else(|| {
                LimboError::decode(format!(
                    "manifest entry '{label}' is not an 8-digit hex hash: '{s}'"
                ))
            }),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(|id| Self::from_id(id as f32))
                .ok_or_else(|| {
                    LimboError::decode(format!("manifest entry '{label}' is not a float id"))
                }),
            other => Err(LimboError::decode(format!(
                "manifest entry '{label}' has unsupported value {other}"
            ))),
        }
    }
}

impl std::fmt::Display for CryptoHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Instance label to hash mapping for one cryptomatte, iterated in label order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeMap<String, CryptoHash>,
}

impl Manifest {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, CryptoHash)>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Parse a manifest object. Values are hex hash strings or numeric float ids.
    pub fn from_json(value: &serde_json::Value) -> LimboResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| LimboError::decode("cryptomatte manifest must be a JSON object"))?;
        let entries = obj
            .iter()
            .map(|(label, v)| Ok((label.clone(), CryptoHash::from_json(label, v)?)))
            .collect::<LimboResult<BTreeMap<_, _>>>()?;
        Ok(Self { entries })
    }

    pub fn get(&self, label: &str) -> Option<CryptoHash> {
        self.entries.get(label).copied()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, CryptoHash)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Distinct categories, in order of first appearance.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.labels()
            .map(instance_category)
            .filter(|c| seen.insert(*c))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl serde::Serialize for Manifest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(k, v)| (k, v.to_string())))
    }
}

impl<'de> serde::Deserialize<'de> for Manifest {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(&value).map_err(serde::de::Error::custom)
    }
}

/// Which manifest instances a query covers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Instances {
    /// Every label in the manifest.
    #[default]
    All,
    /// Just these labels; unknown labels select nothing.
    Only(Vec<String>),
}

impl Instances {
    /// Requested labels, resolved against `manifest` for [`Instances::All`].
    pub fn labels<'a>(&'a self, manifest: &'a Manifest) -> Vec<&'a str> {
        match self {
            Self::All => manifest.labels().collect(),
            Self::Only(labels) => labels.iter().map(String::as_str).collect(),
        }
    }

    /// Hashes of the requested labels known to `manifest`.
    pub fn hashes(&self, manifest: &Manifest) -> BTreeSet<CryptoHash> {
        self.labels(manifest)
            .into_iter()
            .filter_map(|label| manifest.get(label))
            .collect()
    }
}

impl From<&str> for Instances {
    fn from(label: &str) -> Self {
        Self::Only(vec![label.to_string()])
    }
}

impl From<String> for Instances {
    fn from(label: String) -> Self {
        Self::Only(vec![label])
    }
}

impl From<Vec<String>> for Instances {
    fn from(labels: Vec<String>) -> Self {
        Self::Only(labels)
    }
}

impl From<&[&str]> for Instances {
    fn from(labels: &[&str]) -> Self {
        Self::Only(labels.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Instances {
    fn from(labels: [&str; N]) -> Self {
        Self::from(&labels[..])
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cryptomatte/manifest.rs"]
mod tests;
