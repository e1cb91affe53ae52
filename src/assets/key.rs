//! Asset keys: typed subjects and their stable store keys.
//!
//! DESIGN
//! ======
//! Every cacheable visual is a `Subject`: either a machine (`ProcessType`)
//! or a part (`ProductType`). The set is closed, so an unknown subject is
//! rejected when it is parsed at the boundary instead of silently creating
//! a new cache slot. `AssetKey` renders the string form used by the store
//! (`global_asset/stamping`, `global_product/busbar-clip`).
//!
//! Keys carry no version suffix. Invalidation after a template change goes
//! through `AssetCache::ensure_schema`.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// PROCESS TYPE
// =============================================================================

/// Production process of a line or workshop. Each maps to one machine visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessType {
    Stamping,
    Molding,
    Plating,
    Assembly,
}

impl ProcessType {
    pub const ALL: [Self; 4] = [Self::Stamping, Self::Molding, Self::Plating, Self::Assembly];

    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::Stamping => "stamping",
            Self::Molding => "molding",
            Self::Plating => "plating",
            Self::Assembly => "assembly",
        }
    }

    /// Human-readable machine name shown in the asset library.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Stamping => "Stamping Press",
            Self::Molding => "Injection Molder",
            Self::Plating => "Plating Line",
            Self::Assembly => "Assembly Robot",
        }
    }

    #[must_use]
    pub fn from_slug(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.slug() == raw)
    }
}

// =============================================================================
// PRODUCT TYPE
// =============================================================================

/// Part family currently produced on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    HvConnectorHsg,
    BusbarClip,
    SensorTerminal,
}

impl ProductType {
    pub const ALL: [Self; 3] = [Self::HvConnectorHsg, Self::BusbarClip, Self::SensorTerminal];

    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::HvConnectorHsg => "hv-connector-hsg",
            Self::BusbarClip => "busbar-clip",
            Self::SensorTerminal => "sensor-terminal",
        }
    }

    /// Product name as it appears in scenario data (e.g. `"HV Connector Hsg"`).
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::HvConnectorHsg => "HV Connector Hsg",
            Self::BusbarClip => "Busbar Clip",
            Self::SensorTerminal => "Sensor Terminal",
        }
    }

    #[must_use]
    pub fn from_slug(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.slug() == raw)
    }

    /// Normalize a free-text product name into a known product type.
    ///
    /// Matching ignores case, whitespace and punctuation, so `"HV Connector Hsg"`,
    /// `"hv-connector-hsg"` and `"HVConnectorHSG"` all resolve to the same type.
    #[must_use]
    pub fn from_name(raw: &str) -> Option<Self> {
        let folded = fold_name(raw);
        if folded.is_empty() {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|p| fold_name(p.display_name()) == folded)
    }
}

fn fold_name(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// =============================================================================
// SUBJECT + NAMESPACE
// =============================================================================

/// Store namespace. Machines and parts never share a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    GlobalAsset,
    GlobalProduct,
}

impl Namespace {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GlobalAsset => "global_asset",
            Self::GlobalProduct => "global_product",
        }
    }

    #[must_use]
    pub fn from_str(raw: &str) -> Option<Self> {
        match raw {
            "global_asset" => Some(Self::GlobalAsset),
            "global_product" => Some(Self::GlobalProduct),
            _ => None,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything the dashboard renders a machine or part visual for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "type", rename_all = "snake_case")]
pub enum Subject {
    Process(ProcessType),
    Product(ProductType),
}

impl Subject {
    /// Every known subject, in asset-library order (machines first).
    pub const ALL: [Self; 7] = [
        Self::Process(ProcessType::Stamping),
        Self::Process(ProcessType::Molding),
        Self::Process(ProcessType::Plating),
        Self::Process(ProcessType::Assembly),
        Self::Product(ProductType::HvConnectorHsg),
        Self::Product(ProductType::BusbarClip),
        Self::Product(ProductType::SensorTerminal),
    ];

    #[must_use]
    pub fn namespace(self) -> Namespace {
        match self {
            Self::Process(_) => Namespace::GlobalAsset,
            Self::Product(_) => Namespace::GlobalProduct,
        }
    }

    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::Process(p) => p.slug(),
            Self::Product(p) => p.slug(),
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Process(p) => p.display_name(),
            Self::Product(p) => p.display_name(),
        }
    }

    #[must_use]
    pub fn key(self) -> AssetKey {
        AssetKey::new(self)
    }

    /// Parse a `(namespace, slug)` pair as used in URLs.
    #[must_use]
    pub fn parse(namespace: &str, slug: &str) -> Option<Self> {
        match Namespace::from_str(namespace)? {
            Namespace::GlobalAsset => ProcessType::from_slug(slug).map(Self::Process),
            Namespace::GlobalProduct => ProductType::from_slug(slug)
                .or_else(|| ProductType::from_name(slug))
                .map(Self::Product),
        }
    }
}

// =============================================================================
// ASSET KEY
// =============================================================================

/// Prefix for bookkeeping entries that share the store with assets.
pub const META_PREFIX: &str = "__meta/";

/// Composite cache key. The string form is the store address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetKey {
    subject: Subject,
}

impl AssetKey {
    #[must_use]
    pub fn new(subject: Subject) -> Self {
        Self { subject }
    }

    #[must_use]
    pub fn subject(self) -> Subject {
        self.subject
    }

    #[must_use]
    pub fn namespace(self) -> Namespace {
        self.subject.namespace()
    }

    /// Parse a store key back into a typed key. Meta keys and unknown
    /// subjects return `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let (namespace, slug) = raw.split_once('/')?;
        Subject::parse(namespace, slug).map(Self::new)
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace(), self.subject.slug())
    }
}

impl From<Subject> for AssetKey {
    fn from(subject: Subject) -> Self {
        Self::new(subject)
    }
}

#[cfg(test)]
#[path = "key_test.rs"]
mod tests;
