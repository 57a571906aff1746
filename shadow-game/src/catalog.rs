//! Static cosmetic catalog (skins and backgrounds) with level gates.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

const DEFAULT_CATALOG_DATA: &str = include_str!("../assets/cosmetics.json");

/// Which cosmetic slot an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CosmeticKind {
    Skin,
    Background,
}

impl CosmeticKind {
    pub const ALL: [Self; 2] = [Self::Skin, Self::Background];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Skin => "skin",
            Self::Background => "background",
        }
    }
}

impl fmt::Display for CosmeticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmeticItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_unlock_level")]
    pub unlock_level: u32,
}

fn default_unlock_level() -> u32 {
    1
}

impl CosmeticItem {
    #[must_use]
    pub fn new(id: &str, name: &str, description: &str, unlock_level: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            unlock_level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("catalog has no {0} entries")]
    Empty(CosmeticKind),
    #[error("catalog has no {0} available at level 1")]
    MissingStarter(CosmeticKind),
    #[error("catalog has {count} {kind} items available at level 1")]
    MultipleStarters { kind: CosmeticKind, count: usize },
    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: CosmeticKind, id: String },
    #[error("{kind} {id} has unlock level 0")]
    ZeroUnlockLevel { kind: CosmeticKind, id: String },
}

/// Skins and backgrounds the progression engine scans when levelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmeticCatalog {
    pub skins: Vec<CosmeticItem>,
    pub backgrounds: Vec<CosmeticItem>,
}

impl Default for CosmeticCatalog {
    fn default() -> Self {
        match Self::from_json(DEFAULT_CATALOG_DATA) {
            Ok(catalog) => catalog,
            Err(err) => {
                log::warn!("bundled cosmetic catalog rejected ({err}); using starter-only catalog");
                Self::starter_only()
            }
        }
    }
}

impl CosmeticCatalog {
    /// Parse and validate a catalog from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or fails [`Self::validate`].
    pub fn from_json(json: &str) -> Result<Self, CatalogLoadError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Minimal catalog containing only the free starter items.
    #[must_use]
    pub fn starter_only() -> Self {
        Self {
            skins: vec![CosmeticItem::new(
                "classic",
                "Classic Shadow",
                "The original shadow companion",
                1,
            )],
            backgrounds: vec![CosmeticItem::new(
                "haunted-house",
                "Haunted House",
                "A spooky mansion",
                1,
            )],
        }
    }

    #[must_use]
    pub fn items(&self, kind: CosmeticKind) -> &[CosmeticItem] {
        match kind {
            CosmeticKind::Skin => &self.skins,
            CosmeticKind::Background => &self.backgrounds,
        }
    }

    #[must_use]
    pub fn get(&self, kind: CosmeticKind, id: &str) -> Option<&CosmeticItem> {
        self.items(kind).iter().find(|item| item.id == id)
    }

    /// The item of `kind` that is free at level 1.
    #[must_use]
    pub fn starter(&self, kind: CosmeticKind) -> Option<&CosmeticItem> {
        self.items(kind).iter().find(|item| item.unlock_level <= 1)
    }

    /// Items of `kind` whose gate is at or below `level`.
    pub fn available_at(
        &self,
        kind: CosmeticKind,
        level: u32,
    ) -> impl Iterator<Item = &CosmeticItem> + '_ {
        self.items(kind)
            .iter()
            .filter(move |item| item.unlock_level <= level)
    }

    /// Lowest gate strictly above `level`, if any item is still locked.
    #[must_use]
    pub fn next_unlock_level(&self, level: u32) -> Option<u32> {
        CosmeticKind::ALL
            .iter()
            .flat_map(|kind| self.items(*kind))
            .map(|item| item.unlock_level)
            .filter(|gate| *gate > level)
            .min()
    }

    /// Check catalog shape.
    ///
    /// # Errors
    ///
    /// Returns the first structural problem found.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for kind in CosmeticKind::ALL {
            let items = self.items(kind);
            if items.is_empty() {
                return Err(CatalogError::Empty(kind));
            }
            let mut seen = HashSet::new();
            for item in items {
                if item.unlock_level == 0 {
                    return Err(CatalogError::ZeroUnlockLevel {
                        kind,
                        id: item.id.clone(),
                    });
                }
                if !seen.insert(item.id.as_str()) {
                    return Err(CatalogError::DuplicateId {
                        kind,
                        id: item.id.clone(),
                    });
                }
            }
            match self.available_at(kind, 1).count() {
                0 => return Err(CatalogError::MissingStarter(kind)),
                1 => {}
                count => return Err(CatalogError::MultipleStarters { kind, count }),
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid catalog: {0}")]
    Invalid(#[from] CatalogError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_catalog_loads_and_validates() {
        let catalog = CosmeticCatalog::default();
        assert_eq!(catalog.skins.len(), 5);
        assert_eq!(catalog.backgrounds.len(), 5);
        assert_eq!(catalog.starter(CosmeticKind::Skin).unwrap().id, "classic");
        assert_eq!(
            catalog.starter(CosmeticKind::Background).unwrap().id,
            "haunted-house"
        );
        assert_eq!(
            catalog.get(CosmeticKind::Skin, "witch").unwrap().unlock_level,
            10
        );
        catalog.validate().unwrap();
    }

    #[test]
    fn available_at_respects_gates() {
        let catalog = CosmeticCatalog::default();
        let ids: Vec<_> = catalog
            .available_at(CosmeticKind::Background, 4)
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(ids, vec!["haunted-house", "graveyard", "forest"]);
        assert_eq!(catalog.next_unlock_level(1), Some(2));
        assert_eq!(catalog.next_unlock_level(10), None);
    }

    #[test]
    fn validation_rejects_bad_catalogs() {
        let mut catalog = CosmeticCatalog::starter_only();
        catalog.skins[0].unlock_level = 3;
        assert_eq!(
            catalog.validate(),
            Err(CatalogError::MissingStarter(CosmeticKind::Skin))
        );

        let mut catalog = CosmeticCatalog::starter_only();
        catalog.backgrounds.push(catalog.backgrounds[0].clone());
        assert!(matches!(
            catalog.validate(),
            Err(CatalogError::DuplicateId { kind: CosmeticKind::Background, .. })
        ));

        let mut catalog = CosmeticCatalog::starter_only();
        catalog.skins.clear();
        assert_eq!(
            catalog.validate(),
            Err(CatalogError::Empty(CosmeticKind::Skin))
        );
    }

    #[test]
    fn second_level_one_item_is_rejected() {
        let mut catalog = CosmeticCatalog::default();
        catalog
            .skins
            .push(CosmeticItem::new("extra", "Extra", "", 1));
        assert_eq!(
            catalog.validate(),
            Err(CatalogError::MultipleStarters {
                kind: CosmeticKind::Skin,
                count: 2
            })
        );

        let json = r#"{
            "skins":[{"id":"a","name":"A"}],
            "backgrounds":[{"id":"b","name":"B"},{"id":"c","name":"C","unlock_level":1}]
        }"#;
        assert!(matches!(
            CosmeticCatalog::from_json(json),
            Err(CatalogLoadError::Invalid(CatalogError::MultipleStarters {
                kind: CosmeticKind::Background,
                ..
            }))
        ));
    }

    #[test]
    fn from_json_reports_parse_and_shape_errors() {
        assert!(matches!(
            CosmeticCatalog::from_json("not json"),
            Err(CatalogLoadError::Json(_))
        ));
        let missing_backgrounds = r#"{"skins":[{"id":"a","name":"A"}],"backgrounds":[]}"#;
        assert!(matches!(
            CosmeticCatalog::from_json(missing_backgrounds),
            Err(CatalogLoadError::Invalid(CatalogError::Empty(
                CosmeticKind::Background
            )))
        ));
    }
}
