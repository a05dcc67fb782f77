// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw deserialization structs for the catalog manifest (TOML).
//!
//! The manifest describes categories of target faces and one collage
//! preview per category. File paths are relative to the manifest location.
//!
//! ```toml
//! [[categories]]
//! name = "art"
//! collage = "collages/art.png"
//!
//! [[categories.targets]]
//! mode = "mona_lisa"
//! name = "Mona Lisa"
//! file = "targets/art/mona_lisa.png"
//! ```

use serde::Deserialize;

/// Top-level manifest document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogManifest {
    /// Categories in presentation order.
    #[serde(default)]
    pub categories: Vec<CategoryManifest>,
}

/// One category entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryManifest {
    /// Unique category name.
    pub name: String,
    /// Collage preview image, relative to the manifest.
    pub collage: String,
    /// Targets in selection order (order is significant for
    /// selection-by-index).
    #[serde(default)]
    pub targets: Vec<TargetManifest>,
}

/// One target face entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetManifest {
    /// Selection discriminator, unique within the category.
    pub mode: String,
    /// Display label.
    pub name: String,
    /// Target image file, relative to the manifest.
    pub file: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_parses() {
        let doc = r#"
[[categories]]
name = "art"
collage = "collages/art.png"

[[categories.targets]]
mode = "mona_lisa"
name = "Mona Lisa"
file = "targets/art/mona_lisa.png"

[[categories.targets]]
mode = "scream"
name = "The Scream"
file = "targets/art/scream.png"

[[categories]]
name = "memes"
collage = "collages/memes.png"

[[categories.targets]]
mode = "doge"
name = "Doge"
file = "targets/memes/doge.png"
"#;
        let manifest: CatalogManifest = toml::from_str(doc).unwrap();
        assert_eq!(manifest.categories.len(), 2);
        assert_eq!(manifest.categories[0].name, "art");
        assert_eq!(manifest.categories[0].targets.len(), 2);
        assert_eq!(manifest.categories[1].targets[0].mode, "doge");
    }

    #[test]
    fn unknown_manifest_key_is_rejected() {
        let doc = r#"
[[categories]]
name = "art"
collage = "c.png"
extra = true
"#;
        assert!(toml::from_str::<CatalogManifest>(doc).is_err());
    }

    #[test]
    fn missing_collage_is_rejected() {
        let doc = r#"
[[categories]]
name = "art"
"#;
        assert!(toml::from_str::<CatalogManifest>(doc).is_err());
    }
}
