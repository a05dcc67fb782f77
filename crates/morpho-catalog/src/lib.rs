// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Target-asset catalog for the Morpho face-swap bot.
//!
//! The catalog is built once at startup from a TOML manifest and is
//! read-only afterwards; concurrent reads need no locking. A reload is a
//! full rebuild -- there is no partial mutation.
//!
//! Load-time validation rejects categories with zero targets and manifests
//! referencing missing files. Duplicate target modes within one category
//! keep the first occurrence and drop the rest with a warning; resolution
//! is therefore deterministic, never undefined.

pub mod manifest;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::manifest::CatalogManifest;

/// Errors from catalog loading and resolution.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The manifest is malformed or references missing files. Fatal at
    /// startup.
    #[error("failed to load catalog from {path}: {message}")]
    Load { path: String, message: String },

    /// No category with the given name exists. Never falls back to a
    /// default category.
    #[error("unknown category `{name}`")]
    UnknownCategory { name: String },

    /// The selector matched no target within the category.
    #[error("no target matching `{selector}` in category `{category}`")]
    TargetNotFound { category: String, selector: String },
}

/// A single reference face image that a user's face is swapped onto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetImage {
    /// Selection discriminator, unique within its category after load.
    pub mode: String,
    /// Display label.
    pub name: String,
    /// Absolute path of the image file.
    pub filepath: PathBuf,
}

/// A named, ordered collection of target images with one collage preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    /// Targets in manifest order (order is significant for
    /// selection-by-index).
    pub targets: Vec<TargetImage>,
    /// Absolute path of the collage preview image.
    pub collage_path: PathBuf,
}

/// The loaded, immutable catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    categories: Vec<Category>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Loads and validates a catalog from a TOML manifest file.
    ///
    /// Relative paths in the manifest are resolved against the manifest's
    /// parent directory. Fails fast and loudly on a malformed document, a
    /// category with zero targets, a duplicate category name, or a
    /// referenced file that does not exist.
    pub fn load(manifest_path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(manifest_path).map_err(|e| CatalogError::Load {
            path: manifest_path.display().to_string(),
            message: format!("cannot read manifest: {e}"),
        })?;

        let manifest: CatalogManifest =
            toml::from_str(&content).map_err(|e| CatalogError::Load {
                path: manifest_path.display().to_string(),
                message: format!("malformed manifest: {e}"),
            })?;

        let base_dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_manifest(manifest, base_dir, manifest_path)
    }

    fn from_manifest(
        manifest: CatalogManifest,
        base_dir: &Path,
        manifest_path: &Path,
    ) -> Result<Self, CatalogError> {
        let load_err = |message: String| CatalogError::Load {
            path: manifest_path.display().to_string(),
            message,
        };

        if manifest.categories.is_empty() {
            return Err(load_err("catalog defines no categories".into()));
        }

        let mut categories = Vec::with_capacity(manifest.categories.len());
        let mut index = HashMap::new();

        for category in manifest.categories {
            if category.targets.is_empty() {
                return Err(load_err(format!(
                    "category `{}` has zero targets",
                    category.name
                )));
            }

            if index.contains_key(&category.name) {
                return Err(load_err(format!(
                    "duplicate category name `{}`",
                    category.name
                )));
            }

            let collage_path = base_dir.join(&category.collage);
            if !collage_path.is_file() {
                return Err(load_err(format!(
                    "category `{}` references missing collage `{}`",
                    category.name,
                    collage_path.display()
                )));
            }

            let mut targets: Vec<TargetImage> = Vec::with_capacity(category.targets.len());
            for target in category.targets {
                if targets.iter().any(|t| t.mode == target.mode) {
                    // First occurrence wins; later duplicates are dropped.
                    warn!(
                        category = %category.name,
                        mode = %target.mode,
                        "duplicate target mode, keeping first occurrence"
                    );
                    continue;
                }

                let filepath = base_dir.join(&target.file);
                if !filepath.is_file() {
                    return Err(load_err(format!(
                        "target `{}/{}` references missing file `{}`",
                        category.name,
                        target.mode,
                        filepath.display()
                    )));
                }

                targets.push(TargetImage {
                    mode: target.mode,
                    name: target.name,
                    filepath,
                });
            }

            index.insert(category.name.clone(), categories.len());
            categories.push(Category {
                name: category.name,
                targets,
                collage_path,
            });
        }

        debug!(
            categories = categories.len(),
            targets = categories.iter().map(|c| c.targets.len()).sum::<usize>(),
            "catalog loaded"
        );

        Ok(Self { categories, index })
    }

    /// Looks up a category by name.
    pub fn get_category(&self, name: &str) -> Result<&Category, CatalogError> {
        self.index
            .get(name)
            .map(|&i| &self.categories[i])
            .ok_or_else(|| CatalogError::UnknownCategory { name: name.into() })
    }

    /// Resolves a target within a category.
    ///
    /// `selector` is matched against target modes first; a selector that
    /// matches no mode but parses as a number is treated as a zero-based
    /// index into the category's ordered targets. `None` selects the first
    /// target.
    pub fn resolve_target(
        &self,
        category_name: &str,
        selector: Option<&str>,
    ) -> Result<&TargetImage, CatalogError> {
        let category = self.get_category(category_name)?;

        let Some(selector) = selector else {
            // Categories are validated non-empty at load time.
            return Ok(&category.targets[0]);
        };

        if let Some(target) = category.targets.iter().find(|t| t.mode == selector) {
            return Ok(target);
        }

        if let Ok(idx) = selector.parse::<usize>()
            && let Some(target) = category.targets.get(idx)
        {
            return Ok(target);
        }

        Err(CatalogError::TargetNotFound {
            category: category_name.into(),
            selector: selector.into(),
        })
    }

    /// Lists categories in manifest order with their collage previews.
    pub fn list_categories(&self) -> Vec<(&str, &Path)> {
        self.categories
            .iter()
            .map(|c| (c.name.as_str(), c.collage_path.as_path()))
            .collect()
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// True if the catalog holds no categories (unreachable after a
    /// successful load, but kept for API completeness).
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
