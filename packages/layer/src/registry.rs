//! Compile-time registry of layer definitions.
//!
//! Each layer is defined in a TOML file under `layers/`. The registry
//! embeds these at compile time and exposes them via [`all_definitions`]
//! and [`definition`].

use std::sync::LazyLock;

use kartlag_layer_models::{Layer, LayerDefinition};

// ── Compile-time embedded TOML files ────────────────────────────────

const LAYER_TOMLS: &[(&str, &str)] = &[
    ("vindkraftverk", include_str!("../layers/vindkraftverk.toml")),
    ("flomsoner", include_str!("../layers/flomsoner.toml")),
    ("sykehus", include_str!("../layers/sykehus.toml")),
    ("politi_fengsel", include_str!("../layers/politi_fengsel.toml")),
    ("brann_ambulanse", include_str!("../layers/brann_ambulanse.toml")),
];

static DEFINITIONS: LazyLock<Vec<LayerDefinition>> = LazyLock::new(|| {
    LAYER_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse layer definition '{name}': {e}"))
        })
        .collect()
});

/// Returns every layer definition, in [`Layer::ALL`] order.
///
/// # Panics
///
/// Panics if any TOML definition is malformed (the definitions are
/// embedded, so this is caught by the tests).
#[must_use]
pub fn all_definitions() -> &'static [LayerDefinition] {
    &DEFINITIONS
}

/// Returns the definition of `layer`.
///
/// # Panics
///
/// Panics if `layer` has no embedded definition (caught by the tests).
#[must_use]
pub fn definition(layer: Layer) -> &'static LayerDefinition {
    DEFINITIONS
        .iter()
        .find(|d| d.id == layer)
        .unwrap_or_else(|| panic!("No layer definition for '{layer}'"))
}
