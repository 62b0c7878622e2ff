use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown style: {0}")]
pub struct UnknownStyle(pub String);

/// The fixed set of visual treatments. Every key has exactly one preset;
/// anything outside this set is rejected at parse time, never defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleKey {
    Business,
    Cartoon,
    ThreeDModel,
    Gradient,
}

impl StyleKey {
    pub const ALL: [StyleKey; 4] = [
        StyleKey::Business,
        StyleKey::Cartoon,
        StyleKey::ThreeDModel,
        StyleKey::Gradient,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StyleKey::Business => "Business",
            StyleKey::Cartoon => "Cartoon",
            StyleKey::ThreeDModel => "ThreeDModel",
            StyleKey::Gradient => "Gradient",
        }
    }

    pub fn preset(&self) -> &'static StylePreset {
        match self {
            StyleKey::Business => &BUSINESS,
            StyleKey::Cartoon => &CARTOON,
            StyleKey::ThreeDModel => &THREE_D_MODEL,
            StyleKey::Gradient => &GRADIENT,
        }
    }
}

impl FromStr for StyleKey {
    type Err = UnknownStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Business" => Ok(StyleKey::Business),
            "Cartoon" => Ok(StyleKey::Cartoon),
            "ThreeDModel" => Ok(StyleKey::ThreeDModel),
            "Gradient" => Ok(StyleKey::Gradient),
            other => Err(UnknownStyle(other.to_string())),
        }
    }
}

impl fmt::Display for StyleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    Plain,
    Badge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stroke {
    None,
    Thin,
    Medium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shading {
    Flat,
    Soft,
    ThreeD,
}

/// Visual rules for one style. `fragment` carries an `{ITEM}` placeholder the
/// composer substitutes; the rendering hints keep the fragment and the global
/// constraints consistent with each other.
#[derive(Debug)]
pub struct StylePreset {
    pub display_label: &'static str,
    pub fragment: &'static str,
    pub negatives: &'static str,
    pub background: Background,
    pub stroke: Stroke,
    pub shading: Shading,
}

static BUSINESS: StylePreset = StylePreset {
    display_label: "Business",
    fragment: "professional glyph icon of {ITEM}, white symbol on circular badge, \
               high contrast, crisp vector edges, balanced margins, minimal decoration",
    negatives: "no cute faces, no sketchy texture, no 3D render, no drop shadows",
    background: Background::Badge,
    stroke: Stroke::None,
    shading: Shading::Flat,
};

static CARTOON: StylePreset = StylePreset {
    display_label: "Cartoon",
    fragment: "cartoon icon of {ITEM} with rounded proportions, friendly expression \
               optional, soft highlights and shadows, warm approachable palette, thicker outline",
    negatives: "no complex scene, no hard-edged geometry, no photoreal materials",
    background: Background::Plain,
    stroke: Stroke::Medium,
    shading: Shading::Soft,
};

static THREE_D_MODEL: StylePreset = StylePreset {
    display_label: "3D Model",
    fragment: "3D icon of {ITEM}, beveled edges, soft studio lighting, subtle ambient \
               occlusion, clean smooth materials, single object, neutral background, high clarity",
    negatives: "no busy environment, no noisy texture, no text or watermark, no harsh reflections",
    background: Background::Plain,
    stroke: Stroke::None,
    shading: Shading::ThreeD,
};

static GRADIENT: StylePreset = StylePreset {
    display_label: "Gradient",
    fragment: "gradient vector icon of {ITEM} with smooth 2-3 color gradient fill, \
               crisp silhouette, very thin or no outline, modern minimal look",
    negatives: "no inner shadows, no 3D shading, no texture noise, no heavy outlines",
    background: Background::Plain,
    stroke: Stroke::Thin,
    shading: Shading::Flat,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_parses_back_to_itself() {
        for key in StyleKey::ALL {
            assert_eq!(key.as_str().parse::<StyleKey>(), Ok(key));
        }
    }

    #[test]
    fn unknown_style_names_the_offender() {
        let err = "NotARealStyle".parse::<StyleKey>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown style: NotARealStyle");
    }

    #[test]
    fn every_fragment_carries_the_item_placeholder() {
        for key in StyleKey::ALL {
            assert!(
                key.preset().fragment.contains("{ITEM}"),
                "{} fragment missing placeholder",
                key
            );
        }
    }

    #[test]
    fn presets_are_distinct() {
        assert_eq!(StyleKey::Business.preset().display_label, "Business");
        assert_eq!(StyleKey::ThreeDModel.preset().display_label, "3D Model");
        assert_eq!(StyleKey::Cartoon.preset().stroke, Stroke::Medium);
        assert_eq!(StyleKey::Gradient.preset().shading, Shading::Flat);
    }
}
