use crate::styles::{Background, Shading, Stroke, StyleKey, UnknownStyle};

/// Canvas/background/format constraints shared by every item and style.
const GLOBAL_CONSTRAINTS: &str = "512x512 pixels, square aspect ratio, flat solid #F5F5F5 \
    background, professional icon design, high clarity, ABSOLUTELY NO TEXT OR LABELS, \
    single object only, clean design, no people, no hands, no multiple objects";

/// Exclusions shared by every item and style, ahead of the style's own list.
const GLOBAL_NEGATIVES: &str = "no text, no letters, no numbers, no labels, no words, \
    no background color drift, no size drift";

/// A fully composed generation instruction for one item. Pure function of
/// (item, style): identical inputs always yield byte-identical strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconPrompt {
    pub item: String,
    pub style: StyleKey,
    pub positive: String,
    pub negative: String,
}

impl IconPrompt {
    /// The single instruction string sent to the generator, with the
    /// exclusion list folded in the way Flux Schnell expects.
    pub fn render(&self) -> String {
        format!("{}, negative: {}", self.positive, self.negative)
    }
}

/// Composes the three positive layers (item, style, global) and the negative
/// list for one item. Fails loudly on a style key outside the preset table;
/// that is a caller bug, never something to paper over with a default style.
pub fn compose(item: &str, style: &str) -> Result<IconPrompt, UnknownStyle> {
    let key: StyleKey = style.parse()?;
    let preset = key.preset();

    let item_layer = format!("{item} icon, realistic and recognizable structure");
    let style_layer = preset.fragment.replace("{ITEM}", item);

    // The rendering hints keep the set consistent with itself: badge styles
    // size by the badge, 3D styles need a shared camera, everything else
    // holds the canvas fraction steady.
    let consistency = match (preset.background, preset.shading) {
        (Background::Badge, _) => {
            "part of cohesive 8-icon set, identical badge size across the whole set"
        }
        (_, Shading::ThreeD) => {
            "part of cohesive 8-icon set, consistent camera angle and lighting across the whole set"
        }
        _ => {
            "part of cohesive 8-icon set, item occupies the same canvas fraction across the whole set"
        }
    };
    let stroke_directive = match preset.stroke {
        Stroke::None => None,
        Stroke::Thin => Some("uniform thin outline weight across the set"),
        Stroke::Medium => Some("uniform medium outline weight across the set"),
    };

    let mut parts = vec![item_layer.as_str(), style_layer.as_str(), consistency];
    if let Some(directive) = stroke_directive {
        parts.push(directive);
    }
    parts.push(GLOBAL_CONSTRAINTS);
    let positive = parts.join(", ");

    let negative = format!("{GLOBAL_NEGATIVES}, {}", preset.negatives);

    Ok(IconPrompt {
        item: item.to_string(),
        style: key,
        positive,
        negative,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn compose_is_deterministic() {
        let a = compose("stapler", "Business").unwrap();
        let b = compose("stapler", "Business").unwrap();
        assert_eq!(a.positive, b.positive);
        assert_eq!(a.negative, b.negative);
    }

    #[test]
    fn compose_substitutes_the_item_into_the_style_fragment() {
        let p = compose("guitar", "Cartoon").unwrap();
        assert!(p.positive.contains("cartoon icon of guitar"));
        assert!(!p.positive.contains("{ITEM}"));
    }

    #[test]
    fn compose_layers_in_order() {
        let p = compose("pen", "Gradient").unwrap();
        let item_at = p.positive.find("pen icon").unwrap();
        let style_at = p.positive.find("gradient vector icon").unwrap();
        let global_at = p.positive.find("512x512 pixels").unwrap();
        assert!(item_at < style_at && style_at < global_at);
    }

    #[test]
    fn negative_combines_global_and_style_exclusions() {
        let p = compose("ruler", "ThreeDModel").unwrap();
        assert!(p.negative.starts_with("no text, no letters"));
        assert!(p.negative.ends_with("no harsh reflections"));
    }

    #[test]
    fn rendering_hints_shape_the_directives() {
        let business = compose("pen", "Business").unwrap();
        assert!(business.positive.contains("identical badge size"));
        assert!(!business.positive.contains("outline weight"));

        let cartoon = compose("pen", "Cartoon").unwrap();
        assert!(cartoon.positive.contains("uniform medium outline weight"));

        let three_d = compose("pen", "ThreeDModel").unwrap();
        assert!(three_d.positive.contains("consistent camera angle and lighting"));
    }

    #[test]
    fn unknown_style_is_a_typed_error() {
        let err = compose("pen", "NotARealStyle").unwrap_err();
        assert_eq!(err.to_string(), "Unknown style: NotARealStyle");
    }

    #[test]
    fn render_folds_the_negative_list_into_one_instruction() {
        let p = compose("folder", "Business").unwrap();
        let rendered = p.render();
        assert_eq!(rendered, format!("{}, negative: {}", p.positive, p.negative));
    }
}
