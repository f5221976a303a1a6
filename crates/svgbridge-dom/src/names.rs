// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/// Checks that the attribute is a presentation attribute, aka a CSS property.
pub fn is_presentation(name: &str) -> bool {
    matches!(
        name,
        "alignment-baseline"
            | "baseline-shift"
            | "clip-path"
            | "clip-rule"
            | "color"
            | "color-interpolation"
            | "color-interpolation-filters"
            | "color-rendering"
            | "direction"
            | "display"
            | "dominant-baseline"
            | "fill"
            | "fill-opacity"
            | "fill-rule"
            | "filter"
            | "flood-color"
            | "flood-opacity"
            | "font-family"
            | "font-size"
            | "font-size-adjust"
            | "font-stretch"
            | "font-style"
            | "font-variant"
            | "font-weight"
            | "image-rendering"
            | "isolation"
            | "letter-spacing"
            | "lighting-color"
            | "marker-end"
            | "marker-mid"
            | "marker-start"
            | "mask"
            | "mask-type"
            | "mix-blend-mode"
            | "opacity"
            | "overflow"
            | "paint-order"
            | "pointer-events"
            | "shape-rendering"
            | "stop-color"
            | "stop-opacity"
            | "stroke"
            | "stroke-dasharray"
            | "stroke-dashoffset"
            | "stroke-linecap"
            | "stroke-linejoin"
            | "stroke-miterlimit"
            | "stroke-opacity"
            | "stroke-width"
            | "text-anchor"
            | "text-decoration"
            | "text-rendering"
            | "transform"
            | "unicode-bidi"
            | "visibility"
            | "word-spacing"
            | "writing-mode"
    )
}

/// Checks if the current attribute is inheritable.
pub fn is_inheritable(name: &str) -> bool {
    if is_presentation(name) {
        !is_non_inheritable(name)
    } else {
        false
    }
}

/// Checks that the attribute accepts the `inherit` keyword.
pub fn allows_inherit_value(name: &str) -> bool {
    is_presentation(name)
        && !matches!(
            name,
            "color-interpolation"
                | "color-rendering"
                | "font-size-adjust"
                | "isolation"
                | "lighting-color"
                | "mask-type"
                | "mix-blend-mode"
                | "paint-order"
                | "transform"
                | "unicode-bidi"
        )
}

fn is_non_inheritable(name: &str) -> bool {
    matches!(
        name,
        "alignment-baseline"
            | "baseline-shift"
            | "clip-path"
            | "display"
            | "dominant-baseline"
            | "filter"
            | "flood-color"
            | "flood-opacity"
            | "isolation"
            | "lighting-color"
            | "mask"
            | "mask-type"
            | "mix-blend-mode"
            | "opacity"
            | "overflow"
            | "stop-color"
            | "stop-opacity"
            | "text-decoration"
            | "transform"
    )
}

/// Returns the initial value of a presentation attribute.
///
/// Used to resolve `inherit` when no ancestor defines the property.
pub(crate) fn initial_value(name: &str) -> Option<&'static str> {
    let value = match name {
        "image-rendering" | "shape-rendering" | "text-rendering" => "auto",

        "clip-path" | "filter" | "marker-end" | "marker-mid" | "marker-start" | "mask"
        | "stroke" | "stroke-dasharray" | "text-decoration" => "none",

        "font-stretch" | "font-style" | "font-variant" | "font-weight" | "letter-spacing"
        | "word-spacing" => "normal",

        "fill" | "flood-color" | "stop-color" => "black",

        "fill-opacity" | "flood-opacity" | "opacity" | "stop-opacity" | "stroke-opacity" => "1",

        "clip-rule" | "fill-rule" => "nonzero",

        "baseline-shift" => "baseline",
        "color-interpolation-filters" => "linearRGB",
        "direction" => "ltr",
        "display" => "inline",
        "font-size" => "medium",
        "overflow" => "visible",
        "pointer-events" => "visiblePainted",
        "stroke-dashoffset" => "0",
        "stroke-linecap" => "butt",
        "stroke-linejoin" => "miter",
        "stroke-miterlimit" => "4",
        "stroke-width" => "1",
        "text-anchor" => "start",
        "visibility" => "visible",
        "writing-mode" => "lr-tb",
        _ => return None,
    };

    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_is_inheritable() {
        assert!(is_inheritable("fill"));
        assert!(!is_inheritable("opacity"));
        assert!(!is_inheritable("cx"));
    }

    #[test]
    fn inherit_fallbacks() {
        assert_eq!(initial_value("stroke-width"), Some("1"));
        assert_eq!(initial_value("cx"), None);
    }
}
