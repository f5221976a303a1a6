// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Conditional processing attributes.

use svgbridge_dom::SvgNode;

use crate::BridgeContext;

/// Checks `requiredExtensions`, `requiredFeatures` and `systemLanguage`.
///
/// Elements without these attributes always pass.
pub(crate) fn is_condition_passed(ctx: &BridgeContext, element: SvgNode) -> bool {
    if !element.is_element() {
        return false;
    }

    // An empty list is always `false`.
    if let Some(value) = element.raw_attribute("requiredExtensions") {
        let mut names = value.split_whitespace().peekable();
        if names.peek().is_none() || !names.all(|name| ctx.has_extension(name)) {
            return false;
        }
    }

    if let Some(value) = element.raw_attribute("requiredFeatures") {
        let mut features = value.split_whitespace().peekable();
        if features.peek().is_none() || !features.all(|f| ctx.user_agent.has_feature(f)) {
            return false;
        }
    }

    match element.raw_attribute("systemLanguage") {
        Some(value) => is_valid_sys_lang(ctx, value),
        None => true,
    }
}

// 'The attribute value is a comma-separated list of language names...'
//
// 'Evaluates to "true" if one of the languages indicated by user preferences exactly
// equals one of the languages given in the value of this parameter, or if one of
// the languages indicated by user preferences exactly equals a prefix of one of
// the languages given in the value of this parameter such that the first tag
// character following the prefix is "-".'
fn is_valid_sys_lang(ctx: &BridgeContext, value: &str) -> bool {
    let languages = if ctx.opt.languages.is_empty() {
        ctx.user_agent.languages()
    } else {
        ctx.opt.languages.clone()
    };

    value.split(',').map(str::trim).any(|lang| {
        if languages.iter().any(|l| l == lang) {
            return true;
        }

        match lang.split_once('-') {
            Some((prefix, _)) => languages.iter().any(|l| l == prefix),
            None => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Options;
    use svgbridge_dom::Document;

    fn passes(attrs: &str, languages: &[&str]) -> bool {
        let text = format!(
            "<svg xmlns='http://www.w3.org/2000/svg'><rect id='r' {}/></svg>",
            attrs
        );
        let doc = Document::parse_str(&text).unwrap();
        let opt = Options {
            languages: languages.iter().map(|s| s.to_string()).collect(),
            ..Options::default()
        };
        let ctx = BridgeContext::new(opt);
        is_condition_passed(&ctx, doc.element_by_id("r").unwrap())
    }

    #[test]
    fn system_language() {
        assert!(passes("", &["en"]));
        assert!(passes("systemLanguage='en'", &["en"]));
        assert!(passes("systemLanguage='ru, en-US'", &["en"]));
        assert!(!passes("systemLanguage='en'", &["ru"]));
        assert!(!passes("systemLanguage=''", &["en"]));
    }

    #[test]
    fn features_and_extensions() {
        assert!(passes(
            "requiredFeatures='http://www.w3.org/TR/SVG11/feature#Shape'",
            &["en"]
        ));
        assert!(!passes("requiredFeatures='http://example.com/#Unknown'", &["en"]));
        assert!(!passes("requiredFeatures=''", &["en"]));
        assert!(!passes("requiredExtensions='http://example.com/ext'", &["en"]));
    }
}
