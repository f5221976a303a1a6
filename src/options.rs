// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::time::Duration;

use svgbridge_gvt::{ImageRendering, ShapeRendering, Size};

use crate::SecurityPolicy;

/// Document processing mode.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Dynamic {
    /// The tree is built once. No bindings are kept.
    Static,
    /// Element and node bindings are kept, e.g. for hit testing,
    /// but the tree is never updated.
    Interactive,
    /// Bindings are kept and the tree follows document mutations.
    Dynamic,
}

impl Dynamic {
    /// Checks that element and node bindings should be kept.
    #[inline]
    pub fn keeps_bindings(self) -> bool {
        self != Dynamic::Static
    }
}

impl Default for Dynamic {
    fn default() -> Self {
        Dynamic::Static
    }
}

impl std::str::FromStr for Dynamic {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(Dynamic::Static),
            "interactive" => Ok(Dynamic::Interactive),
            "dynamic" => Ok(Dynamic::Dynamic),
            _ => Err("invalid document mode"),
        }
    }
}

/// Processing options.
#[derive(Clone, Debug)]
pub struct Options {
    /// Directory that will be used during relative paths resolving.
    ///
    /// Expected to be the same as the directory that contains the SVG file,
    /// but can be set to any.
    ///
    /// Default: `None`
    pub resources_dir: Option<std::path::PathBuf>,

    /// Target DPI.
    ///
    /// Impacts units conversion.
    ///
    /// Default: 96.0
    pub dpi: f32,

    /// A default font family.
    ///
    /// Default: Times New Roman
    pub font_family: String,

    /// A default font size.
    ///
    /// Will be used when no `font-size` attribute is set in the SVG.
    ///
    /// Default: 12
    pub font_size: f32,

    /// A list of languages.
    ///
    /// Will be used to resolve a `systemLanguage` conditional attribute.
    ///
    /// Format: en, en-US.
    ///
    /// Default: `[en]`
    pub languages: Vec<String>,

    /// Specifies the default shape rendering method.
    ///
    /// Will be used when an SVG element's `shape-rendering` property is set to `auto`.
    ///
    /// Default: GeometricPrecision
    pub shape_rendering: ShapeRendering,

    /// Specifies the default image rendering method.
    ///
    /// Will be used when an SVG element's `image-rendering` property is set to `auto`.
    ///
    /// Default: OptimizeQuality
    pub image_rendering: ImageRendering,

    /// Default viewport size to assume if there is no `viewBox` attribute and
    /// the `width` or `height` attributes are relative.
    ///
    /// Default: `(100, 100)`
    pub default_size: Size,

    /// Document processing mode.
    ///
    /// Default: `Static`
    pub dynamic: Dynamic,

    /// A policy applied before loading any external resource.
    ///
    /// Default: `SameOrigin`
    pub security: SecurityPolicy,

    /// How often the repaint thread checks for pending changes.
    ///
    /// Values below 20 ms are raised to 20 ms.
    ///
    /// Default: 20 ms
    pub repaint_interval: Duration,

    /// Maximum length of a reference chain, like nested `use` or `href` chains.
    ///
    /// Default: 64
    pub max_reference_depth: usize,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            resources_dir: None,
            dpi: 96.0,
            // Default font is user-agent dependent so we can use whichever we like.
            font_family: "Times New Roman".to_owned(),
            font_size: 12.0,
            languages: vec!["en".to_string()],
            shape_rendering: ShapeRendering::default(),
            image_rendering: ImageRendering::default(),
            default_size: Size::from_wh(100.0, 100.0).unwrap(),
            dynamic: Dynamic::default(),
            security: SecurityPolicy::default(),
            repaint_interval: MIN_REPAINT_INTERVAL,
            max_reference_depth: 64,
        }
    }
}

/// The shortest repaint interval.
pub const MIN_REPAINT_INTERVAL: Duration = Duration::from_millis(20);

impl Options {
    /// Converts a relative path into absolute relative to the SVG file itself.
    ///
    /// If `Options::resources_dir` is not set, returns itself.
    pub fn get_abs_path(&self, rel_path: &std::path::Path) -> std::path::PathBuf {
        match self.resources_dir {
            Some(ref dir) => dir.join(rel_path),
            None => rel_path.into(),
        }
    }

    /// Returns the repaint interval, clamped to the supported minimum.
    pub fn repaint_interval(&self) -> Duration {
        self.repaint_interval.max(MIN_REPAINT_INTERVAL)
    }
}
