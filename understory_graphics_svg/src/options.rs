// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Configuration for SVG documents and animations.

use std::collections::HashMap;
use std::sync::Arc;

use understory_graphics::Rasterizer;

/// How text is written.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TextEmbedding {
    /// `<text>` elements with the complete font embedded.
    EmbedFull,
    /// `<text>` elements with a font subset covering the characters used.
    #[default]
    EmbedSubset,
    /// Glyph outlines as `<path>` elements.
    ConvertToPaths,
    /// `<text>` elements referring to system fonts, with a generic fallback.
    DoNotEmbed,
    /// One `<path>` per distinct glyph in `<defs>`, placed with `<use>`.
    ConvertToPathsViaGlyphs,
}

impl TextEmbedding {
    /// Whether text is written as `<text>` elements.
    pub fn writes_text_elements(self) -> bool {
        matches!(self, Self::EmbedFull | Self::EmbedSubset | Self::DoNotEmbed)
    }
}

/// How presentation attributes are attached to elements.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StyleMode {
    /// Attributes on each element.
    #[default]
    Inline,
    /// Shared CSS classes in a `<style>` block.
    Classes,
}

/// What to do with image filters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FilterOperation {
    /// Rasterize every filter, even those SVG can express.
    RasterizeAll,
    /// Write native filters; rasterize the rest.
    #[default]
    RasterizeIfNecessary,
    /// Write native filters; draw the content of the rest unfiltered.
    NeverRasterizeAndIgnore,
    /// Write native filters; drop the content of the rest.
    NeverRasterizeAndSkip,
    /// Draw all filtered content unfiltered.
    IgnoreAll,
    /// Drop all filtered content.
    SkipAll,
}

/// Filter handling and rasterization resolution.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilterPolicy {
    /// What to do with filters.
    pub operation: FilterOperation,
    /// Pixels per user unit, or a factor on the current transform's scale
    /// when [`resolution_is_relative`](Self::resolution_is_relative) is set.
    pub resolution: f64,
    /// Whether [`resolution`](Self::resolution) is relative.
    pub resolution_is_relative: bool,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            operation: FilterOperation::default(),
            resolution: 1.0,
            resolution_is_relative: true,
        }
    }
}

impl FilterPolicy {
    /// Pixels per user unit under a transform with `transform_scale`.
    pub fn scale(&self, transform_scale: f64) -> f64 {
        if self.resolution_is_relative {
            self.resolution * transform_scale
        } else {
            self.resolution
        }
    }
}

/// Options for [`graphics_to_svg`](crate::graphics_to_svg).
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SvgOptions {
    /// Text handling.
    pub text: TextEmbedding,
    /// Attribute placement.
    pub style: StyleMode,
    /// Emit each gradient object once and refer back to it.
    pub reuse_gradients: bool,
    /// Prefix for every generated id, for documents nested in others.
    pub tag_prefix: String,
    /// Link destinations by tag. Destinations starting with `#` point into
    /// the document and are prefixed like ids.
    pub links: HashMap<String, String>,
    /// Filter handling.
    pub filters: FilterPolicy,
    /// Renderer for filters that must be rasterized.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub rasterizer: Option<Arc<dyn Rasterizer>>,
}

impl SvgOptions {
    /// Sets the text handling.
    #[must_use]
    pub fn with_text(mut self, text: TextEmbedding) -> Self {
        self.text = text;
        self
    }

    /// Sets the attribute placement.
    #[must_use]
    pub fn with_style(mut self, style: StyleMode) -> Self {
        self.style = style;
        self
    }

    /// Enables or disables gradient reuse.
    #[must_use]
    pub fn with_reuse_gradients(mut self, reuse: bool) -> Self {
        self.reuse_gradients = reuse;
        self
    }

    /// Sets the id prefix.
    #[must_use]
    pub fn with_tag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tag_prefix = prefix.into();
        self
    }

    /// Links elements tagged `tag` to `destination`.
    #[must_use]
    pub fn with_link(mut self, tag: impl Into<String>, destination: impl Into<String>) -> Self {
        self.links.insert(tag.into(), destination.into());
        self
    }

    /// Sets the filter policy.
    #[must_use]
    pub fn with_filters(mut self, filters: FilterPolicy) -> Self {
        self.filters = filters;
        self
    }

    /// Sets the filter operation, keeping the resolution.
    #[must_use]
    pub fn with_filter_operation(mut self, operation: FilterOperation) -> Self {
        self.filters.operation = operation;
        self
    }

    /// Sets the rasterizer used for filters SVG cannot express.
    #[must_use]
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }
}

/// How an animation is turned into SVG.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AnimationMode {
    /// Sample at a fixed frame rate and flip between the samples.
    Discrete,
    /// Show frames and interpolate tagged elements during transitions.
    #[default]
    Continuous,
}

/// How often an animation plays.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RepeatCount {
    /// Loop forever.
    #[default]
    Indefinite,
    /// Play this many times, then hold the last frame.
    Times(u32),
}

impl RepeatCount {
    /// SMIL `repeatCount` value.
    pub fn to_smil(self) -> String {
        match self {
            Self::Indefinite => "indefinite".to_owned(),
            Self::Times(n) => n.to_string(),
        }
    }
}

/// Options for [`animation_to_svg`](crate::animation_to_svg).
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnimationOptions {
    /// Synthesis strategy.
    pub mode: AnimationMode,
    /// Samples per second in [`AnimationMode::Discrete`].
    pub frame_rate: f64,
    /// Repetition.
    pub repeat: RepeatCount,
    /// Append a play/pause button and a scrubber bar.
    pub controls: bool,
    /// Options for the frame documents. Class styling and gradient reuse are
    /// always off in animations.
    pub svg: SvgOptions,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            mode: AnimationMode::default(),
            frame_rate: 60.0,
            repeat: RepeatCount::default(),
            controls: false,
            svg: SvgOptions::default(),
        }
    }
}

impl AnimationOptions {
    /// Sets the synthesis strategy.
    #[must_use]
    pub fn with_mode(mut self, mode: AnimationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the sampling rate of discrete animations.
    #[must_use]
    pub fn with_frame_rate(mut self, frame_rate: f64) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    /// Sets the repetition.
    #[must_use]
    pub fn with_repeat(mut self, repeat: RepeatCount) -> Self {
        self.repeat = repeat;
        self
    }

    /// Enables or disables playback controls.
    #[must_use]
    pub fn with_controls(mut self, controls: bool) -> Self {
        self.controls = controls;
        self
    }

    /// Sets the frame document options.
    #[must_use]
    pub fn with_svg(mut self, svg: SvgOptions) -> Self {
        self.svg = svg;
        self
    }
}
