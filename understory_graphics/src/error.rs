// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Convenience result type for drawing operations that can fail.
pub type GraphicsResult<T> = Result<T, GraphicsError>;

/// Errors raised by fallible drawing operations.
#[derive(thiserror::Error, Debug)]
pub enum GraphicsError {
    /// A filter had to be rasterized, but no rasterizer was configured.
    #[error(
        "filter `{filter}` must be rasterized but no rasterizer is configured; \
         supply one with `SvgOptions::with_rasterizer`, or choose a filter operation \
         that never rasterizes (`NeverRasterizeAndIgnore`, `NeverRasterizeAndSkip`, \
         `IgnoreAll` or `SkipAll`)"
    )]
    RasterizerUnavailable {
        /// Name of the filter that needed rasterization.
        filter: &'static str,
    },

    /// The rasterizer failed.
    #[error("rasterization error: {0}")]
    Rasterization(String),

    /// Encoding a raster image failed.
    #[error("image encoding error: {0}")]
    ImageEncoding(String),

    /// A raster image had inconsistent dimensions or data.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

impl GraphicsError {
    /// Build a [`GraphicsError::Rasterization`] value.
    pub fn rasterization(msg: impl Into<String>) -> Self {
        Self::Rasterization(msg.into())
    }

    /// Build a [`GraphicsError::ImageEncoding`] value.
    pub fn image_encoding(msg: impl Into<String>) -> Self {
        Self::ImageEncoding(msg.into())
    }

    /// Build a [`GraphicsError::InvalidImage`] value.
    pub fn invalid_image(msg: impl Into<String>) -> Self {
        Self::InvalidImage(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            GraphicsError::rasterization("x")
                .to_string()
                .starts_with("rasterization error:")
        );
        assert!(
            GraphicsError::invalid_image("x")
                .to_string()
                .starts_with("invalid image:")
        );
    }

    #[test]
    fn missing_rasterizer_names_the_knobs() {
        let msg = GraphicsError::RasterizerUnavailable {
            filter: "box blur",
        }
        .to_string();
        assert!(msg.contains("box blur"), "{msg}");
        assert!(msg.contains("with_rasterizer"), "{msg}");
        assert!(msg.contains("NeverRasterizeAndSkip"), "{msg}");
    }
}
