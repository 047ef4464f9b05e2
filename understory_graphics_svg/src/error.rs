// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use understory_graphics::GraphicsError;

/// Convenience result type for SVG document construction.
pub type SvgResult<T> = Result<T, SvgError>;

/// Errors raised while building SVG documents.
#[derive(thiserror::Error, Debug)]
pub enum SvgError {
    /// A drawing operation failed, typically a filter that could not be
    /// rasterized.
    #[error(transparent)]
    Graphics(#[from] GraphicsError),

    /// A CSS declaration list could not be parsed.
    #[error("invalid style declaration: {0}")]
    InvalidStyle(String),

    /// The animation cannot be serialized.
    #[error("invalid animation: {0}")]
    InvalidAnimation(String),
}

impl SvgError {
    /// Build a [`SvgError::InvalidStyle`] value.
    pub fn invalid_style(msg: impl Into<String>) -> Self {
        Self::InvalidStyle(msg.into())
    }

    /// Build a [`SvgError::InvalidAnimation`] value.
    pub fn invalid_animation(msg: impl Into<String>) -> Self {
        Self::InvalidAnimation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graphics_errors_pass_through() {
        let err: SvgError = GraphicsError::RasterizerUnavailable { filter: "mask" }.into();
        assert!(matches!(err, SvgError::Graphics(_)));
        assert!(err.to_string().contains("mask"), "{err}");
    }

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            SvgError::invalid_style("fill")
                .to_string()
                .starts_with("invalid style declaration:")
        );
    }
}
