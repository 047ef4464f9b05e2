// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Filtered content: native `<filter>`/`<mask>` definitions, or a raster
//! fallback, as the configured [`FilterOperation`] dictates.

use kurbo::{Rect, Size};
use understory_graphics::{
    Graphics, GraphicsContext, GraphicsError, GraphicsResult, ImageFilter, matrix, raster,
};

use crate::context::SvgContext;
use crate::fmt::{self, num};
use crate::options::FilterOperation;
use crate::xml::Element;

/// What happens to one filtered draw.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum FilterAction {
    /// Written as SVG filter or mask definitions.
    Native,
    /// Rendered to pixels, filtered there, and embedded as an image.
    Rasterize,
    /// Content drawn without the filter.
    Unfiltered,
    /// Content dropped.
    Skip,
}

pub(crate) fn filter_action(operation: FilterOperation, filter: &ImageFilter) -> FilterAction {
    let native = filter.is_native();
    match operation {
        FilterOperation::RasterizeAll => FilterAction::Rasterize,
        FilterOperation::RasterizeIfNecessary if native => FilterAction::Native,
        FilterOperation::RasterizeIfNecessary => FilterAction::Rasterize,
        FilterOperation::NeverRasterizeAndIgnore if native => FilterAction::Native,
        FilterOperation::NeverRasterizeAndIgnore | FilterOperation::IgnoreAll => {
            FilterAction::Unfiltered
        }
        FilterOperation::NeverRasterizeAndSkip if native => FilterAction::Native,
        FilterOperation::NeverRasterizeAndSkip | FilterOperation::SkipAll => FilterAction::Skip,
    }
}

/// Leaf filters of `filter` in application order.
fn flatten<'a>(filter: &'a ImageFilter, out: &mut Vec<&'a ImageFilter>) {
    match filter {
        ImageFilter::Composite(parts) => parts.iter().for_each(|part| flatten(part, out)),
        other => out.push(other),
    }
}

fn region_element(name: &str, id: &str, units: &str, region: Rect) -> Element {
    Element::new(name)
        .with_attr("id", id)
        .with_attr(units, "userSpaceOnUse")
        .with_attr("x", num(region.x0))
        .with_attr("y", num(region.y0))
        .with_attr("width", num(region.width()))
        .with_attr("height", num(region.height()))
}

impl SvgContext {
    pub(crate) fn draw_filtered(
        &mut self,
        graphics: &Graphics,
        filter: &ImageFilter,
    ) -> GraphicsResult<()> {
        match filter_action(self.options.filters.operation, filter) {
            FilterAction::Native => self.draw_native_filter(graphics, filter),
            FilterAction::Rasterize => self.draw_rasterized(graphics, filter),
            FilterAction::Unfiltered => {
                tracing::debug!(filter = filter.name(), "filter ignored by policy");
                self.replay_nested(graphics)
            }
            FilterAction::Skip => {
                tracing::debug!(filter = filter.name(), "filtered content skipped by policy");
                Ok(())
            }
        }
    }

    /// Wraps the content in one group per filter stage. Regions are in
    /// document space since every element carries its full transform.
    fn draw_native_filter(
        &mut self,
        graphics: &Graphics,
        filter: &ImageFilter,
    ) -> GraphicsResult<()> {
        let Some(bounds) = graphics.bounds() else {
            return Ok(());
        };
        let mut content = Element::new("g");
        content.children = self.render_group(graphics)?;

        let transform = self.current_transform();
        let scale = matrix::uniform_scale(transform);
        let tag = self.state.tag.clone();
        let mut stages = Vec::new();
        flatten(filter, &mut stages);
        let mut margin = 0.0;
        for stage in stages {
            margin += stage.margin();
            let region = transform.transform_rect_bbox(bounds.inflate(margin, margin));
            let (attr, def) = match stage {
                ImageFilter::GaussianBlur { std_dev } => {
                    let id = self.ids.next("filter", tag.as_deref());
                    let blur = Element::new("feGaussianBlur")
                        .with_attr("stdDeviation", num(std_dev.abs() * scale));
                    let def = region_element("filter", &id, "filterUnits", region)
                        .with_attr("color-interpolation-filters", "sRGB")
                        .with_child(blur);
                    ("filter", def)
                }
                ImageFilter::ColorMatrix(values) => {
                    let id = self.ids.next("filter", tag.as_deref());
                    let matrix = Element::new("feColorMatrix")
                        .with_attr("type", "matrix")
                        .with_attr("values", fmt::nums(values.iter().map(|v| f64::from(*v))));
                    let def = region_element("filter", &id, "filterUnits", region)
                        .with_attr("color-interpolation-filters", "sRGB")
                        .with_child(matrix);
                    ("filter", def)
                }
                ImageFilter::Mask(mask) => {
                    let id = self.ids.next("mask", tag.as_deref());
                    let mut def = region_element("mask", &id, "maskUnits", region);
                    def.children = self.render_group(mask)?;
                    ("mask", def)
                }
                other => {
                    tracing::debug!(filter = other.name(), "stage has no SVG form; dropped");
                    continue;
                }
            };
            let url = format!("url(#{})", def.attr("id").unwrap_or_default());
            self.defs.push(def.into());
            if content.attr("filter").is_some() || content.attr("mask").is_some() {
                content = Element::new("g").with_child(content);
            }
            content.set_attr(attr, url);
        }
        self.emit(content);
        Ok(())
    }

    fn draw_rasterized(&mut self, graphics: &Graphics, filter: &ImageFilter) -> GraphicsResult<()> {
        let rasterizer = self
            .options
            .rasterizer
            .clone()
            .ok_or(GraphicsError::RasterizerUnavailable {
                filter: filter.name(),
            })?;
        let Some(bounds) = graphics.bounds() else {
            return Ok(());
        };
        let margin = filter.margin();
        let region = bounds.inflate(margin, margin);
        let scale = self
            .options
            .filters
            .scale(matrix::uniform_scale(self.current_transform()));
        tracing::debug!(filter = filter.name(), scale, "rasterizing filtered content");
        let image = rasterizer.rasterize(graphics, region, scale)?;
        let image = raster::apply_filter(rasterizer.as_ref(), image, filter, region, scale)?;
        // The pixel grid rounds up, so the image can be slightly larger
        // than the region.
        let dest = if scale.is_finite() && scale > 0.0 {
            let size = Size::new(
                f64::from(image.width()) / scale,
                f64::from(image.height()) / scale,
            );
            Rect::from_origin_size(region.origin(), size)
        } else {
            region
        };
        self.draw_raster_image(&image, None, dest);
        Ok(())
    }
}
