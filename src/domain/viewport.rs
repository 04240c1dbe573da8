//! Viewport: zoom level, pan offset and the model <-> screen transform.
//!
//! `screen = model * zoom + pan`. Zoom is always kept inside the configured
//! bounds; out-of-range requests are clamped, never rejected.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::domain::entities::{Point, Size};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Factor applied by one zoom-in / zoom-out step
    pub zoom_step: f64,
    /// Wheel delta units per e-fold of zoom
    pub wheel_sensitivity: f64,
    /// Padding around the content when fitting to screen
    pub fit_margin: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.3,
            max_zoom: 3.0,
            zoom_step: 1.2,
            wheel_sensitivity: 0.001,
            fit_margin: 50.0,
        }
    }
}

/// What the caller should do with the input event that was just handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    /// Handled here; suppress the host's default action (e.g. page scroll)
    Consumed,
    /// Not handled; let the host process it
    Ignored,
}

/// Axis-aligned box in model space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    /// Box covering every node rectangle anchored at `positions`.
    pub fn around_nodes(positions: impl IntoIterator<Item = Point>, node_size: Size) -> Option<Self> {
        positions.into_iter().fold(None, |acc, p| {
            let far = Point::new(p.x + node_size.width, p.y + node_size.height);
            Some(match acc {
                None => Bounds { min: p, max: far },
                Some(b) => Bounds {
                    min: Point::new(b.min.x.min(p.x), b.min.y.min(p.y)),
                    max: Point::new(b.max.x.max(far.x), b.max.y.max(far.y)),
                },
            })
        })
    }

    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            min: Point::new(self.min.x - margin, self.min.y - margin),
            max: Point::new(self.max.x + margin, self.max.y + margin),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    config: ViewportConfig,
    zoom: f64,
    pan: Point,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

impl Viewport {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            config,
            zoom: 1.0,
            pan: Point::ORIGIN,
        }
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pan(&self) -> Point {
        self.pan
    }

    pub fn set_pan(&mut self, pan: Point) {
        trace!(%pan, "set pan");
        self.pan = pan;
    }

    /// Set the zoom level, clamped to the configured bounds. NaN is ignored.
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_nan() {
            debug!("NaN zoom ignored");
            return;
        }
        let clamped = zoom.clamp(self.config.min_zoom, self.config.max_zoom);
        if clamped != zoom {
            debug!(requested = zoom, clamped, "zoom clamped");
        }
        self.zoom = clamped;
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * self.config.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom / self.config.zoom_step);
    }

    /// Continuous zoom from pointer-wheel input; positive delta zooms out.
    ///
    /// Always consumes the event so the host does not scroll.
    pub fn wheel_zoom(&mut self, delta: f64) -> EventDisposition {
        self.set_zoom(self.zoom * (-delta * self.config.wheel_sensitivity).exp());
        EventDisposition::Consumed
    }

    /// Scale and center so every node is on screen, never zooming past 1.0.
    ///
    /// Returns false, leaving the view untouched, when there are no nodes or
    /// the viewport has no usable area.
    #[instrument(level = "debug", skip(self, positions))]
    pub fn fit_to_screen(
        &mut self,
        positions: impl IntoIterator<Item = Point>,
        node_size: Size,
        viewport: Size,
    ) -> bool {
        let Some(bounds) = Bounds::around_nodes(positions, node_size) else {
            debug!("no visible nodes, fit skipped");
            return false;
        };
        let usable = |v: f64| v.is_finite() && v > 0.0;
        if !(usable(viewport.width) && usable(viewport.height)) {
            debug!(?viewport, "viewport has no area, fit skipped");
            return false;
        }
        let bounds = bounds.expanded(self.config.fit_margin);

        let scale = (viewport.width / bounds.width())
            .min(viewport.height / bounds.height())
            .min(1.0);
        if !usable(scale) {
            debug!(scale, "degenerate fit skipped");
            return false;
        }
        self.set_zoom(scale);

        let zoom = self.zoom;
        self.pan = Point::new(
            (viewport.width - bounds.width() * zoom) / 2.0 - bounds.min.x * zoom,
            (viewport.height - bounds.height() * zoom) / 2.0 - bounds.min.y * zoom,
        );
        debug!(zoom, pan = %self.pan, "fitted to screen");
        true
    }

    pub fn reset_view(&mut self) {
        self.zoom = 1.0;
        self.pan = Point::ORIGIN;
    }

    /// Pan so the center of the node at `position` sits in the viewport center.
    pub fn focus_on(&mut self, position: Point, node_size: Size, viewport: Size) {
        let center = Point::new(
            position.x + node_size.width / 2.0,
            position.y + node_size.height / 2.0,
        );
        self.pan = Point::new(
            viewport.width / 2.0 - center.x * self.zoom,
            viewport.height / 2.0 - center.y * self.zoom,
        );
    }

    pub fn to_screen(&self, model: Point) -> Point {
        Point::new(
            model.x * self.zoom + self.pan.x,
            model.y * self.zoom + self.pan.y,
        )
    }

    pub fn to_model(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.pan.x) / self.zoom,
            (screen.y - self.pan.y) / self.zoom,
        )
    }
}
