// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline placement of task bars.
//!
//! Just enough layout to give the dependency graph real connector
//! geometry: one bar per task, rows stacked below a header.

use crate::scenario::ScheduledTask;
use egui::{Pos2, Rect, Vec2};
use ganttlink_graph::BoundsResolver;

const ROW_HEIGHT: f32 = 28.0;
const ROW_HEADER_WIDTH: f32 = 200.0;
const TIMELINE_HEADER_HEIGHT: f32 = 32.0;
const BAR_PADDING: f32 = 4.0;
const MIN_ZOOM: f32 = 5.0;
const MAX_ZOOM: f32 = 500.0;

/// Maps task times and rows to screen rectangles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineLayout {
    /// Pixels per time unit
    pub zoom: f32,
    /// First visible time
    pub scroll_offset: f32,
    /// Vertical scroll (pixels)
    pub vertical_scroll: f32,
}

impl Default for TimelineLayout {
    fn default() -> Self {
        Self {
            zoom: 40.0,
            scroll_offset: 0.0,
            vertical_scroll: 0.0,
        }
    }
}

impl TimelineLayout {
    /// Set the zoom, clamped to the supported range
    pub fn with_zoom(mut self, zoom: f32) -> Self {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self
    }

    /// Convert time to x position
    pub fn time_to_x(&self, time: f32) -> f32 {
        (time - self.scroll_offset) * self.zoom + ROW_HEADER_WIDTH
    }

    /// Top of a row
    pub fn row_to_y(&self, row: usize) -> f32 {
        TIMELINE_HEADER_HEIGHT + row as f32 * ROW_HEIGHT - self.vertical_scroll
    }

    /// Screen rectangle of a task's bar
    pub fn bar_rect(&self, task: &ScheduledTask) -> Rect {
        let left = self.time_to_x(task.start);
        let right = self.time_to_x(task.start + task.duration.max(0.0));
        Rect::from_min_size(
            Pos2::new(left, self.row_to_y(task.row) + BAR_PADDING),
            Vec2::new(right - left, ROW_HEIGHT - 2.0 * BAR_PADDING),
        )
    }

    /// Lay out every task whose bar is at least partly right of the row headers
    pub fn resolver<'a>(&self, tasks: impl IntoIterator<Item = &'a ScheduledTask>) -> BoundsResolver {
        let mut resolver = BoundsResolver::new();
        for task in tasks {
            let rect = self.bar_rect(task);
            if rect.right() <= ROW_HEADER_WIDTH {
                tracing::debug!("Task {} is scrolled out of view", task.id);
                continue;
            }
            resolver.set_bounds(task.id.clone(), rect);
        }
        resolver
    }
}
