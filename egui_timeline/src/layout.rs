//! 纵向布局：顶部时间标尺、中间等高的轨道带、底部视图滑块

use crate::options::TimelineOptions;
use egui::{Pos2, Rect, Vec2};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Region {
    Ruler,
    Track(usize),
    Slider,
    Outside,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimelineLayout {
    pub width: f32,
    pub key_height: f32,
    pub track_height: f32,
    pub track_padding: f32,
    pub slider_height: f32,
    pub track_count: usize,
}

impl TimelineLayout {
    pub fn new(options: &TimelineOptions, width: f32, track_count: usize) -> Self {
        Self {
            width,
            key_height: options.key_height,
            track_height: options.track_height,
            track_padding: options.track_padding,
            slider_height: options.slider_height,
            track_count,
        }
    }

    pub fn stride(&self) -> f32 {
        self.track_height + self.track_padding
    }

    pub fn slider_top(&self) -> f32 {
        self.key_height + self.track_count as f32 * self.stride()
    }

    pub fn height(&self) -> f32 {
        self.slider_top() + self.slider_height
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height())
    }

    pub fn ruler_rect(&self) -> Rect {
        Rect::from_min_size(Pos2::ZERO, Vec2::new(self.width, self.key_height))
    }

    /// 第 `index` 条轨道占据的整条带（含间距）
    pub fn band_rect(&self, index: usize) -> Rect {
        Rect::from_min_size(
            Pos2::new(0.0, self.key_height + index as f32 * self.stride()),
            Vec2::new(self.width, self.stride()),
        )
    }

    /// 轨道带内实际绘制片段的区域
    pub fn lane_rect(&self, index: usize) -> Rect {
        let band = self.band_rect(index);
        Rect::from_min_size(
            band.min + Vec2::new(0.0, self.track_padding / 2.0),
            Vec2::new(self.width, self.track_height),
        )
    }

    pub fn slider_rect(&self) -> Rect {
        Rect::from_min_size(
            Pos2::new(0.0, self.slider_top()),
            Vec2::new(self.width, self.slider_height),
        )
    }

    pub fn region_at(&self, y: f32) -> Region {
        if y < 0.0 || y >= self.height() {
            Region::Outside
        } else if y < self.key_height {
            Region::Ruler
        } else if y >= self.slider_top() {
            Region::Slider
        } else {
            let index = ((y - self.key_height) / self.stride()).floor() as usize;
            Region::Track(index.min(self.track_count.saturating_sub(1)))
        }
    }

    pub fn track_at(&self, y: f32) -> Option<usize> {
        match self.region_at(y) {
            Region::Track(index) => Some(index),
            _ => None,
        }
    }

    /// 纵向像素范围映射到轨道下标区间 `[first, last)`：上沿向下取整，下沿向上取整
    pub fn track_span(&self, top: f32, bottom: f32) -> std::ops::Range<usize> {
        if self.track_count == 0 {
            return 0..0;
        }
        let stride = self.stride();
        let first = ((top - self.key_height) / stride).floor().max(0.0) as usize;
        let last = if bottom >= self.slider_top() {
            self.track_count
        } else {
            (((bottom - self.key_height) / stride).ceil().max(0.0) as usize).min(self.track_count)
        };
        first.min(self.track_count)..last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> TimelineLayout {
        TimelineLayout::new(&TimelineOptions::default(), 800.0, 3)
    }

    #[test]
    fn regions_follow_stack() {
        let layout = layout();
        assert_eq!(layout.region_at(10.0), Region::Ruler);
        assert_eq!(layout.region_at(25.0), Region::Track(0));
        assert_eq!(layout.region_at(25.0 + 70.0 * 2.0 + 1.0), Region::Track(2));
        assert_eq!(layout.region_at(25.0 + 70.0 * 3.0 + 1.0), Region::Slider);
        assert_eq!(layout.region_at(1000.0), Region::Outside);
        assert_eq!(layout.height(), 25.0 + 210.0 + 25.0);
    }

    #[test]
    fn span_rounds_outward() {
        let layout = layout();
        assert_eq!(layout.track_span(30.0, 40.0), 0..1);
        assert_eq!(layout.track_span(100.0, 170.0), 1..3);
        assert_eq!(layout.track_span(0.0, 240.0), 0..3);
        assert_eq!(layout.track_span(200.0, 250.0), 2..3);
    }
}
