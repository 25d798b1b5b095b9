//! 绘制
//!
//! 每条轨道带、标尺、滑块条各自保存一份形状列表（组件局部坐标）。
//! 完整重绘重建全部列表；单轨重绘只重建那一条带，并重新盖上穿过它的
//! AB 区间和播放头。每帧把缓存平移到组件位置后整体交给 painter。

use crate::layout::TimelineLayout;
use crate::model::TimelineModel;
use crate::scheduler::RenderPass;
use crate::slider::Slider;
use crate::structure::{Track, TrackId};
use crate::ui::ruler;
use egui::epaint::text::Fonts;
use egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Shape, Stroke, Vec2};
use log::trace;

/// 颜色表
#[derive(Clone, Debug)]
pub struct Theme {
    pub background: Color32,
    pub ruler_background: Color32,
    pub ruler_major: Color32,
    pub ruler_minor: Color32,
    pub ruler_text: Color32,
    pub band: Color32,
    pub band_alt: Color32,
    pub segment: Color32,
    pub segment_selected: Color32,
    pub segment_stroke: Color32,
    pub segment_text: Color32,
    pub waveform: Color32,
    pub repeat_setting: Color32,
    pub repeat_enabled: Color32,
    pub playhead: Color32,
    pub slider_background: Color32,
    pub slider_thumb: Color32,
    pub slider_handle: Color32,
    pub selection_fill: Color32,
    pub selection_stroke: Color32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color32::from_gray(25),
            ruler_background: Color32::from_gray(40),
            ruler_major: Color32::from_gray(120),
            ruler_minor: Color32::from_gray(70),
            ruler_text: Color32::WHITE,
            band: Color32::from_gray(30),
            band_alt: Color32::from_gray(34),
            segment: Color32::from_rgb(70, 110, 160),
            segment_selected: Color32::from_rgb(230, 170, 60),
            segment_stroke: Color32::from_gray(200),
            segment_text: Color32::WHITE,
            waveform: Color32::from_rgba_unmultiplied(120, 200, 140, 110),
            repeat_setting: Color32::from_rgba_unmultiplied(255, 255, 255, 30),
            repeat_enabled: Color32::from_rgba_unmultiplied(100, 200, 255, 60),
            playhead: Color32::from_rgb(255, 100, 100),
            slider_background: Color32::from_gray(45),
            slider_thumb: Color32::from_gray(90),
            slider_handle: Color32::from_gray(150),
            selection_fill: Color32::from_rgba_unmultiplied(100, 150, 255, 50),
            selection_stroke: Color32::from_rgb(100, 150, 255),
        }
    }
}

#[derive(Default)]
pub struct FrameCache {
    chrome: Vec<Shape>,
    bands: Vec<(TrackId, Vec<Shape>)>,
    overlay: Vec<Shape>,
    slider: Vec<Shape>,
}

impl FrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn band(&self, track: &TrackId) -> Option<&[Shape]> {
        self.bands
            .iter()
            .find(|(id, _)| id == track)
            .map(|(_, shapes)| shapes.as_slice())
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn shape_count(&self) -> usize {
        self.chrome.len()
            + self.bands.iter().map(|(_, s)| s.len()).sum::<usize>()
            + self.overlay.len()
            + self.slider.len()
    }

    pub fn render(&mut self, pass: &RenderPass, model: &TimelineModel, slider: &Slider, theme: &Theme, fonts: Option<&Fonts>) {
        match pass {
            RenderPass::Full => self.full_pass(model, slider, theme, fonts),
            RenderPass::Track(track) => {
                if !self.track_pass(track, model, theme, fonts) {
                    self.full_pass(model, slider, theme, fonts);
                }
            }
        }
    }

    pub fn full_pass(&mut self, model: &TimelineModel, slider: &Slider, theme: &Theme, fonts: Option<&Fonts>) {
        let layout = model.layout();
        self.chrome.clear();
        self.chrome.push(Shape::rect_filled(
            Rect::from_min_size(Pos2::ZERO, layout.size()),
            0.0,
            theme.background,
        ));
        self.chrome
            .extend(ruler::ruler_shapes(&model.viewport, &layout, theme, fonts));

        self.bands = model
            .tracks
            .iter()
            .enumerate()
            .map(|(index, track)| (track.id.clone(), band_shapes(model, &layout, index, track, theme, fonts)))
            .collect();

        self.overlay = overlay_shapes(model, layout.ruler_rect(), theme);
        self.slider = slider_shapes(model, &layout, slider, theme);
        trace!("full pass: {} shapes", self.shape_count());
    }

    /// 只重建一条轨道带。缓存与当前轨道顺序不一致时返回 false
    pub fn track_pass(&mut self, track: &TrackId, model: &TimelineModel, theme: &Theme, fonts: Option<&Fonts>) -> bool {
        let Some(index) = model.tracks.index_of(track) else {
            return false;
        };
        let in_step = self.bands.len() == model.tracks.len()
            && self.bands.get(index).is_some_and(|(id, _)| id == track);
        if !in_step {
            return false;
        }
        let Some(data) = model.tracks.at(index) else {
            return false;
        };
        let layout = model.layout();
        self.bands[index].1 = band_shapes(model, &layout, index, data, theme, fonts);
        true
    }

    /// 把缓存贴到 `origin` 处
    pub fn paint(&self, painter: &Painter, origin: Pos2) {
        let offset = origin.to_vec2();
        let all = self
            .chrome
            .iter()
            .chain(self.bands.iter().flat_map(|(_, s)| s.iter()))
            .chain(self.overlay.iter())
            .chain(self.slider.iter());
        painter.extend(all.cloned().map(|mut shape| {
            shape.translate(offset);
            shape
        }));
    }
}

/// AB 区间和播放头在 `rect` 内的部分
fn overlay_shapes(model: &TimelineModel, rect: Rect, theme: &Theme) -> Vec<Shape> {
    let viewport = &model.viewport;
    let mut shapes = Vec::new();
    if let Some((a, b)) = model.repeat.range() {
        let left = viewport.time_to_pixel(a).max(rect.min.x);
        let right = viewport.time_to_pixel(b).min(rect.max.x);
        if right >= left {
            let color = if model.repeat.enabled() {
                theme.repeat_enabled
            } else {
                theme.repeat_setting
            };
            let band = Rect::from_x_y_ranges(left..=right.max(left + 1.0), rect.y_range());
            shapes.push(Shape::rect_filled(band, 0.0, color));
        }
    }
    if viewport.contains(model.playhead) {
        let x = viewport.time_to_pixel(model.playhead);
        shapes.push(Shape::line_segment(
            [Pos2::new(x, rect.min.y), Pos2::new(x, rect.max.y)],
            Stroke::new(2.0, theme.playhead),
        ));
    }
    shapes
}

fn band_shapes(
    model: &TimelineModel,
    layout: &TimelineLayout,
    index: usize,
    track: &Track,
    theme: &Theme,
    fonts: Option<&Fonts>,
) -> Vec<Shape> {
    let viewport = &model.viewport;
    let band = layout.band_rect(index);
    let lane = layout.lane_rect(index);
    let fill = if index % 2 == 0 { theme.band } else { theme.band_alt };
    let mut shapes = vec![Shape::rect_filled(band, 0.0, fill)];

    // 波形
    if let Some(waveform) = track.audio.as_ref().and_then(|id| model.audio.waveform(id)) {
        let columns = lane.width().max(1.0) as usize;
        let mid = lane.center().y;
        let half = lane.height() / 2.0;
        let stroke = Stroke::new(1.0, theme.waveform);
        for (column, (low, high)) in waveform
            .peaks(viewport.start(), viewport.end(), columns)
            .into_iter()
            .enumerate()
        {
            if high <= low {
                continue;
            }
            let x = lane.min.x + column as f32 + 0.5;
            shapes.push(Shape::line_segment(
                [Pos2::new(x, mid - high * half), Pos2::new(x, mid - low * half)],
                stroke,
            ));
        }
    }

    // 片段，选中的后画
    let visible = track
        .segments
        .iter()
        .filter(|s| s.overlaps(viewport.start(), viewport.end()));
    for segment in visible.clone().filter(|s| !s.selected).chain(visible.filter(|s| s.selected)) {
        let left = viewport.time_to_pixel(segment.start);
        let right = viewport.time_to_pixel(segment.end).max(left + 1.0);
        let rect = Rect::from_x_y_ranges(left..=right, lane.y_range());
        let color = if segment.selected {
            theme.segment_selected
        } else {
            theme.segment
        };
        shapes.push(Shape::rect_filled(rect, 2.0, color));
        shapes.push(Shape::rect_stroke(rect, 2.0, Stroke::new(1.0, theme.segment_stroke)));
        if let (Some(fonts), false) = (fonts, segment.text.is_empty()) {
            if rect.width() > 12.0 {
                let text = Shape::text(
                    fonts,
                    rect.left_top() + Vec2::new(4.0, 4.0),
                    Align2::LEFT_TOP,
                    &segment.text,
                    FontId::proportional(12.0),
                    theme.segment_text,
                );
                // 文字限制在片段内
                if text.visual_bounding_rect().max.x <= rect.max.x {
                    shapes.push(text);
                }
            }
        }
    }

    shapes.extend(overlay_shapes(model, band, theme));
    shapes
}

fn slider_shapes(model: &TimelineModel, layout: &TimelineLayout, slider: &Slider, theme: &Theme) -> Vec<Shape> {
    let strip = layout.slider_rect();
    let (left, right) = slider.thumb(&model.viewport);
    let thumb = Rect::from_x_y_ranges(left..=right.max(left + 1.0), strip.shrink2(Vec2::new(0.0, 3.0)).y_range());
    let handle = slider.handle_width / 2.0;
    let mut shapes = vec![
        Shape::rect_filled(strip, 0.0, theme.slider_background),
        Shape::rect_filled(thumb, 3.0, theme.slider_thumb),
    ];
    for x in [thumb.min.x, thumb.max.x] {
        shapes.push(Shape::rect_filled(
            Rect::from_x_y_ranges(x - handle..=x + handle, thumb.y_range()),
            2.0,
            theme.slider_handle,
        ));
    }
    shapes
}

/// 绘制选择框
pub fn draw_selection_box(painter: &Painter, rect: Rect, theme: &Theme) {
    painter.rect_filled(rect, 0.0, theme.selection_fill);
    painter.rect_stroke(rect, 0.0, Stroke::new(2.0, theme.selection_stroke));
}
