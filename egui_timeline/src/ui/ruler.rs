//! 时间标尺刻度
//!
//! 主刻度取最接近每 100 像素对应时长的“整齐”值（1、2、5 乘以 10 的幂），
//! 次刻度为主刻度的四分之一。

use crate::layout::TimelineLayout;
use crate::ui::renderer::Theme;
use crate::utils::format_time;
use crate::viewport::Viewport;
use egui::epaint::text::Fonts;
use egui::{Align2, FontId, Pos2, Shape, Stroke};

/// 两个主刻度之间的目标像素数
const TARGET_PIXELS: f64 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tick {
    pub time: f64,
    pub major: bool,
}

/// 根据缩放级别计算主刻度间隔
pub fn major_interval(seconds_per_pixel: f64) -> f64 {
    let target_interval = seconds_per_pixel * TARGET_PIXELS;
    if !target_interval.is_finite() || target_interval <= 0.0 {
        return 1.0;
    }

    let magnitude = 10.0_f64.powf(target_interval.log10().floor());
    let normalized = target_interval / magnitude;

    let nice_value = if normalized <= 1.5 {
        1.0
    } else if normalized <= 3.5 {
        2.0
    } else if normalized <= 7.5 {
        5.0
    } else {
        10.0
    };

    nice_value * magnitude
}

/// 视图内的全部刻度，按时间升序
pub fn ticks(viewport: &Viewport) -> Vec<Tick> {
    let major = major_interval(viewport.zoom());
    let minor = major / 4.0;
    // 用整数步进避免累加误差
    let first = (viewport.start() / minor).floor() as i64;
    let last = (viewport.end() / minor).ceil() as i64;
    (first..=last)
        .map(|k| Tick {
            time: k as f64 * minor,
            major: k.rem_euclid(4) == 0,
        })
        .filter(|tick| tick.time >= viewport.start() && tick.time <= viewport.end())
        .collect()
}

/// 标尺条带的形状。没有字体时只画刻度线
pub fn ruler_shapes(viewport: &Viewport, layout: &TimelineLayout, theme: &Theme, fonts: Option<&Fonts>) -> Vec<Shape> {
    let rect = layout.ruler_rect();
    let mut shapes = vec![Shape::rect_filled(rect, 0.0, theme.ruler_background)];
    for tick in ticks(viewport) {
        let x = viewport.time_to_pixel(tick.time);
        if tick.major {
            shapes.push(Shape::line_segment(
                [Pos2::new(x, rect.min.y), Pos2::new(x, rect.max.y)],
                Stroke::new(1.5, theme.ruler_major),
            ));
            if let Some(fonts) = fonts {
                shapes.push(Shape::text(
                    fonts,
                    Pos2::new(x + 4.0, rect.min.y + 2.0),
                    Align2::LEFT_TOP,
                    format_time(tick.time),
                    FontId::proportional(11.0),
                    theme.ruler_text,
                ));
            }
        } else {
            shapes.push(Shape::line_segment(
                [Pos2::new(x, rect.max.y - rect.height() / 3.0), Pos2::new(x, rect.max.y)],
                Stroke::new(1.0, theme.ruler_minor),
            ));
        }
    }
    shapes
}
