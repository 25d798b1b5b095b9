//! 视图滑块
//!
//! 轨道下方的条带，整条代表 `[0, length]`，滑块本体代表当前视图。
//! 拖动手柄改变单侧边缘（按住对称修饰键时两侧同时收放），拖动本体平移视图。

use crate::layout::TimelineLayout;
use crate::viewport::Viewport;
use egui::Pos2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SliderEdge {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum SliderDrag {
    Edge { edge: SliderEdge, symmetric: bool },
    Body { origin_x: f32, origin_start: f64 },
}

#[derive(Clone, Debug, Default)]
pub struct Slider {
    drag: Option<SliderDrag>,
    pub handle_width: f32,
}

/// 条带像素与全局时间的换算
fn seconds_per_pixel(viewport: &Viewport) -> f64 {
    viewport.length() / viewport.width() as f64
}

impl Slider {
    pub fn new(handle_width: f32) -> Self {
        Self {
            drag: None,
            handle_width,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// 滑块本体的左右像素位置
    pub fn thumb(&self, viewport: &Viewport) -> (f32, f32) {
        let scale = seconds_per_pixel(viewport);
        (
            (viewport.start() / scale) as f32,
            (viewport.end() / scale) as f32,
        )
    }

    pub fn midpoint(&self, viewport: &Viewport) -> f32 {
        let (left, right) = self.thumb(viewport);
        (left + right) / 2.0
    }

    pub fn contains_point(&self, layout: &TimelineLayout, pos: Pos2) -> bool {
        layout.slider_rect().contains(pos)
    }

    pub fn on_handle(&self, viewport: &Viewport, x: f32) -> Option<SliderEdge> {
        let (left, right) = self.thumb(viewport);
        let w = self.handle_width;
        // 滑块很窄时两个手柄重叠，取较近的一侧
        let near_left = x >= left - w && x <= left + w;
        let near_right = x >= right - w && x <= right + w;
        match (near_left, near_right) {
            (true, true) => Some(if (x - left).abs() <= (x - right).abs() {
                SliderEdge::Left
            } else {
                SliderEdge::Right
            }),
            (true, false) => Some(SliderEdge::Left),
            (false, true) => Some(SliderEdge::Right),
            (false, false) => None,
        }
    }

    /// 按下：在手柄上开始改边缘，否则把视图中心移到指针处并开始平移。返回是否进入拖动
    pub fn mouse_down(&mut self, viewport: &mut Viewport, x: f32, symmetric: bool) -> bool {
        if let Some(edge) = self.on_handle(viewport, x) {
            self.drag = Some(SliderDrag::Edge { edge, symmetric });
            return true;
        }
        viewport.center(x as f64 * seconds_per_pixel(viewport));
        self.drag = Some(SliderDrag::Body {
            origin_x: x,
            origin_start: viewport.start(),
        });
        true
    }

    /// 返回视图是否改变
    pub fn mouse_move(&mut self, viewport: &mut Viewport, x: f32) -> bool {
        let Some(drag) = self.drag else {
            return false;
        };
        let scale = seconds_per_pixel(viewport);
        let time = x as f64 * scale;
        let before = (viewport.start(), viewport.end());
        match drag {
            SliderDrag::Edge { edge, symmetric } => {
                let center = (viewport.start() + viewport.end()) / 2.0;
                match edge {
                    SliderEdge::Left => {
                        viewport.set_start(time);
                        if symmetric {
                            viewport.set_end(center + (center - viewport.start()));
                        }
                    }
                    SliderEdge::Right => {
                        viewport.set_end(time);
                        if symmetric {
                            viewport.set_start(center - (viewport.end() - center));
                        }
                    }
                }
            }
            SliderDrag::Body {
                origin_x,
                origin_start,
            } => {
                let target = origin_start + (x - origin_x) as f64 * scale;
                viewport.move_by(target - viewport.start());
            }
        }
        before != (viewport.start(), viewport.end())
    }

    pub fn mouse_up(&mut self) {
        self.drag = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 长度 100 秒、宽 100 像素：条带上一像素一秒
    fn viewport() -> Viewport {
        Viewport::new(100.0, 20.0, 40.0, 100.0)
    }

    #[test]
    fn handles_detected_at_edges() {
        let slider = Slider::new(3.0);
        let viewport = viewport();
        assert_eq!(slider.on_handle(&viewport, 21.0), Some(SliderEdge::Left));
        assert_eq!(slider.on_handle(&viewport, 42.0), Some(SliderEdge::Right));
        assert_eq!(slider.on_handle(&viewport, 30.0), None);
    }

    #[test]
    fn body_press_recenters_then_pans() {
        let mut slider = Slider::new(3.0);
        let mut viewport = viewport();
        // 本体内、偏离中点的按下也会把中点移到指针处
        assert!(slider.mouse_down(&mut viewport, 25.0, false));
        assert_eq!((viewport.start(), viewport.end()), (15.0, 35.0));
        assert!(slider.mouse_move(&mut viewport, 40.0));
        assert_eq!((viewport.start(), viewport.end()), (30.0, 50.0));
        slider.mouse_up();
        assert!(!slider.mouse_move(&mut viewport, 80.0));
    }

    #[test]
    fn click_outside_thumb_recenters() {
        let mut slider = Slider::new(3.0);
        let mut viewport = viewport();
        slider.mouse_down(&mut viewport, 70.0, false);
        assert_eq!((viewport.start(), viewport.end()), (60.0, 80.0));
    }

    #[test]
    fn edge_drag_resizes_one_side() {
        let mut slider = Slider::new(3.0);
        let mut viewport = viewport();
        slider.mouse_down(&mut viewport, 40.0, false);
        slider.mouse_move(&mut viewport, 50.0);
        assert_eq!((viewport.start(), viewport.end()), (20.0, 50.0));
        slider.mouse_move(&mut viewport, 5.0);
        assert!(viewport.start() < viewport.end());
        assert_eq!(viewport.start(), 20.0);
    }

    #[test]
    fn symmetric_edge_drag() {
        let mut slider = Slider::new(3.0);
        let mut viewport = viewport();
        slider.mouse_down(&mut viewport, 20.0, true);
        slider.mouse_move(&mut viewport, 10.0);
        assert_eq!((viewport.start(), viewport.end()), (10.0, 50.0));
    }
}
