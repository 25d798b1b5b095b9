//! 指针输入状态机
//!
//! 按下时先按纵向位置分派（滑块条、时间标尺、轨道），轨道区域再按当前工具分派。
//! 同一时刻至多一个交互状态处于活动中；松开或离开画布时终止当前状态。

mod selection;
mod tools;

pub use selection::{hit_test, Selection};
pub use tools::{delete_segment, split_segment, ActiveElement, ToolMode, EDGE_PX};

use crate::editor::TimelineEvent;
use crate::layout::Region;
use crate::menu::MenuContext;
use crate::model::TimelineModel;
use crate::slider::{Slider, SliderEdge};
use egui::{CursorIcon, Modifiers, PointerButton, Pos2, Rect};
use log::trace;

/// 自动滚动/缩放时每个周期移动的比例
const AUTO_GAIN: f64 = 0.1;
/// 掉帧后单次最多补上的周期数
const MAX_CATCH_UP: u32 = 4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    /// 组件局部坐标
    pub pos: Pos2,
    /// 时钟（秒）
    pub time: f64,
    pub button: PointerButton,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn primary(pos: Pos2, time: f64) -> Self {
        Self {
            pos,
            time,
            button: PointerButton::Primary,
            modifiers: Modifiers::NONE,
        }
    }
}

/// 固定周期的定时器，由帧时钟驱动
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntervalTimer {
    period: f64,
    next_due: f64,
}

impl IntervalTimer {
    pub fn start(now: f64, period: f64) -> Self {
        let period = period.max(1e-3);
        Self {
            period,
            next_due: now + period,
        }
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    /// 到 `now` 为止到期的周期数
    pub fn due(&mut self, now: f64) -> u32 {
        if now < self.next_due {
            return 0;
        }
        let elapsed = ((now - self.next_due) / self.period).floor() as u32 + 1;
        self.next_due += elapsed as f64 * self.period;
        elapsed.min(MAX_CATCH_UP)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputState {
    Idle,
    ScrubbingPlayhead,
    SettingRepeat,
    ReorderingTrack { index: usize },
    DraggingSlider,
    AutoScrolling { timer: IntervalTimer },
    AutoResizing {
        edge: SliderEdge,
        origin_x: f32,
        timer: IntervalTimer,
    },
    DraggingActiveElement(ActiveElement),
    RubberBandSelecting(Selection),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContextMenu {
    pub pos: Pos2,
    pub context: MenuContext,
}

pub struct InputController {
    state: InputState,
    slider: Slider,
    pointer: Pos2,
    context_menu: Option<ContextMenu>,
}

impl InputController {
    pub fn new(handle_width: f32) -> Self {
        Self {
            state: InputState::Idle,
            slider: Slider::new(handle_width),
            pointer: Pos2::ZERO,
            context_menu: None,
        }
    }

    pub fn state(&self) -> &InputState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != InputState::Idle
    }

    pub fn slider(&self) -> &Slider {
        &self.slider
    }

    pub fn context_menu(&self) -> Option<&ContextMenu> {
        self.context_menu.as_ref()
    }

    pub fn close_context_menu(&mut self) {
        self.context_menu = None;
    }

    /// 正在运行的定时器周期
    pub fn timer_period(&self) -> Option<f64> {
        match &self.state {
            InputState::AutoScrolling { timer } | InputState::AutoResizing { timer, .. } => {
                Some(timer.period())
            }
            _ => None,
        }
    }

    /// 框选矩形
    pub fn selection_rect(&self) -> Option<Rect> {
        match &self.state {
            InputState::RubberBandSelecting(selection) if selection.dragged() => Some(selection.rect()),
            _ => None,
        }
    }

    pub fn pointer_down(&mut self, model: &mut TimelineModel, event: PointerEvent) {
        if event.button == PointerButton::Secondary {
            if !self.is_active() {
                self.open_context_menu(model, event.pos);
            }
            return;
        }
        if event.button != PointerButton::Primary {
            return;
        }
        self.context_menu = None;
        if self.is_active() {
            // 上一次交互没有收到松开
            self.finish(model);
        }
        self.pointer = event.pos;

        let layout = model.layout();
        let x = event.pos.x;
        self.state = match layout.region_at(event.pos.y) {
            Region::Outside => InputState::Idle,
            Region::Slider => {
                if self.slider.on_handle(&model.viewport, x).is_some() {
                    self.slider.mouse_down(&mut model.viewport, x, event.modifiers.shift);
                    InputState::DraggingSlider
                } else if model.tool == ToolMode::Scroll {
                    let edge = if x < self.slider.midpoint(&model.viewport) {
                        SliderEdge::Left
                    } else {
                        SliderEdge::Right
                    };
                    let (left, right) = self.slider.thumb(&model.viewport);
                    InputState::AutoResizing {
                        edge,
                        origin_x: if edge == SliderEdge::Left { left } else { right },
                        timer: IntervalTimer::start(event.time, model.options.auto_scroll_period),
                    }
                } else {
                    let dragging = self.slider.mouse_down(&mut model.viewport, x, event.modifiers.shift);
                    model.request_full();
                    if dragging {
                        InputState::DraggingSlider
                    } else {
                        InputState::Idle
                    }
                }
            }
            Region::Ruler => {
                model.jump_to(model.viewport.pixel_to_time(x));
                InputState::ScrubbingPlayhead
            }
            Region::Track(index) => self.track_down(model, index, event),
        };
        trace!("pointer down -> {:?}", self.state);
    }

    fn track_down(&mut self, model: &mut TimelineModel, index: usize, event: PointerEvent) -> InputState {
        let time = model.viewport.pixel_to_time(event.pos.x);
        match model.tool {
            ToolMode::Repeat => {
                let change = model.repeat.press(time);
                model.emit_repeat_change(change);
                model.request_full();
                InputState::SettingRepeat
            }
            ToolMode::Scroll => InputState::AutoScrolling {
                timer: IntervalTimer::start(event.time, model.options.auto_scroll_period),
            },
            ToolMode::Order => InputState::ReorderingTrack { index },
            ToolMode::Select if model.multi_select => {
                InputState::RubberBandSelecting(Selection::new(event.pos))
            }
            tool => {
                let Some(track) = model.tracks.at(index).map(|t| t.id.clone()) else {
                    return InputState::Idle;
                };
                match tool.track_pointer_down(model, &track, time) {
                    Some(element) => InputState::DraggingActiveElement(element),
                    None => InputState::Idle,
                }
            }
        }
    }

    pub fn pointer_move(&mut self, model: &mut TimelineModel, event: PointerEvent) {
        self.pointer = event.pos;
        let time = model.viewport.pixel_to_time(event.pos.x);
        match &mut self.state {
            InputState::Idle | InputState::AutoScrolling { .. } | InputState::AutoResizing { .. } => {}
            InputState::ScrubbingPlayhead => {
                let time = time.clamp(0.0, model.viewport.length());
                model.playhead = time;
                model.emit(TimelineEvent::TimeUpdate { time });
                model.request_full();
            }
            InputState::SettingRepeat => {
                model.repeat.drag(time);
                model.request_full();
            }
            InputState::ReorderingTrack { index } => {
                let layout = model.layout();
                if let Some(target) = layout.track_at(event.pos.y) {
                    if target != *index && model.tracks.swap_positions(*index, target) {
                        *index = target;
                        model.request_full();
                    }
                }
            }
            InputState::DraggingSlider => {
                if self.slider.mouse_move(&mut model.viewport, event.pos.x) {
                    model.request_full();
                }
            }
            InputState::DraggingActiveElement(element) => element.drag(model, time),
            InputState::RubberBandSelecting(selection) => selection.update(event.pos),
        }
    }

    pub fn pointer_up(&mut self, model: &mut TimelineModel, event: PointerEvent) {
        self.pointer = event.pos;
        if event.button == PointerButton::Primary {
            self.finish(model);
        }
    }

    /// 指针离开画布，等同于松开
    pub fn pointer_leave(&mut self, model: &mut TimelineModel) {
        self.finish(model);
    }

    /// 终止当前状态
    pub fn finish(&mut self, model: &mut TimelineModel) {
        let state = std::mem::replace(&mut self.state, InputState::Idle);
        match state {
            InputState::Idle => {}
            InputState::ScrubbingPlayhead => {}
            InputState::SettingRepeat => {
                let change = model.repeat.release();
                model.emit_repeat_change(change);
                model.request_full();
            }
            InputState::ReorderingTrack { .. } => {}
            InputState::DraggingSlider => self.slider.mouse_up(),
            // 定时器随状态一起丢弃
            InputState::AutoScrolling { .. } | InputState::AutoResizing { .. } => {}
            InputState::DraggingActiveElement(element) => element.release(model),
            InputState::RubberBandSelecting(selection) => {
                selection.finish(model);
                model.request_full();
            }
        }
    }

    /// 推进自动滚动/缩放定时器
    pub fn tick(&mut self, model: &mut TimelineModel, now: f64) {
        let pointer = self.pointer;
        match &mut self.state {
            InputState::AutoScrolling { timer } => {
                let ticks = timer.due(now);
                if ticks == 0 {
                    return;
                }
                let offset = pointer.x - model.viewport.width() / 2.0;
                let delta = offset as f64 * model.viewport.zoom() * AUTO_GAIN;
                model.viewport.move_by(delta * ticks as f64);
                model.request_full();
            }
            InputState::AutoResizing {
                edge,
                origin_x,
                timer,
            } => {
                let ticks = timer.due(now);
                if ticks == 0 {
                    return;
                }
                let scale = model.viewport.length() / model.viewport.width() as f64;
                let delta = (pointer.x - *origin_x) as f64 * scale * AUTO_GAIN * ticks as f64;
                match edge {
                    SliderEdge::Left => {
                        let start = model.viewport.start();
                        model.viewport.set_start(start + delta);
                    }
                    SliderEdge::Right => {
                        let end = model.viewport.end();
                        model.viewport.set_end(end + delta);
                    }
                }
                model.request_full();
            }
            _ => {}
        }
    }

    /// 根据工具和位置给出的光标，不修改任何状态
    pub fn cursor(&self, model: &TimelineModel, pos: Pos2) -> CursorIcon {
        match &self.state {
            InputState::DraggingSlider | InputState::ScrubbingPlayhead => return CursorIcon::Grabbing,
            InputState::ReorderingTrack { .. } => return CursorIcon::ResizeVertical,
            InputState::Idle => {}
            _ => return model.tool.track_cursor(None),
        }
        let layout = model.layout();
        match layout.region_at(pos.y) {
            Region::Outside => CursorIcon::Default,
            Region::Ruler => CursorIcon::PointingHand,
            Region::Slider => match self.slider.on_handle(&model.viewport, pos.x) {
                Some(_) => CursorIcon::ResizeHorizontal,
                None => CursorIcon::Grab,
            },
            Region::Track(index) => {
                let time = model.viewport.pixel_to_time(pos.x);
                let edge = EDGE_PX as f64 * model.viewport.zoom();
                let hit = model
                    .tracks
                    .at(index)
                    .and_then(|t| t.hit(time, edge))
                    .map(|(_, region)| region);
                model.tool.track_cursor(hit)
            }
        }
    }

    fn open_context_menu(&mut self, model: &TimelineModel, pos: Pos2) {
        let layout = model.layout();
        let time = model.viewport.pixel_to_time(pos.x);
        let edge = EDGE_PX as f64 * model.viewport.zoom();
        let track = layout.track_at(pos.y).and_then(|i| model.tracks.at(i));
        self.context_menu = Some(ContextMenu {
            pos,
            context: MenuContext {
                track: track.map(|t| t.id.clone()),
                segment: track.and_then(|t| t.hit(time, edge)).map(|(id, _)| id),
                time,
                repeat_set: model.repeat.is_set(),
                repeat_enabled: model.repeat.enabled(),
            },
        });
    }
}
