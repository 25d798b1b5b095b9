//! 组件内部状态
//!
//! 输入控制器和公共 API 都通过这里修改状态，并在返回前完成重绘请求。

use crate::audio::AudioTable;
use crate::editor::{EventChannel, TimelineEvent};
use crate::input::ToolMode;
use crate::layout::TimelineLayout;
use crate::options::TimelineOptions;
use crate::registry::TrackRegistry;
use crate::repeat::{AbRepeat, RepeatChange};
use crate::scheduler::{RenderRequest, RenderScheduler};
use crate::structure::{SegmentId, TrackId};
use crate::viewport::Viewport;

/// 单个片段的一次修改，交给外部撤销栈
#[derive(Clone, Debug, PartialEq)]
pub enum SegmentEdit {
    Created {
        track: TrackId,
        segment: SegmentId,
        start: f64,
        end: f64,
    },
    Changed {
        track: TrackId,
        segment: SegmentId,
        before: (f64, f64),
        after: (f64, f64),
    },
    Deleted {
        track: TrackId,
        segment: SegmentId,
        start: f64,
        end: f64,
        text: String,
    },
    Split {
        track: TrackId,
        segment: SegmentId,
        tail: SegmentId,
        time: f64,
    },
}

/// 外部撤销/重做栈
pub trait EditHistory {
    fn record(&mut self, edit: SegmentEdit);
    /// 轨道以新句柄重新加载时，把挂起的历史转到新 id 上
    fn retarget(&mut self, old: &TrackId, new: &TrackId);
}

pub struct TimelineModel {
    pub options: TimelineOptions,
    pub viewport: Viewport,
    pub tracks: TrackRegistry,
    pub audio: AudioTable,
    pub repeat: AbRepeat,
    /// 播放头位置（秒）
    pub playhead: f64,
    pub tool: ToolMode,
    pub multi_select: bool,
    pub assets_ready: bool,
    pub scheduler: RenderScheduler,
    pub events: EventChannel,
    pub history: Option<Box<dyn EditHistory>>,
}

impl TimelineModel {
    pub fn new(options: TimelineOptions, scheduler: RenderScheduler) -> Self {
        let viewport = Viewport::new(options.length, options.view_start, options.view_end, options.width);
        Self {
            multi_select: options.multi_select,
            options,
            viewport,
            tracks: TrackRegistry::new(),
            audio: AudioTable::new(),
            repeat: AbRepeat::default(),
            playhead: 0.0,
            tool: ToolMode::default(),
            assets_ready: true,
            scheduler,
            events: EventChannel::new(),
            history: None,
        }
    }

    pub fn layout(&self) -> TimelineLayout {
        TimelineLayout::new(&self.options, self.viewport.width(), self.tracks.len())
    }

    pub fn request_full(&mut self) {
        self.scheduler.request(RenderRequest::Full);
    }

    pub fn request_track(&mut self, id: &TrackId) {
        self.scheduler.request(RenderRequest::Track(id.clone()));
    }

    pub fn emit(&mut self, event: TimelineEvent) {
        self.events.emit(event);
    }

    pub fn record(&mut self, edit: SegmentEdit) {
        if let Some(history) = self.history.as_mut() {
            history.record(edit);
        }
    }

    /// 把 AB 区间的状态变化转成事件
    pub fn emit_repeat_change(&mut self, change: RepeatChange) {
        if change.became_set {
            if let Some((a, b)) = self.repeat.range() {
                self.emit(TimelineEvent::AbRepeatSet { a, b });
            }
        }
        match change.enabled {
            Some(true) => self.emit(TimelineEvent::AbRepeatEnabled),
            Some(false) => self.emit(TimelineEvent::AbRepeatDisabled),
            None => {}
        }
        if change.became_unset {
            self.emit(TimelineEvent::AbRepeatUnset);
        }
    }

    /// 播放头跳转（拖动时间标尺）
    pub fn jump_to(&mut self, time: f64) {
        let time = time.clamp(0.0, self.viewport.length());
        self.playhead = time;
        self.emit(TimelineEvent::Jump { time });
        self.emit(TimelineEvent::TimeUpdate { time });
        self.request_full();
    }

    /// 清除所有轨道上的选择
    pub fn clear_selection(&mut self) -> bool {
        let mut cleared = Vec::new();
        for track in self.tracks.iter_mut() {
            for segment in track.clear_selection() {
                cleared.push((track.id.clone(), segment));
            }
        }
        let any = !cleared.is_empty();
        for (track, segment) in cleared {
            self.emit(TimelineEvent::Unselect { track, segment });
        }
        if any {
            self.request_full();
        }
        any
    }

    /// 切换单个片段的选择状态
    pub fn toggle_selected(&mut self, track: &TrackId, segment: SegmentId) {
        let Some(seg) = self.tracks.get_mut(track).and_then(|t| t.segment_mut(segment)) else {
            return;
        };
        seg.selected = !seg.selected;
        let event = if seg.selected {
            TimelineEvent::Select {
                track: track.clone(),
                segment,
            }
        } else {
            TimelineEvent::Unselect {
                track: track.clone(),
                segment,
            }
        };
        self.emit(event);
        self.request_track(track);
    }

    /// 选中一个片段，已选中时不重复通知
    pub fn select(&mut self, track: &TrackId, segment: SegmentId) -> bool {
        let Some(seg) = self.tracks.get_mut(track).and_then(|t| t.segment_mut(segment)) else {
            return false;
        };
        if seg.selected {
            return false;
        }
        seg.selected = true;
        self.emit(TimelineEvent::Select {
            track: track.clone(),
            segment,
        });
        self.request_track(track);
        true
    }

    /// 片段变化的公共收尾：通知、记录、单轨重绘
    pub fn segment_changed(&mut self, track: &TrackId, segment: SegmentId) {
        self.emit(TimelineEvent::SegmentChanged {
            track: track.clone(),
            segment,
        });
        self.request_track(track);
    }
}
