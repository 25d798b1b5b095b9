//! 编辑工具
//!
//! 每种工具在轨道上按下时的行为。需要持续拖动的工具返回一个 [`ActiveElement`]，
//! 之后的移动与松开都交给它处理。

use crate::model::{SegmentEdit, TimelineModel};
use crate::structure::{Segment, SegmentHit, SegmentId, TrackId};
use crate::editor::TimelineEvent;
use egui::CursorIcon;
use log::debug;
use serde::{Deserialize, Serialize};

/// 片段边缘的命中宽度（像素）
pub const EDGE_PX: f32 = 5.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolMode {
    Order,
    #[default]
    Select,
    Move,
    Create,
    Delete,
    Repeat,
    Scroll,
    Shift,
    Split,
}

impl ToolMode {
    pub const ALL: [ToolMode; 9] = [
        ToolMode::Select,
        ToolMode::Move,
        ToolMode::Create,
        ToolMode::Delete,
        ToolMode::Split,
        ToolMode::Shift,
        ToolMode::Order,
        ToolMode::Repeat,
        ToolMode::Scroll,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ToolMode::Order => "Order",
            ToolMode::Select => "Select",
            ToolMode::Move => "Move",
            ToolMode::Create => "Create",
            ToolMode::Delete => "Delete",
            ToolMode::Repeat => "Repeat",
            ToolMode::Scroll => "Scroll",
            ToolMode::Shift => "Shift",
            ToolMode::Split => "Split",
        }
    }

    /// 指针位于轨道上时的光标
    pub fn track_cursor(&self, hit: Option<SegmentHit>) -> CursorIcon {
        match (self, hit) {
            (ToolMode::Order, _) => CursorIcon::ResizeVertical,
            (ToolMode::Select, Some(_)) => CursorIcon::PointingHand,
            (ToolMode::Move, Some(SegmentHit::Body)) => CursorIcon::Move,
            (ToolMode::Move, Some(_)) => CursorIcon::ResizeHorizontal,
            (ToolMode::Create, None) => CursorIcon::Crosshair,
            (ToolMode::Delete, Some(_)) => CursorIcon::NotAllowed,
            (ToolMode::Split, Some(_)) => CursorIcon::VerticalText,
            (ToolMode::Shift, Some(_)) => CursorIcon::ResizeColumn,
            (ToolMode::Repeat, _) => CursorIcon::ResizeColumn,
            (ToolMode::Scroll, _) => CursorIcon::AllScroll,
            _ => CursorIcon::Default,
        }
    }

    /// 轨道上的按下。返回值成为之后拖动的活动对象
    pub fn track_pointer_down(
        &self,
        model: &mut TimelineModel,
        track: &TrackId,
        time: f64,
    ) -> Option<ActiveElement> {
        let edge = EDGE_PX as f64 * model.viewport.zoom();
        let hit = model.tracks.get(track)?.hit(time, edge);
        match self {
            ToolMode::Select => {
                select_exclusive(model, track, hit.map(|(id, _)| id));
                None
            }
            ToolMode::Move => {
                let (segment, grab) = hit?;
                let seg = model.tracks.get(track)?.segment(segment)?;
                Some(ActiveElement::Move {
                    track: track.clone(),
                    segment,
                    grab,
                    anchor: time,
                    origin: (seg.start, seg.end),
                })
            }
            ToolMode::Create => {
                if hit.is_some() {
                    return None;
                }
                let time = time.clamp(0.0, model.viewport.length());
                let segment = model
                    .tracks
                    .get_mut(track)?
                    .insert_segment(Segment::new(time, time, ""));
                model.request_track(track);
                Some(ActiveElement::Create {
                    track: track.clone(),
                    segment,
                    anchor: time,
                })
            }
            ToolMode::Delete => {
                let (segment, _) = hit?;
                delete_segment(model, track, segment);
                None
            }
            ToolMode::Split => {
                let (segment, _) = hit?;
                split_segment(model, track, segment, time);
                None
            }
            ToolMode::Shift => {
                let (segment, _) = hit?;
                let from = model.tracks.get(track)?.segment(segment)?.start;
                let origins = model
                    .tracks
                    .get(track)?
                    .segments
                    .iter()
                    .filter(|s| s.start >= from)
                    .map(|s| (s.id, s.start, s.end))
                    .collect();
                Some(ActiveElement::Shift {
                    track: track.clone(),
                    anchor: time,
                    origins,
                })
            }
            // 由输入控制器直接处理
            ToolMode::Order | ToolMode::Repeat | ToolMode::Scroll => None,
        }
    }
}

/// 单选：清除其他选择后选中命中的片段；点在空白处只清除
pub(crate) fn select_exclusive(model: &mut TimelineModel, track: &TrackId, segment: Option<SegmentId>) {
    let already = segment
        .and_then(|id| model.tracks.get(track)?.segment(id))
        .is_some_and(|s| s.selected);
    if already {
        return;
    }
    model.clear_selection();
    if let Some(segment) = segment {
        model.select(track, segment);
    }
}

pub fn delete_segment(model: &mut TimelineModel, track: &TrackId, segment: SegmentId) -> bool {
    let Some(removed) = model.tracks.get_mut(track).and_then(|t| t.remove_segment(segment)) else {
        return false;
    };
    model.record(SegmentEdit::Deleted {
        track: track.clone(),
        segment,
        start: removed.start,
        end: removed.end,
        text: removed.text,
    });
    model.segment_changed(track, segment);
    true
}

pub fn split_segment(model: &mut TimelineModel, track: &TrackId, segment: SegmentId, time: f64) -> Option<SegmentId> {
    let min = model.options.min_segment_duration;
    let tail = model.tracks.get_mut(track)?.split_segment(segment, time, min)?;
    model.record(SegmentEdit::Split {
        track: track.clone(),
        segment,
        tail,
        time,
    });
    model.segment_changed(track, segment);
    Some(tail)
}

/// 工具在一次拖动中操作的对象
#[derive(Clone, Debug, PartialEq)]
pub enum ActiveElement {
    /// 移动片段或拖动它的一条边
    Move {
        track: TrackId,
        segment: SegmentId,
        grab: SegmentHit,
        anchor: f64,
        origin: (f64, f64),
    },
    /// 新建片段，`anchor` 为按下时刻
    Create {
        track: TrackId,
        segment: SegmentId,
        anchor: f64,
    },
    /// 平移一个片段及其后的所有片段
    Shift {
        track: TrackId,
        anchor: f64,
        origins: Vec<(SegmentId, f64, f64)>,
    },
}

impl ActiveElement {
    pub fn track(&self) -> &TrackId {
        match self {
            ActiveElement::Move { track, .. }
            | ActiveElement::Create { track, .. }
            | ActiveElement::Shift { track, .. } => track,
        }
    }

    pub fn drag(&mut self, model: &mut TimelineModel, time: f64) {
        let length = model.viewport.length();
        let min = model.options.min_segment_duration;
        let track_id = self.track().clone();
        let Some(track) = model.tracks.get_mut(&track_id) else {
            return;
        };
        match self {
            ActiveElement::Move {
                segment,
                grab,
                anchor,
                origin: (start, end),
                ..
            } => {
                let delta = time - *anchor;
                let Some(seg) = track.segment_mut(*segment) else {
                    return;
                };
                match grab {
                    SegmentHit::Body => {
                        let duration = *end - *start;
                        seg.start = (*start + delta).clamp(0.0, (length - duration).max(0.0));
                        seg.end = seg.start + duration;
                    }
                    SegmentHit::StartEdge => {
                        seg.start = (*start + delta).clamp(0.0, (*end - min).max(0.0));
                    }
                    SegmentHit::EndEdge => {
                        seg.end = (*end + delta).clamp(*start + min, length.max(*start + min));
                    }
                }
            }
            ActiveElement::Create { segment, anchor, .. } => {
                let Some(seg) = track.segment_mut(*segment) else {
                    return;
                };
                let time = time.clamp(0.0, length);
                seg.start = anchor.min(time);
                seg.end = anchor.max(time);
            }
            ActiveElement::Shift { anchor, origins, .. } => {
                let earliest = origins.iter().map(|o| o.1).fold(f64::INFINITY, f64::min);
                let latest = origins.iter().map(|o| o.2).fold(f64::NEG_INFINITY, f64::max);
                // 已超出长度的组不再向右移动，但下限 0 始终优先
                let ceiling = (length - latest).max(0.0);
                let delta = (time - *anchor).min(ceiling).max(-earliest);
                for &(id, start, end) in origins.iter() {
                    if let Some(seg) = track.segment_mut(id) {
                        seg.start = start + delta;
                        seg.end = end + delta;
                    }
                }
            }
        }
        track.sort_segments();
        model.request_track(&track_id);
    }

    /// 结束拖动：记录修改并通知
    pub fn release(self, model: &mut TimelineModel) {
        let min = model.options.min_segment_duration;
        match self {
            ActiveElement::Move {
                track,
                segment,
                origin,
                ..
            } => {
                let Some(seg) = model.tracks.get(&track).and_then(|t| t.segment(segment)) else {
                    return;
                };
                let after = (seg.start, seg.end);
                if after != origin {
                    model.record(SegmentEdit::Changed {
                        track: track.clone(),
                        segment,
                        before: origin,
                        after,
                    });
                    model.segment_changed(&track, segment);
                }
            }
            ActiveElement::Create { track, segment, .. } => {
                let Some(seg) = model.tracks.get(&track).and_then(|t| t.segment(segment)) else {
                    return;
                };
                let (start, end) = (seg.start, seg.end);
                if end - start < min {
                    debug!("discarding {:.3}s segment on {}", end - start, track);
                    if let Some(t) = model.tracks.get_mut(&track) {
                        t.remove_segment(segment);
                    }
                    model.request_track(&track);
                    return;
                }
                model.record(SegmentEdit::Created {
                    track: track.clone(),
                    segment,
                    start,
                    end,
                });
                model.segment_changed(&track, segment);
            }
            ActiveElement::Shift { track, origins, .. } => {
                let Some(t) = model.tracks.get(&track) else {
                    return;
                };
                let edits: Vec<SegmentEdit> = origins
                    .iter()
                    .filter_map(|&(id, start, end)| {
                        let seg = t.segment(id)?;
                        (seg.start != start).then(|| SegmentEdit::Changed {
                            track: track.clone(),
                            segment: id,
                            before: (start, end),
                            after: (seg.start, seg.end),
                        })
                    })
                    .collect();
                for edit in edits {
                    if let SegmentEdit::Changed { segment, .. } = &edit {
                        model.emit(TimelineEvent::SegmentChanged {
                            track: track.clone(),
                            segment: *segment,
                        });
                    }
                    model.record(edit);
                }
                model.request_track(&track);
            }
        }
    }
}
