//! 框选
//!
//! 多选模式下按住拖动画出矩形，松开时按时间投影和纵向跨度选中片段。

use crate::layout::TimelineLayout;
use crate::model::TimelineModel;
use crate::structure::{SegmentId, TrackId};
use crate::viewport::Viewport;
use egui::{Pos2, Rect};

/// 移动超过这个距离（像素）才算拖动
const DRAG_THRESHOLD: f32 = 3.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    start: Pos2,
    current: Pos2,
    dragged: bool,
}

impl Selection {
    pub fn new(start: Pos2) -> Self {
        Self {
            start,
            current: start,
            dragged: false,
        }
    }

    pub fn update(&mut self, pos: Pos2) {
        self.current = pos;
        if (pos - self.start).length() > DRAG_THRESHOLD {
            self.dragged = true;
        }
    }

    pub fn dragged(&self) -> bool {
        self.dragged
    }

    pub fn start(&self) -> Pos2 {
        self.start
    }

    pub fn rect(&self) -> Rect {
        Rect::from_two_pos(self.start, self.current)
    }

    /// 松开。拖动过则框选，否则按单击切换或清除选择
    pub fn finish(self, model: &mut TimelineModel) -> usize {
        if self.dragged {
            let layout = model.layout();
            let hits = hit_test(&layout, &model.viewport, model.tracks.iter(), self.rect());
            let mut selected = 0;
            for (track, segment) in hits {
                if model.select(&track, segment) {
                    selected += 1;
                }
            }
            return selected;
        }

        let layout = model.layout();
        let time = model.viewport.pixel_to_time(self.start.x);
        let edge = super::tools::EDGE_PX as f64 * model.viewport.zoom();
        let hit = layout
            .track_at(self.start.y)
            .and_then(|index| model.tracks.at(index))
            .and_then(|track| Some((track.id.clone(), track.hit(time, edge)?.0)));
        match hit {
            Some((track, segment)) => {
                model.toggle_selected(&track, segment);
                1
            }
            None => {
                model.clear_selection();
                0
            }
        }
    }
}

/// 矩形覆盖的、尚未选中的片段
pub fn hit_test<'a>(
    layout: &TimelineLayout,
    viewport: &Viewport,
    tracks: impl Iterator<Item = &'a crate::structure::Track>,
    rect: Rect,
) -> Vec<(TrackId, SegmentId)> {
    let t0 = viewport.pixel_to_time(rect.min.x);
    let t1 = viewport.pixel_to_time(rect.max.x);
    let span = layout.track_span(rect.min.y, rect.max.y);
    tracks
        .enumerate()
        .filter(|(index, _)| span.contains(index))
        .flat_map(|(_, track)| {
            track
                .segments
                .iter()
                .filter(move |s| !s.selected && s.overlaps(t0, t1))
                .map(move |s| (track.id.clone(), s.id))
        })
        .collect()
}
