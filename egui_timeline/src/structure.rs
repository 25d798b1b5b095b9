//! 数据结构模块
//!
//! 定义了时间轴使用的核心数据结构：轨道、片段（字幕条目）以及外部解析后的字幕数据。

use crate::error::{Result, TimelineError};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static SEGMENT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// 轨道的唯一名称
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn new(name: impl Into<String>) -> Self {
        TrackId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(name: &str) -> Self {
        TrackId(name.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub u64);

impl SegmentId {
    pub fn next() -> Self {
        SegmentId(SEGMENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioId(pub String);

impl AudioId {
    pub fn new(name: impl Into<String>) -> Self {
        AudioId(name.into())
    }
}

impl fmt::Display for AudioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    #[default]
    Subtitles,
    Captions,
    Descriptions,
    Chapters,
    Metadata,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Subtitles => "subtitles",
            TrackKind::Captions => "captions",
            TrackKind::Descriptions => "descriptions",
            TrackKind::Chapters => "chapters",
            TrackKind::Metadata => "metadata",
        }
    }
}

/// 外部解析器产出的字幕条目
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub text: String,
}

impl Cue {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// 时间有限、不为负且开始早于结束
    pub fn validate(&self) -> Result<()> {
        let finite = self.start.is_finite() && self.end.is_finite();
        if finite && self.start >= 0.0 && self.start < self.end {
            Ok(())
        } else {
            Err(TimelineError::InvalidSegment {
                start: self.start,
                end: self.end,
            })
        }
    }
}

/// `add_track` 的输入
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackData {
    pub label: String,
    #[serde(default)]
    pub kind: TrackKind,
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub cues: Vec<Cue>,
}

impl TrackData {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_cues(mut self, cues: Vec<Cue>) -> Self {
        self.cues = cues;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub start: f64, // 秒
    pub end: f64,   // 秒
    pub text: String,
    #[serde(skip)]
    pub selected: bool,
}

impl Segment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            id: SegmentId::next(),
            start,
            end,
            text: text.into(),
            selected: false,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        self.start < end && self.end > start
    }
}

/// 片段上的命中区域
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentHit {
    Body,
    StartEdge,
    EndEdge,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub kind: TrackKind,
    pub lang: String,
    /// 导出时使用的格式
    pub format: String,
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub audio: Option<AudioId>,
}

impl Track {
    pub fn new(id: TrackId, kind: TrackKind, lang: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            lang: lang.into(),
            format: "json".to_string(),
            segments: Vec::new(),
            audio: None,
        }
    }

    /// 无效的条目被跳过
    pub fn from_data(data: TrackData, format: impl Into<String>) -> Self {
        let mut track = Track::new(TrackId(data.label), data.kind, data.lang);
        track.format = format.into();
        for cue in data.cues {
            if let Err(err) = track.add_segment(cue, false) {
                warn!("skipping cue on track {}: {}", track.id, err);
            }
        }
        track
    }

    /// 按开始时间有序插入
    pub fn add_segment(&mut self, cue: Cue, select: bool) -> Result<SegmentId> {
        cue.validate()?;
        let mut segment = Segment::new(cue.start, cue.end, cue.text);
        segment.selected = select;
        Ok(self.insert_segment(segment))
    }

    /// 不做检查的插入，新建工具拖动中的零长片段走这里
    pub(crate) fn insert_segment(&mut self, segment: Segment) -> SegmentId {
        let id = segment.id;
        self.insert_sorted(segment);
        id
    }

    fn insert_sorted(&mut self, segment: Segment) {
        let pos = self
            .segments
            .partition_point(|s| s.start <= segment.start);
        self.segments.insert(pos, segment);
    }

    pub fn sort_segments(&mut self) {
        self.segments
            .sort_by(|a, b| a.start.total_cmp(&b.start));
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }

    pub fn segment_mut(&mut self, id: SegmentId) -> Option<&mut Segment> {
        self.segments.iter_mut().find(|s| s.id == id)
    }

    pub fn remove_segment(&mut self, id: SegmentId) -> Option<Segment> {
        let pos = self.segments.iter().position(|s| s.id == id)?;
        Some(self.segments.remove(pos))
    }

    /// 在 `time` 处将片段一分为二，返回后半段的 id
    pub fn split_segment(&mut self, id: SegmentId, time: f64, min_duration: f64) -> Option<SegmentId> {
        let pos = self.segments.iter().position(|s| s.id == id)?;
        let segment = &self.segments[pos];
        if time - segment.start < min_duration || segment.end - time < min_duration {
            return None;
        }
        let mut tail = segment.clone();
        tail.id = SegmentId::next();
        tail.start = time;
        tail.selected = false;
        let tail_id = tail.id;
        self.segments[pos].end = time;
        self.segments.insert(pos + 1, tail);
        Some(tail_id)
    }

    /// 命中测试；`edge` 为边缘判定的时间容差。后绘制的片段优先
    pub fn hit(&self, time: f64, edge: f64) -> Option<(SegmentId, SegmentHit)> {
        self.segments
            .iter()
            .rev()
            .find(|s| time >= s.start - edge && time <= s.end + edge)
            .map(|s| {
                // 片段太窄时内部全部算作主体，只有外侧容差区可以拖边
                let has_edges = s.duration() > edge * 2.0;
                let region = if time < s.start || (has_edges && time <= s.start + edge) {
                    SegmentHit::StartEdge
                } else if time > s.end || (has_edges && time >= s.end - edge) {
                    SegmentHit::EndEdge
                } else {
                    SegmentHit::Body
                };
                (s.id, region)
            })
    }

    pub fn selected(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(|s| s.selected)
    }

    /// 清除选择，返回被取消选择的片段
    pub fn clear_selection(&mut self) -> Vec<SegmentId> {
        let mut cleared = Vec::new();
        for segment in self.segments.iter_mut().filter(|s| s.selected) {
            segment.selected = false;
            cleared.push(segment.id);
        }
        cleared
    }

    pub fn cues(&self) -> Vec<Cue> {
        self.segments
            .iter()
            .map(|s| Cue::new(s.start, s.end, s.text.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track_with(cues: &[(f64, f64)]) -> Track {
        let mut track = Track::new(TrackId::from("en"), TrackKind::Subtitles, "en");
        for &(start, end) in cues {
            track.add_segment(Cue::new(start, end, ""), false).unwrap();
        }
        track
    }

    #[test]
    fn segments_stay_sorted() {
        let track = track_with(&[(5.0, 6.0), (1.0, 2.0), (3.0, 4.0)]);
        let starts: Vec<f64> = track.segments.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn degenerate_cues_rejected() {
        let mut track = track_with(&[(1.0, 2.0)]);
        for cue in [
            Cue::new(5.0, 5.0, "x"),
            Cue::new(8.0, 2.0, "x"),
            Cue::new(f64::NAN, 3.0, "x"),
            Cue::new(1.0, f64::INFINITY, "x"),
            Cue::new(-1.0, 3.0, "x"),
        ] {
            assert!(matches!(
                track.add_segment(cue, false),
                Err(TimelineError::InvalidSegment { .. })
            ));
        }
        assert_eq!(track.segments.len(), 1);
    }

    #[test]
    fn from_data_skips_degenerate_cues() {
        let data = TrackData::new("en").with_cues(vec![
            Cue::new(1.0, 2.0, "ok"),
            Cue::new(3.0, 3.0, "empty"),
            Cue::new(f64::NAN, 4.0, "nan"),
        ]);
        let track = Track::from_data(data, "json");
        assert_eq!(track.cues(), vec![Cue::new(1.0, 2.0, "ok")]);
    }

    #[test]
    fn split_keeps_order_and_bounds() {
        let mut track = track_with(&[(0.0, 10.0)]);
        let id = track.segments[0].id;
        let tail = track.split_segment(id, 4.0, 0.1).unwrap();
        assert_eq!(track.segments.len(), 2);
        assert_eq!(track.segments[0].end, 4.0);
        assert_eq!(track.segment(tail).unwrap().start, 4.0);
        assert_eq!(track.segment(tail).unwrap().end, 10.0);
        assert!(track.split_segment(id, 3.95, 0.1).is_none());
    }

    #[test]
    fn hit_regions() {
        let track = track_with(&[(10.0, 20.0)]);
        let id = track.segments[0].id;
        assert_eq!(track.hit(15.0, 0.5), Some((id, SegmentHit::Body)));
        assert_eq!(track.hit(10.2, 0.5), Some((id, SegmentHit::StartEdge)));
        assert_eq!(track.hit(19.9, 0.5), Some((id, SegmentHit::EndEdge)));
        assert_eq!(track.hit(25.0, 0.5), None);
    }

    #[test]
    fn clear_selection_reports_cleared() {
        let mut track = track_with(&[(0.0, 1.0), (2.0, 3.0)]);
        track.segments[1].selected = true;
        let cleared = track.clear_selection();
        assert_eq!(cleared, vec![track.segments[1].id]);
        assert_eq!(track.selected().count(), 0);
    }
}
