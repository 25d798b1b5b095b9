//! # egui_timeline
//!
//! 字幕/音频轨道的交互式时间轴组件。
//!
//! ## 功能特性
//!
//! - **视图**：时间标尺、底部缩放滑块、滚轮平移与缩放、自动滚动
//! - **轨道管理**：按名称索引的轨道表，添加、替换、重命名、重排序、克隆时间轴
//! - **片段编辑**：选择、框选、移动、调整边缘、新建、分割、批量平移
//! - **AB 循环**：在标尺上拖出区间，播放越过 B 点时跳回 A 点
//! - **重绘调度**：每帧最多一次绘制，单轨修改只重绘该轨道
//! - **右键菜单**、**拖放分类**、**项目保存与导出**
//!
//! ## 基本使用
//!
//! ```
//! use egui_timeline::{Cue, Timeline, TimelineOptions, TrackData};
//!
//! let mut timeline = Timeline::new(TimelineOptions::default());
//! let data = TrackData::new("en").with_cues(vec![Cue::new(1.0, 2.5, "Hello")]);
//! let id = timeline.add_track(data, "json", false).unwrap();
//!
//! timeline.set_current_time(90.0);
//! assert_eq!(timeline.viewport().start(), 60.0);
//! assert_eq!(timeline.get_track(&id).unwrap().segments.len(), 1);
//! ```
//!
//! ## 集成到宿主应用
//!
//! ```no_run
//! use egui_timeline::{EventKind, Timeline, TimelineEvent, TimelineOptions};
//!
//! let mut timeline = Timeline::new(TimelineOptions::default());
//! timeline.on(EventKind::SegmentChanged, |event| {
//!     if let TimelineEvent::SegmentChanged { track, segment } = event {
//!         log::info!("{track} changed segment {segment:?}");
//!     }
//!     Ok(())
//! });
//!
//! // 每帧：
//! // timeline.ui(ui);
//! // for event in timeline.take_events() { ... }
//! ```

pub mod audio;
pub mod dnd;
pub mod editor;
pub mod error;
pub mod input;
pub mod layout;
pub mod menu;
pub mod model;
pub mod options;
pub mod project;
pub mod registry;
pub mod repeat;
pub mod scheduler;
pub mod slider;
pub mod structure;
pub mod ui;
pub mod utils;
pub mod viewport;

pub use audio::{AudioTable, Resampler, SampleSource, Waveform};
pub use dnd::{DropKind, UrlProbe};
pub use editor::{EventKind, TimelineCommand, TimelineEvent};
pub use error::{Result, TimelineError};
pub use input::ToolMode;
pub use menu::{MenuAction, MenuCondition, MenuContext, MenuNode};
pub use model::{EditHistory, SegmentEdit};
pub use options::TimelineOptions;
pub use project::{CueCodec, ExportedTrack, JsonCodec, ProjectFile};
pub use registry::TrackRegistry;
pub use repeat::AbRepeat;
pub use scheduler::{FrameHost, RenderPass};
pub use structure::{AudioId, Cue, Segment, SegmentId, Track, TrackData, TrackId, TrackKind};
pub use ui::{Theme, Timeline};
pub use viewport::Viewport;
