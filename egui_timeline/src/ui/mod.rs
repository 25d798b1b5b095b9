//! UI 模块
//!
//! 时间轴组件的对外入口 [`Timeline`]：轨道与音频管理、命令执行，
//! 以及每帧的指针分发、重绘调度和绘制。

mod renderer;
mod ruler;
mod toolbar;

pub use renderer::{draw_selection_box, FrameCache, Theme};
pub use ruler::{major_interval, ticks, Tick};
pub use toolbar::Toolbar;

use crate::audio::{decode_waveform, Resampler, SampleSource, Waveform};
use crate::dnd::{self, DropKind, UrlProbe};
use crate::editor::{EventKind, TimelineCommand, TimelineEvent};
use crate::error::{Result, TimelineError};
use crate::input::{self, InputController, PointerEvent, ToolMode};
use crate::menu::{MenuAction, MenuCondition, MenuContext, MenuNode, MenuTree};
use crate::model::{EditHistory, SegmentEdit, TimelineModel};
use crate::options::TimelineOptions;
use crate::project::{CodecRegistry, CueCodec, ExportedTrack, ProjectFile};
use crate::registry::TrackRegistry;
use crate::repeat::AbRepeat;
use crate::scheduler::{FrameHost, RenderScheduler};
use crate::structure::{AudioId, Cue, SegmentId, Track, TrackData, TrackId, TrackKind};
use crate::viewport::Viewport;
use egui::{
    Area, Context, Event, Frame, Id, Key, Order, PointerButton, Pos2, Rect, Response, Sense, Ui, Vec2,
};
use log::{debug, info, warn};
use std::time::Duration;

pub struct Timeline {
    model: TimelineModel,
    input: InputController,
    menu: MenuTree,
    /// 上一帧右键菜单占据的区域（屏幕坐标）
    menu_rect: Option<Rect>,
    codecs: CodecRegistry,
    cache: FrameCache,
    theme: Theme,
    url_probe: Option<Box<dyn UrlProbe>>,
    show_toolbar: bool,
}

impl Timeline {
    pub fn new(options: TimelineOptions) -> Self {
        Self::with_scheduler(options, RenderScheduler::default())
    }

    /// 使用自定义帧来源（测试或非 egui 宿主）
    pub fn with_frame_host(options: TimelineOptions, host: Box<dyn FrameHost>) -> Self {
        Self::with_scheduler(options, RenderScheduler::new(host))
    }

    fn with_scheduler(options: TimelineOptions, scheduler: RenderScheduler) -> Self {
        let input = InputController::new(options.slider_handle_width);
        let mut model = TimelineModel::new(options, scheduler);
        model.request_full();
        Self {
            model,
            input,
            menu: MenuTree::with_defaults(),
            menu_rect: None,
            codecs: CodecRegistry::new(),
            cache: FrameCache::new(),
            theme: Theme::default(),
            url_probe: None,
            show_toolbar: true,
        }
    }

    pub fn options(&self) -> &TimelineOptions {
        &self.model.options
    }

    pub fn viewport(&self) -> &Viewport {
        &self.model.viewport
    }

    pub fn tracks(&self) -> &TrackRegistry {
        &self.model.tracks
    }

    pub fn repeat(&self) -> &AbRepeat {
        &self.model.repeat
    }

    pub fn current_time(&self) -> f64 {
        self.model.playhead
    }

    pub fn tool(&self) -> ToolMode {
        self.model.tool
    }

    pub fn multi_select(&self) -> bool {
        self.model.multi_select
    }

    pub fn input(&self) -> &InputController {
        &self.input
    }

    pub fn cache(&self) -> &FrameCache {
        &self.cache
    }

    pub fn theme_mut(&mut self) -> &mut Theme {
        self.model.request_full();
        &mut self.theme
    }

    pub fn set_show_toolbar(&mut self, show: bool) {
        self.show_toolbar = show;
    }

    // ---- 事件 ----

    pub fn on(&mut self, kind: EventKind, listener: impl FnMut(&TimelineEvent) -> anyhow::Result<()> + 'static) {
        self.model.events.on(kind, Box::new(listener));
    }

    pub fn take_events(&mut self) -> Vec<TimelineEvent> {
        self.model.events.take_events()
    }

    pub fn execute_command(&mut self, command: TimelineCommand) -> Result<()> {
        debug!("command {:?}", command);
        match command {
            TimelineCommand::SetTool(tool) => self.set_tool(tool),
            TimelineCommand::SetMultiSelect(enabled) => self.model.multi_select = enabled,
            TimelineCommand::SetCurrentTime(time) => self.set_current_time(time),
            TimelineCommand::SetLength(length) => self.set_length(length)?,
            TimelineCommand::SetWidth(width) => self.set_width(width)?,
            TimelineCommand::SetAbRepeatOn(enabled) => self.set_ab_repeat_on(enabled)?,
            TimelineCommand::ClearRepeat => self.clear_repeat(),
            TimelineCommand::RemoveTrack(id) => {
                self.remove_track(&id)?;
            }
            TimelineCommand::DeleteSegment { track, segment } => {
                self.require_segment(&track, segment)?;
                input::delete_segment(&mut self.model, &track, segment);
            }
            TimelineCommand::SplitSegment { track, segment, time } => {
                self.require_segment(&track, segment)?;
                if input::split_segment(&mut self.model, &track, segment, time).is_none() {
                    debug!("split at {:.3} would leave a piece below the minimum duration", time);
                }
            }
            TimelineCommand::SelectAll => self.select_all(),
            TimelineCommand::ClearSelection => {
                self.model.clear_selection();
            }
        }
        Ok(())
    }

    fn require_segment(&self, track: &TrackId, segment: SegmentId) -> Result<()> {
        let track = self
            .model
            .tracks
            .get(track)
            .ok_or_else(|| TimelineError::TrackNotFound(track.0.clone()))?;
        track
            .segment(segment)
            .map(|_| ())
            .ok_or(TimelineError::SegmentNotFound(segment.0))
    }

    /// 切换工具。拖动中切换时先按松开处理当前交互
    pub fn set_tool(&mut self, tool: ToolMode) {
        if self.input.is_active() {
            self.input.finish(&mut self.model);
        }
        self.input.close_context_menu();
        self.model.tool = tool;
    }

    // ---- 轨道 ----

    /// 添加轨道。同名轨道存在时，`overwrite` 为 true 则原位替换，否则报错
    pub fn add_track(&mut self, data: TrackData, format: &str, overwrite: bool) -> Result<TrackId> {
        self.insert_track(Track::from_data(data, format), overwrite)
    }

    fn insert_track(&mut self, track: Track, overwrite: bool) -> Result<TrackId> {
        let id = track.id.clone();
        if self.model.tracks.contains(&id) {
            if !overwrite {
                return Err(TimelineError::NameInUse(id.0));
            }
            if self.input.is_active() {
                self.input.finish(&mut self.model);
            }
            let old = self.model.tracks.swap(track, &id, &mut self.model.audio)?;
            if let Some(history) = self.model.history.as_mut() {
                history.retarget(&old.id, &id);
            }
            info!("reloaded track {}", id);
        } else {
            let index = self.model.tracks.add(track)?;
            debug!("added track {} at index {}", id, index);
        }
        self.model.emit(TimelineEvent::AddTrack { track: id.clone() });
        self.model.request_full();
        Ok(id)
    }

    pub fn remove_track(&mut self, id: &TrackId) -> Result<Track> {
        if !self.model.tracks.contains(id) {
            return Err(TimelineError::TrackNotFound(id.0.clone()));
        }
        if self.input.is_active() {
            self.input.finish(&mut self.model);
        }
        let track = self.model.tracks.remove(id, &mut self.model.audio)?;
        self.model.emit(TimelineEvent::RemoveTrack { track: id.clone() });
        self.model.request_full();
        Ok(track)
    }

    /// 以现有轨道的时间轴新建一条空文本轨道
    pub fn clone_track_timings(
        &mut self,
        id: &TrackId,
        kind: TrackKind,
        lang: &str,
        new_name: &str,
        overwrite: bool,
    ) -> Result<TrackId> {
        let source = self
            .model
            .tracks
            .get(id)
            .ok_or_else(|| TimelineError::TrackNotFound(id.0.clone()))?;
        let data = TrackData {
            label: new_name.to_string(),
            kind,
            lang: lang.to_string(),
            cues: source
                .segments
                .iter()
                .map(|s| Cue::new(s.start, s.end, ""))
                .collect(),
        };
        let format = source.format.clone();
        self.add_track(data, &format, overwrite)
    }

    /// 修改轨道类型、语言和名称。新名称被占用且允许覆盖时，占用者被移除
    pub fn alter_track(
        &mut self,
        id: &TrackId,
        kind: TrackKind,
        lang: &str,
        new_name: &str,
        overwrite: bool,
    ) -> Result<TrackId> {
        if !self.model.tracks.contains(id) {
            return Err(TimelineError::TrackNotFound(id.0.clone()));
        }
        let new_id = TrackId::new(new_name);
        if new_id != *id && self.model.tracks.contains(&new_id) {
            if !overwrite {
                return Err(TimelineError::NameInUse(new_id.0));
            }
            self.remove_track(&new_id)?;
        }
        if let Some(track) = self.model.tracks.get_mut(id) {
            track.kind = kind;
            track.lang = lang.to_string();
        }
        self.model.tracks.rename(id, new_id.clone())?;
        if new_id != *id {
            if let Some(history) = self.model.history.as_mut() {
                history.retarget(id, &new_id);
            }
        }
        self.model.request_full();
        Ok(new_id)
    }

    pub fn has_track(&self, name: &str) -> bool {
        self.model.tracks.contains(&TrackId::new(name))
    }

    pub fn get_track(&self, id: &TrackId) -> Option<&Track> {
        self.model.tracks.get(id)
    }

    // ---- 音频 ----

    pub fn add_audio_track(&mut self, waveform: Waveform, id: AudioId) {
        debug!("audio track {} ({:.1}s)", id, waveform.duration());
        self.model.audio.add(id.clone(), waveform);
        if self.model.tracks.iter().any(|t| t.audio.as_ref() == Some(&id)) {
            self.model.request_full();
        }
    }

    /// 解码失败只通过 `on_error` 报告，不影响组件状态
    pub fn load_audio_track(
        &mut self,
        source: &mut dyn SampleSource,
        resampler: &mut dyn Resampler,
        id: AudioId,
        on_error: impl FnOnce(&TimelineError),
    ) -> bool {
        match decode_waveform(source, resampler) {
            Ok(waveform) => {
                self.add_audio_track(waveform, id);
                true
            }
            Err(err) => {
                warn!("loading audio track {} failed: {}", id, err);
                on_error(&err);
                false
            }
        }
    }

    /// 释放组件持有的引用；仍被轨道绑定时波形保留到最后一个绑定解除
    pub fn remove_audio_track(&mut self, id: &AudioId) -> Result<()> {
        if self.model.audio.release(id)? {
            self.model.request_full();
        }
        Ok(())
    }

    pub fn set_audio_track(&mut self, track: &TrackId, audio: &AudioId) -> Result<()> {
        if !self.model.tracks.contains(track) {
            return Err(TimelineError::TrackNotFound(track.0.clone()));
        }
        self.model.audio.bind(audio)?;
        let previous = self
            .model
            .tracks
            .get_mut(track)
            .and_then(|t| t.audio.replace(audio.clone()));
        if let Some(previous) = previous {
            self.model.audio.unbind(&previous);
        }
        self.model.request_track(track);
        Ok(())
    }

    pub fn unset_audio_track(&mut self, track: &TrackId) -> Result<()> {
        let previous = self
            .model
            .tracks
            .get_mut(track)
            .ok_or_else(|| TimelineError::TrackNotFound(track.0.clone()))?
            .audio
            .take();
        if let Some(previous) = previous {
            self.model.audio.unbind(&previous);
            self.model.request_track(track);
        }
        Ok(())
    }

    // ---- 片段 ----

    pub fn add_segment(&mut self, track: &TrackId, cue: Cue, select: bool) -> Result<SegmentId> {
        let target = self
            .model
            .tracks
            .get_mut(track)
            .ok_or_else(|| TimelineError::TrackNotFound(track.0.clone()))?;
        let segment = target.add_segment(cue, select)?;
        let (start, end) = target
            .segment(segment)
            .map(|s| (s.start, s.end))
            .ok_or(TimelineError::SegmentNotFound(segment.0))?;
        self.model.record(SegmentEdit::Created {
            track: track.clone(),
            segment,
            start,
            end,
        });
        if select {
            self.model.emit(TimelineEvent::Select {
                track: track.clone(),
                segment,
            });
        }
        self.model.segment_changed(track, segment);
        Ok(segment)
    }

    pub fn select_all(&mut self) {
        let pending: Vec<(TrackId, SegmentId)> = self
            .model
            .tracks
            .iter()
            .flat_map(|t| {
                t.segments
                    .iter()
                    .filter(|s| !s.selected)
                    .map(move |s| (t.id.clone(), s.id))
            })
            .collect();
        for (track, segment) in pending {
            self.model.select(&track, segment);
        }
    }

    // ---- 导出 ----

    pub fn register_codec(&mut self, codec: Box<dyn CueCodec>) {
        self.codecs.register(codec);
    }

    /// `ids` 为 None 时导出全部轨道
    pub fn export_tracks(&self, ids: Option<&[TrackId]>) -> Result<Vec<ExportedTrack>> {
        let tracks: Vec<&Track> = match ids {
            None => self.model.tracks.iter().collect(),
            Some(ids) => ids
                .iter()
                .map(|id| {
                    self.model
                        .tracks
                        .get(id)
                        .ok_or_else(|| TimelineError::TrackNotFound(id.0.clone()))
                })
                .collect::<Result<_>>()?,
        };
        self.codecs.export(tracks)
    }

    pub fn to_project(&self) -> ProjectFile {
        let mut options = self.model.options.clone();
        options.view_start = self.model.viewport.start();
        options.view_end = self.model.viewport.end();
        options.multi_select = self.model.multi_select;
        ProjectFile::new(options, self.model.tracks.iter().cloned().collect())
    }

    /// 用项目替换全部轨道和视图。音频绑定不随项目保存
    pub fn load_project(&mut self, project: ProjectFile) -> Result<()> {
        let mut tracks = TrackRegistry::new();
        for mut track in project.tracks {
            track.audio = None;
            tracks.add(track)?;
        }
        for id in self.model.tracks.ids() {
            self.remove_track(&id)?;
        }
        let options = project.options;
        self.model.viewport = Viewport::new(options.length, options.view_start, options.view_end, options.width);
        self.model.multi_select = options.multi_select;
        self.model.playhead = self.model.playhead.min(options.length);
        self.input = InputController::new(options.slider_handle_width);
        self.model.options = options;
        self.model.tracks = tracks;
        for id in self.model.tracks.ids() {
            self.model.emit(TimelineEvent::AddTrack { track: id });
        }
        self.model.request_full();
        info!("loaded project with {} tracks", self.model.tracks.len());
        Ok(())
    }

    // ---- 右键菜单 ----

    pub fn add_menu_item(
        &mut self,
        path: &str,
        action: Option<MenuAction>,
        condition: Option<MenuCondition>,
        position: Option<usize>,
    ) -> Result<()> {
        self.menu.add_item(path, action, condition, position)
    }

    pub fn get_menu_items(&self, path: &str) -> Option<&[MenuNode]> {
        self.menu.items(path)
    }

    // ---- 带副作用的属性 ----

    pub fn set_length(&mut self, length: f64) -> Result<()> {
        if !length.is_finite() || length <= 0.0 {
            return Err(TimelineError::InvalidDimension { name: "length", value: length });
        }
        self.model.viewport.set_length(length);
        self.model.options.length = length;
        if self.model.playhead > length {
            self.model.playhead = length;
        }
        self.model.request_full();
        Ok(())
    }

    pub fn set_width(&mut self, width: f32) -> Result<()> {
        if !width.is_finite() || width < 1.0 {
            return Err(TimelineError::InvalidDimension {
                name: "width",
                value: width as f64,
            });
        }
        self.model.viewport.set_width(width);
        self.model.options.width = width;
        self.model.request_full();
        Ok(())
    }

    /// 移动播放头。目标在视图外时视图居中到该处；AB 循环启用且越过 B 点时跳回 A 点
    pub fn set_current_time(&mut self, time: f64) {
        if !time.is_finite() {
            return;
        }
        let mut time = time.clamp(0.0, self.model.viewport.length());
        if let Some(a) = self.model.repeat.wrap(time) {
            time = a;
            self.model.emit(TimelineEvent::Jump { time });
        }
        if !self.model.viewport.contains(time) {
            self.model.viewport.center(time);
        }
        self.model.playhead = time;
        self.model.emit(TimelineEvent::TimeUpdate { time });
        self.model.request_full();
    }

    pub fn set_ab_repeat_on(&mut self, enabled: bool) -> Result<()> {
        let change = self
            .model
            .repeat
            .set_enabled(enabled)
            .ok_or(TimelineError::RepeatRangeUnset)?;
        self.model.emit_repeat_change(change);
        self.model.request_full();
        Ok(())
    }

    pub fn clear_repeat(&mut self) {
        let change = self.model.repeat.clear();
        self.model.emit_repeat_change(change);
        self.model.request_full();
    }

    pub fn set_history(&mut self, history: Box<dyn EditHistory>) {
        self.model.history = Some(history);
    }

    /// 资源未就绪时完整重绘会逐帧推迟
    pub fn set_assets_ready(&mut self, ready: bool) {
        self.model.assets_ready = ready;
    }

    // ---- 拖放 ----

    pub fn set_url_probe(&mut self, probe: Box<dyn UrlProbe>) {
        self.url_probe = Some(probe);
    }

    pub fn drop_file(&mut self, name: &str, mime: Option<&str>) -> Option<DropKind> {
        let kind = dnd::classify_file(name, mime)?;
        self.model.emit(TimelineEvent::DropTrack {
            kind,
            source: name.to_string(),
        });
        Some(kind)
    }

    pub fn drop_url(&mut self, url: &str) -> Result<Option<DropKind>> {
        let probe = self
            .url_probe
            .as_mut()
            .ok_or_else(|| TimelineError::Load(format!("no probe available for {url}")))?;
        let kind = dnd::classify_url(url, probe.as_mut())?;
        if let Some(kind) = kind {
            self.model.emit(TimelineEvent::DropTrack {
                kind,
                source: url.to_string(),
            });
        }
        Ok(kind)
    }

    // ---- 每帧 ----

    pub fn ui(&mut self, ui: &mut Ui) -> Response {
        self.model.scheduler.attach(ui.ctx());

        if self.show_toolbar {
            let mut toolbar = Toolbar::new(self.model.tool, self.model.multi_select);
            toolbar.set_current_time(self.model.playhead);
            toolbar.set_repeat(self.model.repeat.is_set(), self.model.repeat.enabled());
            let mut commands = Vec::new();
            toolbar.ui(ui, &mut |cmd| commands.push(cmd));
            for command in commands {
                self.run_command(command);
            }
            ui.separator();
        }

        let width = ui.available_width().max(1.0);
        if (width - self.model.viewport.width()).abs() >= 1.0 {
            self.run_command(TimelineCommand::SetWidth(width));
        }

        let layout = self.model.layout();
        let (rect, response) = ui.allocate_exact_size(layout.size(), Sense::click_and_drag());

        self.handle_pointer(ui, rect);
        self.handle_scroll(ui, &response);
        self.handle_drops(ui, rect);

        let now = ui.input(|i| i.time);
        self.input.tick(&mut self.model, now);
        if let Some(period) = self.input.timer_period() {
            ui.ctx().request_repaint_after(Duration::from_secs_f64(period));
        }

        if let Some(pass) = self.model.scheduler.poll(self.model.assets_ready) {
            let model = &self.model;
            let cache = &mut self.cache;
            let theme = &self.theme;
            let slider = self.input.slider();
            ui.ctx()
                .fonts(|fonts| cache.render(&pass, model, slider, theme, Some(fonts)));
        }

        let painter = ui.painter_at(rect);
        self.cache.paint(&painter, rect.min);
        if let Some(selection) = self.input.selection_rect() {
            draw_selection_box(&painter, selection.translate(rect.min.to_vec2()), &self.theme);
        }

        if let Some(pos) = response.hover_pos() {
            let cursor = self.input.cursor(&self.model, pos - rect.min.to_vec2());
            ui.ctx().set_cursor_icon(cursor);
        }

        self.context_menu_ui(ui.ctx(), rect.min);
        response
    }

    fn run_command(&mut self, command: TimelineCommand) {
        if let Err(err) = self.execute_command(command) {
            warn!("timeline command failed: {}", err);
        }
    }

    fn handle_pointer(&mut self, ui: &Ui, rect: Rect) {
        let (latest, primary_pressed, secondary_pressed, primary_released, moved, gone, time, modifiers) =
            ui.input(|i| {
                (
                    i.pointer.latest_pos(),
                    i.pointer.primary_pressed(),
                    i.pointer.secondary_pressed(),
                    i.pointer.primary_released(),
                    i.pointer.delta() != Vec2::ZERO,
                    i.events.iter().any(|e| matches!(e, Event::PointerGone)),
                    i.time,
                    i.modifiers,
                )
            });

        let Some(pos) = latest else {
            if gone {
                self.input.pointer_leave(&mut self.model);
            }
            return;
        };
        let inside = rect.contains(pos);
        let over_menu = self.menu_rect.is_some_and(|r| r.contains(pos));
        let event = |button: PointerButton| PointerEvent {
            pos: pos - rect.min.to_vec2(),
            time,
            button,
            modifiers,
        };

        if inside && !over_menu {
            if secondary_pressed {
                self.input.pointer_down(&mut self.model, event(PointerButton::Secondary));
            }
            if primary_pressed {
                self.input.pointer_down(&mut self.model, event(PointerButton::Primary));
            }
        }
        if self.input.is_active() && moved {
            if inside {
                self.input.pointer_move(&mut self.model, event(PointerButton::Primary));
            } else {
                self.input.pointer_leave(&mut self.model);
            }
        }
        if primary_released {
            self.input.pointer_up(&mut self.model, event(PointerButton::Primary));
        }
        if gone {
            self.input.pointer_leave(&mut self.model);
        }
    }

    /// Ctrl+滚轮（或触控板缩放）缩放视图，滚轮平移
    fn handle_scroll(&mut self, ui: &Ui, response: &Response) {
        if !response.hovered() || self.input.is_active() {
            return;
        }
        let (zoom, scroll, hover) = ui.input(|i| (i.zoom_delta(), i.smooth_scroll_delta, i.pointer.hover_pos()));
        let viewport = &mut self.model.viewport;
        if zoom != 1.0 {
            let anchor = hover
                .map(|p| viewport.pixel_to_time(p.x - response.rect.min.x))
                .unwrap_or_else(|| (viewport.start() + viewport.end()) / 2.0);
            viewport.zoom_about(1.0 / zoom as f64, anchor);
            self.model.request_full();
        } else if scroll != Vec2::ZERO {
            let pixels = if scroll.x != 0.0 { scroll.x } else { scroll.y };
            let delta = -(pixels as f64) * viewport.zoom();
            viewport.move_by(delta);
            self.model.request_full();
        }
    }

    fn handle_drops(&mut self, ui: &Ui, rect: Rect) {
        let (dropped, hover) = ui.input(|i| (i.raw.dropped_files.clone(), i.pointer.hover_pos()));
        if dropped.is_empty() || hover.is_some_and(|p| !rect.contains(p)) {
            return;
        }
        for file in dropped {
            let name = match &file.path {
                Some(path) => path.display().to_string(),
                None => file.name.clone(),
            };
            let mime = (!file.mime.is_empty()).then_some(file.mime.as_str());
            self.drop_file(&name, mime);
        }
    }

    fn context_menu_ui(&mut self, ctx: &Context, origin: Pos2) {
        let Some(open) = self.input.context_menu().cloned() else {
            self.menu_rect = None;
            return;
        };
        let mut chosen: Option<Option<TimelineCommand>> = None;
        let menu = &self.menu;
        let area = Area::new(Id::new("timeline_context_menu"))
            .order(Order::Foreground)
            .fixed_pos(origin + open.pos.to_vec2())
            .show(ctx, |ui| {
                Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_min_width(160.0);
                    let items = menu.visible_items("", &open.context);
                    let mut shown = 0;
                    for node in items {
                        if menu_node_ui(ui, node, &open.context, &mut chosen) {
                            shown += 1;
                        }
                    }
                    if shown == 0 {
                        ui.weak("No actions");
                    }
                });
            });

        let area_rect = area.response.rect;
        let dismissed = ctx.input(|i| {
            i.key_pressed(Key::Escape)
                || (i.pointer.primary_pressed()
                    && i.pointer.interact_pos().is_some_and(|p| !area_rect.contains(p)))
        });
        self.menu_rect = Some(area_rect);
        if chosen.is_some() || dismissed {
            self.input.close_context_menu();
            self.menu_rect = None;
        }
        if let Some(Some(command)) = chosen {
            self.run_command(command);
        }
    }
}

/// 画一个菜单节点；有可见子节点时作为子菜单。返回是否画出
fn menu_node_ui(
    ui: &mut Ui,
    node: &MenuNode,
    ctx: &MenuContext,
    chosen: &mut Option<Option<TimelineCommand>>,
) -> bool {
    let children: Vec<&MenuNode> = node.children.iter().filter(|c| c.is_visible(ctx)).collect();
    if !children.is_empty() {
        ui.menu_button(node.label.as_str(), |ui| {
            for child in children {
                menu_node_ui(ui, child, ctx, chosen);
            }
        });
        return true;
    }
    if node.action.is_none() {
        return false;
    }
    if ui.button(node.label.as_str()).clicked() {
        *chosen = Some(node.activate(ctx));
        ui.close_menu();
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::tests::ManualHost;
    use crate::scheduler::RenderRequest;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn timeline() -> Timeline {
        Timeline::with_frame_host(TimelineOptions::default(), Box::new(ManualHost::default()))
    }

    fn data(label: &str, cues: &[(f64, f64)]) -> TrackData {
        TrackData::new(label).with_cues(cues.iter().map(|&(s, e)| Cue::new(s, e, "x")).collect())
    }

    fn id(name: &str) -> TrackId {
        TrackId::from(name)
    }

    #[derive(Default)]
    struct RecordingHistory {
        edits: Rc<RefCell<Vec<SegmentEdit>>>,
        retargets: Rc<RefCell<Vec<(TrackId, TrackId)>>>,
    }

    impl EditHistory for RecordingHistory {
        fn record(&mut self, edit: SegmentEdit) {
            self.edits.borrow_mut().push(edit);
        }

        fn retarget(&mut self, old: &TrackId, new: &TrackId) {
            self.retargets.borrow_mut().push((old.clone(), new.clone()));
        }
    }

    #[test]
    fn current_time_inside_view_keeps_view() {
        let mut timeline = timeline();
        timeline.set_current_time(30.0);
        assert_eq!(timeline.current_time(), 30.0);
        assert_eq!((timeline.viewport().start(), timeline.viewport().end()), (0.0, 60.0));
        assert_eq!(timeline.take_events(), vec![TimelineEvent::TimeUpdate { time: 30.0 }]);
    }

    #[test]
    fn current_time_outside_view_recenters() {
        let mut timeline = timeline();
        timeline.set_current_time(90.0);
        assert_eq!((timeline.viewport().start(), timeline.viewport().end()), (60.0, 120.0));
        assert_eq!(timeline.current_time(), 90.0);
    }

    #[test]
    fn current_time_wraps_to_repeat_start() {
        let mut timeline = timeline();
        timeline.model.repeat.press(10.0);
        timeline.model.repeat.drag(20.0);
        timeline.model.repeat.release();
        timeline.take_events();

        timeline.set_current_time(21.0);
        assert_eq!(timeline.current_time(), 10.0);
        assert_eq!(
            timeline.take_events(),
            vec![TimelineEvent::Jump { time: 10.0 }, TimelineEvent::TimeUpdate { time: 10.0 }]
        );
    }

    #[test]
    fn duplicate_track_name_needs_overwrite() {
        let mut timeline = timeline();
        let history = RecordingHistory::default();
        let retargets = Rc::clone(&history.retargets);
        timeline.set_history(Box::new(history));

        timeline.add_track(data("de", &[]), "json", false).unwrap();
        timeline.add_track(data("en", &[(1.0, 2.0)]), "json", false).unwrap();
        let err = timeline.add_track(data("en", &[]), "json", false).unwrap_err();
        assert!(matches!(err, TimelineError::NameInUse(name) if name == "en"));
        assert_eq!(timeline.get_track(&id("en")).unwrap().segments.len(), 1);

        timeline
            .add_track(data("en", &[(3.0, 4.0), (5.0, 6.0)]), "json", true)
            .unwrap();
        assert_eq!(timeline.tracks().index_of(&id("en")), Some(1));
        assert_eq!(timeline.tracks().len(), 2);
        assert_eq!(timeline.get_track(&id("en")).unwrap().segments.len(), 2);
        assert_eq!(*retargets.borrow(), vec![(id("en"), id("en"))]);
    }

    #[test]
    fn remove_track_emits_and_reindexes() {
        let mut timeline = timeline();
        for name in ["a", "b", "c"] {
            timeline.add_track(data(name, &[]), "json", false).unwrap();
        }
        timeline.take_events();
        timeline.remove_track(&id("b")).unwrap();
        assert_eq!(timeline.tracks().index_of(&id("c")), Some(1));
        assert_eq!(timeline.take_events(), vec![TimelineEvent::RemoveTrack { track: id("b") }]);
        assert!(matches!(
            timeline.remove_track(&id("b")),
            Err(TimelineError::TrackNotFound(_))
        ));
    }

    #[test]
    fn clone_timings_drops_text() {
        let mut timeline = timeline();
        timeline.add_track(data("en", &[(1.0, 2.0), (4.0, 5.0)]), "json", false).unwrap();
        let copy = timeline
            .clone_track_timings(&id("en"), TrackKind::Captions, "fr", "fr", false)
            .unwrap();
        let track = timeline.get_track(&copy).unwrap();
        assert_eq!(track.kind, TrackKind::Captions);
        assert_eq!(track.lang, "fr");
        assert_eq!(
            track.cues(),
            vec![Cue::new(1.0, 2.0, ""), Cue::new(4.0, 5.0, "")]
        );
    }

    #[test]
    fn alter_track_renames_in_place() {
        let mut timeline = timeline();
        timeline.add_track(data("a", &[]), "json", false).unwrap();
        timeline.add_track(data("b", &[]), "json", false).unwrap();
        assert!(matches!(
            timeline.alter_track(&id("a"), TrackKind::Chapters, "en", "b", false),
            Err(TimelineError::NameInUse(_))
        ));
        assert!(timeline.has_track("a"));

        let renamed = timeline
            .alter_track(&id("a"), TrackKind::Chapters, "en", "c", false)
            .unwrap();
        assert_eq!(timeline.tracks().index_of(&renamed), Some(0));
        assert!(!timeline.has_track("a"));

        timeline
            .alter_track(&id("c"), TrackKind::Chapters, "en", "b", true)
            .unwrap();
        assert_eq!(timeline.tracks().ids(), vec![id("b")]);
        assert_eq!(timeline.get_track(&id("b")).unwrap().kind, TrackKind::Chapters);
    }

    #[test]
    fn audio_refcount_follows_bindings() {
        let mut timeline = timeline();
        let audio = AudioId::new("voice");
        timeline.add_track(data("a", &[]), "json", false).unwrap();
        timeline.add_track(data("b", &[]), "json", false).unwrap();
        timeline.add_audio_track(Waveform::new(100, vec![0.0; 100]), audio.clone());
        timeline.set_audio_track(&id("a"), &audio).unwrap();
        timeline.set_audio_track(&id("b"), &audio).unwrap();
        assert_eq!(timeline.model.audio.refs(&audio), 3);

        timeline.remove_audio_track(&audio).unwrap();
        timeline.remove_audio_track(&audio).unwrap();
        assert_eq!(timeline.model.audio.refs(&audio), 2);
        timeline.remove_track(&id("a")).unwrap();
        assert_eq!(timeline.model.audio.refs(&audio), 1);
        timeline.unset_audio_track(&id("b")).unwrap();
        assert!(!timeline.model.audio.contains(&audio));
        assert!(matches!(
            timeline.set_audio_track(&id("b"), &audio),
            Err(TimelineError::AudioNotFound(_))
        ));
    }

    struct FailingSource;

    impl SampleSource for FailingSource {
        fn read(&mut self, _buffer: &mut [f32]) -> Result<usize> {
            Err(TimelineError::Load("truncated stream".into()))
        }

        fn sample_rate(&self) -> u32 {
            44_100
        }
    }

    struct Passthrough;

    impl Resampler for Passthrough {
        fn output_rate(&self) -> u32 {
            44_100
        }

        fn process(&mut self, input: &[f32]) -> Vec<f32> {
            input.to_vec()
        }
    }

    #[test]
    fn audio_load_failure_goes_to_callback() {
        let mut timeline = timeline();
        let mut reported = None;
        let loaded = timeline.load_audio_track(&mut FailingSource, &mut Passthrough, AudioId::new("x"), |err| {
            reported = Some(err.to_string())
        });
        assert!(!loaded);
        assert_eq!(reported.as_deref(), Some("load failed: truncated stream"));
        assert!(!timeline.model.audio.contains(&AudioId::new("x")));
    }

    #[test]
    fn repeat_cannot_enable_without_range() {
        let mut timeline = timeline();
        assert!(matches!(
            timeline.set_ab_repeat_on(true),
            Err(TimelineError::RepeatRangeUnset)
        ));
        assert!(!timeline.repeat().enabled());
        timeline.model.repeat.press(5.0);
        timeline.model.repeat.drag(8.0);
        timeline.set_ab_repeat_on(true).unwrap();
        assert!(timeline.repeat().enabled());
        timeline.execute_command(TimelineCommand::ClearRepeat).unwrap();
        assert!(!timeline.repeat().is_set());
        assert!(!timeline.repeat().enabled());
    }

    #[test]
    fn invalid_dimensions_rejected() {
        let mut timeline = timeline();
        assert!(timeline.set_length(0.0).is_err());
        assert!(timeline.set_width(f32::NAN).is_err());
        assert_eq!(timeline.viewport().length(), 1800.0);

        timeline.set_current_time(100.0);
        timeline.set_length(50.0).unwrap();
        assert_eq!(timeline.current_time(), 50.0);
        assert!(timeline.viewport().end() <= 50.0);
    }

    #[test]
    fn tool_switch_mid_drag_finishes_interaction() {
        let mut timeline = timeline();
        timeline.add_track(data("a", &[]), "json", false).unwrap();
        timeline.set_tool(ToolMode::Repeat);
        // 宽 800、视图 60 秒：x = 200 对应 15 秒
        let down = PointerEvent::primary(Pos2::new(200.0, 50.0), 0.0);
        timeline.input.pointer_down(&mut timeline.model, down);
        timeline
            .input
            .pointer_move(&mut timeline.model, PointerEvent::primary(Pos2::new(400.0, 50.0), 0.1));
        timeline.execute_command(TimelineCommand::SetTool(ToolMode::Select)).unwrap();
        assert!(!timeline.input().is_active());
        assert!(timeline.repeat().enabled());
        assert_eq!(timeline.tool(), ToolMode::Select);
    }

    #[test]
    fn segment_commands_validate_ids() {
        let mut timeline = timeline();
        let history = RecordingHistory::default();
        let edits = Rc::clone(&history.edits);
        timeline.set_history(Box::new(history));
        timeline.add_track(data("a", &[]), "json", false).unwrap();
        let segment = timeline.add_segment(&id("a"), Cue::new(2.0, 6.0, "hi"), true).unwrap();
        assert!(timeline.get_track(&id("a")).unwrap().segment(segment).unwrap().selected);

        timeline
            .execute_command(TimelineCommand::SplitSegment {
                track: id("a"),
                segment,
                time: 4.0,
            })
            .unwrap();
        assert_eq!(timeline.get_track(&id("a")).unwrap().segments.len(), 2);
        timeline
            .execute_command(TimelineCommand::DeleteSegment { track: id("a"), segment })
            .unwrap();
        assert_eq!(timeline.get_track(&id("a")).unwrap().segments.len(), 1);
        assert!(matches!(
            timeline.execute_command(TimelineCommand::DeleteSegment { track: id("a"), segment }),
            Err(TimelineError::SegmentNotFound(_))
        ));
        assert_eq!(edits.borrow().len(), 3);
    }

    #[test]
    fn degenerate_segments_rejected_before_mutation() {
        let mut timeline = timeline();
        let history = RecordingHistory::default();
        let edits = Rc::clone(&history.edits);
        timeline.set_history(Box::new(history));
        timeline.add_track(data("a", &[(1.0, 2.0)]), "json", false).unwrap();
        timeline.take_events();
        edits.borrow_mut().clear();

        for cue in [Cue::new(5.0, 5.0, ""), Cue::new(f64::NAN, 3.0, ""), Cue::new(6.0, 4.0, "")] {
            assert!(matches!(
                timeline.add_segment(&id("a"), cue, true),
                Err(TimelineError::InvalidSegment { .. })
            ));
        }
        assert_eq!(timeline.get_track(&id("a")).unwrap().segments.len(), 1);
        assert!(timeline.take_events().is_empty());
        assert!(edits.borrow().is_empty());
    }

    #[test]
    fn select_all_then_clear() {
        let mut timeline = timeline();
        timeline.add_track(data("a", &[(1.0, 2.0), (3.0, 4.0)]), "json", false).unwrap();
        timeline.add_track(data("b", &[(1.0, 2.0)]), "json", false).unwrap();
        timeline.take_events();
        timeline.execute_command(TimelineCommand::SelectAll).unwrap();
        let selects = timeline
            .take_events()
            .iter()
            .filter(|e| e.kind() == EventKind::Select)
            .count();
        assert_eq!(selects, 3);
        timeline.execute_command(TimelineCommand::ClearSelection).unwrap();
        let unselects = timeline
            .take_events()
            .iter()
            .filter(|e| e.kind() == EventKind::Unselect)
            .count();
        assert_eq!(unselects, 3);
    }

    #[test]
    fn export_selected_and_unknown_ids() {
        let mut timeline = timeline();
        timeline.add_track(data("a", &[(1.0, 2.0)]), "json", false).unwrap();
        timeline.add_track(data("b", &[]), "json", false).unwrap();
        assert_eq!(timeline.export_tracks(None).unwrap().len(), 2);
        let only_b = timeline.export_tracks(Some(&[id("b")])).unwrap();
        assert_eq!(only_b[0].target, id("b"));
        assert!(timeline.export_tracks(Some(&[id("zz")])).is_err());
    }

    #[test]
    fn project_round_trip_replaces_tracks() {
        let mut source = timeline();
        source.add_track(data("a", &[(1.0, 2.0)]), "json", false).unwrap();
        source.set_current_time(200.0);
        let project = source.to_project();

        let mut target = timeline();
        target.add_track(data("old", &[]), "json", false).unwrap();
        target.load_project(project).unwrap();
        assert_eq!(target.tracks().ids(), vec![id("a")]);
        assert_eq!(target.viewport().start(), source.viewport().start());
    }

    #[test]
    fn drops_are_classified() {
        struct Probe;
        impl UrlProbe for Probe {
            fn content_type(&mut self, _url: &str) -> Result<String> {
                Ok("audio/ogg".into())
            }
        }

        let mut timeline = timeline();
        assert_eq!(timeline.drop_file("talk.srt", None), Some(DropKind::Subtitle));
        assert_eq!(timeline.drop_file("photo.png", None), None);
        assert!(timeline.drop_url("https://example.com/a").is_err());
        timeline.set_url_probe(Box::new(Probe));
        assert_eq!(
            timeline.drop_url("https://example.com/a").unwrap(),
            Some(DropKind::Audio)
        );
        let drops = timeline
            .take_events()
            .into_iter()
            .filter(|e| e.kind() == EventKind::DropTrack)
            .count();
        assert_eq!(drops, 2);
    }

    #[test]
    fn menu_items_extend_defaults() {
        let mut timeline = timeline();
        assert!(timeline
            .add_menu_item("Track.Rename", None, None, None)
            .is_err());
        timeline
            .add_menu_item(
                "Track.Select all",
                Some(Box::new(|_| Some(TimelineCommand::SelectAll))),
                None,
                Some(0),
            )
            .unwrap();
        let labels: Vec<&str> = timeline
            .get_menu_items("Track")
            .unwrap()
            .iter()
            .map(|n| n.label.as_str())
            .collect();
        assert_eq!(labels, vec!["Select all", "Remove"]);
    }

    #[test]
    fn listener_sees_events_and_redraws_coalesce() {
        let host = ManualHost::default();
        let log = Rc::clone(&host.log);
        let mut timeline = Timeline::with_frame_host(TimelineOptions::default(), Box::new(host));
        let seen = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&seen);
        timeline.on(EventKind::AddTrack, move |_| {
            *counter.borrow_mut() += 1;
            Ok(())
        });
        timeline.add_track(data("a", &[]), "json", false).unwrap();
        timeline.add_segment(&id("a"), Cue::new(1.0, 2.0, ""), false).unwrap();
        assert_eq!(*seen.borrow(), 1);
        // 构造时的完整重绘一直挂起，后续请求都被它覆盖
        assert_eq!(log.borrow().requested.len(), 1);
        assert_eq!(timeline.model.scheduler.pending(), Some(RenderRequest::Full));
    }
}
