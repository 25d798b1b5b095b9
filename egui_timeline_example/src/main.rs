use eframe::egui::{self, TopBottomPanel};
use egui_timeline::{
    AudioId, Cue, CueCodec, DropKind, JsonCodec, ProjectFile, Timeline, TimelineEvent, TimelineOptions, TrackData, TrackKind,
    Waveform,
};
use rfd::FileDialog;
use std::fs;
use std::path::{Path, PathBuf};

fn main() -> eframe::Result<()> {
    env_logger::init();

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "egui_timeline Example",
        native_options,
        Box::new(|_cc| Ok(Box::new(TimelineApp::new()))),
    )
}

struct TimelineApp {
    timeline: Timeline,
    current_path: Option<PathBuf>,
    status_line: String,
    playing: bool,
}

impl TimelineApp {
    fn new() -> Self {
        let mut timeline = Timeline::new(TimelineOptions::default());

        let english = TrackData::new("en").with_cues(vec![
            Cue::new(1.0, 3.5, "Hello there."),
            Cue::new(4.0, 6.0, "How are you?"),
            Cue::new(8.0, 12.5, "Fine, thanks."),
        ]);
        let mut chapters = TrackData::new("chapters").with_cues(vec![
            Cue::new(0.0, 20.0, "Intro"),
            Cue::new(20.0, 45.0, "Part one"),
        ]);
        chapters.kind = TrackKind::Chapters;

        for data in [english, chapters] {
            if let Err(err) = timeline.add_track(data, "json", false) {
                log::warn!("demo track: {err}");
            }
        }

        // 合成一段 60 秒的正弦包络作为示例音频
        let rate = 1_000;
        let samples = (0..rate * 60)
            .map(|i| {
                let t = i as f32 / rate as f32;
                (t * 40.0).sin() * (t * 0.5).sin().abs()
            })
            .collect();
        let audio = AudioId::new("demo");
        timeline.add_audio_track(Waveform::new(rate as u32, samples), audio.clone());
        if let Err(err) = timeline.set_audio_track(&"en".into(), &audio) {
            log::warn!("demo audio: {err}");
        }

        Self {
            timeline,
            current_path: None,
            status_line: "Ready".to_owned(),
            playing: false,
        }
    }

    fn menu_bar(&mut self, ui: &mut egui::Ui) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Open Project...").clicked() {
                    self.open_project_dialog();
                    ui.close_menu();
                }
                if ui.button("Save Project").clicked() {
                    self.save_project();
                    ui.close_menu();
                }
                if ui.button("Save Project As...").clicked() {
                    self.save_project_as_dialog();
                    ui.close_menu();
                }
                ui.separator();
                if ui.button("Import Track...").clicked() {
                    self.import_track_dialog();
                    ui.close_menu();
                }
                if ui.button("Export Tracks...").clicked() {
                    self.export_tracks_dialog();
                    ui.close_menu();
                }
            });

            let label = if self.playing { "Pause" } else { "Play" };
            if ui.button(label).clicked() {
                self.playing = !self.playing;
            }

            if let Some(path) = &self.current_path {
                ui.label(format!(" Project: {}", path.display()));
            } else {
                ui.label(" Project: (unsaved)");
            }
        });
    }

    fn open_project_dialog(&mut self) {
        if let Some(path) = FileDialog::new().add_filter("Timeline Project", &["json"]).pick_file() {
            let result = ProjectFile::load_from_path(&path).and_then(|p| self.timeline.load_project(p));
            match result {
                Ok(()) => {
                    self.current_path = Some(path.clone());
                    self.set_status(format!("Opened {}", path.display()));
                }
                Err(err) => self.set_error(err.to_string()),
            }
        }
    }

    fn save_project(&mut self) {
        if let Some(path) = self.current_path.clone() {
            match self.timeline.to_project().save_to_path(&path) {
                Ok(()) => self.set_status(format!("Saved {}", path.display())),
                Err(err) => self.set_error(err.to_string()),
            }
        } else {
            self.save_project_as_dialog();
        }
    }

    fn save_project_as_dialog(&mut self) {
        if let Some(path) = FileDialog::new()
            .add_filter("Timeline Project", &["json"])
            .set_file_name("timeline.json")
            .save_file()
        {
            self.current_path = Some(path);
            self.save_project();
        }
    }

    fn import_track_dialog(&mut self) {
        if let Some(path) = FileDialog::new().add_filter("Track", &["json"]).pick_file() {
            self.import_track(&path);
        }
    }

    fn import_track(&mut self, path: &Path) {
        match read_track_file(path) {
            Ok(data) => {
                let label = data.label.clone();
                match self.timeline.add_track(data, "json", true) {
                    Ok(_) => self.set_status(format!("Imported track {label}")),
                    Err(err) => self.set_error(err.to_string()),
                }
            }
            Err(err) => self.set_error(err),
        }
    }

    fn export_tracks_dialog(&mut self) {
        let Some(dir) = FileDialog::new().pick_folder() else {
            return;
        };
        let exported = match self.timeline.export_tracks(None) {
            Ok(exported) => exported,
            Err(err) => return self.set_error(err.to_string()),
        };
        for track in &exported {
            if let Err(err) = fs::write(dir.join(&track.name), &track.payload) {
                return self.set_error(format!("Failed to write {}: {err}", track.name));
            }
        }
        self.set_status(format!("Exported {} tracks to {}", exported.len(), dir.display()));
    }

    fn handle_event(&mut self, event: TimelineEvent) {
        match event {
            TimelineEvent::DropTrack { kind: DropKind::Subtitle, source } => {
                self.import_track(Path::new(&source));
            }
            TimelineEvent::DropTrack { kind: DropKind::Audio, source } => {
                self.set_status(format!("Audio drop ignored in demo: {source}"));
            }
            TimelineEvent::Jump { time } => log::debug!("jump to {time:.3}"),
            other => log::info!("[TimelineEvent] {:?}", other),
        }
    }

    fn set_status(&mut self, text: impl Into<String>) {
        self.status_line = text.into();
        log::info!("{}", self.status_line);
    }

    fn set_error(&mut self, text: impl Into<String>) {
        self.status_line = format!("Error: {}", text.into());
        log::error!("{}", self.status_line);
    }
}

fn read_track_file(path: &Path) -> Result<TrackData, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    JsonCodec
        .decode(&text)
        .map_err(|e| format!("Failed to parse {}: {e}", path.display()))
}

impl eframe::App for TimelineApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        TopBottomPanel::top("menu").show(ctx, |ui| self.menu_bar(ui));
        TopBottomPanel::bottom("status").show(ctx, |ui| ui.label(self.status_line.as_str()));

        if self.playing {
            let dt = ctx.input(|i| i.stable_dt) as f64;
            let next = self.timeline.current_time() + dt;
            self.timeline.set_current_time(next);
            ctx.request_repaint();
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.timeline.ui(ui);
        });

        for event in self.timeline.take_events() {
            self.handle_event(event);
        }
    }
}
