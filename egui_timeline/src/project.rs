//! 项目文件与导出模块
//!
//! 轨道导出按格式名查找编解码器；`json` 内置。
//! 整个时间轴（选项和全部轨道）可以保存为一个 JSON 项目文件。

use crate::error::{Result, TimelineError};
use crate::options::TimelineOptions;
use crate::structure::{SegmentId, Track, TrackData, TrackId};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const PROJECT_VERSION: &str = "1.0";

/// 字幕格式的编解码器
pub trait CueCodec {
    fn format(&self) -> &str;
    fn encode(&self, track: &Track) -> Result<String>;
    fn decode(&self, text: &str) -> Result<TrackData>;
}

pub struct JsonCodec;

impl CueCodec for JsonCodec {
    fn format(&self) -> &str {
        "json"
    }

    fn encode(&self, track: &Track) -> Result<String> {
        let data = TrackData {
            label: track.id.0.clone(),
            kind: track.kind,
            lang: track.lang.clone(),
            cues: track.cues(),
        };
        Ok(serde_json::to_string_pretty(&data)?)
    }

    fn decode(&self, text: &str) -> Result<TrackData> {
        Ok(serde_json::from_str(text)?)
    }
}

/// 一条导出结果
#[derive(Clone, Debug, PartialEq)]
pub struct ExportedTrack {
    pub target: TrackId,
    pub format: String,
    /// 建议的文件名
    pub name: String,
    pub payload: String,
}

pub struct CodecRegistry {
    codecs: HashMap<String, Box<dyn CueCodec>>,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        let mut registry = Self {
            codecs: HashMap::new(),
        };
        registry.register(Box::new(JsonCodec));
        registry
    }
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同名格式会被替换
    pub fn register(&mut self, codec: Box<dyn CueCodec>) {
        let format = codec.format().to_ascii_lowercase();
        debug!("registering codec '{}'", format);
        self.codecs.insert(format, codec);
    }

    pub fn get(&self, format: &str) -> Result<&dyn CueCodec> {
        self.codecs
            .get(&format.to_ascii_lowercase())
            .map(|codec| codec.as_ref())
            .ok_or_else(|| TimelineError::UnknownFormat(format.to_string()))
    }

    pub fn formats(&self) -> Vec<&str> {
        let mut formats: Vec<&str> = self.codecs.keys().map(String::as_str).collect();
        formats.sort_unstable();
        formats
    }

    pub fn export<'a>(&self, tracks: impl IntoIterator<Item = &'a Track>) -> Result<Vec<ExportedTrack>> {
        tracks
            .into_iter()
            .map(|track| {
                let codec = self.get(&track.format)?;
                Ok(ExportedTrack {
                    target: track.id.clone(),
                    format: codec.format().to_string(),
                    name: format!("{}.{}", track.id, codec.format()),
                    payload: codec.encode(track)?,
                })
            })
            .collect()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProjectFile {
    pub version: String,
    pub options: TimelineOptions,
    pub tracks: Vec<Track>,
}

impl ProjectFile {
    pub fn new(options: TimelineOptions, tracks: Vec<Track>) -> Self {
        Self {
            version: PROJECT_VERSION.to_string(),
            options,
            tracks,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 解析项目文本。片段 id 重新分配，避免与当前进程里已有的 id 冲突
    pub fn from_json(text: &str) -> Result<Self> {
        let mut project: ProjectFile = serde_json::from_str(text)?;
        if project.version != PROJECT_VERSION {
            return Err(TimelineError::Load(format!(
                "unsupported project version {}",
                project.version
            )));
        }
        for segment in project.tracks.iter_mut().flat_map(|t| t.segments.iter_mut()) {
            segment.id = SegmentId::next();
        }
        Ok(project)
    }

    /// 保存项目到指定路径，父目录不存在时创建
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, self.to_json()?)?;
        info!("saved project with {} tracks to {}", self.tracks.len(), path.display());
        Ok(())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let project = Self::from_json(&text)?;
        info!("loaded project with {} tracks from {}", project.tracks.len(), path.display());
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{Cue, TrackKind};

    fn track(name: &str) -> Track {
        let mut track = Track::new(TrackId::from(name), TrackKind::Captions, "de");
        track.add_segment(Cue::new(1.0, 2.5, "Hallo"), false).unwrap();
        track
    }

    #[test]
    fn json_export_carries_cues() {
        let registry = CodecRegistry::new();
        let exported = registry.export([&track("de")]).unwrap();
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].name, "de.json");
        let data = registry.get("JSON").unwrap().decode(&exported[0].payload).unwrap();
        assert_eq!(data.kind, TrackKind::Captions);
        assert_eq!(data.cues, vec![Cue::new(1.0, 2.5, "Hallo")]);
    }

    #[test]
    fn unknown_format_fails() {
        let registry = CodecRegistry::new();
        let mut t = track("x");
        t.format = "vtt".into();
        assert!(matches!(registry.export([&t]), Err(TimelineError::UnknownFormat(f)) if f == "vtt"));
    }

    #[test]
    fn project_reload_gets_fresh_segment_ids() {
        let original = track("en");
        let old_id = original.segments[0].id;
        let project = ProjectFile::new(TimelineOptions::default(), vec![original]);
        let loaded = ProjectFile::from_json(&project.to_json().unwrap()).unwrap();
        assert_eq!(loaded.tracks[0].segments[0].text, "Hallo");
        assert_ne!(loaded.tracks[0].segments[0].id, old_id);
    }

    #[test]
    fn project_version_checked() {
        let mut project = ProjectFile::new(TimelineOptions::default(), Vec::new());
        project.version = "0.1".into();
        let text = project.to_json().unwrap();
        assert!(matches!(ProjectFile::from_json(&text), Err(TimelineError::Load(_))));
    }

    #[test]
    fn save_and_load_file() {
        let dir = std::env::temp_dir().join(format!("egui_timeline_project_{}", std::process::id()));
        let path = dir.join("demo.json");
        ProjectFile::new(TimelineOptions::default(), vec![track("en")])
            .save_to_path(&path)
            .unwrap();
        let loaded = ProjectFile::load_from_path(&path).unwrap();
        assert_eq!(loaded.tracks.len(), 1);
        let _ = fs::remove_dir_all(&dir);
    }
}
