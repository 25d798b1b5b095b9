//! 轨道注册表
//!
//! 有序的轨道数组加上名称到下标的映射。每次修改后两者互为逆映射。

use crate::audio::AudioTable;
use crate::error::{Result, TimelineError};
use crate::structure::{Track, TrackId};
use log::debug;
use std::collections::HashMap;

/// crate 外只能只读访问轨道，改名走 [`TrackRegistry::rename`]：
///
/// ```compile_fail
/// use egui_timeline::{Track, TrackId, TrackKind, TrackRegistry};
///
/// let mut registry = TrackRegistry::new();
/// registry.add(Track::new(TrackId::from("a"), TrackKind::Subtitles, "en")).unwrap();
/// for track in registry.iter_mut() {
///     track.id = TrackId::from("b");
/// }
/// ```
#[derive(Debug, Default)]
pub struct TrackRegistry {
    tracks: Vec<Track>,
    indices: HashMap<TrackId, usize>,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.indices.contains_key(id)
    }

    pub fn index_of(&self, id: &TrackId) -> Option<usize> {
        self.indices.get(id).copied()
    }

    pub fn get(&self, id: &TrackId) -> Option<&Track> {
        self.index_of(id).map(|i| &self.tracks[i])
    }

    /// 可变访问只在 crate 内部开放，外部改动 `id` 会破坏名称索引
    pub(crate) fn get_mut(&mut self, id: &TrackId) -> Option<&mut Track> {
        let index = self.index_of(id)?;
        Some(&mut self.tracks[index])
    }

    pub fn at(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub(crate) fn at_mut(&mut self, index: usize) -> Option<&mut Track> {
        self.tracks.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Track> {
        self.tracks.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Track> {
        self.tracks.iter_mut()
    }

    pub fn ids(&self) -> Vec<TrackId> {
        self.tracks.iter().map(|t| t.id.clone()).collect()
    }

    /// 追加到末尾，返回分配的下标
    pub fn add(&mut self, track: Track) -> Result<usize> {
        if self.contains(&track.id) {
            return Err(TimelineError::NameInUse(track.id.0));
        }
        let index = self.tracks.len();
        self.indices.insert(track.id.clone(), index);
        self.tracks.push(track);
        self.debug_check();
        Ok(index)
    }

    /// 移除轨道并释放其音频引用，之后的轨道下标依次前移
    pub fn remove(&mut self, id: &TrackId, audio: &mut AudioTable) -> Result<Track> {
        let index = self
            .indices
            .remove(id)
            .ok_or_else(|| TimelineError::TrackNotFound(id.0.clone()))?;
        let track = self.tracks.remove(index);
        if let Some(audio_id) = &track.audio {
            audio.unbind(audio_id);
        }
        self.reindex_from(index);
        debug!("removed track {} at index {}", id, index);
        Ok(track)
    }

    /// 原位替换（同名重新加载时使用），不移动其他轨道。返回被替换的轨道
    pub fn swap(&mut self, mut new_track: Track, old: &TrackId, audio: &mut AudioTable) -> Result<Track> {
        let index = self
            .index_of(old)
            .ok_or_else(|| TimelineError::TrackNotFound(old.0.clone()))?;
        if new_track.id != *old && self.contains(&new_track.id) {
            return Err(TimelineError::NameInUse(new_track.id.0));
        }
        // 音频绑定跟随新轨道，除非新轨道自带绑定
        if new_track.audio.is_none() {
            new_track.audio = self.tracks[index].audio.take();
        } else if let Some(audio_id) = self.tracks[index].audio.take() {
            audio.unbind(&audio_id);
        }
        self.indices.remove(old);
        self.indices.insert(new_track.id.clone(), index);
        let old_track = std::mem::replace(&mut self.tracks[index], new_track);
        self.debug_check();
        Ok(old_track)
    }

    /// 修改轨道名称，位置不变
    pub fn rename(&mut self, id: &TrackId, new_id: TrackId) -> Result<()> {
        if *id == new_id {
            return Ok(());
        }
        if self.contains(&new_id) {
            return Err(TimelineError::NameInUse(new_id.0));
        }
        let index = self
            .indices
            .remove(id)
            .ok_or_else(|| TimelineError::TrackNotFound(id.0.clone()))?;
        self.tracks[index].id = new_id.clone();
        self.indices.insert(new_id, index);
        self.debug_check();
        Ok(())
    }

    /// 交换两个位置上的轨道（重排工具使用）
    pub fn swap_positions(&mut self, a: usize, b: usize) -> bool {
        if a == b || a >= self.tracks.len() || b >= self.tracks.len() {
            return false;
        }
        self.tracks.swap(a, b);
        self.indices.insert(self.tracks[a].id.clone(), a);
        self.indices.insert(self.tracks[b].id.clone(), b);
        self.debug_check();
        true
    }

    fn reindex_from(&mut self, from: usize) {
        for (index, track) in self.tracks.iter().enumerate().skip(from) {
            self.indices.insert(track.id.clone(), index);
        }
        self.debug_check();
    }

    /// 映射与数组是否一致
    pub fn is_consistent(&self) -> bool {
        self.indices.len() == self.tracks.len()
            && self
                .tracks
                .iter()
                .enumerate()
                .all(|(i, t)| self.indices.get(&t.id) == Some(&i))
    }

    fn debug_check(&self) {
        debug_assert!(self.is_consistent(), "track index map out of sync");
    }
}
