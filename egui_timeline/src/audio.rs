//! 音频绑定表
//!
//! 波形数据按 `AudioId` 存放并带引用计数。表本身持有一个引用，
//! 每个绑定了该音频的轨道再各持有一个；计数归零时条目被移除。
//! 解码与重采样由外部协作者完成，这里只负责按固定大小分块喂数据。

use crate::error::{Result, TimelineError};
use crate::structure::AudioId;
use log::debug;
use std::collections::HashMap;

/// 每次从采样源读取的块大小
pub const AUDIO_CHUNK: usize = 4096;

/// 单声道波形
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Waveform {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl Waveform {
    pub fn new(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// 将 `[t0, t1]` 划分为 `columns` 列，返回每列的 (min, max)
    pub fn peaks(&self, t0: f64, t1: f64, columns: usize) -> Vec<(f32, f32)> {
        if columns == 0 || t1 <= t0 || self.sample_rate == 0 {
            return Vec::new();
        }
        let rate = self.sample_rate as f64;
        let per_column = (t1 - t0) / columns as f64;
        (0..columns)
            .map(|c| {
                let from = ((t0 + c as f64 * per_column) * rate).max(0.0) as usize;
                let to = (((t0 + (c + 1) as f64 * per_column) * rate).max(0.0) as usize)
                    .max(from + 1)
                    .min(self.samples.len());
                if from >= to {
                    return (0.0, 0.0);
                }
                self.samples[from..to]
                    .iter()
                    .fold((f32::MAX, f32::MIN), |(lo, hi), &s| (lo.min(s), hi.max(s)))
            })
            .collect()
    }
}

/// 外部采样源：每次填充一块，返回实际写入数量，0 表示结束
pub trait SampleSource {
    fn read(&mut self, buffer: &mut [f32]) -> Result<usize>;
    fn sample_rate(&self) -> u32;
}

/// 外部重采样器
pub trait Resampler {
    fn output_rate(&self) -> u32;
    fn process(&mut self, input: &[f32]) -> Vec<f32>;
    fn flush(&mut self) -> Vec<f32> {
        Vec::new()
    }
}

/// 把采样源读完并重采样成波形
pub fn decode_waveform(source: &mut dyn SampleSource, resampler: &mut dyn Resampler) -> Result<Waveform> {
    let mut buffer = vec![0.0f32; AUDIO_CHUNK];
    let mut samples = Vec::new();
    let mut chunks = 0usize;
    loop {
        let read = source.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        if read > buffer.len() {
            return Err(TimelineError::Load(format!(
                "sample source reported {read} samples for a {} sample buffer",
                buffer.len()
            )));
        }
        samples.extend(resampler.process(&buffer[..read]));
        chunks += 1;
    }
    samples.extend(resampler.flush());
    debug!(
        "decoded {} chunks at {} Hz into {} samples at {} Hz",
        chunks,
        source.sample_rate(),
        samples.len(),
        resampler.output_rate()
    );
    Ok(Waveform::new(resampler.output_rate(), samples))
}

#[derive(Debug)]
struct AudioEntry {
    waveform: Waveform,
    refs: usize,
    /// 组件自身的引用是否还在
    owned: bool,
}

#[derive(Debug, Default)]
pub struct AudioTable {
    entries: HashMap<AudioId, AudioEntry>,
}

impl AudioTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加或替换波形。替换时保留现有绑定计数，并恢复组件自身的引用
    pub fn add(&mut self, id: AudioId, waveform: Waveform) {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.waveform = waveform;
                if !entry.owned {
                    entry.owned = true;
                    entry.refs += 1;
                }
            }
            None => {
                self.entries.insert(
                    id,
                    AudioEntry {
                        waveform,
                        refs: 1,
                        owned: true,
                    },
                );
            }
        }
    }

    /// 释放组件自身的引用，重复调用无效果。返回条目是否因此被移除
    pub fn release(&mut self, id: &AudioId) -> Result<bool> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| TimelineError::AudioNotFound(id.to_string()))?;
        if !entry.owned {
            return Ok(false);
        }
        entry.owned = false;
        Ok(self.unbind(id))
    }

    pub fn contains(&self, id: &AudioId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn waveform(&self, id: &AudioId) -> Option<&Waveform> {
        self.entries.get(id).map(|e| &e.waveform)
    }

    pub fn refs(&self, id: &AudioId) -> usize {
        self.entries.get(id).map_or(0, |e| e.refs)
    }

    pub fn bind(&mut self, id: &AudioId) -> Result<()> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| TimelineError::AudioNotFound(id.to_string()))?;
        entry.refs += 1;
        Ok(())
    }

    /// 释放一个引用；返回条目是否因此被移除
    pub fn unbind(&mut self, id: &AudioId) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };
        entry.refs = entry.refs.saturating_sub(1);
        if entry.refs == 0 {
            self.entries.remove(id);
            debug!("audio track {} released", id);
            return true;
        }
        false
    }

    pub fn ids(&self) -> impl Iterator<Item = &AudioId> {
        self.entries.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ramp {
        remaining: usize,
        next: f32,
    }

    impl SampleSource for Ramp {
        fn read(&mut self, buffer: &mut [f32]) -> Result<usize> {
            let n = self.remaining.min(buffer.len());
            for slot in &mut buffer[..n] {
                *slot = self.next;
                self.next += 1.0;
            }
            self.remaining -= n;
            Ok(n)
        }

        fn sample_rate(&self) -> u32 {
            8000
        }
    }

    /// 每两个样本取一个
    struct Halve {
        chunk_sizes: Vec<usize>,
    }

    impl Resampler for Halve {
        fn output_rate(&self) -> u32 {
            4000
        }

        fn process(&mut self, input: &[f32]) -> Vec<f32> {
            self.chunk_sizes.push(input.len());
            input.iter().step_by(2).copied().collect()
        }
    }

    #[test]
    fn decode_feeds_fixed_chunks() {
        let mut source = Ramp { remaining: AUDIO_CHUNK * 2 + 10, next: 0.0 };
        let mut resampler = Halve { chunk_sizes: Vec::new() };
        let waveform = decode_waveform(&mut source, &mut resampler).unwrap();
        assert_eq!(resampler.chunk_sizes, vec![AUDIO_CHUNK, AUDIO_CHUNK, 10]);
        assert_eq!(waveform.sample_rate, 4000);
        assert_eq!(waveform.samples.len(), AUDIO_CHUNK + 5);
    }

    #[test]
    fn refcount_releases_at_zero() {
        let mut table = AudioTable::new();
        let id = AudioId::new("a");
        table.add(id.clone(), Waveform::new(10, vec![0.0; 10]));
        table.bind(&id).unwrap();
        assert_eq!(table.refs(&id), 2);
        assert!(!table.unbind(&id));
        assert!(table.contains(&id));
        assert!(table.unbind(&id));
        assert!(!table.contains(&id));
        assert!(table.bind(&id).is_err());
    }

    #[test]
    fn owner_release_is_idempotent() {
        let mut table = AudioTable::new();
        let id = AudioId::new("a");
        table.add(id.clone(), Waveform::new(10, vec![0.0; 10]));
        table.bind(&id).unwrap();
        assert!(!table.release(&id).unwrap());
        assert!(!table.release(&id).unwrap());
        assert_eq!(table.refs(&id), 1);
        // 重新添加时恢复组件引用
        table.add(id.clone(), Waveform::new(10, vec![0.0; 10]));
        assert_eq!(table.refs(&id), 2);
        assert!(!table.unbind(&id));
        assert!(table.release(&id).unwrap());
        assert!(table.release(&id).is_err());
    }

    #[test]
    fn peaks_cover_columns() {
        let waveform = Waveform::new(4, vec![0.0, 1.0, -1.0, 0.5, 0.2, -0.2, 0.0, 0.0]);
        let peaks = waveform.peaks(0.0, 2.0, 2);
        assert_eq!(peaks, vec![(-1.0, 1.0), (-0.2, 0.2)]);
    }
}
