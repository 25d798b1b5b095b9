//! 拖放分类
//!
//! 只负责把拖入的文件或链接按内容类型分派为音频或字幕，解码与解析由宿主完成。

use crate::error::Result;
use log::warn;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DropKind {
    Audio,
    Subtitle,
}

/// 链接探测：返回远端声明的内容类型
pub trait UrlProbe {
    fn content_type(&mut self, url: &str) -> Result<String>;
}

const SUBTITLE_EXTENSIONS: &[&str] = &["vtt", "srt", "ass", "ssa", "sub", "json"];

/// 按 MIME 类型分类，`name` 用于补充判断扩展名
pub fn classify(mime: &str, name: Option<&str>) -> Option<DropKind> {
    let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    if essence.starts_with("audio/") || essence.starts_with("video/") {
        return Some(DropKind::Audio);
    }
    if essence.starts_with("text/")
        || essence == "application/json"
        || essence == "application/x-subrip"
    {
        return Some(DropKind::Subtitle);
    }
    let extension = name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension {
        Some(ext) if SUBTITLE_EXTENSIONS.contains(&ext.as_str()) => Some(DropKind::Subtitle),
        _ => None,
    }
}

/// 本地文件：优先使用给出的 MIME，缺省时按文件名猜测
pub fn classify_file(name: &str, mime: Option<&str>) -> Option<DropKind> {
    let guessed;
    let mime = match mime.filter(|m| !m.is_empty()) {
        Some(mime) => mime,
        None => {
            guessed = mime_guess::from_path(name).first_or_octet_stream();
            guessed.essence_str()
        }
    };
    let kind = classify(mime, Some(name));
    if kind.is_none() {
        warn!("ignoring dropped file {} ({})", name, mime);
    }
    kind
}

/// 链接先探测内容类型再按同样规则分类
pub fn classify_url(url: &str, probe: &mut dyn UrlProbe) -> Result<Option<DropKind>> {
    let mime = probe.content_type(url)?;
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let kind = classify(&mime, Some(path));
    if kind.is_none() {
        warn!("ignoring dropped url {} ({})", url, mime);
    }
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TimelineError;

    struct FixedProbe(&'static str);

    impl UrlProbe for FixedProbe {
        fn content_type(&mut self, _url: &str) -> Result<String> {
            if self.0.is_empty() {
                return Err(TimelineError::Load("unreachable".into()));
            }
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn mime_types_dispatch() {
        assert_eq!(classify("audio/mpeg", None), Some(DropKind::Audio));
        assert_eq!(classify("video/mp4", None), Some(DropKind::Audio));
        assert_eq!(classify("text/vtt; charset=utf-8", None), Some(DropKind::Subtitle));
        assert_eq!(classify("image/png", None), None);
        assert_eq!(classify("application/octet-stream", Some("a.SRT")), Some(DropKind::Subtitle));
    }

    #[test]
    fn files_guess_from_name() {
        assert_eq!(classify_file("song.mp3", None), Some(DropKind::Audio));
        assert_eq!(classify_file("cues.vtt", Some("")), Some(DropKind::Subtitle));
        assert_eq!(classify_file("photo.png", None), None);
    }

    #[test]
    fn urls_are_probed() {
        let mut probe = FixedProbe("audio/ogg");
        assert_eq!(classify_url("http://x/a", &mut probe).unwrap(), Some(DropKind::Audio));
        let mut probe = FixedProbe("application/octet-stream");
        assert_eq!(
            classify_url("http://x/b.vtt?token=1", &mut probe).unwrap(),
            Some(DropKind::Subtitle)
        );
        assert!(classify_url("http://x/c", &mut FixedProbe("")).is_err());
    }
}
