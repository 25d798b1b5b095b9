//! 错误类型
//!
//! 配置类错误在 API 调用处同步返回，调用失败时组件状态保持不变。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("track name '{0}' is already in use")]
    NameInUse(String),
    #[error("no track named '{0}'")]
    TrackNotFound(String),
    #[error("no audio track '{0}'")]
    AudioNotFound(String),
    #[error("segment {0} not found")]
    SegmentNotFound(u64),
    #[error("menu item '{0}' has no action")]
    MissingMenuAction(String),
    #[error("cannot insert menu item '{path}' at position {position}")]
    InvalidMenuPosition { path: String, position: usize },
    #[error("both repeat points must be set before enabling AB repeat")]
    RepeatRangeUnset,
    #[error("invalid segment bounds [{start}, {end}]")]
    InvalidSegment { start: f64, end: f64 },
    #[error("invalid {name}: {value}")]
    InvalidDimension { name: &'static str, value: f64 },
    #[error("no codec registered for format '{0}'")]
    UnknownFormat(String),
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("load failed: {0}")]
    Load(String),
}

pub type Result<T, E = TimelineError> = std::result::Result<T, E>;
