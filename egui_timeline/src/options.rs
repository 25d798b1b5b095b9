//! 组件配置
//!
//! 初始化时的时间轴长度、视图范围和各条带几何尺寸。

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineOptions {
    /// 时间轴总长度（秒）
    pub length: f64,
    /// 画布宽度（像素）
    pub width: f32,
    pub view_start: f64,
    pub view_end: f64,
    /// 顶部时间标尺高度
    pub key_height: f32,
    pub track_height: f32,
    pub track_padding: f32,
    /// 底部视图滑块高度
    pub slider_height: f32,
    pub slider_handle_width: f32,
    /// 自动滚动/缩放定时器周期（秒）
    pub auto_scroll_period: f64,
    pub min_segment_duration: f64,
    pub multi_select: bool,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            length: 1800.0,
            width: 800.0,
            view_start: 0.0,
            view_end: 60.0,
            key_height: 25.0,
            track_height: 60.0,
            track_padding: 10.0,
            slider_height: 25.0,
            slider_handle_width: 10.0,
            auto_scroll_period: 0.025,
            min_segment_duration: 0.1,
            multi_select: true,
        }
    }
}

impl TimelineOptions {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn track_stride(&self) -> f32 {
        self.track_height + self.track_padding
    }
}
