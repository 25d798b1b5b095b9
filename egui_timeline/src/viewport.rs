//! 视图窗口
//!
//! 维护可见时间范围 `[start, end]`（位于 `[0, length]` 内），并在时间和像素之间换算。

/// 视图允许的最小宽度（秒），防止起止点交叉
pub const MIN_SPAN: f64 = 0.01;

#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    start: f64,
    end: f64,
    length: f64,
    width: f32,
}

impl Viewport {
    pub fn new(length: f64, start: f64, end: f64, width: f32) -> Self {
        let length = length.max(MIN_SPAN);
        let mut viewport = Self {
            start: 0.0,
            end: length,
            length,
            width: width.max(1.0),
        };
        let start = start.clamp(0.0, length - MIN_SPAN);
        let end = end.clamp(start + MIN_SPAN, length);
        viewport.start = start;
        viewport.end = end;
        viewport
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    /// 每像素对应的秒数
    pub fn zoom(&self) -> f64 {
        self.span() / self.width as f64
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }

    pub fn time_to_pixel(&self, time: f64) -> f32 {
        ((time - self.start) / self.zoom()) as f32
    }

    pub fn pixel_to_time(&self, x: f32) -> f64 {
        self.start + x as f64 * self.zoom()
    }

    /// 平移窗口，宽度保持不变；越界时整体推回而不是缩短
    pub fn move_by(&mut self, delta: f64) {
        let span = self.span();
        self.start = (self.start + delta).clamp(0.0, self.length - span);
        self.end = self.start + span;
    }

    pub fn center(&mut self, time: f64) {
        let span = self.span();
        self.start = (time - span / 2.0).clamp(0.0, self.length - span);
        self.end = self.start + span;
    }

    /// 调整左边缘。返回值表示是否发生了变化
    pub fn set_start(&mut self, time: f64) -> bool {
        let start = time.clamp(0.0, self.end - MIN_SPAN);
        let changed = start != self.start;
        self.start = start;
        changed
    }

    pub fn set_end(&mut self, time: f64) -> bool {
        let end = time.clamp(self.start + MIN_SPAN, self.length);
        let changed = end != self.end;
        self.end = end;
        changed
    }

    /// 以 `anchor` 为不动点缩放视图，`factor > 1` 放大可见范围
    pub fn zoom_about(&mut self, factor: f64, anchor: f64) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let anchor = anchor.clamp(self.start, self.end);
        let span = (self.span() * factor).clamp(MIN_SPAN, self.length);
        let ratio = (anchor - self.start) / self.span();
        self.start = (anchor - span * ratio).clamp(0.0, self.length - span);
        self.end = self.start + span;
    }

    pub fn set_length(&mut self, length: f64) {
        let length = length.max(MIN_SPAN);
        let span = self.span();
        self.length = length;
        if span >= length {
            self.start = 0.0;
            self.end = length;
        } else if self.end > length {
            self.end = length;
            self.start = length - span;
        }
    }

    pub fn set_width(&mut self, width: f32) {
        self.width = width.max(1.0);
    }
}
