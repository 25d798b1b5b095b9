//! AB 循环区间
//!
//! 两个可选的时间点加上启用标志。只有两个点都存在时才能启用。

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AbRepeat {
    a: Option<f64>,
    b: Option<f64>,
    enabled: bool,
}

/// 一次修改带来的状态变化，用于派发事件
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RepeatChange {
    pub became_set: bool,
    pub became_unset: bool,
    pub enabled: Option<bool>,
}

impl AbRepeat {
    pub fn a(&self) -> Option<f64> {
        self.a
    }

    pub fn b(&self) -> Option<f64> {
        self.b
    }

    pub fn range(&self) -> Option<(f64, f64)> {
        Some((self.a?, self.b?))
    }

    pub fn is_set(&self) -> bool {
        self.a.is_some() && self.b.is_some()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// 按下：没有区间时两点都放到 `time`，否则移动较近的一点
    pub fn press(&mut self, time: f64) -> RepeatChange {
        let was_set = self.is_set();
        let mut change = RepeatChange::default();
        if self.enabled {
            self.enabled = false;
            change.enabled = Some(false);
        }
        if was_set {
            self.drag(time);
        } else {
            self.a = Some(time);
            self.b = Some(time);
            change.became_set = true;
        }
        change
    }

    /// 拖动中移动离 `time` 较近的点（以区间中点为界）。
    /// 指针越过中点时被移动的点会跳到另一侧，这是有意保留的行为
    pub fn drag(&mut self, time: f64) {
        let (Some(a), Some(b)) = (self.a, self.b) else {
            return;
        };
        if time < (a + b) / 2.0 {
            self.a = Some(time);
        } else {
            self.b = Some(time);
        }
    }

    /// 松开：两点不同则启用
    pub fn release(&mut self) -> RepeatChange {
        let enabled = match (self.a, self.b) {
            (Some(a), Some(b)) => a != b,
            _ => false,
        };
        self.set_enabled_unchecked(enabled)
    }

    /// 外部设置启用状态；没有完整区间时拒绝启用
    pub fn set_enabled(&mut self, enabled: bool) -> Option<RepeatChange> {
        if enabled && !self.is_set() {
            return None;
        }
        Some(self.set_enabled_unchecked(enabled))
    }

    fn set_enabled_unchecked(&mut self, enabled: bool) -> RepeatChange {
        let mut change = RepeatChange::default();
        if self.enabled != enabled {
            self.enabled = enabled;
            change.enabled = Some(enabled);
        }
        change
    }

    pub fn clear(&mut self) -> RepeatChange {
        let mut change = RepeatChange::default();
        if self.enabled {
            change.enabled = Some(false);
        }
        change.became_unset = self.a.is_some() || self.b.is_some();
        *self = Self::default();
        change
    }

    /// 播放到 B 点之后回到 A 点
    pub fn wrap(&self, time: f64) -> Option<f64> {
        if !self.enabled {
            return None;
        }
        let (a, b) = self.range()?;
        (time >= b).then_some(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_then_drag_sets_range() {
        let mut repeat = AbRepeat::default();
        let change = repeat.press(10.0);
        assert!(change.became_set);
        repeat.drag(20.0);
        assert_eq!(repeat.range(), Some((10.0, 20.0)));
        let change = repeat.release();
        assert_eq!(change.enabled, Some(true));
        assert!(repeat.enabled());
    }

    #[test]
    fn plain_click_does_not_enable() {
        let mut repeat = AbRepeat::default();
        repeat.press(5.0);
        assert_eq!(repeat.release().enabled, None);
        assert!(!repeat.enabled());
        assert!(repeat.is_set());
    }

    #[test]
    fn press_moves_nearer_point() {
        let mut repeat = AbRepeat::default();
        repeat.press(10.0);
        repeat.drag(20.0);
        repeat.release();
        repeat.press(12.0);
        assert_eq!(repeat.range(), Some((12.0, 20.0)));
        repeat.drag(19.0);
        assert_eq!(repeat.range(), Some((12.0, 19.0)));
    }

    /// 拖动 B 点越过中点时，被移动的点切换为 A
    #[test]
    fn crossing_midpoint_switches_point() {
        let mut repeat = AbRepeat::default();
        repeat.press(10.0);
        repeat.drag(30.0);
        repeat.drag(22.0);
        assert_eq!(repeat.range(), Some((10.0, 22.0)));
        repeat.drag(15.0);
        assert_eq!(repeat.range(), Some((15.0, 22.0)));
    }

    #[test]
    fn enable_requires_both_points() {
        let mut repeat = AbRepeat::default();
        assert!(repeat.set_enabled(true).is_none());
        assert!(!repeat.enabled());
        repeat.press(1.0);
        repeat.drag(2.0);
        assert_eq!(repeat.set_enabled(true).unwrap().enabled, Some(true));
        let change = repeat.clear();
        assert!(change.became_unset);
        assert_eq!(change.enabled, Some(false));
        assert!(!repeat.enabled() && repeat.range().is_none());
    }

    #[test]
    fn wrap_only_when_enabled() {
        let mut repeat = AbRepeat::default();
        repeat.press(10.0);
        repeat.drag(20.0);
        assert_eq!(repeat.wrap(25.0), None);
        repeat.release();
        assert_eq!(repeat.wrap(25.0), Some(10.0));
        assert_eq!(repeat.wrap(15.0), None);
    }
}
