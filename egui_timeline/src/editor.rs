//! 编辑命令和事件模块
//!
//! 定义了时间轴组件的命令系统和事件通道，用于与宿主应用交互。
//! 每个事件名对应一个有序的回调列表；单个回调出错或 panic 不会影响其他回调。

use crate::dnd::DropKind;
use crate::input::ToolMode;
use crate::structure::{SegmentId, TrackId};
use log::warn;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

#[derive(Clone, Debug, PartialEq)]
pub enum TimelineCommand {
    SetTool(ToolMode),
    SetMultiSelect(bool),
    SetCurrentTime(f64),
    SetLength(f64),
    SetWidth(f32),
    SetAbRepeatOn(bool),
    ClearRepeat,
    RemoveTrack(TrackId),
    DeleteSegment {
        track: TrackId,
        segment: SegmentId,
    },
    SplitSegment {
        track: TrackId,
        segment: SegmentId,
        time: f64,
    },
    SelectAll,
    ClearSelection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    AddTrack,
    RemoveTrack,
    Select,
    Unselect,
    SegmentChanged,
    TimeUpdate,
    Jump,
    AbRepeatSet,
    AbRepeatUnset,
    AbRepeatEnabled,
    AbRepeatDisabled,
    DropTrack,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::AddTrack => "addtrack",
            EventKind::RemoveTrack => "removetrack",
            EventKind::Select => "select",
            EventKind::Unselect => "unselect",
            EventKind::SegmentChanged => "segmentchange",
            EventKind::TimeUpdate => "timeupdate",
            EventKind::Jump => "jump",
            EventKind::AbRepeatSet => "abRepeatSet",
            EventKind::AbRepeatUnset => "abRepeatUnset",
            EventKind::AbRepeatEnabled => "abRepeatEnabled",
            EventKind::AbRepeatDisabled => "abRepeatDisabled",
            EventKind::DropTrack => "dropTrack",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TimelineEvent {
    AddTrack {
        track: TrackId,
    },
    RemoveTrack {
        track: TrackId,
    },
    Select {
        track: TrackId,
        segment: SegmentId,
    },
    Unselect {
        track: TrackId,
        segment: SegmentId,
    },
    SegmentChanged {
        track: TrackId,
        segment: SegmentId,
    },
    TimeUpdate {
        time: f64,
    },
    Jump {
        time: f64,
    },
    AbRepeatSet {
        a: f64,
        b: f64,
    },
    AbRepeatUnset,
    AbRepeatEnabled,
    AbRepeatDisabled,
    DropTrack {
        kind: DropKind,
        source: String,
    },
}

impl TimelineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TimelineEvent::AddTrack { .. } => EventKind::AddTrack,
            TimelineEvent::RemoveTrack { .. } => EventKind::RemoveTrack,
            TimelineEvent::Select { .. } => EventKind::Select,
            TimelineEvent::Unselect { .. } => EventKind::Unselect,
            TimelineEvent::SegmentChanged { .. } => EventKind::SegmentChanged,
            TimelineEvent::TimeUpdate { .. } => EventKind::TimeUpdate,
            TimelineEvent::Jump { .. } => EventKind::Jump,
            TimelineEvent::AbRepeatSet { .. } => EventKind::AbRepeatSet,
            TimelineEvent::AbRepeatUnset => EventKind::AbRepeatUnset,
            TimelineEvent::AbRepeatEnabled => EventKind::AbRepeatEnabled,
            TimelineEvent::AbRepeatDisabled => EventKind::AbRepeatDisabled,
            TimelineEvent::DropTrack { .. } => EventKind::DropTrack,
        }
    }
}

pub type Listener = Box<dyn FnMut(&TimelineEvent) -> anyhow::Result<()>>;

#[derive(Default)]
pub struct EventChannel {
    listeners: HashMap<EventKind, Vec<Listener>>,
    pending: Vec<TimelineEvent>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, kind: EventKind, listener: Listener) {
        self.listeners.entry(kind).or_default().push(listener);
    }

    pub fn has_listeners(&self, kind: EventKind) -> bool {
        self.listeners.get(&kind).is_some_and(|l| !l.is_empty())
    }

    /// 按订阅顺序依次调用；出错的回调只记录日志
    pub fn emit(&mut self, event: TimelineEvent) {
        let kind = event.kind();
        if let Some(listeners) = self.listeners.get_mut(&kind) {
            for (index, listener) in listeners.iter_mut().enumerate() {
                match catch_unwind(AssertUnwindSafe(|| listener(&event))) {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        warn!("listener {} for '{}' failed: {:#}", index, kind.name(), err);
                    }
                    Err(_) => {
                        warn!("listener {} for '{}' panicked", index, kind.name());
                    }
                }
            }
        }
        self.pending.push(event);
    }

    /// 取出自上次调用以来的所有事件
    pub fn take_events(&mut self) -> Vec<TimelineEvent> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn failing_listener_does_not_block_others() {
        let mut channel = EventChannel::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        channel.on(EventKind::Jump, Box::new(|_| anyhow::bail!("broken")));
        channel.on(EventKind::Jump, Box::new(|_| panic!("worse")));
        let sink = Rc::clone(&seen);
        channel.on(
            EventKind::Jump,
            Box::new(move |event| {
                sink.borrow_mut().push(event.clone());
                Ok(())
            }),
        );
        channel.emit(TimelineEvent::Jump { time: 3.0 });
        assert_eq!(*seen.borrow(), vec![TimelineEvent::Jump { time: 3.0 }]);
        assert_eq!(channel.take_events().len(), 1);
        assert!(channel.take_events().is_empty());
    }

    #[test]
    fn listeners_only_see_their_kind() {
        let mut channel = EventChannel::new();
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        channel.on(
            EventKind::AddTrack,
            Box::new(move |_| {
                *counter.borrow_mut() += 1;
                Ok(())
            }),
        );
        channel.emit(TimelineEvent::Jump { time: 0.0 });
        channel.emit(TimelineEvent::AddTrack { track: TrackId::from("en") });
        assert_eq!(*count.borrow(), 1);
        assert_eq!(EventKind::AbRepeatSet.name(), "abRepeatSet");
    }
}
