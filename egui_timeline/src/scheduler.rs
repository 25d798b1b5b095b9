//! 重绘调度
//!
//! 把来自各处的重绘请求合并为每帧至多一次绘制。任意时刻最多只有一个待触发的帧。
//!
//! - 全量请求：已有单轨帧则取消并改为全量帧；已有全量帧则忽略
//! - 单轨请求：空闲时安排单轨帧；已有全量帧则忽略；已有其他轨道的单轨帧则升级为全量帧
//! - 帧触发时若资源未就绪，全量帧保持挂起并重新申请下一帧

use crate::structure::TrackId;
use log::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameId(pub u64);

/// 帧来源。egui 下对应一次重绘
pub trait FrameHost {
    fn request_frame(&mut self) -> FrameId;
    fn cancel_frame(&mut self, frame: FrameId);
    /// 当前到期的帧
    fn take_due(&mut self) -> Option<FrameId>;
    fn attach(&mut self, _ctx: &egui::Context) {}
}

/// egui 帧来源：申请帧即请求一次重绘
#[derive(Default)]
pub struct RepaintHost {
    ctx: Option<egui::Context>,
    next: u64,
    outstanding: Option<FrameId>,
}

impl FrameHost for RepaintHost {
    fn request_frame(&mut self) -> FrameId {
        self.next += 1;
        let frame = FrameId(self.next);
        self.outstanding = Some(frame);
        if let Some(ctx) = &self.ctx {
            ctx.request_repaint();
        }
        frame
    }

    fn cancel_frame(&mut self, frame: FrameId) {
        if self.outstanding == Some(frame) {
            self.outstanding = None;
        }
    }

    fn take_due(&mut self) -> Option<FrameId> {
        self.outstanding.take()
    }

    fn attach(&mut self, ctx: &egui::Context) {
        if self.ctx.is_none() {
            self.ctx = Some(ctx.clone());
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderRequest {
    Full,
    Track(TrackId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderPass {
    Full,
    Track(TrackId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Pending {
    Idle,
    Full(FrameId),
    Track(TrackId, FrameId),
}

pub struct RenderScheduler {
    state: Pending,
    host: Box<dyn FrameHost>,
}

impl Default for RenderScheduler {
    fn default() -> Self {
        Self::new(Box::new(RepaintHost::default()))
    }
}

impl RenderScheduler {
    pub fn new(host: Box<dyn FrameHost>) -> Self {
        Self {
            state: Pending::Idle,
            host,
        }
    }

    pub fn attach(&mut self, ctx: &egui::Context) {
        self.host.attach(ctx);
    }

    pub fn is_idle(&self) -> bool {
        self.state == Pending::Idle
    }

    pub fn pending(&self) -> Option<RenderRequest> {
        match &self.state {
            Pending::Idle => None,
            Pending::Full(_) => Some(RenderRequest::Full),
            Pending::Track(id, _) => Some(RenderRequest::Track(id.clone())),
        }
    }

    pub fn request(&mut self, request: RenderRequest) {
        match request {
            RenderRequest::Full => self.request_full(),
            RenderRequest::Track(id) => self.request_track(id),
        }
    }

    pub fn request_full(&mut self) {
        match &self.state {
            Pending::Full(_) => {}
            Pending::Track(_, frame) => {
                self.host.cancel_frame(*frame);
                self.state = Pending::Full(self.host.request_frame());
            }
            Pending::Idle => {
                self.state = Pending::Full(self.host.request_frame());
            }
        }
    }

    pub fn request_track(&mut self, id: TrackId) {
        match &self.state {
            Pending::Full(_) => {}
            Pending::Track(pending, _) if *pending == id => {}
            Pending::Track(_, frame) => {
                // 两个单轨差异不做合并
                self.host.cancel_frame(*frame);
                self.state = Pending::Full(self.host.request_frame());
            }
            Pending::Idle => {
                self.state = Pending::Track(id, self.host.request_frame());
            }
        }
    }

    /// 处理到期的帧，返回本帧需要执行的绘制
    pub fn poll(&mut self, assets_ready: bool) -> Option<RenderPass> {
        let frame = self.host.take_due()?;
        self.fire(frame, assets_ready)
    }

    pub fn fire(&mut self, frame: FrameId, assets_ready: bool) -> Option<RenderPass> {
        match &self.state {
            Pending::Full(pending) if *pending == frame => {
                if !assets_ready {
                    trace!("assets not ready, deferring full redraw");
                    self.state = Pending::Full(self.host.request_frame());
                    return None;
                }
                self.state = Pending::Idle;
                Some(RenderPass::Full)
            }
            Pending::Track(id, pending) if *pending == frame => {
                let id = id.clone();
                self.state = Pending::Idle;
                Some(RenderPass::Track(id))
            }
            // 已被取消的帧
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    pub(crate) struct Log {
        pub requested: Vec<FrameId>,
        pub cancelled: Vec<FrameId>,
        pub due: Vec<FrameId>,
    }

    /// 手动推进的帧来源
    #[derive(Clone, Default)]
    pub(crate) struct ManualHost {
        pub log: Rc<RefCell<Log>>,
        next: Rc<RefCell<u64>>,
    }

    impl FrameHost for ManualHost {
        fn request_frame(&mut self) -> FrameId {
            *self.next.borrow_mut() += 1;
            let frame = FrameId(*self.next.borrow());
            let mut log = self.log.borrow_mut();
            log.requested.push(frame);
            log.due.push(frame);
            frame
        }

        fn cancel_frame(&mut self, frame: FrameId) {
            let mut log = self.log.borrow_mut();
            log.cancelled.push(frame);
            log.due.retain(|f| *f != frame);
        }

        fn take_due(&mut self) -> Option<FrameId> {
            let mut log = self.log.borrow_mut();
            if log.due.is_empty() {
                None
            } else {
                Some(log.due.remove(0))
            }
        }
    }

    fn scheduler() -> (RenderScheduler, ManualHost) {
        let host = ManualHost::default();
        (RenderScheduler::new(Box::new(host.clone())), host)
    }

    fn drain(scheduler: &mut RenderScheduler) -> Vec<RenderPass> {
        let mut passes = Vec::new();
        while let Some(pass) = scheduler.poll(true) {
            passes.push(pass);
        }
        passes
    }

    #[test]
    fn two_tracks_promote_to_one_full() {
        let (mut scheduler, host) = scheduler();
        scheduler.request_track(TrackId::from("a"));
        scheduler.request_track(TrackId::from("b"));
        assert_eq!(drain(&mut scheduler), vec![RenderPass::Full]);
        assert_eq!(host.log.borrow().cancelled.len(), 1);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn full_cancels_track() {
        let (mut scheduler, host) = scheduler();
        scheduler.request_track(TrackId::from("a"));
        scheduler.request_full();
        assert_eq!(drain(&mut scheduler), vec![RenderPass::Full]);
        assert_eq!(host.log.borrow().requested.len(), 2);
    }

    #[test]
    fn track_after_full_is_noop() {
        let (mut scheduler, host) = scheduler();
        scheduler.request_full();
        scheduler.request_track(TrackId::from("a"));
        scheduler.request_full();
        assert_eq!(host.log.borrow().requested.len(), 1);
        assert_eq!(drain(&mut scheduler), vec![RenderPass::Full]);
    }

    #[test]
    fn same_track_twice_stays_single() {
        let (mut scheduler, _host) = scheduler();
        scheduler.request_track(TrackId::from("a"));
        scheduler.request_track(TrackId::from("a"));
        assert_eq!(drain(&mut scheduler), vec![RenderPass::Track(TrackId::from("a"))]);
    }

    #[test]
    fn full_waits_for_assets() {
        let (mut scheduler, host) = scheduler();
        scheduler.request_full();
        assert_eq!(scheduler.poll(false), None);
        assert_eq!(scheduler.pending(), Some(RenderRequest::Full));
        assert_eq!(scheduler.poll(false), None);
        assert_eq!(host.log.borrow().requested.len(), 3);
        assert_eq!(scheduler.poll(true), Some(RenderPass::Full));
        assert!(scheduler.is_idle());
        assert_eq!(scheduler.poll(true), None);
    }
}
