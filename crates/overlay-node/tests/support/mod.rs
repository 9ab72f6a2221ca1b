#![allow(dead_code)]
//! 转发测试的公共夹具：可录制/可注入故障的链路与计数观察者。

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use overlay_core::{
    ConnectionId, ForwardingDecision, NeighborLink, NetworkAddress, OverlayError, OverlayObserver,
    RejectReason, RequestEnvelope, ResponseEnvelope, WireFrame,
};

pub fn addr(token: &str) -> NetworkAddress {
    NetworkAddress::new(token).expect("测试地址应合法")
}

pub fn conn(label: &str) -> ConnectionId {
    ConnectionId::new(label)
}

/// 把提交的帧录进出箱的链路；可切换为注入提交失败。
#[derive(Debug)]
pub struct RecordingLink {
    connection: ConnectionId,
    peer: NetworkAddress,
    outbox: Mutex<Vec<WireFrame>>,
    failing: AtomicBool,
}

impl RecordingLink {
    pub fn new(connection_label: &str, peer: NetworkAddress) -> Self {
        Self {
            connection: ConnectionId::new(connection_label),
            peer,
            outbox: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// 取走（并清空）已录制的帧。
    pub fn take_frames(&self) -> Vec<WireFrame> {
        std::mem::take(&mut self.outbox.lock().expect("出箱锁不应中毒"))
    }

    pub fn frame_count(&self) -> usize {
        self.outbox.lock().expect("出箱锁不应中毒").len()
    }

    /// 之后的提交是否全部失败。
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl NeighborLink for RecordingLink {
    fn connection_id(&self) -> &ConnectionId {
        &self.connection
    }

    fn peer(&self) -> &NetworkAddress {
        &self.peer
    }

    fn submit(&self, frame: WireFrame) -> Result<(), OverlayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(OverlayError::SendFailure {
                next_hop: self.peer.clone(),
                detail: "synthetic link failure".to_owned(),
            });
        }
        self.outbox.lock().expect("出箱锁不应中毒").push(frame);
        Ok(())
    }
}

/// 按事件类别计数的观察者。
#[derive(Debug, Default)]
pub struct CountingObserver {
    pub requests_received: AtomicUsize,
    pub requests_forwarded: AtomicUsize,
    pub requests_rejected: AtomicUsize,
    pub responses_received: AtomicUsize,
    pub responses_forwarded: AtomicUsize,
    pub frames_sent: AtomicUsize,
}

impl CountingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> [usize; 6] {
        [
            self.requests_received.load(Ordering::SeqCst),
            self.requests_forwarded.load(Ordering::SeqCst),
            self.requests_rejected.load(Ordering::SeqCst),
            self.responses_received.load(Ordering::SeqCst),
            self.responses_forwarded.load(Ordering::SeqCst),
            self.frames_sent.load(Ordering::SeqCst),
        ]
    }
}

impl OverlayObserver for CountingObserver {
    fn on_request_received(
        &self,
        _envelope: &RequestEnvelope,
        _from: &ConnectionId,
        _decision: &ForwardingDecision,
    ) {
        self.requests_received.fetch_add(1, Ordering::SeqCst);
    }

    fn on_request_forwarded(
        &self,
        _envelope: &RequestEnvelope,
        _from: &ConnectionId,
        _next_hop: &NetworkAddress,
    ) {
        self.requests_forwarded.fetch_add(1, Ordering::SeqCst);
    }

    fn on_request_rejected(
        &self,
        _envelope: &RequestEnvelope,
        _from: &ConnectionId,
        _reason: &RejectReason,
    ) {
        self.requests_rejected.fetch_add(1, Ordering::SeqCst);
    }

    fn on_response_received(&self, _envelope: &ResponseEnvelope, _from: &ConnectionId) {
        self.responses_received.fetch_add(1, Ordering::SeqCst);
    }

    fn on_response_forwarded(&self, _envelope: &ResponseEnvelope, _via: &ConnectionId) {
        self.responses_forwarded.fetch_add(1, Ordering::SeqCst);
    }

    fn on_frame_sent(&self, _frame: &WireFrame, _via: &ConnectionId) {
        self.frames_sent.fetch_add(1, Ordering::SeqCst);
    }
}
