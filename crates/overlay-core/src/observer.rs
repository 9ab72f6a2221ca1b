//! # observer 模块说明
//!
//! ## 角色定位（Why）
//! - 对外暴露消息流的可观测钩子：每个事件携带信封、当时的网络路径、涉事
//!   连接以及（对请求）已定稿的转发决策，外部调用方（测试、指标、审计）
//!   据此可以完整重建每条消息的经历；
//! - 取代来源系统中“只增不减的可变事件处理器”：这里是**显式注册的有序
//!   观察者列表**，按注册顺序、相对事件同步地逐个调用，没有隐式全局总线。
//!
//! ## 契约要点（What）
//! - 回调在转发热路径上同步执行，实现必须保持轻量、不得阻塞；
//! - 默认实现全部为空操作，按需覆写关心的事件即可。

use crate::address::NetworkAddress;
use crate::decision::{ForwardingDecision, RejectReason};
use crate::link::ConnectionId;
use crate::message::{RequestEnvelope, ResponseEnvelope, WireFrame};

/// 节点消息流的观察者。
///
/// 事件顺序保证：同一条消息上，`on_request_received` 先于
/// `on_request_forwarded`/`on_request_rejected`；出站提交成功后才会触发
/// `on_frame_sent`。
#[allow(unused_variables)]
pub trait OverlayObserver: Send + Sync {
    /// 入站请求已完成决策（信封为到达时的原貌，路径尚未追加本节点）。
    fn on_request_received(
        &self,
        envelope: &RequestEnvelope,
        from: &ConnectionId,
        decision: &ForwardingDecision,
    ) {
    }

    /// 请求已成功转发（信封为出站形态，路径已追加本节点）。
    fn on_request_forwarded(
        &self,
        envelope: &RequestEnvelope,
        from: &ConnectionId,
        next_hop: &NetworkAddress,
    ) {
    }

    /// 请求被拒绝，上游可观察到失败。
    fn on_request_rejected(
        &self,
        envelope: &RequestEnvelope,
        from: &ConnectionId,
        reason: &RejectReason,
    ) {
    }

    /// 入站应答到达（尚未判定是否存在待决关联）。
    fn on_response_received(&self, envelope: &ResponseEnvelope, from: &ConnectionId) {}

    /// 应答已沿反向路径转发（信封为出站形态）。
    fn on_response_forwarded(&self, envelope: &ResponseEnvelope, via: &ConnectionId) {}

    /// 一帧已成功递交给底层链路。
    fn on_frame_sent(&self, frame: &WireFrame, via: &ConnectionId) {}
}
