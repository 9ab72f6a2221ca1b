//! # ForwardingEngine：每节点的转发决策管线
//!
//! ## 核心意图（Why）
//! - 决定每个入站请求的命运（本地消费 / 转发 / 丢弃 / 拒绝），并对每个
//!   入站应答执行严格的反向路径关联；
//! - 决策每请求恰好产生一次，引擎从不自动重试——重试与退避属于传输层或
//!   应用层。
//!
//! ## 行为契约（What）
//! - 请求路径：目的地即本节点（或其别名）⇒ 本地消费，不改路径；否则查
//!   路由表，无路由按节点策略 `Reject`/`Drop`；有路由则**先登记待决关联、
//!   再追加自身地址、后提交**；提交失败回滚关联并以
//!   [`OverlayError::SendFailure`]（或 [`OverlayError::LinkNotAttached`]）
//!   浮出，**不会**在同一次尝试内切换其他路由；
//! - 应答路径：有待决关联 ⇒ 完成本地调用或沿原连接回传（条目随之消费，
//!   恰好一次）；无关联 ⇒ 受“未知应答转发”开关管辖；
//! - 过滤器在决策定稿前按注册顺序复核；观察者相对事件同步有序地收到通知。
//!
//! ## 失败语义（Trade-offs）
//! - 任一 `Reject`/`Drop`/`SendFailure` 都是逐消息的本地结果，不影响无关
//!   目的地的转发，也不终止节点；
//! - 观察者与过滤器列表在调用前整体快照（克隆 `Vec<Arc<_>>`），回调内再
//!   注册不会死锁，代价是一次小向量克隆。

use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use parking_lot::RwLock;

use overlay_core::{
    ConnectionId, DropReason, FilterScope, ForwardingDecision, NetworkAddress, OverlayError,
    OverlayObserver, RejectReason, RequestEnvelope, RequestFilter, ResponseEnvelope, RoutingTable,
    WireFrame,
};

use crate::config::{NodeConfig, RejectPolicy};
use crate::links::LinkRegistry;
use crate::pending::{PendingOrigin, PendingStore};

/// 本地应用层回调。
///
/// 返回 `Some(payload)` 时，引擎立即在请求到达的连接上回发应答；返回
/// `None` 表示应用层稍后自行发出应答（或该动作无应答语义）。
pub trait LocalHandler: Send + Sync {
    /// 处理以本节点为目的地的请求。
    fn handle(&self, envelope: &RequestEnvelope) -> Option<Bytes>;
}

/// 入站应答的处置结果。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// 本节点即请求发起方，已完成本地调用。
    CompletedLocalCall,
    /// 已沿请求到达的那条连接原路回传。
    ForwardedBack {
        /// 回传所走的连接。
        via: ConnectionId,
    },
    /// 无待决关联，按应答目的地尽力转发（仅在开关开启时可能发生）。
    ForwardedByDestination {
        /// 尽力转发选中的下一跳。
        next_hop: NetworkAddress,
    },
    /// 应答被丢弃（等待者已离开、尽力转发失败等）。
    Dropped,
}

/// 每节点的转发引擎。
pub struct ForwardingEngine {
    address: NetworkAddress,
    served_aliases: Vec<NetworkAddress>,
    reject_policy: RejectPolicy,
    routing: Arc<RoutingTable>,
    links: Arc<LinkRegistry>,
    pending: Arc<PendingStore>,
    local: RwLock<Option<Arc<dyn LocalHandler>>>,
    filters: RwLock<Vec<(FilterScope, Arc<dyn RequestFilter>)>>,
    observers: RwLock<Vec<Arc<dyn OverlayObserver>>>,
    forward_unknown_responses: AtomicBool,
}

impl ForwardingEngine {
    pub(crate) fn new(
        config: &NodeConfig,
        routing: Arc<RoutingTable>,
        links: Arc<LinkRegistry>,
        pending: Arc<PendingStore>,
    ) -> Self {
        Self {
            address: config.address().clone(),
            served_aliases: config.served_aliases().to_vec(),
            reject_policy: config.reject_policy(),
            routing,
            links,
            pending,
            local: RwLock::new(None),
            filters: RwLock::new(Vec::new()),
            observers: RwLock::new(Vec::new()),
            forward_unknown_responses: AtomicBool::new(config.forward_unknown_responses()),
        }
    }

    /// 本引擎所属节点的地址。
    pub fn address(&self) -> &NetworkAddress {
        &self.address
    }

    /// 挂载本地应用层回调（覆盖旧回调）。
    pub fn set_local_handler(&self, handler: Arc<dyn LocalHandler>) {
        *self.local.write() = Some(handler);
    }

    /// 注册一个请求过滤器；同范围多个过滤器按注册顺序执行。
    pub fn register_filter(&self, scope: FilterScope, filter: Arc<dyn RequestFilter>) {
        self.filters.write().push((scope, filter));
    }

    /// 注册一个观察者；事件按注册顺序同步分发。
    pub fn register_observer(&self, observer: Arc<dyn OverlayObserver>) {
        self.observers.write().push(observer);
    }

    /// 读取“未知应答转发”开关。
    pub fn forward_unknown_responses(&self) -> bool {
        self.forward_unknown_responses.load(Ordering::SeqCst)
    }

    /// 设置“未知应答转发”开关；对下一条被评估的应答生效，
    /// 不追溯已按旧值分发的在途应答。
    pub fn set_forward_unknown_responses(&self, forward: bool) {
        self.forward_unknown_responses.store(forward, Ordering::SeqCst);
    }

    /// 仅做决策，不执行任何副作用（过滤器复核之前的原始决策）。
    pub fn decide(&self, envelope: &RequestEnvelope) -> ForwardingDecision {
        let destination = envelope.destination();
        if destination == &self.address || self.served_aliases.contains(destination) {
            return ForwardingDecision::ConsumeLocally;
        }
        if envelope.path().contains(&self.address) {
            return ForwardingDecision::Drop(DropReason::LoopDetected);
        }
        if self.pending.contains(envelope.id()) {
            return ForwardingDecision::Drop(DropReason::DuplicateRequest);
        }
        match self.routing.select_next_hop(destination) {
            Some(next_hop) => ForwardingDecision::Forward(next_hop),
            None => match self.reject_policy {
                RejectPolicy::Surface => ForwardingDecision::Reject(RejectReason::RouteNotFound {
                    destination: destination.clone(),
                }),
                RejectPolicy::DropSilently => ForwardingDecision::Drop(DropReason::NoRoute),
            },
        }
    }

    /// 处理一个入站请求，返回已定稿并执行完毕的决策。
    ///
    /// `Reject`/`Drop` 以 `Ok(决策)` 返回（逐消息结果，调用方可计数/记录）；
    /// `Err` 仅表示一次已选定下一跳的转发执行失败。
    pub fn handle_request(
        &self,
        from: &ConnectionId,
        envelope: RequestEnvelope,
    ) -> Result<ForwardingDecision, OverlayError> {
        let decision = self.apply_filters(&envelope, self.decide(&envelope));
        for observer in self.observer_snapshot() {
            observer.on_request_received(&envelope, from, &decision);
        }
        match decision {
            ForwardingDecision::ConsumeLocally => {
                tracing::debug!(
                    id = %envelope.id(),
                    action = envelope.action(),
                    from = %from,
                    "request consumed locally"
                );
                self.deliver_locally(from, &envelope)?;
                Ok(ForwardingDecision::ConsumeLocally)
            }
            ForwardingDecision::Forward(next_hop) => self.forward_request(from, envelope, next_hop),
            ForwardingDecision::Reject(reason) => {
                tracing::warn!(
                    id = %envelope.id(),
                    action = envelope.action(),
                    from = %from,
                    %reason,
                    "request rejected"
                );
                for observer in self.observer_snapshot() {
                    observer.on_request_rejected(&envelope, from, &reason);
                }
                Ok(ForwardingDecision::Reject(reason))
            }
            ForwardingDecision::Drop(reason) => {
                tracing::debug!(
                    id = %envelope.id(),
                    action = envelope.action(),
                    from = %from,
                    %reason,
                    "request dropped"
                );
                Ok(ForwardingDecision::Drop(reason))
            }
        }
    }

    /// 处理一个入站应答。
    pub fn handle_response(
        &self,
        from: &ConnectionId,
        envelope: ResponseEnvelope,
    ) -> Result<ResponseOutcome, OverlayError> {
        for observer in self.observer_snapshot() {
            observer.on_response_received(&envelope, from);
        }
        match self.pending.take(envelope.request_id()) {
            Some(PendingOrigin::Local(waiter)) => {
                let request_id = envelope.request_id().clone();
                match waiter.send(envelope) {
                    Ok(()) => {
                        tracing::debug!(request = %request_id, "local call completed");
                        Ok(ResponseOutcome::CompletedLocalCall)
                    }
                    Err(_) => {
                        // 等待者已超时或被取消，关联条目亦已随 take 清除。
                        tracing::debug!(request = %request_id, "local waiter gone; response dropped");
                        Ok(ResponseOutcome::Dropped)
                    }
                }
            }
            Some(PendingOrigin::Link(origin)) => {
                let Some(link) = self.links.get(&origin) else {
                    return Err(OverlayError::LinkNotAttached {
                        target: origin.to_string(),
                    });
                };
                let outbound = envelope.with_appended_hop(self.address.clone());
                let frame = WireFrame::Response(outbound.clone());
                link.submit(frame.clone())?;
                tracing::debug!(
                    request = %outbound.request_id(),
                    via = %origin,
                    "response forwarded along the reverse path"
                );
                for observer in self.observer_snapshot() {
                    observer.on_response_forwarded(&outbound, &origin);
                    observer.on_frame_sent(&frame, link.connection_id());
                }
                Ok(ResponseOutcome::ForwardedBack { via: origin })
            }
            None => self.handle_unknown_response(envelope),
        }
    }

    /// 向观察者广播一次出站提交（供组合根的起源侧发送复用）。
    pub(crate) fn emit_frame_sent(&self, frame: &WireFrame, via: &ConnectionId) {
        for observer in self.observer_snapshot() {
            observer.on_frame_sent(frame, via);
        }
    }

    fn apply_filters(
        &self,
        envelope: &RequestEnvelope,
        mut decision: ForwardingDecision,
    ) -> ForwardingDecision {
        let filters = self.filters.read().clone();
        for (scope, filter) in filters.iter() {
            if scope.matches(envelope.action()) {
                decision = filter.review(envelope, decision);
            }
        }
        decision
    }

    fn observer_snapshot(&self) -> Vec<Arc<dyn OverlayObserver>> {
        self.observers.read().clone()
    }

    fn deliver_locally(
        &self,
        from: &ConnectionId,
        envelope: &RequestEnvelope,
    ) -> Result<(), OverlayError> {
        let handler = self.local.read().clone();
        let Some(handler) = handler else {
            tracing::warn!(
                id = %envelope.id(),
                "no local handler attached; request consumed without reply"
            );
            return Ok(());
        };
        let Some(payload) = handler.handle(envelope) else {
            return Ok(());
        };
        let Some(reply_to) = envelope.path().origin().cloned() else {
            tracing::warn!(
                id = %envelope.id(),
                "request path is empty; reply destination unknown"
            );
            return Ok(());
        };
        let response = ResponseEnvelope::new(envelope.id().clone(), reply_to, payload)
            .with_appended_hop(self.address.clone());
        let Some(link) = self.links.get(from) else {
            return Err(OverlayError::LinkNotAttached {
                target: from.to_string(),
            });
        };
        let frame = WireFrame::Response(response);
        link.submit(frame.clone())?;
        for observer in self.observer_snapshot() {
            observer.on_frame_sent(&frame, link.connection_id());
        }
        Ok(())
    }

    fn forward_request(
        &self,
        from: &ConnectionId,
        envelope: RequestEnvelope,
        next_hop: NetworkAddress,
    ) -> Result<ForwardingDecision, OverlayError> {
        let Some(link) = self.links.link_to(&next_hop) else {
            tracing::warn!(
                id = %envelope.id(),
                %next_hop,
                "route selected but no link is attached toward the next hop"
            );
            return Err(OverlayError::LinkNotAttached {
                target: next_hop.to_string(),
            });
        };
        // 先登记关联再提交：与自身请求赛跑的应答不会丢失。
        self.pending
            .register(envelope.id().clone(), PendingOrigin::Link(from.clone()))?;
        let outbound = envelope.with_appended_hop(self.address.clone());
        let frame = WireFrame::Request(outbound.clone());
        if let Err(err) = link.submit(frame.clone()) {
            self.pending.discard(envelope.id());
            tracing::warn!(
                id = %envelope.id(),
                %next_hop,
                error = %err,
                "submit to next hop failed; no automatic failover"
            );
            return Err(err);
        }
        tracing::debug!(
            id = %outbound.id(),
            %next_hop,
            path = %outbound.path(),
            "request forwarded"
        );
        for observer in self.observer_snapshot() {
            observer.on_request_forwarded(&outbound, from, &next_hop);
            observer.on_frame_sent(&frame, link.connection_id());
        }
        Ok(ForwardingDecision::Forward(next_hop))
    }

    fn handle_unknown_response(
        &self,
        envelope: ResponseEnvelope,
    ) -> Result<ResponseOutcome, OverlayError> {
        if !self.forward_unknown_responses() {
            tracing::debug!(
                request = %envelope.request_id(),
                "no pending correlation; unknown response dropped"
            );
            return Err(OverlayError::UnknownResponse {
                request_id: envelope.request_id().clone(),
            });
        }
        // 尽力而为：按应答目的地独立路由；任何失败都只降级为丢弃。
        let Some(next_hop) = self.routing.select_next_hop(envelope.destination()) else {
            tracing::warn!(
                request = %envelope.request_id(),
                destination = %envelope.destination(),
                "unknown response has no route; dropped"
            );
            return Ok(ResponseOutcome::Dropped);
        };
        let Some(link) = self.links.link_to(&next_hop) else {
            tracing::warn!(
                request = %envelope.request_id(),
                %next_hop,
                "unknown response has no attached link; dropped"
            );
            return Ok(ResponseOutcome::Dropped);
        };
        let outbound = envelope.with_appended_hop(self.address.clone());
        let frame = WireFrame::Response(outbound.clone());
        if let Err(err) = link.submit(frame.clone()) {
            tracing::warn!(
                request = %outbound.request_id(),
                error = %err,
                "best-effort forward of unknown response failed; dropped"
            );
            return Ok(ResponseOutcome::Dropped);
        }
        tracing::debug!(
            request = %outbound.request_id(),
            %next_hop,
            "unknown response forwarded by destination"
        );
        for observer in self.observer_snapshot() {
            observer.on_response_forwarded(&outbound, link.connection_id());
            observer.on_frame_sent(&frame, link.connection_id());
        }
        Ok(ResponseOutcome::ForwardedByDestination { next_hop })
    }
}

impl fmt::Debug for ForwardingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardingEngine")
            .field("address", &self.address)
            .field("served_aliases", &self.served_aliases)
            .field("reject_policy", &self.reject_policy)
            .field("forward_unknown_responses", &self.forward_unknown_responses())
            .field("pending", &self.pending.len())
            .finish()
    }
}
