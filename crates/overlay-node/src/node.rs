//! # OverlayNode：组合根
//!
//! ## 角色定位（Why）
//! - 把路由表、转发引擎、待决关联与链路注册表装配为一个对外的节点对象，
//!   并向传输层与应用层各暴露一面窄接口：
//!   - 传输层调用 [`OverlayNode::handle_frame`]（或按帧型分别调用
//!     `handle_request` / `handle_response`）投递入站信封；
//!   - 应用层通过 [`OverlayNode::call`] 发起请求-应答调用，通过
//!     [`OverlayNode::set_local_handler`] 消费以本节点为目的地的请求。
//!
//! ## 契约要点（What）
//! - 每个实例是独立的并发单元，进程内可并存任意多个节点，互不共享状态；
//! - 起源侧发送遵循与转发相同的“追加自身地址后提交”规则，因此最终目的地
//!   观察到的路径以起源节点开头；
//! - [`OverlayNode::call`] 的超时与取消都会清除待决关联，迟到的陈旧应答在
//!   本节点将按“未知应答”处理，绝不会误配给后续调用。

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use overlay_core::{
    ConnectionId, FilterScope, ForwardingDecision, MessageId, NeighborLink, NetworkAddress,
    OverlayError, OverlayObserver, RequestEnvelope, RequestFilter, ResponseEnvelope, RoutingEntry,
    RoutingTable, WireFrame,
};
use tokio::sync::oneshot;

use crate::config::NodeConfig;
use crate::engine::{ForwardingEngine, LocalHandler, ResponseOutcome};
use crate::links::LinkRegistry;
use crate::pending::{PendingOrigin, PendingStore};

/// 一个覆盖网络节点。
#[derive(Debug)]
pub struct OverlayNode {
    config: NodeConfig,
    routing: Arc<RoutingTable>,
    links: Arc<LinkRegistry>,
    pending: Arc<PendingStore>,
    engine: ForwardingEngine,
}

impl OverlayNode {
    /// 以给定配置构造节点；路由 RNG 从熵池播种。
    pub fn new(config: NodeConfig) -> Self {
        Self::assemble(config, RoutingTable::new())
    }

    /// 以固定路由种子构造节点，使平局抽签可复现（测试用）。
    pub fn with_routing_seed(config: NodeConfig, seed: u64) -> Self {
        Self::assemble(config, RoutingTable::with_seed(seed))
    }

    fn assemble(config: NodeConfig, routing: RoutingTable) -> Self {
        let routing = Arc::new(routing);
        let links = Arc::new(LinkRegistry::new());
        let pending = Arc::new(PendingStore::new());
        let engine = ForwardingEngine::new(
            &config,
            Arc::clone(&routing),
            Arc::clone(&links),
            Arc::clone(&pending),
        );
        Self {
            config,
            routing,
            links,
            pending,
            engine,
        }
    }

    /// 节点地址。
    pub fn address(&self) -> &NetworkAddress {
        self.config.address()
    }

    /// 节点配置。
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// 路由表（运维/测试检视用）。
    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    /// 转发引擎。
    pub fn engine(&self) -> &ForwardingEngine {
        &self.engine
    }

    /// 当前在途的待决关联数。
    pub fn outstanding_requests(&self) -> usize {
        self.pending.len()
    }

    // ---- 运维面 ----

    /// 幂等增改一条路由。
    pub fn add_or_update_route(
        &self,
        destination: NetworkAddress,
        next_hop: NetworkAddress,
        priority: i32,
        weight: u32,
    ) {
        self.routing
            .upsert(RoutingEntry::new(destination, next_hop, priority, weight));
    }

    /// 删除一条路由或目的地名下全部路由；目标不存在时为空操作。
    pub fn remove_route(&self, destination: &NetworkAddress, next_hop: Option<&NetworkAddress>) {
        self.routing.remove(destination, next_hop);
    }

    /// 挂载一条邻居链路。
    pub fn attach_link(&self, link: Arc<dyn NeighborLink>) {
        self.links.attach(link);
    }

    /// 卸载一条邻居链路。
    pub fn detach_link(&self, connection: &ConnectionId) -> Option<Arc<dyn NeighborLink>> {
        self.links.detach(connection)
    }

    /// 注册一个观察者。
    pub fn register_observer(&self, observer: Arc<dyn OverlayObserver>) {
        self.engine.register_observer(observer);
    }

    /// 注册一个请求过滤器。
    pub fn register_filter(&self, scope: FilterScope, filter: Arc<dyn RequestFilter>) {
        self.engine.register_filter(scope, filter);
    }

    /// 挂载本地应用层回调。
    pub fn set_local_handler(&self, handler: Arc<dyn LocalHandler>) {
        self.engine.set_local_handler(handler);
    }

    /// 读取“未知应答转发”开关。
    pub fn forward_unknown_responses(&self) -> bool {
        self.engine.forward_unknown_responses()
    }

    /// 设置“未知应答转发”开关（运行时可变，对下一条应答生效）。
    pub fn set_forward_unknown_responses(&self, forward: bool) {
        self.engine.set_forward_unknown_responses(forward);
    }

    // ---- 传输层入站面 ----

    /// 投递一个入站请求。
    pub fn handle_request(
        &self,
        from: &ConnectionId,
        envelope: RequestEnvelope,
    ) -> Result<ForwardingDecision, OverlayError> {
        self.engine.handle_request(from, envelope)
    }

    /// 投递一个入站应答。
    pub fn handle_response(
        &self,
        from: &ConnectionId,
        envelope: ResponseEnvelope,
    ) -> Result<ResponseOutcome, OverlayError> {
        self.engine.handle_response(from, envelope)
    }

    /// 按帧型分发入站帧（传输泵的统一入口）。
    pub fn handle_frame(&self, from: &ConnectionId, frame: WireFrame) -> Result<(), OverlayError> {
        match frame {
            WireFrame::Request(envelope) => self.handle_request(from, envelope).map(|_| ()),
            WireFrame::Response(envelope) => self.handle_response(from, envelope).map(|_| ()),
        }
    }

    // ---- 应用层起源面 ----

    /// 起源侧单向发送：路由、追加自身地址并提交；不登记应答关联。
    ///
    /// 返回实际选中的下一跳。
    pub fn send_request(&self, envelope: RequestEnvelope) -> Result<NetworkAddress, OverlayError> {
        self.dispatch_origin(envelope)
    }

    /// 发起请求-应答调用，使用配置的默认超时。
    pub async fn call(
        &self,
        action: &str,
        destination: NetworkAddress,
        payload: Bytes,
    ) -> Result<ResponseEnvelope, OverlayError> {
        self.call_with_timeout(action, destination, payload, self.config.call_timeout())
            .await
    }

    /// 发起请求-应答调用，显式指定调用方超时。
    ///
    /// # 教案式注释
    /// - **执行逻辑 (How)**：
    ///   1. 生成消息 ID，**先**注册本地等待者（应答与提交赛跑也不丢失）；
    ///   2. 路由并提交请求（起源节点同样遵循“追加自身地址后提交”）；
    ///   3. 在超时窗口内等待应答；
    /// - **后置条件**：超时与取消路径都会清除待决关联，ID 空间复用时陈旧
    ///   应答不会误配新调用；
    /// - **失败语义**：无路由 ⇒ [`OverlayError::RouteNotFound`]；提交失败 ⇒
    ///   [`OverlayError::SendFailure`]；窗口耗尽 ⇒
    ///   [`OverlayError::RequestTimeout`]。
    pub async fn call_with_timeout(
        &self,
        action: &str,
        destination: NetworkAddress,
        payload: Bytes,
        timeout: Duration,
    ) -> Result<ResponseEnvelope, OverlayError> {
        let id = MessageId::generate();
        let (waiter, completion) = oneshot::channel();
        self.pending
            .register(id.clone(), PendingOrigin::Local(waiter))?;
        let guard = PendingGuard::new(Arc::clone(&self.pending), id.clone());

        let envelope = RequestEnvelope::new(id.clone(), action, destination, payload);
        self.dispatch_origin(envelope)?;

        match tokio::time::timeout(timeout, completion).await {
            Ok(Ok(response)) => {
                guard.disarm();
                Ok(response)
            }
            Ok(Err(_)) => Err(OverlayError::Internal {
                detail: "pending correlation dropped before completion".to_owned(),
            }),
            Err(_) => {
                tracing::warn!(request = %id, timeout_ms = timeout.as_millis() as u64, "call timed out");
                Err(OverlayError::RequestTimeout {
                    id,
                    elapsed_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    fn dispatch_origin(&self, envelope: RequestEnvelope) -> Result<NetworkAddress, OverlayError> {
        let next_hop = self
            .routing
            .select_next_hop(envelope.destination())
            .ok_or_else(|| OverlayError::RouteNotFound {
                destination: envelope.destination().clone(),
            })?;
        let link = self
            .links
            .link_to(&next_hop)
            .ok_or_else(|| OverlayError::LinkNotAttached {
                target: next_hop.to_string(),
            })?;
        let outbound = envelope.with_appended_hop(self.address().clone());
        let frame = WireFrame::Request(outbound);
        link.submit(frame.clone())?;
        tracing::debug!(%next_hop, "request dispatched from origin");
        self.engine.emit_frame_sent(&frame, link.connection_id());
        Ok(next_hop)
    }
}

/// 调用侧待决关联的 RAII 守卫：超时或取消时清除条目。
struct PendingGuard {
    pending: Arc<PendingStore>,
    id: MessageId,
    armed: bool,
}

impl PendingGuard {
    fn new(pending: Arc<PendingStore>, id: MessageId) -> Self {
        Self {
            pending,
            id,
            armed: true,
        }
    }

    /// 成功路径：条目已被应答消费，守卫不再需要清理。
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.armed {
            self.pending.discard(&self.id);
        }
    }
}
