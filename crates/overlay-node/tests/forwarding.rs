//! 转发引擎的逐跳行为套件。
//!
//! # 教案级导览
//! - **Why**：路径累积、反向路径独占、未知应答策略与“无自动故障转移”是
//!   高可用拓扑的全部契约，必须在不引入真实传输的前提下逐跳钉死；
//! - **How**：以 [`support::RecordingLink`] 充当链路，测试自己扮演“线缆”，
//!   把录到的帧手工投递给下一个节点，从而可以在每一跳上断言路径与决策；
//! - **What**：覆盖请求的四种决策、应答的四种处置、过滤器复核、观察者
//!   计数与发送失败语义。

mod support;

use std::sync::{Arc, Mutex};

use bytes::Bytes;

use overlay_core::{
    DropReason, FilterScope, ForwardingDecision, MessageId, NetworkPath, RejectReason,
    RequestEnvelope, RequestFilter, ResponseEnvelope, WireFrame,
};
use overlay_node::{NodeConfig, OverlayNode, RejectPolicy, ResponseOutcome};

use support::{CountingObserver, RecordingLink, addr, conn};

fn request(id: &str, action: &str, destination: &str) -> RequestEnvelope {
    RequestEnvelope::new(
        MessageId::new(id),
        action,
        addr(destination),
        Bytes::from_static(b"{}"),
    )
}

/// 取走链路出箱中的唯一一帧。
fn sole_frame(link: &RecordingLink) -> WireFrame {
    let mut frames = link.take_frames();
    assert_eq!(frames.len(), 1, "链路出箱应恰有一帧");
    frames.remove(0)
}

#[test]
fn path_accumulates_hop_by_hop_in_traversal_order() {
    // 拓扑：cs-1 → lc-1 → gw-1 → csms
    let origin = OverlayNode::new(NodeConfig::new(addr("cs-1")));
    let node_a = OverlayNode::new(NodeConfig::new(addr("lc-1")));
    let node_b = OverlayNode::new(NodeConfig::new(addr("gw-1")));
    let target = OverlayNode::new(NodeConfig::new(addr("csms")));

    origin.add_or_update_route(addr("csms"), addr("lc-1"), 10, 1);
    node_a.add_or_update_route(addr("csms"), addr("gw-1"), 10, 1);
    node_b.add_or_update_route(addr("csms"), addr("csms"), 10, 1);

    let origin_uplink = Arc::new(RecordingLink::new("cs-1->lc-1", addr("lc-1")));
    let a_uplink = Arc::new(RecordingLink::new("lc-1->gw-1", addr("gw-1")));
    let b_uplink = Arc::new(RecordingLink::new("gw-1->csms", addr("csms")));
    let target_downlink = Arc::new(RecordingLink::new("csms<-gw-1", addr("gw-1")));
    origin.attach_link(origin_uplink.clone());
    node_a.attach_link(a_uplink.clone());
    node_b.attach_link(b_uplink.clone());
    target.attach_link(target_downlink.clone());

    let delivered_paths: Arc<Mutex<Vec<NetworkPath>>> = Arc::new(Mutex::new(Vec::new()));
    struct CapturePath(Arc<Mutex<Vec<NetworkPath>>>);
    impl overlay_node::LocalHandler for CapturePath {
        fn handle(&self, envelope: &RequestEnvelope) -> Option<Bytes> {
            self.0.lock().expect("捕获锁不应中毒").push(envelope.path().clone());
            Some(Bytes::from_static(b"accepted"))
        }
    }
    target.set_local_handler(Arc::new(CapturePath(delivered_paths.clone())));

    // 起源节点发出：路径 = [cs-1]
    origin
        .send_request(request("m-1", "BootNotification", "csms"))
        .expect("起源发送应成功");
    let WireFrame::Request(hop1) = sole_frame(&origin_uplink) else {
        panic!("期望请求帧");
    };
    assert_eq!(hop1.path().hops(), &[addr("cs-1")]);

    // lc-1 转发：路径 = [cs-1, lc-1]
    let decision = node_a
        .handle_request(&conn("lc-1<-cs-1"), hop1)
        .expect("lc-1 转发应成功");
    assert_eq!(decision, ForwardingDecision::Forward(addr("gw-1")));
    let WireFrame::Request(hop2) = sole_frame(&a_uplink) else {
        panic!("期望请求帧");
    };
    assert_eq!(hop2.path().hops(), &[addr("cs-1"), addr("lc-1")]);
    assert_eq!(hop2.path().last(), Some(&addr("lc-1")), "末元素即直接上游");

    // gw-1 转发：路径 = [cs-1, lc-1, gw-1]
    node_b
        .handle_request(&conn("gw-1<-lc-1"), hop2)
        .expect("gw-1 转发应成功");
    let WireFrame::Request(hop3) = sole_frame(&b_uplink) else {
        panic!("期望请求帧");
    };
    assert_eq!(hop3.path().hops(), &[addr("cs-1"), addr("lc-1"), addr("gw-1")]);

    // 目的节点消费：不追加自身，观察到完整中转路径
    let decision = target
        .handle_request(&conn("csms<-gw-1"), hop3)
        .expect("目的地消费应成功");
    assert_eq!(decision, ForwardingDecision::ConsumeLocally);
    let paths = delivered_paths.lock().expect("捕获锁不应中毒");
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].hops(), &[addr("cs-1"), addr("lc-1"), addr("gw-1")]);

    // 目的节点立即在到达连接上回发应答，应答路径以目的节点开头
    let WireFrame::Response(reply) = sole_frame(&target_downlink) else {
        panic!("期望应答帧");
    };
    assert_eq!(reply.request_id(), &MessageId::new("m-1"));
    assert_eq!(reply.destination(), &addr("cs-1"));
    assert_eq!(reply.path().hops(), &[addr("csms")]);
}

#[test]
fn response_retraces_only_the_forwarding_connection() {
    let node = OverlayNode::new(NodeConfig::new(addr("lc-2")));
    node.add_or_update_route(addr("csms"), addr("gw-1"), 10, 1);

    let downlink = Arc::new(RecordingLink::new("lc-2<-cs-1", addr("cs-1")));
    let uplink = Arc::new(RecordingLink::new("lc-2->gw-1", addr("gw-1")));
    node.attach_link(downlink.clone());
    node.attach_link(uplink.clone());

    // 请求从 cs-1 侧连接到达并被转发
    node.handle_request(&conn("lc-2<-cs-1"), request("m-9", "Authorize", "csms"))
        .expect("转发应成功");
    assert_eq!(node.outstanding_requests(), 1);
    let _ = sole_frame(&uplink);

    // 应答回来：必须且只能走请求到达的那条连接
    let response = ResponseEnvelope::new(MessageId::new("m-9"), addr("cs-1"), Bytes::new())
        .with_appended_hop(addr("csms"));
    let outcome = node
        .handle_response(&conn("lc-2->gw-1"), response)
        .expect("反向关联应命中");
    assert_eq!(
        outcome,
        ResponseOutcome::ForwardedBack {
            via: conn("lc-2<-cs-1")
        }
    );
    let WireFrame::Response(reply) = sole_frame(&downlink) else {
        panic!("期望应答帧");
    };
    assert_eq!(reply.path().hops(), &[addr("csms"), addr("lc-2")]);
    assert_eq!(uplink.frame_count(), 0, "上行链路不得出现应答");
    assert_eq!(node.outstanding_requests(), 0, "关联条目恰好消费一次");

    // 同一应答再来一次：关联已消费，按未知应答处理
    let stale = ResponseEnvelope::new(MessageId::new("m-9"), addr("cs-1"), Bytes::new());
    let err = node
        .handle_response(&conn("lc-2->gw-1"), stale)
        .expect_err("重复应答不应再命中关联");
    assert_eq!(err.code(), overlay_core::codes::RESPONSE_UNKNOWN);
}

#[test]
fn nodes_off_the_forwarding_path_never_see_the_response() {
    // L1/L3 未参与转发、开关关闭：必须零应答流量
    for label in ["l1", "l3"] {
        let bystander = OverlayNode::new(NodeConfig::new(addr(label)));
        let side_link = Arc::new(RecordingLink::new("side", addr("cs-1")));
        bystander.attach_link(side_link.clone());

        let response = ResponseEnvelope::new(MessageId::new("m-42"), addr("cs-1"), Bytes::new());
        let err = bystander
            .handle_response(&conn("side"), response)
            .expect_err("无关联且开关关闭时应答必须被丢弃");
        assert_eq!(err.code(), overlay_core::codes::RESPONSE_UNKNOWN);
        assert_eq!(side_link.frame_count(), 0);
    }
}

#[test]
fn unknown_responses_are_forwarded_only_when_enabled() {
    let node = OverlayNode::new(NodeConfig::new(addr("l3")));
    node.add_or_update_route(addr("cs-1"), addr("cs-1"), 10, 1);
    let downlink = Arc::new(RecordingLink::new("l3->cs-1", addr("cs-1")));
    node.attach_link(downlink.clone());

    let response = ResponseEnvelope::new(MessageId::new("m-7"), addr("cs-1"), Bytes::new());

    // 默认关闭：丢弃
    let err = node
        .handle_response(&conn("l3<-gw-1"), response.clone())
        .expect_err("开关关闭时未知应答应被丢弃");
    assert_eq!(err.code(), overlay_core::codes::RESPONSE_UNKNOWN);
    assert_eq!(downlink.frame_count(), 0);

    // 运行时打开：对下一条应答生效，按目的地尽力转发
    node.set_forward_unknown_responses(true);
    assert!(node.forward_unknown_responses());
    let outcome = node
        .handle_response(&conn("l3<-gw-1"), response)
        .expect("开关开启时应尽力转发");
    assert_eq!(
        outcome,
        ResponseOutcome::ForwardedByDestination {
            next_hop: addr("cs-1")
        }
    );
    let WireFrame::Response(forwarded) = sole_frame(&downlink) else {
        panic!("期望应答帧");
    };
    assert_eq!(forwarded.path().last(), Some(&addr("l3")));
}

#[test]
fn missing_route_surfaces_or_drops_per_policy() {
    let strict = OverlayNode::new(NodeConfig::new(addr("lc-1")));
    let counting = Arc::new(CountingObserver::new());
    strict.register_observer(counting.clone());
    let decision = strict
        .handle_request(&conn("in"), request("m-1", "Heartbeat", "nowhere"))
        .expect("无路由不是崩溃条件");
    assert_eq!(
        decision,
        ForwardingDecision::Reject(RejectReason::RouteNotFound {
            destination: addr("nowhere")
        })
    );
    let [received, _, rejected, ..] = counting.snapshot();
    assert_eq!((received, rejected), (1, 1), "拒绝必须可被观察者计数");

    let silent = OverlayNode::new(
        NodeConfig::new(addr("lc-2")).with_reject_policy(RejectPolicy::DropSilently),
    );
    let decision = silent
        .handle_request(&conn("in"), request("m-2", "Heartbeat", "nowhere"))
        .expect("静默策略下同样不是错误");
    assert_eq!(decision, ForwardingDecision::Drop(DropReason::NoRoute));
}

#[test]
fn filters_review_matching_actions_in_order() {
    struct ResetGuard;
    impl RequestFilter for ResetGuard {
        fn name(&self) -> &str {
            "reset-guard"
        }
        fn review(
            &self,
            _envelope: &RequestEnvelope,
            proposed: ForwardingDecision,
        ) -> ForwardingDecision {
            match proposed {
                ForwardingDecision::Forward(_) => {
                    ForwardingDecision::Reject(RejectReason::FilterVeto {
                        filter: "reset-guard".to_owned(),
                    })
                }
                other => other,
            }
        }
    }

    let node = OverlayNode::new(NodeConfig::new(addr("lc-1")));
    node.add_or_update_route(addr("csms"), addr("gw-1"), 10, 1);
    let uplink = Arc::new(RecordingLink::new("lc-1->gw-1", addr("gw-1")));
    node.attach_link(uplink.clone());
    node.register_filter(FilterScope::action("Reset"), Arc::new(ResetGuard));

    // 命中范围的动作被否决，且不产生任何出站流量
    let decision = node
        .handle_request(&conn("in"), request("m-1", "Reset", "csms"))
        .expect("否决以决策形式返回");
    assert_eq!(
        decision,
        ForwardingDecision::Reject(RejectReason::FilterVeto {
            filter: "reset-guard".to_owned()
        })
    );
    assert_eq!(uplink.frame_count(), 0);
    assert_eq!(node.outstanding_requests(), 0);

    // 范围之外的动作不受影响
    let decision = node
        .handle_request(&conn("in"), request("m-2", "Heartbeat", "csms"))
        .expect("未命中过滤器的动作照常转发");
    assert_eq!(decision, ForwardingDecision::Forward(addr("gw-1")));
}

#[test]
fn send_failure_rolls_back_and_never_fails_over() {
    let node = OverlayNode::new(NodeConfig::new(addr("lc-1")));
    node.add_or_update_route(addr("csms"), addr("gw-1"), 10, 1);
    node.add_or_update_route(addr("csms"), addr("gw-2"), 20, 1);

    let primary = Arc::new(RecordingLink::new("lc-1->gw-1", addr("gw-1")));
    let secondary = Arc::new(RecordingLink::new("lc-1->gw-2", addr("gw-2")));
    primary.set_failing(true);
    node.attach_link(primary.clone());
    node.attach_link(secondary.clone());

    let err = node
        .handle_request(&conn("in"), request("m-1", "Authorize", "csms"))
        .expect_err("提交失败必须浮出");
    assert_eq!(err.code(), overlay_core::codes::SEND_FAILURE);
    assert_eq!(secondary.frame_count(), 0, "同一次尝试内不得自动故障转移");
    assert_eq!(node.outstanding_requests(), 0, "失败后关联必须回滚");
}

#[test]
fn looped_and_duplicate_requests_are_dropped() {
    let node = OverlayNode::new(NodeConfig::new(addr("lc-1")));
    node.add_or_update_route(addr("csms"), addr("gw-1"), 10, 1);
    let uplink = Arc::new(RecordingLink::new("lc-1->gw-1", addr("gw-1")));
    node.attach_link(uplink.clone());

    // 路径中已有本节点：成环
    let looped = request("m-1", "Heartbeat", "csms")
        .with_appended_hop(addr("cs-1"))
        .with_appended_hop(addr("lc-1"));
    let decision = node
        .handle_request(&conn("in"), looped)
        .expect("环路以丢弃表达");
    assert_eq!(decision, ForwardingDecision::Drop(DropReason::LoopDetected));

    // 同一 ID 的在途重复
    node.handle_request(&conn("in"), request("m-2", "Heartbeat", "csms"))
        .expect("首次转发应成功");
    let decision = node
        .handle_request(&conn("in"), request("m-2", "Heartbeat", "csms"))
        .expect("重复以丢弃表达");
    assert_eq!(decision, ForwardingDecision::Drop(DropReason::DuplicateRequest));
    assert_eq!(uplink.frame_count(), 1, "重复请求不得再次出站");
}

#[test]
fn served_alias_is_consumed_by_the_configured_node() {
    let central = OverlayNode::new(
        NodeConfig::new(addr("central-1")).with_served_alias(addr("csms")),
    );
    let decision = central
        .handle_request(&conn("in"), request("m-1", "BootNotification", "csms"))
        .expect("别名消费应成功");
    assert_eq!(decision, ForwardingDecision::ConsumeLocally);

    // 未配置别名的节点则照常尝试路由（此处无路由 ⇒ 拒绝）
    let other = OverlayNode::new(NodeConfig::new(addr("lc-1")));
    let decision = other
        .handle_request(&conn("in"), request("m-2", "BootNotification", "csms"))
        .expect("无路由不是崩溃条件");
    assert!(matches!(decision, ForwardingDecision::Reject(_)));
}

#[test]
fn observers_reconstruct_per_hop_traffic() {
    let node = OverlayNode::new(NodeConfig::new(addr("lc-1")));
    node.add_or_update_route(addr("csms"), addr("gw-1"), 10, 1);
    let downlink = Arc::new(RecordingLink::new("lc-1<-cs-1", addr("cs-1")));
    let uplink = Arc::new(RecordingLink::new("lc-1->gw-1", addr("gw-1")));
    node.attach_link(downlink.clone());
    node.attach_link(uplink.clone());

    let counting = Arc::new(CountingObserver::new());
    node.register_observer(counting.clone());

    node.handle_request(&conn("lc-1<-cs-1"), request("m-1", "Authorize", "csms"))
        .expect("转发应成功");
    let response = ResponseEnvelope::new(MessageId::new("m-1"), addr("cs-1"), Bytes::new());
    node.handle_response(&conn("lc-1->gw-1"), response)
        .expect("反向关联应命中");

    assert_eq!(
        counting.snapshot(),
        [1, 1, 0, 1, 1, 2],
        "收到/转发/拒绝/应答收到/应答转发/出站帧 计数必须完整还原流量"
    );
}
