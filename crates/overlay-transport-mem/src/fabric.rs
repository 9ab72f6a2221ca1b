//! 双向链路装配：两个节点之间各一条通道加一个泵任务。

use std::sync::Arc;

use tokio::sync::mpsc;

use overlay_core::{ConnectionId, NetworkAddress, NeighborLink, WireFrame};
use overlay_node::OverlayNode;

use crate::link::MemLink;

/// 为两个节点建立一对双向进程内链路，并启动两个方向的泵任务。
///
/// # 教案式注释
/// - **契约 (What)**：
///   - 调用后 `a`、`b` 双方各挂载一条指向对方的 [`MemLink`]；
///   - 连接标识形如 `mem:<本端>-><对端>`；入站帧以**接收方**指向发送方的
///     那条链路的连接标识投递，与真实传输“应答沿到达连接回发”的语义一致；
/// - **前置条件**：必须在 Tokio 运行时上下文内调用（内部 `tokio::spawn`）；
/// - **生命周期 (How)**：某一端卸载并释放链路后，对应通道关闭，泵任务
///   自然退出；逐消息的处理失败仅记录日志，不中断泵。
///
/// 返回 `(a 指向 b 的链路, b 指向 a 的链路)`。
pub fn link_nodes(a: &Arc<OverlayNode>, b: &Arc<OverlayNode>) -> (Arc<MemLink>, Arc<MemLink>) {
    let (a_to_b_tx, a_to_b_rx) = mpsc::unbounded_channel();
    let (b_to_a_tx, b_to_a_rx) = mpsc::unbounded_channel();

    let link_ab = Arc::new(MemLink::new(
        conduit_id(a.address(), b.address()),
        b.address().clone(),
        a_to_b_tx,
    ));
    let link_ba = Arc::new(MemLink::new(
        conduit_id(b.address(), a.address()),
        a.address().clone(),
        b_to_a_tx,
    ));

    a.attach_link(link_ab.clone());
    b.attach_link(link_ba.clone());

    spawn_pump(Arc::clone(b), link_ba.connection_id().clone(), a_to_b_rx);
    spawn_pump(Arc::clone(a), link_ab.connection_id().clone(), b_to_a_rx);

    (link_ab, link_ba)
}

fn conduit_id(local: &NetworkAddress, peer: &NetworkAddress) -> ConnectionId {
    ConnectionId::new(format!("mem:{local}->{peer}"))
}

/// 单方向泵：把通道里的帧投递给接收节点。
fn spawn_pump(
    receiver: Arc<OverlayNode>,
    inbound_connection: ConnectionId,
    mut frames: mpsc::UnboundedReceiver<WireFrame>,
) {
    tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            let kind = frame.kind_label();
            if let Err(err) = receiver.handle_frame(&inbound_connection, frame) {
                // 逐消息失败（拒绝、未知应答等）不是泵的终止条件。
                tracing::warn!(
                    node = %receiver.address(),
                    connection = %inbound_connection,
                    kind,
                    error = %err,
                    "inbound frame was not accepted"
                );
            }
        }
        tracing::debug!(
            node = %receiver.address(),
            connection = %inbound_connection,
            "conduit closed; pump exiting"
        );
    });
}
