#![deny(unsafe_code)]
#![doc = r#"
# overlay-transport-mem

## 设计动机（Why）
- **定位**：该 crate 提供 [`overlay_core::NeighborLink`] 契约的最小进程内
  实现，基于 `tokio::sync::mpsc` 无界通道，把“向邻居提交一帧”映射为一次
  非阻塞的通道发送。
- **架构角色**：传输实现层的测试积木。集成测试与演示用它在单个进程内
  搭建多节点拓扑，验证逐跳转发、路径累积与反向关联，而无须任何套接字。
- **设计理念**：与真实传输实现保持相同的失败语义——通道关闭时提交失败以
  [`overlay_core::OverlayError::SendFailure`] 浮出，绝不吞没。

## 核心契约（What）
- [`MemLink`]：持有对端地址与发送端的链路对象；
- [`link_nodes`]：为两个 [`overlay_node::OverlayNode`] 建立一对双向链路，
  并为每个方向启动一个泵任务，把帧投递给对端节点的
  [`overlay_node::OverlayNode::handle_frame`]。

## 实现策略（How）
- 每个方向一条无界通道加一个泵任务；泵在通道关闭（对端链路被卸载且
  释放）后自然退出；
- 逐消息的处理失败（拒绝、未知应答等）由泵记录日志后继续，节点层的
  失败语义不会中断传输。

## 风险与考量（Trade-offs）
- 无界通道没有背压，仅适用于测试与演示负载；真实传输应实现有界提交并
  把背压映射为提交失败。
"#]

mod fabric;
mod link;

pub use fabric::link_nodes;
pub use link::MemLink;
