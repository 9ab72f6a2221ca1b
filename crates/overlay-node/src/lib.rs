#![deny(unsafe_code)]
#![doc = r#"
# overlay-node

## 设计动机（Why）
- **定位**：本 crate 把 `overlay-core` 的契约落地为单个覆盖网络节点的运行时：
  转发引擎、待决关联存储、链路注册表、节点配置与组合根 [`OverlayNode`]。
- **架构角色**：每个 [`OverlayNode`] 是独立的并发单元——可同时接收多条邻居
  连接的入站信封，互不相关的信封互不阻塞；所有状态（路由表、待决关联、
  观察者列表）均为实例所有，进程内可并存任意多个节点而互不渗漏。
- **设计理念**：引擎本身不做任何阻塞 IO；向邻居发送即对链路的非阻塞提交，
  底层失败以 [`overlay_core::OverlayError::SendFailure`] 浮出。

## 核心契约（What）
- [`ForwardingEngine`]：请求决策管线（本地消费 / 转发 / 丢弃 / 拒绝）与
  应答的严格反向路径关联；
- [`PendingStore`]：请求 ID → 到达连接（或本地等待者）的原子关联表；
- [`OverlayNode::call`]：起源侧的请求-应答关联，带调用方超时；超时或取消
  后关联条目即被清除，迟到的陈旧应答不会误配给后续调用；
- [`NodeConfig`]：节点地址、别名、拒绝策略、未知应答策略与默认超时。

## 实现策略（How）
- 待决关联基于 `DashMap`，注册先于提交，与自身请求赛跑的应答不会丢失；
- 未知应答策略是运行时可变的原子开关，对下一条被评估的应答生效；
- 调用侧关联使用 `tokio::sync::oneshot` 加 `tokio::time::timeout`，守卫
  （RAII）保证超时与取消路径都会清除关联条目。
"#]

pub mod config;
pub mod engine;
pub mod links;
pub mod node;
pub mod pending;

pub use config::{NodeConfig, RejectPolicy};
pub use engine::{ForwardingEngine, LocalHandler, ResponseOutcome};
pub use links::LinkRegistry;
pub use node::OverlayNode;
pub use pending::{PendingOrigin, PendingStore};
