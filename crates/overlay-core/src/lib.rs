#![deny(unsafe_code)]
#![doc = r#"
# overlay-core

## 设计动机（Why）
- **定位**：本 crate 定义覆盖网络（Overlay Network）路由与转发引擎的核心契约：
  节点地址、网络路径、消息信封、静态路由表、转发决策，以及传输层、过滤器
  与观察者三类扩展点。
- **架构角色**：契约与纯算法层。运行时编排（转发引擎、待决关联、节点组合根）
  位于 `overlay-node`；具体传输实现位于 `overlay-transport-mem` 等实现 crate。
- **设计理念**：所有消息语义对载荷保持不透明（[`bytes::Bytes`]），线缆成帧、
  鉴权与具体充电协议语义均为外部协作者，仅通过窄接口消费本层类型。

## 核心契约（What）
- [`NetworkAddress`]：经校验的、全局唯一的节点标识，保留中央系统别名；
- [`NetworkPath`]：只追加的传输路径记录，最后一个元素即直接上游；
- [`RoutingTable`]：目的地 → 多条带优先级/权重的下一跳条目，读路径无锁快照；
- [`ForwardingDecision`]：`Forward | ConsumeLocally | Drop | Reject` 的穷尽枚举；
- [`NeighborLink`]：非阻塞提交的传输契约；
- [`OverlayError`]：带稳定错误码（`overlay.<域>.<语义>`）的错误域。

## 并发模型（How）
- 路由表读取通过 `arc-swap` 快照完成，读操作永远观察到完整的更新前或更新后
  状态；写操作在 `parking_lot::Mutex` 下串行化，克隆-修改-交换整张表。
- 所有类型均为每节点实例所有，不存在全局可变状态。

## 风险与考量（Trade-offs）
- 加权平局抽签依赖 `rand::rngs::SmallRng`，默认从熵池播种；测试通过
  [`RoutingTable::with_seed`] 固定种子获得确定性。
- 路由写路径整表克隆，适用于“运维驱动、低频写”的静态路由场景；若未来
  需要高频写入，应改为分目的地的细粒度交换。
"#]

pub mod address;
pub mod decision;
pub mod error;
pub mod filter;
pub mod link;
pub mod message;
pub mod observer;
pub mod path;
pub mod routing;

pub use address::NetworkAddress;
pub use decision::{DropReason, ForwardingDecision, RejectReason};
pub use error::{OverlayError, codes};
pub use filter::{FilterScope, RequestFilter};
pub use link::{ConnectionId, NeighborLink};
pub use message::{MessageId, RequestEnvelope, ResponseEnvelope, WireFrame};
pub use observer::OverlayObserver;
pub use path::NetworkPath;
pub use routing::{RoutingEntry, RoutingTable};
