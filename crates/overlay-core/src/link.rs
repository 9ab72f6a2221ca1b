//! 传输契约：邻居链路与连接标识。
//!
//! 本层不拥有任何线缆格式；“向邻居发送一个信封”被建模为对
//! [`NeighborLink::submit`] 的一次**非阻塞**提交，底层连接的失败或背压
//! 以 [`OverlayError::SendFailure`] 的形式浮出给调用方，绝不吞没。
//! 具体实现（TCP、WebSocket、进程内通道）位于独立的传输 crate。

use core::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::address::NetworkAddress;
use crate::error::OverlayError;
use crate::message::WireFrame;

/// 节点本地视角下某条邻居连接的标识。
///
/// 与 [`NetworkAddress`] 不同：地址标识逻辑节点，连接标识一条具体链路；
/// 待决关联按连接记录，确保应答沿请求到达的那条链路原路返回。
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Arc<str>);

impl ConnectionId {
    /// 以给定标签构造连接标识。
    pub fn new(label: impl AsRef<str>) -> Self {
        Self(Arc::from(label.as_ref()))
    }

    /// 以 `&str` 视图访问标签。
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 指向一个邻居节点的出站链路。
///
/// # 教案式注释
/// - **意图 (Why)**：把“发送”收窄为对象安全的最小契约，转发引擎无需了解
///   任何运行时或线缆细节即可驱动多种传输；
/// - **契约 (What)**：
///   - `connection_id`：本端对该链路的稳定标识；
///   - `peer`：链路对端的节点地址，路由选出的下一跳据此匹配链路；
///   - `submit`：非阻塞递交一帧；失败必须映射为
///     [`OverlayError::SendFailure`]（携带对端地址与底层原因）；
/// - **风险 (Trade-offs)**：契约不承诺送达，只承诺“已递交给底层连接”；
///   可靠性语义由传输实现自行声明。
pub trait NeighborLink: Send + Sync + fmt::Debug {
    /// 本端对该链路的稳定标识。
    fn connection_id(&self) -> &ConnectionId;

    /// 链路对端的节点地址。
    fn peer(&self) -> &NetworkAddress;

    /// 非阻塞地向对端递交一帧。
    fn submit(&self, frame: WireFrame) -> Result<(), OverlayError>;
}
