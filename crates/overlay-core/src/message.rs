//! 消息信封：请求、应答与线缆帧。
//!
//! 载荷对本层完全不透明（[`Bytes`]），具体协议动作（BootNotification、
//! Authorize 等）仅以 `action` 标签区分；线缆成帧由外部传输层负责，
//! 本模块只保证信封可被 `serde` 序列化以便传输层取用。

use core::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::address::NetworkAddress;
use crate::path::NetworkPath;

/// 请求/应答关联所用的消息标识。
///
/// 令牌不透明；[`MessageId::generate`] 产生 128 位随机十六进制令牌，
/// 碰撞概率可忽略。
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Arc<str>);

impl MessageId {
    /// 以既有令牌构造消息 ID（外部系统注入的 ID 原样保留）。
    pub fn new(token: impl AsRef<str>) -> Self {
        Self(Arc::from(token.as_ref()))
    }

    /// 生成随机消息 ID。
    pub fn generate() -> Self {
        let token: u128 = rand::random();
        Self(Arc::from(format!("{token:032x}").as_str()))
    }

    /// 以 `&str` 视图访问令牌。
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 请求信封。
///
/// # 教案式注释
/// - **契约 (What)**：`id` 关联最终应答；`action` 为不透明的动作标签；
///   `destination` 为最终收件节点；`path` 记录已经过的中转跳；
///   `payload` 为不透明载荷；
/// - **生命周期**：起源节点以空路径创建，发出前由发送方（含起源节点）
///   追加自身地址；目的节点消费时不追加。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    id: MessageId,
    action: Arc<str>,
    destination: NetworkAddress,
    path: NetworkPath,
    payload: Bytes,
}

impl RequestEnvelope {
    /// 在起源节点构造新的请求信封（路径为空）。
    pub fn new(
        id: MessageId,
        action: impl AsRef<str>,
        destination: NetworkAddress,
        payload: Bytes,
    ) -> Self {
        Self {
            id,
            action: Arc::from(action.as_ref()),
            destination,
            path: NetworkPath::empty(),
            payload,
        }
    }

    /// 返回路径追加了 `hop` 的新信封；发送方在提交前调用。
    #[must_use]
    pub fn with_appended_hop(&self, hop: NetworkAddress) -> Self {
        Self {
            path: self.path.append(hop),
            ..self.clone()
        }
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn destination(&self) -> &NetworkAddress {
        &self.destination
    }

    pub fn path(&self) -> &NetworkPath {
        &self.path
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

/// 应答信封，沿请求的反向路径逐跳回传。
///
/// `request_id` 关联原始请求；`destination` 为原始请求的起源节点；
/// `path` 记录应答自身经过的中转跳，追加规则与请求一致。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    request_id: MessageId,
    destination: NetworkAddress,
    path: NetworkPath,
    payload: Bytes,
}

impl ResponseEnvelope {
    /// 在应答方构造新的应答信封（路径为空）。
    pub fn new(request_id: MessageId, destination: NetworkAddress, payload: Bytes) -> Self {
        Self {
            request_id,
            destination,
            path: NetworkPath::empty(),
            payload,
        }
    }

    /// 返回路径追加了 `hop` 的新信封。
    #[must_use]
    pub fn with_appended_hop(&self, hop: NetworkAddress) -> Self {
        Self {
            path: self.path.append(hop),
            ..self.clone()
        }
    }

    pub fn request_id(&self) -> &MessageId {
        &self.request_id
    }

    pub fn destination(&self) -> &NetworkAddress {
        &self.destination
    }

    pub fn path(&self) -> &NetworkPath {
        &self.path
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

/// 提交给邻居链路的最小传输单元。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireFrame {
    /// 正向流动的请求。
    Request(RequestEnvelope),
    /// 反向流动的应答。
    Response(ResponseEnvelope),
}

impl WireFrame {
    /// 用于日志与观测的帧类别标签。
    pub fn kind_label(&self) -> &'static str {
        match self {
            WireFrame::Request(_) => "request",
            WireFrame::Response(_) => "response",
        }
    }
}
