//! 转发决策：每个入站请求恰好产生一次的穷尽枚举。
//!
//! 取代来源系统中“可空决策对象”的模式：所有调用点必须穷尽匹配四个变体，
//! 不存在未决状态。引擎自身从不重试，重试（若有）属于传输或应用层。

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::address::NetworkAddress;

/// 入站请求的处置结果。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForwardingDecision {
    /// 转发给选定的下一跳。
    Forward(NetworkAddress),
    /// 本节点即目的地，交给本地应用层。
    ConsumeLocally,
    /// 静默丢弃（原因可观测，但不向上游回报失败）。
    Drop(DropReason),
    /// 拒绝并让上游观察到失败。
    Reject(RejectReason),
}

impl ForwardingDecision {
    /// 是否为转发决策。
    pub fn is_forward(&self) -> bool {
        matches!(self, ForwardingDecision::Forward(_))
    }

    /// 用于日志的决策标签。
    pub fn label(&self) -> &'static str {
        match self {
            ForwardingDecision::Forward(_) => "forward",
            ForwardingDecision::ConsumeLocally => "consume-locally",
            ForwardingDecision::Drop(_) => "drop",
            ForwardingDecision::Reject(_) => "reject",
        }
    }
}

/// 丢弃原因。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DropReason {
    /// 无路由且节点被配置为静默丢弃。
    NoRoute,
    /// 路径中已包含本节点，继续转发必然成环。
    LoopDetected,
    /// 同一消息 ID 已有在途的待决关联。
    DuplicateRequest,
    /// 过滤器否决。
    FilterVeto {
        /// 否决方过滤器的名字。
        filter: String,
    },
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::NoRoute => f.write_str("no route to destination"),
            DropReason::LoopDetected => f.write_str("network path already contains this node"),
            DropReason::DuplicateRequest => f.write_str("message id already pending at this node"),
            DropReason::FilterVeto { filter } => {
                write!(f, "vetoed by request filter `{filter}`")
            }
        }
    }
}

/// 拒绝原因。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RejectReason {
    /// 路由表中没有该目的地的任何条目。
    RouteNotFound {
        /// 查询失败的目的地。
        destination: NetworkAddress,
    },
    /// 过滤器否决并要求上游可见。
    FilterVeto {
        /// 否决方过滤器的名字。
        filter: String,
    },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::RouteNotFound { destination } => {
                write!(f, "no route entry for destination `{destination}`")
            }
            RejectReason::FilterVeto { filter } => {
                write!(f, "rejected by request filter `{filter}`")
            }
        }
    }
}
