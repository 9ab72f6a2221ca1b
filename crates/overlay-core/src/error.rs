//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 为覆盖网络核心提供集中定义的错误域，所有变体均为**逐消息**的本地结果：
//!   任何一个都不终止节点进程，也不破坏无关目的地的路由状态；
//! - 稳定错误码遵循 `overlay.<域>.<语义>` 约定，供日志、指标与告警系统做
//!   精确的自动化分类。
//!
//! ## 设计要求（What）
//! - 所有变体实现 `thiserror::Error`，`Send + Sync + 'static`，可安全跨线程
//!   传播，并派生 `Clone`/`PartialEq` 以便测试直接断言；
//! - 面向调用方的失败永远以类型化结果表达，绝不以全局异常形式出现。

use thiserror::Error;

use crate::address::NetworkAddress;
use crate::message::MessageId;

/// 稳定错误码清单。
///
/// 命名规范：`overlay.<域>.<语义>`；新增错误码时保持向后兼容，
/// 只增不改。
pub mod codes {
    /// 地址令牌未通过校验。
    pub const ADDRESS_INVALID: &str = "overlay.address.invalid";
    /// 目的地没有任何路由条目。
    pub const ROUTE_NOT_FOUND: &str = "overlay.route.not_found";
    /// 调用方等待应答超时。
    pub const REQUEST_TIMEOUT: &str = "overlay.request.timeout";
    /// 应答在本节点没有匹配的待决关联。
    pub const RESPONSE_UNKNOWN: &str = "overlay.response.unknown";
    /// 向下一跳提交帧失败。
    pub const SEND_FAILURE: &str = "overlay.send.failure";
    /// 指向目标的链路未挂载。
    pub const LINK_MISSING: &str = "overlay.link.missing";
    /// 消息 ID 与已有待决关联冲突。
    pub const CORRELATION_CONFLICT: &str = "overlay.correlation.conflict";
    /// 未细分的内部异常。
    pub const INTERNAL: &str = "overlay.internal";
}

/// 覆盖网络核心错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：聚合寻址、路由、关联与传输递交等关键路径的异常，
///   细粒度枚举帮助上层快速定位故障来源；
/// - **契约 (What)**：每个变体携带可读上下文（目的地、消息 ID 等），
///   [`OverlayError::code`] 返回稳定错误码；
/// - **传播策略 (How)**：`RouteNotFound` 在请求路径上以 `Reject` 决策呈现，
///   `SendFailure` 表示一次已选定下一跳的转发失败——引擎**不会**在同一次
///   尝试内自动切换到其他等优先级路由。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum OverlayError {
    /// 地址令牌未通过校验。
    #[error("invalid network address `{token}`: {detail}")]
    InvalidAddress {
        /// 原始令牌。
        token: String,
        /// 拒绝原因。
        detail: &'static str,
    },

    /// 路由表中没有该目的地的条目。
    #[error("no route entry for destination `{destination}`")]
    RouteNotFound {
        /// 查询失败的目的地。
        destination: NetworkAddress,
    },

    /// 调用方在配置的时间窗内没有等到应答。
    #[error("request `{id}` timed out after {elapsed_ms} ms")]
    RequestTimeout {
        /// 超时请求的消息 ID。
        id: MessageId,
        /// 已经过的毫秒数（即调用方配置的窗口）。
        elapsed_ms: u64,
    },

    /// 应答在本节点没有匹配的待决关联，且节点未开启未知应答转发。
    #[error("response for request `{request_id}` has no pending correlation at this node")]
    UnknownResponse {
        /// 应答关联的请求 ID。
        request_id: MessageId,
    },

    /// 向选定下一跳提交帧失败。
    #[error("failed to hand off frame to next hop `{next_hop}`: {detail}")]
    SendFailure {
        /// 提交失败的下一跳。
        next_hop: NetworkAddress,
        /// 底层传输给出的失败描述。
        detail: String,
    },

    /// 没有指向目标的已挂载链路。
    #[error("no attached link toward `{target}`")]
    LinkNotAttached {
        /// 目标描述（邻居地址或连接标识）。
        target: String,
    },

    /// 消息 ID 与已有待决关联冲突。
    #[error("message id `{id}` already has a pending correlation")]
    CorrelationConflict {
        /// 冲突的消息 ID。
        id: MessageId,
    },

    /// 未细分的内部异常，兜底避免 panic。
    #[error("internal overlay failure: {detail}")]
    Internal {
        /// 排障信息。
        detail: String,
    },
}

impl OverlayError {
    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            OverlayError::InvalidAddress { .. } => codes::ADDRESS_INVALID,
            OverlayError::RouteNotFound { .. } => codes::ROUTE_NOT_FOUND,
            OverlayError::RequestTimeout { .. } => codes::REQUEST_TIMEOUT,
            OverlayError::UnknownResponse { .. } => codes::RESPONSE_UNKNOWN,
            OverlayError::SendFailure { .. } => codes::SEND_FAILURE,
            OverlayError::LinkNotAttached { .. } => codes::LINK_MISSING,
            OverlayError::CorrelationConflict { .. } => codes::CORRELATION_CONFLICT,
            OverlayError::Internal { .. } => codes::INTERNAL,
        }
    }
}
