//! 节点配置：地址、别名、拒绝策略与默认超时。
//!
//! 构造后不可变（运行时可变的开关只有“未知应答转发”，见
//! [`crate::OverlayNode::set_forward_unknown_responses`]）。

use std::time::Duration;

use overlay_core::NetworkAddress;

/// 路由缺失时的表达方式。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RejectPolicy {
    /// 默认：以 `Reject` 让上游观察到“无路由”。
    #[default]
    Surface,
    /// 静默丢弃；仅在运维显式要求时启用。
    DropSilently,
}

/// 单个覆盖网络节点的静态配置。
///
/// # 教案式注释
/// - **意图 (Why)**：把散落的开关收拢为一个 Builder 风格的值对象，
///   组合根只接受整体配置，避免构造后再塞参数的半初始化状态；
/// - **契约 (What)**：`address` 必填；其余项都有保守默认值
///   （无别名、`Surface`、不转发未知应答、30 秒调用超时）。
#[derive(Clone, Debug)]
pub struct NodeConfig {
    address: NetworkAddress,
    served_aliases: Vec<NetworkAddress>,
    reject_policy: RejectPolicy,
    forward_unknown_responses: bool,
    call_timeout: Duration,
}

impl NodeConfig {
    /// 默认的调用方超时窗口。
    pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

    /// 以节点地址构造默认配置。
    pub fn new(address: NetworkAddress) -> Self {
        Self {
            address,
            served_aliases: Vec::new(),
            reject_policy: RejectPolicy::default(),
            forward_unknown_responses: false,
            call_timeout: Self::DEFAULT_CALL_TIMEOUT,
        }
    }

    /// 追加一个由本节点消费的符号别名（如中央系统别名）。
    #[must_use]
    pub fn with_served_alias(mut self, alias: NetworkAddress) -> Self {
        if !self.served_aliases.contains(&alias) {
            self.served_aliases.push(alias);
        }
        self
    }

    /// 设置路由缺失时的表达方式。
    #[must_use]
    pub fn with_reject_policy(mut self, policy: RejectPolicy) -> Self {
        self.reject_policy = policy;
        self
    }

    /// 设置“未知应答转发”开关的初始值。
    #[must_use]
    pub fn with_forward_unknown_responses(mut self, forward: bool) -> Self {
        self.forward_unknown_responses = forward;
        self
    }

    /// 设置调用方默认超时窗口。
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn address(&self) -> &NetworkAddress {
        &self.address
    }

    pub fn served_aliases(&self) -> &[NetworkAddress] {
        &self.served_aliases
    }

    pub fn reject_policy(&self) -> RejectPolicy {
        self.reject_policy
    }

    pub fn forward_unknown_responses(&self) -> bool {
        self.forward_unknown_responses
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }
}
