//! 请求过滤器：按动作标签复核转发决策的扩展点。
//!
//! 中间节点用它检查/放行/否决特定动作的请求。过滤器按注册顺序同步执行，
//! 每个匹配的过滤器都可以原样放行或改写决策；没有任何过滤器匹配时，
//! 路由表给出的默认决策生效。

use std::sync::Arc;

use crate::decision::ForwardingDecision;
use crate::message::RequestEnvelope;

/// 过滤器的适用范围。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterScope {
    /// 复核所有动作。
    AllActions,
    /// 仅复核指定动作标签。
    Action(Arc<str>),
}

impl FilterScope {
    /// 构造仅匹配单个动作的范围。
    pub fn action(action: impl AsRef<str>) -> Self {
        Self::Action(Arc::from(action.as_ref()))
    }

    /// 该范围是否覆盖给定动作。
    pub fn matches(&self, action: &str) -> bool {
        match self {
            FilterScope::AllActions => true,
            FilterScope::Action(scoped) => scoped.as_ref() == action,
        }
    }
}

/// 在决策定稿前复核（并可改写）一次转发决策。
pub trait RequestFilter: Send + Sync {
    /// 过滤器名字，用于否决原因与日志。
    fn name(&self) -> &str;

    /// 复核决策；返回值即新的决策。
    fn review(
        &self,
        envelope: &RequestEnvelope,
        proposed: ForwardingDecision,
    ) -> ForwardingDecision;
}
