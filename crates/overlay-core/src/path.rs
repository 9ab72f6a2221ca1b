//! # path 模块说明
//!
//! ## 角色定位（Why）
//! - 记录一条消息在覆盖网络中物理经过的节点序列，供接收方还原直接上游、
//!   供转发引擎做环路防护、供观察者重建完整转发轨迹。
//!
//! ## 不变量（What）
//! - **只追加**：转发过程中路径永不原地修改，每一跳通过 [`NetworkPath::append`]
//!   产生“旧路径 + 自身地址”的新值；
//! - **传输序**：元素顺序与消息实际穿越节点的顺序一致；
//! - **末元素即上游**：接收节点观察到的直接来源是路径的最后一个元素；
//! - **仅记录中转**：目的节点消费消息时不把自己追加进路径。
//!
//! ## 实现策略（How）
//! - 底层为 `Arc<[NetworkAddress]>`，追加时克隆为新切片；历史快照继续被旧
//!   信封共享，与热交换管线的整体快照替换是同一套思路。

use core::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::address::NetworkAddress;

/// 消息穿越节点的有序记录。
///
/// 语义见模块文档；值语义克隆廉价（仅引用计数）。
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<NetworkAddress>", into = "Vec<NetworkAddress>")]
pub struct NetworkPath {
    hops: Arc<[NetworkAddress]>,
}

impl NetworkPath {
    /// 构造空路径（消息在起源节点尚未发出时的状态）。
    pub fn empty() -> Self {
        Self { hops: Arc::from([]) }
    }

    /// 返回“本路径 + `hop`”的新路径，原路径保持不变。
    #[must_use]
    pub fn append(&self, hop: NetworkAddress) -> Self {
        let mut hops = Vec::with_capacity(self.hops.len() + 1);
        hops.extend_from_slice(&self.hops);
        hops.push(hop);
        Self { hops: hops.into() }
    }

    /// 消息的起源节点（路径第一个元素）。
    pub fn origin(&self) -> Option<&NetworkAddress> {
        self.hops.first()
    }

    /// 直接上游（路径最后一个元素）。
    pub fn last(&self) -> Option<&NetworkAddress> {
        self.hops.last()
    }

    /// 路径是否已包含给定地址。
    pub fn contains(&self, address: &NetworkAddress) -> bool {
        self.hops.contains(address)
    }

    /// 已记录的中转跳数。
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    /// 是否为空路径。
    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// 以切片视图访问全部跳点。
    pub fn hops(&self) -> &[NetworkAddress] {
        &self.hops
    }

    /// 迭代全部跳点。
    pub fn iter(&self) -> core::slice::Iter<'_, NetworkAddress> {
        self.hops.iter()
    }
}

impl Default for NetworkPath {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<NetworkAddress>> for NetworkPath {
    fn from(hops: Vec<NetworkAddress>) -> Self {
        Self { hops: hops.into() }
    }
}

impl From<NetworkPath> for Vec<NetworkAddress> {
    fn from(path: NetworkPath) -> Self {
        path.hops.to_vec()
    }
}

impl fmt::Display for NetworkPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for hop in self.hops.iter() {
            if !first {
                f.write_str(" -> ")?;
            }
            first = false;
            f.write_str(hop.as_str())?;
        }
        Ok(())
    }
}
