//! 链路注册表：节点当前挂载的全部邻居连接。
//!
//! 按 [`ConnectionId`] 索引；路由选出的下一跳是节点地址，
//! [`LinkRegistry::link_to`] 负责把地址解析为指向该邻居的链路。

use std::sync::Arc;

use dashmap::DashMap;

use overlay_core::{ConnectionId, NeighborLink, NetworkAddress};

/// 并发安全的链路集合。
#[derive(Debug, Default)]
pub struct LinkRegistry {
    links: DashMap<ConnectionId, Arc<dyn NeighborLink>>,
}

impl LinkRegistry {
    /// 构造空注册表。
    pub fn new() -> Self {
        Self::default()
    }

    /// 挂载一条链路；同一连接标识重复挂载时覆盖旧链路。
    pub fn attach(&self, link: Arc<dyn NeighborLink>) {
        self.links.insert(link.connection_id().clone(), link);
    }

    /// 卸载一条链路并返回它；不存在时为空操作。
    pub fn detach(&self, connection: &ConnectionId) -> Option<Arc<dyn NeighborLink>> {
        self.links.remove(connection).map(|(_, link)| link)
    }

    /// 按连接标识取链路。
    pub fn get(&self, connection: &ConnectionId) -> Option<Arc<dyn NeighborLink>> {
        self.links.get(connection).map(|entry| Arc::clone(entry.value()))
    }

    /// 按对端地址解析链路（多条命中时取任意一条）。
    pub fn link_to(&self, peer: &NetworkAddress) -> Option<Arc<dyn NeighborLink>> {
        self.links
            .iter()
            .find(|entry| entry.value().peer() == peer)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// 当前挂载的链路数。
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// 是否没有任何链路。
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
