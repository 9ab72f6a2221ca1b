//! # PendingStore：待决关联仓储
//!
//! ## 核心意图（Why）
//! - 应答不按目的地独立路由，而是严格沿请求的反向路径回传；为此每个节点
//!   必须记住“请求 ID → 它从哪条连接到达（或由本地哪个调用等待）”；
//! - 基于 `DashMap` 提供并发安全的注册/取出，注册先于向下一跳提交，
//!   与自身请求赛跑的应答不会丢失。
//!
//! ## 行为契约（What）
//! - [`PendingStore::register`]：原子注册；同一 ID 已在途时返回
//!   [`OverlayError::CorrelationConflict`]；
//! - [`PendingStore::take`]：原子取出并移除，保证应答恰好投递一次；
//! - [`PendingStore::discard`]：清除条目（超时、取消或提交失败的回滚），
//!   目标不存在时为空操作。

use core::fmt;

use dashmap::DashMap;
use tokio::sync::oneshot;

use overlay_core::{ConnectionId, MessageId, OverlayError, ResponseEnvelope};

/// 一条待决关联的去向。
pub enum PendingOrigin {
    /// 请求从这条邻居连接到达，应答原路返回。
    Link(ConnectionId),
    /// 请求由本节点发起，应答交给本地等待者。
    Local(oneshot::Sender<ResponseEnvelope>),
}

impl fmt::Debug for PendingOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingOrigin::Link(connection) => {
                f.debug_tuple("Link").field(connection).finish()
            }
            PendingOrigin::Local(_) => f.write_str("Local(..)"),
        }
    }
}

/// 请求 ID → 去向的并发关联表。
#[derive(Debug, Default)]
pub struct PendingStore {
    entries: DashMap<MessageId, PendingOrigin>,
}

impl PendingStore {
    /// 构造空仓储。
    pub fn new() -> Self {
        Self::default()
    }

    /// 原子注册一条关联。
    ///
    /// - **前置条件**：调用方尚未向下一跳提交该请求；
    /// - **失败语义**：同一 ID 已在途时返回
    ///   [`OverlayError::CorrelationConflict`]，原条目保持不变。
    pub fn register(&self, id: MessageId, origin: PendingOrigin) -> Result<(), OverlayError> {
        match self.entries.entry(id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(OverlayError::CorrelationConflict { id })
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(origin);
                Ok(())
            }
        }
    }

    /// 原子取出并移除一条关联；不存在时返回 `None`。
    pub fn take(&self, id: &MessageId) -> Option<PendingOrigin> {
        self.entries.remove(id).map(|(_, origin)| origin)
    }

    /// ID 是否在途。
    pub fn contains(&self, id: &MessageId) -> bool {
        self.entries.contains_key(id)
    }

    /// 清除一条关联（超时/取消/回滚路径）；返回是否确有条目被清除。
    pub fn discard(&self, id: &MessageId) -> bool {
        self.entries.remove(id).is_some()
    }

    /// 当前在途关联数。
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否没有任何在途关联。
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
