//! 进程内链路：mpsc 发送端加对端元数据。

use tokio::sync::mpsc;

use overlay_core::{ConnectionId, NeighborLink, NetworkAddress, OverlayError, WireFrame};

/// 基于无界通道的邻居链路。
///
/// `submit` 即一次非阻塞的通道发送；对端泵任务退出（通道关闭）后，
/// 提交以 [`OverlayError::SendFailure`] 失败。
#[derive(Debug)]
pub struct MemLink {
    connection: ConnectionId,
    peer: NetworkAddress,
    sender: mpsc::UnboundedSender<WireFrame>,
}

impl MemLink {
    pub(crate) fn new(
        connection: ConnectionId,
        peer: NetworkAddress,
        sender: mpsc::UnboundedSender<WireFrame>,
    ) -> Self {
        Self {
            connection,
            peer,
            sender,
        }
    }
}

impl NeighborLink for MemLink {
    fn connection_id(&self) -> &ConnectionId {
        &self.connection
    }

    fn peer(&self) -> &NetworkAddress {
        &self.peer
    }

    fn submit(&self, frame: WireFrame) -> Result<(), OverlayError> {
        self.sender
            .send(frame)
            .map_err(|_| OverlayError::SendFailure {
                next_hop: self.peer.clone(),
                detail: "in-memory channel closed".to_owned(),
            })
    }
}
