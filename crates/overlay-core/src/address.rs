//! # address 模块说明
//!
//! ## 角色定位（Why）
//! - 为覆盖网络中的每个节点（充电站、本地控制器、网关、中央系统）提供
//!   不可变、可比较、可哈希的全局唯一标识；
//! - 以 `Arc<str>` 为底座，克隆零拷贝，适合在信封、路径与路由表之间高频传递。
//!
//! ## 契约要点（What）
//! - 地址令牌在构造时一次性校验：非空、不超过 [`MAX_ADDRESS_LEN`]、仅含
//!   可见 ASCII 字符（不允许空白与控制字符）；
//! - 保留地址 `"csms"` 作为中央系统的符号别名，由配置了该别名的最顶层节点
//!   负责消费（见 `overlay-node` 的别名配置）。

use core::fmt;
use core::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::OverlayError;

/// 中央系统的保留别名令牌。
pub const CENTRAL_SYSTEM_ALIAS: &str = "csms";

/// 地址令牌的最大长度（字节）。
pub const MAX_ADDRESS_LEN: usize = 128;

/// 覆盖网络节点的全局唯一标识。
///
/// # 教案式注释
/// - **意图 (Why)**：统一节点寻址，路由表、路径与信封全部以该类型为键，
///   避免裸字符串在各层之间漂移；
/// - **契约 (What)**：构造必须经过 [`NetworkAddress::new`] 的令牌校验；
///   相等性、排序与哈希均基于令牌字节；
/// - **风险 (Trade-offs)**：以 `Arc<str>` 存储意味着比较是 O(len) 的字符串
///   比较而非指针比较，在本场景（小令牌、低频比较）可以接受。
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkAddress(Arc<str>);

impl NetworkAddress {
    /// 校验并构造新的网络地址。
    ///
    /// # 契约说明
    /// - **输入**：任意字符串令牌；
    /// - **前置条件**：令牌非空、长度不超过 [`MAX_ADDRESS_LEN`]、仅含可见
    ///   ASCII 字符；
    /// - **失败语义**：违反上述任一条件时返回
    ///   [`OverlayError::InvalidAddress`]，携带原始令牌与具体原因。
    pub fn new(token: impl AsRef<str>) -> Result<Self, OverlayError> {
        let token = token.as_ref();
        if token.is_empty() {
            return Err(OverlayError::InvalidAddress {
                token: token.to_owned(),
                detail: "address token must not be empty",
            });
        }
        if token.len() > MAX_ADDRESS_LEN {
            return Err(OverlayError::InvalidAddress {
                token: token.to_owned(),
                detail: "address token exceeds the maximum length",
            });
        }
        if !token.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(OverlayError::InvalidAddress {
                token: token.to_owned(),
                detail: "address token must consist of visible ASCII characters",
            });
        }
        Ok(Self(Arc::from(token)))
    }

    /// 中央系统的保留别名地址。
    pub fn central_system() -> Self {
        Self(Arc::from(CENTRAL_SYSTEM_ALIAS))
    }

    /// 是否为中央系统别名。
    pub fn is_central_system(&self) -> bool {
        self.0.as_ref() == CENTRAL_SYSTEM_ALIAS
    }

    /// 以 `&str` 视图访问令牌。
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NetworkAddress {
    type Err = OverlayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for NetworkAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
