//! # routing 模块说明
//!
//! ## 角色定位（Why）
//! - 回答“我无法直接服务的目的地，应当交给哪个邻居”；
//! - 路由是**静态**的：条目由运维显式声明，没有动态发现；
//! - 路由是**非对称**的：每个节点只咨询自己的表，不同节点对同一目的地
//!   可以有不同看法，同一节点的两个方向也各自独立配置。
//!
//! ## 行为契约（What）
//! - [`RoutingTable::upsert`]：以 `(destination, next_hop)` 为键的幂等增改，
//!   重复写入只覆盖 priority/weight，不产生重复条目，也不报错；
//! - [`RoutingTable::remove`]：删除单条或整个目的地的全部条目；目标不存在
//!   时为空操作；
//! - [`RoutingTable::select_next_hop`]：
//!   1. 收集目的地的全部条目，为空则返回 `None`；
//!   2. 取最小 priority（数值越小越优先）；
//!   3. 候选集收窄到该优先级；
//!   4. 唯一候选直接返回；
//!   5. 平局时按 weight 做累积权重轮盘抽签；总权重为零退化为均匀抽签。
//!
//! ## 并发模型（How）
//! - 读路径：`arc-swap` 整表快照，`select_next_hop` 观察到的永远是更新前
//!   或更新后的完整状态，不存在撕裂读；
//! - 写路径：`parking_lot::Mutex` 串行化写者，克隆-修改-交换整张表；
//!   运维驱动的低频写可以承受整表克隆的成本。
//!
//! ## 风险与考量（Trade-offs）
//! - 轮盘抽签选择 O(n) 线性扫描：候选集是单个目的地的等优先级条目，
//!   规模很小，不值得引入别名法；
//! - RNG 在 `Mutex` 后共享，抽签仅发生在平局路径上，锁竞争可以忽略。

use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::address::NetworkAddress;

/// 一条静态路由声明。
///
/// 由声明它的节点的路由表独占拥有；`priority` 数值越小越优先，
/// `weight` 在同优先级平局时按比例分摊流量。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingEntry {
    destination: NetworkAddress,
    next_hop: NetworkAddress,
    priority: i32,
    weight: u32,
}

impl RoutingEntry {
    /// 默认权重：单条目场景下权重不参与决策。
    pub const DEFAULT_WEIGHT: u32 = 1;

    /// 构造新的路由条目。
    pub fn new(
        destination: NetworkAddress,
        next_hop: NetworkAddress,
        priority: i32,
        weight: u32,
    ) -> Self {
        Self {
            destination,
            next_hop,
            priority,
            weight,
        }
    }

    /// 以默认权重构造路由条目。
    pub fn with_priority(
        destination: NetworkAddress,
        next_hop: NetworkAddress,
        priority: i32,
    ) -> Self {
        Self::new(destination, next_hop, priority, Self::DEFAULT_WEIGHT)
    }

    pub fn destination(&self) -> &NetworkAddress {
        &self.destination
    }

    pub fn next_hop(&self) -> &NetworkAddress {
        &self.next_hop
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }
}

/// 单个目的地名下的候选下一跳。
#[derive(Clone, Debug, PartialEq, Eq)]
struct HopCandidate {
    next_hop: NetworkAddress,
    priority: i32,
    weight: u32,
}

type RouteMap = HashMap<NetworkAddress, Vec<HopCandidate>>;

/// 每节点一份的静态路由表。
///
/// 并发语义见模块文档；实例之间互不共享任何状态。
pub struct RoutingTable {
    snapshot: ArcSwap<RouteMap>,
    writer: Mutex<()>,
    rng: Mutex<SmallRng>,
}

impl RoutingTable {
    /// 构造空表，RNG 从熵池播种。
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    /// 构造空表并以固定种子播种 RNG，使平局抽签完全可复现。
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(RouteMap::new()),
            writer: Mutex::new(()),
            rng: Mutex::new(rng),
        }
    }

    /// 幂等增改一条路由。
    ///
    /// # 契约说明
    /// - **键**：`(destination, next_hop)`；键已存在时仅覆盖 priority/weight；
    /// - **后置条件**：读者要么看到旧表要么看到新表，绝不会看到中间状态。
    pub fn upsert(&self, entry: RoutingEntry) {
        let _writer = self.writer.lock();
        let mut map = RouteMap::clone(&self.snapshot.load_full());
        let candidates = map.entry(entry.destination.clone()).or_default();
        let candidate = HopCandidate {
            next_hop: entry.next_hop,
            priority: entry.priority,
            weight: entry.weight,
        };
        match candidates
            .iter_mut()
            .find(|existing| existing.next_hop == candidate.next_hop)
        {
            Some(existing) => *existing = candidate,
            None => candidates.push(candidate),
        }
        self.snapshot.store(Arc::new(map));
    }

    /// 删除一条路由（`next_hop` 给定时），或目的地名下全部路由（省略时）。
    /// 目标不存在时为空操作。
    pub fn remove(&self, destination: &NetworkAddress, next_hop: Option<&NetworkAddress>) {
        let _writer = self.writer.lock();
        let mut map = RouteMap::clone(&self.snapshot.load_full());
        match next_hop {
            None => {
                if map.remove(destination).is_none() {
                    return;
                }
            }
            Some(next_hop) => {
                let Some(candidates) = map.get_mut(destination) else {
                    return;
                };
                let before = candidates.len();
                candidates.retain(|candidate| &candidate.next_hop != next_hop);
                if candidates.len() == before {
                    return;
                }
                if candidates.is_empty() {
                    map.remove(destination);
                }
            }
        }
        self.snapshot.store(Arc::new(map));
    }

    /// 为目的地选出下一跳；无条目时返回 `None`。
    ///
    /// 选择算法见模块文档。同一最小优先级只有一个候选时结果是确定的；
    /// 平局时按权重抽签，单次调用绝不会返回平局集合以外的下一跳。
    pub fn select_next_hop(&self, destination: &NetworkAddress) -> Option<NetworkAddress> {
        let snapshot = self.snapshot.load_full();
        let candidates = snapshot.get(destination)?;
        let min_priority = candidates.iter().map(|c| c.priority).min()?;
        let tied: Vec<&HopCandidate> = candidates
            .iter()
            .filter(|c| c.priority == min_priority)
            .collect();
        match tied.as_slice() {
            [] => None,
            [only] => Some(only.next_hop.clone()),
            _ => Some(self.pick_weighted(&tied)),
        }
    }

    /// 累积权重轮盘：抽取 `r ∈ [0, total)`，线性扣减各候选权重。
    fn pick_weighted(&self, tied: &[&HopCandidate]) -> NetworkAddress {
        let total: u64 = tied.iter().map(|c| u64::from(c.weight)).sum();
        let mut rng = self.rng.lock();
        if total == 0 {
            let index = rng.gen_range(0..tied.len());
            return tied[index].next_hop.clone();
        }
        let mut ticket = rng.gen_range(0..total);
        for candidate in tied {
            let weight = u64::from(candidate.weight);
            if ticket < weight {
                return candidate.next_hop.clone();
            }
            ticket -= weight;
        }
        // ticket 严格小于 total，循环必然命中；保底返回末位候选。
        tied[tied.len() - 1].next_hop.clone()
    }

    /// 目的地名下的全部条目（快照视图，顺序为插入顺序）。
    pub fn entries_for(&self, destination: &NetworkAddress) -> Vec<RoutingEntry> {
        let snapshot = self.snapshot.load_full();
        snapshot
            .get(destination)
            .map(|candidates| {
                candidates
                    .iter()
                    .map(|c| RoutingEntry {
                        destination: destination.clone(),
                        next_hop: c.next_hop.clone(),
                        priority: c.priority,
                        weight: c.weight,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 当前声明过条目的全部目的地。
    pub fn destinations(&self) -> Vec<NetworkAddress> {
        self.snapshot.load_full().keys().cloned().collect()
    }

    /// 条目总数（跨所有目的地）。
    pub fn route_count(&self) -> usize {
        self.snapshot
            .load_full()
            .values()
            .map(|candidates| candidates.len())
            .sum()
    }

    /// 是否为空表。
    pub fn is_empty(&self) -> bool {
        self.snapshot.load_full().is_empty()
    }

    /// 清空整张表。
    pub fn clear(&self) {
        let _writer = self.writer.lock();
        self.snapshot.store(Arc::new(RouteMap::new()));
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RoutingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingTable")
            .field("destinations", &self.snapshot.load_full().len())
            .field("routes", &self.route_count())
            .finish()
    }
}
