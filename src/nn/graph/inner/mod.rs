/*
 * @Author       : 老董
 * @Date         : 2026-02-15
 * @Description  : GraphInner 计算图的底层实现
 *
 * 各 impl 块分散在子模块中：
 * - core.rs: 基础操作 + forward
 * - node_builders.rs: new_*_node
 */

mod core;
mod node_builders;

use crate::nn::NodeId;
use crate::nn::nodes::NodeHandle;
use rand::rngs::StdRng;
use std::collections::HashMap;

/// 图的完整定义（核心实现）
///
/// 这是计算图的核心实现。用户通常通过 `Graph` 句柄使用此结构，
/// 单元（cell）等构图代码通过 `graph.inner_mut()` 访问底层操作。
pub struct GraphInner {
    pub(in crate::nn::graph) name: String,
    pub(in crate::nn::graph) nodes: HashMap<NodeId, NodeHandle>,
    /// 正向边：parent_id -> child_ids（父节点指向子节点）
    pub(in crate::nn::graph) forward_edges: HashMap<NodeId, Vec<NodeId>>,
    /// 反向边：child_id -> parent_ids（子节点指向父节点）
    pub(in crate::nn::graph) backward_edges: HashMap<NodeId, Vec<NodeId>>,
    /// 最后一次前向传播的 id（同一次传播内用于去重）
    pub(in crate::nn::graph) last_forward_pass_id: u64,
    pub(in crate::nn::graph) next_id: u64,
    /// 图级别的随机数生成器（用于参数初始化等）
    /// None 表示使用默认的 thread_rng（非确定性）
    pub(in crate::nn::graph) rng: Option<StdRng>,
}

impl Default for GraphInner {
    fn default() -> Self {
        Self::new()
    }
}
