/*
 * @Author       : 老董
 * @Date         : 2026-02-20
 * @Description  : GRU（门控循环单元）cell - 构图一次、按步执行
 *
 * 公式:
 *   u_t = σ(x_t @ W_ux + h_{t-1} @ W_uh + b_u)        # 更新门
 *   r_t = σ(x_t @ W_rx + h_{t-1} @ W_rh + b_r)        # 重置门
 *   c_t = tanh(x_t @ W_cx + (r_t ⊙ h_{t-1}) @ W_ch + b_c)  # 候选状态
 *   h_t = u_t ⊙ h_{t-1} + (1 - u_t) ⊙ c_t            # 新隐藏状态
 *
 * 输入/输出形状：
 * - 输入：[batch_size, input_size]
 * - 状态/输出：[batch_size, hidden_size]（输出即新状态）
 */

use super::RnnCell;
use crate::nn::graph::Graph;
use crate::nn::structure::{NestedStructure, StateShape};
use crate::nn::{GraphError, NodeId};
use crate::tensor::Tensor;

/// GRU 单元
///
/// 状态是单个 `[batch, hidden_size]` 张量，输出等于新状态。
pub struct GruCell {
    /// 输入节点 `x_t`: [batch, `input_size`]
    input: NodeId,
    /// 上一时间步隐藏状态 (State 节点)
    h_prev: NodeId,
    /// 新隐藏状态输出节点 `h_t`: [batch, `hidden_size`]
    h_new: NodeId,
    // === 更新门参数 ===
    pub w_ux: NodeId,
    pub w_uh: NodeId,
    pub b_u: NodeId,
    // === 重置门参数 ===
    pub w_rx: NodeId,
    pub w_rh: NodeId,
    pub b_r: NodeId,
    // === 候选状态参数 ===
    pub w_cx: NodeId,
    pub w_ch: NodeId,
    pub b_c: NodeId,
    graph: Graph,
    hidden_size: usize,
}

impl GruCell {
    /// 创建 GRU 单元并在图中搭建门结构
    ///
    /// # 参数
    /// - `graph`: 计算图句柄
    /// - `input_size`: 输入特征维度
    /// - `hidden_size`: 隐藏状态维度
    /// - `batch_size`: 批大小（束搜索场景下传 batch*beam）
    /// - `name`: 可选的节点名称前缀
    pub fn new(
        graph: &Graph,
        input_size: usize,
        hidden_size: usize,
        batch_size: usize,
        name: Option<&str>,
    ) -> Result<Self, GraphError> {
        let prefix = name.unwrap_or("gru");
        let mut g = graph.inner_mut();

        // === 输入与状态节点 ===
        let input = g.new_input_node(
            &[batch_size, input_size],
            Some(&format!("{prefix}_x")),
        )?;
        let h_prev = g.new_state_node(
            &[batch_size, hidden_size],
            Some(&format!("{prefix}_h_prev")),
        )?;

        // === 更新门参数 ===
        let w_ux =
            g.new_parameter_node(&[input_size, hidden_size], Some(&format!("{prefix}_W_ux")))?;
        let w_uh =
            g.new_parameter_node(&[hidden_size, hidden_size], Some(&format!("{prefix}_W_uh")))?;
        let b_u = g.new_parameter_node(&[1, hidden_size], Some(&format!("{prefix}_b_u")))?;
        g.set_node_value(b_u, Some(&Tensor::zeros(&[1, hidden_size])))?;

        // === 重置门参数 ===
        let w_rx =
            g.new_parameter_node(&[input_size, hidden_size], Some(&format!("{prefix}_W_rx")))?;
        let w_rh =
            g.new_parameter_node(&[hidden_size, hidden_size], Some(&format!("{prefix}_W_rh")))?;
        let b_r = g.new_parameter_node(&[1, hidden_size], Some(&format!("{prefix}_b_r")))?;
        g.set_node_value(b_r, Some(&Tensor::zeros(&[1, hidden_size])))?;

        // === 候选状态参数 ===
        let w_cx =
            g.new_parameter_node(&[input_size, hidden_size], Some(&format!("{prefix}_W_cx")))?;
        let w_ch =
            g.new_parameter_node(&[hidden_size, hidden_size], Some(&format!("{prefix}_W_ch")))?;
        let b_c = g.new_parameter_node(&[1, hidden_size], Some(&format!("{prefix}_b_c")))?;
        g.set_node_value(b_c, Some(&Tensor::zeros(&[1, hidden_size])))?;

        // === ones 用于 (1 - u_t) ===
        let ones = g.new_input_node(
            &[batch_size, hidden_size],
            Some(&format!("{prefix}_ones")),
        )?;
        g.set_node_value(ones, Some(&Tensor::ones(&[batch_size, hidden_size])))?;

        // === 更新门: u_t = σ(x @ W_ux + h_prev @ W_uh + b_u) ===
        let x_u = g.new_mat_mul_node(input, w_ux, Some(&format!("{prefix}_x_u")))?;
        let h_u = g.new_mat_mul_node(h_prev, w_uh, Some(&format!("{prefix}_h_u")))?;
        let pre_u = g.new_add_node(&[x_u, h_u, b_u], Some(&format!("{prefix}_pre_u")))?;
        let u_gate = g.new_sigmoid_node(pre_u, Some(&format!("{prefix}_u_gate")))?;

        // === 重置门: r_t = σ(x @ W_rx + h_prev @ W_rh + b_r) ===
        let x_r = g.new_mat_mul_node(input, w_rx, Some(&format!("{prefix}_x_r")))?;
        let h_r = g.new_mat_mul_node(h_prev, w_rh, Some(&format!("{prefix}_h_r")))?;
        let pre_r = g.new_add_node(&[x_r, h_r, b_r], Some(&format!("{prefix}_pre_r")))?;
        let r_gate = g.new_sigmoid_node(pre_r, Some(&format!("{prefix}_r_gate")))?;

        // === 候选状态: c_t = tanh(x @ W_cx + (r ⊙ h_prev) @ W_ch + b_c) ===
        let r_h = g.new_multiply_node(r_gate, h_prev, Some(&format!("{prefix}_r_h")))?;
        let x_c = g.new_mat_mul_node(input, w_cx, Some(&format!("{prefix}_x_c")))?;
        let rh_c = g.new_mat_mul_node(r_h, w_ch, Some(&format!("{prefix}_rh_c")))?;
        let pre_c = g.new_add_node(&[x_c, rh_c, b_c], Some(&format!("{prefix}_pre_c")))?;
        let c_cand = g.new_tanh_node(pre_c, Some(&format!("{prefix}_c_cand")))?;

        // === 新隐藏状态: h_t = u ⊙ h_prev + (1 - u) ⊙ c ===
        let u_h = g.new_multiply_node(u_gate, h_prev, Some(&format!("{prefix}_u_h")))?;
        let one_minus_u =
            g.new_subtract_node(ones, u_gate, Some(&format!("{prefix}_one_minus_u")))?;
        let u_c = g.new_multiply_node(one_minus_u, c_cand, Some(&format!("{prefix}_u_c")))?;
        let h_new = g.new_add_node(&[u_h, u_c], Some(&format!("{prefix}_h")))?;

        drop(g);

        Ok(Self {
            input,
            h_prev,
            h_new,
            w_ux,
            w_uh,
            b_u,
            w_rx,
            w_rh,
            b_r,
            w_cx,
            w_ch,
            b_c,
            graph: graph.clone(),
            hidden_size,
        })
    }

    /// 获取输入节点
    pub fn input_node(&self) -> NodeId {
        self.input
    }

    /// 获取状态（h_prev）节点
    pub fn state_node(&self) -> NodeId {
        self.h_prev
    }

    /// 获取输出（h_t）节点
    pub fn output_node(&self) -> NodeId {
        self.h_new
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }
}

impl RnnCell for GruCell {
    fn call(
        &self,
        inputs: &NestedStructure,
        states: &NestedStructure,
    ) -> Result<(NestedStructure, NestedStructure), GraphError> {
        let x = inputs.as_leaf()?;
        let h = states.as_leaf()?;

        self.graph.set_node_value(self.input, Some(x))?;
        self.graph.set_node_value(self.h_prev, Some(h))?;
        self.graph.forward(self.h_new)?;

        let h_new = self.graph.get_node_value(self.h_new)?.ok_or_else(|| {
            GraphError::ComputationError("GRU前向传播后输出节点没有值".to_string())
        })?;

        // 输出即新状态
        Ok((
            NestedStructure::leaf(h_new.clone()),
            NestedStructure::leaf(h_new),
        ))
    }

    fn state_shape(&self) -> Result<StateShape, GraphError> {
        Ok(StateShape::leaf(&[self.hidden_size]))
    }
}
