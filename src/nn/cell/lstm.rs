/*
 * @Author       : 老董
 * @Date         : 2026-02-20
 * @Description  : LSTM cell - 构图一次、按步执行
 *
 * 公式:
 *   i_t = σ(x_t @ W_ii + h_{t-1} @ W_hi + b_i)    # 输入门
 *   f_t = σ(x_t @ W_if + h_{t-1} @ W_hf + b_f)    # 遗忘门
 *   g_t = tanh(x_t @ W_ig + h_{t-1} @ W_hg + b_g) # 候选细胞
 *   o_t = σ(x_t @ W_io + h_{t-1} @ W_ho + b_o)    # 输出门
 *   c_t = f_t ⊙ c_{t-1} + i_t ⊙ g_t               # 细胞状态
 *   h_t = o_t ⊙ tanh(c_t)                         # 隐藏状态
 *
 * 状态是 Seq[h, c] 两个 [batch, hidden_size] 张量，输出等于新的 h_t。
 * 遗忘门偏置初始化为 1（有助于训练初期记住信息）。
 */

use super::RnnCell;
use crate::nn::graph::Graph;
use crate::nn::structure::{NestedStructure, StateShape};
use crate::nn::{GraphError, NodeId};
use crate::tensor::Tensor;

/// LSTM 单元
pub struct LstmCell {
    /// 输入节点 `x_t`: [batch, `input_size`]
    input: NodeId,
    /// 上一时间步隐藏状态 (State 节点)
    h_prev: NodeId,
    /// 上一时间步细胞状态 (State 节点)
    c_prev: NodeId,
    /// 隐藏状态输出节点 `h_t`
    h_new: NodeId,
    /// 细胞状态输出节点 `c_t`
    c_new: NodeId,
    // === 输入门参数 ===
    pub w_ii: NodeId,
    pub w_hi: NodeId,
    pub b_i: NodeId,
    // === 遗忘门参数 ===
    pub w_if: NodeId,
    pub w_hf: NodeId,
    pub b_f: NodeId,
    // === 候选细胞参数 ===
    pub w_ig: NodeId,
    pub w_hg: NodeId,
    pub b_g: NodeId,
    // === 输出门参数 ===
    pub w_io: NodeId,
    pub w_ho: NodeId,
    pub b_o: NodeId,
    graph: Graph,
    hidden_size: usize,
}

impl LstmCell {
    /// 创建 LSTM 单元并在图中搭建门结构
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
        let prefix = name.unwrap_or("lstm");
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
        let c_prev = g.new_state_node(
            &[batch_size, hidden_size],
            Some(&format!("{prefix}_c_prev")),
        )?;

        // === 输入门参数 ===
        let w_ii =
            g.new_parameter_node(&[input_size, hidden_size], Some(&format!("{prefix}_W_ii")))?;
        let w_hi =
            g.new_parameter_node(&[hidden_size, hidden_size], Some(&format!("{prefix}_W_hi")))?;
        let b_i = g.new_parameter_node(&[1, hidden_size], Some(&format!("{prefix}_b_i")))?;
        g.set_node_value(b_i, Some(&Tensor::zeros(&[1, hidden_size])))?;

        // === 遗忘门参数 ===
        let w_if =
            g.new_parameter_node(&[input_size, hidden_size], Some(&format!("{prefix}_W_if")))?;
        let w_hf =
            g.new_parameter_node(&[hidden_size, hidden_size], Some(&format!("{prefix}_W_hf")))?;
        let b_f = g.new_parameter_node(&[1, hidden_size], Some(&format!("{prefix}_b_f")))?;
        // 遗忘门偏置初始化为 1
        g.set_node_value(b_f, Some(&Tensor::ones(&[1, hidden_size])))?;

        // === 候选细胞参数 ===
        let w_ig =
            g.new_parameter_node(&[input_size, hidden_size], Some(&format!("{prefix}_W_ig")))?;
        let w_hg =
            g.new_parameter_node(&[hidden_size, hidden_size], Some(&format!("{prefix}_W_hg")))?;
        let b_g = g.new_parameter_node(&[1, hidden_size], Some(&format!("{prefix}_b_g")))?;
        g.set_node_value(b_g, Some(&Tensor::zeros(&[1, hidden_size])))?;

        // === 输出门参数 ===
        let w_io =
            g.new_parameter_node(&[input_size, hidden_size], Some(&format!("{prefix}_W_io")))?;
        let w_ho =
            g.new_parameter_node(&[hidden_size, hidden_size], Some(&format!("{prefix}_W_ho")))?;
        let b_o = g.new_parameter_node(&[1, hidden_size], Some(&format!("{prefix}_b_o")))?;
        g.set_node_value(b_o, Some(&Tensor::zeros(&[1, hidden_size])))?;

        // === 输入门: i_t = σ(x @ W_ii + h_prev @ W_hi + b_i) ===
        let x_i = g.new_mat_mul_node(input, w_ii, Some(&format!("{prefix}_x_i")))?;
        let h_i = g.new_mat_mul_node(h_prev, w_hi, Some(&format!("{prefix}_h_i")))?;
        let pre_i = g.new_add_node(&[x_i, h_i, b_i], Some(&format!("{prefix}_pre_i")))?;
        let i_gate = g.new_sigmoid_node(pre_i, Some(&format!("{prefix}_i_gate")))?;

        // === 遗忘门: f_t = σ(x @ W_if + h_prev @ W_hf + b_f) ===
        let x_f = g.new_mat_mul_node(input, w_if, Some(&format!("{prefix}_x_f")))?;
        let h_f = g.new_mat_mul_node(h_prev, w_hf, Some(&format!("{prefix}_h_f")))?;
        let pre_f = g.new_add_node(&[x_f, h_f, b_f], Some(&format!("{prefix}_pre_f")))?;
        let f_gate = g.new_sigmoid_node(pre_f, Some(&format!("{prefix}_f_gate")))?;

        // === 候选细胞: g_t = tanh(x @ W_ig + h_prev @ W_hg + b_g) ===
        let x_g = g.new_mat_mul_node(input, w_ig, Some(&format!("{prefix}_x_g")))?;
        let h_g = g.new_mat_mul_node(h_prev, w_hg, Some(&format!("{prefix}_h_g")))?;
        let pre_g = g.new_add_node(&[x_g, h_g, b_g], Some(&format!("{prefix}_pre_g")))?;
        let g_gate = g.new_tanh_node(pre_g, Some(&format!("{prefix}_g_gate")))?;

        // === 输出门: o_t = σ(x @ W_io + h_prev @ W_ho + b_o) ===
        let x_o = g.new_mat_mul_node(input, w_io, Some(&format!("{prefix}_x_o")))?;
        let h_o = g.new_mat_mul_node(h_prev, w_ho, Some(&format!("{prefix}_h_o")))?;
        let pre_o = g.new_add_node(&[x_o, h_o, b_o], Some(&format!("{prefix}_pre_o")))?;
        let o_gate = g.new_sigmoid_node(pre_o, Some(&format!("{prefix}_o_gate")))?;

        // === 细胞状态更新: c_t = f ⊙ c_prev + i ⊙ g ===
        let f_c = g.new_multiply_node(f_gate, c_prev, Some(&format!("{prefix}_f_c")))?;
        let i_g = g.new_multiply_node(i_gate, g_gate, Some(&format!("{prefix}_i_g")))?;
        let c_new = g.new_add_node(&[f_c, i_g], Some(&format!("{prefix}_c")))?;

        // === 隐藏状态更新: h_t = o ⊙ tanh(c_t) ===
        let tanh_c = g.new_tanh_node(c_new, Some(&format!("{prefix}_tanh_c")))?;
        let h_new = g.new_multiply_node(o_gate, tanh_c, Some(&format!("{prefix}_h")))?;

        drop(g);

        Ok(Self {
            input,
            h_prev,
            c_prev,
            h_new,
            c_new,
            w_ii,
            w_hi,
            b_i,
            w_if,
            w_hf,
            b_f,
            w_ig,
            w_hg,
            b_g,
            w_io,
            w_ho,
            b_o,
            graph: graph.clone(),
            hidden_size,
        })
    }

    /// 获取输入节点
    pub fn input_node(&self) -> NodeId {
        self.input
    }

    /// 获取隐藏状态（h_prev）节点
    pub fn hidden_state_node(&self) -> NodeId {
        self.h_prev
    }

    /// 获取细胞状态（c_prev）节点
    pub fn cell_state_node(&self) -> NodeId {
        self.c_prev
    }

    /// 获取输出（h_t）节点
    pub fn output_node(&self) -> NodeId {
        self.h_new
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }
}

impl RnnCell for LstmCell {
    fn call(
        &self,
        inputs: &NestedStructure,
        states: &NestedStructure,
    ) -> Result<(NestedStructure, NestedStructure), GraphError> {
        let x = inputs.as_leaf()?;
        let (h, c) = match states {
            NestedStructure::Seq(pair) if pair.len() == 2 => {
                (pair[0].as_leaf()?, pair[1].as_leaf()?)
            }
            _ => {
                return Err(GraphError::StructureMismatch {
                    path: "<root>".to_string(),
                    message: "LSTM状态必须是Seq[h, c]两个张量".to_string(),
                });
            }
        };

        self.graph.set_node_value(self.input, Some(x))?;
        self.graph.set_node_value(self.h_prev, Some(h))?;
        self.graph.set_node_value(self.c_prev, Some(c))?;
        // h_t 依赖 c_t，一次前向传播即可同时算出两者
        self.graph.forward(self.h_new)?;

        let h_new = self.graph.get_node_value(self.h_new)?.ok_or_else(|| {
            GraphError::ComputationError("LSTM前向传播后隐藏状态节点没有值".to_string())
        })?;
        let c_new = self.graph.get_node_value(self.c_new)?.ok_or_else(|| {
            GraphError::ComputationError("LSTM前向传播后细胞状态节点没有值".to_string())
        })?;

        Ok((
            NestedStructure::leaf(h_new.clone()),
            NestedStructure::seq(vec![
                NestedStructure::leaf(h_new),
                NestedStructure::leaf(c_new),
            ]),
        ))
    }

    fn state_shape(&self) -> Result<StateShape, GraphError> {
        Ok(StateShape::seq(vec![
            StateShape::leaf(&[self.hidden_size]),
            StateShape::leaf(&[self.hidden_size]),
        ]))
    }
}
