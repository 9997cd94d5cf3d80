/*
 * @Author       : 老董
 * @Date         : 2026-02-15
 * @Description  : 计算图节点：NodeId、NodeHandle 与底层 raw_node 的封装。
 *                 本库只做前向（解码）计算，节点不携带梯度。
 */

pub(in crate::nn) mod raw_node;

use crate::nn::GraphError;
use crate::tensor::Tensor;
use raw_node::{NodeType, TraitNode};
use std::fmt;

/// 节点的唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 节点句柄：包装底层 raw_node，并记录前向传播标记
#[derive(Clone)]
pub struct NodeHandle {
    raw_node: NodeType,
    last_forward_pass_id: u64,
}

impl NodeHandle {
    fn new<T: Into<NodeType>>(raw_node: T) -> Self {
        Self {
            raw_node: raw_node.into(),
            last_forward_pass_id: 0,
        }
    }

    // ========== 构造：叶子节点 ==========

    pub(in crate::nn) fn new_input(shape: &[usize]) -> Result<Self, GraphError> {
        Ok(Self::new(raw_node::Input::new(shape)?))
    }

    pub(in crate::nn) fn new_parameter(shape: &[usize]) -> Result<Self, GraphError> {
        Ok(Self::new(raw_node::Parameter::new(shape)?))
    }

    pub(in crate::nn) fn new_parameter_seeded(shape: &[usize], seed: u64) -> Result<Self, GraphError> {
        Ok(Self::new(raw_node::Parameter::new_seeded(shape, seed)?))
    }

    pub(in crate::nn) fn new_state(shape: &[usize]) -> Result<Self, GraphError> {
        Ok(Self::new(raw_node::State::new(shape)?))
    }

    // ========== 构造：算子节点 ==========

    pub(in crate::nn) fn new_add(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        Ok(Self::new(raw_node::Add::new(parents)?))
    }

    pub(in crate::nn) fn new_subtract(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        Ok(Self::new(raw_node::Subtract::new(parents)?))
    }

    pub(in crate::nn) fn new_mat_mul(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        Ok(Self::new(raw_node::MatMul::new(parents)?))
    }

    pub(in crate::nn) fn new_multiply(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        Ok(Self::new(raw_node::Multiply::new(parents)?))
    }

    pub(in crate::nn) fn new_sigmoid(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        Ok(Self::new(raw_node::Sigmoid::new(parents)?))
    }

    pub(in crate::nn) fn new_tanh(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        Ok(Self::new(raw_node::Tanh::new(parents)?))
    }

    // ========== 基础访问 ==========

    pub(in crate::nn) fn bind_id_and_name(&mut self, id: NodeId, name: &str) {
        self.raw_node.set_id(id);
        self.raw_node.set_name(name);
    }

    pub fn id(&self) -> NodeId {
        self.raw_node.id()
    }

    pub fn name(&self) -> &str {
        self.raw_node.name()
    }

    pub(in crate::nn) fn node_type(&self) -> &NodeType {
        &self.raw_node
    }

    pub fn value(&self) -> Option<&Tensor> {
        self.raw_node.value()
    }

    pub fn has_value(&self) -> bool {
        self.raw_node.value().is_some()
    }

    pub fn set_value(&mut self, value: Option<&Tensor>) -> Result<(), GraphError> {
        self.raw_node.set_value(value)
    }

    pub(in crate::nn) fn set_value_unchecked(&mut self, value: Option<&Tensor>) {
        self.raw_node.set_value_unchecked(value);
    }

    pub(in crate::nn) fn clear_value(&mut self) -> Result<(), GraphError> {
        self.raw_node.clear_value()
    }

    /// 节点值应有的形状（由构图期推断）
    pub fn value_expected_shape(&self) -> &[usize] {
        self.raw_node.value_expected_shape()
    }

    pub(in crate::nn) fn calc_value_by_parents(
        &mut self,
        parents: &[NodeHandle],
    ) -> Result<(), GraphError> {
        self.raw_node.calc_value_by_parents(parents)
    }

    pub(in crate::nn) fn last_forward_pass_id(&self) -> u64 {
        self.last_forward_pass_id
    }

    pub(in crate::nn) fn set_last_forward_pass_id(&mut self, id: u64) {
        self.last_forward_pass_id = id;
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw_node.display_node())
    }
}
