/*
 * @Author       : 老董
 * @Date         : 2026-02-16
 * @Description  : Sigmoid 激活节点：σ(x) = 1 / (1 + exp(-x))
 */

use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;

#[derive(Clone)]
pub(in crate::nn) struct Sigmoid {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    shape: Vec<usize>,
}

impl Sigmoid {
    pub(in crate::nn) fn new(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        // 1. 验证父节点数量
        if parents.len() != 1 {
            return Err(GraphError::InvalidOperation(
                "Sigmoid节点需要正好1个父节点".to_string(),
            ));
        }

        // 2. 返回（输出形状与输入相同）
        Ok(Self {
            id: None,
            name: None,
            value: None,
            shape: parents[0].value_expected_shape().to_vec(),
        })
    }
}

impl TraitNode for Sigmoid {
    fn id(&self) -> NodeId {
        self.id.unwrap()
    }

    fn set_id(&mut self, id: NodeId) {
        self.id = Some(id);
    }

    fn name(&self) -> &str {
        self.name.as_ref().unwrap()
    }

    fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    fn type_name(&self) -> &'static str {
        "Sigmoid"
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(&mut self, parents: &[NodeHandle]) -> Result<(), GraphError> {
        let input = parents[0].value().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}的父节点{}没有值",
                self.display_node(),
                parents[0]
            ))
        })?;

        // 分段计算以保证数值稳定（避免大负数时 exp 溢出）
        self.value = Some(input.where_with_f32(
            |x| x >= 0.0,
            |x| 1.0 / (1.0 + (-x).exp()),
            |x| {
                let e = x.exp();
                e / (1.0 + e)
            },
        ));
        Ok(())
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    fn set_value(&mut self, _value: Option<&Tensor>) -> Result<(), GraphError> {
        Err(GraphError::InvalidOperation(format!(
            "{}是算子节点，其值只能由前向传播计算",
            self.display_node()
        )))
    }

    fn set_value_unchecked(&mut self, value: Option<&Tensor>) {
        self.value = value.cloned();
    }

    fn clear_value(&mut self) -> Result<(), GraphError> {
        self.value = None;
        Ok(())
    }
}
