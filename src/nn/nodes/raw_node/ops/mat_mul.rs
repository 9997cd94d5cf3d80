/*
 * @Author       : 老董
 * @Date         : 2026-02-16
 * @Description  : 矩阵乘法节点：left @ right，两个父节点都必须是2维张量，
 *                 且 left 的列数等于 right 的行数。
 */

use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;

#[derive(Clone)]
pub(in crate::nn) struct MatMul {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    shape: Vec<usize>,
}

impl MatMul {
    pub(in crate::nn) fn new(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        // 1. 验证父节点数量
        if parents.len() != 2 {
            return Err(GraphError::InvalidOperation(
                "MatMul节点需要正好2个父节点".to_string(),
            ));
        }

        // 2. 验证矩阵形状
        let left_shape = parents[0].value_expected_shape();
        let right_shape = parents[1].value_expected_shape();
        if left_shape.len() != 2 || right_shape.len() != 2 {
            return Err(GraphError::InvalidOperation(format!(
                "MatMul节点的父节点都必须是2维张量，但得到 {left_shape:?} 和 {right_shape:?}"
            )));
        }
        if left_shape[1] != right_shape[0] {
            return Err(GraphError::ShapeMismatch {
                expected: vec![left_shape[1]],
                got: vec![right_shape[0]],
                message: "MatMul节点要求左矩阵的列数等于右矩阵的行数".to_string(),
            });
        }

        // 3. 返回
        Ok(Self {
            id: None,
            name: None,
            value: None,
            shape: vec![left_shape[0], right_shape[1]],
        })
    }
}

impl TraitNode for MatMul {
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
        "MatMul"
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(&mut self, parents: &[NodeHandle]) -> Result<(), GraphError> {
        let left_value = parents[0].value().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}的第1个父节点{}没有值",
                self.display_node(),
                parents[0]
            ))
        })?;
        let right_value = parents[1].value().ok_or_else(|| {
            GraphError::ComputationError(format!(
                "{}的第2个父节点{}没有值",
                self.display_node(),
                parents[1]
            ))
        })?;

        self.value = Some(left_value.mat_mul(right_value));
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
