/*
 * Input 节点：用户数据输入（叶子节点）
 *
 * 值由调用方通过 set_value 设置，形状在构图期固定，
 * 执行引擎不会对其做前向计算。
 */

use crate::nn::{GraphError, NodeId};
use crate::tensor::Tensor;

use super::{NodeHandle, TraitNode};

#[derive(Clone)]
pub(in crate::nn) struct Input {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    shape: Vec<usize>,
}

impl Input {
    pub(in crate::nn) fn new(shape: &[usize]) -> Result<Self, GraphError> {
        // 1. 必要的验证：1-4 维
        // - 1D: 标量序列/步计数 [batch]
        // - 2D: 常规输入 [batch, feature]
        // - 3D/4D: 序列/图像输入
        if shape.is_empty() || shape.len() > 4 {
            return Err(GraphError::DimensionMismatch {
                expected: 2,
                got: shape.len(),
                message: format!(
                    "输入张量必须是 1-4 维，但收到的维度是 {} 维。",
                    shape.len(),
                ),
            });
        }

        // 2. 返回
        Ok(Self {
            id: None,
            name: None,
            value: None,
            shape: shape.to_vec(),
        })
    }
}

impl TraitNode for Input {
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
        "Input"
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(&mut self, _parents: &[NodeHandle]) -> Result<(), GraphError> {
        Err(GraphError::InvalidOperation(format!(
            "{}的值应通过 set_value 设置，而非通过前向传播计算",
            self.display_node()
        )))
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    fn set_value(&mut self, value: Option<&Tensor>) -> Result<(), GraphError> {
        if let Some(v) = value {
            if v.shape() != self.shape.as_slice() {
                return Err(GraphError::ShapeMismatch {
                    expected: self.shape.clone(),
                    got: v.shape().to_vec(),
                    message: format!("{}的值形状与构图期声明不符", self.display_node()),
                });
            }
        }
        self.value = value.cloned();
        Ok(())
    }

    fn set_value_unchecked(&mut self, value: Option<&Tensor>) {
        self.value = value.cloned();
    }

    fn clear_value(&mut self) -> Result<(), GraphError> {
        self.value = None;
        Ok(())
    }
}
