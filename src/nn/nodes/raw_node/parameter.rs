use crate::nn::{GraphError, NodeId};
use crate::tensor::Tensor;

use super::{NodeHandle, TraitNode};

#[derive(Clone)]
pub(in crate::nn) struct Parameter {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    shape: Vec<usize>,
}

impl Parameter {
    pub(in crate::nn) fn new(shape: &[usize]) -> Result<Self, GraphError> {
        // 1. 必要的验证：支持 2D 张量（权重矩阵与 [1, n] 偏置）
        Self::check_shape(shape)?;

        // 2. 返回
        Ok(Self {
            id: None,
            name: None,
            value: Some(Tensor::normal(0.0, 0.001, shape)),
            shape: shape.to_vec(),
        })
    }

    /// 使用固定种子创建参数节点（确保可重复性）
    pub(in crate::nn) fn new_seeded(shape: &[usize], seed: u64) -> Result<Self, GraphError> {
        Self::check_shape(shape)?;

        Ok(Self {
            id: None,
            name: None,
            value: Some(Tensor::normal_seeded(0.0, 0.001, shape, seed)),
            shape: shape.to_vec(),
        })
    }

    fn check_shape(shape: &[usize]) -> Result<(), GraphError> {
        if shape.len() != 2 {
            return Err(GraphError::DimensionMismatch {
                expected: 2,
                got: shape.len(),
                message: format!(
                    "参数张量必须是 2 维（权重 [in, out] 或偏置 [1, out]），但收到的维度是 {} 维。",
                    shape.len(),
                ),
            });
        }
        Ok(())
    }
}

impl TraitNode for Parameter {
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
        "Parameter"
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(&mut self, _parents: &[NodeHandle]) -> Result<(), GraphError> {
        Err(GraphError::InvalidOperation(format!(
            "{}被执行了前向传播。不该触及本错误，否则说明crate代码有问题",
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
