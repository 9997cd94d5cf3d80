/*
 * @Author       : 老董
 * @Date         : 2026-02-16
 * @Description  : 加法节点：将所有父节点的值逐元素相加。
 *                 支持 NumPy 风格广播，如 [batch, hidden] + [1, hidden] 的偏置相加。
 */

use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;

#[derive(Clone)]
pub(in crate::nn) struct Add {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    shape: Vec<usize>,
}

/// 计算两个形状按广播规则合并后的形状（从右向左对齐，取各维较大值）
fn broadcast_shape(a: &[usize], b: &[usize]) -> Option<Vec<usize>> {
    let ndim = a.len().max(b.len());
    let dim_at = |shape: &[usize], i: usize| {
        if i + shape.len() >= ndim {
            shape[i + shape.len() - ndim]
        } else {
            1
        }
    };
    let mut out = Vec::with_capacity(ndim);
    for i in 0..ndim {
        let (x, y) = (dim_at(a, i), dim_at(b, i));
        if x != y && x != 1 && y != 1 {
            return None;
        }
        out.push(x.max(y));
    }
    Some(out)
}

impl Add {
    pub(in crate::nn) fn new(parents: &[&NodeHandle]) -> Result<Self, GraphError> {
        // 1. 验证父节点数量
        if parents.len() < 2 {
            return Err(GraphError::InvalidOperation(
                "Add节点至少需要2个父节点".to_string(),
            ));
        }

        // 2. 推断广播后的输出形状
        let mut shape = parents[0].value_expected_shape().to_vec();
        for parent in &parents[1..] {
            shape = broadcast_shape(&shape, parent.value_expected_shape()).ok_or_else(|| {
                GraphError::ShapeMismatch {
                    expected: shape.clone(),
                    got: parent.value_expected_shape().to_vec(),
                    message: "Add节点的父节点形状无法广播相加".to_string(),
                }
            })?;
        }

        // 3. 返回
        Ok(Self {
            id: None,
            name: None,
            value: None,
            shape,
        })
    }
}

impl TraitNode for Add {
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
        "Add"
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(&mut self, parents: &[NodeHandle]) -> Result<(), GraphError> {
        let mut sum: Option<Tensor> = None;
        for (i, parent) in parents.iter().enumerate() {
            let value = parent.value().ok_or_else(|| {
                GraphError::ComputationError(format!(
                    "{}的第{}个父节点{}没有值",
                    self.display_node(),
                    i + 1,
                    parent
                ))
            })?;
            sum = Some(match sum {
                Some(acc) => acc + value,
                None => value.clone(),
            });
        }
        self.value = sum;
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
