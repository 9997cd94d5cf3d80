/*
 * State 节点：用于循环单元中的时间状态（如隐藏状态 h、LSTM 的 c）
 *
 * 与 Input 节点的区别：
 *   - Input：用户数据输入，按时间步由解码驱动替换
 *   - State：循环记忆，由单元的 call/解码驱动在步间搬运（含束搜索的按父束重排）
 *
 * 与 Parameter 节点的区别：
 *   - Parameter：可训练参数
 *   - State：时间状态，不被优化器更新
 *
 * 语义：State 是"要记的东西"，不是"要学的东西"
 */

use crate::nn::{GraphError, NodeId};
use crate::tensor::Tensor;

use super::{NodeHandle, TraitNode};

#[derive(Clone)]
pub(in crate::nn) struct State {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    shape: Vec<usize>,
}

impl State {
    pub(in crate::nn) fn new(shape: &[usize]) -> Result<Self, GraphError> {
        // 支持 2D-3D 张量
        // - 2D: 标准循环单元隐藏状态 [batch, hidden_size]
        // - 3D: 序列隐藏状态 [batch, seq_len, hidden_size]
        if shape.len() < 2 || shape.len() > 3 {
            return Err(GraphError::DimensionMismatch {
                expected: 2,
                got: shape.len(),
                message: format!(
                    "State 张量必须是 2-3 维，但收到的维度是 {} 维。",
                    shape.len(),
                ),
            });
        }

        Ok(Self {
            id: None,
            name: None,
            value: None, // 初始值为 None，由单元/解码驱动设置
            shape: shape.to_vec(),
        })
    }
}

impl TraitNode for State {
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
        "State"
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(&mut self, _parents: &[NodeHandle]) -> Result<(), GraphError> {
        // State 节点的值由执行驱动管理，不通过父节点计算
        Err(GraphError::InvalidOperation(format!(
            "{}的值由执行驱动管理，不通过前向传播计算。不该触及本错误，否则说明crate代码有问题",
            self.display_node()
        )))
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    fn set_value(&mut self, value: Option<&Tensor>) -> Result<(), GraphError> {
        // State 节点允许外部设置值（由执行驱动或用户初始化）
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
