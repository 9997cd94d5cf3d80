/*
 * @Author       : 老董
 * @Date         : 2026-02-15
 * @Description  : 底层节点类型与 TraitNode 接口。
 *                 本库只服务解码的前向计算，TraitNode 不含雅可比/梯度接口。
 */

mod input;
mod parameter;
mod state;

mod ops {
    pub mod add;
    pub mod mat_mul;
    pub mod multiply;
    pub mod sigmoid;
    pub mod subtract;
    pub mod tanh;
}

pub(in crate::nn) use input::Input;
pub(in crate::nn) use ops::add::Add;
pub(in crate::nn) use ops::mat_mul::MatMul;
pub(in crate::nn) use ops::multiply::Multiply;
pub(in crate::nn) use ops::sigmoid::Sigmoid;
pub(in crate::nn) use ops::subtract::Subtract;
pub(in crate::nn) use ops::tanh::Tanh;
pub(in crate::nn) use parameter::Parameter;
pub(in crate::nn) use state::State;

use super::{NodeHandle, NodeId};
use crate::nn::GraphError;
use crate::nn::format_node_display;
use crate::tensor::Tensor;
use enum_dispatch::enum_dispatch;

#[enum_dispatch]
#[derive(Clone)]
pub(in crate::nn) enum NodeType {
    Input(Input),
    Parameter(Parameter),
    State(State),
    Add(Add),
    Subtract(Subtract),
    MatMul(MatMul),
    Multiply(Multiply),
    Sigmoid(Sigmoid),
    Tanh(Tanh),
}

#[enum_dispatch(NodeType)]
pub(in crate::nn) trait TraitNode {
    fn id(&self) -> NodeId;

    fn set_id(&mut self, id: NodeId);

    fn name(&self) -> &str;

    fn set_name(&mut self, name: &str);

    /// 节点类型名（用于显示与命名）
    fn type_name(&self) -> &'static str;

    /// 节点值应有的形状（构图期推断，执行期据此校验）
    fn value_expected_shape(&self) -> &[usize];

    /// 根据父节点的值计算本节点的值。
    /// 注意：该接口只在 Graph 中使用，调用前所有父节点的值都已被计算过。
    fn calc_value_by_parents(&mut self, parents: &[NodeHandle]) -> Result<(), GraphError>;

    fn value(&self) -> Option<&Tensor>;

    fn set_value(&mut self, value: Option<&Tensor>) -> Result<(), GraphError>;

    /// 不做形状校验地覆写节点值（仅供图内部恢复/重置时使用）
    fn set_value_unchecked(&mut self, value: Option<&Tensor>);

    fn clear_value(&mut self) -> Result<(), GraphError>;

    fn display_node(&self) -> String {
        format_node_display(self.id(), self.name(), self.type_name())
    }
}
