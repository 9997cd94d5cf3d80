/*
 * @Author       : 老董
 * @Date         : 2026-02-20
 * @Description  : 循环单元（RNN cell）抽象：单步状态转移接口。
 *                 单元在构造时把门结构搭建成计算图节点，`call` 只负责
 *                 喂入本步输入与状态、执行前向传播、读出输出与新状态，
 *                 即“构图一次、按步执行”。
 */

mod gru;
mod lstm;

pub use gru::GruCell;
pub use lstm::LstmCell;

use crate::nn::GraphError;
use crate::nn::structure::{NestedStructure, StateShape};
use crate::tensor::Tensor;

/// 循环单元的单步状态转移接口
///
/// 约定：`call` 返回的新状态必须与传入的状态同构（assert_same_structure），
/// 这是解码驱动循环赖以工作的不变量。
pub trait RnnCell {
    /// 执行一步状态转移：(inputs, states) -> (outputs, new_states)
    fn call(
        &self,
        inputs: &NestedStructure,
        states: &NestedStructure,
    ) -> Result<(NestedStructure, NestedStructure), GraphError>;

    /// 本单元状态的形状模板（不含批维）。
    /// 仅在 `get_initial_states` 未提供显式形状时使用。
    fn state_shape(&self) -> Result<StateShape, GraphError>;

    /// 按形状模板合成初始状态。
    ///
    /// # 参数
    /// - `batch_ref`: 任意嵌套结构，取其首个叶子在 `batch_dim_idx` 维上的
    ///   大小作为批大小
    /// - `shape`: 显式形状模板；为 None 时使用 `state_shape()`
    /// - `init_value`: 填充值
    /// - `batch_dim_idx`: `batch_ref` 中批维的位置
    ///
    /// # 错误
    /// - 没有显式形状且单元未声明 `state_shape` 时，返回
    ///   `UnsupportedConfiguration`
    fn get_initial_states(
        &self,
        batch_ref: &NestedStructure,
        shape: Option<&StateShape>,
        init_value: f32,
        batch_dim_idx: usize,
    ) -> Result<NestedStructure, GraphError> {
        let template = match shape {
            Some(s) => s.clone(),
            None => self.state_shape()?,
        };

        let leaves = batch_ref.flatten();
        let batch_leaf = leaves.first().ok_or_else(|| {
            GraphError::UnsupportedConfiguration(
                "batch_ref是空结构，无法推断批大小".to_string(),
            )
        })?;
        if batch_dim_idx >= batch_leaf.dimension() {
            return Err(GraphError::UnsupportedConfiguration(format!(
                "batch_dim_idx为{}，但batch_ref叶子只有{}维",
                batch_dim_idx,
                batch_leaf.dimension()
            )));
        }
        let batch_size = batch_leaf.shape()[batch_dim_idx];

        // 批大小统一插到每个叶子形状的最前面
        template.map_to_structure(&mut |feature_shape| {
            let mut full_shape = Vec::with_capacity(feature_shape.len() + 1);
            full_shape.push(batch_size);
            full_shape.extend_from_slice(feature_shape);
            Ok(Tensor::full(init_value, &full_shape))
        })
    }
}
