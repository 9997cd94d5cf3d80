/*
 * @Author       : 老董
 * @Date         : 2026-02-25
 * @Description  : 序列解码模块：Decoder 抽象、采样策略（helper）、
 *                 BasicDecoder、束搜索解码器与 dynamic_decode 驱动循环。
 */

mod basic;
mod beam_search;
mod dynamic;
mod helper;
mod tensor_array;

pub use basic::BasicDecoder;
pub use beam_search::{BeamOutput, BeamSearchDecoder, BeamState, gather_tree};
pub use dynamic::{DecodeConfig, DecodeOutput, dynamic_decode};
pub use helper::{DecodeHelper, GreedyEmbeddingHelper, SampleEmbeddingHelper, TrainingHelper};
pub use tensor_array::TensorArray;

use crate::nn::GraphError;
use crate::nn::structure::NestedStructure;
use crate::tensor::Tensor;

/// 嵌入函数：把（批量的）token id 张量映射为嵌入张量。
/// 约定输出形状 = 输入形状 + [embedding_dim]。
/// 由调用方注入，解码器只按约定调用、从不内省。
pub type EmbeddingFn = Box<dyn Fn(&Tensor) -> Result<Tensor, GraphError>>;

/// 输出投影函数：把单元输出（如 [batch, hidden]）映射为logits（如 [batch, vocab]）
pub type OutputFn = Box<dyn Fn(&Tensor) -> Result<Tensor, GraphError>>;

/// `Decoder::step` 的返回值
pub struct DecodeStep {
    /// 本步输出（驱动循环会把每步输出沿时间维堆叠）
    pub outputs: NestedStructure,
    /// 下一步状态，必须与传入的状态同构
    pub next_states: NestedStructure,
    /// 下一步输入
    pub next_inputs: NestedStructure,
    /// 各槽位是否已结束，[batch]或[batch, beam]的0/1张量
    pub finished: Tensor,
}

/// 解码器抽象：`dynamic_decode` 驱动循环的被调方。
///
/// `finalize` 是可选能力：默认实现返回 `Ok(None)` 表示“无终结步骤”，
/// 驱动循环据此跳过（显式的能力信号，而非靠异常探测）。
pub trait Decoder {
    /// 产生首步输入、初始状态与初始结束标志
    fn initialize(
        &self,
        inits: &NestedStructure,
    ) -> Result<(NestedStructure, NestedStructure, Tensor), GraphError>;

    /// 执行一个解码步
    fn step(
        &self,
        time: usize,
        inputs: &NestedStructure,
        states: &NestedStructure,
    ) -> Result<DecodeStep, GraphError>;

    /// 对堆叠后的全部输出做一次终结处理（如束搜索的回溯重建）。
    /// 返回 `Ok(None)` 表示本解码器没有终结步骤。
    fn finalize(
        &self,
        outputs: &NestedStructure,
        final_states: &NestedStructure,
        sequence_lengths: &Tensor,
    ) -> Result<Option<(NestedStructure, NestedStructure)>, GraphError> {
        let _ = (outputs, final_states, sequence_lengths);
        Ok(None)
    }
}
