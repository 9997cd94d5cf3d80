/*
 * @Author       : 老董
 * @Date         : 2026-02-26
 * @Description  : BasicDecoder - 把循环单元与采样策略组装为解码器
 *
 * 一个解码步依次执行：
 * 1. (cell_outputs, cell_states) = cell.call(inputs, states)
 * 2. 可选的输出投影 output_fn
 * 3. sample_ids = helper.sample(time, cell_outputs, cell_states)
 * 4. (finished, next_inputs, next_states) = helper.next_inputs(...)
 */

use super::{DecodeStep, Decoder, DecodeHelper, OutputFn};
use crate::nn::GraphError;
use crate::nn::cell::RnnCell;
use crate::nn::structure::NestedStructure;
use crate::tensor::Tensor;

/// 组合单元 + 采样策略（+ 可选输出投影）的基础解码器。
///
/// 每步输出打包为 Map{"cell_outputs", "sample_ids"}，
/// 驱动循环按叶子堆叠即可得到全程的logits与采样序列。
pub struct BasicDecoder {
    cell: Box<dyn RnnCell>,
    helper: Box<dyn DecodeHelper>,
    output_fn: Option<OutputFn>,
}

impl BasicDecoder {
    pub fn new(
        cell: Box<dyn RnnCell>,
        helper: Box<dyn DecodeHelper>,
        output_fn: Option<OutputFn>,
    ) -> Self {
        Self {
            cell,
            helper,
            output_fn,
        }
    }

    fn wrap_outputs(cell_outputs: Tensor, sample_ids: Tensor) -> NestedStructure {
        NestedStructure::map(vec![
            ("cell_outputs", NestedStructure::leaf(cell_outputs)),
            ("sample_ids", NestedStructure::leaf(sample_ids)),
        ])
    }
}

impl Decoder for BasicDecoder {
    fn initialize(
        &self,
        inits: &NestedStructure,
    ) -> Result<(NestedStructure, NestedStructure, Tensor), GraphError> {
        // 单元状态直接取调用方提供的初始值，helper 给出首步输入与结束标志
        let (initial_inputs, initial_finished) = self.helper.initialize()?;
        Ok((initial_inputs, inits.clone(), initial_finished))
    }

    fn step(
        &self,
        time: usize,
        inputs: &NestedStructure,
        states: &NestedStructure,
    ) -> Result<DecodeStep, GraphError> {
        let (cell_outputs, cell_states) = self.cell.call(inputs, states)?;
        NestedStructure::assert_same_structure(states, &cell_states)?;

        let mut logits = cell_outputs.as_leaf()?.clone();
        if let Some(output_fn) = &self.output_fn {
            logits = output_fn(&logits)?;
        }

        let sample_ids = self.helper.sample(time, &logits, &cell_states)?;
        let (finished, next_inputs, next_states) =
            self.helper
                .next_inputs(time, &logits, &cell_states, &sample_ids)?;

        Ok(DecodeStep {
            outputs: Self::wrap_outputs(logits, sample_ids),
            next_states,
            next_inputs,
            finished,
        })
    }
}
