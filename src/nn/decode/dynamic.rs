/*
 * @Author       : 老董
 * @Date         : 2026-03-03
 * @Description  : dynamic_decode - 步进式解码驱动循环
 *
 * 反复调用 decoder.step()，直到所有槽位结束或达到步数上限。
 * 结束标志单调：一旦为真便与后续标志做或运算，不会再翻回。
 * 每步输出逐叶追加进 TensorArray，循环结束后沿时间维堆叠，
 * 再按解码器声明的可选 finalize 能力做一次终结处理。
 */

use super::{Decoder, TensorArray};
use crate::nn::GraphError;
use crate::nn::structure::NestedStructure;
use crate::tensor::Tensor;

/// 解码驱动循环的配置
pub struct DecodeConfig {
    /// 步数上限；None 表示解码到所有槽位结束为止
    pub max_step_num: Option<usize>,
    /// 最终输出是否保持时间主序（false 则转为批主序）
    pub output_time_major: bool,
    /// 为 true 时冻结已结束槽位的状态（用掩码混合旧/新状态），
    /// 保证最终状态正确，代价是额外计算
    pub impute_finished: bool,
    /// 测试模式：不保留逐步的输入/状态历史，省内存
    /// （仅当不需要反向重放时可用）
    pub is_test: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            max_step_num: None,
            output_time_major: false,
            impute_finished: false,
            is_test: false,
        }
    }
}

/// 解码驱动循环的结果
pub struct DecodeOutput {
    /// 全部时间步的输出，与 decoder.step 的 outputs 同构，
    /// 每个叶子多出一个时间维（布局由 `output_time_major` 决定）
    pub outputs: NestedStructure,
    /// 最后一个时间步的状态
    pub final_states: NestedStructure,
    /// 各槽位的实际解码长度（首次结束步的下标+1）
    pub sequence_lengths: Tensor,
}

/// 已结束槽位保留旧状态，未结束槽位取新状态。
/// `finished`为0/1张量，广播到状态叶子的前导维上。
fn maybe_copy(state: &Tensor, new_state: &Tensor, finished: &Tensor) -> Tensor {
    let mut mask_shape = finished.shape().to_vec();
    mask_shape.extend(std::iter::repeat(1).take(new_state.dimension() - finished.dimension()));
    let mask = finished.reshape(&mask_shape);
    state * &mask - new_state * (&mask - 1.0)
}

/// 逐元素或运算（0/1张量）
fn logical_or(a: &Tensor, b: &Tensor) -> Tensor {
    a.where_with_tensor(b, |x, y| x != 0.0 || y != 0.0, |_, _| 1.0, |_, _| 0.0)
}

/// 步进式解码：反复执行 `decoder.step()` 直到所有槽位结束
/// 或步数达到 `max_step_num`。
///
/// # 返回
/// `DecodeOutput`：堆叠后的输出（可能经过 `decoder.finalize` 修正）、
/// 最终状态与各槽位实际长度。
///
/// # 错误
/// 初始结束标志已全真（一步都不会执行）时返回
/// `UnsupportedConfiguration`。
pub fn dynamic_decode(
    decoder: &dyn Decoder,
    inits: &NestedStructure,
    config: &DecodeConfig,
) -> Result<DecodeOutput, GraphError> {
    let (initial_inputs, initial_states, initial_finished) = decoder.initialize(inits)?;

    let mut inputs = initial_inputs;
    let mut states = initial_states;
    let mut finished = initial_finished;
    let mut sequence_lengths = Tensor::zeros(finished.shape());

    if finished.all() {
        return Err(GraphError::UnsupportedConfiguration(
            "初始结束标志已全部为真，解码循环不会执行任何步骤".to_string(),
        ));
    }

    // 非测试模式下保留逐步的状态快照，最终状态从快照读出
    let mut states_history: Vec<NestedStructure> = Vec::new();

    let mut outputs_template: Option<NestedStructure> = None;
    let mut outputs_arrays: Vec<TensorArray> = Vec::new();

    let mut step = 0usize;
    while !finished.all() && config.max_step_num.is_none_or(|max| step < max) {
        let step_result = decoder.step(step, &inputs, &states)?;
        NestedStructure::assert_same_structure(&states, &step_result.next_states)?;

        // 结束标志单调递增
        let next_finished = logical_or(&step_result.finished, &finished);
        // 本步进入时尚未结束的槽位长度加一
        let not_finished_at_entry = finished.where_with_f32(|f| f != 0.0, |_| 0.0, |_| 1.0);
        let next_sequence_lengths = &sequence_lengths + &not_finished_at_entry;

        let next_states = if config.impute_finished {
            NestedStructure::map_structure2(
                &states,
                &step_result.next_states,
                &mut |old, new| Ok(maybe_copy(old, new, &finished)),
            )?
        } else {
            step_result.next_states
        };

        // 逐叶把本步输出追加进 TensorArray
        if let Some(template) = &outputs_template {
            NestedStructure::assert_same_structure(template, &step_result.outputs)?;
            for (array, leaf) in outputs_arrays.iter_mut().zip(step_result.outputs.flatten()) {
                array.write(step, leaf.clone())?;
            }
        } else {
            outputs_arrays = step_result
                .outputs
                .flatten()
                .iter()
                .map(|leaf| {
                    let mut array = TensorArray::new();
                    array.write(0, (*leaf).clone())?;
                    Ok(array)
                })
                .collect::<Result<Vec<_>, GraphError>>()?;
            outputs_template = Some(step_result.outputs.clone());
        }

        if !config.is_test {
            states_history.push(next_states.clone());
        }

        inputs = step_result.next_inputs;
        states = next_states;
        finished = next_finished;
        sequence_lengths = next_sequence_lengths;
        step += 1;
    }

    // 沿时间维堆叠全部输出
    let template = outputs_template.unwrap();
    let stacked = outputs_arrays
        .iter()
        .map(TensorArray::stack)
        .collect::<Result<Vec<_>, _>>()?;
    let mut final_outputs = NestedStructure::pack_sequence_as(&template, stacked)?;

    let mut final_states = if config.is_test {
        states
    } else {
        states_history.pop().unwrap()
    };

    // finalize 是显式的可选能力：None 即跳过
    if let Some((outputs, states)) =
        decoder.finalize(&final_outputs, &final_states, &sequence_lengths)?
    {
        final_outputs = outputs;
        final_states = states;
    }

    if !config.output_time_major {
        final_outputs = final_outputs.map_structure(&mut |x| Ok(x.transpose_batch_time()))?;
    }

    Ok(DecodeOutput {
        outputs: final_outputs,
        final_states,
        sequence_lengths,
    })
}
