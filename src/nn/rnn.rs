/*
 * @Author       : 老董
 * @Date         : 2026-02-22
 * @Description  : rnn - 对定长序列按时间步展开循环单元
 *
 * 内部统一转为时间主序（time-major）处理；提供 sequence_length 时
 * 用步掩码冻结已结束样本的状态；is_reverse 时先反转输入（与掩码），
 * 循环结束后再反转输出，保证与正序语义互为镜像。
 */

use crate::nn::GraphError;
use crate::nn::cell::RnnCell;
use crate::nn::structure::NestedStructure;
use crate::tensor::Tensor;

/// 状态混合：已结束位置保留旧状态，未结束位置取新状态。
/// `mask`为[batch]的0/1张量，广播到状态叶子的批维上。
/// 公式 blended = new*mask - old*(mask-1)，利用 mask ∈ {0,1}。
fn maybe_copy(old: &Tensor, new: &Tensor, mask: &Tensor) -> Tensor {
    let mut mask_shape = vec![mask.shape()[0]];
    mask_shape.extend(std::iter::repeat(1).take(new.dimension() - 1));
    let mask = mask.reshape(&mask_shape);
    new * &mask - old * (&mask - 1.0)
}

/// 对定长序列展开循环单元，返回（按时间堆叠的输出，最终状态）。
///
/// # 参数
/// - `cell`: 循环单元
/// - `inputs`: 嵌套结构，叶子形状为 [batch, seq_len, ...]
///   （`time_major`为true时为 [seq_len, batch, ...]）
/// - `initial_states`: 初始状态；为 None 时用 `cell.get_initial_states` 合成
/// - `sequence_length`: 各样本的真实长度 [batch]；提供时，超过真实长度的
///   时间步其状态被冻结
/// - `time_major`: 输入/输出叶子的首维是否为时间维
/// - `is_reverse`: 是否按时间逆序计算
///
/// # 返回
/// - `final_outputs`: 每个时间步输出按时间堆叠，布局遵循 `time_major`
/// - `final_states`: 最后一个时间步的状态，与 `initial_states` 同构
pub fn rnn(
    cell: &dyn RnnCell,
    inputs: &NestedStructure,
    initial_states: Option<&NestedStructure>,
    sequence_length: Option<&Tensor>,
    time_major: bool,
    is_reverse: bool,
) -> Result<(NestedStructure, NestedStructure), GraphError> {
    let mut states = match initial_states {
        Some(s) => s.clone(),
        None => cell.get_initial_states(inputs, None, 0.0, usize::from(time_major))?,
    };

    // 统一转为时间主序
    let mut inputs_tm = if time_major {
        inputs.clone()
    } else {
        inputs.map_structure(&mut |x| Ok(x.transpose_batch_time()))?
    };

    let first_leaf = inputs_tm.flatten().first().cloned().cloned().ok_or_else(|| {
        GraphError::UnsupportedConfiguration("rnn的inputs是空结构".to_string())
    })?;
    let max_seq_len = first_leaf.shape()[0];
    if max_seq_len == 0 {
        return Err(GraphError::UnsupportedConfiguration(
            "rnn的输入序列长度为0".to_string(),
        ));
    }

    // 步掩码：[batch, maxlen] -> [maxlen, batch]
    let mut mask_tm = sequence_length
        .map(|lengths| Tensor::sequence_mask(lengths, max_seq_len).transpose_batch_time());

    if is_reverse {
        inputs_tm = inputs_tm.map_structure(&mut |x| Ok(x.reverse_axis(0)))?;
        mask_tm = mask_tm.map(|m| m.reverse_axis(0));
    }

    let mut outputs_template: Option<NestedStructure> = None;
    let mut outputs_arrays: Vec<Vec<Tensor>> = Vec::new();

    for t in 0..max_seq_len {
        let step_inputs = inputs_tm.map_structure(&mut |x| Ok(x.select_on_axis(0, t)))?;
        let (step_outputs, new_states) = cell.call(&step_inputs, &states)?;
        NestedStructure::assert_same_structure(&states, &new_states)?;

        states = match &mask_tm {
            Some(mask) => {
                let step_mask = mask.select_on_axis(0, t);
                NestedStructure::map_structure2(&new_states, &states, &mut |new, old| {
                    Ok(maybe_copy(old, new, &step_mask))
                })?
            }
            None => new_states,
        };

        // 逐叶收集每步输出
        if let Some(template) = &outputs_template {
            NestedStructure::assert_same_structure(template, &step_outputs)?;
            for (array, leaf) in outputs_arrays.iter_mut().zip(step_outputs.flatten()) {
                array.push(leaf.clone());
            }
        } else {
            outputs_arrays = step_outputs
                .flatten()
                .iter()
                .map(|leaf| vec![(*leaf).clone()])
                .collect();
            outputs_template = Some(step_outputs);
        }
    }

    // 沿新的时间维堆叠
    let template = outputs_template.unwrap();
    let stacked = outputs_arrays
        .iter()
        .map(|array| {
            let refs = array.iter().collect::<Vec<_>>();
            Tensor::stack(&refs, true)
        })
        .collect::<Vec<_>>();
    let mut final_outputs = NestedStructure::pack_sequence_as(&template, stacked)?;

    if is_reverse {
        final_outputs = final_outputs.map_structure(&mut |x| Ok(x.reverse_axis(0)))?;
    }
    if !time_major {
        final_outputs = final_outputs.map_structure(&mut |x| Ok(x.transpose_batch_time()))?;
    }

    Ok((final_outputs, states))
}
