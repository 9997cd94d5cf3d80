/*
 * @Author       : 老董
 * @Date         : 2026-03-10
 * @Description  : 束搜索端到端测试：batch=1, beam=2, vocab=4, end=3，
 *                 喂入手算好的逐步logits，核对每步的选择结果与
 *                 最终回溯出的完整序列
 */

use approx::assert_abs_diff_eq;
use only_decode::nn::decode::{BeamSearchDecoder, DecodeConfig, Decoder, dynamic_decode};
use only_decode::nn::{GraphError, NestedStructure, RnnCell, StateShape};
use only_decode::tensor::Tensor;

/// 按时间步吐出固定logits的测试单元：状态是[rows, 1]的步计数器，
/// 每行（即每个合并后的批*束槽位）拿到同一行logits。
struct StepLogitsCell {
    logits_per_step: Vec<Vec<f32>>,
    vocab_size: usize,
}

impl RnnCell for StepLogitsCell {
    fn call(
        &self,
        _inputs: &NestedStructure,
        states: &NestedStructure,
    ) -> Result<(NestedStructure, NestedStructure), GraphError> {
        let counter = states.as_leaf()?;
        let rows = counter.shape()[0];
        let t = (counter[[0, 0]].round() as usize).min(self.logits_per_step.len() - 1);

        let mut data = Vec::with_capacity(rows * self.vocab_size);
        for _ in 0..rows {
            data.extend_from_slice(&self.logits_per_step[t]);
        }
        let outputs = Tensor::new(&data, &[rows, self.vocab_size]);
        let next_counter = counter + 1.0;
        Ok((
            NestedStructure::leaf(outputs),
            NestedStructure::leaf(next_counter),
        ))
    }

    fn state_shape(&self) -> Result<StateShape, GraphError> {
        Ok(StateShape::leaf(&[1]))
    }
}

/// logits 用 ln(p) 构造（p已归一化，log_softmax后仍为 ln p），便于手算
fn scripted_cell() -> StepLogitsCell {
    let t0 = [0.4f32, 0.3, 0.2, 0.1];
    let t1 = [0.1f32, 0.1, 0.2, 0.6];
    StepLogitsCell {
        logits_per_step: vec![
            t0.iter().map(|p| p.ln()).collect(),
            t1.iter().map(|p| p.ln()).collect(),
        ],
        vocab_size: 4,
    }
}

fn scripted_decoder() -> BeamSearchDecoder {
    BeamSearchDecoder::new(Box::new(scripted_cell()), 0, 3, 2, None, None).unwrap()
}

/// 初始单元状态：batch=1 的步计数器
fn inits() -> NestedStructure {
    NestedStructure::leaf(Tensor::zeros(&[1, 1]))
}

/// 逐步核对：每步的scores/predicted_ids/parent_ids/finished
#[test]
fn test_stepwise_selection_matches_hand_computation() -> Result<(), GraphError> {
    let decoder = scripted_decoder();
    let (inputs, states, init_finished) = decoder.initialize(&inits())?;
    assert!(init_finished.data_as_slice().iter().all(|&f| f == 0.0));

    // ---- 步0：只有0号束存活，展开出 token0 和 token1 ----
    let step0 = decoder.step(0, &inputs, &states)?;
    let predicted = step0.outputs.get("predicted_ids")?.as_leaf()?;
    let parents = step0.outputs.get("parent_ids")?.as_leaf()?;
    let scores = step0.outputs.get("scores")?.as_leaf()?;
    assert_eq!(predicted.data_as_slice(), &[0.0, 1.0]);
    assert_eq!(parents.data_as_slice(), &[0.0, 0.0]);
    assert_abs_diff_eq!(scores[[0, 0]], 0.4f32.ln(), epsilon = 1e-5);
    assert_abs_diff_eq!(scores[[0, 1]], 0.3f32.ln(), epsilon = 1e-5);
    assert_eq!(step0.finished.data_as_slice(), &[0.0, 0.0]);
    assert_eq!(
        step0
            .next_states
            .get("lengths")?
            .as_leaf()?
            .data_as_slice(),
        &[1.0, 1.0]
    );

    // ---- 步1：两个束都选中结束符，次优来自1号束 ----
    let step1 = decoder.step(1, &step0.next_inputs, &step0.next_states)?;
    let predicted = step1.outputs.get("predicted_ids")?.as_leaf()?;
    let parents = step1.outputs.get("parent_ids")?.as_leaf()?;
    let scores = step1.outputs.get("scores")?.as_leaf()?;
    assert_eq!(predicted.data_as_slice(), &[3.0, 3.0]);
    assert_eq!(parents.data_as_slice(), &[0.0, 1.0]);
    assert_abs_diff_eq!(scores[[0, 0]], 0.4f32.ln() + 0.6f32.ln(), epsilon = 1e-5);
    assert_abs_diff_eq!(scores[[0, 1]], 0.3f32.ln() + 0.6f32.ln(), epsilon = 1e-5);
    assert_eq!(step1.finished.data_as_slice(), &[1.0, 1.0]);
    assert_eq!(
        step1
            .next_states
            .get("lengths")?
            .as_leaf()?
            .data_as_slice(),
        &[2.0, 2.0]
    );
    Ok(())
}

/// 端到端：dynamic_decode 驱动 + finalize 回溯
#[test]
fn test_dynamic_decode_with_backtrace() -> Result<(), GraphError> {
    let decoder = scripted_decoder();
    let config = DecodeConfig {
        max_step_num: Some(3),
        ..DecodeConfig::default()
    };
    let result = dynamic_decode(&decoder, &inits(), &config)?;

    // 两步后全部结束（未达步数上限）
    assert_eq!(result.sequence_lengths.shape(), &[1, 2]);
    assert_eq!(result.sequence_lengths.data_as_slice(), &[2.0, 2.0]);

    // 回溯后的完整序列（批主序 [batch=1, time=2, beam=2]）：
    // 槽0 = [0, 3]，槽1 = [1, 3]
    let traced = result.outputs.as_leaf()?;
    assert_eq!(traced.shape(), &[1, 2, 2]);
    assert_eq!(traced.data_as_slice(), &[0.0, 1.0, 3.0, 3.0]);

    // 最终状态：结束标志全真，累积分数与手算一致
    let finished = result.final_states.get("finished")?.as_leaf()?;
    assert!(finished.data_as_slice().iter().all(|&f| f == 1.0));
    let log_probs = result.final_states.get("log_probs")?.as_leaf()?;
    assert_abs_diff_eq!(
        log_probs[[0, 0]],
        0.4f32.ln() + 0.6f32.ln(),
        epsilon = 1e-5
    );
    assert_abs_diff_eq!(
        log_probs[[0, 1]],
        0.3f32.ln() + 0.6f32.ln(),
        epsilon = 1e-5
    );
    Ok(())
}

/// 时间主序输出：回溯结果保持 [time, batch, beam]
#[test]
fn test_time_major_backtrace_layout() -> Result<(), GraphError> {
    let decoder = scripted_decoder();
    let config = DecodeConfig {
        max_step_num: Some(3),
        output_time_major: true,
        ..DecodeConfig::default()
    };
    let result = dynamic_decode(&decoder, &inits(), &config)?;

    let traced = result.outputs.as_leaf()?;
    assert_eq!(traced.shape(), &[2, 1, 2]);
    assert_eq!(traced.data_as_slice(), &[0.0, 1.0, 3.0, 3.0]);
    Ok(())
}

/// 步数上限先于全部结束时，解码在上限处截断
#[test]
fn test_max_step_truncates_before_finish() -> Result<(), GraphError> {
    // 所有步都强烈偏向 token1（非结束符），解码不会自行结束
    let p = [0.1f32, 0.7, 0.1, 0.1];
    let cell = StepLogitsCell {
        logits_per_step: vec![p.iter().map(|v| v.ln()).collect()],
        vocab_size: 4,
    };
    let decoder = BeamSearchDecoder::new(Box::new(cell), 0, 3, 2, None, None)?;
    let config = DecodeConfig {
        max_step_num: Some(3),
        ..DecodeConfig::default()
    };
    let result = dynamic_decode(&decoder, &inits(), &config)?;

    // 恰好3步，所有槽位都未结束
    assert_eq!(result.sequence_lengths.data_as_slice(), &[3.0, 3.0]);
    let finished = result.final_states.get("finished")?.as_leaf()?;
    assert!(finished.data_as_slice().iter().all(|&f| f == 0.0));
    assert_eq!(result.outputs.as_leaf()?.shape(), &[1, 3, 2]);
    Ok(())
}
