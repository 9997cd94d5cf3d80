/*
 * @Author       : 老董
 * @Date         : 2026-03-07
 * @Description  : DecodeHelper 单元测试：教师强制切片、贪心采样、
 *                 分布采样（温度校验与种子确定性）
 */

use crate::nn::GraphError;
use crate::nn::decode::{
    DecodeHelper, EmbeddingFn, GreedyEmbeddingHelper, SampleEmbeddingHelper, TrainingHelper,
};
use crate::nn::structure::NestedStructure;
use crate::tensor::Tensor;

/// 简单的查表嵌入：id -> one-hot 向量
fn one_hot_embedding(vocab_size: usize) -> EmbeddingFn {
    Box::new(move |ids: &Tensor| {
        let count = ids.size();
        let mut data = vec![0.0f32; count * vocab_size];
        for (i, &id) in ids.data_as_slice().iter().enumerate() {
            data[i * vocab_size + id.round() as usize] = 1.0;
        }
        let mut shape = ids.shape().to_vec();
        shape.push(vocab_size);
        Ok(Tensor::new(&data, &shape))
    })
}

fn empty_states() -> NestedStructure {
    NestedStructure::leaf(Tensor::zeros(&[2, 1]))
}

// ==================== TrainingHelper ====================

/// initialize 切出第0步输入，长度为0的样本直接结束
#[test]
fn test_training_helper_initialize() -> Result<(), GraphError> {
    // [batch=2, seq=2, dim=1]
    let inputs = NestedStructure::leaf(Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[2, 2, 1]));
    let helper = TrainingHelper::new(&inputs, Tensor::new(&[2.0, 0.0], &[2]), false)?;

    let (init_inputs, init_finished) = helper.initialize()?;
    assert_eq!(init_inputs.as_leaf()?.data_as_slice(), &[1.0, 3.0]);
    assert_eq!(init_finished.data_as_slice(), &[0.0, 1.0]);
    Ok(())
}

/// next_inputs 按时间步切片，finished = (len <= t+1)
#[test]
fn test_training_helper_next_inputs() -> Result<(), GraphError> {
    let inputs = NestedStructure::leaf(Tensor::new(
        &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        &[2, 3, 1],
    ));
    let helper = TrainingHelper::new(&inputs, Tensor::new(&[2.0, 3.0], &[2]), false)?;

    let logits = Tensor::new(&[0.1, 0.9, 0.8, 0.2], &[2, 2]);
    let sample_ids = helper.sample(0, &logits, &empty_states())?;
    assert_eq!(sample_ids.data_as_slice(), &[1.0, 0.0]);

    // t=0 -> 切第1步
    let (finished, next_inputs, _) =
        helper.next_inputs(0, &logits, &empty_states(), &sample_ids)?;
    assert_eq!(finished.data_as_slice(), &[0.0, 0.0]);
    assert_eq!(next_inputs.as_leaf()?.data_as_slice(), &[2.0, 5.0]);

    // t=1 -> 样本0结束（len=2 <= 2）
    let (finished, next_inputs, _) =
        helper.next_inputs(1, &logits, &empty_states(), &sample_ids)?;
    assert_eq!(finished.data_as_slice(), &[1.0, 0.0]);
    assert_eq!(next_inputs.as_leaf()?.data_as_slice(), &[3.0, 6.0]);

    // t=2 -> 全部结束，切到补零步也不越界
    let (finished, next_inputs, _) =
        helper.next_inputs(2, &logits, &empty_states(), &sample_ids)?;
    assert_eq!(finished.data_as_slice(), &[1.0, 1.0]);
    assert_eq!(next_inputs.as_leaf()?.data_as_slice(), &[0.0, 0.0]);
    Ok(())
}

/// 时间主序输入的切片
#[test]
fn test_training_helper_time_major() -> Result<(), GraphError> {
    // [seq=2, batch=2, dim=1]
    let inputs = NestedStructure::leaf(Tensor::new(&[1.0, 3.0, 2.0, 4.0], &[2, 2, 1]));
    let helper = TrainingHelper::new(&inputs, Tensor::new(&[2.0, 2.0], &[2]), true)?;

    let (init_inputs, _) = helper.initialize()?;
    assert_eq!(init_inputs.as_leaf()?.data_as_slice(), &[1.0, 3.0]);
    Ok(())
}

/// sequence_length 维度校验
#[test]
fn test_training_helper_bad_sequence_length() {
    let inputs = NestedStructure::leaf(Tensor::zeros(&[2, 2, 1]));
    assert!(matches!(
        TrainingHelper::new(&inputs, Tensor::zeros(&[2, 1]), false),
        Err(GraphError::UnsupportedConfiguration(_))
    ));
}

// ==================== GreedyEmbeddingHelper ====================

/// 贪心采样 + 结束符检测 + 嵌入作为下步输入
#[test]
fn test_greedy_helper() -> Result<(), GraphError> {
    let helper = GreedyEmbeddingHelper::new(
        one_hot_embedding(4),
        Tensor::new(&[0.0, 0.0], &[2]),
        3,
    )?;

    let (init_inputs, init_finished) = helper.initialize()?;
    assert_eq!(init_inputs.as_leaf()?.shape(), &[2, 4]);
    assert_eq!(init_finished.data_as_slice(), &[0.0, 0.0]);

    // 样本0最大为结束符3，样本1最大为1
    let logits = Tensor::new(&[0.0, 0.1, 0.2, 0.9, 0.1, 0.8, 0.3, 0.2], &[2, 4]);
    let sample_ids = helper.sample(0, &logits, &empty_states())?;
    assert_eq!(sample_ids.data_as_slice(), &[3.0, 1.0]);

    let (finished, next_inputs, _) =
        helper.next_inputs(0, &logits, &empty_states(), &sample_ids)?;
    assert_eq!(finished.data_as_slice(), &[1.0, 0.0]);
    // 下步输入是采样id的one-hot嵌入
    assert_eq!(
        next_inputs.as_leaf()?.data_as_slice(),
        &[0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0]
    );
    Ok(())
}

// ==================== SampleEmbeddingHelper ====================

/// 温度必须严格大于0
#[test]
fn test_sample_helper_rejects_bad_temperature() {
    assert!(matches!(
        SampleEmbeddingHelper::new(
            one_hot_embedding(4),
            Tensor::zeros(&[2]),
            3,
            Some(0.0),
            None,
        ),
        Err(GraphError::UnsupportedConfiguration(_))
    ));
}

/// 同一种子下采样结果确定
#[test]
fn test_sample_helper_seeded_determinism() -> Result<(), GraphError> {
    let logits = Tensor::new(&[1.0, 2.0, 3.0, 0.5, 2.5, 1.5, 0.5, 0.5], &[2, 4]);

    let helper_a = SampleEmbeddingHelper::new(
        one_hot_embedding(4),
        Tensor::zeros(&[2]),
        3,
        Some(1.0),
        Some(7),
    )?;
    let helper_b = SampleEmbeddingHelper::new(
        one_hot_embedding(4),
        Tensor::zeros(&[2]),
        3,
        Some(1.0),
        Some(7),
    )?;

    let ids_a = helper_a.sample(0, &logits, &empty_states())?;
    let ids_b = helper_b.sample(0, &logits, &empty_states())?;
    assert_eq!(ids_a.data_as_slice(), ids_b.data_as_slice());

    // 采样id必须落在词表范围内
    assert!(ids_a.data_as_slice().iter().all(|&id| id >= 0.0 && id < 4.0));
    Ok(())
}

/// 极低温度下采样退化为argmax
#[test]
fn test_sample_helper_low_temperature_is_greedy() -> Result<(), GraphError> {
    let helper = SampleEmbeddingHelper::new(
        one_hot_embedding(4),
        Tensor::zeros(&[2]),
        3,
        Some(1e-4),
        Some(123),
    )?;

    let logits = Tensor::new(&[1.0, 5.0, 2.0, 0.0, 4.0, 1.0, 0.5, 0.5], &[2, 4]);
    let ids = helper.sample(0, &logits, &empty_states())?;
    assert_eq!(ids.data_as_slice(), &[1.0, 0.0]);
    Ok(())
}
