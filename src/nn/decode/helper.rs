/*
 * @Author       : 老董
 * @Date         : 2026-02-26
 * @Description  : DecodeHelper - BasicDecoder 的采样/下步输入策略
 *
 * 三个实现：
 * - TrainingHelper: 按时间步切片真实序列（教师强制），采样结果不用于下步输入
 * - GreedyEmbeddingHelper: argmax 采样，下步输入为采样id的嵌入
 * - SampleEmbeddingHelper: 按 softmax(logits/temperature) 分布随机采样
 */

use super::EmbeddingFn;
use crate::nn::GraphError;
use crate::nn::structure::NestedStructure;
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;

/// 采样/下步输入策略接口（BasicDecoder 的可插拔决策点）
pub trait DecodeHelper {
    /// 产生首步输入与初始结束标志（[batch]的0/1张量）
    fn initialize(&self) -> Result<(NestedStructure, Tensor), GraphError>;

    /// 根据本步 logits 采样 token id，返回 [batch] 张量
    fn sample(
        &self,
        time: usize,
        outputs: &Tensor,
        states: &NestedStructure,
    ) -> Result<Tensor, GraphError>;

    /// 产生下一步的（结束标志，输入，状态）
    fn next_inputs(
        &self,
        time: usize,
        outputs: &Tensor,
        states: &NestedStructure,
        sample_ids: &Tensor,
    ) -> Result<(Tensor, NestedStructure, NestedStructure), GraphError>;
}

// ==================== TrainingHelper ====================

/// 教师强制（teacher forcing）策略：下步输入从完整的真实序列中切片。
/// 主要用于最大似然训练场景，采样的id不会被用作下步输入。
pub struct TrainingHelper {
    /// 时间主序、且在时间维末尾补了一个零步的完整序列输入
    /// （补零保证在 t+1 越过真实长度时切片不越界，切出的零步不会被消费）
    inputs_tm: NestedStructure,
    /// 各样本的真实长度 [batch]
    sequence_length: Tensor,
}

impl TrainingHelper {
    /// # 参数
    /// - `inputs`: 完整序列输入，叶子形状 [batch, seq_len, ...]
    ///   （`time_major`为true时为 [seq_len, batch, ...]）
    /// - `sequence_length`: 各样本真实长度 [batch]
    /// - `time_major`: `inputs` 的布局
    pub fn new(
        inputs: &NestedStructure,
        sequence_length: Tensor,
        time_major: bool,
    ) -> Result<Self, GraphError> {
        if sequence_length.dimension() != 1 {
            return Err(GraphError::UnsupportedConfiguration(format!(
                "sequence_length必须是1维张量，但得到{}维",
                sequence_length.dimension()
            )));
        }

        let inputs_tm = if time_major {
            inputs.clone()
        } else {
            inputs.map_structure(&mut |x| Ok(x.transpose_batch_time()))?
        };

        // 时间维末尾补一个零步
        let inputs_tm = inputs_tm.map_structure(&mut |x| {
            let mut pad_shape = x.shape().to_vec();
            pad_shape[0] = 1;
            Ok(Tensor::concat(&[x, &Tensor::zeros(&pad_shape)], 0))
        })?;

        Ok(Self {
            inputs_tm,
            sequence_length,
        })
    }
}

impl DecodeHelper for TrainingHelper {
    fn initialize(&self) -> Result<(NestedStructure, Tensor), GraphError> {
        let init_inputs = self
            .inputs_tm
            .map_structure(&mut |x| Ok(x.select_on_axis(0, 0)))?;
        // 长度为0的样本一开始就结束
        let init_finished = self
            .sequence_length
            .where_with_f32(|len| len <= 0.0, |_| 1.0, |_| 0.0);
        Ok((init_inputs, init_finished))
    }

    fn sample(
        &self,
        _time: usize,
        outputs: &Tensor,
        _states: &NestedStructure,
    ) -> Result<Tensor, GraphError> {
        // 教师强制下采样结果只作记录，不影响下步输入
        Ok(outputs.argmax_last_axis())
    }

    fn next_inputs(
        &self,
        time: usize,
        _outputs: &Tensor,
        states: &NestedStructure,
        _sample_ids: &Tensor,
    ) -> Result<(Tensor, NestedStructure, NestedStructure), GraphError> {
        let next_time = time + 1;
        let finished = self
            .sequence_length
            .where_with_f32(|len| len <= next_time as f32, |_| 1.0, |_| 0.0);
        let next_inputs = self
            .inputs_tm
            .map_structure(&mut |x| Ok(x.select_on_axis(0, next_time)))?;
        Ok((finished, next_inputs, states.clone()))
    }
}

// ==================== GreedyEmbeddingHelper ====================

/// 贪心策略：对 logits 做 argmax，采样id过嵌入层后作为下步输入，
/// 采到结束符即标记该样本结束。
pub struct GreedyEmbeddingHelper {
    embedding_fn: EmbeddingFn,
    /// 各样本的起始 token [batch]
    start_tokens: Tensor,
    end_token: usize,
}

impl GreedyEmbeddingHelper {
    pub fn new(
        embedding_fn: EmbeddingFn,
        start_tokens: Tensor,
        end_token: usize,
    ) -> Result<Self, GraphError> {
        if start_tokens.dimension() != 1 {
            return Err(GraphError::UnsupportedConfiguration(format!(
                "start_tokens必须是1维张量，但得到{}维",
                start_tokens.dimension()
            )));
        }
        Ok(Self {
            embedding_fn,
            start_tokens,
            end_token,
        })
    }

    fn end_token_mask(&self, sample_ids: &Tensor) -> Tensor {
        let end = self.end_token as f32;
        sample_ids.where_with_f32(move |id| id == end, |_| 1.0, |_| 0.0)
    }
}

impl DecodeHelper for GreedyEmbeddingHelper {
    fn initialize(&self) -> Result<(NestedStructure, Tensor), GraphError> {
        let init_finished = Tensor::zeros(self.start_tokens.shape());
        let init_inputs = (self.embedding_fn)(&self.start_tokens)?;
        Ok((NestedStructure::leaf(init_inputs), init_finished))
    }

    fn sample(
        &self,
        _time: usize,
        outputs: &Tensor,
        _states: &NestedStructure,
    ) -> Result<Tensor, GraphError> {
        Ok(outputs.argmax_last_axis())
    }

    fn next_inputs(
        &self,
        _time: usize,
        _outputs: &Tensor,
        states: &NestedStructure,
        sample_ids: &Tensor,
    ) -> Result<(Tensor, NestedStructure, NestedStructure), GraphError> {
        let finished = self.end_token_mask(sample_ids);
        let next_inputs = (self.embedding_fn)(sample_ids)?;
        Ok((finished, NestedStructure::leaf(next_inputs), states.clone()))
    }
}

// ==================== SampleEmbeddingHelper ====================

/// 随机采样策略：按 softmax(logits / temperature) 的分类分布采样，
/// 其余行为与 GreedyEmbeddingHelper 一致。
pub struct SampleEmbeddingHelper {
    greedy: GreedyEmbeddingHelper,
    /// softmax温度；None 等价于 1.0
    softmax_temperature: Option<f32>,
    rng: RefCell<StdRng>,
}

impl SampleEmbeddingHelper {
    /// # 错误
    /// `softmax_temperature` 非正时返回 `UnsupportedConfiguration`
    pub fn new(
        embedding_fn: EmbeddingFn,
        start_tokens: Tensor,
        end_token: usize,
        softmax_temperature: Option<f32>,
        seed: Option<u64>,
    ) -> Result<Self, GraphError> {
        if let Some(t) = softmax_temperature {
            if t <= 0.0 {
                return Err(GraphError::UnsupportedConfiguration(format!(
                    "softmax温度必须严格大于0，但得到{t}"
                )));
            }
        }
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            greedy: GreedyEmbeddingHelper::new(embedding_fn, start_tokens, end_token)?,
            softmax_temperature,
            rng: RefCell::new(rng),
        })
    }

    /// 逆CDF法按行采样分类分布
    fn sample_categorical(&self, probs: &Tensor) -> Tensor {
        let batch = probs.shape()[0];
        let vocab = probs.shape()[1];
        let mut rng = self.rng.borrow_mut();
        let mut ids = Vec::with_capacity(batch);
        for b in 0..batch {
            let u: f32 = rng.r#gen();
            let mut cumulative = 0.0f32;
            let mut chosen = vocab - 1;
            for v in 0..vocab {
                cumulative += probs[[b, v]];
                if u < cumulative {
                    chosen = v;
                    break;
                }
            }
            ids.push(chosen as f32);
        }
        Tensor::new(&ids, &[batch])
    }
}

impl DecodeHelper for SampleEmbeddingHelper {
    fn initialize(&self) -> Result<(NestedStructure, Tensor), GraphError> {
        self.greedy.initialize()
    }

    fn sample(
        &self,
        _time: usize,
        outputs: &Tensor,
        _states: &NestedStructure,
    ) -> Result<Tensor, GraphError> {
        let logits = match self.softmax_temperature {
            Some(t) => outputs / t,
            None => outputs.clone(),
        };
        let probs = logits.softmax_last_axis();
        Ok(self.sample_categorical(&probs))
    }

    fn next_inputs(
        &self,
        time: usize,
        outputs: &Tensor,
        states: &NestedStructure,
        sample_ids: &Tensor,
    ) -> Result<(Tensor, NestedStructure, NestedStructure), GraphError> {
        self.greedy.next_inputs(time, outputs, states, sample_ids)
    }
}
