/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : BeamSearchDecoder - 束搜索解码状态机
 *
 * 每个批样本并行维护 beam_size 条候选假设。一个解码步：
 * 1. 合并批/束两维，对 [batch*beam, ...] 执行一次单元前向
 * 2. log_softmax 得到本步对数概率，对已结束的束做“只许再出结束符”的掩码
 * 3. 与各束累积分数相加后，在 (beam, vocab) 展平的轴上取全局 top-K
 * 4. 把展平索引分解为（父束索引，词表索引），据父束索引重排
 *    单元状态/结束标志/长度，保证幸存假设携带正确的血统
 * 5. 未结束的束长度加一；选中结束符的束标记结束
 *
 * 候选数在概念上随时间收缩，但所有张量始终保持 [batch, beam] 的
 * 定形布局，以兼容不支持不规则形状的图执行引擎。
 */

use super::{DecodeStep, Decoder, EmbeddingFn, OutputFn};
use crate::nn::GraphError;
use crate::nn::cell::RnnCell;
use crate::nn::structure::NestedStructure;
use crate::tensor::Tensor;

/// “负无穷”哨兵的默认值：被掩掉的候选的对数概率
const DEFAULT_KINF: f32 = 1e9;

/// 束搜索的每步输出：分数、选中的词表id、父束回溯指针（均为 [batch, beam]）
#[derive(Debug, Clone)]
pub struct BeamOutput {
    pub scores: Tensor,
    pub predicted_ids: Tensor,
    pub parent_ids: Tensor,
}

/// 束搜索的步间状态。
/// 不变量：`log_probs`/`finished`/`lengths` 恒为 [batch, beam]，
/// `cell_states` 的每个叶子恒为 [batch, beam, ...]。
#[derive(Debug, Clone)]
pub struct BeamState {
    pub cell_states: NestedStructure,
    pub log_probs: Tensor,
    pub finished: Tensor,
    pub lengths: Tensor,
}

impl BeamOutput {
    fn into_structure(self) -> NestedStructure {
        NestedStructure::map(vec![
            ("scores", NestedStructure::leaf(self.scores)),
            ("predicted_ids", NestedStructure::leaf(self.predicted_ids)),
            ("parent_ids", NestedStructure::leaf(self.parent_ids)),
        ])
    }
}

impl BeamState {
    fn into_structure(self) -> NestedStructure {
        NestedStructure::map(vec![
            ("cell_states", self.cell_states),
            ("log_probs", NestedStructure::leaf(self.log_probs)),
            ("finished", NestedStructure::leaf(self.finished)),
            ("lengths", NestedStructure::leaf(self.lengths)),
        ])
    }

    fn from_structure(states: &NestedStructure) -> Result<Self, GraphError> {
        Ok(Self {
            cell_states: states.get("cell_states")?.clone(),
            log_probs: states.get("log_probs")?.as_leaf()?.clone(),
            finished: states.get("finished")?.as_leaf()?.clone(),
            lengths: states.get("lengths")?.as_leaf()?.clone(),
        })
    }
}

/// 束搜索解码器：包装一个循环单元，每步做分数累积、top-K 选择与
/// 按父束重排。
pub struct BeamSearchDecoder {
    cell: Box<dyn RnnCell>,
    start_token: usize,
    end_token: usize,
    beam_size: usize,
    embedding_fn: Option<EmbeddingFn>,
    output_fn: Option<OutputFn>,
    /// “负无穷”哨兵。长序列解码会把它与真实对数概率相加比较，
    /// 取值须远大于可能的累积分数范围，必要时可用 `with_kinf` 调整。
    kinf: f32,
}

impl BeamSearchDecoder {
    /// # 参数
    /// - `cell`: 被包装的循环单元（须以 batch*beam 为批大小构图）
    /// - `start_token`/`end_token`: 起始/结束 token id
    /// - `beam_size`: 束宽
    /// - `embedding_fn`: 可选的id到嵌入映射；缺省时原始id直接作为下步输入
    /// - `output_fn`: 可选的输出投影（作用在 [batch*beam, hidden] 布局上）
    pub fn new(
        cell: Box<dyn RnnCell>,
        start_token: usize,
        end_token: usize,
        beam_size: usize,
        embedding_fn: Option<EmbeddingFn>,
        output_fn: Option<OutputFn>,
    ) -> Result<Self, GraphError> {
        if beam_size == 0 {
            return Err(GraphError::UnsupportedConfiguration(
                "束宽必须大于0".to_string(),
            ));
        }
        Ok(Self {
            cell,
            start_token,
            end_token,
            beam_size,
            embedding_fn,
            output_fn,
            kinf: DEFAULT_KINF,
        })
    }

    /// 覆盖“负无穷”哨兵（必须为正数）
    pub fn with_kinf(mut self, kinf: f32) -> Result<Self, GraphError> {
        if kinf <= 0.0 {
            return Err(GraphError::UnsupportedConfiguration(format!(
                "负无穷哨兵必须为正数，但得到{kinf}"
            )));
        }
        self.kinf = kinf;
        Ok(self)
    }

    pub fn beam_size(&self) -> usize {
        self.beam_size
    }

    // ========== 批/束布局变换 ==========

    /// 把 [batch, ...] 的张量平铺为 [batch*beam, ...]，
    /// 各批样本连续重复（t0,t0,...,t1,t1,...）。
    /// 用于把解码器不托管的按批张量（如注意力的编码器输出）
    /// 对齐到束搜索的合并布局。
    pub fn tile_beam_merge_with_batch(x: &Tensor, beam_size: usize) -> Tensor {
        let tiled = Self::expand_to_beam_size_impl(x, beam_size);
        let mut merged_shape = vec![x.shape()[0] * beam_size];
        merged_shape.extend_from_slice(&x.shape()[1..]);
        tiled.reshape(&merged_shape)
    }

    /// [batch, ...] -> [batch, beam, ...]，各批样本连续重复
    fn expand_to_beam_size_impl(x: &Tensor, beam_size: usize) -> Tensor {
        x.unsqueeze(1).expand_on_axis(1, beam_size)
    }

    fn expand_to_beam_size(&self, x: &Tensor) -> Tensor {
        Self::expand_to_beam_size_impl(x, self.beam_size)
    }

    /// [batch, beam, ...] -> [batch*beam, ...]
    fn merge_batch_beams(&self, x: &Tensor) -> Tensor {
        let mut shape = vec![x.shape()[0] * self.beam_size];
        shape.extend_from_slice(&x.shape()[2..]);
        x.reshape(&shape)
    }

    /// [batch*beam, ...] -> [batch, beam, ...]
    fn split_batch_beams(&self, x: &Tensor) -> Tensor {
        let mut shape = vec![x.shape()[0] / self.beam_size, self.beam_size];
        shape.extend_from_slice(&x.shape()[1..]);
        x.reshape(&shape)
    }

    // ========== 掩码与选择 ==========

    /// 对已结束的束掩码本步对数概率：结束束的全部概率质量被压到
    /// 结束符上（该列为0、其余为-kinf），未结束束原样通过。
    /// 公式 masked = noend*finished - probs*(finished-1)，
    /// 其中 finished ∈ {0,1} 逐束广播。
    pub(in crate::nn) fn mask_probs(
        &self,
        probs: &Tensor,
        finished: &Tensor,
        vocab_size: usize,
    ) -> Tensor {
        let mut noend = vec![-self.kinf; vocab_size];
        noend[self.end_token] = 0.0;
        let noend = Tensor::new(&noend, &[1, 1, vocab_size]);

        let finished = finished.unsqueeze(-1); // [batch, beam, 1]
        &finished * &noend - probs * (&finished - 1.0)
    }

    /// 束搜索的选择步：分数累积、top-K、按父束重排
    pub(in crate::nn) fn beam_search_step(
        &self,
        _time: usize,
        logits: &Tensor,
        next_cell_states: NestedStructure,
        beam_state: &BeamState,
    ) -> Result<(BeamOutput, BeamState), GraphError> {
        let vocab_size = *logits.shape().last().unwrap();
        if self.end_token >= vocab_size {
            return Err(GraphError::UnsupportedConfiguration(format!(
                "结束token {}超出了词表大小{}",
                self.end_token, vocab_size
            )));
        }
        let batch_size = logits.shape()[0];

        // 1. 本步对数概率 + 结束束掩码
        let step_log_probs = logits.log_softmax_last_axis();
        let step_log_probs = self.mask_probs(&step_log_probs, &beam_state.finished, vocab_size);

        // 2. 与累积分数相加（沿词表轴广播）
        let log_probs = &step_log_probs + &beam_state.log_probs.unsqueeze(-1);

        // 3. (beam, vocab) 两轴展平后取全局 top-K
        let scores = log_probs.reshape(&[batch_size, self.beam_size * vocab_size]);
        let (topk_scores, topk_indices) = scores.top_k_last_axis(self.beam_size);

        // 4. 展平索引分解为（父束索引，词表索引）
        let beam_indices = topk_indices.map(|i| (i.round() as usize / vocab_size) as f32);
        let token_indices = topk_indices.map(|i| (i.round() as usize % vocab_size) as f32);

        // 5. 按展平索引/父束索引重排各状态张量
        let next_log_probs = scores.gather_per_row(&topk_indices);
        let next_cell_states = next_cell_states
            .map_structure(&mut |x| Ok(x.gather_per_row(&beam_indices)))?;
        let gathered_finished = beam_state.finished.gather_per_row(&beam_indices);
        let gathered_lengths = beam_state.lengths.gather_per_row(&beam_indices);

        // 6. 未结束的束长度加一（父束已结束的槽位长度冻结）
        let not_finished = gathered_finished.where_with_f32(|f| f != 0.0, |_| 0.0, |_| 1.0);
        let next_lengths = &gathered_lengths + &not_finished;

        // 7. 选中结束符 => 结束（单调：结束后不再翻转）
        let end = self.end_token as f32;
        let token_is_end = token_indices.where_with_f32(move |t| t == end, |_| 1.0, |_| 0.0);
        let next_finished = gathered_finished.where_with_tensor(
            &token_is_end,
            |f, e| f != 0.0 || e != 0.0,
            |_, _| 1.0,
            |_, _| 0.0,
        );

        let beam_search_output = BeamOutput {
            scores: topk_scores,
            predicted_ids: token_indices,
            parent_ids: beam_indices,
        };
        let beam_search_state = BeamState {
            cell_states: next_cell_states,
            log_probs: next_log_probs,
            finished: next_finished,
            lengths: next_lengths,
        };
        Ok((beam_search_output, beam_search_state))
    }
}

impl Decoder for BeamSearchDecoder {
    /// 把初始单元状态平铺到束宽；首步只有0号束“存活”
    /// （其余束的累积分数为-kinf），避免首次展开产生重复假设。
    fn initialize(
        &self,
        initial_cell_states: &NestedStructure,
    ) -> Result<(NestedStructure, NestedStructure, Tensor), GraphError> {
        let leaves = initial_cell_states.flatten();
        let first = leaves.first().ok_or_else(|| {
            GraphError::UnsupportedConfiguration(
                "初始单元状态是空结构，无法推断批大小".to_string(),
            )
        })?;
        let batch_size = first.shape()[0];

        let init_cell_states =
            initial_cell_states.map_structure(&mut |x| Ok(self.expand_to_beam_size(x)))?;

        let init_ids = Tensor::full(self.start_token as f32, &[batch_size, self.beam_size]);
        let init_inputs = match &self.embedding_fn {
            Some(embedding_fn) => embedding_fn(&init_ids)?,
            None => init_ids,
        };

        // 每个批行的累积分数初始化为 [0, -kinf, ..., -kinf]
        let mut first_row = vec![0.0f32];
        first_row.extend(std::iter::repeat(-self.kinf).take(self.beam_size - 1));
        let log_probs =
            Tensor::new(&first_row, &[1, self.beam_size]).expand_on_axis(0, batch_size);

        let init_finished = Tensor::zeros(&[batch_size, self.beam_size]);
        let init_lengths = Tensor::zeros(&[batch_size, self.beam_size]);

        let init_state = BeamState {
            cell_states: init_cell_states,
            log_probs,
            finished: init_finished.clone(),
            lengths: init_lengths,
        };
        Ok((
            NestedStructure::leaf(init_inputs),
            init_state.into_structure(),
            init_finished,
        ))
    }

    fn step(
        &self,
        time: usize,
        inputs: &NestedStructure,
        states: &NestedStructure,
    ) -> Result<DecodeStep, GraphError> {
        let beam_state = BeamState::from_structure(states)?;

        // 合并批/束两维，对 [batch*beam, ...] 执行一次单元前向
        let merged_inputs = inputs.map_structure(&mut |x| Ok(self.merge_batch_beams(x)))?;
        let merged_cell_states = beam_state
            .cell_states
            .map_structure(&mut |x| Ok(self.merge_batch_beams(x)))?;
        let (cell_outputs, next_cell_states) =
            self.cell.call(&merged_inputs, &merged_cell_states)?;

        // 可选输出投影后再切回 [batch, beam, ...]
        let mut logits = cell_outputs.as_leaf()?.clone();
        if let Some(output_fn) = &self.output_fn {
            logits = output_fn(&logits)?;
        }
        let logits = self.split_batch_beams(&logits);
        let next_cell_states =
            next_cell_states.map_structure(&mut |x| Ok(self.split_batch_beams(x)))?;

        let (beam_search_output, beam_search_state) =
            self.beam_search_step(time, &logits, next_cell_states, &beam_state)?;

        let finished = beam_search_state.finished.clone();
        let sample_ids = beam_search_output.predicted_ids.clone();
        let next_inputs = match &self.embedding_fn {
            Some(embedding_fn) => embedding_fn(&sample_ids)?,
            None => sample_ids,
        };

        Ok(DecodeStep {
            outputs: beam_search_output.into_structure(),
            next_states: beam_search_state.into_structure(),
            next_inputs: NestedStructure::leaf(next_inputs),
            finished,
        })
    }

    /// 沿束搜索树回溯父指针，重建完整假设序列
    fn finalize(
        &self,
        outputs: &NestedStructure,
        final_states: &NestedStructure,
        _sequence_lengths: &Tensor,
    ) -> Result<Option<(NestedStructure, NestedStructure)>, GraphError> {
        let predicted_ids = outputs.get("predicted_ids")?.as_leaf()?;
        let parent_ids = outputs.get("parent_ids")?.as_leaf()?;
        let traced = gather_tree(predicted_ids, parent_ids)?;
        Ok(Some((
            NestedStructure::leaf(traced),
            final_states.clone(),
        )))
    }
}

/// 沿父指针回溯束搜索树，重建完整序列。
///
/// `ids`与`parents`均为 [time, batch, beam]。时间步 t 上束槽 b 的id
/// 只有被 t+1 步的父指针回溯到才属于最终序列：从最后一步开始，
/// out[T-1] 原样拷贝，随后逐步 out[t][b][k] = ids[t][b][parent]，
/// parent 再沿 parents[t] 继续向前。
pub fn gather_tree(ids: &Tensor, parents: &Tensor) -> Result<Tensor, GraphError> {
    if ids.dimension() != 3 || !ids.is_same_shape(parents) {
        return Err(GraphError::ShapeMismatch {
            expected: ids.shape().to_vec(),
            got: parents.shape().to_vec(),
            message: "gather_tree需要两个同形的[time, batch, beam]张量".to_string(),
        });
    }
    let time_steps = ids.shape()[0];
    let batch_size = ids.shape()[1];
    let beam_size = ids.shape()[2];

    let mut out = Tensor::zeros(ids.shape());
    for b in 0..batch_size {
        for k in 0..beam_size {
            out[[time_steps - 1, b, k]] = ids[[time_steps - 1, b, k]];
            let mut parent = parents[[time_steps - 1, b, k]].round() as usize;
            for t in (0..time_steps - 1).rev() {
                if parent >= beam_size {
                    return Err(GraphError::ComputationError(format!(
                        "gather_tree在t={t}处遇到越界的父束索引{parent}"
                    )));
                }
                out[[t, b, k]] = ids[[t, b, parent]];
                parent = parents[[t, b, parent]].round() as usize;
            }
        }
    }
    Ok(out)
}
