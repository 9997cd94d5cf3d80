/*
 * @Author       : 老董
 * @Date         : 2026-02-12
 * @Description  : 序列解码所需的选择类算子：softmax/log_softmax、top-k、
 *                 按行聚集（gather）、按维取片、时间轴反转、序列掩码。
 *                 这些算子都只在前向（解码）路径中使用。
 */

use crate::errors::TensorError;
use crate::tensor::Tensor;
use ndarray::Axis;

impl Tensor {
    /// 沿最后一维计算数值稳定的softmax：softmax(x)_i = exp(x_i - max) / Σ exp(x_j - max)
    pub fn softmax_last_axis(&self) -> Tensor {
        let cols = *self.shape().last().expect("softmax需要至少1维输入");
        let rows = self.size() / cols;
        let flat = self.reshape(&[rows, cols]);

        let mut result = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            let mut max_val = flat[[r, 0]];
            for c in 1..cols {
                if flat[[r, c]] > max_val {
                    max_val = flat[[r, c]];
                }
            }
            let mut sum_exp = 0.0f32;
            let mut row = Vec::with_capacity(cols);
            for c in 0..cols {
                let e = (flat[[r, c]] - max_val).exp();
                row.push(e);
                sum_exp += e;
            }
            result.extend(row.into_iter().map(|e| e / sum_exp));
        }
        Tensor::new(&result, self.shape())
    }

    /// 沿最后一维计算log(softmax(x))，即 x - max - ln(Σ exp(x - max))。
    /// 直接在对数域计算，避免先softmax再取对数在概率下溢时产生-inf。
    pub fn log_softmax_last_axis(&self) -> Tensor {
        let cols = *self.shape().last().expect("log_softmax需要至少1维输入");
        let rows = self.size() / cols;
        let flat = self.reshape(&[rows, cols]);

        let mut result = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            let mut max_val = flat[[r, 0]];
            for c in 1..cols {
                if flat[[r, c]] > max_val {
                    max_val = flat[[r, c]];
                }
            }
            let mut sum_exp = 0.0f32;
            for c in 0..cols {
                sum_exp += (flat[[r, c]] - max_val).exp();
            }
            let log_sum = sum_exp.ln();
            for c in 0..cols {
                result.push(flat[[r, c]] - max_val - log_sum);
            }
        }
        Tensor::new(&result, self.shape())
    }

    /// 沿最后一维取每行最大的k个元素，返回（值，索引）两个张量，
    /// 形状均为把最后一维换成k。索引以f32存储。
    ///
    /// 排序保证确定性：值大者在前，值相同时索引小者在前。
    pub fn top_k_last_axis(&self, k: usize) -> (Tensor, Tensor) {
        let cols = *self.shape().last().expect("top-k需要至少1维输入");
        assert!(k >= 1 && k <= cols, "{}", TensorError::TopKOutOfRange);
        let rows = self.size() / cols;
        let flat = self.reshape(&[rows, cols]);

        let mut values = Vec::with_capacity(rows * k);
        let mut indices = Vec::with_capacity(rows * k);
        for r in 0..rows {
            let mut order = (0..cols).collect::<Vec<_>>();
            order.sort_by(|&a, &b| {
                flat[[r, b]]
                    .partial_cmp(&flat[[r, a]])
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.cmp(&b))
            });
            for &c in order.iter().take(k) {
                values.push(flat[[r, c]]);
                indices.push(c as f32);
            }
        }
        let mut out_shape = self.shape().to_vec();
        *out_shape.last_mut().unwrap() = k;
        (
            Tensor::new(&values, &out_shape),
            Tensor::new(&indices, &out_shape),
        )
    }

    /// 按行聚集：本张量形状为[rows, cols, ...]，`indices`形状为[rows, k]
    /// （值为f32存储的列索引），返回形状为[rows, k, ...]的张量，
    /// 其中 out[r, j, ...] = self[r, indices[r, j], ...]。
    pub fn gather_per_row(&self, indices: &Tensor) -> Tensor {
        assert!(self.dimension() >= 2, "按行聚集需要至少2维的张量");
        assert!(indices.dimension() == 2, "聚集索引必须是2维张量");
        let rows = self.shape()[0];
        let cols = self.shape()[1];
        assert!(
            indices.shape()[0] == rows,
            "{}",
            TensorError::InconsitentShape
        );
        let k = indices.shape()[1];

        let inner: usize = self.shape()[2..].iter().product();
        let mut out = Vec::with_capacity(rows * k * inner);
        let data = self.reshape(&[rows, cols, inner]);
        for r in 0..rows {
            for j in 0..k {
                let c = indices[[r, j]].round() as usize;
                assert!(c < cols, "{}", TensorError::IndexOutOfRange);
                for i in 0..inner {
                    out.push(data[[r, c, i]]);
                }
            }
        }
        let mut out_shape = vec![rows, k];
        out_shape.extend_from_slice(&self.shape()[2..]);
        Tensor::new(&out, &out_shape)
    }

    /// 沿`axis`维取下标为`index`的切片，并去掉该维。
    /// 如：[seq, batch, dim]张量取select_on_axis(0, t)得到[batch, dim]。
    pub fn select_on_axis(&self, axis: usize, index: usize) -> Tensor {
        assert!(axis < self.dimension(), "{}", TensorError::IndexOutOfRange);
        assert!(
            index < self.shape()[axis],
            "{}",
            TensorError::IndexOutOfRange
        );
        Tensor {
            data: self
                .data
                .index_axis(Axis(axis), index)
                .as_standard_layout()
                .to_owned(),
        }
    }

    /// 沿`axis`维反转元素顺序
    pub fn reverse_axis(&self, axis: usize) -> Tensor {
        assert!(axis < self.dimension(), "{}", TensorError::IndexOutOfRange);
        let mut data = self.data.as_standard_layout().to_owned();
        data.invert_axis(Axis(axis));
        Tensor {
            data: data.as_standard_layout().to_owned(),
        }
    }

    /// 序列掩码：`lengths`形状为[batch]（各序列的真实长度），
    /// 返回形状为[batch, maxlen]的0/1张量，mask[b, t] = (t < lengths[b])。
    pub fn sequence_mask(lengths: &Tensor, maxlen: usize) -> Tensor {
        assert!(lengths.dimension() == 1, "序列长度必须是1维张量");
        let batch = lengths.shape()[0];
        let mut data = Vec::with_capacity(batch * maxlen);
        for b in 0..batch {
            let len = lengths[[b]].round() as usize;
            for t in 0..maxlen {
                data.push(if t < len { 1.0 } else { 0.0 });
            }
        }
        Tensor::new(&data, &[batch, maxlen])
    }
}
