use super::Tensor;
use crate::errors::TensorError;
use ndarray::{Axis, IxDyn};
use std::collections::HashSet;

impl Tensor {
    pub fn reshape(&self, shape: &[usize]) -> Self {
        let total_elements: usize = self.data.len();
        let new_total_elements: usize = shape.iter().product();
        assert!(
            total_elements == new_total_elements,
            "{}",
            TensorError::IncompatibleShape
        );
        Self {
            data: self
                .data
                .clone()
                .into_shape(IxDyn(shape))
                .unwrap()
                .as_standard_layout()
                .to_owned(),
        }
    }

    /// 将多个张量沿着首个维度堆叠起来，返回一个新的张量。
    /// * `tensors` - 一个包含多个张量的数组的引用。
    /// * `new_dim` - 布尔值，指示是否增加一个新的维度来堆叠。
    ///
    /// 当 `new_dim` 为 `true` 时，确保所有张量具有相同的形状，堆叠出形状为`[tensors.len(), ...]`的张量。
    /// 当 `new_dim` 为 `false` 时，每个张量的第一个维度可以不同，但其余维度应相同，沿首维拼接。
    /// 否则报错。
    pub fn stack(tensors: &[&Self], new_dim: bool) -> Self {
        assert!(!tensors.is_empty(), "{}", TensorError::EmptyList);

        let first_shape = tensors[0].shape();
        let compatible_shapes = |t: &Self| {
            let t_shape = t.shape();
            let skip = usize::from(!new_dim);
            t_shape.len() == first_shape.len()
                && t_shape
                    .iter()
                    .skip(skip)
                    .zip(first_shape.iter().skip(skip))
                    .all(|(a, b)| a == b)
        };
        assert!(
            tensors.iter().all(|t| compatible_shapes(t)),
            "{}",
            TensorError::InconsitentShape
        );

        let data = tensors
            .iter()
            .flat_map(|t| t.data.iter().copied())
            .collect::<Vec<_>>();

        let shape = if new_dim {
            let mut shape = first_shape.to_vec();
            shape.insert(0, tensors.len());
            shape
        } else {
            let mut shape = first_shape.to_vec();
            shape[0] = tensors.iter().map(|t| t.shape()[0]).sum();
            shape
        };

        Self::new(&data, &shape)
    }

    /// 将多个张量沿指定的已有维度拼接起来，返回一个新的张量。
    /// 除`axis`外的所有维度必须一致。
    pub fn concat(tensors: &[&Self], axis: usize) -> Self {
        assert!(!tensors.is_empty(), "{}", TensorError::EmptyList);
        assert!(
            axis < tensors[0].dimension(),
            "{}",
            TensorError::IndexOutOfRange
        );
        let views = tensors.iter().map(|t| t.data.view()).collect::<Vec<_>>();
        let data = ndarray::concatenate(Axis(axis), &views)
            .unwrap_or_else(|_| panic!("{}", TensorError::InconsitentShape));
        Self {
            data: data.as_standard_layout().to_owned(),
        }
    }

    pub fn squeeze(&self) -> Self {
        let mut new_shape = Vec::new();
        for dim in self.data.shape() {
            if *dim > 1 {
                new_shape.push(*dim);
            }
        }
        self.reshape(&new_shape)
    }

    /// 在指定维度上增加一个维度。
    ///
    /// * `dim` - 要增加维度的索引。若`dim`为正数或零，则从头开始计数；
    ///   若`dim`为负数，则从末尾开始计数。例如，-1表示在最后一个维度后增加。
    pub fn unsqueeze(&self, dim: i8) -> Self {
        let dim = if dim < 0 {
            self.dimension() as i8 + dim + 1
        } else {
            dim
        };
        assert!(
            dim >= 0 && dim as usize <= self.dimension(),
            "维度超出范围。"
        );

        let mut new_shape = self.data.shape().to_vec();
        new_shape.insert(dim as usize, 1);
        self.reshape(&new_shape)
    }

    /// 交换张量的两个（以上）维度，并将其返回（不影响原张量）
    pub fn permute(&self, axes: &[usize]) -> Self {
        assert!(axes.len() >= 2, "{}", TensorError::PermuteNeedAtLeast2Dims);
        // 检查axes中的所有元素必须是唯一且在[0, <张量维数>)范围内
        let unique_axes = axes.iter().copied().collect::<HashSet<_>>();
        assert!(
            !(unique_axes.len() != axes.len()
                || !unique_axes.iter().all(|&a| a < self.dimension())),
            "{}",
            TensorError::PermuteNeedUniqueAndInRange
        );

        let permuted_data = self.data.clone().permuted_axes(axes);
        Self {
            data: permuted_data.as_standard_layout().to_owned(),
        }
    }

    /// 张量的转置（交换前两个维度）
    pub fn transpose(&self) -> Self {
        if self.dimension() <= 1 {
            self.clone()
        } else {
            let mut axes: Vec<usize> = (0..self.dimension()).collect();
            axes.swap(0, 1);
            self.permute(&axes)
        }
    }

    /// 交换批与时间维：[d0, d1, ...] -> [d1, d0, ...]，其余维度保持不变
    pub fn transpose_batch_time(&self) -> Self {
        self.transpose()
    }

    /// 将形状为1的`axis`维平铺为`times`份（广播式扩展）
    pub fn expand_on_axis(&self, axis: usize, times: usize) -> Self {
        assert!(axis < self.dimension(), "{}", TensorError::IndexOutOfRange);
        assert!(
            self.shape()[axis] == 1,
            "{}",
            TensorError::IncompatibleShape
        );
        let copies = (0..times).map(|_| self).collect::<Vec<_>>();
        Self::concat(&copies, axis)
    }
}
