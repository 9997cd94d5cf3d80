use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use ndarray::IxDyn;
use std::cmp::PartialEq;

impl From<f32> for Tensor {
    /// 实现 From<f32> trait 用于将`f32`类型转换为形状为`[1]`的张量
    fn from(scalar: f32) -> Self {
        Tensor::new(&[scalar], &[1])
    }
}

impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Tensor {
    /// 二元逐元素运算，支持NumPy风格的“双向”广播：
    /// 两个操作数的形状从右向左对齐，每个维度须相等或其中一个为1，
    /// 输出形状取各维度的较大值。
    pub(in crate::tensor) fn binary_broadcast<F>(
        &self,
        other: &Self,
        op: F,
        operator: Operator,
    ) -> Tensor
    where
        F: Fn(f32, f32) -> f32,
    {
        assert!(
            self.can_broadcast_with(other),
            "{}",
            TensorError::OperatorError {
                operator,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: other.shape().to_vec(),
            }
        );

        let ndim = self.dimension().max(other.dimension());
        let dim_at = |shape: &[usize], i: usize| {
            // 从右向左对齐，缺省维度按1处理
            if i + shape.len() >= ndim {
                shape[i + shape.len() - ndim]
            } else {
                1
            }
        };
        let out_shape = (0..ndim)
            .map(|i| dim_at(self.shape(), i).max(dim_at(other.shape(), i)))
            .collect::<Vec<_>>();

        let lhs = self.data.broadcast(IxDyn(&out_shape)).unwrap();
        let rhs = other.data.broadcast(IxDyn(&out_shape)).unwrap();
        let data = lhs
            .iter()
            .zip(rhs.iter())
            .map(|(&x, &y)| op(x, y))
            .collect::<Vec<_>>();
        Tensor::new(&data, &out_shape)
    }

    /// 对张量中的所有元素求和并返回一个形状为[1]的标量。
    pub fn sum(&self) -> Tensor {
        Tensor::from(self.data.iter().sum::<f32>())
    }

    /// 对每个元素应用函数`f`，返回新张量
    pub fn map<F>(&self, f: F) -> Tensor
    where
        F: Fn(f32) -> f32,
    {
        Tensor {
            data: self.data.mapv(f),
        }
    }

    /// 逐元素求自然指数
    pub fn exp(&self) -> Tensor {
        Tensor {
            data: self.data.mapv(f32::exp),
        }
    }

    /// 逐元素求自然对数
    pub fn ln(&self) -> Tensor {
        Tensor {
            data: self.data.mapv(f32::ln),
        }
    }

    /// 判断是否所有元素均为“真”（非零）。
    /// 本库中布尔张量用0/1的f32表示。
    pub fn all(&self) -> bool {
        self.data.iter().all(|&x| x != 0.0)
    }

    /// 判断是否存在为“真”（非零）的元素
    pub fn any(&self) -> bool {
        self.data.iter().any(|&x| x != 0.0)
    }

    /// 沿最后一维求每行最大值所在的索引，返回去掉最后一维的张量（索引以f32存储）。
    /// 并列时取较小的索引，保证确定性。
    pub fn argmax_last_axis(&self) -> Tensor {
        assert!(self.dimension() >= 1, "{}", TensorError::EmptyList);
        let cols = *self.shape().last().unwrap();
        assert!(cols > 0, "{}", TensorError::EmptyList);

        let rows = self.size() / cols;
        let flat = self.reshape(&[rows, cols]);
        let mut result = Vec::with_capacity(rows);
        for r in 0..rows {
            let mut best = 0usize;
            for c in 1..cols {
                if flat[[r, c]] > flat[[r, best]] {
                    best = c;
                }
            }
            result.push(best as f32);
        }
        let out_shape = &self.shape()[..self.dimension() - 1];
        Tensor::new(&result, out_shape)
    }
}
