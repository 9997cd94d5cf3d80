use super::Tensor;

impl Tensor {
    /// 通用的条件过滤函数：对每个元素按`condition`选择`true_fn`或`false_fn`的结果。
    /// NaN元素保持为NaN。
    ///
    /// # 示例
    /// ```ignore
    /// // 类似 np.where(x >= 0.0, 1.0, 0.0)
    /// let mask = t.where_with_f32(|x| x >= 0.0, |_| 1.0, |_| 0.0);
    /// ```
    pub fn where_with_f32<F, T, U>(&self, condition: F, true_fn: T, false_fn: U) -> Self
    where
        F: Fn(f32) -> bool,
        T: Fn(f32) -> f32,
        U: Fn(f32) -> f32,
    {
        let result = self
            .data
            .iter()
            .map(|&x| {
                if x.is_nan() {
                    f32::NAN
                } else if condition(x) {
                    true_fn(x)
                } else {
                    false_fn(x)
                }
            })
            .collect::<Vec<_>>();

        Self::new(&result, self.shape())
    }

    /// 基于另一个张量的条件过滤函数，两个张量的形状必须严格一致。
    pub fn where_with_tensor<F, T, U>(
        &self,
        other: &Self,
        condition: F,
        true_fn: T,
        false_fn: U,
    ) -> Self
    where
        F: Fn(f32, f32) -> bool,
        T: Fn(f32, f32) -> f32,
        U: Fn(f32, f32) -> f32,
    {
        assert!(
            self.is_same_shape(other),
            "两个张量的形状必须相同，当前张量形状为{:?}，比较张量形状为{:?}",
            self.shape(),
            other.shape()
        );

        let result = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&x, &y)| {
                if x.is_nan() || y.is_nan() {
                    f32::NAN
                } else if condition(x, y) {
                    true_fn(x, y)
                } else {
                    false_fn(x, y)
                }
            })
            .collect::<Vec<_>>();

        Self::new(&result, self.shape())
    }
}
