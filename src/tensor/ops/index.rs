use crate::tensor::Tensor;
use ndarray::IxDyn;
use std::ops::{Index, IndexMut};

// 克隆式索引
impl Tensor {
    /// 使用给定的索引数组从张量中选取（多个）元素。
    /// * `indices` - 索引值的数组，长度可小于张量维数（缺省维度取整段）。
    ///
    /// 返回一个“克隆”的张量，其包含根据给定索引选取的（多个）元素，
    /// 并将所有仅为1的维度优化掉。
    pub fn get(&self, indices: &[usize]) -> Tensor {
        if let Some(number) = self.number() {
            return Tensor::new(&[number], &[]);
        }
        let sliced = self.data.slice_each_axis(|axis| {
            let axis_index = axis.axis.index();
            match indices.get(axis_index) {
                Some(&i) => ndarray::Slice::new(i as isize, Some((i + 1) as isize), 1),
                None => ndarray::Slice::new(0, None, 1),
            }
        });
        let t = Tensor {
            data: sliced.as_standard_layout().to_owned(),
        };
        t.squeeze() // 将所有仅为1的维度优化掉
    }
}

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓引用式索引↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
impl Index<[usize; 1]> for Tensor {
    type Output = f32;
    fn index(&self, index: [usize; 1]) -> &Self::Output {
        &self.data[IxDyn(&index)]
    }
}
impl Index<[usize; 2]> for Tensor {
    type Output = f32;
    fn index(&self, index: [usize; 2]) -> &Self::Output {
        &self.data[IxDyn(&index)]
    }
}
impl Index<[usize; 3]> for Tensor {
    type Output = f32;
    fn index(&self, index: [usize; 3]) -> &Self::Output {
        &self.data[IxDyn(&index)]
    }
}
impl IndexMut<[usize; 1]> for Tensor {
    fn index_mut(&mut self, index: [usize; 1]) -> &mut Self::Output {
        &mut self.data[IxDyn(&index)]
    }
}
impl IndexMut<[usize; 2]> for Tensor {
    fn index_mut(&mut self, index: [usize; 2]) -> &mut Self::Output {
        &mut self.data[IxDyn(&index)]
    }
}
impl IndexMut<[usize; 3]> for Tensor {
    fn index_mut(&mut self, index: [usize; 3]) -> &mut Self::Output {
        &mut self.data[IxDyn(&index)]
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑引用式索引↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
